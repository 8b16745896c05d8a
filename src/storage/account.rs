use super::decode::{integer, stored};
use super::{Storage, StorageError};
use crate::model::Account;
use rusqlite::params;

impl Storage {
	pub async fn save_account(&self, account: &Account) -> Result<(), StorageError> {
		let account = account.clone();
		self.call("save_account", move |conn| {
			conn.execute(
				"INSERT INTO accounts (address, balance, counter) VALUES (?1, ?2, ?3)
				 ON CONFLICT(address) DO UPDATE SET
					balance = excluded.balance,
					counter = excluded.counter",
				params![
					account.address,
					stored(account.balance),
					stored(account.counter)
				],
			)?;
			Ok(())
		})
		.await
	}

	pub async fn get_account(&self, address: &str) -> Result<Account, StorageError> {
		let address = address.to_string();
		self.call("get_account", move |conn| {
			conn.query_row(
				"SELECT address, balance, counter FROM accounts WHERE address = ?1",
				params![address],
				|row| {
					Ok(Account {
						address: row.get(0)?,
						balance: integer(row, 1)?,
						counter: integer(row, 2)?,
					})
				},
			)
		})
		.await
	}
}
