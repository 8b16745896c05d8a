use super::MapError;
use crate::node::AccountRecord;

/// Account snapshot taken at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Account {
	pub address: String,
	pub balance: u64,
	pub counter: u64,
}

impl Account {
	pub fn from_wire(record: &AccountRecord) -> Result<Self, MapError> {
		if record.account_id.address.is_empty() {
			return Err(MapError::MissingField("accountId"));
		}

		Ok(Self {
			address: record.account_id.address.clone(),
			balance: record.state_current.balance.value,
			counter: record.state_current.counter,
		})
	}
}
