use super::decode::{integer, stored};
use super::{Storage, StorageError};
use crate::model::MalfeasanceProof;
use rusqlite::params;

impl Storage {
	/// Append a proof. A proof with the same identity and content is stored once.
	///
	/// Returns `true` if a row was inserted.
	pub async fn save_malfeasance_proof(
		&self,
		proof: &MalfeasanceProof,
	) -> Result<bool, StorageError> {
		let proof = proof.clone();
		self.call("save_malfeasance_proof", move |conn| {
			let inserted = conn.execute(
				"INSERT INTO malfeasance_proofs (smesher_id, layer, kind, debug_info)
				 VALUES (?1, ?2, ?3, ?4)
				 ON CONFLICT(smesher_id, kind, layer, debug_info) DO NOTHING",
				params![
					proof.smesher_id,
					stored(proof.layer),
					proof.kind,
					proof.debug_info
				],
			)?;
			Ok(inserted > 0)
		})
		.await
	}

	/// All proofs recorded against a smesher, by layer.
	pub async fn get_malfeasance_proofs(
		&self,
		smesher_id: &str,
	) -> Result<Vec<MalfeasanceProof>, StorageError> {
		let smesher_id = smesher_id.to_string();
		self.call("get_malfeasance_proofs", move |conn| {
			let mut stmt = conn.prepare(
				"SELECT smesher_id, layer, kind, debug_info FROM malfeasance_proofs
				 WHERE smesher_id = ?1 ORDER BY layer ASC",
			)?;
			let proofs = stmt
				.query_map(params![smesher_id], |row| {
					Ok(MalfeasanceProof {
						smesher_id: row.get(0)?,
						layer: integer(row, 1)?,
						kind: row.get(2)?,
						debug_info: row.get(3)?,
					})
				})?
				.collect::<rusqlite::Result<Vec<_>>>()?;
			Ok(proofs)
		})
		.await
	}
}
