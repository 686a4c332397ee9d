//! Rollup aggregator: optimistic batch submission with a fraud-proof
//! challenge window (spec §4.9).

use serde::{Deserialize, Serialize};

use crate::error::{Result, SynnergyError};
use crate::merkle::{MerkleProof, MerkleTree};
use crate::state::StateStore;
use crate::types::Hash;

/// Fixed challenge window (spec §4.9, §6 glossary).
pub const CHALLENGE_WINDOW_SECS: i64 = 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BatchStatus {
    Pending,
    Challenged,
    Finalised,
    Reverted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchHeader {
    pub id: u64,
    pub submitter: crate::types::Address,
    pub tx_root: Hash,
    pub pre_state_root: Hash,
    pub next_state_root: Hash,
    pub submitted_at: i64,
    pub status: BatchStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudProof {
    pub batch_id: u64,
    pub tx_index: usize,
    pub tx: Vec<u8>,
    pub proof: MerkleProof,
}

const KEY_PAUSED: &[u8] = b"rollup:paused";

/// The literal persisted-state key convention for a batch transaction body
/// (spec §6 External Interfaces).
fn tx_key(batch_id: u64, idx: usize) -> Vec<u8> {
    format!("tx:{batch_id}:{idx}").into_bytes()
}

/// Persists batches, tx bodies, and the paused flag through the shared
/// [`StateStore`] so a restart preserves `Pause` (spec open question: adopt
/// the variant of `PauseAggregator` that persists to the KV store) and so
/// batch tx bodies live under the spec's `tx:<batch,idx>` key convention
/// rather than only in memory.
pub struct RollupAggregator {
    next_id: u64,
    batches: std::collections::HashMap<u64, BatchHeader>,
    proofs: std::collections::HashMap<u64, FraudProof>,
}

impl RollupAggregator {
    pub fn new() -> Self {
        RollupAggregator { next_id: 0, batches: std::collections::HashMap::new(), proofs: std::collections::HashMap::new() }
    }

    pub fn is_paused(&self, state: &StateStore) -> bool {
        state.get(KEY_PAUSED).map(|v| v.as_slice() == [1u8]).unwrap_or(false)
    }

    pub fn pause(&self, state: &mut StateStore) {
        state.put(KEY_PAUSED.to_vec(), vec![1u8]);
    }

    pub fn resume(&self, state: &mut StateStore) {
        state.put(KEY_PAUSED.to_vec(), vec![0u8]);
    }

    pub fn batch(&self, id: u64) -> Option<&BatchHeader> {
        self.batches.get(&id)
    }

    /// Compute the tx Merkle root (padding an odd leaf count with a
    /// duplicate of the last leaf) and the next state root
    /// `SHA-256(pre_state_root || concat(tx1..txn))` (spec §4.9, §8 rollup
    /// state-root law).
    fn compute_roots(pre_state_root: Hash, txs: &[Vec<u8>]) -> (Hash, Hash) {
        let leaves: Vec<Hash> = txs.iter().map(|tx| Hash::of(tx)).collect();
        let tx_root = MerkleTree::new(&leaves).map(|t| t.root()).unwrap_or(Hash::ZERO);
        let mut concat = Vec::new();
        for tx in txs {
            concat.extend_from_slice(tx);
        }
        let next_state_root = Hash::of_concat(&[&pre_state_root.0, &concat]);
        (tx_root, next_state_root)
    }

    /// Submit a new batch; rejected if the aggregator is paused (spec §4.9).
    pub fn submit_batch(
        &mut self,
        state: &mut StateStore,
        submitter: crate::types::Address,
        txs: Vec<Vec<u8>>,
        pre_state_root: Hash,
        now: i64,
    ) -> Result<u64> {
        if self.is_paused(state) {
            return Err(SynnergyError::StateViolation("rollup aggregator is paused".into()));
        }
        let (tx_root, next_state_root) = Self::compute_roots(pre_state_root, &txs);
        let id = self.next_id;
        self.next_id += 1;

        let header = BatchHeader {
            id,
            submitter,
            tx_root,
            pre_state_root,
            next_state_root,
            submitted_at: now,
            status: BatchStatus::Pending,
        };
        for (idx, tx) in txs.into_iter().enumerate() {
            state.put(tx_key(id, idx), tx);
        }
        self.batches.insert(id, header);
        Ok(id)
    }

    /// Verify `fp`'s referenced transaction against the batch's stored tx
    /// root; on success mark the batch Challenged (spec §4.9).
    pub fn submit_fraud_proof(&mut self, state: &StateStore, fp: FraudProof, now: i64) -> Result<()> {
        let header = self
            .batches
            .get_mut(&fp.batch_id)
            .ok_or_else(|| SynnergyError::NotFound(format!("batch {}", fp.batch_id)))?;
        if header.status != BatchStatus::Pending {
            return Err(SynnergyError::StateViolation(format!("batch {} is not pending", fp.batch_id)));
        }
        if now - header.submitted_at > CHALLENGE_WINDOW_SECS {
            return Err(SynnergyError::StateViolation("challenge window has expired".into()));
        }
        let stored_tx = state
            .get(&tx_key(fp.batch_id, fp.tx_index))
            .ok_or_else(|| SynnergyError::NotFound(format!("tx {} in batch {}", fp.tx_index, fp.batch_id)))?;
        if stored_tx != &fp.tx {
            return Err(SynnergyError::ProofInvalid("fraud proof tx does not match the stored tx".into()));
        }
        let leaf = Hash::of(&fp.tx);
        if !MerkleTree::verify(header.tx_root, leaf, &fp.proof) {
            return Err(SynnergyError::ProofInvalid("fraud proof does not verify against the batch's tx root".into()));
        }
        header.status = BatchStatus::Challenged;
        self.proofs.insert(fp.batch_id, fp);
        Ok(())
    }

    /// Finalise a batch once the challenge window has elapsed: Pending moves
    /// to Finalised (writing the canonical state root); Challenged moves to
    /// Reverted (spec §4.9).
    pub fn finalize_batch(&mut self, state: &mut StateStore, id: u64, now: i64) -> Result<BatchStatus> {
        let header = self.batches.get_mut(&id).ok_or_else(|| SynnergyError::NotFound(format!("batch {id}")))?;
        if now - header.submitted_at <= CHALLENGE_WINDOW_SECS {
            return Err(SynnergyError::StateViolation("challenge window has not yet elapsed".into()));
        }
        match header.status {
            BatchStatus::Pending => {
                header.status = BatchStatus::Finalised;
                state.put(format!("canonroot:{id}").into_bytes(), header.next_state_root.0.to_vec());
            }
            BatchStatus::Challenged => {
                header.status = BatchStatus::Reverted;
            }
            BatchStatus::Finalised | BatchStatus::Reverted => {
                return Err(SynnergyError::StateViolation(format!("batch {id} already finalised")));
            }
        }
        Ok(header.status)
    }
}

impl Default for RollupAggregator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Address;

    #[test]
    fn paused_aggregator_rejects_submission() {
        let mut aggregator = RollupAggregator::new();
        let mut state = StateStore::new();
        aggregator.pause(&mut state);
        let result = aggregator.submit_batch(&mut state, Address::derive(b"s"), vec![b"tx".to_vec()], Hash::ZERO, 0);
        assert!(result.is_err());
    }

    #[test]
    fn state_root_law_holds() {
        let mut aggregator = RollupAggregator::new();
        let mut state = StateStore::new();
        let txs = vec![b"tx1".to_vec(), b"tx2".to_vec()];
        let id = aggregator.submit_batch(&mut state, Address::derive(b"s"), txs.clone(), Hash::ZERO, 0).unwrap();
        let header = aggregator.batch(id).unwrap();
        let mut concat = Vec::new();
        for tx in &txs {
            concat.extend_from_slice(tx);
        }
        assert_eq!(header.next_state_root, Hash::of_concat(&[&Hash::ZERO.0, &concat]));
    }

    #[test]
    fn finalize_before_window_elapses_is_rejected() {
        let mut aggregator = RollupAggregator::new();
        let mut state = StateStore::new();
        let id = aggregator.submit_batch(&mut state, Address::derive(b"s"), vec![b"tx".to_vec()], Hash::ZERO, 0).unwrap();
        assert!(aggregator.finalize_batch(&mut state, id, 100).is_err());
        assert!(aggregator.finalize_batch(&mut state, id, CHALLENGE_WINDOW_SECS + 1).is_ok());
    }

    #[test]
    fn double_finalisation_is_rejected() {
        let mut aggregator = RollupAggregator::new();
        let mut state = StateStore::new();
        let id = aggregator.submit_batch(&mut state, Address::derive(b"s"), vec![b"tx".to_vec()], Hash::ZERO, 0).unwrap();
        aggregator.finalize_batch(&mut state, id, CHALLENGE_WINDOW_SECS + 1).unwrap();
        assert!(aggregator.finalize_batch(&mut state, id, CHALLENGE_WINDOW_SECS + 2).is_err());
    }

    #[test]
    fn batch_tx_bodies_are_persisted_under_the_tx_key_convention() {
        let mut aggregator = RollupAggregator::new();
        let mut state = StateStore::new();
        let txs = vec![b"tx1".to_vec(), b"tx2".to_vec()];
        let id = aggregator.submit_batch(&mut state, Address::derive(b"s"), txs.clone(), Hash::ZERO, 0).unwrap();
        assert_eq!(state.get(&tx_key(id, 0)), Some(&b"tx1".to_vec()));
        assert_eq!(state.get(&tx_key(id, 1)), Some(&b"tx2".to_vec()));
    }

    #[test]
    fn fraud_proof_is_verified_against_the_state_persisted_tx() {
        let mut aggregator = RollupAggregator::new();
        let mut state = StateStore::new();
        let txs = vec![b"tx1".to_vec(), b"tx2".to_vec()];
        let id = aggregator.submit_batch(&mut state, Address::derive(b"s"), txs.clone(), Hash::ZERO, 0).unwrap();

        let leaves: Vec<Hash> = txs.iter().map(|tx| Hash::of(tx)).collect();
        let tree = MerkleTree::new(&leaves).unwrap();
        let proof = tree.proof(1).unwrap();

        let fp = FraudProof { batch_id: id, tx_index: 1, tx: txs[1].clone(), proof };
        aggregator.submit_fraud_proof(&state, fp, 10).unwrap();
        assert_eq!(aggregator.batch(id).unwrap().status, BatchStatus::Challenged);
    }

    #[test]
    fn fraud_proof_against_a_mismatched_tx_is_rejected() {
        let mut aggregator = RollupAggregator::new();
        let mut state = StateStore::new();
        let txs = vec![b"tx1".to_vec(), b"tx2".to_vec()];
        let id = aggregator.submit_batch(&mut state, Address::derive(b"s"), txs.clone(), Hash::ZERO, 0).unwrap();

        let leaves: Vec<Hash> = txs.iter().map(|tx| Hash::of(tx)).collect();
        let tree = MerkleTree::new(&leaves).unwrap();
        let proof = tree.proof(1).unwrap();

        let fp = FraudProof { batch_id: id, tx_index: 1, tx: b"forged".to_vec(), proof };
        assert!(aggregator.submit_fraud_proof(&state, fp, 10).is_err());
    }
}
