//! Sidechain coordinator: per-sidechain validator set and pause/resume gate
//! over header and deposit submission (spec §4.12).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SynnergyError};
use crate::state::StateStore;
use crate::types::Address;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sidechain {
    pub id: u32,
    pub validators: Vec<Address>,
    pub threshold: u8,
    pub paused: bool,
}

pub struct SidechainCoordinator {
    sidechains: HashMap<u32, Sidechain>,
    next_header_seq: HashMap<u32, u64>,
    next_deposit_seq: HashMap<u32, u64>,
}

impl SidechainCoordinator {
    pub fn new() -> Self {
        SidechainCoordinator { sidechains: HashMap::new(), next_header_seq: HashMap::new(), next_deposit_seq: HashMap::new() }
    }

    pub fn register(&mut self, id: u32, validators: Vec<Address>, threshold: u8) -> Result<()> {
        if !(1..=100).contains(&threshold) {
            return Err(SynnergyError::InvalidInput("threshold must be between 1 and 100".into()));
        }
        self.sidechains.insert(id, Sidechain { id, validators, threshold, paused: false });
        Ok(())
    }

    pub fn get(&self, id: u32) -> Option<&Sidechain> {
        self.sidechains.get(&id)
    }

    pub fn pause(&mut self, id: u32) -> Result<()> {
        self.sidechain_mut(id)?.paused = true;
        Ok(())
    }

    pub fn resume(&mut self, id: u32) -> Result<()> {
        self.sidechain_mut(id)?.paused = false;
        Ok(())
    }

    fn sidechain_mut(&mut self, id: u32) -> Result<&mut Sidechain> {
        self.sidechains.get_mut(&id).ok_or_else(|| SynnergyError::NotFound(format!("sidechain {id}")))
    }

    /// Replace the validator set and threshold atomically (spec §4.12).
    pub fn update_validators(&mut self, id: u32, threshold: u8, validators: Vec<Address>) -> Result<()> {
        if !(1..=100).contains(&threshold) {
            return Err(SynnergyError::InvalidInput("threshold must be between 1 and 100".into()));
        }
        let sidechain = self.sidechain_mut(id)?;
        sidechain.threshold = threshold;
        sidechain.validators = validators;
        Ok(())
    }

    /// Submit a header for `id`; rejected while the sidechain is paused
    /// (spec §4.12).
    pub fn submit_header(&mut self, state: &mut StateStore, id: u32, header_bytes: Vec<u8>) -> Result<u64> {
        let sidechain = self.sidechains.get(&id).ok_or_else(|| SynnergyError::NotFound(format!("sidechain {id}")))?;
        if sidechain.paused {
            return Err(SynnergyError::StateViolation(format!("sidechain {id} is paused")));
        }
        let seq = self.next_header_seq.entry(id).or_insert(0);
        let key = format!("sc:hdr:{id}:{seq}").into_bytes();
        state.put(key, header_bytes);
        let assigned = *seq;
        *seq += 1;
        Ok(assigned)
    }

    /// Submit a deposit record for `id`; rejected while the sidechain is
    /// paused (spec §4.12).
    pub fn submit_deposit(&mut self, state: &mut StateStore, id: u32, deposit_bytes: Vec<u8>) -> Result<u64> {
        let sidechain = self.sidechains.get(&id).ok_or_else(|| SynnergyError::NotFound(format!("sidechain {id}")))?;
        if sidechain.paused {
            return Err(SynnergyError::StateViolation(format!("sidechain {id} is paused")));
        }
        let seq = self.next_deposit_seq.entry(id).or_insert(0);
        let key = format!("sc:dep:{id}:{seq}").into_bytes();
        state.put(key, deposit_bytes);
        let assigned = *seq;
        *seq += 1;
        Ok(assigned)
    }

    /// Delete the sidechain's metadata and all of its `sc:hdr:<id>:*` and
    /// `sc:dep:<id>:*` entries via prefix iteration (spec §4.12).
    pub fn remove(&mut self, state: &mut StateStore, id: u32) -> Result<()> {
        self.sidechains.remove(&id).ok_or_else(|| SynnergyError::NotFound(format!("sidechain {id}")))?;
        state.delete_prefix(format!("sc:hdr:{id}:").as_bytes());
        state.delete_prefix(format!("sc:dep:{id}:").as_bytes());
        self.next_header_seq.remove(&id);
        self.next_deposit_seq.remove(&id);
        Ok(())
    }
}

impl Default for SidechainCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paused_sidechain_rejects_header_submission() {
        let mut coord = SidechainCoordinator::new();
        let mut state = StateStore::new();
        coord.register(1, vec![Address::derive(b"v1")], 67).unwrap();
        coord.pause(1).unwrap();
        assert!(coord.submit_header(&mut state, 1, vec![1, 2, 3]).is_err());
        coord.resume(1).unwrap();
        assert!(coord.submit_header(&mut state, 1, vec![1, 2, 3]).is_ok());
    }

    #[test]
    fn remove_clears_all_prefixed_entries() {
        let mut coord = SidechainCoordinator::new();
        let mut state = StateStore::new();
        coord.register(1, vec![Address::derive(b"v1")], 50).unwrap();
        coord.submit_header(&mut state, 1, vec![1]).unwrap();
        coord.submit_header(&mut state, 1, vec![2]).unwrap();
        coord.submit_deposit(&mut state, 1, vec![3]).unwrap();

        coord.remove(&mut state, 1).unwrap();
        assert!(coord.get(1).is_none());
        assert_eq!(state.prefix_iter(b"sc:hdr:1:").count(), 0);
        assert_eq!(state.prefix_iter(b"sc:dep:1:").count(), 0);
    }

    #[test]
    fn register_rejects_invalid_threshold() {
        let mut coord = SidechainCoordinator::new();
        assert!(coord.register(1, vec![], 0).is_err());
        assert!(coord.register(1, vec![], 101).is_err());
    }
}
