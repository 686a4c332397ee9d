//! Immutability enforcer: guards the genesis block against tampering
//! (spec §4.7).

use crate::block::Block;
use crate::error::{Result, SynnergyError};
use crate::types::Hash;

pub struct ImmutabilityEnforcer {
    genesis_hash: Hash,
    genesis_block: Block,
}

impl ImmutabilityEnforcer {
    pub fn new(genesis_block: Block) -> Self {
        ImmutabilityEnforcer { genesis_hash: genesis_block.hash, genesis_block }
    }

    pub fn genesis_hash(&self) -> Hash {
        self.genesis_hash
    }

    /// Walk the chain confirming `block[i].parent_hash == block[i-1].hash`
    /// for all i > 0 and `chain[0].hash == stored genesis hash`.
    pub fn verify_chain(&self, chain: &[Block]) -> Result<()> {
        let first = chain.first().ok_or_else(|| SynnergyError::StateViolation("chain is empty".into()))?;
        if first.hash != self.genesis_hash {
            return Err(SynnergyError::StateViolation("chain[0] does not match recorded genesis hash".into()));
        }
        for i in 1..chain.len() {
            if chain[i].header.parent_hash != chain[i - 1].hash {
                return Err(SynnergyError::StateViolation(format!(
                    "block {} parent hash does not match block {}'s hash",
                    i, i - 1
                )));
            }
        }
        Ok(())
    }

    /// Replace a modified chain[0] with the stored genesis block. Does not
    /// repair deeper tampering — those chains must be rebuilt from a trusted
    /// snapshot (spec §4.7).
    pub fn restore_chain(&self, chain: &mut Vec<Block>) {
        if chain.is_empty() {
            chain.push(self.genesis_block.clone());
        } else {
            chain[0] = self.genesis_block.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{Transaction, TransactionType};
    use crate::types::Address;

    #[test]
    fn verify_chain_accepts_correct_linkage() {
        let genesis = Block::genesis();
        let next = Block::new(1, genesis.hash, vec![], 0, vec![]);
        let enforcer = ImmutabilityEnforcer::new(genesis.clone());
        assert!(enforcer.verify_chain(&[genesis, next]).is_ok());
    }

    #[test]
    fn verify_chain_rejects_tampered_genesis() {
        let genesis = Block::genesis();
        let enforcer = ImmutabilityEnforcer::new(genesis.clone());
        let tx = Transaction::new(TransactionType::Payment, Address::derive(b"a"), Address::derive(b"b"), 1, 0, 0, 0, vec![]).unwrap();
        let tampered = Block::new(0, Hash::ZERO, vec![], 0, vec![tx]);
        assert!(enforcer.verify_chain(&[tampered]).is_err());
    }

    #[test]
    fn restore_chain_replaces_only_genesis() {
        let genesis = Block::genesis();
        let next = Block::new(1, genesis.hash, vec![], 0, vec![]);
        let enforcer = ImmutabilityEnforcer::new(genesis.clone());
        let tx = Transaction::new(TransactionType::Payment, Address::derive(b"a"), Address::derive(b"b"), 1, 0, 0, 0, vec![]).unwrap();
        let mut chain = vec![Block::new(0, Hash::ZERO, vec![], 0, vec![tx]), next.clone()];
        enforcer.restore_chain(&mut chain);
        assert_eq!(chain[0], genesis);
        assert_eq!(chain[1], next);
    }
}
