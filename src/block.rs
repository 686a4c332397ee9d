//! Block and SubBlock types (spec §3). Grounded on `gillean::block::Block`
//! (hash-of-header, Merkle tree over transactions, genesis sentinel), adapted
//! to the spec's header/body split and sharded sub-block aggregation.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SynnergyError};
use crate::merkle::MerkleTree;
use crate::transaction::Transaction;
use crate::types::Hash;
use crate::utils::now_secs;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub height: u64,
    pub parent_hash: Hash,
    pub timestamp: i64,
    pub miner_public_key: Vec<u8>,
    pub difficulty: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubBlockHeader {
    pub height: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubBlock {
    pub header: SubBlockHeader,
    pub body: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockBody {
    pub transactions: Vec<Transaction>,
    pub sub_blocks: Vec<SubBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub body: BlockBody,
    pub hash: Hash,
}

impl Block {
    pub fn new(
        height: u64,
        parent_hash: Hash,
        miner_public_key: Vec<u8>,
        difficulty: u32,
        transactions: Vec<Transaction>,
    ) -> Self {
        let header = BlockHeader {
            height,
            parent_hash,
            timestamp: now_secs(),
            miner_public_key,
            difficulty,
        };
        let body = BlockBody { transactions, sub_blocks: Vec::new() };
        let hash = Self::compute_hash(&header);
        Block { header, body, hash }
    }

    pub fn genesis() -> Self {
        Block::new(0, Hash::ZERO, Vec::new(), 0, Vec::new())
    }

    /// Deterministic digest of the header only (spec §3: "Block hash is a
    /// deterministic digest of the header").
    pub fn compute_hash(header: &BlockHeader) -> Hash {
        let mut buf = Vec::new();
        buf.extend_from_slice(&header.height.to_be_bytes());
        buf.extend_from_slice(&header.parent_hash.0);
        buf.extend_from_slice(&header.timestamp.to_be_bytes());
        buf.extend_from_slice(&header.miner_public_key);
        buf.extend_from_slice(&header.difficulty.to_be_bytes());
        Hash::of(&buf)
    }

    pub fn is_genesis(&self) -> bool {
        self.header.height == 0 && self.header.parent_hash == Hash::ZERO
    }

    /// Append a sub-block to the body; rejects a duplicate for the same
    /// height within this block (spec §8 scenario 3).
    pub fn append_sub_block(&mut self, sub_block: SubBlock) -> Result<()> {
        if self
            .body
            .sub_blocks
            .iter()
            .any(|s| s.header.height == sub_block.header.height)
        {
            return Err(SynnergyError::StateViolation(format!(
                "sub-block for height {} already appended",
                sub_block.header.height
            )));
        }
        self.body.sub_blocks.push(sub_block);
        Ok(())
    }

    pub fn validate_linkage(&self, parent: &Block) -> Result<()> {
        if self.header.height != parent.header.height + 1 {
            return Err(SynnergyError::StateViolation(format!(
                "height {} is not parent height {} + 1",
                self.header.height, parent.header.height
            )));
        }
        if self.header.parent_hash != parent.hash {
            return Err(SynnergyError::StateViolation(
                "parent hash does not match stored parent's hash".into(),
            ));
        }
        if self.hash != Self::compute_hash(&self.header) {
            return Err(SynnergyError::InvalidInput("block hash does not match header".into()));
        }
        Ok(())
    }

    pub fn tx_hashes(&self) -> Vec<Hash> {
        self.body.transactions.iter().map(|t| t.hash).collect()
    }

    pub fn merkle_root(&self) -> Option<Hash> {
        MerkleTree::new(&self.tx_hashes()).map(|t| t.root())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_has_zero_parent() {
        let genesis = Block::genesis();
        assert!(genesis.is_genesis());
    }

    #[test]
    fn linkage_rejects_height_mismatch() {
        let genesis = Block::genesis();
        let mut bad = Block::new(2, genesis.hash, vec![], 0, vec![]);
        bad.hash = Block::compute_hash(&bad.header);
        assert!(bad.validate_linkage(&genesis).is_err());
    }

    #[test]
    fn linkage_accepts_correct_chain() {
        let genesis = Block::genesis();
        let next = Block::new(1, genesis.hash, vec![], 0, vec![]);
        assert!(next.validate_linkage(&genesis).is_ok());
    }

    #[test]
    fn duplicate_sub_block_height_rejected() {
        let mut block = Block::genesis();
        let sb = SubBlock { header: SubBlockHeader { height: 0 }, body: vec![] };
        block.append_sub_block(sb.clone()).unwrap();
        assert!(block.append_sub_block(sb).is_err());
    }
}
