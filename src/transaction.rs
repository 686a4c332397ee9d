//! Transaction type (spec §3). Grounded on `gillean::transaction::Transaction`,
//! generalised to the spec's field set: payment / contract-call / reversal,
//! an optional contract-deploy attachment, an optional token-transfer list,
//! an optional state-change map, and the reversal-only original-tx-hash +
//! authority-signature fields.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::crypto::RecoverableSignature;
use crate::error::{Result, SynnergyError};
use crate::types::{Address, Hash, TokenId};
use crate::utils::now_secs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    Payment,
    ContractCall,
    Reversal,
}

/// A single token movement bundled into a transaction (spec §3, §4.1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenTransfer {
    pub token: TokenId,
    pub from: Address,
    pub to: Address,
    pub amount: u64,
}

/// Bytecode attached to a contract-deploying transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractDeploy {
    pub bytecode: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub tx_type: TransactionType,
    pub from: Address,
    pub to: Address,
    pub value: u64,
    pub nonce: u64,
    pub gas_limit: u64,
    pub gas_price: u64,
    pub payload: Vec<u8>,
    pub timestamp: i64,
    pub hash: Hash,
    pub contract_deploy: Option<ContractDeploy>,
    pub token_transfers: Option<Vec<TokenTransfer>>,
    pub state_changes: Option<BTreeMap<Vec<u8>, Vec<u8>>>,
    pub original_tx_hash: Option<Hash>,
    pub authority_signatures: Option<Vec<RecoverableSignature>>,
}

impl Transaction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tx_type: TransactionType,
        from: Address,
        to: Address,
        value: u64,
        nonce: u64,
        gas_limit: u64,
        gas_price: u64,
        payload: Vec<u8>,
    ) -> Result<Self> {
        let timestamp = now_secs();
        let mut tx = Transaction {
            tx_type,
            from,
            to,
            value,
            nonce,
            gas_limit,
            gas_price,
            payload,
            timestamp,
            hash: Hash::ZERO,
            contract_deploy: None,
            token_transfers: None,
            state_changes: None,
            original_tx_hash: None,
            authority_signatures: None,
        };
        tx.hash = tx.compute_hash();
        tx.validate()?;
        Ok(tx)
    }

    /// Build a reversal of a prior transaction, signed by the authority set.
    pub fn new_reversal(
        from: Address,
        to: Address,
        value: u64,
        nonce: u64,
        original_tx_hash: Hash,
        authority_signatures: Vec<RecoverableSignature>,
    ) -> Result<Self> {
        let mut tx = Transaction::new(
            TransactionType::Reversal,
            from,
            to,
            value,
            nonce,
            0,
            0,
            Vec::new(),
        )?;
        tx.original_tx_hash = Some(original_tx_hash);
        tx.authority_signatures = Some(authority_signatures);
        tx.hash = tx.compute_hash();
        Ok(tx)
    }

    /// Attach token transfers and recompute the hash (builder step used
    /// between `new` and submission, e.g. for contract-call transactions
    /// that move tokens as part of their effect).
    pub fn with_token_transfers(mut self, transfers: Vec<TokenTransfer>) -> Result<Self> {
        self.token_transfers = Some(transfers);
        self.hash = self.compute_hash();
        self.validate()?;
        Ok(self)
    }

    /// Attach a contract-deploy payload and recompute the hash.
    pub fn with_contract_deploy(mut self, deploy: ContractDeploy) -> Result<Self> {
        self.contract_deploy = Some(deploy);
        self.hash = self.compute_hash();
        self.validate()?;
        Ok(self)
    }

    /// Canonical serialisation of every field but `hash` itself, hashed with SHA-256.
    fn compute_hash(&self) -> Hash {
        let mut buf = Vec::new();
        buf.extend_from_slice(&[self.tx_type as u8]);
        buf.extend_from_slice(&self.from.0);
        buf.extend_from_slice(&self.to.0);
        buf.extend_from_slice(&self.value.to_be_bytes());
        buf.extend_from_slice(&self.nonce.to_be_bytes());
        buf.extend_from_slice(&self.gas_limit.to_be_bytes());
        buf.extend_from_slice(&self.gas_price.to_be_bytes());
        buf.extend_from_slice(&self.payload);
        buf.extend_from_slice(&self.timestamp.to_be_bytes());
        if let Some(deploy) = &self.contract_deploy {
            buf.extend_from_slice(&deploy.bytecode);
        }
        if let Some(transfers) = &self.token_transfers {
            for t in transfers {
                buf.extend_from_slice(&t.token.0.to_be_bytes());
                buf.extend_from_slice(&t.from.0);
                buf.extend_from_slice(&t.to.0);
                buf.extend_from_slice(&t.amount.to_be_bytes());
            }
        }
        if let Some(changes) = &self.state_changes {
            for (k, v) in changes {
                buf.extend_from_slice(k);
                buf.extend_from_slice(v);
            }
        }
        if let Some(orig) = &self.original_tx_hash {
            buf.extend_from_slice(&orig.0);
        }
        Hash::of(&buf)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tx_type != TransactionType::Reversal && self.from.is_zero() {
            return Err(SynnergyError::InvalidInput("sender cannot be the zero address".into()));
        }
        if self.tx_type == TransactionType::Reversal {
            if self.original_tx_hash.is_none() {
                return Err(SynnergyError::InvalidInput(
                    "reversal must reference an original transaction hash".into(),
                ));
            }
            if self.authority_signatures.as_ref().map(|s| s.is_empty()).unwrap_or(true) {
                return Err(SynnergyError::Unauthorised(
                    "reversal requires at least one authority signature".into(),
                ));
            }
        }
        if self.hash != self.compute_hash() {
            return Err(SynnergyError::InvalidInput("transaction hash does not match contents".into()));
        }
        Ok(())
    }

    pub fn fee(&self) -> u64 {
        self.gas_limit.saturating_mul(self.gas_price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic_for_same_contents() {
        let from = Address::derive(b"alice");
        let to = Address::derive(b"bob");
        let tx1 = Transaction::new(TransactionType::Payment, from, to, 10, 0, 21000, 1, vec![]).unwrap();
        assert_eq!(tx1.hash, tx1.compute_hash());
    }

    #[test]
    fn reversal_requires_signatures() {
        let from = Address::derive(b"authority");
        let to = Address::derive(b"victim");
        let result = Transaction::new_reversal(from, to, 10, 0, Hash::of(b"orig"), vec![]);
        assert!(result.is_err());
    }

    #[test]
    fn fee_is_limit_times_price() {
        let from = Address::derive(b"alice");
        let to = Address::derive(b"bob");
        let tx = Transaction::new(TransactionType::Payment, from, to, 10, 0, 21000, 5, vec![]).unwrap();
        assert_eq!(tx.fee(), 105000);
    }
}
