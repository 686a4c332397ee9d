//! Execution engine: three bytecode backends sharing one context and
//! receipt shape (spec §4.2). Grounded on `gillean::smart_contract`'s
//! `ContractContext`/`ContractResult`/stack-VM shape, generalised to the
//! spec's super-light / light / heavy three-way split and gas-metered
//! common context.

pub mod heavy;
pub mod light;
pub mod super_light;

use crate::error::Result;
use crate::gas::GasMeter;
use crate::types::{Address, Hash};

/// Context fields visible to opcodes (spec §4.2).
#[derive(Debug, Clone)]
pub struct ChainContext {
    pub block_number: u64,
    pub block_time: i64,
    pub difficulty: u32,
    pub block_gas_limit: u64,
    pub chain_id: u64,
    pub block_hash: Hash,
}

/// Per-call-frame state passed to a backend. Owns the gas meter and the
/// jump-destination set; the caller supplies a [`Host`] for state access.
pub struct ExecutionContext<'a> {
    pub caller: Address,
    pub origin: Address,
    pub tx_hash: Hash,
    pub code: &'a [u8],
    pub input: &'a [u8],
    pub value: u64,
    pub gas: GasMeter,
    pub chain: ChainContext,
    pub last_return_data: Vec<u8>,
}

/// Host callback surface a backend uses to touch ledger state. Implemented
/// by the ledger so the three backends never see `Ledger` directly (spec §9:
/// "dynamic dispatch across VM backends... do not share code between the
/// stack interpreter and the sandbox runner").
pub trait Host {
    fn get_balance(&self, token_symbol: &str, address: Address) -> u64;
    fn transfer(&mut self, token_symbol: &str, from: Address, to: Address, amount: u64) -> Result<()>;
    fn state_get(&self, key: &[u8]) -> Option<Vec<u8>>;
    fn state_put(&mut self, key: &[u8], value: &[u8]);
    fn emit_log(&mut self, address: Address, topics: Vec<Hash>, data: Vec<u8>);
}

/// Structured log emitted by LOG0..LOG4.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub address: Address,
    pub topics: Vec<Hash>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExecStatus {
    Success,
    Fail,
}

/// Execution outcome (spec §4.2).
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    pub status: ExecStatus,
    pub gas_used: u64,
    pub return_data: Vec<u8>,
    pub logs: Vec<LogEntry>,
    pub error: Option<String>,
}

impl Receipt {
    pub fn success(gas_used: u64, return_data: Vec<u8>, logs: Vec<LogEntry>) -> Self {
        Receipt { status: ExecStatus::Success, gas_used, return_data, logs, error: None }
    }

    pub fn failure(gas_used: u64, error: impl Into<String>) -> Self {
        Receipt { status: ExecStatus::Fail, gas_used, return_data: Vec::new(), logs: Vec::new(), error: Some(error.into()) }
    }
}

/// The one capability all three backends share (spec §9).
pub trait VmBackend {
    fn execute(&self, ctx: ExecutionContext<'_>, host: &mut dyn Host) -> Result<Receipt>;
}

/// Selection policy: bytecode length determines which backend runs it
/// (spec §4.2).
pub enum SelectedBackend {
    SuperLight,
    Light,
    Heavy,
}

pub fn select_backend(bytecode_len: usize) -> SelectedBackend {
    if bytecode_len < 100 {
        SelectedBackend::SuperLight
    } else if bytecode_len < 1000 {
        SelectedBackend::Light
    } else {
        SelectedBackend::Heavy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_policy_follows_length_thresholds() {
        assert!(matches!(select_backend(10), SelectedBackend::SuperLight));
        assert!(matches!(select_backend(500), SelectedBackend::Light));
        assert!(matches!(select_backend(5000), SelectedBackend::Heavy));
    }
}
