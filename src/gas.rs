//! Gas accounting: a base-cost table mapping each opcode (and select
//! high-level ledger operations) to a fixed cost, plus the gas meter that
//! charges it before the corresponding handler executes (spec §4.3).

use std::collections::HashMap;

use crate::error::{Result, SynnergyError};

/// Every operation the gas schedule prices: the Light VM's opcode set
/// (spec §4.2) plus a handful of high-level ledger operations that are
/// metered the same way (token transfer, cross-chain bridge registration).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Gt,
    SLt,
    SGt,
    Eq,
    IsZero,
    And,
    Or,
    Xor,
    Not,
    Shl,
    Shr,
    Byte,
    Sha256,
    Keccak256,
    Ripemd160,
    Blake2b256,
    MLoad,
    MStore,
    CallDataLoad,
    CallDataCopy,
    CodeLoad,
    CodeCopy,
    Jump,
    JumpI,
    JumpDest,
    Pc,
    MSize,
    Gas,
    Address,
    Caller,
    Origin,
    CallValue,
    GasPrice,
    BlockNumber,
    Timestamp,
    Difficulty,
    GasLimit,
    ChainId,
    BlockHash,
    Balance,
    Log0,
    Log1,
    Log2,
    Log3,
    Log4,
    Create,
    Call,
    CallCode,
    DelegateCall,
    StaticCall,
    Return,
    Revert,
    Stop,
    SelfDestruct,
    Push,
    Pop,
    Dup,
    Swap,
    SLoad,
    SStore,
    /// Fallback default cost for any opcode not listed above (punitive).
    Unknown,
    /// Ledger-level operations priced by the same schedule (spec §4.3).
    TokenTransfer,
    CrossChainRegister,
    ContractCreate,
}

/// Base cost table: opcode -> cost. Unlisted ops use [`Op::Unknown`]'s
/// punitive default.
#[derive(Debug, Clone)]
pub struct GasSchedule {
    costs: HashMap<Op, u64>,
}

impl Default for GasSchedule {
    fn default() -> Self {
        use Op::*;
        let mut costs = HashMap::new();
        for op in [Add, Sub, Mul, Div, Mod, Lt, Gt, SLt, SGt, Eq, IsZero, And, Or, Xor, Not, Shl, Shr, Byte] {
            costs.insert(op, 3);
        }
        costs.insert(Sha256, 60);
        costs.insert(Keccak256, 30);
        costs.insert(Ripemd160, 120);
        costs.insert(Blake2b256, 40);
        costs.insert(MLoad, 3);
        costs.insert(MStore, 3);
        costs.insert(CallDataLoad, 3);
        costs.insert(CallDataCopy, 3);
        costs.insert(CodeLoad, 3);
        costs.insert(CodeCopy, 3);
        costs.insert(Jump, 8);
        costs.insert(JumpI, 10);
        costs.insert(JumpDest, 1);
        costs.insert(Pc, 2);
        costs.insert(MSize, 2);
        costs.insert(Gas, 2);
        for op in [Address, Caller, Origin, CallValue, GasPrice, BlockNumber, Timestamp, Difficulty, GasLimit, ChainId, BlockHash] {
            costs.insert(op, 2);
        }
        costs.insert(Balance, 400);
        for (op, cost) in [(Log0, 375), (Log1, 750), (Log2, 1125), (Log3, 1500), (Log4, 1875)] {
            costs.insert(op, cost);
        }
        costs.insert(Create, 32000);
        costs.insert(Call, 700);
        costs.insert(CallCode, 700);
        costs.insert(DelegateCall, 700);
        costs.insert(StaticCall, 700);
        costs.insert(Return, 0);
        costs.insert(Revert, 0);
        costs.insert(Stop, 0);
        costs.insert(SelfDestruct, 5000);
        costs.insert(Push, 3);
        costs.insert(Pop, 2);
        costs.insert(Dup, 3);
        costs.insert(Swap, 3);
        costs.insert(SLoad, 200);
        costs.insert(SStore, 5000);
        costs.insert(Unknown, 100_000);
        costs.insert(TokenTransfer, 21000);
        costs.insert(CrossChainRegister, 50000);
        costs.insert(ContractCreate, 32000);
        GasSchedule { costs }
    }
}

impl GasSchedule {
    pub fn cost_of(&self, op: Op) -> u64 {
        *self.costs.get(&op).unwrap_or_else(|| self.costs.get(&Op::Unknown).unwrap())
    }

    /// Dynamic per-word memory-expansion surcharge, added by opcode handlers
    /// on top of the base cost (spec §4.3).
    pub fn memory_expansion_cost(words_added: u64) -> u64 {
        words_added.saturating_mul(3)
    }
}

/// Tracks gas used against a fixed limit for one execution.
#[derive(Debug, Clone)]
pub struct GasMeter {
    pub used: u64,
    pub limit: u64,
    schedule: GasSchedule,
}

impl GasMeter {
    pub fn new(limit: u64) -> Self {
        GasMeter { used: 0, limit, schedule: GasSchedule::default() }
    }

    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.used)
    }

    /// Charge the cost of `op` before its handler runs; out-of-gas aborts.
    pub fn consume(&mut self, op: Op) -> Result<()> {
        self.consume_amount(self.schedule.cost_of(op))
    }

    pub fn consume_amount(&mut self, amount: u64) -> Result<()> {
        if self.used.saturating_add(amount) > self.limit {
            return Err(SynnergyError::ResourceExhausted(format!(
                "out of gas: used {} + cost {} > limit {}",
                self.used, amount, self.limit
            )));
        }
        self.used += amount;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_op_is_punitive() {
        let schedule = GasSchedule::default();
        assert!(schedule.cost_of(Op::Unknown) > schedule.cost_of(Op::Add));
    }

    #[test]
    fn meter_rejects_when_over_limit() {
        let mut meter = GasMeter::new(10);
        assert!(meter.consume(Op::Add).is_ok());
        assert!(meter.consume(Op::Create).is_err());
    }

    #[test]
    fn meter_tracks_remaining() {
        let mut meter = GasMeter::new(100);
        meter.consume_amount(40).unwrap();
        assert_eq!(meter.remaining(), 60);
    }
}
