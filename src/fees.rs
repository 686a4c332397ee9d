//! Fee distributor: splits `gas_limit * gas_price` across the reward pools
//! on every successfully applied transaction (spec §4.4).

use crate::types::{Address, TokenId};

/// Addresses the fee distributor pays into. The miner-and-validator pool is
/// itself split 50:39:20 across these three addresses.
#[derive(Debug, Clone)]
pub struct FeePools {
    pub miner: Address,
    pub pos_validator_pool: Address,
    pub poh_validator_pool: Address,
    pub identity_token_holders: Address,
    pub loan_pool: Address,
    pub charity_pool: Address,
    pub authority_nodes: Address,
}

/// The concrete amount paid into each pool for one fee split, in fee-token units.
#[derive(Debug, Clone, PartialEq)]
pub struct FeeDistribution {
    pub miner: u64,
    pub pos_validator_pool: u64,
    pub poh_validator_pool: u64,
    pub identity_token_holders: u64,
    pub loan_pool: u64,
    pub charity_pool: u64,
    pub authority_nodes: u64,
}

impl FeeDistribution {
    pub fn total(&self) -> u64 {
        self.miner
            + self.pos_validator_pool
            + self.poh_validator_pool
            + self.identity_token_holders
            + self.loan_pool
            + self.charity_pool
            + self.authority_nodes
    }
}

/// Splits a fee 70/5/10/10/5 (miner-and-validators / identity / loan /
/// charity / authority), then splits the 70% share 50:39:20 across miner,
/// PoS pool, PoH pool. Divide-before-multiply throughout to avoid overflow;
/// any remainder from integer division is folded into the last-computed
/// share within each split so the total always equals `fee` exactly
/// (spec §4.4, §8: fee conservation).
pub fn split_fee(fee: u64) -> FeeDistribution {
    let miner_validators = (fee / 100) * 70;
    let identity = (fee / 100) * 5;
    let loan = (fee / 100) * 10;
    let charity = (fee / 100) * 10;
    // authority takes the remainder so the five-way split sums to `fee` exactly.
    let authority = fee - miner_validators - identity - loan - charity;

    let miner = (miner_validators / 100) * 50;
    let pos = (miner_validators / 100) * 39;
    // PoH pool takes the remainder of the three-way 50:39:20 split.
    let poh = miner_validators - miner - pos;

    FeeDistribution {
        miner,
        pos_validator_pool: pos,
        poh_validator_pool: poh,
        identity_token_holders: identity,
        loan_pool: loan,
        charity_pool: charity,
        authority_nodes: authority,
    }
}

/// Splits `fee` out of `payer`'s own balance and transfers each share to its
/// pool address. Moving existing balance (rather than minting) keeps total
/// supply conserved and respects `LedgerConfig::max_supply` implicitly,
/// since no new tokens are ever created here (spec §8: balance conservation,
/// supply cap).
pub fn distribute(
    balances: &mut crate::balance::BalanceTable,
    pools: &FeePools,
    token: TokenId,
    payer: Address,
    fee: u64,
) -> crate::error::Result<FeeDistribution> {
    let split = split_fee(fee);
    let mut pay = |to: Address, amount: u64| -> crate::error::Result<()> {
        if amount > 0 {
            balances.transfer(token, payer, to, amount)?;
        }
        Ok(())
    };
    pay(pools.miner, split.miner)?;
    pay(pools.pos_validator_pool, split.pos_validator_pool)?;
    pay(pools.poh_validator_pool, split.poh_validator_pool)?;
    pay(pools.identity_token_holders, split.identity_token_holders)?;
    pay(pools.loan_pool, split.loan_pool)?;
    pay(pools.charity_pool, split.charity_pool)?;
    pay(pools.authority_nodes, split.authority_nodes)?;
    Ok(split)
}
