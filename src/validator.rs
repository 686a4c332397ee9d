//! Validator manager: stake accounting for PoS validators (spec §4.5).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::balance::BalanceTable;
use crate::error::{Result, SynnergyError};
use crate::types::{Address, TokenId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorRecord {
    pub address: Address,
    pub staked: u64,
    pub active: bool,
}

/// Tracks registered validators and moves stake to/from a single staking
/// account in the ledger's balance table (spec invariant: staking-account
/// balance equals the sum of all active stakes).
#[derive(Debug, Clone)]
pub struct ValidatorManager {
    staking_account: Address,
    stake_token: TokenId,
    validators: HashMap<Address, ValidatorRecord>,
}

impl ValidatorManager {
    pub fn new(staking_account: Address, stake_token: TokenId) -> Self {
        ValidatorManager { staking_account, stake_token, validators: HashMap::new() }
    }

    pub fn get(&self, addr: Address) -> Option<&ValidatorRecord> {
        self.validators.get(&addr)
    }

    pub fn is_active(&self, addr: Address) -> bool {
        self.validators.get(&addr).map(|v| v.active).unwrap_or(false)
    }

    pub fn total_staked(&self) -> u64 {
        self.validators.values().filter(|v| v.active).map(|v| v.staked).sum()
    }

    /// Move `stake` tokens from `addr` to the staking account and register a record.
    pub fn register(&mut self, balances: &mut BalanceTable, addr: Address, stake: u64) -> Result<()> {
        if stake == 0 {
            return Err(SynnergyError::InvalidInput("stake must be positive".into()));
        }
        if self.validators.contains_key(&addr) {
            return Err(SynnergyError::InvalidInput(format!("{addr} is already a registered validator")));
        }
        balances.transfer(self.stake_token, addr, self.staking_account, stake)?;
        self.validators.insert(addr, ValidatorRecord { address: addr, staked: stake, active: true });
        Ok(())
    }

    /// Return the full stake to `addr` and delete its record.
    pub fn deregister(&mut self, balances: &mut BalanceTable, addr: Address) -> Result<()> {
        let record = self
            .validators
            .remove(&addr)
            .ok_or_else(|| SynnergyError::NotFound(format!("validator {addr}")))?;
        if record.staked > 0 {
            balances.transfer(self.stake_token, self.staking_account, addr, record.staked)?;
        }
        Ok(())
    }

    pub fn stake(&mut self, balances: &mut BalanceTable, addr: Address, amount: u64) -> Result<()> {
        if amount == 0 {
            return Err(SynnergyError::InvalidInput("stake amount must be positive".into()));
        }
        let record = self
            .validators
            .get_mut(&addr)
            .ok_or_else(|| SynnergyError::NotFound(format!("validator {addr}")))?;
        balances.transfer(self.stake_token, addr, self.staking_account, amount)?;
        record.staked += amount;
        record.active = true;
        Ok(())
    }

    pub fn unstake(&mut self, balances: &mut BalanceTable, addr: Address, amount: u64) -> Result<()> {
        if amount == 0 {
            return Err(SynnergyError::InvalidInput("unstake amount must be positive".into()));
        }
        let record = self
            .validators
            .get_mut(&addr)
            .ok_or_else(|| SynnergyError::NotFound(format!("validator {addr}")))?;
        if record.staked < amount {
            return Err(SynnergyError::InsufficientStake {
                address: addr.to_string(),
                staked: record.staked,
                required: amount,
            });
        }
        balances.transfer(self.stake_token, self.staking_account, addr, amount)?;
        record.staked -= amount;
        if record.staked == 0 {
            record.active = false;
        }
        Ok(())
    }

    /// Burn up to `amount` of the staked amount (caps at available stake per
    /// the more defensive of the source variants); marks the validator
    /// inactive if stake reaches zero.
    pub fn slash(&mut self, balances: &mut BalanceTable, addr: Address, amount: u64) -> Result<u64> {
        let record = self
            .validators
            .get_mut(&addr)
            .ok_or_else(|| SynnergyError::NotFound(format!("validator {addr}")))?;
        let burned = amount.min(record.staked);
        if burned > 0 {
            balances.burn(self.stake_token, self.staking_account, burned)?;
            record.staked -= burned;
        }
        if record.staked == 0 {
            record.active = false;
        }
        Ok(burned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (ValidatorManager, BalanceTable, Address, TokenId) {
        let token = TokenId::from_code("SYNN");
        let staking = Address::derive(b"staking-account");
        let mut balances = BalanceTable::new();
        let validator = Address::derive(b"validator-1");
        balances.mint(token, validator, 1_000, None).unwrap();
        (ValidatorManager::new(staking, token), balances, validator, token)
    }

    #[test]
    fn register_moves_stake_to_staking_account() {
        let (mut mgr, mut balances, validator, token) = setup();
        mgr.register(&mut balances, validator, 500).unwrap();
        assert_eq!(balances.balance_of(token, validator), 500);
        assert_eq!(mgr.total_staked(), 500);
        assert!(mgr.is_active(validator));
    }

    #[test]
    fn slash_caps_at_available_stake() {
        let (mut mgr, mut balances, validator, _token) = setup();
        mgr.register(&mut balances, validator, 500).unwrap();
        let burned = mgr.slash(&mut balances, validator, 10_000).unwrap();
        assert_eq!(burned, 500);
        assert!(!mgr.is_active(validator));
        assert_eq!(mgr.get(validator).unwrap().staked, 0);
    }

    #[test]
    fn deregister_returns_full_stake() {
        let (mut mgr, mut balances, validator, token) = setup();
        mgr.register(&mut balances, validator, 500).unwrap();
        mgr.deregister(&mut balances, validator).unwrap();
        assert_eq!(balances.balance_of(token, validator), 1_000);
        assert!(mgr.get(validator).is_none());
    }
}
