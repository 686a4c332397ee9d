//! Plasma coordinator: deposits into and monotonic-nonce exits from a
//! per-token plasma bridge address (spec §4.11).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::balance::BalanceTable;
use crate::error::{Result, SynnergyError};
use crate::types::{Address, TokenId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deposit {
    pub nonce: u64,
    pub from: Address,
    pub token: TokenId,
    pub amount: u64,
    pub plasma_block: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exit {
    pub nonce: u64,
    pub owner: Address,
    pub token: TokenId,
    pub amount: u64,
    pub block: u64,
    pub finalised: bool,
}

pub struct PlasmaCoordinator {
    next_deposit_nonce: u64,
    next_exit_nonce: u64,
    deposits: HashMap<u64, Deposit>,
    exits: HashMap<u64, Exit>,
}

impl PlasmaCoordinator {
    pub fn new() -> Self {
        PlasmaCoordinator { next_deposit_nonce: 0, next_exit_nonce: 0, deposits: HashMap::new(), exits: HashMap::new() }
    }

    fn bridge_address(token: TokenId) -> Address {
        Address::escrow(b"plasma", &token.0.to_be_bytes())
    }

    pub fn get_deposit(&self, nonce: u64) -> Option<&Deposit> {
        self.deposits.get(&nonce)
    }

    pub fn get_exit(&self, nonce: u64) -> Option<&Exit> {
        self.exits.get(&nonce)
    }

    /// Transfer tokens from the user to the per-token plasma-bridge address,
    /// assign a monotonic nonce, and persist the deposit record (spec §4.11).
    pub fn deposit_funds(&mut self, balances: &mut BalanceTable, from: Address, token: TokenId, amount: u64, plasma_block: u64) -> Result<u64> {
        let bridge = Self::bridge_address(token);
        balances.transfer(token, from, bridge, amount)?;
        let nonce = self.next_deposit_nonce;
        self.next_deposit_nonce += 1;
        self.deposits.insert(nonce, Deposit { nonce, from, token, amount, plasma_block });
        Ok(nonce)
    }

    /// Verify the bridge holds sufficient balance, assign a nonce, and
    /// record the exit as not yet finalised (spec §4.11).
    pub fn start_exit(&mut self, balances: &BalanceTable, owner: Address, token: TokenId, amount: u64, block: u64) -> Result<u64> {
        let bridge = Self::bridge_address(token);
        let bridge_balance = balances.balance_of(token, bridge);
        if bridge_balance < amount {
            return Err(SynnergyError::InsufficientBalance { address: bridge.to_string(), balance: bridge_balance, required: amount });
        }
        let nonce = self.next_exit_nonce;
        self.next_exit_nonce += 1;
        self.exits.insert(nonce, Exit { nonce, owner, token, amount, block, finalised: false });
        Ok(nonce)
    }

    /// Transfer the recorded amount from the bridge back to the owner and
    /// flip the finalised flag; rejects double-finalisation (spec §4.11).
    pub fn finalize_exit(&mut self, balances: &mut BalanceTable, nonce: u64) -> Result<()> {
        let exit = self.exits.get_mut(&nonce).ok_or_else(|| SynnergyError::NotFound(format!("exit {nonce}")))?;
        if exit.finalised {
            return Err(SynnergyError::StateViolation(format!("exit {nonce} already finalised")));
        }
        let bridge = Self::bridge_address(exit.token);
        balances.transfer(exit.token, bridge, exit.owner, exit.amount)?;
        exit.finalised = true;
        Ok(())
    }
}

impl Default for PlasmaCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deposit_then_exit_round_trips() {
        let mut plasma = PlasmaCoordinator::new();
        let mut balances = BalanceTable::new();
        let token = TokenId::from_code("SYNN");
        let owner = Address::derive(b"owner");
        balances.mint(token, owner, 500, None).unwrap();

        plasma.deposit_funds(&mut balances, owner, token, 200, 10).unwrap();
        let exit_nonce = plasma.start_exit(&balances, owner, token, 200, 11).unwrap();
        plasma.finalize_exit(&mut balances, exit_nonce).unwrap();

        assert_eq!(balances.balance_of(token, owner), 500);
    }

    #[test]
    fn double_finalisation_is_rejected() {
        let mut plasma = PlasmaCoordinator::new();
        let mut balances = BalanceTable::new();
        let token = TokenId::from_code("SYNN");
        let owner = Address::derive(b"owner");
        balances.mint(token, owner, 500, None).unwrap();

        plasma.deposit_funds(&mut balances, owner, token, 200, 10).unwrap();
        let exit_nonce = plasma.start_exit(&balances, owner, token, 200, 11).unwrap();
        plasma.finalize_exit(&mut balances, exit_nonce).unwrap();
        assert!(plasma.finalize_exit(&mut balances, exit_nonce).is_err());
    }
}
