//! Per-token balance table: (TokenId, Address) -> amount (spec §3, §4.1).

use std::collections::HashMap;

use crate::error::{Result, SynnergyError};
use crate::types::{Address, TokenId};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BalanceTable {
    balances: HashMap<(TokenId, Address), u64>,
    /// Running total minted/burned per token, used for the supply-cap invariant (spec §8).
    supply: HashMap<TokenId, u64>,
}

impl BalanceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, token: TokenId, address: Address) -> u64 {
        *self.balances.get(&(token, address)).unwrap_or(&0)
    }

    pub fn total_supply(&self, token: TokenId) -> u64 {
        *self.supply.get(&token).unwrap_or(&0)
    }

    /// Mint `amount` of `token` to `to`. Rejects a zero amount (spec §8 scenario 1).
    pub fn mint(&mut self, token: TokenId, to: Address, amount: u64, max_supply: Option<u64>) -> Result<()> {
        if amount == 0 {
            return Err(SynnergyError::InvalidInput("mint amount must be positive".into()));
        }
        let new_supply = self.total_supply(token).saturating_add(amount);
        if let Some(cap) = max_supply {
            if new_supply > cap {
                return Err(SynnergyError::ResourceExhausted(format!(
                    "mint of {amount} would exceed max supply {cap} for {token}"
                )));
            }
        }
        *self.balances.entry((token, to)).or_insert(0) += amount;
        self.supply.insert(token, new_supply);
        Ok(())
    }

    /// Burn `amount` of `token` from `from`.
    pub fn burn(&mut self, token: TokenId, from: Address, amount: u64) -> Result<()> {
        if amount == 0 {
            return Err(SynnergyError::InvalidInput("burn amount must be positive".into()));
        }
        let balance = self.balance_of(token, from);
        if balance < amount {
            return Err(SynnergyError::InsufficientBalance {
                address: from.to_string(),
                balance,
                required: amount,
            });
        }
        self.balances.insert((token, from), balance - amount);
        let supply = self.total_supply(token);
        self.supply.insert(token, supply.saturating_sub(amount));
        Ok(())
    }

    /// Transfer `amount` of `token` from `from` to `to`.
    pub fn transfer(&mut self, token: TokenId, from: Address, to: Address, amount: u64) -> Result<()> {
        if amount == 0 {
            return Err(SynnergyError::InvalidInput("transfer amount must be positive".into()));
        }
        let from_balance = self.balance_of(token, from);
        if from_balance < amount {
            return Err(SynnergyError::InsufficientBalance {
                address: from.to_string(),
                balance: from_balance,
                required: amount,
            });
        }
        self.balances.insert((token, from), from_balance - amount);
        *self.balances.entry((token, to)).or_insert(0) += amount;
        Ok(())
    }

    /// Sum of all balances for a token — used to verify the conservation invariant (spec §8).
    pub fn sum_balances(&self, token: TokenId) -> u64 {
        self.balances
            .iter()
            .filter(|((t, _), _)| *t == token)
            .map(|(_, v)| *v)
            .sum()
    }

    /// Enumerate every non-zero (token, address, amount) entry, for snapshotting.
    pub fn iter_balances(&self) -> impl Iterator<Item = (TokenId, Address, u64)> + '_ {
        self.balances.iter().map(|(&(token, addr), &amount)| (token, addr, amount))
    }

    /// Enumerate every (token, running supply) entry, for snapshotting.
    pub fn iter_supply(&self) -> impl Iterator<Item = (TokenId, u64)> + '_ {
        self.supply.iter().map(|(&token, &amount)| (token, amount))
    }

    /// Restore a raw balance entry without going through `mint`'s validation
    /// (used when rehydrating a snapshot that was already validated on write).
    pub fn set_balance(&mut self, token: TokenId, address: Address, amount: u64) {
        self.balances.insert((token, address), amount);
    }

    /// Restore a raw running-supply entry (see [`Self::set_balance`]).
    pub fn set_supply(&mut self, token: TokenId, amount: u64) {
        self.supply.insert(token, amount);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> TokenId {
        TokenId::from_code("SYNN")
    }

    #[test]
    fn mint_then_balance_of() {
        let mut table = BalanceTable::new();
        let addr = Address::derive(b"AA");
        table.mint(token(), addr, 500, None).unwrap();
        assert_eq!(table.balance_of(token(), addr), 500);
    }

    #[test]
    fn mint_zero_is_rejected() {
        let mut table = BalanceTable::new();
        let addr = Address::derive(b"AA");
        assert!(table.mint(token(), addr, 0, None).is_err());
    }

    #[test]
    fn conservation_holds_after_transfer() {
        let mut table = BalanceTable::new();
        let a = Address::derive(b"A");
        let b = Address::derive(b"B");
        table.mint(token(), a, 100, None).unwrap();
        table.transfer(token(), a, b, 40).unwrap();
        assert_eq!(table.sum_balances(token()), table.total_supply(token()));
    }

    #[test]
    fn mint_respects_supply_cap() {
        let mut table = BalanceTable::new();
        let a = Address::derive(b"A");
        table.mint(token(), a, 100, Some(100)).unwrap();
        assert!(table.mint(token(), a, 1, Some(100)).is_err());
    }
}
