//! Firewall: disjoint block lists for addresses, tokens, and IPs gating
//! transaction admission (spec §4.14).

use std::collections::HashSet;
use std::net::IpAddr;

use crate::transaction::Transaction;
use crate::types::{Address, TokenId};

#[derive(Debug, Default)]
pub struct Firewall {
    blocked_addresses: HashSet<Address>,
    blocked_tokens: HashSet<TokenId>,
    blocked_ips: HashSet<IpAddr>,
}

impl Firewall {
    pub fn new() -> Self {
        Firewall::default()
    }

    pub fn block_address(&mut self, address: Address) {
        self.blocked_addresses.insert(address);
    }

    pub fn unblock_address(&mut self, address: Address) {
        self.blocked_addresses.remove(&address);
    }

    pub fn is_address_blocked(&self, address: Address) -> bool {
        self.blocked_addresses.contains(&address)
    }

    pub fn block_token(&mut self, token: TokenId) {
        self.blocked_tokens.insert(token);
    }

    pub fn unblock_token(&mut self, token: TokenId) {
        self.blocked_tokens.remove(&token);
    }

    pub fn is_token_blocked(&self, token: TokenId) -> bool {
        self.blocked_tokens.contains(&token)
    }

    pub fn block_ip(&mut self, ip: IpAddr) {
        self.blocked_ips.insert(ip);
    }

    pub fn unblock_ip(&mut self, ip: IpAddr) {
        self.blocked_ips.remove(&ip);
    }

    pub fn is_ip_blocked(&self, ip: IpAddr) -> bool {
        self.blocked_ips.contains(&ip)
    }

    /// Rejects a transaction whose sender or recipient address is blocked,
    /// or whose token transfers touch a blocked address or blocked token
    /// (spec §4.14).
    pub fn check_tx(&self, tx: &Transaction) -> bool {
        if self.is_address_blocked(tx.from) || self.is_address_blocked(tx.to) {
            return false;
        }
        if let Some(transfers) = &tx.token_transfers {
            for transfer in transfers {
                if self.is_token_blocked(transfer.token)
                    || self.is_address_blocked(transfer.from)
                    || self.is_address_blocked(transfer.to)
                {
                    return false;
                }
            }
        }
        true
    }

    /// Rejects a connection from a blocked source IP (spec §4.14).
    pub fn check_connection(&self, ip: IpAddr) -> bool {
        !self.is_ip_blocked(ip)
    }
}
