//! Contract storage record (spec §3): address derived from (creator, nonce).

use serde::{Deserialize, Serialize};

use crate::types::Address;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub address: Address,
    pub bytecode: Vec<u8>,
}

impl Contract {
    pub fn new(creator: Address, nonce: u64, bytecode: Vec<u8>) -> Self {
        let mut seed = Vec::with_capacity(28);
        seed.extend_from_slice(&creator.0);
        seed.extend_from_slice(&nonce.to_be_bytes());
        Contract { address: Address::derive(&seed), bytecode }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_is_deterministic_in_creator_and_nonce() {
        let creator = Address::derive(b"deployer");
        let a = Contract::new(creator, 0, vec![1, 2, 3]);
        let b = Contract::new(creator, 0, vec![9]);
        let c = Contract::new(creator, 1, vec![1, 2, 3]);
        assert_eq!(a.address, b.address);
        assert_ne!(a.address, c.address);
    }
}
