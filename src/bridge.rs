//! Cross-chain bridge: relayer-gated bridge registration and lock-and-mint
//! / burn-and-release asset movement, with an SPV proof check on the mint
//! path (spec §4.8).

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::balance::BalanceTable;
use crate::error::{Result, SynnergyError};
use crate::merkle::{MerkleProof, MerkleTree};
use crate::types::{Address, Hash, TokenId};

/// A Merkle-path SPV proof that a lock transaction was included on the
/// source chain (spec §6: "tx hash, Merkle root, sibling hash list, tx index").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpvProof {
    pub tx_hash: Hash,
    pub merkle_root: Hash,
    pub proof: MerkleProof,
}

impl SpvProof {
    pub fn verify(&self) -> bool {
        MerkleTree::verify(self.merkle_root, self.tx_hash, &self.proof)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bridge {
    pub id: Uuid,
    pub source_chain: String,
    pub target_chain: String,
    pub relayer: Address,
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TransferStatus {
    Created,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeTransfer {
    pub id: Uuid,
    pub bridge_id: Uuid,
    pub from: Address,
    pub to: Address,
    pub token: TokenId,
    pub amount: u64,
    pub status: TransferStatus,
}

/// Topics broadcast to the network layer on bridge lifecycle events
/// (spec §6: `bridge:registry`, `bridge:transfer:new`, `bridge:transfer:complete`).
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeEvent {
    Registry(Uuid),
    TransferNew(Uuid),
    TransferComplete(Uuid),
}

pub struct CrossChainBridge {
    authorised_relayers: HashSet<Address>,
    active_connections: HashSet<(String, String)>,
    bridges: HashMap<Uuid, Bridge>,
    transfers: HashMap<Uuid, BridgeTransfer>,
    events: Vec<BridgeEvent>,
}

impl CrossChainBridge {
    pub fn new(authorised_relayers: HashSet<Address>, active_connections: HashSet<(String, String)>) -> Self {
        CrossChainBridge { authorised_relayers, active_connections, bridges: HashMap::new(), transfers: HashMap::new(), events: Vec::new() }
    }

    pub fn events(&self) -> &[BridgeEvent] {
        &self.events
    }

    pub fn bridge(&self, id: Uuid) -> Option<&Bridge> {
        self.bridges.get(&id)
    }

    pub fn transfer(&self, id: Uuid) -> Option<&BridgeTransfer> {
        self.transfers.get(&id)
    }

    /// Register a new bridge between two chains (spec §4.8). `relayer` must
    /// be in the authorised set and a connection must already exist between
    /// the two named chains.
    pub fn register_bridge(&mut self, relayer: Address, source_chain: String, target_chain: String) -> Result<Uuid> {
        if !self.authorised_relayers.contains(&relayer) {
            return Err(SynnergyError::Unauthorised(format!("{relayer} is not an authorised relayer")));
        }
        if !self.active_connections.contains(&(source_chain.clone(), target_chain.clone())) {
            return Err(SynnergyError::InvalidInput(format!(
                "no active connection between {source_chain} and {target_chain}"
            )));
        }
        let id = Uuid::new_v4();
        let bridge = Bridge { id, source_chain, target_chain, relayer, created_at: Utc::now().timestamp() };
        self.bridges.insert(id, bridge);
        self.events.push(BridgeEvent::Registry(id));
        Ok(id)
    }

    /// Escrow address controlled by the protocol for a given bridge.
    pub fn escrow_address(bridge_id: Uuid) -> Address {
        Address::escrow(b"bridge", bridge_id.as_bytes())
    }

    /// Verify `proof`, escrow `amount` of the native asset from `caller`,
    /// then mint the wrapped asset to `caller`. On mint failure, the lock is
    /// rolled back by releasing the escrowed funds back to `caller`
    /// (spec §4.8).
    pub fn lock_and_mint(
        &mut self,
        balances: &mut BalanceTable,
        bridge_id: Uuid,
        caller: Address,
        native_asset: TokenId,
        wrapped_asset: TokenId,
        proof: &SpvProof,
        amount: u64,
        max_wrapped_supply: Option<u64>,
    ) -> Result<()> {
        if !self.bridges.contains_key(&bridge_id) {
            return Err(SynnergyError::NotFound(format!("bridge {bridge_id}")));
        }
        if !proof.verify() {
            return Err(SynnergyError::ProofInvalid("SPV proof does not verify against the supplied root".into()));
        }
        let escrow = Self::escrow_address(bridge_id);
        balances.transfer(native_asset, caller, escrow, amount)?;
        if let Err(err) = balances.mint(wrapped_asset, caller, amount, max_wrapped_supply) {
            balances.transfer(native_asset, escrow, caller, amount)?;
            return Err(err);
        }
        Ok(())
    }

    /// Burn the wrapped asset from `caller` and release the native asset
    /// from escrow to `target`. On release failure, re-mint the wrapped
    /// tokens to `caller` (spec §4.8).
    pub fn burn_and_release(
        &mut self,
        balances: &mut BalanceTable,
        bridge_id: Uuid,
        caller: Address,
        native_asset: TokenId,
        wrapped_asset: TokenId,
        target: Address,
        amount: u64,
        max_wrapped_supply: Option<u64>,
    ) -> Result<()> {
        if !self.bridges.contains_key(&bridge_id) {
            return Err(SynnergyError::NotFound(format!("bridge {bridge_id}")));
        }
        let escrow = Self::escrow_address(bridge_id);
        balances.burn(wrapped_asset, caller, amount)?;
        if let Err(err) = balances.transfer(native_asset, escrow, target, amount) {
            balances.mint(wrapped_asset, caller, amount, max_wrapped_supply)?;
            return Err(err);
        }
        Ok(())
    }

    /// Lock caller's assets in a per-bridge escrow and record a pending
    /// transfer (spec §4.8 BridgeTransfer lifecycle).
    pub fn start_transfer(
        &mut self,
        balances: &mut BalanceTable,
        bridge_id: Uuid,
        from: Address,
        to: Address,
        token: TokenId,
        amount: u64,
    ) -> Result<Uuid> {
        if !self.bridges.contains_key(&bridge_id) {
            return Err(SynnergyError::NotFound(format!("bridge {bridge_id}")));
        }
        let escrow = Self::escrow_address(bridge_id);
        balances.transfer(token, from, escrow, amount)?;
        let id = Uuid::new_v4();
        self.transfers.insert(id, BridgeTransfer { id, bridge_id, from, to, token, amount, status: TransferStatus::Created });
        self.events.push(BridgeEvent::TransferNew(id));
        Ok(id)
    }

    /// Release the escrowed assets to the recipient. Rejects a transfer
    /// already completed (spec §4.8: "Attempting to complete twice is rejected").
    pub fn complete_transfer(&mut self, balances: &mut BalanceTable, transfer_id: Uuid) -> Result<()> {
        let transfer = self
            .transfers
            .get_mut(&transfer_id)
            .ok_or_else(|| SynnergyError::NotFound(format!("transfer {transfer_id}")))?;
        if transfer.status == TransferStatus::Completed {
            return Err(SynnergyError::StateViolation(format!("transfer {transfer_id} already completed")));
        }
        let escrow = Self::escrow_address(transfer.bridge_id);
        balances.transfer(transfer.token, escrow, transfer.to, transfer.amount)?;
        transfer.status = TransferStatus::Completed;
        self.events.push(BridgeEvent::TransferComplete(transfer_id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proof_for(leaves: &[Hash], index: usize) -> SpvProof {
        let tree = MerkleTree::new(leaves).unwrap();
        SpvProof { tx_hash: leaves[index], merkle_root: tree.root(), proof: tree.proof(index).unwrap() }
    }

    fn bridge_with_connection() -> (CrossChainBridge, Address) {
        let relayer = Address::derive(b"relayer");
        let mut relayers = HashSet::new();
        relayers.insert(relayer);
        let mut connections = HashSet::new();
        connections.insert(("eth".to_string(), "synn".to_string()));
        (CrossChainBridge::new(relayers, connections), relayer)
    }

    #[test]
    fn register_bridge_requires_authorised_relayer() {
        let (mut bridge, relayer) = bridge_with_connection();
        assert!(bridge.register_bridge(relayer, "eth".into(), "synn".into()).is_ok());
        let stranger = Address::derive(b"stranger");
        assert!(bridge.register_bridge(stranger, "eth".into(), "synn".into()).is_err());
    }

    #[test]
    fn lock_and_mint_rejects_invalid_proof() {
        let (mut bridge, relayer) = bridge_with_connection();
        let id = bridge.register_bridge(relayer, "eth".into(), "synn".into()).unwrap();
        let mut balances = BalanceTable::new();
        let caller = Address::derive(b"caller");
        let native = TokenId::from_code("NATIVE");
        let wrapped = TokenId::from_code("WNATIVE");
        balances.mint(native, caller, 100, None).unwrap();

        let leaves = vec![Hash::of(b"tx1"), Hash::of(b"tx2")];
        let mut proof = proof_for(&leaves, 0);
        proof.merkle_root = Hash::of(b"wrong-root");

        let result = bridge.lock_and_mint(&mut balances, id, caller, native, wrapped, &proof, 50, None);
        assert!(result.is_err());
        assert_eq!(balances.balance_of(native, caller), 100);
    }

    #[test]
    fn lock_and_mint_then_burn_and_release_round_trips() {
        let (mut bridge, relayer) = bridge_with_connection();
        let id = bridge.register_bridge(relayer, "eth".into(), "synn".into()).unwrap();
        let mut balances = BalanceTable::new();
        let caller = Address::derive(b"caller");
        let native = TokenId::from_code("NATIVE");
        let wrapped = TokenId::from_code("WNATIVE");
        balances.mint(native, caller, 100, None).unwrap();

        let leaves = vec![Hash::of(b"tx1"), Hash::of(b"tx2")];
        let proof = proof_for(&leaves, 0);

        bridge.lock_and_mint(&mut balances, id, caller, native, wrapped, &proof, 50, None).unwrap();
        assert_eq!(balances.balance_of(wrapped, caller), 50);
        assert_eq!(balances.balance_of(native, caller), 50);

        bridge.burn_and_release(&mut balances, id, caller, native, wrapped, caller, 50, None).unwrap();
        assert_eq!(balances.balance_of(wrapped, caller), 0);
        assert_eq!(balances.balance_of(native, caller), 100);
    }

    #[test]
    fn completing_a_transfer_twice_is_rejected() {
        let (mut bridge, relayer) = bridge_with_connection();
        let id = bridge.register_bridge(relayer, "eth".into(), "synn".into()).unwrap();
        let mut balances = BalanceTable::new();
        let token = TokenId::from_code("SYNN");
        let from = Address::derive(b"from");
        let to = Address::derive(b"to");
        balances.mint(token, from, 100, None).unwrap();

        let transfer_id = bridge.start_transfer(&mut balances, id, from, to, token, 30).unwrap();
        bridge.complete_transfer(&mut balances, transfer_id).unwrap();
        assert_eq!(balances.balance_of(token, to), 30);
        assert!(bridge.complete_transfer(&mut balances, transfer_id).is_err());
    }
}
