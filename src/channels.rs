//! State channels: two-party off-chain payment conduits backed by on-chain
//! escrow (spec §4.10).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::balance::BalanceTable;
use crate::crypto::ChannelSignature;
use crate::error::{Result, SynnergyError};
use crate::types::{Address, Hash, TokenId};

/// Fixed closing-challenge window, mirroring the rollup's (spec §4.10, §6 glossary).
pub const CLOSE_WINDOW_SECS: i64 = 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ChannelState {
    Open,
    Closing,
    Finalised,
}

/// A signed balance snapshot exchanged off-chain between the two parties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedState {
    pub channel_id: Hash,
    pub nonce: u64,
    pub balance_a: u64,
    pub balance_b: u64,
    pub shard_a: Option<u32>,
    pub shard_b: Option<u32>,
    pub sig_a: ChannelSignature,
    pub sig_b: ChannelSignature,
}

impl SignedState {
    fn message(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&self.channel_id.0);
        buf.extend_from_slice(&self.nonce.to_be_bytes());
        buf.extend_from_slice(&self.balance_a.to_be_bytes());
        buf.extend_from_slice(&self.balance_b.to_be_bytes());
        buf
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: Hash,
    pub party_a: Address,
    pub party_b: Address,
    pub shard_a: Option<u32>,
    pub shard_b: Option<u32>,
    pub token: TokenId,
    pub state: ChannelState,
    pub nonce: u64,
    pub pending: Option<SignedState>,
    pub closing_since: Option<i64>,
}

pub struct StateChannelManager {
    channels: HashMap<Hash, Channel>,
}

impl StateChannelManager {
    pub fn new() -> Self {
        StateChannelManager { channels: HashMap::new() }
    }

    pub fn channel(&self, id: Hash) -> Option<&Channel> {
        self.channels.get(&id)
    }

    /// Derive the channel id as SHA-256(a || b || nonce) and escrow both
    /// parties' deposits into a per-channel address (spec §4.10).
    #[allow(clippy::too_many_arguments)]
    pub fn open_channel(
        &mut self,
        balances: &mut BalanceTable,
        a: Address,
        b: Address,
        shard_a: Option<u32>,
        shard_b: Option<u32>,
        token: TokenId,
        amount_a: u64,
        amount_b: u64,
        nonce: u64,
    ) -> Result<Hash> {
        let id = Hash::of_concat(&[&a.0, &b.0, &nonce.to_be_bytes()]);
        if self.channels.contains_key(&id) {
            return Err(SynnergyError::InvalidInput(format!("channel {id} already exists")));
        }
        let escrow = Address::escrow(b"channel", id.0.as_slice());
        if amount_a > 0 {
            balances.transfer(token, a, escrow, amount_a)?;
        }
        if amount_b > 0 {
            balances.transfer(token, b, escrow, amount_b)?;
        }
        self.channels.insert(
            id,
            Channel {
                id,
                party_a: a,
                party_b: b,
                shard_a,
                shard_b,
                token,
                state: ChannelState::Open,
                nonce: 0,
                pending: None,
                closing_since: None,
            },
        );
        Ok(id)
    }

    fn verify_signed_state(channel: &Channel, signed: &SignedState) -> Result<()> {
        let message = signed.message();
        if !signed.sig_a.verify(&message)? || signed.sig_a.signer_address() != channel.party_a {
            return Err(SynnergyError::ProofInvalid("party A signature invalid or does not match declared address".into()));
        }
        if !signed.sig_b.verify(&message)? || signed.sig_b.signer_address() != channel.party_b {
            return Err(SynnergyError::ProofInvalid("party B signature invalid or does not match declared address".into()));
        }
        if signed.shard_a != channel.shard_a || signed.shard_b != channel.shard_b {
            return Err(SynnergyError::ProofInvalid("shard id does not match the shard shown for each party".into()));
        }
        Ok(())
    }

    /// Verify both signatures, reject a stale nonce, and move the channel to
    /// Closing (spec §4.10).
    pub fn initiate_close(&mut self, signed: SignedState, now: i64) -> Result<()> {
        let channel = self
            .channels
            .get_mut(&signed.channel_id)
            .ok_or_else(|| SynnergyError::NotFound(format!("channel {}", signed.channel_id)))?;
        Self::verify_signed_state(channel, &signed)?;
        if signed.nonce < channel.nonce {
            return Err(SynnergyError::StateViolation("stale nonce".into()));
        }
        channel.nonce = signed.nonce;
        channel.state = ChannelState::Closing;
        channel.closing_since = Some(now);
        channel.pending = Some(signed);
        Ok(())
    }

    /// Requires Closing state, within the window, and a strictly greater
    /// nonce than stored; replaces the pending state (spec §4.10, §8 channel
    /// replay scenario).
    pub fn challenge(&mut self, signed: SignedState, now: i64) -> Result<()> {
        let channel = self
            .channels
            .get_mut(&signed.channel_id)
            .ok_or_else(|| SynnergyError::NotFound(format!("channel {}", signed.channel_id)))?;
        if channel.state != ChannelState::Closing {
            return Err(SynnergyError::StateViolation("channel is not in the closing state".into()));
        }
        let since = channel.closing_since.ok_or_else(|| SynnergyError::StateViolation("channel has no closing timestamp".into()))?;
        if now - since > CLOSE_WINDOW_SECS {
            return Err(SynnergyError::StateViolation("challenge window has elapsed".into()));
        }
        Self::verify_signed_state(channel, &signed)?;
        if signed.nonce <= channel.nonce {
            return Err(SynnergyError::StateViolation("nonce must be strictly greater than the stored nonce".into()));
        }
        channel.nonce = signed.nonce;
        channel.pending = Some(signed);
        Ok(())
    }

    /// Pay out each balance from escrow to the respective party and delete
    /// the channel record; only valid once the window has expired (spec §4.10).
    pub fn finalize(&mut self, balances: &mut BalanceTable, id: Hash, now: i64) -> Result<()> {
        let channel = self.channels.get(&id).ok_or_else(|| SynnergyError::NotFound(format!("channel {id}")))?;
        if channel.state != ChannelState::Closing {
            return Err(SynnergyError::StateViolation("channel is not in the closing state".into()));
        }
        let since = channel.closing_since.ok_or_else(|| SynnergyError::StateViolation("channel has no closing timestamp".into()))?;
        if now - since <= CLOSE_WINDOW_SECS {
            return Err(SynnergyError::StateViolation("closing window has not yet expired".into()));
        }
        let pending = channel.pending.clone().ok_or_else(|| SynnergyError::StateViolation("channel has no pending state".into()))?;
        let escrow = Address::escrow(b"channel", id.0.as_slice());
        if pending.balance_a > 0 {
            balances.transfer(channel.token, escrow, channel.party_a, pending.balance_a)?;
        }
        if pending.balance_b > 0 {
            balances.transfer(channel.token, escrow, channel.party_b, pending.balance_b)?;
        }
        self.channels.remove(&id);
        Ok(())
    }
}

impl Default for StateChannelManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    fn sign(kp_a: &KeyPair, kp_b: &KeyPair, channel_id: Hash, nonce: u64, balance_a: u64, balance_b: u64) -> SignedState {
        let mut unsigned = SignedState {
            channel_id,
            nonce,
            balance_a,
            balance_b,
            shard_a: None,
            shard_b: None,
            sig_a: ChannelSignature { bytes: vec![], public_key: vec![] },
            sig_b: ChannelSignature { bytes: vec![], public_key: vec![] },
        };
        let message = unsigned.message();
        unsigned.sig_a = kp_a.sign(&message);
        unsigned.sig_b = kp_b.sign(&message);
        unsigned
    }

    #[test]
    fn channel_replay_scenario() {
        let mut mgr = StateChannelManager::new();
        let mut balances = BalanceTable::new();
        let kp_a = KeyPair::generate();
        let kp_b = KeyPair::generate();
        let token = TokenId::from_code("SYNN");
        balances.mint(token, kp_a.address(), 100, None).unwrap();
        balances.mint(token, kp_b.address(), 100, None).unwrap();

        let id = mgr
            .open_channel(&mut balances, kp_a.address(), kp_b.address(), None, None, token, 100, 100, 0)
            .unwrap();

        let close_state = sign(&kp_a, &kp_b, id, 5, 60, 140);
        mgr.initiate_close(close_state, 1000).unwrap();

        let stale = sign(&kp_a, &kp_b, id, 4, 10, 190);
        assert!(mgr.challenge(stale, 1500).is_err());

        let fresher = sign(&kp_a, &kp_b, id, 6, 80, 120);
        mgr.challenge(fresher, 1500).unwrap();

        assert!(mgr.finalize(&mut balances, id, 1500 + CLOSE_WINDOW_SECS).is_err());
        mgr.finalize(&mut balances, id, 1500 + CLOSE_WINDOW_SECS + 1).unwrap();

        assert_eq!(balances.balance_of(token, kp_a.address()), 80);
        assert_eq!(balances.balance_of(token, kp_b.address()), 120);
    }
}
