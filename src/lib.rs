//! # Synnergy Core
//!
//! A from-scratch blockchain core: an authoritative ledger with WAL +
//! snapshot + archive persistence, three gas-metered VM backends selected by
//! contract size, consensus auxiliaries (fork recovery, validator staking,
//! chain immutability, a seeded BFT round simulator), a layer-2 envelope
//! (rollup aggregator, state channels, plasma, sidechains), a cross-chain
//! bridge, and the fault-tolerance, firewall, and green-accounting services
//! that sit alongside it.
//!
//! ## Architecture
//!
//! - **Ledger** (`ledger`): in-memory chain tail, canonical KV state,
//!   balances, UTXO set, mempool, and deployed contracts, backed by a WAL,
//!   periodic JSON snapshot, gzip archive, and a sled mirror of the KV space.
//! - **VM** (`vm`): `Host`/`VmBackend` traits with SuperLight, Light
//!   (256-bit stack interpreter), and Heavy (sandboxed host-import replay)
//!   implementations, gas-metered via `gas`.
//! - **Fees & staking** (`fees`, `validator`): fixed-split fee distribution
//!   and validator stake accounting.
//! - **Consensus auxiliaries** (`fork`, `immutability`, `bft`): fork
//!   resolution/recovery, genesis-pinned chain verification, and a
//!   deterministic BFT quorum simulator.
//! - **Layer 2** (`rollup`, `channels`, `plasma`, `sidechain`): optimistic
//!   rollup batches, two-party state channels, a plasma exit coordinator,
//!   and paused/resumed sidechains.
//! - **Cross-chain** (`bridge`): SPV-proof-gated lock-and-mint /
//!   burn-and-release transfers.
//! - **Operational services** (`fault_tolerance`, `firewall`, `green`):
//!   peer health/backup/recovery, address/token/IP blocking, and
//!   carbon-accounting certification tiers.

pub mod balance;
pub mod bft;
pub mod block;
pub mod bridge;
pub mod channels;
pub mod contract;
pub mod crypto;
pub mod error;
pub mod fault_tolerance;
pub mod fees;
pub mod firewall;
pub mod fork;
pub mod gas;
pub mod green;
pub mod immutability;
pub mod ledger;
pub mod merkle;
pub mod plasma;
pub mod rollup;
pub mod sidechain;
pub mod state;
pub mod transaction;
pub mod types;
pub mod utils;
pub mod utxo;
pub mod validator;
pub mod vm;

pub use balance::BalanceTable;
pub use bft::{simulate_bft, simulate_bft_with};
pub use block::{Block, SubBlock};
pub use bridge::{Bridge, BridgeTransfer, CrossChainBridge, SpvProof};
pub use channels::{Channel, StateChannelManager};
pub use contract::Contract;
pub use error::{Result, SynnergyError};
pub use fault_tolerance::{BackupManager, HealthChecker, PredictiveFailureDetector, RecoveryManager};
pub use fees::{FeeDistribution, FeePools};
pub use firewall::Firewall;
pub use fork::ForkManager;
pub use gas::{GasMeter, GasSchedule};
pub use green::GreenEngine;
pub use immutability::ImmutabilityEnforcer;
pub use ledger::{Ledger, LedgerConfig};
pub use plasma::PlasmaCoordinator;
pub use rollup::RollupAggregator;
pub use sidechain::SidechainCoordinator;
pub use state::StateStore;
pub use transaction::{Transaction, TransactionType};
pub use types::{Address, Hash, TokenId};
pub use utxo::UtxoSet;
pub use validator::ValidatorManager;

/// Current protocol version.
pub const SYNNERGY_VERSION: &str = "0.1.0";

/// Default gas limit a ledger applies when a caller omits one.
pub const DEFAULT_GAS_LIMIT: u64 = 1_000_000;

/// Default gas price (in the smallest fee-token unit) applied to CLI-built
/// transactions.
pub const DEFAULT_GAS_PRICE: u64 = 1;

/// Fixed 24-hour challenge/close window shared by the rollup aggregator and
/// state channels (spec §4.9, §4.10).
pub const CHALLENGE_WINDOW_SECS: i64 = 24 * 60 * 60;
