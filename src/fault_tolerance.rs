//! Fault tolerance services: peer health tracking, backup/recovery, and
//! predictive failure detection (spec §4.13).

use std::collections::HashMap;
use std::time::Duration;

use crate::error::Result;
use crate::ledger::Ledger;
use crate::types::{Address, Hash};

/// EWMA smoothing factor shared by the health checker and the predictive
/// failure detector (spec §4.13).
pub const EWMA_ALPHA: f64 = 0.2;
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(3);
const FAULTY_MISS_THRESHOLD: u32 = 3;
const FAULTY_RTT_MS: f64 = 1500.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct PeerStats {
    pub ewma_rtt_ms: f64,
    pub consecutive_misses: u32,
}

impl PeerStats {
    pub fn is_faulty(&self) -> bool {
        self.consecutive_misses >= FAULTY_MISS_THRESHOLD || self.ewma_rtt_ms > FAULTY_RTT_MS
    }

    fn record_success(&mut self, rtt_ms: f64) {
        self.ewma_rtt_ms = EWMA_ALPHA * rtt_ms + (1.0 - EWMA_ALPHA) * self.ewma_rtt_ms;
        self.consecutive_misses = 0;
    }

    fn record_failure(&mut self) {
        self.consecutive_misses += 1;
    }
}

/// Proposes a view change when the current leader is flagged faulty
/// (spec §4.13). The concrete consensus wiring is injected so the health
/// checker stays decoupled from any one consensus implementation.
pub trait ViewChanger {
    fn propose_view_change(&mut self, faulty_leader: Address);
}

/// Maintains per-peer { EWMA of RTT, consecutive miss count } and flags a
/// peer faulty once misses or RTT cross a threshold (spec §4.13).
pub struct HealthChecker {
    stats: HashMap<Address, PeerStats>,
    leader: Option<Address>,
}

impl HealthChecker {
    pub fn new() -> Self {
        HealthChecker { stats: HashMap::new(), leader: None }
    }

    pub fn set_leader(&mut self, leader: Address) {
        self.leader = Some(leader);
    }

    pub fn stats(&self, peer: Address) -> PeerStats {
        self.stats.get(&peer).copied().unwrap_or_default()
    }

    /// Record the outcome of one ping round for `peer` and, if the peer is
    /// now faulty and is the current leader, propose a view change.
    pub fn record_ping(&mut self, peer: Address, rtt_ms: Option<f64>, view_changer: &mut dyn ViewChanger) {
        let entry = self.stats.entry(peer).or_default();
        match rtt_ms {
            Some(rtt) => entry.record_success(rtt),
            None => entry.record_failure(),
        }
        if entry.is_faulty() && self.leader == Some(peer) {
            view_changer.propose_view_change(peer);
        }
    }
}

impl Default for HealthChecker {
    fn default() -> Self {
        Self::new()
    }
}

/// Periodically serialises the ledger and writes timestamped copies to each
/// configured backup path; optionally incremental via hash comparison
/// (spec §4.13).
pub struct BackupManager {
    backup_paths: Vec<std::path::PathBuf>,
    last_hash: Option<Hash>,
}

impl BackupManager {
    pub fn new(backup_paths: Vec<std::path::PathBuf>) -> Self {
        BackupManager { backup_paths, last_hash: None }
    }

    /// Serialise `ledger`'s snapshot and write it to every configured path,
    /// tagged with `timestamp`. Skips the write entirely when the snapshot's
    /// hash is unchanged since the last backup (incremental mode).
    pub fn backup(&mut self, ledger: &Ledger, timestamp: i64) -> Result<()> {
        let snapshot = ledger.snapshot();
        let bytes = serde_json::to_vec(&snapshot)?;
        let hash = Hash::of(&bytes);
        if self.last_hash == Some(hash) {
            return Ok(());
        }
        for dir in &self.backup_paths {
            std::fs::create_dir_all(dir)?;
            let path = dir.join(format!("backup-{timestamp}.json"));
            std::fs::write(path, &bytes)?;
        }
        self.last_hash = Some(hash);
        Ok(())
    }

    /// Compare a disk snapshot's hash against the live ledger's.
    pub fn verify(&self, ledger: &Ledger, path: &std::path::Path) -> Result<bool> {
        let disk_bytes = std::fs::read(path)?;
        let disk_hash = Hash::of(&disk_bytes);
        let live_bytes = serde_json::to_vec(&ledger.snapshot())?;
        Ok(disk_hash == Hash::of(&live_bytes))
    }
}

/// Restores a ledger from a disk snapshot and monitors peer stats, proposing
/// a view change once the leader's miss count crosses a configured
/// threshold (spec §4.13).
pub struct RecoveryManager {
    miss_threshold: u32,
}

impl RecoveryManager {
    pub fn new(miss_threshold: u32) -> Self {
        RecoveryManager { miss_threshold }
    }

    pub fn restore_from(&self, dir: impl AsRef<std::path::Path>, config: crate::ledger::LedgerConfig) -> Result<Ledger> {
        Ledger::open(dir, config)
    }

    pub fn monitor(&self, leader: Address, health: &HealthChecker, view_changer: &mut dyn ViewChanger) {
        if health.stats(leader).consecutive_misses >= self.miss_threshold {
            view_changer.propose_view_change(leader);
        }
    }
}

/// Keeps an EWMA of RTT per peer and returns a failure probability in
/// `[0, 1]` as `min(avg / threshold, 1)` (spec §4.13).
pub struct PredictiveFailureDetector {
    ewma_rtt_ms: HashMap<Address, f64>,
    threshold_ms: f64,
}

impl PredictiveFailureDetector {
    pub fn new(threshold_ms: f64) -> Self {
        PredictiveFailureDetector { ewma_rtt_ms: HashMap::new(), threshold_ms }
    }

    pub fn observe(&mut self, peer: Address, rtt_ms: f64) {
        let entry = self.ewma_rtt_ms.entry(peer).or_insert(0.0);
        *entry = EWMA_ALPHA * rtt_ms + (1.0 - EWMA_ALPHA) * *entry;
    }

    pub fn failure_probability(&self, peer: Address) -> f64 {
        let avg = *self.ewma_rtt_ms.get(&peer).unwrap_or(&0.0);
        (avg / self.threshold_ms).min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RecordingChanger {
        proposed: Vec<Address>,
    }
    impl ViewChanger for RecordingChanger {
        fn propose_view_change(&mut self, faulty_leader: Address) {
            self.proposed.push(faulty_leader);
        }
    }

    #[test]
    fn three_consecutive_misses_flags_leader_and_proposes_view_change() {
        let mut checker = HealthChecker::new();
        let leader = Address::derive(b"leader");
        checker.set_leader(leader);
        let mut changer = RecordingChanger { proposed: Vec::new() };

        for _ in 0..3 {
            checker.record_ping(leader, None, &mut changer);
        }
        assert!(checker.stats(leader).is_faulty());
        assert_eq!(changer.proposed, vec![leader]);
    }

    #[test]
    fn successful_ping_resets_miss_counter() {
        let mut checker = HealthChecker::new();
        let peer = Address::derive(b"peer");
        let mut changer = RecordingChanger { proposed: Vec::new() };
        checker.record_ping(peer, None, &mut changer);
        checker.record_ping(peer, None, &mut changer);
        checker.record_ping(peer, Some(50.0), &mut changer);
        assert_eq!(checker.stats(peer).consecutive_misses, 0);
    }

    #[test]
    fn predictive_detector_caps_probability_at_one() {
        let mut detector = PredictiveFailureDetector::new(100.0);
        let peer = Address::derive(b"peer");
        for _ in 0..50 {
            detector.observe(peer, 1000.0);
        }
        assert!((detector.failure_probability(peer) - 1.0).abs() < 1e-9);
    }
}
