//! Carbon/green/efficiency engines: per-validator energy and carbon
//! accounting, offset credits, and certification tiers (spec §4.15).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::Address;

/// Certification tier assigned from a validator's offset/emission ratio
/// (spec §4.15).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CertificationTier {
    Gold,
    Silver,
    Bronze,
    None,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnergyRecord {
    pub energy_kwh: f64,
    pub carbon_kg: f64,
    pub offsets_kg: f64,
}

/// Tracks per-validator energy (kWh) and carbon (kg) usage alongside offset
/// credits, and scores each validator's certification tier (spec §4.15).
pub struct GreenEngine {
    records: HashMap<Address, EnergyRecord>,
}

impl GreenEngine {
    pub fn new() -> Self {
        GreenEngine { records: HashMap::new() }
    }

    pub fn record(&self, validator: Address) -> EnergyRecord {
        self.records.get(&validator).cloned().unwrap_or_default()
    }

    pub fn record_usage(&mut self, validator: Address, energy_kwh: f64, carbon_kg: f64) {
        let entry = self.records.entry(validator).or_default();
        entry.energy_kwh += energy_kwh;
        entry.carbon_kg += carbon_kg;
    }

    pub fn record_offset(&mut self, validator: Address, offset_kg: f64) {
        self.records.entry(validator).or_default().offsets_kg += offset_kg;
    }

    /// `(offsets - emitted) / emitted`, or `0.0` when nothing has been
    /// emitted yet (spec §4.15).
    pub fn certification_score(&self, validator: Address) -> f64 {
        let record = self.record(validator);
        if record.carbon_kg <= 0.0 {
            return 0.0;
        }
        (record.offsets_kg - record.carbon_kg) / record.carbon_kg
    }

    /// Gold >= 0.5, Silver >= 0.0, Bronze >= -0.25, else None (spec §4.15).
    pub fn certification_tier(&self, validator: Address) -> CertificationTier {
        let score = self.certification_score(validator);
        if score >= 0.5 {
            CertificationTier::Gold
        } else if score >= 0.0 {
            CertificationTier::Silver
        } else if score >= -0.25 {
            CertificationTier::Bronze
        } else {
            CertificationTier::None
        }
    }

    /// True once a validator's score falls below -0.5 (spec §4.15).
    pub fn should_throttle(&self, validator: Address) -> bool {
        self.certification_score(validator) < -0.5
    }
}

impl Default for GreenEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fully_offset_validator_earns_gold() {
        let mut engine = GreenEngine::new();
        let validator = Address::derive(b"v1");
        engine.record_usage(validator, 100.0, 50.0);
        engine.record_offset(validator, 100.0);
        assert_eq!(engine.certification_tier(validator), CertificationTier::Gold);
    }

    #[test]
    fn partially_offset_validator_earns_bronze_and_is_not_throttled() {
        let mut engine = GreenEngine::new();
        let validator = Address::derive(b"v2");
        engine.record_usage(validator, 100.0, 100.0);
        engine.record_offset(validator, 80.0);
        assert_eq!(engine.certification_tier(validator), CertificationTier::Bronze);
        assert!(!engine.should_throttle(validator));
    }

    #[test]
    fn heavily_under_offset_validator_is_throttled() {
        let mut engine = GreenEngine::new();
        let validator = Address::derive(b"v3");
        engine.record_usage(validator, 100.0, 100.0);
        assert!(engine.should_throttle(validator));
        assert_eq!(engine.certification_tier(validator), CertificationTier::None);
    }

    #[test]
    fn untouched_validator_scores_zero() {
        let engine = GreenEngine::new();
        let validator = Address::derive(b"v4");
        assert_eq!(engine.certification_score(validator), 0.0);
    }
}
