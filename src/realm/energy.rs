//! Lazily regenerated player energy.
//!
//! Energy is never ticked continuously. Whenever a player's record is touched,
//! the number of whole regeneration intervals since `last_regen_at` is credited
//! and the timestamp moves forward by exactly that many intervals, so partial
//! progress toward the next unit is kept.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::realm::errors::RealmError;

/// Regeneration parameters shared by every player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnergyRules {
    pub max_energy: u32,
    pub regen_amount: u32,
    pub regen_interval: Duration,
}

impl Default for EnergyRules {
    fn default() -> Self {
        Self {
            max_energy: 100,
            regen_amount: 1,
            regen_interval: Duration::minutes(3),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnergyState {
    pub current: u32,
    pub max: u32,
    pub last_regen_at: DateTime<Utc>,
}

/// What a call to [`EnergyState::regenerate`] credited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegenOutcome {
    pub units: u64,
    pub gained: u32,
}

impl RegenOutcome {
    pub fn applied(&self) -> bool {
        self.units > 0
    }
}

impl EnergyState {
    pub fn full(max: u32, now: DateTime<Utc>) -> Self {
        Self {
            current: max,
            max,
            last_regen_at: now,
        }
    }

    /// Credit whole intervals elapsed since `last_regen_at`.
    pub fn regenerate(&mut self, now: DateTime<Utc>, rules: &EnergyRules) -> RegenOutcome {
        let interval_ms = rules.regen_interval.num_milliseconds();
        if interval_ms <= 0 {
            return RegenOutcome::default();
        }
        let elapsed_ms = (now - self.last_regen_at).num_milliseconds();
        if elapsed_ms < interval_ms {
            return RegenOutcome::default();
        }
        let units = (elapsed_ms / interval_ms) as u64;
        let credit = units.saturating_mul(rules.regen_amount as u64);
        let before = self.current;
        if before < self.max {
            self.current = (before as u64).saturating_add(credit).min(self.max as u64) as u32;
        }
        self.last_regen_at += Duration::milliseconds(units as i64 * interval_ms);
        RegenOutcome {
            units,
            gained: self.current - before,
        }
    }

    /// Deduct `cost`, refusing (without change) when the pool is too small.
    pub fn spend(&mut self, cost: u32) -> Result<(), RealmError> {
        if self.current < cost {
            return Err(RealmError::InsufficientEnergy {
                needed: cost,
                available: self.current,
            });
        }
        self.current -= cost;
        Ok(())
    }

    pub fn is_full(&self) -> bool {
        self.current >= self.max
    }

    /// When the pool will next be full, assuming no spending.
    pub fn full_at(&self, rules: &EnergyRules) -> DateTime<Utc> {
        if self.is_full() || rules.regen_amount == 0 {
            return self.last_regen_at;
        }
        let missing = (self.max - self.current) as i64;
        let amount = rules.regen_amount as i64;
        let units = i32::try_from((missing + amount - 1) / amount).unwrap_or(i32::MAX);
        rules
            .regen_interval
            .checked_mul(units)
            .and_then(|span| self.last_regen_at.checked_add_signed(span))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}
