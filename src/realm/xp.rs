//! Skill XP curve: a strictly increasing threshold table for levels 1..=99.
//!
//! The default table is the classic "level + 300 * 2^(level/7)" progression
//! (83 XP for level 2, 13,034,431 XP for level 99). Deployments can supply
//! their own table through `[progression] xp_thresholds` in the config file.

use crate::realm::errors::RealmError;

pub const MIN_LEVEL: u8 = 1;
pub const MAX_LEVEL: u8 = 99;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XpCurve {
    /// `thresholds[n]` is the cumulative XP needed for level `n + 1`.
    thresholds: Vec<u64>,
}

impl XpCurve {
    /// The classic exponential table.
    pub fn classic() -> Self {
        let mut thresholds = Vec::with_capacity(MAX_LEVEL as usize);
        thresholds.push(0);
        let mut points = 0f64;
        for level in 1..MAX_LEVEL as u32 {
            let level = level as f64;
            points += (level + 300.0 * 2f64.powf(level / 7.0)).floor();
            thresholds.push((points / 4.0).floor() as u64);
        }
        Self { thresholds }
    }

    /// Build a curve from an explicit table. The table must hold one entry per
    /// level, start at 0 and be strictly increasing.
    pub fn from_thresholds(thresholds: Vec<u64>) -> Result<Self, RealmError> {
        if thresholds.len() != MAX_LEVEL as usize {
            return Err(RealmError::InvalidConfig(format!(
                "xp table needs {} entries, got {}",
                MAX_LEVEL,
                thresholds.len()
            )));
        }
        if thresholds[0] != 0 {
            return Err(RealmError::InvalidConfig(
                "xp table must start at 0 for level 1".to_string(),
            ));
        }
        if let Some(pos) = thresholds.windows(2).position(|w| w[0] >= w[1]) {
            return Err(RealmError::InvalidConfig(format!(
                "xp table not strictly increasing at level {}",
                pos + 2
            )));
        }
        Ok(Self { thresholds })
    }

    /// Cumulative XP required to reach `level`. Out-of-range levels are clamped.
    pub fn xp_for_level(&self, level: u8) -> u64 {
        let level = level.clamp(MIN_LEVEL, MAX_LEVEL);
        self.thresholds[(level - 1) as usize]
    }

    /// Highest level whose threshold is <= `xp`.
    pub fn level_for_xp(&self, xp: u64) -> u8 {
        let reached = self.thresholds.partition_point(|&threshold| threshold <= xp);
        (reached as u8).clamp(MIN_LEVEL, MAX_LEVEL)
    }

    /// Percent progress from `level` toward the next one; 100 at the level cap.
    pub fn progress_percent(&self, level: u8, xp: u64) -> f64 {
        if level >= MAX_LEVEL {
            return 100.0;
        }
        let floor = self.xp_for_level(level);
        let ceiling = self.xp_for_level(level + 1);
        let span = (ceiling - floor) as f64;
        let earned = xp.saturating_sub(floor) as f64;
        (earned / span * 100.0).clamp(0.0, 100.0)
    }

    /// XP still missing before the next level, `None` at the cap.
    pub fn xp_to_next_level(&self, level: u8, xp: u64) -> Option<u64> {
        if level >= MAX_LEVEL {
            return None;
        }
        Some(self.xp_for_level(level + 1).saturating_sub(xp))
    }
}

impl Default for XpCurve {
    fn default() -> Self {
        Self::classic()
    }
}
