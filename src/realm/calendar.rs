//! World calendar.
//!
//! The only stored state is a single absolute-day counter plus the time it was
//! last advanced. Day of week, week of season, season and year are derived on
//! every read so they can never drift apart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::realm::errors::RealmError;
use crate::realm::storage::RealmStore;
use crate::realm::types::CALENDAR_SCHEMA_VERSION;

pub const DAYS_PER_WEEK: u32 = 7;
pub const WEEKS_PER_SEASON: u32 = 13;
pub const DAYS_PER_SEASON: u32 = DAYS_PER_WEEK * WEEKS_PER_SEASON;
pub const DAYS_PER_YEAR: u32 = DAYS_PER_SEASON * 4;

/// Upper bound on a season's travel multiplier.
pub const MAX_TRAVEL_MULTIPLIER: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    pub const ORDER: [Season; 4] = [Season::Spring, Season::Summer, Season::Autumn, Season::Winter];

    pub fn index(&self) -> usize {
        match self {
            Season::Spring => 0,
            Season::Summer => 1,
            Season::Autumn => 2,
            Season::Winter => 3,
        }
    }

    pub fn next(&self) -> Season {
        Season::ORDER[(self.index() + 1) % 4]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Autumn => "autumn",
            Season::Winter => "winter",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numeric effect a season has on gameplay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeasonModifiers {
    /// Multiplies travel duration (above 1.0 means slower journeys).
    pub travel_multiplier: f64,
    /// Multiplies gathered quantities.
    pub gathering_multiplier: f64,
}

impl SeasonModifiers {
    pub const fn new(travel_multiplier: f64, gathering_multiplier: f64) -> Self {
        Self {
            travel_multiplier,
            gathering_multiplier,
        }
    }
}

/// Missing seasons fall back to the defaults when deserializing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonTable {
    pub spring: SeasonModifiers,
    pub summer: SeasonModifiers,
    pub autumn: SeasonModifiers,
    pub winter: SeasonModifiers,
}

impl SeasonTable {
    pub fn modifiers(&self, season: Season) -> SeasonModifiers {
        match season {
            Season::Spring => self.spring,
            Season::Summer => self.summer,
            Season::Autumn => self.autumn,
            Season::Winter => self.winter,
        }
    }

    pub fn validate(&self) -> Result<(), RealmError> {
        for season in Season::ORDER {
            let m = self.modifiers(season);
            if !(m.travel_multiplier.is_finite() && m.travel_multiplier > 0.0) {
                return Err(RealmError::InvalidConfig(format!(
                    "{} travel multiplier must be positive",
                    season
                )));
            }
            if m.travel_multiplier > MAX_TRAVEL_MULTIPLIER {
                return Err(RealmError::InvalidConfig(format!(
                    "{} travel multiplier must not exceed {}",
                    season, MAX_TRAVEL_MULTIPLIER
                )));
            }
            if !(m.gathering_multiplier.is_finite() && m.gathering_multiplier >= 0.0) {
                return Err(RealmError::InvalidConfig(format!(
                    "{} gathering multiplier must not be negative",
                    season
                )));
            }
        }
        Ok(())
    }
}

impl Default for SeasonTable {
    fn default() -> Self {
        Self {
            spring: SeasonModifiers::new(1.0, 1.1),
            summer: SeasonModifiers::new(0.9, 1.2),
            autumn: SeasonModifiers::new(1.0, 1.0),
            winter: SeasonModifiers::new(1.5, 0.7),
        }
    }
}

/// The single persisted calendar record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarRecord {
    pub absolute_day: u32,
    pub last_advanced_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl CalendarRecord {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            absolute_day: 1,
            last_advanced_at: now,
            schema_version: CALENDAR_SCHEMA_VERSION,
        }
    }

    /// Move forward one day if `now` falls on a later UTC date than the last
    /// advancement. Returns whether the counter changed.
    pub fn advance(&mut self, now: DateTime<Utc>) -> bool {
        if now.date_naive() <= self.last_advanced_at.date_naive() {
            return false;
        }
        self.absolute_day = self.absolute_day.saturating_add(1);
        self.last_advanced_at = now;
        true
    }
}

/// Read-only view of one calendar day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalendarSnapshot {
    pub absolute_day: u32,
    pub day_of_week: u32,
    pub week_of_season: u32,
    pub season: Season,
    /// Zero-based; day 1 is in year 0.
    pub year: u32,
    pub modifiers: SeasonModifiers,
}

impl CalendarSnapshot {
    pub fn for_day(absolute_day: u32, seasons: &SeasonTable) -> Self {
        let elapsed = absolute_day.max(1) - 1;
        let season = Season::ORDER[((elapsed / DAYS_PER_SEASON) % 4) as usize];
        Self {
            absolute_day: elapsed + 1,
            day_of_week: (elapsed % DAYS_PER_WEEK) + 1,
            week_of_season: ((elapsed / DAYS_PER_WEEK) % WEEKS_PER_SEASON) + 1,
            season,
            year: elapsed / DAYS_PER_YEAR,
            modifiers: seasons.modifiers(season),
        }
    }
}

impl fmt::Display for CalendarSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Day {} of week {}, {} of year {} (absolute day {})",
            self.day_of_week,
            self.week_of_season,
            self.season,
            self.year + 1,
            self.absolute_day
        )
    }
}

/// Injected handle over the persisted calendar. Every read builds a fresh snapshot.
#[derive(Clone)]
pub struct WorldCalendar {
    store: RealmStore,
    seasons: SeasonTable,
}

impl WorldCalendar {
    pub fn new(store: RealmStore, seasons: SeasonTable) -> Self {
        Self { store, seasons }
    }

    pub fn seasons(&self) -> &SeasonTable {
        &self.seasons
    }

    pub fn snapshot(&self) -> Result<CalendarSnapshot, RealmError> {
        let record = self.store.calendar_record()?;
        Ok(CalendarSnapshot::for_day(record.absolute_day, &self.seasons))
    }

    /// Advance the counter if a new real day started. Returns the snapshot
    /// after the call and whether the day changed.
    pub fn advance(&self, now: DateTime<Utc>) -> Result<(CalendarSnapshot, bool), RealmError> {
        let (record, advanced) = self.store.advance_calendar(now)?;
        Ok((
            CalendarSnapshot::for_day(record.absolute_day, &self.seasons),
            advanced,
        ))
    }
}
