//! Realm core: skills and XP, energy, the world calendar and action resolution,
//! persisted in a Sled-backed store.

pub mod actions;
pub mod calendar;
pub mod energy;
pub mod errors;
pub mod resolver;
pub mod service;
pub mod storage;
pub mod types;
pub mod xp;

pub use actions::{
    load_actions_from_json, ActionCatalog, ActionDefinition, ActionKind, ActionRolls, ItemQuantity,
    ItemYield, RewardRange, TravelLeg,
};
pub use calendar::{CalendarRecord, CalendarSnapshot, Season, SeasonModifiers, SeasonTable, WorldCalendar};
pub use energy::{EnergyRules, EnergyState, RegenOutcome};
pub use errors::RealmError;
pub use resolver::{resolve_action, ActionOutcome, GameRules, ItemDelta, TravelReceipt};
pub use service::{RealmService, StartingKit};
pub use storage::{LeaderboardEntry, RealmStore, RealmStoreBuilder, SweepReport};
pub use types::*;
pub use xp::{XpCurve, MAX_LEVEL, MIN_LEVEL};
