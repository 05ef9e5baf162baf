//! Realm service: the entry point callers and the scheduler use.
//!
//! It owns the store, the numeric rules, the season table and the action
//! catalog, and turns "player X does Y now" into a validated, rolled and
//! persisted [`ActionOutcome`].

use chrono::{DateTime, Utc};
use log::{debug, info};
use rand::Rng;

use crate::realm::actions::{ActionCatalog, ActionRolls};
use crate::realm::calendar::{CalendarSnapshot, SeasonTable, WorldCalendar};
use crate::realm::energy::{EnergyState, RegenOutcome};
use crate::realm::errors::RealmError;
use crate::realm::resolver::{ActionOutcome, GameRules};
use crate::realm::storage::{LeaderboardEntry, RealmStore, SweepReport};
use crate::realm::types::{LevelChange, PlayerRecord, SkillKind, SkillSet};
use crate::validation::{validate_character_name, validate_username};

/// What a new character is handed on creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartingKit {
    pub location: String,
    pub gold: u64,
}

impl Default for StartingKit {
    fn default() -> Self {
        Self {
            location: "ashford".to_string(),
            gold: 25,
        }
    }
}

#[derive(Clone)]
pub struct RealmService {
    store: RealmStore,
    calendar: WorldCalendar,
    rules: GameRules,
    catalog: ActionCatalog,
    kit: StartingKit,
}

impl RealmService {
    pub fn new(
        store: RealmStore,
        rules: GameRules,
        seasons: SeasonTable,
        catalog: ActionCatalog,
        kit: StartingKit,
    ) -> Self {
        let calendar = WorldCalendar::new(store.clone(), seasons);
        Self {
            store,
            calendar,
            rules,
            catalog,
            kit,
        }
    }

    pub fn store(&self) -> &RealmStore {
        &self.store
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    pub fn catalog(&self) -> &ActionCatalog {
        &self.catalog
    }

    pub fn world_calendar(&self) -> &WorldCalendar {
        &self.calendar
    }

    /// Create a character with starting skills, full energy and the starting kit.
    pub fn create_player(
        &self,
        username: &str,
        display_name: &str,
        now: DateTime<Utc>,
    ) -> Result<PlayerRecord, RealmError> {
        let username = validate_username(username)?;
        let display_name = if display_name.trim().is_empty() {
            username.clone()
        } else {
            validate_character_name(display_name)?
        };
        let player = PlayerRecord::new(
            &username,
            &display_name,
            &self.kit.location,
            SkillSet::starting(&self.rules.curve),
            EnergyState::full(self.rules.energy.max_energy, now),
            now,
        )
        .with_gold(self.kit.gold);
        self.store.create_player(player.clone())?;
        info!("New character {} ({}) in {}", player.username, player.display_name, player.location);
        Ok(player)
    }

    /// Load a player with energy and travel re-derived for `now`.
    pub fn player(&self, username: &str, now: DateTime<Utc>) -> Result<PlayerRecord, RealmError> {
        self.store
            .regenerate_player(username, &self.rules.energy, now)?;
        self.store.get_player(username)
    }

    pub fn regenerate(
        &self,
        username: &str,
        now: DateTime<Utc>,
    ) -> Result<(EnergyState, RegenOutcome), RealmError> {
        self.store
            .regenerate_player(username, &self.rules.energy, now)
    }

    pub fn grant_xp(
        &self,
        username: &str,
        skill: SkillKind,
        amount: u64,
        now: DateTime<Utc>,
    ) -> Result<LevelChange, RealmError> {
        self.store
            .grant_xp(username, skill, amount, &self.rules.curve, now)
    }

    /// Perform `action_id` for `username` using the thread RNG.
    pub fn perform(
        &self,
        username: &str,
        action_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ActionOutcome, RealmError> {
        self.perform_with_rng(username, action_id, &mut rand::thread_rng(), now)
    }

    pub fn perform_with_rng<R: Rng + ?Sized>(
        &self,
        username: &str,
        action_id: &str,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> Result<ActionOutcome, RealmError> {
        let action = self.catalog.get(action_id)?;
        let rolls = ActionRolls::roll(action, rng);
        let snapshot = self.calendar.snapshot()?;
        match self
            .store
            .perform_action(username, action, &rolls, &snapshot, &self.rules, now)
        {
            Ok(outcome) => {
                info!("{} {}", username, outcome.summary());
                Ok(outcome)
            }
            Err(e) => {
                if e.is_rejection() {
                    debug!("{} rejected for {}: {}", action_id, username, e);
                }
                Err(e)
            }
        }
    }

    pub fn calendar(&self) -> Result<CalendarSnapshot, RealmError> {
        self.calendar.snapshot()
    }

    pub fn advance_calendar(
        &self,
        now: DateTime<Utc>,
    ) -> Result<(CalendarSnapshot, bool), RealmError> {
        self.calendar.advance(now)
    }

    pub fn sweep_energy(&self, now: DateTime<Utc>) -> Result<SweepReport, RealmError> {
        self.store.sweep_energy(&self.rules.energy, now)
    }

    pub fn leaderboard(
        &self,
        skill: SkillKind,
        limit: usize,
    ) -> Result<Vec<LeaderboardEntry>, RealmError> {
        self.store.leaderboard(skill, limit)
    }
}
