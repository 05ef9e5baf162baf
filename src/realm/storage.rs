use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::IVec;

use crate::realm::actions::{ActionDefinition, ActionRolls};
use crate::realm::calendar::{CalendarRecord, CalendarSnapshot};
use crate::realm::energy::{EnergyRules, EnergyState, RegenOutcome};
use crate::realm::errors::RealmError;
use crate::realm::resolver::{resolve_action, ActionOutcome, GameRules};
use crate::realm::types::{
    LevelChange, PlayerRecord, SkillKind, CALENDAR_SCHEMA_VERSION, PLAYER_SCHEMA_VERSION,
};
use crate::realm::xp::XpCurve;

const TREE_PLAYERS: &str = "realm_players";
const TREE_WORLD: &str = "realm_world";
const TREE_LOGS: &str = "realm_logs";

const CALENDAR_KEY: &[u8] = b"calendar:world";
const PLAYER_PREFIX: &str = "players:";

fn next_timestamp_nanos() -> i64 {
    let now = Utc::now();
    now.timestamp_nanos_opt()
        .unwrap_or_else(|| now.timestamp_micros() * 1000)
}

/// Helper builder so tests can easily create throwaway stores with custom paths.
pub struct RealmStoreBuilder {
    path: PathBuf,
    calendar_start: Option<DateTime<Utc>>,
}

impl RealmStoreBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            calendar_start: None,
        }
    }

    /// Pin the creation time of a brand-new calendar (tests use this to control day boundaries).
    pub fn with_calendar_start(mut self, start: DateTime<Utc>) -> Self {
        self.calendar_start = Some(start);
        self
    }

    pub fn open(self) -> Result<RealmStore, RealmError> {
        RealmStore::open_with_options(self.path, self.calendar_start.unwrap_or_else(Utc::now))
    }
}

/// One row of a skill leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub username: String,
    pub display_name: String,
    pub level: u8,
    pub xp: u64,
}

/// Totals from one pass of the energy sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepReport {
    pub players: usize,
    pub credited: usize,
    pub failed: usize,
}

/// Sled-backed persistence for player and calendar records.
///
/// Every player mutation runs inside a sled transaction on that player's key,
/// so concurrent requests for the same player are serialised and a failed
/// resolution leaves the stored record unchanged.
#[derive(Clone)]
pub struct RealmStore {
    _db: sled::Db,
    players: sled::Tree,
    world: sled::Tree,
    logs: sled::Tree,
}

impl RealmStore {
    /// Open (or create) the realm store rooted at `path`, creating the world
    /// calendar on first use.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RealmError> {
        Self::open_with_options(path, Utc::now())
    }

    fn open_with_options<P: AsRef<Path>>(
        path: P,
        calendar_start: DateTime<Utc>,
    ) -> Result<Self, RealmError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        let players = db.open_tree(TREE_PLAYERS)?;
        let world = db.open_tree(TREE_WORLD)?;
        let logs = db.open_tree(TREE_LOGS)?;
        let store = Self {
            _db: db,
            players,
            world,
            logs,
        };
        if store.ensure_calendar(calendar_start)? {
            info!("Created world calendar at day 1");
        }
        Ok(store)
    }

    fn players_key(username: &str) -> Vec<u8> {
        format!("{}{}", PLAYER_PREFIX, username.to_ascii_lowercase()).into_bytes()
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, RealmError> {
        Ok(bincode::serialize(value)?)
    }

    fn decode_player(bytes: &[u8]) -> Result<PlayerRecord, RealmError> {
        let record: PlayerRecord = bincode::deserialize(bytes)?;
        if record.schema_version != PLAYER_SCHEMA_VERSION {
            return Err(RealmError::SchemaMismatch {
                entity: "player",
                expected: PLAYER_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    fn decode_calendar(bytes: &[u8]) -> Result<CalendarRecord, RealmError> {
        let record: CalendarRecord = bincode::deserialize(bytes)?;
        if record.schema_version != CALENDAR_SCHEMA_VERSION {
            return Err(RealmError::SchemaMismatch {
                entity: "calendar",
                expected: CALENDAR_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    fn unwrap_tx<T>(result: Result<T, TransactionError<RealmError>>) -> Result<T, RealmError> {
        result.map_err(|err| match err {
            TransactionError::Abort(inner) => inner,
            TransactionError::Storage(inner) => RealmError::Sled(inner),
        })
    }

    /// Insert a brand-new player; fails if the username is taken.
    pub fn create_player(&self, mut player: PlayerRecord) -> Result<(), RealmError> {
        player.schema_version = PLAYER_SCHEMA_VERSION;
        let key = Self::players_key(&player.username);
        let bytes = Self::serialize(&player)?;
        let swapped = self
            .players
            .compare_and_swap(key, None as Option<&[u8]>, Some(bytes))?;
        if swapped.is_err() {
            return Err(RealmError::AlreadyExists(format!(
                "player: {}",
                player.username
            )));
        }
        self.players.flush()?;
        debug!("Created player {}", player.username);
        Ok(())
    }

    /// Insert or overwrite a player record without any gameplay checks.
    pub fn put_player(&self, mut player: PlayerRecord) -> Result<(), RealmError> {
        player.schema_version = PLAYER_SCHEMA_VERSION;
        let key = Self::players_key(&player.username);
        let bytes = Self::serialize(&player)?;
        self.players.insert(key, bytes)?;
        self.players.flush()?;
        Ok(())
    }

    /// Fetch a player record by username.
    pub fn get_player(&self, username: &str) -> Result<PlayerRecord, RealmError> {
        let key = Self::players_key(username);
        let Some(bytes) = self.players.get(&key)? else {
            return Err(RealmError::NotFound(format!("player: {}", username)));
        };
        Self::decode_player(&bytes)
    }

    /// List all player usernames currently stored.
    pub fn list_player_ids(&self) -> Result<Vec<String>, RealmError> {
        let mut ids = Vec::new();
        for entry in self.players.scan_prefix(PLAYER_PREFIX.as_bytes()) {
            let (key, _) = entry?;
            let text = String::from_utf8_lossy(&key);
            if let Some(username) = text.strip_prefix(PLAYER_PREFIX) {
                ids.push(username.to_string());
            }
        }
        Ok(ids)
    }

    /// Run `mutate` against the stored player under an exclusive transaction.
    ///
    /// The closure may run more than once if another writer touches the same
    /// record concurrently; it must not have side effects outside the record.
    /// Returning an error aborts the transaction and persists nothing.
    pub fn update_player<T, F>(&self, username: &str, mutate: F) -> Result<T, RealmError>
    where
        F: Fn(&mut PlayerRecord) -> Result<T, RealmError>,
    {
        self.mutate_player(username, |player| Ok((mutate(player)?, true)))
    }

    /// Like [`update_player`](Self::update_player), but the closure reports
    /// whether it changed the record; unchanged records are not rewritten.
    fn mutate_player<T, F>(&self, username: &str, mutate: F) -> Result<T, RealmError>
    where
        F: Fn(&mut PlayerRecord) -> Result<(T, bool), RealmError>,
    {
        let key = Self::players_key(username);
        let result = self.players.transaction(|tx| {
            let Some(bytes) = tx.get(key.as_slice())? else {
                return Err(ConflictableTransactionError::Abort(RealmError::NotFound(
                    format!("player: {}", username),
                )));
            };
            let mut player =
                Self::decode_player(&bytes).map_err(ConflictableTransactionError::Abort)?;
            let (value, changed) =
                mutate(&mut player).map_err(ConflictableTransactionError::Abort)?;
            if changed {
                let encoded =
                    Self::serialize(&player).map_err(ConflictableTransactionError::Abort)?;
                tx.insert(key.as_slice(), encoded)?;
            }
            Ok((value, changed))
        });
        let (value, changed) = Self::unwrap_tx(result)?;
        if changed {
            self.players.flush()?;
        }
        Ok(value)
    }

    /// Bring a player's energy and travel state up to `now`.
    pub fn regenerate_player(
        &self,
        username: &str,
        rules: &EnergyRules,
        now: DateTime<Utc>,
    ) -> Result<(EnergyState, RegenOutcome), RealmError> {
        self.mutate_player(username, |player| {
            let outcome = player.energy.regenerate(now, rules);
            let arrived = player.settle_travel(now).is_some();
            let changed = outcome.applied() || arrived;
            if changed {
                player.updated_at = now;
            }
            Ok(((player.energy, outcome), changed))
        })
    }

    /// Credit XP to one skill outside of an action (quest rewards, admin grants).
    pub fn grant_xp(
        &self,
        username: &str,
        skill: SkillKind,
        amount: u64,
        curve: &XpCurve,
        now: DateTime<Utc>,
    ) -> Result<LevelChange, RealmError> {
        self.update_player(username, |player| {
            let change = player.skills.grant_xp(skill, amount, curve);
            player.updated_at = now;
            Ok(change)
        })
    }

    /// Resolve and persist one action atomically.
    pub fn perform_action(
        &self,
        username: &str,
        action: &ActionDefinition,
        rolls: &ActionRolls,
        calendar: &CalendarSnapshot,
        rules: &GameRules,
        now: DateTime<Utc>,
    ) -> Result<ActionOutcome, RealmError> {
        let outcome = self.update_player(username, |player| {
            resolve_action(player, action, rolls, calendar, rules, now)
        })?;
        if let Err(e) = self.append_log(&format!("{} {}", username, outcome.summary())) {
            warn!("Failed to append action log for {}: {}", username, e);
        }
        Ok(outcome)
    }

    /// Regenerate every player's energy. Individual failures are logged and
    /// skipped; the next sweep retries them.
    pub fn sweep_energy(
        &self,
        rules: &EnergyRules,
        now: DateTime<Utc>,
    ) -> Result<SweepReport, RealmError> {
        let mut report = SweepReport::default();
        for username in self.list_player_ids()? {
            report.players += 1;
            match self.regenerate_player(&username, rules, now) {
                Ok((_, outcome)) if outcome.applied() => report.credited += 1,
                Ok(_) => {}
                Err(e) => {
                    warn!("Energy sweep skipped {}: {}", username, e);
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }

    fn ensure_calendar(&self, now: DateTime<Utc>) -> Result<bool, RealmError> {
        let bytes = Self::serialize(&CalendarRecord::new(now))?;
        let swapped = self
            .world
            .compare_and_swap(CALENDAR_KEY, None as Option<&[u8]>, Some(bytes))?;
        if swapped.is_ok() {
            self.world.flush()?;
        }
        Ok(swapped.is_ok())
    }

    /// Current calendar record, read as a single value.
    pub fn calendar_record(&self) -> Result<CalendarRecord, RealmError> {
        let Some(bytes) = self.world.get(CALENDAR_KEY)? else {
            return Err(RealmError::NotFound("calendar".to_string()));
        };
        Self::decode_calendar(&bytes)
    }

    /// Advance the calendar by one day if `now` is on a later real (UTC) day
    /// than the last advancement.
    pub fn advance_calendar(
        &self,
        now: DateTime<Utc>,
    ) -> Result<(CalendarRecord, bool), RealmError> {
        let result = self.world.transaction(|tx| {
            let Some(bytes) = tx.get(CALENDAR_KEY)? else {
                return Err(ConflictableTransactionError::Abort(RealmError::NotFound(
                    "calendar".to_string(),
                )));
            };
            let mut record =
                Self::decode_calendar(&bytes).map_err(ConflictableTransactionError::Abort)?;
            let advanced = record.advance(now);
            if advanced {
                let encoded =
                    Self::serialize(&record).map_err(ConflictableTransactionError::Abort)?;
                tx.insert(CALENDAR_KEY, encoded)?;
            }
            Ok((record, advanced))
        });
        let (record, advanced) = Self::unwrap_tx(result)?;
        if advanced {
            self.world.flush()?;
            info!("World calendar advanced to day {}", record.absolute_day);
        } else {
            debug!(
                "World calendar already advanced today (day {})",
                record.absolute_day
            );
        }
        Ok((record, advanced))
    }

    /// Top players for one skill, highest XP first. Reads a point-in-time scan
    /// without locking, so concurrent actions may or may not be reflected.
    pub fn leaderboard(
        &self,
        skill: SkillKind,
        limit: usize,
    ) -> Result<Vec<LeaderboardEntry>, RealmError> {
        let mut entries = Vec::new();
        for entry in self.players.scan_prefix(PLAYER_PREFIX.as_bytes()) {
            let (_, value) = entry?;
            let player = match Self::decode_player(&value) {
                Ok(p) => p,
                Err(e) => {
                    warn!("Skipping unreadable player record in leaderboard: {}", e);
                    continue;
                }
            };
            entries.push(LeaderboardEntry {
                level: player.skills.level(skill),
                xp: player.skills.xp(skill),
                username: player.username,
                display_name: player.display_name,
            });
        }
        entries.sort_by(|a, b| b.xp.cmp(&a.xp).then_with(|| a.username.cmp(&b.username)));
        entries.truncate(limit);
        Ok(entries)
    }

    /// Append a line to the diagnostic log tree.
    pub fn append_log(&self, message: &str) -> Result<(), RealmError> {
        let key = format!("logs:{:020}", next_timestamp_nanos()).into_bytes();
        self.logs.insert(key, message.as_bytes())?;
        self.logs.flush()?;
        Ok(())
    }

    /// Most recent diagnostic log lines, newest first.
    pub fn recent_logs(&self, limit: usize) -> Result<Vec<String>, RealmError> {
        let mut lines = Vec::new();
        for entry in self.logs.scan_prefix(b"logs:").rev().take(limit) {
            let (_, value): (IVec, IVec) = entry?;
            lines.push(std::str::from_utf8(&value).map(str::to_string).unwrap_or_default());
        }
        Ok(lines)
    }
}
