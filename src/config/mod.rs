//! # Configuration Management Module
//!
//! Realmkeep reads a single TOML file. Every gameplay constant that is a
//! matter of design rather than algorithm (energy regeneration, seasonal
//! modifiers, the XP table, scheduler cadence) lives here instead of in code.
//!
//! ## Configuration File Format
//!
//! ```toml
//! [realm]
//! name = "The Kingdom of Ashford"
//! starting_location = "ashford"
//! starting_gold = 25
//!
//! [storage]
//! data_dir = "./data"
//!
//! [logging]
//! level = "info"
//! file = "realmkeep.log"
//!
//! [energy]
//! max_energy = 100
//! regen_amount = 1
//! regen_interval_secs = 180
//!
//! [calendar.seasons.winter]
//! travel_multiplier = 1.5
//! gathering_multiplier = 0.7
//!
//! [scheduler]
//! energy_sweep_secs = 300
//! calendar_check_secs = 60
//! ```
//!
//! Sections other than `[realm]`, `[storage]` and `[logging]` may be omitted
//! and fall back to their defaults.

use anyhow::{anyhow, bail, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

use crate::realm::{
    load_actions_from_json, ActionCatalog, EnergyRules, GameRules, RealmService, RealmStore,
    SeasonTable, StartingKit, XpCurve,
};
use crate::scheduler::WorldSchedulerConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub realm: RealmConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub energy: EnergyConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub progression: ProgressionConfig,
    #[serde(default)]
    pub scheduler: WorldSchedulerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealmConfig {
    pub name: String,
    pub starting_location: String,
    pub starting_gold: u64,
    /// Optional JSON seed that adds to or overrides the built-in action catalog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
    /// Optional override for the Sled database path; defaults to `<data_dir>/realm`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<String>,
}

impl StorageConfig {
    pub fn resolved_db_path(&self) -> PathBuf {
        match &self.db_path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(&self.data_dir).join("realm"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnergyConfig {
    pub max_energy: u32,
    pub regen_amount: u32,
    pub regen_interval_secs: u64,
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            max_energy: 100,
            regen_amount: 1,
            regen_interval_secs: 180,
        }
    }
}

/// Largest interval chrono can represent as a `Duration` of seconds.
pub const MAX_REGEN_INTERVAL_SECS: u64 = (i64::MAX / 1000) as u64;

impl EnergyConfig {
    pub fn rules(&self) -> EnergyRules {
        let secs = self.regen_interval_secs.min(MAX_REGEN_INTERVAL_SECS) as i64;
        EnergyRules {
            max_energy: self.max_energy,
            regen_amount: self.regen_amount,
            regen_interval: Duration::seconds(secs),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CalendarConfig {
    #[serde(default)]
    pub seasons: SeasonTable,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProgressionConfig {
    /// Cumulative XP for levels 1..=99. When absent the classic table is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xp_thresholds: Option<Vec<u64>>,
}

impl ProgressionConfig {
    pub fn curve(&self) -> Result<XpCurve> {
        match &self.xp_thresholds {
            Some(table) => Ok(XpCurve::from_thresholds(table.clone())?),
            None => Ok(XpCurve::classic()),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    /// Reject values that would stall or break the rules.
    pub fn validate(&self) -> Result<()> {
        if self.realm.starting_location.trim().is_empty() {
            bail!("realm.starting_location must not be empty");
        }
        if self.energy.max_energy == 0 {
            bail!("energy.max_energy must be greater than zero");
        }
        if self.energy.regen_interval_secs == 0 {
            bail!("energy.regen_interval_secs must be greater than zero");
        }
        if self.energy.regen_interval_secs > MAX_REGEN_INTERVAL_SECS {
            bail!(
                "energy.regen_interval_secs must not exceed {}",
                MAX_REGEN_INTERVAL_SECS
            );
        }
        if self.scheduler.energy_sweep_secs == 0 || self.scheduler.calendar_check_secs == 0 {
            bail!("scheduler intervals must be greater than zero");
        }
        self.calendar.seasons.validate()?;
        self.progression.curve()?;
        Ok(())
    }

    pub fn game_rules(&self) -> Result<GameRules> {
        Ok(GameRules {
            curve: self.progression.curve()?,
            energy: self.energy.rules(),
        })
    }

    pub fn starting_kit(&self) -> StartingKit {
        StartingKit {
            location: self.realm.starting_location.clone(),
            gold: self.realm.starting_gold,
        }
    }

    /// Built-in actions plus anything from `realm.actions_file`.
    pub fn action_catalog(&self) -> Result<ActionCatalog> {
        let mut catalog = ActionCatalog::builtin();
        if let Some(path) = &self.realm.actions_file {
            let extra = load_actions_from_json(path)
                .map_err(|e| anyhow!("Failed to load actions from {}: {}", path, e))?;
            let count = catalog.extend(extra)?;
            log::info!("Loaded {} action(s) from {}", count, path);
        }
        Ok(catalog)
    }

    /// Open the store and assemble a ready-to-use realm service.
    pub fn open_realm(&self) -> Result<RealmService> {
        let db_path = self.storage.resolved_db_path();
        let store = RealmStore::open(&db_path)
            .map_err(|e| anyhow!("Failed to open realm store at {}: {}", db_path.display(), e))?;
        Ok(RealmService::new(
            store,
            self.game_rules()?,
            self.calendar.seasons,
            self.action_catalog()?,
            self.starting_kit(),
        ))
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            realm: RealmConfig {
                name: "The Kingdom of Ashford".to_string(),
                starting_location: "ashford".to_string(),
                starting_gold: 25,
                actions_file: None,
            },
            storage: StorageConfig {
                data_dir: "./data".to_string(),
                db_path: None,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some("realmkeep.log".to_string()),
            },
            energy: EnergyConfig::default(),
            calendar: CalendarConfig::default(),
            progression: ProgressionConfig::default(),
            scheduler: WorldSchedulerConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        config.validate().expect("default valid");
        let rules = config.game_rules().expect("rules");
        assert_eq!(rules.energy.max_energy, 100);
        assert_eq!(rules.energy.regen_interval, Duration::minutes(3));
        assert_eq!(rules.curve.xp_for_level(99), 13_034_431);
    }

    #[test]
    fn toml_round_trip() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).expect("serialize");
        let parsed: Config = toml::from_str(&text).expect("parse");
        assert_eq!(parsed.realm.name, config.realm.name);
        assert_eq!(parsed.calendar.seasons, config.calendar.seasons);
        assert_eq!(parsed.scheduler.energy_sweep_secs, 300);
    }

    #[test]
    fn omitted_sections_use_defaults() {
        let text = r#"
            [realm]
            name = "Test"
            starting_location = "ashford"
            starting_gold = 0

            [storage]
            data_dir = "/tmp/realm"

            [logging]
            level = "debug"

            [calendar.seasons.spring]
            travel_multiplier = 1.0
            gathering_multiplier = 2.0

            [calendar.seasons.summer]
            travel_multiplier = 1.0
            gathering_multiplier = 1.0

            [calendar.seasons.autumn]
            travel_multiplier = 1.0
            gathering_multiplier = 1.0

            [calendar.seasons.winter]
            travel_multiplier = 2.0
            gathering_multiplier = 0.5
        "#;
        let config: Config = toml::from_str(text).expect("parse");
        config.validate().expect("valid");
        assert_eq!(config.energy.max_energy, 100);
        assert_eq!(config.calendar.seasons.spring.gathering_multiplier, 2.0);
        assert_eq!(
            config.storage.resolved_db_path(),
            PathBuf::from("/tmp/realm").join("realm")
        );
    }

    #[test]
    fn invalid_values_rejected() {
        let mut config = Config::default();
        config.energy.regen_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.progression.xp_thresholds = Some(vec![0, 1, 2]);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.calendar.seasons.summer.travel_multiplier = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn oversized_regen_interval_rejected_and_clamped() {
        let mut config = Config::default();
        config.energy.regen_interval_secs = u64::MAX;
        assert!(config.validate().is_err());
        // rules() never panics even if validation was skipped
        let rules = config.energy.rules();
        assert_eq!(
            rules.regen_interval,
            Duration::seconds(MAX_REGEN_INTERVAL_SECS as i64)
        );

        config.energy.regen_interval_secs = MAX_REGEN_INTERVAL_SECS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn oversized_travel_multiplier_rejected() {
        let mut config = Config::default();
        config.calendar.seasons.spring.travel_multiplier = 1000.0;
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn create_default_then_load() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let path = dir.path().join("config.toml");
        let path = path.to_str().expect("utf-8 path");
        Config::create_default(path).await.expect("create");
        let loaded = Config::load(path).await.expect("load");
        assert_eq!(loaded.realm.starting_location, "ashford");
    }
}
