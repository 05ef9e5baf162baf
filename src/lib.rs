//! # Realmkeep - progression core for a persistent medieval kingdom
//!
//! Realmkeep owns the rules that every gameplay request in the kingdom runs
//! through: skills and their XP curve, regenerating energy, the shared world
//! calendar and its seasons, and the resolver that turns "chop oak" or "travel
//! to Stonehelm" into an atomic change to one player's record.
//!
//! ## Features
//!
//! - **Skills**: thirteen skills on a 1-99 XP curve; combat skills start at level 5.
//! - **Energy**: lazily regenerated from elapsed time, never ticked per second.
//! - **World Calendar**: one global day counter, advanced once per real day, from
//!   which day/week/season/year and the seasonal travel and yield modifiers derive.
//! - **Actions**: data-driven gathering, crafting, construction, work and travel,
//!   resolved inside a Sled transaction per player.
//! - **Scheduler**: Tokio-driven energy sweep and calendar advance.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chrono::Utc;
//! use realmkeep::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let realm = config.open_realm()?;
//!
//!     realm.create_player("aldric", "Aldric", Utc::now())?;
//!     let outcome = realm.perform("aldric", "chop_oak", Utc::now())?;
//!     println!("{}", outcome.summary());
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`realm`] - skills, energy, calendar, actions, resolver, store and service
//! - [`scheduler`] - periodic energy sweep and calendar advance
//! - [`config`] - TOML configuration and validation
//! - [`validation`] - character name validation

pub mod config;
pub mod realm;
pub mod scheduler;
pub mod validation;
