//! Binary entrypoint for the Realmkeep CLI.
//!
//! Commands:
//! - `init` - write a starter `config.toml` and create the realm database
//! - `start` - run the world scheduler (energy sweep + calendar advance) until Ctrl-C
//! - `status` - print the calendar and a brief summary
//! - `create-player <username> [--display-name <name>]` - create a character
//! - `show-player <username>` - print a character with energy re-derived for now
//! - `act <username> <action>` - resolve one action for a character
//! - `advance-calendar` / `sweep-energy` - run a scheduled job once
//! - `leaderboard <skill> [--limit <n>]` - top characters for a skill
//! - `actions` - list the action catalog
//!
//! See the library crate docs for module-level details: `realmkeep::`.
use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use log::{error, info};
use tokio::sync::watch;

use realmkeep::config::Config;
use realmkeep::realm::{RealmError, SkillKind};
use realmkeep::scheduler::WorldScheduler;

#[derive(Parser)]
#[command(name = "realmkeep")]
#[command(about = "Progression, energy and calendar core for a persistent kingdom")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration and create the realm database
    Init,
    /// Run the periodic world jobs until interrupted
    Start,
    /// Show the world calendar and realm statistics
    Status,
    /// Create a new character
    CreatePlayer {
        username: String,
        /// Name shown to other players (defaults to the username)
        #[arg(short, long, default_value = "")]
        display_name: String,
    },
    /// Show a character
    ShowPlayer { username: String },
    /// Perform an action for a character
    Act { username: String, action: String },
    /// Advance the world calendar if a new day has started
    AdvanceCalendar,
    /// Regenerate energy for every character
    SweepEnergy,
    /// Show the top characters for a skill
    Leaderboard {
        skill: SkillKind,
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// List available actions
    Actions,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Init = cli.command {
        init_logging(&None, cli.verbose);
        info!("Initializing new realm configuration");
        Config::create_default(&cli.config).await?;
        info!("Configuration file created at {}", cli.config);
        let cfg = Config::load(&cli.config).await?;
        tokio::fs::create_dir_all(&cfg.storage.data_dir).await?;
        let realm = cfg.open_realm()?;
        info!("Realm database ready; {}", realm.calendar()?);
        return Ok(());
    }

    let config = Config::load(&cli.config).await?;
    init_logging(&Some(config.clone()), cli.verbose);
    let realm = config.open_realm()?;
    let now = Utc::now();

    match cli.command {
        Commands::Init => unreachable!("handled above"),
        Commands::Start => {
            info!("Starting Realmkeep v{} for {}", env!("CARGO_PKG_VERSION"), config.realm.name);
            let (tx, rx) = watch::channel(false);
            let scheduler = WorldScheduler::new(config.scheduler.clone());
            let handle = tokio::spawn(scheduler.run(realm.clone(), rx));
            tokio::signal::ctrl_c().await?;
            info!("Shutdown requested");
            let _ = tx.send(true);
            handle.await?;
        }
        Commands::Status => {
            let snapshot = realm.calendar()?;
            println!("{}", config.realm.name);
            println!("{}", snapshot);
            println!(
                "Season modifiers: travel x{:.2}, gathering x{:.2}",
                snapshot.modifiers.travel_multiplier, snapshot.modifiers.gathering_multiplier
            );
            println!("Characters: {}", realm.store().list_player_ids()?.len());
            println!("Actions: {}", realm.catalog().len());
            let recent = realm.store().recent_logs(5)?;
            if !recent.is_empty() {
                println!("Recent actions:");
                for line in recent {
                    println!("  {}", line);
                }
            }
        }
        Commands::CreatePlayer {
            username,
            display_name,
        } => {
            let player = realm.create_player(&username, &display_name, now)?;
            println!(
                "Created {} ({}) in {} with {} gold and {}/{} energy",
                player.username,
                player.display_name,
                player.location,
                player.gold,
                player.energy.current,
                player.energy.max
            );
        }
        Commands::ShowPlayer { username } => {
            let player = realm.player(&username, now)?;
            let curve = &realm.rules().curve;
            println!("{} ({}) - {}", player.display_name, player.username, player.location);
            if let realmkeep::realm::PlayerState::Traveling {
                destination,
                arrives_at,
                ..
            } = &player.state
            {
                println!("Travelling to {} (arrives {})", destination, arrives_at.format("%Y-%m-%d %H:%M UTC"));
            }
            println!(
                "Energy {}/{} (full at {})",
                player.energy.current,
                player.energy.max,
                player.energy.full_at(&realm.rules().energy).format("%H:%M UTC")
            );
            println!("Gold {}", player.gold);
            for skill in player.skills.iter() {
                let to_next = curve
                    .xp_to_next_level(skill.level, skill.xp)
                    .map(|xp| format!("{} to next", xp))
                    .unwrap_or_else(|| "max".to_string());
                println!(
                    "  {:<13} {:>2}  {:>10} xp  {:>5.1}%  {}",
                    skill.kind.to_string(),
                    skill.level,
                    skill.xp,
                    skill.progress_percent(curve),
                    to_next
                );
            }
            if !player.inventory.is_empty() {
                println!("Inventory:");
                for (item, qty) in &player.inventory {
                    println!("  {} x{}", item, qty);
                }
            }
        }
        Commands::Act { username, action } => match realm.perform(&username, &action, now) {
            Ok(outcome) => println!("{}", outcome.summary()),
            Err(e) if e.is_rejection() => println!("Rejected: {}", e),
            Err(RealmError::UnknownAction(id)) => {
                error!("Unknown action '{}'; run `realmkeep actions` for the list", id);
                std::process::exit(2);
            }
            Err(e) => return Err(e.into()),
        },
        Commands::AdvanceCalendar => {
            let (snapshot, advanced) = realm.advance_calendar(now)?;
            if advanced {
                println!("Advanced: {}", snapshot);
            } else {
                println!("Already advanced today: {}", snapshot);
            }
        }
        Commands::SweepEnergy => {
            let report = realm.sweep_energy(now)?;
            println!(
                "Swept {} character(s): {} credited, {} failed",
                report.players, report.credited, report.failed
            );
        }
        Commands::Leaderboard { skill, limit } => {
            let entries = realm.leaderboard(skill, limit)?;
            println!("Top {} by {}", entries.len(), skill);
            for (rank, entry) in entries.iter().enumerate() {
                println!(
                    "{:>3}. {:<24} {:>2} ({} xp)",
                    rank + 1,
                    entry.display_name,
                    entry.level,
                    entry.xp
                );
            }
        }
        Commands::Actions => {
            for action in realm.catalog().iter() {
                let gate = match action.skill {
                    Some(skill) => format!("{} {}", skill, action.required_level),
                    None => "-".to_string(),
                };
                println!(
                    "{:<28} {:<10} energy {:>3}  {}",
                    action.id,
                    format!("{:?}", action.kind).to_lowercase(),
                    action.energy_cost,
                    gate
                );
            }
        }
    }

    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let configured = config
        .as_ref()
        .and_then(|cfg| cfg.logging.level.parse::<log::LevelFilter>().ok())
        .unwrap_or(log::LevelFilter::Info);
    let base_level = match verbosity {
        0 => configured,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);
    let log_file = config
        .as_ref()
        .and_then(|cfg| cfg.logging.file.as_ref())
        .and_then(|file| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)
                .ok()
        });
    if let Some(f) = log_file {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        // Mirror to the console only when attached to a terminal
        let is_tty = atty::is(atty::Stream::Stdout);
        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());
            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }
            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
        });
    }
    let _ = builder.try_init();
}
