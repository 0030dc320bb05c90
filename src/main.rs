//! # Guildhall Main Entry Point
//!
//! Headless driver for the simulation: runs a seeded campaign to
//! completion on the terminal, or rebuilds the banned-name hash file.

use clap::{Parser, Subcommand};
use guildhall::{
    generation, Engine, GuildhallError, GuildhallResult, MissionStatus,
};

/// Command line arguments for Guildhall.
#[derive(Parser, Debug)]
#[command(name = "guildhall")]
#[command(about = "A turn-based fantasy guild management and dungeon crawl simulation")]
#[command(version)]
struct Args {
    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a headless campaign: hire a team, clear missions, report.
    Play {
        /// Random seed for the campaign
        #[arg(short, long)]
        seed: Option<u64>,

        /// Missions to attempt before retiring
        #[arg(short, long, default_value_t = 1)]
        missions: usize,
    },
    /// Rebuild the banned-name hash file from wordlist URLs.
    Banlist {
        /// Wordlist URLs, one token per line
        #[arg(long = "url", required = true)]
        urls: Vec<String>,

        /// Output path for the hash file
        #[arg(long, default_value = guildhall::config::BANNED_HASHES_PATH)]
        output: std::path::PathBuf,
    },
}

fn main() -> GuildhallResult<()> {
    let args = Args::parse();
    initialize_logging(&args.log_level);

    log::info!("Guildhall v{}", guildhall::VERSION);

    match args.command {
        Command::Play { seed, missions } => run_campaign(seed.unwrap_or(12345), missions),
        Command::Banlist { urls, output } => {
            let written = generation::build_from_urls(&urls, &output)?;
            log::info!("Wrote {} digests to {}", written, output.display());
            Ok(())
        }
    }
}

/// Initializes the logging system based on the specified log level.
fn initialize_logging(log_level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

/// Runs a full campaign: setup, hiring, then missions until the count
/// is met or the guild runs out of fighters.
fn run_campaign(seed: u64, missions: usize) -> GuildhallResult<()> {
    log::info!("Setting up campaign with seed {}", seed);
    let mut engine = Engine::setup(seed)?;
    println!(
        "Guild founded: {} ({} gp, level {})",
        engine.state.guild.name,
        engine.state.guild.funds,
        engine.state.guild.level()
    );

    // Hire up to the roster limit and field everyone.
    let limit = engine.state.guild.roster_limit();
    for _ in 0..limit {
        if engine.state.recruit_pool.is_empty() {
            break;
        }
        engine.recruit(0);
    }
    for id in engine.state.guild.roster.clone() {
        engine.assign_to_team(id);
    }
    println!(
        "Team '{}' fields {} members.",
        engine.state.guild.team.name,
        engine.state.guild.team.members.len()
    );

    let mut narrated = 0;
    for outing in 0..missions {
        if engine.state.board.missions.is_empty() {
            engine.refresh_board()?;
        }
        let mission_name = engine.state.board.missions[0].name.clone();
        println!("\n== Outing {}: {} ==", outing + 1, mission_name);

        engine.select_mission(0)?;
        engine.init_combat()?;
        let status = engine.advance()?;

        let log = engine.messages();
        for line in &log[narrated..] {
            println!("  {}", line);
        }
        narrated = log.len();

        match status {
            MissionStatus::Victorious => {
                println!(
                    "Mission cleared. Treasury: {} gp, guild level {}.",
                    engine.state.guild.funds,
                    engine.state.guild.level()
                );
            }
            MissionStatus::Defeated => {
                println!("The team was wiped out. The campaign ends here.");
                return Ok(());
            }
            MissionStatus::InProgress => {
                // Every generated fighter has an AI; a stall means a
                // fighter nobody answers for.
                return Err(GuildhallError::InvalidState(
                    "Campaign stalled awaiting input in headless mode".to_string(),
                ));
            }
            MissionStatus::Idle => unreachable!("advance never reports Idle mid-mission"),
        }

        // Survivors regroup for the next outing.
        for id in engine.state.guild.roster.clone() {
            engine.assign_to_team(id);
        }
        if engine.state.guild.team.members.is_empty() {
            println!("No fighters left to field. The campaign ends here.");
            return Ok(());
        }
    }

    println!("\nThe guild retires with {} gp.", engine.state.guild.funds);
    Ok(())
}
