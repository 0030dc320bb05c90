//! # Guildhall
//!
//! A turn-based fantasy guild management and dungeon crawl simulation.
//!
//! ## Architecture Overview
//!
//! Guildhall is a headless simulation core designed to sit beneath any
//! rendering or UI layer. The crate revolves around several key concepts:
//!
//! - **Game State**: Central registry of entities plus the guild, the
//!   mission board and the active dungeon
//! - **Entity System**: Entities composed of optional capabilities
//!   (fighter, inventory, item, AI, locatable)
//! - **Action System**: Command pattern for combat actions with
//!   action-point budgets
//! - **Combat Round**: A lazy, pull-driven producer of combat events
//! - **Dispatcher**: Topic/subscriber bus decoupling simulation events
//!   from observers (AI, occupancy, UI)
//! - **Generation System**: Procedural missions, recruits and names with
//!   a hash-based banned-word filter
//!
//! ## Driving the simulation
//!
//! The [`Engine`] owns the game state and both dispatchers. A driver pulls
//! one event at a time; observers run synchronously between pulls, which
//! is what lets an AI subscriber answer an input request before the round
//! continues.

pub mod game;
pub mod generation;

// Core module re-exports
pub use game::*;
pub use generation::*;

// Explicit re-exports for commonly used types
pub use game::{
    // From actions
    Action,
    ActionChoices,
    ActionDetails,
    AttackAction,
    ConcreteAction,
    ConsumeAction,
    EndTurnAction,
    MoveAction,
    // From entities
    DeathHook,
    Entity,
    EntityId,
    Locatable,
    Name,
    Species,
    // From fighter
    ActionPoints,
    Fighter,
    RetreatHook,
    // From combat
    CombatRound,
    RoundPhase,
    // From events
    GameEvent,
    MessageImportance,
    Topic,
    // From dispatch
    Dispatcher,
    Subscriber,
    // From state
    Engine,
    GameState,
    MissionStatus,
    // From world
    Biome,
    Dungeon,
    MissionBoard,
    Position,
    Room,
};

pub use generation::{
    DungeonGenerator, GenerationConfig, Generator, NameFilter, RecruitGenerator,
};

/// Core error type for the Guildhall simulation.
#[derive(thiserror::Error, Debug)]
pub enum GuildhallError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Game state is invalid
    #[error("Invalid game state: {0}")]
    InvalidState(String),

    /// Action cannot be performed
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// Generation failed
    #[error("Generation failed: {0}")]
    GenerationFailed(String),
}

/// Result type used throughout the Guildhall codebase.
pub type GuildhallResult<T> = Result<T, GuildhallError>;

/// Version information for the simulation.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Game configuration constants.
pub mod config {
    /// Experience required per guild or fighter level
    pub const XP_PER_LEVEL: u64 = 1000;

    /// Roster capacity per guild level
    pub const ROSTER_SCALAR: f32 = 1.5;

    /// Action points granted to every fighter at turn start
    pub const DEFAULT_AP_PER_TURN: u32 = 5;

    /// A fighter whose hp ratio is driven below this by a hit retreats
    pub const RETREAT_THRESHOLD: f64 = 0.2;

    /// Recruits available for hire after setup
    pub const RECRUIT_POOL_SIZE: usize = 8;

    /// Missions offered on the board at any time
    pub const MISSION_BOARD_SIZE: usize = 3;

    /// Length in bytes of one entry in the banned-name hash file
    pub const SHA256_DIGEST_LEN: usize = 32;

    /// Default location of the banned-name hash file
    pub const BANNED_HASHES_PATH: &str = "wordlists/hashes.bin";
}
