//! # Subbuteo Core
//!
//! Deterministic rules core for table-football matches.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No physics engine (bodies are reached through [`flick::PhysicsBody`])
//! - No system time (every operation takes the caller's `now_ms`)
//! - No system randomness (coin tosses come from a seeded source)
//!
//! This separation enables:
//! - Headless matches driven by scripts or a JSON protocol
//! - Exact replays and state hashing
//! - Testing every rule without a game engine
//!
//! ## Crate Structure
//!
//! - [`session`] - Match phase state machine, goals, clock-driven full time
//! - [`turn`] - Possession rules as a pure function
//! - [`flick`] - Press-and-hold flick controller
//! - [`clock`] / [`timers`] - Match clock and cancellable timers
//! - [`snapshot`] / [`store`] / [`replay`] - Persistence and playback
//! - [`config`] - Tunable rules

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod clock;
pub mod coin_toss;
pub mod command;
pub mod config;
pub mod error;
pub mod flick;
pub mod math;
pub mod motion;
pub mod phase;
pub mod power;
pub mod replay;
pub mod scoring;
pub mod session;
pub mod snapshot;
pub mod store;
pub mod timers;
pub mod turn;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::clock::MatchClock;
    pub use crate::coin_toss::{CoinToss, TossSource};
    pub use crate::command::{CommandOutcome, MatchCommand};
    pub use crate::config::RulesConfig;
    pub use crate::error::{GameError, Result};
    pub use crate::flick::{
        FlickController, FlickResponse, FlickSignal, GroundProjector, IgnoreReason, PhysicsBody,
        PointerEvent, ScreenPoint,
    };
    pub use crate::math::{Fixed, PlanarVec};
    pub use crate::phase::{MatchPhase, Team, Touch};
    pub use crate::power::{power_for_hold, PowerChargeSession};
    pub use crate::replay::MatchLog;
    pub use crate::scoring::{GoalRecord, Score};
    pub use crate::session::{MatchEvent, MatchSession, PhaseRejection, PhaseResult};
    pub use crate::snapshot::MatchSnapshot;
    pub use crate::store::{MatchStore, MemoryStore, SubscriptionId};
    pub use crate::turn::{apply_hit, HitReason, HitReport, TurnState};
}
