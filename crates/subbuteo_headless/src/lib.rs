//! Headless match runner for scripted testing and CI verification.
//!
//! This crate drives a [`subbuteo_core`] match without graphics or
//! physics. Touches and goals are reported by the controller instead of
//! being detected on a table, which enables:
//!
//! - **Scripted testing**: a controller plays the match over JSON lines
//! - **CI verification**: RON scenarios with expectations at each step
//! - **Replay verification**: recorded matches must reproduce exactly
//! - **Soak testing**: batches of seeded random matches checked for
//!   broken bookkeeping
//!
//! # Protocol
//!
//! Communication uses JSON lines (one JSON object per line):
//!
//! - **stdin**: Commands from controller (hit, goal, advance, etc.)
//! - **stdout**: Responses and match events (JSON)
//! - **stderr**: Debug logs (human-readable)
//!
//! See [`protocol`] module for the full command/response format.
//!
//! # Example
//!
//! ```bash
//! # Run interactively
//! echo '{"cmd":"start_positioning"}' | cargo run -p subbuteo_headless
//!
//! # Run a scenario
//! cargo run -p subbuteo_headless -- run-scenario crates/subbuteo_headless/scenarios/kick_off_rule.ron
//!
//! # Verify a replay
//! cargo run -p subbuteo_headless -- replay --file match.replay --verify
//! ```

pub mod batch;
pub mod protocol;
pub mod runner;
pub mod scenario;
pub mod store;

pub use batch::{run_batch, BatchConfig, BatchResults};
pub use protocol::{Command, ProtocolError, Response};
pub use runner::{HeadlessConfig, HeadlessRunner};
pub use scenario::{run_scenario, Scenario, ScenarioError, ScenarioReport};
pub use store::FileStore;
