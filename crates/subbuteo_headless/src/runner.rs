//! Headless match runner implementation.
//!
//! The runner owns one [`MatchSession`] and a virtual clock. Commands are
//! applied at the current clock reading; only `advance` moves time, so a
//! controller fully decides when the toss lands and when full time falls.

use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};

use subbuteo_core::coin_toss::TossSource;
use subbuteo_core::config::RulesConfig;
use subbuteo_core::replay::MatchLog;
use subbuteo_core::session::MatchSession;
use subbuteo_core::snapshot::MatchSnapshot;
use subbuteo_core::store::{MatchStore, SubscriptionId};

use crate::protocol::{Command, MatchView, ProtocolError, Response};
use crate::store::FileStore;

/// Headless runner configuration.
#[derive(Debug, Clone)]
pub struct HeadlessConfig {
    /// Id of the match being played.
    pub match_id: String,
    /// Rules in force.
    pub rules: RulesConfig,
    /// Where coin tosses come from.
    pub toss: TossSource,
    /// Start in practice mode.
    pub practice: bool,
    /// Directory for `save` / `load`.
    pub store_dir: PathBuf,
    /// Keep a replay log of applied commands.
    pub record: bool,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            match_id: "headless".to_string(),
            rules: RulesConfig::default(),
            toss: TossSource::default(),
            practice: false,
            store_dir: PathBuf::from("matches"),
            record: true,
        }
    }
}

/// Runner for controller-driven matches.
pub struct HeadlessRunner {
    session: MatchSession,
    log: Option<MatchLog>,
    now_ms: u64,
    store: FileStore,
    watch_tx: Sender<MatchSnapshot>,
    watch_rx: Receiver<MatchSnapshot>,
    watches: HashMap<String, SubscriptionId>,
    quit: bool,
}

impl HeadlessRunner {
    /// Create a new runner with default config.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(HeadlessConfig::default())
    }

    /// Create a runner with custom configuration.
    #[must_use]
    pub fn with_config(config: HeadlessConfig) -> Self {
        let log = config.record.then(|| {
            MatchLog::new(config.match_id.clone(), config.rules.clone(), config.toss.clone())
                .with_practice(config.practice)
        });
        let session = MatchSession::new(config.match_id, config.rules)
            .with_toss_source(config.toss)
            .with_practice(config.practice);
        let (watch_tx, watch_rx) = mpsc::channel();
        Self {
            session,
            log,
            now_ms: 0,
            store: FileStore::new(config.store_dir),
            watch_tx,
            watch_rx,
            watches: HashMap::new(),
            quit: false,
        }
    }

    /// The live session.
    #[must_use]
    pub const fn session(&self) -> &MatchSession {
        &self.session
    }

    /// Virtual clock reading.
    #[must_use]
    pub const fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Replay log so far, if recording.
    #[must_use]
    pub const fn log(&self) -> Option<&MatchLog> {
        self.log.as_ref()
    }

    /// Whether `quit` has been received.
    #[must_use]
    pub const fn should_quit(&self) -> bool {
        self.quit
    }

    /// Apply one command and return everything to print, ending with the
    /// match events it caused.
    pub fn handle(&mut self, command: Command) -> Vec<Response> {
        let name = command.name();
        tracing::debug!(cmd = name, now_ms = self.now_ms, "Handling command");

        let mut responses = Vec::new();
        if let Some(match_command) = command.to_match_command() {
            let outcome = match self.log.as_mut() {
                Some(log) => log.apply(&mut self.session, match_command, self.now_ms),
                None => self.session.apply(&match_command, self.now_ms),
            };
            responses.push(Response::from_outcome(name, outcome));
        } else {
            responses.push(self.handle_control(command));
        }

        responses.extend(
            self.session
                .drain_events()
                .into_iter()
                .map(|event| Response::Event { event }),
        );
        responses.extend(
            self.watch_rx
                .try_iter()
                .map(|snapshot| Response::Snapshot { snapshot }),
        );
        responses
    }

    fn handle_control(&mut self, command: Command) -> Response {
        let name = command.name();
        match command {
            Command::Advance { ms } => {
                self.now_ms = self.now_ms.saturating_add(ms);
                self.session.tick(self.now_ms);
                Response::ack(name)
            }
            Command::Query => Response::State(MatchView::from_session(&self.session, self.now_ms)),
            Command::Hash => Response::StateHash {
                now_ms: self.now_ms,
                hash: self.session.state_hash(self.now_ms),
            },
            Command::Save => {
                let snapshot = self.session.snapshot(self.now_ms);
                match self.store.save(&snapshot) {
                    Ok(()) => Response::Saved {
                        match_id: snapshot.match_id,
                    },
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to save match");
                        Response::error(e.to_string(), Some(name))
                    }
                }
            }
            Command::Load { match_id } => self.load(&match_id),
            Command::Watch { match_id } => {
                if !self.watches.contains_key(&match_id) {
                    let sender = self.watch_tx.clone();
                    let id = self.store.subscribe(
                        &match_id,
                        Box::new(move |snapshot| {
                            // Receiver lives as long as the runner.
                            let _ = sender.send(snapshot.clone());
                        }),
                    );
                    self.watches.insert(match_id, id);
                }
                Response::ack(name)
            }
            Command::Unwatch { match_id } => match self.watches.remove(&match_id) {
                Some(id) => {
                    self.store.unsubscribe(id);
                    Response::ack(name)
                }
                None => Response::error(format!("'{match_id}' is not being watched"), Some(name)),
            },
            Command::SaveReplay { path } => self.save_replay(&path),
            Command::Quit => {
                self.quit = true;
                Response::Bye
            }
            other => Response::error("not a control command", Some(other.name())),
        }
    }

    fn load(&mut self, match_id: &str) -> Response {
        let restored = self.store.load(match_id).and_then(|snapshot| {
            MatchSession::restore(&snapshot, self.session.config().clone(), self.now_ms)
        });
        match restored {
            Ok(session) => {
                self.session.teardown();
                self.session = session;
                if self.log.take().is_some() {
                    tracing::info!(match_id, "Replay recording stopped by load");
                }
                Response::Loaded {
                    match_id: match_id.to_string(),
                    phase: self.session.phase(),
                }
            }
            Err(e) => {
                tracing::warn!(match_id, error = %e, "Failed to load match");
                Response::error(e.to_string(), Some("load"))
            }
        }
    }

    fn save_replay(&mut self, path: &str) -> Response {
        let Some(log) = self.log.as_ref() else {
            return Response::error("no replay is being recorded", Some("save_replay"));
        };
        let mut log = log.clone();
        log.finalize(&mut self.session, self.now_ms);
        match log.save(path) {
            Ok(()) => {
                tracing::info!(path, commands = log.command_count(), "Replay saved");
                Response::ack("save_replay")
            }
            Err(e) => {
                tracing::warn!(path, error = %e, "Failed to save replay");
                Response::error(e.to_string(), Some("save_replay"))
            }
        }
    }

    /// Run the protocol loop until `quit` or end of input.
    ///
    /// Malformed lines produce an error response and the loop carries on.
    ///
    /// # Errors
    ///
    /// Returns an error if reading input or writing output fails.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> Result<(), ProtocolError> {
        write_response(&mut output, &Response::ready(self.session.match_id(), self.now_ms))?;

        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match Command::from_json(line) {
                Ok(command) => {
                    for response in self.handle(command) {
                        write_response(&mut output, &response)?;
                    }
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Unparseable command");
                    write_response(&mut output, &Response::error(format!("Parse error: {e}"), None))?;
                }
            }

            if self.quit {
                break;
            }
        }

        tracing::info!(match_id = %self.session.match_id(), now_ms = self.now_ms, "Runner stopped");
        Ok(())
    }
}

impl Default for HeadlessRunner {
    fn default() -> Self {
        Self::new()
    }
}

fn write_response<W: Write>(output: &mut W, response: &Response) -> Result<(), ProtocolError> {
    serde_json::to_writer(&mut *output, response)?;
    output.write_all(b"\n")?;
    output.flush()?;
    Ok(())
}
