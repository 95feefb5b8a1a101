//! HUD plugin using egui.
//!
//! Provides the scoreboard (score, clock, phase, possession), the charge
//! meter and a short feed of recent match events.

use std::collections::VecDeque;

use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPlugin};
use subbuteo_core::flick::FlickResponse;
use subbuteo_core::phase::{MatchPhase, Team};
use subbuteo_core::session::MatchEvent;

use crate::flick::FlickInput;
use crate::match_flow::{now_ms, MatchEventFired, MatchFlowSet, MatchState};

/// Number of lines kept in the event feed.
pub const FEED_LEN: usize = 5;

/// Plugin for the in-game HUD.
///
/// Provides:
/// - Scoreboard (top bar)
/// - Charge meter and last flick result (bottom bar)
/// - Event feed (top-right)
pub struct HudPlugin;

impl Plugin for HudPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(EguiPlugin)
            .init_resource::<EventFeed>()
            .add_systems(Update, collect_feed.after(MatchFlowSet::Publish))
            .add_systems(Update, (ui_scoreboard, ui_charge_meter, ui_event_feed).after(collect_feed));
    }
}

/// Recent match events, newest last.
#[derive(Resource, Debug, Default)]
pub struct EventFeed {
    /// Formatted lines.
    pub lines: VecDeque<String>,
}

impl EventFeed {
    /// Append a line, dropping the oldest past [`FEED_LEN`].
    pub fn push(&mut self, line: String) {
        self.lines.push_back(line);
        while self.lines.len() > FEED_LEN {
            self.lines.pop_front();
        }
    }
}

/// `mm:ss` for a number of seconds.
#[must_use]
pub fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Feed line for an event, `None` for events not worth showing.
#[must_use]
pub fn describe_event(event: &MatchEvent) -> Option<String> {
    match event {
        MatchEvent::PhaseChanged { to, .. } => Some(match to {
            MatchPhase::Positioning => "Place your figures".to_string(),
            MatchPhase::CoinToss => "Coin toss".to_string(),
            MatchPhase::KickOff => "Kick-off".to_string(),
            MatchPhase::Paused => "Paused".to_string(),
            MatchPhase::InProgress | MatchPhase::NotStarted | MatchPhase::Completed => {
                return None
            }
        }),
        MatchEvent::TossStarted => None,
        MatchEvent::TossResolved { winner } => Some(format!("{} wins the toss", team_label(*winner))),
        MatchEvent::TurnChanged { team, reason } => Some(format!(
            "{} ball ({})",
            team_label(*team),
            reason.as_str().replace('_', " ")
        )),
        MatchEvent::GoalScored(goal) => Some(format!(
            "GOAL {} - {} #{} ({}')",
            team_label(goal.team),
            goal.scorer_name,
            goal.scorer_number,
            goal.elapsed_seconds
        )),
        MatchEvent::MatchCompleted { score, .. } => {
            Some(format!("Full time {} - {}", score.home, score.away))
        }
    }
}

const fn team_label(team: Team) -> &'static str {
    match team {
        Team::Home => "Home",
        Team::Away => "Away",
    }
}

fn collect_feed(mut events: EventReader<MatchEventFired>, mut feed: ResMut<EventFeed>) {
    for MatchEventFired(event) in events.read() {
        if let Some(line) = describe_event(event) {
            feed.push(line);
        }
    }
}

fn ui_scoreboard(mut contexts: EguiContexts, time: Res<Time>, state: Res<MatchState>) {
    let Some(ctx) = contexts.try_ctx_mut() else {
        return;
    };
    let session = &state.session;
    let now = now_ms(&time);
    let score = session.score();

    let clock = match session.remaining_seconds(now) {
        Some(remaining) => format_clock(remaining),
        None => format!("{} (practice)", format_clock(session.elapsed_seconds(now))),
    };

    egui::TopBottomPanel::top("scoreboard").show(ctx, |ui| {
        ui.horizontal(|ui| {
            ui.label(
                egui::RichText::new(format!("HOME {} - {} AWAY", score.home, score.away))
                    .size(22.0)
                    .strong(),
            );
            ui.separator();
            ui.label(egui::RichText::new(clock).size(22.0).monospace());
            ui.separator();
            ui.label(session.phase().as_str().replace('_', " "));

            if matches!(session.phase(), MatchPhase::KickOff | MatchPhase::InProgress) {
                ui.separator();
                ui.label(format!(
                    "{} to play, touches {}/{}",
                    team_label(session.current_team()),
                    session.hit_count(),
                    session.config().max_hits_per_turn
                ));
            }
            if let Some(winner) = session.coin_toss().result {
                if session.phase() == MatchPhase::CoinToss {
                    ui.separator();
                    ui.label(format!("{} kicks off", team_label(winner)));
                }
            }
        });
        ui.small("Space: advance  P: pause  R: restart  T: practice  C: camera");
    });
}

fn ui_charge_meter(mut contexts: EguiContexts, input: Res<FlickInput>) {
    let Some(ctx) = contexts.try_ctx_mut() else {
        return;
    };
    let controller = &input.controller;

    egui::TopBottomPanel::bottom("charge").show(ctx, |ui| {
        ui.horizontal(|ui| {
            let power = controller
                .charge_power()
                .map_or(0.0, |power| power.to_num::<f32>());
            let overcharged = controller.charge().is_some_and(|charge| charge.overcharged);
            let bar = egui::ProgressBar::new(power).desired_width(240.0);
            let bar = if overcharged {
                bar.text("Overcharged, release to cancel")
            } else {
                bar.show_percentage()
            };
            ui.label("Power");
            ui.add(bar);

            if controller.in_motion() {
                ui.label("Ball in motion");
            }
            match input.last_response {
                Some(FlickResponse::Ignored { reason }) => {
                    ui.label(reason.as_str().replace('_', " "));
                }
                Some(FlickResponse::Flicked { power, .. }) => {
                    ui.label(format!("Flick {:.0}%", power.to_num::<f32>() * 100.0));
                }
                _ => {}
            }
        });
    });
}

fn ui_event_feed(mut contexts: EguiContexts, feed: Res<EventFeed>) {
    let Some(ctx) = contexts.try_ctx_mut() else {
        return;
    };
    if feed.lines.is_empty() {
        return;
    }

    egui::Window::new("Match")
        .anchor(egui::Align2::RIGHT_TOP, egui::vec2(-10.0, 60.0))
        .resizable(false)
        .collapsible(false)
        .show(ctx, |ui| {
            for line in &feed.lines {
                ui.label(line);
            }
        });
}
