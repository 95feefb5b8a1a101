//! Match flow plugin: drives the rules session from Bevy.
//!
//! The session is the single source of truth for phase, possession and
//! score. This module feeds it the app clock, turns rapier contact events
//! into touch and goal reports, and republishes the session's outbox as
//! Bevy events for the rest of the client.

use std::time::{SystemTime, UNIX_EPOCH};

use bevy::prelude::*;
use bevy_rapier3d::prelude::CollisionEvent;
use subbuteo_core::coin_toss::TossSource;
use subbuteo_core::phase::{MatchPhase, Team};
use subbuteo_core::scoring::GoalRecord;
use subbuteo_core::session::{MatchEvent, MatchSession, PhaseRejection, PhaseResult};
use subbuteo_core::turn::HitReport;

use crate::components::{Ball, Figure, GoalMouth};
use crate::GameRules;

/// Scorer name recorded when the ball goes in off a defender.
pub const OWN_GOAL: &str = "Own goal";

/// Ordering of match flow systems within a frame.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum MatchFlowSet {
    /// Fire due session timers.
    Tick,
    /// Contacts and player commands.
    Input,
    /// Republish session events.
    Publish,
}

/// Plugin that owns the match session.
///
/// Provides:
/// - Timer ticking against the app clock
/// - Ball contact resolution (touches and goals)
/// - [`MatchEventFired`] and [`TouchResolved`] events
pub struct MatchFlowPlugin;

impl Plugin for MatchFlowPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<MatchState>()
            .add_event::<CollisionEvent>()
            .add_event::<MatchEventFired>()
            .add_event::<TouchResolved>()
            .configure_sets(
                Update,
                (MatchFlowSet::Tick, MatchFlowSet::Input, MatchFlowSet::Publish).chain(),
            )
            .add_systems(Update, tick_match.in_set(MatchFlowSet::Tick))
            .add_systems(Update, resolve_contacts.in_set(MatchFlowSet::Input))
            .add_systems(Update, publish_match_events.in_set(MatchFlowSet::Publish));
    }
}

/// Keyboard control of the match lifecycle.
///
/// - Space: advance (new match, finish positioning, toss, kick off, resume)
/// - P: pause / resume
/// - R: restart from positioning
/// - T: toggle practice mode
pub struct MatchControlsPlugin;

impl Plugin for MatchControlsPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, match_keyboard_controls.in_set(MatchFlowSet::Input));
    }
}

/// A session event, republished for Bevy systems.
#[derive(Event, Debug, Clone, PartialEq, Eq)]
pub struct MatchEventFired(pub MatchEvent);

/// A figure touched the ball and the rules resolved it.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchResolved {
    /// Figure that touched the ball.
    pub figure: Entity,
    /// Rules verdict.
    pub report: HitReport,
}

/// Figure that last touched the ball, for goal attribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastToucher {
    /// Side of the toucher.
    pub team: Team,
    /// Shirt number.
    pub shirt_number: u8,
    /// Display name.
    pub name: String,
}

impl From<&Figure> for LastToucher {
    fn from(figure: &Figure) -> Self {
        Self {
            team: figure.team,
            shirt_number: figure.shirt_number,
            name: figure.name.clone(),
        }
    }
}

/// The live match.
#[derive(Resource, Debug)]
pub struct MatchState {
    /// Rules session.
    pub session: MatchSession,
    /// Last figure in contact with the ball since the last restart.
    pub last_toucher: Option<LastToucher>,
}

impl MatchState {
    /// Wrap a session.
    #[must_use]
    pub const fn new(session: MatchSession) -> Self {
        Self {
            session,
            last_toucher: None,
        }
    }

    /// Credit a goal for the ball entering `goal`.
    ///
    /// Returns `None` when the session refuses it (the ball can roll in
    /// while play is stopped).
    pub fn score_in(&mut self, goal: &GoalMouth, now_ms: u64) -> Option<GoalRecord> {
        let team = goal.scoring_team();
        let (name, number) = attribute_scorer(team, self.last_toucher.as_ref());
        match self.session.record_goal(team, name, number, now_ms) {
            Ok(record) => {
                self.last_toucher = None;
                Some(record)
            }
            Err(rejection) => {
                tracing::debug!(?rejection, %team, "Ball in goal outside play");
                None
            }
        }
    }
}

impl FromWorld for MatchState {
    fn from_world(world: &mut World) -> Self {
        let config = world
            .get_resource::<GameRules>()
            .map(|rules| rules.0.clone())
            .unwrap_or_default();
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs().rotate_left(32) ^ u64::from(d.subsec_nanos()));
        let session = MatchSession::new("local", config).with_toss_source(TossSource::seeded(seed));
        Self::new(session)
    }
}

/// Scorer name and shirt number for a goal credited to `scoring`.
///
/// The last toucher scores when they attack this goal; otherwise it is an
/// own goal carrying the defender's number, or 0 if nobody touched the ball.
#[must_use]
pub fn attribute_scorer(scoring: Team, last: Option<&LastToucher>) -> (String, u8) {
    match last {
        Some(toucher) if toucher.team == scoring => (toucher.name.clone(), toucher.shirt_number),
        Some(toucher) => (OWN_GOAL.to_string(), toucher.shirt_number),
        None => (OWN_GOAL.to_string(), 0),
    }
}

/// Step the lifecycle forward from wherever it is.
pub fn advance_lifecycle(session: &mut MatchSession, now_ms: u64) -> PhaseResult {
    match session.phase() {
        MatchPhase::NotStarted | MatchPhase::Completed => session.start_positioning(now_ms),
        MatchPhase::Positioning => session.finish_positioning(now_ms),
        MatchPhase::CoinToss if session.coin_toss().result.is_some() => {
            session.start_kick_off(now_ms)
        }
        MatchPhase::CoinToss => session.toss_coin(now_ms),
        MatchPhase::Paused => session.resume(now_ms),
        phase => Err(PhaseRejection::WrongPhase { phase }),
    }
}

/// Pause a live match or resume a paused one.
pub fn toggle_pause(session: &mut MatchSession, now_ms: u64) -> PhaseResult {
    if session.phase() == MatchPhase::Paused {
        session.resume(now_ms)
    } else {
        session.pause(now_ms)
    }
}

/// App clock in whole milliseconds.
#[must_use]
pub fn now_ms(time: &Time) -> u64 {
    u64::try_from(time.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Fires session timers due by now.
pub fn tick_match(time: Res<Time>, mut state: ResMut<MatchState>) {
    state.session.tick(now_ms(&time));
}

/// Turns ball contacts into touches and goals.
pub fn resolve_contacts(
    time: Res<Time>,
    mut collisions: EventReader<CollisionEvent>,
    mut state: ResMut<MatchState>,
    balls: Query<(), With<Ball>>,
    figures: Query<&Figure>,
    goals: Query<&GoalMouth>,
    mut touches: EventWriter<TouchResolved>,
) {
    let now = now_ms(&time);

    for event in collisions.read() {
        let CollisionEvent::Started(a, b, _) = *event else {
            continue;
        };
        let other = if balls.contains(a) {
            b
        } else if balls.contains(b) {
            a
        } else {
            continue;
        };

        if let Ok(figure) = figures.get(other) {
            let report = state
                .session
                .record_ball_hit(figure.team, figure.player_index, now);
            if report.success {
                state.last_toucher = Some(LastToucher::from(figure));
            }
            touches.send(TouchResolved {
                figure: other,
                report,
            });
        } else if let Ok(goal) = goals.get(other) {
            state.score_in(goal, now);
        }
    }
}

/// Republishes the session outbox as [`MatchEventFired`] events.
pub fn publish_match_events(
    mut state: ResMut<MatchState>,
    mut events: EventWriter<MatchEventFired>,
) {
    for event in state.session.drain_events() {
        if let MatchEvent::PhaseChanged {
            to: MatchPhase::Positioning,
            ..
        } = event
        {
            state.last_toucher = None;
        }
        events.send(MatchEventFired(event));
    }
}

fn match_keyboard_controls(
    keyboard: Res<ButtonInput<KeyCode>>,
    time: Res<Time>,
    mut state: ResMut<MatchState>,
) {
    let now = now_ms(&time);
    let session = &mut state.session;

    let result = if keyboard.just_pressed(KeyCode::Space) {
        Some(advance_lifecycle(session, now))
    } else if keyboard.just_pressed(KeyCode::KeyP) {
        Some(toggle_pause(session, now))
    } else if keyboard.just_pressed(KeyCode::KeyR) {
        Some(session.start_positioning(now))
    } else {
        None
    };

    if keyboard.just_pressed(KeyCode::KeyT) {
        let practice = !session.is_practice();
        session.set_practice(practice);
        tracing::info!(practice, "Practice mode toggled");
    }

    if let Some(Err(rejection)) = result {
        tracing::debug!(?rejection, phase = %session.phase(), "Control ignored");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use subbuteo_core::config::RulesConfig;

    fn toucher(team: Team, shirt_number: u8) -> LastToucher {
        LastToucher {
            team,
            shirt_number,
            name: format!("{team} {shirt_number}"),
        }
    }

    #[test]
    fn test_attacker_scores() {
        let (name, number) = attribute_scorer(Team::Home, Some(&toucher(Team::Home, 9)));
        assert_eq!(name, "home 9");
        assert_eq!(number, 9);
    }

    #[test]
    fn test_defender_touch_is_own_goal() {
        let (name, number) = attribute_scorer(Team::Home, Some(&toucher(Team::Away, 4)));
        assert_eq!(name, OWN_GOAL);
        assert_eq!(number, 4);
    }

    #[test]
    fn test_untouched_ball_is_own_goal_zero() {
        assert_eq!(attribute_scorer(Team::Away, None), (OWN_GOAL.to_string(), 0));
    }

    #[test]
    fn test_advance_walks_the_lifecycle() {
        let config = RulesConfig {
            coin_toss_delay_ms: 100,
            ..RulesConfig::default()
        };
        let mut session =
            MatchSession::new("keys", config).with_toss_source(TossSource::Fixed(Team::Away));

        assert_eq!(advance_lifecycle(&mut session, 0), Ok(MatchPhase::Positioning));
        assert_eq!(advance_lifecycle(&mut session, 10), Ok(MatchPhase::CoinToss));
        assert_eq!(
            advance_lifecycle(&mut session, 20),
            Err(PhaseRejection::TossInProgress)
        );
        assert_eq!(advance_lifecycle(&mut session, 200), Ok(MatchPhase::KickOff));
        assert!(advance_lifecycle(&mut session, 300).is_err());

        assert_eq!(toggle_pause(&mut session, 400), Ok(MatchPhase::Paused));
        assert_eq!(advance_lifecycle(&mut session, 500), Ok(MatchPhase::InProgress));
    }
}
