//! Turn and possession rules.
//!
//! [`apply_hit`] is the whole touch-resolution policy as a pure function:
//! given the current [`TurnState`] and a [`Touch`], it returns the next state
//! and a [`HitReport`]. Rules are checked in a fixed order, and the order is
//! part of the contract:
//!
//! 1. **Kick-off strike**: the first touch after a kick-off is always
//!    accepted, whoever takes it.
//! 2. **Different player required**: the kick-off taker may not touch the
//!    ball again as the very next touch.
//! 3. **Same side**: consecutive touches by the side in possession count up;
//!    the touch that reaches the limit hands possession over.
//! 4. **Interception**: a touch by the other side takes possession.

use serde::{Deserialize, Serialize};

use crate::phase::{Team, Touch};

/// Why a touch was refused or why possession changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitReason {
    /// The kick-off taker touched the ball twice in a row.
    DifferentPlayerRequired,
    /// The side in possession used up its touches.
    MaxHitsReached,
    /// The other side touched the ball.
    Interception,
    /// Touches are not resolved in the current phase.
    NotInPlay,
}

impl HitReason {
    /// Wire name of the reason.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DifferentPlayerRequired => "different_player_required",
            Self::MaxHitsReached => "max_hits_reached",
            Self::Interception => "interception",
            Self::NotInPlay => "not_in_play",
        }
    }
}

/// Outcome of resolving a single touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitReport {
    /// Whether the touch was accepted.
    pub success: bool,
    /// Whether possession changed hands.
    pub turn_changed: bool,
    /// Refusal reason, or the cause of a turnover.
    pub reason: Option<HitReason>,
    /// Whether this touch was the kick-off strike.
    pub kick_off_strike: bool,
    /// Side in possession after the touch.
    pub current_team: Team,
    /// Touch count after the touch.
    pub hit_count: u8,
}

impl HitReport {
    /// A refused touch that left `state` untouched.
    #[must_use]
    pub const fn rejected(state: &TurnState, reason: HitReason) -> Self {
        Self {
            success: false,
            turn_changed: false,
            reason: Some(reason),
            kick_off_strike: false,
            current_team: state.current_team,
            hit_count: state.hit_count,
        }
    }

    const fn accepted(state: &TurnState, turn_changed: bool, reason: Option<HitReason>) -> Self {
        Self {
            success: true,
            turn_changed,
            reason,
            kick_off_strike: false,
            current_team: state.current_team,
            hit_count: state.hit_count,
        }
    }
}

/// Possession bookkeeping owned by the match session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TurnState {
    /// Side in possession.
    pub current_team: Team,
    /// Consecutive touches by `current_team` since the last turnover.
    pub hit_count: u8,
    /// Most recent accepted touch.
    pub last_touch: Option<Touch>,
    /// Set at match start and after each goal until the kick-off strike.
    pub kick_off_pending: bool,
    /// Whether `last_touch` was the kick-off strike.
    pub last_touch_was_kick_off: bool,
}

impl Default for TurnState {
    fn default() -> Self {
        Self::new(Team::Home)
    }
}

impl TurnState {
    /// Fresh state with `team` in possession and no kick-off pending.
    #[must_use]
    pub const fn new(team: Team) -> Self {
        Self {
            current_team: team,
            hit_count: 0,
            last_touch: None,
            kick_off_pending: false,
            last_touch_was_kick_off: false,
        }
    }

    /// State waiting for `team` to take a kick-off.
    #[must_use]
    pub const fn awaiting_kick_off(team: Team) -> Self {
        Self {
            current_team: team,
            hit_count: 0,
            last_touch: None,
            kick_off_pending: true,
            last_touch_was_kick_off: false,
        }
    }
}

/// Resolve one touch against the possession rules.
///
/// `max_hits` is the touch count that forces a turnover (3 in the standard
/// rules). The returned state is identical to `state` whenever the report is
/// unsuccessful.
#[must_use]
pub fn apply_hit(state: &TurnState, touch: Touch, max_hits: u8) -> (TurnState, HitReport) {
    // Rule 1: kick-off strike.
    if state.kick_off_pending {
        let next = TurnState {
            current_team: state.current_team,
            hit_count: 1,
            last_touch: Some(touch),
            kick_off_pending: false,
            last_touch_was_kick_off: true,
        };
        let mut report = HitReport::accepted(&next, false, None);
        report.kick_off_strike = true;
        return (next, report);
    }

    // Rule 2: the kick-off taker cannot play the ball again straight away.
    if state.last_touch == Some(touch) && state.hit_count == 1 && state.last_touch_was_kick_off {
        return (
            *state,
            HitReport::rejected(state, HitReason::DifferentPlayerRequired),
        );
    }

    // Rule 3: another touch by the side in possession.
    if touch.team == state.current_team {
        let count = state.hit_count.saturating_add(1);
        if count >= max_hits {
            let next = TurnState {
                current_team: state.current_team.opponent(),
                hit_count: 0,
                last_touch: Some(touch),
                kick_off_pending: false,
                last_touch_was_kick_off: false,
            };
            return (
                next,
                HitReport::accepted(&next, true, Some(HitReason::MaxHitsReached)),
            );
        }
        let next = TurnState {
            hit_count: count,
            last_touch: Some(touch),
            last_touch_was_kick_off: false,
            ..*state
        };
        return (next, HitReport::accepted(&next, false, None));
    }

    // Rule 4: interception.
    let next = TurnState {
        current_team: touch.team,
        hit_count: 1,
        last_touch: Some(touch),
        kick_off_pending: false,
        last_touch_was_kick_off: false,
    };
    (
        next,
        HitReport::accepted(&next, true, Some(HitReason::Interception)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const MAX: u8 = 3;

    fn home(i: u8) -> Touch {
        Touch::new(Team::Home, i)
    }

    fn away(i: u8) -> Touch {
        Touch::new(Team::Away, i)
    }

    #[test]
    fn test_kick_off_strike_by_any_side() {
        let state = TurnState::awaiting_kick_off(Team::Home);
        let (next, report) = apply_hit(&state, away(4), MAX);
        assert!(report.success);
        assert!(report.kick_off_strike);
        assert!(!report.turn_changed);
        assert_eq!(next.hit_count, 1);
        assert!(!next.kick_off_pending);
        assert_eq!(next.current_team, Team::Home);
        assert_eq!(next.last_touch, Some(away(4)));
    }

    #[test]
    fn test_kick_off_taker_cannot_touch_twice() {
        let state = TurnState::awaiting_kick_off(Team::Home);
        let (after_kick, _) = apply_hit(&state, home(9), MAX);
        let (next, report) = apply_hit(&after_kick, home(9), MAX);
        assert!(!report.success);
        assert_eq!(report.reason, Some(HitReason::DifferentPlayerRequired));
        assert_eq!(next, after_kick);
    }

    #[test]
    fn test_teammate_after_kick_off_counts() {
        let state = TurnState::awaiting_kick_off(Team::Home);
        let (after_kick, _) = apply_hit(&state, home(9), MAX);
        let (next, report) = apply_hit(&after_kick, home(7), MAX);
        assert!(report.success);
        assert!(!report.turn_changed);
        assert_eq!(next.hit_count, 2);
    }

    #[test]
    fn test_third_touch_forces_turnover() {
        let mut state = TurnState::new(Team::Away);
        state.hit_count = 1;
        state.last_touch = Some(away(5));

        let (state, report) = apply_hit(&state, away(5), MAX);
        assert!(!report.turn_changed);
        assert_eq!(state.hit_count, 2);

        let (state, report) = apply_hit(&state, away(5), MAX);
        assert!(report.turn_changed);
        assert_eq!(report.reason, Some(HitReason::MaxHitsReached));
        assert_eq!(state.hit_count, 0);
        assert_eq!(state.current_team, Team::Home);
    }

    #[test]
    fn test_interception_takes_possession() {
        let mut state = TurnState::new(Team::Home);
        state.hit_count = 2;
        state.last_touch = Some(home(2));

        let (next, report) = apply_hit(&state, away(5), MAX);
        assert!(report.turn_changed);
        assert_eq!(report.reason, Some(HitReason::Interception));
        assert_eq!(next.current_team, Team::Away);
        assert_eq!(next.hit_count, 1);
    }

    #[test]
    fn test_same_player_after_interception_is_allowed() {
        // hit_count == 1 after an interception must not trigger the kick-off rule.
        let mut state = TurnState::new(Team::Home);
        state.hit_count = 1;
        state.last_touch = Some(home(3));
        let (state, _) = apply_hit(&state, away(5), MAX);
        let (next, report) = apply_hit(&state, away(5), MAX);
        assert!(report.success);
        assert_eq!(next.hit_count, 2);
    }

    #[test]
    fn test_rule_order_kick_off_wins_over_same_player() {
        // A pending kick-off beats the repeat-touch rule even with matching last touch.
        let mut state = TurnState::awaiting_kick_off(Team::Home);
        state.last_touch = Some(home(9));
        state.hit_count = 1;
        state.last_touch_was_kick_off = true;
        let (_, report) = apply_hit(&state, home(9), MAX);
        assert!(report.success);
        assert!(report.kick_off_strike);
    }

    proptest! {
        #[test]
        fn prop_same_side_touch_count_never_reaches_limit(
            start in 0u8..2,
            touches in 1usize..20,
            player in 0u8..11,
        ) {
            let mut state = TurnState::new(Team::Home);
            state.hit_count = start;
            let mut expected_team = Team::Home;
            let mut expected = start;

            for _ in 0..touches {
                // Always touch with whichever side has the ball.
                let (next, report) = apply_hit(&state, Touch::new(expected_team, player), MAX);
                prop_assert!(report.success);
                expected += 1;
                if expected == MAX {
                    prop_assert!(report.turn_changed);
                    expected = 0;
                    expected_team = expected_team.opponent();
                } else {
                    prop_assert!(!report.turn_changed);
                }
                prop_assert_eq!(next.hit_count, expected);
                prop_assert_eq!(next.current_team, expected_team);
                prop_assert!(next.hit_count < MAX);
                state = next;
            }
        }

        #[test]
        fn prop_rejection_never_mutates(
            team_home in any::<bool>(),
            player in 0u8..11,
        ) {
            let team = if team_home { Team::Home } else { Team::Away };
            let state = TurnState::awaiting_kick_off(Team::Home);
            let (after_kick, _) = apply_hit(&state, Touch::new(team, player), MAX);
            let (next, report) = apply_hit(&after_kick, Touch::new(team, player), MAX);
            prop_assert!(!report.success);
            prop_assert_eq!(next, after_kick);
        }
    }
}
