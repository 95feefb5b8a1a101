//! Proptest strategies for match inputs.
//!
//! These strategies generate random but reproducible inputs for
//! property-based testing of the rules.

use proptest::prelude::*;
use subbuteo_core::command::MatchCommand;
use subbuteo_core::phase::{Team, Touch};

/// Either side.
pub fn arb_team() -> impl Strategy<Value = Team> {
    prop_oneof![Just(Team::Home), Just(Team::Away)]
}

/// A touch by one of eleven figures.
pub fn arb_touch() -> impl Strategy<Value = Touch> {
    (arb_team(), 0u8..11).prop_map(|(team, player)| Touch::new(team, player))
}

/// A sequence of touches.
pub fn arb_touches(max_len: usize) -> impl Strategy<Value = Vec<Touch>> {
    proptest::collection::vec(arb_touch(), 0..max_len)
}

/// A command that may arrive during play (touches, goals, pause toggles).
pub fn arb_play_command() -> impl Strategy<Value = MatchCommand> {
    prop_oneof![
        8 => arb_touch().prop_map(|t| MatchCommand::Hit {
            team: t.team,
            player: t.player_index,
        }),
        1 => (arb_team(), 1u8..12).prop_map(|(team, number)| MatchCommand::Goal {
            team,
            scorer_name: format!("Player {number}"),
            scorer_number: number,
        }),
        1 => Just(MatchCommand::Pause),
        1 => Just(MatchCommand::Resume),
    ]
}

/// Timed play commands with non-decreasing timestamps starting at `start_ms`.
pub fn arb_timed_play(start_ms: u64, max_len: usize) -> impl Strategy<Value = Vec<(u64, MatchCommand)>> {
    proptest::collection::vec((0u64..3_000, arb_play_command()), 0..max_len).prop_map(move |steps| {
        let mut now = start_ms;
        steps
            .into_iter()
            .map(|(gap, command)| {
                now += gap;
                (now, command)
            })
            .collect()
    })
}
