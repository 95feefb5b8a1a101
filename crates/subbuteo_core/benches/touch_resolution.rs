//! Touch resolution benchmarks for subbuteo_core.
//!
//! Run with: `cargo bench -p subbuteo_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use subbuteo_core::phase::{Team, Touch};
use subbuteo_core::turn::{apply_hit, TurnState};
use subbuteo_test_utils::fixtures::session_in_play;

fn touch_sequence(len: usize) -> Vec<Touch> {
    (0..len)
        .map(|i| {
            let team = if i % 5 == 0 { Team::Away } else { Team::Home };
            Touch::new(team, (i % 11) as u8)
        })
        .collect()
}

/// Pure rule function over a long touch sequence.
pub fn apply_hit_benchmark(c: &mut Criterion) {
    let touches = touch_sequence(1_000);
    c.bench_function("apply_hit_1000", |b| {
        b.iter(|| {
            let mut state = TurnState::awaiting_kick_off(Team::Home);
            for touch in &touches {
                state = apply_hit(&state, *touch, 3).0;
            }
            black_box(state)
        });
    });
}

/// Full session path, including timer checks.
pub fn session_benchmark(c: &mut Criterion) {
    let touches = touch_sequence(1_000);
    c.bench_function("record_ball_hit_1000", |b| {
        b.iter(|| {
            let mut session = session_in_play(Team::Home);
            for (i, touch) in touches.iter().enumerate() {
                session.record_ball_hit(touch.team, touch.player_index, 3_000 + i as u64 * 10);
            }
            black_box(session.hit_count())
        });
    });
}

criterion_group!(benches, apply_hit_benchmark, session_benchmark);
criterion_main!(benches);
