//! Goals and the score derived from them.

use serde::{Deserialize, Serialize};

use crate::phase::Team;

/// A single goal, in the order it was scored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GoalRecord {
    /// Side credited with the goal.
    pub team: Team,
    /// Display name of the scorer.
    pub scorer_name: String,
    /// Shirt number of the scorer.
    pub scorer_number: u8,
    /// Whole match seconds elapsed when the goal was recorded.
    pub elapsed_seconds: u64,
}

/// Goals per side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Score {
    /// Home goals.
    pub home: u32,
    /// Away goals.
    pub away: u32,
}

impl Score {
    /// Count goals per side.
    #[must_use]
    pub fn from_goals(goals: &[GoalRecord]) -> Self {
        goals.iter().fold(Self::default(), |mut score, goal| {
            *score.get_mut(goal.team) += 1;
            score
        })
    }

    /// Goals for one side.
    #[must_use]
    pub const fn get(&self, team: Team) -> u32 {
        match team {
            Team::Home => self.home,
            Team::Away => self.away,
        }
    }

    fn get_mut(&mut self, team: Team) -> &mut u32 {
        match team {
            Team::Home => &mut self.home,
            Team::Away => &mut self.away,
        }
    }

    /// Leading side, or `None` when level.
    #[must_use]
    pub const fn leader(&self) -> Option<Team> {
        if self.home > self.away {
            Some(Team::Home)
        } else if self.away > self.home {
            Some(Team::Away)
        } else {
            None
        }
    }
}

/// Append-only goal list with a cached score.
///
/// The score is updated together with every append, so `score()` always
/// equals [`Score::from_goals`] over `goals()`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSheet {
    goals: Vec<GoalRecord>,
    score: Score,
}

impl ScoreSheet {
    /// Empty sheet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a sheet from a goal list.
    #[must_use]
    pub fn from_goals(goals: Vec<GoalRecord>) -> Self {
        let score = Score::from_goals(&goals);
        Self { goals, score }
    }

    /// Append a goal.
    pub fn record(&mut self, goal: GoalRecord) {
        *self.score.get_mut(goal.team) += 1;
        self.goals.push(goal);
    }

    /// Current score.
    #[must_use]
    pub const fn score(&self) -> Score {
        self.score
    }

    /// Goals in chronological order.
    #[must_use]
    pub fn goals(&self) -> &[GoalRecord] {
        &self.goals
    }

    /// Scorers for one side, in order.
    pub fn scorers(&self, team: Team) -> impl Iterator<Item = &GoalRecord> {
        self.goals.iter().filter(move |g| g.team == team)
    }
}
