use std::fmt::Display;

use strum::{AsRefStr, Display as StrumDisplay, EnumString};

use super::{types::UtcDateTime, LeagueId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RoundId(pub u64);

impl Display for RoundId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle stage of a round. Variants are declared in lifecycle order,
/// so `Ord` reflects how far a round has progressed.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, AsRefStr, EnumString, StrumDisplay,
)]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    Submissions,
    Voting,
    Finished,
}

/// Per-round replacements for the league vote caps. `None` falls back to the league.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VoteLimitOverrides {
    pub upvote_limit: Option<u32>,
    pub downvote_limit: Option<u32>,
    pub per_submission_upvote_limit: Option<u32>,
    pub per_submission_downvote_limit: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Round {
    pub id: RoundId,
    pub league_id: LeagueId,
    pub title: String,
    pub phase: Phase,
    pub submission_deadline: UtcDateTime,
    pub voting_deadline: UtcDateTime,
    pub vote_limits: VoteLimitOverrides,
}

#[derive(Clone, Debug)]
pub struct NewRound {
    pub league_id: LeagueId,
    pub title: String,
    pub submission_deadline: UtcDateTime,
    pub voting_deadline: UtcDateTime,
    pub vote_limits: VoteLimitOverrides,
}
