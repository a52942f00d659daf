use std::fmt::Display;

use time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LeagueId(pub u64);

impl Display for LeagueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// League-wide defaults. Owned by league management, read-only here.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeagueSettings {
    pub id: LeagueId,
    pub name: String,
    pub upvote_limit: u32,
    pub downvote_limit: u32,
    pub per_submission_upvote_limit: Option<u32>,
    pub per_submission_downvote_limit: Option<u32>,
    pub submissions_per_user: u32,
    pub submission_hours: u32,
    pub voting_hours: u32,
    pub listen_policy: ListenPolicy,
    pub is_public: bool,
}

impl LeagueSettings {
    pub fn submission_duration(&self) -> Duration {
        Duration::hours(self.submission_hours as _)
    }

    pub fn voting_duration(&self) -> Duration {
        Duration::hours(self.voting_hours as _)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ListenPolicy {
    pub required: bool,
    /// Share of the track that has to be heard, 100 when unset.
    pub percentage: Option<u8>,
    /// Upper bound on the required listen time, unbounded when unset.
    pub time_limit_minutes: Option<u32>,
}

#[derive(Clone, Debug)]
pub struct NewLeague {
    pub name: String,
    pub upvote_limit: u32,
    pub downvote_limit: u32,
    pub per_submission_upvote_limit: Option<u32>,
    pub per_submission_downvote_limit: Option<u32>,
    pub submissions_per_user: u32,
    pub submission_hours: u32,
    pub voting_hours: u32,
    pub listen_policy: ListenPolicy,
    pub is_public: bool,
}
