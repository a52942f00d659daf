use crate::models::{LeagueSettings, VoteLimitOverrides};

/// Vote caps in effect for one round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VoteLimits {
    pub upvotes: u32,
    pub downvotes: u32,
    /// `None` when per-submission limiting is off for upvotes.
    pub per_submission_upvotes: Option<u32>,
    /// `None` when per-submission limiting is off for downvotes.
    pub per_submission_downvotes: Option<u32>,
}

impl VoteLimits {
    pub fn per_submission_enabled(&self) -> bool {
        self.per_submission_upvotes.is_some() || self.per_submission_downvotes.is_some()
    }
}

/// Round overrides win, league defaults fill the gaps.
pub fn resolve_vote_limits(round: &VoteLimitOverrides, league: &LeagueSettings) -> VoteLimits {
    VoteLimits {
        upvotes: round.upvote_limit.unwrap_or(league.upvote_limit),
        downvotes: round.downvote_limit.unwrap_or(league.downvote_limit),
        per_submission_upvotes: round
            .per_submission_upvote_limit
            .or(league.per_submission_upvote_limit),
        per_submission_downvotes: round
            .per_submission_downvote_limit
            .or(league.per_submission_downvote_limit),
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::{resolve_vote_limits, VoteLimits};
    use crate::models::{LeagueId, LeagueSettings, ListenPolicy, VoteLimitOverrides};

    fn league() -> LeagueSettings {
        LeagueSettings {
            id: LeagueId(1),
            name: "League".to_string(),
            upvote_limit: 10,
            downvote_limit: 3,
            per_submission_upvote_limit: None,
            per_submission_downvote_limit: Some(1),
            submissions_per_user: 1,
            submission_hours: 24,
            voting_hours: 24,
            listen_policy: ListenPolicy::default(),
            is_public: true,
        }
    }

    #[test]
    fn league_defaults_apply_without_overrides() {
        let limits = resolve_vote_limits(&VoteLimitOverrides::default(), &league());

        assert_eq!(
            limits,
            VoteLimits {
                upvotes: 10,
                downvotes: 3,
                per_submission_upvotes: None,
                per_submission_downvotes: Some(1),
            }
        );
        assert!(limits.per_submission_enabled());
    }

    #[test]
    fn round_overrides_take_precedence() {
        let overrides = VoteLimitOverrides {
            upvote_limit: Some(4),
            downvote_limit: Some(0),
            per_submission_upvote_limit: Some(2),
            per_submission_downvote_limit: None,
        };

        let limits = resolve_vote_limits(&overrides, &league());

        assert_eq!(limits.upvotes, 4);
        assert_eq!(limits.downvotes, 0);
        assert_eq!(limits.per_submission_upvotes, Some(2));
        assert_eq!(limits.per_submission_downvotes, Some(1));
    }

    #[test]
    fn per_submission_limits_can_be_off() {
        let mut league = league();
        league.per_submission_downvote_limit = None;

        let limits = resolve_vote_limits(&VoteLimitOverrides::default(), &league);
        assert!(!limits.per_submission_enabled());
    }
}
