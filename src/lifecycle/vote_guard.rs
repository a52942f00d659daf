use thiserror::Error;

use crate::models::{Phase, SubmissionId, UserId, Vote};

use super::{listen::has_listened_enough, vote_limits::VoteLimits};

/// Why a vote was refused. These are expected outcomes to show to the voter, not failures.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum VoteRejection {
    #[error("Votes can only be cast while the round is in voting (it is in {0})")]
    WrongPhase(Phase),
    #[error("You cannot vote for your own submission")]
    SelfVote,
    #[error("Submission {0} is not part of this round")]
    UnknownSubmission(SubmissionId),
    #[error("This would use {requested} upvotes, only {cap} are allowed")]
    UpvoteCapExceeded { cap: u32, requested: u64 },
    #[error("This would use {requested} downvotes, only {cap} are allowed")]
    DownvoteCapExceeded { cap: u32, requested: u64 },
    #[error("At most {cap} votes can go to a single submission in this direction, got {requested}")]
    PerSubmissionCapExceeded { cap: u32, requested: u64 },
    #[error("Listen to at least {required_seconds:.0}s of this submission before voting (heard {listened_seconds:.0}s)")]
    ListenRequirementUnmet {
        required_seconds: f64,
        listened_seconds: f64,
    },
}

/// A voter's directional totals within a round.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VoteTotals {
    pub upvotes: u64,
    pub downvotes: u64,
}

impl VoteTotals {
    /// Totals over `votes`, leaving out the vote for `excluding`, which is about to be replaced.
    pub fn of(votes: &[Vote], excluding: Option<SubmissionId>) -> VoteTotals {
        votes
            .iter()
            .filter(|vote| Some(vote.submission_id) != excluding)
            .fold(VoteTotals::default(), |mut totals, vote| {
                if vote.magnitude > 0 {
                    totals.upvotes += vote.magnitude.unsigned_abs();
                } else {
                    totals.downvotes += vote.magnitude.unsigned_abs();
                }
                totals
            })
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoteRequest {
    pub voter: UserId,
    pub submission_id: SubmissionId,
    pub submission_owner: UserId,
    /// Signed vote weight, zero retracts the current vote.
    pub magnitude: i64,
}

/// The listen requirement for the target submission and the voter's progress on it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ListenCheck {
    pub threshold_seconds: f64,
    pub listened_until: f64,
    pub server_completed: bool,
}

/// Decides whether `request` may be stored given the voter's other votes in the round.
pub fn check_vote(
    phase: Phase,
    request: &VoteRequest,
    existing_votes: &[Vote],
    limits: &VoteLimits,
    listen: Option<&ListenCheck>,
) -> Result<(), VoteRejection> {
    if phase != Phase::Voting {
        return Err(VoteRejection::WrongPhase(phase));
    }

    if request.voter == request.submission_owner {
        return Err(VoteRejection::SelfVote);
    }

    if request.magnitude == 0 {
        return Ok(());
    }

    if let Some(listen) = listen {
        if !has_listened_enough(
            listen.listened_until,
            listen.server_completed,
            listen.threshold_seconds,
        ) {
            return Err(VoteRejection::ListenRequirementUnmet {
                required_seconds: listen.threshold_seconds,
                listened_seconds: listen.listened_until,
            });
        }
    }

    let totals = VoteTotals::of(existing_votes, Some(request.submission_id));
    let magnitude = request.magnitude.unsigned_abs();

    let (cap, total, per_submission_cap) = if request.magnitude > 0 {
        (limits.upvotes, totals.upvotes, limits.per_submission_upvotes)
    } else {
        (limits.downvotes, totals.downvotes, limits.per_submission_downvotes)
    };

    if let Some(per_submission_cap) = per_submission_cap {
        if magnitude > per_submission_cap as u64 {
            return Err(VoteRejection::PerSubmissionCapExceeded {
                cap: per_submission_cap,
                requested: magnitude,
            });
        }
    }

    let requested = total + magnitude;
    if requested > cap as u64 {
        return Err(if request.magnitude > 0 {
            VoteRejection::UpvoteCapExceeded { cap, requested }
        } else {
            VoteRejection::DownvoteCapExceeded { cap, requested }
        });
    }

    Ok(())
}
