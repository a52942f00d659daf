use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::{
    lifecycle::{
        listen::{clamp_progress, clamp_seek, listen_threshold},
        vote_guard::{check_vote, ListenCheck, VoteRejection, VoteRequest, VoteTotals},
        vote_limits::{resolve_vote_limits, VoteLimits},
    },
    models::{
        types::UtcDateTime, LeagueSettings, Round, RoundId, Submission, SubmissionId, UserId,
    },
    repository::{
        LeagueRepository, ListenProgress, ListenRepository, RoundRepository, SubmissionRepository,
        VoteRepository,
    },
};

#[derive(Debug, Error)]
pub enum CastVoteError {
    #[error(transparent)]
    Rejected(#[from] VoteRejection),
    #[error("Round {0} not found")]
    RoundNotFound(RoundId),
    #[error("Submission {0} not found")]
    SubmissionNotFound(SubmissionId),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Caps in effect for a voter and how much of them is still unused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VoteBudget {
    pub limits: VoteLimits,
    pub used: VoteTotals,
    pub remaining_upvotes: u64,
    pub remaining_downvotes: u64,
}

pub struct VotingService {
    round_repository: Arc<RoundRepository>,
    league_repository: Arc<LeagueRepository>,
    submission_repository: Arc<SubmissionRepository>,
    vote_repository: Arc<VoteRepository>,
    listen_repository: Arc<ListenRepository>,
    seek_tolerance: f64,
}

impl VotingService {
    pub fn new(
        round_repository: Arc<RoundRepository>,
        league_repository: Arc<LeagueRepository>,
        submission_repository: Arc<SubmissionRepository>,
        vote_repository: Arc<VoteRepository>,
        listen_repository: Arc<ListenRepository>,
        seek_tolerance: f64,
    ) -> VotingService {
        VotingService {
            round_repository,
            league_repository,
            submission_repository,
            vote_repository,
            listen_repository,
            seek_tolerance,
        }
    }

    /// Sets the voter's vote for a submission to `magnitude` (zero retracts it).
    #[tracing::instrument(skip(self))]
    pub async fn cast_vote(
        &self,
        round_id: RoundId,
        voter: UserId,
        submission_id: SubmissionId,
        magnitude: i64,
    ) -> Result<(), CastVoteError> {
        let round = self.round(round_id).await?;
        let league = self.league(&round).await?;

        let submission = self.submission(submission_id).await?;

        if submission.round_id != round.id {
            return Err(VoteRejection::UnknownSubmission(submission_id).into());
        }

        let limits = resolve_vote_limits(&round.vote_limits, &league);

        let listen = match listen_threshold(&league.listen_policy, submission.duration_seconds) {
            Some(threshold) => {
                let progress = self
                    .listen_repository
                    .get_progress(voter, submission_id)
                    .await?;

                Some(ListenCheck {
                    threshold_seconds: threshold,
                    listened_until: progress.listened_until,
                    server_completed: progress.completed,
                })
            }
            None => None,
        };

        let request = VoteRequest {
            voter,
            submission_id,
            submission_owner: submission.submitter,
            magnitude,
        };

        self.vote_repository
            .apply_vote(round.id, voter, submission_id, magnitude, |phase, existing| {
                check_vote(phase, &request, existing, &limits, listen.as_ref())
            })
            .await??;

        info!("Vote {magnitude:+} by {voter} on submission {submission_id} accepted");

        Ok(())
    }

    pub async fn remaining_budget(
        &self,
        round_id: RoundId,
        voter: UserId,
    ) -> Result<VoteBudget, CastVoteError> {
        let round = self.round(round_id).await?;
        let league = self.league(&round).await?;

        let limits = resolve_vote_limits(&round.vote_limits, &league);
        let votes = self.vote_repository.votes_by_voter(round_id, voter).await?;
        let used = VoteTotals::of(&votes, None);

        Ok(VoteBudget {
            limits,
            used,
            remaining_upvotes: (limits.upvotes as u64).saturating_sub(used.upvotes),
            remaining_downvotes: (limits.downvotes as u64).saturating_sub(used.downvotes),
        })
    }

    /// Where playback may actually jump to when the listener asks for `requested`.
    pub async fn allowed_seek_position(
        &self,
        listener: UserId,
        submission_id: SubmissionId,
        requested: f64,
    ) -> Result<f64, CastVoteError> {
        let submission = self.submission(submission_id).await?;
        let progress = self
            .listen_repository
            .get_progress(listener, submission_id)
            .await?;

        if progress.completed {
            return Ok(requested.max(0.0));
        }

        Ok(clamp_seek(
            requested,
            progress.listened_until,
            submission.duration_seconds.unwrap_or(f64::INFINITY),
            self.seek_tolerance,
        ))
    }

    /// Stores a playback position reported by the player at `reported_at`.
    ///
    /// Since the previous report the position may have moved ahead by the time that passed
    /// plus the seek tolerance. A report further ahead is cut back to that, so jumping to the
    /// end cannot satisfy the listen requirement.
    #[tracing::instrument(skip(self))]
    pub async fn record_listen_progress(
        &self,
        listener: UserId,
        submission_id: SubmissionId,
        position: f64,
        reported_at: UtcDateTime,
    ) -> Result<ListenProgress, CastVoteError> {
        let submission = self.submission(submission_id).await?;
        let progress = self
            .listen_repository
            .get_progress(listener, submission_id)
            .await?;

        let allowed = if progress.completed {
            position.max(0.0)
        } else {
            let elapsed = progress
                .last_reported_at
                .map(|last| (reported_at - last).as_seconds_f64())
                .unwrap_or(0.0);

            clamp_progress(
                position,
                progress.listened_until,
                elapsed,
                submission.duration_seconds.unwrap_or(f64::INFINITY),
                self.seek_tolerance,
            )
        };

        if allowed < position {
            debug!("Progress report {position:.1}s clamped to {allowed:.1}s");
        }

        Ok(self
            .listen_repository
            .record_progress(listener, submission_id, allowed, reported_at)
            .await?)
    }

    async fn submission(&self, submission_id: SubmissionId) -> Result<Submission, CastVoteError> {
        self.submission_repository
            .get_submission(submission_id)
            .await?
            .ok_or(CastVoteError::SubmissionNotFound(submission_id))
    }

    async fn round(&self, round_id: RoundId) -> Result<Round, CastVoteError> {
        self.round_repository
            .get_round(round_id)
            .await?
            .ok_or(CastVoteError::RoundNotFound(round_id))
    }

    async fn league(&self, round: &Round) -> Result<LeagueSettings, CastVoteError> {
        let league = self
            .league_repository
            .get_settings(round.league_id)
            .await?
            .ok_or_else(|| {
                anyhow::anyhow!("League {} of round {} is missing", round.league_id, round.id)
            })?;

        Ok(league)
    }
}
