use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::{
    lifecycle::ordering::display_order,
    links::{normalize_youtube_link, YOUTUBE_LINK_EXAMPLE},
    models::{
        types::UtcDateTime, NewSubmission, Phase, RoundId, Submission, SubmissionType, UserId,
    },
    repository::{LeagueRepository, RoundRepository, SubmissionRepository},
};

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SubmissionRejection {
    #[error("Submissions are closed for this round (it is in {0})")]
    WrongPhase(Phase),
    #[error("You already submitted {limit} entries to this round")]
    LimitReached { limit: u32 },
    #[error("Link is not a YouTube video, it should look like {}", YOUTUBE_LINK_EXAMPLE)]
    InvalidLink(String),
    #[error("Title and artist must not be empty")]
    MissingMetadata,
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Rejected(#[from] SubmissionRejection),
    #[error("Round {0} not found")]
    RoundNotFound(RoundId),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Clone, Debug)]
pub enum SubmissionSource {
    /// Key of an audio file already stored by the upload layer.
    File { storage_key: String },
    Link { url: String },
}

#[derive(Clone, Debug)]
pub struct SubmitEntry {
    pub round_id: RoundId,
    pub submitter: UserId,
    pub source: SubmissionSource,
    pub title: String,
    pub artist: String,
    pub duration_seconds: Option<f64>,
}

pub struct SubmissionService {
    round_repository: Arc<RoundRepository>,
    league_repository: Arc<LeagueRepository>,
    submission_repository: Arc<SubmissionRepository>,
}

impl SubmissionService {
    pub fn new(
        round_repository: Arc<RoundRepository>,
        league_repository: Arc<LeagueRepository>,
        submission_repository: Arc<SubmissionRepository>,
    ) -> SubmissionService {
        SubmissionService {
            round_repository,
            league_repository,
            submission_repository,
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn submit(&self, entry: SubmitEntry) -> Result<Submission, SubmitError> {
        let round = self
            .round_repository
            .get_round(entry.round_id)
            .await?
            .ok_or(SubmitError::RoundNotFound(entry.round_id))?;

        if round.phase != Phase::Submissions {
            return Err(SubmissionRejection::WrongPhase(round.phase).into());
        }

        let title = entry.title.trim();
        let artist = entry.artist.trim();
        if title.is_empty() || artist.is_empty() {
            return Err(SubmissionRejection::MissingMetadata.into());
        }

        let (submission_type, source) = match entry.source {
            SubmissionSource::File { storage_key } => (SubmissionType::File, storage_key),
            SubmissionSource::Link { url } => match normalize_youtube_link(&url) {
                Some(link) => (SubmissionType::Youtube, link),
                None => return Err(SubmissionRejection::InvalidLink(url).into()),
            },
        };

        let league = self
            .league_repository
            .get_settings(round.league_id)
            .await?
            .ok_or_else(|| {
                anyhow::anyhow!("League {} of round {} is missing", round.league_id, round.id)
            })?;

        let new_submission = NewSubmission {
            round_id: round.id,
            submitter: entry.submitter,
            submission_type,
            title: title.to_string(),
            artist: artist.to_string(),
            source,
            duration_seconds: entry.duration_seconds,
            submitted_at: UtcDateTime::now(),
        };

        match self
            .submission_repository
            .add_submission_if_allowed(&new_submission, league.submissions_per_user)
            .await?
        {
            Some(submission) => {
                info!(
                    "Stored submission {} by {} in round {}",
                    submission.id, submission.submitter, round.id
                );
                Ok(submission)
            }

            // Either the round left the submissions phase or the user hit the limit meanwhile.
            None => match self.round_repository.get_round(round.id).await? {
                Some(current) if current.phase != Phase::Submissions => {
                    Err(SubmissionRejection::WrongPhase(current.phase).into())
                }
                _ => Err(SubmissionRejection::LimitReached {
                    limit: league.submissions_per_user,
                }
                .into()),
            },
        }
    }

    /// The round's submissions in the order they should be shown.
    pub async fn list_for_round(&self, round_id: RoundId) -> Result<Vec<Submission>, SubmitError> {
        let round = self
            .round_repository
            .get_round(round_id)
            .await?
            .ok_or(SubmitError::RoundNotFound(round_id))?;

        let submissions = self.submission_repository.list_for_round(round_id).await?;

        Ok(display_order(round.id, round.phase, submissions))
    }
}
