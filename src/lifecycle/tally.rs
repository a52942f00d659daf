use std::{cmp::Reverse, collections::HashMap};

use thiserror::Error;

use crate::models::{Submission, SubmissionId, Vote};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TallyError {
    #[error("Vote references submission {0} which is not part of the round")]
    UnknownSubmission(SubmissionId),
    #[error("Points of submission {0} overflowed")]
    Overflow(SubmissionId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubmissionScore {
    pub submission_id: SubmissionId,
    pub points: i64,
    /// 1-based position in the final ranking.
    pub rank: u32,
}

/// Settled result of a round, ordered from first to last place.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tally {
    scores: Vec<SubmissionScore>,
}

impl Tally {
    pub fn scores(&self) -> &[SubmissionScore] {
        &self.scores
    }

    pub fn points_of(&self, submission_id: SubmissionId) -> Option<i64> {
        self.scores
            .iter()
            .find(|score| score.submission_id == submission_id)
            .map(|score| score.points)
    }

    pub fn winner(&self) -> Option<&SubmissionScore> {
        self.scores.first()
    }
}

/// Sums vote magnitudes per submission and ranks by points, earlier submissions first on ties.
pub fn compute_tally(submissions: &[Submission], votes: &[Vote]) -> Result<Tally, TallyError> {
    let mut points: HashMap<SubmissionId, i64> =
        submissions.iter().map(|s| (s.id, 0)).collect();

    for vote in votes {
        let total = points
            .get_mut(&vote.submission_id)
            .ok_or(TallyError::UnknownSubmission(vote.submission_id))?;

        *total = total
            .checked_add(vote.magnitude)
            .ok_or(TallyError::Overflow(vote.submission_id))?;
    }

    let mut ranked: Vec<&Submission> = submissions.iter().collect();
    ranked.sort_by_key(|s| (Reverse(points[&s.id]), s.submitted_at, s.id));

    let scores = ranked
        .into_iter()
        .zip(1..)
        .map(|(submission, rank)| SubmissionScore {
            submission_id: submission.id,
            points: points[&submission.id],
            rank,
        })
        .collect();

    Ok(Tally { scores })
}
