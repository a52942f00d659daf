use std::fmt::Display;

use strum::{AsRefStr, EnumString};

use super::{types::UtcDateTime, RoundId, UserId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubmissionId(pub u64);

impl Display for SubmissionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, AsRefStr, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum SubmissionType {
    /// Uploaded audio, `source` is the storage key.
    File,
    /// A YouTube link, `source` is the normalized watch URL.
    Youtube,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Submission {
    pub id: SubmissionId,
    pub round_id: RoundId,
    pub submitter: UserId,
    pub submission_type: SubmissionType,
    pub title: String,
    pub artist: String,
    pub source: String,
    pub duration_seconds: Option<f64>,
    /// Settled score, only present once the round is finished.
    pub points: Option<i64>,
    pub rank: Option<u32>,
    pub submitted_at: UtcDateTime,
}

#[derive(Clone, Debug)]
pub struct NewSubmission {
    pub round_id: RoundId,
    pub submitter: UserId,
    pub submission_type: SubmissionType,
    pub title: String,
    pub artist: String,
    pub source: String,
    pub duration_seconds: Option<f64>,
    pub submitted_at: UtcDateTime,
}
