use super::{types::UtcDateTime, RoundId, SubmissionId, UserId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vote {
    pub round_id: RoundId,
    pub voter: UserId,
    pub submission_id: SubmissionId,
    /// Positive for upvotes, negative for downvotes. Never zero.
    pub magnitude: i64,
    pub cast_at: UtcDateTime,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoteDirection {
    Up,
    Down,
}

impl Vote {
    pub fn direction(&self) -> VoteDirection {
        if self.magnitude > 0 {
            VoteDirection::Up
        } else {
            VoteDirection::Down
        }
    }
}
