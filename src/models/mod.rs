mod league;
mod notification;
mod round;
mod submission;
mod user;
mod vote;

pub mod types;

pub use league::{LeagueId, LeagueSettings, ListenPolicy, NewLeague};
pub use notification::{NewNotification, Notification, NotificationId, NotificationKind};
pub use round::{NewRound, Phase, Round, RoundId, VoteLimitOverrides};
pub use submission::{NewSubmission, Submission, SubmissionId, SubmissionType};
pub use user::UserId;
pub use vote::{Vote, VoteDirection};
