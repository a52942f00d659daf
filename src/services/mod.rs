mod admin_service;
mod submission_service;
mod voting_service;

pub use admin_service::{AdminError, AdminService};
pub use submission_service::{
    SubmissionRejection, SubmissionService, SubmissionSource, SubmitEntry, SubmitError,
};
pub use voting_service::{CastVoteError, VoteBudget, VotingService};
