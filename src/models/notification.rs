use strum::{AsRefStr, EnumString};

use super::{types::UtcDateTime, LeagueId, UserId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NotificationId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, AsRefStr, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum NotificationKind {
    RoundVoting,
    RoundFinished,
}

/// A notification waiting in the outbox for the delivery layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewNotification {
    pub league_id: LeagueId,
    pub kind: NotificationKind,
    pub message: String,
    pub link: String,
    pub triggered_by: Option<UserId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub id: NotificationId,
    pub league_id: LeagueId,
    pub kind: NotificationKind,
    pub message: String,
    pub link: String,
    pub triggered_by: Option<UserId>,
    pub created_at: UtcDateTime,
    pub delivered_at: Option<UtcDateTime>,
}
