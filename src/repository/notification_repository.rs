use sqlx::{query, query_as, FromRow, Pool, Sqlite};

use crate::models::{
    types::UtcDateTime, LeagueId, NewNotification, Notification, NotificationId, NotificationKind,
    UserId,
};

use super::conversion::{DBConvertible, DBFromConversionError, DBToConversionError};

/// Outbox of notifications waiting for the delivery layer.
pub struct NotificationRepository {
    pool: Pool<Sqlite>,
}

impl NotificationRepository {
    pub fn new(pool: Pool<Sqlite>) -> NotificationRepository {
        NotificationRepository { pool }
    }

    pub async fn enqueue(
        &self,
        notification: &NewNotification,
        now: UtcDateTime,
    ) -> Result<Notification, anyhow::Error> {
        let created = query_as::<_, SqlNotification>(
            r#"
                INSERT INTO notifications (league_id, kind, message, link, triggered_by, created_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING *
            "#,
        )
        .bind(notification.league_id.to_db()?)
        .bind(notification.kind.to_db()?)
        .bind(notification.message.as_str())
        .bind(notification.link.as_str())
        .bind(notification.triggered_by.to_db()?)
        .bind(now.to_db()?)
        .fetch_one(&self.pool)
        .await?;

        Ok(Notification::from_db(&created)?)
    }

    /// Oldest undelivered notifications first.
    pub async fn pending(&self, limit: u32) -> Result<Vec<Notification>, anyhow::Error> {
        let notifications = query_as::<_, SqlNotification>(
            r#"
                SELECT * FROM notifications
                WHERE delivered_at IS NULL
                ORDER BY created_at, id
                LIMIT $1
            "#,
        )
        .bind(limit.to_db()?)
        .fetch_all(&self.pool)
        .await?;

        Ok(notifications
            .iter()
            .map(Notification::from_db)
            .collect::<Result<Vec<_>, _>>()?)
    }

    pub async fn for_league(&self, league_id: LeagueId) -> Result<Vec<Notification>, anyhow::Error> {
        let notifications = query_as::<_, SqlNotification>(
            r#"SELECT * FROM notifications WHERE league_id = $1 ORDER BY created_at, id"#,
        )
        .bind(league_id.to_db()?)
        .fetch_all(&self.pool)
        .await?;

        Ok(notifications
            .iter()
            .map(Notification::from_db)
            .collect::<Result<Vec<_>, _>>()?)
    }

    pub async fn mark_delivered(
        &self,
        id: NotificationId,
        now: UtcDateTime,
    ) -> Result<bool, anyhow::Error> {
        let result = query(
            r#"UPDATE notifications SET delivered_at = $1 WHERE id = $2 AND delivered_at IS NULL"#,
        )
        .bind(now.to_db()?)
        .bind(id.to_db()?)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[derive(Debug, FromRow)]
pub struct SqlNotification {
    id: i64,
    league_id: i64,
    kind: String,
    message: String,
    link: String,
    triggered_by: Option<i64>,
    created_at: i64,
    delivered_at: Option<i64>,
}

impl DBConvertible for Notification {
    type DBType = SqlNotification;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
        Ok(SqlNotification {
            id: self.id.to_db()?,
            league_id: self.league_id.to_db()?,
            kind: self.kind.to_db()?,
            message: self.message.clone(),
            link: self.link.clone(),
            triggered_by: self.triggered_by.to_db()?,
            created_at: self.created_at.to_db()?,
            delivered_at: self.delivered_at.to_db()?,
        })
    }

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
        Ok(Notification {
            id: NotificationId::from_db(&value.id)?,
            league_id: LeagueId::from_db(&value.league_id)?,
            kind: NotificationKind::from_db(&value.kind)?,
            message: value.message.clone(),
            link: value.link.clone(),
            triggered_by: Option::<UserId>::from_db(&value.triggered_by)?,
            created_at: UtcDateTime::from_db(&value.created_at)?,
            delivered_at: Option::from_db(&value.delivered_at)?,
        })
    }
}
