use sqlx::{query, query_as, FromRow, Pool, Sqlite};

use crate::models::{types::UtcDateTime, SubmissionId, UserId};

use super::conversion::{DBConvertible, DBFromConversionError, DBToConversionError};

/// How far a member has listened to a submission.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ListenProgress {
    pub listened_until: f64,
    /// Set when the playback layer confirmed a full listen on its side.
    pub completed: bool,
    /// When the player last reported a position, `None` before the first report.
    pub last_reported_at: Option<UtcDateTime>,
}

pub struct ListenRepository {
    pool: Pool<Sqlite>,
}

impl ListenRepository {
    pub fn new(pool: Pool<Sqlite>) -> ListenRepository {
        ListenRepository { pool }
    }

    pub async fn get_progress(
        &self,
        member: UserId,
        submission_id: SubmissionId,
    ) -> Result<ListenProgress, anyhow::Error> {
        let progress = query_as::<_, SqlListenProgress>(
            r#"
                SELECT listened_until, completed, last_reported_at FROM listen_progress
                WHERE member = $1 AND submission_id = $2
            "#,
        )
        .bind(member.to_db()?)
        .bind(submission_id.to_db()?)
        .fetch_optional(&self.pool)
        .await?;

        match progress {
            Some(progress) => Ok(ListenProgress::from_db(&progress)?),
            None => Ok(ListenProgress::default()),
        }
    }

    /// Moves the listened-until offset forward and stamps the report time.
    /// Offsets behind the stored one are ignored.
    pub async fn record_progress(
        &self,
        member: UserId,
        submission_id: SubmissionId,
        listened_until: f64,
        reported_at: UtcDateTime,
    ) -> Result<ListenProgress, anyhow::Error> {
        let progress = query_as::<_, SqlListenProgress>(
            r#"
                INSERT INTO listen_progress (member, submission_id, listened_until, last_reported_at)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (member, submission_id)
                DO UPDATE SET
                    listened_until = MAX(listened_until, excluded.listened_until),
                    last_reported_at = excluded.last_reported_at
                RETURNING listened_until, completed, last_reported_at
            "#,
        )
        .bind(member.to_db()?)
        .bind(submission_id.to_db()?)
        .bind(listened_until)
        .bind(reported_at.to_db()?)
        .fetch_one(&self.pool)
        .await?;

        Ok(ListenProgress::from_db(&progress)?)
    }

    pub async fn mark_completed(
        &self,
        member: UserId,
        submission_id: SubmissionId,
    ) -> Result<(), anyhow::Error> {
        query(
            r#"
                INSERT INTO listen_progress (member, submission_id, completed)
                VALUES ($1, $2, TRUE)
                ON CONFLICT (member, submission_id) DO UPDATE SET completed = TRUE
            "#,
        )
        .bind(member.to_db()?)
        .bind(submission_id.to_db()?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[derive(Debug, FromRow)]
pub struct SqlListenProgress {
    listened_until: f64,
    completed: bool,
    last_reported_at: Option<i64>,
}

impl DBConvertible for ListenProgress {
    type DBType = SqlListenProgress;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
        Ok(SqlListenProgress {
            listened_until: self.listened_until,
            completed: self.completed,
            last_reported_at: self.last_reported_at.to_db()?,
        })
    }

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
        Ok(ListenProgress {
            listened_until: value.listened_until,
            completed: value.completed,
            last_reported_at: Option::<UtcDateTime>::from_db(&value.last_reported_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;
    use time::Duration;

    use super::{ListenProgress, ListenRepository};
    use crate::{
        models::{types::UtcDateTime, UserId},
        repository::testing::{create_league, create_round, create_submission, new_league, test_pool},
    };

    #[test(tokio::test)]
    async fn progress_only_moves_forward() {
        let pool = test_pool().await;
        let repository = ListenRepository::new(pool.clone());
        let league = create_league(&pool, new_league()).await;
        let round = create_round(&pool, league.id, UtcDateTime::now()).await;
        let submission = create_submission(&pool, &round, 1).await;
        let member = UserId(7);

        assert_eq!(
            repository.get_progress(member, submission.id).await.unwrap(),
            ListenProgress::default()
        );

        let first_report = UtcDateTime::from_unix_timestamp(1_800_000_000).unwrap();
        let second_report = first_report + Duration::seconds(5);

        repository
            .record_progress(member, submission.id, 42.5, first_report)
            .await
            .unwrap();
        let progress = repository
            .record_progress(member, submission.id, 10.0, second_report)
            .await
            .unwrap();
        assert_eq!(progress.listened_until, 42.5);
        assert_eq!(progress.last_reported_at, Some(second_report));
        assert!(!progress.completed);

        repository.mark_completed(member, submission.id).await.unwrap();
        let progress = repository.get_progress(member, submission.id).await.unwrap();
        assert_eq!(
            progress,
            ListenProgress {
                listened_until: 42.5,
                completed: true,
                last_reported_at: Some(second_report),
            }
        );
    }
}
