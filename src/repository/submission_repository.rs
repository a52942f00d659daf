use sqlx::{query_as, query_scalar, Executor, FromRow, Pool, Sqlite};

use crate::models::{
    types::UtcDateTime, NewSubmission, Phase, RoundId, Submission, SubmissionId, SubmissionType,
    UserId,
};

use super::conversion::{DBConvertible, DBFromConversionError, DBToConversionError};

pub struct SubmissionRepository {
    pool: Pool<Sqlite>,
}

impl SubmissionRepository {
    pub fn new(pool: Pool<Sqlite>) -> SubmissionRepository {
        SubmissionRepository { pool }
    }

    pub async fn add_submission(
        &self,
        submission: &NewSubmission,
    ) -> Result<Submission, anyhow::Error> {
        let mut transaction = self.pool.begin().await?;

        let added_submission = query_as::<_, SqlSubmission>(
            r#"
                INSERT INTO submissions (
                    round_id,
                    submitter,
                    submission_type,
                    title,
                    artist,
                    source,
                    duration_seconds,
                    submitted_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING *
            "#,
        )
        .bind(submission.round_id.to_db()?)
        .bind(submission.submitter.to_db()?)
        .bind(submission.submission_type.to_db()?)
        .bind(submission.title.as_str())
        .bind(submission.artist.as_str())
        .bind(submission.source.as_str())
        .bind(submission.duration_seconds)
        .bind(submission.submitted_at.to_db()?)
        .fetch_one(&mut *transaction)
        .await?;

        transaction.commit().await?;

        Ok(Submission::from_db(&added_submission)?)
    }

    /// Inserts the submission only while the round takes submissions and the submitter
    /// has fewer than `per_user_limit` entries in it. Returns `None` otherwise.
    pub async fn add_submission_if_allowed(
        &self,
        submission: &NewSubmission,
        per_user_limit: u32,
    ) -> Result<Option<Submission>, anyhow::Error> {
        let mut transaction = self.pool.begin().await?;

        let added_submission = query_as::<_, SqlSubmission>(
            r#"
                INSERT INTO submissions (
                    round_id,
                    submitter,
                    submission_type,
                    title,
                    artist,
                    source,
                    duration_seconds,
                    submitted_at)
                SELECT $1, $2, $3, $4, $5, $6, $7, $8
                WHERE EXISTS (SELECT 1 FROM rounds WHERE id = $1 AND phase = $9)
                    AND (SELECT COUNT(*) FROM submissions WHERE round_id = $1 AND submitter = $2) < $10
                RETURNING *
            "#,
        )
        .bind(submission.round_id.to_db()?)
        .bind(submission.submitter.to_db()?)
        .bind(submission.submission_type.to_db()?)
        .bind(submission.title.as_str())
        .bind(submission.artist.as_str())
        .bind(submission.source.as_str())
        .bind(submission.duration_seconds)
        .bind(submission.submitted_at.to_db()?)
        .bind(Phase::Submissions.to_db()?)
        .bind(per_user_limit.to_db()?)
        .fetch_optional(&mut *transaction)
        .await?;

        transaction.commit().await?;

        match added_submission {
            Some(added) => Ok(Some(Submission::from_db(&added)?)),
            None => Ok(None),
        }
    }

    pub async fn count_user_submissions(
        &self,
        round_id: RoundId,
        submitter: UserId,
    ) -> Result<u32, anyhow::Error> {
        let count: i64 = query_scalar(
            r#"SELECT COUNT(*) FROM submissions WHERE round_id = $1 AND submitter = $2"#,
        )
        .bind(round_id.to_db()?)
        .bind(submitter.to_db()?)
        .fetch_one(&self.pool)
        .await?;

        Ok(u32::from_db(&count)?)
    }

    pub async fn get_submission(
        &self,
        id: SubmissionId,
    ) -> Result<Option<Submission>, anyhow::Error> {
        let submission = query_as::<_, SqlSubmission>(r#"SELECT * FROM submissions WHERE id = $1"#)
            .bind(id.to_db()?)
            .fetch_optional(&self.pool)
            .await?;

        match submission {
            Some(submission) => Ok(Some(Submission::from_db(&submission)?)),
            None => Ok(None),
        }
    }

    /// All submissions of the round in creation order.
    pub async fn list_for_round(&self, round_id: RoundId) -> Result<Vec<Submission>, anyhow::Error> {
        fetch_round_submissions(&self.pool, round_id).await
    }
}

pub(super) async fn fetch_round_submissions<'e, E>(
    executor: E,
    round_id: RoundId,
) -> Result<Vec<Submission>, anyhow::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let submissions = query_as::<_, SqlSubmission>(
        r#"SELECT * FROM submissions WHERE round_id = $1 ORDER BY submitted_at, id"#,
    )
    .bind(round_id.to_db()?)
    .fetch_all(executor)
    .await?;

    Ok(submissions
        .iter()
        .map(Submission::from_db)
        .collect::<Result<Vec<_>, _>>()?)
}

#[derive(Debug, FromRow)]
pub struct SqlSubmission {
    id: i64,
    round_id: i64,
    submitter: i64,
    submission_type: String,
    title: String,
    artist: String,
    source: String,
    duration_seconds: Option<f64>,
    points: Option<i64>,
    rank: Option<i64>,
    submitted_at: i64,
}

impl DBConvertible for Submission {
    type DBType = SqlSubmission;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
        Ok(SqlSubmission {
            id: self.id.to_db()?,
            round_id: self.round_id.to_db()?,
            submitter: self.submitter.to_db()?,
            submission_type: self.submission_type.to_db()?,
            title: self.title.clone(),
            artist: self.artist.clone(),
            source: self.source.clone(),
            duration_seconds: self.duration_seconds,
            points: self.points,
            rank: self.rank.to_db()?,
            submitted_at: self.submitted_at.to_db()?,
        })
    }

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
        Ok(Submission {
            id: SubmissionId::from_db(&value.id)?,
            round_id: RoundId::from_db(&value.round_id)?,
            submitter: UserId::from_db(&value.submitter)?,
            submission_type: SubmissionType::from_db(&value.submission_type)?,
            title: value.title.clone(),
            artist: value.artist.clone(),
            source: value.source.clone(),
            duration_seconds: value.duration_seconds,
            points: value.points,
            rank: Option::from_db(&value.rank)?,
            submitted_at: UtcDateTime::from_db(&value.submitted_at)?,
        })
    }
}
