use sqlx::{query_as, FromRow, Pool, Sqlite};

use crate::models::{LeagueId, LeagueSettings, ListenPolicy, NewLeague};

use super::conversion::{DBConvertible, DBFromConversionError, DBToConversionError};

pub struct LeagueRepository {
    pool: Pool<Sqlite>,
}

impl LeagueRepository {
    pub fn new(pool: Pool<Sqlite>) -> LeagueRepository {
        LeagueRepository { pool }
    }

    pub async fn create_league(&self, league: &NewLeague) -> Result<LeagueSettings, anyhow::Error> {
        let mut transaction = self.pool.begin().await?;

        let created = query_as::<_, SqlLeague>(
            r#"
                INSERT INTO leagues (
                    name,
                    upvote_limit,
                    downvote_limit,
                    per_submission_upvote_limit,
                    per_submission_downvote_limit,
                    submissions_per_user,
                    submission_hours,
                    voting_hours,
                    listen_required,
                    listen_percentage,
                    listen_time_limit_minutes,
                    is_public)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                RETURNING *
            "#,
        )
        .bind(league.name.as_str())
        .bind(league.upvote_limit.to_db()?)
        .bind(league.downvote_limit.to_db()?)
        .bind(league.per_submission_upvote_limit.to_db()?)
        .bind(league.per_submission_downvote_limit.to_db()?)
        .bind(league.submissions_per_user.to_db()?)
        .bind(league.submission_hours.to_db()?)
        .bind(league.voting_hours.to_db()?)
        .bind(league.listen_policy.required)
        .bind(league.listen_policy.percentage.to_db()?)
        .bind(league.listen_policy.time_limit_minutes.to_db()?)
        .bind(league.is_public)
        .fetch_one(&mut *transaction)
        .await?;

        transaction.commit().await?;

        Ok(LeagueSettings::from_db(&created)?)
    }

    pub async fn get_settings(&self, id: LeagueId) -> Result<Option<LeagueSettings>, anyhow::Error> {
        let league = query_as::<_, SqlLeague>(r#"SELECT * FROM leagues WHERE id = $1"#)
            .bind(id.to_db()?)
            .fetch_optional(&self.pool)
            .await?;

        match league {
            Some(league) => Ok(Some(LeagueSettings::from_db(&league)?)),
            None => Ok(None),
        }
    }
}

#[derive(Debug, FromRow)]
pub struct SqlLeague {
    id: i64,
    name: String,
    upvote_limit: i64,
    downvote_limit: i64,
    per_submission_upvote_limit: Option<i64>,
    per_submission_downvote_limit: Option<i64>,
    submissions_per_user: i64,
    submission_hours: i64,
    voting_hours: i64,
    listen_required: bool,
    listen_percentage: Option<i64>,
    listen_time_limit_minutes: Option<i64>,
    is_public: bool,
}

impl DBConvertible for LeagueSettings {
    type DBType = SqlLeague;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
        Ok(SqlLeague {
            id: self.id.to_db()?,
            name: self.name.clone(),
            upvote_limit: self.upvote_limit.to_db()?,
            downvote_limit: self.downvote_limit.to_db()?,
            per_submission_upvote_limit: self.per_submission_upvote_limit.to_db()?,
            per_submission_downvote_limit: self.per_submission_downvote_limit.to_db()?,
            submissions_per_user: self.submissions_per_user.to_db()?,
            submission_hours: self.submission_hours.to_db()?,
            voting_hours: self.voting_hours.to_db()?,
            listen_required: self.listen_policy.required,
            listen_percentage: self.listen_policy.percentage.to_db()?,
            listen_time_limit_minutes: self.listen_policy.time_limit_minutes.to_db()?,
            is_public: self.is_public,
        })
    }

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
        Ok(LeagueSettings {
            id: LeagueId::from_db(&value.id)?,
            name: value.name.clone(),
            upvote_limit: u32::from_db(&value.upvote_limit)?,
            downvote_limit: u32::from_db(&value.downvote_limit)?,
            per_submission_upvote_limit: Option::from_db(&value.per_submission_upvote_limit)?,
            per_submission_downvote_limit: Option::from_db(&value.per_submission_downvote_limit)?,
            submissions_per_user: u32::from_db(&value.submissions_per_user)?,
            submission_hours: u32::from_db(&value.submission_hours)?,
            voting_hours: u32::from_db(&value.voting_hours)?,
            listen_policy: ListenPolicy {
                required: value.listen_required,
                percentage: Option::from_db(&value.listen_percentage)?,
                time_limit_minutes: Option::from_db(&value.listen_time_limit_minutes)?,
            },
            is_public: value.is_public,
        })
    }
}
