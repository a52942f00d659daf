use sqlx::{query, query_as, FromRow, Pool, Sqlite};
use tracing::{info, warn};

use crate::{
    lifecycle::tally::{compute_tally, Tally},
    models::{types::UtcDateTime, LeagueId, NewRound, Phase, Round, RoundId, VoteLimitOverrides},
};

use super::{
    conversion::{DBConvertible, DBFromConversionError, DBToConversionError},
    submission_repository::fetch_round_submissions,
    vote_repository::fetch_round_votes,
};

#[derive(Debug)]
pub struct RoundRepository {
    pool: Pool<Sqlite>,
}

impl RoundRepository {
    pub fn new(pool: Pool<Sqlite>) -> RoundRepository {
        RoundRepository { pool }
    }

    pub async fn create_round(&self, new_round: &NewRound) -> Result<Round, anyhow::Error> {
        let mut transaction = self.pool.begin().await?;

        let round = query_as::<_, SqlRound>(
            r#"
                INSERT INTO rounds (
                    league_id,
                    title,
                    phase,
                    submission_deadline,
                    voting_deadline,
                    upvote_limit,
                    downvote_limit,
                    per_submission_upvote_limit,
                    per_submission_downvote_limit)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                RETURNING *
            "#,
        )
        .bind(new_round.league_id.to_db()?)
        .bind(new_round.title.as_str())
        .bind(Phase::Submissions.to_db()?)
        .bind(new_round.submission_deadline.to_db()?)
        .bind(new_round.voting_deadline.to_db()?)
        .bind(new_round.vote_limits.upvote_limit.to_db()?)
        .bind(new_round.vote_limits.downvote_limit.to_db()?)
        .bind(new_round.vote_limits.per_submission_upvote_limit.to_db()?)
        .bind(new_round.vote_limits.per_submission_downvote_limit.to_db()?)
        .fetch_one(&mut *transaction)
        .await?;

        transaction.commit().await?;

        Ok(Round::from_db(&round)?)
    }

    pub async fn get_round(&self, id: RoundId) -> Result<Option<Round>, anyhow::Error> {
        let round = query_as::<_, SqlRound>(r#"SELECT * FROM rounds WHERE id = $1"#)
            .bind(id.to_db()?)
            .fetch_optional(&self.pool)
            .await?;

        match round {
            Some(round) => Ok(Some(Round::from_db(&round)?)),
            None => Ok(None),
        }
    }

    pub async fn get_league_rounds(&self, league_id: LeagueId) -> Result<Vec<Round>, anyhow::Error> {
        let rounds = query_as::<_, SqlRound>(
            r#"SELECT * FROM rounds WHERE league_id = $1 ORDER BY submission_deadline, id"#,
        )
        .bind(league_id.to_db()?)
        .fetch_all(&self.pool)
        .await?;

        Ok(rounds
            .iter()
            .map(Round::from_db)
            .collect::<Result<Vec<_>, _>>()?)
    }

    /// Rounds still collecting submissions although their submission deadline has passed.
    pub async fn get_rounds_due_for_voting(
        &self,
        now: UtcDateTime,
    ) -> Result<Vec<Round>, anyhow::Error> {
        self.get_overdue_rounds(Phase::Submissions, now).await
    }

    /// Rounds still collecting votes although their voting deadline has passed.
    pub async fn get_rounds_due_for_finishing(
        &self,
        now: UtcDateTime,
    ) -> Result<Vec<Round>, anyhow::Error> {
        self.get_overdue_rounds(Phase::Voting, now).await
    }

    async fn get_overdue_rounds(
        &self,
        phase: Phase,
        now: UtcDateTime,
    ) -> Result<Vec<Round>, anyhow::Error> {
        let deadline_column = match phase {
            Phase::Submissions => "submission_deadline",
            Phase::Voting => "voting_deadline",
            Phase::Finished => return Ok(Vec::new()),
        };

        let rounds = query_as::<_, SqlRound>(&format!(
            r#"
                SELECT * FROM rounds
                WHERE phase = $1 AND {deadline_column} <= $2
                ORDER BY {deadline_column}, id
            "#
        ))
        .bind(phase.to_db()?)
        .bind(now.to_db()?)
        .fetch_all(&self.pool)
        .await?;

        Ok(rounds
            .iter()
            .map(Round::from_db)
            .collect::<Result<Vec<_>, _>>()?)
    }

    /// Atomically moves the round from `from` to `to`.
    ///
    /// Returns `false` when the round was not in `from` at the moment of the update,
    /// which means some other caller already performed the transition.
    pub async fn compare_and_set_phase(
        &self,
        id: RoundId,
        from: Phase,
        to: Phase,
    ) -> Result<bool, anyhow::Error> {
        let result = query(r#"UPDATE rounds SET phase = $1 WHERE id = $2 AND phase = $3"#)
            .bind(to.to_db()?)
            .bind(id.to_db()?)
            .bind(from.to_db()?)
            .execute(&self.pool)
            .await?;

        let rows_affected = result.rows_affected();
        if rows_affected > 1 {
            warn!("Updated more than one round while transitioning round {id}");
        }

        Ok(rows_affected > 0)
    }

    /// Moves the round from voting to finished and stores the tally in the same transaction.
    ///
    /// Returns `None` if the round was not in the voting phase. If tallying fails
    /// nothing is written and the round stays in voting.
    pub async fn finish_and_settle(&self, id: RoundId) -> Result<Option<Tally>, anyhow::Error> {
        let mut transaction = self.pool.begin().await?;

        let db_id = id.to_db()?;

        let updated = query(r#"UPDATE rounds SET phase = $1 WHERE id = $2 AND phase = $3"#)
            .bind(Phase::Finished.to_db()?)
            .bind(db_id)
            .bind(Phase::Voting.to_db()?)
            .execute(&mut *transaction)
            .await?
            .rows_affected();

        if updated == 0 {
            transaction.rollback().await?;
            return Ok(None);
        }

        let submissions = fetch_round_submissions(&mut *transaction, id).await?;
        let votes = fetch_round_votes(&mut *transaction, id).await?;

        // Dropping the transaction on error rolls the phase change back.
        let tally = compute_tally(&submissions, &votes)?;

        for score in tally.scores() {
            query(r#"UPDATE submissions SET points = $1, rank = $2 WHERE id = $3"#)
                .bind(score.points)
                .bind(score.rank.to_db()?)
                .bind(score.submission_id.to_db()?)
                .execute(&mut *transaction)
                .await?;
        }

        transaction.commit().await?;

        info!(
            "Settled round {id}: {} submissions, {} votes",
            submissions.len(),
            votes.len()
        );

        Ok(Some(tally))
    }
}

#[derive(Debug, FromRow)]
pub struct SqlRound {
    id: i64,
    league_id: i64,
    title: String,
    phase: String,
    submission_deadline: i64,
    voting_deadline: i64,
    upvote_limit: Option<i64>,
    downvote_limit: Option<i64>,
    per_submission_upvote_limit: Option<i64>,
    per_submission_downvote_limit: Option<i64>,
}

impl DBConvertible for Round {
    type DBType = SqlRound;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
        Ok(SqlRound {
            id: self.id.to_db()?,
            league_id: self.league_id.to_db()?,
            title: self.title.clone(),
            phase: self.phase.to_db()?,
            submission_deadline: self.submission_deadline.to_db()?,
            voting_deadline: self.voting_deadline.to_db()?,
            upvote_limit: self.vote_limits.upvote_limit.to_db()?,
            downvote_limit: self.vote_limits.downvote_limit.to_db()?,
            per_submission_upvote_limit: self.vote_limits.per_submission_upvote_limit.to_db()?,
            per_submission_downvote_limit: self.vote_limits.per_submission_downvote_limit.to_db()?,
        })
    }

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
        Ok(Round {
            id: RoundId::from_db(&value.id)?,
            league_id: LeagueId::from_db(&value.league_id)?,
            title: value.title.clone(),
            phase: Phase::from_db(&value.phase)?,
            submission_deadline: UtcDateTime::from_db(&value.submission_deadline)?,
            voting_deadline: UtcDateTime::from_db(&value.voting_deadline)?,
            vote_limits: VoteLimitOverrides {
                upvote_limit: Option::from_db(&value.upvote_limit)?,
                downvote_limit: Option::from_db(&value.downvote_limit)?,
                per_submission_upvote_limit: Option::from_db(&value.per_submission_upvote_limit)?,
                per_submission_downvote_limit: Option::from_db(
                    &value.per_submission_downvote_limit,
                )?,
            },
        })
    }
}
