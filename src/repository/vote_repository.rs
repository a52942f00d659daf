use sqlx::{query, query_as, query_scalar, Executor, FromRow, Pool, Sqlite};
use tracing::debug;

use crate::{
    lifecycle::vote_guard::VoteRejection,
    models::{types::UtcDateTime, Phase, RoundId, SubmissionId, UserId, Vote},
};

use super::conversion::{DBConvertible, DBFromConversionError, DBToConversionError};

pub struct VoteRepository {
    pool: Pool<Sqlite>,
}

impl VoteRepository {
    pub fn new(pool: Pool<Sqlite>) -> VoteRepository {
        VoteRepository { pool }
    }

    pub async fn votes_for_round(&self, round_id: RoundId) -> Result<Vec<Vote>, anyhow::Error> {
        fetch_round_votes(&self.pool, round_id).await
    }

    pub async fn votes_by_voter(
        &self,
        round_id: RoundId,
        voter: UserId,
    ) -> Result<Vec<Vote>, anyhow::Error> {
        fetch_voter_votes(&self.pool, round_id, voter).await
    }

    /// Stores `magnitude` as the voter's vote for the submission, replacing any earlier one.
    /// A zero magnitude retracts the vote.
    ///
    /// `validate` sees the round phase and the voter's current votes inside the same
    /// transaction as the write, so concurrent casts cannot overshoot the caps.
    pub async fn apply_vote<F>(
        &self,
        round_id: RoundId,
        voter: UserId,
        submission_id: SubmissionId,
        magnitude: i64,
        validate: F,
    ) -> Result<Result<(), VoteRejection>, anyhow::Error>
    where
        F: FnOnce(Phase, &[Vote]) -> Result<(), VoteRejection>,
    {
        let mut transaction = self.pool.begin().await?;

        let phase: Option<String> = query_scalar(r#"SELECT phase FROM rounds WHERE id = $1"#)
            .bind(round_id.to_db()?)
            .fetch_optional(&mut *transaction)
            .await?;

        let Some(phase) = phase else {
            anyhow::bail!("Round {round_id} does not exist");
        };
        let phase = Phase::from_db(&phase)?;

        let existing = fetch_voter_votes(&mut *transaction, round_id, voter).await?;

        if let Err(rejection) = validate(phase, &existing) {
            transaction.rollback().await?;
            return Ok(Err(rejection));
        }

        if magnitude == 0 {
            query(r#"DELETE FROM votes WHERE voter = $1 AND submission_id = $2"#)
                .bind(voter.to_db()?)
                .bind(submission_id.to_db()?)
                .execute(&mut *transaction)
                .await?;

            debug!("Retracted vote of {voter} for submission {submission_id}");
        } else {
            query(
                r#"
                    INSERT INTO votes (round_id, voter, submission_id, magnitude, cast_at)
                    VALUES ($1, $2, $3, $4, $5)
                    ON CONFLICT (voter, submission_id)
                    DO UPDATE SET magnitude = $4, cast_at = $5
                "#,
            )
            .bind(round_id.to_db()?)
            .bind(voter.to_db()?)
            .bind(submission_id.to_db()?)
            .bind(magnitude)
            .bind(UtcDateTime::now().to_db()?)
            .execute(&mut *transaction)
            .await?;

            debug!("Stored vote {magnitude:+} of {voter} for submission {submission_id}");
        }

        transaction.commit().await?;

        Ok(Ok(()))
    }
}

const VOTE_COLUMNS: &str = "round_id, voter, submission_id, magnitude, cast_at";

pub(super) async fn fetch_round_votes<'e, E>(
    executor: E,
    round_id: RoundId,
) -> Result<Vec<Vote>, anyhow::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let votes = query_as::<_, SqlVote>(&format!(
        r#"SELECT {VOTE_COLUMNS} FROM votes WHERE round_id = $1 ORDER BY id"#
    ))
    .bind(round_id.to_db()?)
    .fetch_all(executor)
    .await?;

    Ok(votes.iter().map(Vote::from_db).collect::<Result<Vec<_>, _>>()?)
}

async fn fetch_voter_votes<'e, E>(
    executor: E,
    round_id: RoundId,
    voter: UserId,
) -> Result<Vec<Vote>, anyhow::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let votes = query_as::<_, SqlVote>(&format!(
        r#"SELECT {VOTE_COLUMNS} FROM votes WHERE round_id = $1 AND voter = $2 ORDER BY id"#
    ))
    .bind(round_id.to_db()?)
    .bind(voter.to_db()?)
    .fetch_all(executor)
    .await?;

    Ok(votes.iter().map(Vote::from_db).collect::<Result<Vec<_>, _>>()?)
}

#[derive(Debug, FromRow)]
pub struct SqlVote {
    round_id: i64,
    voter: i64,
    submission_id: i64,
    magnitude: i64,
    cast_at: i64,
}

impl DBConvertible for Vote {
    type DBType = SqlVote;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
        Ok(SqlVote {
            round_id: self.round_id.to_db()?,
            voter: self.voter.to_db()?,
            submission_id: self.submission_id.to_db()?,
            magnitude: self.magnitude,
            cast_at: self.cast_at.to_db()?,
        })
    }

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
        Ok(Vote {
            round_id: RoundId::from_db(&value.round_id)?,
            voter: UserId::from_db(&value.voter)?,
            submission_id: SubmissionId::from_db(&value.submission_id)?,
            magnitude: value.magnitude,
            cast_at: UtcDateTime::from_db(&value.cast_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::VoteRepository;
    use crate::{
        lifecycle::vote_guard::VoteRejection,
        models::{types::UtcDateTime, Phase, UserId},
        repository::testing::{create_league, create_round, create_submission, new_league, test_pool},
    };

    #[test(tokio::test)]
    async fn recasting_replaces_and_zero_retracts() {
        let pool = test_pool().await;
        let repository = VoteRepository::new(pool.clone());
        let league = create_league(&pool, new_league()).await;
        let round = create_round(&pool, league.id, UtcDateTime::now()).await;
        let submission = create_submission(&pool, &round, 1).await;

        let voter = UserId(2);
        repository
            .apply_vote(round.id, voter, submission.id, 2, |_, _| Ok(()))
            .await
            .unwrap()
            .unwrap();
        repository
            .apply_vote(round.id, voter, submission.id, -1, |_, _| Ok(()))
            .await
            .unwrap()
            .unwrap();

        let votes = repository.votes_by_voter(round.id, voter).await.unwrap();
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].magnitude, -1);

        repository
            .apply_vote(round.id, voter, submission.id, 0, |_, _| Ok(()))
            .await
            .unwrap()
            .unwrap();
        assert!(repository.votes_for_round(round.id).await.unwrap().is_empty());
    }

    #[test(tokio::test)]
    async fn rejected_votes_are_not_written() {
        let pool = test_pool().await;
        let repository = VoteRepository::new(pool.clone());
        let league = create_league(&pool, new_league()).await;
        let round = create_round(&pool, league.id, UtcDateTime::now()).await;
        let submission = create_submission(&pool, &round, 1).await;

        let outcome = repository
            .apply_vote(round.id, UserId(2), submission.id, 1, |phase, existing| {
                assert!(existing.is_empty());
                Err(VoteRejection::WrongPhase(phase))
            })
            .await
            .unwrap();

        assert_eq!(outcome, Err(VoteRejection::WrongPhase(Phase::Submissions)));
        assert!(repository.votes_for_round(round.id).await.unwrap().is_empty());
    }
}
