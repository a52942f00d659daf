use sqlx::{query, query_as, FromRow, Pool, Sqlite};
use tracing::info;

use crate::models::{LeagueId, Phase, UserId};

use super::conversion::DBConvertible;

/// A member's aggregate results across the finished rounds of a league.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Standing {
    pub member: UserId,
    pub total_points: i64,
    pub rounds_played: u32,
    pub wins: u32,
}

pub struct StandingsRepository {
    pool: Pool<Sqlite>,
}

impl StandingsRepository {
    pub fn new(pool: Pool<Sqlite>) -> StandingsRepository {
        StandingsRepository { pool }
    }

    /// Rebuilds the league standings from the settled submissions of its finished rounds.
    #[tracing::instrument(skip(self))]
    pub async fn recompute(&self, league_id: LeagueId) -> Result<(), anyhow::Error> {
        let mut transaction = self.pool.begin().await?;

        let league = league_id.to_db()?;

        query(r#"DELETE FROM league_standings WHERE league_id = $1"#)
            .bind(league)
            .execute(&mut *transaction)
            .await?;

        let inserted = query(
            r#"
                INSERT INTO league_standings (league_id, member, total_points, rounds_played, wins)
                SELECT
                    rounds.league_id,
                    submissions.submitter,
                    COALESCE(SUM(submissions.points), 0),
                    COUNT(DISTINCT submissions.round_id),
                    SUM(CASE WHEN submissions.rank = 1 THEN 1 ELSE 0 END)
                FROM submissions
                JOIN rounds ON rounds.id = submissions.round_id
                WHERE rounds.league_id = $1 AND rounds.phase = $2
                GROUP BY rounds.league_id, submissions.submitter
            "#,
        )
        .bind(league)
        .bind(Phase::Finished.to_db()?)
        .execute(&mut *transaction)
        .await?
        .rows_affected();

        transaction.commit().await?;

        info!("Recomputed standings for {inserted} members");

        Ok(())
    }

    pub async fn get_standings(&self, league_id: LeagueId) -> Result<Vec<Standing>, anyhow::Error> {
        let standings = query_as::<_, SqlStanding>(
            r#"
                SELECT member, total_points, rounds_played, wins FROM league_standings
                WHERE league_id = $1
                ORDER BY total_points DESC, wins DESC, member
            "#,
        )
        .bind(league_id.to_db()?)
        .fetch_all(&self.pool)
        .await?;

        let mut result = Vec::with_capacity(standings.len());
        for standing in standings {
            result.push(Standing {
                member: UserId::from_db(&standing.member)?,
                total_points: standing.total_points,
                rounds_played: u32::from_db(&standing.rounds_played)?,
                wins: u32::from_db(&standing.wins)?,
            });
        }

        Ok(result)
    }
}

#[derive(Debug, FromRow)]
struct SqlStanding {
    member: i64,
    total_points: i64,
    rounds_played: i64,
    wins: i64,
}
