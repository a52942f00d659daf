mod conversion;
mod league_repository;
mod listen_repository;
mod notification_repository;
mod round_repository;
mod standings_repository;
mod submission_repository;
mod vote_repository;

pub use conversion::{DBConvertible, DBFromConversionError, DBToConversionError};
pub use league_repository::LeagueRepository;
pub use listen_repository::{ListenProgress, ListenRepository};
pub use notification_repository::NotificationRepository;
pub use round_repository::RoundRepository;
pub use standings_repository::{Standing, StandingsRepository};
pub use submission_repository::SubmissionRepository;
pub use vote_repository::VoteRepository;

use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tracing::info;

#[tracing::instrument(skip(url))]
pub async fn setup_database(url: &str) -> anyhow::Result<SqlitePool> {
    info!("Connecting to SQLite database at {url}");
    let pool = SqlitePoolOptions::new().connect(url).await?;
    info!("Running migrations");
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Done!");
    Ok(pool)
}
