use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::{
    lifecycle::state_machine::{RoundStateMachine, TransitionOptions},
    models::{types::UtcDateTime, LeagueId, NewRound, Round, RoundId, UserId, VoteLimitOverrides},
    repository::{LeagueRepository, RoundRepository},
};

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("League {0} not found")]
    LeagueNotFound(LeagueId),
    #[error("Round {0} not found")]
    RoundNotFound(RoundId),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Manual controls for league hosts. Transitions go through the same state machine as the
/// scheduler, so racing it is harmless.
pub struct AdminService {
    league_repository: Arc<LeagueRepository>,
    round_repository: Arc<RoundRepository>,
    state_machine: Arc<RoundStateMachine>,
}

impl AdminService {
    pub fn new(
        league_repository: Arc<LeagueRepository>,
        round_repository: Arc<RoundRepository>,
        state_machine: Arc<RoundStateMachine>,
    ) -> AdminService {
        AdminService {
            league_repository,
            round_repository,
            state_machine,
        }
    }

    /// Creates a round opening at `start`, with deadlines derived from the league durations.
    #[tracing::instrument(skip(self))]
    pub async fn schedule_round(
        &self,
        league_id: LeagueId,
        title: &str,
        start: UtcDateTime,
        vote_limits: VoteLimitOverrides,
    ) -> Result<Round, AdminError> {
        let league = self
            .league_repository
            .get_settings(league_id)
            .await?
            .ok_or(AdminError::LeagueNotFound(league_id))?;

        let submission_deadline = start + league.submission_duration();
        let voting_deadline = submission_deadline + league.voting_duration();

        let round = self
            .round_repository
            .create_round(&NewRound {
                league_id,
                title: title.trim().to_string(),
                submission_deadline,
                voting_deadline,
                vote_limits,
            })
            .await?;

        info!("Scheduled round {} ({}) in league {league_id}", round.id, round.title);

        Ok(round)
    }

    /// Closes submissions right away. `Ok(false)` if the round was not taking submissions.
    #[tracing::instrument(skip(self))]
    pub async fn start_voting_now(
        &self,
        round_id: RoundId,
        admin: UserId,
    ) -> Result<bool, AdminError> {
        let round = self.round(round_id).await?;

        let options = TransitionOptions {
            triggered_by: Some(admin),
            message: None,
        };

        Ok(self.state_machine.transition_to_voting(&round, options).await?)
    }

    /// Ends voting right away. `Ok(false)` if the round was not in voting.
    #[tracing::instrument(skip(self))]
    pub async fn finish_round_now(
        &self,
        round_id: RoundId,
        admin: UserId,
        message: Option<String>,
    ) -> Result<bool, AdminError> {
        let round = self.round(round_id).await?;

        let options = TransitionOptions {
            triggered_by: Some(admin),
            message,
        };

        Ok(self.state_machine.transition_to_finished(&round, options).await?)
    }

    async fn round(&self, round_id: RoundId) -> Result<Round, AdminError> {
        self.round_repository
            .get_round(round_id)
            .await?
            .ok_or(AdminError::RoundNotFound(round_id))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use test_log::test;
    use time::Duration;

    use super::{AdminError, AdminService};
    use crate::{
        lifecycle::state_machine::RoundStateMachine,
        models::{types::UtcDateTime, LeagueId, Phase, RoundId, UserId, VoteLimitOverrides},
        repository::{
            testing::{create_league, new_league, test_pool},
            LeagueRepository, RoundRepository,
        },
        side_effects::{testing::RecordingQueue, SideEffect},
    };

    #[test(tokio::test)]
    async fn scheduled_round_follows_league_durations_and_can_be_forced_through() {
        let pool = test_pool().await;
        let rounds = Arc::new(RoundRepository::new(pool.clone()));
        let queue = Arc::new(RecordingQueue::default());
        let service = AdminService::new(
            Arc::new(LeagueRepository::new(pool.clone())),
            rounds.clone(),
            Arc::new(RoundStateMachine::new(rounds.clone(), queue.clone(), "")),
        );
        let league = create_league(&pool, new_league()).await;

        let start = UtcDateTime::from_unix_timestamp(1_800_000_000).unwrap();
        let overrides = VoteLimitOverrides {
            upvote_limit: Some(8),
            ..VoteLimitOverrides::default()
        };
        let round = service
            .schedule_round(league.id, "  Covers  ", start, overrides)
            .await
            .unwrap();

        assert_eq!(round.title, "Covers");
        assert_eq!(round.phase, Phase::Submissions);
        assert_eq!(round.submission_deadline, start + Duration::hours(72));
        assert_eq!(round.voting_deadline, start + Duration::hours(120));
        assert_eq!(round.vote_limits, overrides);

        let admin = UserId(1);
        assert!(!service.finish_round_now(round.id, admin, None).await.unwrap());
        assert!(service.start_voting_now(round.id, admin).await.unwrap());
        assert!(!service.start_voting_now(round.id, admin).await.unwrap());
        assert!(service
            .finish_round_now(round.id, admin, Some("Wrapping up early".to_string()))
            .await
            .unwrap());

        let round = rounds.get_round(round.id).await.unwrap().unwrap();
        assert_eq!(round.phase, Phase::Finished);

        let effects = queue.effects();
        assert_eq!(effects.len(), 3);
        assert!(effects.iter().all(|effect| match effect {
            SideEffect::Notify(n) => n.triggered_by == Some(admin),
            SideEffect::RecomputeStandings(id) => *id == league.id,
        }));
    }

    #[test(tokio::test)]
    async fn unknown_ids_are_reported() {
        let pool = test_pool().await;
        let rounds = Arc::new(RoundRepository::new(pool.clone()));
        let service = AdminService::new(
            Arc::new(LeagueRepository::new(pool.clone())),
            rounds.clone(),
            Arc::new(RoundStateMachine::new(
                rounds,
                Arc::new(RecordingQueue::default()),
                "",
            )),
        );

        assert!(matches!(
            service
                .schedule_round(LeagueId(9), "Nope", UtcDateTime::now(), Default::default())
                .await,
            Err(AdminError::LeagueNotFound(LeagueId(9)))
        ));
        assert!(matches!(
            service.start_voting_now(RoundId(9), UserId(1)).await,
            Err(AdminError::RoundNotFound(RoundId(9)))
        ));
    }
}
