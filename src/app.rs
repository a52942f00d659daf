use std::sync::Arc;

use sqlx::SqlitePool;
use tokio::{sync::Notify, task::JoinHandle};
use tracing::{error, info};

use crate::{
    config::AppConfig,
    lifecycle::{scheduler::TransitionScheduler, state_machine::RoundStateMachine},
    repository::{
        LeagueRepository, ListenRepository, NotificationRepository, RoundRepository,
        StandingsRepository, SubmissionRepository, VoteRepository,
    },
    services::{AdminService, SubmissionService, VotingService},
    side_effects::SideEffectWorker,
};

/// Everything the request layer needs, wired from one config and one pool, plus the
/// running transition scheduler.
pub struct App {
    pub voting: Arc<VotingService>,
    pub submissions: Arc<SubmissionService>,
    pub admin: Arc<AdminService>,
    pub notifications: Arc<NotificationRepository>,
    pub standings: Arc<StandingsRepository>,
    scheduler: JoinHandle<()>,
    shutdown: Arc<Notify>,
}

impl App {
    /// Starts the side effect worker and the scheduler. Must be called inside a tokio runtime.
    pub fn start(config: &AppConfig, pool: SqlitePool) -> App {
        let side_effects = SideEffectWorker::new(
            NotificationRepository::new(pool.clone()),
            StandingsRepository::new(pool.clone()),
        )
        .start(config.side_effect_queue_capacity);

        let round_repository = Arc::new(RoundRepository::new(pool.clone()));
        let league_repository = Arc::new(LeagueRepository::new(pool.clone()));
        let submission_repository = Arc::new(SubmissionRepository::new(pool.clone()));

        let state_machine = Arc::new(RoundStateMachine::new(
            round_repository.clone(),
            Arc::new(side_effects),
            config.app_base_path.clone(),
        ));

        let voting = Arc::new(VotingService::new(
            round_repository.clone(),
            league_repository.clone(),
            submission_repository.clone(),
            Arc::new(VoteRepository::new(pool.clone())),
            Arc::new(ListenRepository::new(pool.clone())),
            config.seek_tolerance_seconds,
        ));

        let submissions = Arc::new(SubmissionService::new(
            round_repository.clone(),
            league_repository.clone(),
            submission_repository,
        ));

        let admin = Arc::new(AdminService::new(
            league_repository,
            round_repository.clone(),
            state_machine.clone(),
        ));

        let shutdown = Arc::new(Notify::new());
        let scheduler = TransitionScheduler::new(
            round_repository,
            state_machine,
            config.scheduler_interval(),
        )
        .start(shutdown.clone());

        App {
            voting,
            submissions,
            admin,
            notifications: Arc::new(NotificationRepository::new(pool.clone())),
            standings: Arc::new(StandingsRepository::new(pool)),
            scheduler,
            shutdown,
        }
    }

    /// Stops the scheduler and waits for its current tick to end.
    pub async fn shutdown(self) {
        // A stored permit, so a tick in progress still sees it afterwards.
        self.shutdown.notify_one();

        if let Err(err) = self.scheduler.await {
            error!("Transition scheduler task failed: {err}");
        }

        info!("Transition scheduler stopped");
    }
}
