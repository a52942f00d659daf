use std::{sync::Arc, time::Duration};

use tokio::{
    select,
    sync::Notify,
    task::{JoinHandle, JoinSet},
    time::MissedTickBehavior,
};
use tracing::{error, info, info_span, warn, Instrument};

use crate::{
    models::{types::UtcDateTime, Round},
    repository::RoundRepository,
};

use super::state_machine::{RoundStateMachine, TransitionOptions};

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(60);

/// What a single scheduler pass did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub started_voting: usize,
    pub finished: usize,
    /// Due rounds some other caller transitioned first.
    pub already_transitioned: usize,
    pub failed: usize,
}

#[derive(Clone, Copy, Debug)]
enum DueTransition {
    ToVoting,
    ToFinished,
}

/// Periodically moves rounds whose deadlines have passed to their next phase.
///
/// Holds no state between ticks: every pass reads the due rounds fresh from storage,
/// and anything that failed is simply due again on the next pass.
pub struct TransitionScheduler {
    round_repository: Arc<RoundRepository>,
    state_machine: Arc<RoundStateMachine>,
    interval: Duration,
}

impl TransitionScheduler {
    pub fn new(
        round_repository: Arc<RoundRepository>,
        state_machine: Arc<RoundStateMachine>,
        interval: Duration,
    ) -> TransitionScheduler {
        TransitionScheduler {
            round_repository,
            state_machine,
            interval,
        }
    }

    /// Runs the tick loop on its own task until `shutdown` is notified.
    pub fn start(self, shutdown: Arc<Notify>) -> JoinHandle<()> {
        tokio::spawn(
            async move {
                let mut interval = tokio::time::interval(self.interval);
                interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

                info!("Checking round deadlines every {:?}", self.interval);

                loop {
                    select! {
                        _ = interval.tick() => {
                            let report = self.tick(UtcDateTime::now()).await;
                            if report != TickReport::default() {
                                info!("Scheduler tick: {report:?}");
                            }
                        }

                        _ = shutdown.notified() => {
                            info!("Shutting down the transition scheduler");
                            break;
                        }
                    }
                }
            }
            .instrument(info_span!("transition_scheduler")),
        )
    }

    /// One pass over all due rounds as of `now`.
    #[tracing::instrument(skip(self))]
    pub async fn tick(&self, now: UtcDateTime) -> TickReport {
        let mut report = TickReport::default();

        match self.round_repository.get_rounds_due_for_voting(now).await {
            Ok(rounds) => self.run_all(DueTransition::ToVoting, rounds, &mut report).await,
            Err(err) => {
                error!("Could not load rounds due for voting: {err}");
                report.failed += 1;
            }
        }

        match self.round_repository.get_rounds_due_for_finishing(now).await {
            Ok(rounds) => self.run_all(DueTransition::ToFinished, rounds, &mut report).await,
            Err(err) => {
                error!("Could not load rounds due for finishing: {err}");
                report.failed += 1;
            }
        }

        report
    }

    async fn run_all(&self, transition: DueTransition, rounds: Vec<Round>, report: &mut TickReport) {
        let mut tasks = JoinSet::new();

        for round in rounds {
            let state_machine = self.state_machine.clone();
            tasks.spawn(
                async move {
                    let result = match transition {
                        DueTransition::ToVoting => {
                            state_machine
                                .transition_to_voting(&round, TransitionOptions::default())
                                .await
                        }
                        DueTransition::ToFinished => {
                            state_machine
                                .transition_to_finished(&round, TransitionOptions::default())
                                .await
                        }
                    };

                    if let Err(err) = &result {
                        error!(
                            "Could not apply {transition:?} to round {}, will retry on the next tick: {err}",
                            round.id
                        );
                    }

                    result
                }
                .in_current_span(),
            );
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(true)) => match transition {
                    DueTransition::ToVoting => report.started_voting += 1,
                    DueTransition::ToFinished => report.finished += 1,
                },
                Ok(Ok(false)) => report.already_transitioned += 1,
                Ok(Err(_)) => report.failed += 1,
                Err(err) => {
                    warn!("Transition task did not complete: {err}");
                    report.failed += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use test_log::test;
    use time::Duration;

    use super::{TickReport, TransitionScheduler};
    use crate::{
        lifecycle::state_machine::{RoundStateMachine, TransitionOptions},
        models::{types::UtcDateTime, NotificationKind, Phase, UserId},
        repository::{
            testing::{create_league, create_round, create_submission, new_league, test_pool},
            RoundRepository, SubmissionRepository, VoteRepository,
        },
        side_effects::{testing::RecordingQueue, SideEffect},
    };

    struct Fixture {
        rounds: Arc<RoundRepository>,
        queue: Arc<RecordingQueue>,
        machine: Arc<RoundStateMachine>,
        scheduler: TransitionScheduler,
    }

    fn fixture(pool: &sqlx::SqlitePool) -> Fixture {
        let rounds = Arc::new(RoundRepository::new(pool.clone()));
        let queue = Arc::new(RecordingQueue::default());
        let machine = Arc::new(RoundStateMachine::new(rounds.clone(), queue.clone(), ""));
        let scheduler = TransitionScheduler::new(
            rounds.clone(),
            machine.clone(),
            super::DEFAULT_TICK_INTERVAL,
        );

        Fixture {
            rounds,
            queue,
            machine,
            scheduler,
        }
    }

    #[test(tokio::test)]
    async fn overdue_round_moves_to_voting_once() {
        let pool = test_pool().await;
        let f = fixture(&pool);
        let league = create_league(&pool, new_league()).await;
        let now = UtcDateTime::now();
        let round = create_round(&pool, league.id, now - Duration::minutes(1)).await;

        let report = f.scheduler.tick(now).await;
        assert_eq!(
            report,
            TickReport {
                started_voting: 1,
                ..TickReport::default()
            }
        );

        assert_eq!(f.scheduler.tick(now).await, TickReport::default());

        let round = f.rounds.get_round(round.id).await.unwrap().unwrap();
        assert_eq!(round.phase, Phase::Voting);

        let notifications: Vec<_> = f
            .queue
            .effects()
            .into_iter()
            .filter(|e| {
                matches!(e, SideEffect::Notify(n)
                    if n.kind == NotificationKind::RoundVoting && n.league_id == league.id)
            })
            .collect();
        assert_eq!(notifications.len(), 1);
    }

    #[test(tokio::test)]
    async fn rounds_before_their_deadline_are_left_alone() {
        let pool = test_pool().await;
        let f = fixture(&pool);
        let league = create_league(&pool, new_league()).await;
        let now = UtcDateTime::now();
        let round = create_round(&pool, league.id, now + Duration::minutes(1)).await;

        assert_eq!(f.scheduler.tick(now).await, TickReport::default());

        let round = f.rounds.get_round(round.id).await.unwrap().unwrap();
        assert_eq!(round.phase, Phase::Submissions);
        assert!(f.queue.effects().is_empty());
    }

    #[test(tokio::test)]
    async fn voting_round_past_deadline_is_settled() {
        let pool = test_pool().await;
        let f = fixture(&pool);
        let league = create_league(&pool, new_league()).await;
        let now = UtcDateTime::now();
        let round = create_round(&pool, league.id, now - Duration::days(3)).await;
        create_submission(&pool, &round, 1).await;

        // Both deadlines have passed, so one tick takes the round all the way to finished.
        let first = f.scheduler.tick(now).await;
        assert_eq!(first.started_voting, 1);
        assert_eq!(first.finished, 1);

        assert_eq!(f.scheduler.tick(now).await, TickReport::default());

        let round = f.rounds.get_round(round.id).await.unwrap().unwrap();
        assert_eq!(round.phase, Phase::Finished);

        let submissions = SubmissionRepository::new(pool.clone())
            .list_for_round(round.id)
            .await
            .unwrap();
        assert_eq!(submissions[0].points, Some(0));
        assert_eq!(submissions[0].rank, Some(1));
    }

    #[test(tokio::test)]
    async fn failing_round_does_not_hold_up_the_others() {
        let pool = test_pool().await;
        let f = fixture(&pool);
        let league = create_league(&pool, new_league()).await;
        let now = UtcDateTime::now();

        let broken = create_round(&pool, league.id, now - Duration::days(3)).await;
        let healthy = create_round(&pool, league.id, now - Duration::days(3)).await;
        let broken_submission = create_submission(&pool, &broken, 1).await;
        let healthy_submission = create_submission(&pool, &healthy, 2).await;

        for round in [&broken, &healthy] {
            f.rounds
                .compare_and_set_phase(round.id, Phase::Submissions, Phase::Voting)
                .await
                .unwrap();
        }

        // A vote filed under the broken round for another round's submission cannot be tallied.
        VoteRepository::new(pool.clone())
            .apply_vote(broken.id, UserId(3), healthy_submission.id, 1, |_, _| Ok(()))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            f.scheduler.tick(now).await,
            TickReport {
                finished: 1,
                failed: 1,
                ..TickReport::default()
            }
        );

        let broken_round = f.rounds.get_round(broken.id).await.unwrap().unwrap();
        assert_eq!(broken_round.phase, Phase::Voting);
        let healthy_round = f.rounds.get_round(healthy.id).await.unwrap().unwrap();
        assert_eq!(healthy_round.phase, Phase::Finished);

        let submissions = SubmissionRepository::new(pool.clone());
        let stored = submissions.get_submission(broken_submission.id).await.unwrap().unwrap();
        assert_eq!(stored.points, None);
        let stored = submissions.get_submission(healthy_submission.id).await.unwrap().unwrap();
        assert_eq!(stored.points, Some(0));

        // Still due, so the next tick tries again.
        assert_eq!(
            f.scheduler.tick(now).await,
            TickReport {
                failed: 1,
                ..TickReport::default()
            }
        );
    }

    #[test(tokio::test)]
    async fn manual_transition_before_tick_is_not_repeated() {
        let pool = test_pool().await;
        let f = fixture(&pool);
        let league = create_league(&pool, new_league()).await;
        let now = UtcDateTime::now();
        let round = create_round(&pool, league.id, now - Duration::minutes(1)).await;

        let due = f.rounds.get_rounds_due_for_voting(now).await.unwrap();
        assert_eq!(due.len(), 1);

        assert!(f
            .machine
            .transition_to_voting(&round, TransitionOptions::default())
            .await
            .unwrap());
        assert_eq!(f.scheduler.tick(now).await, TickReport::default());
        assert_eq!(f.queue.effects().len(), 1);
    }

    #[test(tokio::test)]
    async fn transition_and_tick_on_the_same_round_fire_once() {
        let pool = test_pool().await;
        let f = fixture(&pool);
        let league = create_league(&pool, new_league()).await;
        let now = UtcDateTime::now();
        let round = create_round(&pool, league.id, now - Duration::minutes(1)).await;

        let (a, b) = tokio::join!(
            f.machine
                .transition_to_voting(&round, TransitionOptions::default()),
            f.scheduler.tick(now),
        );

        let performed = a.unwrap() as usize + b.started_voting;
        assert_eq!(performed, 1);
        assert_eq!(f.queue.effects().len(), 1);
    }
}
