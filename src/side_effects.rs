//! Work queued after a round transition has been committed.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
    actors::{Actor, ActorHandle, ActorStopped, TryTellError},
    models::{types::UtcDateTime, LeagueId, NewNotification},
    repository::{NotificationRepository, StandingsRepository},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SideEffect {
    Notify(NewNotification),
    RecomputeStandings(LeagueId),
}

#[derive(Debug, Error)]
pub enum SideEffectDispatchError {
    #[error("Side effect worker is not running")]
    WorkerStopped(#[from] ActorStopped),
    #[error("Side effect queue is full")]
    QueueFull,
}

impl From<TryTellError> for SideEffectDispatchError {
    fn from(value: TryTellError) -> Self {
        match value {
            TryTellError::Full => SideEffectDispatchError::QueueFull,
            TryTellError::Stopped(stopped) => SideEffectDispatchError::WorkerStopped(stopped),
        }
    }
}

/// Where transitions put their follow-up work. Implementations must neither run the work
/// inline nor wait for queue room.
#[async_trait]
pub trait SideEffectQueue: Send + Sync {
    async fn enqueue(&self, effect: SideEffect) -> Result<(), SideEffectDispatchError>;
}

/// Enqueues and logs failures instead of returning them: once the phase change is committed
/// a lost side effect must not turn the transition into an error.
pub async fn dispatch(queue: &dyn SideEffectQueue, effect: SideEffect) {
    let description = format!("{effect:?}");
    if let Err(err) = queue.enqueue(effect).await {
        warn!("Could not dispatch side effect {description}: {err}");
    }
}

pub struct SideEffectWorker {
    notification_repository: NotificationRepository,
    standings_repository: StandingsRepository,
}

impl SideEffectWorker {
    pub fn new(
        notification_repository: NotificationRepository,
        standings_repository: StandingsRepository,
    ) -> SideEffectWorker {
        SideEffectWorker {
            notification_repository,
            standings_repository,
        }
    }

    pub fn start(self, capacity: usize) -> ActorHandle<SideEffectWorker> {
        ActorHandle::spawn(self, capacity)
    }
}

#[async_trait]
impl Actor for SideEffectWorker {
    type Message = SideEffect;
    type Response = bool;

    #[tracing::instrument(skip(self))]
    async fn handle_message(&mut self, message: SideEffect) -> bool {
        match message {
            SideEffect::Notify(notification) => {
                match self
                    .notification_repository
                    .enqueue(&notification, UtcDateTime::now())
                    .await
                {
                    Ok(stored) => {
                        info!(
                            "Queued {} notification {:?} for league {}",
                            stored.kind.as_ref(),
                            stored.id,
                            stored.league_id
                        );
                        true
                    }
                    Err(err) => {
                        error!("Could not store notification: {err}");
                        false
                    }
                }
            }

            SideEffect::RecomputeStandings(league_id) => {
                match self.standings_repository.recompute(league_id).await {
                    Ok(()) => true,
                    Err(err) => {
                        error!("Could not recompute standings of league {league_id}: {err}");
                        false
                    }
                }
            }
        }
    }
}

#[async_trait]
impl SideEffectQueue for ActorHandle<SideEffectWorker> {
    async fn enqueue(&self, effect: SideEffect) -> Result<(), SideEffectDispatchError> {
        Ok(self.try_tell(effect)?)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::{SideEffect, SideEffectDispatchError, SideEffectQueue};

    /// Keeps everything it is given so tests can look at it.
    #[derive(Default)]
    pub struct RecordingQueue {
        effects: Mutex<Vec<SideEffect>>,
    }

    impl RecordingQueue {
        pub fn effects(&self) -> Vec<SideEffect> {
            self.effects.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SideEffectQueue for RecordingQueue {
        async fn enqueue(&self, effect: SideEffect) -> Result<(), SideEffectDispatchError> {
            self.effects.lock().unwrap().push(effect);
            Ok(())
        }
    }

    /// Behaves like a queue whose worker has died.
    pub struct BrokenQueue;

    #[async_trait]
    impl SideEffectQueue for BrokenQueue {
        async fn enqueue(&self, _effect: SideEffect) -> Result<(), SideEffectDispatchError> {
            Err(crate::actors::ActorStopped.into())
        }
    }
}
