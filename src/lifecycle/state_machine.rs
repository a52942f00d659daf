//! Legal round transitions and the work each one leaves behind.
//!
//! Every transition is a compare-and-set on the stored phase. Losing the race (or running a
//! second time) yields `Ok(false)` and no side effects, so the scheduler and admins can call
//! these freely. Side effects are only queued once the new phase is committed.

use std::sync::Arc;

use indoc::formatdoc;
use tracing::{debug, info};

use crate::{
    models::{NewNotification, NotificationKind, Phase, Round, UserId},
    repository::RoundRepository,
    side_effects::{dispatch, SideEffect, SideEffectQueue},
    utils::formatting::format_utc,
};

/// Who asked for a transition and what to tell the league.
#[derive(Clone, Debug, Default)]
pub struct TransitionOptions {
    pub triggered_by: Option<UserId>,
    /// Replaces the default notification text.
    pub message: Option<String>,
}

pub struct RoundStateMachine {
    round_repository: Arc<RoundRepository>,
    side_effects: Arc<dyn SideEffectQueue>,
    base_path: String,
}

impl RoundStateMachine {
    pub fn new(
        round_repository: Arc<RoundRepository>,
        side_effects: Arc<dyn SideEffectQueue>,
        base_path: impl Into<String>,
    ) -> RoundStateMachine {
        RoundStateMachine {
            round_repository,
            side_effects,
            base_path: base_path.into(),
        }
    }

    /// `submissions -> voting`. Returns whether this call performed the transition.
    #[tracing::instrument(skip(self, round), fields(round = %round.id))]
    pub async fn transition_to_voting(
        &self,
        round: &Round,
        options: TransitionOptions,
    ) -> Result<bool, anyhow::Error> {
        let transitioned = self
            .round_repository
            .compare_and_set_phase(round.id, Phase::Submissions, Phase::Voting)
            .await?;

        if !transitioned {
            debug!("Round {} is no longer collecting submissions", round.id);
            return Ok(false);
        }

        info!("Round {} ({}) is now in voting", round.id, round.title);

        let message = options.message.unwrap_or_else(|| {
            formatdoc! {
                r#"
                    Voting has started for {title}!
                    Listen to the submissions and cast your votes before {deadline} UTC.
                "#,
                title = round.title,
                deadline = format_utc(round.voting_deadline),
            }
            .trim_end()
            .to_string()
        });

        dispatch(
            self.side_effects.as_ref(),
            SideEffect::Notify(NewNotification {
                league_id: round.league_id,
                kind: NotificationKind::RoundVoting,
                message,
                link: self.round_link(round),
                triggered_by: options.triggered_by,
            }),
        )
        .await;

        Ok(true)
    }

    /// `voting -> finished`, settling the tally together with the phase change.
    /// Returns whether this call performed the transition.
    #[tracing::instrument(skip(self, round), fields(round = %round.id))]
    pub async fn transition_to_finished(
        &self,
        round: &Round,
        options: TransitionOptions,
    ) -> Result<bool, anyhow::Error> {
        let Some(tally) = self.round_repository.finish_and_settle(round.id).await? else {
            debug!("Round {} is no longer in voting", round.id);
            return Ok(false);
        };

        info!(
            "Round {} ({}) finished, winner: {:?}",
            round.id,
            round.title,
            tally.winner().map(|score| score.submission_id)
        );

        dispatch(
            self.side_effects.as_ref(),
            SideEffect::RecomputeStandings(round.league_id),
        )
        .await;

        let message = options.message.unwrap_or_else(|| {
            formatdoc! {
                r#"
                    {title} has finished!
                    The results are in, come see how everyone placed.
                "#,
                title = round.title,
            }
            .trim_end()
            .to_string()
        });

        dispatch(
            self.side_effects.as_ref(),
            SideEffect::Notify(NewNotification {
                league_id: round.league_id,
                kind: NotificationKind::RoundFinished,
                message,
                link: self.round_link(round),
                triggered_by: options.triggered_by,
            }),
        )
        .await;

        Ok(true)
    }

    fn round_link(&self, round: &Round) -> String {
        format!(
            "{}/leagues/{}/rounds/{}",
            self.base_path, round.league_id, round.id
        )
    }
}
