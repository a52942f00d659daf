use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, Instrument};

#[async_trait]
pub trait Actor: Send + 'static {
    type Message: Send + 'static;
    type Response: Send + 'static;

    async fn handle_message(&mut self, message: Self::Message) -> Self::Response;
}

#[derive(Debug, Error)]
#[error("The actor has stopped")]
pub struct ActorStopped;

#[derive(Debug, Error)]
pub enum TryTellError {
    #[error("The actor's mailbox is full")]
    Full,
    #[error(transparent)]
    Stopped(#[from] ActorStopped),
}

pub struct ActorHandle<T: Actor> {
    message_sender: mpsc::Sender<MessageWrap<T::Message, T::Response>>,
}

impl<T: Actor> Clone for ActorHandle<T> {
    fn clone(&self) -> Self {
        ActorHandle {
            message_sender: self.message_sender.clone(),
        }
    }
}

impl<T: Actor> ActorHandle<T> {
    /// Runs `actor` on its own task until every handle is dropped.
    pub fn spawn(mut actor: T, capacity: usize) -> ActorHandle<T> {
        let (message_sender, mut message_receiver) =
            mpsc::channel::<MessageWrap<T::Message, T::Response>>(capacity);

        tokio::spawn(
            async move {
                while let Some(MessageWrap {
                    message,
                    respond_to,
                }) = message_receiver.recv().await
                {
                    let response = actor.handle_message(message).await;
                    if let Some(respond_to) = respond_to {
                        let _ = respond_to.send(response); // The asker may have given up
                    }
                }

                debug!("All handles dropped, actor stopping");
            }
            .in_current_span(),
        );

        ActorHandle { message_sender }
    }

    /// Sends the message and waits for the actor's response.
    pub async fn ask(&self, message: T::Message) -> Result<T::Response, ActorStopped> {
        let (response_sender, response_receiver) = oneshot::channel();

        self.message_sender
            .send(MessageWrap {
                message,
                respond_to: Some(response_sender),
            })
            .await
            .map_err(|_| ActorStopped)?;

        response_receiver.await.map_err(|_| ActorStopped)
    }

    /// Queues the message without waiting, neither for it to be handled nor for mailbox room.
    pub fn try_tell(&self, message: T::Message) -> Result<(), TryTellError> {
        self.message_sender
            .try_send(MessageWrap {
                message,
                respond_to: None,
            })
            .map_err(|err| match err {
                mpsc::error::TrySendError::Full(_) => TryTellError::Full,
                mpsc::error::TrySendError::Closed(_) => TryTellError::Stopped(ActorStopped),
            })
    }
}

pub struct MessageWrap<M: Send, R: Send> {
    pub message: M,
    pub respond_to: Option<oneshot::Sender<R>>,
}
