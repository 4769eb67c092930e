use std::marker::PhantomData;

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::Actor;

/// A message an actor can handle. `Response` is what `ask` resolves to,
/// `tell` drops it.
pub trait Message: Send + 'static {
    type Response: Send + 'static;
}

#[async_trait]
pub trait Handler<M>: Actor
where
    M: Message,
{
    async fn handle(&mut self, message: M) -> M::Response;
}

/// Type-erased mailbox entry. Handled at most once.
#[async_trait]
pub trait Envelope<A: Actor>: Send {
    async fn deliver(&mut self, actor: &mut A);
}

pub(crate) struct Letter<M, A>
where
    M: Message,
{
    message: Option<M>,
    reply_to: Option<oneshot::Sender<M::Response>>,
    _recipient: PhantomData<fn(&mut A)>,
}

impl<M, A> Letter<M, A>
where
    M: Message,
{
    pub(crate) fn new(message: M, reply_to: Option<oneshot::Sender<M::Response>>) -> Self {
        Self {
            message: Some(message),
            reply_to,
            _recipient: PhantomData,
        }
    }
}

#[async_trait]
impl<M, A> Envelope<A> for Letter<M, A>
where
    M: Message,
    A: Handler<M>,
{
    async fn deliver(&mut self, actor: &mut A) {
        let Some(message) = self.message.take() else {
            return;
        };
        let response = actor.handle(message).await;

        if let Some(reply_to) = self.reply_to.take() {
            if reply_to.send(response).is_err() {
                log::debug!("{} answered after the caller gave up", A::name());
            }
        }
    }
}
