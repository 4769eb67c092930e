use tokio::sync::oneshot;

use crate::{
    actor::{Actor, ActorError},
    handler::{Handler, Letter, Message},
    mailbox::{Mailbox, WeakMailbox},
};

/// Handle to a running actor. The actor keeps running while any `ActorRef`
/// to it exists.
pub struct ActorRef<A: Actor> {
    mailbox: Mailbox<A>,
}

impl<A: Actor> Clone for ActorRef<A> {
    fn clone(&self) -> Self {
        Self {
            mailbox: self.mailbox.clone(),
        }
    }
}

impl<A: Actor> ActorRef<A> {
    pub(crate) fn new(mailbox: Mailbox<A>) -> Self {
        Self { mailbox }
    }

    /// A reference that does not keep the actor alive.
    pub fn downgrade(&self) -> WeakActorRef<A> {
        WeakActorRef {
            mailbox: self.mailbox.downgrade(),
        }
    }

    /// Queues `message` without waiting for it to be handled.
    pub async fn tell<M>(&self, message: M) -> Result<(), ActorError>
    where
        M: Message,
        A: Handler<M>,
    {
        self.mailbox
            .post(Letter::<M, A>::new(message, None))
            .await
            .map_err(|_| ActorError::Stopped)
    }

    /// Queues `message` and waits for the handler's response.
    pub async fn ask<M>(&self, message: M) -> Result<M::Response, ActorError>
    where
        M: Message,
        A: Handler<M>,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.mailbox
            .post(Letter::<M, A>::new(message, Some(reply_tx)))
            .await
            .map_err(|_| ActorError::Stopped)?;
        reply_rx.await.map_err(|_| ActorError::NoResponse)
    }
}

pub struct WeakActorRef<A: Actor> {
    mailbox: WeakMailbox<A>,
}

impl<A: Actor> Clone for WeakActorRef<A> {
    fn clone(&self) -> Self {
        Self {
            mailbox: self.mailbox.clone(),
        }
    }
}

impl<A: Actor> WeakActorRef<A> {
    /// `None` once every strong reference is gone.
    pub fn upgrade(&self) -> Option<ActorRef<A>> {
        self.mailbox.upgrade().map(ActorRef::new)
    }
}
