use tokio::sync::mpsc;

use crate::{handler::Envelope, Actor};

type Entry<A> = Box<dyn Envelope<A>>;

pub(crate) struct Mailbox<A: Actor>(mpsc::Sender<Entry<A>>);

impl<A: Actor> Clone for Mailbox<A> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<A: Actor> Mailbox<A> {
    /// Waits for space if the mailbox is full. Fails once the actor stopped.
    pub(crate) async fn post<E>(&self, envelope: E) -> Result<(), mpsc::error::SendError<Entry<A>>>
    where
        E: Envelope<A> + 'static,
    {
        self.0.send(Box::new(envelope)).await
    }

    pub(crate) fn downgrade(&self) -> WeakMailbox<A> {
        WeakMailbox(self.0.downgrade())
    }
}

/// Sending side that does not keep the mailbox open.
pub(crate) struct WeakMailbox<A: Actor>(mpsc::WeakSender<Entry<A>>);

impl<A: Actor> Clone for WeakMailbox<A> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<A: Actor> WeakMailbox<A> {
    pub(crate) fn upgrade(&self) -> Option<Mailbox<A>> {
        self.0.upgrade().map(Mailbox)
    }
}

pub(crate) struct Inbox<A: Actor>(mpsc::Receiver<Entry<A>>);

impl<A: Actor> Inbox<A> {
    pub(crate) async fn next(&mut self) -> Option<Entry<A>> {
        self.0.recv().await
    }
}

pub(crate) fn mailbox<A: Actor>(capacity: usize) -> (Mailbox<A>, Inbox<A>) {
    let (tx, rx) = mpsc::channel(capacity);
    (Mailbox(tx), Inbox(rx))
}
