use std::{any::Any, error::Error, fmt};

use crate::actor_ref::ActorRef;

/// What the runtime does with an actor whose handler panicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisionStrategy {
    /// Replace the actor with a fresh one from its factory.
    Restart,
    /// Keep the actor and its state, continue with the next message.
    Resume,
    /// Stop handling messages. Pending and future requests fail.
    Stop,
}

pub trait Actor: Send + 'static {
    /// Used in log lines.
    fn name() -> &'static str
    where
        Self: Sized,
    {
        std::any::type_name::<Self>()
    }

    /// Called once before the first message is handled, and again after each
    /// restart. Actors that message themselves from spawned tasks keep a
    /// downgraded copy of `me`.
    #[allow(unused_variables)]
    fn started(&mut self, me: ActorRef<Self>)
    where
        Self: Sized,
    {
    }

    /// Called when a handler panics.
    /// NOTE: If this method panics, the actor can not recover from the panic.
    #[allow(unused_variables)]
    fn on_fail(&mut self, error: Box<dyn Any + Send>) -> SupervisionStrategy {
        SupervisionStrategy::Restart
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorError {
    /// The mailbox is closed.
    Stopped,
    /// The message was accepted but no answer came back, usually because the
    /// handler panicked.
    NoResponse,
}

impl fmt::Display for ActorError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "actor is not running"),
            Self::NoResponse => write!(f, "actor dropped the request"),
        }
    }
}

impl Error for ActorError {}

/// Panic payloads are `&str` or `String` in practice.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic payload>")
}
