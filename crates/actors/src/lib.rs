//! A small supervised actor runtime on top of tokio tasks.
//!
//! Each actor owns its state and handles one message at a time from a bounded
//! mailbox. Callers hold [`ActorRef`]s and either `tell` (fire and forget) or
//! `ask` (await the handler's response).

use std::panic::AssertUnwindSafe;

use actor::{panic_message, Actor, SupervisionStrategy};
use actor_ref::ActorRef;
use futures::FutureExt;
use mailbox::mailbox;

pub mod actor;
pub mod actor_ref;
pub mod handler;
mod mailbox;

const MAILBOX_CAPACITY: usize = 32;

/// Creates and runs an actor. If a handler panics, the actor is restarted,
/// resumed or stopped according to `Actor::on_fail()`.
pub fn run<A, F>(actor_factory: F) -> ActorRef<A>
where
    A: Actor,
    F: 'static + Send + Fn() -> A,
{
    let (tx, mut inbox) = mailbox(MAILBOX_CAPACITY);
    let actor_ref = ActorRef::new(tx);
    let mut actor = actor_factory();
    actor.started(actor_ref.clone());
    // the actor only holds what `started` kept, usually a weak reference,
    // so the loop ends once all callers dropped their refs.
    let weak_ref = actor_ref.downgrade();

    tokio::spawn(async move {
        while let Some(mut envelope) = inbox.next().await {
            let result = AssertUnwindSafe(envelope.deliver(&mut actor))
                .catch_unwind()
                .await;
            let Err(why) = result else {
                continue;
            };
            log::error!("{} panicked: {}", A::name(), panic_message(why.as_ref()));
            match actor.on_fail(why) {
                SupervisionStrategy::Restart => {
                    log::warn!("restarting {}", A::name());
                    actor = actor_factory();
                    if let Some(me) = weak_ref.upgrade() {
                        actor.started(me);
                    }
                }
                SupervisionStrategy::Resume => {}
                SupervisionStrategy::Stop => {
                    log::warn!("stopping {}", A::name());
                    break;
                }
            }
        }
        log::debug!("{} stopped", A::name());
    });

    actor_ref
}

#[cfg(test)]
mod tests {
    use std::any::Any;

    use async_trait::async_trait;

    use super::*;
    use crate::{
        actor::ActorError,
        actor_ref::WeakActorRef,
        handler::{Handler, Message},
    };

    #[derive(Default)]
    struct Counter {
        count: i64,
        me: Option<WeakActorRef<Counter>>,
    }

    impl Actor for Counter {
        fn started(&mut self, me: ActorRef<Self>) {
            self.me = Some(me.downgrade());
        }

        fn on_fail(&mut self, _: Box<dyn Any + Send>) -> SupervisionStrategy {
            SupervisionStrategy::Resume
        }
    }

    struct Add(i64);

    impl Message for Add {
        type Response = ();
    }

    struct Get;

    impl Message for Get {
        type Response = i64;
    }

    struct Explode;

    impl Message for Explode {
        type Response = ();
    }

    /// Schedules an `Add` to itself through the weak self reference.
    struct AddLater(i64);

    impl Message for AddLater {
        type Response = ();
    }

    #[async_trait]
    impl Handler<Add> for Counter {
        async fn handle(&mut self, message: Add) {
            self.count += message.0;
        }
    }

    #[async_trait]
    impl Handler<Get> for Counter {
        async fn handle(&mut self, _: Get) -> i64 {
            self.count
        }
    }

    #[async_trait]
    impl Handler<Explode> for Counter {
        async fn handle(&mut self, _: Explode) {
            panic!("boom");
        }
    }

    #[async_trait]
    impl Handler<AddLater> for Counter {
        async fn handle(&mut self, message: AddLater) {
            let me = self.me.clone();
            tokio::spawn(async move {
                if let Some(me) = me.and_then(|me| me.upgrade()) {
                    let _ = me.tell(Add(message.0)).await;
                }
            });
        }
    }

    #[tokio::test]
    async fn handles_messages_in_order() {
        let counter = run(Counter::default);
        counter.tell(Add(1)).await.unwrap();
        counter.tell(Add(5)).await.unwrap();
        counter.tell(Add(-2)).await.unwrap();
        assert_eq!(counter.ask(Get).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn resumes_after_a_panic() {
        let counter = run(Counter::default);
        counter.tell(Add(3)).await.unwrap();
        assert_eq!(counter.ask(Explode).await, Err(ActorError::NoResponse));
        assert_eq!(counter.ask(Get).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn actor_can_message_itself() {
        let counter = run(Counter::default);
        counter.tell(AddLater(7)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(counter.ask(Get).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn weak_ref_does_not_outlive_the_actor() {
        let counter = run(Counter::default);
        let weak = counter.downgrade();
        assert!(weak.upgrade().is_some());
        drop(counter);
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(weak.upgrade().is_none());
    }
}
