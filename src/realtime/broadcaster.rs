use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use futures::{future::ready, Stream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};

use super::TodoEvent;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastStats {
    pub published: u64,
    /// Events lost by subscribers that lagged behind the buffer
    pub dropped: u64,
    pub subscribers: usize,
}

#[derive(Debug, Default)]
struct Counters {
    published: AtomicU64,
    dropped: AtomicU64,
}

/// Fire-and-forget fan-out of committed todo mutations
#[derive(Clone)]
pub struct Broadcaster {
    sender: broadcast::Sender<Arc<TodoEvent>>,
    counters: Arc<Counters>,
}

impl Broadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));

        Self {
            sender,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Publishes to whoever is subscribed right now. Never blocks and never
    /// fails; returns how many subscribers the event was queued for.
    pub fn publish(&self, event: TodoEvent) -> usize {
        self.counters.published.fetch_add(1, Ordering::Relaxed);

        let name = event.wire_name();
        let todo_id = event.todo_id();

        match self.sender.send(Arc::new(event)) {
            Ok(receivers) => {
                log::debug!("Broadcast {} for {} to {} subscribers", name, todo_id, receivers);
                receivers
            }
            Err(_) => {
                log::debug!("Broadcast {} for {} with no subscribers", name, todo_id);
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<TodoEvent>> {
        self.sender.subscribe()
    }

    /// Events for one user, filtered by the visibility rule. Lagging is
    /// counted and skipped rather than ending the stream.
    pub fn scoped_stream(&self, user_id: uuid::Uuid) -> impl Stream<Item = Arc<TodoEvent>> {
        let counters = self.counters.clone();

        BroadcastStream::new(self.subscribe()).filter_map(move |received| {
            let event = match received {
                Ok(event) if event.is_visible_to(user_id) => Some(event),
                Ok(_) => None,
                Err(BroadcastStreamRecvError::Lagged(missed)) => {
                    log::warn!("Subscriber {} lagged, dropped {} events", user_id, missed);
                    counters.dropped.fetch_add(missed, Ordering::Relaxed);
                    None
                }
            };

            ready(event)
        })
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn stats(&self) -> BroadcastStats {
        BroadcastStats {
            published: self.counters.published.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            subscribers: self.subscriber_count(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::models::{
        todo_model::{Priority, Todo},
        user_model::SlimUser,
    };

    fn user(name: &str) -> SlimUser {
        SlimUser {
            id: uuid::Uuid::new_v4(),
            name: name.into(),
            email: format!("{}@example.com", name),
        }
    }

    #[test]
    fn test_publish_without_subscribers_is_fine() {
        let broadcaster = Broadcaster::new(8);
        let todo = Todo::new_for(&user("ann"), "Deploy".into(), Priority::Normal, true, None);

        assert_eq!(broadcaster.publish(TodoEvent::Created(todo)), 0);
        assert_eq!(broadcaster.stats().published, 1);
    }

    #[test]
    fn test_every_subscriber_gets_the_event() {
        let broadcaster = Broadcaster::new(8);
        let mut first = broadcaster.subscribe();
        let mut second = broadcaster.subscribe();

        let todo = Todo::new_for(&user("ann"), "Deploy".into(), Priority::Normal, true, None);
        assert_eq!(broadcaster.publish(TodoEvent::Created(todo.clone())), 2);

        assert_eq!(*first.try_recv().unwrap(), TodoEvent::Created(todo.clone()));
        assert_eq!(*second.try_recv().unwrap(), TodoEvent::Created(todo));
    }

    #[actix_web::test]
    async fn test_scoped_stream_hides_personal_todos_of_others() {
        let broadcaster = Broadcaster::new(8);
        let ann = user("ann");
        let bob = user("bob");

        let mut bob_events = Box::pin(broadcaster.scoped_stream(bob.id));

        let personal = Todo::new_for(&ann, "Buy milk".into(), Priority::Normal, false, None);
        let team = Todo::new_for(&ann, "Deploy".into(), Priority::Normal, true, None);

        broadcaster.publish(TodoEvent::Created(personal.clone()));
        broadcaster.publish(TodoEvent::deleted(&personal));
        broadcaster.publish(TodoEvent::Created(team.clone()));

        let first = bob_events.next().await.unwrap();
        assert_eq!(*first, TodoEvent::Created(team));
    }

    #[actix_web::test]
    async fn test_lagging_subscriber_skips_lost_events() {
        let broadcaster = Broadcaster::new(2);
        let ann = user("ann");
        let mut events = Box::pin(broadcaster.scoped_stream(ann.id));

        let todos: Vec<Todo> = (0..4)
            .map(|i| Todo::new_for(&ann, format!("todo {}", i), Priority::Normal, false, None))
            .collect();
        for todo in &todos {
            broadcaster.publish(TodoEvent::Created(todo.clone()));
        }

        let next = events.next().await.unwrap();
        assert_eq!(*next, TodoEvent::Created(todos[2].clone()));
        assert_eq!(broadcaster.stats().dropped, 2);
    }
}
