use std::{
    io::{BufRead, BufReader},
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, Sender, TryRecvError},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use crate::models::todo_model::Todo;

use super::{ApiClient, RemoteEvent, SseDecoder, SyncSession};

const RECONNECT_DELAY: Duration = Duration::from_secs(3);
const POLL_STEP: Duration = Duration::from_millis(200);

/// What the background threads hand to the UI thread
#[derive(Debug)]
pub enum SyncMessage {
    Snapshot(Vec<Todo>),
    Event(RemoteEvent),
    /// Something the user should hear about; the threads keep going
    Notice(String),
}

#[derive(Debug, Default, PartialEq)]
pub struct DrainOutcome {
    pub changed: bool,
    pub notices: Vec<String>,
}

/// Keeps a session fed: one thread refreshes everything on a fixed period,
/// another listens to the event stream and reconnects when it drops.
pub struct Watcher {
    receiver: Receiver<SyncMessage>,
    running: Arc<AtomicBool>,
}

impl Watcher {
    pub fn spawn(client: ApiClient, refresh_every: Duration) -> Self {
        let (sender, receiver) = mpsc::channel();
        let running = Arc::new(AtomicBool::new(true));

        {
            let client = client.clone();
            let sender = sender.clone();
            let running = running.clone();
            thread::spawn(move || refresh_loop(client, sender, running, refresh_every));
        }

        {
            let running = running.clone();
            thread::spawn(move || stream_loop(client, sender, running));
        }

        Self { receiver, running }
    }

    /// Applies everything queued so far to `session`, without blocking
    pub fn drain_into(&self, session: &mut SyncSession) -> DrainOutcome {
        let mut outcome = DrainOutcome::default();

        loop {
            match self.receiver.try_recv() {
                Ok(SyncMessage::Snapshot(todos)) => {
                    session.replace_all(todos);
                    outcome.changed = true;
                }
                Ok(SyncMessage::Event(event)) => {
                    outcome.changed |= session.apply(event);
                }
                Ok(SyncMessage::Notice(notice)) => outcome.notices.push(notice),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }

        outcome
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Sleeps up to `total`, waking early once `running` is cleared
fn sleep_while_running(running: &AtomicBool, total: Duration) {
    let deadline = Instant::now() + total;

    while running.load(Ordering::Relaxed) && Instant::now() < deadline {
        thread::sleep(POLL_STEP.min(deadline.saturating_duration_since(Instant::now())));
    }
}

fn refresh_loop(
    client: ApiClient,
    sender: Sender<SyncMessage>,
    running: Arc<AtomicBool>,
    refresh_every: Duration,
) {
    while running.load(Ordering::Relaxed) {
        let message = match client.list_todos() {
            Ok(todos) => SyncMessage::Snapshot(todos),
            Err(e) => {
                log::warn!("Full refresh failed: {}", e);
                SyncMessage::Notice(format!("Refresh failed: {}", e))
            }
        };

        if sender.send(message).is_err() {
            break;
        }

        sleep_while_running(&running, refresh_every);
    }

    log::debug!("Refresh thread stopped");
}

fn stream_loop(client: ApiClient, sender: Sender<SyncMessage>, running: Arc<AtomicBool>) {
    while running.load(Ordering::Relaxed) {
        match client.open_event_stream() {
            Ok(response) => {
                log::debug!("Event stream connected");

                if !forward_events(BufReader::new(response), &sender, &running) {
                    break;
                }

                if sender
                    .send(SyncMessage::Notice("Live updates disconnected, reconnecting".into()))
                    .is_err()
                {
                    break;
                }
            }
            Err(e) => {
                log::warn!("Could not open event stream: {}", e);

                if sender
                    .send(SyncMessage::Notice(format!("Live updates unavailable: {}", e)))
                    .is_err()
                {
                    break;
                }
            }
        }

        sleep_while_running(&running, RECONNECT_DELAY);
    }

    log::debug!("Event stream thread stopped");
}

/// Pumps frames from the stream into `sender` until it ends. Returns `false`
/// once nobody listens any more.
fn forward_events<R: BufRead>(
    reader: R,
    sender: &Sender<SyncMessage>,
    running: &AtomicBool,
) -> bool {
    let mut decoder = SseDecoder::new();

    for line in reader.lines() {
        if !running.load(Ordering::Relaxed) {
            return false;
        }

        let line = match line {
            Ok(line) => line,
            Err(e) => {
                log::debug!("Event stream read failed: {}", e);
                return true;
            }
        };

        let frame = match decoder.push_line(&line) {
            Some(frame) => frame,
            None => continue,
        };

        match RemoteEvent::from_frame(&frame) {
            Ok(Some(event)) => {
                if sender.send(SyncMessage::Event(event)).is_err() {
                    return false;
                }
            }
            Ok(None) => log::debug!("Skipping unknown event {}", frame.event),
            Err(e) => log::warn!("Malformed {} event: {}", frame.event, e),
        }
    }

    true
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use super::*;
    use crate::{
        models::{todo_model::Priority, user_model::SlimUser},
        realtime::TodoEvent,
    };

    fn user(name: &str) -> SlimUser {
        SlimUser {
            id: uuid::Uuid::new_v4(),
            name: name.into(),
            email: format!("{}@example.com", name),
        }
    }

    fn watcher_with_channel() -> (Watcher, Sender<SyncMessage>) {
        let (sender, receiver) = mpsc::channel();
        let watcher = Watcher {
            receiver,
            running: Arc::new(AtomicBool::new(true)),
        };
        (watcher, sender)
    }

    #[test]
    fn test_drain_applies_snapshots_then_events() {
        let ann = user("ann");
        let (watcher, sender) = watcher_with_channel();
        let mut session = SyncSession::start(ann.clone());

        let milk = Todo::new_for(&ann, "Buy milk".into(), Priority::Normal, false, None);
        let deploy = Todo::new_for(&ann, "Deploy".into(), Priority::High, true, None);

        sender.send(SyncMessage::Snapshot(vec![milk.clone()])).unwrap();
        sender
            .send(SyncMessage::Event(RemoteEvent::Created(deploy.clone())))
            .unwrap();
        sender
            .send(SyncMessage::Event(RemoteEvent::Deleted(milk.id)))
            .unwrap();
        sender.send(SyncMessage::Notice("hello".into())).unwrap();

        let outcome = watcher.drain_into(&mut session);

        assert!(outcome.changed);
        assert_eq!(outcome.notices, vec!["hello".to_string()]);
        assert_eq!(session.todos(), &[deploy]);

        assert_eq!(watcher.drain_into(&mut session), DrainOutcome::default());
    }

    #[test]
    fn test_forward_events_decodes_stream() {
        let ann = user("ann");
        let deploy = Todo::new_for(&ann, "Deploy".into(), Priority::Normal, true, None);

        let body = format!(
            ": keep-alive\n\n{}{}event: somethingElse\ndata: {{}}\n\n",
            TodoEvent::Created(deploy.clone()).to_sse_frame().unwrap(),
            TodoEvent::deleted(&deploy).to_sse_frame().unwrap(),
        );

        let (sender, receiver) = mpsc::channel();
        let running = AtomicBool::new(true);

        assert!(forward_events(Cursor::new(body), &sender, &running));

        let received: Vec<SyncMessage> = receiver.try_iter().collect();
        assert_eq!(received.len(), 2);
        assert!(matches!(&received[0], SyncMessage::Event(RemoteEvent::Created(t)) if *t == deploy));
        assert!(matches!(received[1], SyncMessage::Event(RemoteEvent::Deleted(id)) if id == deploy.id));
    }

    #[test]
    fn test_sleep_returns_early_when_stopped() {
        let running = AtomicBool::new(false);
        let started = Instant::now();

        sleep_while_running(&running, Duration::from_secs(5));

        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
