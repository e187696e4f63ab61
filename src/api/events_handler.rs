//! Server-sent events endpoint for live todo updates.

use std::time::Duration;

use actix_web::{
    http::header::{CACHE_CONTROL, CONTENT_TYPE},
    web::{self, Bytes},
    HttpResponse,
};
use futures::{future::ready, stream, StreamExt};
use tokio_stream::wrappers::IntervalStream;

use super::middlewares::auth::Authenticated;
use crate::realtime::{Broadcaster, TodoEvent};

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Lives as long as one client's stream; reports delivery totals when it goes
struct Subscription {
    user_id: uuid::Uuid,
    broadcaster: Broadcaster,
}

impl Subscription {
    fn frame(&self, event: &TodoEvent) -> Option<Bytes> {
        match event.to_sse_frame() {
            Ok(frame) => Some(Bytes::from(frame)),
            Err(e) => {
                log::warn!(
                    "Failed to serialize {} for {}: {}",
                    event.wire_name(),
                    self.user_id,
                    e
                );
                None
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let stats = self.broadcaster.stats();

        log::info!(
            "Event subscriber {} disconnected; {} events published, {} lost to lagging subscribers, {} subscribers left",
            self.user_id,
            stats.published,
            stats.dropped,
            stats.subscribers
        );
    }
}

/// Streams every mutation the caller is allowed to see. No replay: events
/// published before the connection opened are not sent.
pub async fn stream_events(
    auth: Authenticated,
    broadcaster: web::Data<Broadcaster>,
) -> HttpResponse {
    let user_id = auth.id;

    log::info!(
        "Event subscriber {} connected ({} total)",
        user_id,
        broadcaster.subscriber_count() + 1
    );

    let subscription = Subscription {
        user_id,
        broadcaster: broadcaster.get_ref().clone(),
    };

    let events = broadcaster
        .scoped_stream(user_id)
        .filter_map(move |event| {
            ready(subscription.frame(&event).map(Ok::<_, actix_web::Error>))
        });

    let keep_alive = IntervalStream::new(tokio::time::interval(KEEP_ALIVE_INTERVAL))
        .map(|_| Ok::<_, actix_web::Error>(Bytes::from_static(b": keep-alive\n\n")));

    HttpResponse::Ok()
        .insert_header((CONTENT_TYPE, "text/event-stream"))
        .insert_header((CACHE_CONTROL, "no-cache"))
        .streaming(stream::select(events, keep_alive))
}
