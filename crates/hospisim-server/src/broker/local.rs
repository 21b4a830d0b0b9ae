use std::sync::Arc;

use futures_util::StreamExt;
use hospisim_core::events::EventBroadcaster;
use tokio::sync::mpsc;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::warn;

use super::InboundMessage;

/// Feeds events from an in-process broadcaster into the engine's channel.
///
/// Subscribes before returning, so events sent after this call are not missed. The
/// spawned task ends when the broadcaster is dropped or the receiver is closed.
pub fn forward_broadcast(
    broadcaster: &Arc<EventBroadcaster>,
    tx: mpsc::Sender<InboundMessage>,
) -> tokio::task::JoinHandle<()> {
    let mut events = BroadcastStream::new(broadcaster.subscribe());
    tokio::spawn(async move {
        while let Some(next) = events.next().await {
            let event = match next {
                Ok(event) => event,
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(skipped, "in-process event consumer lagged, events dropped");
                    continue;
                }
            };
            let payload = match serde_json::to_string(&event.envelope) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(topic = %event.topic, error = %e, "failed to encode event");
                    continue;
                }
            };
            let message = InboundMessage {
                routing_key: event.topic.as_str().to_string(),
                payload,
            };
            if tx.send(message).await.is_err() {
                break;
            }
        }
    })
}
