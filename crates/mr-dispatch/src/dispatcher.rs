use crate::handler::CommandHandler;
use mr_broker::Broker;
use mr_proto::command::CommandName;
use mr_proto::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// How long `pop` blocks per iteration of the queue loop. Required so
/// `STOP_PROCESSING_QUEUE` is noticed without an external interrupt.
const QUEUE_POLL_TIMEOUT: Duration = Duration::from_secs(1);

struct Inner<H: CommandHandler> {
    broker: Broker,
    queue_name: String,
    channel_names: Vec<String>,
    handler: H,
    keep_processing_queue: AtomicBool,
    keep_processing_channels: AtomicBool,
}

/// One node's command dispatcher: a queue consumer and a channel
/// subscriber, each its own tokio task, sharing one handler and one pair
/// of shutdown flags.
pub struct Dispatcher<H: CommandHandler> {
    inner: Arc<Inner<H>>,
}

impl<H: CommandHandler + 'static> Dispatcher<H> {
    pub fn new(
        broker: Broker,
        queue_name: impl Into<String>,
        channel_names: Vec<String>,
        handler: H,
    ) -> Self {
        Dispatcher {
            inner: Arc::new(Inner {
                broker,
                queue_name: queue_name.into(),
                channel_names,
                handler,
                keep_processing_queue: AtomicBool::new(true),
                keep_processing_channels: AtomicBool::new(true),
            }),
        }
    }

    pub fn stop_processing_queue(&self) {
        self.inner.keep_processing_queue.store(false, Ordering::SeqCst);
    }

    pub fn stop_processing_channels(&self) {
        self.inner.keep_processing_channels.store(false, Ordering::SeqCst);
    }

    /// Start both loops as independent tasks. The caller keeps the
    /// returned handles to await a clean shutdown.
    pub fn run(&self) -> DispatcherHandles {
        let queue_inner = self.inner.clone();
        let channel_inner = self.inner.clone();
        DispatcherHandles {
            queue_task: tokio::spawn(run_queue_loop(queue_inner)),
            channel_task: tokio::spawn(run_channel_loop(channel_inner)),
        }
    }
}

/// Join handles for a running dispatcher's two loops.
pub struct DispatcherHandles {
    queue_task: JoinHandle<()>,
    channel_task: JoinHandle<()>,
}

impl DispatcherHandles {
    /// Wait for both loops to exit. Panics from either loop propagate.
    pub async fn join(self) {
        let (queue_result, channel_result) = tokio::join!(self.queue_task, self.channel_task);
        queue_result.expect("queue loop task panicked");
        channel_result.expect("channel loop task panicked");
    }
}

async fn run_queue_loop<H: CommandHandler>(inner: Arc<Inner<H>>) {
    while inner.keep_processing_queue.load(Ordering::SeqCst) {
        match inner.broker.pop(&inner.queue_name, QUEUE_POLL_TIMEOUT).await {
            Ok(Some(command)) => {
                dispatch_command(
                    &inner.handler,
                    &inner.keep_processing_queue,
                    &inner.keep_processing_channels,
                    &command,
                )
                .await
            }
            Ok(None) => continue,
            Err(err) => {
                tracing::warn!(%err, queue = %inner.queue_name, "broker pop failed, retrying");
            }
        }
    }
}

async fn run_channel_loop<H: CommandHandler>(inner: Arc<Inner<H>>) {
    let mut subscription = match inner.broker.subscribe(&inner.channel_names).await {
        Ok(subscription) => subscription,
        Err(err) => {
            tracing::error!(%err, "failed to subscribe to channels; channel loop exiting");
            return;
        }
    };

    while inner.keep_processing_channels.load(Ordering::SeqCst) {
        match subscription.next().await {
            Ok(Some(command)) => {
                dispatch_command(
                    &inner.handler,
                    &inner.keep_processing_queue,
                    &inner.keep_processing_channels,
                    &command,
                )
                .await
            }
            Ok(None) => break,
            Err(err) => tracing::warn!(%err, "channel listen failed, retrying"),
        }
    }
}

/// Route one decoded command: the handler's table first, then the
/// built-in shutdown table. Both run if both match. Takes its
/// dependencies individually, rather than a whole `Inner`, so it can be
/// unit-tested without a live broker connection.
async fn dispatch_command<H: CommandHandler>(
    handler: &H,
    keep_processing_queue: &AtomicBool,
    keep_processing_channels: &AtomicBool,
    command: &Command,
) {
    let name = command.command.as_str();
    let handled = handler.handles(name);
    if handled {
        handler.handle(command).await;
    }

    match CommandName::parse(name) {
        Some(CommandName::StopProcessingQueue) => {
            keep_processing_queue.store(false, Ordering::SeqCst);
        }
        Some(CommandName::StopProcessingChannels) => {
            keep_processing_channels.store(false, Ordering::SeqCst);
        }
        _ => {
            if !handled {
                tracing::warn!(command = name, "unrecognized command, dropping");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc as StdArc;

    struct RecordingHandler {
        known: Vec<&'static str>,
        calls: StdArc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl CommandHandler for RecordingHandler {
        fn handles(&self, name: &str) -> bool {
            self.known.contains(&name)
        }

        async fn handle(&self, command: &Command) {
            self.calls.lock().push(command.command.clone());
        }
    }

    #[test]
    fn both_handler_and_builtin_fire_for_shared_command_names() {
        let calls = StdArc::new(Mutex::new(Vec::new()));
        let handler = RecordingHandler {
            known: vec!["STOP_PROCESSING_QUEUE"],
            calls: calls.clone(),
        };
        let keep_queue = AtomicBool::new(true);
        let keep_channels = AtomicBool::new(true);

        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(dispatch_command(
            &handler,
            &keep_queue,
            &keep_channels,
            &Command::stop_processing_queue(),
        ));

        assert_eq!(calls.lock().as_slice(), &["STOP_PROCESSING_QUEUE".to_string()]);
        assert!(!keep_queue.load(Ordering::SeqCst));
        assert!(keep_channels.load(Ordering::SeqCst));
    }

    #[test]
    fn unknown_command_is_dropped_without_a_handler_call() {
        let calls = StdArc::new(Mutex::new(Vec::new()));
        let handler = RecordingHandler { known: vec![], calls: calls.clone() };
        let keep_queue = AtomicBool::new(true);
        let keep_channels = AtomicBool::new(true);

        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(dispatch_command(
            &handler,
            &keep_queue,
            &keep_channels,
            &Command::new("FUTURE_VERB"),
        ));

        assert!(calls.lock().is_empty());
        assert!(keep_queue.load(Ordering::SeqCst));
    }
}
