//! The main event loop.
//!
//! Runs on the async runtime that owns the platform connection. It receives
//! inbound messages and bridged jobs and spawns each as its own task, so a
//! slow command never holds up message intake.
//!
//! Shutdown happens one of two ways:
//!
//! - the shutdown token is cancelled: the loop stops immediately;
//! - the inbound stream ends: the router is dropped, which closes the task
//!   queue. The worker finishes its backlog and exits, dropping the last
//!   [`LoopHandle`](crate::bridge::LoopHandle); once the job channel closes
//!   and every spawned task has finished, the loop returns.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, trace};

use spark_core::InboundMessage;

use crate::bridge::LoopJobs;
use crate::router::MessageRouter;

/// Drives message intake and bridged jobs.
pub struct MainLoop {
    router: Arc<MessageRouter>,
    jobs: LoopJobs,
}

impl MainLoop {
    pub fn new(router: MessageRouter, jobs: LoopJobs) -> Self {
        Self {
            router: Arc::new(router),
            jobs,
        }
    }

    /// Runs until `shutdown` is cancelled or everything has drained.
    pub async fn run(self, mut inbound: mpsc::Receiver<InboundMessage>, shutdown: CancellationToken) {
        let Self { router, mut jobs } = self;
        let mut router = Some(router);
        let mut jobs_open = true;
        let tracker = TaskTracker::new();

        info!("Main loop started");
        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!(in_flight = tracker.len(), "Shutdown requested, main loop stopping");
                    return;
                }

                job = jobs.next(), if jobs_open => match job {
                    Some(job) => {
                        trace!("Running bridged job");
                        tracker.spawn(job);
                    }
                    None => {
                        debug!("Job channel closed");
                        jobs_open = false;
                        if router.is_none() {
                            break;
                        }
                    }
                },

                message = inbound.recv(), if router.is_some() => match message {
                    Some(message) => {
                        if let Some(router) = &router {
                            let router = Arc::clone(router);
                            tracker.spawn(async move {
                                let outcome = router.route(message).await;
                                trace!(?outcome, "Routed message");
                            });
                        }
                    }
                    None => {
                        info!("Inbound stream ended, draining worker");
                        router = None;
                        if !jobs_open {
                            break;
                        }
                    }
                },
            }
        }

        tracker.close();
        tracker.wait().await;
        info!("Main loop finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use spark_core::{
        BotState, CommandContext, CommandRegistry, Platform, PlatformResult, Reply, command_fn,
    };

    use crate::bridge::loop_channel;
    use crate::filter::MessageFilter;
    use crate::worker::task_queue;

    #[derive(Default)]
    struct MockPlatform {
        sent: Mutex<Vec<Reply>>,
    }

    #[async_trait]
    impl Platform for MockPlatform {
        fn name(&self) -> &str {
            "mock"
        }

        fn self_id(&self) -> &str {
            "bot"
        }

        async fn send(&self, _channel_id: &str, reply: &Reply) -> PlatformResult<String> {
            self.sent.lock().push(reply.clone());
            Ok("sent".into())
        }
    }

    fn main_loop(platform: Arc<MockPlatform>) -> (MainLoop, crate::bridge::LoopHandle) {
        let mut registry = CommandRegistry::new();
        registry
            .register(
                command_fn("ping", |ctx: CommandContext, _args| async move { ctx.say("pong").await })
                    .main_loop(),
            )
            .unwrap();
        let state = BotState::new("!", Arc::new(registry));
        let (tasks, _receiver) = task_queue();
        let (handle, jobs) = loop_channel();
        let router = MessageRouter::new(state, MessageFilter::new(), platform, tasks);
        (MainLoop::new(router, jobs), handle)
    }

    #[tokio::test]
    async fn test_routes_messages_and_drains_on_close() {
        let platform = Arc::new(MockPlatform::default());
        let (main_loop, handle) = main_loop(platform.clone());
        let (tx, rx) = mpsc::channel(8);

        tx.send(InboundMessage::new("m1", "u1", "g1", "c1", "!ping"))
            .await
            .unwrap();
        drop(tx);
        drop(handle);

        tokio::time::timeout(
            Duration::from_secs(5),
            main_loop.run(rx, CancellationToken::new()),
        )
        .await
        .expect("main loop should finish once drained");

        assert_eq!(platform.sent.lock().as_slice(), [Reply::text("pong")]);
    }

    #[tokio::test]
    async fn test_runs_bridged_jobs() {
        let platform = Arc::new(MockPlatform::default());
        let (main_loop, handle) = main_loop(platform);
        let (_tx, rx) = mpsc::channel(8);
        let shutdown = CancellationToken::new();

        let running = tokio::spawn(main_loop.run(rx, shutdown.clone()));

        let (done_tx, done_rx) = tokio::sync::oneshot::channel();
        handle
            .submit(Box::pin(async move {
                let _ = done_tx.send(());
            }))
            .unwrap();
        tokio::time::timeout(Duration::from_secs(5), done_rx)
            .await
            .unwrap()
            .unwrap();

        shutdown.cancel();
        running.await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_stops_loop_with_open_channels() {
        let platform = Arc::new(MockPlatform::default());
        let (main_loop, _handle) = main_loop(platform);
        let (_tx, rx) = mpsc::channel(8);
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        tokio::time::timeout(Duration::from_secs(5), main_loop.run(rx, shutdown))
            .await
            .unwrap();
    }
}
