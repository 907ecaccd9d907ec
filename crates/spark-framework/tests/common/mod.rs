//! Shared helpers for integration tests.
//!
//! Each integration test file compiles common/ as its own module, so not
//! every helper is used in every file.
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use spark_core::{
    Args, BotState, CommandContext, CommandError, CommandRegistry, Embed, InboundMessage, Platform,
    PlatformResult, Reply, command_fn,
};
use spark_framework::{
    MainLoop, MessageFilter, MessageRouter, Worker, WorkerConfig, WorkerHandle, loop_channel,
    task_queue,
};

pub const BOT_ID: &str = "bot";
pub const GUILD: &str = "guild";
pub const CHANNEL: &str = "general";

/// How long to wait for a reply that is expected to arrive.
pub const REPLY_WAIT: Duration = Duration::from_secs(5);

/// A platform that records every send and forwards it to the test.
pub struct RecordingPlatform {
    sent: Mutex<Vec<(String, Reply)>>,
    notify: mpsc::UnboundedSender<(String, Reply)>,
}

impl RecordingPlatform {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<(String, Reply)>) {
        let (notify, rx) = mpsc::unbounded_channel();
        let platform = Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            notify,
        });
        (platform, rx)
    }

    pub fn sent(&self) -> Vec<(String, Reply)> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Platform for RecordingPlatform {
    fn name(&self) -> &str {
        "recording"
    }

    fn self_id(&self) -> &str {
        BOT_ID
    }

    async fn send(&self, channel_id: &str, reply: &Reply) -> PlatformResult<String> {
        let mut sent = self.sent.lock();
        sent.push((channel_id.to_string(), reply.clone()));
        let _ = self.notify.send((channel_id.to_string(), reply.clone()));
        Ok(format!("sent-{}", sent.len()))
    }
}

/// The commands used across the integration tests.
pub fn test_registry() -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    registry
        .register(command_fn("echo", |ctx: CommandContext, args: Args| async move {
            ctx.say(args.raw()).await
        }))
        .unwrap();
    registry
        .register(command_fn("upper", |ctx: CommandContext, args: Args| async move {
            ctx.say(args.raw().to_uppercase()).await
        }))
        .unwrap();
    registry
        .register(command_fn("card", |ctx: CommandContext, _args| async move {
            ctx.send(Embed::new().title("T").description("D").footer("F"))
                .await
        }))
        .unwrap();
    registry
        .register(command_fn("twice", |ctx: CommandContext, _args| async move {
            ctx.say("first").await?;
            ctx.say("second").await
        }))
        .unwrap();
    registry
        .register(command_fn("fail", |_ctx, _args| async {
            Err(CommandError::failed("inner failure"))
        }))
        .unwrap();
    registry
        .register(command_fn("sleep", |ctx: CommandContext, args: Args| async move {
            let millis: u64 = args
                .require(0, "millis")?
                .parse()
                .map_err(|_| CommandError::invalid_args("millis must be a number"))?;
            tokio::time::sleep(Duration::from_millis(millis)).await;
            ctx.say("slept").await
        }))
        .unwrap();
    registry
        .register(command_fn("slowupper", |ctx: CommandContext, args: Args| async move {
            tokio::time::sleep(Duration::from_millis(150)).await;
            ctx.say(args.raw().to_uppercase()).await
        }))
        .unwrap();
    registry
        .register(command_fn("picture", |ctx: CommandContext, _args| async move {
            ctx.send(Embed::new().image("https://example.com/cat.png"))
                .await?;
            ctx.say("caption").await
        }))
        .unwrap();
    registry
        .register(command_fn("recurse", |ctx: CommandContext, _args| async move {
            let prefix = ctx.prefix().to_string();
            ctx.say(format!("$({prefix}recurse)")).await
        }))
        .unwrap();
    registry
        .register(
            command_fn("ping", |ctx: CommandContext, _args| async move { ctx.say("pong").await })
                .main_loop(),
        )
        .unwrap();
    registry
        .register(
            command_fn("explode", |_ctx, _args| async {
                Err(CommandError::failed("main loop failure"))
            })
            .main_loop(),
        )
        .unwrap();
    registry
}

/// A running main loop and worker over a [`RecordingPlatform`].
pub struct Harness {
    pub platform: Arc<RecordingPlatform>,
    inbound: Option<mpsc::Sender<InboundMessage>>,
    replies: mpsc::UnboundedReceiver<(String, Reply)>,
    shutdown: CancellationToken,
    main_loop: JoinHandle<()>,
    worker: WorkerHandle,
    next_id: AtomicUsize,
}

impl Harness {
    pub fn start() -> Self {
        Self::with(MessageFilter::new(), WorkerConfig::default())
    }

    pub fn with_config(config: WorkerConfig) -> Self {
        Self::with(MessageFilter::new(), config)
    }

    /// Must be called from within a tokio runtime.
    pub fn with(filter: MessageFilter, config: WorkerConfig) -> Self {
        let (platform, replies) = RecordingPlatform::new();
        let state = BotState::new("!", Arc::new(test_registry()));

        let (tasks, receiver) = task_queue();
        let (handle, jobs) = loop_channel();
        let worker = Worker::new(state.clone(), receiver, config)
            .spawn(handle)
            .expect("worker thread should start");

        let router = MessageRouter::new(state, filter, platform.clone(), tasks);
        let (inbound, inbound_rx) = mpsc::channel(64);
        let shutdown = CancellationToken::new();
        let main_loop = tokio::spawn(MainLoop::new(router, jobs).run(inbound_rx, shutdown.clone()));

        Self {
            platform,
            inbound: Some(inbound),
            replies,
            shutdown,
            main_loop,
            worker,
            next_id: AtomicUsize::new(0),
        }
    }

    /// Posts `content` to the default channel as an ordinary user.
    pub async fn send(&self, content: &str) {
        self.send_message(self.message(content)).await;
    }

    pub async fn send_message(&self, message: InboundMessage) {
        self.inbound
            .as_ref()
            .expect("inbound already closed")
            .send(message)
            .await
            .expect("main loop should be receiving");
    }

    /// Builds a user message in the default guild and channel.
    pub fn message(&self, content: &str) -> InboundMessage {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        InboundMessage::new(format!("m{id}"), "user", GUILD, CHANNEL, content)
    }

    /// Waits for the next reply sent to the platform.
    pub async fn next_reply(&mut self) -> (String, Reply) {
        tokio::time::timeout(REPLY_WAIT, self.replies.recv())
            .await
            .expect("timed out waiting for a reply")
            .expect("platform dropped")
    }

    /// Waits for the next reply and returns its text.
    pub async fn next_text(&mut self) -> String {
        let (_, reply) = self.next_reply().await;
        reply.content.expect("reply should carry text")
    }

    /// Asserts that nothing is sent within `wait`.
    pub async fn assert_quiet(&mut self, wait: Duration) {
        if let Ok(Some((channel, reply))) = tokio::time::timeout(wait, self.replies.recv()).await {
            panic!("unexpected reply in {channel}: {reply:?}");
        }
    }

    /// Closes the inbound stream and waits for the engine to drain and stop.
    pub async fn finish(mut self) {
        self.inbound.take();
        tokio::time::timeout(REPLY_WAIT, &mut self.main_loop)
            .await
            .expect("main loop should drain and stop")
            .expect("main loop task panicked");
        let worker = self.worker;
        tokio::task::spawn_blocking(move || worker.join())
            .await
            .unwrap()
            .expect("worker thread panicked");
    }

    /// Cancels the engine without draining.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        let _ = self.main_loop.await;
    }
}
