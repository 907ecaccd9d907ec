//! Console Bot - Spark demo driven from standard input.
//!
//! Every line typed on stdin becomes a guild message; replies are printed to
//! stdout. Try:
//!
//! ```text
//! !help
//! !echo $(!upper hello) $(!reverse dlrow)
//! !repeat --times 3 $(!joke)
//! !echo $(!card)
//! ```
//!
//! Close stdin (Ctrl+D) to let queued commands finish, or press Ctrl+C to
//! stop at once.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use spark::prelude::*;
use spark::runtime::ConfigLoader;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info};

const GUILD_ID: &str = "console";
const CHANNEL_ID: &str = "stdin";
const AUTHOR_ID: &str = "you";

#[derive(Debug, Parser)]
#[command(name = "console-bot", about = "Run Spark commands from the terminal")]
struct Cli {
    /// Configuration file to load instead of ./spark.toml.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overrides the configured command prefix.
    #[arg(short, long)]
    prefix: Option<String>,
}

// ============================================================================
// Platform
// ============================================================================

/// Prints replies to stdout. Embeds are shown as JSON.
struct ConsolePlatform {
    next_id: AtomicU64,
}

impl ConsolePlatform {
    fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
        }
    }
}

#[async_trait]
impl Platform for ConsolePlatform {
    fn name(&self) -> &str {
        "console"
    }

    fn self_id(&self) -> &str {
        "spark"
    }

    async fn send(&self, channel_id: &str, reply: &Reply) -> PlatformResult<String> {
        if let Some(content) = &reply.content {
            println!("[#{channel_id}] {content}");
        }
        if let Some(embed) = &reply.embed {
            let json = serde_json::to_string_pretty(embed)
                .map_err(|e| PlatformError::SendFailed(e.to_string()))?;
            println!("[#{channel_id}] embed {json}");
        }
        Ok(self.next_id.fetch_add(1, Ordering::Relaxed).to_string())
    }
}

// ============================================================================
// Commands
// ============================================================================

const JOKES: &[&str] = &[
    "I would tell you a UDP joke, but you might not get it.",
    "There are 10 kinds of people: those who read binary and those who don't.",
    "A SQL query walks into a bar, goes up to two tables and asks: may I join you?",
];

/// Arguments for `repeat`.
#[derive(Debug, Parser)]
struct RepeatArgs {
    /// How many times to repeat the text.
    #[arg(short, long, default_value_t = 2)]
    times: usize,

    /// Separator placed between repetitions.
    #[arg(short, long, default_value = " ")]
    separator: String,

    /// The text to repeat.
    #[arg(required = true)]
    text: Vec<String>,
}

fn register_commands(runtime: &mut SparkRuntime) -> Result<()> {
    runtime.register_command(
        command_fn("echo", |ctx: CommandContext, args: Args| async move {
            ctx.say(args.raw()).await
        })
        .alias("say")
        .description("- Repeat the text back")
        .usage(" <text>"),
    )?;

    runtime.register_command(
        command_fn("upper", |ctx: CommandContext, args: Args| async move {
            ctx.say(args.raw().to_uppercase()).await
        })
        .description("- Shout the text")
        .usage(" <text>"),
    )?;

    runtime.register_command(
        command_fn("reverse", |ctx: CommandContext, args: Args| async move {
            ctx.say(args.raw().chars().rev().collect::<String>()).await
        })
        .description("- Reverse the text")
        .usage(" <text>"),
    )?;

    let turn = Arc::new(AtomicUsize::new(0));
    runtime.register_command(
        command_fn("joke", move |ctx: CommandContext, _args: Args| {
            let index = turn.fetch_add(1, Ordering::Relaxed) % JOKES.len();
            async move { ctx.say(JOKES[index]).await }
        })
        .description("- Tell a programming joke"),
    )?;

    runtime.register_command(
        command_fn("repeat", |ctx: CommandContext, args: Args| async move {
            let parsed: RepeatArgs = args.parse("repeat")?;
            if parsed.times > 20 {
                return Err(CommandError::invalid_args("--times must be at most 20"));
            }
            let text = parsed.text.join(" ");
            let out = vec![text; parsed.times].join(&parsed.separator);
            ctx.say(out).await
        })
        .description("- Repeat text several times")
        .usage(" [--times N] [--separator S] <text>"),
    )?;

    runtime.register_command(
        command_fn("sleep", |ctx: CommandContext, args: Args| async move {
            let ms: u64 = args
                .require(0, "milliseconds")?
                .parse()
                .map_err(|_| CommandError::invalid_args("milliseconds must be a number"))?;
            tokio::time::sleep(Duration::from_millis(ms)).await;
            ctx.say(format!("slept {ms}ms")).await
        })
        .description("- Wait, then report")
        .usage(" <milliseconds>"),
    )?;

    runtime.register_command(
        command_fn("fail", |_ctx: CommandContext, args: Args| async move {
            let reason = if args.is_empty() {
                "something went wrong"
            } else {
                args.raw()
            };
            Err(CommandError::failed(reason))
        })
        .description("- Fail on purpose")
        .usage(" [reason]"),
    )?;

    runtime.register_command(
        command_fn("card", |ctx: CommandContext, args: Args| async move {
            let footer = if args.is_empty() { "spark" } else { args.raw() };
            let embed = Embed::new()
                .title("Spark")
                .description("Commands can be piped into each other")
                .footer(footer)
                .color(0xF5A623);
            ctx.send(Reply::embed(embed)).await
        })
        .description("- Send an embed; piping it yields the footer")
        .usage(" [footer]"),
    )?;

    runtime.register_command(
        command_fn("whoami", |ctx: CommandContext, _args: Args| async move {
            ctx.say(format!(
                "{} in #{} ({})",
                ctx.author_id(),
                ctx.channel_id(),
                ctx.guild_id().unwrap_or("direct")
            ))
            .await
        })
        .main_loop()
        .description("- Show who sent the message, answered on the main loop"),
    )?;

    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut loader = ConfigLoader::new().with_current_dir();
    if let Some(path) = &cli.config {
        loader = loader.file(path);
    }
    let mut config = loader.load()?;
    if let Some(prefix) = cli.prefix {
        config.bot.prefix = prefix;
    }

    let mut runtime = SparkRuntime::from_config(&config);
    register_commands(&mut runtime)?;
    info!(commands = runtime.command_count(), "Commands registered");

    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(read_stdin(tx));

    runtime.run(Arc::new(ConsolePlatform::new()), rx).await?;
    Ok(())
}

/// Forwards stdin lines as messages until EOF.
async fn read_stdin(tx: mpsc::Sender<InboundMessage>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut seq = 0u64;

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                seq += 1;
                let message =
                    InboundMessage::new(format!("in-{seq}"), AUTHOR_ID, GUILD_ID, CHANNEL_ID, line);
                if tx.send(message).await.is_err() {
                    break;
                }
            }
            Ok(None) => {
                info!("stdin closed");
                break;
            }
            Err(e) => {
                error!(error = %e, "Failed to read stdin");
                break;
            }
        }
    }
}
