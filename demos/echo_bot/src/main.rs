//! Echo Bot Example
//!
//! A console bot: every line typed on stdin becomes a `PRIVMSG`, and every
//! message the bot sends is printed to stdout in wire form.
//!
//! # Input
//!
//! ```text
//! .ping                       # from --user, to --channel
//! @alice #lobby .echo hello   # from alice, to #lobby
//! @alice tern .count          # private message from alice
//! .help echo                  # documentation for a command
//! tern: reload echo           # admin only (--user is the owner)
//! ```
//!
//! # Usage
//!
//! ```bash
//! cargo run --package echo-bot -- --nick tern --channel '#lobby'
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use clap::Parser;
use serde::Deserialize;
use tern::prelude::*;
use tern::runtime::TernConfig;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info};

#[derive(Debug, Parser)]
#[command(about = "Console echo bot for Tern")]
struct Args {
    /// Configuration file (tern.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bot nick
    #[arg(long, default_value = "tern")]
    nick: String,

    /// Nick used for lines without an `@nick target` header; also the owner
    #[arg(long, default_value = "root")]
    user: String,

    /// Channel used for lines without an `@nick target` header
    #[arg(long, default_value = "#tern")]
    channel: String,
}

// ============================================================================
// Modules
// ============================================================================

async fn echo(inv: Invocation) -> HandlerResult {
    match inv.group(2) {
        Some(text) => inv.say(text).await?,
        None => return Err(Grumble::new("Echo what?").into()),
    }
    Ok(())
}

fn echo_module() -> ModuleDescriptor {
    ModuleDescriptor::new("echo", || {
        Module::new().handler(
            HandlerSpec::new("echo", echo)
                .commands(["echo", "say"])
                .doc("Repeats the text back.")
                .example(".echo hello"),
        )
    })
}

async fn ping(inv: Invocation) -> HandlerResult {
    inv.reply("pong").await?;
    Ok(())
}

async fn greet(inv: Invocation) -> HandlerResult {
    if inv.nick() != inv.settings().nick {
        inv.say(format!("Welcome to {}, {}!", inv.sender(), inv.nick()))
            .await?;
    }
    Ok(())
}

fn ping_module() -> ModuleDescriptor {
    ModuleDescriptor::new("ping", || {
        Module::new()
            .handler(
                HandlerSpec::new("ping", ping)
                    .commands(["ping"])
                    .priority(Priority::High)
                    .inline()
                    .doc("Checks that the bot is alive.")
                    .example(".ping"),
            )
            .handler(
                HandlerSpec::new("greet", greet)
                    .rule(RuleSpec::pattern(".*"))
                    .event(EventKind::Join),
            )
    })
}

/// Lines seen since the module was last loaded.
struct LineCounter(AtomicU64);

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CounterConfig {
    start: u64,
}

async fn setup_counter(ctx: ModuleSetup) -> Result<()> {
    let config: Option<CounterConfig> = ctx.get_config()?;
    let start = config.unwrap_or_default().start;
    ctx.bot().insert_extension(LineCounter(AtomicU64::new(start)));
    debug!(start, "Line counter ready");
    Ok(())
}

async fn teardown_counter(ctx: ModuleSetup) -> Result<()> {
    ctx.bot().remove_extension::<LineCounter>();
    Ok(())
}

async fn count_line(inv: Invocation) -> HandlerResult {
    if let Some(counter) = inv.bot().extension::<LineCounter>() {
        counter.0.fetch_add(1, Ordering::Relaxed);
    }
    Ok(())
}

async fn count(inv: Invocation) -> HandlerResult {
    let Some(counter) = inv.bot().extension::<LineCounter>() else {
        return Err(Grumble::new("The counter is not running.").into());
    };
    let seen = counter.0.load(Ordering::Relaxed);
    let asked = inv.bot().stats().get("count", inv.nick());
    inv.reply(format!("{seen} lines so far; you asked {asked} times before."))
        .await?;
    Ok(())
}

fn counter_module() -> ModuleDescriptor {
    ModuleDescriptor::new("count", || {
        Module::new()
            .on_setup(setup_counter)
            .on_teardown(teardown_counter)
            .handler(
                HandlerSpec::new("count_line", count_line)
                    .rule(RuleSpec::pattern(".*"))
                    .priority(Priority::High)
                    .inline(),
            )
            .handler(
                HandlerSpec::new("count", count)
                    .commands(["count"])
                    .priority(Priority::Low)
                    .doc("Shows how many lines the bot has seen.")
                    .example(".count"),
            )
    })
}

// ============================================================================
// Console Transport
// ============================================================================

/// Parses `@nick target text` or plain `text`.
fn parse_line(line: &str, args: &Args) -> Option<InboundEvent> {
    let line = line.trim_end();
    if line.is_empty() {
        return None;
    }
    if let Some(header) = line.strip_prefix('@') {
        let mut parts = header.splitn(3, ' ');
        let nick = parts.next()?;
        let target = parts.next()?;
        let text = parts.next().unwrap_or_default();
        // A private message's reply target is the sender.
        let sender = if target.starts_with('#') { target } else { nick };
        return Some(InboundEvent::message(nick, sender, text));
    }
    if let Some(channel) = line.strip_prefix("/join ") {
        return Some(InboundEvent::new(EventKind::Join, &args.user, channel.trim(), ""));
    }
    Some(InboundEvent::message(&args.user, &args.channel, line))
}

async fn read_stdin(args: Arc<Args>, events: mpsc::Sender<InboundEvent>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if let Some(event) = parse_line(&line, &args)
            && events.send(event).await.is_err()
        {
            break;
        }
    }
    info!("stdin closed");
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Arc::new(Args::parse());

    let defaults = TernConfig {
        bot: BotSettings::new(&args.nick).with_owner(&args.user),
        ..TernConfig::default()
    };
    let mut builder = TernRuntime::builder()
        .merge(defaults)
        .modules([echo_module(), ping_module(), counter_module()]);
    if let Some(path) = &args.config {
        builder = builder.config_file(path);
    }

    let (outbound, mut lines) = ChannelOutbound::channel(64);
    let runtime = builder.build(Arc::new(outbound)).await?;

    let printer = tokio::spawn(async move {
        while let Some(message) = lines.recv().await {
            println!("{message}");
        }
    });

    let (tx, rx) = mpsc::channel(64);
    let reader = tokio::spawn(read_stdin(Arc::clone(&args), tx));

    runtime.run(rx).await?;
    reader.abort();
    drop(runtime);
    printer.await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use tern::framework::RuleCompiler;

    use super::*;

    #[test]
    fn test_examples_match_their_rules() {
        let compiler = RuleCompiler::new(&BotSettings::new("tern"));
        for desc in [echo_module(), ping_module(), counter_module()] {
            for spec in desc.instantiate().handlers() {
                let (handler, rules) = spec.compile(desc.name(), 1, &compiler).unwrap();
                let Some(example) = &handler.example else {
                    continue;
                };
                assert!(
                    rules.iter().any(|rule| rule.matches(example).is_some()),
                    "{}: example {example:?} does not match",
                    handler.qualified_name()
                );
            }
        }
    }

    #[test]
    fn test_parse_line() {
        let args = Args::parse_from(["echo-bot", "--user", "root", "--channel", "#tern"]);

        let event = parse_line("@alice #lobby .echo hi", &args).unwrap();
        assert_eq!((event.nick.as_str(), event.sender.as_str()), ("alice", "#lobby"));
        assert_eq!(event.text, ".echo hi");

        let event = parse_line("@alice tern .count", &args).unwrap();
        assert_eq!(event.sender, "alice");

        let event = parse_line(".ping", &args).unwrap();
        assert_eq!((event.nick.as_str(), event.sender.as_str()), ("root", "#tern"));

        let event = parse_line("/join #lobby", &args).unwrap();
        assert_eq!(event.kind, EventKind::Join);
        assert!(parse_line("   ", &args).is_none());
    }
}
