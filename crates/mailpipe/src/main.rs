//! `mailpipe` - command-line front end for the mail retrieval engine.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod cli;
mod settings;

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use mailpipe_core::{Engine, EngineConfig, ImapConnector, MemoryAccountStore, StreamRequest};
use tokio::io::{AsyncWriteExt, Stdout};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, Command, PageArgs};
use settings::Settings;

type MailEngine = Engine<ImapConnector, MemoryAccountStore>;

/// Wait before subscribing again after a feed ends.
const RESUBSCRIBE_DELAY: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let path = cli.config.clone().unwrap_or_else(settings::default_path);
    let settings = Settings::load(&path)?;

    init_logging(settings.log_file.as_deref())?;
    info!(config = %path.display(), accounts = settings.accounts.len(), "starting mailpipe");

    let config = EngineConfig::default();
    let store = MemoryAccountStore::new(settings.accounts)?;
    let engine = Engine::new(ImapConnector::new(config.clone()), store, config);

    let result = run(&engine, cli.command).await;
    engine.shutdown().await;
    result
}

fn init_logging(log_file: Option<&Path>) -> anyhow::Result<()> {
    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "mailpipe=info,mailpipe_core=info,mailpipe_imap=warn".into()
            }),
        )
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(())
}

async fn run(engine: &MailEngine, command: Command) -> anyhow::Result<()> {
    match command {
        Command::List { email } => {
            let mailboxes = engine.list(&email).await?;
            println!("{}", serde_json::to_string_pretty(&mailboxes)?);
        }
        Command::Fetch(args) => {
            let emails = engine
                .fetch(&args.email, &args.mailbox, args.page_size, args.page)
                .await?;
            println!("{}", serde_json::to_string_pretty(&emails)?);
        }
        Command::Stream(args) => stream(engine, args).await?,
    }
    Ok(())
}

/// Writes events until Ctrl-C, subscribing again whenever the feed ends.
async fn stream(engine: &MailEngine, args: PageArgs) -> anyhow::Result<()> {
    let request = StreamRequest {
        email: args.email,
        mailbox: args.mailbox,
        page_size: args.page_size,
        page_number: args.page,
    };
    let mut stdout = tokio::io::stdout();
    let mut subscription = engine.subscribe(request.clone()).await?;

    loop {
        tokio::select! {
            event = subscription.next() => match event {
                Some(event) => write_event(&mut stdout, &event.to_sse()?).await?,
                None => {
                    warn!(mailbox = %request.mailbox, "stream ended, resubscribing");
                    tokio::select! {
                        () = tokio::time::sleep(RESUBSCRIBE_DELAY) => {}
                        _ = tokio::signal::ctrl_c() => return Ok(()),
                    }
                    match engine.subscribe(request.clone()).await {
                        Ok(next) => subscription = next,
                        Err(e) => warn!(error = %e, "resubscribe failed"),
                    }
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                subscription.cancel();
                return Ok(());
            }
        }
    }
}

async fn write_event(stdout: &mut Stdout, frame: &str) -> anyhow::Result<()> {
    stdout.write_all(frame.as_bytes()).await?;
    stdout.flush().await?;
    Ok(())
}
