// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 MARES contributors

//! MARES - chat client for the MARES research agent backend
//!
//! Entry point for the `mares` CLI. The heavy lifting (session bootstrap,
//! SSE demultiplexing, message accumulation) lives in the library; this
//! binary renders transcript snapshots to stdout as they are published.

use std::io::{self, Write};

use anyhow::Context;
use clap::Parser;
use tokio::io::AsyncBufReadExt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use mares::chat::{Attachment, ChatEngine, Message, Role};
use mares::cli::{AskArgs, Cli, Commands};
use mares::client::{ApiClient, ReadinessProbe, ReadinessState, RetryConfig};
use mares::config::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut settings = match &cli.config {
        Some(path) => Settings::load_from(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => Settings::load().context("loading settings")?,
    };
    if let Some(backend) = cli.backend {
        settings.backend.base_url = backend;
    }

    let api = ApiClient::new(&settings.backend.base_url);

    println!("Waiting for backend to be ready...");
    let probe = ReadinessProbe::from(&settings.readiness);
    let cancel = CancellationToken::new();
    if probe.wait(&api, &cancel).await != ReadinessState::Ready {
        eprintln!(
            "Backend unavailable at {}. Start the backend and retry.",
            settings.backend.base_url
        );
        std::process::exit(1);
    }

    let mut engine = ChatEngine::new(api, RetryConfig::from(&settings.resilience));
    match cli.command {
        Some(Commands::Ask(args)) => run_ask(&mut engine, &settings, args).await,
        Some(Commands::Chat) | None => run_chat(&mut engine, &settings).await,
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("mares={default_level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// One-shot submission: send the brief, stream the answer, exit
async fn run_ask(
    engine: &mut ChatEngine,
    settings: &Settings,
    args: AskArgs,
) -> anyhow::Result<()> {
    let mut attachments = Vec::new();
    for path in &args.attachments {
        let attachment = Attachment::from_path(path)
            .with_context(|| format!("reading attachment {}", path.display()))?;
        attachments.push(attachment);
    }
    settings.attachments.validate(&attachments)?;

    submit_and_render(engine, &args.query, attachments).await;
    Ok(())
}

/// Interactive chat loop with /commands
async fn run_chat(engine: &mut ChatEngine, settings: &Settings) -> anyhow::Result<()> {
    println!("Connected to {}", settings.backend.base_url);
    println!("Type a brief to submit it. /help lists commands.");

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut pending: Vec<Attachment> = Vec::new();

    loop {
        print!("> ");
        io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();

        if let Some(command) = input.strip_prefix('/') {
            match command {
                "quit" | "exit" => break,
                "reset" => {
                    engine.reset();
                    pending.clear();
                    println!("Conversation cleared.");
                }
                "help" => print_help(),
                _ => {
                    if let Some(path) = command.strip_prefix("attach ") {
                        attach_file(path.trim(), &mut pending, settings);
                    } else {
                        println!("Unknown command: /{command}");
                    }
                }
            }
            continue;
        }

        if input.is_empty() && pending.is_empty() {
            continue;
        }
        let attachments = std::mem::take(&mut pending);
        submit_and_render(engine, input, attachments).await;
    }
    Ok(())
}

fn attach_file(path: &str, pending: &mut Vec<Attachment>, settings: &Settings) {
    let attachment = match Attachment::from_path(std::path::Path::new(path)) {
        Ok(attachment) => attachment,
        Err(error) => {
            println!("Could not read {path}: {error}");
            return;
        }
    };
    pending.push(attachment);
    if let Err(error) = settings.attachments.validate(pending) {
        pending.pop();
        println!("{error}");
        return;
    }
    println!("Attached {path} ({} file(s) queued)", pending.len());
}

fn print_help() {
    println!("Commands:");
    println!("  /attach <path>  queue a file for the next submission");
    println!("  /reset          discard the session and clear the conversation");
    println!("  /quit           exit");
}

/// Run one submission while rendering streamed agent output to stdout
async fn submit_and_render(engine: &mut ChatEngine, query: &str, attachments: Vec<Attachment>) {
    if query.trim().is_empty() && attachments.is_empty() {
        return;
    }
    let messages = engine.subscribe();
    let loading = engine.subscribe_loading();
    // submit flips the loading flag before its first await, so the renderer
    // always observes the submission start
    tokio::join!(
        engine.submit(query, attachments),
        render_stream(messages, loading)
    );
}

/// Print the newest agent message incrementally as snapshots arrive
async fn render_stream(
    mut messages: watch::Receiver<Vec<Message>>,
    mut loading: watch::Receiver<bool>,
) {
    let mut started = false;
    let mut current_id = String::new();
    let mut printed = 0usize;
    let mut label_shown = false;

    loop {
        started |= *loading.borrow_and_update();
        // Content updates always precede the loading-flag clear, so a final
        // snapshot read after observing done is complete
        let done = started && !*loading.borrow();

        {
            let snapshot = messages.borrow_and_update();
            if let Some(message) = snapshot.iter().rev().find(|m| m.role == Role::Agent) {
                if message.id != current_id {
                    current_id = message.id.clone();
                    printed = 0;
                    label_shown = false;
                }
                if !label_shown && printed == 0 {
                    if let Some(name) = &message.agent_name {
                        print!("[{name}] ");
                        label_shown = true;
                    }
                }
                if let Some(delta) = message.content.get(printed..) {
                    if !delta.is_empty() {
                        print!("{delta}");
                        let _ = io::stdout().flush();
                        printed = message.content.len();
                    }
                }
            }
        }

        if done {
            break;
        }
        tokio::select! {
            changed = messages.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            changed = loading.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
    println!();
}
