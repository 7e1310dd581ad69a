// Copyright 2026 The Lumi Project
// SPDX-License-Identifier: Apache-2.0

use std::io::Write;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use lumi_chat::client::ChatClient;
use lumi_chat::config::{self, ClientConfig, FileSource};
use lumi_chat::render::TerminalRenderer;
use lumi_chat::session::{InMemorySessionStore, SessionProvider};

#[derive(Parser)]
#[command(name = "lumi-chat", about = "Streaming chat client for the Lumi Q&A backend")]
struct Cli {
    /// Path to the lumi.yaml config file
    #[arg(long, default_value = "lumi.yaml", env = "LUMI_CONFIG")]
    config: String,

    /// Backend base URL (overrides the config file)
    #[arg(long, env = "LUMI_BACKEND")]
    backend: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ask a single question and stream the answer
    Ask { question: String },
    /// Interactive chat session; one question per line, Ctrl-D to exit
    Chat,
    /// List recent answers
    History,
    /// Delete a saved answer by id
    Delete { id: i64 },
}

#[tokio::main]
async fn main() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = if std::path::Path::new(&cli.config).exists() {
        let source = FileSource {
            path: std::path::PathBuf::from(&cli.config),
        };
        match config::load_config(&source) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!("failed to load config: {e}");
                std::process::exit(1);
            }
        }
    } else {
        ClientConfig::default()
    };
    if let Some(backend) = cli.backend {
        config.backend.base_url = backend.trim_end_matches('/').to_string();
    }

    tracing::debug!(base_url = %config.backend.base_url, "config loaded");

    let session = SessionProvider::new(Arc::new(InMemorySessionStore::new()));
    let client = ChatClient::new(&config, session);

    let exit = match cli.command {
        Command::Ask { question } => run_ask(&client, &question).await,
        Command::Chat => run_chat(&client).await,
        Command::History => run_history(&client).await,
        Command::Delete { id } => run_delete(&client, id).await,
    };
    std::process::exit(exit);
}

async fn run_ask(client: &ChatClient, question: &str) -> i32 {
    let renderer = Arc::new(TerminalRenderer::new());
    match client.ask(question, renderer).await {
        Ok(_) => 0,
        Err(e) => {
            tracing::error!("ask failed: {e}");
            1
        }
    }
}

async fn run_chat(client: &ChatClient) -> i32 {
    use tokio::io::{AsyncBufReadExt, BufReader};

    println!("Session {}", client.session_id());
    println!("Type a question, Ctrl-D to exit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        let _ = std::io::stdout().flush();
        match lines.next_line().await {
            Ok(Some(line)) => {
                let question = line.trim();
                if question.is_empty() {
                    continue;
                }
                // Fresh renderer per question: its print cursor belongs
                // to one answer, like the accumulator state itself.
                let renderer = Arc::new(TerminalRenderer::new());
                if let Err(e) = client.ask(question, renderer).await {
                    tracing::error!("ask failed: {e}");
                }
                println!();
            }
            Ok(None) => return 0,
            Err(e) => {
                tracing::error!("stdin error: {e}");
                return 1;
            }
        }
    }
}

async fn run_history(client: &ChatClient) -> i32 {
    match client.history().await {
        Ok(entries) if entries.is_empty() => {
            println!("No saved answers.");
            0
        }
        Ok(entries) => {
            for entry in entries {
                println!("#{} [{}] Q: {}", entry.id, entry.created_at, entry.user_query);
                println!("    A: {}", entry.preview(100));
            }
            0
        }
        Err(e) => {
            tracing::error!("history failed: {e}");
            1
        }
    }
}

async fn run_delete(client: &ChatClient, id: i64) -> i32 {
    match client.delete_history(id).await {
        Ok(()) => {
            println!("Deleted #{id}.");
            0
        }
        Err(e) => {
            tracing::error!("delete failed: {e}");
            1
        }
    }
}
