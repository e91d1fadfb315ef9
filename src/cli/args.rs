// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 MARES contributors

//! CLI argument definitions using Clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// MARES - chat client for the MARES research agent backend
#[derive(Parser, Debug)]
#[command(name = "mares")]
#[command(version, about = "Chat client for the MARES research agent backend")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Backend base URL (overrides settings)
    #[arg(long, global = true)]
    pub backend: Option<String>,

    /// Settings file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start an interactive chat session (default when no command given)
    Chat,

    /// Submit a single brief and print the streamed response
    Ask(AskArgs),
}

#[derive(Parser, Debug)]
pub struct AskArgs {
    /// The brief to submit
    pub query: String,

    /// Attach a file (repeatable)
    #[arg(short, long = "attach", value_name = "FILE")]
    pub attachments: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_none() {
        let cli = Cli::parse_from(["mares"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_ask_with_attachments() {
        let cli = Cli::parse_from(["mares", "ask", "summarize this", "-a", "one.pdf", "-a", "two.md"]);
        match cli.command {
            Some(Commands::Ask(args)) => {
                assert_eq!(args.query, "summarize this");
                assert_eq!(args.attachments.len(), 2);
                assert_eq!(args.attachments[0], PathBuf::from("one.pdf"));
            }
            other => panic!("Expected Ask, got {other:?}"),
        }
    }

    #[test]
    fn test_backend_override() {
        let cli = Cli::parse_from(["mares", "--backend", "http://localhost:9000/api", "chat"]);
        assert_eq!(cli.backend.as_deref(), Some("http://localhost:9000/api"));
    }
}
