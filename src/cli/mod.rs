//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "ragfuse",
    version,
    author = "neur0map",
    about = "Retrieval-augmented question answering with query fusion and reranking",
    long_about = "ragfuse answers questions over a pre-chunked corpus. It rewrites follow-up questions \
                  into standalone ones, widens recall with query variants and hypothetical documents, \
                  reranks the merged candidates and generates an answer grounded in the best passages."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/ragfuse/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Configuration profile to apply (e.g., "fast", "thorough")
    #[arg(short, long, global = true)]
    pub profile: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask a question against the corpus
    Ask {
        /// Question to ask
        question: String,

        /// JSON file with prior turns: [{"role": "user", "content": "..."}]
        #[arg(long, value_name = "FILE")]
        history: Option<PathBuf>,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,

        /// Send the question to a running server instead of answering in process
        #[arg(long)]
        remote: bool,
    },

    /// Run the request server in the foreground
    Serve,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_ask() {
        let cli = Cli::try_parse_from([
            "ragfuse",
            "--profile",
            "fast",
            "ask",
            "What is X?",
            "--history",
            "turns.json",
            "--json",
        ])
        .unwrap();

        assert_eq!(cli.profile.as_deref(), Some("fast"));
        match cli.command {
            Commands::Ask {
                question,
                history,
                json,
                remote,
            } => {
                assert_eq!(question, "What is X?");
                assert_eq!(history, Some(PathBuf::from("turns.json")));
                assert!(json);
                assert!(!remote);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
