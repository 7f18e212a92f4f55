use ragfuse::cli::{Cli, Commands, ConfigAction};
use ragfuse::config::{expand_tilde, Config};
use ragfuse::error::{RagError, Result};
use ragfuse::pipeline::{PipelineResult, RagPipeline, RagServices};
use ragfuse::retrieval::ConversationTurn;
use ragfuse::server::{IpcClient, Server};
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn main() -> Result<()> {
    let cli = Cli::parse_args();

    init_logging(cli.verbose);

    match cli.command {
        Commands::Ask {
            question,
            history,
            json,
            remote,
        } => {
            cmd_ask(cli.config, cli.profile, &question, history, json, remote)?;
        }
        Commands::Serve => {
            cmd_serve(cli.config, cli.profile)?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, cli.profile, action)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "ragfuse=debug" } else { "ragfuse=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| RagError::Io {
        source: e,
        context: "Failed to create tokio runtime".to_string(),
    })
}

fn cmd_ask(
    config_path: Option<PathBuf>,
    profile: Option<String>,
    question: &str,
    history_file: Option<PathBuf>,
    json: bool,
    remote: bool,
) -> Result<()> {
    if question.trim().is_empty() {
        return Err(RagError::InvalidRequest(
            "question must not be empty".to_string(),
        ));
    }

    let config = load_config(config_path, profile)?;
    let history = history_file.as_deref().map(load_history).transpose()?;

    let result = if remote {
        let client = IpcClient::new(expand_tilde(&config.server.socket_path));
        runtime()?.block_on(client.ask(question, history))?
    } else {
        let services = RagServices::from_config(&config)?;
        let pipeline = RagPipeline::new(services, &config);
        let history = history.unwrap_or_default();
        runtime()?.block_on(pipeline.run(question, &history))?
    };

    if json {
        let out = serde_json::to_string_pretty(&result).map_err(|e| RagError::Json {
            source: e,
            context: "Failed to serialize result".to_string(),
        })?;
        println!("{}", out);
    } else {
        print_result(&result);
    }

    Ok(())
}

fn print_result(result: &PipelineResult) {
    if result.rewritten_question != result.original_question {
        println!("Q: {}", result.rewritten_question);
        println!();
    }

    println!("{}", result.answer_text);

    if !result.contexts.is_empty() {
        println!("\nSources:");
        for (i, doc) in result.contexts.documents().iter().enumerate() {
            let source = doc.source().unwrap_or_else(|| "unknown".to_string());
            match doc.rerank_score() {
                Some(score) => println!("  [{}] {} ({:.3})", i + 1, source, score),
                None => println!("  [{}] {}", i + 1, source),
            }
        }
    }
}

fn cmd_serve(config_path: Option<PathBuf>, profile: Option<String>) -> Result<()> {
    let config = load_config(config_path, profile)?;

    tracing::info!("Loading backends...");
    let services = RagServices::from_config(&config)?;
    let pipeline = Arc::new(RagPipeline::new(services, &config));

    runtime()?.block_on(async {
        let server = Server::bind(pipeline, &config.server).await?;
        println!("✓ Serving on {}", server.socket_path().display());
        server.run().await
    })
}

fn cmd_config(
    config_path: Option<PathBuf>,
    profile: Option<String>,
    action: ConfigAction,
) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(config_path, profile)?;
            let out = toml::to_string_pretty(&config)?;
            println!("{}", out);
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| RagError::Io {
                    source: e,
                    context: format!("Failed to create config directory: {:?}", parent),
                })?;
            }

            Config::default().save(&path)?;

            println!("✓ Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

fn load_config(config_path: Option<PathBuf>, profile: Option<String>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    if !path.exists() {
        tracing::warn!(
            "Config file not found, using defaults. Run 'ragfuse config init' to create one."
        );
        return Config::from_defaults(profile.as_deref());
    }

    if let Some(profile) = profile {
        Config::load_with_profile(&path, &profile)
    } else {
        Config::load(&path)
    }
}

fn load_history(path: &Path) -> Result<Vec<ConversationTurn>> {
    let content = std::fs::read_to_string(path).map_err(|e| RagError::Io {
        source: e,
        context: format!("Failed to read history file: {:?}", path),
    })?;

    serde_json::from_str(&content).map_err(|e| RagError::Json {
        source: e,
        context: format!("Invalid history file: {:?}", path),
    })
}
