//! postgen - turn a web page address into a social media post.
//!
//! Pick a length, tone and emoji preference, let a generative-text provider
//! write the post, then copy or share it. Posts can be kept in a hosted
//! PostgREST backend and listed or deleted later.

mod config;
mod error;
mod generator;
mod notice;
mod post;
mod prefs;
mod prompt;
mod session;
mod share;
mod store;
mod tui;
mod validate;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use config::Config;
use notice::Severity;
use post::{Length, PostId, PostOptions, Tone};
use session::Session;
use std::process::Command as ProcessCommand;
use std::sync::{Arc, Mutex};
use store::{PostRepository, RestRepository};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "postgen")]
#[command(author, version, about = "Turn a web page address into a social media post")]
#[command(long_about = "Generates a social media post summarizing a web page.\n\nRun without a subcommand for the interactive form.")]
struct Cli {
    /// Prefill the address field of the interactive form
    #[arg(value_name = "URL")]
    address: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate one post and print it (for scripting)
    Generate {
        /// Address of the page to summarize
        address: String,
        #[command(flatten)]
        style: StyleArgs,
        /// Do not store the post even if a posts backend is configured
        #[arg(long)]
        no_save: bool,
    },
    /// List or delete stored posts
    Posts {
        #[command(subcommand)]
        action: PostsAction,
    },
    /// Share or copy a stored post
    Share {
        /// Identifier of the stored post
        id: String,
    },
    /// Open configuration file in $EDITOR
    Config,
    /// Show the configured provider and backends
    Providers,
}

#[derive(clap::Args)]
struct StyleArgs {
    /// Post length (defaults to the config value)
    #[arg(short, long, value_enum)]
    length: Option<Length>,
    /// Post tone (defaults to the config value)
    #[arg(short, long, value_enum)]
    tone: Option<Tone>,
    /// Use emojis
    #[arg(short, long, conflicts_with = "no_emoji")]
    emoji: bool,
    /// Leave emojis out even when the config turns them on
    #[arg(long)]
    no_emoji: bool,
}

impl StyleArgs {
    fn resolve(&self, defaults: PostOptions) -> PostOptions {
        PostOptions {
            length: self.length.unwrap_or(defaults.length),
            tone: self.tone.unwrap_or(defaults.tone),
            emoji: !self.no_emoji && (self.emoji || defaults.emoji),
        }
    }
}

#[derive(Subcommand)]
enum PostsAction {
    /// List stored posts, newest first
    List {
        /// Show at most this many posts
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Print the records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a stored post
    Delete {
        /// Identifier of the stored post
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Generate { address, style, no_save }) => {
            init_tracing(false)?;
            handle_generate(address, style, no_save).await
        }
        Some(Commands::Posts { action }) => {
            init_tracing(false)?;
            handle_posts(action).await
        }
        Some(Commands::Share { id }) => {
            init_tracing(false)?;
            handle_share(id).await
        }
        Some(Commands::Config) => handle_config(),
        Some(Commands::Providers) => handle_providers(),
        None => {
            init_tracing(true)?;
            handle_form(cli.address).await
        }
    }
}

/// Initialize logging. The interactive form owns the terminal, so it logs to a file.
fn init_tracing(to_file: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("postgen=info,reqwest=warn"));

    if to_file {
        let dir = Config::state_dir()?;
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        let path = dir.join("postgen.log");
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file: {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

/// Build the posts repository if one is configured.
fn open_repository(config: &Config) -> Result<Option<Arc<dyn PostRepository>>> {
    match &config.persistence {
        Some(persistence) => {
            let repository = RestRepository::from_config(persistence)?;
            Ok(Some(Arc::new(repository)))
        }
        None => Ok(None),
    }
}

fn require_repository(config: &Config) -> Result<Arc<dyn PostRepository>> {
    open_repository(config)?.ok_or_else(|| {
        anyhow!(
            "No posts backend configured. Add a [persistence] section to {}",
            Config::config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| "the config file".to_string())
        )
    })
}

/// Assemble a session from configuration.
fn build_session(config: &Config, persist: bool) -> Result<Session> {
    let generator = generator::create_generator(&config.generator)?;
    let repository = if persist { open_repository(config)? } else { None };
    let share = share::select_share_target(&config.share);

    info!(
        provider = config.provider_name(),
        model = config.model_name(),
        persistence = repository.is_some(),
        "Session ready"
    );

    let mut session = Session::new(generator, repository, share, config.prompt.directive.clone())
        .with_options(config.prompt.defaults);
    if let Some(persistence) = &config.persistence {
        session = session.with_recent_limit(persistence.recent_limit);
    }
    Ok(session)
}

/// Run the interactive form.
async fn handle_form(address: Option<String>) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    let mut session = build_session(&config, true)?;
    if let Some(address) = address {
        session.set_address(address);
    }

    let mut prefs = prefs::FilePreferences::open(Config::config_dir()?.join("prefs.toml"))?;
    info!(path = %prefs.path().display(), "Preferences loaded");
    tui::run_form(&mut session, &mut prefs).await
}

/// Generate one post and print it to stdout.
async fn handle_generate(address: String, style: StyleArgs, no_save: bool) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    let options = style.resolve(config.prompt.defaults);
    let mut session = build_session(&config, !no_save)?.with_options(options);
    session.set_address(address);

    if let Err(failure) = session.generate().await {
        eprintln!("Error: {}", failure);
        std::process::exit(1);
    }

    if let Some(content) = session.content() {
        println!("{}", content);
        eprintln!("\n{} characters", session.char_count());
    }
    // Generation succeeded but saving may not have.
    if let Some(notice) = session.notice().filter(|n| n.severity == Severity::Error) {
        eprintln!("Warning: {}", notice);
    }
    Ok(())
}

/// Handle the posts subcommand.
async fn handle_posts(action: PostsAction) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    let repository = require_repository(&config)?;

    match action {
        PostsAction::List { limit, json } => {
            let records = repository.list(limit).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
                return Ok(());
            }

            println!("Stored Posts");
            println!("============\n");
            if records.is_empty() {
                println!("No posts yet.");
                println!("\nGenerate one with: postgen generate <URL>");
            }
            for record in &records {
                let options = record.options();
                println!(
                    "  [{}] {} - {}\n    {} · {}{}\n    {}\n",
                    record.id,
                    record.created_at.format("%Y-%m-%d %H:%M"),
                    record.address,
                    options.length,
                    options.tone,
                    if options.emoji { " · emojis" } else { "" },
                    record.content.lines().next().unwrap_or("")
                );
            }
        }
        PostsAction::Delete { id } => {
            repository.delete(&PostId::new(id.clone())).await?;
            println!("Post '{}' deleted.", id);
        }
    }
    Ok(())
}

/// Share or copy a stored post.
async fn handle_share(id: String) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    let repository = require_repository(&config)?;
    let id = PostId::new(id);

    let record = repository
        .list(None)
        .await?
        .into_iter()
        .find(|r| r.id == id)
        .ok_or_else(|| anyhow!("No stored post with id {}", id))?;

    let target = share::select_share_target(&config.share);
    let notice = share::share_with_notice(target.as_ref(), &record.content).await;
    if notice.is_error() {
        eprintln!("Error: {}", notice);
        std::process::exit(1);
    }
    eprintln!("{}", notice);
    Ok(())
}

/// Handle the config command.
fn handle_config() -> Result<()> {
    let config_path = Config::config_path()?;

    // Create default config if it doesn't exist
    if !config_path.exists() {
        Config::default().save()?;
        println!("Created default config at {}", config_path.display());
    }

    let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());
    let status = ProcessCommand::new(&editor)
        .arg(&config_path)
        .status()
        .context("Failed to open editor")?;

    if !status.success() {
        eprintln!("Editor exited with non-zero status");
    }

    Ok(())
}

/// Handle the providers subcommand.
fn handle_providers() -> Result<()> {
    let config = Config::load()?;

    println!("Configuration");
    println!("=============\n");
    println!("  provider: {}", config.provider_name());
    println!("  model: {}", config.model_name());
    println!("  timeout: {}s", config.generator.timeout_secs);
    match &config.persistence {
        Some(p) => println!("  posts backend: {} (table '{}')", p.url, p.table),
        None => println!("  posts backend: none (posts are not stored)"),
    }
    println!("  share: {:?}", config.share.mode);
    println!(
        "  defaults: {} · {} · emojis {}",
        config.prompt.defaults.length,
        config.prompt.defaults.tone,
        if config.prompt.defaults.emoji { "on" } else { "off" }
    );

    println!("\nSupported providers: openai, anthropic, gemini, ollama");
    println!("Edit with: postgen config");

    Ok(())
}
