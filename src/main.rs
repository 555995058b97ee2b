// src/main.rs
//! Batch binary: crawl + classify + persist, print the weekly digest, and
//! manage dashboard users. The dashboard itself is an external consumer of
//! the JSON files this binary maintains.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use auto_hr_monitor::classify::ai_adapter::{DynGenerator, ZhipuGenerator};
use auto_hr_monitor::classify::Classifier;
use auto_hr_monitor::config::{AppConfig, DEFAULT_CONFIG_PATH};
use auto_hr_monitor::digest::build_weekly_digest;
use auto_hr_monitor::ingest::{self, fetch::Fetcher};
use auto_hr_monitor::store::NewsStore;
use auto_hr_monitor::users::UserStore;

#[derive(Parser)]
#[command(name = "auto-hr-monitor", about = "Automotive-industry HR news monitor")]
struct Cli {
    /// Path to the TOML configuration.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch all enabled feeds, classify, and merge into the store.
    Crawl,
    /// Print this week's digest as JSON.
    Digest,
    /// Manage dashboard users.
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a user.
    Add {
        username: String,
        password: String,
        /// Display name.
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long, default_value = "user")]
        role: String,
    },
    /// List all users.
    List,
    Enable {
        username: String,
    },
    Disable {
        username: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    // Config problems are the only hard failures; everything downstream
    // degrades instead of aborting.
    let cfg = AppConfig::load_from_file(&cli.config)
        .with_context(|| format!("loading config {}", cli.config.display()))?;

    match cli.command {
        Command::Crawl => crawl(&cfg).await,
        Command::Digest => digest(&cfg).await,
        Command::User { action } => user(&cfg, action),
    }
}

fn build_generator(cfg: &AppConfig) -> Result<Option<DynGenerator>> {
    if !cfg.ai.enabled {
        return Ok(None);
    }
    let generator: DynGenerator = Arc::new(ZhipuGenerator::new(&cfg.ai)?);
    Ok(Some(generator))
}

async fn crawl(cfg: &AppConfig) -> Result<()> {
    let generator = build_generator(cfg)?;
    let fetcher = Fetcher::new(&cfg.crawler)?;
    let classifier = Classifier::new(cfg, generator);
    let store = NewsStore::new(&cfg.storage.news_path, cfg.crawler.max_records);

    let (mut records, stats) = ingest::run_once(cfg, &fetcher).await;
    tracing::info!(
        fetched = stats.fetched,
        kept = stats.kept,
        deduped = stats.deduped,
        source_errors = stats.source_errors,
        "ingest finished"
    );

    for record in &mut records {
        classifier.classify(record).await;
    }

    // Only HR-relevant records reach the store; the rest were noise.
    let relevant: Vec<_> = records.into_iter().filter(|r| r.is_hr_related).collect();
    let added = store.merge(&relevant)?;

    tracing::info!(
        relevant = relevant.len(),
        added = added,
        store = %store.path().display(),
        "crawl finished"
    );
    Ok(())
}

async fn digest(cfg: &AppConfig) -> Result<()> {
    let generator = build_generator(cfg)?;
    let store = NewsStore::new(&cfg.storage.news_path, cfg.crawler.max_records);
    let records = store.load_all()?;

    let digest = build_weekly_digest(&records, generator.as_ref()).await;
    println!("{}", serde_json::to_string_pretty(&digest)?);
    Ok(())
}

fn user(cfg: &AppConfig, action: UserAction) -> Result<()> {
    let store = UserStore::new(&cfg.storage.users_path, &cfg.storage.access_log_path);
    store.ensure_seed_admin("admin123")?;

    match action {
        UserAction::Add {
            username,
            password,
            name,
            role,
        } => {
            let display = if name.is_empty() { username.clone() } else { name };
            if store.create_user(&username, &password, &display, &role)? {
                println!("created user {username}");
            } else {
                println!("user {username} already exists");
            }
        }
        UserAction::List => {
            for (username, entry) in store.list_users()? {
                println!(
                    "{username}\trole={}\tenabled={}\tcreated={}",
                    entry.role, entry.enabled, entry.created_at
                );
            }
        }
        UserAction::Enable { username } => {
            if store.set_enabled(&username, true)? {
                println!("enabled {username}");
            } else {
                println!("no such user: {username}");
            }
        }
        UserAction::Disable { username } => {
            if store.set_enabled(&username, false)? {
                println!("disabled {username}");
            } else {
                println!("cannot disable {username}");
            }
        }
    }
    Ok(())
}
