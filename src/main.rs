use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use braid::config::Config;
use braid::directory::DirectoryClient;
use braid::feed::FeedFetcher;
use braid::resolve::Resolver;
use braid::search::{ReconciledEntry, SearchSession};
use braid::storage::{Database, DatabaseError, FeedKind};

/// Get the config directory path (~/.config/braid/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("braid"))
}

#[derive(Parser, Debug)]
#[command(name = "braid", about = "Search a feed directory and manage subscriptions")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search followed feeds and the remote directory
    Search {
        /// Search query
        query: String,

        /// Feed kind to search the directory for (podcast, video, newsletter).
        /// Without a kind, only followed feeds are searched.
        #[arg(long)]
        kind: Option<FeedKind>,
    },

    /// Subscribe to a feed by URL
    Subscribe {
        /// Feed URL
        url: String,

        /// Feed kind (podcast, video, newsletter)
        #[arg(long, default_value = "podcast")]
        kind: FeedKind,
    },

    /// Unsubscribe from a feed by URL
    Unsubscribe {
        /// Feed URL
        url: String,
    },

    /// List followed feeds
    List {
        /// Only show feeds of this kind
        #[arg(long)]
        kind: Option<FeedKind>,
    },
}

fn print_group(heading: &str, entries: &[ReconciledEntry]) {
    println!("{heading}");
    if entries.is_empty() {
        println!("  (none)");
        return;
    }
    for entry in entries {
        match entry.description() {
            Some(description) => {
                println!("  {} — {}", entry.title(), entry.identity());
                println!("      {description}");
            }
            None => println!("  {} — {}", entry.title(), entry.identity()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
    }

    let config = Config::load(&config_dir.join("config.toml")).context("Failed to load config")?;

    let db_path = config
        .database_path
        .clone()
        .unwrap_or_else(|| config_dir.join("braid.db").display().to_string());

    let db = match Database::open(&db_path).await {
        Ok(db) => db,
        Err(DatabaseError::InstanceLocked) => {
            eprintln!(
                "Error: Another instance of braid appears to be running. Please close it and try again."
            );
            std::process::exit(1);
        }
        Err(e) => {
            return Err(anyhow::anyhow!("Failed to open database: {}", e));
        }
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .user_agent(concat!("braid/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    match args.command {
        Command::Search { query, kind } => {
            let directory = DirectoryClient::new(client, &config.directory_url)
                .context("Invalid directory URL in config")?;
            let session = SearchSession::new(db, directory);

            // A single CLI invocation runs exactly one query, so it can
            // never be superseded.
            let outcome = session
                .search(&query, kind)
                .await
                .context("Search failed")?
                .context("Search was superseded")?;

            print_group("Following", &outcome.results.following);
            println!();
            print_group("Directory", &outcome.results.directory);

            if let Some(e) = outcome.directory_error {
                println!();
                println!("note: directory search unavailable ({e}); showing followed feeds only");
            }
            if kind.is_none() {
                println!();
                println!("note: pass --kind to also search the remote directory");
            }
        }

        Command::Subscribe { url, kind } => {
            let resolver = Resolver::new(db, FeedFetcher::new(client));
            let feed = resolver
                .subscribe(&url, kind)
                .await
                .context("Failed to subscribe")?;
            println!("Subscribed: {} — {}", feed.title, feed.url);
        }

        Command::Unsubscribe { url } => {
            if db.remove_feed(&url).await.context("Failed to unsubscribe")? {
                println!("Unsubscribed: {url}");
            } else {
                println!("Not subscribed: {url}");
            }
        }

        Command::List { kind } => {
            let feeds = db.all_feeds(kind).await.context("Failed to list feeds")?;
            if feeds.is_empty() {
                println!("No followed feeds.");
            } else {
                for feed in feeds {
                    println!("[{}] {} — {}", feed.kind, feed.title, feed.url);
                }
            }
        }
    }

    Ok(())
}
