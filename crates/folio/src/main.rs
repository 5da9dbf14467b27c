use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use folio::config::Config;
use folio::demo;
use folio::state::{open_cache, open_stores, Repositories};
use folio_core::cache::{CacheKeyBuilder, KeyPart, Namespace};

/// Folio - Versioned caching for content repositories
#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Disable read caching
    #[arg(long, global = true)]
    no_cache: bool,

    /// Invalidate by version bump even when the backend supports tags
    #[arg(long, global = true)]
    no_tags: bool,

    /// Cache TTL in seconds
    #[arg(long, global = true)]
    ttl: Option<u64>,

    /// Cache key prefix
    #[arg(long, global = true)]
    prefix: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true, env = "LOG_JSON")]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Seed demo content and walk through a read/write/read cycle
    Demo,

    /// Print the cache keys for a repository call
    Keys {
        /// Entity namespace, e.g. Post
        namespace: String,

        /// Repository method, e.g. paginate
        method: String,

        /// Scalar arguments, in call order
        args: Vec<String>,

        /// Namespace version to render
        #[arg(long, short, default_value = "1")]
        version: u64,
    },
}

impl Cli {
    fn config(&self) -> Config {
        let mut config = Config::from_env();
        if self.no_cache {
            config.cache_enabled = false;
        }
        if self.no_tags {
            config.cache_use_tags = false;
        }
        if let Some(ttl) = self.ttl {
            config.cache_ttl_seconds = ttl;
        }
        if let Some(prefix) = &self.prefix {
            config.cache_prefix = prefix.clone();
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json);

    let config = cli.config();

    match &cli.command {
        Command::Demo => run_demo(&config, cli.json).await,
        Command::Keys {
            namespace,
            method,
            args,
            version,
        } => {
            let keys = CacheKeyBuilder::new(&config.cache_prefix, Namespace::new(namespace));
            let args: Vec<KeyPart> = args.iter().map(|a| KeyPart::from(a.as_str())).collect();

            println!("key:     {}", keys.versioned_key(method, &args, *version));
            println!("version: {}", keys.version_key());
            println!("tag:     {}", keys.tag());
            Ok(())
        }
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "folio=debug".into());

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run_demo(config: &Config, json: bool) -> Result<()> {
    tracing::info!(
        enabled = config.cache_enabled,
        ttl = config.cache_ttl_seconds,
        prefix = %config.cache_prefix,
        tags = config.cache_use_tags,
        "Starting demo"
    );

    let cache = open_cache(config).await?;
    let stores = open_stores(config).await?;
    let repos = Repositories::build(stores, cache, config.cache_settings())?;

    demo::seed(&repos).await?;
    let steps = demo::walkthrough(&repos).await?;

    println!("{}", demo::render(&steps, json)?);

    Ok(())
}
