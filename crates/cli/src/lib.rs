use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use supply_search::{
    load_or_empty, refresh, DatasetStore, Lexicon, MappingSource, Normalizer, QueryResolver,
    SharedMappingTable,
};

mod config;
mod http_api;
mod mapping_client;
mod mapping_server;
mod server_security;

pub use config::{ConfigOverrides, FinderConfig, MappingLocation};
pub use mapping_client::HttpMappingSource;

#[derive(Parser)]
#[command(name = "supply-finder")]
#[command(about = "Resolve supply-chain questions to structured datasets", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Config file (default: ./supply-finder.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Dataset directory (env: SUPPLY_FINDER_DATABASE_DIR)
    #[arg(long, global = true)]
    database_dir: Option<PathBuf>,

    /// Mapping service URL (env: SUPPLY_FINDER_MAPPING_URL)
    #[arg(long, global = true)]
    mapping_url: Option<String>,

    /// Read the mapping from a local JSON file instead of the mapping service
    /// (env: SUPPLY_FINDER_MAPPING_FILE)
    #[arg(long, global = true)]
    mapping_file: Option<PathBuf>,

    /// Lexicon resource overriding stopwords and lemmas (env: SUPPLY_FINDER_LEXICON)
    #[arg(long, global = true)]
    lexicon: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve one query and print the result as JSON
    Resolve(ResolveArgs),

    /// Serve the retrieval API over HTTP (GET /supply-chain-data?query=...)
    ServeHttp(ServeArgs),

    /// Serve a mapping file over HTTP (GET /mapping)
    ServeMapping(ServeMappingArgs),

    /// Print the LLM tool definition for the retrieval operation
    #[command(name = "tool-schema")]
    ToolSchema,
}

#[derive(Args)]
struct ResolveArgs {
    /// Free-text question about a supply-chain activity
    query: String,

    /// Print per-activity scores instead of the dataset
    #[arg(long)]
    explain: bool,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,
}

#[derive(Args)]
struct ServeArgs {
    /// Bind address (default: 127.0.0.1:5000)
    #[arg(long)]
    bind: Option<String>,

    /// Allow binding to non-loopback addresses
    #[arg(long)]
    public: bool,

    /// Re-fetch the mapping every N seconds
    #[arg(long)]
    refresh_secs: Option<u64>,
}

#[derive(Args)]
struct ServeMappingArgs {
    /// Bind address (default: 127.0.0.1:5001)
    #[arg(long)]
    bind: Option<String>,

    /// Allow binding to non-loopback addresses
    #[arg(long)]
    public: bool,

    /// Mapping JSON file to serve
    #[arg(long)]
    file: Option<PathBuf>,
}

fn print_stdout(text: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<()> {
    let raw = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    print_stdout(&raw)
}

fn init_logging(verbose: bool, quiet: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    // hyper/reqwest are noisy at debug
    if !verbose {
        builder.filter_module("hyper", log::LevelFilter::Warn);
        builder.filter_module("reqwest", log::LevelFilter::Warn);
    }
    builder.target(env_logger::Target::Stderr).init();
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let overrides = ConfigOverrides {
        config: cli.config.clone(),
        database_dir: cli.database_dir.clone(),
        mapping_url: cli.mapping_url.clone(),
        mapping_file: cli.mapping_file.clone(),
        lexicon: cli.lexicon.clone(),
    };

    match cli.command {
        Commands::ToolSchema => run_tool_schema()?,
        Commands::Resolve(args) => run_resolve(args, FinderConfig::load(&overrides)?).await?,
        Commands::ServeHttp(args) => serve_http(args, FinderConfig::load(&overrides)?).await?,
        Commands::ServeMapping(args) => {
            serve_mapping(args, FinderConfig::load(&overrides)?).await?
        }
    }

    Ok(())
}

/// Build the long-lived resources and a resolver over them.
pub async fn build_resolver(
    cfg: &FinderConfig,
    source: &dyn MappingSource,
) -> Result<QueryResolver> {
    let lexicon = match &cfg.lexicon {
        Some(path) => Lexicon::from_path(path)
            .with_context(|| format!("Failed to load lexicon {}", path.display()))?,
        None => Lexicon::english(),
    };
    let normalizer = Arc::new(Normalizer::new(Arc::new(lexicon)));
    let table = load_or_empty(source).await;

    if !cfg.database_dir.is_dir() {
        log::warn!(
            "Dataset directory {} does not exist; every match will be skipped",
            cfg.database_dir.display()
        );
    }
    log::info!(
        "Retriever ready with database folder: {}",
        cfg.database_dir.display()
    );

    Ok(QueryResolver::new(
        normalizer,
        Arc::new(SharedMappingTable::new(table)),
        DatasetStore::new(cfg.database_dir.clone()),
    ))
}

fn run_tool_schema() -> Result<()> {
    let definition = supply_protocol::tool_definition()?;
    print_json(&definition, true)
}

async fn run_resolve(args: ResolveArgs, cfg: FinderConfig) -> Result<()> {
    let source = mapping_client::mapping_source(&cfg)?;
    let resolver = build_resolver(&cfg, source.as_ref()).await?;

    if args.explain {
        return print_json(&resolver.explain(&args.query), args.pretty);
    }

    let query = args.query;
    let result = tokio::task::spawn_blocking(move || resolver.resolve(&query))
        .await
        .context("Resolution task failed")?;
    print_json(&result, args.pretty)
}

async fn serve_http(args: ServeArgs, cfg: FinderConfig) -> Result<()> {
    let bind = args.bind.unwrap_or_else(|| cfg.server_bind.clone());
    let addrs = server_security::resolve_guarded_bind_addrs(&bind, args.public).await?;

    let refresh_interval = match args.refresh_secs {
        Some(0) => anyhow::bail!("--refresh-secs must be greater than zero"),
        Some(secs) => Some(std::time::Duration::from_secs(secs)),
        None => cfg.refresh_interval,
    };

    let source = mapping_client::mapping_source(&cfg)?;
    let resolver = build_resolver(&cfg, source.as_ref()).await?;

    if let Some(interval) = refresh_interval {
        let shared = Arc::clone(resolver.mapping());
        let source = Arc::clone(&source);
        log::info!("Refreshing mapping every {}s", interval.as_secs());
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately; the table was just loaded.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(err) = refresh(&shared, source.as_ref()).await {
                    log::debug!("Keeping previous mapping after failed refresh: {err}");
                }
            }
        });
    }

    let app = http_api::retrieval_router(resolver);
    let listener = server_security::bind_listener(&bind, &addrs).await?;
    let base_url = format!("http://{}", listener.local_addr()?);

    log::info!("Starting retrieval service on {base_url}");
    print_stdout(&format!(
        "Serving retrieval API: {base_url}{}",
        http_api::DATA_ROUTE
    ))?;
    print_stdout(&format!(
        "Try: curl '{base_url}{}?query=inventory%20levels'",
        http_api::DATA_ROUTE
    ))?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn serve_mapping(args: ServeMappingArgs, cfg: FinderConfig) -> Result<()> {
    let bind = args.bind.unwrap_or_else(|| cfg.mapping_server_bind.clone());
    let addrs = server_security::resolve_guarded_bind_addrs(&bind, args.public).await?;

    let file = args.file.unwrap_or_else(|| cfg.mapping_server_file.clone());
    if !file.is_file() {
        log::warn!(
            "Mapping file {} does not exist yet; requests will fail until it does",
            file.display()
        );
    }

    let app = mapping_server::mapping_router(file.clone());
    let listener = server_security::bind_listener(&bind, &addrs).await?;
    let base_url = format!("http://{}", listener.local_addr()?);

    log::info!("Starting mapping service on {base_url} for {}", file.display());
    print_stdout(&format!(
        "Serving mapping: {base_url}{}",
        mapping_server::MAPPING_ROUTE
    ))?;
    axum::serve(listener, app).await?;
    Ok(())
}
