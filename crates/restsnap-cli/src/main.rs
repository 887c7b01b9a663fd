use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use restsnap_core::{
    compile, expand_domains, Collector, EmptyChildren, EndpointDeclaration, HttpClient,
    HttpClientConfig, IdResolver, ResultDocument, WalkOptions,
};

mod config;
mod output;

/// Collect a point-in-time configuration snapshot from a controller's REST API
#[derive(Parser)]
#[command(name = "restsnap")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(long, env = "RESTSNAP_CONFIG")]
    config: Option<String>,

    /// Controller base URL
    #[arg(long, env = "RESTSNAP_URL")]
    url: Option<String>,

    /// API key for bearer authentication
    #[arg(long, env = "RESTSNAP_API_KEY")]
    api_key: Option<String>,

    /// Username for basic authentication
    #[arg(long, env = "RESTSNAP_USERNAME")]
    username: Option<String>,

    /// Password for basic authentication
    #[arg(long, env = "RESTSNAP_PASSWORD")]
    password: Option<String>,

    /// Endpoint declaration file (YAML)
    #[arg(short, long)]
    endpoints: PathBuf,

    /// Output file for the snapshot document
    #[arg(short, long, default_value = "snapshot.json")]
    output: PathBuf,

    /// Compress the output with gzip
    #[arg(long)]
    gzip: bool,

    /// Tenant domain substituted for {DOMAIN_UUID} (repeatable)
    #[arg(long = "domain")]
    domains: Vec<String>,

    /// Identifier key tried when a declaration names none (repeatable, in order)
    #[arg(long = "id-key")]
    id_keys: Vec<String>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Maximum retries for rate-limited or failed requests
    #[arg(long, default_value_t = 5)]
    max_retries: u32,

    /// Fallback wait in seconds when a 429 carries no Retry-After header
    #[arg(long, default_value_t = 60)]
    retry_after: u64,

    /// Skip TLS certificate verification
    #[arg(long)]
    insecure: bool,

    /// Concurrent child fetches per endpoint
    #[arg(long, default_value_t = 1)]
    concurrency: usize,

    /// Drop empty child collections instead of keeping explicit empty entries
    #[arg(long)]
    omit_empty_children: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "restsnap_cli=debug,restsnap_core=debug"
    } else {
        "restsnap_cli=info,restsnap_core=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    // Load configuration; CLI flags and environment win over the file.
    let cfg = config::Config::load(cli.config.as_deref())?;
    let base_url = cli
        .url
        .clone()
        .or(cfg.url.clone())
        .context("controller URL required (--url or config file)")?;

    let client = HttpClient::with_config(HttpClientConfig {
        base_url,
        api_key: cli.api_key.clone().or(cfg.api_key.clone()),
        username: cli.username.clone().or(cfg.username.clone()),
        password: cli.password.clone().or(cfg.password.clone()),
        timeout_secs: cli.timeout,
        max_retries: cli.max_retries,
        retry_after_secs: cli.retry_after,
        insecure: cli.insecure,
    })?;

    if !client.authenticate().await? {
        bail!("authentication failed, not starting traversal");
    }

    let declarations = EndpointDeclaration::load(&cli.endpoints).with_context(|| {
        format!(
            "loading endpoint declarations from {}",
            cli.endpoints.display()
        )
    })?;
    let declarations = expand_domains(&declarations, &cli.domains);
    let nodes = compile(&declarations);
    tracing::info!("compiled {} top-level endpoints", nodes.len());

    let resolver = if cli.id_keys.is_empty() {
        IdResolver::default()
    } else {
        IdResolver::with_fallback(cli.id_keys.clone())
    };
    let collector = Collector::new(client)
        .with_resolver(resolver)
        .with_options(WalkOptions {
            empty_children: if cli.omit_empty_children {
                EmptyChildren::Omit
            } else {
                EmptyChildren::Keep
            },
            concurrency: cli.concurrency,
        });

    let progress = ProgressBar::new(nodes.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} {msg} [{bar:40}] {pos}/{len}")?
            .progress_chars("=> "),
    );
    progress.set_message("Processing endpoints");

    let mut document = ResultDocument::new();
    for node in &nodes {
        collector.collect_into(node, &mut document).await;
        progress.inc(1);
    }
    progress.finish_with_message("done");

    output::write_document(&cli.output, &document, cli.gzip)?;
    tracing::info!("snapshot written to {}", cli.output.display());
    Ok(())
}
