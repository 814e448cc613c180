//! Reader Paste agent
//!
//! Attaches website content to a chat composer running in a Chromium tab.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use reader_paste::browser::{BrowserConfig, BrowserController};
use reader_paste::config::{
    AgentConfig, DEFAULT_HOST_MARKER, DEFAULT_HOST_URL, DEFAULT_READER_ENDPOINT,
    DEFAULT_RESOLVER_ENDPOINT,
};
use reader_paste::extraction::{
    DohResolver, DomainResolver, HttpReader, LinkScanner, SkipResolution,
};
use reader_paste::host::CdpHost;
use reader_paste::ledger::Ledger;
use reader_paste::metrics::PipelineStats;
use reader_paste::pipeline::Pipeline;
use reader_paste::status::AgentStatus;
use reader_paste::watcher::Lifecycle;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Reader Paste agent
#[derive(Parser, Debug)]
#[command(name = "rp-web")]
#[command(version)]
#[command(about = "Attach website content to a chat composer as text files")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open the host page and watch the composer until Ctrl-C
    Run(RunArgs),
    /// Print the URLs the scanner would accept in TEXT
    Scan {
        /// Text to scan
        text: String,

        /// Also check each domain against the resolver
        #[arg(long)]
        resolve: bool,

        /// Domain resolution endpoint
        #[arg(long, env = "READER_PASTE_RESOLVER", default_value = DEFAULT_RESOLVER_ENDPOINT)]
        resolver_endpoint: String,
    },
    /// Print the status report for a page address as JSON
    Status {
        /// Page address
        address: String,

        /// Address fragment identifying the host application
        #[arg(long, env = "READER_PASTE_HOST_MARKER", default_value = DEFAULT_HOST_MARKER)]
        host_marker: String,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// DevTools websocket URL of a running browser (launches one if omitted)
    #[arg(long, env = "READER_PASTE_CONNECT")]
    connect: Option<String>,

    /// Host page to open when no host tab is found
    #[arg(long, env = "READER_PASTE_HOST_URL", default_value = DEFAULT_HOST_URL)]
    host_url: String,

    /// Address fragment identifying the host application
    #[arg(long, env = "READER_PASTE_HOST_MARKER", default_value = DEFAULT_HOST_MARKER)]
    host_marker: String,

    /// Reader service base URL
    #[arg(long, env = "READER_PASTE_READER", default_value = DEFAULT_READER_ENDPOINT)]
    reader_endpoint: String,

    /// Domain resolution endpoint
    #[arg(long, env = "READER_PASTE_RESOLVER", default_value = DEFAULT_RESOLVER_ENDPOINT)]
    resolver_endpoint: String,

    /// Path to Chrome/Chromium executable
    #[arg(long, env = "READER_PASTE_CHROME")]
    chrome_path: Option<String>,

    /// Browser profile directory
    #[arg(long, env = "READER_PASTE_PROFILE")]
    user_data_dir: Option<String>,

    /// Run the launched browser headless
    #[arg(long)]
    headless: bool,

    /// Disable the Chromium sandbox
    #[arg(long)]
    no_sandbox: bool,
}

impl RunArgs {
    fn agent_config(&self) -> AgentConfig {
        AgentConfig::builder()
            .host_marker(self.host_marker.clone())
            .reader_endpoint(self.reader_endpoint.clone())
            .resolver_endpoint(self.resolver_endpoint.clone())
            .build()
    }

    fn browser_config(&self) -> BrowserConfig {
        let mut builder = BrowserConfig::builder()
            .headless(self.headless)
            .sandbox(!self.no_sandbox);
        if let Some(ref url) = self.connect {
            builder = builder.connect_url(url.clone());
        }
        if let Some(ref path) = self.chrome_path {
            builder = builder.chrome_path(path.clone());
        }
        if let Some(ref dir) = self.user_data_dir {
            builder = builder.user_data_dir(dir.clone());
        }
        builder.build()
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Run(args) => run(args).await,
        Command::Scan {
            text,
            resolve,
            resolver_endpoint,
        } => scan(&text, resolve, resolver_endpoint).await,
        Command::Status {
            address,
            host_marker,
        } => {
            let report = AgentStatus::for_address(&address, &host_marker);
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    let config = args.agent_config();
    tracing::info!("Reader Paste {} starting", reader_paste::VERSION);

    let mut controller = BrowserController::with_config(args.browser_config())
        .await
        .context("browser unavailable")?;
    let page = controller
        .open_host(&args.host_url, &config.host_marker)
        .await
        .context("could not open the host page")?;
    tracing::info!("Watching {}", page.url().await);

    let client = reqwest::Client::new();
    let host = Arc::new(CdpHost::new(page));
    let pipeline = Pipeline::from_config(
        host.clone(),
        Arc::new(DohResolver::new(client.clone(), config.resolver_endpoint.clone())),
        Arc::new(HttpReader::new(client, config.reader_endpoint.clone())),
        &config,
        Arc::new(PipelineStats::new()),
    );

    let lifecycle = Lifecycle::new(host, Arc::new(pipeline), config);
    let stats = lifecycle
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl-C: {}", e);
            }
        })
        .await;

    tracing::info!("Session statistics: {}", serde_json::to_string(&stats)?);
    controller.close().await?;
    Ok(())
}

async fn scan(text: &str, resolve: bool, resolver_endpoint: String) -> anyhow::Result<()> {
    let resolver: Arc<dyn DomainResolver> = if resolve {
        Arc::new(DohResolver::new(reqwest::Client::new(), resolver_endpoint))
    } else {
        Arc::new(SkipResolution)
    };

    let candidates = LinkScanner::new(resolver).scan(text, &Ledger::new()).await;
    println!("{}", serde_json::to_string_pretty(&candidates)?);
    Ok(())
}
