use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use shelf_scout::scrape::{self, ScrapeEvent};
use shelf_scout::{
    ChromeBrowser, Config, PageAnalyzer, RunState, ScrapeOrchestrator, ScrapeRequest, SiteRegistry,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "shelf-scout", version, about = "Adaptive supermarket product scraper")]
struct Cli {
    /// JSON configuration file; missing fields keep their defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// JSON array of site profiles replacing the built-in ones
    #[arg(long, global = true)]
    profiles: Option<PathBuf>,

    /// Directory for screenshots and analysis reports
    #[arg(long, global = true)]
    artifacts: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the known sites and their categories
    Sites,
    /// Scrape one site, category by category
    Scrape(ScrapeArgs),
    /// Inspect a page and suggest container selectors
    Analyze(AnalyzeArgs),
}

#[derive(Args)]
struct ScrapeArgs {
    #[arg(long)]
    site: String,

    /// Category key, repeatable; all categories when omitted
    #[arg(long = "category")]
    categories: Vec<String>,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Do not load images
    #[arg(long)]
    no_images: bool,

    /// Write the collected records as JSON
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct AnalyzeArgs {
    #[arg(long)]
    site: String,

    /// Category whose page is analyzed when no URL is given
    #[arg(long)]
    category: Option<String>,

    #[arg(long)]
    url: Option<String>,

    /// Hide the browser window
    #[arg(long)]
    headless: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(dir) = &cli.artifacts {
        config.artifacts.screenshot_dir = dir.join("debug");
        config.artifacts.report_dir = dir.join("analysis");
    }

    let registry = match &cli.profiles {
        Some(path) => SiteRegistry::from_file(path)
            .with_context(|| format!("loading profiles {}", path.display()))?,
        None => SiteRegistry::builtin(),
    };

    match cli.command {
        Command::Sites => list_sites(&registry),
        Command::Scrape(args) => scrape_site(config, Arc::new(registry), args).await,
        Command::Analyze(args) => analyze_page(config, &registry, args).await,
    }
}

fn list_sites(registry: &SiteRegistry) -> Result<()> {
    for site in registry.sites() {
        println!("{} ({})", site.key, site.name);
        for category in &site.categories {
            println!("  {}", category.key);
        }
    }
    Ok(())
}

async fn scrape_site(
    mut config: Config,
    registry: Arc<SiteRegistry>,
    args: ScrapeArgs,
) -> Result<()> {
    config.browser.headless = !args.headed;
    config.browser.disable_images |= args.no_images;

    let (sink, mut events) = scrape::channel();
    let orchestrator = ScrapeOrchestrator::new(ChromeBrowser::new(), registry, config, sink);
    let (handle, token) = orchestrator.spawn(ScrapeRequest::new(args.site, args.categories));

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("stop requested, finishing the current category");
            token.cancel();
        }
    });

    // log events are already mirrored to tracing by the orchestrator
    while let Some(event) = events.recv().await {
        match event {
            ScrapeEvent::Progress { .. } => {
                if let Some(fraction) = event.fraction() {
                    info!("progress {:.0}%", fraction * 100.0);
                }
            }
            ScrapeEvent::CategoryRecords { category, records } => {
                info!("{}: {} records", category, records.len());
            }
            ScrapeEvent::RunFailed(message) => warn!("run failed: {}", message),
            _ => {}
        }
    }

    let session = handle.await.context("scrape task aborted")??;
    if session.state == RunState::Stopped {
        warn!("run stopped before all categories were processed");
    }

    if let Some(path) = &args.output {
        let json = serde_json::to_string_pretty(&session.records())?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        info!("{} records written to {}", session.record_count(), path.display());
    }
    Ok(())
}

async fn analyze_page(
    mut config: Config,
    registry: &SiteRegistry,
    args: AnalyzeArgs,
) -> Result<()> {
    if args.headless {
        config.analyzer.headless = true;
    }
    let profile = registry.get(&args.site)?;
    let url = PageAnalyzer::resolve_url(profile, args.url.as_deref(), args.category.as_deref())?;

    let mut browser = ChromeBrowser::new();
    let report = PageAnalyzer::new(&config)
        .run(&mut browser, &config, profile, &url)
        .await
        .with_context(|| format!("analyzing {}", url))?;

    println!("{}", report.render());
    if let Some(error) = &report.navigation_error {
        warn!("{} did not load: {}", url, error);
    } else if report.suggestions.is_empty() {
        warn!("no selector suggestions for {}", url);
    }
    Ok(())
}
