//! travis-chart CLI - Travis-CI build chart for GitHub repositories

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use travis_chart::{
    chart::HtmlChartFactory,
    controller::{ChartController, ShowOutcome},
    git,
    page::{parse_github_repo, RepoSlug, StaticPage, UiEvent, HEADER_LABEL},
    series,
    store::FileStore,
    travis::{BuildFeed, FeedConfig, TravisClient, DEFAULT_API_BASE, DEFAULT_WEB_BASE},
    visibility::{Visibility, VisibilityStore},
};

/// travis-chart: recent Travis-CI builds of a GitHub repository as a chart
#[derive(Parser, Debug)]
#[command(name = "travis-chart")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Base URL of the build history API
    #[arg(long, global = true, env = "TRAVIS_CHART_API_BASE", default_value = DEFAULT_API_BASE)]
    api_base: String,

    /// Base URL of the Travis-CI web interface
    #[arg(long, global = true, env = "TRAVIS_CHART_WEB_BASE", default_value = DEFAULT_WEB_BASE)]
    web_base: String,

    /// File holding the persisted chart visibility
    #[arg(long, global = true, env = "TRAVIS_CHART_STATE_FILE", default_value = ".travis-chart/state.json")]
    state_file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch builds and render the chart page
    Show(ChartArgs),

    /// Collapse or reveal the chart, rendering it if revealed for the first time
    Toggle(ChartArgs),

    /// Print the ten-column series
    Series(SeriesArgs),

    /// Show the persisted chart visibility
    State,
}

#[derive(Parser, Debug)]
struct ChartArgs {
    /// Repository (owner/repo or GitHub URL); defaults to the origin remote
    #[arg(short, long)]
    repo: Option<String>,

    /// Output directory for the chart page
    #[arg(short, long, default_value = "travis-chart")]
    output_dir: PathBuf,

    /// Chart width in pixels
    #[arg(long, default_value = "980")]
    width: u32,
}

#[derive(Parser, Debug)]
struct SeriesArgs {
    /// Repository (owner/repo or GitHub URL); defaults to the origin remote
    #[arg(short, long)]
    repo: Option<String>,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    format: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    let feed_config = FeedConfig {
        api_base: cli.api_base.clone(),
        web_base: cli.web_base.clone(),
    };

    match cli.command {
        Commands::Show(ref args) => show_command(&cli, feed_config, args).await,
        Commands::Toggle(ref args) => toggle_command(&cli, feed_config, args).await,
        Commands::Series(ref args) => series_command(feed_config, args).await,
        Commands::State => state_command(&cli),
    }
}

/// Resolve the repository from the argument or the current checkout
fn resolve_repo(arg: Option<&str>) -> Result<Option<RepoSlug>> {
    if let Some(repo) = arg {
        return Ok(Some(parse_github_repo(repo)?));
    }

    let cwd = std::env::current_dir()?;
    match git::detect_repository(&cwd) {
        Ok(slug) => Ok(slug),
        Err(e) => {
            debug!("No git repository at {:?}: {}", cwd, e);
            Ok(None)
        }
    }
}

type CliController = ChartController<StaticPage, FileStore, HtmlChartFactory>;

/// Page load: build the controller and show the chart for the first time
async fn load_page(
    cli: &Cli,
    feed_config: FeedConfig,
    args: &ChartArgs,
) -> Result<(CliController, ShowOutcome)> {
    let repo = resolve_repo(args.repo.as_deref())?;
    let label = repo.as_ref().map(|r| r.to_string()).unwrap_or_default();

    let store = FileStore::open(&cli.state_file)
        .with_context(|| format!("Failed to open state file: {:?}", cli.state_file))?;
    let page = StaticPage::new(repo).with_width(args.width);
    let factory = HtmlChartFactory::new(&args.output_dir, label);
    let client = TravisClient::new(feed_config).with_context(|| "Failed to create Travis-CI client")?;

    let mut controller = ChartController::new(page, store, factory);
    let outcome = controller.show_chart(&client, true).await;
    Ok((controller, outcome))
}

fn report(outcome: ShowOutcome, args: &ChartArgs) {
    match outcome {
        ShowOutcome::NotApplicable => warn!("No GitHub repository given or detected"),
        ShowOutcome::NoBuilds => info!("Repository has no Travis-CI builds"),
        ShowOutcome::Failed => warn!("Could not load Travis-CI builds"),
        ShowOutcome::Rendered => info!("Chart written to {:?}", args.output_dir.join("index.html")),
        ShowOutcome::Hidden => info!("Chart is collapsed; run `travis-chart toggle` to reveal it"),
    }
}

/// Render the chart page
async fn show_command(cli: &Cli, feed_config: FeedConfig, args: &ChartArgs) -> Result<()> {
    let (_, outcome) = load_page(cli, feed_config, args).await?;
    report(outcome, args);
    Ok(())
}

/// Simulate a header click after the page load
async fn toggle_command(cli: &Cli, feed_config: FeedConfig, args: &ChartArgs) -> Result<()> {
    let (mut controller, outcome) = load_page(cli, feed_config, args).await?;
    if !matches!(outcome, ShowOutcome::Rendered | ShowOutcome::Hidden) {
        report(outcome, args);
        return Ok(());
    }

    match controller
        .on_header_click(&UiEvent::on(HEADER_LABEL))
        .with_context(|| "Failed to toggle chart")?
    {
        Some(Visibility::Hidden) => info!("Chart collapsed"),
        Some(Visibility::Visible) => {
            info!("Chart revealed at {:?}", args.output_dir.join("index.html"))
        }
        None => debug!("Toggle ignored"),
    }

    Ok(())
}

/// Print the series without touching the page state
async fn series_command(feed_config: FeedConfig, args: &SeriesArgs) -> Result<()> {
    let repo = resolve_repo(args.repo.as_deref())?
        .ok_or_else(|| anyhow::anyhow!("No GitHub repository given or detected"))?;

    let client = TravisClient::new(feed_config)?;
    let builds = client
        .fetch_builds(&repo)
        .await
        .with_context(|| format!("Failed to fetch builds for {}", repo))?;

    let series = series::assemble(&builds, Utc::now());

    match args.format.as_str() {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&series)?);
        }
        _ => {
            println!("## {} ({} builds)\n", repo, series.real_count());
            for (column, point) in series.points().iter().enumerate() {
                let link = series
                    .resolve_click(column)
                    .and_then(|idx| builds.get(idx).and_then(|b| b.id))
                    .map(|id| client.build_url(&repo, id))
                    .unwrap_or_default();
                let color = point.color.map(|c| format!("{:?}", c)).unwrap_or_default();
                println!(
                    "  {:>2} {:<14} {:>7.2} min  {:<8} {}",
                    column, point.label, point.value_minutes, color, link
                );
            }
        }
    }

    Ok(())
}

/// Show the persisted chart visibility
fn state_command(cli: &Cli) -> Result<()> {
    let store = FileStore::open(&cli.state_file)
        .with_context(|| format!("Failed to open state file: {:?}", cli.state_file))?;
    let state = VisibilityStore::new(store);

    match state.load() {
        Visibility::Visible => println!("visible"),
        Visibility::Hidden => println!("hidden"),
    }

    Ok(())
}
