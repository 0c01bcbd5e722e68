//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use leadscout_core::{
    ChannelObserver, EnrichOutcome, PipelineUpdate, Progress, RunOutcome, Session, export,
};
use leadscout_shared::{
    AppConfig, Campaign, LeadRecord, LogEvent, PipelineSettings, SearchRequest, Severity,
    init_config, load_config,
};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// LeadScout: discover and enrich sales leads.
#[derive(Parser)]
#[command(
    name = "leadscout",
    version,
    about = "Discover prospective customers for a campaign and deep-profile them.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Who the campaign targets.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum Mode {
    /// Companies matching a market segment.
    #[value(alias = "organization")]
    Org,
    /// People posting about a topic.
    Individual,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run a discovery campaign.
    Run(RunArgs),

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args)]
pub(crate) struct RunArgs {
    /// Campaign mode.
    #[arg(long, value_enum, default_value = "org")]
    pub mode: Mode,

    /// Industry, niche or topic to search.
    #[arg(long)]
    pub subject: String,

    /// Geographic scope.
    #[arg(long)]
    pub location: String,

    /// Target number of leads (defaults to the config value).
    #[arg(long)]
    pub count: Option<u32>,

    /// Output language (defaults to the config value).
    #[arg(long)]
    pub language: Option<String>,

    /// Product being pitched (organization campaigns).
    #[arg(long)]
    pub product: Option<String>,

    /// Decision-maker role to target (individual campaigns).
    #[arg(long)]
    pub role: Option<String>,

    /// Extra search criteria (individual campaigns).
    #[arg(long)]
    pub keywords: Option<String>,

    /// Enrich every discovered lead after the run completes.
    #[arg(long)]
    pub enrich: bool,

    /// Write results as JSON to this file, or into this directory.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Pause between committed leads, in milliseconds.
    #[arg(long)]
    pub delay_ms: Option<u64>,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "leadscout=info",
        1 => "leadscout=debug",
        _ => "leadscout=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run(args) => cmd_run(args).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

async fn cmd_run(args: RunArgs) -> Result<()> {
    let config = load_config()?;
    let request = build_request(&args, &config);

    let mut settings = PipelineSettings::from(&config);
    if let Some(ms) = args.delay_ms {
        settings.stream_delay = std::time::Duration::from_millis(ms);
    }

    let (observer, updates) = ChannelObserver::new();
    let session = Session::from_config(&config, settings, Some(Arc::new(observer)))?;
    let renderer = spawn_renderer(updates, request.count)?;

    info!(
        mode = %request.mode(),
        subject = %request.subject,
        location = %request.location,
        count = request.count,
        "starting campaign"
    );

    let outcome = session.start(request).await;
    if let (Ok(RunOutcome::Completed { .. }), true) = (&outcome, args.enrich) {
        let results = session.enrich_pending(args.product.clone()).await;
        let enriched = results
            .iter()
            .filter(|(_, r)| matches!(r, Ok(EnrichOutcome::Enriched)))
            .count();
        info!(requested = results.len(), enriched, "enrichment finished");
    }

    let snapshot = session.snapshot().await;
    let progress = snapshot.progress();

    // Closing the session ends the update stream.
    drop(session);
    renderer
        .await
        .map_err(|e| eyre!("progress renderer failed: {e}"))?;

    let outcome = outcome?;
    print_summary(&snapshot.leads, &progress, &outcome);

    if let Some(target) = &args.export {
        let path = export_path(target);
        let rows = export::write_export(&snapshot.leads, &path)?;
        println!("  Exported {rows} leads to {}", path.display());
        println!();
    }

    match outcome {
        RunOutcome::Failed { error, .. } => Err(eyre!("campaign failed: {error}")),
        _ => Ok(()),
    }
}

fn build_request(args: &RunArgs, config: &AppConfig) -> SearchRequest {
    let campaign = match args.mode {
        Mode::Org => Campaign::Organization {
            product_context: args.product.clone(),
        },
        Mode::Individual => Campaign::Individual {
            target_role: args.role.clone(),
            keywords: args.keywords.clone(),
        },
    };

    SearchRequest::new(
        campaign,
        args.subject.clone(),
        args.location.clone(),
        args.count.unwrap_or(config.defaults.count),
    )
    .with_language(
        args.language
            .clone()
            .unwrap_or_else(|| config.defaults.language.clone()),
    )
}

/// A directory target gets the dated default file name.
fn export_path(target: &Path) -> PathBuf {
    if target.is_dir() {
        target.join(export::default_file_name(chrono::Local::now().date_naive()))
    } else {
        target.to_path_buf()
    }
}

// ---------------------------------------------------------------------------
// Live progress
// ---------------------------------------------------------------------------

/// Render pipeline updates with an indicatif bar until the stream closes.
fn spawn_renderer(
    mut updates: UnboundedReceiver<PipelineUpdate>,
    target: u32,
) -> Result<JoinHandle<()>> {
    let bar = ProgressBar::new(u64::from(target));
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=> ")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    bar.enable_steady_tick(std::time::Duration::from_millis(80));

    Ok(tokio::spawn(async move {
        while let Some(update) = updates.recv().await {
            match update {
                PipelineUpdate::Phase(phase) => bar.set_message(phase.to_string()),
                PipelineUpdate::LeadAdded(_) => bar.inc(1),
                PipelineUpdate::LeadUpdated(lead) => {
                    bar.set_message(format!("{}: {}", lead.name, lead.status()));
                }
                PipelineUpdate::Log(event) => bar.println(format_event(&event)),
                PipelineUpdate::Finished(_) => bar.set_message("done"),
                PipelineUpdate::Reset { .. } => bar.reset(),
            }
        }
        bar.finish_and_clear();
    }))
}

fn format_event(event: &LogEvent) -> String {
    let tag = match event.severity {
        Severity::Info => "INFO",
        Severity::Success => " OK ",
        Severity::Warning => "WARN",
        Severity::Error => "FAIL",
    };
    format!(
        "  {} [{tag}] {}",
        event.timestamp.format("%H:%M:%S"),
        event.message
    )
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

fn print_summary(leads: &[LeadRecord], progress: &Progress, outcome: &RunOutcome) {
    println!();
    match outcome {
        RunOutcome::Completed { leads } => println!("  Campaign completed: {leads} leads."),
        RunOutcome::Failed { error, leads } => {
            println!("  Campaign failed after {leads} leads: {error}")
        }
        RunOutcome::Superseded => println!("  Campaign was reset before it finished."),
    }
    println!(
        "  Progress: {}% of {}   Contact rate: {}% ({} with a contact channel)",
        progress.progress_percent,
        progress.target,
        progress.enrichment_rate,
        progress.records_with_contact
    );
    println!();

    if leads.is_empty() {
        return;
    }

    let width = leads
        .iter()
        .map(|l| l.name.chars().count())
        .max()
        .unwrap_or(0)
        .clamp(4, 40);

    println!("  {:<width$}  {:>5}  {:<7}  {:<10}  SOURCE", "NAME", "SCORE", "CONTACT", "STATUS");
    for lead in leads {
        let name: String = lead.name.chars().take(width).collect();
        let contact = if lead.has_contact_channel() { "yes" } else { "-" };
        println!(
            "  {name:<width$}  {:>5}  {contact:<7}  {:<10}  {}",
            lead.quality_score,
            lead.status().as_str(),
            lead.source_url
        );
    }
    println!();
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
