//! Campaign generator - Development Tools

use std::path::PathBuf;

use campaign_core::step::GenerationStep;
use campaign_tools::campaign_file::CampaignFile;
use campaign_tools::output::{placement_rows, render, summarize, Format, RunOutput};
use campaign_tools::validate::validate_campaign_file;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "campaign-tools")]
#[command(about = "Run and inspect deterministic campaign generation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RunArgs {
    /// Campaign file (RON)
    input: PathBuf,

    /// Override the config seed
    #[arg(long)]
    seed: Option<u64>,

    /// Output encoding
    #[arg(long, value_enum, default_value_t = Format::Ron)]
    format: Format,

    /// Also list every occupied anchor
    #[arg(long)]
    placements: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build connections only
    Connections(RunArgs),
    /// Run through player HQ placement
    Hq(RunArgs),
    /// Run through enemy HQ placement
    EnemyHq(RunArgs),
    /// Run through enemy wall placement
    Wall(RunArgs),
    /// Run through enemy item placement
    Enemy(RunArgs),
    /// Run through neutral item placement
    Neutral(RunArgs),
    /// Run through mission placement
    Missions(RunArgs),
    /// Run the whole pipeline
    All(RunArgs),
    /// Run the whole pipeline and print a plain-text summary
    Report(RunArgs),
    /// Run the whole pipeline, then erase it and report what is left
    Erase(RunArgs),
    /// Validate a campaign file
    Validate {
        /// Campaign file (RON)
        path: PathBuf,
    },
    /// Print a default campaign file
    Template,
}

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Connections(args) => run(&args, GenerationStep::ConnectionsCreated),
        Commands::Hq(args) => run(&args, GenerationStep::PlayerHqPlaced),
        Commands::EnemyHq(args) => run(&args, GenerationStep::EnemyHqPlaced),
        Commands::Wall(args) => run(&args, GenerationStep::EnemyWallPlaced),
        Commands::Enemy(args) => run(&args, GenerationStep::EnemyObjectsPlaced),
        Commands::Neutral(args) => run(&args, GenerationStep::NeutralObjectsPlaced),
        Commands::Missions(args) => run(&args, GenerationStep::MissionsPlaced),
        Commands::All(args) => run(&args, GenerationStep::Finished),
        Commands::Report(args) => report(&args),
        Commands::Erase(args) => erase(&args),
        Commands::Validate { path } => validate(&path),
        Commands::Template => CampaignFile::default().to_ron_string().map(|text| println!("{text}")),
    };

    if let Err(e) = result {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

fn run(args: &RunArgs, target: GenerationStep) -> campaign_tools::Result<()> {
    let file = CampaignFile::load(&args.input)?;
    let mut generator = file.generator(args.seed)?;
    tracing::info!(%target, "running generation");
    let report = generator.execute_through(target)?;
    let output = RunOutput {
        report,
        placements: args.placements.then(|| placement_rows(&generator)),
    };
    println!("{}", render(&output, args.format)?);
    Ok(())
}

fn report(args: &RunArgs) -> campaign_tools::Result<()> {
    let file = CampaignFile::load(&args.input)?;
    let mut generator = file.generator(args.seed)?;
    let report = generator.execute_all_steps()?;
    println!("{}", summarize(&report));
    Ok(())
}

fn erase(args: &RunArgs) -> campaign_tools::Result<()> {
    let file = CampaignFile::load(&args.input)?;
    let mut generator = file.generator(args.seed)?;
    generator.execute_all_steps()?;
    let spawned = generator.world().live_count();
    generator.erase_all_generation();
    tracing::info!(
        spawned,
        remaining = generator.world().live_count(),
        "generation erased"
    );
    println!("{}", render(&generator.report(), args.format)?);
    Ok(())
}

fn validate(path: &std::path::Path) -> campaign_tools::Result<()> {
    let report = validate_campaign_file(path)?;
    for error in &report.errors {
        tracing::error!("{error}");
    }
    if report.is_ok() {
        tracing::info!("Validation passed");
        Ok(())
    } else {
        std::process::exit(1);
    }
}
