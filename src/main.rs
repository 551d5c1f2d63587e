//! Carve CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{AnalysisOverrides, ExtractOverrides, UnitArg};

#[derive(Parser)]
#[command(name = "carve")]
#[command(about = "Find extractable modules in a JVM monolith from its compiled classes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to ./carve.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory for unit tables, aggregated tables and reports
    #[arg(short, long, global = true, default_value = carve_core::OUTPUT_DIR)]
    out: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the dependency tables of one compilation unit
    Extract {
        /// Module identifier of the unit
        #[arg(short, long)]
        module: String,

        /// Class output directories of the unit
        #[arg(long = "classes", required = true, num_args = 1..)]
        classes: Vec<PathBuf>,

        #[command(flatten)]
        overrides: ExtractOverrides,
    },
    /// Merge every extracted unit into one graph
    Aggregate,
    /// Cluster the aggregated graph into module candidates
    Analyze {
        #[command(flatten)]
        overrides: AnalysisOverrides,
    },
    /// Extract, aggregate and analyze in one go
    Run {
        /// Units as `<module>=<classes dir>`, repeatable
        #[arg(short, long = "unit", required = true, value_parser = commands::parse_unit)]
        units: Vec<UnitArg>,

        #[command(flatten)]
        extract: ExtractOverrides,

        #[command(flatten)]
        analysis: AnalysisOverrides,
    },
    /// Remove the output directory
    Clear,
    /// Show version
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!("carve={}", log_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::debug!("Carve v{}", env!("CARGO_PKG_VERSION"));
    tracing::debug!("Output directory: {}", cli.out.display());

    match cli.command {
        Commands::Extract { module, classes, overrides } => {
            let config = commands::load_config(cli.config.as_deref(), &overrides, &AnalysisOverrides::default())?;
            commands::extract(&cli.out, &config, &module, &classes).map(|_| ())
        }
        Commands::Aggregate => commands::aggregate(&cli.out).map(|_| ()),
        Commands::Analyze { overrides } => {
            let config = commands::load_config(cli.config.as_deref(), &ExtractOverrides::default(), &overrides)?;
            commands::analyze(&cli.out, &config)
        }
        Commands::Run { units, extract, analysis } => {
            let config = commands::load_config(cli.config.as_deref(), &extract, &analysis)?;
            commands::run(&cli.out, &config, &units)
        }
        Commands::Clear => commands::clear(&cli.out),
        Commands::Version => {
            println!("Carve v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
