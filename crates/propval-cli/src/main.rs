//! CLI for propval — score propagation predictions against received reports.

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "propval")]
#[command(about = "propval — score VOACAP predictions against WSPR reports")]
#[command(version = propval_core::VERSION)]
struct Cli {
    /// Debug-level logging (RUST_LOG still takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print one field of a prediction report as (hour, frequency, value) rows
    Extract {
        /// Field label, e.g. "SNR", "SNR UP", "REL" (case and spacing ignored)
        field: String,

        /// Only this hour
        #[arg(long)]
        hour: Option<u32>,

        /// Only this frequency (MHz, truncated)
        #[arg(long)]
        frequency: Option<u32>,

        /// Report file
        #[arg(long, default_value = propval_core::config::DEFAULT_REPORT_FILE)]
        input: String,

        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fit the observed split-normal of every hour from one sample file
    Fit {
        /// Sample JSON written by the acquisition tool
        samples: String,

        /// Minimum samples per hour for a split-normal fit
        #[arg(long, default_value = "1")]
        min_samples: usize,

        /// Print the fit as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compare one band and merge it into a circuit aggregate
    Compare {
        /// Prediction report
        #[arg(long)]
        report: String,

        /// Sample JSON for this band
        #[arg(long)]
        samples: String,

        /// Band in MHz (truncated), e.g. 14
        #[arg(long)]
        band: u32,

        /// Aggregate file to create or update
        #[arg(long, default_value = propval_core::config::DEFAULT_OUTPUT_FILE)]
        output: String,

        /// JSON config (offset, minimum samples, fixed threshold)
        #[arg(long)]
        config: Option<String>,

        /// Circuit id, TX_RX (used in log output only)
        #[arg(long, default_value = "TX_RX")]
        circuit: String,
    },

    /// Process every circuit and month under a data directory
    Run {
        /// Directory holding <TX>_<RX>/<month>/ subdirectories
        #[arg(long, default_value = "data")]
        data_dir: String,

        /// JSON config; without circuits every TX_RX directory is processed
        #[arg(long)]
        config: Option<String>,

        /// Comma-separated band override, e.g. "7,14"
        #[arg(long)]
        bands: Option<String>,
    },

    /// Summarize a circuit aggregate
    Summary {
        /// Aggregate file written by compare/run
        path: String,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    commands::init_logging(cli.verbose);

    match cli.command {
        Commands::Extract {
            field,
            hour,
            frequency,
            input,
            json,
        } => commands::extract::run(&field, hour, frequency, &input, json),
        Commands::Fit {
            samples,
            min_samples,
            json,
        } => commands::fit::run(&samples, min_samples, json),
        Commands::Compare {
            report,
            samples,
            band,
            output,
            config,
            circuit,
        } => commands::compare::run(
            &report,
            &samples,
            band,
            &output,
            config.as_deref(),
            &circuit,
        ),
        Commands::Run {
            data_dir,
            config,
            bands,
        } => commands::run::run(&data_dir, config.as_deref(), bands.as_deref()),
        Commands::Summary { path, json } => commands::summary::run(&path, json),
    }
}
