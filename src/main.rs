use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use wafer_aligner::config::{load_config_or_default, ConfigFormat};
use wafer_aligner::data::load_image;
use wafer_aligner::logging::{init_logging, LoggingConfig};
use wafer_aligner::runner::batch_had_fatal_failure;
use wafer_aligner::{AlignError, AlignmentReport, BatchRunner, Config, TracingSink, WaferAligner};

#[derive(Parser)]
#[command(name = "wafer-align")]
#[command(about = "Detects the wafer boundary and flat, then rotates, crops and resizes to a canonical image")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// TOML or JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Align one or more wafer images
    Align {
        /// Input images
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Directory for the aligned_<uuid>.png outputs
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Write the per-image reports as a JSON array
        #[arg(short, long)]
        report: Option<PathBuf>,

        /// Write intermediate debug images under this directory
        #[arg(short, long)]
        artifacts: Option<PathBuf>,
    },

    /// Print the detected circle, flat and angle without writing anything
    Inspect {
        input: PathBuf,
    },

    /// Print the default configuration
    Config {
        #[arg(short, long, value_enum, default_value = "toml")]
        format: FormatArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Toml,
    Json,
}

impl From<FormatArg> for ConfigFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Toml => ConfigFormat::Toml,
            FormatArg::Json => ConfigFormat::Json,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Config { format } = cli.command {
        let text = Config::default()
            .to_string_in(format.into())
            .map_err(|e| anyhow::anyhow!("{}", e))?;
        println!("{}", text);
        return Ok(());
    }

    let (config, config_warnings) = load_config_or_default(cli.config.as_deref());
    let logging = logging_for_verbosity(&config.logging, cli.verbose);
    let _guard = init_logging(&logging)?;
    for warning in &config_warnings {
        tracing::warn!("{}", warning);
    }

    match cli.command {
        Commands::Align {
            inputs,
            output_dir,
            report,
            artifacts,
        } => handle_align(config, inputs, output_dir, report, artifacts),
        Commands::Inspect { input } => handle_inspect(config, input),
        Commands::Config { .. } => Ok(()),
    }
}

fn logging_for_verbosity(base: &LoggingConfig, verbose: u8) -> LoggingConfig {
    let mut logging = match verbose {
        0 => return base.clone(),
        1 => LoggingConfig::development(),
        _ => LoggingConfig {
            global_level: "trace".to_string(),
            ..LoggingConfig::development()
        },
    };
    logging.log_directory = base.log_directory.clone();
    logging.file_prefix = base.file_prefix.clone();
    logging
}

fn handle_align(
    mut config: Config,
    inputs: Vec<PathBuf>,
    output_dir: PathBuf,
    report: Option<PathBuf>,
    artifacts: Option<PathBuf>,
) -> anyhow::Result<()> {
    if let Some(dir) = artifacts {
        config.aligner.artifacts.enabled = true;
        config.aligner.artifacts.directory = dir;
    }

    let aligner = WaferAligner::new(config.aligner).context("invalid aligner configuration")?;
    let runner = BatchRunner::new(aligner).with_output_dir(&output_dir);

    println!("Aligning {} image(s) into {}", inputs.len(), output_dir.display());
    let outcomes = runner.align_files(&inputs);

    let mut reports: Vec<&AlignmentReport> = Vec::new();
    for outcome in &outcomes {
        println!("\n=== {} ===", outcome.path.display());
        for entry in outcome.log.entries() {
            println!("{}", entry);
        }
        match &outcome.result {
            Ok(aligned) => {
                reports.push(&aligned.report);
                if let Some(path) = &outcome.output_path {
                    println!("-> {}", path.display());
                }
            }
            Err(AlignError::NoBoundaryFound) => println!("-> skipped: no wafer boundary found"),
            Err(e) => println!("-> failed: {}", e),
        }
    }

    let succeeded = reports.len();
    println!(
        "\n{} aligned, {} skipped or failed, {} total",
        succeeded,
        outcomes.len() - succeeded,
        outcomes.len()
    );

    if let Some(report_path) = report {
        let json = serde_json::to_string_pretty(&reports)?;
        std::fs::write(&report_path, json)
            .with_context(|| format!("writing report to {}", report_path.display()))?;
        println!("Report saved to {}", report_path.display());
    }

    if batch_had_fatal_failure(&outcomes) {
        anyhow::bail!("one or more images failed to align");
    }
    Ok(())
}

fn handle_inspect(config: Config, input: PathBuf) -> anyhow::Result<()> {
    let aligner = WaferAligner::new(config.aligner).context("invalid aligner configuration")?;
    let image = load_image(&input)?;

    match aligner.inspect(&image, &input.display().to_string(), &mut TracingSink) {
        Ok(inspection) => {
            println!("{}", serde_json::to_string_pretty(&inspection)?);
            Ok(())
        }
        Err(AlignError::NoBoundaryFound) => {
            println!("No wafer boundary found in {}", input.display());
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
