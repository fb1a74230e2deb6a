//! hemoscan CLI - screen one photo for signs of anemia.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{ArgAction, Parser};
use hemoscan_app::{AppConfig, build_client, run_screening};
use hemoscan_capture::CaptureInput;
use hemoscan_core::ScanTarget;
use hemoscan_ui::{DISCLAIMER_TEXT, DISCLAIMER_TITLE, ResultView, capture_guidance};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Debug, Parser)]
#[command(
    name = "hemoscan",
    version = hemoscan_app::APP_VERSION,
    about = "Screen a nail bed, eyelid, or palm photo for signs of anemia"
)]
struct Cli {
    /// Photo to analyze (JPEG or PNG).
    #[arg(required_unless_present = "guidance")]
    image: Option<PathBuf>,

    /// Body region shown in the photo: nail-bed, conjunctiva, or palm.
    #[arg(short, long, default_value = "nail-bed")]
    target: ScanTarget,

    /// Print capture instructions for the target and exit.
    #[arg(long)]
    guidance: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if cli.guidance {
        println!("{}:", cli.target.anatomical_name());
        for tip in capture_guidance(cli.target) {
            println!("  - {tip}");
        }
        return Ok(());
    }

    let image = cli.image.context("an image path is required")?;
    let config = AppConfig::from_env().context("failed to load configuration")?;
    let client = build_client(&config).context("failed to set up inference client")?;

    eprintln!("{DISCLAIMER_TITLE}: {DISCLAIMER_TEXT}");

    let result = run_screening(&client, cli.target, CaptureInput::Path(image), config.timeout)
        .await
        .context("screening did not complete")?;

    let view = ResultView::from_result(&result);
    eprintln!("{} ({})", view.headline, view.subline);
    println!("{}", result.to_json_pretty()?);
    Ok(())
}
