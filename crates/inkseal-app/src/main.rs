// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Inkseal — command-line PDF watermarking.
//
// `watermark` asks for the watermark on the terminal unless `--text` or
// `--image` is given; `inspect` prints what a marked file reveals about
// itself; `init-config` writes the default settings to a JSON file.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use inkseal_chat::{ConsoleSession, RequestContext, WatermarkHandler, summary};
use inkseal_core::error::{InksealError, Result};
use inkseal_core::human_errors::humanize_error;
use inkseal_core::{ProtectionReport, RequestId, WatermarkConfig, WatermarkRequest, parse_callback};
use inkseal_document::{
    HiddenData, IntegrityReport, WatermarkOutcome, extract_hidden_data, verify_integrity,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "inkseal", version, about = "Add text or image watermarks to PDF files")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Watermark a PDF, image, or text file.
    Watermark(WatermarkArgs),
    /// Report the marks found in a PDF.
    Inspect {
        pdf: PathBuf,
        /// Watermark text the file is expected to carry.
        #[arg(long)]
        expect: Option<String>,
    },
    /// Write the default configuration as JSON.
    InitConfig { path: PathBuf },
}

#[derive(Args, Debug)]
struct WatermarkArgs {
    /// File to watermark (.pdf, .png, .jpg, .jpeg, .txt).
    #[arg(long, short)]
    input: PathBuf,
    /// Options, e.g. `#wa|txt|op08|M|R` or `#wa|img|op05|T`.
    #[arg(long, short)]
    callback: String,
    /// Watermark text; skips the prompt.
    #[arg(long, conflicts_with = "image")]
    text: Option<String>,
    /// Watermark image; skips the prompt.
    #[arg(long)]
    image: Option<PathBuf>,
    /// Directory for the result. Defaults to a new directory per request.
    #[arg(long)]
    work_dir: Option<PathBuf>,
    /// JSON configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Seed for the random layers, for reproducible output.
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Watermark(args) => watermark(args).await,
        Command::Inspect { pdf, expect } => inspect(&pdf, expect.as_deref()),
        Command::InitConfig { path } => WatermarkConfig::default().persist(&path).map(|()| {
            info!(path = %path.display(), "default config written");
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(InksealError::Cancelled) => ExitCode::from(2),
        Err(err) => {
            error!(error = %err, "inkseal failed");
            eprintln!("{}", humanize_error(&err).to_chat_text());
            ExitCode::FAILURE
        }
    }
}

async fn watermark(args: WatermarkArgs) -> Result<()> {
    let config = args
        .config
        .as_deref()
        .map(WatermarkConfig::load)
        .unwrap_or_default();
    let handler = WatermarkHandler::new(config);
    let mut ctx = request_context(args.work_dir.as_deref())?;
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    info!(request = %ctx.id, dir = %ctx.work_dir().display(), "request started");

    let outcome = match preset_request(&args)? {
        Some(request) => {
            let outcome = handler.watermark(&mut ctx, &request, &args.input, &mut rng)?;
            println!("{}", summary(&outcome.report));
            outcome
        }
        None => {
            let mut session = ConsoleSession::stdio();
            handler
                .handle(&mut session, &mut ctx, &args.callback, &args.input, &mut rng)
                .await?
        }
    };
    print_outcome(&outcome, ctx.broken_works())
}

/// The request built from `--text`/`--image`, or `None` to prompt for it.
fn preset_request(args: &WatermarkArgs) -> Result<Option<WatermarkRequest>> {
    if args.text.is_none() && args.image.is_none() {
        return Ok(None);
    }
    let options = parse_callback(&args.callback)?;
    Ok(match (&args.text, &args.image) {
        (Some(text), _) => Some(WatermarkRequest::text(options, text.clone())),
        (None, Some(image)) => Some(WatermarkRequest::file(options, image.clone())),
        (None, None) => None,
    })
}

fn request_context(work_dir: Option<&Path>) -> Result<RequestContext> {
    match work_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            Ok(RequestContext::in_dir(RequestId::new(), dir))
        }
        None => RequestContext::create(std::env::temp_dir().join("inkseal")),
    }
}

#[derive(Serialize)]
struct RunOutput<'a> {
    output: &'a Path,
    report: &'a ProtectionReport,
    broken_works: &'a [String],
}

#[derive(Serialize)]
struct InspectOutput {
    integrity: IntegrityReport,
    hidden_data: HiddenData,
}

fn print_outcome(outcome: &WatermarkOutcome, broken: &[String]) -> Result<()> {
    let report = RunOutput {
        output: &outcome.output,
        report: &outcome.report,
        broken_works: broken,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn inspect(pdf: &Path, expect: Option<&str>) -> Result<()> {
    let report = InspectOutput {
        integrity: verify_integrity(pdf, expect)?,
        hidden_data: extract_hidden_data(pdf)?,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
