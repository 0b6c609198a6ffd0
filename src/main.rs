//! HeartVerse: Heart disease risk assessment
//!
//! Reads one patient record (JSON), classifies it, and writes the PDF report.
//!
//! ```bash
//! heartverse <record.json|-> [--out-dir <dir>] [--models <dir>]
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use heartverse::adapters::output::write_report;
use heartverse::adapters::pdf::PdfRenderer;
use heartverse::adapters::sanitize::SanitizingMakeWriter;
use heartverse::adapters::ModelArtifacts;
use heartverse::application::{read_record, AssessmentService};
use heartverse::config::AppConfig;

const USAGE: &str = "Usage: heartverse <record.json|-> [--out-dir <dir>] [--models <dir>]";

struct Args {
    record: String,
    out_dir: Option<PathBuf>,
    models: Option<PathBuf>,
}

fn parse_args() -> Result<Option<Args>> {
    let mut args = std::env::args().skip(1);
    let mut record: Option<String> = None;
    let mut out_dir = None;
    let mut models = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--out-dir" => {
                let v = args.next().context(USAGE)?;
                out_dir = Some(PathBuf::from(v));
            }
            "--models" => {
                let v = args.next().context(USAGE)?;
                models = Some(PathBuf::from(v));
            }
            "-h" | "--help" => return Ok(None),
            _ if arg.starts_with("--") => bail!("Unknown arg: {arg}\n{USAGE}"),
            _ => {
                if record.is_some() {
                    bail!(USAGE);
                }
                record = Some(arg);
            }
        }
    }

    let record = record.context(USAGE)?;
    Ok(Some(Args {
        record,
        out_dir,
        models,
    }))
}

fn main() -> Result<()> {
    let Some(args) = parse_args()? else {
        println!("{USAGE}");
        return Ok(());
    };

    // Initialize logging.
    //
    // stdout carries the session summary, so logs go to stderr unless a file
    // is requested.
    let log_mode = std::env::var("HEARTVERSE_LOG_MODE").unwrap_or_else(|_| "stderr".to_string());

    let (writer, _guard) = if log_mode == "file" {
        let log_file =
            std::env::var("HEARTVERSE_LOG_FILE").unwrap_or_else(|_| "heartverse.log".to_string());

        if let Some(parent) = std::path::Path::new(&log_file).parent() {
            // Best-effort: don't fail startup just because the directory is missing.
            let _ = std::fs::create_dir_all(parent);
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stderr())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(SanitizingMakeWriter::new(writer)))
        .init();

    let mut config = AppConfig::from_env();
    if let Some(models) = args.models {
        config.model_path = models;
    }
    if let Some(out_dir) = args.out_dir {
        config.output_dir = out_dir;
    }

    tracing::info!("Starting HeartVerse...");

    let policy = config.artifact_policy()?;
    let artifacts = ModelArtifacts::load(&config.model_path, &policy)
        .with_context(|| format!("Failed to load model artifacts from {:?}", config.model_path))?;
    let service = AssessmentService::from_artifacts(artifacts, Arc::new(PdfRenderer::default()));

    let record = if args.record == "-" {
        read_record(std::io::stdin().lock())
    } else {
        let file = std::fs::File::open(&args.record)
            .with_context(|| format!("Failed to open record {}", args.record))?;
        read_record(std::io::BufReader::new(file))
    }
    .context("Failed to parse patient record")?;

    let artifact = service.assess(&record, chrono::Local::now().naive_local())?;
    let path = write_report(&config.output_dir, &artifact.file_name, &artifact.bytes)?;
    tracing::info!("Report written to {:?}", path);

    println!(
        "{}: {} (confidence {}, risk {}) -> {}",
        record.name,
        artifact.result.outcome.headline(),
        artifact.result.confidence_percent(),
        artifact.result.risk_level,
        path.display()
    );

    tracing::info!("HeartVerse session complete.");
    Ok(())
}
