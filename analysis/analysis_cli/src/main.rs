use std::{
    fs::{self, File, OpenOptions},
    io::{BufRead, BufReader, Write},
    path::{Path, PathBuf},
};

use analysis_learning::{
    demonstrate, load_iris, make_linear, AnalysisPipeline, AnalysisTelemetry, Generator,
    PipelineConfig,
};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared_logging::LogLevel;
use uuid::Uuid;

const DEFAULT_MANIFEST: &str = "analysis-runs.jsonl";

#[derive(Parser, Debug)]
#[command(
    name = "analysis",
    version,
    about = "Statistics, classical ML and plots over iris and a synthetic regression set",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
    #[command(flatten)]
    run: RunArgs,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Runs the analysis pipeline (the default when no subcommand is given).
    Run(RunArgs),
    /// Lists the most recent runs.
    Runs {
        /// Number of entries to display.
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// JSON-lines run manifest to read.
        #[arg(long, default_value = DEFAULT_MANIFEST)]
        manifest: PathBuf,
    },
    /// Captures and restores generator state, printing the three draws.
    RngState {
        /// Fixed seed; operating system entropy when omitted.
        #[arg(long)]
        seed: Option<u64>,
        /// Prints the draws as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug, Clone)]
struct RunArgs {
    /// JSON pipeline configuration; defaults reproduce the reference run.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Overrides the configured plot directory.
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// JSON-lines log file for step records.
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// JSON-lines run manifest to append to.
    #[arg(long, default_value = DEFAULT_MANIFEST)]
    manifest: PathBuf,
    /// Prints the report as JSON instead of text.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
struct RunManifestEntry {
    run_id: String,
    started_at: DateTime<Utc>,
    config: Option<PathBuf>,
    output_dir: PathBuf,
    log_path: Option<PathBuf>,
    #[serde(default)]
    files: Vec<PathBuf>,
    status: String,
}

impl RunManifestEntry {
    fn new(run_id: Uuid, args: &RunArgs, output_dir: PathBuf) -> Self {
        Self {
            run_id: format!("run-{run_id}"),
            started_at: Utc::now(),
            config: args.config.clone(),
            output_dir,
            log_path: args.log_file.clone(),
            files: Vec::new(),
            status: "pending".into(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command.unwrap_or(Commands::Run(cli.run)) {
        Commands::Run(args) => handle_run(&args),
        Commands::Runs { limit, manifest } => {
            let entries = read_manifest(&manifest)?;
            for entry in entries.into_iter().rev().take(limit) {
                println!(
                    "{} | {} | {} | {} | {} files",
                    entry.run_id,
                    entry.status,
                    entry.started_at,
                    entry.output_dir.display(),
                    entry.files.len()
                );
            }
            Ok(())
        }
        Commands::RngState { seed, json } => {
            let mut generator = seed.map_or_else(Generator::from_entropy, Generator::from_seed);
            let demo = demonstrate(&mut generator);
            if json {
                println!("{}", serde_json::to_string_pretty(&demo)?);
            } else {
                println!("{}", demo.first);
                println!("{}", demo.captured_next);
                println!("{}", demo.restored_next);
            }
            Ok(())
        }
    }
}

fn handle_run(args: &RunArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(dir) = &args.output_dir {
        config.output_dir.clone_from(dir);
    }

    let mut builder = AnalysisTelemetry::builder("analysis");
    if let Some(path) = &args.log_file {
        builder = builder.log_path(path);
    }
    let telemetry = builder.build().context("opening run log")?;
    let mut entry = RunManifestEntry::new(telemetry.run_id(), args, config.output_dir.clone());
    entry.status = "running".into();
    append_manifest(&args.manifest, &entry)?;

    let outcome = load_iris()
        .context("loading iris")
        .and_then(|iris| {
            let regression = make_linear(&config.regression).context("generating regression set")?;
            AnalysisPipeline::new(config)
                .with_telemetry(telemetry.clone())
                .run(&iris, &regression)
        });

    match outcome {
        Ok(report) => {
            update_status(&args.manifest, &entry.run_id, "completed", &report.files)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report.render_text());
            }
            Ok(())
        }
        Err(err) => {
            update_status(&args.manifest, &entry.run_id, "failed", &[])?;
            let _ = telemetry.log(
                LogLevel::Error,
                "pipeline.failed",
                json!({ "error": format!("{err:#}") }),
            );
            Err(err)
        }
    }
}

fn append_manifest(path: &Path, entry: &RunManifestEntry) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening manifest {}", path.display()))?;
    serde_json::to_writer(&mut file, entry)?;
    file.write_all(b"\n")?;
    Ok(())
}

fn read_manifest(path: &Path) -> Result<Vec<RunManifestEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let file = File::open(path)?;
    let mut entries = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        entries.push(serde_json::from_str(&line)?);
    }
    Ok(entries)
}

fn update_status(path: &Path, run_id: &str, status: &str, files: &[PathBuf]) -> Result<()> {
    let mut entries = read_manifest(path)?;
    let Some(entry) = entries.iter_mut().find(|entry| entry.run_id == run_id) else {
        return Ok(());
    };
    entry.status = status.to_string();
    entry.files = files.to_vec();
    let mut file = File::create(path)?;
    for entry in entries {
        serde_json::to_writer(&mut file, &entry)?;
        file.write_all(b"\n")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tempfile::tempdir;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn every_argument_has_help() {
        let cli = Cli::command();
        for command in std::iter::once(&cli).chain(cli.get_subcommands()) {
            for arg in command.get_arguments() {
                if matches!(arg.get_id().as_str(), "help" | "version") {
                    continue;
                }
                assert!(
                    arg.get_help().is_some(),
                    "{} --{} has no help text",
                    command.get_name(),
                    arg.get_id()
                );
            }
        }
    }

    #[test]
    fn bare_invocation_runs_pipeline() {
        let cli = Cli::try_parse_from(["analysis"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.run.manifest, PathBuf::from(DEFAULT_MANIFEST));

        let cli = Cli::try_parse_from(["analysis", "--output-dir", "plots", "--json"]).unwrap();
        assert_eq!(cli.run.output_dir, Some(PathBuf::from("plots")));
        assert!(cli.run.json);

        let cli = Cli::try_parse_from(["analysis", "runs", "--limit", "3"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Runs { limit: 3, .. })));
    }

    #[test]
    fn manifest_tracks_status_and_files() {
        let dir = tempdir().unwrap();
        let manifest = dir.path().join("runs/index.jsonl");
        let args = Cli::try_parse_from(["analysis"]).unwrap().run;
        let first = RunManifestEntry::new(Uuid::new_v4(), &args, dir.path().to_path_buf());
        let second = RunManifestEntry::new(Uuid::new_v4(), &args, dir.path().to_path_buf());
        append_manifest(&manifest, &first).unwrap();
        append_manifest(&manifest, &second).unwrap();

        let written = vec![dir.path().join("clusters.png")];
        update_status(&manifest, &second.run_id, "completed", &written).unwrap();

        let entries = read_manifest(&manifest).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], first);
        assert_eq!(entries[1].status, "completed");
        assert_eq!(entries[1].files, written);
    }

    #[test]
    fn missing_manifest_reads_empty() {
        let dir = tempdir().unwrap();
        assert!(read_manifest(&dir.path().join("absent.jsonl")).unwrap().is_empty());
    }
}
