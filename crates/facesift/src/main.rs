use anyhow::{bail, Context, Result};
use clap::Parser;
use facesift_core::OnnxVerifier;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod config;
mod progress;
mod record;
mod report;
mod selection;
mod ui;
mod worker;

use config::Config;
use worker::WorkerEvent;

#[derive(Parser)]
#[command(name = "facesift", about = "Find the people in your reference photos across a folder of images")]
struct Cli {
    /// Reference image (repeatable). Opens a file dialog when omitted.
    #[arg(short, long = "reference", value_name = "IMAGE")]
    references: Vec<PathBuf>,

    /// Folder of candidate images. Opens a folder dialog when omitted.
    #[arg(short, long)]
    folder: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Skip the results window and only print progress
    #[arg(long)]
    no_gui: bool,

    /// Also write the PDF report when the run finishes
    #[arg(long)]
    pdf: bool,

    /// Dump all result records as JSON
    #[arg(long, value_name = "FILE")]
    json: Option<PathBuf>,

    /// Match threshold (distance at or below counts as a match)
    #[arg(long)]
    threshold: Option<f32>,
}

impl Cli {
    fn apply_to(&self, config: &mut Config) {
        if let Some(threshold) = self.threshold {
            config.match_threshold = threshold;
        }
        if let Some(json) = &self.json {
            config.results_json = Some(json.clone());
        }
        if self.pdf {
            config.auto_pdf = true;
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply_to(&mut config);
    config.validate()?;

    tracing::info!(
        threshold = config.match_threshold,
        metric = %config.distance_metric,
        model_dir = %config.model_dir.display(),
        "facesift starting"
    );

    let job = selection::resolve(cli.references.clone(), cli.folder.clone())?;

    let verifier = OnnxVerifier::load(&config.model_dir)
        .with_context(|| format!("loading models from {}", config.model_dir.display()))?;

    let handle = worker::spawn_worker(verifier, job, config.clone())?;

    if cli.no_gui {
        let mut outcome = None;
        for event in handle.events.iter() {
            if let WorkerEvent::Finished { report } = event {
                outcome = Some(report);
            }
        }
        if handle.thread.join().is_err() {
            bail!("worker thread panicked");
        }
        match outcome {
            Some(Ok(report)) => println!("Report saved to {}", report.display()),
            Some(Err(message)) => bail!("verification failed: {message}"),
            None => bail!("worker exited without finishing"),
        }
        return Ok(());
    }

    ui::run(handle.events, &config).map_err(|e| anyhow::anyhow!("results window: {e}"))?;

    // Closing the window drops the receiver; the worker stops at its next send.
    if handle.thread.join().is_err() {
        tracing::error!("worker thread panicked");
    }
    tracing::info!("facesift exiting");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_repeated_references() {
        let cli = Cli::parse_from([
            "facesift", "-r", "me.jpg", "--reference", "me2.jpg", "-f", "photos", "--no-gui",
        ]);
        assert_eq!(cli.references, vec![PathBuf::from("me.jpg"), PathBuf::from("me2.jpg")]);
        assert_eq!(cli.folder, Some(PathBuf::from("photos")));
        assert!(cli.no_gui);
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from(["facesift", "--threshold", "0.4", "--pdf", "--json", "out.json"]);
        let mut config = Config::default();
        cli.apply_to(&mut config);
        assert!((config.match_threshold - 0.4).abs() < 1e-6);
        assert!(config.auto_pdf);
        assert_eq!(config.results_json, Some(PathBuf::from("out.json")));
    }

    #[test]
    fn test_no_flags_keep_config() {
        let cli = Cli::parse_from(["facesift"]);
        let mut config = Config::default();
        cli.apply_to(&mut config);
        assert!((config.match_threshold - 0.6).abs() < 1e-6);
        assert!(!config.auto_pdf);
        assert!(config.results_json.is_none());
    }
}
