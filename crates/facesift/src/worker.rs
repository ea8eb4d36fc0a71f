//! Background verification worker.
//!
//! Owns the verifier on a dedicated OS thread, walks the candidate folder and
//! streams immutable [`WorkerEvent`]s back over a channel. Nothing else is
//! shared with the UI thread.

use crate::config::Config;
use crate::progress;
use crate::record::ResultRecord;
use crate::report::{self, ReportError, ReportLayout};
use facesift_core::FaceVerifier;
use image::DynamicImage;
use indicatif::ProgressBar;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::JoinHandle;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("cannot read candidate folder {}: {source}", .path.display())]
    Folder {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot create output folder {}: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("report: {0}")]
    Report(#[from] ReportError),
    #[error("failed to spawn worker thread: {0}")]
    Spawn(std::io::Error),
}

/// Inputs of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub references: Vec<PathBuf>,
    pub folder: PathBuf,
}

/// RGBA preview pixels for the live view.
#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub size: [usize; 2],
    pub rgba: Vec<u8>,
}

/// Messages sent from the worker thread to whoever drives the UI.
#[derive(Debug)]
pub enum WorkerEvent {
    Started { total: usize },
    Processed {
        index: usize,
        record: ResultRecord,
        thumbnail: Option<Thumbnail>,
    },
    /// Last event of a run. `Ok` carries the HTML report path.
    Finished { report: Result<PathBuf, String> },
}

/// Handle to the running worker.
pub struct WorkerHandle {
    pub events: Receiver<WorkerEvent>,
    pub thread: JoinHandle<()>,
}

/// Spawn the worker on its own thread with a console progress bar.
pub fn spawn_worker<V>(verifier: V, job: Job, config: Config) -> Result<WorkerHandle, WorkerError>
where
    V: FaceVerifier + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<WorkerEvent>();

    let thread = std::thread::Builder::new()
        .name("facesift-worker".into())
        .spawn(move || {
            let mut verifier = verifier;
            tracing::info!(
                references = job.references.len(),
                folder = %job.folder.display(),
                "worker started"
            );
            let report = match run(&mut verifier, &job, &config, &tx, progress::console) {
                Ok(Some(path)) => Ok(path),
                Ok(None) => {
                    tracing::info!("worker exiting before the folder was finished");
                    return;
                }
                Err(e) => {
                    tracing::error!(error = %e, "verification run failed");
                    Err(e.to_string())
                }
            };
            let _ = tx.send(WorkerEvent::Finished { report });
            tracing::info!("worker exiting");
        })
        .map_err(WorkerError::Spawn)?;

    Ok(WorkerHandle { events: rx, thread })
}

/// Process every candidate in the folder, then write the reports.
///
/// Returns the HTML report path, or `None` when the receiving side of
/// `events` went away and the run stopped without writing any report.
pub fn run<V: FaceVerifier>(
    verifier: &mut V,
    job: &Job,
    config: &Config,
    events: &Sender<WorkerEvent>,
    make_progress: impl FnOnce(usize) -> ProgressBar,
) -> Result<Option<PathBuf>, WorkerError> {
    let candidates = list_candidates(&job.folder)?;
    ensure_output_dir(&config.output_dir)?;

    let total = candidates.len();
    let bar = make_progress(total);
    if events.send(WorkerEvent::Started { total }).is_err() {
        tracing::info!("results view closed before the run started; no report written");
        return Ok(None);
    }

    let mut records = Vec::with_capacity(total);
    for (index, candidate) in candidates.iter().enumerate() {
        let (record, thumbnail) = process_candidate(verifier, &job.references, candidate, config);
        tracing::debug!(
            path = %candidate.display(),
            distance = record.distance,
            verdict = %record.verdict,
            "candidate processed"
        );

        records.push(record.clone());
        bar.inc(1);

        if events.send(WorkerEvent::Processed { index, record, thumbnail }).is_err() {
            tracing::info!(done = index + 1, total, "results view closed; stopping without writing a report");
            bar.abandon();
            return Ok(None);
        }
    }
    bar.finish();

    let matches = records.iter().filter(|r| r.is_match()).count();
    tracing::info!(total, matches, "folder exhausted");

    write_reports(&records, config)?;
    Ok(Some(config.report_path.clone()))
}

/// Write the HTML report plus whichever optional outputs are configured.
pub fn write_reports(records: &[ResultRecord], config: &Config) -> Result<(), ReportError> {
    let layout = ReportLayout::from(config);
    let rows = report::build_rows(records, layout);
    report::html::write(&config.report_path, &rows, layout)?;
    if config.auto_pdf {
        report::pdf::write(&config.pdf_path, &rows)?;
    }
    if let Some(path) = &config.results_json {
        report::write_json(path, records)?;
    }
    Ok(())
}

/// File entries of `folder`, in directory listing order.
pub fn list_candidates(folder: &Path) -> Result<Vec<PathBuf>, WorkerError> {
    let folder_err = |source| WorkerError::Folder {
        path: folder.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(folder).map_err(folder_err)? {
        let path = entry.map_err(folder_err)?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    Ok(files)
}

fn ensure_output_dir(dir: &Path) -> Result<(), WorkerError> {
    std::fs::create_dir_all(dir).map_err(|source| WorkerError::OutputDir {
        path: dir.to_path_buf(),
        source,
    })
}

/// Verify one candidate against every reference and build its preview.
///
/// Never fails: a candidate that does not fully decode, or a match that
/// cannot be copied, becomes a `Failed` record.
pub fn process_candidate<V: FaceVerifier>(
    verifier: &mut V,
    references: &[PathBuf],
    candidate: &Path,
    config: &Config,
) -> (ResultRecord, Option<Thumbnail>) {
    let thumbnail = match image::open(candidate) {
        Ok(decoded) => make_thumbnail(&decoded, config.thumbnail_size),
        Err(e) => {
            tracing::warn!(path = %candidate.display(), error = %e, "unreadable candidate");
            let record = ResultRecord::failed(candidate, f32::INFINITY, format!("unreadable image: {e}"));
            return (record, None);
        }
    };

    let options = config.verify_options();
    let distances: Vec<f32> = references
        .iter()
        .filter_map(|reference| match verifier.verify(reference, candidate, &options) {
            Ok(v) => v.distance,
            Err(e) => {
                tracing::warn!(
                    reference = %reference.display(),
                    candidate = %candidate.display(),
                    error = %e,
                    "verification failed"
                );
                None
            }
        })
        .collect();

    let record = ResultRecord::classify(candidate, &distances, config.match_threshold);
    if record.is_match() {
        if let Err(e) = copy_match(candidate, &config.output_dir) {
            tracing::warn!(path = %candidate.display(), error = %e, "copying match failed");
            let failed = ResultRecord::failed(candidate, record.distance, format!("copy failed: {e}"));
            return (failed, Some(thumbnail));
        }
    }
    (record, Some(thumbnail))
}

/// Copy a matched image into `output_dir`, replacing a same-named file.
pub fn copy_match(source: &Path, output_dir: &Path) -> std::io::Result<PathBuf> {
    let name = source.file_name().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name")
    })?;
    let target = output_dir.join(name);
    std::fs::copy(source, &target)?;
    Ok(target)
}

fn make_thumbnail(image: &DynamicImage, max_side: u32) -> Thumbnail {
    let thumb = image.thumbnail(max_side, max_side).to_rgba8();
    Thumbnail {
        size: [thumb.width() as usize, thumb.height() as usize],
        rgba: thumb.into_raw(),
    }
}
