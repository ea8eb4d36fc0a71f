//! Live results window.
//!
//! Drains [`WorkerEvent`]s every frame and renders one row per processed
//! candidate. The window keeps its own copy of the records; it never reads
//! worker state directly.

use crate::config::Config;
use crate::record::{ResultRecord, Verdict};
use crate::report::{self, ReportLayout};
use crate::worker::{Thumbnail, WorkerEvent};
use egui::{Color32, RichText};
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::Duration;

const WINDOW_TITLE: &str = "Face Verification Results";
const ROW_SPACING: f32 = 10.0;
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq)]
enum RunState {
    Running,
    Finished { report: PathBuf },
    Failed(String),
    /// The worker went away without a final event.
    Disconnected,
}

struct Row {
    record: ResultRecord,
    thumbnail: Option<Thumbnail>,
    texture: Option<egui::TextureHandle>,
}

pub struct ResultsApp {
    events: Receiver<WorkerEvent>,
    config: Config,
    rows: Vec<Row>,
    total: Option<usize>,
    state: RunState,
    status: String,
}

impl ResultsApp {
    pub fn new(events: Receiver<WorkerEvent>, config: Config) -> Self {
        Self {
            events,
            config,
            rows: Vec::new(),
            total: None,
            state: RunState::Running,
            status: "Verifying...".to_string(),
        }
    }

    /// Pull everything the worker has sent so far.
    fn poll_events(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(event) => self.apply(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if self.state == RunState::Running {
                        self.state = RunState::Disconnected;
                        self.status = "Worker stopped unexpectedly".to_string();
                    }
                    break;
                }
            }
        }
    }

    fn apply(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::Started { total } => {
                self.total = Some(total);
                self.rows.reserve(total);
            }
            WorkerEvent::Processed { index, record, thumbnail } => {
                tracing::trace!(index, path = %record.image_path.display(), "row received");
                self.rows.push(Row { record, thumbnail, texture: None });
            }
            WorkerEvent::Finished { report: Ok(report) } => {
                self.status = format!("Done. Report saved to {}", report.display());
                self.state = RunState::Finished { report };
            }
            WorkerEvent::Finished { report: Err(message) } => {
                self.status = format!("Run failed: {message}");
                self.state = RunState::Failed(message);
            }
        }
    }

    /// Upload pending thumbnails as textures.
    fn upload_thumbnails(&mut self, ctx: &egui::Context) {
        for row in self.rows.iter_mut().filter(|r| r.texture.is_none()) {
            if let Some(thumb) = row.thumbnail.take() {
                let image = egui::ColorImage::from_rgba_unmultiplied(thumb.size, &thumb.rgba);
                let name = row.record.image_path.display().to_string();
                row.texture = Some(ctx.load_texture(name, image, egui::TextureOptions::default()));
            }
        }
    }

    fn records(&self) -> Vec<ResultRecord> {
        self.rows.iter().map(|r| r.record.clone()).collect()
    }

    fn generate_pdf(&mut self) {
        let rows = report::build_rows(&self.records(), ReportLayout::from(&self.config));
        self.status = match report::pdf::write(&self.config.pdf_path, &rows) {
            Ok(()) => format!("PDF saved to {}", self.config.pdf_path.display()),
            Err(e) => {
                tracing::error!(error = %e, "PDF export failed");
                format!("PDF export failed: {e}")
            }
        };
    }

    /// Rewrite the HTML report from the rows shown in the window.
    fn save_html(&mut self) {
        let layout = ReportLayout::from(&self.config);
        let rows = report::build_rows(&self.records(), layout);
        let path = &self.config.report_path;
        self.status = match report::html::write(path, &rows, layout) {
            Ok(()) => format!("Report saved to {}", path.display()),
            Err(e) => format!("Saving report failed: {e}"),
        };
    }

    fn progress_text(&self) -> String {
        match self.total {
            Some(total) => format!("{}/{}", self.rows.len(), total),
            None => "listing folder...".to_string(),
        }
    }

    fn render_row(ui: &mut egui::Ui, row: &Row) {
        ui.horizontal(|ui| {
            match &row.texture {
                Some(texture) => {
                    ui.add(egui::Image::new(egui::load::SizedTexture::from_handle(texture)));
                }
                None => {
                    ui.label(RichText::new("(no preview)").color(Color32::from_gray(140)));
                }
            }
            ui.vertical(|ui| {
                ui.label(row.record.file_name());
                ui.label(format!("Distance: {}", report::format_distance(row.record.distance)));
                ui.label(
                    RichText::new(format!("Match: {}", row.record.verdict)).color(verdict_color(row.record.verdict)),
                );
                if let Some(error) = &row.record.error {
                    ui.label(RichText::new(error).small().color(Color32::from_gray(150)));
                }
            });
        });
    }
}

fn verdict_color(verdict: Verdict) -> Color32 {
    match verdict {
        Verdict::Match => Color32::from_rgb(60, 170, 90),
        Verdict::NoMatch => Color32::from_gray(170),
        Verdict::NotApplicable => Color32::from_rgb(200, 160, 60),
        Verdict::Failed => Color32::from_rgb(210, 80, 80),
    }
}

impl eframe::App for ResultsApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_events();
        self.upload_thumbnails(ctx);
        if self.state == RunState::Running {
            ctx.request_repaint_after(POLL_INTERVAL);
        }

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let done = !matches!(self.state, RunState::Running);
                if ui.add_enabled(done, egui::Button::new("Generate PDF")).clicked() {
                    self.generate_pdf();
                }
                if ui.add_enabled(done, egui::Button::new("Save HTML")).clicked() {
                    self.save_html();
                }
                ui.separator();
                ui.label(self.progress_text());
                ui.label(RichText::new(&self.status).color(Color32::from_gray(170)));
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .stick_to_bottom(true)
                .show(ui, |ui| {
                    for row in &self.rows {
                        Self::render_row(ui, row);
                        ui.add_space(ROW_SPACING);
                        ui.separator();
                    }
                });
        });
    }
}

/// Open the results window and block until it is closed.
pub fn run(events: Receiver<WorkerEvent>, config: &Config) -> eframe::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(WINDOW_TITLE)
            .with_inner_size([config.window_width, config.window_height]),
        centered: true,
        ..Default::default()
    };
    let app = ResultsApp::new(events, config.clone());
    eframe::run_native(WINDOW_TITLE, options, Box::new(move |_cc| Box::new(app)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::mpsc;

    fn record(name: &str, distances: &[f32]) -> ResultRecord {
        ResultRecord::classify(Path::new(name), distances, 0.6)
    }

    #[test]
    fn test_events_append_rows_in_order() {
        let (tx, rx) = mpsc::channel();
        let mut app = ResultsApp::new(rx, Config::default());

        tx.send(WorkerEvent::Started { total: 2 }).unwrap();
        tx.send(WorkerEvent::Processed { index: 0, record: record("a.jpg", &[0.3]), thumbnail: None }).unwrap();
        app.poll_events();
        assert_eq!(app.progress_text(), "1/2");
        assert_eq!(app.state, RunState::Running);

        tx.send(WorkerEvent::Processed { index: 1, record: record("b.jpg", &[0.9]), thumbnail: None }).unwrap();
        tx.send(WorkerEvent::Finished { report: Ok(PathBuf::from("out.html")) }).unwrap();
        app.poll_events();

        let names: Vec<String> = app.rows.iter().map(|r| r.record.file_name()).collect();
        assert_eq!(names, vec!["a.jpg", "b.jpg"]);
        assert_eq!(app.state, RunState::Finished { report: PathBuf::from("out.html") });
        assert!(app.status.contains("out.html"));
    }

    #[test]
    fn test_failed_run_is_reported() {
        let (tx, rx) = mpsc::channel();
        let mut app = ResultsApp::new(rx, Config::default());
        tx.send(WorkerEvent::Finished { report: Err("disk full".into()) }).unwrap();
        app.poll_events();
        assert_eq!(app.state, RunState::Failed("disk full".into()));
    }

    #[test]
    fn test_worker_vanishing_is_noticed() {
        let (tx, rx) = mpsc::channel::<WorkerEvent>();
        let mut app = ResultsApp::new(rx, Config::default());
        drop(tx);
        app.poll_events();
        assert_eq!(app.state, RunState::Disconnected);
        assert_eq!(app.progress_text(), "listing folder...");
    }

    #[test]
    fn test_thumbnails_become_textures() {
        let ctx = egui::Context::default();
        let (tx, rx) = mpsc::channel();
        let mut app = ResultsApp::new(rx, Config::default());
        let thumbnail = Thumbnail { size: [2, 1], rgba: vec![255; 8] };
        tx.send(WorkerEvent::Processed { index: 0, record: record("a.jpg", &[0.1]), thumbnail: Some(thumbnail) })
            .unwrap();
        app.poll_events();
        app.upload_thumbnails(&ctx);

        let texture = app.rows[0].texture.as_ref().unwrap();
        assert_eq!(texture.size(), [2, 1]);
        assert!(app.rows[0].thumbnail.is_none());
    }

    /// App fed with two finished records of real images, writing into a temp dir.
    fn finished_app(dir: &Path) -> ResultsApp {
        let config = Config {
            report_path: dir.join("report.html"),
            pdf_path: dir.join("report.pdf"),
            ..Config::default()
        };
        let (tx, rx) = mpsc::channel();
        let mut app = ResultsApp::new(rx, config);

        let a = dir.join("a.png");
        let b = dir.join("b.png");
        image::RgbImage::from_pixel(100, 50, image::Rgb([9, 9, 9])).save(&a).unwrap();
        image::RgbImage::from_pixel(40, 40, image::Rgb([9, 9, 9])).save(&b).unwrap();

        tx.send(WorkerEvent::Started { total: 2 }).unwrap();
        tx.send(WorkerEvent::Processed { index: 0, record: ResultRecord::classify(&a, &[0.3], 0.6), thumbnail: None })
            .unwrap();
        tx.send(WorkerEvent::Processed { index: 1, record: ResultRecord::classify(&b, &[0.9], 0.6), thumbnail: None })
            .unwrap();
        tx.send(WorkerEvent::Finished { report: Ok(dir.join("report.html")) }).unwrap();
        app.poll_events();
        app
    }

    #[test]
    fn test_save_html_rewrites_report_from_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = finished_app(dir.path());
        std::fs::write(dir.path().join("report.html"), "stale").unwrap();

        app.save_html();

        let html = std::fs::read_to_string(dir.path().join("report.html")).unwrap();
        let rows: Vec<&str> = html.lines().filter(|l| l.starts_with("<td>")).collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].contains("<td>a.png</td><td>100x50</td><td>500x250</td><td>0.30</td><td>Yes</td>"));
        assert!(rows[1].contains("<td>b.png</td><td>40x40</td><td>500x500</td><td>0.90</td><td>No</td>"));
        assert!(!html.contains("stale"));
        assert!(app.status.starts_with("Report saved to"), "{}", app.status);
    }

    #[test]
    fn test_generate_pdf_writes_configured_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = finished_app(dir.path());

        app.generate_pdf();

        assert!(std::fs::read(dir.path().join("report.pdf")).unwrap().starts_with(b"%PDF"));
        assert!(app.status.starts_with("PDF saved to"), "{}", app.status);
    }

    #[test]
    fn test_export_failure_shows_in_status() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = finished_app(dir.path());
        app.config.report_path = dir.path().join("missing").join("report.html");

        app.save_html();

        assert!(app.status.starts_with("Saving report failed"), "{}", app.status);
    }
}
