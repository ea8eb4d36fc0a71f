//! Console progress line: `Progress: |<bar>| done/total (pct%) Complete`.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressState, ProgressStyle};
use std::fmt::Write;

const TEMPLATE: &str = "Progress: |{bar:50}| {pos}/{len} ({percent_1dp}) Complete";

/// Percentage of `done` over `total`, 100 for an empty run.
pub fn percent(done: u64, total: u64) -> f64 {
    if total == 0 {
        100.0
    } else {
        done as f64 * 100.0 / total as f64
    }
}

fn style() -> ProgressStyle {
    ProgressStyle::with_template(TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .with_key("percent_1dp", |state: &ProgressState, w: &mut dyn Write| {
            let _ = write!(w, "{:.1}%", percent(state.pos(), state.len().unwrap_or(0)));
        })
        .progress_chars("█-")
}

/// Progress bar drawn on stderr.
pub fn console(total: usize) -> ProgressBar {
    ProgressBar::with_draw_target(Some(total as u64), ProgressDrawTarget::stderr()).with_style(style())
}

/// Progress bar that draws nothing.
pub fn hidden(total: usize) -> ProgressBar {
    ProgressBar::with_draw_target(Some(total as u64), ProgressDrawTarget::hidden()).with_style(style())
}

#[cfg(test)]
mod tests {
    use super::*;
    use indicatif::InMemoryTerm;

    #[test]
    fn test_percent() {
        assert_eq!(percent(0, 4), 0.0);
        assert_eq!(percent(1, 4), 25.0);
        assert_eq!(percent(4, 4), 100.0);
        assert_eq!(percent(0, 0), 100.0);
        assert_eq!(format!("{:.1}", percent(1, 3)), "33.3");
    }

    #[test]
    fn test_template_is_valid() {
        assert!(ProgressStyle::with_template(TEMPLATE).is_ok());
    }

    #[test]
    fn test_rendered_line() {
        let term = InMemoryTerm::new(4, 120);
        let bar = ProgressBar::with_draw_target(Some(2), ProgressDrawTarget::term_like(Box::new(term.clone())))
            .with_style(style());
        bar.inc(1);
        bar.abandon();

        let expected = format!("Progress: |{}{}| 1/2 (50.0%) Complete", "█".repeat(25), "-".repeat(25));
        assert_eq!(term.contents(), expected);
    }

    #[test]
    fn test_hidden_bar_tracks_position() {
        let bar = hidden(3);
        bar.inc(1);
        bar.inc(1);
        assert_eq!(bar.position(), 2);
        assert_eq!(bar.length(), Some(3));
        bar.finish();
        assert!(bar.is_finished());
    }
}
