//! Static HTML table report.

use super::{ReportError, ReportLayout, ReportRow, REPORT_TITLE};
use std::fmt::Write;
use std::path::Path;

const STYLE: &str = "\
table {
  width: 100%;
  border-collapse: collapse;
  border-bottom: 1px solid #ddd;
}
th, td {
  padding: 8px;
  text-align: left;
  border-bottom: 1px solid #ddd;
}
th {
  background-color: #f2f2f2;
}
img {
  max-width: 300px;
  height: auto;
}
";

const COLUMNS: [&str; 6] = [
    "Image",
    "Image Name",
    "Original Dimensions",
    "Resized Dimensions",
    "Distance",
    "Match",
];

/// Escape text for use in element content and double-quoted attributes.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render the report. Output depends only on `rows` and `layout`.
pub fn render(rows: &[ReportRow], layout: ReportLayout) -> String {
    let mut html = String::new();
    let _ = writeln!(html, "<!DOCTYPE html>");
    let _ = writeln!(html, "<html>\n<head>\n<meta charset=\"utf-8\">");
    let _ = writeln!(html, "<title>{REPORT_TITLE}</title>\n<style>\n{STYLE}</style>\n</head>\n<body>");
    let _ = writeln!(html, "<h2>{REPORT_TITLE}</h2>\n<table>");

    html.push_str("<tr>");
    for _ in 0..layout.images_per_row.max(1) {
        for column in COLUMNS {
            let _ = write!(html, "<th>{column}</th>");
        }
    }
    html.push_str("</tr>\n");

    for chunk in rows.chunks(layout.images_per_row.max(1)) {
        html.push_str("<tr>\n");
        for row in chunk {
            let _ = writeln!(
                html,
                "<td><img src=\"{}\"></td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td>",
                escape(&row.image_src),
                escape(&row.name),
                row.original_text(),
                row.resized_text(),
                row.distance,
                row.label,
            );
        }
        html.push_str("</tr>\n");
    }

    html.push_str("</table>\n</body>\n</html>\n");
    html
}

/// Render and write the report, replacing any previous file.
pub fn write(path: &Path, rows: &[ReportRow], layout: ReportLayout) -> Result<(), ReportError> {
    std::fs::write(path, render(rows, layout)).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), rows = rows.len(), "HTML report written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, distance: &str, label: &'static str) -> ReportRow {
        ReportRow {
            image_src: format!("/photos/{name}"),
            name: name.to_string(),
            original: Some((1000, 800)),
            resized: Some((500, 400)),
            distance: distance.to_string(),
            label,
        }
    }

    fn data_rows(html: &str) -> Vec<&str> {
        html.lines().filter(|l| l.starts_with("<td>")).collect()
    }

    #[test]
    fn test_one_row_per_record() {
        let rows = vec![row("a.jpg", "0.30", "Yes"), row("b.jpg", "0.90", "No")];
        let html = render(&rows, ReportLayout::default());

        let cells = data_rows(&html);
        assert_eq!(cells.len(), 2);
        assert!(cells[0].contains("<td>a.jpg</td>"));
        assert!(cells[0].contains("<td>1000x800</td><td>500x400</td><td>0.30</td><td>Yes</td>"));
        assert!(cells[1].contains("<td>b.jpg</td>"));
        assert!(cells[1].contains("<td>0.90</td><td>No</td>"));
        assert_eq!(html.matches("<tr>").count(), 3); // header + 2
    }

    #[test]
    fn test_images_per_row_groups_records() {
        let rows = vec![
            row("a.jpg", "0.30", "Yes"),
            row("b.jpg", "0.90", "No"),
            row("c.jpg", "inf", "N/A"),
        ];
        let html = render(&rows, ReportLayout { report_width: 500, images_per_row: 2 });
        // header + ceil(3 / 2) groups
        assert_eq!(html.matches("<tr>").count(), 3);
        assert_eq!(html.matches("<th>Image</th>").count(), 2);

        let a = html.find("a.jpg</td>").unwrap();
        let b = html.find("b.jpg</td>").unwrap();
        let c = html.find("c.jpg</td>").unwrap();
        assert!(a < b && b < c, "records keep their order");
    }

    #[test]
    fn test_names_are_escaped() {
        let mut r = row("x.jpg", "0.10", "Yes");
        r.name = "<b>&\"q\".jpg".to_string();
        r.image_src = "dir/<b>.jpg".to_string();
        let html = render(&[r], ReportLayout::default());
        assert!(html.contains("<td>&lt;b&gt;&amp;&quot;q&quot;.jpg</td>"));
        assert!(html.contains("src=\"dir/&lt;b&gt;.jpg\""));
    }

    #[test]
    fn test_empty_report_has_header_only() {
        let html = render(&[], ReportLayout::default());
        assert!(html.contains("<h2>Face Verification Results</h2>"));
        assert_eq!(html.matches("<tr>").count(), 1);
    }

    #[test]
    fn test_write_overwrites_identically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.html");
        std::fs::write(&path, "stale").unwrap();

        let rows = vec![row("a.jpg", "0.30", "Yes")];
        write(&path, &rows, ReportLayout::default()).unwrap();
        let first = std::fs::read(&path).unwrap();
        write(&path, &rows, ReportLayout::default()).unwrap();
        let second = std::fs::read(&path).unwrap();

        assert_eq!(first, second);
        assert!(!String::from_utf8(first).unwrap().contains("stale"));
    }
}
