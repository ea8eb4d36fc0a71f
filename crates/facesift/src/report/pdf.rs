//! Paginated A4 PDF summary, one text line per record.

use super::{ReportError, ReportRow, REPORT_TITLE};
use printpdf::{BuiltinFont, Mm, PdfDocument};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

const A4_WIDTH_MM: f32 = 210.0;
const A4_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 15.0;
const TITLE_SIZE: f32 = 16.0;
const BODY_SIZE: f32 = 10.0;
const LINE_HEIGHT_MM: f32 = 6.0;
const HEADER_HEIGHT_MM: f32 = 20.0;

/// Lines that fit below the header on one page.
fn lines_per_page() -> usize {
    ((A4_HEIGHT_MM - 2.0 * MARGIN_MM - HEADER_HEIGHT_MM) / LINE_HEIGHT_MM).floor() as usize
}

/// Text line for one record.
pub fn row_line(index: usize, row: &ReportRow) -> String {
    format!(
        "{:>3}. {}   {} -> {}   distance {}   match {}",
        index + 1,
        row.name,
        row.original_text(),
        row.resized_text(),
        row.distance,
        row.label
    )
}

/// Write the PDF, replacing any previous file.
pub fn write(path: &Path, rows: &[ReportRow]) -> Result<(), ReportError> {
    let (doc, first_page, first_layer) =
        PdfDocument::new(REPORT_TITLE, Mm(A4_WIDTH_MM), Mm(A4_HEIGHT_MM), "Layer 1");

    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ReportError::Pdf(format!("font: {e:?}")))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| ReportError::Pdf(format!("font: {e:?}")))?;

    let generated = chrono::Local::now().format("%Y-%m-%d %H:%M").to_string();
    let matches = rows.iter().filter(|r| r.label == "Yes").count();

    let lines: Vec<String> = rows.iter().enumerate().map(|(i, r)| row_line(i, r)).collect();
    let pages: Vec<&[String]> = if lines.is_empty() {
        vec![&lines[..]]
    } else {
        lines.chunks(lines_per_page()).collect()
    };

    for (page_no, page_lines) in pages.iter().enumerate() {
        let layer = if page_no == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page, layer) = doc.add_page(Mm(A4_WIDTH_MM), Mm(A4_HEIGHT_MM), format!("Page {}", page_no + 1));
            doc.get_page(page).get_layer(layer)
        };

        let top = A4_HEIGHT_MM - MARGIN_MM;
        layer.use_text(REPORT_TITLE, TITLE_SIZE, Mm(MARGIN_MM), Mm(top), &bold);
        layer.use_text(
            format!(
                "{} images, {} matches - generated {} - page {}/{}",
                rows.len(),
                matches,
                generated,
                page_no + 1,
                pages.len()
            ),
            BODY_SIZE,
            Mm(MARGIN_MM),
            Mm(top - 8.0),
            &font,
        );

        let mut y = top - HEADER_HEIGHT_MM;
        for line in page_lines.iter() {
            layer.use_text(line.as_str(), BODY_SIZE, Mm(MARGIN_MM), Mm(y), &font);
            y -= LINE_HEIGHT_MM;
        }
    }

    let file = File::create(path).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    doc.save(&mut BufWriter::new(file))
        .map_err(|e| ReportError::Pdf(format!("save: {e:?}")))?;

    tracing::info!(path = %path.display(), rows = rows.len(), pages = pages.len(), "PDF report written");
    Ok(())
}
