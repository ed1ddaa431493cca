//! Session results-table extraction.
//!
//! The source site renders one flat table per session page. Annotation
//! rows ("Not Classified", fastest-lap banners, etc.) share the same cell
//! markup as data rows, so the parser first counts the real rows from the
//! raw markup and then walks the cells, skipping the known sentinel
//! phrases.

use scraper::{Html, Selector};

use crate::models::RawResultsTable;

/// Cell texts that are annotations rather than results. Exact strings as
/// the source site prints them, trailing spaces included.
pub const NON_RESULT_MARKERS: &[&str] = &[
    "Not Classified",
    "Fastest Lap: ",
    "Circuit Record Lap: ",
    "Best Lap:",
    "Pole Lap: ",
    "Not Finished 1st Lap",
    "Not Starting",
    "Excluded",
];

/// A cell containing only a non-breaking space ends the results block.
const BLANK_CELL: &str = "\u{a0}";

/// Number of data rows the page's `<tbody>` holds: `</tr>` markers minus
/// occurrences of the sentinel phrases. Zero when there is no tbody.
pub fn count_result_rows(html: &str, to_skip: &[&str]) -> usize {
    let Some(start) = html.find("<tbody>") else {
        return 0;
    };
    let end = match html[start..].find("</tbody>") {
        Some(off) => start + off + "</tbody>".len(),
        None => html.len(),
    };
    let segment = &html[start..end];

    let rows = segment.matches("</tr>").count();
    let skipped: usize = to_skip.iter().map(|s| segment.matches(s).count()).sum();
    rows.saturating_sub(skipped)
}

/// Parse a session results page into header + data rows.
///
/// Header cells are the `<th>` texts minus sentinel phrases; each data row
/// is one fixed-width tuple of cell text. The walk stops when the count
/// from `count_result_rows` is spent or a blank-cell marker is reached,
/// and a short trailing fragment is dropped rather than erroring.
pub fn parse_results_table(html: &str, source_url: &str) -> RawResultsTable {
    let doc = Html::parse_document(html);

    let event_info = Selector::parse(".padbot5")
        .ok()
        .and_then(|sel| {
            doc.select(&sel)
                .next()
                .map(|el| el.text().collect::<String>().trim().to_string())
        })
        .unwrap_or_default();

    let header: Vec<String> = match Selector::parse("th") {
        Ok(sel) => doc
            .select(&sel)
            .map(|th| th.text().collect::<String>())
            .filter(|t| !NON_RESULT_MARKERS.contains(&t.as_str()))
            .collect(),
        Err(_) => Vec::new(),
    };

    let cells: Vec<String> = match Selector::parse("td") {
        Ok(sel) => doc
            .select(&sel)
            .map(|td| td.text().collect::<String>())
            .collect(),
        Err(_) => Vec::new(),
    };

    let column_count = header.len();
    let expected_rows = count_result_rows(html, NON_RESULT_MARKERS);

    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut i = 0;
    while i < cells.len() && rows.len() < expected_rows && cells[i] != BLANK_CELL {
        if NON_RESULT_MARKERS.contains(&cells[i].as_str()) {
            i += 1;
            continue;
        }
        if column_count == 0 || i + column_count > cells.len() {
            // Short trailing fragment: drop and stop.
            break;
        }
        rows.push(cells[i..i + column_count].to_vec());
        i += column_count;
    }

    RawResultsTable {
        source_url: source_url.to_string(),
        event_info,
        header,
        rows,
    }
}
