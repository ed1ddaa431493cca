//! Selector-widget option extraction.
//!
//! Results pages carry one `<select>` per navigation level (event,
//! category, session). Discovery reads the option values straight out of
//! the markup; a missing or malformed widget yields an empty list, which
//! the orchestrator treats as "no children to traverse".

use scraper::{Html, Selector};

/// Extract the option values offered by the selector with the given id,
/// in document order, de-duplicated keeping the first occurrence.
///
/// With `after` set, everything up to and including the first occurrence
/// of that value is dropped; if the value never occurs the result is empty
/// (a stale resume point stops traversal silently).
pub fn extract_options(html: &str, selector_id: &str, after: Option<&str>) -> Vec<String> {
    let doc = Html::parse_document(html);

    let Ok(sel) = Selector::parse(&format!("#{} option", selector_id)) else {
        return Vec::new();
    };

    let mut options: Vec<String> = Vec::new();
    for el in doc.select(&sel) {
        let Some(value) = el.value().attr("value") else {
            continue;
        };
        if !options.iter().any(|o| o == value) {
            options.push(value.to_string());
        }
    }

    match after {
        None => options,
        Some(cutoff) => match options.iter().position(|o| o == cutoff) {
            Some(idx) => options.split_off(idx + 1),
            None => Vec::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <select id="event">
            <option value="QAT">Qatar</option>
            <option value="ARG">Argentina</option>
            <option value="AME">Americas</option>
            <option value="QAT">Qatar again</option>
          </select>
          <select id="category">
            <option value="MotoGP">MotoGP</option>
          </select>
        </body></html>
    "#;

    #[test]
    fn document_order_deduplicated() {
        assert_eq!(
            extract_options(PAGE, "event", None),
            vec!["QAT", "ARG", "AME"]
        );
    }

    #[test]
    fn cutoff_drops_prefix_inclusive() {
        assert_eq!(
            extract_options(PAGE, "event", Some("QAT")),
            vec!["ARG", "AME"]
        );
        assert_eq!(extract_options(PAGE, "event", Some("AME")), Vec::<String>::new());
    }

    #[test]
    fn stale_cutoff_yields_nothing() {
        assert_eq!(
            extract_options(PAGE, "event", Some("GER")),
            Vec::<String>::new()
        );
    }

    #[test]
    fn missing_selector_yields_nothing() {
        assert_eq!(extract_options(PAGE, "session", None), Vec::<String>::new());
        assert_eq!(extract_options("<html></html>", "event", None), Vec::<String>::new());
    }

    #[test]
    fn options_without_value_are_skipped() {
        let page = r#"<select id="event"><option>no value</option><option value="QAT">q</option></select>"#;
        assert_eq!(extract_options(page, "event", None), vec!["QAT"]);
    }
}
