//! Rider display-name splitting.
//!
//! The source site prints riders as "First [Middle] LAST" with the surname
//! in capitals. The surname is recovered as the trailing run of accepted
//! characters starting at a space; everything before it is the given name.

/// Accented capitals that appear in surnames on the source site.
const ACCENTED_UPPERCASE: &str = "ÓÑØÜÄÖÉÚÁ";

/// Lower-case letters admitted mid-run for the "Mc" and "Jr" infixes.
const INFIX_LOWERCASE: &str = "cr";

/// Separators admitted inside compound surnames.
const SEPARATORS: &str = "'- ";

fn is_run_start(c: char) -> bool {
    c.is_ascii_uppercase() || ACCENTED_UPPERCASE.contains(c)
}

fn is_run_char(c: char) -> bool {
    is_run_start(c) || INFIX_LOWERCASE.contains(c) || SEPARATORS.contains(c)
}

/// True when `s` is an acceptable surname suffix: an upper-case start,
/// run characters throughout, with the final character unconstrained
/// (stray trailing punctuation shows up in the source data).
fn is_surname_run(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !is_run_start(first) {
        return false;
    }
    let rest: Vec<char> = chars.collect();
    let n = rest.len();
    rest.iter()
        .enumerate()
        .all(|(i, &c)| is_run_char(c) || i + 1 == n)
}

/// Split a display name into (first, last), both trimmed and lower-cased.
///
/// Returns `None` when no surname suffix can be found or either segment
/// ends up empty; callers skip such rows rather than failing the batch.
pub fn split_display_name(full: &str) -> Option<(String, String)> {
    for (idx, c) in full.char_indices() {
        if c != ' ' {
            continue;
        }
        let rest = &full[idx + 1..];
        if !is_surname_run(rest) {
            continue;
        }
        let first = full[..idx].trim().to_lowercase();
        let last = rest.trim().to_lowercase();
        if first.is_empty() || last.is_empty() {
            return None;
        }
        return Some((first, last));
    }
    None
}
