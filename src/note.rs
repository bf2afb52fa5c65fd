//! Parsing of the customer `note` block, one `Label: value` pair per line.

use log::debug;

/// Splits a note into `(label, value)` pairs in line order.
///
/// Only the first colon on a line separates label from value, so values may contain colons (URLs, times).
/// Lines without a colon, or with an empty label, contribute nothing. Labels keep the note's casing; duplicate
/// labels are all returned and the later one wins once merged into a map.
pub fn parse_note(note: Option<&str>) -> Vec<(String, String)> {
    let Some(note) = note.filter(|n| !n.trim().is_empty()) else {
        return Vec::new();
    };

    note.lines()
        .filter_map(|line| {
            let Some((label, value)) = line.split_once(':') else {
                if !line.trim().is_empty() {
                    debug!("Ignoring note line without separator: {line:?}");
                }
                return None;
            };

            let label = label.trim();
            if label.is_empty() {
                debug!("Ignoring note line without label: {line:?}");
                return None;
            }

            Some((label.to_string(), value.trim().to_string()))
        })
        .collect()
}
