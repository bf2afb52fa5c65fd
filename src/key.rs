//! Canonical snake_case form for payload and note keys.

/// Converts a key of arbitrary casing into a lower-case, underscore separated identifier.
///
/// Word breaks are inserted at non-alphanumeric characters, at lower/digit → upper transitions, before the
/// last capital of an acronym that starts a new word (`HTTPServer` → `http_server`), and between a letter
/// and a following digit (`address1` → `address_1`). Already-canonical keys are returned unchanged.
pub fn normalize_key(key: &str) -> String {
    let chars: Vec<char> = key.trim().chars().collect();
    let mut out = String::with_capacity(chars.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            push_separator(&mut out);
            continue;
        }

        if let Some(&prev) = i.checked_sub(1).and_then(|p| chars.get(p)) {
            let next = chars.get(i + 1).copied();
            let breaks = if c.is_uppercase() {
                prev.is_lowercase()
                    || prev.is_numeric()
                    || (prev.is_uppercase() && next.is_some_and(char::is_lowercase))
            } else {
                c.is_numeric() && prev.is_alphabetic()
            };

            if breaks {
                push_separator(&mut out);
            }
        }

        // Some lower-case forms carry combining marks (`İ` -> `i\u{307}`).
        for lower in c.to_lowercase() {
            if lower.is_alphanumeric() {
                out.push(lower);
            } else {
                push_separator(&mut out);
            }
        }
    }

    while out.ends_with('_') {
        out.pop();
    }

    out
}

fn push_separator(out: &mut String) {
    if !out.is_empty() && !out.ends_with('_') {
        out.push('_');
    }
}
