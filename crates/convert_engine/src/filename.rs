use sha2::{Digest, Sha256};

const MAX_STEM_CHARS: usize = 80;

/// Windows-safe local name for a retrieved artifact.
///
/// `suggested` (usually from `Content-Disposition`) wins over the last path
/// segment of `artifact_ref`. When neither yields a usable name the result is
/// `artifact--{short_hash(artifact_ref)}`.
pub fn artifact_filename(suggested: Option<&str>, artifact_ref: &str) -> String {
    suggested
        .map(sanitize)
        .filter(|name| !name.is_empty())
        .or_else(|| Some(sanitize(last_segment(artifact_ref))).filter(|name| !name.is_empty()))
        .unwrap_or_else(|| format!("artifact--{}", short_hash(artifact_ref)))
}

fn last_segment(artifact_ref: &str) -> &str {
    let path = artifact_ref
        .split(['?', '#'])
        .next()
        .unwrap_or(artifact_ref);
    path.rsplit('/').next().unwrap_or(path)
}

fn sanitize(input: &str) -> String {
    let cleaned: String = input
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    let cleaned = collapse_underscores(cleaned.trim_matches(&['_', ' ', '.'][..]));
    if cleaned.is_empty() {
        return cleaned;
    }

    let (stem, ext) = match cleaned.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => (stem, Some(ext)),
        _ => (cleaned.as_str(), None),
    };
    let mut stem: String = stem.chars().take(MAX_STEM_CHARS).collect();
    if is_reserved_windows_name(&stem) {
        stem.push('_');
    }
    match ext {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem,
    }
}

fn collapse_underscores(input: &str) -> String {
    let mut compacted = String::with_capacity(input.len());
    let mut prev_underscore = false;
    for c in input.chars() {
        if c == '_' {
            if !prev_underscore {
                compacted.push(c);
            }
            prev_underscore = true;
        } else {
            compacted.push(c);
            prev_underscore = false;
        }
    }
    compacted
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let mut hex = String::with_capacity(8);
    for byte in digest.iter().take(4) {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}
