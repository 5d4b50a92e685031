use chrono::{DateTime, Utc};

pub fn utc_now() -> DateTime<Utc> {
    Utc::now()
}

/// Canonical form for feature, module, table and column codes: trimmed,
/// lower-cased, every run of non-alphanumeric characters collapsed to `_`
/// with no leading or trailing separator.
pub fn normalize_code(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;
    for c in raw.trim().chars() {
        if c.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.extend(c.to_lowercase());
        } else {
            pending_sep = true;
        }
    }
    out
}

/// Lighter normalization for scope names, menu codes and role keys: trim and
/// lower-case only.
pub fn normalize_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Normalizes every segment of a dotted action path (`Editar.Endereco` ->
/// `editar.endereco`), dropping empty segments.
pub fn normalize_path(raw: &str) -> String {
    raw.split('.')
        .map(normalize_code)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join(".")
}
