//! Artifact file naming.
//!
//! Every download is named `<prefix>_<stem>.<ext>`, where the stem is the
//! source name with its last extension removed:
//! - `("compressed", "a.jpg", "jpg")` → `compressed_a.jpg`
//! - `("converted", "holiday.final.png", "webp")` → `converted_holiday.final.webp`
//! - `("resized", ".profile", "png")` → `resized_.profile.png`

/// Source name without its last extension.
///
/// A leading dot does not start an extension, so dotfiles keep their name.
/// Directory components are dropped.
pub fn file_stem(name: &str) -> &str {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match base.rfind('.') {
        Some(0) | None => base,
        Some(dot) => &base[..dot],
    }
}

/// Deterministic artifact name for an operation result.
pub fn artifact_name(prefix: &str, source_name: &str, extension: &str) -> String {
    let stem = file_stem(source_name);
    let stem = if stem.is_empty() { "image" } else { stem };
    format!("{prefix}_{stem}.{extension}")
}
