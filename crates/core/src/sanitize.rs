//! Helpers for turning untrusted upload names into safe file names.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::collections::HashSet;
use std::path::Path;

static UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_.\-]").unwrap());

/// Stem used when nothing safe is left of a name.
const FALLBACK_STEM: &str = "document";

/// Returns the last path component of a client-supplied name.
///
/// Some browsers send the full client path (`C:\Users\me\report.pdf`).
pub fn display_name(name: &str) -> String {
    name.rsplit(['/', '\\'])
        .next()
        .unwrap_or(name)
        .trim()
        .to_string()
}

/// Makes a name safe to use as a single path component.
///
/// Whitespace runs become `_`, anything outside `[A-Za-z0-9_.-]` is dropped
/// and leading/trailing dots and underscores are trimmed. May return an
/// empty string.
pub fn secure_filename(name: &str) -> String {
    let name = display_name(name);
    let joined = name.split_whitespace().collect::<Vec<_>>().join("_");
    let cleaned = UNSAFE_CHARS.replace_all(&joined, "");
    cleaned.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// Derives the output file name for an uploaded document: same stem,
/// `extension` as the new extension.
pub fn output_name_for(original_name: &str, extension: &str) -> String {
    let display = display_name(original_name);
    let stem = Path::new(&display)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let stem = secure_filename(&stem);
    let stem = if stem.is_empty() { FALLBACK_STEM } else { &stem };
    format!("{}.{}", stem, extension)
}

/// Output names for a whole batch, in order.
///
/// Names that collide with an earlier file of the same batch get the
/// 1-indexed batch position appended to the stem (`report_3.docx`).
pub fn unique_output_names<S: AsRef<str>>(original_names: &[S], extension: &str) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    original_names
        .iter()
        .enumerate()
        .map(|(idx, original)| {
            let mut name = output_name_for(original.as_ref(), extension);
            while taken.contains(&name) {
                let stem = name
                    .strip_suffix(&format!(".{}", extension))
                    .unwrap_or(&name)
                    .to_string();
                name = format!("{}_{}.{}", stem, idx + 1, extension);
            }
            taken.insert(name.clone());
            name
        })
        .collect()
}

/// Whether `name` has a `.pdf` extension (case-insensitive).
pub fn has_pdf_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}
