/// Maximum number of characters kept from a display name in an identifier
pub const MAX_STEM_CHARS: usize = 200;

/// Characters that are not allowed in an artifact identifier
const RESERVED_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Derives the artifact identifier for a catalog display name
///
/// The identifier is the dedup key across the history file, the failure
/// ledger and remote storage, so it must be a pure function of its inputs.
///
/// # Derivation Steps
///
/// 1. Trim surrounding whitespace from the display name
/// 2. Replace filesystem-reserved characters and control characters with `_`
/// 3. Bound the stem to [`MAX_STEM_CHARS`] characters and drop whitespace
///    left exposed at the cut
/// 4. Append `.` and the artifact extension
///
/// # Examples
///
/// ```
/// use catalog_harvester::catalog::derive_identifier;
///
/// assert_eq!(
///     derive_identifier("The Code/Amendment: 2024", "pdf"),
///     "The Code_Amendment_ 2024.pdf"
/// );
/// ```
pub fn derive_identifier(display_name: &str, extension: &str) -> String {
    let stem: String = display_name
        .trim()
        .chars()
        .map(|c| {
            if RESERVED_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .take(MAX_STEM_CHARS)
        .collect();
    // The history file is trimmed on reload, so a trailing space would never match again.
    let stem = stem.trim_end();

    let extension = extension.trim_start_matches('.');
    if extension.is_empty() {
        stem.to_string()
    } else {
        format!("{}.{}", stem, extension)
    }
}

/// Recovers an approximate display name from an identifier
///
/// Strips the artifact extension and maps `_` back to spaces. Reserved
/// characters cannot be recovered exactly, which is acceptable because the
/// result is only fed through the exclusion registry's normalized matching.
pub fn recover_display_name(identifier: &str, extension: &str) -> String {
    let extension = extension.trim_start_matches('.');
    let stem = if extension.is_empty() {
        identifier
    } else {
        identifier
            .strip_suffix(&format!(".{}", extension))
            .unwrap_or(identifier)
    };
    stem.replace('_', " ")
}
