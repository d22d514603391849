/// Normalizes a catalog display name for comparison
///
/// # Normalization Steps
///
/// 1. Lowercase every character
/// 2. Collapse internal whitespace runs to a single space
/// 3. Trim leading and trailing whitespace
///
/// The result is only ever used for matching; it is never persisted.
///
/// # Examples
///
/// ```
/// use catalog_harvester::catalog::normalize_name;
///
/// assert_eq!(normalize_name("  The  Factories\tAct "), "the factories act");
/// ```
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
