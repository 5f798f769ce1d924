//! Statistic name validation and canonical field suffixes.

/// Statistics requested when an entry lists none.
pub const DEFAULT_STATISTICS: [&str; 5] = ["Average", "Maximum", "Minimum", "Sum", "SampleCount"];

/// Maps a statistic name to its canonical field suffix.
///
/// The five basic statistics map to short names. Any other name starting with
/// `p` is accepted as a percentile and returned unchanged. Everything else is
/// rejected with `None`.
pub fn resolve(name: &str) -> Option<&str> {
    match name {
        "Average" => Some("avg"),
        "Sum" => Some("sum"),
        "Maximum" => Some("max"),
        "Minimum" => Some("min"),
        "SampleCount" => Some("count"),
        _ if name.starts_with('p') => Some(name),
        _ => None,
    }
}

/// Canonical suffix used in field names; unknown names pass through.
pub fn field_suffix(name: &str) -> &str {
    resolve(name).unwrap_or(name)
}

/// The default statistic set as owned strings.
pub fn defaults() -> Vec<String> {
    DEFAULT_STATISTICS.iter().map(|s| (*s).to_string()).collect()
}
