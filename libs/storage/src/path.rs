/// Longest title fragment kept in an object name
pub const TITLE_CHARS: usize = 50;

/// Object name of a finished recording:
/// `{prefix}/{owner}_{timestamp}_{title}.{extension}`
pub fn recording_file_name(
    prefix: &str,
    owner: &str,
    timestamp_ms: i64,
    title: &str,
    extension: &str,
) -> String {
    format!(
        "{}/{}_{}_{}.{}",
        prefix.trim_matches('/'),
        owner,
        timestamp_ms,
        sanitize_title(title),
        extension
    )
}

/// Replaces everything but ASCII letters and digits with `_`
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .take(TITLE_CHARS)
        .collect()
}

/// Validate storage path format
pub fn validate_path(path: &str) -> bool {
    !path.is_empty() && !path.contains("..") && !path.starts_with('/')
}
