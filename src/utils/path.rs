/// Normalizes a request or page path: one leading `/`, no repeated
/// separators, no trailing `/` except for the root.
pub fn normalize_path(path: &str) -> String {
    let mut normalized = String::with_capacity(path.len() + 1);
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        normalized.push('/');
        normalized.push_str(segment);
    }
    if normalized.is_empty() {
        normalized.push('/');
    }
    normalized
}

/// Prefixes application relative `location`s (starting with `/`) with the
/// context path. Absolute URLs are returned unchanged.
pub fn absolute_location(
    context_path: &str,
    location: &str,
) -> String {
    if location.starts_with('/') {
        format!("{}{}", context_path, location)
    } else {
        location.to_string()
    }
}
