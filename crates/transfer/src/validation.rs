use crate::TransferError;

/// Normalizes a storage path and rejects anything that could escape the
/// storage root.
///
/// Backslashes become `/`, empty and `.` segments are dropped, and a leading
/// root is stripped so the result is always relative. Rejects:
/// - Paths with no segments left (empty, `/`, `.`)
/// - Any segment that is `..` or starts with `..`
///
/// The output is stable: sanitizing it again returns it unchanged.
pub fn sanitize_storage_path(path: &str) -> Result<String, TransferError> {
    let normalized = path.replace('\\', "/");
    let mut segments = Vec::new();

    for segment in normalized.split('/') {
        match segment {
            "" | "." => {}
            s if s.starts_with("..") => {
                return Err(TransferError::InvalidPath(format!(
                    "parent directory traversal not allowed: {path}"
                )));
            }
            s => segments.push(s),
        }
    }

    if segments.is_empty() {
        return Err(TransferError::InvalidPath(format!(
            "path resolves to the storage root: {path:?}"
        )));
    }

    Ok(segments.join("/"))
}

/// Joins a relative path under the configured base path.
///
/// No normalization happens here; run [`sanitize_storage_path`] on the result
/// before it reaches the network.
pub fn join_storage_path(base: &str, relative: &str) -> String {
    let base = base.trim_end_matches(['/', '\\']);
    let relative = relative.trim_start_matches(['/', '\\']);
    if base.is_empty() {
        format!("/{relative}")
    } else {
        format!("{base}/{relative}")
    }
}
