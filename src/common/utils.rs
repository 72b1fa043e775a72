//! Utility functions for minifs

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::path::{Component, Path, PathBuf};

/// Percent-encoding set for file names carried as a single URL path segment.
/// `/` is encoded so sub-directory names survive routing.
const NAME_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b'/')
    .add(b'%')
    .add(b' ')
    .add(b'?')
    .add(b'#')
    .add(b'&')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Encode a file name for use as one URL path segment
pub fn encode_name(name: &str) -> String {
    utf8_percent_encode(name, NAME_ENCODE_SET).to_string()
}

/// Resolve a client-supplied relative name below `root`.
///
/// The name is split on `/` and every segment must be a plain file name:
/// empty segments (leading, trailing or doubled `/`), `.` and `..` are
/// rejected, so each stored file has exactly one spelling and no request
/// can address a file outside the node's root.
pub fn resolve_under(root: &Path, name: &str) -> crate::Result<PathBuf> {
    let mut resolved = root.to_path_buf();
    for segment in name.split('/') {
        let mut components = Path::new(segment).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(part)), None) if part == segment => resolved.push(part),
            _ => return Err(crate::Error::InvalidName(name.to_string())),
        }
    }
    Ok(resolved)
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_idx])
}

/// Retry with exponential backoff
pub async fn retry_with_backoff<F, Fut, T>(
    mut f: F,
    max_retries: usize,
    initial_delay: std::time::Duration,
) -> crate::Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = crate::Result<T>>,
{
    let mut delay = initial_delay;
    let mut attempt = 0;

    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_retryable() && attempt + 1 < max_retries => {
                attempt += 1;
                tracing::warn!(
                    "Retry attempt {} failed: {}, retrying in {:?}",
                    attempt,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(std::time::Duration::from_secs(30));
            }
            Err(e) => return Err(e),
        }
    }
}
