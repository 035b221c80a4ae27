//! Resource path translation.

use std::path::PathBuf;

use url::Url;

/// Local path for a resource argument. `file://` URIs are decoded; anything
/// else is taken as a path already.
pub fn uri_to_fs_path(value: &str) -> PathBuf {
    if value.starts_with("file:") {
        if let Some(path) = Url::parse(value).ok().and_then(|url| url.to_file_path().ok()) {
            return path;
        }
    }
    PathBuf::from(value)
}
