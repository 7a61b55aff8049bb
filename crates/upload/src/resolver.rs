//! Collision-free target names.
//!
//! Before an upload starts, the target store is probed for the desired
//! name. Taken names get a numeric suffix before the extension
//! (`report.pdf` -> `report_1.pdf`).

use tracing::{debug, error};

use crate::transport::TransportFuture;

/// Suffixes tried before falling back to a random one.
const MAX_SUFFIX_ATTEMPTS: u32 = 1000;

/// Existence check against the target store.
///
/// Implemented by the native (non-chunked) store client.
pub trait StoreProbe: Send + Sync {
    /// Returns true if `path` already exists in the store.
    fn exists<'a>(&'a self, path: &'a str) -> TransportFuture<'a, bool>;
}

/// Returns `path` if it is free, otherwise the first free
/// `<stem>_<n><ext>` for `n` in `1..=1000`, otherwise
/// `<stem>_<random><ext>`.
pub async fn resolve_unique_path(probe: &dyn StoreProbe, path: &str) -> String {
    if !probe.exists(path).await {
        return path.to_string();
    }

    let (stem, ext) = split_extension(path);
    for i in 1..=MAX_SUFFIX_ATTEMPTS {
        let candidate = format!("{stem}_{i}{ext}");
        if !probe.exists(&candidate).await {
            debug!(path, candidate = %candidate, "target name taken; using suffix");
            return candidate;
        }
    }

    error!(path, "too many attempts to find a unique filename");
    format!("{stem}_{}{ext}", uuid::Uuid::new_v4().simple())
}

/// Splits `path` into stem and extension (with its dot).
///
/// Only the last segment is considered, and a leading dot (`.bashrc`) is
/// part of the name, not an extension.
fn split_extension(path: &str) -> (&str, &str) {
    let name_start = path.rfind('/').map_or(0, |i| i + 1);
    match path[name_start..].rfind('.') {
        Some(dot) if dot > 0 => path.split_at(name_start + dot),
        _ => (path, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Store that knows a fixed set of names and records every probe.
    struct MockStore {
        existing: HashSet<String>,
        probes: Mutex<Vec<String>>,
    }

    impl MockStore {
        fn new(existing: &[&str]) -> Self {
            Self {
                existing: existing.iter().map(|s| s.to_string()).collect(),
                probes: Mutex::new(Vec::new()),
            }
        }

        fn probe_count(&self) -> usize {
            self.probes.lock().unwrap().len()
        }
    }

    impl StoreProbe for MockStore {
        fn exists<'a>(&'a self, path: &'a str) -> TransportFuture<'a, bool> {
            self.probes.lock().unwrap().push(path.to_string());
            let found = self.existing.contains(path);
            Box::pin(async move { found })
        }
    }

    /// Store where every name is taken.
    struct FullStore;

    impl StoreProbe for FullStore {
        fn exists<'a>(&'a self, _path: &'a str) -> TransportFuture<'a, bool> {
            Box::pin(async { true })
        }
    }

    #[tokio::test]
    async fn free_name_is_kept() {
        let store = MockStore::new(&[]);
        let path = resolve_unique_path(&store, "/data/report.pdf").await;
        assert_eq!(path, "/data/report.pdf");
        assert_eq!(store.probe_count(), 1);
    }

    #[tokio::test]
    async fn taken_name_gets_suffix() {
        let store = MockStore::new(&["/data/report.pdf"]);
        let path = resolve_unique_path(&store, "/data/report.pdf").await;
        assert_eq!(path, "/data/report_1.pdf");
    }

    #[tokio::test]
    async fn suffix_skips_taken_candidates() {
        let store = MockStore::new(&["a/b.txt", "a/b_1.txt", "a/b_2.txt"]);
        let path = resolve_unique_path(&store, "a/b.txt").await;
        assert_eq!(path, "a/b_3.txt");
        assert_eq!(store.probe_count(), 4);
    }

    #[tokio::test]
    async fn name_without_extension() {
        let store = MockStore::new(&["dir/README"]);
        assert_eq!(resolve_unique_path(&store, "dir/README").await, "dir/README_1");
    }

    #[tokio::test]
    async fn exhausted_suffixes_fall_back_to_random() {
        let path = resolve_unique_path(&FullStore, "x/movie.mkv").await;
        assert!(path.starts_with("x/movie_"), "{path}");
        assert!(path.ends_with(".mkv"), "{path}");
        // 32 hex chars of a simple UUID.
        assert_eq!(path.len(), "x/movie_".len() + 32 + ".mkv".len());
    }

    #[test]
    fn split_extension_cases() {
        assert_eq!(split_extension("a/b.tar.gz"), ("a/b.tar", ".gz"));
        assert_eq!(split_extension("a.dir/file"), ("a.dir/file", ""));
        assert_eq!(split_extension("a/.bashrc"), ("a/.bashrc", ""));
        assert_eq!(split_extension("file."), ("file", "."));
        assert_eq!(split_extension("plain"), ("plain", ""));
    }
}
