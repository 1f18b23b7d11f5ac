// LogHarvest - platform/fs.rs
//
// Message spool access: recursive discovery of raw message files and bounded
// reads of their bytes.
//
//   - Per-entry I/O errors are non-fatal and collected as warnings.
//   - Paths come back in lexical order, which defines message fetch order.
//   - max_messages and max_depth are clamped to named absolute bounds.

use crate::util::constants;
use crate::util::error::{DiscoveryError, MessageError};
use std::path::{Path, PathBuf};

/// Configuration for spool discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpoolConfig {
    /// Maximum directory recursion depth below the spool root.
    pub max_depth: usize,

    /// Maximum number of messages returned; the rest are dropped with a warning.
    pub max_messages: usize,

    /// Filename glob patterns (case-insensitive). A file must match one.
    pub include_patterns: Vec<String>,
}

impl Default for SpoolConfig {
    fn default() -> Self {
        Self {
            max_depth: constants::DEFAULT_MAX_DEPTH,
            max_messages: constants::DEFAULT_MAX_MESSAGES,
            include_patterns: constants::DEFAULT_INCLUDE_PATTERNS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }
}

/// Discovery result: message paths in fetch order plus non-fatal warnings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpoolListing {
    pub paths: Vec<PathBuf>,
    pub warnings: Vec<String>,

    /// Matching files found before the `max_messages` cap was applied.
    pub total_found: usize,
}

/// Find every message file under `root`.
///
/// Returns `Err` only if the root itself is unusable (`RootNotFound`,
/// `NotADirectory`, `PermissionDenied`).
pub fn discover_messages(root: &Path, config: &SpoolConfig) -> Result<SpoolListing, DiscoveryError> {
    // fs::metadata rather than Path::is_dir so PermissionDenied is not
    // reported as "does not exist".
    match std::fs::metadata(root) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => {
            return Err(DiscoveryError::NotADirectory {
                path: root.to_path_buf(),
            })
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(DiscoveryError::PermissionDenied {
                path: root.to_path_buf(),
                source: e,
            })
        }
        Err(_) => {
            return Err(DiscoveryError::RootNotFound {
                path: root.to_path_buf(),
            })
        }
    }

    let max_messages = config.max_messages.min(constants::ABSOLUTE_MAX_MESSAGES);
    let max_depth = config.max_depth.min(constants::ABSOLUTE_MAX_DEPTH);
    let include_pats = compile_patterns(&config.include_patterns);

    tracing::debug!(
        root = %root.display(),
        max_depth,
        max_messages,
        include = ?config.include_patterns,
        "Spool discovery starting"
    );

    let mut listing = SpoolListing::default();

    let walker = walkdir::WalkDir::new(root)
        .max_depth(max_depth)
        .follow_links(false)
        .sort_by_file_name();

    for entry_result in walker {
        let entry = match entry_result {
            Ok(e) => e,
            Err(e) => {
                let path_str = e
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "<unknown>".to_string());
                let msg = format!("Cannot access '{path_str}': {e}");
                tracing::debug!(warning = %msg, "Discovery warning");
                listing.warnings.push(msg);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            listing
                .warnings
                .push(format!("Skipping '{}': non-UTF-8 filename", path.display()));
            continue;
        };

        if !is_included(file_name, &include_pats) {
            tracing::trace!(file = file_name, "Not matched by include patterns");
            continue;
        }

        listing.paths.push(path.to_path_buf());
    }

    // walkdir sorts per directory; a full sort gives one lexical order across
    // the whole tree.
    listing.paths.sort();
    listing.total_found = listing.paths.len();

    if listing.total_found > max_messages {
        listing.paths.truncate(max_messages);
        listing.warnings.push(format!(
            "{} messages were found but the limit is {max_messages}. \
             Only the first {max_messages} in name order will be processed.",
            listing.total_found
        ));
        tracing::info!(
            total_found = listing.total_found,
            limit = max_messages,
            "Message list truncated"
        );
    }

    tracing::debug!(
        total_found = listing.total_found,
        messages = listing.paths.len(),
        warnings = listing.warnings.len(),
        "Spool discovery complete"
    );

    Ok(listing)
}

/// Read one raw message, refusing files above `MAX_MESSAGE_SIZE`.
pub fn read_message_bytes(path: &Path) -> Result<Vec<u8>, MessageError> {
    let io_err = |source| MessageError::Io {
        path: path.to_path_buf(),
        source,
    };

    let size = std::fs::metadata(path).map_err(io_err)?.len();
    if size > constants::MAX_MESSAGE_SIZE {
        return Err(MessageError::TooLarge {
            id: message_id_for(path),
            size,
            max: constants::MAX_MESSAGE_SIZE,
        });
    }
    std::fs::read(path).map_err(io_err)
}

/// Diagnostic identifier for a spool file: its file name.
pub fn message_id_for(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// =============================================================================
// Glob helpers
// =============================================================================

/// Compile glob patterns, logging and skipping invalid ones.
fn compile_patterns(patterns: &[String]) -> Vec<glob::Pattern> {
    patterns
        .iter()
        .filter_map(|p| match glob::Pattern::new(p) {
            Ok(compiled) => Some(compiled),
            Err(e) => {
                tracing::warn!(pattern = p, error = %e, "Invalid glob pattern, skipping");
                None
            }
        })
        .collect()
}

/// An empty pattern list includes every file.
fn is_included(file_name: &str, patterns: &[glob::Pattern]) -> bool {
    let options = glob::MatchOptions {
        case_sensitive: false,
        ..glob::MatchOptions::new()
    };
    patterns.is_empty() || patterns.iter().any(|p| p.matches_with(file_name, options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(dir: &Path, rel: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"Subject: x\r\n\r\nbody").unwrap();
    }

    #[test]
    fn test_discovers_eml_files_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "b.eml");
        touch(dir.path(), "a.EML");
        touch(dir.path(), "sub/c.eml");
        touch(dir.path(), "notes.txt");

        let listing = discover_messages(dir.path(), &SpoolConfig::default()).unwrap();
        let names: Vec<String> = listing.paths.iter().map(|p| message_id_for(p)).collect();
        assert_eq!(names, vec!["a.EML", "b.eml", "c.eml"]);
        assert!(listing.warnings.is_empty());
    }

    #[test]
    fn test_max_messages_truncates_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..5 {
            touch(dir.path(), &format!("m{i}.eml"));
        }
        let config = SpoolConfig {
            max_messages: 2,
            ..SpoolConfig::default()
        };
        let listing = discover_messages(dir.path(), &config).unwrap();
        assert_eq!(listing.paths.len(), 2);
        assert_eq!(listing.total_found, 5);
        assert_eq!(listing.warnings.len(), 1);
        assert!(listing.paths[0].ends_with("m0.eml"));
    }

    #[test]
    fn test_max_depth_limits_descent() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "top.eml");
        touch(dir.path(), "a/b/deep.eml");
        let config = SpoolConfig {
            max_depth: 1,
            ..SpoolConfig::default()
        };
        let listing = discover_messages(dir.path(), &config).unwrap();
        assert_eq!(listing.paths.len(), 1);
    }

    #[test]
    fn test_missing_root_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = discover_messages(&dir.path().join("nope"), &SpoolConfig::default());
        assert!(matches!(result, Err(DiscoveryError::RootNotFound { .. })));
    }

    #[test]
    fn test_file_root_is_error() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "one.eml");
        let result = discover_messages(&dir.path().join("one.eml"), &SpoolConfig::default());
        assert!(matches!(result, Err(DiscoveryError::NotADirectory { .. })));
    }

    #[test]
    fn test_read_message_bytes() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "m.eml");
        let bytes = read_message_bytes(&dir.path().join("m.eml")).unwrap();
        assert!(bytes.starts_with(b"Subject"));

        let missing = read_message_bytes(&dir.path().join("gone.eml"));
        assert!(matches!(missing, Err(MessageError::Io { .. })));
    }
}
