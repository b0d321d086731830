//! Runtime configuration
//!
//! Everything is environment driven; there is no config file.

use std::path::PathBuf;

/// Environment variable overriding the SQLite database location
pub const DATABASE_PATH_ENV: &str = "NUTRIPLAN_DATABASE_PATH";

/// Log directive applied on top of `RUST_LOG`
pub const DEFAULT_LOG_DIRECTIVE: &str = "nutriplan=info";

/// Get the database path from environment or use default
///
/// The default is `data/nutriplan.db` under the project root, found by walking
/// up from `target/debug` or `target/release` when run through cargo.
pub fn database_path() -> PathBuf {
    std::env::var(DATABASE_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| default_database_path())
}

fn default_database_path() -> PathBuf {
    let mut path = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));

    if path.ends_with("release") || path.ends_with("debug") {
        if let Some(grandparent) = path.parent().and_then(|p| p.parent()) {
            path = grandparent.to_path_buf();
        }
    }

    path.push("data");
    path.push("nutriplan.db");
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_path_file_name() {
        let path = default_database_path();
        assert!(path.ends_with("data/nutriplan.db"));
    }
}
