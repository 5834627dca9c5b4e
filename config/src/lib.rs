//! Configuration for Scribe.
//!
//! The file lives at `~/.scribe/config.toml`. It is parsed into private raw
//! structs, resolved into one immutable [`Settings`] snapshot plus the trigger
//! and shortcut lists, and published through a [`ConfigStore`]. Readers hold
//! `watch` receivers and always see whole snapshots.
//!
//! ```toml
//! [provider]
//! kind = "gemini"
//! api_key = "${GEMINI_API_KEY}"
//!
//! [streaming]
//! enabled = true
//! delay_ms = 40
//!
//! [[triggers]]
//! trigger = "@haiku"
//! instruction = "Rewrite the text as a haiku."
//! ```

mod persist;
mod raw;
mod store;

use std::env;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub use persist::atomic_write;
pub use raw::{Resolved, parse_str};
pub use store::{ConfigStore, FileStore, MemoryStore, StoreError};

pub use scribe_types::Settings;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &PathBuf {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

/// `~/.scribe/config.toml`, or `None` without a home directory.
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".scribe").join("config.toml"))
}

/// Replace `${VAR}` with the value of `VAR` (empty when unset).
///
/// An unclosed `${` or an empty `${}` is kept literally.
#[must_use]
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) if end > 0 => {
                out.push_str(&env::var(&after[..end]).unwrap_or_default());
                rest = &after[end + 1..];
            }
            Some(_) => {
                out.push_str("${}");
                rest = &after[1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::io;
    use std::path::PathBuf;

    use super::{ConfigError, expand_env_vars};

    #[test]
    fn expand_env_vars_without_vars_is_identity() {
        assert_eq!(expand_env_vars("plain text"), "plain text");
        assert_eq!(expand_env_vars(""), "");
    }

    #[test]
    fn expand_env_vars_missing_var_becomes_empty() {
        assert_eq!(
            expand_env_vars("key=${SCRIBE_TEST_SURELY_UNSET_VAR_91}!"),
            "key=!"
        );
    }

    #[test]
    fn expand_env_vars_known_var() {
        let path = env::var("PATH").unwrap_or_default();
        assert_eq!(expand_env_vars("${PATH}"), path);
        assert_eq!(expand_env_vars("a${PATH}b${PATH}"), format!("a{path}b{path}"));
    }

    #[test]
    fn expand_env_vars_malformed_is_preserved() {
        assert_eq!(expand_env_vars("${UNCLOSED"), "${UNCLOSED");
        assert_eq!(expand_env_vars("x${}y"), "x${}y");
        assert_eq!(expand_env_vars("héllo ${"), "héllo ${");
    }

    #[test]
    fn config_error_path_accessor() {
        let path = PathBuf::from("/tmp/scribe.toml");
        let err = ConfigError::Read {
            path: path.clone(),
            source: io::Error::other("denied"),
        };
        assert_eq!(err.path(), &path);
        assert!(err.to_string().contains("/tmp/scribe.toml"));
    }
}
