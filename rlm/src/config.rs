//! `create-env` configuration (spec §4.8, §6).

use rlm_sandbox::SandboxConfig;
use rlm_store::StoreConfig;
use std::path::PathBuf;

/// Configuration for [`crate::create_env`].
///
/// `api_key`, `base_url`, and `default_model` are required (spec §6:
/// "config (required: api-key, base-url, default-model)"); a blank
/// value in any of them is rejected at construction.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// API key forwarded to the HTTP transport.
    pub api_key: String,
    /// Base URL of the chat-completions-style API.
    pub base_url: String,
    /// Model used when a `query!` call doesn't override it.
    pub default_model: String,
    /// Directory backing a persistent store; `None` opens a disposable
    /// one in a fresh temporary directory.
    pub persistent_dir: Option<PathBuf>,
    /// Store tunables (image size cap, etc).
    pub store: StoreConfig,
    /// Sandbox tunables (timeout, operation cap).
    pub sandbox: SandboxConfig,
    /// Recursion depth cap shared by `llm_query`/`rlm_query` calls made
    /// during queries run against this environment.
    pub max_recursion_depth: usize,
}

impl EnvConfig {
    /// A config with every tunable defaulted beyond the three required
    /// fields, opening a disposable store.
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            default_model: default_model.into(),
            persistent_dir: None,
            store: StoreConfig::default(),
            sandbox: SandboxConfig::default(),
            max_recursion_depth: rlm_engine::DEFAULT_MAX_RECURSION_DEPTH,
        }
    }

    /// Back this environment with a persistent store rooted at `dir`.
    #[must_use]
    pub fn with_persistent_dir(mut self, dir: PathBuf) -> Self {
        self.persistent_dir = Some(dir);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_defaults_to_a_disposable_store() {
        let config = EnvConfig::new("key", "http://localhost", "test-model");
        assert!(config.persistent_dir.is_none());
    }

    #[test]
    fn with_persistent_dir_sets_the_path() {
        let config = EnvConfig::new("key", "http://localhost", "test-model")
            .with_persistent_dir(PathBuf::from("/tmp/env"));
        assert_eq!(config.persistent_dir, Some(PathBuf::from("/tmp/env")));
    }
}
