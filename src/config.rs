use crate::history::DEFAULT_CAPACITY;
use log::warn;
use std::env as stdenv;

/// Prompt used when none is configured.
pub const DEFAULT_PROMPT: &str = "spys> ";

/// Environment variable overriding the prompt.
pub const PROMPT_VAR: &str = "SPYS_PROMPT";

/// Environment variable overriding the history buffer capacity.
pub const HISTORY_VAR: &str = "SPYS_HISTORY";

/// Settings a shell instance is built with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    /// Prompt shown before each line, also what `@>` resets to.
    pub prompt: String,
    /// Number of slots in each of the input, output and trace buffers.
    pub history_capacity: usize,
    /// Lines that stop the loop, compared verbatim.
    pub exit_keywords: Vec<String>,
    /// Consecutive I/O failures tolerated before the loop gives up.
    pub max_io_failures: usize,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            history_capacity: DEFAULT_CAPACITY,
            exit_keywords: vec!["exit".to_string(), "quit".to_string()],
            max_io_failures: 3,
        }
    }
}

impl ShellConfig {
    /// Defaults overlaid with `SPYS_PROMPT` / `SPYS_HISTORY` from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| stdenv::var(key).ok())
    }

    /// Defaults overlaid with values returned by `lookup`.
    ///
    /// Unusable values are skipped with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(prompt) = lookup(PROMPT_VAR) {
            config.prompt = prompt;
        }
        if let Some(raw) = lookup(HISTORY_VAR) {
            match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => config.history_capacity = n,
                _ => warn!("ignoring {HISTORY_VAR}={raw:?}: expected a positive integer"),
            }
        }
        config
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    pub fn is_exit_keyword(&self, line: &str) -> bool {
        self.exit_keywords.iter().any(|k| k == line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ShellConfig::default();
        assert_eq!(config.prompt, "spys> ");
        assert_eq!(config.history_capacity, 20);
        assert!(config.is_exit_keyword("exit"));
        assert!(config.is_exit_keyword("quit"));
        assert!(!config.is_exit_keyword("exit "));
        assert!(!config.is_exit_keyword("EXIT"));
    }

    #[test]
    fn test_lookup_overrides() {
        let mut vars = HashMap::new();
        vars.insert(PROMPT_VAR, "calc> ".to_string());
        vars.insert(HISTORY_VAR, "5".to_string());

        let config = ShellConfig::from_lookup(|k| vars.get(k).cloned());
        assert_eq!(config.prompt, "calc> ");
        assert_eq!(config.history_capacity, 5);
    }

    #[test]
    fn test_bad_history_value_is_ignored() {
        let config = ShellConfig::from_lookup(|k| (k == HISTORY_VAR).then(|| "lots".to_string()));
        assert_eq!(config.history_capacity, DEFAULT_CAPACITY);

        let config = ShellConfig::from_lookup(|k| (k == HISTORY_VAR).then(|| "0".to_string()));
        assert_eq!(config.history_capacity, DEFAULT_CAPACITY);
    }

    #[test]
    fn test_builders() {
        let config = ShellConfig::default().with_prompt("> ").with_history_capacity(2);
        assert_eq!(config.prompt, "> ");
        assert_eq!(config.history_capacity, 2);
    }
}
