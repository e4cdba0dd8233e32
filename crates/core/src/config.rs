use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings of one compilation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileConf {
    /// Worker threads for per-unit checking; 0 is treated as 1.
    pub max_threads: usize,
    /// Process units sorted by name so declaration order is reproducible.
    pub deterministic: bool,
    pub debug: bool,
    pub verbose: bool,
    pub log_level: String,
    /// Defaults to `$HOME/.bhl/logs`.
    pub log_dir: Option<PathBuf>,
}

impl Default for CompileConf {
    fn default() -> Self {
        Self {
            max_threads: 1,
            deterministic: false,
            debug: false,
            verbose: false,
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

impl CompileConf {
    pub fn from_json_str(s: &str) -> Result<Self> {
        let conf: CompileConf = serde_json::from_str(s)?;
        Ok(conf.normalized())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn normalized(mut self) -> Self {
        self.max_threads = self.max_threads.max(1);
        self
    }

    pub fn threads(&self) -> usize {
        self.max_threads.max(1)
    }

    /// Default filter when `RUST_LOG` is unset; `verbose` raises it to debug.
    pub fn log_filter(&self) -> &str {
        if self.verbose { "debug" } else { &self.log_level }
    }

    pub fn log_dir(&self) -> PathBuf {
        match &self.log_dir {
            Some(dir) => dir.clone(),
            None => {
                let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
                home.join(".bhl/logs")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_json_uses_defaults() {
        let conf = CompileConf::from_json_str(r#"{"max_threads": 0, "verbose": true}"#).unwrap();
        assert_eq!(conf.max_threads, 1);
        assert!(conf.verbose);
        assert!(!conf.deterministic);
        assert_eq!(conf.log_filter(), "debug");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"max_threads": 4, "deterministic": true, "log_dir": "/tmp/bhl-logs"}}"#
        )
        .unwrap();
        let conf = CompileConf::load(file.path()).unwrap();
        assert_eq!(conf.threads(), 4);
        assert!(conf.deterministic);
        assert_eq!(conf.log_dir(), PathBuf::from("/tmp/bhl-logs"));
        assert_eq!(conf.log_filter(), "info");
    }

    #[test]
    fn test_bad_input_is_reported() {
        assert!(matches!(
            CompileConf::from_json_str("{"),
            Err(crate::error::CompileError::Json(_))
        ));
        assert!(matches!(
            CompileConf::load("/definitely/not/here.json"),
            Err(crate::error::CompileError::Io(_))
        ));
    }
}
