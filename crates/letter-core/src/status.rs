//! Append-only run log: one `<timestamp> - <message>` line per event

use crate::error::Result;
use letter_types::RunContext;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, context: &RunContext, message: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        // Keep one event per line even for multi-line error text
        let message = message.replace(['\r', '\n'], " ");
        writeln!(file, "{} - {}", context.log_timestamp(), message)?;
        Ok(())
    }

    pub fn success(&self, context: &RunContext, message: &str) -> Result<()> {
        log::info!("{}", message);
        self.append(context, message)
    }

    pub fn failure(&self, context: &RunContext, error: &dyn std::error::Error) -> Result<()> {
        log::error!("{}", error);
        self.append(context, &error.to_string())
    }
}
