//! The run-results sink.
//!
//! Search results go to a plain text file (`run_results.txt` by default)
//! and are mirrored to the console. This is deliberately not the
//! diagnostic `log` facade: the results file is an output of the run,
//! owned by whoever drives the solver and passed down explicitly.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

pub struct RunLog {
    file: Option<File>,
    console: bool,
}

impl RunLog {
    pub const DEFAULT_PATH: &'static str = "run_results.txt";

    /// Opens (truncating) the results file.
    pub fn create(path: &Path) -> io::Result<Self> {
        Ok(RunLog {
            file: Some(File::create(path)?),
            console: true,
        })
    }

    /// A sink that only mirrors to the console; used by tests.
    pub fn console_only() -> Self {
        RunLog {
            file: None,
            console: true,
        }
    }

    pub fn set_console(&mut self, enabled: bool) {
        self.console = enabled;
    }

    pub fn line(&mut self, message: &str) {
        if let Some(file) = &mut self.file {
            // Result output is best-effort once the file is open.
            let _ = writeln!(file, "{message}");
            let _ = file.flush();
        }
        if self.console {
            println!("{message}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_lines_to_file() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("dxd_runlog_test_{}.txt", std::process::id()));
        {
            let mut log = RunLog::create(&path).unwrap();
            log.set_console(false);
            log.line("first");
            log.line("second");
        }
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "first\nsecond\n");
        let _ = std::fs::remove_file(&path);
    }
}
