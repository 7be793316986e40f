use chrono::Local;
use crossterm::style::Stylize;
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::Path,
};

pub trait Logger: Send + Sync {
    fn log(&mut self, message: &str);
    fn debug_log(&mut self, message: &str);

    fn warn(&mut self, message: &str) {
        self.log(&format!("Warning: {}", message));
    }
}

#[derive(Debug)]
pub struct FileLogger {
    log_file: String,
    debug: bool,
}

impl FileLogger {
    pub fn new(log_file: &str, debug: bool) -> std::io::Result<Self> {
        // Create log directory if it doesn't exist
        if let Some(parent) = Path::new(log_file).parent() {
            fs::create_dir_all(parent)?;
        }

        Ok(FileLogger {
            log_file: log_file.to_string(),
            debug,
        })
    }

    fn write_to_file(&self, message: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file)?;

        writeln!(file, "{}: {}", Local::now().format("%Y-%m-%d %H:%M:%S"), message)
    }
}

impl Logger for FileLogger {
    fn log(&mut self, message: &str) {
        if let Err(e) = self.write_to_file(message) {
            eprintln!("Failed to write to log file: {}", e);
        }
    }

    fn debug_log(&mut self, message: &str) {
        if self.debug {
            if let Err(e) = self.write_to_file(&format!("[DEBUG] {}", message)) {
                eprintln!("Failed to write debug log: {}", e);
            }
        }
    }
}

/// Progress lines on stderr, so stdout stays reserved for prompts and the report.
#[derive(Debug)]
pub struct ConsoleLogger {
    debug: bool,
}

impl ConsoleLogger {
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }
}

impl Logger for ConsoleLogger {
    fn log(&mut self, message: &str) {
        eprintln!("{} {}", "[+]".green(), message);
    }

    fn debug_log(&mut self, message: &str) {
        if self.debug {
            eprintln!("{} {}", "[debug]".dark_grey(), message);
        }
    }

    fn warn(&mut self, message: &str) {
        eprintln!("{} {}", "[!]".yellow(), message);
    }
}

// MultiLogger allows logging to multiple destinations
pub struct MultiLogger {
    loggers: Vec<Box<dyn Logger>>,
}

impl MultiLogger {
    pub fn new(loggers: Vec<Box<dyn Logger>>) -> Self {
        Self { loggers }
    }
}

impl Logger for MultiLogger {
    fn log(&mut self, message: &str) {
        for logger in &mut self.loggers {
            logger.log(message);
        }
    }

    fn debug_log(&mut self, message: &str) {
        for logger in &mut self.loggers {
            logger.debug_log(message);
        }
    }

    fn warn(&mut self, message: &str) {
        for logger in &mut self.loggers {
            logger.warn(message);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Collects messages in memory.
    #[derive(Default)]
    pub struct MockLogger {
        pub logs: Vec<String>,
    }

    impl MockLogger {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl Logger for MockLogger {
        fn log(&mut self, message: &str) {
            self.logs.push(message.to_string());
        }

        fn debug_log(&mut self, message: &str) {
            self.logs.push(format!("DEBUG: {}", message));
        }
    }

    #[test]
    fn file_logger_appends_and_filters_debug() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/issue.log");
        let path_str = path.to_str().unwrap();

        let mut quiet = FileLogger::new(path_str, false).unwrap();
        quiet.log("first");
        quiet.debug_log("hidden");

        let mut verbose = FileLogger::new(path_str, true).unwrap();
        verbose.debug_log("shown");
        verbose.warn("careful");

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with(": first"));
        assert!(lines[1].ends_with(": [DEBUG] shown"));
        assert!(lines[2].ends_with(": Warning: careful"));
    }

    #[test]
    fn multi_logger_fans_out() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.log");
        let b = dir.path().join("b.log");
        let mut logger = MultiLogger::new(vec![
            Box::new(FileLogger::new(a.to_str().unwrap(), false).unwrap()),
            Box::new(FileLogger::new(b.to_str().unwrap(), false).unwrap()),
        ]);
        logger.log("issued");

        for path in [a, b] {
            assert!(fs::read_to_string(path).unwrap().contains("issued"));
        }
    }
}
