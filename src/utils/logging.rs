use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Appends chat turns to a transcript file when one was requested at
/// startup; otherwise every call is a no-op.
pub struct LoggingState {
    file_path: Option<String>,
}

impl LoggingState {
    pub fn new(log_file: Option<String>) -> Result<Self, Box<dyn std::error::Error>> {
        if let Some(ref path) = log_file {
            // Fail at startup, not mid-conversation.
            Self::test_file_access(path)?;
        }

        Ok(LoggingState {
            file_path: log_file,
        })
    }

    fn test_file_access(path: &str) -> Result<(), Box<dyn std::error::Error>> {
        OpenOptions::new().create(true).append(true).open(path)?;
        Ok(())
    }

    pub fn log_message(&self, content: &str) -> Result<(), Box<dyn std::error::Error>> {
        if self.file_path.is_none() {
            return Ok(());
        }

        self.write_to_log(content)
    }

    fn write_to_log(&self, content: &str) -> Result<(), Box<dyn std::error::Error>> {
        let file_path = self.file_path.as_ref().unwrap();

        // Open file in append mode
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)?;

        // Use BufWriter with 64KB buffer for better I/O performance
        // This reduces syscalls and handles partial writes more efficiently
        let mut writer = BufWriter::with_capacity(64 * 1024, file);

        // Write each line of content, preserving the exact formatting
        for line in content.lines() {
            writeln!(writer, "{line}")?;
        }

        // Add an empty line after each message for spacing (matching screen display)
        writeln!(writer)?;

        // Ensure all buffered data is written to disk
        writer.flush()?;
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.file_path.is_some()
    }

    pub fn get_status_string(&self) -> String {
        match &self.file_path {
            None => "disabled".to_string(),
            Some(path) => format!(
                "active ({})",
                Path::new(path)
                    .file_name()
                    .unwrap_or_default()
                    .to_string_lossy()
            ),
        }
    }
}
