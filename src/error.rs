use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilexError {
    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Discovery failed for {path}: {message}")]
    Discovery { path: String, message: String },

    #[error("Failed to read {path}: {message}")]
    Read { path: String, message: String },

    #[error("Archive error in {path}: {message}")]
    Archive { path: String, message: String },

    #[error("Invalid pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    #[error("No files matched the include patterns")]
    NoFilesFound { patterns: Vec<String> },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Permission denied: {path}")]
    Permission { path: String },

    #[error("Operation was cancelled by user")]
    Cancelled,

    #[error("File too large: {size} bytes (max: {max_size} bytes)")]
    FileTooLarge { size: u64, max_size: u64 },

    #[error("Path validation failed: {path}")]
    InvalidPath { path: String },

    #[error("Output file already exists: {path}")]
    OutputExists { path: String },
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for FilexError {
    fn user_message(&self) -> String {
        match self {
            FilexError::Discovery { path, message } => {
                format!("Cannot scan {}: {}", path, message)
            }
            FilexError::Read { path, message } => {
                format!("Cannot read {}: {}", path, message)
            }
            FilexError::Archive { path, message } => {
                format!("Archive {} could not be processed: {}", path, message)
            }
            FilexError::Pattern { pattern, message } => {
                format!("Invalid pattern '{}': {}", pattern, message)
            }
            FilexError::NoFilesFound { patterns } => {
                format!(
                    "No files matched the include patterns: {}",
                    patterns.join(", ")
                )
            }
            FilexError::Config { message } => {
                format!("Configuration error: {}", message)
            }
            FilexError::Permission { path } => {
                format!("Permission denied accessing: {}", path)
            }
            FilexError::Cancelled => "Operation was cancelled by user".to_string(),
            FilexError::FileTooLarge { size, max_size } => {
                format!(
                    "File too large: {} (maximum allowed: {})",
                    format_bytes(*size),
                    format_bytes(*max_size)
                )
            }
            FilexError::InvalidPath { path } => {
                format!("Invalid file path: {}", path)
            }
            FilexError::OutputExists { path } => {
                format!("Output file already exists: {}", path)
            }
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            FilexError::Discovery { .. } => Some(
                "Check that the root directory exists and is readable.".to_string(),
            ),
            FilexError::NoFilesFound { .. } => Some(
                "Try different include patterns with --include (e.g., --include '*.txt' --include '*.log').".to_string(),
            ),
            FilexError::Pattern { .. } => Some(
                "Include/exclude patterns use glob syntax (e.g., '*.log', 'logs/**/*.txt').".to_string(),
            ),
            FilexError::Config { .. } => Some(
                "Check your configuration file syntax and ensure all required fields are present.".to_string(),
            ),
            FilexError::Permission { .. } => Some(
                "Ensure you have the necessary read/write permissions for the target directory.".to_string(),
            ),
            FilexError::Archive { .. } => Some(
                "The archive may be corrupt or password-protected; use --no-archives to skip archive processing.".to_string(),
            ),
            FilexError::FileTooLarge { .. } => Some(
                "Increase the maximum file size limit with --max-size or exclude large files.".to_string(),
            ),
            FilexError::OutputExists { .. } => Some(
                "Remove the existing file, choose a different path with --out, or use --force to overwrite.".to_string(),
            ),
            _ => None,
        }
    }
}

impl From<globset::Error> for FilexError {
    fn from(error: globset::Error) -> Self {
        FilexError::Pattern {
            pattern: error.glob().unwrap_or("<unknown>").to_string(),
            message: error.kind().to_string(),
        }
    }
}

impl From<toml::de::Error> for FilexError {
    fn from(error: toml::de::Error) -> Self {
        FilexError::Config {
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FilexError>;

pub(crate) fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}
