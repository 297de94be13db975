use crate::error::{FilexError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const MAX_THREADS: usize = 16;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub filters: FilterConfig,
    pub pipeline: PipelineConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FilterConfig {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub exclude_dirs: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub max_file_size: u64,
    pub max_depth: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    pub threads: usize,
    /// Per-file cap on emitted lines; 0 means unlimited.
    pub max_lines: usize,
    pub filter_terms: Vec<String>,
    pub filter_regex: bool,
    pub process_archives: bool,
    pub detect_duplicates: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    pub out_file: PathBuf,
    pub annotate: bool,
    pub write_report: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            filters: FilterConfig::default(),
            pipeline: PipelineConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            include: vec![
                "*.txt".to_string(),
                "*.log".to_string(),
                "*.csv".to_string(),
                "*.md".to_string(),
            ],
            exclude: vec![],
            exclude_dirs: vec![
                ".git".to_string(),
                "node_modules".to_string(),
                "target".to_string(),
                ".cache".to_string(),
            ],
            exclude_patterns: vec![r".*\.min\..*".to_string(), r".*\.lock".to_string()],
            max_file_size: 100 * 1024 * 1024, // 100MB
            max_depth: 10,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            threads: default_thread_count(),
            max_lines: 0,
            filter_terms: vec![],
            filter_regex: false,
            process_archives: true,
            detect_duplicates: true,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            out_file: PathBuf::from("extracted.txt"),
            annotate: true,
            write_report: true,
        }
    }
}

pub fn default_thread_count() -> usize {
    num_cpus::get().clamp(1, MAX_THREADS)
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(FilexError::Config {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| FilexError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| FilexError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;

        Ok(config)
    }

    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                // Try to load from default locations
                let default_paths = ["filex.toml", "filex.config.toml", ".filex.toml"];

                for default_path in &default_paths {
                    if Path::new(default_path).exists() {
                        return Self::load_from_file(default_path);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    pub fn merge_with_cli_args(&mut self, cli_args: &CliOverrides) {
        if let Some(ref include) = cli_args.include {
            self.filters.include = include.clone();
        }

        if let Some(ref exclude) = cli_args.exclude {
            self.filters.exclude.extend(exclude.clone());
        }

        if let Some(max_size) = cli_args.max_file_size {
            self.filters.max_file_size = max_size;
        }

        if let Some(threads) = cli_args.threads {
            self.pipeline.threads = threads.clamp(1, MAX_THREADS);
        }

        if let Some(max_lines) = cli_args.max_lines {
            self.pipeline.max_lines = max_lines;
        }

        if let Some(ref terms) = cli_args.filter_terms {
            self.pipeline.filter_terms = terms.clone();
        }

        if let Some(filter_regex) = cli_args.filter_regex {
            self.pipeline.filter_regex = filter_regex;
        }

        if let Some(process_archives) = cli_args.process_archives {
            self.pipeline.process_archives = process_archives;
        }

        if let Some(detect_duplicates) = cli_args.detect_duplicates {
            self.pipeline.detect_duplicates = detect_duplicates;
        }

        if let Some(ref out_file) = cli_args.out_file {
            self.output.out_file = out_file.clone();
        }

        if let Some(annotate) = cli_args.annotate {
            self.output.annotate = annotate;
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| FilexError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        std::fs::write(path, content).map_err(|e| FilexError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.filters.include.is_empty() {
            return Err(FilexError::Config {
                message: "At least one include pattern must be specified".to_string(),
            });
        }

        if self.filters.max_file_size == 0 {
            return Err(FilexError::Config {
                message: "Maximum file size must be greater than 0".to_string(),
            });
        }

        if self.filters.max_depth == 0 {
            return Err(FilexError::Config {
                message: "Maximum directory depth must be greater than 0".to_string(),
            });
        }

        if self.pipeline.threads == 0 || self.pipeline.threads > MAX_THREADS {
            return Err(FilexError::Config {
                message: format!("Thread count must be between 1 and {}", MAX_THREADS),
            });
        }

        if self.output.out_file.as_os_str().is_empty() {
            return Err(FilexError::Config {
                message: "Output file path must not be empty".to_string(),
            });
        }

        Ok(())
    }

    pub fn create_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config).unwrap_or_else(|_| String::new())
    }
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub include: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
    pub max_file_size: Option<u64>,
    pub threads: Option<usize>,
    pub max_lines: Option<usize>,
    pub filter_terms: Option<Vec<String>>,
    pub filter_regex: Option<bool>,
    pub process_archives: Option<bool>,
    pub detect_duplicates: Option<bool>,
    pub out_file: Option<PathBuf>,
    pub annotate: Option<bool>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_include(mut self, include: Option<Vec<String>>) -> Self {
        self.include = include;
        self
    }

    pub fn with_exclude(mut self, exclude: Option<Vec<String>>) -> Self {
        self.exclude = exclude;
        self
    }

    pub fn with_max_file_size(mut self, max_size: Option<u64>) -> Self {
        self.max_file_size = max_size;
        self
    }

    pub fn with_threads(mut self, threads: Option<usize>) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_max_lines(mut self, max_lines: Option<usize>) -> Self {
        self.max_lines = max_lines;
        self
    }

    pub fn with_filter_terms(mut self, terms: Option<Vec<String>>) -> Self {
        self.filter_terms = terms;
        self
    }

    pub fn with_filter_regex(mut self, filter_regex: Option<bool>) -> Self {
        self.filter_regex = filter_regex;
        self
    }

    pub fn with_process_archives(mut self, process_archives: Option<bool>) -> Self {
        self.process_archives = process_archives;
        self
    }

    pub fn with_detect_duplicates(mut self, detect_duplicates: Option<bool>) -> Self {
        self.detect_duplicates = detect_duplicates;
        self
    }

    pub fn with_out_file(mut self, out_file: Option<PathBuf>) -> Self {
        self.out_file = out_file;
        self
    }

    pub fn with_annotate(mut self, annotate: Option<bool>) -> Self {
        self.annotate = annotate;
        self
    }
}
