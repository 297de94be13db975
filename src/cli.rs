use crate::config::{CliOverrides, Config};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "filex")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Batch text-file processor with filtering and duplicate detection")]
#[command(
    long_about = "FileX walks a directory tree, filters matching text files through a \
                       bounded worker pool, detects byte-identical duplicates, and writes \
                       the filtered lines to a single aggregated output file."
)]
#[command(after_help = "EXAMPLES:\n  \
    filex ./logs\n  \
    filex ./logs --filter ERROR --filter WARN --out errors.txt\n  \
    filex ./data --include '*.csv' --exclude 'backup/**' --threads 8\n  \
    filex ./dump --no-archives --config my-config.toml\n\n\
    For more information, visit: https://github.com/user/filex")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Root directory to scan
    pub root: PathBuf,

    /// Glob patterns for files to include (repeatable)
    #[arg(short, long, help = "Include glob (e.g., '*.txt', 'logs/**/*.log')")]
    pub include: Option<Vec<String>>,

    /// Glob patterns for files to exclude (repeatable)
    #[arg(short = 'x', long, help = "Exclude glob (e.g., '*.bak', 'tmp/**')")]
    pub exclude: Option<Vec<String>>,

    /// Line filter terms; only lines matching at least one term are emitted
    #[arg(short, long, help = "Line filter term (case-insensitive substring)")]
    pub filter: Option<Vec<String>>,

    /// Interpret filter terms as regular expressions
    #[arg(long, requires = "filter")]
    pub regex: bool,

    /// Worker pool size (1-16)
    #[arg(short, long, help = "Number of worker threads")]
    pub threads: Option<usize>,

    /// Aggregated output file path
    #[arg(short, long, help = "Output file (default: extracted.txt)")]
    pub out: Option<PathBuf>,

    /// Maximum emitted lines per file (0 = unlimited)
    #[arg(long, help = "Cap emitted lines per file")]
    pub max_lines: Option<usize>,

    /// Maximum file size in MB
    #[arg(long, help = "Maximum file size to process (in MB)")]
    pub max_size: Option<u64>,

    /// Skip ZIP/7Z/RAR archives found under the root
    #[arg(long, help = "Do not extract and process archive members")]
    pub no_archives: bool,

    /// Disable duplicate-group reporting
    #[arg(long, help = "Do not report duplicate file groups")]
    pub no_dedup: bool,

    /// Omit per-file annotation blocks from the output
    #[arg(long, help = "Write filtered lines only, without source annotations")]
    pub no_annotate: bool,

    /// Configuration file path
    #[arg(short, long, help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Output format for results
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Verbose output level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Overwrite an existing output file
    #[arg(long, help = "Overwrite existing output file")]
    pub force: bool,

    /// Dry run (show what would be done without executing)
    #[arg(long, help = "Show what would be processed without actually doing it")]
    pub dry_run: bool,

    /// Generate sample configuration file
    #[arg(long, help = "Generate a sample configuration file")]
    pub generate_config: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON formatted output
    Json,
    /// Plain text output
    Plain,
}

impl Cli {
    pub fn load_config(&self) -> crate::error::Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        let max_file_size = self.max_size.map(|size| size * 1024 * 1024); // Convert MB to bytes

        CliOverrides::new()
            .with_include(self.include.clone())
            .with_exclude(self.exclude.clone())
            .with_max_file_size(max_file_size)
            .with_threads(self.threads)
            .with_max_lines(self.max_lines)
            .with_filter_terms(self.filter.clone())
            .with_filter_regex(if self.regex { Some(true) } else { None })
            .with_process_archives(if self.no_archives { Some(false) } else { None })
            .with_detect_duplicates(if self.no_dedup { Some(false) } else { None })
            .with_out_file(self.out.clone())
            .with_annotate(if self.no_annotate { Some(false) } else { None })
    }

    pub fn should_use_colors(&self) -> bool {
        !self.quiet && console::Term::stdout().features().colors_supported()
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose > 0 && !self.quiet
    }

    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}

pub fn parse_size_string(s: &str) -> std::result::Result<u64, String> {
    let s = s.trim().to_lowercase();

    let (number_str, multiplier) = if s.ends_with("kb") || s.ends_with("k") {
        (s.trim_end_matches("kb").trim_end_matches("k"), 1024)
    } else if s.ends_with("mb") || s.ends_with("m") {
        (s.trim_end_matches("mb").trim_end_matches("m"), 1024 * 1024)
    } else if s.ends_with("gb") || s.ends_with("g") {
        (
            s.trim_end_matches("gb").trim_end_matches("g"),
            1024 * 1024 * 1024,
        )
    } else if s.ends_with("b") {
        (s.trim_end_matches("b"), 1)
    } else {
        (s.as_str(), 1)
    };

    let number: f64 = number_str
        .parse()
        .map_err(|_| format!("Invalid number format: {}", number_str))?;

    if number < 0.0 {
        return Err("Size cannot be negative".to_string());
    }

    Ok((number * multiplier as f64) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_cli(root: &str) -> Cli {
        Cli {
            root: PathBuf::from(root),
            include: None,
            exclude: None,
            filter: None,
            regex: false,
            threads: None,
            out: None,
            max_lines: None,
            max_size: None,
            no_archives: false,
            no_dedup: false,
            no_annotate: false,
            config: None,
            output_format: OutputFormat::Human,
            verbose: 0,
            quiet: false,
            force: false,
            dry_run: false,
            generate_config: false,
        }
    }

    #[test]
    fn test_cli_overrides_mapping() {
        let mut cli = base_cli(".");
        cli.filter = Some(vec!["ERROR".to_string()]);
        cli.no_archives = true;
        cli.max_size = Some(5);

        let overrides = cli.create_cli_overrides();
        assert_eq!(overrides.filter_terms, Some(vec!["ERROR".to_string()]));
        assert_eq!(overrides.process_archives, Some(false));
        assert_eq!(overrides.max_file_size, Some(5 * 1024 * 1024));
        // Flags left untouched must not override config values
        assert_eq!(overrides.filter_regex, None);
        assert_eq!(overrides.detect_duplicates, None);
    }

    #[test]
    fn test_load_config_applies_overrides() {
        let mut cli = base_cli(".");
        cli.threads = Some(2);
        cli.include = Some(vec!["*.log".to_string()]);

        let config = cli.load_config().unwrap();
        assert_eq!(config.pipeline.threads, 2);
        assert_eq!(config.filters.include, vec!["*.log"]);
    }

    #[test]
    fn test_parse_size_string() {
        assert_eq!(parse_size_string("10").unwrap(), 10);
        assert_eq!(parse_size_string("10KB").unwrap(), 10 * 1024);
        assert_eq!(parse_size_string("5MB").unwrap(), 5 * 1024 * 1024);
        assert_eq!(parse_size_string("1GB").unwrap(), 1024 * 1024 * 1024);

        assert!(parse_size_string("invalid").is_err());
        assert!(parse_size_string("-5MB").is_err());
    }

    #[test]
    fn test_verbosity_level() {
        let mut cli = base_cli(".");
        cli.verbose = 2;
        assert_eq!(cli.verbosity_level(), 2);

        cli.verbose = 0;
        cli.quiet = true;
        assert_eq!(cli.verbosity_level(), 0);
    }
}
