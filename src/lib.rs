pub mod archive;
pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod scanner;
pub mod ui;

// Public API re-exports
pub use cli::{Cli, OutputFormat};
pub use config::{CliOverrides, Config, FilterConfig, OutputConfig, PipelineConfig};
pub use error::{FilexError, Result, UserFriendlyError};

// Core functionality re-exports
pub use archive::{ArchiveKind, ArchiveReader, ExtractedMember};
pub use output::{ConfigSnapshot, OutputManager, RunReport, RunSummary};
pub use pipeline::{Aggregator, FilterResult, Fingerprint, LineFilter, RunResults, WorkerPool};
pub use scanner::{DiscoveredFile, FileScanner, FileTask, ScanOutcome};
pub use ui::{GracefulShutdown, OutputFormatter, OutputMode, ProgressManager};

use crate::pipeline::pool::FileCallback;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tempfile::TempDir;

/// Main library interface for FileX functionality
pub struct Filex {
    config: Config,
    output_formatter: OutputFormatter,
    progress_manager: ProgressManager,
    shutdown: GracefulShutdown,
}

impl Filex {
    /// Create a new Filex instance with the provided configuration
    pub fn new(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Result<Self> {
        let output_formatter = OutputFormatter::new(output_mode, verbose, quiet);
        let progress_manager = ProgressManager::new(!quiet);
        let shutdown = GracefulShutdown::new()?;

        Ok(Self {
            config,
            output_formatter,
            progress_manager,
            shutdown,
        })
    }

    /// Create a new Filex instance for testing (no signal handler conflicts)
    #[cfg(test)]
    pub fn new_for_test(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        let output_formatter = OutputFormatter::new(output_mode, verbose, quiet);
        let progress_manager = ProgressManager::new(!quiet);
        let shutdown = GracefulShutdown::new_for_test();

        Self {
            config,
            output_formatter,
            progress_manager,
            shutdown,
        }
    }

    /// Create Filex instance from CLI arguments
    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let config = cli_args.load_config()?;
        let output_mode = match cli_args.output_format {
            OutputFormat::Human => OutputMode::Human,
            OutputFormat::Json => OutputMode::Json,
            OutputFormat::Plain => OutputMode::Plain,
        };

        Self::new(config, output_mode, cli_args.verbose, cli_args.quiet)
    }

    /// Run the batch pipeline over a root directory: discover files, expand
    /// archives, process everything through the worker pool, and write the
    /// aggregated output plus the run report.
    pub async fn run_batch(&self, root: &Path, force: bool) -> Result<RunReport> {
        let start_time = Instant::now();

        self.shutdown.check_shutdown()?;
        self.output_formatter.start_operation("Starting batch processing");

        // Step 1: discover input files
        let scanner = FileScanner::new(&self.config.filters)?
            .with_archives(self.config.pipeline.process_archives);
        let outcome = self.scan_files(&scanner, root)?;
        self.shutdown.check_shutdown()?;

        // Step 2: expand archives into extra tasks; the temp dirs must
        // outlive the worker pool
        let mut discovered = outcome.files;
        let mut archive_failures: Vec<(String, String)> = Vec::new();
        let mut archive_temp_dirs: Vec<TempDir> = Vec::new();
        let mut archives_processed = 0usize;
        let mut members_skipped = 0usize;

        for archive in &outcome.archives {
            self.shutdown.check_shutdown()?;
            match self.expand_archive(archive, &scanner) {
                Ok((temp_dir, members, skipped)) => {
                    self.output_formatter.debug(&format!(
                        "Expanded {}: {} members",
                        archive.display_path,
                        members.len()
                    ));
                    discovered.extend(members);
                    members_skipped += skipped;
                    archive_temp_dirs.push(temp_dir);
                    archives_processed += 1;
                }
                Err(err) => {
                    self.output_formatter
                        .warning(&format!("Skipping archive: {}", err));
                    archive_failures.push((archive.display_path.clone(), err.to_string()));
                }
            }
        }

        // Fix discovery order after archive members joined the batch
        discovered.sort_by(|a, b| a.display_path.cmp(&b.display_path));
        let tasks: Vec<FileTask> = discovered
            .into_iter()
            .enumerate()
            .map(|(index, file)| FileTask::new(index, file))
            .collect();

        if tasks.is_empty() {
            return Err(FilexError::NoFilesFound {
                patterns: self.config.filters.include.clone(),
            });
        }

        self.output_formatter
            .info(&format!("Found {} files to process", tasks.len()));

        // Step 3: prepare output before any work is dispatched
        let output_manager = OutputManager::new(self.config.output.out_file.clone())
            .with_force_overwrite(force);
        output_manager.prepare()?;
        self.shutdown.check_shutdown()?;

        // Step 4: process through the bounded worker pool
        let line_filter = Arc::new(LineFilter::from_terms(
            &self.config.pipeline.filter_terms,
            self.config.pipeline.filter_regex,
        )?);
        let aggregator = Arc::new(Aggregator::new());

        for error in &outcome.errors {
            aggregator.record_failure("discovery", error.clone());
        }
        for (path, message) in archive_failures {
            aggregator.record_failure(path, message);
        }

        let total_tasks = tasks.len();
        let progress = self.progress_manager.create_file_progress(total_tasks as u64);
        let callback: FileCallback = {
            let pb = progress.clone();
            Arc::new(move |task: &FileTask| {
                pb.inc(1);
                pb.set_message(format!("Processing {}", task.display_path));
            })
        };

        let pool = WorkerPool::new(self.config.pipeline.threads)
            .with_max_lines(self.config.pipeline.max_lines);
        pool.run(
            tasks,
            line_filter,
            aggregator.clone(),
            &self.shutdown,
            Some(callback),
        )
        .await?;

        ui::progress::finish_progress_with_summary(
            &progress,
            &format!("Processed {} files", total_tasks),
            start_time.elapsed(),
        );

        // Step 5: aggregate and write the output file
        let mut results = aggregator.finish();
        if !self.config.pipeline.detect_duplicates {
            results.groups.clear();
        }

        let lines_written = output_manager.write_output(&results, self.config.output.annotate)?;
        self.output_formatter.success(&format!(
            "Wrote {} lines to {}",
            lines_written,
            output_manager.out_file().display()
        ));

        // Step 6: build and persist the run report
        let summary = RunSummary {
            total_files: total_tasks,
            files_processed: results.results.len(),
            files_skipped: outcome.skipped + members_skipped,
            files_failed: results.failures.len(),
            archives_processed,
            total_lines: results.total_line_count(),
            matched_lines: results.matched_line_count(),
            bytes_processed: results.bytes_processed(),
            duplicate_files: results.duplicate_file_count(),
            duration: start_time.elapsed(),
        };

        let report = output_manager.create_run_report(
            root,
            &results,
            summary,
            self.create_config_snapshot(),
            self.config.output.write_report,
        )?;

        self.output_formatter.print_run_summary(&report.summary);

        Ok(report)
    }

    fn scan_files(&self, scanner: &FileScanner, root: &Path) -> Result<ScanOutcome> {
        self.output_formatter.start_operation("Scanning input files");

        let spinner = self.progress_manager.create_spinner("Scanning directory tree");
        let outcome = scanner.scan(root);
        spinner.finish_and_clear();

        let outcome = outcome?;
        let stats = scanner.get_statistics(&outcome.files);
        self.output_formatter.debug(&stats.display_summary());

        Ok(outcome)
    }

    /// Extracts one archive into a fresh temp dir and turns its matching
    /// file members into discovered files. The include/exclude filter
    /// applies to member names exactly as it does to loose files.
    fn expand_archive(
        &self,
        archive: &DiscoveredFile,
        scanner: &FileScanner,
    ) -> Result<(TempDir, Vec<DiscoveredFile>, usize)> {
        let reader = ArchiveReader::open(&archive.source_path)?;
        let temp_dir = TempDir::new().map_err(|e| FilexError::Archive {
            path: archive.display_path.clone(),
            message: format!("cannot create extraction directory: {}", e),
        })?;

        let members = reader.extract_to(temp_dir.path())?;

        let filter = scanner.filter();
        let mut discovered = Vec::new();
        let mut skipped = 0usize;

        for member in members {
            if !filter.matches(Path::new(&member.name)) {
                continue;
            }
            if !filter.is_size_allowed(member.size) {
                skipped += 1;
                continue;
            }
            discovered.push(DiscoveredFile {
                source_path: member.path,
                display_path: format!("{}!{}", archive.display_path, member.name),
                size: member.size,
            });
        }

        Ok((temp_dir, discovered, skipped))
    }

    /// Create configuration snapshot for reporting
    fn create_config_snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot {
            include: self.config.filters.include.clone(),
            exclude: self.config.filters.exclude.clone(),
            filter_terms: self.config.pipeline.filter_terms.clone(),
            threads: self.config.pipeline.threads,
            max_lines: self.config.pipeline.max_lines,
            process_archives: self.config.pipeline.process_archives,
            detect_duplicates: self.config.pipeline.detect_duplicates,
        }
    }

    /// Generate sample configuration file
    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        let sample_config = Config::create_sample_config();
        std::fs::write(output_path.as_ref(), sample_config).map_err(FilexError::Io)?;
        Ok(())
    }

    /// Get configuration reference
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get output formatter reference
    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    /// Get progress manager reference
    pub fn progress_manager(&self) -> &ProgressManager {
        &self.progress_manager
    }

    /// Check if shutdown has been requested
    pub fn is_running(&self) -> bool {
        self.shutdown.is_running()
    }

    /// Request graceful shutdown
    pub fn request_shutdown(&self) {
        self.shutdown.request_shutdown();
    }

    /// Handle error with user-friendly output
    pub fn handle_error(&self, error: &FilexError) {
        self.output_formatter.print_user_friendly_error(error);
    }
}

/// Convenience function to run the pipeline with minimal setup
pub async fn run_batch_simple(
    root: &Path,
    out_file: Option<&Path>,
    verbose: bool,
) -> Result<RunReport> {
    let mut config = Config::default();

    if let Some(out_path) = out_file {
        config.output.out_file = out_path.to_path_buf();
    }

    let filex = Filex::new(
        config,
        OutputMode::Human,
        if verbose { 1 } else { 0 },
        false,
    )?;

    filex.run_batch(root, false).await
}

/// Get version information
pub fn version_info() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
