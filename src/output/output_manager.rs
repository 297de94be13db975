use crate::error::{format_bytes, FilexError, Result};
use crate::pipeline::{FileFailure, Fingerprint, RunResults};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub root: String,
    pub generated_at: DateTime<Utc>,
    pub summary: RunSummary,
    pub duplicate_groups: BTreeMap<Fingerprint, BTreeSet<String>>,
    pub errors: Vec<FileFailure>,
    pub config_used: ConfigSnapshot,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub total_files: usize,
    pub files_processed: usize,
    pub files_skipped: usize,
    pub files_failed: usize,
    pub archives_processed: usize,
    pub total_lines: usize,
    pub matched_lines: usize,
    pub bytes_processed: u64,
    pub duplicate_files: usize,
    pub duration: Duration,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigSnapshot {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub filter_terms: Vec<String>,
    pub threads: usize,
    pub max_lines: usize,
    pub process_archives: bool,
    pub detect_duplicates: bool,
}

pub struct OutputManager {
    out_file: PathBuf,
    force_overwrite: bool,
}

impl OutputManager {
    pub fn new(out_file: PathBuf) -> Self {
        Self {
            out_file,
            force_overwrite: false,
        }
    }

    pub fn with_force_overwrite(mut self, force: bool) -> Self {
        self.force_overwrite = force;
        self
    }

    pub fn out_file(&self) -> &Path {
        &self.out_file
    }

    /// Refuses to clobber an existing output file unless forced, and makes
    /// sure the parent directory exists and is writable.
    pub fn prepare(&self) -> Result<()> {
        if self.out_file.exists() && !self.force_overwrite {
            return Err(FilexError::OutputExists {
                path: self.out_file.display().to_string(),
            });
        }

        if let Some(parent) = self.out_file.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| FilexError::Permission {
                    path: format!("Cannot create directory {}: {}", parent.display(), e),
                })?;
            }
        }

        Ok(())
    }

    /// Writes the aggregated output: one section per file in task order.
    /// Annotations carry only the source name, line count and fingerprint
    /// prefix so that re-running over an unchanged tree reproduces the file
    /// byte for byte.
    pub fn write_output(&self, results: &RunResults, annotate: bool) -> Result<usize> {
        let file = fs::File::create(&self.out_file).map_err(FilexError::Io)?;
        let mut writer = BufWriter::new(file);
        let mut lines_written = 0;

        for result in &results.results {
            if annotate {
                writeln!(
                    writer,
                    "==[ {} | {} of {} lines | sha256:{} ]==",
                    result.display_path,
                    result.lines.len(),
                    result.total_lines,
                    result.fingerprint.short()
                )?;
            }

            for line in &result.lines {
                writeln!(writer, "{}", line)?;
                lines_written += 1;
            }

            if annotate {
                writeln!(writer)?;
            }
        }

        writer.flush()?;
        Ok(lines_written)
    }

    pub fn create_run_report(
        &self,
        root: &Path,
        results: &RunResults,
        summary: RunSummary,
        config: ConfigSnapshot,
        write_report: bool,
    ) -> Result<RunReport> {
        let duplicate_groups: BTreeMap<Fingerprint, BTreeSet<String>> = results
            .duplicate_groups()
            .map(|(fp, paths)| (fp.clone(), paths.clone()))
            .collect();

        let report = RunReport {
            root: root.display().to_string(),
            generated_at: Utc::now(),
            summary,
            duplicate_groups,
            errors: results.failures.clone(),
            config_used: config,
        };

        if write_report {
            self.save_report_json(&report)?;
            self.save_report_text(&report)?;
        }

        Ok(report)
    }

    fn report_path(&self, extension: &str) -> PathBuf {
        let mut name = self
            .out_file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "extracted".to_string());
        name.push_str(extension);
        self.out_file.with_file_name(name)
    }

    fn save_report_json(&self, report: &RunReport) -> Result<()> {
        let report_path = self.report_path(".report.json");
        let json_content = serde_json::to_string_pretty(report).map_err(|e| FilexError::Config {
            message: format!("Failed to serialize report to JSON: {}", e),
        })?;

        fs::write(&report_path, json_content).map_err(FilexError::Io)?;

        Ok(())
    }

    fn save_report_text(&self, report: &RunReport) -> Result<()> {
        let report_path = self.report_path(".report.txt");
        let mut file = fs::File::create(&report_path).map_err(FilexError::Io)?;

        writeln!(file, "FileX Run Report")?;
        writeln!(file, "================")?;
        writeln!(file)?;

        writeln!(file, "Root: {}", report.root)?;
        writeln!(
            file,
            "Generated: {}",
            report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        )?;
        writeln!(file)?;

        writeln!(file, "Summary:")?;
        writeln!(file, "  Duration: {:?}", report.summary.duration)?;
        writeln!(file, "  Files discovered: {}", report.summary.total_files)?;
        writeln!(file, "  Files processed: {}", report.summary.files_processed)?;
        writeln!(file, "  Files skipped: {}", report.summary.files_skipped)?;
        writeln!(file, "  Files failed: {}", report.summary.files_failed)?;
        writeln!(
            file,
            "  Archives processed: {}",
            report.summary.archives_processed
        )?;
        writeln!(
            file,
            "  Lines: {} matched of {} read",
            report.summary.matched_lines, report.summary.total_lines
        )?;
        writeln!(
            file,
            "  Bytes processed: {} ({})",
            report.summary.bytes_processed,
            format_bytes(report.summary.bytes_processed)
        )?;
        writeln!(file)?;

        if !report.duplicate_groups.is_empty() {
            writeln!(file, "Duplicate groups:")?;
            for (fingerprint, paths) in &report.duplicate_groups {
                writeln!(file, "  sha256:{}", fingerprint.short())?;
                for path in paths {
                    writeln!(file, "    {}", path)?;
                }
            }
            writeln!(file)?;
        }

        if !report.errors.is_empty() {
            writeln!(file, "Errors encountered:")?;
            for error in &report.errors {
                writeln!(file, "  - {}: {}", error.path, error.message)?;
            }
            writeln!(file)?;
        }

        writeln!(file, "Configuration used:")?;
        writeln!(
            file,
            "  Include: {}",
            report.config_used.include.join(", ")
        )?;
        if !report.config_used.exclude.is_empty() {
            writeln!(
                file,
                "  Exclude: {}",
                report.config_used.exclude.join(", ")
            )?;
        }
        if !report.config_used.filter_terms.is_empty() {
            writeln!(
                file,
                "  Filter terms: {}",
                report.config_used.filter_terms.join(", ")
            )?;
        }
        writeln!(file, "  Threads: {}", report.config_used.threads)?;
        writeln!(
            file,
            "  Archives: {}",
            if report.config_used.process_archives {
                "enabled"
            } else {
                "disabled"
            }
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Aggregator, FilterResult};
    use tempfile::TempDir;

    fn sample_results() -> RunResults {
        let aggregator = Aggregator::new();
        aggregator.record(FilterResult {
            display_path: "a.txt".to_string(),
            index: 0,
            lines: vec!["ERROR one".to_string()],
            total_lines: 3,
            bytes: 20,
            fingerprint: Fingerprint::of_bytes(b"same"),
        });
        aggregator.record(FilterResult {
            display_path: "b.txt".to_string(),
            index: 1,
            lines: vec!["ERROR two".to_string()],
            total_lines: 2,
            bytes: 20,
            fingerprint: Fingerprint::of_bytes(b"same"),
        });
        aggregator.finish()
    }

    fn sample_summary() -> RunSummary {
        RunSummary {
            total_files: 2,
            files_processed: 2,
            files_skipped: 0,
            files_failed: 0,
            archives_processed: 0,
            total_lines: 5,
            matched_lines: 2,
            bytes_processed: 40,
            duplicate_files: 2,
            duration: Duration::from_millis(12),
        }
    }

    fn sample_config() -> ConfigSnapshot {
        ConfigSnapshot {
            include: vec!["*.txt".to_string()],
            exclude: vec![],
            filter_terms: vec!["ERROR".to_string()],
            threads: 4,
            max_lines: 0,
            process_archives: true,
            detect_duplicates: true,
        }
    }

    #[test]
    fn test_write_output_in_task_order() {
        let temp_dir = TempDir::new().unwrap();
        let out_file = temp_dir.path().join("out.txt");

        let manager = OutputManager::new(out_file.clone());
        manager.prepare().unwrap();
        let lines = manager.write_output(&sample_results(), true).unwrap();
        assert_eq!(lines, 2);

        let content = fs::read_to_string(&out_file).unwrap();
        let a_pos = content.find("a.txt").unwrap();
        let b_pos = content.find("b.txt").unwrap();
        assert!(a_pos < b_pos);
        assert!(content.contains("ERROR one"));
        assert!(content.contains("sha256:"));
    }

    #[test]
    fn test_write_output_without_annotations() {
        let temp_dir = TempDir::new().unwrap();
        let out_file = temp_dir.path().join("out.txt");

        let manager = OutputManager::new(out_file.clone());
        manager.write_output(&sample_results(), false).unwrap();

        let content = fs::read_to_string(&out_file).unwrap();
        assert_eq!(content, "ERROR one\nERROR two\n");
    }

    #[test]
    fn test_write_output_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let out_file = temp_dir.path().join("out.txt");

        let manager = OutputManager::new(out_file.clone()).with_force_overwrite(true);
        manager.write_output(&sample_results(), true).unwrap();
        let first = fs::read_to_string(&out_file).unwrap();

        manager.write_output(&sample_results(), true).unwrap();
        let second = fs::read_to_string(&out_file).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_prepare_refuses_existing_output() {
        let temp_dir = TempDir::new().unwrap();
        let out_file = temp_dir.path().join("out.txt");
        fs::write(&out_file, "already here").unwrap();

        let manager = OutputManager::new(out_file.clone());
        assert!(matches!(
            manager.prepare(),
            Err(FilexError::OutputExists { .. })
        ));

        let forced = OutputManager::new(out_file).with_force_overwrite(true);
        assert!(forced.prepare().is_ok());
    }

    #[test]
    fn test_run_report_files_are_written() {
        let temp_dir = TempDir::new().unwrap();
        let out_file = temp_dir.path().join("out.txt");

        let manager = OutputManager::new(out_file.clone());
        let report = manager
            .create_run_report(
                Path::new("/data"),
                &sample_results(),
                sample_summary(),
                sample_config(),
                true,
            )
            .unwrap();

        assert_eq!(report.summary.files_processed, 2);
        assert_eq!(report.duplicate_groups.len(), 1);

        let json_path = temp_dir.path().join("out.txt.report.json");
        let text_path = temp_dir.path().join("out.txt.report.txt");
        assert!(json_path.exists());
        assert!(text_path.exists());

        let json_content = fs::read_to_string(json_path).unwrap();
        assert!(json_content.contains("duplicate_groups"));

        let text_content = fs::read_to_string(text_path).unwrap();
        assert!(text_content.contains("FileX Run Report"));
        assert!(text_content.contains("Duplicate groups:"));
    }

    #[test]
    fn test_report_skipped_when_disabled() {
        let temp_dir = TempDir::new().unwrap();
        let out_file = temp_dir.path().join("out.txt");

        let manager = OutputManager::new(out_file);
        manager
            .create_run_report(
                Path::new("/data"),
                &sample_results(),
                sample_summary(),
                sample_config(),
                false,
            )
            .unwrap();

        assert!(!temp_dir.path().join("out.txt.report.json").exists());
    }
}
