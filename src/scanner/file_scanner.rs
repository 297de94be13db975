use crate::config::FilterConfig;
use crate::error::{FilexError, Result};
use crate::scanner::file_filter::FileFilter;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Unit of work: one file to be read, filtered and fingerprinted.
///
/// The index records discovery order and fixes the position of the file's
/// section in the aggregated output, independent of worker completion order.
#[derive(Debug, Clone)]
pub struct FileTask {
    pub source_path: PathBuf,
    pub display_path: String,
    pub index: usize,
    pub size: u64,
}

impl FileTask {
    pub fn new(index: usize, file: DiscoveredFile) -> Self {
        Self {
            source_path: file.source_path,
            display_path: file.display_path,
            index,
            size: file.size,
        }
    }
}

/// A file surfaced by discovery, not yet assigned a task index.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    pub source_path: PathBuf,
    pub display_path: String,
    pub size: u64,
}

#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub files: Vec<DiscoveredFile>,
    pub archives: Vec<DiscoveredFile>,
    pub skipped: usize,
    pub errors: Vec<String>,
}

pub struct FileScanner {
    filter: FileFilter,
    max_depth: usize,
    collect_archives: bool,
}

impl FileScanner {
    pub fn new(config: &FilterConfig) -> Result<Self> {
        Ok(Self {
            filter: FileFilter::new(config)?,
            max_depth: config.max_depth,
            collect_archives: false,
        })
    }

    pub fn with_archives(mut self, collect: bool) -> Self {
        self.collect_archives = collect;
        self
    }

    pub fn filter(&self) -> &FileFilter {
        &self.filter
    }

    /// Walks the tree under `root` and partitions entries into processable
    /// files and archives. A missing or unreadable root is fatal; individual
    /// entry failures are collected and reported, never aborting the scan.
    pub fn scan<P: AsRef<Path>>(&self, root: P) -> Result<ScanOutcome> {
        let root_path = root.as_ref();

        if !root_path.exists() {
            return Err(FilexError::Discovery {
                path: root_path.display().to_string(),
                message: "path does not exist".to_string(),
            });
        }

        if !root_path.is_dir() {
            return Err(FilexError::Discovery {
                path: root_path.display().to_string(),
                message: "not a directory".to_string(),
            });
        }

        let mut outcome = ScanOutcome::default();

        let walker = WalkDir::new(root_path)
            .max_depth(self.max_depth)
            .follow_links(false) // don't follow symlinks out of the root
            .into_iter()
            .filter_entry(|e| self.should_traverse(e));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    if err
                        .io_error()
                        .is_some_and(|e| e.kind() == std::io::ErrorKind::PermissionDenied)
                    {
                        outcome.errors.push(format!("Permission denied: {}", err));
                    } else {
                        outcome.errors.push(format!("Scan error: {}", err));
                    }
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            match self.classify_entry(&entry, root_path) {
                Ok(Classified::File(file)) => outcome.files.push(file),
                Ok(Classified::Archive(file)) => outcome.archives.push(file),
                Ok(Classified::Skipped) => outcome.skipped += 1,
                Ok(Classified::Ignored) => {}
                Err(err) => {
                    outcome
                        .errors
                        .push(format!("Error examining {}: {}", entry.path().display(), err));
                }
            }
        }

        // Stable ordering: discovery order must not depend on directory
        // iteration quirks, or task indices would shift between runs.
        outcome.files.sort_by(|a, b| a.display_path.cmp(&b.display_path));
        outcome
            .archives
            .sort_by(|a, b| a.display_path.cmp(&b.display_path));

        Ok(outcome)
    }

    fn should_traverse(&self, entry: &DirEntry) -> bool {
        if entry.depth() > self.max_depth {
            return false;
        }

        if entry.file_type().is_file() || entry.depth() == 0 {
            return true;
        }

        if entry.file_type().is_dir() {
            return self.filter.should_traverse_directory(entry.path());
        }

        true
    }

    fn classify_entry(&self, entry: &DirEntry, root_path: &Path) -> Result<Classified> {
        let path = entry.path();
        let relative = self.relative_display(path, root_path)?;

        if self.collect_archives
            && self.filter.is_archive(path)
            && !self.filter.is_excluded(Path::new(&relative))
        {
            let metadata = entry.metadata().map_err(|e| FilexError::Read {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
            return Ok(Classified::Archive(DiscoveredFile {
                source_path: path.to_path_buf(),
                display_path: relative,
                size: metadata.len(),
            }));
        }

        if !self.filter.matches(Path::new(&relative)) {
            return Ok(Classified::Ignored);
        }

        let metadata = entry.metadata().map_err(|e| FilexError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        if !self.filter.is_size_allowed(metadata.len()) {
            return Ok(Classified::Skipped);
        }

        Ok(Classified::File(DiscoveredFile {
            source_path: path.to_path_buf(),
            display_path: relative,
            size: metadata.len(),
        }))
    }

    fn relative_display(&self, file_path: &Path, root_path: &Path) -> Result<String> {
        let relative = file_path
            .strip_prefix(root_path)
            .map_err(|_| FilexError::InvalidPath {
                path: format!(
                    "Cannot calculate relative path for {} from root {}",
                    file_path.display(),
                    root_path.display()
                ),
            })?;

        if relative
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(FilexError::InvalidPath {
                path: format!(
                    "Path contains parent directory references: {}",
                    relative.display()
                ),
            });
        }

        // Forward slashes keep display paths identical across platforms.
        Ok(relative.display().to_string().replace('\\', "/"))
    }

    pub fn get_statistics(&self, files: &[DiscoveredFile]) -> ScanStatistics {
        let total_files = files.len();
        let total_size = files.iter().map(|f| f.size).sum();

        let mut files_by_extension = std::collections::HashMap::new();
        for file in files {
            let ext = Path::new(&file.display_path)
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_lowercase())
                .unwrap_or_else(|| "no_extension".to_string());
            *files_by_extension.entry(ext).or_insert(0) += 1;
        }

        ScanStatistics {
            total_files,
            total_size,
            files_by_extension,
        }
    }
}

enum Classified {
    File(DiscoveredFile),
    Archive(DiscoveredFile),
    Skipped,
    Ignored,
}

#[derive(Debug, Default)]
pub struct ScanStatistics {
    pub total_files: usize,
    pub total_size: u64,
    pub files_by_extension: std::collections::HashMap<String, usize>,
}

impl ScanStatistics {
    pub fn display_summary(&self) -> String {
        let mut summary = format!(
            "Scan results:\n  Total files: {}\n  Total size: {}\n",
            self.total_files,
            crate::error::format_bytes(self.total_size)
        );

        if !self.files_by_extension.is_empty() {
            summary.push_str("  Files by type:\n");
            let mut extensions: Vec<_> = self.files_by_extension.iter().collect();
            extensions.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));

            for (ext, count) in extensions {
                summary.push_str(&format!("    {}: {} files\n", ext, count));
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_config() -> FilterConfig {
        FilterConfig {
            include: vec!["*.txt".to_string(), "*.log".to_string()],
            exclude: vec![],
            exclude_dirs: vec![".git".to_string()],
            exclude_patterns: vec![],
            max_file_size: 1024 * 1024,
            max_depth: 5,
        }
    }

    #[test]
    fn test_scan_missing_root_is_fatal() {
        let scanner = FileScanner::new(&create_test_config()).unwrap();
        let result = scanner.scan("/definitely/not/a/real/path");
        assert!(matches!(result, Err(FilexError::Discovery { .. })));
    }

    #[test]
    fn test_scan_finds_matching_files() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::write(root.join("a.txt"), "alpha").unwrap();
        fs::write(root.join("b.log"), "beta").unwrap();
        fs::write(root.join("c.bin"), "gamma").unwrap();

        let subdir = root.join("nested");
        fs::create_dir(&subdir).unwrap();
        fs::write(subdir.join("d.txt"), "delta").unwrap();

        let scanner = FileScanner::new(&create_test_config()).unwrap();
        let outcome = scanner.scan(root).unwrap();

        let paths: Vec<_> = outcome.files.iter().map(|f| f.display_path.as_str()).collect();
        assert_eq!(paths, vec!["a.txt", "b.log", "nested/d.txt"]);
        assert_eq!(outcome.skipped, 0);
        assert!(outcome.errors.is_empty());
    }

    #[test]
    fn test_scan_order_is_stable() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        for name in ["z.txt", "m.txt", "a.txt"] {
            fs::write(root.join(name), name).unwrap();
        }

        let scanner = FileScanner::new(&create_test_config()).unwrap();
        let first = scanner.scan(root).unwrap();
        let second = scanner.scan(root).unwrap();

        let first_paths: Vec<_> = first.files.iter().map(|f| f.display_path.clone()).collect();
        let second_paths: Vec<_> = second.files.iter().map(|f| f.display_path.clone()).collect();
        assert_eq!(first_paths, second_paths);
        assert_eq!(first_paths, vec!["a.txt", "m.txt", "z.txt"]);
    }

    #[test]
    fn test_oversized_files_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::write(root.join("small.txt"), "ok").unwrap();
        fs::write(root.join("big.txt"), vec![b'x'; 2048]).unwrap();

        let mut config = create_test_config();
        config.max_file_size = 1024;

        let scanner = FileScanner::new(&config).unwrap();
        let outcome = scanner.scan(root).unwrap();

        assert_eq!(outcome.files.len(), 1);
        assert_eq!(outcome.files[0].display_path, "small.txt");
        assert_eq!(outcome.skipped, 1);
    }

    #[test]
    fn test_archives_collected_separately() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::write(root.join("a.txt"), "alpha").unwrap();
        fs::write(root.join("bundle.zip"), "not really a zip").unwrap();

        let scanner = FileScanner::new(&create_test_config())
            .unwrap()
            .with_archives(true);
        let outcome = scanner.scan(root).unwrap();

        assert_eq!(outcome.files.len(), 1);
        assert_eq!(outcome.archives.len(), 1);
        assert_eq!(outcome.archives[0].display_path, "bundle.zip");
    }

    #[test]
    fn test_excluded_directories_are_pruned() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        let git_dir = root.join(".git");
        fs::create_dir(&git_dir).unwrap();
        fs::write(git_dir.join("config.txt"), "ignored").unwrap();
        fs::write(root.join("kept.txt"), "kept").unwrap();

        let scanner = FileScanner::new(&create_test_config()).unwrap();
        let outcome = scanner.scan(root).unwrap();

        assert_eq!(outcome.files.len(), 1);
        assert_eq!(outcome.files[0].display_path, "kept.txt");
    }

    #[test]
    fn test_statistics() {
        let files = vec![
            DiscoveredFile {
                source_path: PathBuf::from("a.txt"),
                display_path: "a.txt".to_string(),
                size: 100,
            },
            DiscoveredFile {
                source_path: PathBuf::from("b.log"),
                display_path: "b.log".to_string(),
                size: 200,
            },
        ];

        let scanner = FileScanner::new(&create_test_config()).unwrap();
        let stats = scanner.get_statistics(&files);

        assert_eq!(stats.total_files, 2);
        assert_eq!(stats.total_size, 300);
        assert_eq!(stats.files_by_extension.get("txt"), Some(&1));
    }
}
