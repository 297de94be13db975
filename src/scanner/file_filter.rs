use crate::config::FilterConfig;
use crate::error::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;
use std::path::Path;

const ARCHIVE_EXTENSIONS: &[&str] = &["zip", "7z", "rar"];

pub struct FileFilter {
    include: GlobSet,
    include_patterns: Vec<String>,
    exclude: GlobSet,
    exclude_dirs: Vec<String>,
    exclude_patterns: Vec<Regex>,
    max_file_size: u64,
}

impl FileFilter {
    pub fn new(config: &FilterConfig) -> Result<Self> {
        let include = build_glob_set(&config.include)?;
        let exclude = build_glob_set(&config.exclude)?;

        let exclude_patterns = config
            .exclude_patterns
            .iter()
            .filter_map(|pattern| Regex::new(pattern).ok())
            .collect();

        Ok(Self {
            include,
            include_patterns: config.include.clone(),
            exclude,
            exclude_dirs: config.exclude_dirs.clone(),
            exclude_patterns,
            max_file_size: config.max_file_size,
        })
    }

    /// Decides whether a file (by its path relative to the scan root) belongs
    /// in the batch. Exclusions win over inclusions.
    pub fn matches(&self, relative_path: &Path) -> bool {
        !self.is_excluded(relative_path) && self.include.is_match(relative_path)
    }

    /// Exclusion check alone; also applied to archives, which never go
    /// through the include set.
    pub fn is_excluded(&self, relative_path: &Path) -> bool {
        if self.exclude.is_match(relative_path) {
            return true;
        }

        let path_str = relative_path.to_string_lossy();
        self.exclude_patterns
            .iter()
            .any(|pattern| pattern.is_match(&path_str))
    }

    pub fn should_traverse_directory(&self, path: &Path) -> bool {
        if let Some(dir_name) = path.file_name().and_then(|s| s.to_str()) {
            let dir_name_lower = dir_name.to_lowercase();

            if self
                .exclude_dirs
                .iter()
                .any(|exclude| exclude.to_lowercase() == dir_name_lower)
            {
                return false;
            }

            let path_str = path.to_string_lossy();
            for pattern in &self.exclude_patterns {
                if pattern.is_match(&path_str) {
                    return false;
                }
            }

            // Skip hidden directories (starting with .)
            if dir_name.starts_with('.') && dir_name != "." && dir_name != ".." {
                return false;
            }
        }

        true
    }

    pub fn is_size_allowed(&self, size: u64) -> bool {
        size <= self.max_file_size
    }

    pub fn is_archive(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| {
                let ext = ext.to_lowercase();
                ARCHIVE_EXTENSIONS.contains(&ext.as_str())
            })
            .unwrap_or(false)
    }

    pub fn include_patterns(&self) -> &Vec<String> {
        &self.include_patterns
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }
}

fn build_glob_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
