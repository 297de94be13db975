use crate::error::{FilexError, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Supported archive formats. Decoding is delegated entirely to the
/// format-specific crates; this module only adapts them to one surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    SevenZip,
    Rar,
}

impl ArchiveKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .as_deref()
        {
            Some("zip") => Some(ArchiveKind::Zip),
            Some("7z") => Some(ArchiveKind::SevenZip),
            Some("rar") => Some(ArchiveKind::Rar),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ArchiveKind::Zip => "ZIP",
            ArchiveKind::SevenZip => "7Z",
            ArchiveKind::Rar => "RAR",
        }
    }
}

/// A file member extracted from an archive, addressed by its name inside
/// the archive and its on-disk location in the extraction directory.
#[derive(Debug, Clone)]
pub struct ExtractedMember {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
}

pub struct ArchiveReader {
    path: PathBuf,
    kind: ArchiveKind,
}

impl ArchiveReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let kind = ArchiveKind::from_path(&path).ok_or_else(|| FilexError::Archive {
            path: path.display().to_string(),
            message: "unsupported archive format".to_string(),
        })?;

        if !path.is_file() {
            return Err(FilexError::Archive {
                path: path.display().to_string(),
                message: "archive file not found".to_string(),
            });
        }

        Ok(Self { path, kind })
    }

    pub fn kind(&self) -> ArchiveKind {
        self.kind
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Names of the file members (directories excluded).
    pub fn list_members(&self) -> Result<Vec<String>> {
        match self.kind {
            ArchiveKind::Zip => self.list_zip_members(),
            ArchiveKind::SevenZip => self.list_7z_members(),
            ArchiveKind::Rar => self.list_rar_members(),
        }
    }

    /// Extracts all file members under `dest` and returns them in member-name
    /// order. Any failure is an archive-level error; the caller records it
    /// and carries on with the rest of the batch.
    pub fn extract_to(&self, dest: &Path) -> Result<Vec<ExtractedMember>> {
        std::fs::create_dir_all(dest).map_err(|e| self.archive_error(e.to_string()))?;

        match self.kind {
            ArchiveKind::Zip => self.extract_zip(dest)?,
            ArchiveKind::SevenZip => self.extract_7z(dest)?,
            ArchiveKind::Rar => self.extract_rar(dest)?,
        }

        self.collect_extracted(dest)
    }

    fn list_zip_members(&self) -> Result<Vec<String>> {
        let file = File::open(&self.path).map_err(|e| self.archive_error(e.to_string()))?;

        let mut archive =
            zip::ZipArchive::new(file).map_err(|e| self.archive_error(e.to_string()))?;

        let mut members = Vec::new();
        for i in 0..archive.len() {
            let entry = archive
                .by_index(i)
                .map_err(|e| self.archive_error(e.to_string()))?;
            if !entry.is_dir() {
                members.push(entry.name().to_string());
            }
        }

        members.sort();
        Ok(members)
    }

    fn list_7z_members(&self) -> Result<Vec<String>> {
        let mut file = File::open(&self.path).map_err(|e| self.archive_error(e.to_string()))?;
        let len = file
            .metadata()
            .map_err(|e| self.archive_error(e.to_string()))?
            .len();

        let reader = sevenz_rust::SevenZReader::new(&mut file, len, sevenz_rust::Password::empty())
            .map_err(|e| self.archive_error(format!("{:?}", e)))?;

        let mut members: Vec<String> = reader
            .archive()
            .files
            .iter()
            .filter(|entry| !entry.is_directory())
            .map(|entry| entry.name().to_string())
            .collect();

        members.sort();
        Ok(members)
    }

    fn list_rar_members(&self) -> Result<Vec<String>> {
        let path_str = self.path.to_string_lossy();
        let archive = unrar::Archive::new(path_str.as_ref())
            .open_for_listing()
            .map_err(|e| self.archive_error(format!("{:?}", e)))?;

        let mut members = Vec::new();
        for entry in archive {
            let entry = entry.map_err(|e| self.archive_error(format!("{:?}", e)))?;
            if entry.is_file() {
                members.push(entry.filename.display().to_string().replace('\\', "/"));
            }
        }

        members.sort();
        Ok(members)
    }

    fn extract_zip(&self, dest: &Path) -> Result<()> {
        let file = File::open(&self.path).map_err(|e| self.archive_error(e.to_string()))?;

        let mut archive =
            zip::ZipArchive::new(file).map_err(|e| self.archive_error(e.to_string()))?;

        for i in 0..archive.len() {
            let mut entry = archive
                .by_index(i)
                .map_err(|e| self.archive_error(e.to_string()))?;

            // enclosed_name rejects entries that would escape the
            // extraction directory
            let outpath = match entry.enclosed_name() {
                Some(path) => dest.join(path),
                None => continue,
            };

            if entry.is_dir() {
                std::fs::create_dir_all(&outpath)
                    .map_err(|e| self.archive_error(e.to_string()))?;
            } else {
                if let Some(parent) = outpath.parent() {
                    if !parent.exists() {
                        std::fs::create_dir_all(parent)
                            .map_err(|e| self.archive_error(e.to_string()))?;
                    }
                }
                let mut outfile =
                    File::create(&outpath).map_err(|e| self.archive_error(e.to_string()))?;
                std::io::copy(&mut entry, &mut outfile)
                    .map_err(|e| self.archive_error(e.to_string()))?;
            }
        }

        Ok(())
    }

    fn extract_7z(&self, dest: &Path) -> Result<()> {
        sevenz_rust::decompress_file(&self.path, dest)
            .map_err(|e| self.archive_error(format!("{:?}", e)))
    }

    fn extract_rar(&self, dest: &Path) -> Result<()> {
        let path_str = self.path.to_string_lossy();
        let mut cursor = unrar::Archive::new(path_str.as_ref())
            .open_for_processing()
            .map_err(|e| self.archive_error(format!("{:?}", e)))?;

        loop {
            match cursor.read_header() {
                Ok(Some(header)) => {
                    cursor = header
                        .extract_with_base(dest)
                        .map_err(|e| self.archive_error(format!("{:?}", e)))?;
                }
                Ok(None) => break,
                Err(e) => return Err(self.archive_error(format!("{:?}", e))),
            }
        }

        Ok(())
    }

    fn collect_extracted(&self, dest: &Path) -> Result<Vec<ExtractedMember>> {
        let mut members = Vec::new();

        for entry in WalkDir::new(dest).follow_links(false) {
            let entry = entry.map_err(|e| self.archive_error(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(dest)
                .map_err(|_| self.archive_error("extracted member outside destination".into()))?;

            let metadata = entry
                .metadata()
                .map_err(|e| self.archive_error(e.to_string()))?;

            members.push(ExtractedMember {
                name: relative.display().to_string().replace('\\', "/"),
                path: entry.path().to_path_buf(),
                size: metadata.len(),
            });
        }

        members.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(members)
    }

    fn archive_error(&self, message: String) -> FilexError {
        FilexError::Archive {
            path: self.path.display().to_string(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::FileOptions;

    fn create_test_zip(dir: &Path) -> PathBuf {
        let zip_path = dir.join("bundle.zip");
        let file = File::create(&zip_path).unwrap();
        let mut writer = zip::ZipWriter::new(file);

        writer
            .start_file("inner.txt", FileOptions::default())
            .unwrap();
        writer.write_all(b"hello from inside\n").unwrap();

        writer.add_directory("sub", FileOptions::default()).unwrap();
        writer
            .start_file("sub/deep.log", FileOptions::default())
            .unwrap();
        writer.write_all(b"deep line\n").unwrap();

        writer.finish().unwrap();
        zip_path
    }

    #[test]
    fn test_kind_detection() {
        assert_eq!(
            ArchiveKind::from_path(Path::new("a.zip")),
            Some(ArchiveKind::Zip)
        );
        assert_eq!(
            ArchiveKind::from_path(Path::new("a.7z")),
            Some(ArchiveKind::SevenZip)
        );
        assert_eq!(
            ArchiveKind::from_path(Path::new("A.RAR")),
            Some(ArchiveKind::Rar)
        );
        assert_eq!(ArchiveKind::from_path(Path::new("a.tar")), None);
    }

    #[test]
    fn test_open_rejects_unsupported_format() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.tar");
        std::fs::write(&path, "x").unwrap();

        assert!(matches!(
            ArchiveReader::open(&path),
            Err(FilexError::Archive { .. })
        ));
    }

    #[test]
    fn test_open_rejects_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing.zip");

        assert!(matches!(
            ArchiveReader::open(&path),
            Err(FilexError::Archive { .. })
        ));
    }

    #[test]
    fn test_zip_member_listing() {
        let temp_dir = TempDir::new().unwrap();
        let zip_path = create_test_zip(temp_dir.path());

        let reader = ArchiveReader::open(&zip_path).unwrap();
        assert_eq!(reader.kind(), ArchiveKind::Zip);

        let members = reader.list_members().unwrap();
        assert_eq!(members, vec!["inner.txt", "sub/deep.log"]);
    }

    #[test]
    fn test_zip_extraction() {
        let temp_dir = TempDir::new().unwrap();
        let zip_path = create_test_zip(temp_dir.path());

        let dest = TempDir::new().unwrap();
        let reader = ArchiveReader::open(&zip_path).unwrap();
        let members = reader.extract_to(dest.path()).unwrap();

        assert_eq!(members.len(), 2);
        assert_eq!(members[0].name, "inner.txt");
        assert_eq!(members[1].name, "sub/deep.log");
        assert_eq!(
            std::fs::read_to_string(&members[0].path).unwrap(),
            "hello from inside\n"
        );
    }

    #[test]
    fn test_corrupt_zip_is_archive_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.zip");
        std::fs::write(&path, "this is not a zip file").unwrap();

        let reader = ArchiveReader::open(&path).unwrap();
        let dest = TempDir::new().unwrap();

        assert!(matches!(
            reader.extract_to(dest.path()),
            Err(FilexError::Archive { .. })
        ));
    }
}
