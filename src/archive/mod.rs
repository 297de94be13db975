pub mod reader;

pub use reader::{ArchiveKind, ArchiveReader, ExtractedMember};
