use std::io::{Cursor, Write};
use zip::result::ZipResult;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::models::{Document, Property};

/// In-memory zip being assembled for an export
pub struct ArchiveWriter {
    zip: ZipWriter<Cursor<Vec<u8>>>,
    options: SimpleFileOptions,
    entries: usize,
}

impl ArchiveWriter {
    pub fn new() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
            options: SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
            entries: 0,
        }
    }

    pub fn add_file(&mut self, name: &str, bytes: &[u8]) -> ZipResult<()> {
        self.zip.start_file(name, self.options)?;
        self.zip.write_all(bytes)?;
        self.entries += 1;
        Ok(())
    }

    pub fn entries(&self) -> usize {
        self.entries
    }

    pub fn finish(self) -> ZipResult<Vec<u8>> {
        Ok(self.zip.finish()?.into_inner())
    }
}

impl Default for ArchiveWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn property_dir(property: &Property) -> String {
    format!("files/{}", property.archive_dir())
}

/// `files/<property_code>_<agent_code>/<type>_<public|private>_<basename>`
pub fn document_entry_name(property: &Property, document: &Document) -> String {
    let basename = document
        .file_path
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(document.file_path.as_str());
    let visibility = if document.is_public { "public" } else { "private" };
    format!(
        "{}/{}_{}_{}",
        property_dir(property),
        document.file_type.as_str(),
        visibility,
        basename
    )
}

pub fn history_entry_name(property: &Property) -> String {
    format!("{}/history.txt", property_dir(property))
}
