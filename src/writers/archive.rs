//! ZIP assembly for multi-file exports
//!
//! Packs the finished chunk blobs into a single archive at a fixed deflate
//! level. The individual chunk blobs stay alive next to the archive so they
//! remain independently downloadable.

use std::io::{Cursor, Write};

use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::errors::WriterResult;
use crate::models::ChunkFile;

/// Compress every chunk blob into one ZIP archive.
///
/// Entries appear in chunk order under their chunk file names. Returns the
/// archive bytes; the compressed size is simply the returned length.
pub fn pack_archive(chunks: &[ChunkFile], compression_level: u32) -> WriterResult<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(compression_level as i32));

    for chunk in chunks {
        zip.start_file(chunk.file_name.as_str(), options)?;
        zip.write_all(&chunk.data)?;
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}
