use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::Result;
use flate2::write::GzEncoder;
use flate2::Compression;
use restsnap_core::ResultDocument;

/// Write the snapshot as pretty JSON, optionally gzip-compressed.
pub fn write_document(path: &Path, document: &ResultDocument, gzip: bool) -> Result<()> {
    let file = File::create(path)?;
    if gzip {
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        serde_json::to_writer_pretty(&mut encoder, document)?;
        encoder.finish()?.flush()?;
    } else {
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, document)?;
        writer.flush()?;
    }
    Ok(())
}
