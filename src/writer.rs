use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::Path;

use crate::errors::Result;
use flate2::Compression;
use flate2::write::GzEncoder;

/// Hands `write_fn` a writer for `path`: stdout for `-`, a gzip stream when
/// the path ends in `.gz`, a buffered plain file otherwise.
pub fn with_output_writer<F, T>(path: &Path, write_fn: F) -> Result<T>
where
    F: FnOnce(&mut dyn Write) -> Result<T>,
{
    if path.as_os_str() == "-" {
        let mut out = stdout().lock();
        let value = write_fn(&mut out)?;
        out.flush()?;
        return Ok(value);
    }

    let file = BufWriter::new(File::create(path)?);
    if path.extension().is_some_and(|ext| ext == "gz") {
        let mut encoder = GzEncoder::new(file, Compression::default());
        let value = write_fn(&mut encoder)?;
        encoder.finish()?.flush()?;
        return Ok(value);
    }

    let mut file = file;
    let value = write_fn(&mut file)?;
    file.flush()?;
    Ok(value)
}
