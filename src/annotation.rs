use crate::download::fetch_to_path;
use crate::errors::{AppError, Result};
use crate::writer::with_output_writer;
use flate2::read::MultiGzDecoder;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tempfile::Builder;
use tracing::info;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const MIN_COLUMNS: usize = 9;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationFilter {
    pub feature: Option<String>,
    pub gene_name: Option<String>,
}

impl AnnotationFilter {
    pub fn new(feature: Option<String>, gene_name: Option<String>) -> Self {
        Self {
            feature: feature.filter(|value| !value.is_empty()),
            gene_name: gene_name.filter(|value| !value.is_empty()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.feature.is_none() && self.gene_name.is_none()
    }

    /// Data lines need at least nine tab-separated columns. Feature type
    /// (column 3) is an exact case-insensitive match, gene name a
    /// case-insensitive substring of the attributes (column 9).
    pub fn matches(&self, line: &str) -> bool {
        let columns: Vec<&str> = line.trim_end_matches(['\n', '\r']).split('\t').collect();
        if columns.len() < MIN_COLUMNS {
            return false;
        }
        if let Some(feature) = &self.feature
            && !columns[2].eq_ignore_ascii_case(feature)
        {
            return false;
        }
        if let Some(gene_name) = &self.gene_name
            && !columns[8]
                .to_lowercase()
                .contains(&gene_name.to_lowercase())
        {
            return false;
        }
        true
    }
}

/// Fetches `source` over the network when it carries a URL scheme,
/// otherwise copies it as a local file.
pub fn retrieve_annotation(source: &str, destination: &Path) -> Result<()> {
    if source.contains("://") {
        fetch_to_path(source, destination, false)?;
    } else if Path::new(source).is_file() {
        info!(source = %source, output = %destination.display(), "copying local annotation");
        fs::copy(source, destination)?;
    } else {
        return Err(AppError::MissingInput {
            path: PathBuf::from(source),
        });
    }
    info!(output = %destination.display(), "annotation saved");
    Ok(())
}

/// Streams `input` into `output`, keeping comment lines and the data lines
/// that pass `filter`. Returns the number of data lines kept.
pub fn subset_annotation(input: &Path, output: &Path, filter: &AnnotationFilter) -> Result<usize> {
    if !input.is_file() {
        return Err(AppError::MissingInput {
            path: input.to_path_buf(),
        });
    }

    let reader = open_text(input)?;
    let kept = with_output_writer(output, |out| {
        let mut kept = 0usize;
        for line in reader.lines() {
            let line = line?;
            if line.starts_with('#') {
                writeln!(out, "{line}")?;
                continue;
            }
            if filter.matches(&line) {
                writeln!(out, "{line}")?;
                kept += 1;
            }
        }
        Ok(kept)
    })?;

    info!(output = %output.display(), kept, "subset annotation saved");
    Ok(kept)
}

/// Retrieve, then filter when a filter is set. The unfiltered copy lives in
/// a temp file beside `output` and is removed on return.
pub fn annotate(source: &str, output: &Path, filter: &AnnotationFilter) -> Result<Option<usize>> {
    if filter.is_empty() {
        retrieve_annotation(source, output)?;
        return Ok(None);
    }

    let parent = output
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let staging = Builder::new()
        .prefix(".bamboozler_annotation_")
        .suffix(".tmp")
        .tempfile_in(parent)?;
    retrieve_annotation(source, staging.path())?;
    let kept = subset_annotation(staging.path(), output, filter)?;
    Ok(Some(kept))
}

fn open_text(path: &Path) -> Result<Box<dyn BufRead>> {
    let mut file = File::open(path)?;
    let mut magic = [0u8; 2];
    let is_gzip = file.read(&mut magic)? == 2 && magic == GZIP_MAGIC;
    file.seek(SeekFrom::Start(0))?;
    if is_gzip {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}
