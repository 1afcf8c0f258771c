//! Ensembl chromosome FASTA download, local caching and 1-based slicing.

use crate::download::fetch_to_path;
use crate::errors::{AppError, Result};
use crate::writer::with_output_writer;
use bio::io::fasta;
use flate2::read::MultiGzDecoder;
use rust_htslib::faidx;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::Builder;
use tracing::{debug, info, warn};

pub const DEFAULT_ENSEMBL_BASE_URL: &str = "https://ftp.ensembl.org/pub/current_fasta";

const SPECIES_ALIASES: &[(&str, &str)] = &[("human", "homo_sapiens"), ("mouse", "mus_musculus")];

const BUILD_ALIASES: &[(&str, &str)] = &[
    ("hg38", "GRCh38"),
    ("grch38", "GRCh38"),
    ("hg19", "GRCh37"),
    ("grch37", "GRCh37"),
    ("mm39", "GRCm39"),
    ("grcm39", "GRCm39"),
    ("mm10", "GRCm38"),
    ("grcm38", "GRCm38"),
];

/// Normalized (species, build, chromosome) triple. Every derived name is a
/// pure function of these fields so repeated runs hit the same cache file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceLocator {
    pub species: String,
    pub build: String,
    pub chromosome: String,
    pub ensembl_species: String,
    pub ensembl_build: String,
    pub chromosome_id: String,
}

impl ReferenceLocator {
    pub fn new(species: &str, build: &str, chromosome: &str) -> Self {
        let species = species.trim().to_lowercase();
        let build = build.trim().to_lowercase();
        let ensembl_species = lookup_alias(SPECIES_ALIASES, &species);
        let ensembl_build = lookup_alias(BUILD_ALIASES, &build);
        let chromosome = chromosome.trim().to_string();
        let chromosome_id = strip_chr_prefix(&chromosome).to_string();

        Self {
            species,
            build,
            chromosome,
            ensembl_species,
            ensembl_build,
            chromosome_id,
        }
    }

    pub fn file_name(&self) -> String {
        format!(
            "{}.{}.dna.chromosome.{}.fa.gz",
            capitalize_first(&self.ensembl_species),
            self.ensembl_build,
            self.chromosome_id
        )
    }

    pub fn decompressed_file_name(&self) -> String {
        let name = self.file_name();
        name.trim_end_matches(".gz").to_string()
    }

    pub fn url(&self, base_url: &str) -> String {
        format!(
            "{}/{}/dna/{}",
            base_url.trim_end_matches('/'),
            self.ensembl_species,
            self.file_name()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceRequest {
    pub start: u64,
    pub end: Option<u64>,
    pub output: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlicedSequence {
    pub contig: String,
    pub start: u64,
    pub end: u64,
    pub sequence: String,
}

#[derive(Debug, Clone)]
pub struct ReferenceSlicer {
    locator: ReferenceLocator,
    cache_dir: PathBuf,
    base_url: String,
    force_download: bool,
    progress: bool,
}

impl ReferenceSlicer {
    pub fn new(
        locator: ReferenceLocator,
        cache_dir: impl Into<PathBuf>,
        base_url: &str,
        force_download: bool,
        progress: bool,
    ) -> Self {
        let slicer = Self {
            locator,
            cache_dir: cache_dir.into(),
            base_url: base_url.to_string(),
            force_download,
            progress,
        };
        info!(
            species = %slicer.locator.species,
            build = %slicer.locator.build,
            chromosome = %slicer.locator.chromosome,
            force_download,
            "initialized reference slicer"
        );
        slicer
    }

    pub fn cache_path(&self) -> PathBuf {
        self.cache_dir.join(self.locator.file_name())
    }

    pub fn fasta_path(&self) -> PathBuf {
        self.cache_dir.join(self.locator.decompressed_file_name())
    }

    /// Downloads the compressed chromosome when it is not cached (or a refresh
    /// is forced) and keeps an uncompressed copy beside it for faidx.
    pub fn ensure_local_fasta(&self) -> Result<PathBuf> {
        fs::create_dir_all(&self.cache_dir)?;
        let cache_path = self.cache_path();
        let fasta_path = self.fasta_path();

        let downloaded = if self.force_download || !cache_path.is_file() {
            let url = self.locator.url(&self.base_url);
            let staging = Builder::new()
                .prefix(".bamboozler_download_")
                .suffix(".part")
                .tempfile_in(&self.cache_dir)?;
            fetch_to_path(&url, staging.path(), self.progress)?;
            staging
                .persist(&cache_path)
                .map_err(|err| AppError::Io(err.error))?;
            true
        } else {
            info!(path = %cache_path.display(), "local copy found; skipping download");
            false
        };

        if downloaded || !fasta_path.is_file() {
            decompress_to(&cache_path, &fasta_path)?;
            let stale_index = index_path_for(&fasta_path);
            if stale_index.exists() {
                fs::remove_file(&stale_index)?;
            }
        }
        Ok(fasta_path)
    }

    pub fn download_and_slice(&self, request: &SliceRequest) -> Result<PathBuf> {
        if request.start == 0 || request.end.is_some_and(|end| end < request.start) {
            return Err(AppError::InvalidRegion {
                chromosome: self.locator.chromosome.clone(),
                start: request.start,
                end: request.end.unwrap_or(request.start),
                reason: "expected 1 <= start <= end".to_string(),
            });
        }
        let fasta_path = self.ensure_local_fasta()?;
        let sliced = slice_fasta(
            &fasta_path,
            &self.locator.chromosome_id,
            request.start,
            request.end,
        )?;

        let id = format!("{}:{}-{}", self.locator.chromosome, sliced.start, sliced.end);
        let description = format!("({},{})", self.locator.species, self.locator.build);
        with_output_writer(&request.output, |out| {
            let mut writer = fasta::Writer::new(out);
            writer.write(&id, Some(description.as_str()), sliced.sequence.as_bytes())?;
            writer.flush()?;
            Ok(())
        })?;

        info!(
            output = %request.output.display(),
            contig = %sliced.contig,
            length = sliced.sequence.len(),
            "wrote sliced FASTA"
        );
        Ok(request.output.clone())
    }
}

/// Extracts `start..=end` (1-based) from `chromosome` in an indexed FASTA.
/// The `.fai` is built on first use. `end = None` runs to the end of the
/// sequence.
pub fn slice_fasta(
    path: &Path,
    chromosome: &str,
    start: u64,
    end: Option<u64>,
) -> Result<SlicedSequence> {
    debug!(path = %path.display(), "opening indexed FASTA");
    let reader = faidx::Reader::from_path(path)?;
    let names = sequence_names(&reader)?;
    let contig = resolve_contig(&names, chromosome).ok_or_else(|| AppError::SequenceNotFound {
        chromosome: chromosome.to_string(),
        fasta: path.to_path_buf(),
    })?;

    let length = reader.fetch_seq_len(&contig);
    let end = end.unwrap_or(length);
    let invalid = |reason: String| AppError::InvalidRegion {
        chromosome: contig.clone(),
        start,
        end,
        reason,
    };
    if start == 0 {
        return Err(invalid("coordinates are 1-based".to_string()));
    }
    if end < start {
        return Err(invalid("end precedes start".to_string()));
    }
    if end > length {
        return Err(invalid(format!("sequence length is {length}")));
    }

    let sequence = reader.fetch_seq_string(&contig, (start - 1) as usize, (end - 1) as usize)?;
    let expected = end - start + 1;
    if sequence.len() as u64 != expected {
        return Err(invalid(format!(
            "fetched {} bases, expected {expected}",
            sequence.len()
        )));
    }

    Ok(SlicedSequence {
        contig,
        start,
        end,
        sequence,
    })
}

fn sequence_names(reader: &faidx::Reader) -> Result<Vec<String>> {
    let count = i32::try_from(reader.n_seqs()).unwrap_or(i32::MAX);
    let mut names = Vec::new();
    for index in 0..count {
        names.push(reader.seq_name(index)?);
    }
    Ok(names)
}

// Bare id first, then the chr-prefixed form.
fn resolve_contig(names: &[String], chromosome: &str) -> Option<String> {
    let bare = strip_chr_prefix(chromosome).to_string();
    let prefixed = format!("chr{bare}");
    let has_bare = names.contains(&bare);
    let has_prefixed = names.contains(&prefixed);

    if has_bare && has_prefixed {
        warn!(
            bare = %bare,
            prefixed = %prefixed,
            "both chromosome spellings present; using the bare id"
        );
    }
    let chosen = if has_bare {
        Some(bare)
    } else if has_prefixed {
        Some(prefixed)
    } else {
        None
    };
    if let Some(contig) = &chosen {
        debug!(contig = %contig, "resolved chromosome");
    }
    chosen
}

fn decompress_to(source: &Path, destination: &Path) -> Result<()> {
    info!(source = %source.display(), destination = %destination.display(), "decompressing FASTA");
    let parent = destination.parent().unwrap_or_else(|| Path::new("."));
    let mut staging = Builder::new()
        .prefix(".bamboozler_fasta_")
        .suffix(".part")
        .tempfile_in(parent)?;
    {
        let mut decoder = MultiGzDecoder::new(BufReader::new(File::open(source)?));
        let mut out = BufWriter::new(staging.as_file_mut());
        std::io::copy(&mut decoder, &mut out)?;
        out.flush()?;
    }
    staging
        .persist(destination)
        .map_err(|err| AppError::Io(err.error))?;
    Ok(())
}

fn index_path_for(fasta: &Path) -> PathBuf {
    let mut path = fasta.as_os_str().to_os_string();
    path.push(".fai");
    PathBuf::from(path)
}

fn lookup_alias(aliases: &[(&str, &str)], key: &str) -> String {
    aliases
        .iter()
        .find(|(alias, _)| *alias == key)
        .map_or_else(|| key.to_string(), |(_, canonical)| canonical.to_string())
}

fn capitalize_first(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn strip_chr_prefix(raw: &str) -> &str {
    if raw.len() >= 3 {
        let bytes = raw.as_bytes();
        if bytes[0].eq_ignore_ascii_case(&b'c')
            && bytes[1].eq_ignore_ascii_case(&b'h')
            && bytes[2].eq_ignore_ascii_case(&b'r')
        {
            return &raw[3..];
        }
    }
    raw
}
