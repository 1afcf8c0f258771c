use crate::errors::{AppError, Result};
use crate::external_tools::{ExternalTools, Stage, ToolInvocation};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct BamJob {
    pub reference: PathBuf,
    pub output_dir: PathBuf,
    pub sample_name: String,
    pub depth: u64,
    pub mutation_rate: f64,
    pub read_length: u32,
    pub seed: Option<u64>,
}

impl BamJob {
    pub fn validate(&self) -> Result<()> {
        if !self.reference.is_file() {
            return Err(AppError::MissingInput {
                path: self.reference.clone(),
            });
        }
        if !is_plain_file_name(&self.sample_name) {
            return Err(AppError::InvalidValue {
                flag: "--sample-name".to_string(),
                value: self.sample_name.clone(),
                reason: "must be a plain, non-empty file name".to_string(),
            });
        }
        if self.depth == 0 {
            return Err(AppError::InvalidValue {
                flag: "--depth".to_string(),
                value: self.depth.to_string(),
                reason: "must be a positive integer".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(AppError::InvalidValue {
                flag: "--mutation-rate".to_string(),
                value: self.mutation_rate.to_string(),
                reason: "must lie between 0 and 1".to_string(),
            });
        }
        if self.read_length == 0 {
            return Err(AppError::InvalidValue {
                flag: "--read-len".to_string(),
                value: self.read_length.to_string(),
                reason: "must be a positive integer".to_string(),
            });
        }
        Ok(())
    }
}

/// Every file a job writes. Only `sorted_bam` and `index` outlive a
/// successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BamArtifacts {
    pub read1: PathBuf,
    pub read2: PathBuf,
    pub sam: PathBuf,
    pub unsorted_bam: PathBuf,
    pub sorted_bam: PathBuf,
    pub index: PathBuf,
}

impl BamArtifacts {
    pub fn for_job(job: &BamJob) -> Self {
        let dir = &job.output_dir;
        let name = &job.sample_name;
        let sorted_bam = dir.join(format!("{name}_sorted.bam"));
        Self {
            read1: dir.join(format!("{name}_1.fq")),
            read2: dir.join(format!("{name}_2.fq")),
            sam: dir.join(format!("{name}.sam")),
            unsorted_bam: dir.join(format!("{name}.bam")),
            index: with_appended_extension(&sorted_bam, "bai"),
            sorted_bam,
        }
    }

    pub fn intermediates(&self) -> [&Path; 4] {
        [&self.unsorted_bam, &self.sam, &self.read1, &self.read2]
    }

    fn remove_intermediates(&self) -> Result<()> {
        remove_files(&self.intermediates())
    }
}

pub struct BamGenerator {
    tools: ExternalTools,
}

impl BamGenerator {
    pub fn new(tools: ExternalTools) -> Self {
        Self { tools }
    }

    /// wgsim -> bwa mem -> samtools view -> sort -> index, then removal of
    /// the intermediates. A bwa index built by this run counts as an
    /// intermediate; one that already existed is left alone. Any failing
    /// stage aborts the run and leaves the files produced so far in place.
    pub fn generate_bam(&self, job: &BamJob) -> Result<PathBuf> {
        job.validate()?;
        fs::create_dir_all(&job.output_dir)?;
        self.tools.warn_missing(&[
            self.tools.wgsim.as_str(),
            self.tools.bwa.as_str(),
            self.tools.samtools.as_str(),
        ]);

        info!(
            reference = %job.reference.display(),
            output_dir = %job.output_dir.display(),
            sample = %job.sample_name,
            depth = job.depth,
            mutation_rate = job.mutation_rate,
            read_length = job.read_length,
            "generating BAM"
        );
        if let Some(seed) = job.seed {
            info!(seed, "using random seed");
        }

        let artifacts = BamArtifacts::for_job(job);

        let built_index = if bwa_index_path(&job.reference).is_file() {
            info!(reference = %job.reference.display(), "bwa index present; skipping indexing");
            false
        } else {
            warn!(reference = %job.reference.display(), "bwa index missing; indexing reference");
            self.run_stage(
                Stage::BwaIndex,
                &self.bwa_index_invocation(job),
                None,
            )?;
            true
        };

        self.run_stage(
            Stage::Simulate,
            &self.simulate_invocation(job, &artifacts),
            None,
        )?;
        self.run_stage(
            Stage::Align,
            &self.align_invocation(job, &artifacts),
            Some(&artifacts.sam),
        )?;
        self.run_stage(
            Stage::Convert,
            &self.convert_invocation(&artifacts),
            Some(&artifacts.unsorted_bam),
        )?;
        self.run_stage(Stage::Sort, &self.sort_invocation(&artifacts), None)?;
        self.run_stage(Stage::Index, &self.index_invocation(&artifacts), None)?;

        artifacts.remove_intermediates()?;
        if built_index {
            remove_files(&bwa_index_files(&job.reference))?;
        }
        info!(
            output = %artifacts.sorted_bam.display(),
            "generated sorted, indexed BAM"
        );
        Ok(artifacts.sorted_bam)
    }

    pub fn bwa_index_invocation(&self, job: &BamJob) -> ToolInvocation {
        ToolInvocation::new(&self.tools.bwa, ["index".to_string(), path_arg(&job.reference)])
    }

    pub fn simulate_invocation(&self, job: &BamJob, artifacts: &BamArtifacts) -> ToolInvocation {
        let mut invocation = ToolInvocation::new(&self.tools.wgsim, Vec::<String>::new());
        invocation
            .flag_value("-N", job.depth)
            .flag_value("-R", job.mutation_rate)
            .flag_value("-1", job.read_length)
            .flag_value("-2", job.read_length);
        if let Some(seed) = job.seed {
            invocation.flag_value("-S", seed);
        }
        invocation
            .arg(path_arg(&job.reference))
            .arg(path_arg(&artifacts.read1))
            .arg(path_arg(&artifacts.read2));
        invocation
    }

    pub fn align_invocation(&self, job: &BamJob, artifacts: &BamArtifacts) -> ToolInvocation {
        ToolInvocation::new(
            &self.tools.bwa,
            [
                "mem".to_string(),
                path_arg(&job.reference),
                path_arg(&artifacts.read1),
                path_arg(&artifacts.read2),
            ],
        )
    }

    pub fn convert_invocation(&self, artifacts: &BamArtifacts) -> ToolInvocation {
        ToolInvocation::new(
            &self.tools.samtools,
            ["view".to_string(), "-bS".to_string(), path_arg(&artifacts.sam)],
        )
    }

    pub fn sort_invocation(&self, artifacts: &BamArtifacts) -> ToolInvocation {
        ToolInvocation::new(
            &self.tools.samtools,
            [
                "sort".to_string(),
                path_arg(&artifacts.unsorted_bam),
                "-o".to_string(),
                path_arg(&artifacts.sorted_bam),
            ],
        )
    }

    pub fn index_invocation(&self, artifacts: &BamArtifacts) -> ToolInvocation {
        ToolInvocation::new(
            &self.tools.samtools,
            ["index".to_string(), path_arg(&artifacts.sorted_bam)],
        )
    }

    fn run_stage(
        &self,
        stage: Stage,
        invocation: &ToolInvocation,
        stdout_path: Option<&Path>,
    ) -> Result<()> {
        self.tools.run(stage, invocation, stdout_path)?;
        info!(stage = %stage, "stage completed");
        Ok(())
    }
}

/// Non-empty, no path separators, not `.` or `..`.
pub(crate) fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(['/', '\\']) && name != "." && name != ".."
}

pub(crate) fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

pub(crate) fn with_appended_extension(path: &Path, extension: &str) -> PathBuf {
    let mut appended = path.as_os_str().to_os_string();
    appended.push(".");
    appended.push(extension);
    PathBuf::from(appended)
}

const BWA_INDEX_EXTENSIONS: [&str; 5] = ["amb", "ann", "bwt", "pac", "sa"];

fn bwa_index_path(reference: &Path) -> PathBuf {
    with_appended_extension(reference, "bwt")
}

/// Files `bwa index` writes beside the reference.
pub fn bwa_index_files(reference: &Path) -> Vec<PathBuf> {
    BWA_INDEX_EXTENSIONS
        .iter()
        .map(|extension| with_appended_extension(reference, extension))
        .collect()
}

fn remove_files<P: AsRef<Path>>(paths: &[P]) -> Result<()> {
    for path in paths {
        let path = path.as_ref();
        if path.exists() {
            debug!(path = %path.display(), "removing intermediate");
            fs::remove_file(path)?;
        }
    }
    Ok(())
}
