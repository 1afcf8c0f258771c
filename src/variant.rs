//! Variant injection into an existing BAM through NEAT, VarSim or
//! BamSurgeon, plus the tool-less placeholder.
//!
//! Tool parameters come from an optional YAML file. It is either a flat
//! key/value set shared by all tools:
//!
//! ```yaml
//! coverage: 30
//! vaf: 0.2
//! aligner: mem
//! ```
//!
//! or one section per tool:
//!
//! ```yaml
//! neat:
//!   coverage: 30
//!   read_length: 150
//!   paired_end: true
//! bamsurgeon:
//!   aligner: mem
//!   keepsecondary: true
//! ```

use crate::errors::{AppError, Result};
use crate::external_tools::{ExternalTools, Stage, ToolInvocation};
use crate::pipeline::{is_plain_file_name, path_arg};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

pub const PLACEHOLDER_CONTENT: &str = "Placeholder for internal variant insertion logic.\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantTool {
    Neat,
    VarSim,
    BamSurgeon,
}

impl FromStr for VariantTool {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "neat" => Ok(Self::Neat),
            "varsim" => Ok(Self::VarSim),
            "bamsurgeon" => Ok(Self::BamSurgeon),
            _ => Err(AppError::UnknownVariantTool {
                name: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for VariantTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Neat => "neat",
            Self::VarSim => "varsim",
            Self::BamSurgeon => "bamsurgeon",
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NeatParams {
    pub coverage: Option<u32>,
    pub read_length: Option<u32>,
    pub error_model: Option<PathBuf>,
    pub vaf: Option<f64>,
    #[serde(default)]
    pub paired_end: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VarSimParams {
    pub coverage: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BamSurgeonParams {
    pub allele_freq: Option<f64>,
    pub seed: Option<u64>,
    #[serde(default = "default_aligner")]
    pub aligner: String,
    pub inslib: Option<PathBuf>,
    #[serde(default)]
    pub keepsecondary: bool,
}

impl Default for BamSurgeonParams {
    fn default() -> Self {
        Self {
            allele_freq: None,
            seed: None,
            aligner: default_aligner(),
            inslib: None,
            keepsecondary: false,
        }
    }
}

fn default_aligner() -> String {
    "bwa".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolParamFile {
    pub neat: Option<NeatParams>,
    pub varsim: Option<VarSimParams>,
    pub bamsurgeon: Option<BamSurgeonParams>,
}

const SECTION_KEYS: [&str; 3] = ["neat", "varsim", "bamsurgeon"];

/// Flat layout: every key any tool understands, at the top level. Each tool
/// picks out its own keys.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
struct FlatToolParams {
    coverage: Option<u32>,
    read_length: Option<u32>,
    error_model: Option<PathBuf>,
    vaf: Option<f64>,
    #[serde(default)]
    paired_end: bool,
    allele_freq: Option<f64>,
    seed: Option<u64>,
    aligner: Option<String>,
    inslib: Option<PathBuf>,
    #[serde(default)]
    keepsecondary: bool,
}

impl From<FlatToolParams> for ToolParamFile {
    fn from(flat: FlatToolParams) -> Self {
        Self {
            neat: Some(NeatParams {
                coverage: flat.coverage,
                read_length: flat.read_length,
                error_model: flat.error_model,
                vaf: flat.vaf,
                paired_end: flat.paired_end,
            }),
            varsim: Some(VarSimParams {
                coverage: flat.coverage,
            }),
            bamsurgeon: Some(BamSurgeonParams {
                allele_freq: flat.allele_freq,
                seed: flat.seed,
                aligner: flat.aligner.unwrap_or_else(default_aligner),
                inslib: flat.inslib,
                keepsecondary: flat.keepsecondary,
            }),
        }
    }
}

impl ToolParamFile {
    fn parse(text: &str) -> std::result::Result<Self, serde_yaml::Error> {
        let value: serde_yaml::Value = serde_yaml::from_str(text)?;
        if value.is_null() {
            return Ok(Self::default());
        }
        let sectioned = value
            .as_mapping()
            .is_some_and(|map| SECTION_KEYS.iter().any(|key| map.contains_key(*key)));
        if sectioned {
            serde_yaml::from_value(value)
        } else {
            serde_yaml::from_value::<FlatToolParams>(value).map(Self::from)
        }
    }

    fn validate(&self, path: &Path) -> Result<()> {
        let fractions = [
            ("neat.vaf", self.neat.as_ref().and_then(|p| p.vaf)),
            (
                "bamsurgeon.allele_freq",
                self.bamsurgeon.as_ref().and_then(|p| p.allele_freq),
            ),
        ];
        for (key, value) in fractions {
            if let Some(value) = value
                && !(value > 0.0 && value <= 1.0)
            {
                return Err(AppError::Config {
                    path: path.to_path_buf(),
                    message: format!("{key}={value} must lie in (0, 1]"),
                });
            }
        }
        if let Some(params) = &self.bamsurgeon
            && params.aligner.trim().is_empty()
        {
            return Err(AppError::Config {
                path: path.to_path_buf(),
                message: "bamsurgeon.aligner must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

pub fn load_tool_params(path: &Path) -> Result<ToolParamFile> {
    if !path.is_file() {
        return Err(AppError::MissingInput {
            path: path.to_path_buf(),
        });
    }
    info!(path = %path.display(), "loading tool parameters");
    let text = fs::read_to_string(path)?;
    let params = if text.trim().is_empty() {
        ToolParamFile::default()
    } else {
        ToolParamFile::parse(&text).map_err(|err| AppError::Config {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?
    };
    params.validate(path)?;
    Ok(params)
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariantJob {
    pub bam: PathBuf,
    pub bai: PathBuf,
    pub reference: PathBuf,
    pub vcf: PathBuf,
    pub output_dir: PathBuf,
    pub output_name: String,
    pub allele_frequency: f64,
    pub read_mix: f64,
}

impl VariantJob {
    pub fn validate(&self) -> Result<()> {
        for path in [&self.bam, &self.bai, &self.reference, &self.vcf] {
            if !path.is_file() {
                return Err(AppError::MissingInput { path: path.clone() });
            }
        }
        if !is_plain_file_name(&self.output_name) {
            return Err(AppError::InvalidValue {
                flag: "--output-name".to_string(),
                value: self.output_name.clone(),
                reason: "must be a plain, non-empty file name".to_string(),
            });
        }
        if !(self.allele_frequency > 0.0 && self.allele_frequency <= 1.0) {
            return Err(AppError::InvalidValue {
                flag: "--allele-frequency".to_string(),
                value: self.allele_frequency.to_string(),
                reason: "must lie in (0, 1]".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.read_mix) {
            return Err(AppError::InvalidValue {
                flag: "--read-mix".to_string(),
                value: self.read_mix.to_string(),
                reason: "must lie in [0, 1]".to_string(),
            });
        }
        Ok(())
    }

    pub fn output_bam(&self) -> PathBuf {
        self.output_dir.join(format!("{}.bam", self.output_name))
    }

    fn output_prefix(&self) -> PathBuf {
        self.output_dir.join(&self.output_name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum VariantStrategy {
    /// Writes a marker file instead of a BAM. No real insertion happens.
    Placeholder,
    Neat(NeatParams),
    VarSim(VarSimParams),
    BamSurgeon(BamSurgeonParams),
}

impl VariantStrategy {
    pub fn resolve(tool: Option<VariantTool>, params: Option<&ToolParamFile>) -> Self {
        match tool {
            None => Self::Placeholder,
            Some(VariantTool::Neat) => {
                Self::Neat(params.and_then(|p| p.neat.clone()).unwrap_or_default())
            }
            Some(VariantTool::VarSim) => {
                Self::VarSim(params.and_then(|p| p.varsim.clone()).unwrap_or_default())
            }
            Some(VariantTool::BamSurgeon) => {
                Self::BamSurgeon(params.and_then(|p| p.bamsurgeon.clone()).unwrap_or_default())
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Placeholder => "internal",
            Self::Neat(_) => "neat",
            Self::VarSim(_) => "varsim",
            Self::BamSurgeon(_) => "bamsurgeon",
        }
    }

    fn stage(&self) -> Option<Stage> {
        match self {
            Self::Placeholder => None,
            Self::Neat(_) => Some(Stage::Neat),
            Self::VarSim(_) => Some(Stage::VarSim),
            Self::BamSurgeon(_) => Some(Stage::BamSurgeon),
        }
    }

    /// Where the strategy leaves its result: the output BAM for BamSurgeon
    /// and the placeholder, NEAT's output prefix, VarSim's output directory.
    pub fn output_location(&self, job: &VariantJob) -> PathBuf {
        match self {
            Self::Placeholder | Self::BamSurgeon(_) => job.output_bam(),
            Self::Neat(_) => job.output_prefix(),
            Self::VarSim(_) => job.output_dir.clone(),
        }
    }

    pub fn command(&self, job: &VariantJob, tools: &ExternalTools) -> Option<ToolInvocation> {
        match self {
            Self::Placeholder => None,
            Self::Neat(params) => Some(neat_command(job, params, tools)),
            Self::VarSim(params) => Some(varsim_command(job, params, tools)),
            Self::BamSurgeon(params) => Some(bamsurgeon_command(job, params, tools)),
        }
    }
}

fn neat_command(job: &VariantJob, params: &NeatParams, tools: &ExternalTools) -> ToolInvocation {
    let mut invocation = ToolInvocation::new(&tools.neat, Vec::<String>::new());
    invocation
        .flag_value("-R", path_arg(&job.reference))
        .flag_value("-o", path_arg(&job.output_prefix()))
        .flag_value("-v", path_arg(&job.vcf));
    if let Some(coverage) = params.coverage {
        invocation.flag_value("-c", coverage);
    }
    if let Some(read_length) = params.read_length {
        invocation.flag_value("-r", read_length);
    }
    if let Some(model) = &params.error_model {
        invocation.flag_value("--error", path_arg(model));
    }
    let vaf = params.vaf.unwrap_or(job.allele_frequency);
    invocation
        .flag_value("--min_vaf", vaf)
        .flag_value("--max_vaf", vaf);
    if params.paired_end {
        invocation.arg("--pe");
    }
    invocation
}

fn varsim_command(job: &VariantJob, params: &VarSimParams, tools: &ExternalTools) -> ToolInvocation {
    let mut invocation = ToolInvocation::new(&tools.varsim, ["simulate"]);
    invocation
        .flag_value("--reference", path_arg(&job.reference))
        .flag_value("--out_dir", path_arg(&job.output_dir))
        .flag_value("--vcfs", path_arg(&job.vcf));
    if let Some(coverage) = params.coverage {
        invocation.flag_value("--coverage", coverage);
    }
    invocation
}

fn bamsurgeon_command(
    job: &VariantJob,
    params: &BamSurgeonParams,
    tools: &ExternalTools,
) -> ToolInvocation {
    let mut invocation =
        ToolInvocation::new(&tools.python, ["-O", tools.bamsurgeon_addsnv.as_str()]);
    invocation
        .flag_value("-v", path_arg(&job.vcf))
        .flag_value("-f", path_arg(&job.bam))
        .flag_value("-r", path_arg(&job.reference))
        .flag_value("-o", path_arg(&job.output_bam()))
        .flag_value("--af", params.allele_freq.unwrap_or(job.allele_frequency));
    if let Some(seed) = params.seed {
        invocation.flag_value("--seed", seed);
    }
    invocation.flag_value("--aligner", &params.aligner);
    if let Some(inslib) = &params.inslib {
        invocation.flag_value("--inslib", path_arg(inslib));
    }
    if params.keepsecondary {
        invocation.arg("--keepsecondary");
    }
    invocation
}

/// Validates the job, then runs exactly one strategy.
pub fn run_variant(
    job: &VariantJob,
    strategy: &VariantStrategy,
    tools: &ExternalTools,
) -> Result<PathBuf> {
    job.validate()?;
    fs::create_dir_all(&job.output_dir)?;
    info!(
        tool = strategy.name(),
        bam = %job.bam.display(),
        bai = %job.bai.display(),
        reference = %job.reference.display(),
        vcf = %job.vcf.display(),
        output_name = %job.output_name,
        allele_frequency = job.allele_frequency,
        read_mix = job.read_mix,
        "starting variant addition"
    );

    let output = strategy.output_location(job);
    let (Some(stage), Some(invocation)) = (strategy.stage(), strategy.command(job, tools)) else {
        warn!(
            output = %output.display(),
            "no external tool selected; writing placeholder instead of a BAM"
        );
        fs::write(&output, PLACEHOLDER_CONTENT)?;
        return Ok(output);
    };

    if matches!(strategy, VariantStrategy::BamSurgeon(_))
        && !Path::new(&tools.bamsurgeon_addsnv).is_file()
    {
        return Err(AppError::CommandNotFound {
            command: tools.bamsurgeon_addsnv.clone(),
        });
    }

    info!(tool = strategy.name(), command = %invocation.command_line(), "running variant tool");
    tools.run(stage, &invocation, None)?;
    info!(tool = strategy.name(), output = %output.display(), "variant tool completed");
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::{
        BamSurgeonParams, NeatParams, PLACEHOLDER_CONTENT, ToolParamFile, VariantJob,
        VariantStrategy, VariantTool, load_tool_params, run_variant,
    };
    use crate::errors::AppError;
    use crate::external_tools::ExternalTools;
    use std::fs;
    use std::path::{Path, PathBuf};

    fn paper_job() -> VariantJob {
        VariantJob {
            bam: PathBuf::from("in.bam"),
            bai: PathBuf::from("in.bam.bai"),
            reference: PathBuf::from("ref.fa"),
            vcf: PathBuf::from("vars.vcf"),
            output_dir: PathBuf::from("out"),
            output_name: "edited".to_string(),
            allele_frequency: 0.3,
            read_mix: 0.5,
        }
    }

    fn staged_job(dir: &Path) -> VariantJob {
        for name in ["in.bam", "in.bam.bai", "ref.fa", "vars.vcf"] {
            fs::write(dir.join(name), "x").expect("expected input write");
        }
        VariantJob {
            bam: dir.join("in.bam"),
            bai: dir.join("in.bam.bai"),
            reference: dir.join("ref.fa"),
            vcf: dir.join("vars.vcf"),
            output_dir: dir.join("out"),
            output_name: "edited".to_string(),
            allele_frequency: 0.3,
            read_mix: 0.5,
        }
    }

    #[test]
    fn parses_tool_names_case_insensitively() {
        assert_eq!("NEAT".parse::<VariantTool>().ok(), Some(VariantTool::Neat));
        assert_eq!("VarSim".parse::<VariantTool>().ok(), Some(VariantTool::VarSim));
        assert_eq!(
            "bamsurgeon".parse::<VariantTool>().ok(),
            Some(VariantTool::BamSurgeon)
        );
        assert!(matches!(
            "bamcake".parse::<VariantTool>(),
            Err(AppError::UnknownVariantTool { name }) if name == "bamcake"
        ));
    }

    #[test]
    fn neat_falls_back_to_job_allele_frequency() {
        let strategy = VariantStrategy::resolve(Some(VariantTool::Neat), None);
        let command = strategy
            .command(&paper_job(), &ExternalTools::default())
            .expect("expected command");
        assert_eq!(
            command.command_line(),
            "neat-genreads.py -R ref.fa -o out/edited -v vars.vcf --min_vaf 0.3 --max_vaf 0.3"
        );
    }

    #[test]
    fn neat_appends_optional_parameters() {
        let strategy = VariantStrategy::Neat(NeatParams {
            coverage: Some(30),
            read_length: Some(150),
            error_model: Some(PathBuf::from("model.p")),
            vaf: Some(0.1),
            paired_end: true,
        });
        let command = strategy
            .command(&paper_job(), &ExternalTools::default())
            .expect("expected command");
        assert_eq!(
            command.command_line(),
            "neat-genreads.py -R ref.fa -o out/edited -v vars.vcf -c 30 -r 150 --error model.p --min_vaf 0.1 --max_vaf 0.1 --pe"
        );
    }

    #[test]
    fn varsim_command_carries_coverage_when_set() {
        let params = ToolParamFile {
            varsim: Some(super::VarSimParams { coverage: Some(20) }),
            ..ToolParamFile::default()
        };
        let strategy = VariantStrategy::resolve(Some(VariantTool::VarSim), Some(&params));
        let command = strategy
            .command(&paper_job(), &ExternalTools::default())
            .expect("expected command");
        assert_eq!(
            command.command_line(),
            "varsim simulate --reference ref.fa --out_dir out --vcfs vars.vcf --coverage 20"
        );
    }

    #[test]
    fn bamsurgeon_uses_defaults_and_flags() {
        let tools = ExternalTools::default();
        let default_command = VariantStrategy::resolve(Some(VariantTool::BamSurgeon), None)
            .command(&paper_job(), &tools)
            .expect("expected command");
        assert_eq!(
            default_command.command_line(),
            "python3 -O /opt/bamsurgeon/bin/addsnv.py -v vars.vcf -f in.bam -r ref.fa -o out/edited.bam --af 0.3 --aligner bwa"
        );

        let tuned = VariantStrategy::BamSurgeon(BamSurgeonParams {
            allele_freq: Some(0.25),
            seed: Some(7),
            aligner: "mem".to_string(),
            inslib: Some(PathBuf::from("lib.fa")),
            keepsecondary: true,
        })
        .command(&paper_job(), &tools)
        .expect("expected command");
        assert!(tuned.command_line().ends_with(
            "--af 0.25 --seed 7 --aligner mem --inslib lib.fa --keepsecondary"
        ));
    }

    #[test]
    fn placeholder_has_no_command() {
        let strategy = VariantStrategy::resolve(None, None);
        assert_eq!(strategy, VariantStrategy::Placeholder);
        assert!(
            strategy
                .command(&paper_job(), &ExternalTools::default())
                .is_none()
        );
    }

    #[test]
    fn loads_sectioned_parameter_file() {
        let dir = tempfile::tempdir().expect("expected tempdir");
        let path = dir.path().join("params.yaml");
        fs::write(
            &path,
            "neat:\n  coverage: 40\n  paired_end: true\nbamsurgeon:\n  seed: 11\n",
        )
        .expect("expected params write");

        let params = load_tool_params(&path).expect("expected params load");
        let neat = params.neat.expect("expected neat section");
        assert_eq!(neat.coverage, Some(40));
        assert!(neat.paired_end);
        let bamsurgeon = params.bamsurgeon.expect("expected bamsurgeon section");
        assert_eq!(bamsurgeon.seed, Some(11));
        assert_eq!(bamsurgeon.aligner, "bwa");
        assert!(params.varsim.is_none());
    }

    #[test]
    fn flat_parameter_file_feeds_neat() {
        let dir = tempfile::tempdir().expect("expected tempdir");
        let path = dir.path().join("params.yaml");
        fs::write(&path, "coverage: 30\nvaf: 0.2\npaired_end: true\n")
            .expect("expected params write");

        let params = load_tool_params(&path).expect("expected flat params load");
        let strategy = VariantStrategy::resolve(Some(VariantTool::Neat), Some(&params));
        let command = strategy
            .command(&paper_job(), &ExternalTools::default())
            .expect("expected command");
        assert_eq!(
            command.command_line(),
            "neat-genreads.py -R ref.fa -o out/edited -v vars.vcf -c 30 --min_vaf 0.2 --max_vaf 0.2 --pe"
        );
    }

    #[test]
    fn flat_parameter_file_feeds_bamsurgeon() {
        let dir = tempfile::tempdir().expect("expected tempdir");
        let path = dir.path().join("params.yaml");
        fs::write(
            &path,
            "allele_freq: 0.4\nseed: 9\naligner: mem\nkeepsecondary: true\ncoverage: 30\n",
        )
        .expect("expected params write");

        let params = load_tool_params(&path).expect("expected flat params load");
        let strategy = VariantStrategy::resolve(Some(VariantTool::BamSurgeon), Some(&params));
        let command = strategy
            .command(&paper_job(), &ExternalTools::default())
            .expect("expected command");
        assert!(
            command
                .command_line()
                .ends_with("--af 0.4 --seed 9 --aligner mem --keepsecondary")
        );
    }

    #[test]
    fn flat_parameter_file_rejects_keys_no_tool_knows() {
        let dir = tempfile::tempdir().expect("expected tempdir");
        let unknown = dir.path().join("unknown.yaml");
        fs::write(&unknown, "coverage: 30\nvaff: 0.2\n").expect("expected params write");
        assert!(matches!(
            load_tool_params(&unknown),
            Err(AppError::Config { message, .. }) if message.contains("vaff")
        ));

        let bad_af = dir.path().join("af.yaml");
        fs::write(&bad_af, "allele_freq: 0\n").expect("expected params write");
        assert!(matches!(
            load_tool_params(&bad_af),
            Err(AppError::Config { .. })
        ));
    }

    #[test]
    fn rejects_unknown_keys_and_bad_fractions() {
        let dir = tempfile::tempdir().expect("expected tempdir");
        let unknown = dir.path().join("unknown.yaml");
        fs::write(&unknown, "neat:\n  coverge: 40\n").expect("expected params write");
        assert!(matches!(
            load_tool_params(&unknown),
            Err(AppError::Config { .. })
        ));

        let bad_vaf = dir.path().join("vaf.yaml");
        fs::write(&bad_vaf, "neat:\n  vaf: 1.5\n").expect("expected params write");
        assert!(matches!(
            load_tool_params(&bad_vaf),
            Err(AppError::Config { .. })
        ));

        assert!(matches!(
            load_tool_params(&dir.path().join("absent.yaml")),
            Err(AppError::MissingInput { .. })
        ));
    }

    #[test]
    fn placeholder_writes_marker_file() {
        let dir = tempfile::tempdir().expect("expected tempdir");
        let job = staged_job(dir.path());

        let output = run_variant(&job, &VariantStrategy::Placeholder, &ExternalTools::default())
            .expect("expected placeholder success");
        assert_eq!(output, dir.path().join("out").join("edited.bam"));
        assert_eq!(
            fs::read_to_string(output).expect("expected marker"),
            PLACEHOLDER_CONTENT
        );
    }

    #[test]
    fn missing_inputs_fail_before_execution() {
        let dir = tempfile::tempdir().expect("expected tempdir");
        let mut job = staged_job(dir.path());
        job.vcf = dir.path().join("absent.vcf");

        let result = run_variant(&job, &VariantStrategy::Placeholder, &ExternalTools::default());
        assert!(matches!(result, Err(AppError::MissingInput { .. })));
        assert!(!job.output_dir.exists());
    }

    #[test]
    fn output_name_must_be_a_plain_file_name() {
        let dir = tempfile::tempdir().expect("expected tempdir");
        for name in ["", ".", "..", "sub/edited"] {
            let mut job = staged_job(dir.path());
            job.output_name = name.to_string();
            assert!(matches!(
                job.validate(),
                Err(AppError::InvalidValue { flag, .. }) if flag == "--output-name"
            ));
        }
    }

    #[test]
    fn missing_bamsurgeon_script_is_command_not_found() {
        let dir = tempfile::tempdir().expect("expected tempdir");
        let job = staged_job(dir.path());
        let tools = ExternalTools {
            bamsurgeon_addsnv: dir.path().join("absent_addsnv.py").display().to_string(),
            ..ExternalTools::default()
        };

        let result = run_variant(
            &job,
            &VariantStrategy::BamSurgeon(BamSurgeonParams::default()),
            &tools,
        );
        assert!(matches!(result, Err(AppError::CommandNotFound { .. })));
    }

    #[test]
    fn missing_tool_executable_is_command_not_found() {
        let dir = tempfile::tempdir().expect("expected tempdir");
        let job = staged_job(dir.path());
        let tools = ExternalTools {
            varsim: "missing_varsim_for_variant_test".to_string(),
            ..ExternalTools::default()
        };

        let result = run_variant(
            &job,
            &VariantStrategy::resolve(Some(VariantTool::VarSim), None),
            &tools,
        );
        assert!(matches!(
            result,
            Err(AppError::CommandNotFound { command }) if command == "missing_varsim_for_variant_test"
        ));
    }
}
