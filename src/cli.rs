use crate::errors::{AppError, Result};
use crate::external_tools::DEFAULT_BAMSURGEON_ADDSNV;
use crate::reference::DEFAULT_ENSEMBL_BASE_URL;
use clap::error::ErrorKind;
use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "bamboozler",
    version,
    about = "Reference genome processing, BAM generation and variant simulation",
    disable_help_subcommand = true
)]
struct CliArgs {
    #[command(flatten)]
    tools: ToolPaths,
    #[command(subcommand)]
    command: Option<Command>,
}

/// Executable names or paths of the external tools. Usable before or after
/// the subcommand.
#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct ToolPaths {
    #[arg(long = "wgsim", default_value = "wgsim", global = true)]
    pub wgsim: String,
    #[arg(long = "bwa", default_value = "bwa", global = true)]
    pub bwa: String,
    #[arg(long = "samtools", default_value = "samtools", global = true)]
    pub samtools: String,
    #[arg(long = "neat", default_value = "neat-genreads.py", global = true)]
    pub neat: String,
    #[arg(long = "varsim", default_value = "varsim", global = true)]
    pub varsim: String,
    #[arg(long = "python", default_value = "python3", global = true)]
    pub python: String,
    #[arg(
        long = "bamsurgeon-addsnv",
        default_value = DEFAULT_BAMSURGEON_ADDSNV,
        global = true
    )]
    pub bamsurgeon_addsnv: String,
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Install external tools in the environment
    InstallTools(InstallToolsArgs),
    /// Download and slice a reference chromosome
    Download(DownloadArgs),
    /// Retrieve and optionally subset a gene annotation file
    Annotate(AnnotateArgs),
    /// Generate a synthetic, sorted and indexed BAM file
    Bam(BamArgs),
    /// Add variants to an existing BAM
    Variant(VariantArgs),
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct InstallToolsArgs {
    /// Tool names to install (e.g. neat varsim)
    pub tools: Vec<String>,
    /// Package manager invoked as `<installer> install <tool>`
    #[arg(long = "installer", default_value = "pip")]
    pub installer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct DownloadArgs {
    #[arg(long = "species")]
    pub species: String,
    #[arg(long = "build")]
    pub build: String,
    #[arg(long = "chromosome")]
    pub chromosome: String,
    /// 1-based inclusive start
    #[arg(long = "start", default_value_t = 1)]
    pub start: u64,
    /// 1-based inclusive end; defaults to the end of the chromosome
    #[arg(long = "end")]
    pub end: Option<u64>,
    #[arg(long = "output")]
    pub output: PathBuf,
    /// Redownload the reference even if a local copy is present
    #[arg(long = "force-download", action = ArgAction::SetTrue)]
    pub force_download: bool,
    #[arg(long = "cache-dir", default_value = ".")]
    pub cache_dir: PathBuf,
    #[arg(long = "base-url", default_value = DEFAULT_ENSEMBL_BASE_URL)]
    pub base_url: String,
    #[arg(long = "progress", action = ArgAction::SetTrue)]
    pub progress: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct AnnotateArgs {
    /// Local path or URL of a GFF/GTF file
    #[arg(long = "annotation-source")]
    pub annotation_source: String,
    #[arg(long = "output")]
    pub output: PathBuf,
    /// Feature type to keep (column 3), e.g. gene or exon
    #[arg(long = "feature")]
    pub feature: Option<String>,
    /// Substring to look for in the attributes column, e.g. BRCA1
    #[arg(long = "gene")]
    pub gene: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Args)]
pub struct BamArgs {
    #[arg(long = "reference")]
    pub reference: PathBuf,
    #[arg(long = "output-dir")]
    pub output_dir: PathBuf,
    #[arg(long = "sample-name", default_value = "sample")]
    pub sample_name: String,
    /// Number of read pairs passed to wgsim -N
    #[arg(long = "depth", default_value_t = 1000)]
    pub depth: u64,
    /// Substitution rate passed to wgsim -R
    #[arg(long = "mutation-rate", default_value_t = 0.01)]
    pub mutation_rate: f64,
    #[arg(long = "read-len", default_value_t = 100)]
    pub read_len: u32,
    /// Random seed for reproducible simulation
    #[arg(long = "seed")]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Args)]
pub struct VariantArgs {
    #[arg(long = "bam")]
    pub bam: PathBuf,
    #[arg(long = "bai")]
    pub bai: PathBuf,
    #[arg(long = "reference")]
    pub reference: PathBuf,
    #[arg(long = "vcf")]
    pub vcf: PathBuf,
    #[arg(long = "output-dir")]
    pub output_dir: PathBuf,
    /// Output name without the .bam extension
    #[arg(long = "output-name")]
    pub output_name: String,
    #[arg(long = "allele-frequency", default_value_t = 0.5)]
    pub allele_frequency: f64,
    #[arg(long = "read-mix", default_value_t = 0.5)]
    pub read_mix: f64,
    /// neat, varsim or bamsurgeon; omit for the internal placeholder
    #[arg(long = "variant-tool")]
    pub variant_tool: Option<String>,
    /// YAML file with per-tool parameter sections
    #[arg(long = "tool-param-file")]
    pub tool_param_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCli {
    pub tools: ToolPaths,
    pub command: Command,
}

pub fn parse_from_env() -> Result<ParsedCli> {
    parse_args(std::env::args())
}

pub fn parse_args<I, S>(args: I) -> Result<ParsedCli>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut tokens: Vec<String> = args.into_iter().map(Into::into).collect();
    if tokens.is_empty() {
        tokens.push("bamboozler".to_string());
    }

    let cli = CliArgs::try_parse_from(tokens).map_err(map_clap_error)?;
    match cli.command {
        Some(command) => Ok(ParsedCli {
            tools: cli.tools,
            command,
        }),
        None => Err(AppError::MissingSubcommand {
            usage: CliArgs::command().render_help().to_string(),
        }),
    }
}

fn map_clap_error(error: clap::Error) -> AppError {
    let kind = error.kind();
    let rendered = error.to_string();
    match kind {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            AppError::HelpRequested { text: rendered }
        }
        ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
            AppError::MissingSubcommand { usage: rendered }
        }
        ErrorKind::UnknownArgument | ErrorKind::InvalidSubcommand => AppError::UnsupportedArgument {
            arg: first_quoted_token(&rendered).unwrap_or(rendered),
        },
        ErrorKind::TooFewValues | ErrorKind::WrongNumberOfValues => AppError::MissingValue {
            flag: first_quoted_token(&rendered).unwrap_or_else(|| "argument".to_string()),
        },
        ErrorKind::MissingRequiredArgument => AppError::MissingValue {
            flag: missing_arguments(&rendered),
        },
        _ => AppError::ParseError {
            message: clap_error_message(&rendered),
        },
    }
}

fn first_quoted_token(message: &str) -> Option<String> {
    let start = message.find('\'')?;
    let end = message[start + 1..].find('\'')?;
    Some(message[start + 1..start + 1 + end].to_string())
}

fn missing_arguments(message: &str) -> String {
    let flags: Vec<&str> = message
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with("--") || line.starts_with('<'))
        .collect();
    if flags.is_empty() {
        clap_error_message(message)
    } else {
        flags.join(", ")
    }
}

fn clap_error_message(message: &str) -> String {
    message
        .lines()
        .find_map(|line| line.strip_prefix("error: "))
        .or_else(|| message.lines().next())
        .unwrap_or("failed to parse arguments")
        .to_string()
}
