pub mod annotation;
pub mod cli;
pub mod download;
pub mod errors;
pub mod external_tools;
pub mod pipeline;
pub mod reference;
pub mod variant;
pub mod writer;

use annotation::AnnotationFilter;
use cli::{AnnotateArgs, BamArgs, Command, DownloadArgs, ParsedCli, VariantArgs};
use errors::Result;
use external_tools::ExternalTools;
use pipeline::{BamGenerator, BamJob};
use reference::{ReferenceLocator, ReferenceSlicer, SliceRequest};
use std::sync::Once;
use tracing::info;
use tracing_subscriber::EnvFilter;
use variant::{VariantJob, VariantStrategy, VariantTool};

static TRACING_INIT: Once = Once::new();

pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    });
}

pub fn run_from_args(parsed: ParsedCli) -> Result<()> {
    let tools = ExternalTools::from_args(&parsed.tools);
    match parsed.command {
        Command::InstallTools(args) => tools.install_tools(&args.tools, &args.installer),
        Command::Download(args) => run_download(&args),
        Command::Annotate(args) => run_annotate(&args),
        Command::Bam(args) => run_bam(&args, tools),
        Command::Variant(args) => run_variant(&args, &tools),
    }
}

fn run_download(args: &DownloadArgs) -> Result<()> {
    let locator = ReferenceLocator::new(&args.species, &args.build, &args.chromosome);
    let slicer = ReferenceSlicer::new(
        locator,
        &args.cache_dir,
        &args.base_url,
        args.force_download,
        args.progress,
    );
    let output = slicer.download_and_slice(&SliceRequest {
        start: args.start,
        end: args.end,
        output: args.output.clone(),
    })?;
    info!(output = %output.display(), "reference slice ready");
    Ok(())
}

fn run_annotate(args: &AnnotateArgs) -> Result<()> {
    let filter = AnnotationFilter::new(args.feature.clone(), args.gene.clone());
    annotation::annotate(&args.annotation_source, &args.output, &filter)?;
    Ok(())
}

fn run_bam(args: &BamArgs, tools: ExternalTools) -> Result<()> {
    let job = BamJob {
        reference: args.reference.clone(),
        output_dir: args.output_dir.clone(),
        sample_name: args.sample_name.clone(),
        depth: args.depth,
        mutation_rate: args.mutation_rate,
        read_length: args.read_len,
        seed: args.seed,
    };
    BamGenerator::new(tools).generate_bam(&job)?;
    Ok(())
}

fn run_variant(args: &VariantArgs, tools: &ExternalTools) -> Result<()> {
    // Tool name and parameter file are checked before any input is touched.
    let tool = args
        .variant_tool
        .as_deref()
        .map(str::parse::<VariantTool>)
        .transpose()?;
    let params = args
        .tool_param_file
        .as_deref()
        .map(variant::load_tool_params)
        .transpose()?;

    let job = VariantJob {
        bam: args.bam.clone(),
        bai: args.bai.clone(),
        reference: args.reference.clone(),
        vcf: args.vcf.clone(),
        output_dir: args.output_dir.clone(),
        output_name: args.output_name.clone(),
        allele_frequency: args.allele_frequency,
        read_mix: args.read_mix,
    };
    let strategy = VariantStrategy::resolve(tool, params.as_ref());
    let output = variant::run_variant(&job, &strategy, tools)?;
    info!(output = %output.display(), "variant step finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::cli::parse_args;
    use crate::errors::AppError;
    use std::fs;

    #[test]
    fn wiring_parses_and_filters_local_annotation() {
        let dir = tempfile::tempdir().expect("expected tempdir");
        let source = dir.path().join("genes.gff");
        let output = dir.path().join("exons.gff");
        fs::write(
            &source,
            "chr1\tsrc\tgene\t1\t90\t.\t+\t.\tName=A\nchr1\tsrc\texon\t1\t40\t.\t+\t.\tName=A\n",
        )
        .expect("expected source write");

        let parsed = parse_args([
            "bamboozler",
            "annotate",
            "--annotation-source",
            source.to_str().expect("expected utf8 path"),
            "--output",
            output.to_str().expect("expected utf8 path"),
            "--feature",
            "exon",
        ])
        .expect("expected valid args");
        crate::run_from_args(parsed).expect("expected annotate success");

        let content = fs::read_to_string(&output).expect("expected output");
        assert_eq!(content, "chr1\tsrc\texon\t1\t40\t.\t+\t.\tName=A\n");
    }

    #[test]
    fn unknown_variant_tool_fails_before_inputs_are_checked() {
        let dir = tempfile::tempdir().expect("expected tempdir");
        let out_dir = dir.path().join("out");
        let parsed = parse_args([
            "bamboozler",
            "variant",
            "--bam",
            "absent.bam",
            "--bai",
            "absent.bam.bai",
            "--reference",
            "absent.fa",
            "--vcf",
            "absent.vcf",
            "--output-dir",
            out_dir.to_str().expect("expected utf8 path"),
            "--output-name",
            "edited",
            "--variant-tool",
            "bamcake",
        ])
        .expect("expected valid args");

        let result = crate::run_from_args(parsed);
        assert!(matches!(
            result,
            Err(AppError::UnknownVariantTool { name }) if name == "bamcake"
        ));
        assert!(!out_dir.exists());
    }
}
