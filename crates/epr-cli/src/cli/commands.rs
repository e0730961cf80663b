use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use epr_core::{EndlElectronTable, GeneratorConfig, PhotoatomicTable, StandardGenerator};

use super::CliError;

/// One JSON document carrying the full generation request: the
/// configuration plus both extracted input tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(super) struct GenerationRequest {
    pub config: GeneratorConfig,
    pub photoatomic: PhotoatomicTable,
    pub endl: EndlElectronTable,
}

#[derive(clap::Args)]
pub(super) struct GenerateArgs {
    /// Generation request JSON (config + extracted tables)
    #[arg(long)]
    input: PathBuf,

    /// Output path for the generated container JSON
    #[arg(long)]
    output: PathBuf,

    /// Pretty-print the output container
    #[arg(long)]
    pretty: bool,
}

pub(super) fn run_generate_command(args: GenerateArgs) -> Result<i32, CliError> {
    let request_text = fs::read_to_string(&args.input)
        .with_context(|| format!("reading generation request {}", args.input.display()))?;
    let request: GenerationRequest = serde_json::from_str(&request_text)
        .with_context(|| format!("parsing generation request {}", args.input.display()))?;

    let generator =
        StandardGenerator::new(request.config, request.photoatomic, request.endl)?;
    let container = generator.generate()?;

    let serialized = if args.pretty {
        serde_json::to_string_pretty(&container)
    } else {
        serde_json::to_string(&container)
    }
    .context("serializing generated container")?;
    fs::write(&args.output, serialized)
        .with_context(|| format!("writing container {}", args.output.display()))?;

    tracing::info!(output = %args.output.display(), "container written");
    Ok(0)
}
