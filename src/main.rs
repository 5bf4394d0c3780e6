use anyhow::{Context, Result};
use clap::Parser;
use dicom_volumize::cli::Args;
use dicom_volumize::{PipelineConfig, process_directory};
use log::info;

fn load_config(args: &Args) -> Result<PipelineConfig> {
    let base = match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            PipelineConfig::from_json(&json)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => PipelineConfig::default(),
    };
    Ok(args.apply(base))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let config = load_config(&args)?;

    let report = process_directory(&args.input, &config, None)
        .with_context(|| format!("converting {}", args.input.display()))?;

    info!(
        "Processed {} files, {} succeeded, {} failed",
        report.total_files, report.succeeded, report.failed
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
