//! Directory-to-artifacts orchestration
//!
//! Stages run strictly in order: index, assemble (with optional per-slice
//! renders), window, encode, MPR. The scratch volume has a single writer
//! during assembly and only sequential readers afterwards.

use crate::checkpoint::{Checkpoint, CheckpointHook, Stage};
use crate::config::PipelineConfig;
use crate::encoders::{VolumeArtifacts, encode_all, encoders_for};
use crate::error::{ErrorEntry, Result};
use crate::mpr::generate_mpr;
use crate::render::{ProcessedFile, SliceRenderer};
use crate::slice_index::{discover_dicom_files, index_slices};
use crate::volume::{SliceObserver, VolumeAssembler};
use crate::window::{WindowSpec, compute_window};
use log::{info, warn};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Everything a caller needs to present the result of one run
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingReport {
    pub processed_files: Vec<ProcessedFile>,
    pub volume: VolumeArtifacts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mpr_info: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<WindowSpec>,
    pub errors: Vec<ErrorEntry>,
    pub total_files: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl ProcessingReport {
    fn tally(&mut self) {
        let failed: HashSet<&str> = self
            .errors
            .iter()
            .filter_map(|e| e.file.as_deref())
            .collect();
        self.failed = failed.len();
        self.succeeded = self.total_files.saturating_sub(self.failed);
    }
}

struct Checkpoints {
    enabled: bool,
    hook: Option<CheckpointHook>,
}

impl Checkpoints {
    fn at(&self, stage: Stage, interval: usize) -> Checkpoint {
        Checkpoint::new(stage, interval, self.enabled, self.hook.clone())
    }
}

/// Convert every `.dcm` file under `input_dir` into volume, mesh and image
/// artifacts
///
/// Per-slice and per-writer failures are collected in the report; only
/// failures that leave nothing to convert abort the run.
///
/// # Errors
///
/// `NoSlicesFound`, `InconsistentDimensions` under the reject policy, or an
/// I/O failure of the output directory or scratch store
pub fn process_directory(
    input_dir: &Path,
    config: &PipelineConfig,
    hook: Option<CheckpointHook>,
) -> Result<ProcessingReport> {
    let output_dir = config.output_dir.as_deref().unwrap_or(input_dir);
    fs::create_dir_all(output_dir)?;
    let checkpoints = Checkpoints {
        enabled: config.enable_memory_hints,
        hook,
    };
    let intervals = config.checkpoints;

    let files = discover_dicom_files(input_dir);
    info!("Found {} DICOM files in {}", files.len(), input_dir.display());
    let mut report = ProcessingReport {
        total_files: files.len(),
        ..ProcessingReport::default()
    };

    let index = index_slices(
        &files,
        config.dimension_policy,
        &checkpoints.at(Stage::Indexing, intervals.indexing_every),
    )?;
    report.errors.extend(index.skipped);

    let assembler = VolumeAssembler::new(
        config.scratch.clone(),
        checkpoints.at(Stage::Assembly, intervals.assembly_every),
    );
    let mut renderer = config
        .render_slices
        .then(|| SliceRenderer::new(config.slice_jpeg_quality));
    let assembly = assembler.assemble(
        &index.slices,
        renderer.as_mut().map(|r| r as &mut dyn SliceObserver),
    )?;
    report.errors.extend(assembly.errors);
    if let Some(renderer) = renderer {
        let (processed, errors) = renderer.into_parts();
        report.processed_files = processed;
        report.errors.extend(errors);
    }
    let volume = assembly.volume;

    let window = compute_window(&volume, config.window)?;
    info!("Display window {window}");
    report.window = Some(window);

    let encoders = encoders_for(&config.formats, config.iso_level, config.window);
    let (artifacts, errors) = encode_all(
        &volume,
        output_dir,
        &encoders,
        &checkpoints.at(Stage::Encoding("volume"), intervals.encoder_every),
    );
    report.volume = artifacts;
    report.errors.extend(errors);

    if config.generate_mpr {
        let checkpoint = checkpoints.at(Stage::MprAxial, intervals.mpr_every);
        match generate_mpr(&volume, &window, output_dir, config.mpr_jpeg_quality, &checkpoint) {
            Ok(output) => report.mpr_info = Some(output.info_path),
            Err(e) => {
                warn!("MPR generation failed: {e}");
                report.errors.push(ErrorEntry::new("mpr", &e));
            }
        }
    }

    drop(volume);
    report.tally();
    info!(
        "Processed {} files: {} succeeded, {} failed, {} volume files",
        report.total_files,
        report.succeeded,
        report.failed,
        report.volume.count()
    );
    Ok(report)
}
