//! Multi-planar reconstruction
//!
//! One forward pass over the axial slices writes every axial image and
//! scatters the windowed bytes into a sagittal and a coronal buffer. The
//! other two planes are rendered from those buffers afterwards, so all three
//! views share exactly the same windowed values.

use crate::checkpoint::{Checkpoint, Stage};
use crate::error::{ConvertError, Result};
use crate::image::{bump_map, write_jpeg};
use crate::types::VolumeDimensions;
use crate::volume::Volume;
use crate::window::WindowSpec;
use image::GrayImage;
use log::{debug, info};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const MPR_DIR: &str = "mpr";
pub const MANIFEST_NAME: &str = "mpr_info.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Axial,
    Sagittal,
    Coronal,
}

impl Axis {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Axial => "axial",
            Self::Sagittal => "sagittal",
            Self::Coronal => "coronal",
        }
    }

    fn stage(self) -> Stage {
        match self {
            Self::Axial => Stage::MprAxial,
            Self::Sagittal => Stage::MprSagittal,
            Self::Coronal => Stage::MprCoronal,
        }
    }

    /// Image count and size along this axis
    #[must_use]
    pub fn plane(self, dims: VolumeDimensions) -> PlaneInfo {
        let (count, width, height) = match self {
            Self::Axial => (dims.depth, dims.columns, dims.rows),
            Self::Sagittal => (dims.columns, dims.depth, dims.rows),
            Self::Coronal => (dims.rows, dims.columns, dims.depth),
        };
        PlaneInfo {
            count,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlaneInfo {
    pub count: usize,
    pub width: usize,
    pub height: usize,
}

/// Contents of `mpr_info.json`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MprInfo {
    pub axial: PlaneInfo,
    pub sagittal: PlaneInfo,
    pub coronal: PlaneInfo,
    pub spacing: [f64; 3],
    pub window_center: i64,
    pub window_width: i64,
}

impl MprInfo {
    #[must_use]
    pub fn new(volume: &Volume, window: &WindowSpec) -> Self {
        let dims = volume.dimensions();
        Self {
            axial: Axis::Axial.plane(dims),
            sagittal: Axis::Sagittal.plane(dims),
            coronal: Axis::Coronal.plane(dims),
            spacing: volume.geometry().spacing,
            window_center: round_half_up(window.center),
            window_width: round_half_up(window.width),
        }
    }

    /// Greyscale + bump pairs written across all three axes
    #[must_use]
    pub fn image_pairs(&self) -> usize {
        self.axial.count + self.sagittal.count + self.coronal.count
    }
}

/// Halves round toward positive infinity, so `-512.5` becomes `-512`
fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

#[derive(Debug, Clone)]
pub struct MprOutput {
    pub info: MprInfo,
    pub info_path: PathBuf,
}

/// Windowed bytes regrouped per sagittal column and per coronal row
#[derive(Debug)]
pub struct ScatterBuffers {
    dims: VolumeDimensions,
    sagittal: Vec<u8>,
    coronal: Vec<u8>,
}

impl ScatterBuffers {
    #[must_use]
    pub fn new(dims: VolumeDimensions) -> Self {
        let len = dims.voxel_count();
        Self {
            dims,
            sagittal: vec![0; len],
            coronal: vec![0; len],
        }
    }

    /// Scatter windowed axial slice `z` into both buffers
    pub fn scatter(&mut self, z: usize, windowed: &[u8]) {
        let VolumeDimensions {
            rows,
            columns,
            depth,
        } = self.dims;
        for y in 0..rows {
            let row = &windowed[y * columns..(y + 1) * columns];
            for (x, &value) in row.iter().enumerate() {
                self.sagittal[x * (depth * rows) + z * rows + y] = value;
                self.coronal[y * (columns * depth) + z * columns + x] = value;
            }
        }
    }

    /// Sagittal image for column `x`, `depth` wide and `rows` high
    #[must_use]
    pub fn sagittal_image(&self, x: usize) -> Vec<u8> {
        let VolumeDimensions { rows, depth, .. } = self.dims;
        let slab = &self.sagittal[x * depth * rows..(x + 1) * depth * rows];
        // Slab is column-major in (z, y); images are row-major
        let mut pixels = vec![0; depth * rows];
        for z in 0..depth {
            for y in 0..rows {
                pixels[y * depth + z] = slab[z * rows + y];
            }
        }
        pixels
    }

    /// Coronal image for row `y`, `columns` wide and `depth` high
    #[must_use]
    pub fn coronal_image(&self, y: usize) -> &[u8] {
        let VolumeDimensions { columns, depth, .. } = self.dims;
        &self.coronal[y * columns * depth..(y + 1) * columns * depth]
    }
}

/// Window every axial slice once and scatter it into the other two planes
///
/// `on_axial` receives each windowed slice after it has been scattered.
///
/// # Errors
///
/// Scratch read failures and whatever `on_axial` returns
pub fn axial_pass(
    volume: &Volume,
    window: &WindowSpec,
    mut on_axial: impl FnMut(usize, Vec<u8>) -> Result<()>,
) -> Result<ScatterBuffers> {
    let dims = volume.dimensions();
    let mut buffers = ScatterBuffers::new(dims);
    let mut slice = vec![0.0f32; dims.slice_len()];
    for z in 0..dims.depth {
        volume.read_slice_into(z, &mut slice)?;
        let mut windowed = vec![0u8; dims.slice_len()];
        window.apply_slice(&slice, &mut windowed);
        buffers.scatter(z, &windowed);
        on_axial(z, windowed)?;
    }
    Ok(buffers)
}

fn gray_image(plane: PlaneInfo, pixels: Vec<u8>) -> Result<GrayImage> {
    let too_large = || ConvertError::VolumeTooLarge {
        format: "mpr",
        reason: format!("{}x{} image", plane.width, plane.height),
    };
    let width = u32::try_from(plane.width).map_err(|_| too_large())?;
    let height = u32::try_from(plane.height).map_err(|_| too_large())?;
    GrayImage::from_raw(width, height, pixels).ok_or_else(too_large)
}

struct PlaneWriter {
    axis: Axis,
    plane: PlaneInfo,
    image_dir: PathBuf,
    bump_dir: PathBuf,
    quality: u8,
    checkpoint: Checkpoint,
}

impl PlaneWriter {
    fn create(
        axis: Axis,
        dims: VolumeDimensions,
        mpr_dir: &Path,
        quality: u8,
        checkpoint: &Checkpoint,
    ) -> Result<Self> {
        let image_dir = mpr_dir.join(axis.name());
        let bump_dir = mpr_dir.join(format!("{}_bump", axis.name()));
        fs::create_dir_all(&image_dir)?;
        fs::create_dir_all(&bump_dir)?;
        Ok(Self {
            axis,
            plane: axis.plane(dims),
            image_dir,
            bump_dir,
            quality,
            checkpoint: checkpoint.for_stage(axis.stage(), checkpoint.interval()),
        })
    }

    fn write(&self, index: usize, pixels: Vec<u8>) -> Result<()> {
        let gray = gray_image(self.plane, pixels)?;
        let name = format!("{}_{index:03}", self.axis.name());
        write_jpeg(&gray, &self.image_dir.join(format!("{name}.jpg")), self.quality)?;
        write_jpeg(
            &bump_map(&gray),
            &self.bump_dir.join(format!("{name}_bump.jpg")),
            self.quality,
        )?;
        self.checkpoint.tick(index);
        Ok(())
    }

    fn finish(&self) {
        self.checkpoint.mark(&format!("mpr-{}-done", self.axis.name()));
        debug!("Wrote {} {} images", self.plane.count, self.axis.name());
    }
}

/// Write axial, sagittal and coronal images plus bump maps under
/// `<output_dir>/mpr`, then the `mpr_info.json` manifest
///
/// # Errors
///
/// Any scratch read, directory, JPEG or manifest failure aborts MPR
pub fn generate_mpr(
    volume: &Volume,
    window: &WindowSpec,
    output_dir: &Path,
    quality: u8,
    checkpoint: &Checkpoint,
) -> Result<MprOutput> {
    let dims = volume.dimensions();
    let mpr_dir = output_dir.join(MPR_DIR);
    info!(
        "Generating MPR for {}x{}x{} volume with window {window}",
        dims.columns, dims.rows, dims.depth
    );

    let axial = PlaneWriter::create(Axis::Axial, dims, &mpr_dir, quality, checkpoint)?;
    let sagittal = PlaneWriter::create(Axis::Sagittal, dims, &mpr_dir, quality, checkpoint)?;
    let coronal = PlaneWriter::create(Axis::Coronal, dims, &mpr_dir, quality, checkpoint)?;

    let buffers = axial_pass(volume, window, |z, windowed| axial.write(z, windowed))?;
    axial.finish();

    for x in 0..dims.columns {
        sagittal.write(x, buffers.sagittal_image(x))?;
    }
    sagittal.finish();

    for y in 0..dims.rows {
        coronal.write(y, buffers.coronal_image(y).to_vec())?;
    }
    coronal.finish();

    let info = MprInfo::new(volume, window);
    let info_path = mpr_dir.join(MANIFEST_NAME);
    fs::write(&info_path, serde_json::to_string_pretty(&info)?)?;
    info!("Wrote {} MPR image pairs", info.image_pairs());

    Ok(MprOutput { info, info_path })
}
