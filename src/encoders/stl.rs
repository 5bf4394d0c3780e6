//! Binary STL mesh of the volume's isosurface

use super::VolumeEncoder;
use super::isosurface::{Triangle, auto_iso_level, extract_isosurface};
use crate::checkpoint::Checkpoint;
use crate::config::WindowStrategy;
use crate::error::{ConvertError, Result};
use crate::volume::Volume;
use log::info;
use std::io::Write;

pub(super) const NAME: &str = "stl";

#[derive(Debug, Clone, Copy)]
pub struct StlEncoder {
    /// Fixed threshold; Otsu over the sampled slices when `None`
    iso_level: Option<f32>,
    sampling: WindowStrategy,
}

impl StlEncoder {
    #[must_use]
    pub fn new(iso_level: Option<f32>, sampling: WindowStrategy) -> Self {
        Self {
            iso_level,
            sampling,
        }
    }

    fn level(&self, volume: &Volume) -> Result<f32> {
        match self.iso_level {
            Some(level) => Ok(level),
            None => auto_iso_level(volume, self.sampling),
        }
    }
}

fn to_stl(triangle: &Triangle) -> stl_io::Triangle {
    stl_io::Triangle {
        normal: stl_io::Normal::new(triangle.normal),
        vertices: triangle.vertices.map(stl_io::Vertex::new),
    }
}

impl VolumeEncoder for StlEncoder {
    fn name(&self) -> &'static str {
        NAME
    }

    fn file_name(&self) -> &'static str {
        "model.stl"
    }

    fn encode(&self, volume: &Volume, writer: &mut dyn Write, checkpoint: &Checkpoint) -> Result<()> {
        let level = self.level(volume)?;
        let triangles = extract_isosurface(volume, level, checkpoint)?;
        if triangles.is_empty() {
            return Err(ConvertError::EmptyMesh(level));
        }

        info!("Writing {} triangles at iso level {level}", triangles.len());
        let mut sink = writer;
        stl_io::write_stl(&mut sink, triangles.iter().map(to_stl))?;
        Ok(())
    }
}
