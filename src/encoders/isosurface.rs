//! Streaming isosurface extraction
//!
//! Marching tetrahedra over pairs of adjacent slices: only two slices are
//! resident at any time, so the mesh can be built from a disk-backed volume.
//! Each voxel cube is split into six tetrahedra sharing the 0-6 diagonal,
//! which avoids the ambiguous cases of marching cubes.

use crate::checkpoint::Checkpoint;
use crate::config::WindowStrategy;
use crate::error::Result;
use crate::volume::Volume;
use crate::window::{ValueRange, indices_for};
use log::debug;

const HISTOGRAM_BINS: usize = 256;

/// Corner offsets `(dx, dy, dz)` of a voxel cube
const CORNERS: [[usize; 3]; 8] = [
    [0, 0, 0],
    [1, 0, 0],
    [1, 1, 0],
    [0, 1, 0],
    [0, 0, 1],
    [1, 0, 1],
    [1, 1, 1],
    [0, 1, 1],
];

const TETRAHEDRA: [[usize; 4]; 6] = [
    [0, 5, 1, 6],
    [0, 1, 2, 6],
    [0, 2, 3, 6],
    [0, 3, 7, 6],
    [0, 7, 4, 6],
    [0, 4, 5, 6],
];

type Vec3 = [f32; 3];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// Unit normal pointing out of the region at or above the level
    pub normal: Vec3,
    pub vertices: [Vec3; 3],
}

#[inline(always)]
fn sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline(always)]
fn cross(a: Vec3, b: Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

#[inline(always)]
fn dot(a: Vec3, b: Vec3) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn centroid(points: &[Vec3]) -> Vec3 {
    let n = points.len() as f32;
    let sum = points.iter().fold([0.0; 3], |acc, p| [acc[0] + p[0], acc[1] + p[1], acc[2] + p[2]]);
    [sum[0] / n, sum[1] / n, sum[2] / n]
}

fn interpolate(level: f32, (p1, v1): (Vec3, f32), (p2, v2): (Vec3, f32)) -> Vec3 {
    let delta = v2 - v1;
    let t = if delta.abs() < f32::EPSILON {
        0.5
    } else {
        ((level - v1) / delta).clamp(0.0, 1.0)
    };
    [
        p1[0] + t * (p2[0] - p1[0]),
        p1[1] + t * (p2[1] - p1[1]),
        p1[2] + t * (p2[2] - p1[2]),
    ]
}

/// Orient against the inside-to-outside direction and drop degenerate faces
fn push_oriented(out: &mut Vec<Triangle>, mut vertices: [Vec3; 3], outward: Vec3) {
    let mut normal = cross(sub(vertices[1], vertices[0]), sub(vertices[2], vertices[0]));
    let len = dot(normal, normal).sqrt();
    if len <= f32::EPSILON {
        return;
    }
    normal = normal.map(|c| c / len);
    if dot(normal, outward) < 0.0 {
        vertices.swap(1, 2);
        normal = normal.map(|c| -c);
    }
    out.push(Triangle { normal, vertices });
}

fn polygonise_tetrahedron(out: &mut Vec<Triangle>, level: f32, corners: [(Vec3, f32); 4]) {
    let (inside, outside): (Vec<_>, Vec<_>) = corners.iter().copied().partition(|&(_, v)| v >= level);
    if inside.is_empty() || outside.is_empty() {
        return;
    }

    let points = |group: &[(Vec3, f32)]| group.iter().map(|&(p, _)| p).collect::<Vec<_>>();
    let outward = sub(centroid(&points(&outside)), centroid(&points(&inside)));

    match (inside.as_slice(), outside.as_slice()) {
        ([lone], others) | (others, [lone]) if others.len() == 3 => {
            let vertices = [
                interpolate(level, *lone, others[0]),
                interpolate(level, *lone, others[1]),
                interpolate(level, *lone, others[2]),
            ];
            push_oriented(out, vertices, outward);
        }
        ([a, b], [c, d]) => {
            // The section is the quad a-c, a-d, b-d, b-c
            let ac = interpolate(level, *a, *c);
            let ad = interpolate(level, *a, *d);
            let bd = interpolate(level, *b, *d);
            let bc = interpolate(level, *b, *c);
            push_oriented(out, [ac, ad, bd], outward);
            push_oriented(out, [ac, bd, bc], outward);
        }
        _ => {}
    }
}

/// Extract the surface where the volume crosses `level`, in world coordinates
///
/// # Errors
///
/// Fails only if the scratch store cannot be read
pub fn extract_isosurface(volume: &Volume, level: f32, checkpoint: &Checkpoint) -> Result<Vec<Triangle>> {
    let geometry = volume.geometry();
    let dims = geometry.dimensions;
    let mut triangles = Vec::new();
    if dims.depth < 2 || dims.rows < 2 || dims.columns < 2 {
        return Ok(triangles);
    }

    let spacing = geometry.spacing.map(|v| v as f32);
    let origin = geometry.origin.map(|v| v as f32);
    let position = |x: usize, y: usize, z: usize| -> Vec3 {
        [
            origin[0] + x as f32 * spacing[0],
            origin[1] + y as f32 * spacing[1],
            origin[2] + z as f32 * spacing[2],
        ]
    };

    let mut lower = volume.read_slice(0)?;
    let mut upper = vec![0.0f32; dims.slice_len()];

    for z in 0..dims.depth - 1 {
        volume.read_slice_into(z + 1, &mut upper)?;

        for y in 0..dims.rows - 1 {
            for x in 0..dims.columns - 1 {
                let cube: [(Vec3, f32); 8] = CORNERS.map(|[dx, dy, dz]| {
                    let slice = if dz == 0 { &lower } else { &upper };
                    let value = slice[(y + dy) * dims.columns + x + dx];
                    (position(x + dx, y + dy, z + dz), value)
                });

                let all_inside = cube.iter().all(|&(_, v)| v >= level);
                let all_outside = cube.iter().all(|&(_, v)| v < level);
                if all_inside || all_outside {
                    continue;
                }

                for tetrahedron in TETRAHEDRA {
                    polygonise_tetrahedron(&mut triangles, level, tetrahedron.map(|i| cube[i]));
                }
            }
        }

        std::mem::swap(&mut lower, &mut upper);
        checkpoint.tick(z);
    }

    debug!("Isosurface at {level}: {} triangles", triangles.len());
    Ok(triangles)
}

/// Value histogram over a known, non-degenerate range
struct Histogram {
    min: f64,
    scale: f64,
    bins: [u64; HISTOGRAM_BINS],
}

impl Histogram {
    fn new(range: &ValueRange) -> Option<Self> {
        if range.is_empty() || range.max <= range.min {
            return None;
        }
        Some(Self {
            min: range.min,
            scale: (HISTOGRAM_BINS - 1) as f64 / (range.max - range.min),
            bins: [0; HISTOGRAM_BINS],
        })
    }

    #[inline]
    fn add(&mut self, value: f32) {
        let bin = ((f64::from(value) - self.min) * self.scale) as usize;
        self.bins[bin.min(HISTOGRAM_BINS - 1)] += 1;
    }

    /// Bin maximizing the between-class variance; plateaus resolve to their middle
    fn best_bin(&self) -> usize {
        let total: f64 = self.bins.iter().map(|&c| c as f64).sum();
        let weighted: f64 = self
            .bins
            .iter()
            .enumerate()
            .map(|(i, &c)| i as f64 * c as f64)
            .sum();

        let (mut below_count, mut below_sum) = (0.0, 0.0);
        let mut best: Option<(f64, usize, usize)> = None;
        for (t, &count) in self.bins.iter().enumerate() {
            below_count += count as f64;
            below_sum += t as f64 * count as f64;
            let above_count = total - below_count;
            if below_count == 0.0 {
                continue;
            }
            if above_count == 0.0 {
                break;
            }

            let diff = below_sum / below_count - (weighted - below_sum) / above_count;
            let variance = below_count * above_count * diff * diff;
            best = match best {
                Some((v, first, _)) if (variance - v).abs() <= f64::EPSILON * v => {
                    Some((v, first, t))
                }
                Some((v, ..)) if variance < v => best,
                _ => Some((variance, t, t)),
            };
        }

        best.map_or(0, |(_, first, last)| (first + last) / 2)
    }

    fn threshold(&self) -> f32 {
        (self.min + self.best_bin() as f64 / self.scale) as f32
    }
}

/// Otsu threshold over a 256-bin histogram
///
/// Returns the minimum for constant input and 0 for empty input.
#[must_use]
pub fn otsu_threshold<I>(values: I) -> f32
where
    I: IntoIterator<Item = f32>,
    I::IntoIter: Clone,
{
    let values = values.into_iter();
    let range = ValueRange::from_values(values.clone().map(f64::from));
    let Some(mut histogram) = Histogram::new(&range) else {
        return range.min as f32;
    };
    values.for_each(|v| histogram.add(v));
    histogram.threshold()
}

/// Otsu threshold over the same slices the display window samples
///
/// Streams the slices twice, once for the range and once for the histogram,
/// keeping a single slice resident.
///
/// # Errors
///
/// Fails only if the scratch store cannot be read
pub fn auto_iso_level(volume: &Volume, strategy: WindowStrategy) -> Result<f32> {
    let indices = indices_for(strategy, volume.dimensions().depth);
    let mut buffer = vec![0.0f32; volume.dimensions().slice_len()];

    let mut range = ValueRange::default();
    for &z in &indices {
        volume.read_slice_into(z, &mut buffer)?;
        buffer.iter().for_each(|&v| range.include(f64::from(v)));
    }
    if range.is_empty() {
        return Ok(0.0);
    }
    let Some(mut histogram) = Histogram::new(&range) else {
        return Ok(range.min as f32);
    };

    for &z in &indices {
        volume.read_slice_into(z, &mut buffer)?;
        buffer.iter().for_each(|&v| histogram.add(v));
    }
    let level = histogram.threshold();
    debug!("Otsu level {level} over {} slices", indices.len());
    Ok(level)
}
