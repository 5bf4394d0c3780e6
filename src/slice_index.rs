//! Slice discovery and metadata-only indexing

use crate::checkpoint::Checkpoint;
use crate::config::DimensionPolicy;
use crate::dicom::{self, parser};
use crate::error::{ConvertError, ErrorEntry, Result};
use crate::types::Dimensions;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Header fields of one slice, fixed after indexing
#[derive(Debug, Clone, PartialEq)]
pub struct Slice {
    pub file_path: PathBuf,
    pub position: [f64; 3],
    /// `[row spacing, column spacing, slice thickness]`
    pub spacing: [f64; 3],
    pub rows: u32,
    pub columns: u32,
    /// Sort key, `position[2]`
    pub z_position: f64,
}

impl Slice {
    #[inline]
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.rows, self.columns)
    }

    /// Read a slice's header without decoding its pixel payload
    ///
    /// # Errors
    ///
    /// `UnparseableSlice` when the file cannot be read as DICOM or declares
    /// zero rows or columns
    pub fn from_file(file_path: &Path) -> Result<Self> {
        let unparseable = |reason: String| ConvertError::UnparseableSlice {
            path: file_path.to_path_buf(),
            reason,
        };

        let obj = dicom::open_dicom_header(file_path).map_err(|e| unparseable(e.to_string()))?;

        let dimensions = parser::extract_dimensions(&obj);
        if !dimensions.is_valid() {
            return Err(unparseable(format!("invalid image dimensions {dimensions}")));
        }

        let position = parser::extract_position(&obj);
        let [row_spacing, col_spacing] = parser::extract_pixel_spacing(&obj);
        let thickness = parser::extract_slice_thickness(&obj);

        Ok(Self {
            file_path: file_path.to_path_buf(),
            position,
            spacing: [row_spacing, col_spacing, thickness],
            rows: dimensions.rows,
            columns: dimensions.cols,
            z_position: position[2],
        })
    }
}

/// Depth-ordered slices plus everything that was dropped on the way
#[derive(Debug, Default)]
pub struct SliceIndex {
    pub slices: Vec<Slice>,
    pub skipped: Vec<ErrorEntry>,
}

/// Recursively collect `*.dcm` files (case-insensitive), in path order
pub fn discover_dicom_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable directory entry: {e}");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("dcm"))
        })
        .collect();

    files.sort();
    files
}

/// Stable ascending sort by `z_position`; ties keep input order
pub fn sort_slices(slices: &mut [Slice]) {
    slices.sort_by(|a, b| a.z_position.total_cmp(&b.z_position));
}

/// Index every candidate file and return the depth-ordered slice list
///
/// Files that fail to parse are skipped with a warning. Slices whose
/// dimensions differ from the first sorted slice are dropped or rejected per
/// `policy`.
///
/// # Errors
///
/// `NoSlicesFound` if nothing usable remains; `InconsistentDimensions` under
/// [`DimensionPolicy::Reject`]
pub fn index_slices(
    files: &[PathBuf],
    policy: DimensionPolicy,
    checkpoint: &Checkpoint,
) -> Result<SliceIndex> {
    info!("Indexing {} candidate files", files.len());

    let mut index = SliceIndex::default();
    for (i, path) in files.iter().enumerate() {
        checkpoint.tick(i);
        match Slice::from_file(path) {
            Ok(slice) => {
                debug!("Indexed {} at z={}", path.display(), slice.z_position);
                index.slices.push(slice);
            }
            Err(e) => {
                warn!("{e}");
                index
                    .skipped
                    .push(ErrorEntry::new("index", &e).with_file(path.display().to_string()));
            }
        }
    }

    sort_slices(&mut index.slices);
    enforce_dimensions(&mut index, policy)?;

    if index.slices.is_empty() {
        return Err(ConvertError::NoSlicesFound);
    }

    info!(
        "Indexed {} slices ({} skipped)",
        index.slices.len(),
        index.skipped.len()
    );
    Ok(index)
}

fn enforce_dimensions(index: &mut SliceIndex, policy: DimensionPolicy) -> Result<()> {
    let Some(expected) = index.slices.first().map(Slice::dimensions) else {
        return Ok(());
    };

    let mut kept = Vec::with_capacity(index.slices.len());
    for slice in index.slices.drain(..) {
        if slice.dimensions() == expected {
            kept.push(slice);
            continue;
        }

        let err = ConvertError::InconsistentDimensions {
            expected: expected.to_string(),
            found: slice.dimensions().to_string(),
            path: slice.file_path.clone(),
        };
        match policy {
            DimensionPolicy::Reject => return Err(err),
            DimensionPolicy::Skip => {
                warn!("{err}");
                index.skipped.push(
                    ErrorEntry::new("index", &err).with_file(slice.file_path.display().to_string()),
                );
            }
        }
    }

    index.slices = kept;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::Stage;
    use crate::dicom::testing::SliceFixture;
    use assert_matches::assert_matches;

    fn slice_at(name: &str, z: f64) -> Slice {
        Slice {
            file_path: PathBuf::from(name),
            position: [0.0, 0.0, z],
            spacing: [1.0, 1.0, 1.0],
            rows: 2,
            columns: 2,
            z_position: z,
        }
    }

    fn no_checkpoint() -> Checkpoint {
        Checkpoint::disabled(Stage::Indexing)
    }

    #[test]
    fn test_sort_is_stable_under_ties() {
        let mut slices = vec![
            slice_at("c", 2.0),
            slice_at("a", 1.0),
            slice_at("b1", 1.5),
            slice_at("b2", 1.5),
            slice_at("d", -3.0),
        ];
        sort_slices(&mut slices);

        let names: Vec<_> = slices.iter().map(|s| s.file_path.display().to_string()).collect();
        assert_eq!(names, ["d", "a", "b1", "b2", "c"]);

        let before = slices.clone();
        sort_slices(&mut slices);
        assert_eq!(slices, before);
    }

    #[test]
    fn test_discovery_is_recursive_and_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("series").join("deep");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("a.dcm"), b"").unwrap();
        std::fs::write(nested.join("b.DCM"), b"").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"").unwrap();
        std::fs::write(dir.path().join("a.dcm.jpg"), b"").unwrap();

        let files = discover_dicom_files(dir.path());
        assert_eq!(files.len(), 2);
        assert!(files.iter().any(|p| p.ends_with("series/deep/b.DCM")));
    }

    #[test]
    fn test_index_reads_header_fields() {
        let dir = tempfile::tempdir().unwrap();
        let mut fixture = SliceFixture::u16(3, 2, vec![0; 6]);
        fixture.position = Some([1.5, -2.0, 12.25]);
        fixture.pixel_spacing = Some([0.5, 0.75]);
        fixture.slice_thickness = Some(2.5);
        let path = fixture.write_to(&dir.path().join("one.dcm"));

        let slice = Slice::from_file(&path).unwrap();
        assert_eq!(slice.position, [1.5, -2.0, 12.25]);
        assert_eq!(slice.spacing, [0.5, 0.75, 2.5]);
        assert_eq!((slice.rows, slice.columns), (3, 2));
        assert_eq!(slice.z_position, 12.25);
    }

    #[test]
    fn test_index_sorts_and_skips_garbage() {
        let dir = tempfile::tempdir().unwrap();
        for (name, z) in [("s0.dcm", 5.0), ("s1.dcm", -1.0), ("s2.dcm", 2.0)] {
            SliceFixture::u16(2, 2, vec![1, 2, 3, 4])
                .at_z(z)
                .write_to(&dir.path().join(name));
        }
        std::fs::write(dir.path().join("broken.dcm"), b"definitely not dicom").unwrap();

        let files = discover_dicom_files(dir.path());
        let index = index_slices(&files, DimensionPolicy::Skip, &no_checkpoint()).unwrap();

        let zs: Vec<f64> = index.slices.iter().map(|s| s.z_position).collect();
        assert_eq!(zs, [-1.0, 2.0, 5.0]);
        assert_eq!(index.skipped.len(), 1);
        assert_eq!(index.skipped[0].converter, "index");
        assert!(index.skipped[0].file.as_deref().unwrap().ends_with("broken.dcm"));
    }

    #[test]
    fn test_no_slices_found() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.dcm"), b"nope").unwrap();
        let files = discover_dicom_files(dir.path());

        assert_matches!(
            index_slices(&files, DimensionPolicy::Skip, &no_checkpoint()),
            Err(ConvertError::NoSlicesFound)
        );
        assert_matches!(
            index_slices(&[], DimensionPolicy::Skip, &no_checkpoint()),
            Err(ConvertError::NoSlicesFound)
        );
    }

    #[test]
    fn test_mismatched_dimensions_policy() {
        let dir = tempfile::tempdir().unwrap();
        SliceFixture::u16(2, 2, vec![0; 4]).at_z(0.0).write_to(&dir.path().join("a.dcm"));
        SliceFixture::u16(2, 2, vec![0; 4]).at_z(1.0).write_to(&dir.path().join("b.dcm"));
        SliceFixture::u16(3, 2, vec![0; 6]).at_z(2.0).write_to(&dir.path().join("c.dcm"));
        let files = discover_dicom_files(dir.path());

        let index = index_slices(&files, DimensionPolicy::Skip, &no_checkpoint()).unwrap();
        assert_eq!(index.slices.len(), 2);
        assert_eq!(index.skipped.len(), 1);
        assert!(index.skipped[0].error.contains("expected 2x2, got 2x3"));

        let rejected = index_slices(&files, DimensionPolicy::Reject, &no_checkpoint());
        assert_matches!(rejected, Err(ConvertError::InconsistentDimensions { .. }));
        assert!(rejected.unwrap_err().is_fatal());
    }
}
