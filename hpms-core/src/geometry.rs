//! Geometry engine seam used by the quality-control and merge stages.

use std::{error::Error as StdError, fmt};

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

/// Error type carried across the engine boundary.
pub type BoxedError = Box<dyn StdError + Send + Sync>;

/// Geometric category declared by a geometry file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    /// No geometry.
    Null,
    /// Single points.
    Point,
    /// Polylines, including their Z and M variants.
    Line,
    /// Polygons.
    Polygon,
    /// Point collections.
    MultiPoint,
    /// Multipatch surfaces.
    MultiPatch,
}

impl GeometryKind {
    /// Whether files of this kind take part in the merge.
    pub const fn is_line(self) -> bool {
        matches!(self, Self::Line)
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Null => "Null",
            Self::Point => "Point",
            Self::Line => "Polyline",
            Self::Polygon => "Polygon",
            Self::MultiPoint => "Multipoint",
            Self::MultiPatch => "MultiPatch",
        };
        f.write_str(label)
    }
}

/// Introspection result for one geometry file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeometryDescription {
    /// File that was described.
    pub path: Utf8PathBuf,
    /// Declared geometric category.
    pub kind: GeometryKind,
    /// Number of features in the file.
    pub feature_count: usize,
    /// Features whose geometry is degenerate or carries non-finite coordinates.
    pub invalid_features: usize,
}

/// Where and how a merge writes its output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeTarget {
    /// Dataset file inside the data store.
    pub path: Utf8PathBuf,
    /// Layer name inside the dataset.
    pub layer: String,
    /// Replace an existing dataset instead of failing.
    pub overwrite: bool,
}

/// Summary of a completed merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    /// Dataset that was written.
    pub output_path: Utf8PathBuf,
    /// Layer holding the merged features.
    pub layer: String,
    /// Number of input files merged.
    pub input_count: usize,
    /// Number of features written.
    pub feature_count: usize,
    /// Attribute columns of the merged layer.
    pub fields: Vec<String>,
}

/// Errors reported by a [`GeometryEngine`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GeometryError {
    /// An input file could not be opened or decoded.
    #[error("failed to read geometry file {path:?}: {source}")]
    Read {
        /// File being read.
        path: Utf8PathBuf,
        /// Underlying engine error.
        #[source]
        source: BoxedError,
    },
    /// The merged dataset could not be written.
    #[error("failed to write merged dataset {path:?}: {source}")]
    Write {
        /// Dataset being written.
        path: Utf8PathBuf,
        /// Underlying engine error.
        #[source]
        source: BoxedError,
    },
    /// The merged dataset exists and overwriting is disabled.
    #[error("merged dataset {path:?} already exists (pass --overwrite)")]
    OutputExists {
        /// Existing dataset.
        path: Utf8PathBuf,
    },
    /// The merge received no inputs.
    #[error("no geometry files left to merge")]
    NoInputs,
}

impl GeometryError {
    /// Wrap an engine failure raised while reading `path`.
    pub fn read(path: &Utf8Path, source: impl Into<BoxedError>) -> Self {
        Self::Read {
            path: path.to_path_buf(),
            source: source.into(),
        }
    }

    /// Wrap an engine failure raised while writing `path`.
    pub fn write(path: &Utf8Path, source: impl Into<BoxedError>) -> Self {
        Self::Write {
            path: path.to_path_buf(),
            source: source.into(),
        }
    }
}

/// Reads geometry files and merges them into a single dataset.
///
/// # Examples
///
/// ```rust
/// use camino::{Utf8Path, Utf8PathBuf};
/// use hpms_core::{
///     GeometryDescription, GeometryEngine, GeometryError, GeometryKind, MergeReport,
///     MergeTarget,
/// };
///
/// struct Lines;
///
/// impl GeometryEngine for Lines {
///     fn describe(&self, path: &Utf8Path) -> Result<GeometryDescription, GeometryError> {
///         Ok(GeometryDescription {
///             path: path.to_path_buf(),
///             kind: GeometryKind::Line,
///             feature_count: 1,
///             invalid_features: 0,
///         })
///     }
///
///     fn merge(
///         &self,
///         inputs: &[Utf8PathBuf],
///         target: &MergeTarget,
///     ) -> Result<MergeReport, GeometryError> {
///         if inputs.is_empty() {
///             return Err(GeometryError::NoInputs);
///         }
///         Ok(MergeReport {
///             output_path: target.path.clone(),
///             layer: target.layer.clone(),
///             input_count: inputs.len(),
///             feature_count: inputs.len(),
///             fields: Vec::new(),
///         })
///     }
/// }
///
/// let description = Lines.describe(Utf8Path::new("ohio.shp"))?;
/// assert!(description.kind.is_line());
/// # Ok::<(), GeometryError>(())
/// ```
pub trait GeometryEngine {
    /// Report the declared kind, feature count and validity of `path`.
    fn describe(&self, path: &Utf8Path) -> Result<GeometryDescription, GeometryError>;

    /// Merge `inputs`, in order, into the dataset named by `target`.
    ///
    /// Implementations must return [`GeometryError::NoInputs`] for an empty
    /// input list and [`GeometryError::OutputExists`] when the target exists
    /// and `target.overwrite` is false.
    fn merge(
        &self,
        inputs: &[Utf8PathBuf],
        target: &MergeTarget,
    ) -> Result<MergeReport, GeometryError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io;

    #[rstest]
    #[case(GeometryKind::Line, true)]
    #[case(GeometryKind::Polygon, false)]
    #[case(GeometryKind::Point, false)]
    #[case(GeometryKind::Null, false)]
    fn only_lines_merge(#[case] kind: GeometryKind, #[case] expected: bool) {
        assert_eq!(kind.is_line(), expected);
    }

    #[rstest]
    fn kinds_display_with_esri_names() {
        assert_eq!(GeometryKind::Line.to_string(), "Polyline");
        assert_eq!(GeometryKind::MultiPoint.to_string(), "Multipoint");
    }

    #[rstest]
    fn read_errors_keep_their_source() {
        let err = GeometryError::read(
            Utf8Path::new("ohio.shp"),
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.to_string().contains("ohio.shp"));
        assert!(err.source().is_some());
    }
}
