//! Quality control: keep only line geometry files ahead of the merge.

use camino::Utf8PathBuf;
use log::{info, warn};

use crate::{GeometryDescription, GeometryEngine, GeometryError};

/// Result of the quality-control stage.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QcOutcome {
    /// Line files, in input order.
    pub kept: Vec<Utf8PathBuf>,
    /// Excluded files with the description that disqualified them.
    pub rejected: Vec<GeometryDescription>,
}

/// Select the candidates whose declared kind is a line.
///
/// The selection is order preserving and never grows the list. A candidate
/// that cannot be described aborts the stage.
///
/// # Examples
/// ```
/// use camino::{Utf8Path, Utf8PathBuf};
/// use hpms_core::{
///     GeometryDescription, GeometryEngine, GeometryError, GeometryKind, MergeReport,
///     MergeTarget, filter_line_geometries,
/// };
///
/// /// Treats `*_Sections.shp` files as lines and anything else as points.
/// struct ByName;
///
/// impl GeometryEngine for ByName {
///     fn describe(&self, path: &Utf8Path) -> Result<GeometryDescription, GeometryError> {
///         let kind = if path.as_str().ends_with("_Sections.shp") {
///             GeometryKind::Line
///         } else {
///             GeometryKind::Point
///         };
///         Ok(GeometryDescription {
///             path: path.to_path_buf(),
///             kind,
///             feature_count: 1,
///             invalid_features: 0,
///         })
///     }
///
///     fn merge(
///         &self,
///         _inputs: &[Utf8PathBuf],
///         _target: &MergeTarget,
///     ) -> Result<MergeReport, GeometryError> {
///         Err(GeometryError::NoInputs)
///     }
/// }
///
/// let candidates = vec![
///     Utf8PathBuf::from("Ohio_Sections.shp"),
///     Utf8PathBuf::from("Ohio_Points.shp"),
/// ];
/// let outcome = filter_line_geometries(&ByName, &candidates)?;
/// assert_eq!(outcome.kept, vec![Utf8PathBuf::from("Ohio_Sections.shp")]);
/// assert_eq!(outcome.rejected.len(), 1);
/// # Ok::<(), GeometryError>(())
/// ```
pub fn filter_line_geometries<E: GeometryEngine + ?Sized>(
    engine: &E,
    candidates: &[Utf8PathBuf],
) -> Result<QcOutcome, GeometryError> {
    info!("Pre-QC shapefile count: {}", candidates.len());
    let mut outcome = QcOutcome::default();
    for candidate in candidates {
        let description = engine.describe(candidate)?;
        if !description.kind.is_line() {
            warn!("{candidate} {}", description.kind);
            outcome.rejected.push(description);
            continue;
        }
        if description.invalid_features > 0 {
            warn!(
                "{candidate} has {} of {} features with invalid geometry",
                description.invalid_features, description.feature_count
            );
        }
        outcome.kept.push(candidate.clone());
    }
    info!("Post-QC shapefile count: {}", outcome.kept.len());
    Ok(outcome)
}
