//! In-memory [`GeometryEngine`] used by unit and behaviour tests.

use std::{cell::RefCell, collections::HashMap, io};

use camino::{Utf8Path, Utf8PathBuf};

use crate::{
    GeometryDescription, GeometryEngine, GeometryError, GeometryKind, MergeReport, MergeTarget,
};

/// Engine answering from a fixed table of files and recording merges.
///
/// Unknown paths fail to describe with a `NotFound` read error.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    files: HashMap<Utf8PathBuf, (GeometryKind, usize)>,
    invalid: HashMap<Utf8PathBuf, usize>,
    merges: RefCell<Vec<Vec<Utf8PathBuf>>>,
}

impl MemoryEngine {
    /// Create an engine that knows no files.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file of `kind` holding `features` features.
    #[must_use]
    pub fn with_file(
        mut self,
        path: impl Into<Utf8PathBuf>,
        kind: GeometryKind,
        features: usize,
    ) -> Self {
        self.files.insert(path.into(), (kind, features));
        self
    }

    /// Report `count` of the features in `path` as having invalid geometry.
    #[must_use]
    pub fn with_invalid(mut self, path: impl Into<Utf8PathBuf>, count: usize) -> Self {
        self.invalid.insert(path.into(), count);
        self
    }

    /// Input lists passed to every merge so far.
    pub fn merged_inputs(&self) -> Vec<Vec<Utf8PathBuf>> {
        self.merges.borrow().clone()
    }
}

impl GeometryEngine for MemoryEngine {
    fn describe(&self, path: &Utf8Path) -> Result<GeometryDescription, GeometryError> {
        let (kind, feature_count) = self.files.get(path).copied().ok_or_else(|| {
            GeometryError::read(
                path,
                io::Error::new(io::ErrorKind::NotFound, "unknown geometry file"),
            )
        })?;
        Ok(GeometryDescription {
            path: path.to_path_buf(),
            kind,
            feature_count,
            invalid_features: self.invalid.get(path).copied().unwrap_or_default(),
        })
    }

    fn merge(
        &self,
        inputs: &[Utf8PathBuf],
        target: &MergeTarget,
    ) -> Result<MergeReport, GeometryError> {
        if inputs.is_empty() {
            return Err(GeometryError::NoInputs);
        }
        let feature_count = inputs
            .iter()
            .map(|path| self.describe(path).map(|entry| entry.feature_count))
            .sum::<Result<usize, _>>()?;
        self.merges.borrow_mut().push(inputs.to_vec());
        Ok(MergeReport {
            output_path: target.path.clone(),
            layer: target.layer.clone(),
            input_count: inputs.len(),
            feature_count,
            fields: Vec::new(),
        })
    }
}
