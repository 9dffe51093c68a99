//! Field-access paths into a scan's output row.

use std::fmt;

use snafu::ensure;

use crate::{Result, StepAfterDynamicSnafu};

/// One step of a [`FieldPath`].
///
/// Constant array indices and map keys keep the path specializable in
/// principle, while dynamic (non-constant) indices/keys seal the path: once
/// the index is unknown the whole container is needed and nothing narrower
/// can be requested past that point.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathStep {
    /// A named field of a row type, addressed by position.
    Field(usize),
    /// An array element at a constant index.
    ArrayIndex(i64),
    /// An array element at an index only known at runtime.
    ArrayAny,
    /// A map entry at a constant key.
    MapKey(String),
    /// A map entry at a key only known at runtime.
    MapAny,
}

impl PathStep {
    /// Whether this step ends path specialization.
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::ArrayAny | Self::MapAny)
    }
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(index) => write!(f, ".{index}"),
            Self::ArrayIndex(index) => write!(f, "[{index}]"),
            Self::MapKey(key) => write!(f, "['{key}']"),
            Self::ArrayAny | Self::MapAny => write!(f, "[*]"),
        }
    }
}

/// An ordered field-access chain from the root row of a scan.
///
/// The first step is always [`PathStep::Field`] (the root is a row type).
/// Invariant: no step follows a dynamic array/map step; [`FieldPath::push`]
/// rejects such extensions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    steps: Vec<PathStep>,
}

impl FieldPath {
    /// Path consisting of a single top-level field reference.
    pub fn root(index: usize) -> Self {
        Self {
            steps: vec![PathStep::Field(index)],
        }
    }

    /// Path descending through the given top-level and nested field
    /// positions. Convenient for mandatory-retain declarations and tests.
    pub fn fields(indices: impl IntoIterator<Item = usize>) -> Self {
        let steps: Vec<_> = indices.into_iter().map(PathStep::Field).collect();
        assert!(!steps.is_empty(), "field paths are never empty");
        Self { steps }
    }

    /// Append a step, rejecting extension past a dynamic index/key.
    pub fn push(&mut self, step: PathStep) -> Result<()> {
        ensure!(
            !self.is_sealed(),
            StepAfterDynamicSnafu {
                path: self.to_string(),
            }
        );
        self.steps.push(step);
        Ok(())
    }

    /// Whether the path ends in a dynamic step and cannot be extended.
    pub fn is_sealed(&self) -> bool {
        self.steps.last().is_some_and(PathStep::is_dynamic)
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    /// The leading run of row-field positions, up to the first container
    /// access. This prefix is what the path trie (and therefore schema
    /// reduction) operates on.
    pub fn field_prefix(&self) -> impl Iterator<Item = usize> + '_ {
        self.steps.iter().map_while(|step| match step {
            PathStep::Field(index) => Some(*index),
            _ => None,
        })
    }

    /// Whether the path contains any array/map access.
    pub fn enters_container(&self) -> bool {
        self.steps
            .iter()
            .any(|step| !matches!(step, PathStep::Field(_)))
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            match (i, step) {
                // no leading dot on the root field
                (0, PathStep::Field(index)) => write!(f, "{index}")?,
                _ => write!(f, "{step}")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use crate::Error;

    use super::*;

    #[test]
    fn display() {
        let mut path = FieldPath::fields([2, 0]);
        path.push(PathStep::ArrayIndex(3)).unwrap();
        path.push(PathStep::Field(1)).unwrap();
        assert_eq!(path.to_string(), "2.0[3].1");

        let mut path = FieldPath::root(0);
        path.push(PathStep::MapKey("item".to_string())).unwrap();
        assert_eq!(path.to_string(), "0['item']");
    }

    #[test]
    fn dynamic_step_seals_path() {
        let mut path = FieldPath::root(1);
        path.push(PathStep::ArrayAny).unwrap();
        assert!(path.is_sealed());

        let err = path.push(PathStep::Field(0)).unwrap_err();
        assert_matches!(err, Error::StepAfterDynamic { .. });
        assert_eq!(path.steps().len(), 2);
    }

    #[test]
    fn field_prefix_stops_at_container() {
        let mut path = FieldPath::fields([4, 1]);
        path.push(PathStep::MapAny).unwrap();
        assert_eq!(path.field_prefix().collect::<Vec<_>>(), vec![4, 1]);
        assert!(path.enters_container());

        let plain = FieldPath::fields([0, 2, 1]);
        assert_eq!(plain.field_prefix().collect::<Vec<_>>(), vec![0, 2, 1]);
        assert!(!plain.enters_container());
    }
}
