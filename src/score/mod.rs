//! Score wrappers
//!
//! Each score gives a handful of [`Matrix2D`]s, keyed by [`ScoreType`], a decoded meaning:
//!
//! | score                   | matrices                       | value            |
//! |-------------------------|--------------------------------|------------------|
//! | [`AlleleDepth`]         | `DepthA` .. `DepthInsertion`   | `u32` read depth |
//! | [`AlleleProbability`]   | `ProbA` .. `ProbInsertion`     | `f32` in `[0,1]` |
//! | [`Dosage`]              | `Dosage`                       | raw byte         |
//! | [`ReferenceProbability`]| `ReferenceProbability`         | `f32` in `[0,1]` |
//! | [`ImputeProbability`]   | `ImputedProbability`           | `f32` in `[0,1]` |
//!
//! Scores are built with their matching builder, in memory or straight into a
//! [`ScoreStore`], and can be narrowed with `filtered`, which borrows the score and wraps
//! every matrix in a [`FilterMatrix2D`].

mod depth;
mod probability;
mod single;

use std::{collections::BTreeMap, sync::Arc};

pub use depth::{AlleleDepth, AlleleDepthBuilder};
pub use probability::{AlleleProbability, AlleleProbabilityBuilder};
pub use single::{
    Dosage, DosageBuilder, ImputeProbability, ImputeProbabilityBuilder, ReferenceProbability,
    ReferenceProbabilityBuilder,
};

use crate::{
    Result, ScoreType,
    builder::{Byte2DBuilder, MatrixBuilder},
    error::{MissingDataError, UsageError},
    matrix::{FilterMatrix2D, Matrix2D, Translate},
    store::ScoreStore,
};

/// Matrices of one score, keyed by score type, all sharing one extent
pub struct ScoreMatrices<'a> {
    num_taxa: usize,
    num_sites: usize,
    matrices: BTreeMap<ScoreType, Box<dyn Matrix2D + 'a>>,
}
impl<'a> ScoreMatrices<'a> {
    /// Keys each matrix by its own score type.
    ///
    /// # Errors
    ///
    /// * [`UsageError::DimensionMismatch`] if the matrices disagree on their extent
    /// * [`UsageError::DuplicateScoreType`] if two matrices share a score type
    pub fn new<I>(matrices: I) -> Result<Self>
    where
        I: IntoIterator<Item = Box<dyn Matrix2D + 'a>>,
    {
        let mut map = BTreeMap::new();
        let mut extent = None;
        for matrix in matrices {
            let score_type = matrix.score_type();
            let (num_taxa, num_sites) = (matrix.num_taxa(), matrix.num_sites());
            match extent {
                None => extent = Some((num_taxa, num_sites)),
                Some((expected_taxa, expected_sites))
                    if (expected_taxa, expected_sites) != (num_taxa, num_sites) =>
                {
                    return Err(UsageError::DimensionMismatch {
                        score_type,
                        num_taxa,
                        num_sites,
                        expected_taxa,
                        expected_sites,
                    }
                    .into());
                }
                Some(_) => {}
            }
            if map.insert(score_type, matrix).is_some() {
                return Err(UsageError::DuplicateScoreType(score_type).into());
            }
        }
        let (num_taxa, num_sites) = extent.unwrap_or_default();
        Ok(Self {
            num_taxa,
            num_sites,
            matrices: map,
        })
    }

    #[must_use]
    pub fn num_taxa(&self) -> usize {
        self.num_taxa
    }

    #[must_use]
    pub fn num_sites(&self) -> usize {
        self.num_sites
    }

    pub fn score_types(&self) -> impl Iterator<Item = ScoreType> + '_ {
        self.matrices.keys().copied()
    }

    #[must_use]
    pub fn contains(&self, score_type: ScoreType) -> bool {
        self.matrices.contains_key(&score_type)
    }

    /// The matrix for `score_type`; `context` names the score in the error
    pub fn matrix(
        &self,
        score_type: ScoreType,
        context: &'static str,
    ) -> Result<&(dyn Matrix2D + 'a)> {
        self.matrices
            .get(&score_type)
            .map(|matrix| &**matrix)
            .ok_or_else(|| UsageError::UnsupportedScoreType { score_type, context }.into())
    }

    /// Fails with [`MissingDataError::ScoreType`] unless every type in `required` is present
    pub fn require(&self, required: &[ScoreType]) -> Result<()> {
        match required.iter().find(|score_type| !self.contains(**score_type)) {
            Some(&missing) => Err(MissingDataError::ScoreType(missing).into()),
            None => Ok(()),
        }
    }

    /// Wraps every matrix in a view through `translate`
    pub fn filtered(&self, translate: &Translate) -> Result<ScoreMatrices<'_>> {
        let mut views: Vec<Box<dyn Matrix2D + '_>> = Vec::with_capacity(self.matrices.len());
        for matrix in self.matrices.values() {
            views.push(Box::new(FilterMatrix2D::new(&**matrix, translate.clone())?));
        }
        ScoreMatrices::new(views)
    }
}

/// The per-type builders behind a score builder
pub(crate) struct ScoreBuilders {
    context: &'static str,
    /// Released by `build()`
    builders: Option<BTreeMap<ScoreType, Byte2DBuilder>>,
}
impl ScoreBuilders {
    pub(crate) fn for_memory(
        context: &'static str,
        score_types: &[ScoreType],
        num_taxa: usize,
        num_sites: usize,
    ) -> Self {
        let builders = score_types
            .iter()
            .map(|&score_type| {
                let builder = Byte2DBuilder::for_memory(num_taxa, num_sites, score_type);
                (score_type, builder)
            })
            .collect();
        Self {
            context,
            builders: Some(builders),
        }
    }

    pub(crate) fn for_disk(
        context: &'static str,
        score_types: &[ScoreType],
        store: &Arc<ScoreStore>,
        num_sites: usize,
    ) -> Result<Self> {
        let builders = score_types
            .iter()
            .map(|&score_type| {
                let builder = Byte2DBuilder::for_disk(Arc::clone(store), num_sites, score_type)?;
                Ok((score_type, builder))
            })
            .collect::<Result<_>>()?;
        Ok(Self {
            context,
            builders: Some(builders),
        })
    }

    pub(crate) fn get_mut(&mut self, score_type: ScoreType) -> Result<&mut Byte2DBuilder> {
        let builders = self.builders.as_mut().ok_or(UsageError::AlreadyBuilt)?;
        builders.get_mut(&score_type).ok_or_else(|| {
            UsageError::UnsupportedScoreType {
                score_type,
                context: self.context,
            }
            .into()
        })
    }

    pub(crate) fn build(&mut self) -> Result<ScoreMatrices<'static>> {
        let mut builders = self.builders.take().ok_or(UsageError::AlreadyBuilt)?;
        // disk-mode types may have seen different taxa; give them one extent
        let mut num_taxa = 0;
        for builder in builders.values() {
            num_taxa = num_taxa.max(builder.built_num_taxa()?);
        }
        let mut matrices = Vec::with_capacity(builders.len());
        for builder in builders.values_mut() {
            builder.reserve_taxa(num_taxa);
            matrices.push(builder.build()?);
        }
        ScoreMatrices::new(matrices)
    }
}

#[cfg(test)]
mod testing {
    use ndarray::Array2;

    use super::*;
    use crate::{Error, matrix::MemoryMatrix2D};

    fn matrix(score_type: ScoreType, num_taxa: usize, num_sites: usize) -> Box<dyn Matrix2D> {
        let data = Array2::from_shape_fn((num_taxa, num_sites), |(t, s)| (t + s) as u8);
        Box::new(MemoryMatrix2D::new(score_type, data))
    }

    #[test]
    fn test_dimension_mismatch() {
        let result = ScoreMatrices::new(vec![
            matrix(ScoreType::DepthA, 2, 3),
            matrix(ScoreType::DepthC, 2, 4),
        ]);
        assert!(matches!(
            result,
            Err(Error::UsageError(UsageError::DimensionMismatch {
                score_type: ScoreType::DepthC,
                ..
            }))
        ));
    }

    #[test]
    fn test_duplicate_score_type() {
        let result = ScoreMatrices::new(vec![
            matrix(ScoreType::DepthA, 2, 3),
            matrix(ScoreType::DepthA, 2, 3),
        ]);
        assert!(matches!(
            result,
            Err(Error::UsageError(UsageError::DuplicateScoreType(ScoreType::DepthA)))
        ));
    }

    #[test]
    fn test_lookup_and_require() -> Result<()> {
        let matrices = ScoreMatrices::new(vec![matrix(ScoreType::Dosage, 2, 3)])?;
        assert_eq!(matrices.num_taxa(), 2);
        assert_eq!(matrices.matrix(ScoreType::Dosage, "test")?.value(1, 2)?, 3);
        assert!(matches!(
            matrices.matrix(ScoreType::ProbA, "test"),
            Err(Error::UsageError(UsageError::UnsupportedScoreType { .. }))
        ));
        assert!(matrices.require(&[ScoreType::Dosage]).is_ok());
        assert!(matches!(
            matrices.require(&[ScoreType::Dosage, ScoreType::DepthT]),
            Err(error) if error.is_missing_data()
        ));
        Ok(())
    }

    #[test]
    fn test_filtered_shares_translation() -> Result<()> {
        let matrices = ScoreMatrices::new(vec![
            matrix(ScoreType::DepthA, 3, 4),
            matrix(ScoreType::DepthC, 3, 4),
        ])?;
        let view = matrices.filtered(&Translate::taxa_subset(vec![2], 4))?;
        assert_eq!(view.num_taxa(), 1);
        assert_eq!(view.num_sites(), 4);
        for score_type in [ScoreType::DepthA, ScoreType::DepthC] {
            assert_eq!(view.matrix(score_type, "test")?.value(0, 1)?, 3);
        }
        Ok(())
    }

    #[test]
    fn test_builders_single_use() -> Result<()> {
        let mut builders = ScoreBuilders::for_memory("test", &[ScoreType::Dosage], 1, 2);
        builders.get_mut(ScoreType::Dosage)?.set(0, 1, 5)?;
        assert!(builders.get_mut(ScoreType::ProbA).is_err());
        let matrices = builders.build()?;
        assert_eq!(matrices.matrix(ScoreType::Dosage, "test")?.value(0, 1)?, 5);
        assert!(matches!(
            builders.get_mut(ScoreType::Dosage),
            Err(Error::UsageError(UsageError::AlreadyBuilt))
        ));
        assert!(builders.build().is_err());
        Ok(())
    }
}
