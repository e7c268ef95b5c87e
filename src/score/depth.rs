use std::sync::Arc;

use super::{ScoreBuilders, ScoreMatrices};
use crate::{
    ALLELE_DEPTH_TYPES, NUM_NUCLEOTIDE_ALLELES, Result, ScoreType,
    builder::check_row,
    codec::{decode_depth, decode_depths, encode_depth, encode_depths},
    matrix::{AlleleSlice, Matrix2D, Matrix3D, Translate},
    store::ScoreStore,
};

const CONTEXT: &str = "allele depth";

/// Read depth per nucleotide allele: one matrix per `Depth*` score type
pub struct AlleleDepth<'a> {
    matrices: ScoreMatrices<'a>,
}
impl<'a> AlleleDepth<'a> {
    /// Wraps matrices covering every `Depth*` score type
    pub fn new(matrices: ScoreMatrices<'a>) -> Result<Self> {
        matrices.require(&ALLELE_DEPTH_TYPES)?;
        Ok(Self { matrices })
    }

    /// Splits a six-allele matrix into one depth matrix per allele plane, in
    /// [`ALLELE_DEPTH_TYPES`] order
    pub fn from_matrix3d<M: Matrix3D + 'a>(matrix: M) -> Result<Self> {
        check_row("alleles", NUM_NUCLEOTIDE_ALLELES, matrix.num_alleles())?;
        let base = Arc::new(matrix);
        let slices = ALLELE_DEPTH_TYPES
            .iter()
            .enumerate()
            .map(|(allele, &score_type)| -> Result<Box<dyn Matrix2D + 'a>> {
                Ok(Box::new(AlleleSlice::new(
                    Arc::clone(&base),
                    allele,
                    score_type,
                )?))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(ScoreMatrices::new(slices)?)
    }

    #[must_use]
    pub fn num_taxa(&self) -> usize {
        self.matrices.num_taxa()
    }

    #[must_use]
    pub fn num_sites(&self) -> usize {
        self.matrices.num_sites()
    }

    pub fn matrix(&self, score_type: ScoreType) -> Result<&(dyn Matrix2D + 'a)> {
        self.matrices.matrix(score_type, CONTEXT)
    }

    /// Encoded depth byte
    pub fn byte(&self, taxon: usize, site: usize, score_type: ScoreType) -> Result<u8> {
        self.matrix(score_type)?.value(taxon, site)
    }

    /// Decoded depth of one allele
    pub fn value(&self, taxon: usize, site: usize, score_type: ScoreType) -> Result<u32> {
        self.byte(taxon, site, score_type).map(decode_depth)
    }

    /// Decoded depths of every allele at one site, in [`ALLELE_DEPTH_TYPES`] order
    pub fn site_depths(&self, taxon: usize, site: usize) -> Result<[u32; NUM_NUCLEOTIDE_ALLELES]> {
        let mut depths = [0; NUM_NUCLEOTIDE_ALLELES];
        for (depth, &score_type) in depths.iter_mut().zip(ALLELE_DEPTH_TYPES.iter()) {
            *depth = self.value(taxon, site, score_type)?;
        }
        Ok(depths)
    }

    pub fn values_for_all_sites(&self, taxon: usize, score_type: ScoreType) -> Result<Vec<u32>> {
        let bytes = self.matrix(score_type)?.values_for_all_sites(taxon)?;
        Ok(decode_depths(&bytes))
    }

    /// A view of this score through `translate`
    pub fn filtered(&self, translate: &Translate) -> Result<AlleleDepth<'_>> {
        Ok(AlleleDepth {
            matrices: self.matrices.filtered(translate)?,
        })
    }
}

/// Builds an [`AlleleDepth`], in memory or into a store
pub struct AlleleDepthBuilder {
    builders: ScoreBuilders,
}
impl AlleleDepthBuilder {
    #[must_use]
    pub fn for_memory(num_taxa: usize, num_sites: usize) -> Self {
        Self {
            builders: ScoreBuilders::for_memory(CONTEXT, &ALLELE_DEPTH_TYPES, num_taxa, num_sites),
        }
    }

    pub fn for_disk(store: &Arc<ScoreStore>, num_sites: usize) -> Result<Self> {
        Ok(Self {
            builders: ScoreBuilders::for_disk(CONTEXT, &ALLELE_DEPTH_TYPES, store, num_sites)?,
        })
    }

    /// Memory mode only
    pub fn set_depth(
        &mut self,
        taxon: usize,
        site: usize,
        score_type: ScoreType,
        depth: u32,
    ) -> Result<()> {
        self.builders
            .get_mut(score_type)?
            .set(taxon, site, encode_depth(depth))
    }

    /// Memory mode only
    pub fn set_depth_range_for_taxon(
        &mut self,
        taxon: usize,
        site_offset: usize,
        score_type: ScoreType,
        depths: &[u32],
    ) -> Result<()> {
        self.builders.get_mut(score_type)?.set_range_for_taxon(
            taxon,
            site_offset,
            &encode_depths(depths),
        )
    }

    /// Adds the full row of one allele for `taxon`
    pub fn add_taxon(&mut self, taxon: usize, depths: &[u32], score_type: ScoreType) -> Result<()> {
        self.builders
            .get_mut(score_type)?
            .add_taxon(taxon, &encode_depths(depths))
    }

    /// Adds the rows of all six alleles for `taxon`, in [`ALLELE_DEPTH_TYPES`] order.
    ///
    /// Every row is checked before the first one is written.
    pub fn add_taxon_alleles<V: AsRef<[u32]>>(&mut self, taxon: usize, depths: &[V]) -> Result<()> {
        check_row("alleles", NUM_NUCLEOTIDE_ALLELES, depths.len())?;
        let mut encoded = Vec::with_capacity(NUM_NUCLEOTIDE_ALLELES);
        for (row, &score_type) in depths.iter().zip(ALLELE_DEPTH_TYPES.iter()) {
            let row = row.as_ref();
            check_row("sites", self.builders.get_mut(score_type)?.num_sites(), row.len())?;
            encoded.push((score_type, encode_depths(row)));
        }
        for (score_type, bytes) in encoded {
            self.builders.get_mut(score_type)?.add_taxon(taxon, &bytes)?;
        }
        Ok(())
    }

    pub fn build(&mut self) -> Result<AlleleDepth<'static>> {
        AlleleDepth::new(self.builders.build()?)
    }
}

#[cfg(test)]
mod testing {
    use super::*;
    use crate::{
        Error,
        builder::{MatrixBuilder, MemoryBuilder3D},
        error::UsageError,
        matrix::MemoryMatrix3D,
        store::FileHeaderBuilder,
    };

    #[test]
    fn test_memory_depths() -> Result<()> {
        let mut builder = AlleleDepthBuilder::for_memory(2, 3);
        builder.add_taxon(0, &[1, 50, 127], ScoreType::DepthA)?;
        builder.set_depth(1, 2, ScoreType::DepthT, 12)?;
        builder.set_depth_range_for_taxon(1, 0, ScoreType::DepthGap, &[3, 4])?;
        let depth = builder.build()?;

        assert_eq!(depth.num_taxa(), 2);
        assert_eq!(depth.value(0, 1, ScoreType::DepthA)?, 50);
        assert_eq!(depth.values_for_all_sites(0, ScoreType::DepthA)?, vec![1, 50, 127]);
        assert_eq!(depth.value(1, 2, ScoreType::DepthT)?, 12);
        assert_eq!(depth.site_depths(1, 0)?, [0, 0, 0, 0, 3, 0]);
        assert_eq!(depth.site_depths(1, 2)?, [0, 0, 0, 12, 0, 0]);
        Ok(())
    }

    #[test]
    fn test_large_depths_saturate() -> Result<()> {
        let mut builder = AlleleDepthBuilder::for_memory(1, 2);
        builder.add_taxon(0, &[20_000, 500], ScoreType::DepthC)?;
        let depth = builder.build()?;
        assert_eq!(depth.byte(0, 0, ScoreType::DepthC)?, u8::MAX);
        assert_eq!(depth.value(0, 0, ScoreType::DepthC)?, crate::codec::MAX_DEPTH);
        // lossy above the exact range, but still in the neighbourhood
        let decoded = depth.value(0, 1, ScoreType::DepthC)?;
        assert!(decoded.abs_diff(500) < 25);
        Ok(())
    }

    #[test]
    fn test_non_depth_type_rejected() {
        let mut builder = AlleleDepthBuilder::for_memory(1, 2);
        assert!(matches!(
            builder.add_taxon(0, &[1, 2], ScoreType::ProbA),
            Err(Error::UsageError(UsageError::UnsupportedScoreType { .. }))
        ));
    }

    #[test]
    fn test_disk_depths_and_filter() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let header = FileHeaderBuilder::new().num_sites(5).block_size(2).build()?;
        let store = ScoreStore::create(dir.path().join("depth.bsc"), header)?;
        let mut builder = AlleleDepthBuilder::for_disk(&store, 5)?;
        for taxon in 0..3u32 {
            let rows: Vec<Vec<u32>> = (0..6u32)
                .map(|allele| (0..5u32).map(|site| taxon * 100 + allele * 10 + site).collect())
                .collect();
            builder.add_taxon_alleles(taxon as usize, &rows)?;
        }
        assert!(matches!(
            builder.set_depth(0, 0, ScoreType::DepthA, 1),
            Err(Error::UsageError(UsageError::WrongMode { .. }))
        ));
        let depth = builder.build()?;
        assert_eq!(depth.num_taxa(), 3);
        assert_eq!(depth.value(1, 4, ScoreType::DepthG)?, 124);

        let view = depth.filtered(&Translate::taxa_subset(vec![2, 0], 5))?;
        assert_eq!(view.num_taxa(), 2);
        assert_eq!(view.value(0, 3, ScoreType::DepthC)?, depth.value(2, 3, ScoreType::DepthC)?);
        assert_eq!(view.site_depths(1, 1)?, depth.site_depths(0, 1)?);
        Ok(())
    }

    #[test]
    fn test_short_allele_row_writes_nothing() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let header = FileHeaderBuilder::new().num_sites(3).block_size(2).build()?;
        let store = ScoreStore::create(dir.path().join("depth.bsc"), header)?;
        let mut builder = AlleleDepthBuilder::for_disk(&store, 3)?;
        let mut rows = vec![vec![1u32, 2, 3]; 6];
        rows[4].pop();
        assert!(matches!(
            builder.add_taxon_alleles(0, &rows),
            Err(Error::UsageError(UsageError::SizeMismatch { what: "sites", .. }))
        ));
        builder.add_taxon_alleles(1, &vec![vec![4u32, 5, 6]; 6])?;
        let depth = builder.build()?;
        assert_eq!(depth.num_taxa(), 2);
        assert!(matches!(depth.value(0, 0, ScoreType::DepthA), Err(error) if error.is_missing_data()));
        assert_eq!(depth.site_depths(1, 2)?, [6; 6]);
        Ok(())
    }

    #[test]
    fn test_disk_builders_share_extent() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let header = FileHeaderBuilder::new().num_sites(2).block_size(2).build()?;
        let store = ScoreStore::create(dir.path().join("depth.bsc"), header)?;
        let mut first = AlleleDepthBuilder::for_disk(&store, 2)?;
        let mut second = AlleleDepthBuilder::for_disk(&store, 2)?;
        first.add_taxon_alleles(0, &vec![vec![1u32, 1]; 6])?;
        second.add_taxon_alleles(1, &vec![vec![2u32, 2]; 6])?;
        // another builder wrote only one type for taxon 2
        second.add_taxon(2, &[9, 9], ScoreType::DepthT)?;

        let depth = first.build()?;
        assert_eq!(depth.num_taxa(), 3);
        assert_eq!(depth.site_depths(1, 0)?, [2; 6]);
        assert_eq!(depth.value(2, 1, ScoreType::DepthT)?, 9);
        assert!(matches!(depth.value(2, 1, ScoreType::DepthA), Err(error) if error.is_missing_data()));
        Ok(())
    }

    #[test]
    fn test_from_matrix3d() -> Result<()> {
        let mut builder = MemoryBuilder3D::new(1, 2, 6, ScoreType::DepthA);
        for allele in 0..6 {
            builder.set(0, 1, allele, allele as u8 + 1)?;
        }
        let base = builder.build()?;

        // borrowed base
        {
            let depth = AlleleDepth::from_matrix3d(&base)?;
            assert_eq!(depth.site_depths(0, 0)?, [0; 6]);
            assert_eq!(depth.site_depths(0, 1)?, [1, 2, 3, 4, 5, 6]);
        }

        // owned base
        let depth = AlleleDepth::from_matrix3d(base)?;
        let gap = depth.matrix(ScoreType::DepthGap)?;
        assert_eq!(gap.score_type(), ScoreType::DepthGap);
        assert_eq!(gap.value(0, 1)?, 5);

        let too_few = MemoryMatrix3D::zeros(ScoreType::DepthA, 1, 2, 4);
        assert!(AlleleDepth::from_matrix3d(too_few).is_err());
        Ok(())
    }
}
