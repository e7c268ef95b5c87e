use std::sync::Arc;

use super::{MatrixBuilder, check_row};
use crate::{
    Result, ScoreType,
    error::UsageError,
    matrix::{DiskMatrix2D, DiskMatrix3D},
    store::ScoreStore,
};

/// Streams taxon rows straight into a [`ScoreStore`].
///
/// Nothing is buffered: each [`add_taxon`](Self::add_taxon) validates the row, compresses it
/// and appends it under the store's writer lock. Several builders (one per score type, or
/// one per thread) may share the same store.
pub struct DiskBuilder2D {
    store: Option<Arc<ScoreStore>>,
    score_type: ScoreType,
    num_sites: usize,
    num_taxa: usize,
    taxa_added: usize,
}
impl DiskBuilder2D {
    /// Fails if `num_sites` disagrees with the store's site count
    pub fn new(store: Arc<ScoreStore>, num_sites: usize, score_type: ScoreType) -> Result<Self> {
        check_row("sites", store.num_sites(), num_sites)?;
        Ok(Self {
            store: Some(store),
            score_type,
            num_sites,
            num_taxa: 0,
            taxa_added: 0,
        })
    }

    #[must_use]
    pub fn score_type(&self) -> ScoreType {
        self.score_type
    }

    #[must_use]
    pub fn num_sites(&self) -> usize {
        self.num_sites
    }

    /// One past the highest taxon index written (or reserved) so far
    #[must_use]
    pub fn num_taxa(&self) -> usize {
        self.num_taxa
    }

    #[must_use]
    pub fn taxa_added(&self) -> usize {
        self.taxa_added
    }

    /// Widens the built matrix to at least `num_taxa` taxa; unwritten taxa read as missing
    pub fn reserve_taxa(&mut self, num_taxa: usize) {
        self.num_taxa = self.num_taxa.max(num_taxa);
    }

    fn store(&self) -> Result<&Arc<ScoreStore>> {
        self.store.as_ref().ok_or(UsageError::AlreadyBuilt.into())
    }

    /// The extent `build()` will give the matrix; finalizes the store
    pub(crate) fn built_num_taxa(&self) -> Result<usize> {
        let reader = self.store()?.reader()?;
        Ok(self.num_taxa.max(reader.num_taxa(self.score_type)))
    }

    /// Writes the full row of `taxon` to the store
    pub fn add_taxon(&mut self, taxon: usize, values: &[u8]) -> Result<()> {
        let store = self.store()?;
        check_row("sites", self.num_sites, values.len())?;
        store.write_taxon(self.score_type, taxon, 1, values)?;
        self.taxa_added += 1;
        self.reserve_taxa(taxon + 1);
        Ok(())
    }
}
impl MatrixBuilder for DiskBuilder2D {
    type Output = DiskMatrix2D;

    /// Finalizes the store (if no other builder has) and opens a cached matrix over it.
    ///
    /// The taxon count covers every taxon of this score type in the store, including those
    /// written by other builders.
    fn build(&mut self) -> Result<DiskMatrix2D> {
        let store = self.store.take().ok_or(UsageError::AlreadyBuilt)?;
        let reader = store.reader()?;
        let num_taxa = self.num_taxa.max(reader.num_taxa(self.score_type));
        DiskMatrix2D::with_num_taxa(reader, self.score_type, num_taxa)
    }
}

/// Streams `[allele][site]` taxon rows into a [`ScoreStore`]
pub struct DiskBuilder3D {
    store: Option<Arc<ScoreStore>>,
    score_type: ScoreType,
    num_sites: usize,
    num_alleles: usize,
    num_taxa: usize,
    taxa_added: usize,
}
impl DiskBuilder3D {
    pub fn new(
        store: Arc<ScoreStore>,
        num_sites: usize,
        num_alleles: usize,
        score_type: ScoreType,
    ) -> Result<Self> {
        check_row("sites", store.num_sites(), num_sites)?;
        Ok(Self {
            store: Some(store),
            score_type,
            num_sites,
            num_alleles,
            num_taxa: 0,
            taxa_added: 0,
        })
    }

    #[must_use]
    pub fn score_type(&self) -> ScoreType {
        self.score_type
    }

    #[must_use]
    pub fn num_sites(&self) -> usize {
        self.num_sites
    }

    #[must_use]
    pub fn num_alleles(&self) -> usize {
        self.num_alleles
    }

    #[must_use]
    pub fn num_taxa(&self) -> usize {
        self.num_taxa
    }

    #[must_use]
    pub fn taxa_added(&self) -> usize {
        self.taxa_added
    }

    pub fn reserve_taxa(&mut self, num_taxa: usize) {
        self.num_taxa = self.num_taxa.max(num_taxa);
    }

    /// Validates both the allele and the site count, then writes the row allele-major
    pub fn add_taxon<V: AsRef<[u8]>>(&mut self, taxon: usize, values: &[V]) -> Result<()> {
        let store = self.store.as_ref().ok_or(UsageError::AlreadyBuilt)?;
        check_row("alleles", self.num_alleles, values.len())?;
        let mut row = Vec::with_capacity(self.num_alleles * self.num_sites);
        for plane in values {
            let plane = plane.as_ref();
            check_row("sites", self.num_sites, plane.len())?;
            row.extend_from_slice(plane);
        }
        store.write_taxon(self.score_type, taxon, self.num_alleles, &row)?;
        self.taxa_added += 1;
        self.reserve_taxa(taxon + 1);
        Ok(())
    }
}
impl MatrixBuilder for DiskBuilder3D {
    type Output = DiskMatrix3D;

    fn build(&mut self) -> Result<DiskMatrix3D> {
        let store = self.store.take().ok_or(UsageError::AlreadyBuilt)?;
        let reader = store.reader()?;
        let num_taxa = self.num_taxa.max(reader.num_taxa(self.score_type));
        DiskMatrix3D::with_dimensions(reader, self.score_type, num_taxa, self.num_alleles)
    }
}

#[cfg(test)]
mod testing {
    use super::*;
    use crate::{
        Error,
        matrix::{Matrix2D, Matrix3D},
        store::FileHeaderBuilder,
    };

    fn store(dir: &tempfile::TempDir, num_sites: usize) -> Result<Arc<ScoreStore>> {
        let header = FileHeaderBuilder::new()
            .num_sites(num_sites)
            .block_size(4)
            .build()?;
        ScoreStore::create(dir.path().join("scores.bsc"), header)
    }

    #[test]
    fn test_stream_and_build() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = store(&dir, 9)?;
        let mut builder = DiskBuilder2D::new(store, 9, ScoreType::Dosage)?;
        let rows: Vec<Vec<u8>> = (0..3u8)
            .map(|taxon| (0..9u8).map(|site| taxon * 20 + site).collect())
            .collect();
        // taxa arrive out of order
        for taxon in [2, 0, 1] {
            builder.add_taxon(taxon, &rows[taxon])?;
        }
        assert_eq!(builder.taxa_added(), 3);
        let matrix = builder.build()?;
        assert_eq!(matrix.num_taxa(), 3);
        assert_eq!(matrix.num_sites(), 9);
        for (taxon, row) in rows.iter().enumerate() {
            assert_eq!(&matrix.values_for_all_sites(taxon)?, row);
            // second read is served from the cache and must agree
            assert_eq!(matrix.value(taxon, 8)?, row[8]);
            assert_eq!(matrix.value(taxon, 8)?, row[8]);
        }
        Ok(())
    }

    #[test]
    fn test_disk_row_validation() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = store(&dir, 5)?;
        assert!(DiskBuilder2D::new(Arc::clone(&store), 6, ScoreType::Dosage).is_err());
        let mut builder = DiskBuilder2D::new(store, 5, ScoreType::Dosage)?;
        assert!(matches!(
            builder.add_taxon(0, &[1, 2, 3]),
            Err(Error::UsageError(UsageError::SizeMismatch {
                expected: 5,
                actual: 3,
                ..
            }))
        ));
        assert_eq!(builder.taxa_added(), 0);
        Ok(())
    }

    #[test]
    fn test_add_after_build_fails() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = store(&dir, 2)?;
        let mut builder = DiskBuilder2D::new(store, 2, ScoreType::Dosage)?;
        builder.add_taxon(0, &[1, 2])?;
        builder.build()?;
        assert!(matches!(
            builder.add_taxon(1, &[3, 4]),
            Err(Error::UsageError(UsageError::AlreadyBuilt))
        ));
        assert!(builder.build().is_err());
        Ok(())
    }

    #[test]
    fn test_shared_store_across_builders() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = store(&dir, 3)?;
        let mut dosage = DiskBuilder2D::new(Arc::clone(&store), 3, ScoreType::Dosage)?;
        let mut depth = DiskBuilder3D::new(Arc::clone(&store), 3, 2, ScoreType::DepthA)?;
        dosage.add_taxon(0, &[1, 2, 3])?;
        depth.add_taxon(0, &[[4u8, 5, 6], [7, 8, 9]])?;
        depth.add_taxon(1, &[[1u8, 1, 1], [2, 2, 2]])?;

        let dosage = dosage.build()?;
        // the store is finalized by the first build; later builds reuse the reader
        assert!(!store.is_writable());
        let depth = depth.build()?;
        assert_eq!(dosage.values_for_all_sites(0)?, vec![1, 2, 3]);
        assert_eq!(depth.num_taxa(), 2);
        assert_eq!(depth.values_for_site(0, 1)?, vec![5, 8]);
        assert_eq!(depth.values_for_all_sites(1)?, vec![vec![1, 1, 1], vec![2, 2, 2]]);
        Ok(())
    }

    #[test]
    fn test_build_sees_taxa_from_other_builders() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = store(&dir, 2)?;
        let mut first = DiskBuilder2D::new(Arc::clone(&store), 2, ScoreType::Dosage)?;
        let mut second = DiskBuilder2D::new(Arc::clone(&store), 2, ScoreType::Dosage)?;
        first.add_taxon(0, &[1, 2])?;
        second.add_taxon(1, &[4, 5])?;
        assert_eq!(first.num_taxa(), 1);

        let matrix = first.build()?;
        assert_eq!(matrix.num_taxa(), 2);
        assert_eq!(matrix.value(1, 0)?, 4);
        let other = second.build()?;
        assert_eq!(other.num_taxa(), 2);
        assert_eq!(other.values_for_all_sites(0)?, vec![1, 2]);
        Ok(())
    }

    #[test]
    fn test_3d_build_sees_taxa_from_other_builders() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = store(&dir, 2)?;
        let mut first = DiskBuilder3D::new(Arc::clone(&store), 2, 2, ScoreType::DepthA)?;
        let mut second = DiskBuilder3D::new(Arc::clone(&store), 2, 2, ScoreType::DepthA)?;
        second.add_taxon(2, &[[7u8, 8], [9, 10]])?;
        first.add_taxon(0, &[[1u8, 2], [3, 4]])?;
        let matrix = first.build()?;
        assert_eq!(matrix.num_taxa(), 3);
        assert_eq!(matrix.values_for_site(2, 1)?, vec![8, 10]);
        assert!(matches!(matrix.value(1, 0, 0), Err(error) if error.is_missing_data()));
        Ok(())
    }

    #[test]
    fn test_3d_disk_validation() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = store(&dir, 3)?;
        let mut builder = DiskBuilder3D::new(store, 3, 2, ScoreType::DepthA)?;
        assert!(matches!(
            builder.add_taxon(0, &[[1u8, 2, 3]]),
            Err(Error::UsageError(UsageError::SizeMismatch { what: "alleles", .. }))
        ));
        assert!(matches!(
            builder.add_taxon(0, &[vec![1u8, 2, 3], vec![1, 2]]),
            Err(Error::UsageError(UsageError::SizeMismatch { what: "sites", .. }))
        ));
        Ok(())
    }

    #[test]
    fn test_reserved_taxa_read_as_missing() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = store(&dir, 2)?;
        let mut builder = DiskBuilder2D::new(store, 2, ScoreType::Dosage)?;
        builder.add_taxon(0, &[1, 2])?;
        builder.reserve_taxa(3);
        let matrix = builder.build()?;
        assert_eq!(matrix.num_taxa(), 3);
        assert!(matches!(matrix.value(2, 0), Err(error) if error.is_missing_data()));
        assert!(matches!(
            matrix.value(3, 0),
            Err(Error::UsageError(UsageError::OutOfBounds { .. }))
        ));
        Ok(())
    }
}
