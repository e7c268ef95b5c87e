use std::sync::Arc;

use log::debug;

use super::{BlockCache, Matrix2D, Matrix3D, check_bounds};
use crate::{
    Result, ScoreType,
    error::{MissingDataError, StoreError},
    store::StoreReader,
};

/// Block lookup shared by the two- and three-dimensional disk matrices
struct DiskBacking {
    reader: Arc<StoreReader>,
    score_type: ScoreType,
    num_taxa: usize,
    num_alleles: usize,
    cache: BlockCache,
}
impl DiskBacking {
    fn new(
        reader: Arc<StoreReader>,
        score_type: ScoreType,
        num_taxa: usize,
        num_alleles: usize,
    ) -> Self {
        debug!(
            "opened disk matrix for {score_type}: {num_taxa} taxa x {} sites x {num_alleles} alleles",
            reader.num_sites()
        );
        Self {
            reader,
            score_type,
            num_taxa,
            num_alleles,
            cache: BlockCache::default(),
        }
    }

    fn num_sites(&self) -> usize {
        self.reader.num_sites()
    }

    fn check(&self, taxon: usize, site: usize) -> Result<()> {
        check_bounds("taxon", taxon, self.num_taxa)?;
        check_bounds("site", site, self.num_sites())
    }

    /// Returns the cached block `block` of `taxon` and the number of sites it covers
    fn block(&self, taxon: usize, block: usize) -> Result<(Arc<[u8]>, usize)> {
        let bytes = self.cache.get_or_load((taxon, block), || {
            self.reader.read_block(self.score_type, taxon, block)
        })?;
        Ok((bytes, self.reader.header().block_len(block)))
    }

    /// Byte at `(taxon, site)` of allele plane `allele`
    fn value(&self, taxon: usize, site: usize, allele: usize) -> Result<u8> {
        let block_size = self.reader.block_size();
        let (bytes, block_len) = self.block(taxon, site / block_size)?;
        Ok(bytes[allele * block_len + site % block_size])
    }

    /// Every site of every allele plane of `taxon`, as `[allele][site]`
    fn row(&self, taxon: usize) -> Result<Vec<Vec<u8>>> {
        check_bounds("taxon", taxon, self.num_taxa)?;
        let mut planes = vec![Vec::with_capacity(self.num_sites()); self.num_alleles];
        for block in 0..self.reader.header().num_blocks() {
            let (bytes, block_len) = self.block(taxon, block)?;
            for (plane, chunk) in planes.iter_mut().zip(bytes.chunks_exact(block_len)) {
                plane.extend_from_slice(chunk);
            }
        }
        Ok(planes)
    }
}

/// Number of allele planes stored for `score_type`, or `fallback` if it has no datasets
fn stored_alleles(reader: &StoreReader, score_type: ScoreType, fallback: usize) -> usize {
    reader.num_alleles(score_type).unwrap_or(fallback)
}

/// A taxon-by-site matrix read lazily from a store.
///
/// Blocks of `block_size` sites are decoded on first access and kept in a bounded
/// [`BlockCache`]. The matrix is read-only and may be shared across threads.
pub struct DiskMatrix2D {
    backing: DiskBacking,
}
impl DiskMatrix2D {
    /// Opens the datasets of `score_type`, taking the taxon count from the store
    ///
    /// # Errors
    ///
    /// * [`MissingDataError::ScoreType`] if the store holds no datasets for `score_type`
    /// * [`StoreError::InconsistentAlleles`] if the datasets have more than one allele plane
    pub fn open(reader: Arc<StoreReader>, score_type: ScoreType) -> Result<Self> {
        if !reader.contains(score_type) {
            return Err(MissingDataError::ScoreType(score_type).into());
        }
        let num_taxa = reader.num_taxa(score_type);
        Self::with_num_taxa(reader, score_type, num_taxa)
    }

    /// Opens the datasets of `score_type` with an explicit taxon count.
    ///
    /// Taxa without a dataset read as [`MissingDataError`]s.
    pub fn with_num_taxa(
        reader: Arc<StoreReader>,
        score_type: ScoreType,
        num_taxa: usize,
    ) -> Result<Self> {
        let num_alleles = stored_alleles(&reader, score_type, 1);
        if num_alleles != 1 {
            return Err(StoreError::InconsistentAlleles {
                score_type,
                expected: 1,
                found: num_alleles,
            }
            .into());
        }
        Ok(Self {
            backing: DiskBacking::new(reader, score_type, num_taxa, 1),
        })
    }

    /// Replaces the block cache with an empty one holding at most `capacity` blocks
    #[must_use]
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.backing.cache = BlockCache::new(capacity);
        self
    }

    #[must_use]
    pub fn cache(&self) -> &BlockCache {
        &self.backing.cache
    }

    #[must_use]
    pub fn reader(&self) -> &Arc<StoreReader> {
        &self.backing.reader
    }
}
impl Matrix2D for DiskMatrix2D {
    fn score_type(&self) -> ScoreType {
        self.backing.score_type
    }

    fn num_taxa(&self) -> usize {
        self.backing.num_taxa
    }

    fn num_sites(&self) -> usize {
        self.backing.num_sites()
    }

    fn value(&self, taxon: usize, site: usize) -> Result<u8> {
        self.backing.check(taxon, site)?;
        self.backing.value(taxon, site, 0)
    }

    fn values_for_all_sites(&self, taxon: usize) -> Result<Vec<u8>> {
        let mut planes = self.backing.row(taxon)?;
        Ok(planes.pop().unwrap_or_default())
    }
}

/// A taxon-by-site-by-allele matrix read lazily from a store.
///
/// A cached block holds the block's sites for every allele plane, so all alleles of a
/// site come from one block read.
pub struct DiskMatrix3D {
    backing: DiskBacking,
}
impl DiskMatrix3D {
    /// Opens the datasets of `score_type`, taking taxon and allele counts from the store
    pub fn open(reader: Arc<StoreReader>, score_type: ScoreType) -> Result<Self> {
        let num_alleles = reader.num_alleles(score_type)?;
        let num_taxa = reader.num_taxa(score_type);
        Ok(Self {
            backing: DiskBacking::new(reader, score_type, num_taxa, num_alleles),
        })
    }

    /// Opens the datasets of `score_type` with explicit taxon and allele counts
    pub fn with_dimensions(
        reader: Arc<StoreReader>,
        score_type: ScoreType,
        num_taxa: usize,
        num_alleles: usize,
    ) -> Result<Self> {
        let stored = stored_alleles(&reader, score_type, num_alleles);
        if stored != num_alleles {
            return Err(StoreError::InconsistentAlleles {
                score_type,
                expected: num_alleles,
                found: stored,
            }
            .into());
        }
        Ok(Self {
            backing: DiskBacking::new(reader, score_type, num_taxa, num_alleles),
        })
    }

    #[must_use]
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.backing.cache = BlockCache::new(capacity);
        self
    }

    #[must_use]
    pub fn cache(&self) -> &BlockCache {
        &self.backing.cache
    }
}
impl Matrix3D for DiskMatrix3D {
    fn score_type(&self) -> ScoreType {
        self.backing.score_type
    }

    fn num_taxa(&self) -> usize {
        self.backing.num_taxa
    }

    fn num_sites(&self) -> usize {
        self.backing.num_sites()
    }

    fn num_alleles(&self) -> usize {
        self.backing.num_alleles
    }

    fn value(&self, taxon: usize, site: usize, allele: usize) -> Result<u8> {
        self.backing.check(taxon, site)?;
        check_bounds("allele", allele, self.backing.num_alleles)?;
        self.backing.value(taxon, site, allele)
    }

    fn values_for_all_sites(&self, taxon: usize) -> Result<Vec<Vec<u8>>> {
        self.backing.row(taxon)
    }

    fn values_for_site(&self, taxon: usize, site: usize) -> Result<Vec<u8>> {
        self.backing.check(taxon, site)?;
        let block_size = self.backing.reader.block_size();
        let (bytes, block_len) = self.backing.block(taxon, site / block_size)?;
        Ok((0..self.backing.num_alleles)
            .map(|allele| bytes[allele * block_len + site % block_size])
            .collect())
    }
}
