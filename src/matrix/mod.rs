//! Read-only score matrices
//!
//! [`Matrix2D`] and [`Matrix3D`] describe "one byte per (taxon, site[, allele])" without
//! saying where the bytes live. Two backings implement them:
//!
//! * [`MemoryMatrix2D`] / [`MemoryMatrix3D`] own a dense buffer, and
//! * [`DiskMatrix2D`] / [`DiskMatrix3D`] read blocks out of a [`StoreReader`](crate::store::StoreReader)
//!   through a bounded block cache.
//!
//! [`FilterMatrix2D`] / [`FilterMatrix3D`] wrap any implementation and remap coordinates.
//!
//! Every read returns a [`Result`]: disk reads can fail, and a coordinate outside the
//! matrix is reported as [`UsageError::OutOfBounds`] rather than answered.

mod cache;
mod disk;
mod memory;
mod view;

use auto_impl::auto_impl;

pub use cache::{BlockCache, BlockKey, CACHE_CAPACITY_ENV, DEFAULT_CACHE_CAPACITY};
pub use disk::{DiskMatrix2D, DiskMatrix3D};
pub use memory::{MemoryMatrix2D, MemoryMatrix3D};
pub use view::{AlleleSlice, FilterMatrix2D, FilterMatrix3D, IndexTranslation, Translate};

use crate::{Result, ScoreType, error::UsageError};

/// A taxon-by-site byte matrix
#[auto_impl(&, Box, Arc)]
pub trait Matrix2D: Send + Sync {
    fn score_type(&self) -> ScoreType;

    fn num_taxa(&self) -> usize;

    fn num_sites(&self) -> usize;

    /// Returns the byte stored for `(taxon, site)`
    fn value(&self, taxon: usize, site: usize) -> Result<u8>;

    /// Returns every site of one taxon
    fn values_for_all_sites(&self, taxon: usize) -> Result<Vec<u8>> {
        check_bounds("taxon", taxon, self.num_taxa())?;
        (0..self.num_sites())
            .map(|site| self.value(taxon, site))
            .collect()
    }
}

/// A taxon-by-site-by-allele byte matrix
#[auto_impl(&, Box, Arc)]
pub trait Matrix3D: Send + Sync {
    fn score_type(&self) -> ScoreType;

    fn num_taxa(&self) -> usize;

    fn num_sites(&self) -> usize;

    fn num_alleles(&self) -> usize;

    /// Returns the byte stored for `(taxon, site, allele)`
    fn value(&self, taxon: usize, site: usize, allele: usize) -> Result<u8>;

    /// Returns every site of one taxon as `[allele][site]`
    fn values_for_all_sites(&self, taxon: usize) -> Result<Vec<Vec<u8>>> {
        check_bounds("taxon", taxon, self.num_taxa())?;
        (0..self.num_alleles())
            .map(|allele| {
                (0..self.num_sites())
                    .map(|site| self.value(taxon, site, allele))
                    .collect()
            })
            .collect()
    }

    /// Returns every allele of one `(taxon, site)` cell
    fn values_for_site(&self, taxon: usize, site: usize) -> Result<Vec<u8>> {
        (0..self.num_alleles())
            .map(|allele| self.value(taxon, site, allele))
            .collect()
    }
}

/// Fails with [`UsageError::OutOfBounds`] unless `index < len`
#[inline]
pub(crate) fn check_bounds(axis: &'static str, index: usize, len: usize) -> Result<()> {
    if index < len {
        Ok(())
    } else {
        Err(UsageError::OutOfBounds { axis, index, len }.into())
    }
}
