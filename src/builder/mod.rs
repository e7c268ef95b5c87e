//! Builders for score matrices
//!
//! Construction is a separate, mutable phase. A builder fills either
//!
//! * a zero-initialised in-memory buffer ([`MemoryBuilder2D`], [`MemoryBuilder3D`]), addressed
//!   cell by cell, row by row, or by site range, or
//! * a [`ScoreStore`], one complete taxon row at a time ([`DiskBuilder2D`], [`DiskBuilder3D`]).
//!
//! [`MatrixBuilder::build`] hands the result over and leaves the builder inert: every later
//! call fails with [`UsageError::AlreadyBuilt`].
//!
//! [`Byte2DBuilder`] and [`Byte3DBuilder`] select a mode at construction time for callers that
//! do not know it statically. Operations the selected mode does not support fail with
//! [`UsageError::WrongMode`].

mod disk;
mod memory;

use std::sync::Arc;

pub use disk::{DiskBuilder2D, DiskBuilder3D};
pub use memory::{MemoryBuilder2D, MemoryBuilder3D};

use crate::{
    Result, ScoreType,
    error::UsageError,
    matrix::{Matrix2D, Matrix3D},
    store::ScoreStore,
};

/// Produces a finished, read-only matrix
pub trait MatrixBuilder {
    type Output;

    /// Releases the builder's storage into the output.
    ///
    /// A second call fails with [`UsageError::AlreadyBuilt`].
    fn build(&mut self) -> Result<Self::Output>;
}

/// Fails with [`UsageError::SizeMismatch`] unless `actual == expected`
pub(crate) fn check_row(what: &'static str, expected: usize, actual: usize) -> Result<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(UsageError::SizeMismatch {
            what,
            expected,
            actual,
        }
        .into())
    }
}

/// Returns the end of `offset..offset + len`, failing if it runs past `num_sites`
pub(crate) fn check_span(offset: usize, len: usize, num_sites: usize) -> Result<usize> {
    match offset.checked_add(len) {
        Some(end) if end <= num_sites => Ok(end),
        end => Err(UsageError::OutOfBounds {
            axis: "site",
            index: end.map_or(offset, |end| end.saturating_sub(1).max(offset)),
            len: num_sites,
        }
        .into()),
    }
}

const DISK_SET_HINT: &str = "use add_taxon for disk-backed stores";

fn wrong_mode(operation: &'static str) -> crate::Error {
    UsageError::WrongMode {
        operation,
        mode: "disk",
        hint: DISK_SET_HINT,
    }
    .into()
}

/// A taxon-by-site builder in either memory or disk mode
pub enum Byte2DBuilder {
    Memory(MemoryBuilder2D),
    Disk(DiskBuilder2D),
}
impl Byte2DBuilder {
    /// Allocates a zero-filled `num_taxa x num_sites` matrix up front
    #[must_use]
    pub fn for_memory(num_taxa: usize, num_sites: usize, score_type: ScoreType) -> Self {
        Self::Memory(MemoryBuilder2D::new(num_taxa, num_sites, score_type))
    }

    /// Streams rows into `store`; nothing is allocated up front
    pub fn for_disk(store: Arc<ScoreStore>, num_sites: usize, score_type: ScoreType) -> Result<Self> {
        DiskBuilder2D::new(store, num_sites, score_type).map(Self::Disk)
    }

    #[must_use]
    pub fn mode(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Disk(_) => "disk",
        }
    }

    #[must_use]
    pub fn score_type(&self) -> ScoreType {
        match self {
            Self::Memory(builder) => builder.score_type(),
            Self::Disk(builder) => builder.score_type(),
        }
    }

    #[must_use]
    pub fn num_sites(&self) -> usize {
        match self {
            Self::Memory(builder) => builder.num_sites(),
            Self::Disk(builder) => builder.num_sites(),
        }
    }

    /// Declared taxon count in memory mode; highest written taxon + 1 in disk mode
    #[must_use]
    pub fn num_taxa(&self) -> usize {
        match self {
            Self::Memory(builder) => builder.num_taxa(),
            Self::Disk(builder) => builder.num_taxa(),
        }
    }

    pub fn set(&mut self, taxon: usize, site: usize, value: u8) -> Result<()> {
        match self {
            Self::Memory(builder) => builder.set(taxon, site, value),
            Self::Disk(_) => Err(wrong_mode("set")),
        }
    }

    pub fn set_taxon(&mut self, taxon: usize, values: &[u8]) -> Result<()> {
        match self {
            Self::Memory(builder) => builder.set_taxon(taxon, values),
            Self::Disk(_) => Err(wrong_mode("set_taxon")),
        }
    }

    pub fn set_range_for_taxon(
        &mut self,
        taxon: usize,
        site_offset: usize,
        values: &[u8],
    ) -> Result<()> {
        match self {
            Self::Memory(builder) => builder.set_range_for_taxon(taxon, site_offset, values),
            Self::Disk(_) => Err(wrong_mode("set_range_for_taxon")),
        }
    }

    /// Adds a complete row; supported by both modes
    pub fn add_taxon(&mut self, taxon: usize, values: &[u8]) -> Result<()> {
        match self {
            Self::Memory(builder) => builder.add_taxon(taxon, values),
            Self::Disk(builder) => builder.add_taxon(taxon, values),
        }
    }

    /// Taxon count of the matrix `build()` would return
    pub(crate) fn built_num_taxa(&self) -> Result<usize> {
        match self {
            Self::Memory(builder) => Ok(builder.num_taxa()),
            Self::Disk(builder) => builder.built_num_taxa(),
        }
    }

    /// Disk mode only: see [`DiskBuilder2D::reserve_taxa`]
    pub(crate) fn reserve_taxa(&mut self, num_taxa: usize) {
        if let Self::Disk(builder) = self {
            builder.reserve_taxa(num_taxa);
        }
    }
}
impl MatrixBuilder for Byte2DBuilder {
    type Output = Box<dyn Matrix2D>;

    fn build(&mut self) -> Result<Box<dyn Matrix2D>> {
        Ok(match self {
            Self::Memory(builder) => Box::new(builder.build()?),
            Self::Disk(builder) => Box::new(builder.build()?),
        })
    }
}

/// A taxon-by-site-by-allele builder in either memory or disk mode
pub enum Byte3DBuilder {
    Memory(MemoryBuilder3D),
    Disk(DiskBuilder3D),
}
impl Byte3DBuilder {
    #[must_use]
    pub fn for_memory(
        num_taxa: usize,
        num_sites: usize,
        num_alleles: usize,
        score_type: ScoreType,
    ) -> Self {
        Self::Memory(MemoryBuilder3D::new(
            num_taxa,
            num_sites,
            num_alleles,
            score_type,
        ))
    }

    pub fn for_disk(
        store: Arc<ScoreStore>,
        num_sites: usize,
        num_alleles: usize,
        score_type: ScoreType,
    ) -> Result<Self> {
        DiskBuilder3D::new(store, num_sites, num_alleles, score_type).map(Self::Disk)
    }

    #[must_use]
    pub fn mode(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Disk(_) => "disk",
        }
    }

    #[must_use]
    pub fn score_type(&self) -> ScoreType {
        match self {
            Self::Memory(builder) => builder.score_type(),
            Self::Disk(builder) => builder.score_type(),
        }
    }

    #[must_use]
    pub fn num_alleles(&self) -> usize {
        match self {
            Self::Memory(builder) => builder.num_alleles(),
            Self::Disk(builder) => builder.num_alleles(),
        }
    }

    pub fn set(&mut self, taxon: usize, site: usize, allele: usize, value: u8) -> Result<()> {
        match self {
            Self::Memory(builder) => builder.set(taxon, site, allele, value),
            Self::Disk(_) => Err(wrong_mode("set")),
        }
    }

    pub fn set_taxon<V: AsRef<[u8]>>(&mut self, taxon: usize, values: &[V]) -> Result<()> {
        match self {
            Self::Memory(builder) => builder.set_taxon(taxon, values),
            Self::Disk(_) => Err(wrong_mode("set_taxon")),
        }
    }

    pub fn set_range_for_taxon<V: AsRef<[u8]>>(
        &mut self,
        taxon: usize,
        site_offset: usize,
        values: &[V],
    ) -> Result<()> {
        match self {
            Self::Memory(builder) => builder.set_range_for_taxon(taxon, site_offset, values),
            Self::Disk(_) => Err(wrong_mode("set_range_for_taxon")),
        }
    }

    pub fn add_taxon<V: AsRef<[u8]>>(&mut self, taxon: usize, values: &[V]) -> Result<()> {
        match self {
            Self::Memory(builder) => builder.add_taxon(taxon, values),
            Self::Disk(builder) => builder.add_taxon(taxon, values),
        }
    }
}
impl MatrixBuilder for Byte3DBuilder {
    type Output = Box<dyn Matrix3D>;

    fn build(&mut self) -> Result<Box<dyn Matrix3D>> {
        Ok(match self {
            Self::Memory(builder) => Box::new(builder.build()?),
            Self::Disk(builder) => Box::new(builder.build()?),
        })
    }
}
