use ndarray::Array2;

use super::{Matrix2D, Matrix3D, check_bounds};
use crate::{Result, ScoreType, builder::check_row};

/// A dense taxon-by-site matrix held in memory.
///
/// Rows are contiguous, so [`values_for_all_sites`](Matrix2D::values_for_all_sites) is a
/// single copy.
#[derive(Clone, Debug)]
pub struct MemoryMatrix2D {
    score_type: ScoreType,
    /// Shape: `[num_taxa, num_sites]`
    data: Array2<u8>,
}
impl MemoryMatrix2D {
    #[must_use]
    pub fn new(score_type: ScoreType, data: Array2<u8>) -> Self {
        Self { score_type, data }
    }

    /// A zero-filled matrix
    #[must_use]
    pub fn zeros(score_type: ScoreType, num_taxa: usize, num_sites: usize) -> Self {
        Self::new(score_type, Array2::zeros((num_taxa, num_sites)))
    }

    #[must_use]
    pub fn as_array(&self) -> &Array2<u8> {
        &self.data
    }

    #[must_use]
    pub fn into_array(self) -> Array2<u8> {
        self.data
    }
}
impl Matrix2D for MemoryMatrix2D {
    fn score_type(&self) -> ScoreType {
        self.score_type
    }

    fn num_taxa(&self) -> usize {
        self.data.nrows()
    }

    fn num_sites(&self) -> usize {
        self.data.ncols()
    }

    #[inline]
    fn value(&self, taxon: usize, site: usize) -> Result<u8> {
        check_bounds("taxon", taxon, self.num_taxa())?;
        check_bounds("site", site, self.num_sites())?;
        Ok(self.data[[taxon, site]])
    }

    fn values_for_all_sites(&self, taxon: usize) -> Result<Vec<u8>> {
        check_bounds("taxon", taxon, self.num_taxa())?;
        Ok(self.data.row(taxon).to_vec())
    }
}

/// A dense taxon-by-site-by-allele matrix held in memory.
///
/// Each taxon owns its own `[num_alleles, num_sites]` buffer so rows can be filled
/// independently.
#[derive(Clone, Debug)]
pub struct MemoryMatrix3D {
    score_type: ScoreType,
    num_sites: usize,
    num_alleles: usize,
    taxa: Vec<Array2<u8>>,
}
impl MemoryMatrix3D {
    /// Wraps per-taxon `[num_alleles, num_sites]` buffers.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::SizeMismatch`] if a buffer does not have the shape
    /// `[num_alleles, num_sites]`.
    pub fn new(
        score_type: ScoreType,
        num_sites: usize,
        num_alleles: usize,
        taxa: Vec<Array2<u8>>,
    ) -> Result<Self> {
        for buffer in &taxa {
            let (alleles, sites) = buffer.dim();
            check_row("alleles", num_alleles, alleles)?;
            check_row("sites", num_sites, sites)?;
        }
        Ok(Self {
            score_type,
            num_sites,
            num_alleles,
            taxa,
        })
    }

    /// A zero-filled matrix
    #[must_use]
    pub fn zeros(
        score_type: ScoreType,
        num_taxa: usize,
        num_sites: usize,
        num_alleles: usize,
    ) -> Self {
        Self {
            score_type,
            num_sites,
            num_alleles,
            taxa: (0..num_taxa)
                .map(|_| Array2::zeros((num_alleles, num_sites)))
                .collect(),
        }
    }

    /// The `[num_alleles, num_sites]` buffer of one taxon
    #[must_use]
    pub fn taxon(&self, taxon: usize) -> Option<&Array2<u8>> {
        self.taxa.get(taxon)
    }
}
impl Matrix3D for MemoryMatrix3D {
    fn score_type(&self) -> ScoreType {
        self.score_type
    }

    fn num_taxa(&self) -> usize {
        self.taxa.len()
    }

    fn num_sites(&self) -> usize {
        self.num_sites
    }

    fn num_alleles(&self) -> usize {
        self.num_alleles
    }

    #[inline]
    fn value(&self, taxon: usize, site: usize, allele: usize) -> Result<u8> {
        check_bounds("taxon", taxon, self.num_taxa())?;
        check_bounds("site", site, self.num_sites)?;
        check_bounds("allele", allele, self.num_alleles)?;
        Ok(self.taxa[taxon][[allele, site]])
    }

    fn values_for_all_sites(&self, taxon: usize) -> Result<Vec<Vec<u8>>> {
        check_bounds("taxon", taxon, self.num_taxa())?;
        Ok(self.taxa[taxon]
            .rows()
            .into_iter()
            .map(|row| row.to_vec())
            .collect())
    }

    fn values_for_site(&self, taxon: usize, site: usize) -> Result<Vec<u8>> {
        check_bounds("taxon", taxon, self.num_taxa())?;
        check_bounds("site", site, self.num_sites)?;
        Ok(self.taxa[taxon].column(site).to_vec())
    }
}
