use ndarray::{Array2, aview1, s};

use super::{MatrixBuilder, check_row, check_span};
use crate::{
    Result, ScoreType,
    error::UsageError,
    matrix::{MemoryMatrix2D, MemoryMatrix3D, check_bounds},
};

/// Fills a zero-initialised taxon-by-site buffer, then hands it to a [`MemoryMatrix2D`]
#[derive(Debug)]
pub struct MemoryBuilder2D {
    score_type: ScoreType,
    num_taxa: usize,
    num_sites: usize,
    /// Released by `build()`
    data: Option<Array2<u8>>,
    taxa_added: usize,
}
impl MemoryBuilder2D {
    #[must_use]
    pub fn new(num_taxa: usize, num_sites: usize, score_type: ScoreType) -> Self {
        Self {
            score_type,
            num_taxa,
            num_sites,
            data: Some(Array2::zeros((num_taxa, num_sites))),
            taxa_added: 0,
        }
    }

    #[must_use]
    pub fn score_type(&self) -> ScoreType {
        self.score_type
    }

    #[must_use]
    pub fn num_taxa(&self) -> usize {
        self.num_taxa
    }

    #[must_use]
    pub fn num_sites(&self) -> usize {
        self.num_sites
    }

    /// Number of rows supplied through [`add_taxon`](Self::add_taxon)
    #[must_use]
    pub fn taxa_added(&self) -> usize {
        self.taxa_added
    }

    fn data_mut(&mut self) -> Result<&mut Array2<u8>> {
        self.data.as_mut().ok_or(UsageError::AlreadyBuilt.into())
    }

    pub fn set(&mut self, taxon: usize, site: usize, value: u8) -> Result<()> {
        let data = self.data_mut()?;
        check_bounds("taxon", taxon, data.nrows())?;
        check_bounds("site", site, data.ncols())?;
        data[[taxon, site]] = value;
        Ok(())
    }

    /// Replaces the whole row of `taxon`
    pub fn set_taxon(&mut self, taxon: usize, values: &[u8]) -> Result<()> {
        let num_sites = self.num_sites;
        let data = self.data_mut()?;
        check_bounds("taxon", taxon, data.nrows())?;
        check_row("sites", num_sites, values.len())?;
        data.row_mut(taxon).assign(&aview1(values));
        Ok(())
    }

    /// Writes `values` into the row of `taxon` starting at `site_offset`
    pub fn set_range_for_taxon(
        &mut self,
        taxon: usize,
        site_offset: usize,
        values: &[u8],
    ) -> Result<()> {
        let num_sites = self.num_sites;
        let data = self.data_mut()?;
        check_bounds("taxon", taxon, data.nrows())?;
        let end = check_span(site_offset, values.len(), num_sites)?;
        data.slice_mut(s![taxon, site_offset..end])
            .assign(&aview1(values));
        Ok(())
    }

    /// [`set_taxon`](Self::set_taxon) that also counts the row as added
    pub fn add_taxon(&mut self, taxon: usize, values: &[u8]) -> Result<()> {
        self.set_taxon(taxon, values)?;
        self.taxa_added += 1;
        Ok(())
    }
}
impl MatrixBuilder for MemoryBuilder2D {
    type Output = MemoryMatrix2D;

    fn build(&mut self) -> Result<MemoryMatrix2D> {
        let data = self.data.take().ok_or(UsageError::AlreadyBuilt)?;
        Ok(MemoryMatrix2D::new(self.score_type, data))
    }
}

/// Fills one zero-initialised `[num_alleles, num_sites]` buffer per taxon, then hands them
/// to a [`MemoryMatrix3D`]
#[derive(Debug)]
pub struct MemoryBuilder3D {
    score_type: ScoreType,
    num_sites: usize,
    num_alleles: usize,
    taxa: Option<Vec<Array2<u8>>>,
    taxa_added: usize,
}
impl MemoryBuilder3D {
    #[must_use]
    pub fn new(
        num_taxa: usize,
        num_sites: usize,
        num_alleles: usize,
        score_type: ScoreType,
    ) -> Self {
        let taxa = (0..num_taxa)
            .map(|_| Array2::zeros((num_alleles, num_sites)))
            .collect();
        Self {
            score_type,
            num_sites,
            num_alleles,
            taxa: Some(taxa),
            taxa_added: 0,
        }
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
    pub fn taxa_added(&self) -> usize {
        self.taxa_added
    }

    fn taxon_mut(&mut self, taxon: usize) -> Result<&mut Array2<u8>> {
        let taxa = self.taxa.as_mut().ok_or(UsageError::AlreadyBuilt)?;
        check_bounds("taxon", taxon, taxa.len())?;
        Ok(&mut taxa[taxon])
    }

    pub fn set(&mut self, taxon: usize, site: usize, allele: usize, value: u8) -> Result<()> {
        let (num_sites, num_alleles) = (self.num_sites, self.num_alleles);
        let buffer = self.taxon_mut(taxon)?;
        check_bounds("site", site, num_sites)?;
        check_bounds("allele", allele, num_alleles)?;
        buffer[[allele, site]] = value;
        Ok(())
    }

    /// Replaces every allele plane of `taxon`; `values` is `[allele][site]`
    pub fn set_taxon<V: AsRef<[u8]>>(&mut self, taxon: usize, values: &[V]) -> Result<()> {
        check_row("alleles", self.num_alleles, values.len())?;
        for plane in values {
            check_row("sites", self.num_sites, plane.as_ref().len())?;
        }
        self.set_range_for_taxon(taxon, 0, values)
    }

    /// Writes `[allele][site]` values into `taxon` starting at `site_offset`
    pub fn set_range_for_taxon<V: AsRef<[u8]>>(
        &mut self,
        taxon: usize,
        site_offset: usize,
        values: &[V],
    ) -> Result<()> {
        let (num_sites, num_alleles) = (self.num_sites, self.num_alleles);
        check_row("alleles", num_alleles, values.len())?;
        let width = values.first().map_or(0, |plane| plane.as_ref().len());
        for plane in values {
            check_row("sites", width, plane.as_ref().len())?;
        }
        let end = check_span(site_offset, width, num_sites)?;
        let buffer = self.taxon_mut(taxon)?;
        for (allele, plane) in values.iter().enumerate() {
            buffer
                .slice_mut(s![allele, site_offset..end])
                .assign(&aview1(plane.as_ref()));
        }
        Ok(())
    }

    pub fn add_taxon<V: AsRef<[u8]>>(&mut self, taxon: usize, values: &[V]) -> Result<()> {
        self.set_taxon(taxon, values)?;
        self.taxa_added += 1;
        Ok(())
    }
}
impl MatrixBuilder for MemoryBuilder3D {
    type Output = MemoryMatrix3D;

    fn build(&mut self) -> Result<MemoryMatrix3D> {
        let taxa = self.taxa.take().ok_or(UsageError::AlreadyBuilt)?;
        MemoryMatrix3D::new(self.score_type, self.num_sites, self.num_alleles, taxa)
    }
}
