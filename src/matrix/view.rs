//! Index-translating views
//!
//! A view owns no data. It holds a base matrix (usually a borrow, `&base`, which the
//! forwarding impls make a matrix in its own right) plus a [`Translate`] mapping the view's
//! taxon and site indices to the base's. Views stack: the base of a view may be another
//! view, and each layer only calls the layer directly beneath it.

use std::sync::Arc;

use super::{Matrix2D, Matrix3D, check_bounds};
use crate::{Result, ScoreType, error::UsageError};

/// Maps the indices of one axis of a view onto the axis of its base
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndexTranslation {
    /// The first `len` indices map to themselves
    Identity(usize),
    /// Index `i` maps to `indices[i]`
    Remap(Arc<[usize]>),
}
impl IndexTranslation {
    #[must_use]
    pub fn identity(len: usize) -> Self {
        Self::Identity(len)
    }

    #[must_use]
    pub fn remap(indices: impl Into<Arc<[usize]>>) -> Self {
        Self::Remap(indices.into())
    }

    /// Number of indices in the view's domain
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Identity(len) => *len,
            Self::Remap(indices) => indices.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn is_identity(&self) -> bool {
        matches!(self, Self::Identity(_))
    }

    /// Base index for view index `index`, or `None` outside the domain
    #[inline]
    #[must_use]
    pub fn translate(&self, index: usize) -> Option<usize> {
        match self {
            Self::Identity(len) => (index < *len).then_some(index),
            Self::Remap(indices) => indices.get(index).copied(),
        }
    }

    /// Checks that every translated index is below `base_len`
    pub fn validate(&self, axis: &'static str, base_len: usize) -> Result<()> {
        let largest = match self {
            Self::Identity(len) => len.checked_sub(1),
            Self::Remap(indices) => indices.iter().copied().max(),
        };
        match largest {
            Some(index) if index >= base_len => Err(UsageError::TranslationOutOfRange {
                axis,
                index,
                len: base_len,
            }
            .into()),
            _ => Ok(()),
        }
    }

    /// Flattens two stacked translations into one.
    ///
    /// `self` maps the outer view onto the middle layer, `inner` maps the middle layer
    /// onto the base; the result maps the outer view straight onto the base.
    pub fn compose(&self, inner: &IndexTranslation) -> Result<IndexTranslation> {
        self.validate("composed", inner.len())?;
        Ok(match (self, inner) {
            (Self::Identity(len), Self::Identity(_)) => Self::Identity(*len),
            (Self::Identity(len), Self::Remap(indices)) => Self::remap(&indices[..*len]),
            (Self::Remap(indices), Self::Identity(_)) => Self::Remap(Arc::clone(indices)),
            (Self::Remap(outer), Self::Remap(indices)) => {
                Self::remap(outer.iter().map(|&i| indices[i]).collect::<Vec<_>>())
            }
        })
    }
}

/// Taxon and site translations of a view
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Translate {
    taxa: IndexTranslation,
    sites: IndexTranslation,
}
impl Translate {
    #[must_use]
    pub fn new(taxa: IndexTranslation, sites: IndexTranslation) -> Self {
        Self { taxa, sites }
    }

    #[must_use]
    pub fn identity(num_taxa: usize, num_sites: usize) -> Self {
        Self::new(
            IndexTranslation::identity(num_taxa),
            IndexTranslation::identity(num_sites),
        )
    }

    /// Keeps (and reorders to) the listed taxa, all sites
    #[must_use]
    pub fn taxa_subset(taxa: impl Into<Arc<[usize]>>, num_sites: usize) -> Self {
        Self::new(
            IndexTranslation::remap(taxa),
            IndexTranslation::identity(num_sites),
        )
    }

    /// Keeps (and reorders to) the listed sites, all taxa
    #[must_use]
    pub fn sites_subset(num_taxa: usize, sites: impl Into<Arc<[usize]>>) -> Self {
        Self::new(
            IndexTranslation::identity(num_taxa),
            IndexTranslation::remap(sites),
        )
    }

    #[must_use]
    pub fn taxa(&self) -> &IndexTranslation {
        &self.taxa
    }

    #[must_use]
    pub fn sites(&self) -> &IndexTranslation {
        &self.sites
    }

    #[must_use]
    pub fn num_taxa(&self) -> usize {
        self.taxa.len()
    }

    #[must_use]
    pub fn num_sites(&self) -> usize {
        self.sites.len()
    }

    #[inline]
    #[must_use]
    pub fn taxon(&self, taxon: usize) -> Option<usize> {
        self.taxa.translate(taxon)
    }

    #[inline]
    #[must_use]
    pub fn site(&self, site: usize) -> Option<usize> {
        self.sites.translate(site)
    }

    /// Checks both axes against the extent of a base matrix
    pub fn validate(&self, base_taxa: usize, base_sites: usize) -> Result<()> {
        self.taxa.validate("taxon", base_taxa)?;
        self.sites.validate("site", base_sites)
    }

    /// Flattens `self` stacked on top of `inner` into one translation
    pub fn compose(&self, inner: &Translate) -> Result<Translate> {
        Ok(Self::new(
            self.taxa.compose(&inner.taxa)?,
            self.sites.compose(&inner.sites)?,
        ))
    }

    fn locate(&self, taxon: usize, site: usize) -> Result<(usize, usize)> {
        let base_taxon = self.taxon(taxon).ok_or(UsageError::OutOfBounds {
            axis: "taxon",
            index: taxon,
            len: self.num_taxa(),
        })?;
        let base_site = self.site(site).ok_or(UsageError::OutOfBounds {
            axis: "site",
            index: site,
            len: self.num_sites(),
        })?;
        Ok((base_taxon, base_site))
    }
}

/// A remapped view of a [`Matrix2D`]
pub struct FilterMatrix2D<M> {
    base: M,
    translate: Translate,
}
impl<M: Matrix2D> FilterMatrix2D<M> {
    /// Creates the view, checking that `translate` stays inside the base's extent
    pub fn new(base: M, translate: Translate) -> Result<Self> {
        translate.validate(base.num_taxa(), base.num_sites())?;
        Ok(Self { base, translate })
    }

    pub fn base(&self) -> &M {
        &self.base
    }

    pub fn translate(&self) -> &Translate {
        &self.translate
    }
}
impl<M: Matrix2D> Matrix2D for FilterMatrix2D<M> {
    fn score_type(&self) -> ScoreType {
        self.base.score_type()
    }

    fn num_taxa(&self) -> usize {
        self.translate.num_taxa()
    }

    fn num_sites(&self) -> usize {
        self.translate.num_sites()
    }

    #[inline]
    fn value(&self, taxon: usize, site: usize) -> Result<u8> {
        let (taxon, site) = self.translate.locate(taxon, site)?;
        self.base.value(taxon, site)
    }

    fn values_for_all_sites(&self, taxon: usize) -> Result<Vec<u8>> {
        let base_taxon = self.translate.taxon(taxon).ok_or(UsageError::OutOfBounds {
            axis: "taxon",
            index: taxon,
            len: self.num_taxa(),
        })?;
        match self.translate.sites() {
            IndexTranslation::Identity(len) if *len == self.base.num_sites() => {
                self.base.values_for_all_sites(base_taxon)
            }
            sites => (0..sites.len())
                .map(|site| self.value(taxon, site))
                .collect(),
        }
    }
}

/// A remapped view of a [`Matrix3D`]; alleles pass through unchanged
pub struct FilterMatrix3D<M> {
    base: M,
    translate: Translate,
}
impl<M: Matrix3D> FilterMatrix3D<M> {
    pub fn new(base: M, translate: Translate) -> Result<Self> {
        translate.validate(base.num_taxa(), base.num_sites())?;
        Ok(Self { base, translate })
    }

    pub fn base(&self) -> &M {
        &self.base
    }

    pub fn translate(&self) -> &Translate {
        &self.translate
    }
}
impl<M: Matrix3D> Matrix3D for FilterMatrix3D<M> {
    fn score_type(&self) -> ScoreType {
        self.base.score_type()
    }

    fn num_taxa(&self) -> usize {
        self.translate.num_taxa()
    }

    fn num_sites(&self) -> usize {
        self.translate.num_sites()
    }

    fn num_alleles(&self) -> usize {
        self.base.num_alleles()
    }

    #[inline]
    fn value(&self, taxon: usize, site: usize, allele: usize) -> Result<u8> {
        let (taxon, site) = self.translate.locate(taxon, site)?;
        self.base.value(taxon, site, allele)
    }

    fn values_for_site(&self, taxon: usize, site: usize) -> Result<Vec<u8>> {
        let (taxon, site) = self.translate.locate(taxon, site)?;
        self.base.values_for_site(taxon, site)
    }
}

/// One allele plane of a [`Matrix3D`] seen as a [`Matrix2D`]
pub struct AlleleSlice<M> {
    base: M,
    allele: usize,
    score_type: ScoreType,
}
impl<M: Matrix3D> AlleleSlice<M> {
    /// Exposes plane `allele` of `base`, tagged as `score_type`
    pub fn new(base: M, allele: usize, score_type: ScoreType) -> Result<Self> {
        check_bounds("allele", allele, base.num_alleles())?;
        Ok(Self {
            base,
            allele,
            score_type,
        })
    }

    pub fn allele(&self) -> usize {
        self.allele
    }
}
impl<M: Matrix3D> Matrix2D for AlleleSlice<M> {
    fn score_type(&self) -> ScoreType {
        self.score_type
    }

    fn num_taxa(&self) -> usize {
        self.base.num_taxa()
    }

    fn num_sites(&self) -> usize {
        self.base.num_sites()
    }

    #[inline]
    fn value(&self, taxon: usize, site: usize) -> Result<u8> {
        self.base.value(taxon, site, self.allele)
    }

    fn values_for_all_sites(&self, taxon: usize) -> Result<Vec<u8>> {
        let mut planes = self.base.values_for_all_sites(taxon)?;
        Ok(planes.swap_remove(self.allele))
    }
}

#[cfg(test)]
mod testing {
    use ndarray::{Array2, array};

    use super::*;
    use crate::{
        Error,
        matrix::{MemoryMatrix2D, MemoryMatrix3D},
    };

    fn base() -> MemoryMatrix2D {
        let data = Array2::from_shape_fn((3, 4), |(t, s)| (t * 10 + s) as u8);
        MemoryMatrix2D::new(ScoreType::Dosage, data)
    }

    #[test]
    fn test_taxon_reorder_view() -> Result<()> {
        let base = base();
        let view = FilterMatrix2D::new(&base, Translate::taxa_subset(vec![2, 0], 4))?;
        assert_eq!(view.num_taxa(), 2);
        assert_eq!(view.num_sites(), 4);
        for site in 0..4 {
            assert_eq!(view.value(0, site)?, base.value(2, site)?);
            assert_eq!(view.value(1, site)?, base.value(0, site)?);
        }
        assert_eq!(view.values_for_all_sites(0)?, base.values_for_all_sites(2)?);
        Ok(())
    }

    #[test]
    fn test_site_subset_view() -> Result<()> {
        let base = base();
        let view = FilterMatrix2D::new(&base, Translate::sites_subset(3, vec![3, 1]))?;
        assert_eq!(view.num_sites(), 2);
        assert_eq!(view.values_for_all_sites(1)?, vec![13, 11]);
        Ok(())
    }

    #[test]
    fn test_view_bounds_use_logical_extent() {
        let base = base();
        let view = FilterMatrix2D::new(&base, Translate::taxa_subset(vec![1], 4)).unwrap();
        assert!(matches!(
            view.value(1, 0),
            Err(Error::UsageError(UsageError::OutOfBounds { axis: "taxon", len: 1, .. }))
        ));
        assert!(view.values_for_all_sites(1).is_err());
    }

    #[test]
    fn test_translation_out_of_range() {
        let base = base();
        let result = FilterMatrix2D::new(&base, Translate::taxa_subset(vec![0, 3], 4));
        assert!(matches!(
            result,
            Err(Error::UsageError(UsageError::TranslationOutOfRange { index: 3, .. }))
        ));
        assert!(FilterMatrix2D::new(&base, Translate::identity(3, 5)).is_err());
    }

    #[test]
    fn test_view_of_view_matches_composed_translation() -> Result<()> {
        let base = base();
        let inner = Translate::new(
            IndexTranslation::remap(vec![2, 1, 0]),
            IndexTranslation::remap(vec![3, 2, 1, 0]),
        );
        let outer = Translate::new(
            IndexTranslation::remap(vec![0, 2]),
            IndexTranslation::identity(3),
        );
        let first = FilterMatrix2D::new(&base, inner.clone())?;
        let stacked = FilterMatrix2D::new(&first, outer.clone())?;
        let flattened = FilterMatrix2D::new(&base, outer.compose(&inner)?)?;

        assert_eq!(stacked.num_taxa(), 2);
        assert_eq!(stacked.num_sites(), 3);
        for taxon in 0..2 {
            for site in 0..3 {
                let expected = base.value(
                    inner.taxon(outer.taxon(taxon).unwrap()).unwrap(),
                    inner.site(outer.site(site).unwrap()).unwrap(),
                )?;
                assert_eq!(stacked.value(taxon, site)?, expected);
                assert_eq!(flattened.value(taxon, site)?, expected);
            }
        }
        Ok(())
    }

    #[test]
    fn test_compose_identity_pairs() -> Result<()> {
        let identity = IndexTranslation::identity(3);
        let remap = IndexTranslation::remap(vec![4, 0, 2, 1]);
        assert_eq!(identity.compose(&IndexTranslation::identity(5))?, identity);
        assert_eq!(identity.compose(&remap)?, IndexTranslation::remap(vec![4, 0, 2]));
        assert_eq!(remap.compose(&IndexTranslation::identity(5))?, remap);
        assert!(remap.compose(&IndexTranslation::identity(4)).is_err());
        Ok(())
    }

    #[test]
    fn test_filter_3d() -> Result<()> {
        let taxa = vec![array![[1, 2], [3, 4]], array![[5, 6], [7, 8]]];
        let base = MemoryMatrix3D::new(ScoreType::DepthA, 2, 2, taxa)?;
        let view = FilterMatrix3D::new(&base, Translate::new(
            IndexTranslation::remap(vec![1]),
            IndexTranslation::remap(vec![1, 0]),
        ))?;
        assert_eq!(view.num_alleles(), 2);
        assert_eq!(view.value(0, 0, 1)?, 8);
        assert_eq!(view.values_for_site(0, 1)?, vec![5, 7]);
        assert_eq!(view.values_for_all_sites(0)?, vec![vec![6, 5], vec![8, 7]]);
        Ok(())
    }

    #[test]
    fn test_allele_slice() -> Result<()> {
        let taxa = vec![array![[1, 2], [3, 4], [5, 6]]];
        let base = MemoryMatrix3D::new(ScoreType::DepthA, 2, 3, taxa)?;
        let slice = AlleleSlice::new(&base, 2, ScoreType::DepthG)?;
        assert_eq!(slice.score_type(), ScoreType::DepthG);
        assert_eq!(slice.value(0, 1)?, 6);
        assert_eq!(slice.values_for_all_sites(0)?, vec![5, 6]);
        assert!(AlleleSlice::new(&base, 3, ScoreType::DepthT).is_err());
        Ok(())
    }
}
