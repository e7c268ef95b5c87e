use std::sync::Arc;

use super::{ScoreBuilders, ScoreMatrices};
use crate::{
    ALLELE_PROBABILITY_TYPES, NUM_NUCLEOTIDE_ALLELES, Result, ScoreType,
    builder::check_row,
    codec::{decode_probabilities, decode_probability, encode_probabilities, encode_probability},
    matrix::{Matrix2D, Translate},
    store::ScoreStore,
};

const CONTEXT: &str = "allele probability";

/// Probability per nucleotide allele: one matrix per `Prob*` score type.
///
/// Values are quantized to 1/255 steps.
pub struct AlleleProbability<'a> {
    matrices: ScoreMatrices<'a>,
}
impl<'a> AlleleProbability<'a> {
    pub fn new(matrices: ScoreMatrices<'a>) -> Result<Self> {
        matrices.require(&ALLELE_PROBABILITY_TYPES)?;
        Ok(Self { matrices })
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

    pub fn value(&self, taxon: usize, site: usize, score_type: ScoreType) -> Result<f32> {
        self.matrix(score_type)?
            .value(taxon, site)
            .map(decode_probability)
    }

    pub fn site_probabilities(
        &self,
        taxon: usize,
        site: usize,
    ) -> Result<[f32; NUM_NUCLEOTIDE_ALLELES]> {
        let mut probabilities = [0.0; NUM_NUCLEOTIDE_ALLELES];
        for (probability, &score_type) in probabilities
            .iter_mut()
            .zip(ALLELE_PROBABILITY_TYPES.iter())
        {
            *probability = self.value(taxon, site, score_type)?;
        }
        Ok(probabilities)
    }

    pub fn values_for_all_sites(&self, taxon: usize, score_type: ScoreType) -> Result<Vec<f32>> {
        let bytes = self.matrix(score_type)?.values_for_all_sites(taxon)?;
        Ok(decode_probabilities(&bytes))
    }

    pub fn filtered(&self, translate: &Translate) -> Result<AlleleProbability<'_>> {
        Ok(AlleleProbability {
            matrices: self.matrices.filtered(translate)?,
        })
    }
}

/// Builds an [`AlleleProbability`]; values outside `[0, 1]` are rejected
pub struct AlleleProbabilityBuilder {
    builders: ScoreBuilders,
}
impl AlleleProbabilityBuilder {
    #[must_use]
    pub fn for_memory(num_taxa: usize, num_sites: usize) -> Self {
        Self {
            builders: ScoreBuilders::for_memory(
                CONTEXT,
                &ALLELE_PROBABILITY_TYPES,
                num_taxa,
                num_sites,
            ),
        }
    }

    pub fn for_disk(store: &Arc<ScoreStore>, num_sites: usize) -> Result<Self> {
        Ok(Self {
            builders: ScoreBuilders::for_disk(
                CONTEXT,
                &ALLELE_PROBABILITY_TYPES,
                store,
                num_sites,
            )?,
        })
    }

    pub fn set_probability(
        &mut self,
        taxon: usize,
        site: usize,
        score_type: ScoreType,
        value: f32,
    ) -> Result<()> {
        let byte = encode_probability(value)?;
        self.builders.get_mut(score_type)?.set(taxon, site, byte)
    }

    pub fn set_probability_range_for_taxon(
        &mut self,
        taxon: usize,
        site_offset: usize,
        score_type: ScoreType,
        values: &[f32],
    ) -> Result<()> {
        let bytes = encode_probabilities(values)?;
        self.builders
            .get_mut(score_type)?
            .set_range_for_taxon(taxon, site_offset, &bytes)
    }

    pub fn add_taxon(&mut self, taxon: usize, values: &[f32], score_type: ScoreType) -> Result<()> {
        let bytes = encode_probabilities(values)?;
        self.builders.get_mut(score_type)?.add_taxon(taxon, &bytes)
    }

    /// Adds the rows of all six alleles for `taxon`, in [`ALLELE_PROBABILITY_TYPES`] order.
    ///
    /// Every row is encoded and checked before the first one is written.
    pub fn add_taxon_alleles<V: AsRef<[f32]>>(&mut self, taxon: usize, values: &[V]) -> Result<()> {
        check_row("alleles", NUM_NUCLEOTIDE_ALLELES, values.len())?;
        let mut encoded = Vec::with_capacity(NUM_NUCLEOTIDE_ALLELES);
        for (row, &score_type) in values.iter().zip(ALLELE_PROBABILITY_TYPES.iter()) {
            let row = row.as_ref();
            check_row("sites", self.builders.get_mut(score_type)?.num_sites(), row.len())?;
            encoded.push((score_type, encode_probabilities(row)?));
        }
        for (score_type, bytes) in encoded {
            self.builders.get_mut(score_type)?.add_taxon(taxon, &bytes)?;
        }
        Ok(())
    }

    pub fn build(&mut self) -> Result<AlleleProbability<'static>> {
        AlleleProbability::new(self.builders.build()?)
    }
}
