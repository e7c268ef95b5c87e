//! Scores backed by a single matrix

use std::sync::Arc;

use super::{ScoreBuilders, ScoreMatrices};
use crate::{
    Result, ScoreType,
    codec::{decode_probabilities, decode_probability, encode_probabilities, encode_probability},
    matrix::{Matrix2D, Translate},
    store::ScoreStore,
};

/// Allele dosage, stored as the raw byte
pub struct Dosage<'a> {
    matrices: ScoreMatrices<'a>,
}
impl<'a> Dosage<'a> {
    const SCORE_TYPE: ScoreType = ScoreType::Dosage;
    const CONTEXT: &'static str = "dosage";

    pub fn new(matrices: ScoreMatrices<'a>) -> Result<Self> {
        matrices.require(&[Self::SCORE_TYPE])?;
        Ok(Self { matrices })
    }

    /// Wraps any `Dosage` matrix
    pub fn from_matrix<M: Matrix2D + 'a>(matrix: M) -> Result<Self> {
        let matrix: Box<dyn Matrix2D + 'a> = Box::new(matrix);
        Self::new(ScoreMatrices::new([matrix])?)
    }

    pub fn matrix(&self) -> Result<&(dyn Matrix2D + 'a)> {
        self.matrices.matrix(Self::SCORE_TYPE, Self::CONTEXT)
    }

    #[must_use]
    pub fn num_taxa(&self) -> usize {
        self.matrices.num_taxa()
    }

    #[must_use]
    pub fn num_sites(&self) -> usize {
        self.matrices.num_sites()
    }

    pub fn value(&self, taxon: usize, site: usize) -> Result<u8> {
        self.matrix()?.value(taxon, site)
    }

    pub fn values_for_all_sites(&self, taxon: usize) -> Result<Vec<u8>> {
        self.matrix()?.values_for_all_sites(taxon)
    }

    pub fn filtered(&self, translate: &Translate) -> Result<Dosage<'_>> {
        Ok(Dosage {
            matrices: self.matrices.filtered(translate)?,
        })
    }
}

pub struct DosageBuilder {
    builders: ScoreBuilders,
}
impl DosageBuilder {
    #[must_use]
    pub fn for_memory(num_taxa: usize, num_sites: usize) -> Self {
        Self {
            builders: ScoreBuilders::for_memory(
                Dosage::CONTEXT,
                &[Dosage::SCORE_TYPE],
                num_taxa,
                num_sites,
            ),
        }
    }

    pub fn for_disk(store: &Arc<ScoreStore>, num_sites: usize) -> Result<Self> {
        Ok(Self {
            builders: ScoreBuilders::for_disk(
                Dosage::CONTEXT,
                &[Dosage::SCORE_TYPE],
                store,
                num_sites,
            )?,
        })
    }

    pub fn set(&mut self, taxon: usize, site: usize, value: u8) -> Result<()> {
        self.builders
            .get_mut(Dosage::SCORE_TYPE)?
            .set(taxon, site, value)
    }

    pub fn set_range_for_taxon(
        &mut self,
        taxon: usize,
        site_offset: usize,
        values: &[u8],
    ) -> Result<()> {
        self.builders
            .get_mut(Dosage::SCORE_TYPE)?
            .set_range_for_taxon(taxon, site_offset, values)
    }

    pub fn add_taxon(&mut self, taxon: usize, values: &[u8]) -> Result<()> {
        self.builders
            .get_mut(Dosage::SCORE_TYPE)?
            .add_taxon(taxon, values)
    }

    pub fn build(&mut self) -> Result<Dosage<'static>> {
        Dosage::new(self.builders.build()?)
    }
}

/// Defines a single-matrix score of quantized probabilities and its builder
macro_rules! probability_score {
    ($(#[$meta:meta])* $score:ident, $builder:ident, $score_type:expr, $context:literal) => {
        $(#[$meta])*
        pub struct $score<'a> {
            matrices: ScoreMatrices<'a>,
        }
        impl<'a> $score<'a> {
            const SCORE_TYPE: ScoreType = $score_type;
            const CONTEXT: &'static str = $context;

            pub fn new(matrices: ScoreMatrices<'a>) -> Result<Self> {
                matrices.require(&[Self::SCORE_TYPE])?;
                Ok(Self { matrices })
            }

            pub fn from_matrix<M: Matrix2D + 'a>(matrix: M) -> Result<Self> {
                let matrix: Box<dyn Matrix2D + 'a> = Box::new(matrix);
                Self::new(ScoreMatrices::new([matrix])?)
            }

            pub fn matrix(&self) -> Result<&(dyn Matrix2D + 'a)> {
                self.matrices.matrix(Self::SCORE_TYPE, Self::CONTEXT)
            }

            #[must_use]
            pub fn num_taxa(&self) -> usize {
                self.matrices.num_taxa()
            }

            #[must_use]
            pub fn num_sites(&self) -> usize {
                self.matrices.num_sites()
            }

            pub fn value(&self, taxon: usize, site: usize) -> Result<f32> {
                self.matrix()?.value(taxon, site).map(decode_probability)
            }

            pub fn values_for_all_sites(&self, taxon: usize) -> Result<Vec<f32>> {
                let bytes = self.matrix()?.values_for_all_sites(taxon)?;
                Ok(decode_probabilities(&bytes))
            }

            pub fn filtered(&self, translate: &Translate) -> Result<$score<'_>> {
                Ok($score {
                    matrices: self.matrices.filtered(translate)?,
                })
            }
        }

        pub struct $builder {
            builders: ScoreBuilders,
        }
        impl $builder {
            #[must_use]
            pub fn for_memory(num_taxa: usize, num_sites: usize) -> Self {
                Self {
                    builders: ScoreBuilders::for_memory(
                        $score::CONTEXT,
                        &[$score::SCORE_TYPE],
                        num_taxa,
                        num_sites,
                    ),
                }
            }

            pub fn for_disk(store: &Arc<ScoreStore>, num_sites: usize) -> Result<Self> {
                Ok(Self {
                    builders: ScoreBuilders::for_disk(
                        $score::CONTEXT,
                        &[$score::SCORE_TYPE],
                        store,
                        num_sites,
                    )?,
                })
            }

            pub fn set(&mut self, taxon: usize, site: usize, value: f32) -> Result<()> {
                let byte = encode_probability(value)?;
                self.builders
                    .get_mut($score::SCORE_TYPE)?
                    .set(taxon, site, byte)
            }

            pub fn set_range_for_taxon(
                &mut self,
                taxon: usize,
                site_offset: usize,
                values: &[f32],
            ) -> Result<()> {
                let bytes = encode_probabilities(values)?;
                self.builders
                    .get_mut($score::SCORE_TYPE)?
                    .set_range_for_taxon(taxon, site_offset, &bytes)
            }

            pub fn add_taxon(&mut self, taxon: usize, values: &[f32]) -> Result<()> {
                let bytes = encode_probabilities(values)?;
                self.builders
                    .get_mut($score::SCORE_TYPE)?
                    .add_taxon(taxon, &bytes)
            }

            pub fn build(&mut self) -> Result<$score<'static>> {
                $score::new(self.builders.build()?)
            }
        }
    };
}

probability_score!(
    /// Probability of the reference allele
    ReferenceProbability,
    ReferenceProbabilityBuilder,
    ScoreType::ReferenceProbability,
    "reference probability"
);

probability_score!(
    /// Probability assigned by imputation
    ImputeProbability,
    ImputeProbabilityBuilder,
    ScoreType::ImputedProbability,
    "impute probability"
);
