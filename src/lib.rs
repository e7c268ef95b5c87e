//! # bytescore
//!
//! Byte-encoded storage for large taxon-by-site score matrices.
//!
//! ## Overview
//!
//! Genotype-derived scores (allele depths, allele probabilities, dosages, imputed
//! probabilities) are stored one byte per cell. A matrix is either held densely in memory or
//! read lazily, block by block, from a single-file compressed store. Consumers see both
//! through the same read traits, and can narrow or reorder either without copying through
//! index-translating views.
//!
//! The crate is organised in layers:
//!
//! 1. [`codec`]: quantization of probabilities and depths to bytes.
//! 2. [`store`]: the on-disk container ([`ScoreStore`], [`StoreReader`]).
//! 3. [`matrix`]: the [`Matrix2D`] / [`Matrix3D`] read traits, their memory and disk
//!    backings, and the [`FilterMatrix2D`] / [`FilterMatrix3D`] views.
//! 4. [`builder`]: the mutable construction phase, in memory or streaming into a store.
//! 5. [`score`]: typed score wrappers that decode bytes into depths and probabilities.
//!
//! ## Example
//!
//! ```no_run
//! use bytescore::{AlleleDepthBuilder, FileHeaderBuilder, ScoreStore, ScoreType, Translate};
//!
//! # fn main() -> bytescore::Result<()> {
//! let header = FileHeaderBuilder::new().num_sites(3).build()?;
//! let store = ScoreStore::create("depths.bsc", header)?;
//!
//! let mut builder = AlleleDepthBuilder::for_disk(&store, 3)?;
//! builder.add_taxon(0, &[4, 0, 12], ScoreType::DepthA)?;
//! builder.add_taxon(1, &[1, 1, 1], ScoreType::DepthA)?;
//! let depth = builder.build()?;
//!
//! let view = depth.filtered(&Translate::taxa_subset(vec![1, 0], 3))?;
//! assert_eq!(view.value(1, 2, ScoreType::DepthA)?, 12);
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod codec;
pub mod error;
pub mod matrix;
pub mod parallel;
pub mod score;
mod score_type;
pub mod store;

pub use builder::{Byte2DBuilder, Byte3DBuilder, MatrixBuilder};
pub use error::{Error, Result};
pub use matrix::{
    AlleleSlice, DiskMatrix2D, DiskMatrix3D, FilterMatrix2D, FilterMatrix3D, IndexTranslation,
    Matrix2D, Matrix3D, MemoryMatrix2D, MemoryMatrix3D, Translate,
};
pub use parallel::{TaxonProcessor, process_taxa_parallel, process_taxa_parallel_range};
pub use score::{
    AlleleDepth, AlleleDepthBuilder, AlleleProbability, AlleleProbabilityBuilder, Dosage,
    DosageBuilder, ImputeProbability, ImputeProbabilityBuilder, ReferenceProbability,
    ReferenceProbabilityBuilder, ScoreMatrices,
};
pub use score_type::{
    ALLELE_DEPTH_TYPES, ALLELE_PROBABILITY_TYPES, NUM_NUCLEOTIDE_ALLELES, ScoreType,
};
pub use store::{FileHeader, FileHeaderBuilder, ScoreStore, StoreReader};
