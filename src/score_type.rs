//! Score type tags
//!
//! A [`ScoreType`] names the quantity stored in a byte matrix. The same tag is used as the
//! dataset group inside a store file and as the key of the per-type builder maps.

use std::fmt;

use crate::error::StoreError;

/// The closed set of score tags.
///
/// The discriminant is written to disk and must never be renumbered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ScoreType {
    Dosage = 0,
    ProbA = 1,
    ProbC = 2,
    ProbG = 3,
    ProbT = 4,
    ProbGap = 5,
    ProbInsertion = 6,
    DepthA = 7,
    DepthC = 8,
    DepthG = 9,
    DepthT = 10,
    DepthGap = 11,
    DepthInsertion = 12,
    ReferenceProbability = 13,
    ImputedProbability = 14,
}

/// Number of nucleotide states tracked per site (A, C, G, T, gap, insertion).
pub const NUM_NUCLEOTIDE_ALLELES: usize = 6;

/// Tags consumed by [`AlleleDepth`](crate::AlleleDepth), in nucleotide order.
pub const ALLELE_DEPTH_TYPES: [ScoreType; NUM_NUCLEOTIDE_ALLELES] = [
    ScoreType::DepthA,
    ScoreType::DepthC,
    ScoreType::DepthG,
    ScoreType::DepthT,
    ScoreType::DepthGap,
    ScoreType::DepthInsertion,
];

/// Tags consumed by [`AlleleProbability`](crate::AlleleProbability), in nucleotide order.
pub const ALLELE_PROBABILITY_TYPES: [ScoreType; NUM_NUCLEOTIDE_ALLELES] = [
    ScoreType::ProbA,
    ScoreType::ProbC,
    ScoreType::ProbG,
    ScoreType::ProbT,
    ScoreType::ProbGap,
    ScoreType::ProbInsertion,
];

impl ScoreType {
    /// Every tag, in discriminant order
    pub const ALL: [ScoreType; 15] = [
        Self::Dosage,
        Self::ProbA,
        Self::ProbC,
        Self::ProbG,
        Self::ProbT,
        Self::ProbGap,
        Self::ProbInsertion,
        Self::DepthA,
        Self::DepthC,
        Self::DepthG,
        Self::DepthT,
        Self::DepthGap,
        Self::DepthInsertion,
        Self::ReferenceProbability,
        Self::ImputedProbability,
    ];

    #[must_use]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub fn is_depth(self) -> bool {
        ALLELE_DEPTH_TYPES.contains(&self)
    }

    /// True for every tag whose bytes hold a quantized probability
    #[must_use]
    pub fn is_probability(self) -> bool {
        ALLELE_PROBABILITY_TYPES.contains(&self)
            || matches!(self, Self::ReferenceProbability | Self::ImputedProbability)
    }

    /// Position of the nucleotide state (A=0 .. insertion=5) for per-allele tags
    #[must_use]
    pub fn allele_index(self) -> Option<usize> {
        ALLELE_DEPTH_TYPES
            .iter()
            .position(|&t| t == self)
            .or_else(|| ALLELE_PROBABILITY_TYPES.iter().position(|&t| t == self))
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Dosage => "Dosage",
            Self::ProbA => "ProbA",
            Self::ProbC => "ProbC",
            Self::ProbG => "ProbG",
            Self::ProbT => "ProbT",
            Self::ProbGap => "ProbGap",
            Self::ProbInsertion => "ProbInsertion",
            Self::DepthA => "DepthA",
            Self::DepthC => "DepthC",
            Self::DepthG => "DepthG",
            Self::DepthT => "DepthT",
            Self::DepthGap => "DepthGap",
            Self::DepthInsertion => "DepthInsertion",
            Self::ReferenceProbability => "ReferenceProbability",
            Self::ImputedProbability => "ImputedProbability",
        }
    }
}

impl TryFrom<u8> for ScoreType {
    type Error = StoreError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(value as usize)
            .copied()
            .ok_or(StoreError::UnknownScoreType(value))
    }
}

impl fmt::Display for ScoreType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod testing {
    use super::*;

    #[test]
    fn test_discriminant_roundtrip() {
        for score_type in ScoreType::ALL {
            assert_eq!(ScoreType::try_from(score_type.as_u8()).unwrap(), score_type);
        }
    }

    #[test]
    fn test_unknown_discriminant() {
        assert!(matches!(
            ScoreType::try_from(200),
            Err(StoreError::UnknownScoreType(200))
        ));
    }

    #[test]
    fn test_allele_index() {
        assert_eq!(ScoreType::DepthA.allele_index(), Some(0));
        assert_eq!(ScoreType::ProbInsertion.allele_index(), Some(5));
        assert_eq!(ScoreType::Dosage.allele_index(), None);
    }

    #[test]
    fn test_categories() {
        assert!(ScoreType::DepthGap.is_depth());
        assert!(!ScoreType::DepthGap.is_probability());
        assert!(ScoreType::ImputedProbability.is_probability());
        assert!(!ScoreType::Dosage.is_probability());
        assert!(!ScoreType::Dosage.is_depth());
    }

    #[test]
    fn test_display() {
        assert_eq!(ScoreType::ReferenceProbability.to_string(), "ReferenceProbability");
    }
}
