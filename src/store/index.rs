use bytemuck::{Pod, Zeroable};

use super::INDEX_MAGIC;
use crate::{Result, ScoreType, error::StoreError};

/// The header for the compressed index.
///
/// This is stored identically in memory and on disk.
#[derive(Debug, Clone, Copy, Zeroable, Pod)]
#[repr(C)]
pub struct IndexHeader {
    /// Magic number identifying the index format
    magic: [u8; 8],

    /// Number of dataset entries in the index
    pub(crate) num_datasets: u64,

    /// Number of block ranges in the index
    pub(crate) num_blocks: u64,

    /// Number of bytes in the compressed index
    pub(crate) z_bytes: u64,
}
impl IndexHeader {
    #[must_use]
    pub fn new(num_datasets: u64, num_blocks: u64, z_bytes: u64) -> Self {
        Self {
            magic: *INDEX_MAGIC,
            num_datasets,
            num_blocks,
            z_bytes,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header: Self = bytemuck::pod_read_unaligned(bytes);
        if header.magic != *INDEX_MAGIC {
            return Err(StoreError::InvalidIndexHeaderMagic.into());
        }
        Ok(header)
    }

    /// Number of bytes in the decoded index
    #[must_use]
    pub fn u_bytes(&self) -> usize {
        self.num_datasets as usize * size_of::<DatasetEntry>()
            + self.num_blocks as usize * size_of::<BlockRange>()
    }
}

/// The footer for the compressed index.
///
/// This is stored identically in memory and on disk.
#[derive(Debug, Clone, Copy, Zeroable, Pod)]
#[repr(C)]
pub struct IndexFooter {
    /// Number of bytes in the compressed index
    pub(crate) bytes: u64,

    /// Magic number identifying the index format
    magic: [u8; 8],
}
impl IndexFooter {
    #[must_use]
    pub fn new(bytes: u64) -> Self {
        Self {
            bytes,
            magic: *INDEX_MAGIC,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let footer: Self = bytemuck::pod_read_unaligned(bytes);
        if footer.magic != *INDEX_MAGIC {
            return Err(StoreError::InvalidIndexFooterMagic.into());
        }
        Ok(footer)
    }
}

/// One taxon's row for one score type
///
/// This is stored identically in memory and on disk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Zeroable, Pod, Default)]
#[repr(C)]
pub struct DatasetEntry {
    /// Taxon index of the row
    pub(crate) taxon: u64,

    /// Position of the row's first block in the block table
    pub(crate) first_block: u64,

    /// Number of consecutive blocks belonging to the row
    pub(crate) num_blocks: u64,

    /// Number of allele planes in every block (1 for two-dimensional scores)
    pub(crate) num_alleles: u32,

    /// [`ScoreType`] discriminant
    pub(crate) score_type: u8,

    padding: [u8; 3],
}
impl DatasetEntry {
    #[must_use]
    pub fn new(
        score_type: ScoreType,
        taxon: usize,
        num_alleles: usize,
        first_block: usize,
        num_blocks: usize,
    ) -> Self {
        Self {
            taxon: taxon as u64,
            first_block: first_block as u64,
            num_blocks: num_blocks as u64,
            num_alleles: num_alleles as u32,
            score_type: score_type.as_u8(),
            padding: [0; 3],
        }
    }

    pub fn score_type(&self) -> Result<ScoreType> {
        Ok(ScoreType::try_from(self.score_type)?)
    }

    #[must_use]
    pub fn taxon(&self) -> usize {
        self.taxon as usize
    }

    #[must_use]
    pub fn num_alleles(&self) -> usize {
        self.num_alleles as usize
    }

    #[must_use]
    pub fn num_blocks(&self) -> usize {
        self.num_blocks as usize
    }

    /// Position of the `block`-th block of this row in the block table
    #[must_use]
    pub fn block_position(&self, block: usize) -> Option<usize> {
        (block < self.num_blocks()).then(|| self.first_block as usize + block)
    }
}

/// Location of one compressed block in the store file
///
/// This is stored identically in memory and on disk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Zeroable, Pod, Default)]
#[repr(C)]
pub struct BlockRange {
    /// Byte offset of the compressed block
    pub(crate) offset: u64,

    /// Number of compressed bytes
    pub(crate) z_len: u64,

    /// Number of bytes once decompressed
    pub(crate) u_len: u64,
}
impl BlockRange {
    #[must_use]
    pub fn new(offset: u64, z_len: u64, u_len: u64) -> Self {
        Self {
            offset,
            z_len,
            u_len,
        }
    }

    #[must_use]
    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset as usize..(self.offset + self.z_len) as usize
    }
}

/// The dataset and block tables of a store
#[derive(Clone, Default)]
pub struct StoreIndex {
    pub(crate) datasets: Vec<DatasetEntry>,
    pub(crate) blocks: Vec<BlockRange>,
}
impl StoreIndex {
    /// Decodes the index tables from the uncompressed index bytes
    pub fn from_bytes(bytes: &[u8], header: &IndexHeader) -> Result<Self> {
        if bytes.len() != header.u_bytes() {
            return Err(StoreError::IndexSizeMismatch {
                expected: header.u_bytes(),
                actual: bytes.len(),
            }
            .into());
        }
        let split = header.num_datasets as usize * size_of::<DatasetEntry>();
        let datasets = bytemuck::pod_collect_to_vec(&bytes[..split]);
        let blocks = bytemuck::pod_collect_to_vec(&bytes[split..]);
        Ok(Self { datasets, blocks })
    }

    /// Returns the uncompressed index bytes: the dataset table followed by the block table
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(
            self.datasets.len() * size_of::<DatasetEntry>()
                + self.blocks.len() * size_of::<BlockRange>(),
        );
        bytes.extend_from_slice(bytemuck::cast_slice(&self.datasets));
        bytes.extend_from_slice(bytemuck::cast_slice(&self.blocks));
        bytes
    }

    /// Encodes the index into a ZSTD-compressed byte array
    pub fn encoded(&self) -> Result<Vec<u8>> {
        Ok(zstd::bulk::compress(&self.to_bytes(), 0)?)
    }

    #[must_use]
    pub fn header(&self, z_bytes: usize) -> IndexHeader {
        IndexHeader::new(
            self.datasets.len() as u64,
            self.blocks.len() as u64,
            z_bytes as u64,
        )
    }

    #[must_use]
    pub fn num_datasets(&self) -> usize {
        self.datasets.len()
    }

    #[must_use]
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }
}

#[cfg(test)]
mod testing {
    use super::*;
    use crate::Error;

    #[test]
    fn test_record_sizes() {
        assert_eq!(size_of::<IndexHeader>(), 32);
        assert_eq!(size_of::<IndexFooter>(), 16);
        assert_eq!(size_of::<DatasetEntry>(), 32);
        assert_eq!(size_of::<BlockRange>(), 24);
    }

    #[test]
    fn test_index_roundtrip() -> Result<()> {
        let index = StoreIndex {
            datasets: vec![
                DatasetEntry::new(ScoreType::DepthA, 0, 1, 0, 2),
                DatasetEntry::new(ScoreType::DepthC, 3, 1, 2, 2),
            ],
            blocks: vec![
                BlockRange::new(64, 10, 4),
                BlockRange::new(74, 9, 2),
                BlockRange::new(83, 11, 4),
                BlockRange::new(94, 8, 2),
            ],
        };
        let encoded = index.encoded()?;
        let header = index.header(encoded.len());
        let decoded = zstd::bulk::decompress(&encoded, header.u_bytes())?;
        let parsed = StoreIndex::from_bytes(&decoded, &header)?;
        assert_eq!(parsed.datasets, index.datasets);
        assert_eq!(parsed.blocks, index.blocks);
        assert_eq!(parsed.datasets[1].score_type()?, ScoreType::DepthC);
        assert_eq!(parsed.datasets[1].block_position(1), Some(3));
        assert_eq!(parsed.datasets[1].block_position(2), None);
        Ok(())
    }

    #[test]
    fn test_index_size_mismatch() {
        let header = IndexHeader::new(1, 1, 0);
        let result = StoreIndex::from_bytes(&[0u8; 10], &header);
        assert!(matches!(
            result,
            Err(Error::StoreError(StoreError::IndexSizeMismatch { .. }))
        ));
    }

    #[test]
    fn test_index_magic() {
        let mut header = IndexHeader::new(0, 0, 0).as_bytes().to_vec();
        header[0] = 0;
        assert!(IndexHeader::from_bytes(&header).is_err());
        let mut footer = IndexFooter::new(0).as_bytes().to_vec();
        footer[15] = 0;
        assert!(IndexFooter::from_bytes(&footer).is_err());
    }
}
