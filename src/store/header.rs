use bytemuck::{Pod, Zeroable};

use super::{DEFAULT_BLOCK_SIZE, DEFAULT_COMPRESSION_LEVEL, FILE_MAGIC, FILE_VERSION};
use crate::{
    Result,
    error::{StoreError, UsageError},
};

/// The file header of a score store.
///
/// This is stored identically in memory and on disk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Zeroable, Pod)]
#[repr(C)]
pub struct FileHeader {
    // File Type Metadata (8 bytes)
    /// File magic number
    magic: [u8; 7],
    /// File version number
    pub version: u8,

    // Configuration (24 bytes)
    /// Number of sites in every dataset of the store
    pub num_sites: u64,
    /// Number of sites per block (the unit of I/O and caching)
    pub block_size: u64,
    /// zstd compression level for blocks
    pub compression_level: u64,

    /// Reserved for future use
    reserved: [u8; 32],
}
impl FileHeader {
    #[must_use]
    pub fn new(num_sites: u64, block_size: u64, compression_level: u64) -> Self {
        Self {
            magic: *FILE_MAGIC,
            version: FILE_VERSION,
            num_sites,
            block_size,
            compression_level,
            reserved: [0; 32],
        }
    }

    #[must_use]
    pub fn num_sites(&self) -> usize {
        self.num_sites as usize
    }

    #[must_use]
    pub fn block_size(&self) -> usize {
        self.block_size as usize
    }

    /// Number of blocks a full row of sites is split into
    #[must_use]
    pub fn num_blocks(&self) -> usize {
        self.num_sites().div_ceil(self.block_size())
    }

    /// Number of sites held by `block`, accounting for a short final block
    #[must_use]
    pub fn block_len(&self, block: usize) -> usize {
        let start = block * self.block_size();
        self.block_size().min(self.num_sites().saturating_sub(start))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < size_of::<Self>() {
            return Err(StoreError::FileTruncation(bytes.len()).into());
        }
        let header: Self = bytemuck::pod_read_unaligned(&bytes[..size_of::<Self>()]);
        if header.magic != *FILE_MAGIC {
            return Err(StoreError::InvalidFileHeaderMagic.into());
        }
        if header.version != FILE_VERSION {
            return Err(StoreError::InvalidFormatVersion(header.version).into());
        }
        if header.block_size == 0 {
            return Err(StoreError::InvalidBlockSize(header.block_size).into());
        }
        Ok(header)
    }
}

/// Builder for [`FileHeader`]
///
/// `num_sites` is required; block size and compression fall back to the crate defaults.
#[derive(Default)]
pub struct FileHeaderBuilder {
    num_sites: Option<usize>,
    block_size: Option<usize>,
    compression_level: Option<u64>,
}
impl FileHeaderBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn num_sites(mut self, num_sites: usize) -> Self {
        self.num_sites = Some(num_sites);
        self
    }

    #[must_use]
    pub fn block_size(mut self, block_size: usize) -> Self {
        self.block_size = Some(block_size);
        self
    }

    #[must_use]
    pub fn compression_level(mut self, level: u64) -> Self {
        self.compression_level = Some(level);
        self
    }

    pub fn build(self) -> Result<FileHeader> {
        let Some(num_sites) = self.num_sites else {
            return Err(UsageError::InvalidConfiguration("missing number of sites").into());
        };
        let block_size = self.block_size.unwrap_or(DEFAULT_BLOCK_SIZE);
        if block_size == 0 {
            return Err(UsageError::InvalidConfiguration("block size must be positive").into());
        }
        Ok(FileHeader::new(
            num_sites as u64,
            block_size as u64,
            self.compression_level.unwrap_or(DEFAULT_COMPRESSION_LEVEL),
        ))
    }
}
