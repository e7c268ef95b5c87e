use std::{collections::BTreeMap, fs, path::Path};

use log::debug;
use memmap2::Mmap;

use super::{BlockRange, DatasetEntry, FileHeader, IndexFooter, IndexHeader, StoreIndex};
use crate::{
    Result, ScoreType,
    error::{MissingDataError, StoreError},
};

/// Datasets of one score type, addressed by taxon index
struct ScoreGroup {
    /// Written taxa only; gaps are taxa that were never written
    taxa: BTreeMap<usize, DatasetEntry>,
    num_alleles: usize,
}

/// A memory-mapped, read-only view of a finished store file.
///
/// The reader validates the file header and the trailing index on open and then serves
/// block reads straight out of the map.
pub struct StoreReader {
    inner: Mmap,
    header: FileHeader,
    groups: BTreeMap<ScoreType, ScoreGroup>,
    blocks: Vec<BlockRange>,
}
impl StoreReader {
    /// Opens and validates a store file
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * The file cannot be opened or mapped
    /// * The file or index header is invalid
    /// * The file is truncated
    /// * The datasets of one score type disagree on their allele count
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = fs::File::open(path.as_ref())?;

        // Safety: the store is finished before it is mapped and never rewritten in place
        let inner = unsafe { Mmap::map(&file) }?;

        let header = FileHeader::from_bytes(&inner)?;
        let index = Self::load_index(&inner)?;

        let mut groups: BTreeMap<ScoreType, ScoreGroup> = BTreeMap::new();
        for entry in index.datasets {
            let score_type = entry.score_type()?;
            Self::validate_entry(&header, &index.blocks, &entry)?;
            let group = groups.entry(score_type).or_insert_with(|| ScoreGroup {
                taxa: BTreeMap::new(),
                num_alleles: entry.num_alleles(),
            });
            if group.num_alleles != entry.num_alleles() {
                return Err(StoreError::InconsistentAlleles {
                    score_type,
                    expected: group.num_alleles,
                    found: entry.num_alleles(),
                }
                .into());
            }
            if group.taxa.insert(entry.taxon(), entry).is_some() {
                return Err(StoreError::CorruptDataset {
                    taxon: entry.taxon,
                    reason: "taxon written twice for one score type",
                }
                .into());
            }
        }
        for range in &index.blocks {
            let in_file = range
                .offset
                .checked_add(range.z_len)
                .is_some_and(|end| end <= inner.len() as u64);
            if range.offset < size_of::<FileHeader>() as u64 || !in_file {
                return Err(StoreError::FileTruncation(inner.len()).into());
            }
        }

        debug!(
            "opened score store: {} sites, block size {}, {} score types, {} blocks",
            header.num_sites,
            header.block_size,
            groups.len(),
            index.blocks.len()
        );

        Ok(Self {
            inner,
            header,
            groups,
            blocks: index.blocks,
        })
    }

    /// Checks a dataset entry against the file header and the block table
    fn validate_entry(header: &FileHeader, blocks: &[BlockRange], entry: &DatasetEntry) -> Result<()> {
        let corrupt = |reason| StoreError::CorruptDataset {
            taxon: entry.taxon,
            reason,
        };
        if !usize::try_from(entry.taxon).is_ok_and(|taxon| taxon < usize::MAX) {
            return Err(corrupt("taxon index out of range").into());
        }
        if entry.num_alleles() == 0 {
            return Err(corrupt("no allele planes").into());
        }
        if entry.num_blocks() != header.num_blocks() {
            return Err(corrupt("block count disagrees with the file header").into());
        }
        let first = entry.first_block as usize;
        let ranges = first
            .checked_add(entry.num_blocks())
            .and_then(|end| blocks.get(first..end))
            .ok_or_else(|| corrupt("blocks past the end of the block table"))?;
        for (block, range) in ranges.iter().enumerate() {
            let expected = entry.num_alleles().checked_mul(header.block_len(block));
            if expected != usize::try_from(range.u_len).ok() {
                return Err(corrupt("decoded block length disagrees with the file header").into());
            }
        }
        Ok(())
    }

    fn load_index(inner: &[u8]) -> Result<StoreIndex> {
        let min_len = size_of::<FileHeader>() + size_of::<IndexHeader>() + size_of::<IndexFooter>();
        if inner.len() < min_len {
            return Err(StoreError::FileTruncation(inner.len()).into());
        }

        // Load the index footer
        let footer_start = inner.len() - size_of::<IndexFooter>();
        let footer = IndexFooter::from_bytes(&inner[footer_start..])?;

        // Find the coordinates of the compressed index
        let z_index_start = footer_start
            .checked_sub(footer.bytes as usize)
            .filter(|&start| start >= size_of::<FileHeader>() + size_of::<IndexHeader>())
            .ok_or(StoreError::FileTruncation(inner.len()))?;
        let iheader_start = z_index_start - size_of::<IndexHeader>();
        let iheader = IndexHeader::from_bytes(&inner[iheader_start..z_index_start])?;

        // Decompress the index
        let index_buf = zstd::bulk::decompress(&inner[z_index_start..footer_start], iheader.u_bytes())?;
        StoreIndex::from_bytes(&index_buf, &iheader)
    }

    #[must_use]
    pub fn header(&self) -> FileHeader {
        self.header
    }

    #[must_use]
    pub fn num_sites(&self) -> usize {
        self.header.num_sites()
    }

    #[must_use]
    pub fn block_size(&self) -> usize {
        self.header.block_size()
    }

    /// Score types with at least one dataset in the store
    pub fn score_types(&self) -> impl Iterator<Item = ScoreType> + '_ {
        self.groups.keys().copied()
    }

    #[must_use]
    pub fn contains(&self, score_type: ScoreType) -> bool {
        self.groups.contains_key(&score_type)
    }

    /// Number of taxa for a score type: the highest written taxon index plus one
    #[must_use]
    pub fn num_taxa(&self, score_type: ScoreType) -> usize {
        self.groups
            .get(&score_type)
            .and_then(|group| group.taxa.last_key_value())
            .map_or(0, |(&taxon, _)| taxon + 1)
    }

    /// Number of allele planes stored for a score type
    pub fn num_alleles(&self, score_type: ScoreType) -> Result<usize> {
        self.groups
            .get(&score_type)
            .map(|group| group.num_alleles)
            .ok_or_else(|| MissingDataError::ScoreType(score_type).into())
    }

    /// Taxon indices written for a score type, ascending
    pub fn taxa(&self, score_type: ScoreType) -> impl Iterator<Item = usize> + '_ {
        self.groups
            .get(&score_type)
            .into_iter()
            .flat_map(|group| group.taxa.keys().copied())
    }

    fn dataset(&self, score_type: ScoreType, taxon: usize) -> Result<&DatasetEntry> {
        self.groups
            .get(&score_type)
            .and_then(|group| group.taxa.get(&taxon))
            .ok_or_else(|| MissingDataError::Taxon { score_type, taxon }.into())
    }

    /// Reads and decompresses one block of one taxon's row.
    ///
    /// The returned bytes are allele-major: `num_alleles` runs of the block's sites.
    pub fn read_block(&self, score_type: ScoreType, taxon: usize, block: usize) -> Result<Vec<u8>> {
        let entry = self.dataset(score_type, taxon)?;
        let range = entry
            .block_position(block)
            .and_then(|position| self.blocks.get(position))
            .ok_or(MissingDataError::Block {
                score_type,
                taxon,
                block,
            })?;

        let expected = range.u_len as usize;
        let decoded = zstd::bulk::decompress(&self.inner[range.range()], expected)?;
        if decoded.len() != expected {
            return Err(StoreError::CorruptBlock {
                offset: range.offset,
                expected,
                actual: decoded.len(),
            }
            .into());
        }
        Ok(decoded)
    }

    /// Reads a full row as allele-major bytes (`num_alleles * num_sites`)
    pub fn read_row(&self, score_type: ScoreType, taxon: usize) -> Result<Vec<u8>> {
        let entry = *self.dataset(score_type, taxon)?;
        let num_sites = self.num_sites();
        let mut row = vec![0; entry.num_alleles() * num_sites];
        for block in 0..entry.num_blocks() {
            let start = block * self.block_size();
            let len = self.header.block_len(block);
            let bytes = self.read_block(score_type, taxon, block)?;
            for (allele, chunk) in bytes.chunks_exact(len).enumerate() {
                let offset = allele * num_sites + start;
                row[offset..offset + len].copy_from_slice(chunk);
            }
        }
        Ok(row)
    }
}
