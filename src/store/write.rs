use std::{collections::HashSet, io};

use super::{BlockRange, DatasetEntry, FileHeader, IndexFooter, StoreIndex};
use crate::{
    Result, ScoreType,
    error::UsageError,
};

/// A taxon row split into compressed blocks, ready to be appended to a store.
///
/// Encoding is independent of the writer so that it can run outside the writer lock.
pub struct EncodedDataset {
    pub(crate) score_type: ScoreType,
    pub(crate) taxon: usize,
    pub(crate) num_alleles: usize,
    /// Compressed block bytes and their decoded lengths
    pub(crate) blocks: Vec<(Vec<u8>, usize)>,
}
impl EncodedDataset {
    /// Splits an allele-major row (`num_alleles` planes of `num_sites` bytes) into blocks.
    ///
    /// Each block holds the block's sites for every allele plane, allele-major.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::SizeMismatch`] if `row` is not `num_alleles * num_sites` long.
    pub fn encode(
        header: &FileHeader,
        score_type: ScoreType,
        taxon: usize,
        num_alleles: usize,
        row: &[u8],
    ) -> Result<Self> {
        let num_sites = header.num_sites();
        if row.len() != num_alleles * num_sites {
            return Err(UsageError::SizeMismatch {
                what: "values in row",
                expected: num_alleles * num_sites,
                actual: row.len(),
            }
            .into());
        }

        let mut scratch = Vec::with_capacity(num_alleles * header.block_size().min(num_sites));
        let mut blocks = Vec::with_capacity(header.num_blocks());
        for block in 0..header.num_blocks() {
            let start = block * header.block_size();
            let len = header.block_len(block);
            scratch.clear();
            for plane in row.chunks_exact(num_sites) {
                scratch.extend_from_slice(&plane[start..start + len]);
            }
            let compressed = zstd::bulk::compress(&scratch, header.compression_level as i32)?;
            blocks.push((compressed, scratch.len()));
        }

        Ok(Self {
            score_type,
            taxon,
            num_alleles,
            blocks,
        })
    }
}

/// Appends encoded datasets to a store and writes the index on [`finish`](Self::finish).
pub struct StoreWriter<W: io::Write> {
    /// Internal writer for the store
    inner: W,

    header: FileHeader,

    /// Dataset and block tables accumulated so far
    index: StoreIndex,

    /// Byte offset of the next block
    offset: u64,

    /// Every (score type, taxon) already written
    written: HashSet<(ScoreType, usize)>,
}
impl<W: io::Write> StoreWriter<W> {
    /// Creates a new writer with the header written to the inner writer
    pub fn new(mut inner: W, header: FileHeader) -> Result<Self> {
        if header.block_size == 0 {
            return Err(UsageError::InvalidConfiguration("block size must be positive").into());
        }
        inner.write_all(header.as_bytes())?;
        Ok(Self {
            inner,
            header,
            index: StoreIndex::default(),
            offset: size_of::<FileHeader>() as u64,
            written: HashSet::default(),
        })
    }

    pub fn header(&self) -> FileHeader {
        self.header
    }

    /// Number of datasets appended so far
    pub fn num_datasets(&self) -> usize {
        self.index.num_datasets()
    }

    /// Writes every block of `dataset` and registers it in the index
    pub fn append(&mut self, dataset: EncodedDataset) -> Result<()> {
        let key = (dataset.score_type, dataset.taxon);
        if self.written.contains(&key) {
            return Err(UsageError::DuplicateTaxon {
                score_type: dataset.score_type,
                taxon: dataset.taxon,
            }
            .into());
        }

        let first_block = self.index.num_blocks();
        for (z_block, u_len) in &dataset.blocks {
            self.inner.write_all(z_block)?;
            self.index.blocks.push(BlockRange::new(
                self.offset,
                z_block.len() as u64,
                *u_len as u64,
            ));
            self.offset += z_block.len() as u64;
        }
        self.index.datasets.push(DatasetEntry::new(
            dataset.score_type,
            dataset.taxon,
            dataset.num_alleles,
            first_block,
            dataset.blocks.len(),
        ));
        self.written.insert(key);
        Ok(())
    }

    /// Writes the index and flushes the inner writer
    pub fn finish(&mut self) -> Result<()> {
        let z_index = self.index.encoded()?;
        let header = self.index.header(z_index.len());
        let footer = IndexFooter::new(z_index.len() as u64);
        self.inner.write_all(header.as_bytes())?;
        self.inner.write_all(&z_index)?;
        self.inner.write_all(footer.as_bytes())?;
        self.inner.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

#[cfg(test)]
mod testing {
    use super::*;
    use crate::{
        Error,
        store::{FileHeaderBuilder, IndexHeader},
    };

    fn header() -> FileHeader {
        FileHeaderBuilder::new()
            .num_sites(5)
            .block_size(2)
            .build()
            .unwrap()
    }

    #[test]
    fn test_encode_blocks_are_allele_major() -> Result<()> {
        let row = [1, 2, 3, 4, 5, 11, 12, 13, 14, 15];
        let dataset = EncodedDataset::encode(&header(), ScoreType::DepthA, 0, 2, &row)?;
        assert_eq!(dataset.blocks.len(), 3);
        let decoded: Vec<Vec<u8>> = dataset
            .blocks
            .iter()
            .map(|(z, u_len)| zstd::bulk::decompress(z, *u_len).unwrap())
            .collect();
        assert_eq!(decoded[0], vec![1, 2, 11, 12]);
        assert_eq!(decoded[1], vec![3, 4, 13, 14]);
        assert_eq!(decoded[2], vec![5, 15]);
        Ok(())
    }

    #[test]
    fn test_encode_rejects_wrong_length() {
        let result = EncodedDataset::encode(&header(), ScoreType::Dosage, 0, 1, &[0; 4]);
        assert!(matches!(
            result,
            Err(Error::UsageError(UsageError::SizeMismatch {
                expected: 5,
                actual: 4,
                ..
            }))
        ));
    }

    #[test]
    fn test_writer_layout() -> Result<()> {
        let header = header();
        let mut writer = StoreWriter::new(Vec::new(), header)?;
        assert_eq!(writer.header(), header);
        let dataset = EncodedDataset::encode(&header, ScoreType::Dosage, 0, 1, &[1; 5])?;
        writer.append(dataset)?;
        assert_eq!(writer.num_datasets(), 1);
        writer.finish()?;

        let bytes = writer.into_inner();
        let footer_start = bytes.len() - size_of::<IndexFooter>();
        let footer = IndexFooter::from_bytes(&bytes[footer_start..])?;
        let iheader_start =
            footer_start - footer.bytes as usize - size_of::<IndexHeader>();
        let iheader = IndexHeader::from_bytes(
            &bytes[iheader_start..iheader_start + size_of::<IndexHeader>()],
        )?;
        assert_eq!(iheader.num_datasets, 1);
        assert_eq!(iheader.num_blocks, 3);
        Ok(())
    }

    #[test]
    fn test_writer_rejects_zero_block_size() {
        assert!(matches!(
            StoreWriter::new(Vec::new(), FileHeader::new(5, 0, 0)),
            Err(Error::UsageError(UsageError::InvalidConfiguration(_)))
        ));
    }

    #[test]
    fn test_writer_rejects_duplicate_taxon() -> Result<()> {
        let header = header();
        let mut writer = StoreWriter::new(Vec::new(), header)?;
        writer.append(EncodedDataset::encode(&header, ScoreType::Dosage, 4, 1, &[0; 5])?)?;
        let result =
            writer.append(EncodedDataset::encode(&header, ScoreType::Dosage, 4, 1, &[0; 5])?);
        assert!(matches!(
            result,
            Err(Error::UsageError(UsageError::DuplicateTaxon { taxon: 4, .. }))
        ));
        // same taxon under another score type is a different dataset
        writer.append(EncodedDataset::encode(&header, ScoreType::DepthA, 4, 1, &[0; 5])?)?;
        Ok(())
    }
}
