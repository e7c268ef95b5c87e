//! # Score store
//!
//! A single-file block store holding one byte row per `(score type, taxon)` dataset.
//!
//! ## File Structure
//!
//! ```text
//! ┌───────────────────┐
//! │    File Header    │ 64 bytes
//! ├───────────────────┤
//! │   zstd Block      │ Variable size
//! ├───────────────────┤
//! │       ...         │ More blocks
//! ├───────────────────┤
//! │   Index Header    │ 32 bytes
//! ├───────────────────┤
//! │ Compressed Index  │ Variable size
//! ├───────────────────┤
//! │   Index Footer    │ 16 bytes
//! └───────────────────┘
//! ```
//!
//! A row of `num_sites` sites is cut into blocks of `block_size` sites (the final block may
//! be shorter). For rows with several allele planes a block holds the block's sites for
//! every plane, allele-major. The index lists every dataset (score type, taxon, allele
//! count, first block, block count) followed by every block's offset and lengths.

mod header;
mod index;
mod read;
mod write;

use std::{
    fs,
    io::BufWriter,
    path::{Path, PathBuf},
    sync::Arc,
};

use log::debug;
use parking_lot::Mutex;

pub use header::{FileHeader, FileHeaderBuilder};
pub use index::{BlockRange, DatasetEntry, IndexFooter, IndexHeader, StoreIndex};
pub use read::StoreReader;
pub use write::{EncodedDataset, StoreWriter};

use crate::{Result, ScoreType, error::UsageError};

/// The magic number for score store files.
pub const FILE_MAGIC: &[u8; 7] = b"BSCSTOR";

/// The magic number for the store index.
pub const INDEX_MAGIC: &[u8; 8] = b"BSCINDEX";

/// The current file version.
pub const FILE_VERSION: u8 = 1;

/// The default number of sites per block.
pub const DEFAULT_BLOCK_SIZE: usize = 65536;

/// The default compression level.
pub const DEFAULT_COMPRESSION_LEVEL: u64 = 0;

/// A shared handle on a store file.
///
/// A handle created with [`ScoreStore::create`] accepts taxon rows from any number of
/// builders (and threads) until it is finalized; the single writer sits behind a mutex.
/// Asking for a [`reader`](Self::reader) finalizes the file and maps it. A handle created
/// with [`ScoreStore::open`] is read-only.
pub struct ScoreStore {
    path: PathBuf,
    header: FileHeader,
    read_only: bool,
    writer: Mutex<Option<StoreWriter<BufWriter<fs::File>>>>,
    reader: Mutex<Option<Arc<StoreReader>>>,
}
impl ScoreStore {
    /// Creates a new store file at `path`, truncating any existing file
    pub fn create<P: AsRef<Path>>(path: P, header: FileHeader) -> Result<Arc<Self>> {
        let path = path.as_ref().to_path_buf();
        let handle = BufWriter::new(fs::File::create(&path)?);
        let writer = StoreWriter::new(handle, header)?;
        debug!(
            "created score store {} ({} sites, block size {})",
            path.display(),
            header.num_sites,
            header.block_size
        );
        Ok(Arc::new(Self {
            path,
            header,
            read_only: false,
            writer: Mutex::new(Some(writer)),
            reader: Mutex::new(None),
        }))
    }

    /// Opens an existing store file read-only
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Arc<Self>> {
        let path = path.as_ref().to_path_buf();
        let reader = StoreReader::new(&path)?;
        Ok(Arc::new(Self {
            header: reader.header(),
            path,
            read_only: true,
            writer: Mutex::new(None),
            reader: Mutex::new(Some(Arc::new(reader))),
        }))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn header(&self) -> FileHeader {
        self.header
    }

    #[must_use]
    pub fn num_sites(&self) -> usize {
        self.header.num_sites()
    }

    /// Whether the store still accepts writes
    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.writer.lock().is_some()
    }

    /// Writes one taxon's row as a new dataset.
    ///
    /// `row` is allele-major (`num_alleles` planes of `num_sites` bytes). Validation and
    /// compression run before the writer lock is taken; only the append is serialized.
    pub fn write_taxon(
        &self,
        score_type: ScoreType,
        taxon: usize,
        num_alleles: usize,
        row: &[u8],
    ) -> Result<()> {
        let dataset = EncodedDataset::encode(&self.header, score_type, taxon, num_alleles, row)?;
        let mut writer = self.writer.lock();
        match writer.as_mut() {
            Some(writer) => writer.append(dataset),
            None if self.read_only => Err(UsageError::StoreReadOnly.into()),
            None => Err(UsageError::StoreFinalized.into()),
        }
    }

    /// Writes the index and closes the writer. Calling this more than once is a no-op.
    pub fn finish(&self) -> Result<()> {
        if let Some(mut writer) = self.writer.lock().take() {
            writer.finish()?;
            debug!(
                "finalized score store {} with {} datasets",
                self.path.display(),
                writer.num_datasets()
            );
        }
        Ok(())
    }

    /// Returns the read handle, finalizing the store and mapping it on first use
    pub fn reader(&self) -> Result<Arc<StoreReader>> {
        let mut reader = self.reader.lock();
        if let Some(reader) = reader.as_ref() {
            return Ok(Arc::clone(reader));
        }
        self.finish()?;
        let opened = Arc::new(StoreReader::new(&self.path)?);
        *reader = Some(Arc::clone(&opened));
        Ok(opened)
    }
}

#[cfg(test)]
mod testing {
    use super::*;
    use crate::Error;

    fn header() -> FileHeader {
        FileHeaderBuilder::new()
            .num_sites(3)
            .block_size(2)
            .build()
            .unwrap()
    }

    #[test]
    fn test_create_write_read() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = ScoreStore::create(dir.path().join("s.bsc"), header())?;
        assert!(store.is_writable());
        store.write_taxon(ScoreType::Dosage, 0, 1, &[1, 2, 3])?;
        store.write_taxon(ScoreType::Dosage, 1, 1, &[4, 5, 6])?;

        let reader = store.reader()?;
        assert!(!store.is_writable());
        assert_eq!(reader.read_row(ScoreType::Dosage, 1)?, vec![4, 5, 6]);

        // the read handle is reused
        let again = store.reader()?;
        assert!(Arc::ptr_eq(&reader, &again));
        Ok(())
    }

    #[test]
    fn test_write_after_finalize() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = ScoreStore::create(dir.path().join("s.bsc"), header())?;
        store.write_taxon(ScoreType::Dosage, 0, 1, &[1, 2, 3])?;
        store.reader()?;
        let result = store.write_taxon(ScoreType::Dosage, 1, 1, &[1, 2, 3]);
        assert!(matches!(
            result,
            Err(Error::UsageError(UsageError::StoreFinalized))
        ));
        Ok(())
    }

    #[test]
    fn test_finish_is_idempotent() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = ScoreStore::create(dir.path().join("s.bsc"), header())?;
        store.finish()?;
        store.finish()?;
        assert_eq!(store.reader()?.num_taxa(ScoreType::Dosage), 0);
        Ok(())
    }

    #[test]
    fn test_open_is_read_only() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("s.bsc");
        let store = ScoreStore::create(&path, header())?;
        store.write_taxon(ScoreType::ProbA, 0, 1, &[0, 128, 255])?;
        store.finish()?;

        let reopened = ScoreStore::open(&path)?;
        assert_eq!(reopened.num_sites(), 3);
        assert_eq!(reopened.path(), path.as_path());
        assert!(!reopened.is_writable());
        assert_eq!(
            reopened.reader()?.read_row(ScoreType::ProbA, 0)?,
            vec![0, 128, 255]
        );
        Ok(())
    }

    #[test]
    fn test_concurrent_writers() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = ScoreStore::create(dir.path().join("s.bsc"), header())?;
        std::thread::scope(|scope| {
            for taxon in 0..8 {
                let store = &store;
                scope.spawn(move || {
                    let value = taxon as u8;
                    store
                        .write_taxon(ScoreType::Dosage, taxon, 1, &[value; 3])
                        .unwrap();
                });
            }
        });
        let reader = store.reader()?;
        assert_eq!(reader.num_taxa(ScoreType::Dosage), 8);
        for taxon in 0..8 {
            assert_eq!(reader.read_row(ScoreType::Dosage, taxon)?, vec![taxon as u8; 3]);
        }
        Ok(())
    }
}
