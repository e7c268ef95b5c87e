use std::{ops::Range, thread};

use crate::{Result, error::UsageError, matrix::Matrix2D};

/// Trait for types that consume taxon rows in parallel.
///
/// Each worker thread receives its own clone of the processor, so per-thread state lives
/// in the processor and shared state belongs behind an `Arc`.
pub trait TaxonProcessor: Send + Clone {
    /// Process the full row of a single taxon
    fn process_taxon(&mut self, taxon: usize, values: &[u8]) -> Result<()>;

    /// Called when a thread finishes its share of taxa
    /// Default implementation does nothing
    fn on_batch_complete(&mut self) -> Result<()> {
        Ok(())
    }

    /// Set the thread ID for this processor
    ///
    /// Each thread calls this method with its own unique ID.
    fn set_tid(&mut self, _tid: usize) {
        // Default implementation does nothing
    }

    /// Get the thread ID for this processor
    fn get_tid(&self) -> Option<usize> {
        None
    }
}

/// Sweeps every taxon of `matrix` through `processor`.
///
/// See [`process_taxa_parallel_range`].
pub fn process_taxa_parallel<M, P>(matrix: &M, processor: P, num_threads: usize) -> Result<()>
where
    M: Matrix2D + ?Sized,
    P: TaxonProcessor,
{
    process_taxa_parallel_range(matrix, processor, num_threads, 0..matrix.num_taxa())
}

/// Sweeps the taxa in `range` through `processor`.
///
/// The range is split into contiguous chunks, one per thread. A `num_threads` of zero uses
/// every available CPU. The first error returned by any thread is propagated.
///
/// # Errors
///
/// * [`UsageError::OutOfBounds`] if the range ends past the last taxon
/// * [`UsageError::InvalidRange`] if the range starts after it ends
/// * any error raised while reading a row or by the processor
pub fn process_taxa_parallel_range<M, P>(
    matrix: &M,
    processor: P,
    num_threads: usize,
    range: Range<usize>,
) -> Result<()>
where
    M: Matrix2D + ?Sized,
    P: TaxonProcessor,
{
    validate_range(matrix.num_taxa(), &range)?;
    if range.is_empty() {
        return Ok(());
    }

    let num_threads = if num_threads == 0 {
        num_cpus::get()
    } else {
        num_threads.min(num_cpus::get())
    };
    let taxa_per_thread = range.len().div_ceil(num_threads);

    thread::scope(|scope| {
        let handles = (0..num_threads)
            .map(|tid| {
                let mut processor = processor.clone();
                processor.set_tid(tid);
                let start = range.start + tid * taxa_per_thread;
                let end = (start + taxa_per_thread).min(range.end);
                scope.spawn(move || -> Result<()> {
                    if start >= end {
                        return Ok(()); // No taxa for this thread
                    }
                    for taxon in start..end {
                        let values = matrix.values_for_all_sites(taxon)?;
                        processor.process_taxon(taxon, &values)?;
                    }
                    processor.on_batch_complete()
                })
            })
            .collect::<Vec<_>>();

        for handle in handles {
            handle
                .join()
                .unwrap_or_else(|payload| std::panic::resume_unwind(payload))?;
        }
        Ok(())
    })
}

fn validate_range(num_taxa: usize, range: &Range<usize>) -> Result<()> {
    if range.start > range.end {
        Err(UsageError::InvalidRange {
            start: range.start,
            end: range.end,
        }
        .into())
    } else if range.end > num_taxa {
        Err(UsageError::OutOfBounds {
            axis: "taxon",
            index: range.end - 1,
            len: num_taxa,
        }
        .into())
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod testing {
    use std::sync::Arc;

    use ndarray::Array2;
    use parking_lot::Mutex;

    use super::*;
    use crate::{Error, ScoreType, matrix::MemoryMatrix2D};

    #[derive(Clone, Default)]
    struct SumProcessor {
        tid: Option<usize>,
        local: Vec<(usize, u64)>,
        pub rows: Arc<Mutex<Vec<(usize, u64)>>>,
        pub batches: Arc<Mutex<usize>>,
    }
    impl TaxonProcessor for SumProcessor {
        fn process_taxon(&mut self, taxon: usize, values: &[u8]) -> Result<()> {
            let sum = values.iter().map(|&v| u64::from(v)).sum();
            self.local.push((taxon, sum));
            Ok(())
        }

        fn on_batch_complete(&mut self) -> Result<()> {
            self.rows.lock().append(&mut self.local);
            *self.batches.lock() += 1;
            Ok(())
        }

        fn set_tid(&mut self, tid: usize) {
            self.tid = Some(tid);
        }

        fn get_tid(&self) -> Option<usize> {
            self.tid
        }
    }

    fn matrix() -> MemoryMatrix2D {
        let data = Array2::from_shape_fn((10, 4), |(t, s)| (t * s) as u8);
        MemoryMatrix2D::new(ScoreType::Dosage, data)
    }

    #[test]
    fn test_parallel_processor() -> Result<()> {
        let matrix = matrix();
        let processor = SumProcessor::default();
        process_taxa_parallel(&matrix, processor.clone(), 0)?;
        let mut rows = processor.rows.lock().clone();
        rows.sort_unstable();
        assert_eq!(rows.len(), 10);
        for (taxon, sum) in rows {
            // 0 + t + 2t + 3t
            assert_eq!(sum, 6 * taxon as u64);
        }
        Ok(())
    }

    #[test]
    fn test_parallel_processor_range() -> Result<()> {
        let matrix = matrix();
        let processor = SumProcessor::default();
        process_taxa_parallel_range(&matrix, processor.clone(), 2, 3..8)?;
        let mut taxa: Vec<usize> = processor.rows.lock().iter().map(|row| row.0).collect();
        taxa.sort_unstable();
        assert_eq!(taxa, vec![3, 4, 5, 6, 7]);
        assert!(*processor.batches.lock() >= 1);
        Ok(())
    }

    #[test]
    fn test_parallel_processor_out_of_range() {
        let matrix = matrix();
        let processor = SumProcessor::default();
        assert!(matches!(
            process_taxa_parallel_range(&matrix, processor.clone(), 0, 0..11),
            Err(Error::UsageError(UsageError::OutOfBounds { .. }))
        ));
        #[allow(clippy::reversed_empty_ranges)]
        let reversed = 5..2;
        assert!(matches!(
            process_taxa_parallel_range(&matrix, processor.clone(), 0, reversed),
            Err(Error::UsageError(UsageError::InvalidRange { start: 5, end: 2 }))
        ));
        assert!(process_taxa_parallel_range(&matrix, processor.clone(), 0, 4..4).is_ok());
        assert!(processor.rows.lock().is_empty());
    }

    #[test]
    fn test_errors_propagate_from_workers() {
        #[derive(Clone)]
        struct Failing;
        impl TaxonProcessor for Failing {
            fn process_taxon(&mut self, taxon: usize, _values: &[u8]) -> Result<()> {
                if taxon == 7 {
                    Err(UsageError::InvalidConfiguration("taxon 7").into())
                } else {
                    Ok(())
                }
            }
        }
        assert!(process_taxa_parallel(&matrix(), Failing, 3).is_err());
    }
}
