use std::{env, sync::Arc, thread};

use anyhow::Result;
use bytescore::{
    ALLELE_DEPTH_TYPES, AlleleDepth, AlleleDepthBuilder, DiskMatrix2D, Dosage, DosageBuilder,
    FileHeaderBuilder, Matrix2D, ScoreMatrices, ScoreStore, ScoreType, TaxonProcessor, Translate,
    codec::decode_depths, process_taxa_parallel,
};
use log::info;
use parking_lot::Mutex;
use rand::{Rng, SeedableRng, rngs::SmallRng};

const DEFAULT_PATH: &str = "./scores.bsc";
const DEFAULT_NUM_TAXA: usize = 64;
const DEFAULT_NUM_SITES: usize = 100_000;
const NUM_WRITER_THREADS: usize = 4;

fn write_file(opath: &str, num_taxa: usize, num_sites: usize) -> Result<()> {
    let header = FileHeaderBuilder::new().num_sites(num_sites).build()?;
    let store = ScoreStore::create(opath, header)?;

    // depths stream through one builder
    let mut depths = AlleleDepthBuilder::for_disk(&store, num_sites)?;
    let mut rng = SmallRng::seed_from_u64(42);
    for taxon in 0..num_taxa {
        let rows: Vec<Vec<u32>> = ALLELE_DEPTH_TYPES
            .iter()
            .map(|_| (0..num_sites).map(|_| rng.random_range(0..40)).collect())
            .collect();
        depths.add_taxon_alleles(taxon, &rows)?;
    }

    // dosages are written concurrently, each thread with its own builder on the shared store
    thread::scope(|scope| -> Result<()> {
        let handles = (0..NUM_WRITER_THREADS)
            .map(|tid| {
                let store = Arc::clone(&store);
                scope.spawn(move || -> bytescore::Result<()> {
                    let mut builder = DosageBuilder::for_disk(&store, num_sites)?;
                    let mut rng = SmallRng::seed_from_u64(tid as u64);
                    for taxon in (tid..num_taxa).step_by(NUM_WRITER_THREADS) {
                        let row: Vec<u8> = (0..num_sites).map(|_| rng.random_range(0..=2)).collect();
                        builder.add_taxon(taxon, &row)?;
                    }
                    Ok(())
                })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle
                .join()
                .map_err(|_| anyhow::anyhow!("writer thread panicked"))??;
        }
        Ok(())
    })?;

    store.finish()?;
    Ok(())
}

#[derive(Clone)]
struct DepthSummary {
    l_taxa: usize,
    l_total: u64,

    taxa: Arc<Mutex<usize>>,
    total: Arc<Mutex<u64>>,
}
impl DepthSummary {
    fn new() -> Self {
        Self {
            l_taxa: 0,
            l_total: 0,
            taxa: Arc::new(Mutex::new(0)),
            total: Arc::new(Mutex::new(0)),
        }
    }

    fn n_taxa(&self) -> usize {
        *self.taxa.lock()
    }

    fn total_depth(&self) -> u64 {
        *self.total.lock()
    }
}
impl TaxonProcessor for DepthSummary {
    fn process_taxon(&mut self, _taxon: usize, values: &[u8]) -> bytescore::Result<()> {
        self.l_total += decode_depths(values).into_iter().map(u64::from).sum::<u64>();
        self.l_taxa += 1;
        Ok(())
    }

    fn on_batch_complete(&mut self) -> bytescore::Result<()> {
        *self.taxa.lock() += self.l_taxa;
        *self.total.lock() += self.l_total;
        self.l_taxa = 0;
        self.l_total = 0;
        Ok(())
    }
}

fn read_file(ipath: &str) -> Result<()> {
    let store = ScoreStore::open(ipath)?;
    let reader = store.reader()?;

    let mut matrices: Vec<Box<dyn Matrix2D>> = Vec::new();
    for &score_type in &ALLELE_DEPTH_TYPES {
        matrices.push(Box::new(DiskMatrix2D::open(Arc::clone(&reader), score_type)?));
    }
    let depth = AlleleDepth::new(ScoreMatrices::new(matrices)?)?;
    let dosage = Dosage::from_matrix(DiskMatrix2D::open(reader, ScoreType::Dosage)?)?;
    info!(
        "opened {ipath}: {} taxa x {} sites",
        depth.num_taxa(),
        depth.num_sites()
    );

    // every other taxon, last first
    let taxa: Vec<usize> = (0..depth.num_taxa()).rev().step_by(2).collect();
    let translate = Translate::taxa_subset(taxa, depth.num_sites());
    let view = depth.filtered(&translate)?;
    let dosage_view = dosage.filtered(&translate)?;

    let summary = DepthSummary::new();
    process_taxa_parallel(view.matrix(ScoreType::DepthA)?, summary.clone(), 0)?;
    println!(
        "DepthA over {} filtered taxa: total depth {}",
        summary.n_taxa(),
        summary.total_depth()
    );
    println!("First site of filtered taxon 0: {:?}", view.site_depths(0, 0)?);
    println!(
        "Dosage of filtered taxon 0 at site 0: {}",
        dosage_view.value(0, 0)?
    );
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let opath = args.next().unwrap_or_else(|| DEFAULT_PATH.to_string());
    let num_taxa = args.next().map_or(Ok(DEFAULT_NUM_TAXA), |arg| arg.parse())?;
    let num_sites = args.next().map_or(Ok(DEFAULT_NUM_SITES), |arg| arg.parse())?;

    eprintln!("Writing {num_taxa} taxa x {num_sites} sites to {opath}");
    write_file(&opath, num_taxa, num_sites)?;

    eprintln!("Reading file {opath}");
    read_file(&opath)?;

    Ok(())
}
