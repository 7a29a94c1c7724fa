//! Compute command - every sale pair found in a directory

use crate::cmd::display::print_batch;
use crate::cmd::EngineArgs;
use crate::core::{calculate_batch, BatchReport, CpiAdjuster};
use crate::input::{discover, load_sale, SaleFiles};
use crate::report::{remove_sale_files, write_sale_files};
use anyhow::Context;
use clap::Args;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct ComputeCommand {
    /// Directory holding consumption_*.csv and sale_* files
    #[arg(default_value = ".")]
    dir: PathBuf,

    #[command(flatten)]
    engine: EngineArgs,

    /// Where to write the per-sale CSV files (defaults to the input directory)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Don't write CSV files, only print results
    #[arg(long)]
    no_write: bool,

    /// Output as JSON instead of formatted tables
    #[arg(long)]
    json: bool,
}

impl ComputeCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let cpi = self.engine.cpi_table()?;
        let options = self.engine.options()?;
        let adjuster = CpiAdjuster::new(&cpi, self.engine.convention());
        log::info!(
            "Tax rate {}, CPI convention {:?}",
            options.policy.rate(),
            adjuster.convention()
        );

        let files = discover(&self.dir)
            .with_context(|| format!("scanning {}", self.dir.display()))?;
        log::info!("Found {} sale(s) in {}", files.len(), self.dir.display());

        let inputs = files.iter().map(load_sale).collect::<Vec<_>>();
        let batch = calculate_batch(inputs, &adjuster, &options);

        let mut write_failures = 0;
        if !self.no_write {
            let out_dir = self.output_dir.as_deref().unwrap_or(&self.dir);
            write_failures = write_outputs(out_dir, &files, &batch)?;
        }

        print_batch(&batch, self.json)?;

        if write_failures > 0 {
            eprintln!("\u{26A0} {} sale(s) could not be written, see log", write_failures);
        }
        if batch.failure_count() > 0 || write_failures > 0 {
            std::process::exit(1);
        }
        Ok(())
    }
}

/// Write CSVs for computed sales and clear earlier output of failed ones.
/// Returns how many sales could not be written.
fn write_outputs(dir: &Path, files: &[SaleFiles], batch: &BatchReport) -> anyhow::Result<usize> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let mut failures = 0;
    for (files, outcome) in files.iter().zip(&batch.outcomes) {
        let stem = files
            .consumption
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&outcome.key);

        match &outcome.result {
            Ok(report) => {
                if let Err(e) = write_sale_files(dir, stem, report) {
                    log::error!("Sale {}: writing {} output failed: {:#}", outcome.key, stem, e);
                    failures += 1;
                }
            }
            Err(_) => match remove_sale_files(dir, stem) {
                Ok(removed) => {
                    for path in removed {
                        log::warn!("Sale {} failed, removed stale {}", outcome.key, path.display());
                    }
                }
                Err(e) => {
                    log::error!("Sale {}: removing stale {} output failed: {}", outcome.key, stem, e);
                    failures += 1;
                }
            },
        }
    }
    Ok(failures)
}
