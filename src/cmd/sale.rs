//! Sale command - one sale from explicitly named files

use crate::cmd::display::print_batch;
use crate::cmd::EngineArgs;
use crate::core::{calculate_batch, CpiAdjuster, SaleInput};
use crate::input::{file_key, read_sale};
use crate::report::{remove_sale_files, write_sale_files};
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct SaleCommand {
    /// Sale document (.json, or text extracted from the broker PDF)
    #[arg(short, long)]
    sale: PathBuf,

    /// Consumption CSV listing the lots sold
    #[arg(long)]
    consumption: PathBuf,

    #[command(flatten)]
    engine: EngineArgs,

    /// Write `<consumption stem>_with_calc.csv` and `_summary.csv` here
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output as JSON instead of formatted tables
    #[arg(long)]
    json: bool,
}

impl SaleCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let cpi = self.engine.cpi_table()?;
        let options = self.engine.options()?;
        let adjuster = CpiAdjuster::new(&cpi, self.engine.convention());
        log::info!(
            "Tax rate {}, CPI convention {:?}",
            options.policy.rate(),
            adjuster.convention()
        );

        let input = SaleInput {
            key: file_key(&self.consumption),
            sources: vec![
                self.consumption.display().to_string(),
                self.sale.display().to_string(),
            ],
            sale: read_sale(&self.sale, &self.consumption),
        };
        let batch = calculate_batch([input], &adjuster, &options);

        if let Some(dir) = &self.output_dir {
            std::fs::create_dir_all(dir)?;
            let stem = self
                .consumption
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("sale");
            match batch.succeeded().next() {
                Some((_, report)) => {
                    write_sale_files(dir, stem, report)?;
                }
                None => {
                    for path in remove_sale_files(dir, stem)? {
                        log::warn!("Sale failed, removed stale {}", path.display());
                    }
                }
            }
        }

        print_batch(&batch, self.json)?;

        if batch.failure_count() > 0 {
            std::process::exit(1);
        }
        Ok(())
    }
}
