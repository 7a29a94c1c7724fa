pub mod batch;
pub mod cpi;
pub mod engine;
pub mod error;
pub mod policy;
pub mod price;
pub mod sale;

// Flat public surface for domain types and functions.
pub use batch::{calculate_batch, BatchReport, SaleInput, SaleOutcome};
pub use cpi::{Adjustment, CpiAdjuster, CpiConvention, CpiPeriod, CpiSource, CpiTable};
pub use engine::{calculate_sale, EngineOptions, LotResult, SaleReport, SaleSummary};
pub use error::TaxError;
pub use policy::{TaxPolicy, DEFAULT_TAX_RATE};
pub use price::{Amount, ExchangeRate};
pub use sale::{AcquisitionLot, SaleEvent, DEFAULT_QUANTITY_TOLERANCE};
