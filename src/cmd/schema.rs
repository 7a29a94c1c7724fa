//! Schema command - print expected input formats

use crate::input::SaleRecord;
use clap::Args;
use schemars::schema_for;

#[derive(Args, Debug)]
pub struct SchemaCommand {
    /// Output format: json-schema or csv-fields
    #[arg(value_enum, default_value = "json-schema")]
    format: SchemaFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum SchemaFormat {
    /// JSON Schema for sale_*.json documents
    JsonSchema,
    /// Column descriptions for the consumption and CPI CSV files
    CsvFields,
}

impl SchemaCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        match self.format {
            SchemaFormat::JsonSchema => self.print_json_schema(),
            SchemaFormat::CsvFields => self.print_csv_fields(),
        }
    }

    fn print_json_schema(&self) -> anyhow::Result<()> {
        let schema = schema_for!(SaleRecord);
        println!("{}", serde_json::to_string_pretty(&schema)?);
        Ok(())
    }

    fn print_csv_fields(&self) -> anyhow::Result<()> {
        println!("Consumption CSV (consumption_D_M_YYYY.csv)");
        println!("==========================================");
        println!();
        for (name, required, description) in CONSUMPTION_FIELDS {
            let req = if *required { "required" } else { "optional" };
            println!("{:20} ({:8})  {}", name, req, description);
        }
        println!();
        println!("Delimiter may be ';', ',' or tab. Decimal commas and DD/MM/YYYY dates are accepted.");
        println!();
        println!("CPI CSV");
        println!("=======");
        println!();
        for (name, required, description) in CPI_FIELDS {
            let req = if *required { "required" } else { "optional" };
            println!("{:20} ({:8})  {}", name, req, description);
        }
        Ok(())
    }
}

const CONSUMPTION_FIELDS: &[(&str, bool, &str)] = &[
    ("Acquisition date", true, "Date the shares were acquired"),
    ("Consumption", true, "Number of shares taken from this lot"),
    ("Purchase price", true, "Acquisition price per share"),
    ("Currency", false, "Currency of the purchase price (default ILS)"),
    (
        "Exchange rate",
        false,
        "ILS per unit of Currency; defaults to the sale's rate",
    ),
];

const CPI_FIELDS: &[(&str, bool, &str)] = &[
    ("period", true, "Month of the index, YYYY-MM"),
    ("value", true, "Published index value, must be positive"),
];
