//! E2E tests for the compute, sale, cpi and schema commands

use std::process::Command;

fn taxil(args: &[&str]) -> std::process::Output {
    Command::new("cargo")
        .args(["run", "--"])
        .args(args)
        .output()
        .expect("Failed to execute command")
}

/// A failing sale is reported while the others are still computed
#[test]
fn compute_directory_isolates_failures() {
    let out_dir = tempfile::tempdir().unwrap();
    // left over from an earlier run in which this sale still computed
    let stale = out_dir.path().join("consumption_20_6_2024_with_calc.csv");
    std::fs::write(&stale, "lot,quantity\n1,100\n").unwrap();
    let output = taxil(&[
        "compute",
        "tests/data/sales",
        "--cpi",
        "tests/data/cpi.csv",
        "--output-dir",
        out_dir.path().to_str().unwrap(),
    ]);

    let stdout = String::from_utf8_lossy(&output.stdout);

    // One of the three sales fails, so the run does too
    assert!(!output.status.success(), "Command should fail: {:?}", output);

    // ILS sale: 100 shares, cost 1000 * 1.05, proceeds 1500
    assert!(stdout.contains("SALE 10.6.2024"));
    assert!(stdout.contains("2022-12 → 2024-05"));
    assert!(stdout.contains("₪450.00"));
    assert!(stdout.contains("₪112.50"));

    // Lots total 90 against 100 sold
    assert!(stdout.contains("SALE 20.6.2024 FAILED [QuantityMismatch]"));

    // EUR sale from extracted text, converted at 4.0
    assert!(stdout.contains("SALE 3.7.2024"));
    assert!(stdout.contains("₪150.59"));
    assert!(stdout.contains("₪37.65"));

    assert!(stdout.contains("TOTALS (2 of 3 sales computed)"));
    assert!(stdout.contains("₪150.15"));

    for name in [
        "consumption_10_6_2024_with_calc.csv",
        "consumption_10_6_2024_summary.csv",
        "consumption_3_7_2024_with_calc.csv",
        "consumption_3_7_2024_summary.csv",
    ] {
        assert!(out_dir.path().join(name).exists(), "missing {}", name);
    }
    assert!(!stale.exists());
}

/// Summary CSV carries the rounded sale totals
#[test]
fn compute_writes_summary_csv() {
    let out_dir = tempfile::tempdir().unwrap();
    taxil(&[
        "compute",
        "tests/data/sales",
        "--cpi",
        "tests/data/cpi.csv",
        "-o",
        out_dir.path().to_str().unwrap(),
    ]);

    let summary =
        std::fs::read_to_string(out_dir.path().join("consumption_10_6_2024_summary.csv")).unwrap();
    let lines: Vec<_> = summary.lines().collect();
    assert_eq!(lines[0], "sale_date,lots,quantity,sale_price_ils,nominal_proceeds_ils,adjusted_cost_ils,total_real_gain_ils,total_tax_owed_ils,total_fees_ils,net_proceeds_ils");
    assert_eq!(lines[1], "2024-06-10,1,100,15.00,1500.00,1050.00,450.00,112.50,0.00,450.00");
}

/// JSON output marks each sale as computed or failed
#[test]
fn compute_json() {
    let output = taxil(&[
        "compute",
        "tests/data/sales",
        "--cpi",
        "tests/data/cpi.csv",
        "--no-write",
        "--json",
    ]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");

    assert_eq!(json["failures"], 1);
    assert_eq!(json["sales"][0]["status"], "computed");
    assert_eq!(json["sales"][1]["status"], "failed");
    assert_eq!(json["sales"][1]["error"], "QuantityMismatch");
    assert_eq!(json["sales"][2]["status"], "computed");
    assert_eq!(json["total_tax_owed"], "150.15");
}

/// A custom rate applies to every lot
#[test]
fn sale_with_custom_tax_rate() {
    let output = taxil(&[
        "sale",
        "--sale",
        "tests/data/sales/sale_10.6.2024.json",
        "--consumption",
        "tests/data/sales/consumption_10_6_2024.csv",
        "--cpi",
        "tests/data/cpi.csv",
        "--tax-rate",
        "0.3",
    ]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout.contains("₪450.00"));
    assert!(stdout.contains("₪135.00"));
}

/// Missing CPI data fails the sale with the period named
#[test]
fn sale_missing_cpi_period() {
    let output = taxil(&[
        "sale",
        "--sale",
        "tests/data/sales/sale_3.7.2024.txt",
        "--consumption",
        "tests/data/sales/consumption_3_7_2024.csv",
        "--cpi",
        "tests/data/cpi.csv",
        "--cpi-convention",
        "same-month",
    ]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!output.status.success());
    assert!(stdout.contains("FAILED [MissingIndexData]"));
    assert!(stdout.contains("2024-07"));
}

#[test]
fn tax_rate_out_of_range() {
    let output = taxil(&[
        "sale",
        "--sale",
        "tests/data/sales/sale_10.6.2024.json",
        "--consumption",
        "tests/data/sales/consumption_10_6_2024.csv",
        "--cpi",
        "tests/data/cpi.csv",
        "--tax-rate",
        "1.5",
    ]);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(stderr.contains("tax rate must be between 0 and 1"));
}

#[test]
fn cpi_adjustment_factor() {
    let output = taxil(&[
        "cpi",
        "show",
        "--cpi",
        "tests/data/cpi.csv",
        "--from",
        "2023-01-05",
        "--to",
        "2024-06-10",
    ]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout.contains("2023-01-05 (2022-12) → 2024-06-10 (2024-05)"));
    assert!(stdout.contains("Adjustment factor: 1.05"));
}

#[test]
fn cpi_table_listing() {
    let output = taxil(&["cpi", "show", "--cpi", "tests/data/cpi.csv"]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout.contains("2022-12"));
    assert!(stdout.contains("2024-06"));
    assert!(stdout.contains("105"));
}

#[test]
fn cpi_fetch_rejects_reversed_range() {
    let output = taxil(&["cpi", "fetch", "--from", "2024-06", "--to", "2024-01"]);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(stderr.contains("--from 2024-06 is after --to 2024-01"));
}

#[test]
fn schema_describes_sale_document() {
    let output = taxil(&["schema"]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout.contains("settlement_date"));
    assert!(stdout.contains("price_per_unit"));
}
