//! Pair `consumption_*.csv` files with their `sale_*` documents by date

use chrono::NaiveDate;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static CONSUMPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^consumption_(\d{1,2})[._](\d{1,2})[._](\d{4})\.csv$").unwrap()
});
static SALE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^sale_(\d{1,2})[._](\d{1,2})[._](\d{4})\.(json|txt)$").unwrap()
});
static SALE_PDF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^sale_(\d{1,2})[._](\d{1,2})[._](\d{4})\.pdf$").unwrap());

/// Sale document extensions, in order of preference
const SALE_EXTENSIONS: &[&str] = &["json", "txt"];

/// Input files for one sale date
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleFiles {
    /// Date key as written in the consumption file name, e.g. `8.7.2025`
    pub key: String,
    pub date: NaiveDate,
    pub consumption: PathBuf,
    pub sale: Option<PathBuf>,
    /// Broker PDF for the same date, which has to be converted to text first
    pub pdf: Option<PathBuf>,
}

impl SaleFiles {
    /// Why no sale document could be used, when there is none
    pub fn missing_sale_reason(&self) -> Option<String> {
        if self.sale.is_some() {
            return None;
        }
        Some(match &self.pdf {
            Some(pdf) => {
                let name = pdf.file_name().and_then(|n| n.to_str()).unwrap_or_default();
                let stem = pdf.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
                format!("found {}; extract its text to {}.txt", name, stem)
            }
            None => format!("no sale_{} document found", self.key),
        })
    }
}

/// Date key in a file name, as `(display key, date)`
fn date_key(re: &Regex, name: &str) -> Option<(String, NaiveDate)> {
    let caps = re.captures(name)?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some((format!("{}.{}.{}", day, month, year), date))
}

/// Pairing key for an arbitrary input file: its date key when the name
/// follows the convention, otherwise the file stem
pub fn file_key(path: &Path) -> String {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    date_key(&CONSUMPTION_RE, name)
        .or_else(|| date_key(&SALE_RE, name))
        .map(|(key, _)| key)
        .unwrap_or_else(|| {
            path.file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string()
        })
}

/// Pair the file names in `names`, ordered by date
pub fn pair_files<I, P>(names: I) -> Vec<SaleFiles>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut consumption: BTreeMap<NaiveDate, (String, PathBuf)> = BTreeMap::new();
    let mut sales: BTreeMap<NaiveDate, PathBuf> = BTreeMap::new();
    let mut pdfs: BTreeMap<NaiveDate, PathBuf> = BTreeMap::new();

    for path in names {
        let path = path.as_ref();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        if let Some((key, date)) = date_key(&CONSUMPTION_RE, name) {
            if let Some((_, existing)) = consumption.insert(date, (key, path.to_path_buf())) {
                log::warn!(
                    "Two consumption files for {}: ignoring {}",
                    date,
                    existing.display()
                );
            }
        } else if let Some((_, date)) = date_key(&SALE_RE, name) {
            let preferred = sales.get(&date).is_none_or(|existing| {
                extension_rank(path) < extension_rank(existing)
            });
            if preferred {
                sales.insert(date, path.to_path_buf());
            }
        } else if let Some((_, date)) = date_key(&SALE_PDF_RE, name) {
            pdfs.insert(date, path.to_path_buf());
        } else if name.starts_with("sale_") || name.starts_with("consumption_") {
            log::warn!("Skipping unrecognized file: {}", name);
        } else {
            log::trace!("Ignoring {}", name);
        }
    }

    for (date, path) in &sales {
        if !consumption.contains_key(date) {
            log::warn!("No consumption file for {}, skipping", path.display());
        }
    }

    consumption
        .into_iter()
        .map(|(date, (key, consumption))| {
            let sale = sales.remove(&date);
            let pdf = pdfs.remove(&date);
            match (&sale, &pdf) {
                (Some(_), _) => {
                    log::info!("Paired {} with sale document for {}", consumption.display(), key)
                }
                (None, Some(pdf)) => log::warn!(
                    "Found {} for {}; extract its text to a .txt file next to it",
                    pdf.display(),
                    consumption.display()
                ),
                (None, None) => log::warn!("No sale document for {}", consumption.display()),
            }
            SaleFiles {
                key,
                date,
                consumption,
                sale,
                pdf,
            }
        })
        .collect()
}

/// Scan a directory (non-recursive) for sale pairs
pub fn discover(dir: &Path) -> anyhow::Result<Vec<SaleFiles>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            paths.push(entry.path());
        }
    }
    paths.sort();
    Ok(pair_files(paths))
}

fn extension_rank(path: &Path) -> usize {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    SALE_EXTENSIONS
        .iter()
        .position(|e| *e == ext)
        .unwrap_or(SALE_EXTENSIONS.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn both_date_styles_pair() {
        let pairs = pair_files(["consumption_8_7_2025.csv", "sale_8.7.2025.txt"]);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].key, "8.7.2025");
        assert_eq!(pairs[0].date, date("2025-07-08"));
        assert_eq!(pairs[0].sale, Some(PathBuf::from("sale_8.7.2025.txt")));
    }

    #[test]
    fn leading_zeros_pair_with_short_form() {
        let pairs = pair_files(["consumption_08.07.2025.csv", "sale_8.7.2025.json"]);
        assert_eq!(pairs[0].sale, Some(PathBuf::from("sale_8.7.2025.json")));
        assert_eq!(pairs[0].key, "8.7.2025");
    }

    #[test]
    fn json_preferred_over_text() {
        let pairs = pair_files([
            "sale_1.2.2024.txt",
            "sale_1.2.2024.json",
            "consumption_1.2.2024.csv",
        ]);
        assert_eq!(pairs[0].sale, Some(PathBuf::from("sale_1.2.2024.json")));
    }

    #[test]
    fn unmatched_and_unrelated_files() {
        let pairs = pair_files([
            "consumption_3.3.2024.csv",
            "sale_4.3.2024.json",
            "notes.txt",
            "consumption_latest.csv",
            "consumption_31.2.2024.csv",
        ]);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].date, date("2024-03-03"));
        assert_eq!(pairs[0].sale, None);
    }

    #[test]
    fn pdf_alone_is_recognised() {
        let pairs = pair_files(["consumption_8_7_2025.csv", "sale_8.7.2025.pdf"]);
        assert_eq!(pairs[0].sale, None);
        assert_eq!(pairs[0].pdf, Some(PathBuf::from("sale_8.7.2025.pdf")));
        assert_eq!(
            pairs[0].missing_sale_reason().as_deref(),
            Some("found sale_8.7.2025.pdf; extract its text to sale_8.7.2025.txt")
        );
    }

    #[test]
    fn extracted_text_used_next_to_pdf() {
        let pairs = pair_files([
            "consumption_8_7_2025.csv",
            "sale_8.7.2025.pdf",
            "sale_8.7.2025.txt",
        ]);
        assert_eq!(pairs[0].sale, Some(PathBuf::from("sale_8.7.2025.txt")));
        assert_eq!(pairs[0].missing_sale_reason(), None);
    }

    #[test]
    fn sorted_by_date() {
        let pairs = pair_files([
            "consumption_1.12.2024.csv",
            "consumption_15.1.2024.csv",
            "consumption_2.6.2024.csv",
        ]);
        let dates: Vec<_> = pairs.iter().map(|p| p.date).collect();
        assert_eq!(
            dates,
            vec![date("2024-01-15"), date("2024-06-02"), date("2024-12-01")]
        );
    }

    #[test]
    fn file_keys() {
        assert_eq!(file_key(Path::new("in/consumption_8_7_2025.csv")), "8.7.2025");
        assert_eq!(file_key(Path::new("sale_08.07.2025.json")), "8.7.2025");
        assert_eq!(file_key(Path::new("sale_8.7.2025.pdf")), "sale_8.7.2025");
        assert_eq!(file_key(Path::new("lots.csv")), "lots");
    }

    #[test]
    fn discover_scans_directory() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["consumption_8_7_2025.csv", "sale_8.7.2025.json", "cpi.csv"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        let pairs = discover(dir.path()).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].consumption, dir.path().join("consumption_8_7_2025.csv"));
        assert_eq!(pairs[0].sale, Some(dir.path().join("sale_8.7.2025.json")));
    }
}
