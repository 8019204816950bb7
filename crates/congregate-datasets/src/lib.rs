pub mod table;

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

pub use table::{LABEL_SEPARATOR, ReferenceRecord, ReferenceTable, TableKind, UNKNOWN_LABEL};

pub const HOMEBASE_FILE: &str = "homebase_dataset.json";
pub const DEPARTMENTS_FILE: &str = "departments_dataset.json";
pub const COOL_FILE: &str = "cool_dataset.json";
pub const CATEGORIES_FILE: &str = "cool_categories_dataset.json";

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed {table} table: {source}")]
    Parse {
        table: TableKind,
        source: serde_json::Error,
    },
}

// ── Raw dataset shapes ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawHomebase {
    code: String,
    homebase: String,
}

#[derive(Debug, Deserialize)]
struct RawDepartment {
    code: String,
    department: String,
}

#[derive(Debug, Deserialize)]
struct RawCool {
    no: i64,
    cool: String,
    category: String,
    #[serde(default)]
    leader: String,
    #[serde(default)]
    campus: String,
}

#[derive(Debug, Deserialize)]
struct RawCategory {
    code: String,
    name: String,
}

/// All reference tables, loaded once and shared read-only.
#[derive(Debug, Clone)]
pub struct Datasets {
    pub campus: ReferenceTable,
    /// Department codes are stored upper-cased by the registration form, so
    /// lookups ignore case.
    pub department: ReferenceTable,
    /// Keyed by the numeric COOL number rendered as a string.
    pub cool: ReferenceTable,
    pub category: ReferenceTable,
}

impl Datasets {
    /// Tables bundled with the crate.
    pub fn embedded() -> Result<Self, DatasetError> {
        Self::from_json(
            include_str!("../data/homebase_dataset.json"),
            include_str!("../data/departments_dataset.json"),
            include_str!("../data/cool_dataset.json"),
            include_str!("../data/cool_categories_dataset.json"),
        )
    }

    /// Reads the four dataset files from `dir`.
    pub fn load_dir(dir: &Path) -> Result<Self, DatasetError> {
        let read = |name: &str| {
            let path = dir.join(name);
            std::fs::read_to_string(&path).map_err(|source| DatasetError::Io { path, source })
        };
        let datasets = Self::from_json(
            &read(HOMEBASE_FILE)?,
            &read(DEPARTMENTS_FILE)?,
            &read(COOL_FILE)?,
            &read(CATEGORIES_FILE)?,
        )?;
        info!("Datasets loaded from {}", dir.display());
        Ok(datasets)
    }

    pub fn from_json(
        homebase: &str,
        departments: &str,
        cool: &str,
        categories: &str,
    ) -> Result<Self, DatasetError> {
        let parse_err = |table| move |source| DatasetError::Parse { table, source };

        let homebase: Vec<RawHomebase> =
            serde_json::from_str(homebase).map_err(parse_err(TableKind::Campus))?;
        let departments: Vec<RawDepartment> =
            serde_json::from_str(departments).map_err(parse_err(TableKind::Department))?;
        let cool: Vec<RawCool> = serde_json::from_str(cool).map_err(parse_err(TableKind::Cool))?;
        let categories: Vec<RawCategory> =
            serde_json::from_str(categories).map_err(parse_err(TableKind::Category))?;

        let campus = ReferenceTable::new(
            TableKind::Campus,
            homebase
                .into_iter()
                .map(|r| ReferenceRecord::new(r.code, r.homebase))
                .collect(),
        );
        let department = ReferenceTable::case_insensitive(
            TableKind::Department,
            departments
                .into_iter()
                .map(|r| ReferenceRecord::new(r.code, r.department))
                .collect(),
        );
        let cool = ReferenceTable::new(
            TableKind::Cool,
            cool.into_iter()
                .map(|r| {
                    ReferenceRecord::new(r.no.to_string(), r.cool)
                        .with_category(r.category)
                        .with_extra("leader", r.leader)
                        .with_extra("campus", r.campus.trim())
                })
                .collect(),
        );
        let category = ReferenceTable::new(
            TableKind::Category,
            categories
                .into_iter()
                .map(|r| ReferenceRecord::new(r.code, r.name))
                .collect(),
        );

        Ok(Self {
            campus,
            department,
            cool,
            category,
        })
    }

    pub fn table(&self, kind: TableKind) -> &ReferenceTable {
        match kind {
            TableKind::Campus => &self.campus,
            TableKind::Department => &self.department,
            TableKind::Cool => &self.cool,
            TableKind::Category => &self.category,
        }
    }

    /// Category code for a COOL category name, e.g. "youth" → "YTH".
    pub fn category_code(&self, category_name: &str) -> Option<&str> {
        self.category.resolve_code(category_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_tables_load() {
        let ds = Datasets::embedded().unwrap();
        assert!(!ds.campus.is_empty());
        assert_eq!(ds.campus.resolve_label("BKS"), "Bekasi");
        assert_eq!(ds.department.resolve_label("mus"), "Music");
        assert_eq!(ds.cool.resolve_label("101"), "Bekasi Youth 1");
        assert_eq!(ds.table(TableKind::Category).len(), 3);
    }

    #[test]
    fn test_cool_extras_trimmed() {
        let ds = Datasets::embedded().unwrap();
        let record = ds.cool.get("301").unwrap();
        assert_eq!(record.category.as_deref(), Some("Professional"));
        assert_eq!(record.extra("campus"), Some("Kelapa Gading"));
        assert_eq!(record.extra("leader"), Some("Daniel"));
    }

    #[test]
    fn test_category_code_reverse_lookup() {
        let ds = Datasets::embedded().unwrap();
        assert_eq!(ds.category_code("youth"), Some("YTH"));
        assert_eq!(ds.category_code("FAMILY"), Some("FAM"));
        assert_eq!(ds.category_code("Seniors"), None);
    }

    #[test]
    fn test_malformed_table_is_typed_error() {
        let err = Datasets::from_json("[]", "{", "[]", "[]").unwrap_err();
        assert!(matches!(
            err,
            DatasetError::Parse {
                table: TableKind::Department,
                ..
            }
        ));
    }

    #[test]
    fn test_load_dir_missing_file() {
        let dir = std::env::temp_dir().join("congregate_datasets_missing");
        let _ = std::fs::create_dir_all(&dir);
        let err = Datasets::load_dir(&dir).unwrap_err();
        assert!(matches!(err, DatasetError::Io { .. }));
    }
}
