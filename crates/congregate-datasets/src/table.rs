use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Label returned for any code that no record matches.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Separator used when several codes are rendered as one string.
pub const LABEL_SEPARATOR: &str = ", ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    Campus,
    Department,
    Cool,
    Category,
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Campus => "campus",
            Self::Department => "department",
            Self::Cool => "cool",
            Self::Category => "category",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceRecord {
    pub code: String,
    pub label: String,
    pub category: Option<String>,
    pub extra: BTreeMap<String, String>,
}

impl ReferenceRecord {
    pub fn new(code: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            label: label.into(),
            category: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_extra(mut self, key: &str, value: impl Into<String>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }

    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extra.get(key).map(String::as_str)
    }
}

/// An immutable code → label table.
///
/// Codes are unique: when the source data repeats a code, the first record
/// keeps the slot and later ones stay reachable only through `records()`.
#[derive(Debug, Clone)]
pub struct ReferenceTable {
    kind: TableKind,
    records: Vec<ReferenceRecord>,
    index: HashMap<String, usize>,
    case_insensitive: bool,
}

impl ReferenceTable {
    pub fn new(kind: TableKind, records: Vec<ReferenceRecord>) -> Self {
        Self::build(kind, records, false)
    }

    /// A table whose codes match regardless of ASCII case.
    pub fn case_insensitive(kind: TableKind, records: Vec<ReferenceRecord>) -> Self {
        Self::build(kind, records, true)
    }

    fn build(kind: TableKind, records: Vec<ReferenceRecord>, case_insensitive: bool) -> Self {
        let mut index = HashMap::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            let key = Self::key(&record.code, case_insensitive);
            if index.contains_key(&key) {
                tracing::warn!(table = %kind, code = %record.code, "Duplicate reference code, keeping first");
                continue;
            }
            index.insert(key, i);
        }
        Self {
            kind,
            records,
            index,
            case_insensitive,
        }
    }

    fn key(code: &str, case_insensitive: bool) -> String {
        if case_insensitive {
            code.to_ascii_uppercase()
        } else {
            code.to_string()
        }
    }

    pub fn kind(&self) -> TableKind {
        self.kind
    }

    pub fn records(&self) -> &[ReferenceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, code: &str) -> Option<&ReferenceRecord> {
        self.index
            .get(&Self::key(code, self.case_insensitive))
            .map(|&i| &self.records[i])
    }

    /// Label for `code`, or [`UNKNOWN_LABEL`] when nothing matches.
    pub fn resolve_label(&self, code: &str) -> &str {
        self.get(code)
            .map(|r| r.label.as_str())
            .unwrap_or(UNKNOWN_LABEL)
    }

    /// Resolves every code in order and joins the labels with `", "`.
    /// Duplicates and unknown codes each keep their own segment.
    pub fn resolve_joined_labels<S: AsRef<str>>(&self, codes: &[S]) -> String {
        codes
            .iter()
            .map(|code| self.resolve_label(code.as_ref()))
            .collect::<Vec<_>>()
            .join(LABEL_SEPARATOR)
    }

    /// Reverse lookup by label, ignoring case. First match wins.
    pub fn resolve_code(&self, label: &str) -> Option<&str> {
        let wanted = label.to_lowercase();
        self.records
            .iter()
            .find(|r| r.label.to_lowercase() == wanted)
            .map(|r| r.code.as_str())
    }

    /// Records grouped by category, groups in first-seen order.
    pub fn grouped_by_category(&self) -> Vec<(&str, Vec<&ReferenceRecord>)> {
        let mut groups: Vec<(&str, Vec<&ReferenceRecord>)> = Vec::new();
        for record in &self.records {
            let category = record.category.as_deref().unwrap_or("");
            match groups.iter_mut().find(|(name, _)| *name == category) {
                Some((_, members)) => members.push(record),
                None => groups.push((category, vec![record])),
            }
        }
        groups
    }
}
