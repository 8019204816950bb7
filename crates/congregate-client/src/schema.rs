//! Registration form schemas.
//!
//! Two named variants exist: [`BASE_SCHEMA`] applies to every registration,
//! [`WORKER_EXTENSION`] only when registering as a worker. [`compose`] picks
//! the effective field set from an explicit [`RegistrationMode`]; nothing
//! outside that set is ever validated or submitted.

use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;

use crate::error::FieldError;

pub mod fields {
    pub const NAME: &str = "name";
    pub const EMAIL: &str = "email";
    pub const PHONE_NUMBER: &str = "phoneNumber";
    pub const PLACE_OF_BIRTH: &str = "placeOfBirth";
    pub const DATE_OF_BIRTH: &str = "dateOfBirth";
    pub const PASSWORD: &str = "password";
    pub const GENDER: &str = "gender";
    pub const MARITAL_STATUS: &str = "maritalStatus";
    pub const DEPARTMENT: &str = "department";
    pub const COOL: &str = "cool";
    pub const CAMPUS: &str = "campus";
    pub const KKJ: &str = "kkj";
    pub const KOM: &str = "kom";
    pub const BAPTIS: &str = "baptis";
}

pub const REQUIRED_MESSAGE: &str = "Field required!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RegistrationMode {
    #[default]
    Member,
    Worker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Enum,
    Date,
    Bool,
    Number,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Text | Self::Enum => "text",
            Self::Date => "date",
            Self::Bool => "boolean",
            Self::Number => "number",
        })
    }
}

/// A check on a present value. Each carries the message shown on failure.
#[derive(Debug, Clone, Copy)]
pub enum Constraint {
    MinLength(usize, &'static str),
    Email(&'static str),
    OneOf(&'static [&'static str], &'static str),
}

#[derive(Debug)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub constraints: &'static [Constraint],
}

#[derive(Debug)]
pub struct FormSchema {
    pub name: &'static str,
    pub fields: &'static [FieldDef],
}

pub static BASE_SCHEMA: FormSchema = FormSchema {
    name: "base",
    fields: &[
        FieldDef {
            name: fields::NAME,
            kind: FieldKind::Text,
            required: true,
            constraints: &[Constraint::MinLength(2, "Input your proper full name.")],
        },
        FieldDef {
            name: fields::EMAIL,
            kind: FieldKind::Text,
            required: true,
            constraints: &[Constraint::Email("Please enter a valid email address.")],
        },
        FieldDef {
            name: fields::PHONE_NUMBER,
            kind: FieldKind::Text,
            required: true,
            constraints: &[Constraint::MinLength(8, "Invalid phone number")],
        },
        FieldDef {
            name: fields::PLACE_OF_BIRTH,
            kind: FieldKind::Text,
            required: true,
            constraints: &[],
        },
        FieldDef {
            name: fields::DATE_OF_BIRTH,
            kind: FieldKind::Date,
            required: true,
            constraints: &[],
        },
        FieldDef {
            name: fields::PASSWORD,
            kind: FieldKind::Text,
            required: true,
            constraints: &[Constraint::MinLength(6, "Password must be at least 6 characters.")],
        },
    ],
};

pub static WORKER_EXTENSION: FormSchema = FormSchema {
    name: "worker",
    fields: &[
        FieldDef {
            name: fields::GENDER,
            kind: FieldKind::Enum,
            required: true,
            constraints: &[Constraint::OneOf(&["Male", "Female"], REQUIRED_MESSAGE)],
        },
        FieldDef {
            name: fields::MARITAL_STATUS,
            kind: FieldKind::Enum,
            required: true,
            constraints: &[Constraint::OneOf(&["single", "married", "others"], REQUIRED_MESSAGE)],
        },
        FieldDef {
            name: fields::DEPARTMENT,
            kind: FieldKind::Text,
            required: true,
            constraints: &[Constraint::MinLength(1, REQUIRED_MESSAGE)],
        },
        FieldDef {
            name: fields::COOL,
            kind: FieldKind::Number,
            required: true,
            constraints: &[],
        },
        FieldDef {
            name: fields::CAMPUS,
            kind: FieldKind::Text,
            required: true,
            constraints: &[Constraint::MinLength(1, REQUIRED_MESSAGE)],
        },
        FieldDef {
            name: fields::KKJ,
            kind: FieldKind::Text,
            required: false,
            constraints: &[],
        },
        FieldDef {
            name: fields::KOM,
            kind: FieldKind::Bool,
            required: true,
            constraints: &[],
        },
        FieldDef {
            name: fields::BAPTIS,
            kind: FieldKind::Bool,
            required: true,
            constraints: &[],
        },
    ],
};

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Date(NaiveDate),
    Bool(bool),
    Number(i64),
}

impl FieldValue {
    fn matches(&self, kind: FieldKind) -> bool {
        matches!(
            (self, kind),
            (Self::Text(_), FieldKind::Text | FieldKind::Enum)
                | (Self::Date(_), FieldKind::Date)
                | (Self::Bool(_), FieldKind::Bool)
                | (Self::Number(_), FieldKind::Number)
        )
    }
}

/// Unvalidated form values keyed by field name.
pub type RawInput = HashMap<String, FieldValue>;

/// Values that passed validation against one effective schema. Only fields
/// of that schema are present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedValues {
    values: HashMap<String, FieldValue>,
}

impl ValidatedValues {
    pub(crate) fn insert(&mut self, name: &str, value: FieldValue) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(FieldValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn date(&self, name: &str) -> Option<NaiveDate> {
        match self.values.get(name) {
            Some(FieldValue::Date(d)) => Some(*d),
            _ => None,
        }
    }

    pub fn flag(&self, name: &str) -> Option<bool> {
        match self.values.get(name) {
            Some(FieldValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn number(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(FieldValue::Number(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// The field set in force for one submission.
#[derive(Debug, Clone)]
pub struct EffectiveSchema {
    fields: Vec<&'static FieldDef>,
}

impl EffectiveSchema {
    pub fn fields(&self) -> &[&'static FieldDef] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        self.fields.iter().copied().find(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.field(name).is_some_and(|f| f.required)
    }
}

pub fn compose(mode: RegistrationMode) -> EffectiveSchema {
    let mut fields: Vec<&'static FieldDef> = BASE_SCHEMA.fields.iter().collect();
    if mode == RegistrationMode::Worker {
        fields.extend(WORKER_EXTENSION.fields.iter());
    }
    EffectiveSchema { fields }
}

/// Checks every field of `schema` against `raw` and reports all failures in
/// schema order. Fields of `raw` outside the schema are ignored.
pub fn validate(schema: &EffectiveSchema, raw: &RawInput) -> Result<ValidatedValues, Vec<FieldError>> {
    let mut values = ValidatedValues::default();
    let mut errors = Vec::new();

    for def in schema.fields() {
        match check_field(def, raw.get(def.name)) {
            Ok(Some(value)) => values.insert(def.name, value.clone()),
            Ok(None) => {}
            Err(reason) => errors.push(FieldError::new(def.name, reason)),
        }
    }

    if errors.is_empty() {
        Ok(values)
    } else {
        Err(errors)
    }
}

fn check_field<'a>(def: &FieldDef, value: Option<&'a FieldValue>) -> Result<Option<&'a FieldValue>, String> {
    let Some(value) = value else {
        return if def.required {
            Err(REQUIRED_MESSAGE.to_string())
        } else {
            Ok(None)
        };
    };

    if !value.matches(def.kind) {
        return Err(format!("Expected {}", def.kind));
    }

    if let FieldValue::Text(text) = value {
        for constraint in def.constraints {
            check_constraint(constraint, text)?;
        }
    }

    Ok(Some(value))
}

fn check_constraint(constraint: &Constraint, text: &str) -> Result<(), String> {
    let ok = match constraint {
        Constraint::MinLength(min, _) => text.chars().count() >= *min,
        // Whitespace is stripped from emails before submission, so it
        // doesn't count against them here.
        Constraint::Email(_) => {
            let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
            is_email(&compact)
        }
        Constraint::OneOf(allowed, _) => allowed.contains(&text),
    };
    if ok {
        return Ok(());
    }
    let message = match constraint {
        Constraint::MinLength(_, m) | Constraint::Email(m) | Constraint::OneOf(_, m) => m,
    };
    Err(message.to_string())
}

fn is_email(s: &str) -> bool {
    let Some((local, domain)) = s.rsplit_once('@') else {
        return false;
    };
    if local.is_empty() || local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return false;
    }
    if !local
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "_'+-.".contains(c))
    {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    let Some((tld, hosts)) = labels.split_last() else {
        return false;
    };
    let hosts_ok = hosts.iter().all(|label| {
        label.starts_with(|c: char| c.is_ascii_alphanumeric())
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });
    hosts_ok && tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic())
}
