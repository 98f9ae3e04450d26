//! Column definitions and scalar values.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A scalar used for column defaults, table options and row values.
///
/// Serializes as a bare JSON scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Boolean.
    Bool(bool),
    /// Integer.
    Integer(i64),
    /// Floating point.
    Float(f64),
    /// String.
    String(String),
}

impl Value {
    /// Interprets the value as a flag.
    ///
    /// `true`, any non-zero number and the strings `1`, `true`, `yes`
    /// and `on` (any case) are truthy.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Integer(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::String(s) => matches!(
                s.to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            ),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x:?}"),
            Self::String(s) => write!(f, "'{s}'"),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

const fn default_nullable() -> bool {
    true
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_false(value: &bool) -> bool {
    !*value
}

/// Definition of a single column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Column name.
    pub name: String,
    /// Dialect-level type, e.g. `int` or `varchar(50)`.
    #[serde(rename = "type")]
    pub data_type: String,
    /// Whether the column accepts NULL.
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    /// Default value, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Whether the engine generates values for this column.
    #[serde(default, skip_serializing_if = "is_false")]
    pub auto_increment: bool,
}

impl ColumnDef {
    /// Creates a nullable column without a default.
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            default: None,
            auto_increment: false,
        }
    }

    /// Marks the column NOT NULL.
    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Marks the column nullable.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Marks the column as auto-incrementing.
    #[must_use]
    pub const fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Returns `true` if this column is called `name`, ignoring ASCII case.
    #[must_use]
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Compares type, nullability and default. Names and the
    /// auto-increment flag are not part of a column's shape.
    #[must_use]
    pub fn same_shape(&self, other: &Self) -> bool {
        self.data_type.eq_ignore_ascii_case(&other.data_type)
            && self.nullable == other.nullable
            && self.default == other.default
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_columns_are_nullable() {
        let col = ColumnDef::new("col2", "int").default(0);
        assert!(col.nullable);
        assert_eq!(col.default, Some(Value::Integer(0)));
        assert!(!col.auto_increment);
    }

    #[test]
    fn shape_ignores_type_case_and_autoincrement() {
        let a = ColumnDef::new("id", "INT").not_null().auto_increment();
        let b = ColumnDef::new("ID", "int").not_null();
        assert!(a.same_shape(&b));
        assert!(a.is_named("Id"));
    }

    #[test]
    fn shape_detects_default_and_nullability() {
        let base = ColumnDef::new("n", "int");
        assert!(!base.same_shape(&base.clone().default(1)));
        assert!(!base.same_shape(&base.clone().not_null()));
        assert!(!base.same_shape(&ColumnDef::new("n", "bigint")));
    }

    #[test]
    fn truthiness() {
        assert!(Value::from(true).is_truthy());
        assert!(Value::from(1).is_truthy());
        assert!(Value::from("Yes").is_truthy());
        assert!(!Value::from(0).is_truthy());
        assert!(!Value::from("no").is_truthy());
        assert!(!Value::from(false).is_truthy());
    }

    #[test]
    fn serde_shape() {
        let col = ColumnDef::new("name", "varchar(50)").not_null();
        let json = serde_json::to_value(&col).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"name": "name", "type": "varchar(50)", "nullable": false})
        );

        let back: ColumnDef =
            serde_json::from_value(serde_json::json!({"name": "a", "type": "int", "default": 1.5}))
                .unwrap();
        assert!(back.nullable);
        assert_eq!(back.default, Some(Value::Float(1.5)));
    }
}
