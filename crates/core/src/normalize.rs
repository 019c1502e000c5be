use crate::field_value::FieldValue;
use crate::fields::{self, FieldKind};

/// Comparable form of a field value.
///
/// Absent values, `Null` and the empty string all collapse to `Null`.
/// Numeric fields are coerced to `Number`; anything that doesn't parse as a
/// finite number becomes `Null`. Other fields keep their value as-is, so
/// `Integer` and `Float` only appear outside numeric fields.
#[derive(Debug, Clone)]
pub enum Normalized {
    Null,
    Number(f64),
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl PartialEq for Normalized {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b).is_eq(),
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b).is_eq(),
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Normalized {}

impl Normalized {
    pub fn is_null(&self) -> bool {
        matches!(self, Normalized::Null)
    }

    /// Storage form of a normalized value. Integral numbers are kept as integers.
    pub fn into_field_value(self) -> FieldValue {
        match self {
            Normalized::Null => FieldValue::Null,
            Normalized::Text(s) => FieldValue::Text(s),
            Normalized::Integer(n) => FieldValue::Integer(n),
            Normalized::Float(n) => FieldValue::Float(n),
            Normalized::Boolean(b) => FieldValue::Boolean(b),
            Normalized::Number(n) => {
                if n.fract() == 0.0 && n >= i64::MIN as f64 && n <= i64::MAX as f64 {
                    FieldValue::Integer(n as i64)
                } else {
                    FieldValue::Float(n)
                }
            }
        }
    }
}

fn finite(n: f64) -> Normalized {
    if n.is_finite() {
        // Collapse -0.0 so it compares equal to 0.0 under total ordering.
        Normalized::Number(n + 0.0)
    } else {
        Normalized::Null
    }
}

fn coerce_number(value: &FieldValue) -> Normalized {
    match value {
        FieldValue::Integer(n) => finite(*n as f64),
        FieldValue::Float(n) => finite(*n),
        FieldValue::Text(s) => match s.trim().parse::<f64>() {
            Ok(n) => finite(n),
            Err(_) => Normalized::Null,
        },
        FieldValue::Null | FieldValue::Boolean(_) => Normalized::Null,
    }
}

fn passthrough(value: &FieldValue) -> Normalized {
    match value {
        FieldValue::Null => Normalized::Null,
        FieldValue::Text(s) if s.is_empty() => Normalized::Null,
        FieldValue::Text(s) => Normalized::Text(s.clone()),
        FieldValue::Integer(n) => Normalized::Integer(*n),
        FieldValue::Float(n) => Normalized::Float(*n),
        FieldValue::Boolean(b) => Normalized::Boolean(*b),
    }
}

/// Normalize a possibly-absent value of the named field.
///
/// Total: every input produces a value. Fields outside the registry compare
/// without coercion.
pub fn normalize(field: &str, value: Option<&FieldValue>) -> Normalized {
    let Some(value) = value else {
        return Normalized::Null;
    };
    match fields::kind_of(field) {
        Some(FieldKind::Number) => coerce_number(value),
        Some(FieldKind::Text) | None => passthrough(value),
    }
}

/// True when both values are the same after normalization.
pub fn equivalent(field: &str, a: Option<&FieldValue>, b: Option<&FieldValue>) -> bool {
    normalize(field, a) == normalize(field, b)
}
