//! Typed field values as decoded from sensor payloads.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::CompareOp;

/// Declared type of a sensor field.
///
/// Literals in expression text are coerced to this type when a predicate
/// is built, so every predicate literal carries the same tag as its field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    UnsignedInt,
    SignedInt,
    Float,
    Double,
    Text,
    Boolean,
    BitField,
}

impl FieldType {
    pub fn name(self) -> &'static str {
        match self {
            FieldType::UnsignedInt => "UNSIGNED_INT",
            FieldType::SignedInt => "SIGNED_INT",
            FieldType::Float => "FLOAT",
            FieldType::Double => "DOUBLE",
            FieldType::Text => "TEXT",
            FieldType::Boolean => "BOOLEAN",
            FieldType::BitField => "BITFIELD",
        }
    }

    /// Coerce a literal from expression text into a value of this type.
    ///
    /// Returns `None` when the text is not a valid rendition of the type.
    pub fn coerce(self, text: &str) -> Option<TypedValue> {
        match self {
            FieldType::UnsignedInt => text.parse().ok().map(TypedValue::UnsignedInt),
            FieldType::SignedInt => text.parse().ok().map(TypedValue::SignedInt),
            FieldType::Float => text.parse().ok().map(TypedValue::Float),
            FieldType::Double => text.parse().ok().map(TypedValue::Double),
            FieldType::Text => Some(TypedValue::Text(text.to_owned())),
            FieldType::Boolean => match text.to_ascii_lowercase().as_str() {
                "true" | "1" => Some(TypedValue::Boolean(true)),
                "false" | "0" => Some(TypedValue::Boolean(false)),
                _ => None,
            },
            FieldType::BitField => parse_bits(text).map(TypedValue::BitField),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn parse_bits(text: &str) -> Option<u64> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).ok()
    } else if let Some(bin) = text.strip_prefix("0b").or_else(|| text.strip_prefix("0B")) {
        u64::from_str_radix(bin, 2).ok()
    } else {
        text.parse().ok()
    }
}

/// A decoded field value.
///
/// Comparison is only defined between values carrying the same tag; there
/// is no implicit widening between integer and floating point variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum TypedValue {
    UnsignedInt(u64),
    SignedInt(i64),
    Float(f32),
    Double(f64),
    Text(String),
    Boolean(bool),
    BitField(u64),
}

impl TypedValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            TypedValue::UnsignedInt(_) => FieldType::UnsignedInt,
            TypedValue::SignedInt(_) => FieldType::SignedInt,
            TypedValue::Float(_) => FieldType::Float,
            TypedValue::Double(_) => FieldType::Double,
            TypedValue::Text(_) => FieldType::Text,
            TypedValue::Boolean(_) => FieldType::Boolean,
            TypedValue::BitField(_) => FieldType::BitField,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.field_type().name()
    }

    /// Tag-matched ordering. `None` when the tags differ or a float is NaN.
    fn ordering(&self, other: &TypedValue) -> Option<Ordering> {
        match (self, other) {
            (TypedValue::UnsignedInt(a), TypedValue::UnsignedInt(b)) => Some(a.cmp(b)),
            (TypedValue::SignedInt(a), TypedValue::SignedInt(b)) => Some(a.cmp(b)),
            (TypedValue::Float(a), TypedValue::Float(b)) => a.partial_cmp(b),
            (TypedValue::Double(a), TypedValue::Double(b)) => a.partial_cmp(b),
            // Ordinal byte-wise
            (TypedValue::Text(a), TypedValue::Text(b)) => Some(a.as_bytes().cmp(b.as_bytes())),
            (TypedValue::Boolean(a), TypedValue::Boolean(b)) => Some(a.cmp(b)),
            (TypedValue::BitField(a), TypedValue::BitField(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Evaluate `self OP literal`.
    ///
    /// Returns `None` when the comparison is undefined: the tags disagree,
    /// or an ordering operator is applied to `Boolean`. An unordered float
    /// pair (NaN on either side) satisfies only `!=`.
    pub fn compare(&self, op: CompareOp, literal: &TypedValue) -> Option<bool> {
        if self.field_type() != literal.field_type() {
            return None;
        }
        if op.is_ordering() && matches!(self, TypedValue::Boolean(_)) {
            return None;
        }

        Some(match self.ordering(literal) {
            Some(ord) => op.holds(ord),
            None => op == CompareOp::Ne,
        })
    }
}

// ============================================================================
// Conversions (From impls)
// ============================================================================

impl From<u64> for TypedValue { fn from(v: u64) -> Self { TypedValue::UnsignedInt(v) } }
impl From<i64> for TypedValue { fn from(v: i64) -> Self { TypedValue::SignedInt(v) } }
impl From<f32> for TypedValue { fn from(v: f32) -> Self { TypedValue::Float(v) } }
impl From<f64> for TypedValue { fn from(v: f64) -> Self { TypedValue::Double(v) } }
impl From<bool> for TypedValue { fn from(v: bool) -> Self { TypedValue::Boolean(v) } }
impl From<String> for TypedValue { fn from(v: String) -> Self { TypedValue::Text(v) } }
impl From<&str> for TypedValue { fn from(v: &str) -> Self { TypedValue::Text(v.to_owned()) } }

// ============================================================================
// Display
// ============================================================================

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::UnsignedInt(v) => write!(f, "{v}"),
            TypedValue::SignedInt(v) => write!(f, "{v}"),
            TypedValue::Float(v) => write!(f, "{v}"),
            TypedValue::Double(v) => write!(f, "{v}"),
            TypedValue::Text(s) => {
                if needs_quoting(s) {
                    write!(f, "'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
                } else {
                    f.write_str(s)
                }
            }
            TypedValue::Boolean(b) => write!(f, "{b}"),
            TypedValue::BitField(v) => write!(f, "0x{v:x}"),
        }
    }
}

/// Text that would not survive the lexer as a bare word.
fn needs_quoting(s: &str) -> bool {
    s.is_empty()
        || s.chars().any(|c| c.is_whitespace() || "()[],&|=!<>'\"".contains(c))
}

// ============================================================================
// Dedup key
// ============================================================================

/// Hashable identity of a literal, used in structural signatures.
///
/// Floats are keyed by bit pattern so that `-0.0` and `0.0` stay distinct
/// nodes; they compare equal at evaluation time either way.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueKey {
    UnsignedInt(u64),
    SignedInt(i64),
    Float(u32),
    Double(u64),
    Text(String),
    Boolean(bool),
    BitField(u64),
}

impl From<&TypedValue> for ValueKey {
    fn from(v: &TypedValue) -> Self {
        match v {
            TypedValue::UnsignedInt(x) => ValueKey::UnsignedInt(*x),
            TypedValue::SignedInt(x) => ValueKey::SignedInt(*x),
            TypedValue::Float(x) => ValueKey::Float(x.to_bits()),
            TypedValue::Double(x) => ValueKey::Double(x.to_bits()),
            TypedValue::Text(s) => ValueKey::Text(s.clone()),
            TypedValue::Boolean(b) => ValueKey::Boolean(*b),
            TypedValue::BitField(x) => ValueKey::BitField(*x),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_by_field_type() {
        assert_eq!(FieldType::UnsignedInt.coerce("50"), Some(TypedValue::UnsignedInt(50)));
        assert_eq!(FieldType::UnsignedInt.coerce("-1"), None);
        assert_eq!(FieldType::SignedInt.coerce("-1"), Some(TypedValue::SignedInt(-1)));
        assert_eq!(FieldType::Double.coerce("2.5"), Some(TypedValue::Double(2.5)));
        assert_eq!(FieldType::Text.coerce("abc"), Some(TypedValue::Text("abc".into())));
        assert_eq!(FieldType::Boolean.coerce("TRUE"), Some(TypedValue::Boolean(true)));
        assert_eq!(FieldType::Boolean.coerce("yes"), None);
        assert_eq!(FieldType::BitField.coerce("0x1f"), Some(TypedValue::BitField(31)));
        assert_eq!(FieldType::BitField.coerce("0b101"), Some(TypedValue::BitField(5)));
    }

    #[test]
    fn test_compare_same_tag() {
        let v = TypedValue::UnsignedInt(50);
        assert!(v.compare(CompareOp::Eq, &TypedValue::UnsignedInt(50)).unwrap());
        assert!(v.compare(CompareOp::Gt, &TypedValue::UnsignedInt(20)).unwrap());
        assert!(!v.compare(CompareOp::Lt, &TypedValue::UnsignedInt(20)).unwrap());
        assert!(v.compare(CompareOp::Ge, &TypedValue::UnsignedInt(50)).unwrap());
    }

    #[test]
    fn test_no_widening_between_tags() {
        let v = TypedValue::SignedInt(5);
        assert_eq!(v.compare(CompareOp::Eq, &TypedValue::UnsignedInt(5)), None);
    }

    #[test]
    fn test_boolean_ordering_is_mismatch() {
        let v = TypedValue::Boolean(true);
        assert!(v.compare(CompareOp::Eq, &TypedValue::Boolean(true)).unwrap());
        assert_eq!(v.compare(CompareOp::Lt, &TypedValue::Boolean(false)), None);
    }

    #[test]
    fn test_text_is_bytewise() {
        let a = TypedValue::from("B");
        assert!(a.compare(CompareOp::Lt, &TypedValue::from("a")).unwrap());
        assert!(a.compare(CompareOp::Ne, &TypedValue::from("b")).unwrap());
    }

    #[test]
    fn test_nan_only_satisfies_ne() {
        let nan = TypedValue::Double(f64::NAN);
        let one = TypedValue::Double(1.0);
        assert!(nan.compare(CompareOp::Ne, &one).unwrap());
        assert!(!nan.compare(CompareOp::Eq, &one).unwrap());
        assert!(!nan.compare(CompareOp::Ge, &one).unwrap());
    }

    #[test]
    fn test_text_display_quotes_when_needed() {
        assert_eq!(TypedValue::from("abc").to_string(), "abc");
        assert_eq!(TypedValue::from("a b").to_string(), "'a b'");
        assert_eq!(TypedValue::from("it's").to_string(), "'it\\'s'");
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_string(&TypedValue::UnsignedInt(7)).unwrap();
        assert_eq!(json, r#"{"type":"UnsignedInt","value":7}"#);
    }
}
