//! Runtime values.
//!
//! [`Datum`] is the typed value stored in rows, sampled by `ANALYZE`, and
//! recorded as histogram bucket bounds.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// A runtime SQL value.
///
/// Equality and ordering agree with each other: integers and doubles
/// compare numerically, NULL sorts before everything else, and values of
/// unrelated kinds are ordered by kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Datum {
    /// NULL value.
    Null,
    /// Boolean value.
    Boolean(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit floating point.
    Double(f64),
    /// String value.
    String(String),
    /// Binary data.
    Bytes(Vec<u8>),
    /// Date (days since epoch).
    Date(i32),
    /// Timestamp (microseconds since epoch).
    Timestamp(i64),
}

impl Datum {
    /// Creates a string value.
    pub fn string(v: impl Into<String>) -> Self {
        Datum::String(v.into())
    }

    /// Returns true if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    /// Returns true if this value is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Datum::Null => false,
            Datum::Boolean(b) => *b,
            Datum::Int(i) => *i != 0,
            Datum::Double(f) => *f != 0.0,
            Datum::String(s) => s.parse::<f64>().map(|f| f != 0.0).unwrap_or(false),
            Datum::Bytes(b) => !b.is_empty(),
            Datum::Date(_) | Datum::Timestamp(_) => true,
        }
    }

    /// Converts this value to a boolean, `None` for NULL.
    pub fn to_bool(&self) -> Option<bool> {
        match self {
            Datum::Null => None,
            Datum::Boolean(b) => Some(*b),
            _ => Some(self.is_truthy()),
        }
    }

    /// Converts this value to an i64.
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            Datum::Null | Datum::Bytes(_) => None,
            Datum::Boolean(b) => Some(i64::from(*b)),
            Datum::Int(i) => Some(*i),
            Datum::Double(f) => Some(*f as i64),
            Datum::String(s) => s.trim().parse().ok(),
            Datum::Date(d) => Some(i64::from(*d)),
            Datum::Timestamp(t) => Some(*t),
        }
    }

    /// Converts this value to an f64.
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Datum::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            Datum::Int(i) => Some(*i as f64),
            Datum::Double(f) => Some(*f),
            Datum::String(s) => s.trim().parse().ok(),
            Datum::Null | Datum::Bytes(_) | Datum::Date(_) | Datum::Timestamp(_) => None,
        }
    }

    /// Converts this value to its string form, `None` for NULL.
    pub fn to_string_value(&self) -> Option<String> {
        match self {
            Datum::Null => None,
            Datum::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Returns true for integers and doubles.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Datum::Int(_) | Datum::Double(_))
    }

    /// Short type name used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Datum::Null => "NULL",
            Datum::Boolean(_) => "BOOLEAN",
            Datum::Int(_) => "BIGINT",
            Datum::Double(_) => "DOUBLE",
            Datum::String(_) => "VARCHAR",
            Datum::Bytes(_) => "BLOB",
            Datum::Date(_) => "DATE",
            Datum::Timestamp(_) => "TIMESTAMP",
        }
    }

    /// Rank of the value kind, used to order values of unrelated kinds.
    fn kind_rank(&self) -> u8 {
        match self {
            Datum::Null => 0,
            Datum::Boolean(_) => 1,
            Datum::Int(_) | Datum::Double(_) => 2,
            Datum::String(_) => 3,
            Datum::Bytes(_) => 4,
            Datum::Date(_) => 5,
            Datum::Timestamp(_) => 6,
        }
    }
}

impl From<i64> for Datum {
    fn from(v: i64) -> Self {
        Datum::Int(v)
    }
}

impl From<i32> for Datum {
    fn from(v: i32) -> Self {
        Datum::Int(i64::from(v))
    }
}

impl From<f64> for Datum {
    fn from(v: f64) -> Self {
        Datum::Double(v)
    }
}

impl From<bool> for Datum {
    fn from(v: bool) -> Self {
        Datum::Boolean(v)
    }
}

impl From<&str> for Datum {
    fn from(v: &str) -> Self {
        Datum::String(v.to_string())
    }
}

impl From<String> for Datum {
    fn from(v: String) -> Self {
        Datum::String(v)
    }
}

impl PartialEq for Datum {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Datum {}

impl PartialOrd for Datum {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Datum {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Datum::Boolean(a), Datum::Boolean(b)) => a.cmp(b),
            (Datum::Int(a), Datum::Int(b)) => a.cmp(b),
            (Datum::Double(a), Datum::Double(b)) => cmp_f64(*a, *b),
            (Datum::Int(a), Datum::Double(b)) => cmp_i64_f64(*a, *b),
            (Datum::Double(a), Datum::Int(b)) => cmp_i64_f64(*b, *a).reverse(),
            (Datum::String(a), Datum::String(b)) => a.cmp(b),
            (Datum::Bytes(a), Datum::Bytes(b)) => a.cmp(b),
            (Datum::Date(a), Datum::Date(b)) => a.cmp(b),
            (Datum::Timestamp(a), Datum::Timestamp(b)) => a.cmp(b),
            // NULL first, then by kind
            (a, b) => a.kind_rank().cmp(&b.kind_rank()),
        }
    }
}

/// Numeric comparison where `-0.0 == 0.0` and NaN still has a place.
fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or_else(|| a.total_cmp(&b))
}

/// `-2^63` and `2^63` as doubles; both are exact.
const I64_MIN_F64: f64 = -9_223_372_036_854_775_808.0;
const I64_END_F64: f64 = 9_223_372_036_854_775_808.0;

/// Exact integer to double comparison.
///
/// Converting `i` to `f64` rounds above 2^53, which would make
/// `Int(2^53 + 1) == Double(2^53) == Int(2^53)`. Comparing against the
/// double's integer part keeps the order total. NaN sits where
/// `total_cmp` puts it: positive NaN above everything, negative below.
fn cmp_i64_f64(i: i64, f: f64) -> Ordering {
    if f.is_nan() {
        return if f.is_sign_negative() {
            Ordering::Greater
        } else {
            Ordering::Less
        };
    }
    if f >= I64_END_F64 {
        return Ordering::Less;
    }
    if f < I64_MIN_F64 {
        return Ordering::Greater;
    }
    let floor = f.floor();
    match i.cmp(&(floor as i64)) {
        Ordering::Equal if f > floor => Ordering::Less,
        other => other,
    }
}

/// The `i64` equal to `f`, if there is one.
fn f64_as_exact_i64(f: f64) -> Option<i64> {
    (f.fract() == 0.0 && (I64_MIN_F64..I64_END_F64).contains(&f)).then_some(f as i64)
}

impl Hash for Datum {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind_rank().hash(state);
        match self {
            Datum::Null => {}
            Datum::Boolean(b) => b.hash(state),
            // Integral doubles hash like the Int they equal
            Datum::Int(i) => i.hash(state),
            Datum::Double(f) => match f64_as_exact_i64(*f) {
                Some(i) => i.hash(state),
                None => f.to_bits().hash(state),
            },
            Datum::String(s) => s.hash(state),
            Datum::Bytes(b) => b.hash(state),
            Datum::Date(d) => d.hash(state),
            Datum::Timestamp(t) => t.hash(state),
        }
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datum::Null => write!(f, "NULL"),
            Datum::Boolean(b) => write!(f, "{}", if *b { "1" } else { "0" }),
            Datum::Int(i) => write!(f, "{}", i),
            Datum::Double(v) => write!(f, "{}", v),
            Datum::String(s) => write!(f, "{}", s),
            Datum::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
            Datum::Date(d) => write!(f, "date:{}", d),
            Datum::Timestamp(t) => write!(f, "ts:{}", t),
        }
    }
}

/// Helper module for hex encoding (simple implementation).
pub(crate) mod hex {
    pub fn encode(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }

    pub fn encode_upper(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02X}", b)).collect()
    }
}
