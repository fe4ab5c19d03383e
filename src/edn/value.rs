use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::ToPrimitive;
use uuid::Uuid;

/// A parsed EDN value.
///
/// Strings, characters, keywords and symbols all surface as [`Value::Text`];
/// keywords keep their leading colon. Lists and vectors both become
/// [`Value::Seq`].
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Integer(BigInt),
    Ratio(BigRational),
    Float(f64),
    Decimal(BigDecimal),
    Text(String),
    Seq(Vec<Value>),
    Map(IndexMap<Value, Value>),
    Set(IndexSet<Value>),
    Inst(DateTime<Utc>),
    Uuid(Uuid),
    Tagged(Tagged),
}

/// A tagged literal with no registered handler.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tagged {
    pub tag: String,
    pub value: Box<Value>,
}

impl Tagged {
    pub fn new(tag: impl Into<String>, value: Value) -> Self {
        Self {
            tag: tag.into(),
            value: Box::new(value),
        }
    }
}

impl Value {
    /// Returns the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Ratio(_) => "ratio",
            Value::Float(_) => "float",
            Value::Decimal(_) => "decimal",
            Value::Text(_) => "text",
            Value::Seq(_) => "sequence",
            Value::Map(_) => "map",
            Value::Set(_) => "set",
            Value::Inst(_) => "instant",
            Value::Uuid(_) => "uuid",
            Value::Tagged(_) => "tagged",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<&BigInt> {
        match self {
            Value::Integer(i) => Some(i),
            _ => None,
        }
    }

    /// The integer as an `i64`, if it is one and fits.
    pub fn as_i64(&self) -> Option<i64> {
        self.as_integer().and_then(ToPrimitive::to_i64)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => i.to_f64(),
            Value::Ratio(r) => r.to_f64(),
            Value::Decimal(d) => d.to_f64(),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Value]> {
        match self {
            Value::Seq(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<Value, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&IndexSet<Value>> {
        match self {
            Value::Set(s) => Some(s),
            _ => None,
        }
    }

    /// Text that was read from a keyword (it starts with `:`).
    pub fn is_keyword(&self) -> bool {
        self.as_text().is_some_and(|s| s.len() > 1 && s.starts_with(':'))
    }

    /// Keyword name with the colon and any namespace removed: `:user/email` gives `email`.
    pub fn keyword_name(&self) -> Option<&str> {
        let name = self.as_text()?.strip_prefix(':')?;
        match name.split_once('/') {
            Some((_, local)) => Some(local),
            None => Some(name),
        }
    }

    /// Get the count of elements in a collection
    pub fn count(&self) -> Option<usize> {
        match self {
            Value::Seq(items) => Some(items.len()),
            Value::Map(m) => Some(m.len()),
            Value::Set(s) => Some(s.len()),
            _ => None,
        }
    }

    /// Get value by key (for maps) or index (for sequences)
    pub fn get(&self, key: &Value) -> Option<&Value> {
        match (self, key) {
            (Value::Map(m), k) => m.get(k),
            (Value::Seq(items), Value::Integer(i)) => {
                let i = i.to_i64()?;
                let index = if i >= 0 { i } else { items.len() as i64 + i };
                usize::try_from(index).ok().and_then(|index| items.get(index))
            }
            _ => None,
        }
    }

    /// Get nested value using a path of keys
    pub fn get_in<I>(&self, path: I) -> Option<&Value>
    where
        I: IntoIterator<Item = Value>,
    {
        let mut current = Some(self);
        for key in path {
            current = current.and_then(|v| v.get(&key));
        }
        current
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Ratio(a), Value::Ratio(b)) => a == b,
            // NaN equals itself so it can live in sets and map keys.
            (Value::Float(a), Value::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Seq(a), Value::Seq(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Set(a), Value::Set(b)) => a == b,
            (Value::Inst(a), Value::Inst(b)) => a == b,
            (Value::Uuid(a), Value::Uuid(b)) => a == b,
            (Value::Tagged(a), Value::Tagged(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Nil => {}
            Value::Bool(b) => b.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Ratio(r) => r.hash(state),
            Value::Float(f) => {
                if f.is_nan() {
                    "NaN".hash(state);
                } else if *f == 0.0 {
                    // 0.0 and -0.0 compare equal
                    0u64.hash(state);
                } else {
                    f.to_bits().hash(state);
                }
            }
            Value::Decimal(d) => d.hash(state),
            Value::Text(s) => s.hash(state),
            Value::Seq(items) => items.hash(state),
            Value::Map(m) => {
                m.len().hash(state);
                unordered_hash(m.iter()).hash(state);
            }
            Value::Set(s) => {
                s.len().hash(state);
                unordered_hash(s.iter()).hash(state);
            }
            Value::Inst(t) => t.hash(state),
            Value::Uuid(u) => u.hash(state),
            Value::Tagged(t) => t.hash(state),
        }
    }
}

/// Hash that ignores iteration order, to agree with map and set equality.
fn unordered_hash<T: Hash>(items: impl Iterator<Item = T>) -> u64 {
    items
        .map(|item| {
            let mut hasher = DefaultHasher::new();
            item.hash(&mut hasher);
            hasher.finish()
        })
        .fold(0u64, u64::wrapping_add)
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! from_integer {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(i: $t) -> Self {
                Value::Integer(BigInt::from(i))
            }
        })*
    };
}

from_integer!(i32, i64, u32, u64);

impl From<BigInt> for Value {
    fn from(i: BigInt) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Seq(items)
    }
}

impl From<Uuid> for Value {
    fn from(u: Uuid) -> Self {
        Value::Uuid(u)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self {
        Value::Inst(t)
    }
}

impl FromIterator<Value> for Value {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Value::Seq(iter.into_iter().collect())
    }
}

impl FromIterator<(Value, Value)> for Value {
    fn from_iter<I: IntoIterator<Item = (Value, Value)>>(iter: I) -> Self {
        Value::Map(iter.into_iter().collect())
    }
}
