//! Values attached to log events as extra fields
//!
//! Everything a producer attaches is converted into a [`FieldValue`] at the
//! call site, so the snapshot that crosses the queue owns its data. Values
//! that have no natural JSON shape are wrapped as [`OpaqueValue`] and
//! rendered later through the encoder registry.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Value type for structured extra fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    List(Vec<FieldValue>),
    /// Rendered as a JSON array; element order is unspecified
    Set(Vec<FieldValue>),
    Map(BTreeMap<String, FieldValue>),
    Date(NaiveDate),
    DateTime(DateTime<FixedOffset>),
    NaiveDateTime(NaiveDateTime),
    Opaque(OpaqueValue),
}

impl FieldValue {
    /// Wrap an arbitrary application value.
    ///
    /// Its `Debug` text is captured now and used whenever no encoder is
    /// registered for `T` (or the encoder fails).
    pub fn opaque<T>(value: T) -> Self
    where
        T: Any + fmt::Debug + Send + Sync,
    {
        FieldValue::Opaque(OpaqueValue::new(value))
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "null"),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::UInt(u) => write!(f, "{}", u),
            FieldValue::Float(fl) => write!(f, "{}", fl),
            FieldValue::String(s) => write!(f, "{}", s),
            FieldValue::List(items) | FieldValue::Set(items) => {
                write!(f, "[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            FieldValue::Map(map) => {
                write!(f, "{{")?;
                for (idx, (k, v)) in map.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            FieldValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            FieldValue::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            FieldValue::NaiveDateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.f")),
            FieldValue::Opaque(o) => write!(f, "{}", o.repr()),
        }
    }
}

/// An application value without a native JSON form.
///
/// Cloning is cheap: the value itself is shared. When serialized for
/// another process only the type name and the captured representation
/// survive; the deserialized copy is "detached" and always renders as
/// that representation.
#[derive(Clone)]
pub struct OpaqueValue {
    value: Option<Arc<dyn Any + Send + Sync>>,
    type_id: TypeId,
    type_name: Cow<'static, str>,
    repr: String,
}

/// Type id used by detached values so no registered encoder ever matches
struct Detached;

impl OpaqueValue {
    pub fn new<T>(value: T) -> Self
    where
        T: Any + fmt::Debug + Send + Sync,
    {
        let repr = format!("{:?}", value);
        Self {
            value: Some(Arc::new(value)),
            type_id: TypeId::of::<T>(),
            type_name: Cow::Borrowed(std::any::type_name::<T>()),
            repr,
        }
    }

    fn detached(type_name: String, repr: String) -> Self {
        Self {
            value: None,
            type_id: TypeId::of::<Detached>(),
            type_name: Cow::Owned(type_name),
            repr,
        }
    }

    /// Exact runtime type of the wrapped value
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Last-resort string representation
    pub fn repr(&self) -> &str {
        &self.repr
    }

    /// Borrow the wrapped value; `None` for detached copies
    pub fn value(&self) -> Option<&(dyn Any + Send + Sync)> {
        self.value.as_deref()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.as_deref().and_then(|v| v.downcast_ref::<T>())
    }

    pub fn is_detached(&self) -> bool {
        self.value.is_none()
    }
}

impl fmt::Debug for OpaqueValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpaqueValue")
            .field("type_name", &self.type_name)
            .field("repr", &self.repr)
            .finish()
    }
}

#[derive(Serialize, Deserialize)]
struct OpaqueWire {
    type_name: String,
    repr: String,
}

impl Serialize for OpaqueValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        OpaqueWire {
            type_name: self.type_name.to_string(),
            repr: self.repr.clone(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for OpaqueValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = OpaqueWire::deserialize(deserializer)?;
        Ok(OpaqueValue::detached(wire.type_name, wire.repr))
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

macro_rules! impl_from_signed {
    ($($ty:ty),*) => {
        $(impl From<$ty> for FieldValue {
            fn from(i: $ty) -> Self {
                FieldValue::Int(i as i64)
            }
        })*
    };
}

macro_rules! impl_from_unsigned {
    ($($ty:ty),*) => {
        $(impl From<$ty> for FieldValue {
            fn from(u: $ty) -> Self {
                FieldValue::UInt(u as u64)
            }
        })*
    };
}

impl_from_signed!(i8, i16, i32, i64, isize);
impl_from_unsigned!(u8, u16, u32, u64, usize);

impl From<f32> for FieldValue {
    fn from(f: f32) -> Self {
        FieldValue::Float(f as f64)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(items: Vec<T>) -> Self {
        FieldValue::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<FieldValue>, S> From<HashSet<T, S>> for FieldValue {
    fn from(items: HashSet<T, S>) -> Self {
        FieldValue::Set(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<FieldValue>> From<BTreeSet<T>> for FieldValue {
    fn from(items: BTreeSet<T>) -> Self {
        FieldValue::Set(items.into_iter().map(Into::into).collect())
    }
}

impl<K: fmt::Display, V: Into<FieldValue>, S> From<HashMap<K, V, S>> for FieldValue {
    fn from(map: HashMap<K, V, S>) -> Self {
        FieldValue::Map(map.into_iter().map(|(k, v)| (k.to_string(), v.into())).collect())
    }
}

impl<K: fmt::Display, V: Into<FieldValue>> From<BTreeMap<K, V>> for FieldValue {
    fn from(map: BTreeMap<K, V>) -> Self {
        FieldValue::Map(map.into_iter().map(|(k, v)| (k.to_string(), v.into())).collect())
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(date: NaiveDate) -> Self {
        FieldValue::Date(date)
    }
}

impl From<NaiveDateTime> for FieldValue {
    fn from(dt: NaiveDateTime) -> Self {
        FieldValue::NaiveDateTime(dt)
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for FieldValue {
    fn from(dt: DateTime<Tz>) -> Self {
        FieldValue::DateTime(dt.fixed_offset())
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    FieldValue::Int(i)
                } else if let Some(u) = n.as_u64() {
                    FieldValue::UInt(u)
                } else {
                    FieldValue::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => FieldValue::String(s),
            Value::Array(items) => FieldValue::List(items.into_iter().map(Into::into).collect()),
            Value::Object(map) => {
                FieldValue::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<OpaqueValue> for FieldValue {
    fn from(value: OpaqueValue) -> Self {
        FieldValue::Opaque(value)
    }
}
