//! Type encoder registry
//!
//! Maps an exact runtime type to a function producing a JSON value. The
//! JSON formatter consults it for [`OpaqueValue`]s. Lookup is by
//! [`TypeId`], so a wrapper type never picks up the encoder of the type it
//! wraps.

use super::error::{panic_message, LoggerError, Result};
use super::field_value::OpaqueValue;
use parking_lot::RwLock;
use serde_json::Value;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

type EncodeFn = dyn Fn(&dyn Any) -> Result<Value> + Send + Sync;

/// A registered rendering function, cheap to clone
#[derive(Clone)]
pub struct Encoder {
    type_name: &'static str,
    encode: Arc<EncodeFn>,
}

impl Encoder {
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Run the encoder, turning panics into [`LoggerError::EncoderFailed`]
    pub fn encode(&self, value: &dyn Any) -> Result<Value> {
        match catch_unwind(AssertUnwindSafe(|| (self.encode)(value))) {
            Ok(result) => result,
            Err(payload) => Err(LoggerError::encoder(
                self.type_name,
                format!("panicked: {}", panic_message(payload.as_ref())),
            )),
        }
    }
}

impl std::fmt::Debug for Encoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Encoder")
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// Process-wide mapping from runtime type to encoder.
///
/// Reads take a short read lock to clone the encoder handle; the encoder
/// runs after the lock is released, so registration never waits on a
/// render in progress.
///
/// # Example
///
/// ```
/// use rust_queue_logger::core::EncoderRegistry;
/// use serde_json::json;
///
/// #[derive(Debug)]
/// struct UserId(u64);
///
/// let registry = EncoderRegistry::new();
/// registry.register(|id: &UserId| json!(format!("user-{}", id.0)));
/// assert!(registry.resolve(std::any::TypeId::of::<UserId>()).is_some());
/// ```
#[derive(Default)]
pub struct EncoderRegistry {
    encoders: RwLock<HashMap<TypeId, Encoder>>,
}

impl EncoderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install or replace the encoder for `T`
    pub fn register<T, F>(&self, encode: F)
    where
        T: Any,
        F: Fn(&T) -> Value + Send + Sync + 'static,
    {
        self.register_fallible(move |value: &T| Ok::<_, LoggerError>(encode(value)));
    }

    /// Install or replace an encoder for `T` that may fail
    pub fn register_fallible<T, F, E>(&self, encode: F)
    where
        T: Any,
        F: Fn(&T) -> std::result::Result<Value, E> + Send + Sync + 'static,
        E: std::fmt::Display,
    {
        let type_name = std::any::type_name::<T>();
        let erased = move |value: &dyn Any| -> Result<Value> {
            let typed = value.downcast_ref::<T>().ok_or_else(|| {
                LoggerError::encoder(type_name, "value does not have the registered type")
            })?;
            encode(typed).map_err(|e| LoggerError::encoder(type_name, e.to_string()))
        };

        self.encoders.write().insert(
            TypeId::of::<T>(),
            Encoder {
                type_name,
                encode: Arc::new(erased),
            },
        );
    }

    pub fn resolve(&self, type_id: TypeId) -> Option<Encoder> {
        self.encoders.read().get(&type_id).cloned()
    }

    pub fn contains(&self, type_id: TypeId) -> bool {
        self.encoders.read().contains_key(&type_id)
    }

    pub fn len(&self) -> usize {
        self.encoders.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.encoders.read().is_empty()
    }

    /// Encode an opaque value.
    ///
    /// `None` when no encoder matches the value's exact type (detached
    /// values never match).
    pub fn encode(&self, value: &OpaqueValue) -> Option<Result<Value>> {
        let inner = value.value()?;
        let encoder = self.resolve(value.type_id())?;
        Some(encoder.encode(inner))
    }
}

/// Register an encoder in the process-wide registry
///
/// # Example
///
/// ```
/// use rust_queue_logger::register_encoder;
///
/// #[derive(Debug)]
/// struct Celsius(f64);
///
/// register_encoder(|c: &Celsius| serde_json::json!({ "celsius": c.0 }));
/// ```
pub fn register_encoder<T, F>(encode: F)
where
    T: Any,
    F: Fn(&T) -> Value + Send + Sync + 'static,
{
    super::runtime::Runtime::global().encoders().register(encode);
}
