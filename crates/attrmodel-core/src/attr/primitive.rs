//! The shared primitive contract.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::{Attr, AttrDefault, AttrOptions, SerializeMode};
use crate::error::{Error, Result};
use crate::model::AnyModel;
use crate::value::{Record, Value};

/// Identity and policy common to every primitive attribute.
#[derive(Debug, Clone)]
pub struct AttrCore {
    name: String,
    key: String,
    nullable: bool,
    default: Option<AttrDefault>,
    serialize: SerializeMode,
    model: String,
}

impl AttrCore {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn nullable(&self) -> bool {
        self.nullable
    }

    /// Name of the owning model, empty for free-standing attributes.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Build the coercion error for `value`.
    pub fn invalid_value(
        &self,
        type_name: &str,
        value: &Value,
        reason: impl Into<String>,
    ) -> Error {
        Error::InvalidValue {
            attr: self.name.clone(),
            type_name: type_name.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// The per-type part of a primitive attribute.
///
/// Only [`cast`](PrimitiveKind::cast) carries type-specific behavior; the
/// remaining hooks have sensible defaults.
pub trait PrimitiveKind: fmt::Debug + Send + Sync + Sized + 'static {
    /// Registered type name.
    const TYPE_NAME: &'static str;

    fn from_options(name: &str, opts: &AttrOptions) -> Result<Self>;

    /// Default used when no `default` option was given.
    fn default_value(&self) -> Value {
        Value::Null
    }

    fn nullable_by_default(&self) -> bool {
        false
    }

    fn serialize_mode(&self) -> SerializeMode {
        SerializeMode::Value
    }

    fn is_primary(&self) -> bool {
        false
    }

    /// Coerce to the in-memory representation.
    fn cast(&self, core: &AttrCore, value: Value) -> Result<Value> {
        let _ = value;
        Err(Error::UnimplementedCast {
            attr: core.name().to_string(),
            type_name: Self::TYPE_NAME.to_string(),
        })
    }

    /// Coerce to the storage representation.
    fn cast_to_native(&self, core: &AttrCore, value: Value) -> Result<Value> {
        self.cast(core, value)
    }

    /// Post-process a resolved default.
    fn finish_default(&self, core: &AttrCore, value: Value) -> Result<Value> {
        let _ = core;
        Ok(value)
    }

    fn each(&self, core: &AttrCore) -> Result<Option<Arc<dyn Attr>>> {
        let _ = core;
        Ok(None)
    }
}

/// A primitive attribute of kind `K`.
#[derive(Debug)]
pub struct Primitive<K> {
    core: AttrCore,
    kind: K,
}

impl<K: PrimitiveKind> Primitive<K> {
    /// Build from options; unset options take the kind's defaults.
    pub fn new(name: impl Into<String>, opts: AttrOptions) -> Result<Self> {
        let name = name.into();
        let kind = K::from_options(&name, &opts)?;

        let key = opts
            .key
            .filter(|key| !key.is_empty())
            .unwrap_or_else(|| name.clone());
        let core = AttrCore {
            key,
            nullable: opts
                .nullable
                .unwrap_or_else(|| kind.nullable_by_default()),
            default: opts.default,
            serialize: opts.serialize.unwrap_or_else(|| kind.serialize_mode()),
            model: opts.model.unwrap_or_default(),
            name,
        };

        Ok(Self { core, kind })
    }

    pub fn core(&self) -> &AttrCore {
        &self.core
    }

    pub fn kind(&self) -> &K {
        &self.kind
    }

    fn resolve_default(&self, model: Option<&dyn AnyModel>) -> Result<Value> {
        let value = match &self.core.default {
            Some(default) => default.resolve(model),
            None => self.kind.default_value(),
        };
        self.kind.finish_default(&self.core, value)
    }
}

impl<K: PrimitiveKind> Attr for Primitive<K> {
    fn name(&self) -> &str {
        &self.core.name
    }

    fn key(&self) -> &str {
        &self.core.key
    }

    fn type_name(&self) -> &str {
        K::TYPE_NAME
    }

    fn nullable(&self) -> bool {
        self.core.nullable
    }

    fn serialize_mode(&self) -> SerializeMode {
        self.core.serialize
    }

    fn is_primary(&self) -> bool {
        self.kind.is_primary()
    }

    fn each(&self) -> Result<Option<Arc<dyn Attr>>> {
        self.kind.each(&self.core)
    }

    fn cast(&self, value: Value) -> Result<Value> {
        self.kind.cast(&self.core, value)
    }

    fn read(&self, model: Option<&dyn AnyModel>, value: Value) -> Result<Value> {
        if value.is_null() {
            return if self.core.nullable {
                Ok(Value::Null)
            } else {
                self.resolve_default(model)
            };
        }
        self.kind.cast(&self.core, value)
    }

    fn write(&self, _model: Option<&dyn AnyModel>, value: Value) -> Result<Value> {
        if value.is_null() && self.core.nullable {
            return Ok(Value::Null);
        }
        self.kind.cast(&self.core, value)
    }

    fn serialize(&self, model: Option<&dyn AnyModel>, _old: Value, new: Value) -> Result<Value> {
        if new.is_null() {
            return if self.core.nullable {
                Ok(Value::Null)
            } else {
                self.resolve_default(model)
            };
        }
        self.kind.cast_to_native(&self.core, new)
    }

    fn deserialize(&self, _result: Option<&Record>, value: Value) -> Result<Value> {
        if value.is_null() && self.core.nullable {
            return Ok(Value::Null);
        }
        self.kind.cast(&self.core, value)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Contract tests shared by every primitive kind.
///
/// `$sample` is a non-null value the kind can cast.
#[cfg(test)]
macro_rules! primitive_contract_tests {
    ($module:ident, $kind:ty, $sample:expr) => {
        mod $module {
            use std::collections::BTreeMap;
            use std::sync::Arc;
            use std::sync::atomic::{AtomicUsize, Ordering};

            use $crate::attr::{Attr, AttrOptions, Primitive};
            use $crate::value::Value;

            fn subject(opts: AttrOptions) -> Primitive<$kind> {
                Primitive::<$kind>::new("test", opts).unwrap()
            }

            fn object() -> Value {
                Value::Map(BTreeMap::from([("marker".to_string(), Value::Int(7))]))
            }

            fn counting_default(calls: &Arc<AtomicUsize>) -> AttrOptions {
                let calls = Arc::clone(calls);
                AttrOptions::default()
                    .nullable(false)
                    .default_with(move |_| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        object()
                    })
            }

            #[test]
            fn test_read_nullable() {
                let s = subject(AttrOptions::default().nullable(true));
                assert_eq!(s.read(None, Value::Null).unwrap(), Value::Null);
            }

            #[test]
            fn test_read_default() {
                let s = subject(AttrOptions::default().nullable(false).default_value(object()));
                assert_eq!(s.read(None, Value::Null).unwrap(), object());
            }

            #[test]
            fn test_read_default_callable() {
                let calls = Arc::new(AtomicUsize::new(0));
                let s = subject(counting_default(&calls));
                assert_eq!(s.read(None, Value::Null).unwrap(), object());
                assert_eq!(calls.load(Ordering::SeqCst), 1);
            }

            #[test]
            fn test_read_value() {
                let s = subject(AttrOptions::default());
                assert!(!s.read(None, $sample).unwrap().is_null());
            }

            #[test]
            fn test_write_nullable() {
                let s = subject(AttrOptions::default().nullable(true));
                assert_eq!(s.write(None, Value::Null).unwrap(), Value::Null);
            }

            #[test]
            fn test_write_value() {
                let s = subject(AttrOptions::default());
                assert!(!s.write(None, $sample).unwrap().is_null());
            }

            #[test]
            fn test_serialize_nullable() {
                let s = subject(AttrOptions::default().nullable(true));
                let out = s.serialize(None, Value::from("old"), Value::Null).unwrap();
                assert_eq!(out, Value::Null);
            }

            #[test]
            fn test_serialize_default() {
                let s = subject(AttrOptions::default().nullable(false).default_value(object()));
                let out = s.serialize(None, Value::from("old"), Value::Null).unwrap();
                assert_eq!(out, object());
            }

            #[test]
            fn test_serialize_default_callable() {
                let calls = Arc::new(AtomicUsize::new(0));
                let s = subject(counting_default(&calls));
                let out = s.serialize(None, Value::from("old"), Value::Null).unwrap();
                assert_eq!(out, object());
                assert_eq!(calls.load(Ordering::SeqCst), 1);
            }

            #[test]
            fn test_serialize_value() {
                let s = subject(AttrOptions::default());
                let out = s.serialize(None, Value::from("old"), $sample).unwrap();
                assert!(!out.is_null());
            }

            #[test]
            fn test_deserialize_nullable() {
                let s = subject(AttrOptions::default().nullable(true));
                assert_eq!(s.deserialize(None, Value::Null).unwrap(), Value::Null);
            }

            #[test]
            fn test_deserialize_value() {
                let s = subject(AttrOptions::default());
                assert!(!s.deserialize(None, $sample).unwrap().is_null());
            }

            #[test]
            fn test_name_and_key() {
                let s = subject(AttrOptions::default());
                assert_eq!(s.name(), "test");
                assert_eq!(s.key(), "test");

                let keyed = subject(AttrOptions::default().key("test_col"));
                assert_eq!(keyed.key(), "test_col");
            }
        }
    };
}

#[cfg(test)]
pub(crate) use primitive_contract_tests;
