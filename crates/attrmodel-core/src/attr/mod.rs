//! Typed attribute specifications.
//!
//! An attribute is a coercion, default and nullability policy for one named
//! field. Every built-in type is a [`Primitive`] parameterized by a
//! [`PrimitiveKind`] that only supplies the cast; the read/write/serialize
//! contract is shared.
//!
//! | Operation | null & nullable | null & not nullable | non-null |
//! |-----------|-----------------|---------------------|----------|
//! | `read` | null | default | `cast(value)` |
//! | `write` | null | `cast(null)` | `cast(value)` |
//! | `serialize` | null | default | native cast of `new` |
//! | `deserialize` | null | `cast(null)` | `cast(value)` |

mod primary;
mod primitive;
mod scalar;
mod set;
mod time;

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::model::AnyModel;
use crate::value::{Record, Value};

pub use primary::Primary;
pub use primitive::{AttrCore, Primitive, PrimitiveKind};
pub use scalar::{Boolean, Float, Integer, Text};
pub use set::Set;
pub use time::{DEFAULT_FORMAT, DEFAULT_TIMEZONE, Time};

pub type IntegerAttr = Primitive<Integer>;
pub type FloatAttr = Primitive<Float>;
pub type TextAttr = Primitive<Text>;
pub type BooleanAttr = Primitive<Boolean>;
pub type TimeAttr = Primitive<Time>;
pub type SetAttr = Primitive<Set>;
pub type PrimaryAttr = Primitive<Primary>;

/// How a persistence layer should treat an attribute when writing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SerializeMode {
    /// Never written.
    None,
    /// Written as a plain value.
    #[default]
    Value,
    /// Written before the owning row is persisted.
    PrePersist,
    /// Written after the owning row is persisted.
    PostPersist,
    /// The model identifier; persistence layers special-case it.
    Primary,
}

impl SerializeMode {
    /// Whether a generic write payload includes attributes in this mode.
    pub const fn in_payload(self) -> bool {
        matches!(self, SerializeMode::Value | SerializeMode::PrePersist)
    }
}

/// A resolved attribute: the typed policy for one field.
pub trait Attr: fmt::Debug + Send + Sync + 'static {
    /// Property name on the model.
    fn name(&self) -> &str;

    /// External storage key (defaults to the name).
    fn key(&self) -> &str;

    /// Registered type name, e.g. `"Integer"`.
    fn type_name(&self) -> &str;

    fn nullable(&self) -> bool;

    fn serialize_mode(&self) -> SerializeMode;

    /// True for identifier attributes.
    fn is_primary(&self) -> bool {
        false
    }

    /// The element attribute of a composite type, resolved on first use.
    fn each(&self) -> Result<Option<Arc<dyn Attr>>> {
        Ok(None)
    }

    /// Coerce a raw value to this attribute's type.
    fn cast(&self, value: Value) -> Result<Value>;

    /// Convert a stored value for a model read.
    fn read(&self, model: Option<&dyn AnyModel>, value: Value) -> Result<Value>;

    /// Convert an assigned value before it reaches the dataset.
    fn write(&self, model: Option<&dyn AnyModel>, value: Value) -> Result<Value>;

    /// Convert the pending value to its storage representation.
    fn serialize(&self, model: Option<&dyn AnyModel>, old: Value, new: Value) -> Result<Value>;

    /// Convert a storage value back, given the full storage record.
    fn deserialize(&self, result: Option<&Record>, value: Value) -> Result<Value>;

    fn as_any(&self) -> &dyn Any;
}

/// Signature of a computed default.
pub type DefaultFn = Arc<dyn Fn(Option<&dyn AnyModel>) -> Value + Send + Sync>;

/// The value used when a non-nullable attribute reads `Null`.
#[derive(Clone)]
pub enum AttrDefault {
    /// A fixed value.
    Value(Value),
    /// Computed from the model at the time the default is needed.
    Fn(DefaultFn),
}

impl AttrDefault {
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(Option<&dyn AnyModel>) -> Value + Send + Sync + 'static,
    {
        AttrDefault::Fn(Arc::new(f))
    }

    /// Produce the default for `model`.
    pub fn resolve(&self, model: Option<&dyn AnyModel>) -> Value {
        match self {
            AttrDefault::Value(v) => v.clone(),
            AttrDefault::Fn(f) => f(model),
        }
    }
}

impl fmt::Debug for AttrDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrDefault::Value(v) => f.debug_tuple("Value").field(v).finish(),
            AttrDefault::Fn(_) => f.write_str("Fn(..)"),
        }
    }
}

/// Element type of a composite attribute.
#[derive(Debug, Clone)]
pub enum Each {
    /// A type declaration, resolved through the registry on first use.
    Type(String),
    /// A ready-made attribute.
    Attr(Arc<dyn Attr>),
}

impl Each {
    /// Build the element attribute for the field `name` of `model`.
    pub(crate) fn resolve(&self, name: &str, model: &str) -> Result<Arc<dyn Attr>> {
        match self {
            Each::Attr(attr) => Ok(Arc::clone(attr)),
            Each::Type(decl) => {
                crate::attrs::build_attr(name, AttrOptions::new(decl.as_str()).model(model))
            }
        }
    }
}

impl From<&str> for Each {
    fn from(decl: &str) -> Self {
        Each::Type(decl.to_string())
    }
}

impl From<String> for Each {
    fn from(decl: String) -> Self {
        Each::Type(decl)
    }
}

impl From<Arc<dyn Attr>> for Each {
    fn from(attr: Arc<dyn Attr>) -> Self {
        Each::Attr(attr)
    }
}

/// Options for constructing an attribute.
///
/// Unset options fall back to the attribute kind's own defaults.
#[derive(Debug, Clone, Default)]
pub struct AttrOptions {
    /// Type declaration (`Integer`, `Set[Integer]?`, ...).
    pub type_name: Option<String>,
    /// Storage key; defaults to the attribute name.
    pub key: Option<String>,
    pub nullable: Option<bool>,
    pub default: Option<AttrDefault>,
    /// Element type for composite attributes.
    pub each: Option<Each>,
    /// strftime format for `Time`.
    pub format: Option<String>,
    /// Timezone for `Time` (`UTC` or a fixed offset such as `+02:00`).
    pub timezone: Option<String>,
    pub serialize: Option<SerializeMode>,
    /// Name of the owning model, injected by the attribute bag.
    pub model: Option<String>,
}

impl AttrOptions {
    /// Options for the given type declaration.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: Some(type_name.into()),
            ..Self::default()
        }
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }

    /// Fixed default value.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(AttrDefault::Value(value.into()));
        self
    }

    /// Default computed from the model each time it is needed.
    pub fn default_with<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<&dyn AnyModel>) -> Value + Send + Sync + 'static,
    {
        self.default = Some(AttrDefault::from_fn(f));
        self
    }

    pub fn each(mut self, each: impl Into<Each>) -> Self {
        self.each = Some(each.into());
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    pub fn serialize(mut self, mode: SerializeMode) -> Self {
        self.serialize = Some(mode);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}
