//! Core types for attrmodel.
//!
//! `attrmodel-core` holds the whole attribute-typing and change-tracking
//! machinery; the `attrmodel` facade re-exports it.
//!
//! # Role In The Architecture
//!
//! - **Values and storage**: `Value` is the dynamic field value; `Dataset` keeps a
//!   model's baseline values, its pending changes, and its persisted/destroyed state.
//! - **Attributes**: `Attr` is the typed coercion, default and nullability policy for
//!   one field. Built-in types are `Primitive<K>` instances; `TypeRegistry` maps type
//!   names to constructors and factories.
//! - **Attribute bags**: `Attrs` resolves `Type[Each]?` declarations lazily and caches
//!   each resolved attribute.
//! - **Metadata**: `Metadata` is built once per `ModelClass` by running its capability
//!   hooks and `init` hook, then shared.
//! - **Facade**: `Model` ties a dataset-backed type to its metadata, with custom
//!   accessors, change tracking and persistence helpers.
//!
//! Most applications should use the `attrmodel` facade.

pub mod accessor;
pub mod attr;
pub mod attrs;
pub mod dataset;
pub mod error;
pub mod grammar;
pub mod metadata;
pub mod model;
pub mod registry;
pub mod value;

pub use accessor::{Accessors, Getter, Setter};
pub use attr::{
    Attr, AttrCore, AttrDefault, AttrOptions, Boolean, BooleanAttr, DefaultFn, Each, Float,
    FloatAttr, Integer, IntegerAttr, Primary, PrimaryAttr, Primitive, PrimitiveKind,
    SerializeMode, Set, SetAttr, Text, TextAttr, Time, TimeAttr,
};
pub use attrs::{Attrs, Declaration, build_attr};
pub use dataset::{Dataset, Diff};
pub use error::{Error, Result};
pub use grammar::TypeSpec;
pub use metadata::{
    Capability, Hook, InitPhase, MODEL, Metadata, MetadataBuilder, ModelClass,
    PrimaryKeyResolver,
};
pub use model::{AnyModel, Model};
pub use registry::{
    AttrFactory, BuiltinType, TypeRegistry, TypeResolver, available_types, register_factory,
    register_type, resolve_type,
};
pub use value::{Record, Value};
