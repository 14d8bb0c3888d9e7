//! The model facade.
//!
//! A model is any type that owns a [`Dataset`] and names its static
//! [`ModelClass`]. Implementing the four required items of [`Model`] gives
//! typed reads and writes through the class's attributes, custom accessors,
//! change tracking, and helpers for a persistence layer.
//!
//! ```ignore
//! static USER: ModelClass = ModelClass::new("app::User").uses(&[&MODEL]).init(User::init);
//!
//! struct User {
//!     data: Dataset,
//! }
//!
//! impl User {
//!     fn init(m: &mut MetadataBuilder) -> Result<()> {
//!         m.attr("id", "Primary")?
//!             .attr("email", "String")?
//!             .attr("lastLogin", "Time?")?;
//!         Ok(())
//!     }
//! }
//!
//! impl Model for User {
//!     fn class() -> &'static ModelClass { &USER }
//!     fn from_dataset(data: Dataset) -> Self { Self { data } }
//!     fn dataset(&self) -> &Dataset { &self.data }
//!     fn dataset_mut(&mut self) -> &mut Dataset { &mut self.data }
//! }
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::accessor::{self, Accessors};
use crate::attr::Attr;
use crate::dataset::{Dataset, Diff};
use crate::error::Result;
use crate::metadata::{Metadata, ModelClass};
use crate::value::{Record, Value};

/// Object-safe view of a model, handed to computed defaults.
pub trait AnyModel {
    fn model_class(&self) -> &'static ModelClass;

    fn dataset_view(&self) -> &Dataset;

    fn as_any(&self) -> &dyn Any;

    /// The raw stored value of `name`, `Null` if absent.
    fn raw(&self, name: &str) -> Value {
        self.dataset_view().read_or(name, Value::Null)
    }
}

impl<M: Model> AnyModel for M {
    fn model_class(&self) -> &'static ModelClass {
        M::class()
    }

    fn dataset_view(&self) -> &Dataset {
        self.dataset()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Typed access to a dataset-backed object.
pub trait Model: Sized + 'static {
    /// The static class description.
    fn class() -> &'static ModelClass;

    fn from_dataset(dataset: Dataset) -> Self;

    fn dataset(&self) -> &Dataset;

    fn dataset_mut(&mut self) -> &mut Dataset;

    /// Register custom getters and setters. Called once per model type.
    fn accessors(table: &mut Accessors<Self>) {
        let _ = table;
    }

    fn new() -> Self {
        Self::from_dataset(Dataset::new())
    }

    /// Construct from initial values or a ready dataset.
    fn with_data(data: impl Into<Dataset>) -> Self {
        Self::from_dataset(data.into())
    }

    fn metadata() -> Result<Arc<Metadata>> {
        Metadata::of(Self::class())
    }

    /// The attribute declared as `name`, or `None` for undeclared names.
    fn attr(name: &str) -> Result<Option<Arc<dyn Attr>>> {
        match Self::metadata()?.attr(name) {
            Ok(attr) => Ok(Some(attr)),
            Err(err) if err.is_invalid_attribute() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Read `name` through its attribute, bypassing custom getters.
    fn read(&self, name: &str) -> Result<Value> {
        let value = self.dataset().read_or(name, Value::Null);
        match Self::attr(name)? {
            Some(attr) => attr.read(Some(self as &dyn AnyModel), value),
            None => Ok(value),
        }
    }

    /// Write `name` through its attribute, bypassing custom setters.
    fn write(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Self> {
        let mut value = value.into();
        if let Some(attr) = Self::attr(name)? {
            value = attr.write(Some(&*self as &dyn AnyModel), value)?;
        }
        self.dataset_mut().write(name, value);
        Ok(self)
    }

    /// Read `name`, through its custom getter if one is registered.
    fn get(&self, name: &str) -> Result<Value> {
        match accessor::shared::<Self>().get(name) {
            Some(getter) => getter(self),
            None => self.read(name),
        }
    }

    /// Assign `name`, through its custom setter if one is registered.
    fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        match accessor::shared::<Self>().set(name) {
            Some(setter) => setter(self, value),
            None => self.write(name, value).map(|_| ()),
        }
    }

    /// Whether `name` is a declared attribute or has a stored value.
    ///
    /// A class whose metadata fails to build, or that has no attribute bag,
    /// answers from the dataset alone.
    fn is_set(&self, name: &str) -> bool {
        let declared = Self::metadata()
            .ok()
            .and_then(|m| m.attrs().ok().map(|attrs| attrs.has(name)))
            .unwrap_or(false);
        declared || self.dataset().has(name)
    }

    fn changed(&self, name: &str) -> bool {
        self.dataset().is_changed(name)
    }

    fn diff(&self, name: &str) -> Option<Diff> {
        self.dataset().diff(name)
    }

    fn is_persisted(&self) -> bool {
        self.dataset().is_persisted()
    }

    /// The value of the primary key attribute.
    fn id(&self) -> Result<Value> {
        let pk = Self::metadata()?.primary_key()?;
        self.read(pk.name())
    }

    /// The storage record a persistence layer should write: every attribute
    /// with a pending diff whose serialize mode is `Value` or `PrePersist`,
    /// converted with `serialize` and keyed by storage key.
    fn persist_payload(&self) -> Result<Record> {
        let metadata = Self::metadata()?;
        let mut payload = Record::new();
        for attr in metadata.attrs()?.iter() {
            let attr = attr?;
            if !attr.serialize_mode().in_payload() {
                continue;
            }
            if let Some(diff) = self.dataset().diff(attr.name()) {
                let (old, new) = diff.into_pair();
                let value = attr.serialize(Some(self as &dyn AnyModel), old, new)?;
                payload.insert(attr.key().to_string(), value);
            }
        }
        Ok(payload)
    }

    /// Hydrate a persisted model from a storage record.
    ///
    /// Keys matching an attribute's storage key are converted with its
    /// `deserialize` and stored under the attribute name; other keys are
    /// kept as is.
    fn from_record(record: Record) -> Result<Self> {
        let metadata = Self::metadata()?;
        let mut by_key: HashMap<String, Arc<dyn Attr>> = HashMap::new();
        for attr in metadata.attrs()?.iter() {
            let attr = attr?;
            by_key.insert(attr.key().to_string(), attr);
        }

        let mut data = Record::new();
        for (key, value) in &record {
            match by_key.get(key) {
                Some(attr) => {
                    let value = attr.deserialize(Some(&record), value.clone())?;
                    data.insert(attr.name().to_string(), value);
                }
                None => {
                    data.insert(key.clone(), value.clone());
                }
            }
        }

        let mut dataset = Dataset::from(data);
        dataset.mark_persisted();
        tracing::debug!(
            model = metadata.name(),
            fields = dataset.values().len(),
            "Hydrated model from record"
        );
        Ok(Self::from_dataset(dataset))
    }
}
