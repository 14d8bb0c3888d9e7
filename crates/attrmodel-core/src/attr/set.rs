//! Collection kind with an optional element type.

use std::sync::{Arc, OnceLock};

use super::{Attr, AttrCore, AttrOptions, Each, PrimitiveKind};
use crate::error::Result;
use crate::value::Value;

/// A list of values, each cast through the element attribute when one is
/// declared (`Set[Integer]`).
#[derive(Debug)]
pub struct Set {
    each: Option<Each>,
    resolved: OnceLock<Arc<dyn Attr>>,
}

impl Set {
    fn element(&self, core: &AttrCore) -> Result<Option<Arc<dyn Attr>>> {
        let Some(each) = &self.each else {
            return Ok(None);
        };
        if let Some(attr) = self.resolved.get() {
            return Ok(Some(Arc::clone(attr)));
        }

        let attr = each.resolve(core.name(), core.model())?;
        // A concurrent first use may have won; keep whichever landed.
        let _ = self.resolved.set(Arc::clone(&attr));
        Ok(Some(self.resolved.get().cloned().unwrap_or(attr)))
    }

    fn items(value: Value) -> Vec<Value> {
        match value {
            Value::Null => Vec::new(),
            Value::List(items) => items,
            Value::Map(map) => map.into_values().collect(),
            scalar => vec![scalar],
        }
    }
}

impl PrimitiveKind for Set {
    const TYPE_NAME: &'static str = "Set";

    fn from_options(_name: &str, opts: &AttrOptions) -> Result<Self> {
        Ok(Self {
            each: opts.each.clone(),
            resolved: OnceLock::new(),
        })
    }

    fn default_value(&self) -> Value {
        Value::List(Vec::new())
    }

    fn cast(&self, core: &AttrCore, value: Value) -> Result<Value> {
        let items = Self::items(value);
        let items = match self.element(core)? {
            Some(each) => items
                .into_iter()
                .map(|item| each.cast(item))
                .collect::<Result<Vec<_>>>()?,
            None => items,
        };
        Ok(Value::List(items))
    }

    fn cast_to_native(&self, core: &AttrCore, value: Value) -> Result<Value> {
        let items = Self::items(value);
        let items = match self.element(core)? {
            Some(each) => items
                .into_iter()
                .map(|item| each.serialize(None, Value::Null, item))
                .collect::<Result<Vec<_>>>()?,
            None => items,
        };
        Ok(Value::List(items))
    }

    fn each(&self, core: &AttrCore) -> Result<Option<Arc<dyn Attr>>> {
        self.element(core)
    }
}
