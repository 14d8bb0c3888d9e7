//! Identifier kind.

use std::sync::{Arc, OnceLock};

use super::{Attr, AttrCore, AttrOptions, Each, PrimitiveKind, SerializeMode};
use crate::error::Result;
use crate::value::Value;

/// The model identifier. Nullable by default, since a transient model has no
/// id yet; values are cast through the element type (`Integer` unless
/// `each` says otherwise).
#[derive(Debug)]
pub struct Primary {
    each: Each,
    resolved: OnceLock<Arc<dyn Attr>>,
}

impl Primary {
    fn element(&self, core: &AttrCore) -> Result<Arc<dyn Attr>> {
        if let Some(attr) = self.resolved.get() {
            return Ok(Arc::clone(attr));
        }
        let attr = self.each.resolve(core.name(), core.model())?;
        let _ = self.resolved.set(Arc::clone(&attr));
        Ok(self.resolved.get().cloned().unwrap_or(attr))
    }
}

impl PrimitiveKind for Primary {
    const TYPE_NAME: &'static str = "Primary";

    fn from_options(_name: &str, opts: &AttrOptions) -> Result<Self> {
        Ok(Self {
            each: opts.each.clone().unwrap_or_else(|| Each::from("Integer")),
            resolved: OnceLock::new(),
        })
    }

    fn nullable_by_default(&self) -> bool {
        true
    }

    fn serialize_mode(&self) -> SerializeMode {
        SerializeMode::Primary
    }

    fn is_primary(&self) -> bool {
        true
    }

    fn cast(&self, core: &AttrCore, value: Value) -> Result<Value> {
        self.element(core)?.cast(value)
    }

    fn cast_to_native(&self, core: &AttrCore, value: Value) -> Result<Value> {
        self.element(core)?.serialize(None, Value::Null, value)
    }

    fn each(&self, core: &AttrCore) -> Result<Option<Arc<dyn Attr>>> {
        self.element(core).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::super::primitive::primitive_contract_tests;
    use super::*;
    use crate::attr::{Primitive, TextAttr};

    primitive_contract_tests!(primary_contract, super::Primary, Value::Int(5));

    #[test]
    fn test_defaults() {
        let id = Primitive::<Primary>::new("id", AttrOptions::default()).unwrap();
        assert!(id.nullable());
        assert!(id.is_primary());
        assert_eq!(id.serialize_mode(), SerializeMode::Primary);
        assert_eq!(id.read(None, Value::Null).unwrap(), Value::Null);
        assert_eq!(id.cast(Value::from("42")).unwrap(), Value::Int(42));
        assert_eq!(id.each().unwrap().unwrap().type_name(), "Integer");
    }

    #[test]
    fn test_custom_element_type() {
        let id = Primitive::<Primary>::new("uuid", AttrOptions::default().each("String")).unwrap();
        assert_eq!(id.cast(Value::Int(7)).unwrap(), Value::from("7"));

        let text: Arc<dyn Attr> = Arc::new(TextAttr::new("code", AttrOptions::default()).unwrap());
        let id = Primitive::<Primary>::new("code", AttrOptions::default().each(text)).unwrap();
        assert_eq!(id.write(None, Value::Int(1)).unwrap(), Value::from("1"));
    }

    #[test]
    fn test_still_primary_when_serialize_overridden() {
        let id = Primitive::<Primary>::new(
            "id",
            AttrOptions::default().serialize(SerializeMode::Value),
        )
        .unwrap();
        assert!(id.is_primary());
        assert_eq!(id.serialize_mode(), SerializeMode::Value);
    }
}
