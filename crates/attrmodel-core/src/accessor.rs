//! Custom getters and setters.
//!
//! A model type may route named fields through its own functions, for
//! computed fields or for normalizing input before it is written. The table
//! is built once per model type, from [`Model::accessors`], and shared.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::error::Result;
use crate::model::Model;
use crate::value::Value;

/// Computes a field from the model.
pub type Getter<M> = fn(&M) -> Result<Value>;

/// Receives an assigned field value; expected to call `write` itself.
pub type Setter<M> = fn(&mut M, Value) -> Result<()>;

/// Field name to custom getter/setter, for one model type.
pub struct Accessors<M> {
    getters: HashMap<String, Getter<M>>,
    setters: HashMap<String, Setter<M>>,
}

impl<M> Accessors<M> {
    pub fn new() -> Self {
        Self {
            getters: HashMap::new(),
            setters: HashMap::new(),
        }
    }

    pub fn getter(&mut self, name: impl Into<String>, getter: Getter<M>) -> &mut Self {
        self.getters.insert(name.into(), getter);
        self
    }

    pub fn setter(&mut self, name: impl Into<String>, setter: Setter<M>) -> &mut Self {
        self.setters.insert(name.into(), setter);
        self
    }

    pub fn get(&self, name: &str) -> Option<Getter<M>> {
        self.getters.get(name).copied()
    }

    pub fn set(&self, name: &str) -> Option<Setter<M>> {
        self.setters.get(name).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.getters.is_empty() && self.setters.is_empty()
    }
}

impl<M> Default for Accessors<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> fmt::Debug for Accessors<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut getters: Vec<&str> = self.getters.keys().map(String::as_str).collect();
        let mut setters: Vec<&str> = self.setters.keys().map(String::as_str).collect();
        getters.sort_unstable();
        setters.sort_unstable();
        f.debug_struct("Accessors")
            .field("getters", &getters)
            .field("setters", &setters)
            .finish()
    }
}

type Cache = RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>;

fn cache() -> &'static Cache {
    static CACHE: OnceLock<Cache> = OnceLock::new();
    CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// The accessor table of `M`, built on first use.
pub fn shared<M: Model>() -> Arc<Accessors<M>> {
    let id = TypeId::of::<M>();
    {
        let cache = cache().read().unwrap_or_else(PoisonError::into_inner);
        if let Some(table) = cache.get(&id).and_then(|t| Arc::clone(t).downcast().ok()) {
            return table;
        }
    }

    let mut table = Accessors::new();
    M::accessors(&mut table);

    let mut cache = cache().write().unwrap_or_else(PoisonError::into_inner);
    let entry = cache
        .entry(id)
        .or_insert_with(|| Arc::new(table) as Arc<dyn Any + Send + Sync>);
    Arc::clone(entry).downcast().unwrap_or_else(|_| Arc::new(Accessors::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Probe(i64);

    fn double(p: &Probe) -> Result<Value> {
        Ok(Value::Int(p.0 * 2))
    }

    fn assign(p: &mut Probe, v: Value) -> Result<()> {
        p.0 = v.as_i64().unwrap_or_default();
        Ok(())
    }

    #[test]
    fn test_lookup() {
        let mut table = Accessors::<Probe>::new();
        table.getter("double", double).setter("n", assign);

        let mut probe = Probe(4);
        assert_eq!(table.get("double").unwrap()(&probe).unwrap(), Value::Int(8));
        table.set("n").unwrap()(&mut probe, Value::Int(9)).unwrap();
        assert_eq!(probe.0, 9);

        assert!(table.get("n").is_none());
        assert!(table.set("double").is_none());
        assert_eq!(
            format!("{table:?}"),
            r#"Accessors { getters: ["double"], setters: ["n"] }"#
        );
    }
}
