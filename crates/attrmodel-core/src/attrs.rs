//! The per-model attribute bag.
//!
//! Declarations are stored as given and resolved into attributes the first
//! time they are looked up; each resolution happens at most once and the
//! result is shared by every later lookup.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::attr::{Attr, AttrOptions, Each, SerializeMode};
use crate::error::{Error, Result};
use crate::grammar;
use crate::registry::{self, AttrFactory, TypeResolver};
use crate::value::Value;

/// How an attribute was declared.
#[derive(Clone)]
pub enum Declaration {
    /// A type name or `Type[Each]?` expression.
    Type(String),
    /// Options carrying their own type declaration.
    Options(AttrOptions),
    /// Called with the attribute name and options.
    Factory(AttrFactory),
    /// A ready-made attribute, used as is.
    Attr(Arc<dyn Attr>),
}

impl Declaration {
    /// A factory declaration.
    pub fn factory<F>(f: F) -> Self
    where
        F: Fn(&str, AttrOptions) -> Result<Arc<dyn Attr>> + Send + Sync + 'static,
    {
        Declaration::Factory(Arc::new(f))
    }

    /// Read a declaration from JSON.
    ///
    /// A string is a type declaration. An array takes its first string entry
    /// as the type, wherever it sits, and merges any object entries as
    /// options; an object entry's `type` wins over the positional one. An
    /// object must carry `type`.
    pub fn from_json(json: &serde_json::Value) -> Option<Self> {
        match json {
            serde_json::Value::String(decl) => Some(Declaration::Type(decl.clone())),
            serde_json::Value::Array(entries) => {
                let mut opts = AttrOptions::default();
                opts.type_name = entries.iter().find_map(|entry| match entry {
                    serde_json::Value::String(decl) => Some(decl.clone()),
                    _ => None,
                });
                for entry in entries {
                    if let serde_json::Value::Object(map) = entry {
                        merge_json_options(&mut opts, map)?;
                    }
                }
                opts.type_name.is_some().then_some(Declaration::Options(opts))
            }
            serde_json::Value::Object(map) => {
                let mut opts = AttrOptions::default();
                merge_json_options(&mut opts, map)?;
                opts.type_name.is_some().then_some(Declaration::Options(opts))
            }
            _ => None,
        }
    }

    fn build(&self, name: &str, model: &str) -> Result<Arc<dyn Attr>> {
        match self {
            Declaration::Type(decl) => {
                build_attr(name, AttrOptions::new(decl.as_str()).model(model))
            }
            Declaration::Options(opts) => {
                let mut opts = opts.clone();
                opts.model.get_or_insert_with(|| model.to_string());
                build_attr(name, opts)
            }
            Declaration::Factory(factory) => factory(name, AttrOptions::default().model(model)),
            Declaration::Attr(attr) => Ok(Arc::clone(attr)),
        }
    }
}

impl fmt::Debug for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Declaration::Type(decl) => f.debug_tuple("Type").field(decl).finish(),
            Declaration::Options(opts) => f.debug_tuple("Options").field(opts).finish(),
            Declaration::Factory(_) => f.write_str("Factory(..)"),
            Declaration::Attr(attr) => f.debug_tuple("Attr").field(attr).finish(),
        }
    }
}

impl From<&str> for Declaration {
    fn from(decl: &str) -> Self {
        Declaration::Type(decl.to_string())
    }
}

impl From<String> for Declaration {
    fn from(decl: String) -> Self {
        Declaration::Type(decl)
    }
}

impl From<AttrOptions> for Declaration {
    fn from(opts: AttrOptions) -> Self {
        Declaration::Options(opts)
    }
}

impl From<Arc<dyn Attr>> for Declaration {
    fn from(attr: Arc<dyn Attr>) -> Self {
        Declaration::Attr(attr)
    }
}

fn merge_json_options(
    opts: &mut AttrOptions,
    map: &serde_json::Map<String, serde_json::Value>,
) -> Option<()> {
    for (key, value) in map {
        match key.as_str() {
            "type" => opts.type_name = Some(value.as_str()?.to_string()),
            "key" => opts.key = Some(value.as_str()?.to_string()),
            "nullable" => opts.nullable = Some(value.as_bool()?),
            "default" => {
                opts.default = Some(crate::attr::AttrDefault::Value(Value::from(value.clone())));
            }
            "each" => opts.each = Some(Each::from(value.as_str()?)),
            "format" => opts.format = Some(value.as_str()?.to_string()),
            "timezone" => opts.timezone = Some(value.as_str()?.to_string()),
            "serialize" => opts.serialize = Some(serialize_mode(value.as_str()?)?),
            _ => {}
        }
    }
    Some(())
}

fn serialize_mode(name: &str) -> Option<SerializeMode> {
    let mode = match name.to_ascii_lowercase().as_str() {
        "none" => SerializeMode::None,
        "value" => SerializeMode::Value,
        "prepersist" | "pre_persist" => SerializeMode::PrePersist,
        "postpersist" | "post_persist" => SerializeMode::PostPersist,
        "primary" => SerializeMode::Primary,
        _ => return None,
    };
    Some(mode)
}

/// Build the attribute `name` from `opts`.
///
/// The type declaration in `opts.type_name` is resolved through the type
/// registry. A name registered verbatim is used directly; anything else must
/// be a `Type[Each]?` expression, whose element type becomes the `each`
/// option and whose trailing `?` makes the attribute nullable.
pub fn build_attr(name: &str, mut opts: AttrOptions) -> Result<Arc<dyn Attr>> {
    let model = opts.model.clone().unwrap_or_default();
    let decl = opts
        .type_name
        .take()
        .filter(|decl| !decl.is_empty())
        .ok_or_else(|| Error::invalid_type(&model, name, ""))?;

    let resolver = match registry::resolve_type(&decl) {
        TypeResolver::External(_) => {
            let spec = grammar::parse(&decl)
                .ok_or_else(|| Error::invalid_type(&model, name, decl.as_str()))?;
            if let Some(each) = spec.each {
                opts.each = Some(Each::from(each));
            }
            if spec.nullable {
                opts.nullable = Some(true);
            }
            registry::resolve_type(spec.type_name)
        }
        resolver => resolver,
    };
    opts.type_name = Some(decl.clone());

    tracing::debug!(model = %model, attr = %name, type_name = %decl, "Resolving attribute");

    match resolver {
        TypeResolver::Builtin(builtin) => builtin.build(name, opts),
        TypeResolver::Factory(factory) => factory(name, opts),
        TypeResolver::External(_) => Err(Error::invalid_type(model, name, decl)),
    }
}

#[derive(Debug)]
struct Entry {
    name: String,
    decl: Declaration,
    resolved: OnceLock<Result<Arc<dyn Attr>>>,
}

impl Entry {
    fn new(name: String, decl: Declaration) -> Self {
        Self {
            name,
            decl,
            resolved: OnceLock::new(),
        }
    }
}

/// Ordered attribute declarations for one model.
#[derive(Debug, Default)]
pub struct Attrs {
    model: String,
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
}

impl Attrs {
    /// An empty bag for the model named `model`.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    /// Name of the owning model.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Declare `name`. Redeclaring keeps the original position and drops any
    /// resolved attribute.
    pub fn set(&mut self, name: impl Into<String>, decl: impl Into<Declaration>) -> &mut Self {
        let name = name.into();
        let decl = decl.into();
        match self.index.get(&name) {
            Some(&i) => self.entries[i] = Entry::new(name, decl),
            None => {
                self.index.insert(name.clone(), self.entries.len());
                self.entries.push(Entry::new(name, decl));
            }
        }
        self
    }

    /// Declare `name` from a JSON declaration (see [`Declaration::from_json`]).
    pub fn set_json(
        &mut self,
        name: impl Into<String>,
        json: &serde_json::Value,
    ) -> Result<&mut Self> {
        let name = name.into();
        let decl = Declaration::from_json(json).ok_or_else(|| {
            Error::invalid_type(self.model.as_str(), name.as_str(), json.to_string())
        })?;
        Ok(self.set(name, decl))
    }

    /// Whether `name` is declared. Never resolves.
    pub fn has(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// The attribute for `name`, resolving its declaration on first use.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Attr>> {
        let entry = self
            .index
            .get(name)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| Error::InvalidAttribute {
                model: self.model.clone(),
                attr: name.to_string(),
            })?;
        self.resolve(entry)
    }

    fn resolve(&self, entry: &Entry) -> Result<Arc<dyn Attr>> {
        entry
            .resolved
            .get_or_init(|| entry.decl.build(&entry.name, &self.model))
            .clone()
    }

    /// Every attribute in declaration order, resolving as needed.
    pub fn iter(&self) -> impl Iterator<Item = Result<Arc<dyn Attr>>> + '_ {
        self.entries.iter().map(|entry| self.resolve(entry))
    }

    /// Declared names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for Attrs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<serde_json::Value> = self.names().map(serde_json::Value::from).collect();
        write!(f, "Attrs:{}", serde_json::Value::Array(names))
    }
}
