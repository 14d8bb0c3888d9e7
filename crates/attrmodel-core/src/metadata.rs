//! Per-class model metadata.
//!
//! A model type is described statically by a [`ModelClass`]: its name, its
//! parent class, the [`Capability`] modules it composes, and an optional
//! `init` hook. The first time a class is used its [`Metadata`] is built:
//!
//! 1. the ancestor chain and composed capability list are computed;
//! 2. each capability's `attach` hook runs, in composed order;
//! 3. the class's own `init` hook runs (this is where attributes are declared);
//! 4. the result is frozen and cached for the life of the process.
//!
//! Construction happens exactly once per class name, even when several
//! threads ask for the same class at the same time. Hooks must not request
//! the metadata of the class being built.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use crate::attr::Attr;
use crate::attrs::{Attrs, Declaration};
use crate::error::{Error, Result};
use crate::grammar;

/// Hook run against the metadata of a class while it is being built.
pub type Hook = fn(&mut MetadataBuilder) -> Result<()>;

/// A composable capability: the counterpart of a mixin.
///
/// Capabilities may themselves compose other capabilities through `uses`;
/// those are expanded depth-first ahead of the capability itself.
#[derive(Debug, Clone, Copy)]
pub struct Capability {
    /// Unique name, conventionally path-qualified (`attrmodel::Model`).
    pub name: &'static str,
    pub uses: &'static [&'static Capability],
    pub attach: Option<Hook>,
}

impl Capability {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            uses: &[],
            attach: None,
        }
    }

    pub const fn uses(mut self, uses: &'static [&'static Capability]) -> Self {
        self.uses = uses;
        self
    }

    pub const fn attach(mut self, hook: Hook) -> Self {
        self.attach = Some(hook);
        self
    }

    /// Unqualified name.
    pub fn short_name(&self) -> &'static str {
        grammar::short_name(self.name)
    }
}

/// Static description of a model type.
#[derive(Debug, Clone, Copy)]
pub struct ModelClass {
    /// Unique, path-qualified class name (`app::models::User`).
    pub name: &'static str,
    pub parent: Option<&'static ModelClass>,
    pub capabilities: &'static [&'static Capability],
    pub init: Option<Hook>,
}

impl ModelClass {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            parent: None,
            capabilities: &[],
            init: None,
        }
    }

    pub const fn extends(mut self, parent: &'static ModelClass) -> Self {
        self.parent = Some(parent);
        self
    }

    pub const fn uses(mut self, capabilities: &'static [&'static Capability]) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub const fn init(mut self, hook: Hook) -> Self {
        self.init = Some(hook);
        self
    }

    /// The class's own `init` hook, or the nearest ancestor's.
    pub fn init_hook(&self) -> Option<Hook> {
        let mut next = Some(self);
        while let Some(class) = next {
            if class.init.is_some() {
                return class.init;
            }
            next = class.parent;
        }
        None
    }

    /// Ancestor classes, outermost first, excluding `self`.
    pub fn ancestors(&self) -> Vec<&'static ModelClass> {
        let mut chain = Vec::new();
        let mut next = self.parent;
        while let Some(class) = next {
            chain.push(class);
            next = class.parent;
        }
        chain.reverse();
        chain
    }

    /// Every capability in effect, in hook order: ancestors first, then this
    /// class; nested capabilities before the capability that uses them;
    /// duplicates removed keeping the first occurrence.
    pub fn composed_capabilities(&self) -> Vec<&'static Capability> {
        let mut all = Vec::new();
        for class in self.ancestors() {
            expand(class.capabilities, &mut all);
        }
        expand(self.capabilities, &mut all);

        let mut seen = Vec::new();
        all.retain(|cap| {
            if seen.contains(&cap.name) {
                false
            } else {
                seen.push(cap.name);
                true
            }
        });
        all
    }
}

fn expand(capabilities: &'static [&'static Capability], out: &mut Vec<&'static Capability>) {
    for &cap in capabilities {
        expand(cap.uses, out);
        out.push(cap);
    }
}

/// Construction progress of a class's metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum InitPhase {
    Uninitialized,
    TraitsProcessed,
    ClassInitialized,
    Ready,
}

/// How a model's primary key attribute is found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimaryKeyResolver {
    /// The first attribute, in declaration order, that is a primary attribute.
    FirstPrimary,
    /// The attribute with this name.
    Named(String),
}

type Extensions = HashMap<TypeId, Box<dyn Any + Send + Sync>>;

/// Mutable metadata handed to capability and `init` hooks.
pub struct MetadataBuilder {
    class: &'static ModelClass,
    parents: Vec<&'static str>,
    traits: Vec<&'static str>,
    phase: InitPhase,
    attrs: Option<Attrs>,
    primary_key: Option<PrimaryKeyResolver>,
    extensions: Extensions,
}

impl MetadataBuilder {
    fn new(class: &'static ModelClass) -> Self {
        Self {
            class,
            parents: Vec::new(),
            traits: Vec::new(),
            phase: InitPhase::Uninitialized,
            attrs: None,
            primary_key: None,
            extensions: HashMap::new(),
        }
    }

    pub fn class(&self) -> &'static ModelClass {
        self.class
    }

    pub fn name(&self) -> &'static str {
        self.class.name
    }

    pub fn namespace(&self) -> &'static str {
        namespace_of(self.class.name)
    }

    pub fn parents(&self) -> &[&'static str] {
        &self.parents
    }

    pub fn traits(&self) -> &[&'static str] {
        &self.traits
    }

    pub fn phase(&self) -> InitPhase {
        self.phase
    }

    /// Install an empty attribute bag, unless one already exists.
    pub fn enable_attrs(&mut self) -> &mut Self {
        if self.attrs.is_none() {
            self.attrs = Some(Attrs::new(self.class.name));
        }
        self
    }

    pub fn has_attrs(&self) -> bool {
        self.attrs.is_some()
    }

    pub fn attrs(&self) -> Result<&Attrs> {
        self.attrs.as_ref().ok_or_else(|| self.missing_attrs())
    }

    pub fn attrs_mut(&mut self) -> Result<&mut Attrs> {
        let missing = self.missing_attrs();
        self.attrs.as_mut().ok_or(missing)
    }

    /// Declare an attribute. Fails if no capability installed an attribute bag.
    pub fn attr(
        &mut self,
        name: impl Into<String>,
        decl: impl Into<Declaration>,
    ) -> Result<&mut Self> {
        self.attrs_mut()?.set(name, decl);
        Ok(self)
    }

    /// Designate how the primary key is found.
    pub fn primary_key(&mut self, resolver: PrimaryKeyResolver) -> &mut Self {
        self.primary_key = Some(resolver);
        self
    }

    /// Store a typed extension, replacing any earlier value of the same type.
    pub fn insert_extension<T: Any + Send + Sync>(&mut self, value: T) -> &mut Self {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
        self
    }

    pub fn extension<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|ext| ext.downcast_ref())
    }

    /// The extension of type `T`, inserting `T::default()` first if absent.
    pub fn extension_or_default<T: Any + Send + Sync + Default>(&mut self) -> &mut T {
        let slot = self
            .extensions
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(T::default()));
        match slot.downcast_mut() {
            Some(ext) => ext,
            None => unreachable!("extension slot holds the type it is keyed by"),
        }
    }

    fn missing_attrs(&self) -> Error {
        Error::MissingAttributeSupport {
            model: self.class.name.to_string(),
        }
    }

    fn run(mut self) -> Result<Metadata> {
        let class = self.class;
        tracing::debug!(model = class.name, "Building model metadata");

        self.parents = class.ancestors().iter().map(|c| c.name).collect();
        let capabilities = class.composed_capabilities();
        self.traits = capabilities.iter().map(|c| c.name).collect();

        for cap in capabilities {
            if let Some(attach) = cap.attach {
                tracing::debug!(model = class.name, capability = cap.name, "Attaching capability");
                attach(&mut self)?;
            }
        }
        self.phase = InitPhase::TraitsProcessed;

        if let Some(init) = class.init_hook() {
            tracing::debug!(model = class.name, "Running class init hook");
            init(&mut self)?;
        }
        self.phase = InitPhase::ClassInitialized;

        tracing::debug!(
            model = class.name,
            attrs = self.attrs.as_ref().map_or(0, Attrs::len),
            "Model metadata ready"
        );
        Ok(Metadata {
            class,
            parents: self.parents,
            traits: self.traits,
            attrs: self.attrs,
            primary_key: self.primary_key,
            resolved_pk: OnceLock::new(),
            extensions: self.extensions,
        })
    }
}

impl fmt::Debug for MetadataBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataBuilder")
            .field("class", &self.class.name)
            .field("phase", &self.phase)
            .field("attrs", &self.attrs)
            .field("primary_key", &self.primary_key)
            .field("extensions", &self.extensions.len())
            .finish()
    }
}

/// Frozen, shared metadata of one model class.
pub struct Metadata {
    class: &'static ModelClass,
    parents: Vec<&'static str>,
    traits: Vec<&'static str>,
    attrs: Option<Attrs>,
    primary_key: Option<PrimaryKeyResolver>,
    resolved_pk: OnceLock<Result<Arc<dyn Attr>>>,
    extensions: Extensions,
}

type Slot = Arc<OnceLock<Result<Arc<Metadata>>>>;

fn instances() -> &'static Mutex<HashMap<&'static str, Slot>> {
    static INSTANCES: OnceLock<Mutex<HashMap<&'static str, Slot>>> = OnceLock::new();
    INSTANCES.get_or_init(|| Mutex::new(HashMap::new()))
}

impl Metadata {
    /// The metadata of `class`, building it on first use.
    ///
    /// A failed build is cached like a successful one until the class is
    /// forgotten.
    pub fn of(class: &'static ModelClass) -> Result<Arc<Metadata>> {
        let slot = {
            let mut instances = instances().lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(instances.entry(class.name).or_default())
        };
        slot.get_or_init(|| MetadataBuilder::new(class).run().map(Arc::new))
            .clone()
    }

    /// Drop every cached metadata instance.
    pub fn reset() {
        instances()
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Drop the cached metadata of one class.
    pub fn forget(class: &ModelClass) {
        instances()
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(class.name);
    }

    pub fn class(&self) -> &'static ModelClass {
        self.class
    }

    pub fn name(&self) -> &'static str {
        self.class.name
    }

    /// Class path without the final segment; empty for unqualified names.
    pub fn namespace(&self) -> &'static str {
        namespace_of(self.class.name)
    }

    /// Ancestor class names, outermost first.
    pub fn parents(&self) -> &[&'static str] {
        &self.parents
    }

    /// Composed capability names in hook order.
    pub fn traits(&self) -> &[&'static str] {
        &self.traits
    }

    pub fn phase(&self) -> InitPhase {
        InitPhase::Ready
    }

    pub fn has_attrs(&self) -> bool {
        self.attrs.is_some()
    }

    pub fn attrs(&self) -> Result<&Attrs> {
        self.attrs.as_ref().ok_or_else(|| Error::MissingAttributeSupport {
            model: self.class.name.to_string(),
        })
    }

    /// Shorthand for `attrs()?.get(name)`.
    pub fn attr(&self, name: &str) -> Result<Arc<dyn Attr>> {
        self.attrs()?.get(name)
    }

    pub fn primary_key_resolver(&self) -> Option<&PrimaryKeyResolver> {
        self.primary_key.as_ref()
    }

    /// The primary key attribute, found once and then cached.
    pub fn primary_key(&self) -> Result<Arc<dyn Attr>> {
        self.resolved_pk
            .get_or_init(|| self.find_primary_key())
            .clone()
    }

    fn find_primary_key(&self) -> Result<Arc<dyn Attr>> {
        let missing = || Error::MissingPrimaryKey {
            model: self.class.name.to_string(),
        };
        let attrs = self.attrs()?;
        match &self.primary_key {
            None => Err(missing()),
            Some(PrimaryKeyResolver::FirstPrimary) => {
                for attr in attrs.iter() {
                    let attr = attr?;
                    if attr.is_primary() {
                        return Ok(attr);
                    }
                }
                Err(missing())
            }
            Some(PrimaryKeyResolver::Named(name)) => attrs.get(name).map_err(|err| {
                if err.is_invalid_attribute() {
                    missing()
                } else {
                    err
                }
            }),
        }
    }

    pub fn extension<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|ext| ext.downcast_ref())
    }
}

impl fmt::Debug for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metadata")
            .field("class", &self.class.name)
            .field("parents", &self.parents)
            .field("traits", &self.traits)
            .field("attrs", &self.attrs)
            .field("primary_key", &self.primary_key)
            .field("extensions", &self.extensions.len())
            .finish_non_exhaustive()
    }
}

fn namespace_of(name: &str) -> &str {
    name.rsplit_once("::").map_or("", |(ns, _)| ns)
}

fn attach_model(m: &mut MetadataBuilder) -> Result<()> {
    m.enable_attrs();
    if m.primary_key.is_none() {
        m.primary_key(PrimaryKeyResolver::FirstPrimary);
    }
    Ok(())
}

/// The base model capability: installs the attribute bag and the
/// first-`Primary` primary key lookup.
pub static MODEL: Capability = Capability::new("attrmodel::Model").attach(attach_model);
