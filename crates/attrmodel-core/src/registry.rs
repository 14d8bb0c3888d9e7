//! Type name registry.
//!
//! Maps short type names (`Integer`, `Set`, ...) to the way an attribute of
//! that type is built. The process-wide registry starts with the built-in
//! types and can be extended at runtime with factories.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::attr::{
    Attr, AttrOptions, BooleanAttr, FloatAttr, IntegerAttr, PrimaryAttr, SetAttr, TextAttr,
    TimeAttr,
};
use crate::error::Result;

/// The attribute types shipped with the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinType {
    Primary,
    Integer,
    Float,
    String,
    Boolean,
    Time,
    Set,
}

impl BuiltinType {
    pub const ALL: [BuiltinType; 7] = [
        BuiltinType::Primary,
        BuiltinType::Integer,
        BuiltinType::Float,
        BuiltinType::String,
        BuiltinType::Boolean,
        BuiltinType::Time,
        BuiltinType::Set,
    ];

    /// Registered name.
    pub const fn name(self) -> &'static str {
        match self {
            BuiltinType::Primary => "Primary",
            BuiltinType::Integer => "Integer",
            BuiltinType::Float => "Float",
            BuiltinType::String => "String",
            BuiltinType::Boolean => "Boolean",
            BuiltinType::Time => "Time",
            BuiltinType::Set => "Set",
        }
    }

    /// Construct an attribute of this type.
    pub fn build(self, name: &str, opts: AttrOptions) -> Result<Arc<dyn Attr>> {
        Ok(match self {
            BuiltinType::Primary => Arc::new(PrimaryAttr::new(name, opts)?),
            BuiltinType::Integer => Arc::new(IntegerAttr::new(name, opts)?),
            BuiltinType::Float => Arc::new(FloatAttr::new(name, opts)?),
            BuiltinType::String => Arc::new(TextAttr::new(name, opts)?),
            BuiltinType::Boolean => Arc::new(BooleanAttr::new(name, opts)?),
            BuiltinType::Time => Arc::new(TimeAttr::new(name, opts)?),
            BuiltinType::Set => Arc::new(SetAttr::new(name, opts)?),
        })
    }
}

/// Builds an attribute from its name and options.
pub type AttrFactory = Arc<dyn Fn(&str, AttrOptions) -> Result<Arc<dyn Attr>> + Send + Sync>;

/// What a type name resolves to.
#[derive(Clone)]
pub enum TypeResolver {
    Builtin(BuiltinType),
    Factory(AttrFactory),
    /// An unregistered token, passed through unchanged.
    External(String),
}

impl fmt::Debug for TypeResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeResolver::Builtin(b) => f.debug_tuple("Builtin").field(b).finish(),
            TypeResolver::Factory(_) => f.write_str("Factory(..)"),
            TypeResolver::External(name) => f.debug_tuple("External").field(name).finish(),
        }
    }
}

impl From<BuiltinType> for TypeResolver {
    fn from(builtin: BuiltinType) -> Self {
        TypeResolver::Builtin(builtin)
    }
}

/// A table of type names.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: HashMap<String, TypeResolver>,
}

impl TypeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in types.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for builtin in BuiltinType::ALL {
            registry
                .types
                .insert(builtin.name().to_string(), TypeResolver::Builtin(builtin));
        }
        registry
    }

    /// Register `resolver` under `name`, replacing any earlier entry.
    pub fn register(&mut self, name: impl Into<String>, resolver: impl Into<TypeResolver>) {
        let name = name.into();
        let resolver = resolver.into();
        if let Some(previous) = self.types.insert(name.clone(), resolver) {
            tracing::warn!(
                type_name = %name,
                previous = ?previous,
                "Replacing registered attribute type"
            );
        }
    }

    /// Look up `name`: exact match first, then ASCII case-insensitive, where
    /// the lowest registered name wins among several that fold together.
    /// Unknown names come back as [`TypeResolver::External`].
    pub fn resolve(&self, name: &str) -> TypeResolver {
        if let Some(resolver) = self.types.get(name) {
            return resolver.clone();
        }
        self.types
            .iter()
            .filter(|(registered, _)| registered.eq_ignore_ascii_case(name))
            .min_by(|(a, _), (b, _)| a.cmp(b))
            .map_or_else(
                || TypeResolver::External(name.to_string()),
                |(_, resolver)| resolver.clone(),
            )
    }

    pub fn contains(&self, name: &str) -> bool {
        !matches!(self.resolve(name), TypeResolver::External(_))
    }

    /// Registered names, sorted.
    pub fn available_types(&self) -> Vec<String> {
        let mut names: Vec<String> = self.types.keys().cloned().collect();
        names.sort();
        names
    }
}

fn global() -> &'static RwLock<TypeRegistry> {
    static REGISTRY: OnceLock<RwLock<TypeRegistry>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(TypeRegistry::with_builtins()))
}

/// Register a resolver in the process-wide registry.
pub fn register_type(name: impl Into<String>, resolver: impl Into<TypeResolver>) {
    global()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .register(name, resolver);
}

/// Register a factory in the process-wide registry.
pub fn register_factory<F>(name: impl Into<String>, factory: F)
where
    F: Fn(&str, AttrOptions) -> Result<Arc<dyn Attr>> + Send + Sync + 'static,
{
    register_type(name, TypeResolver::Factory(Arc::new(factory)));
}

/// Resolve `name` against the process-wide registry.
pub fn resolve_type(name: &str) -> TypeResolver {
    global()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .resolve(name)
}

/// Names in the process-wide registry, sorted.
pub fn available_types() -> Vec<String> {
    global()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .available_types()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_registered() {
        let registry = TypeRegistry::with_builtins();
        assert_eq!(
            registry.available_types(),
            vec!["Boolean", "Float", "Integer", "Primary", "Set", "String", "Time"]
        );
        assert!(matches!(
            registry.resolve("Integer"),
            TypeResolver::Builtin(BuiltinType::Integer)
        ));
    }

    #[test]
    fn test_case_insensitive_fallback() {
        let registry = TypeRegistry::with_builtins();
        assert!(matches!(
            registry.resolve("integer"),
            TypeResolver::Builtin(BuiltinType::Integer)
        ));
        assert!(registry.contains("SET"));
    }

    #[test]
    fn test_unknown_passes_through() {
        let registry = TypeRegistry::with_builtins();
        match registry.resolve("app::Money") {
            TypeResolver::External(name) => assert_eq!(name, "app::Money"),
            other => panic!("expected external, got {other:?}"),
        }
    }

    #[test]
    fn test_register_overwrites() {
        let mut registry = TypeRegistry::with_builtins();
        registry.register("Integer", BuiltinType::Float);
        assert!(matches!(
            registry.resolve("Integer"),
            TypeResolver::Builtin(BuiltinType::Float)
        ));
    }

    #[test]
    fn test_case_fold_picks_lowest_name() {
        let mut registry = TypeRegistry::new();
        registry.register("Money", BuiltinType::Float);
        registry.register("MONEY", BuiltinType::Integer);
        registry.register("money_", BuiltinType::String);
        for _ in 0..8 {
            assert!(matches!(
                registry.resolve("money"),
                TypeResolver::Builtin(BuiltinType::Integer)
            ));
        }
    }

    #[test]
    fn test_exact_match_wins_over_case_fold() {
        let mut registry = TypeRegistry::with_builtins();
        registry.register("integer", BuiltinType::Boolean);
        assert!(matches!(
            registry.resolve("integer"),
            TypeResolver::Builtin(BuiltinType::Boolean)
        ));
        assert!(matches!(
            registry.resolve("Integer"),
            TypeResolver::Builtin(BuiltinType::Integer)
        ));
    }

    #[test]
    fn test_builtin_build() {
        let attr = BuiltinType::Time.build("created", AttrOptions::default()).unwrap();
        assert_eq!(attr.type_name(), "Time");
        assert_eq!(attr.name(), "created");
    }

    #[test]
    fn test_global_factory() {
        register_factory("RegistryTestCounter", |name, opts| {
            BuiltinType::Integer.build(name, opts.nullable(true))
        });
        assert!(matches!(
            resolve_type("RegistryTestCounter"),
            TypeResolver::Factory(_)
        ));
        assert!(available_types().contains(&"RegistryTestCounter".to_string()));
    }
}
