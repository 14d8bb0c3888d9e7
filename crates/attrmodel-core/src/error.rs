//! Error types.
//!
//! Every variant is a programmer or configuration error raised at the point of
//! misuse, except `InvalidValue` which reports data that cannot be coerced.
//! None of them are transient.

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by attributes, attribute bags, metadata and models.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// An attribute name was looked up that was never declared.
    #[error(
        "attribute '{attr}' does not exist on model '{model}'; declare it in the model's init hook"
    )]
    InvalidAttribute { model: String, attr: String },

    /// A type declaration could not be parsed or resolved to something constructible.
    #[error(
        "invalid type '{type_name}' declared for '{model}:{attr}'; expected a registered type \
         name, a `Type[Each]?` expression, or a factory producing an attribute"
    )]
    InvalidType {
        model: String,
        attr: String,
        type_name: String,
    },

    /// Attributes were used on a model whose metadata has no attribute bag.
    #[error(
        "model '{model}' has no attribute support; compose the Model capability before \
         declaring or accessing attributes"
    )]
    MissingAttributeSupport { model: String },

    /// `id()` was used on a model without a primary attribute.
    #[error(
        "model '{model}' has no primary key; declare a 'Primary' attribute or designate one \
         explicitly"
    )]
    MissingPrimaryKey { model: String },

    /// A primitive kind never provided its coercion.
    #[error("attribute '{attr}' of type '{type_name}' does not implement a cast")]
    UnimplementedCast { attr: String, type_name: String },

    /// A value could not be coerced to the attribute's type.
    #[error("cannot cast {value} to {type_name} for attribute '{attr}': {reason}")]
    InvalidValue {
        attr: String,
        type_name: String,
        value: String,
        reason: String,
    },
}

impl Error {
    /// True for `InvalidAttribute`, the one error the model facade recovers from.
    #[must_use]
    pub const fn is_invalid_attribute(&self) -> bool {
        matches!(self, Error::InvalidAttribute { .. })
    }

    pub(crate) fn invalid_type(
        model: impl Into<String>,
        attr: impl Into<String>,
        type_name: impl Into<String>,
    ) -> Self {
        Error::InvalidType {
            model: model.into(),
            attr: attr.into(),
            type_name: type_name.into(),
        }
    }
}
