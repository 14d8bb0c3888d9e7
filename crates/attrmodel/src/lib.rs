//! attrmodel: typed attributes and change tracking for plain Rust models.
//!
//! `attrmodel` is the **facade crate**. It re-exports everything from
//! `attrmodel-core` and offers a [`prelude`] for application code.
//!
//! # Quick Start
//!
//! ```ignore
//! use attrmodel::prelude::*;
//!
//! static USER: ModelClass = ModelClass::new("app::User")
//!     .uses(&[&MODEL])
//!     .init(User::init);
//!
//! struct User {
//!     data: Dataset,
//! }
//!
//! impl User {
//!     fn init(m: &mut MetadataBuilder) -> Result<()> {
//!         m.attr("id", "Primary")?
//!             .attr("email", "String")?
//!             .attr("firstName", "String?")?
//!             .attr("tags", "Set[String]")?
//!             .attr("created", AttrOptions::new("Time").default_value("now"))?;
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
//!
//! let mut user = User::new();
//! user.set("email", "h.donna.gust@example.com")?;
//! assert!(user.changed("email"));
//! ```
//!
//! # How It Fits Together
//!
//! - Declarations live in the class `init` hook and are resolved lazily by [`Attrs`].
//! - [`Metadata`] is built once per class and shared by every instance.
//! - [`Model::read`] and [`Model::write`] convert through the declared [`Attr`];
//!   [`Model::get`] and [`Model::set`] consult custom [`Accessors`] first.
//! - A persistence layer reads [`Model::persist_payload`], writes it, then calls
//!   [`Dataset::mark_persisted`].

pub use attrmodel_core::*;

/// Common imports for model definitions.
pub mod prelude {
    pub use attrmodel_core::{
        Accessors, AnyModel, Attr, AttrOptions, Attrs, Capability, Dataset, Declaration, Diff,
        Error, MODEL, Metadata, MetadataBuilder, Model, ModelClass, PrimaryKeyResolver, Record,
        Result, SerializeMode, Value,
    };
}
