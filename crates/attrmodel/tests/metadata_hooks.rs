use std::sync::Arc;

use attrmodel::prelude::*;
use attrmodel::{InitPhase, SetAttr, TimeAttr};

/// Table name registered by the `TABLE` capability.
#[derive(Debug, Default, PartialEq)]
struct TableName(String);

fn using_table(m: &mut MetadataBuilder) -> Result<()> {
    let short = m.name().rsplit("::").next().unwrap_or_default().to_lowercase();
    m.insert_extension(TableName(format!("{short}s")));
    Ok(())
}

static TABLE: Capability = Capability::new("hooks::Table").attach(using_table);

fn using_timestamps(m: &mut MetadataBuilder) -> Result<()> {
    m.attr("created", AttrOptions::new("Time").serialize(SerializeMode::PrePersist))?
        .attr("updated", "Time?")?;
    Ok(())
}

/// Declares timestamp attributes; composes `MODEL` so the bag exists first.
static TIMESTAMPS: Capability = Capability::new("hooks::Timestamps")
    .uses(&[&MODEL])
    .attach(using_timestamps);

fn base_init(m: &mut MetadataBuilder) -> Result<()> {
    assert_eq!(m.phase(), InitPhase::TraitsProcessed);
    m.attr("id", "Primary")?;
    Ok(())
}

static BASE: ModelClass = ModelClass::new("hooks::Base")
    .uses(&[&TIMESTAMPS])
    .init(base_init);

static ARTICLE: ModelClass = ModelClass::new("hooks::blog::Article")
    .extends(&BASE)
    .uses(&[&TABLE, &MODEL]);

#[test]
fn nested_capability_order_and_dedup() {
    let m = Metadata::of(&ARTICLE).unwrap();
    assert_eq!(m.parents(), ["hooks::Base"]);
    assert_eq!(
        m.traits(),
        ["attrmodel::Model", "hooks::Timestamps", "hooks::Table"]
    );
    assert_eq!(m.namespace(), "hooks::blog");
}

#[test]
fn capabilities_declare_attributes_before_init() {
    let m = Metadata::of(&ARTICLE).unwrap();
    let names: Vec<&str> = m.attrs().unwrap().names().collect();
    assert_eq!(names, ["created", "updated", "id"]);
    assert!(m.attr("created").unwrap().as_any().is::<TimeAttr>());
    assert!(m.attr("updated").unwrap().nullable());
}

#[test]
fn inherited_init_hook_runs_for_subclass() {
    let m = Metadata::of(&ARTICLE).unwrap();
    assert_eq!(m.primary_key().unwrap().name(), "id");
}

#[test]
fn extension_is_available_after_build() {
    let m = Metadata::of(&ARTICLE).unwrap();
    assert_eq!(
        m.extension::<TableName>(),
        Some(&TableName("articles".into()))
    );
    assert!(Metadata::of(&BASE).unwrap().extension::<TableName>().is_none());
}

#[test]
fn metadata_is_shared_per_class() {
    let a = Metadata::of(&ARTICLE).unwrap();
    let b = Metadata::of(&ARTICLE).unwrap();
    let base = Metadata::of(&BASE).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert!(!Arc::ptr_eq(&a, &base));
}

fn early_attrs(m: &mut MetadataBuilder) -> Result<()> {
    m.attr("tags", "Set[String]")?;
    Ok(())
}

static EARLY: Capability = Capability::new("hooks::Early").attach(early_attrs);

static MISORDERED: ModelClass = ModelClass::new("hooks::Misordered").uses(&[&EARLY, &MODEL]);
static ORDERED: ModelClass = ModelClass::new("hooks::Ordered").uses(&[&MODEL, &EARLY]);

#[test]
fn declaring_before_model_capability_fails() {
    let err = Metadata::of(&MISORDERED).unwrap_err();
    assert_eq!(
        err,
        Error::MissingAttributeSupport {
            model: "hooks::Misordered".into()
        }
    );

    let m = Metadata::of(&ORDERED).unwrap();
    assert!(m.attr("tags").unwrap().as_any().is::<SetAttr>());
}

fn explicit_pk(m: &mut MetadataBuilder) -> Result<()> {
    m.attr("id", "Primary")?
        .attr("slug", "String")?
        .primary_key(PrimaryKeyResolver::Named("slug".into()));
    Ok(())
}

static SLUGGED: ModelClass = ModelClass::new("hooks::Slugged")
    .uses(&[&MODEL])
    .init(explicit_pk);

#[test]
fn explicit_primary_key_overrides_scan() {
    let m = Metadata::of(&SLUGGED).unwrap();
    assert_eq!(m.primary_key_resolver(), Some(&PrimaryKeyResolver::Named("slug".into())));
    assert_eq!(m.primary_key().unwrap().name(), "slug");
}
