//! Schema catalog: normalized view of the org's describe results
//!
//! Filters the raw describes down to loadable objects and converts their
//! fields into the normalized form the pass graph is built from. All of the
//! name-sniffing rules live here as standalone predicates:
//!
//! - custom settings are never loaded
//! - standard objects load only when whitelisted; custom objects always load
//! - an object without a qualifying external-id field cannot be upserted
//!   idempotently and is skipped entirely
//! - `RecordTypeId` is synthesized when an object has more than one active
//!   record type (it is not createable per describe, but required for load)

use std::collections::{BTreeMap, HashSet};

use anyhow::{Context, Result};
use regex::Regex;

use crate::api::models::{FieldDescribe, ObjectDescribe};

/// Relationship strength. MasterDetail implies ownership and can never be
/// deferred to a later pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipKind {
    MasterDetail,
    Lookup,
}

/// Normalized relationship info on a field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub kind: RelationshipKind,
    /// Target object type name
    pub target: String,
    /// Traversal name used in relationship-column mappings
    /// (e.g., "Account" for AccountId, "Account__r" for Account__c)
    pub relationship_name: String,
}

/// Normalized loadable field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub relationship: Option<Relationship>,
}

impl Field {
    /// Plain (non-relationship) field, also used for synthesized
    /// pseudo-fields like RecordTypeId
    pub fn text(name: impl Into<String>) -> Self {
        Field {
            name: name.into(),
            relationship: None,
        }
    }

    pub fn is_relationship(&self) -> bool {
        self.relationship.is_some()
    }
}

/// One loadable object with its upsert key and normalized fields
#[derive(Debug, Clone)]
pub struct CatalogObject {
    pub name: String,
    pub external_id_field: String,
    pub fields: Vec<Field>,
}

/// Options controlling catalog construction
#[derive(Debug, Clone)]
pub struct CatalogOptions {
    /// Standard (non-custom) objects eligible for mapping
    pub standard_object_whitelist: HashSet<String>,
    /// Pattern an external-id field's name must match
    pub external_id_pattern: String,
}

impl CatalogOptions {
    pub fn new(
        whitelist: impl IntoIterator<Item = String>,
        external_id_pattern: impl Into<String>,
    ) -> Self {
        CatalogOptions {
            standard_object_whitelist: whitelist.into_iter().collect(),
            external_id_pattern: external_id_pattern.into(),
        }
    }
}

/// Normalized, queryable form of the introspected schema
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    objects: BTreeMap<String, CatalogObject>,
}

impl SchemaCatalog {
    /// Build the catalog from raw describes, applying the inclusion and
    /// external-id rules
    pub fn build(describes: &[ObjectDescribe], options: &CatalogOptions) -> Result<Self> {
        let pattern = Regex::new(&options.external_id_pattern)
            .with_context(|| format!("Invalid external-id pattern: {}", options.external_id_pattern))?;

        let mut objects = BTreeMap::new();
        for describe in describes {
            if !should_include_object(describe, &options.standard_object_whitelist) {
                continue;
            }

            let createable: Vec<&FieldDescribe> =
                describe.fields.iter().filter(|f| f.createable).collect();

            // Objects without an upsert key cannot be loaded idempotently
            let Some(external_id_field) = find_external_id(&createable, &pattern) else {
                log::debug!("Skipping {} (no external-id field)", describe.name);
                continue;
            };

            let mut fields: Vec<Field> = createable
                .iter()
                .filter_map(|&f| normalize_field(f))
                .collect();

            let active_record_types = describe
                .record_type_infos
                .iter()
                .filter(|rt| rt.active)
                .count();
            if active_record_types > 1 {
                fields.push(Field::text("RecordTypeId"));
            }

            objects.insert(
                describe.name.clone(),
                CatalogObject {
                    name: describe.name.clone(),
                    external_id_field,
                    fields,
                },
            );
        }

        Ok(SchemaCatalog { objects })
    }

    pub fn objects(&self) -> impl Iterator<Item = &CatalogObject> {
        self.objects.values()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.objects.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

/// Should the object be included? Custom settings are ignored, and standard
/// objects must be explicitly whitelisted.
fn should_include_object(describe: &ObjectDescribe, whitelist: &HashSet<String>) -> bool {
    !describe.name.is_empty()
        && !describe.custom_setting
        && (describe.is_custom() || whitelist.contains(&describe.name))
}

/// First createable field flagged as an external id whose name matches the
/// configured pattern
fn find_external_id(fields: &[&FieldDescribe], pattern: &Regex) -> Option<String> {
    fields
        .iter()
        .find(|f| f.external_id && pattern.is_match(&f.name))
        .map(|f| f.name.clone())
}

/// Convert a describe field to its normalized form. Relationship fields with
/// no resolvable target are dropped (they cannot be mapped).
fn normalize_field(field: &FieldDescribe) -> Option<Field> {
    if !field.is_relationship() {
        return Some(Field::text(&field.name));
    }
    let target = field.reference_target()?;
    let kind = if field.relationship_order.is_some() {
        RelationshipKind::MasterDetail
    } else {
        RelationshipKind::Lookup
    };
    let relationship_name = field
        .relationship_name
        .clone()
        .unwrap_or_else(|| derive_relationship_name(&field.name));
    Some(Field {
        name: field.name.clone(),
        relationship: Some(Relationship {
            kind,
            target: target.to_string(),
            relationship_name,
        }),
    })
}

/// Derive the relationship traversal name from a field name:
/// `Account__c` => `Account__r`, `AccountId` => `Account`
pub fn derive_relationship_name(field_name: &str) -> String {
    if let Some(stem) = field_name.strip_suffix("__c") {
        format!("{}__r", stem)
    } else if let Some(stem) = field_name.strip_suffix("Id") {
        stem.to_string()
    } else {
        field_name.to_string()
    }
}

/// Strip a namespace prefix from a field name:
/// `NU__Account__c` => `Account__c`, `Account__c` => `Account__c`
pub fn unnamespaced_name(field_name: &str) -> &str {
    match (field_name.find("__"), field_name.rfind("__")) {
        (Some(first), Some(last)) if first != last => &field_name[first + 2..],
        _ => field_name,
    }
}
