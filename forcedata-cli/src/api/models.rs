//! Salesforce describe-result models
//!
//! These mirror the REST describe payloads (`/sobjects` and
//! `/sobjects/{name}/describe`), so serde renames everything to camelCase.

use serde::{Deserialize, Serialize};

/// One entry from the global describe listing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SObjectSummary {
    pub name: String,
    #[serde(default)]
    pub custom: bool,
    #[serde(default)]
    pub custom_setting: bool,
}

/// Result of `describeGlobal()`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalDescribe {
    pub sobjects: Vec<SObjectSummary>,
}

/// Field metadata from a detailed object describe
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescribe {
    pub name: String,
    /// Wire type name (e.g., "string", "reference", "boolean")
    #[serde(rename = "type", default)]
    pub field_type: String,
    #[serde(default)]
    pub createable: bool,
    /// Flagged when the field can serve as an upsert key
    #[serde(default)]
    pub external_id: bool,
    /// Target object types for reference fields. Polymorphic lookups list
    /// several; the first entry is the effective target.
    #[serde(default)]
    pub reference_to: Vec<String>,
    /// Relationship traversal name (e.g., "Account" for AccountId)
    #[serde(default)]
    pub relationship_name: Option<String>,
    /// Present only on master-detail fields; its presence is what
    /// distinguishes master-detail from plain lookups
    #[serde(default)]
    pub relationship_order: Option<i32>,
}

impl FieldDescribe {
    /// Is this field a relationship (master-detail or lookup)?
    pub fn is_relationship(&self) -> bool {
        self.field_type == "reference"
    }

    /// Effective reference target, if any
    pub fn reference_target(&self) -> Option<&str> {
        if self.is_relationship() {
            self.reference_to.first().map(String::as_str)
        } else {
            None
        }
    }
}

/// Record type entry from a detailed object describe
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordTypeInfo {
    #[serde(default)]
    pub record_type_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub default_record_type_mapping: bool,
}

/// Detailed describe for one object type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectDescribe {
    pub name: String,
    #[serde(default)]
    pub custom: bool,
    #[serde(default)]
    pub custom_setting: bool,
    #[serde(default)]
    pub fields: Vec<FieldDescribe>,
    #[serde(default)]
    pub record_type_infos: Vec<RecordTypeInfo>,
}

impl ObjectDescribe {
    /// Is the object custom (not standard)?
    pub fn is_custom(&self) -> bool {
        self.custom || self.name.ends_with("__c")
    }
}
