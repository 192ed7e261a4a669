//! Salesforce introspection API module
//!
//! Provides the describe models and the REST client the mapping pipeline
//! consumes. CRUD/bulk operations are out of scope for this tool.

pub mod client;
pub mod models;

pub use client::{SalesforceClient, SchemaIntrospect};
pub use models::{
    FieldDescribe, GlobalDescribe, ObjectDescribe, RecordTypeInfo, SObjectSummary,
};
