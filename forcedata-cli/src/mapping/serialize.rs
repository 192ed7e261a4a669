//! Serialization of scheduled passes into query-object specs
//!
//! The artifact format is consumed by the record-loading side of a
//! migration: one query-object per pass, with the SOQL to pull the records
//! and the column mappings that rewrite ids into external-id references.

use serde::{Deserialize, Serialize};

use super::graph::{Pass, PassGraph};

/// Source-to-destination column mapping in the artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMapping {
    pub source_column: String,
    pub dest_column: String,
}

impl ColumnMapping {
    pub fn new(source: impl Into<String>, dest: impl Into<String>) -> Self {
        ColumnMapping {
            source_column: source.into(),
            dest_column: dest.into(),
        }
    }
}

/// One query+load unit in the output artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryObjectSpec {
    pub name: String,
    /// SOQL pulling the pass's records from the source org
    pub query: String,
    #[serde(rename = "type")]
    pub object_type: String,
    /// External-id field used as the upsert key
    pub id: String,
    pub mappings: Vec<ColumnMapping>,
}

/// Build the query-object spec for one pass. Relationship fields map to the
/// related pass's external id via `<relationshipName>.<externalIdField>`
/// dotted-path syntax, which the loader resolves at load time.
pub fn build_query_object(pass: &Pass, graph: &PassGraph) -> QueryObjectSpec {
    let mut columns = vec!["Id".to_string()];
    columns.extend(pass.fields.iter().map(|f| f.name.clone()));

    let where_clause = pass
        .filter
        .as_deref()
        .map(|f| format!(" WHERE {f}"))
        .unwrap_or_default();
    let query = format!(
        "SELECT {} FROM {}{}",
        columns.join(", "),
        pass.object_type,
        where_clause
    );

    let mut mappings = vec![ColumnMapping::new("Id", &pass.external_id_field)];
    for field in &pass.fields {
        let Some(rel) = &field.relationship else {
            continue;
        };
        match graph.external_id_of(&rel.target) {
            Some(external_id) => mappings.push(ColumnMapping::new(
                &field.name,
                format!("{}.{}", rel.relationship_name, external_id),
            )),
            // Dangling targets are pruned before scheduling, so this only
            // fires on a bug upstream
            None => log::warn!(
                "No pass for relationship target {} of {}.{}",
                rel.target,
                pass.name,
                field.name
            ),
        }
    }

    QueryObjectSpec {
        name: pass.name.clone(),
        query,
        object_type: pass.object_type.clone(),
        id: pass.external_id_field.clone(),
        mappings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::graph::tests::{
        build_graph_with_whitelist, make_lookup, make_object, make_text_field,
    };

    #[test]
    fn test_query_and_mappings() {
        let graph = build_graph_with_whitelist(
            &[
                make_object("Account", vec![make_text_field("Name")]),
                make_object(
                    "Order__c",
                    vec![make_text_field("Name"), make_lookup("AccountId", "Account")],
                ),
            ],
            &["Account"],
        );

        let spec = build_query_object(graph.get("Order__c").unwrap(), &graph);

        assert_eq!(spec.name, "Order__c");
        assert_eq!(spec.object_type, "Order__c");
        assert_eq!(spec.id, "ExternalId__c");
        assert_eq!(
            spec.query,
            "SELECT Id, ExternalId__c, Name, AccountId FROM Order__c"
        );
        assert_eq!(
            spec.mappings,
            vec![
                ColumnMapping::new("Id", "ExternalId__c"),
                ColumnMapping::new("AccountId", "Account.ExternalId__c"),
            ]
        );
    }

    #[test]
    fn test_filter_becomes_where_clause() {
        let mut graph = build_graph_with_whitelist(
            &[make_object("Contact", vec![make_text_field("LastName")])],
            &["Contact"],
        );
        graph.get_mut("Contact").unwrap().filter =
            Some("Account.IsPersonAccount = false".to_string());

        let spec = build_query_object(graph.get("Contact").unwrap(), &graph);
        assert_eq!(
            spec.query,
            "SELECT Id, ExternalId__c, LastName FROM Contact WHERE Account.IsPersonAccount = false"
        );
    }

    #[test]
    fn test_json_shape_is_camel_case() {
        let graph = build_graph_with_whitelist(
            &[make_object("Account", vec![make_text_field("Name")])],
            &["Account"],
        );
        let spec = build_query_object(graph.get("Account").unwrap(), &graph);
        let json = serde_json::to_value(&spec).unwrap();

        assert!(json.get("type").is_some());
        assert!(json.get("mappings").unwrap()[0].get("sourceColumn").is_some());
        assert!(json.get("mappings").unwrap()[0].get("destColumn").is_some());
    }
}
