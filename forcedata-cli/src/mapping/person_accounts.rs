//! Person-account handling
//!
//! Orgs with person accounts enabled store two logical entities in the
//! Account table: organization accounts and person accounts, discriminated
//! by `IsPersonAccount`. A single Account pass would push person-only
//! fields at organization records and vice versa, so every Account-typed
//! pass is expanded into two independently filtered query objects, and
//! Contact passes are filtered down to rows not owned by a person account.
//!
//! Detection is schema-driven: person accounts surface `LastName` on
//! Account, so its presence on the Account pass triggers the expansion.
//! Schemas without it pass through untouched.

use regex::Regex;

use super::catalog::{unnamespaced_name, Field};
use super::graph::{split_pass_name, Pass, PassGraph};
use super::serialize::{build_query_object, ColumnMapping, QueryObjectSpec};

const ORGANIZATION_FILTER: &str = "IsPersonAccount = false";
const PERSON_FILTER: &str = "IsPersonAccount = true";

/// Filter applied to Contact passes so contacts auto-created for person
/// accounts are not loaded twice
pub const CONTACT_FILTER: &str = "Account.IsPersonAccount = false";

/// Object type conflating organization and person records
pub const ACCOUNT_TYPE: &str = "Account";

/// Related type mirroring person-account rows
pub const CONTACT_TYPE: &str = "Contact";

/// Does the schema have person accounts enabled?
pub fn person_accounts_enabled(graph: &PassGraph) -> bool {
    graph
        .get(ACCOUNT_TYPE)
        .map(|p| p.fields.iter().any(|f| f.name == "LastName"))
        .unwrap_or(false)
}

/// Is the field loadable on organization accounts?
fn is_organization_field(field: &Field) -> bool {
    !matches!(field.name.as_str(), "FirstName" | "LastName" | "Salutation")
        && !field.name.ends_with("__pc")
}

/// Is the field loadable on person accounts?
fn is_person_field(field: &Field) -> bool {
    field.name != "Name"
}

/// Expand one Account-typed pass into its organization and person query
/// objects, plus the PersonContact linkage pass when present
pub fn expand_account_pass(
    pass: &Pass,
    graph: &PassGraph,
    external_id_pattern: &Regex,
    results: &mut Vec<QueryObjectSpec>,
) {
    let organization_fields: Vec<Field> = pass
        .fields
        .iter()
        .filter(|f| is_organization_field(f))
        .cloned()
        .collect();
    let mut person_fields: Vec<Field> = pass
        .fields
        .iter()
        .filter(|f| is_person_field(f))
        .cloned()
        .collect();

    // A contact external id surfaced through the person-account field
    // mirror (__pc suffix) can't be queried directly on person loads; it is
    // populated from the auto-created contact via PersonContactId instead
    let contact_external_id = pass
        .fields
        .iter()
        .find(|f| external_id_pattern.is_match(&f.name) && f.name.ends_with("__pc"))
        .cloned();
    if let Some(pc) = &contact_external_id {
        person_fields.retain(|f| f.name != pc.name);
        person_fields.push(Field::text("PersonContactId"));
    }

    let organization_spec = build_query_object(
        &variant(pass, pass.name.clone(), organization_fields, ORGANIZATION_FILTER),
        graph,
    );
    let mut person_spec = build_query_object(
        &variant(pass, format!("Person{}", pass.name), person_fields, PERSON_FILTER),
        graph,
    );
    if let Some(pc) = contact_external_id {
        person_spec
            .mappings
            .push(ColumnMapping::new("PersonContactId", pc.name));
    }

    results.push(organization_spec);
    results.push(person_spec);

    // The un-split Account pass additionally emits a pass dedicated to
    // populating the PersonContact linkage field, which cycle splitting
    // moved onto the split pass
    if pass.name == ACCOUNT_TYPE {
        if let Some(split) = graph.get(&split_pass_name(ACCOUNT_TYPE)) {
            if let Some(person_contact) = split
                .fields
                .iter()
                .find(|f| unnamespaced_name(&f.name) == "PersonContact__c")
            {
                results.push(build_query_object(
                    &variant(
                        pass,
                        "PersonAccount-PersonContact".to_string(),
                        vec![person_contact.clone()],
                        PERSON_FILTER,
                    ),
                    graph,
                ));
            }
        }
    }
}

/// Clone a pass with a different name, field slice, and filter
fn variant(pass: &Pass, name: String, fields: Vec<Field>, filter: &str) -> Pass {
    Pass {
        name,
        object_type: pass.object_type.clone(),
        external_id_field: pass.external_id_field.clone(),
        fields,
        dependencies: Vec::new(),
        dependents: Vec::new(),
        filter: Some(filter.to_string()),
        sorted: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::graph::tests::{
        build_graph_with_whitelist, make_lookup, make_object, make_text_field,
    };

    fn pattern() -> Regex {
        Regex::new(crate::config::DEFAULT_EXTERNAL_ID_PATTERN).unwrap()
    }

    #[test]
    fn test_detection_requires_last_name() {
        let graph = build_graph_with_whitelist(
            &[make_object("Account", vec![make_text_field("Name")])],
            &["Account"],
        );
        assert!(!person_accounts_enabled(&graph));

        let graph = build_graph_with_whitelist(
            &[make_object(
                "Account",
                vec![make_text_field("Name"), make_text_field("LastName")],
            )],
            &["Account"],
        );
        assert!(person_accounts_enabled(&graph));
    }

    #[test]
    fn test_expansion_partitions_fields() {
        let graph = build_graph_with_whitelist(
            &[make_object(
                "Account",
                vec![
                    make_text_field("Name"),
                    make_text_field("FirstName"),
                    make_text_field("LastName"),
                    make_text_field("Salutation"),
                    make_text_field("Industry"),
                    make_text_field("Email__pc"),
                ],
            )],
            &["Account"],
        );

        let mut results = Vec::new();
        expand_account_pass(graph.get("Account").unwrap(), &graph, &pattern(), &mut results);

        assert_eq!(results.len(), 2);
        let organization = &results[0];
        let person = &results[1];

        assert_eq!(organization.name, "Account");
        assert!(organization.query.contains("WHERE IsPersonAccount = false"));
        assert!(organization.query.contains("Name"));
        assert!(organization.query.contains("Industry"));
        assert!(!organization.query.contains("LastName"));
        assert!(!organization.query.contains("Email__pc"));

        assert_eq!(person.name, "PersonAccount");
        assert!(person.query.contains("WHERE IsPersonAccount = true"));
        assert!(person.query.contains("LastName"));
        assert!(person.query.contains("Email__pc"));
        // "Name" appears only as LastName/FirstName, never standalone
        assert!(!person.query.contains(", Name,"));
    }

    #[test]
    fn test_contact_external_id_rerouted_through_person_contact() {
        let graph = build_graph_with_whitelist(
            &[make_object(
                "Account",
                vec![
                    make_text_field("Name"),
                    make_text_field("LastName"),
                    make_text_field("ExternalId__pc"),
                ],
            )],
            &["Account"],
        );

        let mut results = Vec::new();
        expand_account_pass(graph.get("Account").unwrap(), &graph, &pattern(), &mut results);

        let person = &results[1];
        assert!(!person.query.contains("ExternalId__pc"));
        assert!(person.query.contains("PersonContactId"));
        assert!(person.mappings.contains(&ColumnMapping::new(
            "PersonContactId",
            "ExternalId__pc"
        )));
    }

    #[test]
    fn test_person_contact_linkage_pass_emitted() {
        // Account carries a self-referencing PersonContact__c lookup, which
        // self-reference isolation moves onto Account-split-1
        let mut graph = build_graph_with_whitelist(
            &[
                make_object(
                    "Account",
                    vec![
                        make_text_field("Name"),
                        make_text_field("LastName"),
                        make_lookup("NU__PersonContact__c", "Account"),
                    ],
                ),
            ],
            &["Account"],
        );
        graph.split_self_references();

        let mut results = Vec::new();
        expand_account_pass(graph.get("Account").unwrap(), &graph, &pattern(), &mut results);

        assert_eq!(results.len(), 3);
        let linkage = &results[2];
        assert_eq!(linkage.name, "PersonAccount-PersonContact");
        assert_eq!(linkage.object_type, "Account");
        assert!(linkage.query.contains("NU__PersonContact__c"));
        assert!(linkage.query.contains("WHERE IsPersonAccount = true"));
    }
}
