//! Schema mapping: dependency-ordered load planning
//!
//! Given the describes of every object in an org, derives a sequence of
//! load passes such that every foreign key is satisfiable by a prior pass.
//! Cycles (including self-references) are broken mechanically by splitting
//! a pass's relationship fields into a dependent follow-up pass, and
//! person-account schemas get their Account passes expanded into filtered
//! variants. The result serializes to the query-object artifact consumed by
//! the record loader.
//!
//! Pipeline: catalog → graph → cycle breaking → scheduling → account
//! expansion → serialization.

pub mod catalog;
pub mod cycles;
pub mod graph;
pub mod person_accounts;
pub mod schedule;
pub mod serialize;

use anyhow::{Context, Result};
use regex::Regex;

use crate::api::models::ObjectDescribe;
pub use catalog::{CatalogOptions, SchemaCatalog};
pub use cycles::UnresolvableCycleError;
pub use graph::PassGraph;
pub use serialize::{ColumnMapping, QueryObjectSpec};

/// Run the whole mapping pipeline over raw describes
pub fn generate_mapping(
    describes: &[ObjectDescribe],
    options: &CatalogOptions,
) -> Result<Vec<QueryObjectSpec>> {
    let catalog = SchemaCatalog::build(describes, options)?;
    log::info!("Catalog holds {} loadable objects", catalog.len());

    let mut passes = PassGraph::build(&catalog);
    let order = cycles::plan_order(&mut passes)?;
    log::info!("Planned {} load passes", order.len());

    let external_id_pattern = Regex::new(&options.external_id_pattern)
        .with_context(|| format!("Invalid external-id pattern: {}", options.external_id_pattern))?;
    Ok(serialize_order(&order, &passes, &external_id_pattern))
}

/// Serialize the scheduled passes, applying the person-account expansion
/// when the schema calls for it
fn serialize_order(
    order: &[String],
    graph: &PassGraph,
    external_id_pattern: &Regex,
) -> Vec<QueryObjectSpec> {
    let person_accounts = person_accounts::person_accounts_enabled(graph);

    let mut results = Vec::with_capacity(order.len());
    for name in order {
        let Some(pass) = graph.get(name) else {
            continue;
        };

        if person_accounts {
            if pass.object_type == person_accounts::ACCOUNT_TYPE {
                person_accounts::expand_account_pass(
                    pass,
                    graph,
                    external_id_pattern,
                    &mut results,
                );
                continue;
            }
            if pass.object_type == person_accounts::CONTACT_TYPE {
                let mut filtered = pass.clone();
                filtered.filter = Some(person_accounts::CONTACT_FILTER.to_string());
                results.push(serialize::build_query_object(&filtered, graph));
                continue;
            }
        }

        results.push(serialize::build_query_object(pass, graph));
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_EXTERNAL_ID_PATTERN;
    use crate::mapping::graph::tests::{
        make_external_id, make_lookup, make_object, make_text_field,
    };

    fn options(whitelist: &[&str]) -> CatalogOptions {
        CatalogOptions::new(
            whitelist.iter().map(|s| s.to_string()),
            DEFAULT_EXTERNAL_ID_PATTERN,
        )
    }

    #[test]
    fn test_end_to_end_simple_chain() {
        let describes = vec![
            make_object("A", vec![make_text_field("Name")]),
            make_object("B", vec![make_lookup("AId", "A")]),
            make_object("C", vec![make_lookup("BId", "B")]),
        ];

        let specs = generate_mapping(&describes, &options(&["A", "B", "C"])).unwrap();
        let names: Vec<&str> = specs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    /// Like `make_object` but with a per-type external-id key, so mappings
    /// against the wrong target cannot match by accident
    fn object_with_key(
        name: &str,
        key: &str,
        mut fields: Vec<crate::api::models::FieldDescribe>,
    ) -> ObjectDescribe {
        fields.insert(0, make_external_id(key));
        ObjectDescribe {
            name: name.to_string(),
            custom: name.ends_with("__c"),
            custom_setting: false,
            fields,
            record_type_infos: vec![],
        }
    }

    #[test]
    fn test_every_relationship_mapping_has_a_matching_spec() {
        let describes = vec![
            object_with_key("X", "XExternalId__c", vec![make_lookup("YId", "Y")]),
            object_with_key("Y", "YExternalId__c", vec![make_lookup("XId", "X")]),
            object_with_key(
                "Z__c",
                "ZExternalId__c",
                vec![make_lookup("XId", "X"), make_lookup("YId", "Y")],
            ),
        ];
        let targets = std::collections::HashMap::from([
            ("XId", ("X", "XExternalId__c")),
            ("YId", ("Y", "YExternalId__c")),
        ]);

        let specs = generate_mapping(&describes, &options(&["X", "Y"])).unwrap();

        let mut relationship_mappings = 0;
        for spec in &specs {
            for mapping in spec.mappings.iter().skip(1) {
                relationship_mappings += 1;
                let (target, external_id) = targets[mapping.source_column.as_str()];
                assert_eq!(
                    mapping.dest_column,
                    format!("{}.{}", target, external_id),
                    "wrong dotted path in {}",
                    spec.name
                );
                // Split passes share the original's type and id, so more
                // than one spec may satisfy the edge
                let matching = specs
                    .iter()
                    .filter(|s| s.object_type == target && s.id == external_id)
                    .count();
                assert!(matching >= 1, "no spec satisfies {}", mapping.dest_column);
            }
        }
        assert_eq!(relationship_mappings, 4);
    }

    #[test]
    fn test_excluded_standard_object_never_appears() {
        let describes = vec![
            make_object("Vendor", vec![make_text_field("Name")]),
            make_object(
                "Order__c",
                vec![make_text_field("Name"), make_lookup("VendorId", "Vendor")],
            ),
        ];

        // Vendor is standard and not whitelisted
        let specs = generate_mapping(&describes, &options(&[])).unwrap();

        assert!(specs.iter().all(|s| s.object_type != "Vendor"));
        for spec in &specs {
            assert!(!spec.query.contains("VendorId"));
            assert!(spec.mappings.iter().all(|m| m.source_column != "VendorId"));
        }
    }

    #[test]
    fn test_person_accounts_expand_and_filter_contact() {
        let describes = vec![
            make_object(
                "Account",
                vec![make_text_field("Name"), make_text_field("LastName")],
            ),
            make_object(
                "Contact",
                vec![
                    make_text_field("LastName"),
                    make_lookup("AccountId", "Account"),
                ],
            ),
        ];

        let specs =
            generate_mapping(&describes, &options(&["Account", "Contact"])).unwrap();
        let names: Vec<&str> = specs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Account", "PersonAccount", "Contact"]);

        let contact = specs.iter().find(|s| s.name == "Contact").unwrap();
        assert!(contact
            .query
            .contains("WHERE Account.IsPersonAccount = false"));
    }

    #[test]
    fn test_no_person_accounts_is_passthrough() {
        let describes = vec![
            make_object("Account", vec![make_text_field("Name")]),
            make_object(
                "Contact",
                vec![
                    make_text_field("LastName"),
                    make_lookup("AccountId", "Account"),
                ],
            ),
        ];

        let specs =
            generate_mapping(&describes, &options(&["Account", "Contact"])).unwrap();
        let names: Vec<&str> = specs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Account", "Contact"]);
        let contact = specs.iter().find(|s| s.name == "Contact").unwrap();
        assert!(!contact.query.contains("WHERE"));
    }

    #[test]
    fn test_idempotent_artifact() {
        let describes = vec![
            make_object("X", vec![make_lookup("YId", "Y")]),
            make_object("Y", vec![make_lookup("XId", "X")]),
        ];

        let first = generate_mapping(&describes, &options(&["X", "Y"])).unwrap();
        let second = generate_mapping(&describes, &options(&["X", "Y"])).unwrap();
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
