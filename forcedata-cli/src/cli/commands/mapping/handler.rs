//! Map command handler

use anyhow::{Context, Result};
use colored::*;
use std::fs;
use std::time::Instant;

use super::MapArgs;
use crate::api::{ObjectDescribe, SalesforceClient, SchemaIntrospect};
use crate::config::Config;
use crate::mapping::{self, CatalogOptions, QueryObjectSpec};

/// Handle the map command: introspect the org, plan the load order, and
/// write the query-object artifact
pub async fn handle_map_command(args: MapArgs) -> Result<()> {
    if args.no_color {
        colored::control::set_override(false);
    }

    let config = Config::load()?;
    let (instance_url, access_token) = config.resolve_connection()?;
    let client = SalesforceClient::new(instance_url, access_token);

    let start_fetch = Instant::now();
    if args.verbose {
        println!("Fetching schema describes...");
    }

    let describes = fetch_schema(&client).await?;

    if args.verbose {
        println!(
            "Fetched {} describes in {:.2}s",
            describes.len().to_string().bright_green(),
            start_fetch.elapsed().as_secs_f64()
        );
    }

    let start_plan = Instant::now();
    let options = CatalogOptions::new(
        config.standard_object_whitelist.clone(),
        config.external_id_pattern(),
    );
    let specs = mapping::generate_mapping(&describes, &options)?;

    if args.verbose {
        println!(
            "Planned {} passes in {:.2}ms",
            specs.len().to_string().bright_green(),
            start_plan.elapsed().as_secs_f64() * 1000.0
        );
        println!();
    }

    if args.dry_run {
        print_plan(&specs);
        return Ok(());
    }

    let content =
        serde_json::to_string_pretty(&specs).context("Failed to serialize mapping artifact")?;
    fs::write(&args.path, content)
        .with_context(|| format!("Failed to write mapping artifact: {}", args.path.display()))?;

    println!(
        "Mapping artifact written to {}",
        args.path.display().to_string().bright_green()
    );
    Ok(())
}

/// Pull the full schema: global describe, then detailed describes for every
/// listed object
pub async fn fetch_schema(introspect: &impl SchemaIntrospect) -> Result<Vec<ObjectDescribe>> {
    let global = introspect.describe_global().await?;
    let names: Vec<String> = global.sobjects.into_iter().map(|s| s.name).collect();
    introspect.describe_sobjects(&names).await
}

fn print_plan(specs: &[QueryObjectSpec]) {
    println!("{}", "Planned load order:".bold());
    for (index, spec) in specs.iter().enumerate() {
        let filter = spec
            .query
            .split_once(" WHERE ")
            .map(|(_, clause)| format!(" [{}]", clause.dimmed()))
            .unwrap_or_default();
        println!(
            "{:>4}. {} ({}){}",
            index + 1,
            spec.name.cyan(),
            spec.object_type,
            filter
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{FieldDescribe, GlobalDescribe, SObjectSummary};
    use async_trait::async_trait;

    struct CannedSchema {
        describes: Vec<ObjectDescribe>,
    }

    #[async_trait]
    impl SchemaIntrospect for CannedSchema {
        async fn describe_global(&self) -> Result<GlobalDescribe> {
            Ok(GlobalDescribe {
                sobjects: self
                    .describes
                    .iter()
                    .map(|d| SObjectSummary {
                        name: d.name.clone(),
                        custom: d.custom,
                        custom_setting: d.custom_setting,
                    })
                    .collect(),
            })
        }

        async fn describe_sobjects(&self, names: &[String]) -> Result<Vec<ObjectDescribe>> {
            Ok(self
                .describes
                .iter()
                .filter(|d| names.contains(&d.name))
                .cloned()
                .collect())
        }
    }

    fn make_field(name: &str, external_id: bool) -> FieldDescribe {
        FieldDescribe {
            name: name.to_string(),
            field_type: "string".to_string(),
            createable: true,
            external_id,
            reference_to: vec![],
            relationship_name: None,
            relationship_order: None,
        }
    }

    #[tokio::test]
    async fn test_fetch_schema_round_trip() {
        let canned = CannedSchema {
            describes: vec![ObjectDescribe {
                name: "Invoice__c".to_string(),
                custom: true,
                custom_setting: false,
                fields: vec![
                    make_field("ExternalId__c", true),
                    make_field("Name", false),
                ],
                record_type_infos: vec![],
            }],
        };

        let describes = fetch_schema(&canned).await.unwrap();
        assert_eq!(describes.len(), 1);

        let options = CatalogOptions::new(vec![], crate::config::DEFAULT_EXTERNAL_ID_PATTERN);
        let specs = mapping::generate_mapping(&describes, &options).unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "Invoice__c");
    }
}
