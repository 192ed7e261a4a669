//! Pass graph: one load pass per object type, with dependency edges
//!
//! A pass is one planned query+load unit for a single type (or a sub-slice
//! of a type's fields once splitting has occurred). The graph keeps both
//! directions of every edge: `dependencies` (what must load first) and
//! `dependents` (who is waiting on us), so edge stripping during scheduling
//! is O(dependents) instead of a full scan.

use std::collections::{BTreeMap, HashSet};

use super::catalog::{Field, RelationshipKind, SchemaCatalog};

/// Suffix appended to a pass name when its fields are split into a
/// dependent follow-up pass
pub const SPLIT_SUFFIX: &str = "-split-1";

/// Directed edge from a pass to the pass it must load after
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    /// Field carrying the relationship. None for the synthetic edge that
    /// ties a split pass back to its parent.
    pub field: Option<String>,
    pub kind: RelationshipKind,
    /// Name of the pass this edge points at
    pub target: String,
}

impl Dependency {
    /// Synthetic parent link for a split pass. Modeled as a lookup: the
    /// split pass runs as a deferred update once the parent's records exist.
    fn parent_link(target: impl Into<String>) -> Self {
        Dependency {
            field: None,
            kind: RelationshipKind::Lookup,
            target: target.into(),
        }
    }
}

/// One planned query+load unit
#[derive(Debug, Clone)]
pub struct Pass {
    /// Unique across the graph; equals the object type except for split
    /// passes, which carry the split suffix
    pub name: String,
    /// Object type this pass loads into
    pub object_type: String,
    /// Upsert key for idempotent loading
    pub external_id_field: String,
    pub fields: Vec<Field>,
    pub dependencies: Vec<Dependency>,
    pub dependents: Vec<String>,
    /// Optional SOQL WHERE fragment
    pub filter: Option<String>,
    /// Set once the pass is permanently placed in the output order
    pub sorted: bool,
}

impl Pass {
    /// Do all remaining dependencies permit splitting? MasterDetail children
    /// cannot be deferred past their master, so a pass carrying one is
    /// never a split candidate.
    pub fn splittable(&self) -> bool {
        self.dependencies
            .iter()
            .all(|d| d.kind != RelationshipKind::MasterDetail)
    }
}

/// The full pass map. BTreeMap keeps iteration deterministic, which makes
/// the final ordering reproducible for an unchanged schema snapshot.
#[derive(Debug, Clone, Default)]
pub struct PassGraph {
    passes: BTreeMap<String, Pass>,
}

impl PassGraph {
    /// Build the graph from the catalog: one pass per object, dependency
    /// edges from relationship fields, dangling references pruned, and
    /// dependent back-edges populated.
    pub fn build(catalog: &SchemaCatalog) -> Self {
        let mut passes = BTreeMap::new();

        for object in catalog.objects() {
            let dependencies = object
                .fields
                .iter()
                .filter_map(|f| {
                    f.relationship.as_ref().map(|rel| Dependency {
                        field: Some(f.name.clone()),
                        kind: rel.kind,
                        target: rel.target.clone(),
                    })
                })
                .collect();

            passes.insert(
                object.name.clone(),
                Pass {
                    name: object.name.clone(),
                    object_type: object.name.clone(),
                    external_id_field: object.external_id_field.clone(),
                    fields: object.fields.clone(),
                    dependencies,
                    dependents: Vec::new(),
                    filter: None,
                    sorted: false,
                },
            );
        }

        let mut graph = PassGraph { passes };
        graph.prune_dangling();
        graph.populate_dependents();
        graph
    }

    /// Drop fields and edges whose relationship target has no pass, so
    /// references to excluded objects never block scheduling
    fn prune_dangling(&mut self) {
        let known: Vec<String> = self.passes.keys().cloned().collect();
        let is_known = |name: &str| known.iter().any(|k| k == name);

        for pass in self.passes.values_mut() {
            pass.fields.retain(|f| match &f.relationship {
                Some(rel) => is_known(&rel.target),
                None => true,
            });
            pass.dependencies.retain(|d| is_known(&d.target));
        }
    }

    /// Rebuild every pass's dependents list from the surviving edges
    fn populate_dependents(&mut self) {
        let edges: Vec<(String, String)> = self
            .passes
            .values()
            .flat_map(|p| {
                p.dependencies
                    .iter()
                    .map(|d| (d.target.clone(), p.name.clone()))
                    .collect::<Vec<_>>()
            })
            .collect();

        for (target, dependent) in edges {
            self.add_dependent(&target, &dependent);
        }
    }

    fn add_dependent(&mut self, target: &str, dependent: &str) {
        if let Some(pass) = self.passes.get_mut(target) {
            if !pass.dependents.iter().any(|d| d == dependent) {
                pass.dependents.push(dependent.to_string());
            }
        }
    }

    /// Move every self-referencing field of every pass into a dependent
    /// split pass, so a type like a manager hierarchy loads in two waves:
    /// create the records, then wire up the self-links.
    pub fn split_self_references(&mut self) {
        let names: Vec<String> = self.passes.keys().cloned().collect();
        for name in names {
            let pass = &self.passes[&name];
            let self_fields: Vec<String> = pass
                .dependencies
                .iter()
                .filter(|d| d.target == pass.name)
                .filter_map(|d| d.field.clone())
                .collect();
            if self_fields.is_empty() {
                continue;
            }

            log::info!(
                "Splitting self-reference on {}: {}",
                name,
                self_fields.join(", ")
            );
            self.split_off(&name, |dep| dep.target == name, |f| {
                self_fields.iter().any(|s| s == &f.name)
            });
        }
    }

    /// Move the matching dependencies and fields of `name` into its split
    /// pass (created on demand), leaving the split pass dependent on the
    /// original. Returns the split pass name.
    pub fn split_off(
        &mut self,
        name: &str,
        mut take_dep: impl FnMut(&Dependency) -> bool,
        mut take_field: impl FnMut(&Field) -> bool,
    ) -> String {
        let split_name = split_pass_name(name);

        let Some(pass) = self.passes.get_mut(name) else {
            return split_name;
        };

        let (moved_deps, kept_deps): (Vec<_>, Vec<_>) = std::mem::take(&mut pass.dependencies)
            .into_iter()
            .partition(|d| take_dep(d));
        pass.dependencies = kept_deps;

        let (moved_fields, kept_fields): (Vec<_>, Vec<_>) = std::mem::take(&mut pass.fields)
            .into_iter()
            .partition(|f| take_field(f));
        pass.fields = kept_fields;

        if !self.passes.contains_key(&split_name) {
            let parent = &self.passes[name];
            let split = Pass {
                name: split_name.clone(),
                object_type: parent.object_type.clone(),
                external_id_field: parent.external_id_field.clone(),
                fields: Vec::new(),
                dependencies: vec![Dependency::parent_link(name)],
                dependents: Vec::new(),
                filter: parent.filter.clone(),
                sorted: false,
            };
            self.passes.insert(split_name.clone(), split);
            self.add_dependent(name, &split_name);
        }

        let targets: Vec<String> = moved_deps.iter().map(|d| d.target.clone()).collect();
        if let Some(split) = self.passes.get_mut(&split_name) {
            split.fields.extend(moved_fields);
            split.dependencies.extend(moved_deps);
        }

        // The moved edges now originate from the split pass; drop the
        // original from dependents lists it no longer belongs on
        let still_depends_on: HashSet<String> = self
            .passes
            .get(name)
            .map(|p| p.dependencies.iter().map(|d| d.target.clone()).collect())
            .unwrap_or_default();
        for target in targets {
            self.add_dependent(&target, &split_name);
            if !still_depends_on.contains(&target) {
                if let Some(pass) = self.passes.get_mut(&target) {
                    pass.dependents.retain(|d| d != name);
                }
            }
        }

        split_name
    }

    pub fn get(&self, name: &str) -> Option<&Pass> {
        self.passes.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Pass> {
        self.passes.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.passes.contains_key(name)
    }

    pub fn passes(&self) -> impl Iterator<Item = &Pass> {
        self.passes.values()
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// External-id field of the pass named after the given object type.
    /// Relationship mappings resolve through this.
    pub fn external_id_of(&self, type_name: &str) -> Option<&str> {
        self.passes
            .get(type_name)
            .map(|p| p.external_id_field.as_str())
    }
}

/// Name of the split pass derived from a pass name
pub fn split_pass_name(name: &str) -> String {
    format!("{name}{SPLIT_SUFFIX}")
}
