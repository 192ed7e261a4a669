//! Cycle breaking: turn the pass graph into a DAG by splitting passes
//!
//! Runs as an explicit state machine alternating between draining ready
//! passes (Kahn-style, see [`super::schedule`]) and splitting one pass out
//! of the remaining cycle. Each split moves every outstanding dependency
//! (and the fields carrying them) of the chosen pass onto a dependent
//! `-split-1` pass, leaving the original free to load. Total field count is
//! preserved, at the cost of an extra query+update at load time.
//!
//! The pass to split is chosen greedily: the pass depended upon by the most
//! distinct other passes, skipping any pass that still carries a
//! MasterDetail dependency (a detail record cannot precede its master).
//! This does not always yield the minimum number of extra passes; a minimum
//! feedback-vertex-set computation would, but the greedy rule is kept for
//! output compatibility with existing mapping artifacts.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use super::graph::PassGraph;
use super::schedule;

/// States of the cycle-breaking loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BreakerState {
    /// Draining ready passes into the output order
    Sorting,
    /// No ready pass but unsorted passes remain: a cycle exists
    Stuck,
    /// Splitting one pass out of the cycle
    Splitting,
    /// Every pass is sorted
    Done,
    /// Safety valve tripped: split rounds exceeded the bound
    Failed,
}

/// No pass in the remaining cycle could be split without isolating a
/// MasterDetail dependency; the schema needs manual intervention.
#[derive(Debug, Clone)]
pub struct UnresolvableCycleError {
    /// The passes still stuck in the cycle, for diagnosis
    pub passes: Vec<String>,
}

impl std::fmt::Display for UnresolvableCycleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Unable to break dependency cycle involving: {}",
            self.passes.join(", ")
        )
    }
}

impl std::error::Error for UnresolvableCycleError {}

/// Resolve the graph into a complete load order: isolate self-references,
/// then alternate sorting and cycle splitting until every pass is placed.
pub fn plan_order(graph: &mut PassGraph) -> Result<Vec<String>, UnresolvableCycleError> {
    graph.split_self_references();

    let mut order = Vec::with_capacity(graph.len());
    // Each original pass can be split at most once, so this bound is only
    // reachable through a regression in the split logic
    let max_rounds = graph.len() + 1;
    let mut rounds = 0;

    let mut state = BreakerState::Sorting;
    loop {
        state = match state {
            BreakerState::Sorting => {
                if schedule::sort_passes(graph, &mut order) {
                    BreakerState::Done
                } else {
                    BreakerState::Stuck
                }
            }
            BreakerState::Stuck => {
                rounds += 1;
                if rounds > max_rounds {
                    BreakerState::Failed
                } else {
                    BreakerState::Splitting
                }
            }
            BreakerState::Splitting => {
                split_cycle(graph)?;
                BreakerState::Sorting
            }
            BreakerState::Done => return Ok(order),
            BreakerState::Failed => {
                log::error!(
                    "Cycle breaking did not converge after {} rounds",
                    max_rounds
                );
                return Err(UnresolvableCycleError {
                    passes: unsorted_names(graph),
                });
            }
        };
    }
}

/// Break the current cycle by splitting one pass in two
fn split_cycle(graph: &mut PassGraph) -> Result<(), UnresolvableCycleError> {
    // Count how many distinct passes depend on each target, over the
    // unsorted remainder
    let mut dependent_counts: BTreeMap<String, usize> = BTreeMap::new();
    for pass in graph.passes().filter(|p| !p.sorted) {
        let distinct_targets: BTreeSet<&str> =
            pass.dependencies.iter().map(|d| d.target.as_str()).collect();
        for target in distinct_targets {
            *dependent_counts.entry(target.to_string()).or_insert(0) += 1;
        }
    }

    // Rank by dependent count descending; the stable sort keeps ties in
    // alphabetical order so the choice is deterministic
    let mut candidates: Vec<(String, usize)> = dependent_counts.into_iter().collect();
    candidates.sort_by(|a, b| b.1.cmp(&a.1));

    let chosen = candidates.iter().find_map(|(name, _)| {
        graph
            .get(name)
            .filter(|pass| pass.splittable())
            .map(|pass| pass.name.clone())
    });

    let Some(chosen) = chosen else {
        return Err(UnresolvableCycleError {
            passes: unsorted_names(graph),
        });
    };

    log::info!("Splitting cycle on {}", chosen);

    let moved_fields: HashSet<String> = graph
        .get(&chosen)
        .map(|pass| {
            pass.dependencies
                .iter()
                .filter_map(|d| d.field.clone())
                .collect()
        })
        .unwrap_or_default();

    graph.split_off(&chosen, |_| true, |f| moved_fields.contains(&f.name));
    Ok(())
}

fn unsorted_names(graph: &PassGraph) -> Vec<String> {
    graph
        .passes()
        .filter(|p| !p.sorted)
        .map(|p| p.name.clone())
        .collect()
}
