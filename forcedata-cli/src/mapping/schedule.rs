//! Pass scheduling: Kahn-style drain of the dependency graph
//!
//! Repeatedly takes the first unsorted pass with no outstanding
//! dependencies (in map order, so the result is deterministic), marks it
//! sorted, and strips the satisfied edge from every dependent. Stops when
//! nothing is ready; the caller decides whether that means done or stuck.

use super::graph::PassGraph;

/// Find the next loadable pass and mark it sorted
pub fn find_next_pass(graph: &mut PassGraph) -> Option<String> {
    let name = graph
        .passes()
        .find(|p| !p.sorted && p.dependencies.is_empty())
        .map(|p| p.name.clone())?;
    if let Some(pass) = graph.get_mut(&name) {
        pass.sorted = true;
    }
    Some(name)
}

/// Drain ready passes into `order` until none remain. Returns true when
/// every pass in the graph has been sorted.
pub fn sort_passes(graph: &mut PassGraph, order: &mut Vec<String>) -> bool {
    while let Some(name) = find_next_pass(graph) {
        let dependents = graph
            .get(&name)
            .map(|p| p.dependents.clone())
            .unwrap_or_default();
        for dependent in dependents {
            if let Some(pass) = graph.get_mut(&dependent) {
                pass.dependencies.retain(|d| d.target != name);
            }
        }
        order.push(name);
    }
    graph.passes().all(|p| p.sorted)
}
