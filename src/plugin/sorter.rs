//! Plugin initialization ordering
//!
//! Topologically orders pending initializations so every service provider
//! initializes before its consumers. On top of the explicit service edges
//! there is one synthetic priority rule: queue backends (plugins that
//! register themselves with the queue plugin registry) must initialize
//! before anything that creates queues through the queue factory, even
//! when the two share no explicit service ref.

use crate::plugin::error::{PluginError, PluginResult};
use crate::plugin::initialization::PendingInit;
use std::collections::{HashMap, HashSet, VecDeque};

/// Capability id a queue backend plugin depends on to register itself
pub const QUEUE_PLUGIN_REGISTRY: &str = "queue-plugin-registry";

/// Capability id a plugin depends on to create queues
pub const QUEUE_FACTORY: &str = "queue-factory";

/// Order plugins so every `provider -> consumer` edge is respected
///
/// Kahn's algorithm over an adjacency list with in-degree counters. The
/// ready queue is seeded and served in registration order, so ties fall
/// back to first-registered-first-initialized; that tie-break is an
/// implementation detail, not a contract. A cycle is fatal: the output is
/// never a partial order.
pub(crate) fn sort_plugins(
    pending: &[PendingInit],
    provided_by: &HashMap<String, String>,
) -> PluginResult<Vec<String>> {
    let ids: Vec<&str> = pending.iter().map(|p| p.plugin_id.as_str()).collect();
    let index: HashMap<&str, usize> = ids
        .iter()
        .enumerate()
        .map(|(i, id)| (*id, i))
        .collect();

    let node_count = pending.len();
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    let mut in_degree = vec![0usize; node_count];
    let mut edges: HashSet<(usize, usize)> = HashSet::new();

    let mut add_edge = |provider: usize,
                        consumer: usize,
                        adjacency: &mut Vec<Vec<usize>>,
                        in_degree: &mut Vec<usize>| {
        if provider != consumer && edges.insert((provider, consumer)) {
            adjacency[provider].push(consumer);
            in_degree[consumer] += 1;
        }
    };

    // Explicit edges: consumer declares a dependency on a provided service
    for (consumer, entry) in pending.iter().enumerate() {
        for service_id in entry.deps.service_ids() {
            if let Some(provider_id) = provided_by.get(service_id) {
                if let Some(&provider) = index.get(provider_id.as_str()) {
                    add_edge(provider, consumer, &mut adjacency, &mut in_degree);
                }
            }
        }
    }

    // Synthetic edges: every queue provider before every queue consumer
    let queue_providers: Vec<usize> = pending
        .iter()
        .enumerate()
        .filter(|(_, p)| p.deps.depends_on(QUEUE_PLUGIN_REGISTRY))
        .map(|(i, _)| i)
        .collect();
    let queue_consumers: Vec<usize> = pending
        .iter()
        .enumerate()
        .filter(|(_, p)| p.deps.depends_on(QUEUE_FACTORY))
        .map(|(i, _)| i)
        .collect();
    for &provider in &queue_providers {
        for &consumer in &queue_consumers {
            add_edge(provider, consumer, &mut adjacency, &mut in_degree);
        }
    }

    let mut ready: VecDeque<usize> = (0..node_count).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(node_count);
    let mut placed = vec![false; node_count];

    while let Some(node) = ready.pop_front() {
        order.push(node);
        placed[node] = true;
        for &next in &adjacency[node] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.push_back(next);
            }
        }
    }

    if order.len() != node_count {
        let remaining: Vec<String> = (0..node_count)
            .filter(|&i| !placed[i])
            .map(|i| ids[i].to_string())
            .collect();
        return Err(PluginError::CircularDependency { remaining });
    }

    Ok(order.into_iter().map(|i| ids[i].to_string()).collect())
}
