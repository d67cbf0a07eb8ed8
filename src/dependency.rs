use std::collections::{HashMap, HashSet};

use crate::component_info::ComponentInfo;

/// Determines whether adding the edge `from -> to` (meaning "`from` depends
/// on `to`") would close a cycle in the graph as it currently stands, and if
/// so returns the full cycle for diagnostics.
///
/// Traversal follows `depends_on_it` (the reverse edges) starting at `from`,
/// per the resolver design: the proposed edge is cycle-forming exactly when
/// `to` is already reachable from `from` through existing reverse edges,
/// i.e. `to` already (transitively) depends on something that depends on
/// `from`. The returned path closes the loop by repeating `from` at the end,
/// so a direct back-reference reads as `B -> A -> B` rather than `B -> A`.
pub fn find_cycle_path(
    infos: &HashMap<String, ComponentInfo>,
    from: &str,
    to: &str,
) -> Option<Vec<String>> {
    let mut visited = HashSet::new();
    let mut path = Vec::new();
    if dfs(infos, from, to, &mut visited, &mut path) {
        path.push(from.to_string());
        Some(path)
    } else {
        None
    }
}

fn dfs(
    infos: &HashMap<String, ComponentInfo>,
    current: &str,
    target: &str,
    visited: &mut HashSet<String>,
    path: &mut Vec<String>,
) -> bool {
    path.push(current.to_string());
    if current == target {
        return true;
    }
    visited.insert(current.to_string());

    if let Some(info) = infos.get(current) {
        for next in info.depends_on_it() {
            if !visited.contains(next) && dfs(infos, next, target, visited, path) {
                return true;
            }
        }
    }

    path.pop();
    false
}
