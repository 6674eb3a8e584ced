//! Save-dependency graph
//!
//! Persistable entities register here with a priority band and the ids they
//! must be saved after. The graph publishes a total save order: dependencies
//! always come first, and among entities with no ordering constraint between
//! them the higher priority band wins, then the earlier registration.
//!
//! The graph never owns the entities themselves, only their ids.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap, HashMap};
use thiserror::Error;

/// Save-graph errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DependencyError {
    /// A node with this id is already registered
    #[error("Save node already registered: {0}")]
    DuplicateNode(String),
    /// No node with this id is registered
    #[error("Save node not registered: {0}")]
    UnknownNode(String),
    /// The dependency relation contains a cycle (path ends where it started)
    #[error("Save dependency cycle: {}", .0.join(" -> "))]
    CycleDetected(Vec<String>),
    /// A computed order failed validation
    #[error("Computed save order failed validation")]
    InvalidOrder,
}

/// Default priority bands, highest saved first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SavePriority {
    /// Cosmetic container panel state
    ContainerUi,
    /// Transient UI state
    UiState,
    /// Top-level inventory controller
    Controller,
    /// Contents of a grid
    GridContents,
    /// Equipment slot binding
    EquipmentSlot,
    /// Grid layout and configuration
    GridLayout,
    /// Item definitions
    ItemData,
}

impl SavePriority {
    /// Numeric priority of the band
    pub const fn value(self) -> i32 {
        match self {
            Self::ItemData => 600,
            Self::GridLayout => 500,
            Self::EquipmentSlot => 400,
            Self::GridContents => 300,
            Self::Controller => 200,
            Self::UiState => 100,
            Self::ContainerUi => 0,
        }
    }
}

impl From<SavePriority> for i32 {
    fn from(priority: SavePriority) -> Self {
        priority.value()
    }
}

/// A registered persistable entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveableNode {
    /// Entity id (matches `Persistable::save_id`)
    pub id: String,
    /// Priority used as a tie-breaker
    pub priority: i32,
    /// Ids that must be saved before this node
    pub dependencies: BTreeSet<String>,
    /// Registration sequence number
    pub registered_at: u64,
}

impl SaveableNode {
    /// Check if this node depends on `id`
    pub fn depends_on(&self, id: &str) -> bool {
        self.dependencies.contains(id)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Entry in the ready queue: highest priority first, then oldest registration
#[derive(PartialEq, Eq)]
struct Ready<'a> {
    priority: i32,
    registered_at: u64,
    id: &'a str,
}

impl Ord for Ready<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.registered_at.cmp(&self.registered_at))
    }
}

impl PartialOrd for Ready<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Directed graph of "must be saved after" constraints
#[derive(Debug, Default)]
pub struct SaveDependencyGraph {
    /// Registered nodes by id
    nodes: HashMap<String, SaveableNode>,
    /// Next registration sequence number
    next_sequence: u64,
    /// Last valid save order
    order: Vec<String>,
    /// Whether the last recompute succeeded
    consistent: bool,
    /// Error of the last rejected change
    last_error: Option<DependencyError>,
    /// Orders published since the last drain
    computed: Vec<Vec<String>>,
}

impl SaveDependencyGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self {
            consistent: true,
            ..Self::default()
        }
    }

    /// Register a node and recompute the save order.
    ///
    /// A duplicate id is rejected without touching the graph. If the new
    /// edges close a cycle the node is removed again, the previous order is
    /// kept and `CycleDetected` is returned, so the caller can retry with
    /// corrected dependencies.
    pub fn register<I, S>(
        &mut self,
        id: impl Into<String>,
        priority: impl Into<i32>,
        dependencies: I,
    ) -> Result<(), DependencyError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id = id.into();
        if self.nodes.contains_key(&id) {
            return Err(DependencyError::DuplicateNode(id));
        }

        let node = SaveableNode {
            id: id.clone(),
            priority: priority.into(),
            dependencies: dependencies.into_iter().map(Into::into).collect(),
            registered_at: self.next_sequence,
        };
        self.next_sequence += 1;

        log::debug!(
            "Registered save node '{}' (priority {}, deps {:?})",
            id,
            node.priority,
            node.dependencies
        );
        self.nodes.insert(id.clone(), node);
        self.commit(|graph| {
            graph.nodes.remove(&id);
        })
    }

    /// Unregister a node, strip it from every dependency set and recompute.
    pub fn unregister(&mut self, id: &str) -> Option<SaveableNode> {
        let node = self.nodes.remove(id)?;
        for other in self.nodes.values_mut() {
            other.dependencies.remove(id);
        }
        log::debug!("Unregistered save node '{}'", id);

        // A failed recompute is logged and leaves the previous order in place
        let _ = self.recompute();
        Some(node)
    }

    /// Replace the dependency set of a registered node.
    ///
    /// A set that closes a cycle is rejected and the old set stays.
    pub fn set_dependencies<I, S>(&mut self, id: &str, dependencies: I) -> Result<(), DependencyError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| DependencyError::UnknownNode(id.to_string()))?;
        let previous = std::mem::replace(
            &mut node.dependencies,
            dependencies.into_iter().map(Into::into).collect(),
        );
        self.commit(|graph| graph.restore_dependencies(id, previous))
    }

    /// Add one dependency edge `id -> dependency`. An edge that closes a
    /// cycle is rejected.
    pub fn add_dependency(&mut self, id: &str, dependency: impl Into<String>) -> Result<(), DependencyError> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| DependencyError::UnknownNode(id.to_string()))?;
        let previous = node.dependencies.clone();
        node.dependencies.insert(dependency.into());
        self.commit(|graph| graph.restore_dependencies(id, previous))
    }

    /// Compute a fresh save order from the registered nodes.
    ///
    /// Edges to unregistered ids are treated as already satisfied.
    pub fn compute_order(&self) -> Result<Vec<String>, DependencyError> {
        let roots = self.nodes_by_registration();

        // Depth-first pass: a grey node seen again means a cycle
        let mut marks: HashMap<&str, Mark> = HashMap::with_capacity(self.nodes.len());
        let mut path = Vec::new();
        let mut post_order = Vec::with_capacity(self.nodes.len());
        for node in &roots {
            self.visit(&node.id, &mut marks, &mut path, &mut post_order)?;
        }

        // Dependency-respecting order with priority as the tie-breaker
        let mut pending: HashMap<&str, usize> = HashMap::with_capacity(self.nodes.len());
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
        for id in &post_order {
            let node = &self.nodes[*id];
            let live_deps = node
                .dependencies
                .iter()
                .filter(|dep| self.nodes.contains_key(dep.as_str()));
            let mut count = 0;
            for dep in live_deps {
                dependents.entry(dep.as_str()).or_default().push(*id);
                count += 1;
            }
            pending.insert(*id, count);
        }

        let mut ready: BinaryHeap<Ready> = pending
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(id, _)| self.ready(*id))
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(next) = ready.pop() {
            order.push(next.id.to_string());
            if let Some(children) = dependents.get(next.id) {
                for child in children {
                    if let Some(count) = pending.get_mut(child) {
                        *count -= 1;
                        if *count == 0 {
                            ready.push(self.ready(*child));
                        }
                    }
                }
            }
        }

        if order.len() != self.nodes.len() {
            // Unreachable after a clean depth-first pass
            let stuck = pending
                .into_iter()
                .filter(|(_, count)| *count > 0)
                .map(|(id, _)| id.to_string())
                .collect();
            return Err(DependencyError::CycleDetected(stuck));
        }

        Ok(order)
    }

    /// Check that every dependency appears strictly before its dependent
    /// and that every registered node appears exactly once.
    pub fn validate_order(&self, order: &[String]) -> bool {
        let mut positions: HashMap<&str, usize> = HashMap::with_capacity(order.len());
        for (index, id) in order.iter().enumerate() {
            if !self.nodes.contains_key(id) {
                log::error!("Save order names unregistered node '{}'", id);
                return false;
            }
            if positions.insert(id.as_str(), index).is_some() {
                log::error!("Save order lists '{}' twice", id);
                return false;
            }
        }

        if positions.len() != self.nodes.len() {
            log::error!(
                "Save order covers {} of {} registered nodes",
                positions.len(),
                self.nodes.len()
            );
            return false;
        }

        for (id, index) in &positions {
            let node = &self.nodes[*id];
            for dep in &node.dependencies {
                match positions.get(dep.as_str()) {
                    Some(dep_index) if dep_index < index => {}
                    Some(_) => {
                        log::error!("Save order places '{}' before its dependency '{}'", id, dep);
                        return false;
                    }
                    // Unregistered dependency, already satisfied
                    None => {}
                }
            }
        }

        true
    }

    /// Last valid save order
    pub fn save_order(&self) -> &[String] {
        &self.order
    }

    /// Whether the most recent recompute produced a valid order
    pub fn is_consistent(&self) -> bool {
        self.consistent
    }

    /// Error of the most recent rejected change
    pub fn last_error(&self) -> Option<&DependencyError> {
        self.last_error.as_ref()
    }

    /// Drain orders published since the last call
    pub fn drain_computed_orders(&mut self) -> Vec<Vec<String>> {
        std::mem::take(&mut self.computed)
    }

    /// Check if a node is registered
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Get a registered node
    pub fn get(&self, id: &str) -> Option<&SaveableNode> {
        self.nodes.get(id)
    }

    /// Ids of nodes that list `id` as a dependency
    pub fn dependents_of(&self, id: &str) -> Vec<&str> {
        let mut dependents: Vec<&SaveableNode> =
            self.nodes.values().filter(|n| n.depends_on(id)).collect();
        dependents.sort_by_key(|n| n.registered_at);
        dependents.into_iter().map(|n| n.id.as_str()).collect()
    }

    /// Number of registered nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if no nodes are registered
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Recompute after a change, undoing the change if it cannot be ordered
    fn commit(&mut self, rollback: impl FnOnce(&mut Self)) -> Result<(), DependencyError> {
        let consistent = self.consistent;
        let result = self.recompute();
        if let Err(e) = &result {
            log::debug!("Rolling back save graph change");
            rollback(self);
            self.consistent = consistent;
        }
        result
    }

    fn restore_dependencies(&mut self, id: &str, dependencies: BTreeSet<String>) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.dependencies = dependencies;
        }
    }

    /// Recompute and publish the order, keeping the previous one on failure
    fn recompute(&mut self) -> Result<(), DependencyError> {
        let result = self.compute_order().and_then(|order| {
            if self.validate_order(&order) {
                Ok(order)
            } else {
                Err(DependencyError::InvalidOrder)
            }
        });

        match result {
            Ok(order) => {
                self.consistent = true;
                self.last_error = None;
                self.order = order.clone();
                self.computed.push(order);
                Ok(())
            }
            Err(e) => {
                log::error!("Save order not updated, keeping previous order: {}", e);
                self.consistent = false;
                self.last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    fn nodes_by_registration(&self) -> Vec<&SaveableNode> {
        let mut nodes: Vec<&SaveableNode> = self.nodes.values().collect();
        nodes.sort_by_key(|n| n.registered_at);
        nodes
    }

    fn ready<'a>(&'a self, id: &'a str) -> Ready<'a> {
        let node = &self.nodes[id];
        Ready {
            priority: node.priority,
            registered_at: node.registered_at,
            id,
        }
    }

    /// Recursive helper for the depth-first pass
    fn visit<'a>(
        &'a self,
        id: &'a str,
        marks: &mut HashMap<&'a str, Mark>,
        path: &mut Vec<&'a str>,
        post_order: &mut Vec<&'a str>,
    ) -> Result<(), DependencyError> {
        match marks.get(id) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::InProgress) => {
                let start = path.iter().position(|p| *p == id).unwrap_or(0);
                let mut cycle: Vec<String> = path[start..].iter().map(|s| s.to_string()).collect();
                cycle.push(id.to_string());
                return Err(DependencyError::CycleDetected(cycle));
            }
            None => {}
        }

        marks.insert(id, Mark::InProgress);
        path.push(id);

        if let Some(node) = self.nodes.get(id) {
            for dep in &node.dependencies {
                if self.nodes.contains_key(dep.as_str()) {
                    self.visit(dep, marks, path, post_order)?;
                }
            }
        }

        path.pop();
        marks.insert(id, Mark::Done);
        post_order.push(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_of(order: &[String], id: &str) -> usize {
        order.iter().position(|o| o == id).unwrap()
    }

    #[test]
    fn test_dependencies_come_first() {
        let mut graph = SaveDependencyGraph::new();
        graph.register("ui", SavePriority::UiState, ["controller"]).unwrap();
        graph.register("controller", SavePriority::Controller, ["grid"]).unwrap();
        graph.register("grid", SavePriority::GridContents, Vec::<String>::new()).unwrap();

        let order = graph.compute_order().unwrap();
        assert_eq!(order, vec!["grid", "controller", "ui"]);
        assert!(graph.validate_order(&order));
    }

    #[test]
    fn test_priority_breaks_ties() {
        let mut graph = SaveDependencyGraph::new();
        graph.register("ui", SavePriority::UiState, Vec::<String>::new()).unwrap();
        graph.register("items", SavePriority::ItemData, Vec::<String>::new()).unwrap();
        graph.register("slot", SavePriority::EquipmentSlot, Vec::<String>::new()).unwrap();

        assert_eq!(graph.save_order(), ["items", "slot", "ui"]);
    }

    #[test]
    fn test_registration_order_breaks_equal_priority() {
        let mut graph = SaveDependencyGraph::new();
        graph.register("grid.b", SavePriority::GridContents, Vec::<String>::new()).unwrap();
        graph.register("grid.a", SavePriority::GridContents, Vec::<String>::new()).unwrap();

        assert_eq!(graph.save_order(), ["grid.b", "grid.a"]);
    }

    #[test]
    fn test_priority_never_overrides_dependency() {
        let mut graph = SaveDependencyGraph::new();
        // High-priority node that must wait for a low-priority one
        graph.register("items", SavePriority::ItemData, ["panel"]).unwrap();
        graph.register("panel", SavePriority::ContainerUi, Vec::<String>::new()).unwrap();
        graph.register("slot", SavePriority::EquipmentSlot, Vec::<String>::new()).unwrap();

        let order = graph.save_order().to_vec();
        assert!(index_of(&order, "panel") < index_of(&order, "items"));
        assert!(graph.validate_order(&order));
    }

    #[test]
    fn test_unregistered_dependency_is_ignored() {
        let mut graph = SaveDependencyGraph::new();
        graph.register("grid.backpack", SavePriority::GridContents, ["slot.backpack"]).unwrap();

        assert_eq!(graph.save_order(), ["grid.backpack"]);
    }

    #[test]
    fn test_duplicate_registration() {
        let mut graph = SaveDependencyGraph::new();
        graph.register("grid", 1, Vec::<String>::new()).unwrap();
        let err = graph.register("grid", 2, Vec::<String>::new()).unwrap_err();

        assert_eq!(err, DependencyError::DuplicateNode("grid".to_string()));
        assert_eq!(graph.get("grid").unwrap().priority, 1);
    }

    #[test]
    fn test_cycle_detected() {
        let mut graph = SaveDependencyGraph::new();
        graph.register("a", 0, ["b"]).unwrap();
        let before = graph.save_order().to_vec();

        let err = graph.register("b", 0, ["a"]).unwrap_err();
        assert_eq!(
            err,
            DependencyError::CycleDetected(vec!["a".into(), "b".into(), "a".into()])
        );

        // The node was rolled back, the previous order stays
        assert!(!graph.contains("b"));
        assert_eq!(graph.save_order(), before.as_slice());
        assert!(graph.is_consistent());
        assert!(graph.compute_order().is_ok());
    }

    #[test]
    fn test_retry_after_cycle() {
        let mut graph = SaveDependencyGraph::new();
        graph.register("a", 0, ["b"]).unwrap();
        graph.register("b", 0, ["a"]).unwrap_err();

        graph.register("b", 0, Vec::<String>::new()).unwrap();
        assert_eq!(graph.save_order(), ["b", "a"]);
    }

    #[test]
    fn test_cyclic_edge_change_rolled_back() {
        let mut graph = SaveDependencyGraph::new();
        graph.register("a", 0, Vec::<String>::new()).unwrap();
        graph.register("b", 0, ["a"]).unwrap();
        graph.drain_computed_orders();

        assert!(matches!(
            graph.add_dependency("a", "b"),
            Err(DependencyError::CycleDetected(_))
        ));
        assert!(!graph.get("a").unwrap().depends_on("b"));

        assert!(matches!(
            graph.set_dependencies("a", ["b", "c"]),
            Err(DependencyError::CycleDetected(_))
        ));
        assert!(graph.get("a").unwrap().dependencies.is_empty());

        assert!(graph.is_consistent());
        assert_eq!(graph.save_order(), ["a", "b"]);
        assert!(graph.drain_computed_orders().is_empty());
    }

    #[test]
    fn test_invalid_order_reported_separately() {
        let err = DependencyError::InvalidOrder;
        assert_ne!(err, DependencyError::CycleDetected(Vec::new()));
        assert_eq!(err.to_string(), "Computed save order failed validation");
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let mut graph = SaveDependencyGraph::new();
        let err = graph.register("a", 0, ["a"]).unwrap_err();
        assert_eq!(err, DependencyError::CycleDetected(vec!["a".into(), "a".into()]));
    }

    #[test]
    fn test_unregister_strips_edges() {
        let mut graph = SaveDependencyGraph::new();
        graph.register("slot", SavePriority::EquipmentSlot, Vec::<String>::new()).unwrap();
        graph.register("child", SavePriority::GridContents, ["slot"]).unwrap();
        assert_eq!(graph.dependents_of("slot"), vec!["child"]);

        graph.unregister("slot");
        assert!(!graph.get("child").unwrap().depends_on("slot"));
        assert!(graph.dependents_of("slot").is_empty());
        assert_eq!(graph.save_order(), ["child"]);

        assert!(graph.unregister("slot").is_none());
    }

    #[test]
    fn test_validate_rejects_bad_orders() {
        let mut graph = SaveDependencyGraph::new();
        graph.register("a", 0, Vec::<String>::new()).unwrap();
        graph.register("b", 0, ["a"]).unwrap();

        assert!(!graph.validate_order(&["b".into(), "a".into()]));
        assert!(!graph.validate_order(&["a".into()]));
        assert!(!graph.validate_order(&["a".into(), "a".into(), "b".into()]));
        assert!(!graph.validate_order(&["a".into(), "b".into(), "zzz".into()]));
        assert!(graph.validate_order(&["a".into(), "b".into()]));
    }

    #[test]
    fn test_drain_computed_orders() {
        let mut graph = SaveDependencyGraph::new();
        graph.register("a", 0, Vec::<String>::new()).unwrap();
        graph.register("b", 0, Vec::<String>::new()).unwrap();

        let published = graph.drain_computed_orders();
        assert_eq!(published.len(), 2);
        assert_eq!(published[1], vec!["a", "b"]);
        assert!(graph.drain_computed_orders().is_empty());
    }
}
