//! Abstraction over the package dependency graph.
//!
//! Workspace discovery and package-manager integration are external
//! collaborators; this crate only needs to ask the topology two questions
//! while building the task graph.

use taskgraph_id::PackageName;

/// A caller-populated, acyclic graph over package names.
///
/// `downstream_edges` follows the repository's own orientation: the
/// packages a given package *depends on*. The graph builder never needs to
/// traverse upstream (dependents), only downstream (dependencies).
pub trait Topology {
    fn has_vertex(&self, package: &PackageName) -> bool;

    fn downstream_edges(&self, package: &PackageName) -> Vec<PackageName>;
}
