//! A task-graph engine: expands a declarative pipeline of per-package tasks
//! into a concrete DAG of package-task nodes and walks it concurrently.
//!
//! The engine is a typestate: [`Engine<Building>`] exposes mutation
//! (`add_task`, `add_dep`), [`Engine<Building>::prepare`] consumes it and
//! produces an [`Engine<Built>`], which exposes graph queries and
//! [`Engine::execute`] but no further mutation.

mod builder;
mod error;
mod executor;
mod registry;
mod resolver;

use std::{collections::HashMap, fmt, marker::PhantomData};

use petgraph::graph::{Graph, NodeIndex};
use taskgraph_graph::Topology;
use taskgraph_id::TaskId;

pub use builder::PrepareOptions;
pub use error::Error;
pub use executor::{ExecutionOptions, Message, Stop, Visit};
pub use registry::TaskDefinition;
pub use resolver::{resolve_targets, ResolvedArgs};

/// Marker for an [`Engine`] that is still accepting `add_task`/`add_dep`
/// calls.
pub struct Building;

/// Marker for an [`Engine`] whose task graph has been built and is ready to
/// walk. No further mutation is possible.
pub struct Built;

/// A node in the concrete task graph: either a real package-task, or the
/// synthetic sentinel every leaf task points to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaskNode {
    Root,
    Task(TaskId),
}

impl fmt::Display for TaskNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskNode::Root => f.write_str("::root::"),
            TaskNode::Task(id) => write!(f, "{id}"),
        }
    }
}

/// An explicit package-task edge, independent of package topology.
///
/// Confusingly (but consistently with how the underlying graph edges are
/// added) `to` names the *dependent* task and `from` names the task it
/// depends on: building the graph adds an edge `to -> from`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageTaskDep {
    pub from: TaskId,
    pub to: TaskId,
}

/// The task-graph engine. Construct with [`Engine::new`], populate with
/// [`Engine::add_task`]/[`Engine::add_dep`], then call
/// [`Engine::prepare`] to obtain a walkable, read-only graph.
pub struct Engine<S> {
    marker: PhantomData<S>,
    topology: Option<Box<dyn Topology + Send + Sync>>,
    registry: registry::Registry,
    package_task_deps: Vec<PackageTaskDep>,
    task_graph: Graph<TaskNode, ()>,
    root_index: NodeIndex,
    task_lookup: HashMap<TaskId, NodeIndex>,
}

impl Engine<Building> {
    pub fn new(topology: impl Topology + Send + Sync + 'static) -> Self {
        let mut task_graph = Graph::new();
        let root_index = task_graph.add_node(TaskNode::Root);
        Self {
            marker: PhantomData,
            topology: Some(Box::new(topology)),
            registry: registry::Registry::new(),
            package_task_deps: Vec::new(),
            task_graph,
            root_index,
            task_lookup: HashMap::new(),
        }
    }

    /// Chainable registration of a task definition.
    pub fn add_task(mut self, definition: TaskDefinition) -> Self {
        self.registry.register(definition);
        self
    }

    /// Registers an explicit package-task edge independent of topology.
    /// `to` depends on `from`. Rejects a `from` package unknown to the
    /// topology, unless it is the sentinel root package.
    pub fn add_dep(mut self, from: TaskId, to: TaskId) -> Result<Self, Error> {
        if !from.package().is_root()
            && !self
                .topology
                .as_ref()
                .expect("topology present while building")
                .has_vertex(from.package())
        {
            return Err(Error::UnknownPackage {
                package: from.package().to_string(),
            });
        }
        self.package_task_deps.push(PackageTaskDep { from, to });
        Ok(self)
    }

    fn get_index(&mut self, id: &TaskId) -> NodeIndex {
        if let Some(index) = self.task_lookup.get(id) {
            return *index;
        }
        let index = self.task_graph.add_node(TaskNode::Task(id.clone()));
        self.task_lookup.insert(id.clone(), index);
        index
    }

    fn connect_to_root(&mut self, id: &TaskId) {
        let index = self.get_index(id);
        self.task_graph.add_edge(index, self.root_index, ());
    }

    /// Builds the task graph from the registered tasks and topology,
    /// per the seeding + breadth-first expansion algorithm, then seals the
    /// engine against further mutation.
    pub fn prepare(self, options: PrepareOptions) -> Result<Engine<Built>, Error> {
        builder::build(self, options)
    }
}

impl Engine<Built> {
    pub fn task_graph(&self) -> &Graph<TaskNode, ()> {
        &self.task_graph
    }

    pub fn root_index(&self) -> NodeIndex {
        self.root_index
    }

    pub fn task_ids(&self) -> impl Iterator<Item = &TaskId> {
        self.task_lookup.keys()
    }

    pub fn task_definition(&self, id: &TaskId) -> Option<&TaskDefinition> {
        self.registry.try_resolve(id.package(), id.task())
    }

    pub fn contains_task(&self, id: &TaskId) -> bool {
        self.task_lookup.contains_key(id)
    }
}
