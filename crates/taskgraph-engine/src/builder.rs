//! The breadth-first expansion that turns a registry of task definitions and
//! a package topology into a concrete task graph.

use std::{
    collections::{HashSet, VecDeque},
    marker::PhantomData,
};

use itertools::Itertools;
use petgraph::graph::NodeIndex;
use taskgraph_id::{PackageName, TaskId, TaskName};
use tracing::{debug, trace};

use crate::{Building, Built, Engine, Error};

/// Inputs to [`Engine::prepare`]: the selected packages, the requested task
/// names (defaulting to every registered bare name when empty), and whether
/// dependency sets should be narrowed to only the requested tasks.
#[derive(Debug, Clone, Default)]
pub struct PrepareOptions {
    pub packages: Vec<PackageName>,
    pub tasks: Vec<TaskName>,
    pub tasks_only: bool,
}

impl PrepareOptions {
    pub fn new(packages: Vec<PackageName>) -> Self {
        Self {
            packages,
            tasks: Vec::new(),
            tasks_only: false,
        }
    }

    pub fn with_tasks(mut self, tasks: Vec<TaskName>) -> Self {
        self.tasks = tasks;
        self
    }

    pub fn tasks_only(mut self, tasks_only: bool) -> Self {
        self.tasks_only = tasks_only;
        self
    }
}

pub(crate) fn build(
    mut engine: Engine<Building>,
    options: PrepareOptions,
) -> Result<Engine<Built>, Error> {
    let PrepareOptions {
        packages,
        tasks,
        tasks_only,
    } = options;

    // Sorted so that a default (unqualified) request produces a deterministic
    // seeding order across runs, independent of hash-map iteration order.
    let requested_tasks: Vec<TaskName> = if tasks.is_empty() {
        engine.registry.all_bare_task_names().into_iter().sorted().collect()
    } else {
        tasks
    };
    let request_set: HashSet<TaskName> = requested_tasks.iter().cloned().collect();

    let topology = engine
        .topology
        .take()
        .expect("topology present while building");

    let mut queue: VecDeque<TaskId> = VecDeque::new();
    let mut visited: HashSet<TaskId> = HashSet::new();

    // Seeding: top-level tasks need not exist in every package, so a missing
    // definition here is skipped silently rather than treated as an error.
    for p in &packages {
        for t in &requested_tasks {
            if p.is_root() && !engine.registry.is_root_enabled(t) {
                debug!(package = %p, task = %t, "skipping unregistered root-gated seed task");
                continue;
            }
            if engine.registry.try_resolve(p, t).is_none() {
                debug!(package = %p, task = %t, "skipping seed task with no definition");
                continue;
            }
            queue.push_back(TaskId::new(p.clone(), t.clone()));
        }
    }

    while let Some(id) = queue.pop_front() {
        let pkg = id.package().clone();
        let task = id.task().clone();

        if pkg.is_root() && !engine.registry.is_root_enabled(&task) {
            return Err(Error::RootTaskUndeclared {
                task_id: id.to_string(),
                task: task.to_string(),
            });
        }

        // Dependency tasks, unlike seeds, are required to exist.
        let definition = engine.registry.resolve(&pkg, &task)?.clone();

        if visited.contains(&id) {
            continue;
        }
        visited.insert(id.clone());

        let (deps, topo_deps) = if tasks_only {
            (
                definition
                    .deps
                    .iter()
                    .filter(|d| request_set.contains(*d))
                    .cloned()
                    .collect::<HashSet<_>>(),
                definition
                    .topo_deps
                    .iter()
                    .filter(|d| request_set.contains(*d))
                    .cloned()
                    .collect::<HashSet<_>>(),
            )
        } else {
            (definition.deps.clone(), definition.topo_deps.clone())
        };

        let downstream = topology.downstream_edges(&pkg);
        let has_topo = !topo_deps.is_empty() && !downstream.is_empty();
        let has_deps = !deps.is_empty();
        let explicit: Vec<TaskId> = engine
            .package_task_deps
            .iter()
            .filter(|dep| dep.to == id)
            .map(|dep| dep.from.clone())
            .collect();
        let has_explicit = !explicit.is_empty();

        let to_index = engine.get_index(&id);

        if has_topo {
            for d in &topo_deps {
                for q in &downstream {
                    let from_id = TaskId::new(q.clone(), d.clone());
                    add_edge(&mut engine, to_index, &id, &from_id)?;
                    queue.push_back(from_id);
                }
            }
        }
        if has_deps {
            for d in &deps {
                let from_id = TaskId::new(pkg.clone(), d.clone());
                add_edge(&mut engine, to_index, &id, &from_id)?;
                queue.push_back(from_id);
            }
        }
        if has_explicit {
            for from_id in explicit {
                add_edge(&mut engine, to_index, &id, &from_id)?;
                queue.push_back(from_id);
            }
        }
        if !has_topo && !has_deps && !has_explicit {
            engine.connect_to_root(&id);
        }
    }

    taskgraph_graph::validate_graph(&engine.task_graph)
        .map_err(|source| Error::CycleDetected { source })?;

    Ok(Engine {
        marker: PhantomData,
        topology: None,
        registry: engine.registry,
        package_task_deps: engine.package_task_deps,
        task_graph: engine.task_graph,
        root_index: engine.root_index,
        task_lookup: engine.task_lookup,
    })
}

/// Resolves `from_id`'s definition, rejects persistent dependencies, inserts
/// both vertices, and connects `to_index -> from_index`.
fn add_edge(
    engine: &mut Engine<Building>,
    to_index: NodeIndex,
    to_id: &TaskId,
    from_id: &TaskId,
) -> Result<(), Error> {
    let persistent = engine.registry.resolve(from_id.package(), from_id.task())?.persistent;
    if persistent {
        return Err(Error::PersistentDependedUpon {
            dependent: to_id.to_string(),
            persistent: from_id.to_string(),
        });
    }
    let from_index = engine.get_index(from_id);
    engine.task_graph.add_edge(to_index, from_index, ());
    trace!(dependent = %to_id, dependency = %from_id, "added task graph edge");
    Ok(())
}
