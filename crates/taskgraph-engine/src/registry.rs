use std::collections::{HashMap, HashSet};

use taskgraph_id::{PackageName, TaskId, TaskKey, TaskName};

use crate::Error;

/// A registered unit of work: its same-package and cross-package
/// dependencies, and whether it may ever be depended upon.
#[derive(Debug, Clone)]
pub struct TaskDefinition {
    pub name: TaskKey,
    pub deps: HashSet<TaskName>,
    pub topo_deps: HashSet<TaskName>,
    pub persistent: bool,
}

impl TaskDefinition {
    pub fn new(name: TaskKey) -> Self {
        Self {
            name,
            deps: HashSet::new(),
            topo_deps: HashSet::new(),
            persistent: false,
        }
    }

    pub fn with_deps(mut self, deps: impl IntoIterator<Item = TaskName>) -> Self {
        self.deps = deps.into_iter().collect();
        self
    }

    pub fn with_topo_deps(mut self, topo_deps: impl IntoIterator<Item = TaskName>) -> Self {
        self.topo_deps = topo_deps.into_iter().collect();
        self
    }

    pub fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }
}

/// Maps task identifiers (bare or package-qualified) to their definitions.
///
/// Keyed by a tagged identifier type rather than two separate maps, per the
/// two-level lookup policy: a qualified registration always wins over a bare
/// one for its specific package.
#[derive(Debug, Default)]
pub struct Registry {
    tasks: HashMap<TaskKey, TaskDefinition>,
    root_enabled_tasks: HashSet<TaskName>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `register(def)`: stores the definition under `def.name`. If `def.name`
    /// is a package-task for the root package, the task-name component is
    /// also marked root-enabled.
    pub fn register(&mut self, def: TaskDefinition) {
        if let TaskKey::Qualified(id) = &def.name {
            if id.package().is_root() {
                self.root_enabled_tasks.insert(id.task().clone());
            }
        }
        self.tasks.insert(def.name.clone(), def);
    }

    pub fn is_root_enabled(&self, task: &TaskName) -> bool {
        self.root_enabled_tasks.contains(task)
    }

    pub fn root_enabled_tasks(&self) -> &HashSet<TaskName> {
        &self.root_enabled_tasks
    }

    /// All distinct bare task names that have ever been registered, qualified
    /// or not. Used as the default request set when the caller asks for none
    /// in particular.
    pub fn all_bare_task_names(&self) -> HashSet<TaskName> {
        self.tasks.keys().map(|key| key.task_name().clone()).collect()
    }

    /// Definition lookup policy: exact match on `pkg#task` wins, otherwise
    /// fall back to a bare registration, otherwise report both candidates as
    /// missing.
    pub fn resolve(&self, pkg: &PackageName, task: &TaskName) -> Result<&TaskDefinition, Error> {
        let qualified = TaskId::new(pkg.clone(), task.clone());
        if let Some(def) = self.tasks.get(&TaskKey::Qualified(qualified.clone())) {
            return Ok(def);
        }
        if let Some(def) = self.tasks.get(&TaskKey::Bare(task.clone())) {
            return Ok(def);
        }
        Err(Error::MissingDefinition {
            task_id: qualified.to_string(),
            bare_task: task.to_string(),
        })
    }

    /// Same as [`Self::resolve`] but returns `None` instead of erroring,
    /// for the seeding step where a missing top-level task is skipped
    /// silently rather than treated as a failure.
    pub fn try_resolve(&self, pkg: &PackageName, task: &TaskName) -> Option<&TaskDefinition> {
        let qualified = TaskId::new(pkg.clone(), task.clone());
        self.tasks
            .get(&TaskKey::Qualified(qualified))
            .or_else(|| self.tasks.get(&TaskKey::Bare(task.clone())))
    }
}
