use miette::Diagnostic;
use taskgraph_id::TaskId;
use thiserror::Error;

/// Errors produced while populating, building, or walking a task graph.
///
/// Every variant carries the offending identifier so that a caller can
/// surface an actionable message without this crate ever touching source
/// text (configuration parsing happens upstream of here).
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("could not find a task definition for `{task_id}` or `{bare_task}`")]
    #[diagnostic(help("register a definition for one of these names before building the graph"))]
    MissingDefinition { task_id: String, bare_task: String },

    #[error("`{task_id}` is not declared as a root task")]
    #[diagnostic(help(
        "add an explicit `//#{task}` registration, or remove the dependency on it"
    ))]
    RootTaskUndeclared { task_id: String, task: String },

    #[error("`{dependent}` depends on `{persistent}`, which is persistent")]
    #[diagnostic(help("persistent tasks never exit and cannot be depended upon"))]
    PersistentDependedUpon {
        dependent: String,
        persistent: String,
    },

    #[error("cycle detected in task graph")]
    #[diagnostic(help("{source}"))]
    CycleDetected {
        #[source]
        source: taskgraph_graph::Error,
    },

    #[error("package `{package}` is not present in the topology")]
    UnknownPackage { package: String },

    #[error("`{target}` is not a registered task")]
    UnknownTarget { target: String },

    #[error("visitor failed for `{task_id}`: {source}")]
    VisitorError {
        task_id: TaskId,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}
