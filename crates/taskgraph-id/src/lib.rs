//! Identifier algebra for package-qualified task names.
//!
//! Canonical form is `package#task`. A bare `task` (no `#`) is unqualified
//! and only resolvable with a package supplied by the caller.

use std::fmt;

/// Delimiter between the package and task components of a [`TaskId`].
pub const TASK_DELIMITER: char = '#';

/// Reserved package name for the monorepo root itself.
pub const ROOT_PACKAGE: &str = "//";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("package name must not be empty")]
    EmptyPackage,
    #[error("task name must not be empty")]
    EmptyTask,
    #[error("task name `{0}` must not contain `{TASK_DELIMITER}`")]
    TaskContainsDelimiter(String),
    #[error("`{0}` is not a valid task id: expected `package{TASK_DELIMITER}task` or a bare task name")]
    Malformed(String),
}

/// A workspace package name. `//` is reserved for the monorepo root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageName(String);

impl PackageName {
    pub fn new(name: impl Into<String>) -> Result<Self, Error> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::EmptyPackage);
        }
        Ok(Self(name))
    }

    /// The synthetic root package, carrying tasks with no associated workspace.
    pub fn root() -> Self {
        Self(ROOT_PACKAGE.to_string())
    }

    pub fn is_root(&self) -> bool {
        self.0 == ROOT_PACKAGE
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<PackageName> for String {
    fn from(value: PackageName) -> Self {
        value.0
    }
}

/// A task name. Never contains [`TASK_DELIMITER`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskName(String);

impl TaskName {
    pub fn new(name: impl Into<String>) -> Result<Self, Error> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::EmptyTask);
        }
        if name.contains(TASK_DELIMITER) {
            return Err(Error::TaskContainsDelimiter(name));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A fully package-qualified task identifier, canonically rendered as
/// `package#task`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId {
    package: PackageName,
    task: TaskName,
}

impl TaskId {
    /// `make(pkg, task)`: rejects empty components.
    pub fn new(package: PackageName, task: TaskName) -> Self {
        Self { package, task }
    }

    pub fn from_parts(package: impl Into<String>, task: impl Into<String>) -> Result<Self, Error> {
        Ok(Self::new(PackageName::new(package)?, TaskName::new(task)?))
    }

    pub fn root_task(task: TaskName) -> Self {
        Self::new(PackageName::root(), task)
    }

    pub fn package(&self) -> &PackageName {
        &self.package
    }

    pub fn task(&self) -> &TaskName {
        &self.task
    }

    pub fn into_parts(self) -> (PackageName, TaskName) {
        (self.package, self.task)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{TASK_DELIMITER}{}", self.package, self.task)
    }
}

impl std::str::FromStr for TaskId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (pkg, task) = s
            .split_once(TASK_DELIMITER)
            .ok_or_else(|| Error::Malformed(s.to_string()))?;
        Self::from_parts(pkg, task)
    }
}

/// `isPackageTask(id) <=> id contains '#'`.
pub fn is_package_task(id: &str) -> bool {
    id.contains(TASK_DELIMITER)
}

/// `split(id)`: a bare id (no `#`) yields `(None, task)`; callers must
/// supply package context themselves in that case.
pub fn split(id: &str) -> Result<(Option<PackageName>, TaskName), Error> {
    match id.split_once(TASK_DELIMITER) {
        Some((pkg, task)) => Ok((Some(PackageName::new(pkg)?), TaskName::new(task)?)),
        None => Ok((None, TaskName::new(id)?)),
    }
}

/// A task reference as registered: either bare (applies wherever resolved)
/// or package-qualified. Kept as a tagged identifier rather than a
/// dynamically-typed map-of-either, per the two-level lookup policy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaskKey {
    Bare(TaskName),
    Qualified(TaskId),
}

impl TaskKey {
    pub fn parse(raw: &str) -> Result<Self, Error> {
        match split(raw)? {
            (Some(package), task) => Ok(Self::Qualified(TaskId::new(package, task))),
            (None, task) => Ok(Self::Bare(task)),
        }
    }

    pub fn task_name(&self) -> &TaskName {
        match self {
            Self::Bare(name) => name,
            Self::Qualified(id) => id.task(),
        }
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bare(name) => write!(f, "{name}"),
            Self::Qualified(id) => write!(f, "{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    use super::*;

    #[test]
    fn make_joins_with_delimiter() {
        let id = TaskId::from_parts("app", "build").unwrap();
        assert_eq!(id.to_string(), "app#build");
    }

    #[test_case("", "build" => Err(Error::EmptyPackage); "empty package")]
    #[test_case("app", "" => Err(Error::EmptyTask); "empty task")]
    fn make_rejects_empty_components(pkg: &str, task: &str) -> Result<String, Error> {
        TaskId::from_parts(pkg, task).map(|id| id.to_string())
    }

    #[test]
    fn task_name_rejects_delimiter() {
        assert!(matches!(
            TaskName::new("a#b"),
            Err(Error::TaskContainsDelimiter(_))
        ));
    }

    #[test_case("app#build" => true; "qualified")]
    #[test_case("build" => false; "bare")]
    fn is_package_task_checks_for_hash(id: &str) -> bool {
        is_package_task(id)
    }

    #[test]
    fn split_bare_yields_no_package() {
        let (pkg, task) = split("build").unwrap();
        assert_eq!(pkg, None);
        assert_eq!(task.as_str(), "build");
    }

    #[test]
    fn split_qualified_yields_package() {
        let (pkg, task) = split("app#build").unwrap();
        assert_eq!(pkg.unwrap().as_str(), "app");
        assert_eq!(task.as_str(), "build");
    }

    #[test]
    fn root_package_literal_is_recognized() {
        assert!(PackageName::root().is_root());
        assert!(!PackageName::new("app").unwrap().is_root());
    }

    #[test]
    fn task_key_parse_distinguishes_bare_and_qualified() {
        assert_eq!(
            TaskKey::parse("build").unwrap(),
            TaskKey::Bare(TaskName::new("build").unwrap())
        );
        assert_eq!(
            TaskKey::parse("app#build").unwrap(),
            TaskKey::Qualified(TaskId::from_parts("app", "build").unwrap())
        );
    }

    #[test]
    fn task_id_from_str_round_trips_display() {
        let id: TaskId = "app#build".parse().unwrap();
        assert_eq!(id.to_string(), "app#build");
    }
}
