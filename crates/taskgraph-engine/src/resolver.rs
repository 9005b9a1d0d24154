//! Splits a raw CLI-style argument vector into task targets and a
//! pass-through suffix, independent of any particular flag parser.

use taskgraph_id::{TaskId, TaskName};

use crate::Error;

/// The result of [`resolve_targets`]: the targets requested, in the order
/// given, and everything after a literal `--`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvedArgs {
    pub targets: Vec<String>,
    pub passthrough: Vec<String>,
}

/// Splits `args` on the first literal `--`, takes the maximal leading run of
/// non-flag tokens from the pre-args as candidate targets (trailing flags are
/// ignored), and validates each candidate against `registered` (bare task
/// names or `pkg#task` identifiers already known to the caller).
///
/// An absent `--` leaves `passthrough` empty; a present-but-empty suffix
/// leaves it empty too. Both are represented the same way, since an empty
/// vector already distinguishes "no passthrough" from "some passthrough"
/// correctly for callers that only check length.
pub fn resolve_targets(args: &[String], registered: &[TaskName]) -> Result<ResolvedArgs, Error> {
    let (pre_args, passthrough) = match args.iter().position(|a| a == "--") {
        Some(idx) => (&args[..idx], args[idx + 1..].to_vec()),
        None => (&args[..], Vec::new()),
    };

    let targets: Vec<String> = pre_args
        .iter()
        .take_while(|a| !a.starts_with('-'))
        .cloned()
        .collect();

    for target in &targets {
        if !is_registered(target, registered) {
            return Err(Error::UnknownTarget {
                target: target.clone(),
            });
        }
    }

    Ok(ResolvedArgs {
        targets,
        passthrough,
    })
}

fn is_registered(target: &str, registered: &[TaskName]) -> bool {
    if taskgraph_id::is_package_task(target) {
        return target
            .parse::<TaskId>()
            .map(|id| registered.contains(id.task()))
            .unwrap_or(false);
    }
    TaskName::new(target)
        .map(|name| registered.contains(&name))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn names(names: &[&str]) -> Vec<TaskName> {
        names.iter().map(|n| TaskName::new(*n).unwrap()).collect()
    }

    fn args(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    /// S6: argument split.
    #[test]
    fn splits_targets_flags_and_passthrough() {
        let resolved = resolve_targets(
            &args(&["build", "test", "--foo", "--", "--boop", "zoop"]),
            &names(&["build", "test"]),
        )
        .unwrap();

        assert_eq!(resolved.targets, vec!["build", "test"]);
        assert_eq!(resolved.passthrough, vec!["--boop", "zoop"]);
    }

    #[test]
    fn absent_separator_yields_empty_passthrough() {
        let resolved = resolve_targets(&args(&["build"]), &names(&["build"])).unwrap();
        assert!(resolved.passthrough.is_empty());
    }

    #[test]
    fn separator_with_empty_suffix_yields_empty_passthrough() {
        let resolved = resolve_targets(&args(&["build", "--"]), &names(&["build"])).unwrap();
        assert!(resolved.passthrough.is_empty());
    }

    #[test]
    fn unknown_target_fails() {
        let err = resolve_targets(&args(&["nope"]), &names(&["build"])).unwrap_err();
        assert!(matches!(err, Error::UnknownTarget { target } if target == "nope"));
    }

    #[test]
    fn qualified_target_checks_task_component() {
        let resolved =
            resolve_targets(&args(&["app#build"]), &names(&["build"])).unwrap();
        assert_eq!(resolved.targets, vec!["app#build"]);
    }

    #[test]
    fn duplicates_are_preserved() {
        let resolved =
            resolve_targets(&args(&["build", "build"]), &names(&["build"])).unwrap();
        assert_eq!(resolved.targets, vec!["build", "build"]);
    }
}
