//! Replay formatting: renders the resolved arguments back into a repeatable
//! command line, so the next invocation can skip the interactive steps.

use anyhow::Result;

use crate::context::ProcessedArgs;
use crate::errors::ResolveError;

/// Which resolved arguments to include in the replay line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayMode {
    /// Every resolved argument with a value.
    Full,
    /// Only the arguments that cannot be inferred again: skippable entries
    /// are omitted.
    OnlyRequired,
}

/// Renders `--key value` tokens in resolution order.
///
/// Fails if nothing has been resolved yet; the resolvers must run first.
pub fn format_cli_args(processed: &ProcessedArgs, mode: ReplayMode) -> Result<Vec<String>> {
    if processed.is_empty() {
        return Err(ResolveError::NothingResolved.into());
    }

    let mut tokens = Vec::new();
    for (key, arg) in processed.iter() {
        if mode == ReplayMode::OnlyRequired && arg.skippable {
            continue;
        }
        if let Some(value) = &arg.value {
            tokens.push(format!("{} {}", key.as_flag(), value));
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ArgKey;

    fn resolved_args() -> ProcessedArgs {
        let mut args = ProcessedArgs::default();
        args.insert(ArgKey::Cluster, Some("prod".to_string()), true)
            .unwrap();
        args.insert(ArgKey::Service, None, true).unwrap();
        args.insert(ArgKey::Container, Some("app".to_string()), false)
            .unwrap();
        args.insert(ArgKey::Port, Some("5432".to_string()), false)
            .unwrap();
        args
    }

    #[test]
    fn test_empty_args_fail() {
        let err = format_cli_args(&ProcessedArgs::default(), ReplayMode::Full).unwrap_err();
        assert_eq!(
            *err.downcast_ref::<ResolveError>().unwrap(),
            ResolveError::NothingResolved
        );
    }

    #[test]
    fn test_full_renders_defined_values_in_order() {
        let tokens = format_cli_args(&resolved_args(), ReplayMode::Full).unwrap();
        assert_eq!(
            tokens,
            vec!["--cluster prod", "--container app", "--port 5432"]
        );
    }

    #[test]
    fn test_only_required_omits_skippable() {
        let tokens = format_cli_args(&resolved_args(), ReplayMode::OnlyRequired).unwrap();
        assert_eq!(tokens, vec!["--container app", "--port 5432"]);
    }

    #[test]
    fn test_only_required_is_subset_of_full() {
        let args = resolved_args();
        let full = format_cli_args(&args, ReplayMode::Full).unwrap();
        let required = format_cli_args(&args, ReplayMode::OnlyRequired).unwrap();
        assert!(required.iter().all(|t| full.contains(t)));
        // The difference is exactly the skippable, defined-value entries.
        let omitted: Vec<&String> = full.iter().filter(|t| !required.contains(t)).collect();
        assert_eq!(omitted, vec!["--cluster prod"]);
    }

    #[test]
    fn test_valueless_entry_never_rendered() {
        let mut args = ProcessedArgs::default();
        args.insert(ArgKey::Service, None, true).unwrap();
        // Not empty, so formatting succeeds, but there is nothing to render.
        assert!(format_cli_args(&args, ReplayMode::Full).unwrap().is_empty());
    }
}
