//! Shared resolution state.
//!
//! One [`ResolutionContext`] is created per invocation and threaded by
//! mutable reference through both resolvers and the replay formatter. Fields
//! are set monotonically: each processed argument and each target coordinate
//! is written exactly once and never cleared for the rest of the run.

use anyhow::{bail, Result};

use crate::cli::Cli;
use crate::errors::ResolveError;

/// Raw user input, captured once from CLI parsing and read-only afterward.
#[derive(Debug, Clone, Default)]
pub struct RawArgs {
    pub cluster: Option<String>,
    pub service: Option<String>,
    pub container: Option<String>,
    pub db_host: Option<String>,
    pub db_host_from_container_env: Option<String>,
    pub port: Option<u16>,
    pub local_port: Option<u16>,
    pub verbose: bool,
    pub profile: Option<String>,
    pub region: Option<String>,
}

impl From<&Cli> for RawArgs {
    fn from(cli: &Cli) -> Self {
        Self {
            cluster: cli.cluster.clone(),
            service: cli.service.clone(),
            container: cli.container.clone(),
            db_host: cli.db_host.clone(),
            db_host_from_container_env: cli.db_host_from_container_env.clone(),
            port: cli.port,
            local_port: cli.local_port,
            verbose: cli.verbose,
            profile: cli.profile.clone(),
            region: cli.region.clone(),
        }
    }
}

/// The replayable CLI argument names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKey {
    Cluster,
    Service,
    Container,
    DbHost,
    DbHostFromContainerEnv,
    Port,
    LocalPort,
    Profile,
    Region,
}

impl ArgKey {
    /// The flag spelling used on the command line.
    pub fn as_flag(self) -> &'static str {
        match self {
            ArgKey::Cluster => "--cluster",
            ArgKey::Service => "--service",
            ArgKey::Container => "--container",
            ArgKey::DbHost => "--db-host",
            ArgKey::DbHostFromContainerEnv => "--db-host-from-container-env",
            ArgKey::Port => "--port",
            ArgKey::LocalPort => "--local-port",
            ArgKey::Profile => "--profile",
            ArgKey::Region => "--region",
        }
    }
}

/// A resolved argument value.
///
/// `skippable` is true exactly when the value was the only viable choice (or
/// the user deliberately left it unset), so it can be omitted when the
/// invocation is replayed. Values typed by the user or picked from multiple
/// candidates are not skippable.
#[derive(Debug, Clone)]
pub struct ProcessedArg {
    pub value: Option<String>,
    pub skippable: bool,
}

/// Insertion-ordered map of resolved arguments, insert-once per key.
#[derive(Debug, Default)]
pub struct ProcessedArgs {
    entries: Vec<(ArgKey, ProcessedArg)>,
}

impl ProcessedArgs {
    /// Records a resolved argument. Writing the same key twice is a
    /// programming error: each entry is final for the run.
    pub fn insert(&mut self, key: ArgKey, value: Option<String>, skippable: bool) -> Result<()> {
        if self.entries.iter().any(|(k, _)| *k == key) {
            bail!(
                "internal contract violation: argument '{}' was resolved twice",
                key.as_flag()
            );
        }
        self.entries.push((key, ProcessedArg { value, skippable }));
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &(ArgKey, ProcessedArg)> {
        self.entries.iter()
    }

    #[cfg(test)]
    pub fn get(&self, key: ArgKey) -> Option<&ProcessedArg> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }
}

/// Target coordinates, set incrementally by the target resolver stages.
#[derive(Debug, Default)]
pub struct TargetState {
    pub cluster: Option<String>,
    pub service: Option<String>,
    pub task_id: Option<String>,
    pub task_definition_arn: Option<String>,
    pub container_name: Option<String>,
    pub container_runtime_id: Option<String>,
}

impl TargetState {
    /// Composes the SSM target string `ecs:<cluster>_<taskId>_<runtimeId>`.
    ///
    /// All three coordinates must already be resolved; asking earlier is a
    /// contract violation and the error names the first missing piece.
    pub fn descriptor(&self) -> Result<String> {
        let cluster = self
            .cluster
            .as_deref()
            .ok_or(ResolveError::MissingPrerequisite("cluster"))?;
        let task_id = self
            .task_id
            .as_deref()
            .ok_or(ResolveError::MissingPrerequisite("task id"))?;
        let runtime_id = self
            .container_runtime_id
            .as_deref()
            .ok_or(ResolveError::MissingPrerequisite("container runtime id"))?;
        Ok(format!("ecs:{cluster}_{task_id}_{runtime_id}"))
    }
}

/// Shared state for one resolution run.
#[derive(Debug, Default)]
pub struct ResolutionContext {
    pub raw: RawArgs,
    pub processed: ProcessedArgs,
    pub target: TargetState,
}

impl ResolutionContext {
    pub fn new(raw: RawArgs) -> Self {
        Self {
            raw,
            ..Self::default()
        }
    }
}
