//! Error taxonomy for the resolution pipeline.
//!
//! Every failure in the pipeline is fatal for the run; there are no retries.
//! The one exception is [`ResolveError::Cancelled`], raised when the user
//! aborts a prompt, which callers treat as a graceful exit rather than an
//! error. Variants are wrapped into `anyhow::Error` at call sites and
//! downcast again in `main` for exit-code mapping.

use thiserror::Error;

/// Failures produced by the resolution pipeline.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// The account/region has no ECS clusters at all.
    #[error("no ECS clusters found in this account/region")]
    NoClustersFound,

    /// A --cluster hint was supplied but matched no listed cluster.
    #[error("cluster '{0}' not found among the clusters in this region")]
    ClusterNotFound(String),

    /// The resolved cluster contains no services.
    #[error("no services found in cluster '{0}'")]
    NoServicesFound(String),

    /// A --service hint matched nothing, exactly or fuzzily.
    #[error("no service matching '{0}' found in cluster")]
    NoServiceMatch(String),

    /// A single fuzzy service candidate was proposed and the user declined it.
    #[error("fuzzy match '{0}' was rejected; re-run with an exact --service name")]
    FuzzyMatchRejected(String),

    /// No RUNNING tasks in the cluster (with the service filter, if any).
    #[error("no running tasks found in cluster '{cluster}'{}", match .service {
        Some(s) => format!(" for service '{s}'"),
        None => String::new(),
    })]
    NoRunningTasks {
        cluster: String,
        service: Option<String>,
    },

    /// Describe returned nothing for a task we just listed: the task vanished
    /// between stages (stopped or evicted). Distinct from an empty list.
    #[error("task(s) [{0}] no longer exist in the cluster; they may have stopped mid-resolution")]
    TaskNotFound(String),

    /// Describe reported per-identifier failures. Carries the raw API detail.
    #[error("describe-tasks reported failures: {0}")]
    DescribeFailures(String),

    /// The selected task has an empty container list.
    #[error("task '{0}' has no containers")]
    NoContainersInTask(String),

    /// A --container hint was supplied but the task has no such container.
    #[error("container '{0}' not found in the selected task")]
    ContainerNotFound(String),

    /// The selected container has no runtime id, so it cannot be targeted.
    #[error("container '{0}' has no runtime id; is it still provisioning?")]
    MissingRuntimeId(String),

    /// --db-host-from-container-env named a variable absent from the
    /// effective container environment.
    #[error("environment variable '{0}' not found in the container environment")]
    EnvVarMissing(String),

    /// Local-port resolution ran before remote-port resolution finished.
    #[error("remote port must be resolved before the local port")]
    RemotePortNotSet,

    /// A stage or accessor ran before a prerequisite field was set. This is a
    /// programming-contract violation, not a data condition.
    #[error("internal contract violation: '{0}' has not been resolved yet")]
    MissingPrerequisite(&'static str),

    /// Replay formatting requested before any argument was resolved.
    #[error("no arguments have been resolved yet; run the resolvers first")]
    NothingResolved,

    /// The user aborted an interactive prompt. Graceful outcome, not a fault.
    #[error("cancelled by user")]
    Cancelled,
}
