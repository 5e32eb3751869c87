//! AWS ECS inventory integration module.
//!
//! This module wraps the ECS list/describe operations behind a page-level
//! [`Inventory`] trait plus two free functions, [`list_all`] and
//! [`describe_tasks`], that hide pagination and batching from the resolvers.
//! The free functions are deliberately generic over the trait so the
//! continuation-token loop and the batch partitioning can be exercised
//! against a fake in tests.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_ecs::types::{DesiredStatus, TaskField};
use aws_sdk_ecs::Client;

use crate::errors::ResolveError;

/// DescribeTasks accepts at most 100 task ids per request.
pub const DESCRIBE_BATCH_SIZE: usize = 100;

/// One list query against the inventory.
///
/// An explicit tagged variant per list operation; which API call runs is
/// never inferred from the shape of the input.
#[derive(Debug, Clone)]
pub enum ListQuery {
    /// All clusters in the account/region.
    Clusters,
    /// All services in one cluster.
    Services { cluster: String },
    /// RUNNING tasks in one cluster, optionally narrowed to a service.
    RunningTasks {
        cluster: String,
        service: Option<String>,
    },
}

/// One page of list results.
#[derive(Debug, Clone)]
pub struct Page {
    pub items: Vec<String>,
    pub next_token: Option<String>,
}

/// Result of one DescribeTasks batch, failures included.
#[derive(Debug, Clone, Default)]
pub struct BatchDescribe {
    pub tasks: Vec<TaskDescription>,
    pub failures: Vec<String>,
}

/// A described ECS task, reduced to the fields the resolvers need.
#[derive(Debug, Clone, Default)]
pub struct TaskDescription {
    /// Full ARN of the task
    pub task_arn: String,
    /// Short task ID (last segment of ARN)
    pub task_id: String,
    /// Task definition ARN the task was launched from
    pub task_definition_arn: String,
    /// Value of the task's `Name` tag, if tagged
    pub name_tag: Option<String>,
    /// Containers running in the task
    pub containers: Vec<ContainerInfo>,
    /// Per-container environment overrides applied at launch
    pub env_overrides: HashMap<String, Vec<(String, String)>>,
}

/// A container within a described task.
#[derive(Debug, Clone)]
pub struct ContainerInfo {
    /// Configured container name
    pub name: String,
    /// Runtime id of the execution instance; absent while provisioning
    pub runtime_id: Option<String>,
    /// Image the container runs
    pub image: Option<String>,
}

/// Static environment per container name, from a task definition.
pub type TaskDefinitionEnv = HashMap<String, Vec<(String, String)>>;

/// Page-level access to the remote inventory.
#[async_trait]
pub trait Inventory {
    /// Fetches one page of a list query, forwarding the continuation token.
    async fn list_page(&self, query: &ListQuery, token: Option<String>) -> Result<Page>;

    /// Describes one batch of tasks within a cluster. The batch is at most
    /// [`DESCRIBE_BATCH_SIZE`] ids; callers go through [`describe_tasks`].
    async fn describe_tasks_batch(&self, cluster: &str, ids: &[String]) -> Result<BatchDescribe>;

    /// Fetches the static container environments of a task definition.
    async fn describe_task_definition(&self, arn: &str) -> Result<TaskDefinitionEnv>;
}

/// Extracts the short name from an ARN, e.g. the cluster name or task id.
pub fn short_name(arn: &str) -> &str {
    arn.split('/').next_back().unwrap_or(arn)
}

/// Lists every item matching `query`, following continuation tokens until
/// the inventory stops returning one. Pages are fetched strictly in order
/// and items keep page order.
pub async fn list_all<I: Inventory + ?Sized>(inv: &I, query: &ListQuery) -> Result<Vec<String>> {
    let mut items = Vec::new();
    let mut token = None;

    loop {
        let page = inv.list_page(query, token).await?;
        items.extend(page.items);
        match page.next_token {
            Some(next) => token = Some(next),
            None => break,
        }
    }

    Ok(items)
}

/// Describes `ids` within `cluster`, partitioned into `batch_size` chunks
/// issued one at a time, concatenating results in batch order.
///
/// Fails on per-identifier failures (carrying the raw API detail) and when a
/// non-empty input produces zero described tasks; both mean the inventory
/// drifted underneath us and retrying the same call would not help.
pub async fn describe_tasks<I: Inventory + ?Sized>(
    inv: &I,
    cluster: &str,
    ids: &[String],
    batch_size: usize,
) -> Result<Vec<TaskDescription>> {
    let mut tasks = Vec::new();

    for chunk in ids.chunks(batch_size) {
        let batch = inv.describe_tasks_batch(cluster, chunk).await?;
        if !batch.failures.is_empty() {
            return Err(ResolveError::DescribeFailures(batch.failures.join("; ")).into());
        }
        tasks.extend(batch.tasks);
    }

    if !ids.is_empty() && tasks.is_empty() {
        let short_ids: Vec<&str> = ids.iter().map(|id| short_name(id)).collect();
        return Err(ResolveError::TaskNotFound(short_ids.join(", ")).into());
    }

    Ok(tasks)
}

/// Client for interacting with AWS ECS.
///
/// Wraps the AWS SDK client and implements [`Inventory`] one page or batch
/// at a time.
pub struct EcsClient {
    /// AWS ECS SDK client
    client: Client,
}

impl EcsClient {
    /// Creates a new ECS client with optional region and profile configuration.
    ///
    /// # Errors
    /// This function will return an error if:
    /// - AWS credentials cannot be resolved
    /// - The specified profile doesn't exist
    /// - The specified region is invalid
    pub async fn new(region: Option<String>, profile: Option<String>) -> Result<Self> {
        let mut config_loader = aws_config::from_env();

        // Set region if provided
        if let Some(region_str) = region {
            config_loader = config_loader.region(aws_config::Region::new(region_str));
        }

        // Set profile if provided
        if let Some(profile_name) = profile {
            config_loader = config_loader.profile_name(profile_name);
        }

        let config = config_loader.load().await;
        let client = Client::new(&config);
        Ok(Self { client })
    }
}

#[async_trait]
impl Inventory for EcsClient {
    async fn list_page(&self, query: &ListQuery, token: Option<String>) -> Result<Page> {
        match query {
            ListQuery::Clusters => {
                let resp = self
                    .client
                    .list_clusters()
                    .set_next_token(token)
                    .send()
                    .await?;
                Ok(Page {
                    items: resp.cluster_arns().to_vec(),
                    next_token: resp.next_token().map(String::from),
                })
            }
            ListQuery::Services { cluster } => {
                let resp = self
                    .client
                    .list_services()
                    .cluster(cluster)
                    .set_next_token(token)
                    .send()
                    .await?;
                Ok(Page {
                    items: resp.service_arns().to_vec(),
                    next_token: resp.next_token().map(String::from),
                })
            }
            ListQuery::RunningTasks { cluster, service } => {
                let resp = self
                    .client
                    .list_tasks()
                    .cluster(cluster)
                    .set_service_name(service.clone())
                    .desired_status(DesiredStatus::Running)
                    .set_next_token(token)
                    .send()
                    .await?;
                Ok(Page {
                    items: resp.task_arns().to_vec(),
                    next_token: resp.next_token().map(String::from),
                })
            }
        }
    }

    async fn describe_tasks_batch(&self, cluster: &str, ids: &[String]) -> Result<BatchDescribe> {
        let resp = self
            .client
            .describe_tasks()
            .cluster(cluster)
            .set_tasks(Some(ids.to_vec()))
            .include(TaskField::Tags)
            .send()
            .await?;

        let failures = resp
            .failures()
            .iter()
            .map(|f| {
                format!(
                    "{}: {}",
                    f.arn().unwrap_or("unknown"),
                    f.reason().unwrap_or("unknown")
                )
            })
            .collect();

        let tasks = resp
            .tasks()
            .iter()
            .map(|t| {
                let task_arn = t.task_arn().unwrap_or("unknown").to_string();
                let task_id = short_name(&task_arn).to_string();
                let task_definition_arn = t.task_definition_arn().unwrap_or("unknown").to_string();

                let name_tag = t
                    .tags()
                    .iter()
                    .find(|tag| tag.key() == Some("Name"))
                    .and_then(|tag| tag.value())
                    .map(String::from);

                let containers = t
                    .containers()
                    .iter()
                    .map(|c| ContainerInfo {
                        name: c.name().unwrap_or("unknown").to_string(),
                        runtime_id: c.runtime_id().map(String::from),
                        image: c.image().map(String::from),
                    })
                    .collect();

                let mut env_overrides = HashMap::new();
                if let Some(overrides) = t.overrides() {
                    for co in overrides.container_overrides() {
                        let name = co.name().unwrap_or("unknown").to_string();
                        let pairs = co
                            .environment()
                            .iter()
                            .filter_map(|kv| match (kv.name(), kv.value()) {
                                (Some(k), Some(v)) => Some((k.to_string(), v.to_string())),
                                _ => None,
                            })
                            .collect();
                        env_overrides.insert(name, pairs);
                    }
                }

                TaskDescription {
                    task_arn,
                    task_id,
                    task_definition_arn,
                    name_tag,
                    containers,
                    env_overrides,
                }
            })
            .collect();

        Ok(BatchDescribe { tasks, failures })
    }

    async fn describe_task_definition(&self, arn: &str) -> Result<TaskDefinitionEnv> {
        let resp = self
            .client
            .describe_task_definition()
            .task_definition(arn)
            .send()
            .await?;

        let mut env = HashMap::new();
        if let Some(task_definition) = resp.task_definition() {
            for container_def in task_definition.container_definitions() {
                let name = container_def.name().unwrap_or("unknown").to_string();
                let pairs = container_def
                    .environment()
                    .iter()
                    .filter_map(|kv| match (kv.name(), kv.value()) {
                        (Some(k), Some(v)) => Some((k.to_string(), v.to_string())),
                        _ => None,
                    })
                    .collect();
                env.insert(name, pairs);
            }
        }

        Ok(env)
    }
}
