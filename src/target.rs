//! Target resolution: cluster, service, task, container.
//!
//! A forward-only chain of four stages, each narrowing the search space with
//! exact match, fuzzy match, or an interactive pick, and writing its result
//! into the shared [`ResolutionContext`]. An explicit phase enum gates which
//! stage may legally run next; running a stage out of order is a programming
//! error and fails immediately.

use anyhow::{bail, Result};

use crate::aws::{self, ContainerInfo, Inventory, ListQuery, TaskDescription};
use crate::context::{ArgKey, ResolutionContext};
use crate::errors::ResolveError;
use crate::fuzzy::Matcher;
use crate::prompt::Prompter;

/// Progress marker for the target chain. No backward transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetPhase {
    Unstarted,
    ClusterResolved,
    ServiceResolved,
    TaskResolved,
    ContainerResolved,
}

pub struct TargetResolver<'a, I: Inventory + ?Sized, P: Prompter + ?Sized> {
    inventory: &'a I,
    prompter: &'a P,
    matcher: Matcher,
    phase: TargetPhase,
}

impl<'a, I: Inventory + ?Sized, P: Prompter + ?Sized> TargetResolver<'a, I, P> {
    pub fn new(inventory: &'a I, prompter: &'a P) -> Self {
        Self {
            inventory,
            prompter,
            matcher: Matcher::new(),
            phase: TargetPhase::Unstarted,
        }
    }

    pub fn phase(&self) -> TargetPhase {
        self.phase
    }

    fn ensure_phase(&self, expected: TargetPhase) -> Result<()> {
        if self.phase != expected {
            bail!(
                "internal contract violation: stage requires phase {:?}, but resolver is at {:?}",
                expected,
                self.phase
            );
        }
        Ok(())
    }

    /// Runs the four stages in order against the shared context.
    pub async fn resolve(&mut self, ctx: &mut ResolutionContext) -> Result<()> {
        self.resolve_cluster(ctx).await?;
        self.resolve_service(ctx).await?;
        self.resolve_task(ctx).await?;
        self.resolve_container(ctx).await?;
        Ok(())
    }

    /// Stage 1: pick the cluster.
    ///
    /// A `--cluster` hint must match a listed cluster name exactly. Without a
    /// hint, a sole cluster is selected automatically and marked skippable;
    /// multiple clusters require an interactive pick.
    pub async fn resolve_cluster(&mut self, ctx: &mut ResolutionContext) -> Result<()> {
        self.ensure_phase(TargetPhase::Unstarted)?;

        let arns = aws::list_all(self.inventory, &ListQuery::Clusters).await?;
        if arns.is_empty() {
            return Err(ResolveError::NoClustersFound.into());
        }

        let names: Vec<String> = arns
            .iter()
            .map(|arn| aws::short_name(arn).to_string())
            .collect();

        let (selected, skippable) = if let Some(hint) = ctx.raw.cluster.clone() {
            match names.iter().find(|n| **n == hint) {
                Some(name) => (name.clone(), false),
                None => return Err(ResolveError::ClusterNotFound(hint).into()),
            }
        } else if names.len() == 1 {
            (names[0].clone(), true)
        } else {
            let index = self.prompter.select("Select a cluster", &names)?;
            (names[index].clone(), false)
        };

        ctx.processed
            .insert(ArgKey::Cluster, Some(selected.clone()), skippable)?;
        ctx.target.cluster = Some(selected);
        self.phase = TargetPhase::ClusterResolved;
        Ok(())
    }

    /// Stage 2: optionally pin a service.
    ///
    /// Without a hint the stage is skipped silently; the service only exists
    /// to narrow the task search. A hint is matched exactly first, then
    /// fuzzily: a single fuzzy candidate needs confirmation, several need a
    /// pick. Fuzzy-derived selections are never skippable.
    pub async fn resolve_service(&mut self, ctx: &mut ResolutionContext) -> Result<()> {
        self.ensure_phase(TargetPhase::ClusterResolved)?;

        let Some(hint) = ctx.raw.service.clone() else {
            ctx.processed.insert(ArgKey::Service, None, true)?;
            self.phase = TargetPhase::ServiceResolved;
            return Ok(());
        };

        let cluster = ctx
            .target
            .cluster
            .clone()
            .ok_or(ResolveError::MissingPrerequisite("cluster"))?;

        let arns = aws::list_all(
            self.inventory,
            &ListQuery::Services {
                cluster: cluster.clone(),
            },
        )
        .await?;
        if arns.is_empty() {
            return Err(ResolveError::NoServicesFound(cluster).into());
        }

        let names: Vec<String> = arns
            .iter()
            .map(|arn| aws::short_name(arn).to_string())
            .collect();

        let (selected, skippable) = if names.contains(&hint) {
            // Exact match: only incidentally skippable when it was the sole
            // service in the cluster anyway.
            (hint.clone(), names.len() == 1)
        } else {
            let candidates: Vec<String> = self
                .matcher
                .rank(&hint, &names)
                .into_iter()
                .map(String::from)
                .collect();
            match candidates.len() {
                0 => return Err(ResolveError::NoServiceMatch(hint).into()),
                1 => {
                    let candidate = candidates[0].clone();
                    if !self
                        .prompter
                        .confirm(&format!("No service '{hint}'. Use '{candidate}'?"))?
                    {
                        return Err(ResolveError::FuzzyMatchRejected(candidate).into());
                    }
                    (candidate, false)
                }
                _ => {
                    let index = self
                        .prompter
                        .select(&format!("Several services match '{hint}'"), &candidates)?;
                    (candidates[index].clone(), false)
                }
            }
        };

        ctx.processed
            .insert(ArgKey::Service, Some(selected.clone()), skippable)?;
        ctx.target.service = Some(selected);
        self.phase = TargetPhase::ServiceResolved;
        Ok(())
    }

    /// Stage 3: pick the running task.
    ///
    /// All candidates are bulk-described up front for their task-definition
    /// ARNs and annotations. With a service filter the first candidate is
    /// taken (service tasks share a task definition and are interchangeable);
    /// otherwise multiple candidates require an annotated pick.
    pub async fn resolve_task(&mut self, ctx: &mut ResolutionContext) -> Result<()> {
        self.ensure_phase(TargetPhase::ServiceResolved)?;

        let cluster = ctx
            .target
            .cluster
            .clone()
            .ok_or(ResolveError::MissingPrerequisite("cluster"))?;
        let service = ctx.target.service.clone();

        let arns = aws::list_all(
            self.inventory,
            &ListQuery::RunningTasks {
                cluster: cluster.clone(),
                service: service.clone(),
            },
        )
        .await?;
        if arns.is_empty() {
            return Err(ResolveError::NoRunningTasks { cluster, service }.into());
        }

        let described =
            aws::describe_tasks(self.inventory, &cluster, &arns, aws::DESCRIBE_BATCH_SIZE).await?;

        let selected = if described.len() == 1 || service.is_some() {
            &described[0]
        } else {
            let labels: Vec<String> = described.iter().map(task_label).collect();
            let index = self.prompter.select("Select a task", &labels)?;
            &described[index]
        };

        ctx.target.task_id = Some(selected.task_id.clone());
        ctx.target.task_definition_arn = Some(selected.task_definition_arn.clone());
        self.phase = TargetPhase::TaskResolved;
        Ok(())
    }

    /// Stage 4: pick the container and capture its runtime id.
    ///
    /// The selected task is described afresh; the stage-3 results are not
    /// reused since the candidate list may have been large and only this one
    /// task matters now. A vanished task surfaces as drift, not as an empty
    /// list.
    pub async fn resolve_container(&mut self, ctx: &mut ResolutionContext) -> Result<()> {
        self.ensure_phase(TargetPhase::TaskResolved)?;

        let cluster = ctx
            .target
            .cluster
            .clone()
            .ok_or(ResolveError::MissingPrerequisite("cluster"))?;
        let task_id = ctx
            .target
            .task_id
            .clone()
            .ok_or(ResolveError::MissingPrerequisite("task id"))?;

        let described = aws::describe_tasks(
            self.inventory,
            &cluster,
            std::slice::from_ref(&task_id),
            aws::DESCRIBE_BATCH_SIZE,
        )
        .await?;
        let task = &described[0];

        if task.containers.is_empty() {
            return Err(ResolveError::NoContainersInTask(task_id).into());
        }

        let (container, skippable) = if let Some(hint) = ctx.raw.container.clone() {
            match task.containers.iter().find(|c| c.name == hint) {
                Some(container) => (container, false),
                None => return Err(ResolveError::ContainerNotFound(hint).into()),
            }
        } else if task.containers.len() == 1 {
            (&task.containers[0], true)
        } else {
            let labels: Vec<String> = task.containers.iter().map(container_label).collect();
            let index = self.prompter.select("Select a container", &labels)?;
            (&task.containers[index], false)
        };

        let runtime_id = container
            .runtime_id
            .clone()
            .ok_or_else(|| ResolveError::MissingRuntimeId(container.name.clone()))?;

        ctx.processed
            .insert(ArgKey::Container, Some(container.name.clone()), skippable)?;
        ctx.target.container_name = Some(container.name.clone());
        ctx.target.container_runtime_id = Some(runtime_id);
        self.phase = TargetPhase::ContainerResolved;
        Ok(())
    }
}

/// Annotation line for one task candidate: Name tag, task-definition family
/// and the containers it runs.
fn task_label(task: &TaskDescription) -> String {
    let name = task.name_tag.as_deref().unwrap_or("-");
    let containers: Vec<String> = task.containers.iter().map(container_label).collect();
    format!(
        "{} [{}] {} :: {}",
        task.task_id,
        name,
        aws::short_name(&task.task_definition_arn),
        containers.join(", ")
    )
}

fn container_label(container: &ContainerInfo) -> String {
    format!(
        "{} ({})",
        container.name,
        container.image.as_deref().unwrap_or("no image")
    )
}
