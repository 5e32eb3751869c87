//! Forwarding-parameter resolution: database host, remote port, local port.
//!
//! Three stages with one ordering constraint: the local port can only offer
//! "same as remote" once the remote port is known. The host stage may read
//! the effective container environment, which overlays the task-definition
//! static variables with the task's per-container overrides (overrides win).

use anyhow::Result;
use serde_json::json;

use crate::aws::{self, Inventory};
use crate::context::{ArgKey, ResolutionContext};
use crate::errors::ResolveError;
use crate::fuzzy::Matcher;
use crate::prompt::Prompter;
use crate::status::print_info;

/// Well-known database ports offered when no --port was given.
const KNOWN_PORTS: &[(&str, u16)] = &[
    ("MySQL / MariaDB", 3306),
    ("PostgreSQL / Aurora", 5432),
    ("MongoDB / DocumentDB", 27017),
    ("Redshift", 5439),
];

pub struct ForwardingResolver<'a, I: Inventory + ?Sized, P: Prompter + ?Sized> {
    inventory: &'a I,
    prompter: &'a P,
    matcher: Matcher,
    host: Option<String>,
    remote_port: Option<u16>,
    local_port: Option<u16>,
}

impl<'a, I: Inventory + ?Sized, P: Prompter + ?Sized> ForwardingResolver<'a, I, P> {
    pub fn new(inventory: &'a I, prompter: &'a P) -> Self {
        Self {
            inventory,
            prompter,
            matcher: Matcher::new(),
            host: None,
            remote_port: None,
            local_port: None,
        }
    }

    /// Runs the three stages in order against the shared context.
    pub async fn resolve(&mut self, ctx: &mut ResolutionContext) -> Result<()> {
        self.resolve_host(ctx).await?;
        self.resolve_remote_port(ctx)?;
        self.resolve_local_port(ctx)?;
        Ok(())
    }

    /// Stage 1: the database host.
    ///
    /// Priority: explicit --db-host, then an env-variable name via
    /// --db-host-from-container-env, then an interactive environment search
    /// (variables ranked by similarity to "HOST"), then free-text input.
    pub async fn resolve_host(&mut self, ctx: &mut ResolutionContext) -> Result<()> {
        if let Some(host) = ctx.raw.db_host.clone() {
            ctx.processed
                .insert(ArgKey::DbHost, Some(host.clone()), false)?;
            self.host = Some(host);
            return Ok(());
        }

        if let Some(var) = ctx.raw.db_host_from_container_env.clone() {
            let env = self.effective_container_env(ctx).await?;
            let value = env
                .iter()
                .find(|(name, _)| *name == var)
                .map(|(_, value)| value.clone())
                .ok_or_else(|| ResolveError::EnvVarMissing(var.clone()))?;
            ctx.processed
                .insert(ArgKey::DbHostFromContainerEnv, Some(var), false)?;
            self.host = Some(value);
            return Ok(());
        }

        if self
            .prompter
            .confirm("Search the container environment for the database host?")?
        {
            let env = self.effective_container_env(ctx).await?;
            if env.is_empty() {
                print_info("The container environment is empty.");
            } else {
                let names: Vec<String> = env.iter().map(|(name, _)| name.clone()).collect();
                let ordered: Vec<String> = self
                    .matcher
                    .order_all("HOST", &names)
                    .into_iter()
                    .map(String::from)
                    .collect();
                let index = self
                    .prompter
                    .select("Select the variable holding the host", &ordered)?;
                let var = ordered[index].clone();
                let value = env
                    .iter()
                    .find(|(name, _)| *name == var)
                    .map(|(_, value)| value.clone())
                    .ok_or_else(|| ResolveError::EnvVarMissing(var.clone()))?;
                ctx.processed
                    .insert(ArgKey::DbHostFromContainerEnv, Some(var), false)?;
                self.host = Some(value);
                return Ok(());
            }
        }

        let host = self.prompter.input("Database host")?;
        ctx.processed
            .insert(ArgKey::DbHost, Some(host.clone()), false)?;
        self.host = Some(host);
        Ok(())
    }

    /// Stage 2: the remote port. Explicit value wins; otherwise a menu of
    /// well-known database ports plus a custom numeric input.
    pub fn resolve_remote_port(&mut self, ctx: &mut ResolutionContext) -> Result<()> {
        let port = match ctx.raw.port {
            Some(port) => port,
            None => {
                let mut labels: Vec<String> = KNOWN_PORTS
                    .iter()
                    .map(|(name, port)| format!("{name} ({port})"))
                    .collect();
                labels.push("Custom".to_string());
                let index = self.prompter.select("Select the database port", &labels)?;
                match KNOWN_PORTS.get(index) {
                    Some((_, port)) => *port,
                    None => self.prompter.port("Remote port")?,
                }
            }
        };

        ctx.processed
            .insert(ArgKey::Port, Some(port.to_string()), false)?;
        self.remote_port = Some(port);
        Ok(())
    }

    /// Stage 3: the local port. Explicit value wins; otherwise offers the
    /// already-resolved remote port, falling back to numeric input.
    pub fn resolve_local_port(&mut self, ctx: &mut ResolutionContext) -> Result<()> {
        let port = match ctx.raw.local_port {
            Some(port) => port,
            None => {
                let remote = self.remote_port.ok_or(ResolveError::RemotePortNotSet)?;
                if self
                    .prompter
                    .confirm(&format!("Use {remote} as the local port too?"))?
                {
                    remote
                } else {
                    self.prompter.port("Local port")?
                }
            }
        };

        ctx.processed
            .insert(ArgKey::LocalPort, Some(port.to_string()), false)?;
        self.local_port = Some(port);
        Ok(())
    }

    /// The static task-definition environment of the resolved container,
    /// overlaid with that task's container-level overrides.
    ///
    /// Requires cluster, container name, task definition and task id to be
    /// resolved already; fails naming whichever is missing.
    async fn effective_container_env(
        &self,
        ctx: &ResolutionContext,
    ) -> Result<Vec<(String, String)>> {
        let cluster = ctx
            .target
            .cluster
            .as_deref()
            .ok_or(ResolveError::MissingPrerequisite("cluster"))?;
        let container = ctx
            .target
            .container_name
            .as_deref()
            .ok_or(ResolveError::MissingPrerequisite("container name"))?;
        let task_definition_arn = ctx
            .target
            .task_definition_arn
            .as_deref()
            .ok_or(ResolveError::MissingPrerequisite("task definition arn"))?;
        let task_id = ctx
            .target
            .task_id
            .clone()
            .ok_or(ResolveError::MissingPrerequisite("task id"))?;

        let mut env = self
            .inventory
            .describe_task_definition(task_definition_arn)
            .await?
            .remove(container)
            .unwrap_or_default();

        let described = aws::describe_tasks(
            self.inventory,
            cluster,
            std::slice::from_ref(&task_id),
            aws::DESCRIBE_BATCH_SIZE,
        )
        .await?;

        if let Some(overrides) = described[0].env_overrides.get(container) {
            for (name, value) in overrides {
                match env.iter_mut().find(|(n, _)| n == name) {
                    Some(entry) => entry.1 = value.clone(),
                    None => env.push((name.clone(), value.clone())),
                }
            }
        }

        Ok(env)
    }

    /// The session-document parameter payload, serialized as JSON with each
    /// field a single-element string array (the wire format the forwarding
    /// document expects). Fails naming the first unresolved field.
    pub fn payload(&self) -> Result<String> {
        let host = self
            .host
            .as_deref()
            .ok_or(ResolveError::MissingPrerequisite("db host"))?;
        let remote_port = self
            .remote_port
            .ok_or(ResolveError::MissingPrerequisite("remote port"))?;
        let local_port = self
            .local_port
            .ok_or(ResolveError::MissingPrerequisite("local port"))?;

        Ok(json!({
            "host": [host],
            "portNumber": [remote_port.to_string()],
            "localPortNumber": [local_port.to_string()],
        })
        .to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::aws::fake::FakeInventory;
    use crate::aws::TaskDescription;
    use crate::context::RawArgs;
    use crate::prompt::scripted::{Action, ScriptedPrompter};

    /// Context as the target resolver leaves it for these tests.
    fn resolved_target(raw: RawArgs) -> ResolutionContext {
        let mut ctx = ResolutionContext::new(raw);
        ctx.target.cluster = Some("prod".to_string());
        ctx.target.task_id = Some("abc123".to_string());
        ctx.target.task_definition_arn =
            Some("arn:aws:ecs:eu-west-1:1234:task-definition/app:3".to_string());
        ctx.target.container_name = Some("app".to_string());
        ctx.target.container_runtime_id = Some("rt-1".to_string());
        ctx
    }

    fn inventory_with_env(
        static_env: &[(&str, &str)],
        overrides: &[(&str, &str)],
    ) -> FakeInventory {
        let mut env_overrides = HashMap::new();
        env_overrides.insert(
            "app".to_string(),
            overrides
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect::<Vec<_>>(),
        );
        let description = TaskDescription {
            task_arn: "arn:aws:ecs:eu-west-1:1234:task/prod/abc123".to_string(),
            task_id: "abc123".to_string(),
            env_overrides,
            ..TaskDescription::default()
        };
        let mut task_def_env = HashMap::new();
        task_def_env.insert(
            "app".to_string(),
            static_env
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect::<Vec<_>>(),
        );
        FakeInventory {
            descriptions: HashMap::from([("abc123".to_string(), description)]),
            task_def_env,
            ..FakeInventory::default()
        }
    }

    #[tokio::test]
    async fn test_explicit_host_accepted_verbatim() {
        let inv = FakeInventory::default();
        let prompter = ScriptedPrompter::default();
        let mut resolver = ForwardingResolver::new(&inv, &prompter);
        let mut ctx = resolved_target(RawArgs {
            db_host: Some("db.internal".to_string()),
            ..RawArgs::default()
        });

        resolver.resolve_host(&mut ctx).await.unwrap();
        assert_eq!(resolver.host.as_deref(), Some("db.internal"));
        assert!(prompter.prompts.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_env_var_hint_override_wins() {
        // Static env DB_HOST=a, task override DB_HOST=b: the override wins.
        let inv = inventory_with_env(&[("DB_HOST", "a")], &[("DB_HOST", "b")]);
        let prompter = ScriptedPrompter::default();
        let mut resolver = ForwardingResolver::new(&inv, &prompter);
        let mut ctx = resolved_target(RawArgs {
            db_host_from_container_env: Some("DB_HOST".to_string()),
            ..RawArgs::default()
        });

        resolver.resolve_host(&mut ctx).await.unwrap();
        assert_eq!(resolver.host.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_env_var_hint_missing_fails() {
        let inv = inventory_with_env(&[("OTHER", "x")], &[]);
        let prompter = ScriptedPrompter::default();
        let mut resolver = ForwardingResolver::new(&inv, &prompter);
        let mut ctx = resolved_target(RawArgs {
            db_host_from_container_env: Some("DB_HOST".to_string()),
            ..RawArgs::default()
        });

        let err = resolver.resolve_host(&mut ctx).await.unwrap_err();
        assert_eq!(
            *err.downcast_ref::<ResolveError>().unwrap(),
            ResolveError::EnvVarMissing("DB_HOST".to_string())
        );
    }

    #[tokio::test]
    async fn test_env_var_hint_without_target_names_missing_piece() {
        let inv = FakeInventory::default();
        let prompter = ScriptedPrompter::default();
        let mut resolver = ForwardingResolver::new(&inv, &prompter);
        let mut ctx = ResolutionContext::new(RawArgs {
            db_host_from_container_env: Some("DB_HOST".to_string()),
            ..RawArgs::default()
        });

        let err = resolver.resolve_host(&mut ctx).await.unwrap_err();
        assert_eq!(
            *err.downcast_ref::<ResolveError>().unwrap(),
            ResolveError::MissingPrerequisite("cluster")
        );
    }

    #[tokio::test]
    async fn test_interactive_env_search_ranks_host_first() {
        let inv = inventory_with_env(
            &[("RAILS_ENV", "production"), ("DB_HOST", "db.internal")],
            &[],
        );
        // Yes to searching the environment, then pick the first entry, which
        // the ranking puts at DB_HOST.
        let prompter = ScriptedPrompter::new([Action::Answer(true), Action::Pick(0)]);
        let mut resolver = ForwardingResolver::new(&inv, &prompter);
        let mut ctx = resolved_target(RawArgs::default());

        resolver.resolve_host(&mut ctx).await.unwrap();
        assert_eq!(resolver.host.as_deref(), Some("db.internal"));
        let arg = ctx.processed.get(ArgKey::DbHostFromContainerEnv).unwrap();
        assert_eq!(arg.value.as_deref(), Some("DB_HOST"));
    }

    #[tokio::test]
    async fn test_empty_env_falls_through_to_free_text() {
        let inv = inventory_with_env(&[], &[]);
        let prompter = ScriptedPrompter::new([
            Action::Answer(true),
            Action::Type("typed.host".to_string()),
        ]);
        let mut resolver = ForwardingResolver::new(&inv, &prompter);
        let mut ctx = resolved_target(RawArgs::default());

        resolver.resolve_host(&mut ctx).await.unwrap();
        assert_eq!(resolver.host.as_deref(), Some("typed.host"));
    }

    #[tokio::test]
    async fn test_declined_env_search_prompts_free_text() {
        let inv = FakeInventory::default();
        let prompter = ScriptedPrompter::new([
            Action::Answer(false),
            Action::Type("typed.host".to_string()),
        ]);
        let mut resolver = ForwardingResolver::new(&inv, &prompter);
        let mut ctx = resolved_target(RawArgs::default());

        resolver.resolve_host(&mut ctx).await.unwrap();
        assert_eq!(resolver.host.as_deref(), Some("typed.host"));
        assert_eq!(
            ctx.processed.get(ArgKey::DbHost).unwrap().value.as_deref(),
            Some("typed.host")
        );
    }

    #[tokio::test]
    async fn test_known_port_menu_selection() {
        let inv = FakeInventory::default();
        let prompter = ScriptedPrompter::new([Action::Pick(1)]);
        let mut resolver = ForwardingResolver::new(&inv, &prompter);
        let mut ctx = resolved_target(RawArgs::default());

        resolver.resolve_remote_port(&mut ctx).unwrap();
        assert_eq!(resolver.remote_port, Some(5432));
    }

    #[tokio::test]
    async fn test_cancelled_port_menu_is_graceful() {
        let inv = FakeInventory::default();
        let prompter = ScriptedPrompter::new([Action::Cancel]);
        let mut resolver = ForwardingResolver::new(&inv, &prompter);
        let mut ctx = resolved_target(RawArgs::default());

        let err = resolver.resolve_remote_port(&mut ctx).unwrap_err();
        assert_eq!(
            *err.downcast_ref::<ResolveError>().unwrap(),
            ResolveError::Cancelled
        );
        assert!(resolver.remote_port.is_none());
    }

    #[tokio::test]
    async fn test_custom_port_input() {
        let inv = FakeInventory::default();
        let prompter = ScriptedPrompter::new([Action::Pick(4), Action::TypePort(9000)]);
        let mut resolver = ForwardingResolver::new(&inv, &prompter);
        let mut ctx = resolved_target(RawArgs::default());

        resolver.resolve_remote_port(&mut ctx).unwrap();
        assert_eq!(resolver.remote_port, Some(9000));
    }

    #[tokio::test]
    async fn test_local_port_same_as_remote() {
        let inv = FakeInventory::default();
        let prompter = ScriptedPrompter::new([Action::Answer(true)]);
        let mut resolver = ForwardingResolver::new(&inv, &prompter);
        let mut ctx = resolved_target(RawArgs {
            port: Some(5432),
            ..RawArgs::default()
        });

        resolver.resolve_remote_port(&mut ctx).unwrap();
        resolver.resolve_local_port(&mut ctx).unwrap();
        assert_eq!(resolver.local_port, Some(5432));
    }

    #[tokio::test]
    async fn test_local_port_declined_reuse_prompts_numeric() {
        let inv = FakeInventory::default();
        let prompter = ScriptedPrompter::new([Action::Answer(false), Action::TypePort(15432)]);
        let mut resolver = ForwardingResolver::new(&inv, &prompter);
        let mut ctx = resolved_target(RawArgs {
            port: Some(5432),
            ..RawArgs::default()
        });

        resolver.resolve_remote_port(&mut ctx).unwrap();
        resolver.resolve_local_port(&mut ctx).unwrap();
        assert_eq!(resolver.local_port, Some(15432));
    }

    #[tokio::test]
    async fn test_local_port_before_remote_port_fails() {
        let inv = FakeInventory::default();
        let prompter = ScriptedPrompter::default();
        let mut resolver = ForwardingResolver::new(&inv, &prompter);
        let mut ctx = resolved_target(RawArgs::default());

        let err = resolver.resolve_local_port(&mut ctx).unwrap_err();
        assert_eq!(
            *err.downcast_ref::<ResolveError>().unwrap(),
            ResolveError::RemotePortNotSet
        );
    }

    #[tokio::test]
    async fn test_payload_shape_once_resolved() {
        let inv = FakeInventory::default();
        let prompter = ScriptedPrompter::default();
        let mut resolver = ForwardingResolver::new(&inv, &prompter);
        let mut ctx = resolved_target(RawArgs {
            db_host: Some("db.internal".to_string()),
            port: Some(5432),
            local_port: Some(15432),
            ..RawArgs::default()
        });

        resolver.resolve(&mut ctx).await.unwrap();
        let payload: serde_json::Value =
            serde_json::from_str(&resolver.payload().unwrap()).unwrap();
        assert_eq!(payload["host"], serde_json::json!(["db.internal"]));
        assert_eq!(payload["portNumber"], serde_json::json!(["5432"]));
        assert_eq!(payload["localPortNumber"], serde_json::json!(["15432"]));
    }

    #[test]
    fn test_payload_names_first_unresolved_field() {
        let inv = FakeInventory::default();
        let prompter = ScriptedPrompter::default();
        let mut resolver = ForwardingResolver::new(&inv, &prompter);

        let err = resolver.payload().unwrap_err();
        assert!(err.to_string().contains("'db host'"));

        resolver.host = Some("h".to_string());
        let err = resolver.payload().unwrap_err();
        assert!(err.to_string().contains("'remote port'"));

        resolver.remote_port = Some(5432);
        let err = resolver.payload().unwrap_err();
        assert!(err.to_string().contains("'local port'"));
    }
}
