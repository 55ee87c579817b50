// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Instance Supervisor (§4.7): composes the Terminal Transport, Workspace
//! Manager, Version Control Coordinator, and Instance Registry into the
//! spawn/send/read/list/terminate/restart/get_progress/get_branch/
//! merge_branch surface.
//!
//! State machine: `spawning → active ⇌ idle → terminated`,
//! `active → crashed → spawning` via restart.

use crate::error::{EngineError, EngineResult};
use crate::{env, vcc, workspace};
use oj_adapters::{ReliableSender, SendPriority, SessionAdapter};
use oj_core::{
    parse_ordinals, Clock, CoreError, Instance, InstanceId, ProgressRecord, Role, Status,
    WorkspaceMode,
};
use oj_storage::{InstanceFilter, Registry};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Parameters for [`Supervisor::spawn`] (§4.7, mirrors spec `spawn({...})`).
pub struct SpawnRequest {
    pub role: Role,
    pub work_dir: PathBuf,
    pub context: serde_json::Value,
    pub parent_id: Option<InstanceId>,
    pub workspace_mode: Option<WorkspaceMode>,
}

/// Outcome of [`Supervisor::terminate`]: every instance torn down, in the
/// depth-first order they were killed.
#[derive(Debug, Clone, Default)]
pub struct TerminateOutcome {
    pub terminated: Vec<InstanceId>,
}

/// Result of [`Supervisor::restart`]: whether the prior workspace/branch
/// were resumed or a fresh start was required.
#[derive(Debug, Clone)]
pub struct RestartOutcome {
    pub instance_id: InstanceId,
    pub resumed: bool,
}

fn escape_for_shell_double_quotes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '`' => out.push_str("\\`"),
            '$' => out.push_str("\\$"),
            '"' => out.push_str("\\\""),
            _ => out.push(c),
        }
    }
    out
}

fn pane_target(session_name: &str) -> String {
    format!("{session_name}:0.0")
}

pub struct Supervisor<S: SessionAdapter, R: Registry + 'static, C: Clock> {
    session: ReliableSender<S>,
    registry: Arc<R>,
    clock: C,
}

impl<S: SessionAdapter, R: Registry + 'static, C: Clock> Clone for Supervisor<S, R, C> {
    fn clone(&self) -> Self {
        Self { session: self.session.clone(), registry: self.registry.clone(), clock: self.clock.clone() }
    }
}

impl<S: SessionAdapter, R: Registry + 'static, C: Clock> Supervisor<S, R, C> {
    pub fn new(session: S, registry: Arc<R>, clock: C) -> Self {
        Self { session: ReliableSender::new(session), registry, clock }
    }

    fn instance(&self, id: &InstanceId) -> EngineResult<Instance> {
        self.registry
            .get_instance(id)?
            .ok_or_else(|| CoreError::InstanceNotFound(id.as_str().to_string()).into())
    }

    /// Derives the next ordinal for a parent's children by scanning the
    /// registry rather than an in-memory counter, so ids remain stable
    /// across a daemon restart.
    fn next_ordinal(&self, parent_ordinals: &[u64], role: Role, parent_id: Option<&InstanceId>) -> EngineResult<u64> {
        let filter =
            InstanceFilter { role: Some(role), parent_id: parent_id.cloned() };
        let siblings = self.registry.list_instances(&filter)?;
        let max = siblings
            .iter()
            .filter_map(|i| parse_ordinals(i.instance_id.as_str()))
            .filter(|ords| ords.starts_with(parent_ordinals))
            .filter_map(|ords| ords.last().copied())
            .max()
            .unwrap_or(0);
        Ok(max + 1)
    }

    fn allocate_instance_id(&self, role: Role, parent: Option<&Instance>) -> EngineResult<InstanceId> {
        match (role, parent) {
            (Role::Executive, None) => {
                let n = self.next_ordinal(&[], Role::Executive, None)?;
                Ok(InstanceId::new(format!("exec_{n}")))
            }
            (Role::Manager, Some(p)) => {
                let exec_ordinal = parse_ordinals(p.instance_id.as_str())
                    .and_then(|o| o.first().copied())
                    .ok_or_else(|| CoreError::Internal(format!("malformed executive id {}", p.instance_id)))?;
                let m = self.next_ordinal(&[exec_ordinal], Role::Manager, Some(&p.instance_id))?;
                Ok(InstanceId::new(format!("mgr_{exec_ordinal}_{m}")))
            }
            (Role::Specialist, Some(p)) => {
                let ords = parse_ordinals(p.instance_id.as_str())
                    .ok_or_else(|| CoreError::Internal(format!("malformed manager id {}", p.instance_id)))?;
                let (exec_ordinal, mgr_ordinal) = match ords.as_slice() {
                    [e, m] => (*e, *m),
                    _ => return Err(CoreError::Internal(format!("malformed manager id {}", p.instance_id)).into()),
                };
                let s = self.next_ordinal(&[exec_ordinal, mgr_ordinal], Role::Specialist, Some(&p.instance_id))?;
                Ok(InstanceId::new(format!("spec_{exec_ordinal}_{mgr_ordinal}_{s}")))
            }
            _ => Err(CoreError::InvalidRole(format!("{role} requires a matching parent")).into()),
        }
    }

    /// `spawn({role, work_dir, context, parent_id?, workspace_mode?}) →
    /// instance_id` (§4.7). Any failure after the workspace is created rolls
    /// back the session and workspace before returning.
    pub async fn spawn(&self, req: SpawnRequest) -> EngineResult<InstanceId> {
        let parent = match &req.parent_id {
            Some(pid) => {
                let parent = self.instance(pid)?;
                if !parent.role.may_parent(req.role) {
                    return Err(CoreError::InvalidRole(format!(
                        "{} cannot parent {}",
                        parent.role, req.role
                    ))
                    .into());
                }
                Some(parent)
            }
            None if req.role == Role::Executive => None,
            None => {
                return Err(CoreError::ParentNotFound(format!(
                    "role={} requires parent_id",
                    req.role
                ))
                .into())
            }
        };

        let mode = req.workspace_mode.unwrap_or(WorkspaceMode::Isolated);
        workspace::validate_workspace_mode(req.role, mode)?;

        if let Some(max) = env::max_instances() {
            let live = self
                .registry
                .list_instances(&InstanceFilter::default())?
                .into_iter()
                .filter(|i| !i.is_terminated())
                .count();
            if live >= max {
                return Err(CoreError::ResourceLimitExceeded(format!("at capacity ({max} instances)")).into());
            }
        }

        let instance_id = self.allocate_instance_id(req.role, parent.as_ref())?;
        let now = self.clock.now_ms();

        let work_dir = workspace::prepare(
            &req.work_dir,
            &instance_id,
            req.role,
            req.parent_id.as_ref(),
            mode,
            req.context,
        )?;

        let session_name = format!("{}_{}", env::session_prefix(), instance_id.as_str());
        if let Err(e) = self.session_adapter().create_session(&session_name, &work_dir).await {
            let _ = workspace::teardown(&req.work_dir, &instance_id, mode);
            return Err(e.into());
        }

        let target = pane_target(&session_name);
        if let Err(e) = self.launch_child(&target, &instance_id, req.role, req.parent_id.as_ref()).await {
            let _ = self.session_adapter().kill_session(&session_name).await;
            let _ = workspace::teardown(&req.work_dir, &instance_id, mode);
            return Err(e);
        }

        let instance = Instance::new(
            instance_id.clone(),
            req.role,
            req.parent_id.clone(),
            session_name.clone(),
            target,
            work_dir.display().to_string(),
            mode,
            now,
        );
        if let Err(e) = self.registry.put_instance(instance) {
            let _ = self.session_adapter().kill_session(&session_name).await;
            let _ = workspace::teardown(&req.work_dir, &instance_id, mode);
            return Err(e.into());
        }

        if let Some(mut parent) = parent {
            parent.children.insert(instance_id.clone());
            self.registry.put_instance(parent)?;
        }

        self.schedule_activation(instance_id.clone());
        Ok(instance_id)
    }

    async fn launch_child(
        &self,
        target: &str,
        instance_id: &InstanceId,
        role: Role,
        parent_id: Option<&InstanceId>,
    ) -> EngineResult<()> {
        let Some(child_command) = env::child_command() else {
            return Ok(());
        };
        let allowed = oj_core::allowed_verbs(role)
            .iter()
            .map(|v| v.as_str())
            .collect::<Vec<_>>()
            .join(",");
        let launch = format!(
            "OJ_INSTANCE_ID=\"{}\" OJ_ROLE=\"{}\" OJ_PARENT_ID=\"{}\" OJ_ALLOWED_VERBS=\"{}\" {}",
            escape_for_shell_double_quotes(instance_id.as_str()),
            escape_for_shell_double_quotes(role.as_str()),
            parent_id.map(|p| escape_for_shell_double_quotes(p.as_str())).unwrap_or_default(),
            escape_for_shell_double_quotes(&allowed),
            child_command,
        );
        self.session_adapter().send_keys(target, &launch, true).await?;
        Ok(())
    }

    fn session_adapter(&self) -> &S {
        self.session.transport()
    }

    fn schedule_activation(&self, instance_id: InstanceId) {
        let registry = self.registry.clone();
        let clock = self.clock.clone();
        let delay = env::readiness_delay();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Ok(Some(mut instance)) = registry.get_instance(&instance_id) {
                if instance.status == Status::Spawning {
                    instance.mark_active(clock.now_ms());
                    let _ = registry.put_instance(instance);
                }
            }
        });
    }

    /// `send(instance_id, text, priority?, batchable?) → delivered` (§4.3, §4.7).
    pub async fn send(&self, instance_id: &InstanceId, text: &str, priority: SendPriority, batchable: bool) -> EngineResult<()> {
        let instance = self.instance(instance_id)?;
        self.session.send(&instance.pane_target, text, priority, batchable).await?;
        let mut instance = instance;
        instance.touch(self.clock.now_ms());
        self.registry.put_instance(instance)?;
        Ok(())
    }

    /// `read(instance_id, lines?) → pane output` (§4.7).
    pub async fn read(&self, instance_id: &InstanceId, lines: Option<u32>) -> EngineResult<String> {
        let instance = self.instance(instance_id)?;
        Ok(self.session_adapter().capture_pane(&instance.pane_target, lines).await?)
    }

    /// `list(filter?) → [instance]` (§4.7).
    pub fn list(&self, filter: &InstanceFilter) -> EngineResult<Vec<Instance>> {
        Ok(self.registry.list_instances(filter)?)
    }

    /// `get_progress(instance_id) → progress_record` (§4.4, §4.7).
    pub fn get_progress(&self, instance_id: &InstanceId) -> EngineResult<ProgressRecord> {
        let instance = self.instance(instance_id)?;
        Ok(oj_adapters::progress::read_progress(Path::new(&instance.work_dir))?)
    }

    /// `get_branch(instance_id) → branch_name?` (§4.6, §4.7).
    pub fn get_branch(&self, instance_id: &InstanceId) -> EngineResult<Option<String>> {
        Ok(self.instance(instance_id)?.branch_name)
    }

    /// `merge_branch({instance_id, dst, strategy}) → merge_outcome` (§4.6,
    /// §4.7). Restricted to executive/manager roles, matching the static
    /// `merge_branch` capability (§4.8).
    pub async fn merge_branch(
        &self,
        instance_id: &InstanceId,
        dst: &str,
        strategy: vcc::MergeStrategy,
    ) -> EngineResult<vcc::MergeOutcome> {
        let instance = self.instance(instance_id)?;
        if !oj_core::allows(instance.role, oj_core::Verb::MergeBranch) {
            return Err(CoreError::CapabilityDenied(format!("{} cannot merge_branch", instance.role)).into());
        }
        let src = instance
            .branch_name
            .as_deref()
            .ok_or_else(|| CoreError::InvalidRef(format!("{instance_id} has no branch")))?;
        Ok(vcc::coordinated_merge(src, dst, Path::new(&instance.work_dir), strategy).await?)
    }

    /// `terminate(instance_id) → [terminated]` (§4.7): cascades depth-first
    /// through children before killing the instance itself. Idempotent —
    /// terminating an already-terminated instance is a no-op.
    pub async fn terminate(&self, instance_id: &InstanceId) -> EngineResult<TerminateOutcome> {
        let mut outcome = TerminateOutcome::default();
        self.terminate_recursive(instance_id, &mut outcome).await?;
        Ok(outcome)
    }

    fn terminate_recursive<'a>(
        &'a self,
        instance_id: &'a InstanceId,
        outcome: &'a mut TerminateOutcome,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = EngineResult<()>> + Send + 'a>> {
        Box::pin(async move {
            let instance = match self.registry.get_instance(instance_id)? {
                Some(i) if !i.is_terminated() => i,
                _ => return Ok(()),
            };

            for child in instance.children.clone() {
                self.terminate_recursive(&child, outcome).await?;
            }

            let _ = self.session_adapter().kill_session(&instance.session_name).await;
            if instance.workspace_mode == WorkspaceMode::Isolated {
                let parent_work_dir = Path::new(&instance.work_dir).parent().map(Path::to_path_buf);
                if let Some(parent_dir) = parent_work_dir {
                    let _ = workspace::teardown(&parent_dir, instance_id, instance.workspace_mode);
                }
            } else {
                let shared_root = Path::new(&instance.work_dir);
                let _ = workspace::teardown(shared_root, instance_id, instance.workspace_mode);
            }

            let mut instance = instance;
            instance.status = Status::Terminated;
            instance.last_seen_at = self.clock.now_ms();
            self.registry.put_instance(instance)?;
            outcome.terminated.push(instance_id.clone());
            Ok(())
        })
    }

    /// `restart(instance_id) → {instance_id, resumed}` (§4.7):
    /// `active → crashed → spawning`. Preserves `instance_id`, respawning
    /// onto the same workspace and branch when the workspace still exists;
    /// falls back to a fresh context file otherwise.
    pub async fn restart(&self, instance_id: &InstanceId) -> EngineResult<RestartOutcome> {
        let mut instance = self.instance(instance_id)?;
        let _ = self.session_adapter().kill_session(&instance.session_name).await;

        let work_dir = PathBuf::from(&instance.work_dir);
        let resumed = work_dir.join(workspace::CONTEXT_FILENAME).exists()
            || work_dir
                .join(".managers")
                .join(instance_id.as_str())
                .join(workspace::CONTEXT_FILENAME)
                .exists();

        if !resumed {
            workspace::prepare(
                work_dir.parent().unwrap_or(&work_dir),
                instance_id,
                instance.role,
                instance.parent_id.as_ref(),
                instance.workspace_mode,
                serde_json::Value::Null,
            )?;
        }

        self.session_adapter().create_session(&instance.session_name, &work_dir).await?;
        self.launch_child(&instance.pane_target, instance_id, instance.role, instance.parent_id.as_ref()).await?;

        instance.status = Status::Spawning;
        instance.last_seen_at = self.clock.now_ms();
        self.registry.put_instance(instance)?;

        self.schedule_activation(instance_id.clone());
        Ok(RestartOutcome { instance_id: instance_id.clone(), resumed })
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
