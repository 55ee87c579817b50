// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! RPC Surface (§4.12, §6): the single entry point every `Request::Rpc`
//! passes through. Owns the engine components, gates each verb behind the
//! static role capability table plus the specialist self-only restriction
//! `allows()` can't express on its own, then routes to the matching
//! `Supervisor`/`ParallelDispatcher`/`PerformanceOptimizer`/`vcc` call.
//!
//! Every response body is a JSON object: `{"success": true, ...}` or
//! `{"success": false, "error": "<tag>", "message": "..."}` — the daemon
//! never returns a bare error at the envelope level, so `oj-bridge` and the
//! primary CLI share one exit-code mapping over `body["success"]`.

use oj_adapters::{SendPriority, SessionAdapter};
use oj_core::{Clock, CoreError, InstanceId, Role, Verb};
use oj_engine::{
    vcc, Assignment, ManagerLoad, ParallelDispatcher, ParallelStatus, PerfSettings,
    PerformanceOptimizer, PrewarmPool, Strategy, SpawnRequest, Supervisor,
};
use oj_storage::{InstanceFilter, Registry};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// Owns every engine component the RPC surface dispatches into. Cloned
/// cheaply per connection — `Supervisor` is `Clone`, the rest are already
/// behind `Arc`.
pub struct RpcCtx<S: SessionAdapter, R: Registry + 'static, C: Clock> {
    pub supervisor: Supervisor<S, R, C>,
    pub dispatcher: Arc<ParallelDispatcher<R, C>>,
    pub optimizer: Arc<PerformanceOptimizer<Value>>,
    pub prewarm: Arc<PrewarmPool<S>>,
    pub registry: Arc<R>,
    pub clock: C,
}

impl<S: SessionAdapter, R: Registry + 'static, C: Clock> Clone for RpcCtx<S, R, C> {
    fn clone(&self) -> Self {
        Self {
            supervisor: self.supervisor.clone(),
            dispatcher: self.dispatcher.clone(),
            optimizer: self.optimizer.clone(),
            prewarm: self.prewarm.clone(),
            registry: self.registry.clone(),
            clock: self.clock.clone(),
        }
    }
}

fn success(body: Value) -> Value {
    let mut map = match body {
        Value::Object(map) => map,
        Value::Null => serde_json::Map::new(),
        other => {
            let mut map = serde_json::Map::new();
            map.insert("result".to_string(), other);
            map
        }
    };
    map.insert("success".to_string(), Value::Bool(true));
    Value::Object(map)
}

fn failure(tag: &str, message: impl std::fmt::Display) -> Value {
    json!({"success": false, "error": tag, "message": message.to_string()})
}

fn arg_str<'a>(args: &'a Value, field: &str) -> Result<&'a str, Value> {
    args.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| failure("InvalidArgument", format!("missing or non-string field `{field}`")))
}

fn arg_instance_id(args: &Value, field: &str) -> Result<InstanceId, Value> {
    Ok(InstanceId::new(arg_str(args, field)?.to_string()))
}

impl<S: SessionAdapter, R: Registry + 'static, C: Clock> RpcCtx<S, R, C> {
    /// Parses `verb`, applies RBAC, and routes to the matching engine call.
    /// Never returns `Err` at the Rust level — every failure is folded into
    /// the returned JSON body so the wire protocol stays uniform.
    pub async fn dispatch(&self, verb: &str, args: Value, caller: Option<String>) -> Value {
        let verb = match Verb::from_str(verb) {
            Ok(v) => v,
            Err(e) => return failure("UnknownVerb", e),
        };

        if let Err(denied) = self.check_rbac(verb, &args, caller.as_deref()) {
            return denied;
        }

        match self.route(verb, args).await {
            Ok(body) => success(body),
            Err(e) => failure(e.tag(), e),
        }
    }

    /// `None` (the primary, human-operated CLI) bypasses RBAC entirely
    /// (§4.12). Any other caller must be a live instance whose role is
    /// statically permitted the verb; `get_progress`/`get_branch` are
    /// additionally restricted to the instance's own id, since the
    /// capability table has no notion of "self only" (§4.8).
    fn check_rbac(&self, verb: Verb, args: &Value, caller: Option<&str>) -> Result<(), Value> {
        let Some(caller) = caller else { return Ok(()) };
        let caller_id = InstanceId::new(caller.to_string());
        let instance = self
            .registry
            .get_instance(&caller_id)
            .map_err(|e| failure("Internal", e))?
            .ok_or_else(|| failure("InstanceNotFound", format!("caller {caller} not found")))?;

        if !oj_core::allows(instance.role, verb) {
            return Err(failure("CapabilityDenied", format!("{} may not invoke {verb}", instance.role)));
        }

        if matches!(verb, Verb::GetProgress | Verb::GetBranch) && instance.role == Role::Specialist {
            let target = args.get("instance_id").and_then(Value::as_str);
            if target != Some(caller_id.as_str()) {
                return Err(failure("CapabilityDenied", format!("{caller} may only query its own instance")));
            }
        }

        Ok(())
    }

    async fn route(&self, verb: Verb, args: Value) -> Result<Value, oj_engine::EngineError> {
        match verb {
            Verb::Spawn => self.do_spawn(args).await,
            Verb::Send => self.do_send(args).await,
            Verb::Read => self.do_read(args).await,
            Verb::List => self.do_list(args),
            Verb::Terminate => self.do_terminate(args).await,
            Verb::Restart => self.do_restart(args).await,
            Verb::MergeBranch => self.do_merge_branch(args).await,
            Verb::GetProgress => self.do_get_progress(args),
            Verb::GetBranch => self.do_get_branch(args),
            Verb::ExecuteParallel => self.do_execute_parallel(args),
            Verb::DistributeWork => self.do_distribute_work(args),
            Verb::GetParallelStatus => self.do_get_parallel_status(),
            Verb::GitStatus => self.do_git_status(args).await,
            Verb::GitBranch => self.do_git_branch(args).await,
            Verb::GitConflicts => self.do_git_conflicts(args).await,
            Verb::GitMerge => self.do_git_merge(args).await,
            Verb::GitCleanup => self.do_git_cleanup(args).await,
            Verb::GetPerformance => self.do_get_performance(),
            Verb::OptimizeSettings => self.do_optimize_settings(args),
            Verb::PrewarmResources => self.do_prewarm_resources().await,
        }
    }

    async fn do_spawn(&self, args: Value) -> Result<Value, oj_engine::EngineError> {
        let role = parse_role(arg_str(&args, "role").map_err(bad_arg)?).map_err(bad_arg)?;
        let work_dir = PathBuf::from(arg_str(&args, "work_dir").map_err(bad_arg)?);
        let context = args.get("context").cloned().unwrap_or(Value::Null);
        let parent_id = args.get("parent_id").and_then(Value::as_str).map(|s| InstanceId::new(s.to_string()));
        let workspace_mode = match args.get("workspace_mode").and_then(Value::as_str) {
            Some("shared") => Some(oj_core::WorkspaceMode::Shared),
            Some("isolated") => Some(oj_core::WorkspaceMode::Isolated),
            Some(other) => return Err(bad_arg(format!("unknown workspace_mode `{other}`"))),
            None => None,
        };
        let instance_id = self
            .supervisor
            .spawn(SpawnRequest { role, work_dir, context, parent_id, workspace_mode })
            .await?;
        Ok(json!({"instance_id": instance_id.as_str()}))
    }

    async fn do_send(&self, args: Value) -> Result<Value, oj_engine::EngineError> {
        let instance_id = arg_instance_id(&args, "instance_id").map_err(bad_arg)?;
        let text = arg_str(&args, "text").map_err(bad_arg)?;
        let priority = match args.get("priority").and_then(Value::as_str) {
            Some("critical") => SendPriority::Critical,
            _ => SendPriority::Normal,
        };
        let batchable = args.get("batchable").and_then(Value::as_bool).unwrap_or(false);
        self.supervisor.send(&instance_id, text, priority, batchable).await?;
        Ok(Value::Null)
    }

    async fn do_read(&self, args: Value) -> Result<Value, oj_engine::EngineError> {
        let instance_id = arg_instance_id(&args, "instance_id").map_err(bad_arg)?;
        let lines = args.get("lines").and_then(Value::as_u64).map(|n| n as u32);
        let output = self.supervisor.read(&instance_id, lines).await?;
        Ok(json!({"output": output}))
    }

    fn do_list(&self, args: Value) -> Result<Value, oj_engine::EngineError> {
        let role = match args.get("role").and_then(Value::as_str) {
            Some(s) => Some(parse_role(s).map_err(bad_arg)?),
            None => None,
        };
        let parent_id = args.get("parent_id").and_then(Value::as_str).map(|s| InstanceId::new(s.to_string()));
        let instances = self.supervisor.list(&InstanceFilter { role, parent_id })?;
        Ok(json!({"count": instances.len(), "instances": instances}))
    }

    async fn do_terminate(&self, args: Value) -> Result<Value, oj_engine::EngineError> {
        let instance_id = arg_instance_id(&args, "instance_id").map_err(bad_arg)?;
        let outcome = self.supervisor.terminate(&instance_id).await?;
        Ok(json!({"terminated": outcome.terminated.iter().map(InstanceId::as_str).collect::<Vec<_>>()}))
    }

    async fn do_restart(&self, args: Value) -> Result<Value, oj_engine::EngineError> {
        let instance_id = arg_instance_id(&args, "instance_id").map_err(bad_arg)?;
        let outcome = self.supervisor.restart(&instance_id).await?;
        Ok(json!({"instance_id": outcome.instance_id.as_str(), "resumed": outcome.resumed}))
    }

    async fn do_merge_branch(&self, args: Value) -> Result<Value, oj_engine::EngineError> {
        let instance_id = arg_instance_id(&args, "instance_id").map_err(bad_arg)?;
        let dst = arg_str(&args, "dst").map_err(bad_arg)?;
        let strategy = match args.get("strategy").and_then(Value::as_str) {
            Some("manual") => vcc::MergeStrategy::Manual,
            _ => vcc::MergeStrategy::Auto,
        };
        let outcome = self.supervisor.merge_branch(&instance_id, dst, strategy).await?;
        Ok(json!({
            "success": outcome.success,
            "strategy_used": format!("{:?}", outcome.strategy_used).to_lowercase(),
            "conflicts": outcome.conflicts,
        }))
    }

    fn do_get_progress(&self, args: Value) -> Result<Value, oj_engine::EngineError> {
        let instance_id = arg_instance_id(&args, "instance_id").map_err(bad_arg)?;
        let progress = self.supervisor.get_progress(&instance_id)?;
        Ok(serde_json::to_value(progress).unwrap_or(Value::Null))
    }

    fn do_get_branch(&self, args: Value) -> Result<Value, oj_engine::EngineError> {
        let instance_id = arg_instance_id(&args, "instance_id").map_err(bad_arg)?;
        let branch = self.supervisor.get_branch(&instance_id)?;
        Ok(json!({"branch_name": branch}))
    }

    fn do_execute_parallel(&self, args: Value) -> Result<Value, oj_engine::EngineError> {
        let (tasks, managers, strategy) = parse_distribution_args(&args).map_err(bad_arg)?;
        // `mark_active` requires each job to already be in the registry, so
        // a fresh `execute_parallel` call submits its tasks before planning.
        for task in &tasks {
            self.dispatcher.submit(task.clone())?;
        }
        let plan = self.dispatcher.execute_parallel(&tasks, &managers, strategy)?;
        Ok(assignments_to_json(&plan))
    }

    fn do_distribute_work(&self, args: Value) -> Result<Value, oj_engine::EngineError> {
        let (tasks, managers, strategy) = parse_distribution_args(&args).map_err(bad_arg)?;
        let plan = self.dispatcher.distribute_work(&tasks, &managers, strategy);
        Ok(assignments_to_json(&plan))
    }

    fn do_get_parallel_status(&self) -> Result<Value, oj_engine::EngineError> {
        let status = self.dispatcher.get_parallel_status()?;
        Ok(parallel_status_to_json(&status))
    }

    async fn do_git_status(&self, args: Value) -> Result<Value, oj_engine::EngineError> {
        let dir = PathBuf::from(arg_str(&args, "work_dir").map_err(bad_arg)?);
        let key = format!("git_status:{}", dir.display());
        let cache = self.optimizer.cache();
        let clock = &self.clock;
        let report = oj_engine::perf::cached_or_compute(&cache, clock, &key, || async {
            let report = vcc::git_status(&dir).await?;
            serde_json::to_value(report).map_err(|e| CoreError::Internal(e.to_string()))
        })
        .await?;
        Ok(report)
    }

    async fn do_git_branch(&self, args: Value) -> Result<Value, oj_engine::EngineError> {
        let dir = PathBuf::from(arg_str(&args, "work_dir").map_err(bad_arg)?);
        let branch = vcc::current_branch(&dir).await?;
        Ok(json!({"branch": branch}))
    }

    async fn do_git_conflicts(&self, args: Value) -> Result<Value, oj_engine::EngineError> {
        let branch_a = arg_str(&args, "branch_a").map_err(bad_arg)?;
        let branch_b = arg_str(&args, "branch_b").map_err(bad_arg)?;
        let dir = PathBuf::from(arg_str(&args, "work_dir").map_err(bad_arg)?);
        let report = vcc::analyze_conflicts(branch_a, branch_b, &dir).await?;
        Ok(serde_json::to_value(report).unwrap_or(Value::Null))
    }

    async fn do_git_merge(&self, args: Value) -> Result<Value, oj_engine::EngineError> {
        let src = arg_str(&args, "src").map_err(bad_arg)?;
        let dst = arg_str(&args, "dst").map_err(bad_arg)?;
        let dir = PathBuf::from(arg_str(&args, "work_dir").map_err(bad_arg)?);
        let strategy = match args.get("strategy").and_then(Value::as_str) {
            Some("manual") => vcc::MergeStrategy::Manual,
            _ => vcc::MergeStrategy::Auto,
        };
        let outcome = vcc::coordinated_merge(src, dst, &dir, strategy).await?;
        Ok(json!({
            "success": outcome.success,
            "strategy_used": format!("{:?}", outcome.strategy_used).to_lowercase(),
            "conflicts": outcome.conflicts,
        }))
    }

    async fn do_git_cleanup(&self, args: Value) -> Result<Value, oj_engine::EngineError> {
        let dir = PathBuf::from(arg_str(&args, "work_dir").map_err(bad_arg)?);
        let deleted = vcc::git_cleanup(&dir).await?;
        Ok(json!({"deleted_branches": deleted}))
    }

    fn do_get_performance(&self) -> Result<Value, oj_engine::EngineError> {
        let settings = self.optimizer.settings();
        Ok(perf_settings_to_json(&settings, &self.optimizer, &self.prewarm))
    }

    fn do_optimize_settings(&self, args: Value) -> Result<Value, oj_engine::EngineError> {
        let current = self.optimizer.settings();
        let new_settings = PerfSettings {
            max_concurrent_spawns: args
                .get("max_concurrent_spawns")
                .and_then(Value::as_u64)
                .map(|n| n as usize)
                .unwrap_or(current.max_concurrent_spawns),
            max_concurrent_vcc_ops: args
                .get("max_concurrent_vcc_ops")
                .and_then(Value::as_u64)
                .map(|n| n as usize)
                .unwrap_or(current.max_concurrent_vcc_ops),
            cache_capacity: args
                .get("cache_capacity")
                .and_then(Value::as_u64)
                .map(|n| n as usize)
                .unwrap_or(current.cache_capacity),
            cache_ttl: args
                .get("cache_ttl_secs")
                .and_then(Value::as_u64)
                .map(std::time::Duration::from_secs)
                .unwrap_or(current.cache_ttl),
            prewarm_pool_size: args
                .get("prewarm_pool_size")
                .and_then(Value::as_u64)
                .map(|n| n as usize)
                .unwrap_or(current.prewarm_pool_size),
        };
        self.optimizer.optimize_settings(new_settings);
        Ok(perf_settings_to_json(&new_settings, &self.optimizer, &self.prewarm))
    }

    async fn do_prewarm_resources(&self) -> Result<Value, oj_engine::EngineError> {
        self.prewarm.refill().await;
        Ok(json!({"pool_size": self.prewarm.len()}))
    }
}

fn bad_arg(msg: impl std::fmt::Display) -> oj_engine::EngineError {
    oj_engine::EngineError::Core(CoreError::InvalidArgument(msg.to_string()))
}

fn parse_role(s: &str) -> Result<Role, String> {
    match s {
        "executive" => Ok(Role::Executive),
        "manager" => Ok(Role::Manager),
        "specialist" => Ok(Role::Specialist),
        other => Err(format!("unknown role `{other}`")),
    }
}

fn parse_priority(s: Option<&str>) -> oj_core::Priority {
    match s {
        Some("critical") => oj_core::Priority::Critical,
        Some("high") => oj_core::Priority::High,
        Some("low") => oj_core::Priority::Low,
        _ => oj_core::Priority::Medium,
    }
}

fn parse_distribution_args(
    args: &Value,
) -> Result<(Vec<oj_core::Job>, Vec<ManagerLoad>, Strategy), String> {
    let tasks = args
        .get("tasks")
        .and_then(Value::as_array)
        .ok_or_else(|| "missing or non-array field `tasks`".to_string())?
        .iter()
        .map(|t| {
            let priority = parse_priority(t.get("priority").and_then(Value::as_str));
            let payload = t.get("payload").cloned().unwrap_or(Value::Null);
            let job_id = t
                .get("job_id")
                .and_then(Value::as_str)
                .map(|s| oj_core::JobId::new(s.to_string()))
                .ok_or_else(|| "task missing `job_id`".to_string())?;
            Ok(oj_core::Job {
                job_id,
                priority,
                payload,
                status: oj_core::JobStatus::Pending,
                attempts: 0,
                max_attempts: oj_core::DEFAULT_MAX_ATTEMPTS,
                assigned_to: None,
                next_retry_at: None,
            })
        })
        .collect::<Result<Vec<_>, String>>()?;

    let managers = args
        .get("managers")
        .and_then(Value::as_array)
        .ok_or_else(|| "missing or non-array field `managers`".to_string())?
        .iter()
        .map(|m| {
            let manager_id = m
                .get("manager_id")
                .and_then(Value::as_str)
                .map(|s| InstanceId::new(s.to_string()))
                .ok_or_else(|| "manager missing `manager_id`".to_string())?;
            let capacity = m.get("capacity").and_then(Value::as_u64).unwrap_or(0) as usize;
            let active = m.get("active").and_then(Value::as_u64).unwrap_or(0) as usize;
            Ok(ManagerLoad { manager_id, capacity, active })
        })
        .collect::<Result<Vec<_>, String>>()?;

    let strategy = match args.get("strategy").and_then(Value::as_str) {
        Some("least_loaded") => Strategy::LeastLoaded,
        Some("capacity_aware") => Strategy::CapacityAware,
        _ => Strategy::RoundRobin,
    };

    Ok((tasks, managers, strategy))
}

fn assignments_to_json(plan: &[Assignment]) -> Value {
    json!({
        "assignments": plan.iter().map(|a| json!({
            "manager_id": a.manager_id.as_str(),
            "job_ids": a.job_ids.iter().map(|j| j.as_str()).collect::<Vec<_>>(),
        })).collect::<Vec<_>>()
    })
}

fn parallel_status_to_json(status: &ParallelStatus) -> Value {
    json!({
        "pending": status.pending,
        "active": status.active,
        "completed": status.completed,
        "failed": status.failed,
    })
}

fn perf_settings_to_json<S: SessionAdapter>(
    settings: &PerfSettings,
    optimizer: &PerformanceOptimizer<Value>,
    prewarm: &PrewarmPool<S>,
) -> Value {
    json!({
        "max_concurrent_spawns": settings.max_concurrent_spawns,
        "max_concurrent_vcc_ops": settings.max_concurrent_vcc_ops,
        "cache_capacity": settings.cache_capacity,
        "cache_ttl_secs": settings.cache_ttl.as_secs(),
        "prewarm_pool_size": settings.prewarm_pool_size,
        "spawn_queue_available": optimizer.spawn_queue().available(),
        "vcc_queue_available": optimizer.vcc_queue().available(),
        "cache_len": optimizer.cache().len(),
        "prewarm_ready": prewarm.len(),
    })
}

#[cfg(test)]
#[path = "rpc_tests.rs"]
mod tests;
