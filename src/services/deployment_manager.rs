//! Process lifecycle manager for generated artifacts.
//!
//! Turns a ready artifact into a supervised OS process: resolves the
//! runnable entry, allocates a port from a bounded range, prechecks that
//! the process survives startup, then commits the long-lived instance.
//! Generated code is untrusted, so every step that can fail cheaply fails
//! before resources are committed, and every acquired resource has a
//! release path on every exit branch.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ArtifactStatus, DeployConfig};
use crate::domain::ports::ArtifactRepository;
use crate::infrastructure::proc::{terminate_tree, Termination};
use crate::services::entry::{resolve_entry_point, EntryPoint};

/// Bounded port pool.
///
/// Owned by the manager and guarded by its mutex; constructed per
/// instance so tests get an isolated pool.
#[derive(Debug)]
pub struct PortAllocator {
    base: u16,
    max: u16,
    used: HashSet<u16>,
}

impl PortAllocator {
    pub fn new(base: u16, max: u16) -> Self {
        Self {
            base,
            max,
            used: HashSet::new(),
        }
    }

    /// Claim the next free port in `[base, max)`.
    pub fn allocate(&mut self) -> Option<u16> {
        (self.base..self.max).find(|port| self.used.insert(*port))
    }

    /// Return a port to the pool. Idempotent.
    pub fn release(&mut self, port: u16) {
        self.used.remove(&port);
    }

    pub fn is_held(&self, port: u16) -> bool {
        self.used.contains(&port)
    }

    pub fn held_count(&self) -> usize {
        self.used.len()
    }
}

/// Externally visible view of one running deployment.
#[derive(Debug, Clone, PartialEq)]
pub struct Deployment {
    pub artifact_id: Uuid,
    pub running: bool,
    pub pid: u32,
    pub port: u16,
    pub base_url: String,
    pub endpoints: Vec<String>,
    pub entry: String,
    pub working_dir: PathBuf,
    pub started_at: DateTime<Utc>,
}

struct RunningProcess {
    child: Child,
    pid: u32,
    port: u16,
    base_url: String,
    endpoints: Vec<String>,
    entry: String,
    working_dir: PathBuf,
    started_at: DateTime<Utc>,
}

impl RunningProcess {
    fn view(&mut self, artifact_id: Uuid) -> Deployment {
        // Liveness is computed from the process, never trusted from state.
        let running = matches!(self.child.try_wait(), Ok(None));
        Deployment {
            artifact_id,
            running,
            pid: self.pid,
            port: self.port,
            base_url: self.base_url.clone(),
            endpoints: self.endpoints.clone(),
            entry: self.entry.clone(),
            working_dir: self.working_dir.clone(),
            started_at: self.started_at,
        }
    }
}

struct DeployState {
    ports: PortAllocator,
    running: HashMap<Uuid, RunningProcess>,
}

/// Supervises the set of currently deployed artifacts.
pub struct DeploymentManager {
    config: DeployConfig,
    artifacts: Arc<dyn ArtifactRepository>,
    http: reqwest::Client,
    state: Mutex<DeployState>,
}

impl DeploymentManager {
    pub fn new(config: DeployConfig, artifacts: Arc<dyn ArtifactRepository>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.health_timeout_secs))
            .build()
            .unwrap_or_default();
        let state = DeployState {
            ports: PortAllocator::new(config.base_port, config.max_port),
            running: HashMap::new(),
        };
        Self {
            config,
            artifacts,
            http,
            state: Mutex::new(state),
        }
    }

    /// Deploy an artifact as a supervised process.
    pub async fn deploy(&self, artifact_id: Uuid, location: &Path) -> DomainResult<Deployment> {
        info!(artifact_id = %artifact_id, location = %location.display(), "Deploying artifact");

        let entry = resolve_entry_point(location, &self.config.default_entry_symbol)?;

        // Allocate under the lock; two concurrent deploys must never see
        // the same free port.
        let port = {
            let mut state = self.state.lock().await;
            if state.running.contains_key(&artifact_id) {
                return Err(DomainError::NotDeployable(format!(
                    "artifact {artifact_id} is already running"
                )));
            }
            state.ports.allocate().ok_or(DomainError::NoPortsAvailable)?
        };

        match self.spawn_and_commit(artifact_id, &entry, port).await {
            Ok(deployment) => {
                if let Err(e) = self.record_deployed(artifact_id, &deployment).await {
                    error!(artifact_id = %artifact_id, error = %e, "Failed to record deployment; rolling back");
                    let _ = self.stop(artifact_id).await;
                    return Err(e);
                }
                info!(
                    artifact_id = %artifact_id,
                    port = deployment.port,
                    pid = deployment.pid,
                    entry = %deployment.entry,
                    "Artifact deployed"
                );
                Ok(deployment)
            }
            Err(e) => {
                self.state.lock().await.ports.release(port);
                Err(e)
            }
        }
    }

    async fn spawn_and_commit(
        &self,
        artifact_id: Uuid,
        entry: &EntryPoint,
        port: u16,
    ) -> DomainResult<Deployment> {
        self.precheck(entry, port).await?;

        let mut child = self.build_command(entry, port).spawn()?;
        let pid = child
            .id()
            .ok_or_else(|| DomainError::DeploymentCrashed {
                diagnostic: "process exited before a pid could be observed".to_string(),
            })?;

        let base_url = format!("http://{}:{}", self.config.public_host, port);
        let endpoints = vec![
            format!("{base_url}/"),
            format!("{base_url}/health"),
            format!("{base_url}/docs"),
            format!("{base_url}/openapi.json"),
        ];
        let working_dir = entry
            .file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let started_at = Utc::now();

        let deployment = Deployment {
            artifact_id,
            running: true,
            pid,
            port,
            base_url: base_url.clone(),
            endpoints: endpoints.clone(),
            entry: format!("{}:{}", entry.module, entry.symbol),
            working_dir: working_dir.clone(),
            started_at,
        };

        // The running map and the port set are guarded by the same lock,
        // so they can never disagree about who holds the port.
        let mut state = self.state.lock().await;
        state.running.insert(
            artifact_id,
            RunningProcess {
                child,
                pid,
                port,
                base_url,
                endpoints,
                entry: deployment.entry.clone(),
                working_dir,
                started_at,
            },
        );

        Ok(deployment)
    }

    /// Start a short-lived probe and fail fast if the process exits
    /// immediately, surfacing its captured output as the diagnostic.
    async fn precheck(&self, entry: &EntryPoint, port: u16) -> DomainResult<()> {
        let mut probe = self.build_command(entry, port).spawn()?;

        tokio::time::sleep(Duration::from_millis(self.config.precheck_wait_ms)).await;

        match probe.try_wait()? {
            Some(status) => {
                let diagnostic = self.capture_diagnostic(&mut probe, status).await;
                error!(
                    entry = %entry.module,
                    port = port,
                    %status,
                    "Deployment precheck failed: process exited immediately"
                );
                Err(DomainError::DeploymentCrashed { diagnostic })
            }
            None => {
                // Probe survived; terminate it so the committed instance
                // can bind the same port.
                if let Some(pid) = probe.id() {
                    let _ = terminate_tree(pid, Termination::Graceful);
                }
                if timeout(Duration::from_secs(1), probe.wait()).await.is_err() {
                    if let Some(pid) = probe.id() {
                        let _ = terminate_tree(pid, Termination::Forced);
                    }
                    if probe.kill().await.is_err() {
                        return Err(DomainError::DeploymentTimeout);
                    }
                }
                Ok(())
            }
        }
    }

    async fn capture_diagnostic(
        &self,
        probe: &mut Child,
        status: std::process::ExitStatus,
    ) -> String {
        let limit = self.config.diagnostic_tail_bytes;
        let stdout = Self::read_tail(probe.stdout.take(), limit).await;
        let stderr = Self::read_tail(probe.stderr.take(), limit).await;

        let mut diagnostic = format!("process exited during precheck ({status})");
        if !stdout.is_empty() {
            diagnostic.push_str("\n---- stdout ----\n");
            diagnostic.push_str(&stdout);
        }
        if !stderr.is_empty() {
            diagnostic.push_str("\n---- stderr ----\n");
            diagnostic.push_str(&stderr);
        }
        diagnostic
    }

    async fn read_tail<R: AsyncReadExt + Unpin>(reader: Option<R>, limit: usize) -> String {
        let Some(mut reader) = reader else {
            return String::new();
        };
        let mut buf = Vec::new();
        if reader.read_to_end(&mut buf).await.is_err() {
            return String::new();
        }
        let start = buf.len().saturating_sub(limit);
        String::from_utf8_lossy(&buf[start..]).trim().to_string()
    }

    fn build_command(&self, entry: &EntryPoint, port: u16) -> Command {
        let rendered: Vec<String> = self
            .config
            .command_template
            .iter()
            .map(|arg| {
                arg.replace("{module}", &entry.module)
                    .replace("{symbol}", &entry.symbol)
                    .replace("{host}", &self.config.bind_host)
                    .replace("{port}", &port.to_string())
            })
            .collect();

        let working_dir = entry
            .file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let mut cmd = Command::new(&rendered[0]);
        cmd.args(&rendered[1..])
            .current_dir(working_dir)
            .env("PORT", port.to_string())
            .env("HATCHERY_PORT", port.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(unix)]
        cmd.process_group(0);

        cmd
    }

    async fn record_deployed(&self, artifact_id: Uuid, deployment: &Deployment) -> DomainResult<()> {
        let mut artifact = self
            .artifacts
            .get(artifact_id)
            .await?
            .ok_or(DomainError::ArtifactNotFound(artifact_id))?;

        artifact.transition_to(ArtifactStatus::Deployed)?;
        artifact.is_running = true;
        artifact.deployed_port = Some(deployment.port);
        artifact.endpoint_urls = deployment.endpoints.clone();
        artifact.deployed_at = Some(deployment.started_at);
        self.artifacts.update(&artifact).await
    }

    /// Stop a deployed artifact. Returns false (not an error) when the
    /// artifact is not currently tracked as running.
    pub async fn stop(&self, artifact_id: Uuid) -> DomainResult<bool> {
        let process = {
            let mut state = self.state.lock().await;
            match state.running.remove(&artifact_id) {
                Some(process) => process,
                None => return Ok(false),
            }
        };

        let RunningProcess {
            mut child,
            pid,
            port,
            ..
        } = process;

        if matches!(child.try_wait(), Ok(None)) {
            if let Err(e) = terminate_tree(pid, Termination::Graceful) {
                warn!(artifact_id = %artifact_id, pid = pid, error = %e, "Graceful signal failed");
            }

            let stop_timeout = Duration::from_secs(self.config.stop_timeout_secs);
            if timeout(stop_timeout, child.wait()).await.is_err() {
                warn!(artifact_id = %artifact_id, pid = pid, "Stop timed out; escalating to kill");
                let _ = terminate_tree(pid, Termination::Forced);
                let _ = child.kill().await;
            }
        }

        self.state.lock().await.ports.release(port);

        if let Err(e) = self.record_stopped(artifact_id).await {
            warn!(artifact_id = %artifact_id, error = %e, "Failed to record stop");
        }

        info!(artifact_id = %artifact_id, port = port, "Artifact stopped");
        Ok(true)
    }

    async fn record_stopped(&self, artifact_id: Uuid) -> DomainResult<()> {
        let mut artifact = self
            .artifacts
            .get(artifact_id)
            .await?
            .ok_or(DomainError::ArtifactNotFound(artifact_id))?;

        if artifact.status == ArtifactStatus::Deployed {
            artifact.transition_to(ArtifactStatus::Ready)?;
        }
        artifact.is_running = false;
        artifact.deployed_port = None;
        artifact.endpoint_urls.clear();
        artifact.deployed_at = None;
        self.artifacts.update(&artifact).await
    }

    /// Live status of one deployment, or None when untracked.
    pub async fn status(&self, artifact_id: Uuid) -> Option<Deployment> {
        let mut state = self.state.lock().await;
        state
            .running
            .get_mut(&artifact_id)
            .map(|process| process.view(artifact_id))
    }

    /// Live status of every tracked deployment.
    pub async fn list(&self) -> Vec<Deployment> {
        let mut state = self.state.lock().await;
        let ids: Vec<Uuid> = state.running.keys().copied().collect();
        ids.into_iter()
            .filter_map(|id| {
                state
                    .running
                    .get_mut(&id)
                    .map(|process| process.view(id))
            })
            .collect()
    }

    /// Probe the artifact's own health endpoint. Any failure returns
    /// false rather than raising.
    pub async fn health_check(&self, artifact_id: Uuid) -> bool {
        let base_url = {
            let state = self.state.lock().await;
            match state.running.get(&artifact_id) {
                Some(process) => process.base_url.clone(),
                None => return false,
            }
        };

        let health_url = format!("{base_url}/health");
        match self.http.get(&health_url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    /// Ports currently held by the pool (diagnostics and tests).
    pub async fn held_ports(&self) -> Vec<u16> {
        let state = self.state.lock().await;
        let mut held: Vec<u16> = (self.config.base_port..self.config.max_port)
            .filter(|p| state.ports.is_held(*p))
            .collect();
        held.sort_unstable();
        held
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocator_hands_out_distinct_ports() {
        let mut ports = PortAllocator::new(8100, 8104);
        let a = ports.allocate().unwrap();
        let b = ports.allocate().unwrap();
        let c = ports.allocate().unwrap();
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_eq!(ports.held_count(), 3);
    }

    #[test]
    fn test_allocator_exhaustion() {
        let mut ports = PortAllocator::new(8100, 8102);
        ports.allocate().unwrap();
        ports.allocate().unwrap();
        assert!(ports.allocate().is_none());
    }

    #[test]
    fn test_released_port_is_reusable() {
        let mut ports = PortAllocator::new(8100, 8101);
        let port = ports.allocate().unwrap();
        assert!(ports.allocate().is_none());
        ports.release(port);
        assert_eq!(ports.allocate(), Some(port));
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut ports = PortAllocator::new(8100, 8110);
        let port = ports.allocate().unwrap();
        ports.release(port);
        ports.release(port);
        assert_eq!(ports.held_count(), 0);
    }
}
