// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Service process management.
//!
//! Spawns responder/requester processes, polls their ports until they accept
//! connections, and tears them down with SIGTERM followed by SIGKILL.

use std::net::{Ipv4Addr, SocketAddr};
use std::process::Stdio;
use std::time::{Duration, Instant};

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tokio::net::TcpStream;
use tokio::process::{Child, Command};

use crate::config::ServiceConfig;
use crate::error::OrchestratorError;
use crate::types::{Port, ProtocolName};

/// One spawned service.
///
/// The child is killed if this value is dropped without [`terminate`](Self::terminate),
/// so a cancelled run cannot leak a process holding its port.
#[derive(Debug)]
pub struct ServiceProcess {
    protocol: ProtocolName,
    role: &'static str,
    port: Port,
    child: Child,
}

impl ServiceProcess {
    /// Spawn the service described by `service`.
    pub fn spawn(
        protocol: &ProtocolName,
        role: &'static str,
        service: &ServiceConfig,
    ) -> Result<Self, OrchestratorError> {
        let spawn_failed = |reason: String| OrchestratorError::SpawnFailed {
            protocol: protocol.clone(),
            service: role,
            reason,
        };

        let (program, args) = service
            .command
            .split_first()
            .ok_or_else(|| spawn_failed("empty command".to_string()))?;

        let mut command = Command::new(program);
        command
            .args(args)
            .envs(&service.environment)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .kill_on_drop(true);
        if let Some(dir) = &service.working_dir {
            command.current_dir(dir);
        }

        let child = command
            .spawn()
            .map_err(|e| spawn_failed(format!("{}: {}", program, e)))?;

        tracing::debug!(
            protocol = %protocol,
            service = role,
            pid = child.id(),
            port = %service.port,
            "Spawned service process"
        );

        Ok(Self {
            protocol: protocol.clone(),
            role,
            port: service.port,
            child,
        })
    }

    pub fn port(&self) -> Port {
        self.port
    }

    /// OS process id, if the process has not been reaped yet.
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Poll the service port until it accepts a TCP connection.
    ///
    /// Fails with `ReadyTimeout` once `timeout` elapses, or `ExitedEarly` as
    /// soon as the process is seen to have exited.
    pub async fn wait_ready(
        &mut self,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<(), OrchestratorError> {
        let start = Instant::now();
        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, self.port.value()));
        let protocol = &self.protocol;
        let role = self.role;
        let child = &mut self.child;

        let poll = async {
            loop {
                let exited = child.try_wait().map_err(|e| OrchestratorError::ExitedEarly {
                    protocol: protocol.clone(),
                    service: role,
                    status: format!("unknown ({})", e),
                })?;
                if let Some(status) = exited {
                    return Err(OrchestratorError::ExitedEarly {
                        protocol: protocol.clone(),
                        service: role,
                        status: status.to_string(),
                    });
                }

                if TcpStream::connect(addr).await.is_ok() {
                    return Ok(());
                }

                tokio::time::sleep(poll_interval).await;
            }
        };

        match tokio::time::timeout(timeout, poll).await {
            Ok(Ok(())) => {
                tracing::info!(
                    protocol = %self.protocol,
                    service = self.role,
                    port = %self.port,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Service ready"
                );
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(OrchestratorError::ReadyTimeout {
                protocol: self.protocol.clone(),
                service: self.role,
                port: self.port,
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }

    /// Stop the process: SIGTERM, then SIGKILL once `grace` has passed.
    pub async fn terminate(mut self, grace: Duration) {
        if let Ok(Some(status)) = self.child.try_wait() {
            tracing::debug!(protocol = %self.protocol, service = self.role, %status, "Service already exited");
            return;
        }

        if let Some(pid) = self.child.id().and_then(|id| i32::try_from(id).ok()) {
            if let Err(e) = kill(Pid::from_raw(pid), Signal::SIGTERM) {
                tracing::warn!(protocol = %self.protocol, service = self.role, pid = pid, error = %e, "SIGTERM failed");
            }
        }

        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(Ok(status)) => {
                tracing::debug!(protocol = %self.protocol, service = self.role, %status, "Service stopped");
            }
            Ok(Err(e)) => {
                tracing::warn!(protocol = %self.protocol, service = self.role, error = %e, "Failed to reap service");
            }
            Err(_) => {
                tracing::warn!(
                    protocol = %self.protocol,
                    service = self.role,
                    grace_ms = grace.as_millis() as u64,
                    "Service ignored SIGTERM, killing"
                );
                if let Err(e) = self.child.kill().await {
                    tracing::warn!(protocol = %self.protocol, service = self.role, error = %e, "SIGKILL failed");
                }
            }
        }
    }
}

/// Processes started for one benchmark run, in start order.
///
/// Owned by a single run and torn down before the next one starts.
#[derive(Debug)]
pub struct ServiceSet {
    members: Vec<ServiceProcess>,
    grace: Duration,
}

impl ServiceSet {
    pub fn new(grace: Duration) -> Self {
        Self {
            members: Vec::new(),
            grace,
        }
    }

    /// Spawn a service and take ownership of it.
    pub fn start(
        &mut self,
        protocol: &ProtocolName,
        role: &'static str,
        service: &ServiceConfig,
    ) -> Result<&mut ServiceProcess, OrchestratorError> {
        let process = ServiceProcess::spawn(protocol, role, service)?;
        self.members.push(process);
        let index = self.members.len() - 1;
        Ok(&mut self.members[index])
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Terminate every member, most recently started first.
    pub async fn shutdown(self) {
        let grace = self.grace;
        for process in self.members.into_iter().rev() {
            process.terminate(grace).await;
        }
    }
}
