use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time;
use tracing::{debug, error, info, warn};

use super::protocol::{self, ServiceToShell, ShellToService};
use crate::broker::{NewClient, ServiceEndpoint};
use crate::channel::{PortReceiver, PortSender};
use crate::error::{Error, Result};

pub const ROOT_KEY_FLAG: &str = "--rootKey";
pub const STORAGE_DIRECTORY_FLAG: &str = "--storageDirectory";

/// How to launch the domain service, before the per-launch flags are added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceLaunchPlan {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Append the service's stderr here; discarded when `None`.
    pub stderr_log: Option<PathBuf>,
}

impl ServiceLaunchPlan {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            stderr_log: None,
        }
    }

    pub fn debug_command(&self) -> Vec<String> {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().cloned());
        parts
    }
}

type Connections = Arc<Mutex<HashMap<String, PortSender>>>;

/// Launches the domain service. There is no restart: if the process dies it
/// stays dead for the rest of the app's lifetime.
pub struct ServiceSupervisor;

impl ServiceSupervisor {
    /// Spawn the service with `--rootKey=<hex>` and
    /// `--storageDirectory=<absolute path>` appended to the plan's arguments.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(
        plan: &ServiceLaunchPlan,
        root_key_hex: &str,
        storage_dir: &Path,
    ) -> Result<ServiceProcessHandle> {
        let storage_dir = prepare_storage_dir(storage_dir)?;

        let mut command = Command::new(&plan.program);
        command
            .args(&plan.args)
            .arg(format!("{ROOT_KEY_FLAG}={root_key_hex}"))
            .arg(format!("{STORAGE_DIRECTORY_FLAG}={}", storage_dir.display()))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(stderr_target(plan.stderr_log.as_deref()))
            .kill_on_drop(true);
        if let Some(cwd) = &plan.cwd {
            command.current_dir(cwd);
        }

        let spawn_error = |source: io::Error| Error::Spawn {
            program: plan.program.clone(),
            source,
        };
        let mut child = command.spawn().map_err(spawn_error)?;
        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            return Err(spawn_error(io::Error::other("service stdio was not captured")));
        };
        let pid = child.id();
        info!(
            pid,
            command = ?plan.debug_command(),
            storage_dir = %storage_dir.display(),
            "domain service started"
        );

        let connections: Connections = Arc::new(Mutex::new(HashMap::new()));
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (exited_tx, exited_rx) = watch::channel(false);
        let (kill_tx, kill_rx) = oneshot::channel();

        tokio::spawn(write_outbound(stdin, outbound_rx));
        tokio::spawn(route_inbound(stdout, Arc::clone(&connections)));
        tokio::spawn(dispatch_new_clients(
            inbound_rx,
            outbound_tx,
            connections,
            exited_rx.clone(),
        ));
        tokio::spawn(watch_exit(child, kill_rx, exited_tx));

        Ok(ServiceProcessHandle {
            pid,
            inbound: ServiceInbound { tx: inbound_tx },
            exited: exited_rx,
            kill: Mutex::new(Some(kill_tx)),
        })
    }
}

/// The running domain service: its OS process plus its inbound endpoint.
#[derive(Debug)]
pub struct ServiceProcessHandle {
    pid: Option<u32>,
    inbound: ServiceInbound,
    exited: watch::Receiver<bool>,
    kill: Mutex<Option<oneshot::Sender<()>>>,
}

impl ServiceProcessHandle {
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn inbound(&self) -> ServiceInbound {
        self.inbound.clone()
    }

    pub fn is_running(&self) -> bool {
        !*self.exited.borrow()
    }

    /// Ask the exit watcher to kill and reap the process, without waiting for
    /// it. Safe to call more than once. See [`ServiceProcessHandle::shutdown`].
    pub fn stop(&self) {
        let kill = self
            .kill
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(kill) = kill {
            let _ = kill.send(());
        }
    }

    pub async fn wait_for_exit(&self) {
        let mut exited = self.exited.clone();
        let _ = exited.wait_for(|exited| *exited).await;
    }

    /// Kill the process and wait until it has been reaped, for at most
    /// `grace`. Returns false if the process was still not reaped by then.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.stop();
        let reaped = time::timeout(grace, self.wait_for_exit()).await.is_ok();
        if !reaped {
            warn!(pid = ?self.pid, ?grace, "domain service was not reaped in time");
        }
        reaped
    }
}

/// Cloneable handle on the service's inbound message endpoint.
#[derive(Debug, Clone)]
pub struct ServiceInbound {
    tx: mpsc::UnboundedSender<NewClient>,
}

impl ServiceEndpoint for ServiceInbound {
    fn deliver_new_client(&self, client: NewClient) -> bool {
        self.tx.send(client).is_ok()
    }
}

fn prepare_storage_dir(storage_dir: &Path) -> Result<PathBuf> {
    let storage_error = |source: io::Error| Error::StorageDirectory {
        path: storage_dir.to_path_buf(),
        source,
    };
    fs::create_dir_all(storage_dir).map_err(storage_error)?;
    std::path::absolute(storage_dir).map_err(storage_error)
}

fn stderr_target(log_path: Option<&Path>) -> Stdio {
    let Some(log_path) = log_path else {
        return Stdio::null();
    };
    if let Some(parent) = log_path.parent() {
        if let Err(error) = fs::create_dir_all(parent) {
            warn!(path = %parent.display(), %error, "cannot create service log directory");
        }
    }
    match OpenOptions::new().create(true).append(true).open(log_path) {
        Ok(file) => Stdio::from(file),
        Err(error) => {
            warn!(path = %log_path.display(), %error, "cannot open service log, discarding stderr");
            Stdio::null()
        }
    }
}

async fn write_outbound(mut stdin: ChildStdin, mut outbound: mpsc::UnboundedReceiver<ShellToService>) {
    while let Some(message) = outbound.recv().await {
        let bytes = match protocol::encode_line(&message) {
            Ok(bytes) => bytes,
            Err(error) => {
                warn!(%error, "failed to encode message for domain service");
                continue;
            }
        };
        if let Err(error) = async {
            stdin.write_all(&bytes).await?;
            stdin.flush().await
        }
        .await
        {
            debug!(%error, "domain service stdin closed");
            break;
        }
    }
}

async fn route_inbound(stdout: ChildStdout, connections: Connections) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(error) => {
                debug!(%error, "failed to read from domain service");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match protocol::decode_line(&line) {
            Ok(ServiceToShell::Message {
                connection_id,
                data,
            }) => {
                let sender = connections
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .get(&connection_id)
                    .cloned();
                match sender {
                    Some(sender) if sender.post(data) => {}
                    Some(_) => debug!(%connection_id, "window side of connection is gone"),
                    None => debug!(%connection_id, "message for unknown connection dropped"),
                }
            }
            Ok(ServiceToShell::Other) => debug!("ignoring non-message line from domain service"),
            Err(error) => debug!(%error, "undecodable line from domain service"),
        }
    }

    // Service output ended: every window channel is finished.
    connections
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clear();
}

async fn dispatch_new_clients(
    mut inbound: mpsc::UnboundedReceiver<NewClient>,
    outbound: mpsc::UnboundedSender<ShellToService>,
    connections: Connections,
    mut exited: watch::Receiver<bool>,
) {
    loop {
        let client = tokio::select! {
            client = inbound.recv() => match client {
                Some(client) => client,
                None => break,
            },
            _ = exited.wait_for(|exited| *exited) => break,
        };

        let NewClient {
            connection_id,
            port,
        } = client;
        let (sender, receiver) = port.into_split();
        connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(connection_id.clone(), sender);

        let _ = outbound.send(ShellToService::NewClient {
            connection_id: connection_id.clone(),
        });
        tokio::spawn(pump_client(
            connection_id,
            receiver,
            outbound.clone(),
            Arc::clone(&connections),
        ));
    }
    debug!("domain service inbound endpoint closed");
}

async fn pump_client(
    connection_id: String,
    mut receiver: PortReceiver,
    outbound: mpsc::UnboundedSender<ShellToService>,
    connections: Connections,
) {
    while let Some(data) = receiver.recv().await {
        let message = ShellToService::Message {
            connection_id: connection_id.clone(),
            data,
        };
        if outbound.send(message).is_err() {
            break;
        }
    }

    connections
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(&connection_id);
    let _ = outbound.send(ShellToService::ClientClosed { connection_id });
}

async fn watch_exit(mut child: Child, kill: oneshot::Receiver<()>, exited: watch::Sender<bool>) {
    let status = tokio::select! {
        status = child.wait() => status,
        Ok(()) = kill => {
            info!("stopping domain service");
            if let Err(error) = child.start_kill() {
                warn!(%error, "failed to signal domain service");
            }
            child.wait().await
        }
    };

    match status {
        Ok(status) if status.success() => info!(%status, "domain service exited"),
        Ok(status) => error!(%status, "domain service exited abnormally; it will not be restarted"),
        Err(error) => error!(%error, "failed to wait for domain service"),
    }
    let _ = exited.send(true);
}
