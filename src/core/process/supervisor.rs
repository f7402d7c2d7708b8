// ─── Process Supervisor ───
// Owns the dedicated server child process: spawn, console relay, command
// input, graceful stop with forced-kill fallback, exit notification.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::core::error::{PanelError, PanelResult};
use crate::core::events::{self, EventSender, PanelEvent};

/// How long `stop` waits after the graceful signal before killing.
pub const STOP_GRACE_PERIOD: Duration = Duration::from_millis(3000);
/// Upper bound on waiting for buffered output after the process exits.
const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_millis(250);
/// A console write that cannot finish in this time fails; the server has
/// stopped reading its input.
const COMMAND_WRITE_TIMEOUT: Duration = Duration::from_secs(2);
/// Output without a trailing newline is relayed once the stream has been
/// quiet for this long.
const PARTIAL_LINE_FLUSH: Duration = Duration::from_millis(100);

type SharedStdin = Arc<Mutex<ChildStdin>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// The live child process and what it was launched from.
pub struct ServerProcessHandle {
    pub version: String,
    pub working_dir: PathBuf,
    pub pid: Option<u32>,
    /// Locked separately from the supervisor state, so a write blocked on a
    /// full pipe never stalls `stop` or `status`.
    stdin: Option<SharedStdin>,
    kill_tx: mpsc::UnboundedSender<()>,
    exited: watch::Receiver<bool>,
}

struct Inner {
    status: ServerStatus,
    handle: Option<ServerProcessHandle>,
    /// Bumped on every spawn so a stale monitor never clears a newer handle.
    generation: u64,
}

/// Single owner of the server process state. Cloning shares the same
/// process.
#[derive(Clone)]
pub struct ProcessSupervisor {
    inner: Arc<Mutex<Inner>>,
    events: EventSender,
    grace_period: Duration,
}

impl ProcessSupervisor {
    pub fn new(events: EventSender) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                status: ServerStatus::Stopped,
                handle: None,
                generation: 0,
            })),
            events,
            grace_period: STOP_GRACE_PERIOD,
        }
    }

    pub async fn status(&self) -> ServerStatus {
        self.inner.lock().await.status
    }

    /// Version id of the running process, if any.
    pub async fn running_version(&self) -> Option<String> {
        let inner = self.inner.lock().await;
        inner.handle.as_ref().map(|h| h.version.clone())
    }

    pub async fn pid(&self) -> Option<u32> {
        let inner = self.inner.lock().await;
        inner.handle.as_ref().and_then(|h| h.pid)
    }

    fn console(&self, line: impl Into<String>) {
        events::emit(&self.events, PanelEvent::console(line));
    }

    fn set_status(&self, inner: &mut Inner, status: ServerStatus) {
        inner.status = status;
        events::emit(&self.events, PanelEvent::ServerStatus { status });
    }

    /// Launch `executable` with `working_dir` as its current directory.
    ///
    /// Fails without touching state when the executable is missing or a
    /// process is already alive.
    pub async fn start(
        &self,
        executable: &Path,
        working_dir: &Path,
        version: &str,
    ) -> PanelResult<()> {
        let mut inner = self.inner.lock().await;

        if inner.status != ServerStatus::Stopped {
            self.console("Error: the server is already running");
            return Err(PanelError::ServerAlreadyRunning);
        }

        if !executable.is_file() {
            self.console(format!("Error: cannot find {}", executable.display()));
            return Err(PanelError::ExecutableNotFound(executable.to_path_buf()));
        }

        self.set_status(&mut inner, ServerStatus::Starting);

        let mut cmd = Command::new(executable);
        cmd.current_dir(working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        configure_platform_spawn(&mut cmd);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                self.set_status(&mut inner, ServerStatus::Stopped);
                self.console(format!("Error: failed to start server: {e}"));
                return Err(PanelError::io(executable, e));
            }
        };

        let pid = child.id();
        let mut relays = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            relays.push(spawn_relay(stdout, self.events.clone(), "stdout"));
        }
        if let Some(stderr) = child.stderr.take() {
            relays.push(spawn_relay(stderr, self.events.clone(), "stderr"));
        }

        let (kill_tx, kill_rx) = mpsc::unbounded_channel();
        let (exit_tx, exit_rx) = watch::channel(false);
        inner.generation += 1;
        inner.handle = Some(ServerProcessHandle {
            version: version.to_string(),
            working_dir: working_dir.to_path_buf(),
            pid,
            stdin: child.stdin.take().map(|stdin| Arc::new(Mutex::new(stdin))),
            kill_tx,
            exited: exit_rx,
        });
        self.set_status(&mut inner, ServerStatus::Running);

        info!(
            "Started server {} (PID {:?}) from {:?}",
            version, pid, executable
        );
        self.console("Server started");

        tokio::spawn(monitor(
            child,
            kill_rx,
            exit_tx,
            relays,
            self.clone(),
            version.to_string(),
            inner.generation,
        ));

        Ok(())
    }

    /// Ask the process to exit, wait up to the grace period, then kill it.
    /// Returns once the process is gone and the state is `Stopped`. A no-op
    /// unless the server is `Running`.
    pub async fn stop(&self) -> PanelResult<()> {
        let (pid, stdin, kill_tx, mut exited) = {
            let mut inner = self.inner.lock().await;
            if inner.status != ServerStatus::Running {
                return Ok(());
            }
            let Some(handle) = inner.handle.as_ref() else {
                return Ok(());
            };
            let parts = (
                handle.pid,
                handle.stdin.clone(),
                handle.kill_tx.clone(),
                handle.exited.clone(),
            );
            self.set_status(&mut inner, ServerStatus::Stopping);
            parts
        };

        if let Some(pid) = pid {
            if let Err(e) = request_graceful_exit(pid, stdin.as_ref()).await {
                warn!("Graceful stop request for PID {} failed: {}", pid, e);
            }
        }

        let graceful = tokio::time::timeout(self.grace_period, wait_exited(&mut exited))
            .await
            .is_ok();
        if !graceful {
            warn!(
                "Server did not exit within {:?}, killing PID {:?}",
                self.grace_period, pid
            );
            let _ = kill_tx.send(());
            wait_exited(&mut exited).await;
        }

        self.console("Server stopped");
        Ok(())
    }

    /// Write `text` plus a newline to the server's stdin and echo it to the
    /// console. Blank input or a server that is not running is ignored.
    pub async fn send_command(&self, text: &str) -> PanelResult<()> {
        let command = text.trim();
        if command.is_empty() {
            return Ok(());
        }

        let stdin = {
            let inner = self.inner.lock().await;
            if inner.status != ServerStatus::Running {
                return Ok(());
            }
            match inner.handle.as_ref().and_then(|h| h.stdin.clone()) {
                Some(stdin) => stdin,
                None => return Ok(()),
            }
        };

        write_line(&stdin, command)
            .await
            .map_err(|e| PanelError::Other(format!("Cannot write to server console: {e}")))?;

        debug!("Sent command to server: {}", command);
        self.console(format!("> {command}"));
        Ok(())
    }

    /// Called by the monitor once the child has exited.
    async fn on_exit(&self, version: &str, generation: u64, code: Option<i32>) {
        let mut inner = self.inner.lock().await;
        if inner.generation != generation {
            return;
        }
        inner.handle = None;
        self.set_status(&mut inner, ServerStatus::Stopped);
        drop(inner);

        match code {
            Some(code) => self.console(format!("Server exited with code {code}")),
            None => self.console("Server exited without an exit code (terminated by signal)"),
        }
        events::emit(
            &self.events,
            PanelEvent::ServerExited {
                version: version.to_string(),
                code,
            },
        );
    }
}

async fn monitor(
    mut child: Child,
    mut kill_rx: mpsc::UnboundedReceiver<()>,
    exit_tx: watch::Sender<bool>,
    relays: Vec<JoinHandle<()>>,
    supervisor: ProcessSupervisor,
    version: String,
    generation: u64,
) {
    let wait_result = loop {
        tokio::select! {
            result = child.wait() => break result,
            Some(()) = kill_rx.recv() => {
                if let Err(e) = child.start_kill() {
                    warn!("Cannot kill server process: {}", e);
                }
            }
        }
    };

    let code = match wait_result {
        Ok(status) => {
            info!("Server {} exited with status: {:?}", version, status);
            status.code()
        }
        Err(e) => {
            warn!("Cannot wait for server {}: {}", version, e);
            None
        }
    };

    // Let the relays flush what the process wrote before it died.
    let _ = tokio::time::timeout(
        OUTPUT_DRAIN_TIMEOUT,
        futures_util::future::join_all(relays),
    )
    .await;

    supervisor.on_exit(&version, generation, code).await;
    let _ = exit_tx.send(true);
}

fn spawn_relay<R>(reader: R, events: EventSender, stream: &'static str) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = reader;
        let mut pending = Vec::new();
        let mut chunk = [0_u8; 4096];
        let relay = |bytes: &[u8]| {
            let text = String::from_utf8_lossy(bytes);
            let line = text.trim_end_matches(['\r', '\n']);
            debug!("[server][{}] {}", stream, line);
            events::emit(&events, PanelEvent::console(line));
        };

        loop {
            let read = if pending.is_empty() {
                reader.read(&mut chunk).await
            } else {
                match tokio::time::timeout(PARTIAL_LINE_FLUSH, reader.read(&mut chunk)).await {
                    Ok(read) => read,
                    Err(_) => {
                        // Prompts and progress output often lack a newline.
                        relay(&pending);
                        pending.clear();
                        continue;
                    }
                }
            };

            match read {
                Ok(0) => break,
                Ok(n) => {
                    pending.extend_from_slice(&chunk[..n]);
                    while let Some(end) = pending.iter().position(|b| *b == b'\n') {
                        let line: Vec<u8> = pending.drain(..=end).collect();
                        relay(&line);
                    }
                }
                Err(e) => {
                    warn!("Server {} relay stopped: {}", stream, e);
                    break;
                }
            }
        }

        if !pending.is_empty() {
            relay(&pending);
        }
    })
}

/// Write `text` and a newline, giving up after `COMMAND_WRITE_TIMEOUT`.
async fn write_line(stdin: &SharedStdin, text: &str) -> std::io::Result<()> {
    let line = format!("{text}\n");
    let write = async {
        let mut stdin = stdin.lock().await;
        stdin.write_all(line.as_bytes()).await?;
        stdin.flush().await
    };
    match tokio::time::timeout(COMMAND_WRITE_TIMEOUT, write).await {
        Ok(result) => result,
        Err(_) => Err(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "server is not reading its console input",
        )),
    }
}

async fn wait_exited(exited: &mut watch::Receiver<bool>) {
    // A dropped sender means the monitor is gone, which also means exited.
    let _ = exited.wait_for(|done| *done).await;
}

/// The dedicated server runs without a console window, which `taskkill`
/// cannot close politely, so its own `stop` command is sent first.
#[cfg(target_os = "windows")]
async fn request_graceful_exit(pid: u32, stdin: Option<&SharedStdin>) -> std::io::Result<()> {
    if let Some(stdin) = stdin {
        if let Err(e) = write_line(stdin, "stop").await {
            debug!("Cannot send stop command to PID {}: {}", pid, e);
        }
    }
    let status = Command::new("taskkill")
        .args(["/PID", &pid.to_string()])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await?;
    if !status.success() {
        debug!("taskkill /PID {} returned {:?}", pid, status.code());
    }
    Ok(())
}

#[cfg(not(target_os = "windows"))]
async fn request_graceful_exit(pid: u32, _stdin: Option<&SharedStdin>) -> std::io::Result<()> {
    let status = Command::new("kill")
        .args(["-15", &pid.to_string()])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await?;
    if !status.success() {
        debug!("kill -15 {} returned {:?}", pid, status.code());
    }
    Ok(())
}

fn configure_platform_spawn(cmd: &mut Command) {
    #[cfg(target_os = "windows")]
    {
        const CREATE_NO_WINDOW: u32 = 0x08000000;
        cmd.creation_flags(CREATE_NO_WINDOW);
    }
    #[cfg(not(target_os = "windows"))]
    let _ = cmd;
}
