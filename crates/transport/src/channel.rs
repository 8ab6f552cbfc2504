use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use shopmate_core::errors::ChannelError;
use shopmate_core::wire::{RequestFrame, ResponseFrame};

type PendingTable = Arc<StdMutex<HashMap<u64, oneshot::Sender<Result<Value, ChannelError>>>>>;

#[derive(Clone, Debug)]
pub struct ChannelConfig {
    /// Channel name used in log events (`products`, `orders`).
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    pub envs: Vec<(String, String)>,
    pub call_timeout: Duration,
    pub shutdown_grace: Duration,
}

impl ChannelConfig {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            envs: Vec::new(),
            call_timeout: Duration::from_secs(5),
            shutdown_grace: Duration::from_secs(2),
        }
    }
}

/// One request/response channel to a long-lived tool-server subprocess.
///
/// The write path is serialized behind a mutex; the read path is a single
/// task draining stdout and resolving waiters from the pending table. After
/// a timeout or stream loss the channel is degraded: calls fail fast with
/// `Unavailable` until [`ToolChannel::reconnect`] succeeds.
pub struct ToolChannel {
    config: ChannelConfig,
    next_id: AtomicU64,
    degraded: Arc<AtomicBool>,
    pending: PendingTable,
    writer: Mutex<Option<Box<dyn AsyncWrite + Send + Unpin>>>,
    child: Mutex<Option<Child>>,
    reader_task: StdMutex<Option<JoinHandle<()>>>,
}

impl ToolChannel {
    /// Launches the subprocess and starts the reader task. The process is
    /// reused across calls; it is not respawned per request.
    pub async fn start(config: ChannelConfig) -> Result<Self, ChannelError> {
        let channel = Self::idle(config);
        channel.spawn_process().await?;
        Ok(channel)
    }

    fn idle(config: ChannelConfig) -> Self {
        Self {
            config,
            next_id: AtomicU64::new(0),
            degraded: Arc::new(AtomicBool::new(true)),
            pending: Arc::new(StdMutex::new(HashMap::new())),
            writer: Mutex::new(None),
            child: Mutex::new(None),
            reader_task: StdMutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    async fn spawn_process(&self) -> Result<(), ChannelError> {
        let mut command = Command::new(&self.config.command);
        command
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        for (key, value) in &self.config.envs {
            command.env(key, value);
        }

        let mut child = command.spawn().map_err(|source| ChannelError::ProcessLaunch {
            command: self.config.command.clone(),
            source,
        })?;

        let stdin = child.stdin.take().ok_or_else(|| {
            ChannelError::Unavailable("tool server stdin was not captured".to_string())
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            ChannelError::Unavailable("tool server stdout was not captured".to_string())
        })?;

        *self.child.lock().await = Some(child);
        self.attach_streams(stdin, stdout).await;
        Ok(())
    }

    /// Wires the channel onto an arbitrary stream pair. Production code goes
    /// through [`ToolChannel::start`]; tests drive this with in-memory pipes.
    async fn attach_streams(
        &self,
        writer: impl AsyncWrite + Send + Unpin + 'static,
        reader: impl AsyncRead + Send + Unpin + 'static,
    ) {
        *self.writer.lock().await = Some(Box::new(writer));

        let task = tokio::spawn(read_loop(
            self.config.name.clone(),
            reader,
            Arc::clone(&self.pending),
            Arc::clone(&self.degraded),
        ));
        let previous = self.reader_task.lock().expect("reader task lock").replace(task);
        if let Some(previous) = previous {
            previous.abort();
        }

        self.degraded.store(false, Ordering::SeqCst);
    }

    /// Sends one request frame and waits for the matching response, with the
    /// channel's configured timeout.
    pub async fn call(&self, method: &str, args: Value) -> Result<Value, ChannelError> {
        self.call_with_timeout(method, args, self.config.call_timeout).await
    }

    /// Sends one request frame and waits for the response frame carrying the
    /// same id, or fails with `Timeout` and degrades the channel. A response
    /// that arrives after the timeout is read and discarded by the reader
    /// loop, so the stream never desynchronizes.
    pub async fn call_with_timeout(
        &self,
        method: &str,
        args: Value,
        timeout: Duration,
    ) -> Result<Value, ChannelError> {
        if self.is_degraded() {
            return Err(ChannelError::Unavailable(format!(
                "channel `{}` is degraded; reconnect before calling",
                self.config.name
            )));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let (sender, receiver) = oneshot::channel();
        self.pending.lock().expect("pending table lock").insert(id, sender);

        let frame = RequestFrame { id, method: method.to_string(), args };
        if let Err(error) = self.write_frame(&frame).await {
            self.pending.lock().expect("pending table lock").remove(&id);
            self.degraded.store(true, Ordering::SeqCst);
            return Err(error);
        }

        let started = Instant::now();
        match tokio::time::timeout(timeout, receiver).await {
            Ok(Ok(outcome)) => {
                debug!(
                    event_name = "channel.call_resolved",
                    channel = %self.config.name,
                    method,
                    call_id = id,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "tool call resolved"
                );
                outcome
            }
            Ok(Err(_closed)) => Err(ChannelError::Unavailable(format!(
                "channel `{}` dropped the call before a response arrived",
                self.config.name
            ))),
            Err(_elapsed) => {
                self.pending.lock().expect("pending table lock").remove(&id);
                self.degraded.store(true, Ordering::SeqCst);
                warn!(
                    event_name = "channel.call_timeout",
                    channel = %self.config.name,
                    method,
                    call_id = id,
                    timeout_ms = timeout.as_millis() as u64,
                    "tool call timed out; channel degraded"
                );
                Err(ChannelError::Timeout { timeout_ms: timeout.as_millis() as u64 })
            }
        }
    }

    async fn write_frame(&self, frame: &RequestFrame) -> Result<(), ChannelError> {
        let mut line = serde_json::to_string(frame)
            .map_err(|error| ChannelError::Protocol(format!("unencodable request: {error}")))?;
        line.push('\n');

        let mut writer_slot = self.writer.lock().await;
        let writer = writer_slot.as_mut().ok_or_else(|| {
            ChannelError::Unavailable(format!("channel `{}` has no writer", self.config.name))
        })?;
        writer
            .write_all(line.as_bytes())
            .await
            .map_err(|error| ChannelError::Unavailable(format!("write failed: {error}")))?;
        writer
            .flush()
            .await
            .map_err(|error| ChannelError::Unavailable(format!("flush failed: {error}")))
    }

    /// Terminates the subprocess on every exit path: stdin is closed as the
    /// shutdown signal, then the process is killed once the grace period
    /// elapses. `kill_on_drop` covers abnormal exits of the host process.
    pub async fn stop(&self) {
        self.degraded.store(true, Ordering::SeqCst);
        *self.writer.lock().await = None;

        if let Some(mut child) = self.child.lock().await.take() {
            match tokio::time::timeout(self.config.shutdown_grace, child.wait()).await {
                Ok(Ok(status)) => {
                    debug!(
                        event_name = "channel.stopped",
                        channel = %self.config.name,
                        exit_status = %status,
                        "tool server exited"
                    );
                }
                Ok(Err(error)) => {
                    warn!(
                        event_name = "channel.stop_wait_failed",
                        channel = %self.config.name,
                        error = %error,
                        "failed to await tool server exit"
                    );
                }
                Err(_elapsed) => {
                    warn!(
                        event_name = "channel.stop_forced",
                        channel = %self.config.name,
                        "tool server ignored shutdown; killing"
                    );
                    let _ = child.start_kill();
                    let _ = child.wait().await;
                }
            }
        }

        fail_pending(
            &self.pending,
            &self.config.name,
            "channel stopped while the call was in flight",
        );
    }

    /// Tears the old process down (if any) and launches a fresh one. On
    /// success the degraded flag clears and calls flow again.
    pub async fn reconnect(&self) -> Result<(), ChannelError> {
        self.stop().await;
        self.spawn_process().await
    }
}

async fn read_loop(
    name: String,
    reader: impl AsyncRead + Send + Unpin + 'static,
    pending: PendingTable,
    degraded: Arc<AtomicBool>,
) {
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                dispatch_line(&name, &line, &pending);
            }
            Ok(None) => {
                debug!(event_name = "channel.stream_closed", channel = %name, "tool server closed stdout");
                break;
            }
            Err(error) => {
                error!(
                    event_name = "channel.read_failed",
                    channel = %name,
                    error = %error,
                    "read from tool server failed"
                );
                break;
            }
        }
    }

    degraded.store(true, Ordering::SeqCst);
    fail_pending(&pending, &name, "tool server stream closed");
}

/// Protocol errors here are non-fatal and self-healing: an unparseable frame
/// or an id that was never issued is logged and dropped, and the loop keeps
/// reading.
fn dispatch_line(name: &str, line: &str, pending: &PendingTable) {
    let frame = match serde_json::from_str::<ResponseFrame>(line) {
        Ok(frame) => frame,
        Err(error) => {
            warn!(
                event_name = "channel.protocol_error",
                channel = %name,
                error = %error,
                "discarding unparseable response frame"
            );
            return;
        }
    };

    let waiter = pending.lock().expect("pending table lock").remove(&frame.id);
    let Some(sender) = waiter else {
        warn!(
            event_name = "channel.unmatched_response",
            channel = %name,
            call_id = frame.id,
            "discarding response with unknown or expired id"
        );
        return;
    };

    let outcome = match frame.error {
        Some(wire_error) => {
            Err(ChannelError::Tool { code: wire_error.code, message: wire_error.message })
        }
        None => Ok(frame.result.unwrap_or(Value::Null)),
    };

    if sender.send(outcome).is_err() {
        // Caller gave up (cancelled run); the frame was still consumed so
        // the stream stays in sync.
        debug!(
            event_name = "channel.response_discarded",
            channel = %name,
            call_id = frame.id,
            "response arrived for a cancelled call"
        );
    }
}

fn fail_pending(pending: &PendingTable, name: &str, reason: &str) {
    let drained = {
        let mut table = pending.lock().expect("pending table lock");
        table.drain().collect::<Vec<_>>()
    };
    for (call_id, sender) in drained {
        debug!(
            event_name = "channel.pending_failed",
            channel = %name,
            call_id,
            reason,
            "failing in-flight call"
        );
        let _ = sender.send(Err(ChannelError::Unavailable(reason.to_string())));
    }
}
