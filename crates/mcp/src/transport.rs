//! Stdio transport: spawn the tool-server process once and speak
//! line-delimited JSON-RPC over its stdin/stdout.

use std::{
    collections::HashMap,
    process::Stdio,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};

use {
    tokio::{
        io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
        process::{Child, Command},
        sync::{Mutex, oneshot},
    },
    tracing::{debug, info, warn},
};

use crate::{
    error::ToolErrorKind,
    types::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse},
};

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<JsonRpcResponse>>>>;

/// One child process, one writer, one reader task. Requests from any number
/// of tasks are multiplexed by id over the shared stdin writer.
///
/// Once the process dies the transport stays dead: `alive` flips to false,
/// every pending request is failed immediately, and later requests are
/// rejected up front. There is no per-call reconnect.
pub struct StdioTransport {
    child: Mutex<Child>,
    stdin: Mutex<tokio::process::ChildStdin>,
    pending: PendingMap,
    next_id: AtomicU64,
    alive: Arc<AtomicBool>,
}

impl StdioTransport {
    /// Spawn the server process and start the reader loop.
    pub async fn spawn(
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
    ) -> std::io::Result<Arc<Self>> {
        info!(command = %command, args = ?args, "spawning tool server process");

        let mut child = Command::new(command)
            .args(args)
            .envs(env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| std::io::Error::other("failed to capture child stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("failed to capture child stdout"))?;
        let stderr = child.stderr.take();

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let alive = Arc::new(AtomicBool::new(true));

        if let Some(stderr) = stderr {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    let trimmed = line.trim();
                    if !trimmed.is_empty() {
                        warn!(stderr = %trimmed, "tool server stderr");
                    }
                }
            });
        }

        tokio::spawn(read_loop(
            stdout,
            Arc::clone(&pending),
            Arc::clone(&alive),
        ));

        Ok(Arc::new(Self {
            child: Mutex::new(child),
            stdin: Mutex::new(stdin),
            pending,
            next_id: AtomicU64::new(1),
            alive,
        }))
    }

    /// Send a request and wait for the matching response, bounded by `timeout`.
    pub async fn request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
        timeout: Duration,
    ) -> Result<JsonRpcResponse, ToolErrorKind> {
        if !self.alive.load(Ordering::SeqCst) {
            return Err(ToolErrorKind::SessionClosed);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let req = JsonRpcRequest::new(id, method, params);

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        if let Err(e) = self.write_frame(&serde_json::to_string(&req)?).await {
            self.pending.lock().await.remove(&id);
            return Err(ToolErrorKind::Transport(e.to_string()));
        }
        debug!(method, id, "request sent to tool server");

        match tokio::time::timeout(timeout, rx).await {
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(ToolErrorKind::Timeout(timeout))
            },
            // Sender dropped: the reader loop exited, the session is gone.
            Ok(Err(_)) => Err(ToolErrorKind::SessionClosed),
            Ok(Ok(resp)) => match resp.error {
                Some(err) => Err(ToolErrorKind::Rpc {
                    code: err.code,
                    message: err.message,
                }),
                None => Ok(resp),
            },
        }
    }

    /// Send a notification (no response expected).
    pub async fn notify(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<(), ToolErrorKind> {
        if !self.alive.load(Ordering::SeqCst) {
            return Err(ToolErrorKind::SessionClosed);
        }
        let frame = serde_json::to_string(&JsonRpcNotification {
            jsonrpc: "2.0".into(),
            method: method.into(),
            params,
        })?;
        self.write_frame(&frame)
            .await
            .map_err(|e| ToolErrorKind::Transport(e.to_string()))
    }

    async fn write_frame(&self, frame: &str) -> std::io::Result<()> {
        let mut stdin = self.stdin.lock().await;
        stdin.write_all(frame.as_bytes()).await?;
        stdin.write_all(b"\n").await?;
        stdin.flush().await
    }

    /// Whether the server process is still running.
    pub async fn is_alive(&self) -> bool {
        if !self.alive.load(Ordering::SeqCst) {
            return false;
        }
        let mut child = self.child.lock().await;
        matches!(child.try_wait(), Ok(None))
    }

    /// Kill the server process and fail everything in flight.
    pub async fn kill(&self) {
        self.alive.store(false, Ordering::SeqCst);
        self.pending.lock().await.clear();
        let mut child = self.child.lock().await;
        let _ = child.kill().await;
    }
}

/// Reads stdout lines, matching responses to pending requests by id.
/// On EOF or read error the transport is marked dead and all pending
/// requests are failed by dropping their senders.
async fn read_loop(
    stdout: tokio::process::ChildStdout,
    pending: PendingMap,
    alive: Arc<AtomicBool>,
) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match serde_json::from_str::<JsonRpcResponse>(trimmed) {
                    Ok(resp) => {
                        let tx = pending.lock().await.remove(&resp.id);
                        match tx {
                            Some(tx) => {
                                let _ = tx.send(resp);
                            },
                            None => warn!(id = resp.id, "response for unknown request id"),
                        }
                    },
                    Err(e) => {
                        // Server-initiated notifications land here; ignore them.
                        debug!(error = %e, line = %trimmed, "non-response line from tool server");
                    },
                }
            },
            Ok(None) => {
                info!("tool server stdout closed");
                break;
            },
            Err(e) => {
                warn!(error = %e, "error reading tool server stdout");
                break;
            },
        }
    }
    alive.store(false, Ordering::SeqCst);
    pending.lock().await.clear();
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn spawn_and_kill() {
        let transport = StdioTransport::spawn("cat", &[], &HashMap::new())
            .await
            .unwrap();
        assert!(transport.is_alive().await);
        transport.kill().await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!transport.is_alive().await);
    }

    #[tokio::test]
    async fn spawn_nonexistent_command_fails() {
        let result = StdioTransport::spawn("nonexistent_command_xyz_42", &[], &HashMap::new()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn requests_after_kill_fail_fast() {
        let transport = StdioTransport::spawn("cat", &[], &HashMap::new())
            .await
            .unwrap();
        transport.kill().await;

        let started = tokio::time::Instant::now();
        let err = transport
            .request("tools/call", None, Duration::from_secs(30))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolErrorKind::SessionClosed));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn request_to_silent_server_times_out() {
        // `sleep` never writes to stdout, so the request can only time out.
        let transport = StdioTransport::spawn("sleep", &["5".into()], &HashMap::new())
            .await
            .unwrap();
        let err = transport
            .request("tools/call", None, Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolErrorKind::Timeout(_)));
        transport.kill().await;
    }
}
