use std::ffi::OsStr;
use std::io::Write;
use std::net::SocketAddr;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::thread;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

pub struct ServerHandle {
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<thread::JoinHandle<()>>,
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            drop(shutdown.send(()));
        }
        if let Some(handle) = self.thread.take() {
            drop(handle.join());
        }
    }
}

/// Spawn a WebSocket server that echoes every text frame, or skip when the
/// sandbox forbids binding sockets.
///
/// # Errors
///
/// Returns an error if the runtime or listener cannot be created.
pub fn spawn_echo_server_or_skip() -> Result<Option<(String, ServerHandle)>, String> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .map_err(|err| format!("server runtime failed: {}", err))?;
    let listener = match runtime.block_on(TcpListener::bind("127.0.0.1:0")) {
        Ok(listener) => listener,
        Err(err) if err.kind() == std::io::ErrorKind::PermissionDenied => return Ok(None),
        Err(err) => return Err(format!("bind echo server failed: {}", err)),
    };
    let addr = listener
        .local_addr()
        .map_err(|err| format!("server addr failed: {}", err))?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let handle = thread::spawn(move || {
        runtime.block_on(async move {
            tokio::select! {
                _ = shutdown_rx => {}
                () = accept_loop(listener) => {}
            }
        });
    });

    Ok(Some((
        format!("ws://{}/ws", addr),
        ServerHandle {
            shutdown: Some(shutdown_tx),
            thread: Some(handle),
        },
    )))
}

async fn accept_loop(listener: TcpListener) {
    while let Ok((stream, _)) = listener.accept().await {
        tokio::spawn(async move {
            let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                return;
            };
            while let Some(Ok(message)) = ws.next().await {
                if message.is_close() {
                    break;
                }
                if message.is_text() && ws.send(message).await.is_err() {
                    break;
                }
            }
        });
    }
}

/// An address nothing listens on.
///
/// # Errors
///
/// Returns an error if a probe socket cannot be bound.
pub fn closed_endpoint() -> Result<Option<String>, String> {
    let listener = match std::net::TcpListener::bind("127.0.0.1:0") {
        Ok(listener) => listener,
        Err(err) if err.kind() == std::io::ErrorKind::PermissionDenied => return Ok(None),
        Err(err) => return Err(format!("probe bind failed: {}", err)),
    };
    let addr: SocketAddr = listener
        .local_addr()
        .map_err(|err| format!("probe addr failed: {}", err))?;
    drop(listener);
    Ok(Some(format!("ws://{}/ws", addr)))
}

/// Run the `chatbench` binary in `cwd`, feeding `stdin`, and capture output.
///
/// # Errors
///
/// Returns an error if the binary cannot be executed.
pub fn run_chatbench<I, S>(args: I, stdin: &str, cwd: &Path) -> Result<Output, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let bin = chatbench_bin()?;
    let mut child = Command::new(bin)
        .args(args)
        .current_dir(cwd)
        .env("RUST_LOG", "error")
        .env_remove("CHATBENCH_LOG")
        .env_remove("CHATBENCH_URL")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| format!("run chatbench failed: {}", err))?;
    if let Some(mut input) = child.stdin.take() {
        input
            .write_all(stdin.as_bytes())
            .map_err(|err| format!("write stdin failed: {}", err))?;
    }
    child
        .wait_with_output()
        .map_err(|err| format!("wait for chatbench failed: {}", err))
}

fn chatbench_bin() -> Result<String, String> {
    option_env!("CARGO_BIN_EXE_chatbench").map_or_else(
        || Err("CARGO_BIN_EXE_chatbench missing at compile time.".to_owned()),
        |path| Ok(path.to_owned()),
    )
}
