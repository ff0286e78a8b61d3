//! Stdio transport: newline-delimited envelopes.
//!
//! One reader task splits stdin lines into host answers (for pending
//! sampling requests) and tool calls. Tool calls go through a single
//! worker, so a connection runs one call at a time while the reader stays
//! free to deliver sampling answers to that call. Every line written to
//! stdout goes through one writer task.

use std::sync::Arc;

use serde_json::Value;
use sym_rpc::{MethodRegistry, RpcContext, RpcRequest};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dispatch::{encode, handle_request, parse_error};
use crate::errors::ServerError;
use crate::session::StdioHostSession;

/// Queued outgoing lines before writers back off.
const OUTGOING_CAPACITY: usize = 64;

/// Queued tool calls waiting for the worker.
const REQUEST_QUEUE: usize = 32;

/// Stdio transport. Create it first so its host session can be handed to
/// the inference factory, then [`serve`](Self::serve).
pub struct StdioTransport {
    outgoing_tx: mpsc::Sender<String>,
    outgoing_rx: mpsc::Receiver<String>,
    session: Arc<StdioHostSession>,
}

impl StdioTransport {
    /// New transport with an idle host session.
    pub fn new() -> Self {
        let (outgoing_tx, outgoing_rx) = mpsc::channel(OUTGOING_CAPACITY);
        let session = StdioHostSession::new(outgoing_tx.clone());
        Self {
            outgoing_tx,
            outgoing_rx,
            session,
        }
    }

    /// Session that samples through the host on this channel.
    pub fn host_session(&self) -> Arc<StdioHostSession> {
        Arc::clone(&self.session)
    }

    /// Serve on the process's stdin and stdout.
    pub async fn serve_stdio(
        self,
        registry: MethodRegistry,
        ctx: RpcContext,
        shutdown: CancellationToken,
    ) -> Result<(), ServerError> {
        self.serve(registry, ctx, BufReader::new(tokio::io::stdin()), tokio::io::stdout(), shutdown)
            .await
    }

    /// Serve until `reader` hits EOF or `shutdown` is cancelled.
    pub async fn serve<R, W>(
        self,
        registry: MethodRegistry,
        ctx: RpcContext,
        reader: R,
        writer: W,
        shutdown: CancellationToken,
    ) -> Result<(), ServerError>
    where
        R: AsyncBufRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let Self {
            outgoing_tx,
            outgoing_rx,
            session,
        } = self;
        info!("stdio transport started");

        let writer_done = CancellationToken::new();
        let writer_task = spawn_writer(writer, outgoing_rx, writer_done.clone());

        let (request_tx, request_rx) = mpsc::channel::<Value>(REQUEST_QUEUE);
        let worker =
            spawn_worker(Arc::new(registry), Arc::new(ctx), request_rx, outgoing_tx.clone());

        let mut lines = reader.lines();
        let read_result = loop {
            let line = tokio::select! {
                () = shutdown.cancelled() => {
                    debug!("stdio transport cancelled");
                    break Ok(());
                }
                line = lines.next_line() => line,
            };
            let line = match line {
                Ok(Some(line)) => line,
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<Value>(line) {
                Ok(message) if session.resolve(&message) => {}
                Ok(message) => {
                    if request_tx.send(message).await.is_err() {
                        break Ok(());
                    }
                }
                Err(e) => {
                    warn!(error = %e, "unparseable line");
                    let _ = outgoing_tx.send(encode(&parse_error(&e))).await;
                }
            }
        };

        session.cancel_all();
        drop(request_tx);
        if shutdown.is_cancelled() {
            worker.abort();
        }
        let _ = worker.await;

        drop(outgoing_tx);
        writer_done.cancel();
        let write_result = writer_task.await.unwrap_or(Ok(()));
        info!("stdio transport stopped");

        read_result?;
        write_result?;
        Ok(())
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn spawn_worker(
    registry: Arc<MethodRegistry>,
    ctx: Arc<RpcContext>,
    mut requests: mpsc::Receiver<Value>,
    outgoing: mpsc::Sender<String>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(message) = requests.recv().await {
            let line = match serde_json::from_value::<RpcRequest>(message) {
                Ok(request) => handle_request(request, &registry, &ctx).await.response_json,
                Err(e) => {
                    warn!(error = %e, "line is not a request envelope");
                    encode(&parse_error(&e))
                }
            };
            if outgoing.send(line).await.is_err() {
                break;
            }
        }
    })
}

fn spawn_writer<W>(
    mut writer: W,
    mut lines: mpsc::Receiver<String>,
    done: CancellationToken,
) -> JoinHandle<std::io::Result<()>>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            let line = tokio::select! {
                biased;
                line = lines.recv() => line,
                () = done.cancelled() => lines.try_recv().ok(),
            };
            let Some(line) = line else { break };
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
        writer.flush().await
    })
}
