//! Wires [`AppState`] and the tool handlers into a [`Dispatcher`], and runs
//! the stdio length-framed server loop spec.md §6 names as the default
//! transport.

pub mod state;
mod tools;

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::rpc::{read_frame, write_frame, Dispatcher};

pub use state::AppState;

pub async fn build_dispatcher(state: Arc<AppState>) -> Dispatcher {
    let registry = crate::rpc::ToolRegistry::new();
    tools::register_all(&registry, state.clone()).await;
    Dispatcher::new(Arc::new(registry), state.tasks.clone())
}

/// Run the JSON-RPC server loop over `reader`/`writer`, reading and writing
/// length-framed messages until the input stream closes.
pub async fn serve<R, W>(state: Arc<AppState>, mut reader: R, mut writer: W) -> crate::domain::Result<()>
where
    R: tokio::io::AsyncRead + Unpin,
    W: tokio::io::AsyncWrite + Unpin,
{
    let dispatcher = build_dispatcher(state).await;
    info!("mcp server ready, awaiting framed requests on stdio");

    loop {
        let frame = match read_frame(&mut reader).await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                debug!("input stream closed, shutting down");
                return Ok(());
            }
            Err(err) => {
                error!(%err, "failed to read frame");
                return Err(crate::domain::Error::internal(err.to_string()));
            }
        };

        if let Some(response) = dispatcher.dispatch(&frame).await {
            write_frame(&mut writer, &response).await.map_err(|e| crate::domain::Error::internal(e.to_string()))?;
        }
    }
}

/// Entry point used by the `serve` CLI subcommand: binds the loop to the
/// process's real stdin/stdout.
pub async fn serve_stdio(state: Arc<AppState>) -> crate::domain::Result<()> {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();
    serve(state, stdin, stdout).await
}

/// Run a synchronous index over `path`, the same work `index_codebase`'s
/// non-async branch does, for the `index` CLI subcommand.
pub async fn index_path_for_cli(state: &AppState, path: &std::path::Path, force: bool) -> crate::domain::Result<String> {
    let summary = tools::run_index_job(state, &path.to_string_lossy(), force, None).await?;
    Ok(summary.to_string())
}
