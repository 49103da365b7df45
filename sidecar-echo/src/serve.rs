use anyhow::Context as _;
use sidecar::{ListenAddr, Listener, Server};
use tracing::info;

use crate::cli::ServeArgs;
use crate::command_error::CommandError;

pub async fn serve(args: ServeArgs) -> Result<(), CommandError> {
    let addr = ListenAddr::from_flags(args.port, &args.socket)?;
    let listener = Listener::bind(&addr)
        .await
        .with_context(|| format!("failed to listen on {addr}"))
        .map_err(CommandError::RuntimeError)?;

    let server = Server::new(sidecar_echo::router());
    server
        .serve_with_shutdown(listener, async {
            let _ = tokio::signal::ctrl_c().await;
            info!("interrupted");
        })
        .await?;
    Ok(())
}
