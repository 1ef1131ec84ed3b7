//! `rpcbridge serve`: loads the schema, registers one proxy handler per unary method and
//! serves the mux over HTTP/1 and HTTP/2 until interrupted.
use crate::cli::ServeArgs;
use crate::{load_registry, read_descriptor_set};
use anyhow::Context;
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto,
    service::TowerToHyperService,
};
use rpcbridge_core::{
    GrpcClient, ServeMux, prost_reflect::DescriptorPool, proxy, tonic::transport::Channel,
};
use std::time::Duration;
use tokio::net::TcpListener;

pub async fn run(args: ServeArgs) -> anyhow::Result<()> {
    let set = read_descriptor_set(&args.schema)?;
    let registry = load_registry(&set, &args.schema.generate)?;
    let pool = DescriptorPool::from_file_descriptor_set(set)
        .context("Failed to build descriptor pool")?;

    let channel = Channel::from_shared(args.upstream.clone())
        .with_context(|| format!("Invalid upstream URL '{}'", args.upstream))?
        .connect_lazy();

    let mut builder = ServeMux::builder();
    builder
        .max_body_bytes(args.max_body_bytes)
        .descriptor_pool(pool.clone());
    if let Some(secs) = args.timeout {
        builder.timeout(Duration::from_secs(secs));
    }

    let registered = proxy::register_all(&mut builder, &registry, &pool, GrpcClient::new(channel))?;
    let mux = builder.build();

    let listener = TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("Failed to bind {}", args.listen))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        upstream = %args.upstream,
        methods = registered,
        "serving JSON-RPC"
    );

    serve_until(listener, mux, tokio::signal::ctrl_c()).await
}

/// Accepts connections until `shutdown` resolves.
async fn serve_until<F>(listener: TcpListener, mux: ServeMux, shutdown: F) -> anyhow::Result<()>
where
    F: Future,
{
    tokio::pin!(shutdown);

    loop {
        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => accepted.context("Failed to accept connection")?,
            _ = &mut shutdown => {
                tracing::info!("shutting down");
                return Ok(());
            }
        };

        let service = TowerToHyperService::new(mux.clone());
        tokio::spawn(async move {
            if let Err(e) = auto::Builder::new(TokioExecutor::new())
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                tracing::debug!(%peer, error = %e, "connection closed with error");
            }
        });
    }
}
