//! HTTP server implementation

use crate::handlers::handle_request;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};
use userbase_core::UserService;

pub struct UserbaseServer {
    service: UserService,
}

impl UserbaseServer {
    pub fn new(service: UserService) -> Self {
        Self { service }
    }

    /// Bind `addr` and serve until Ctrl-C
    pub async fn serve(self, addr: SocketAddr) -> anyhow::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        self.run(listener, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await
    }

    /// Accept connections on `listener` until `shutdown` completes
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()>,
    ) -> anyhow::Result<()> {
        info!("userbase server listening on {}", listener.local_addr()?);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, remote_addr) = accepted?;
                    debug!("New connection from {}", remote_addr);

                    let service = self.service.clone();
                    tokio::spawn(async move {
                        if let Err(err) = Self::handle_connection(stream, service).await {
                            error!("Connection error from {}: {}", remote_addr, err);
                        }
                    });
                }
                _ = &mut shutdown => {
                    info!("Shutdown signal received, no longer accepting connections");
                    return Ok(());
                }
            }
        }
    }

    async fn handle_connection(
        stream: TcpStream,
        service: UserService,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let io = TokioIo::new(stream);

        let svc = service_fn(move |req| {
            let service = service.clone();
            async move { handle_request(req, service).await }
        });

        auto::Builder::new(TokioExecutor::new())
            .serve_connection(io, svc)
            .await
    }
}
