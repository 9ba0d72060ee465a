//! The accept loop: one session per client connection.

use crate::{config::Args, session, session::SessionContext};
use anyhow::Context;
use std::{io, net::SocketAddr};
use tokio::net::TcpListener;

pub struct Listener {
    listener: TcpListener,
    context: SessionContext,
}

impl Listener {
    /// Binds the listen socket.
    pub async fn bind(args: &Args, context: SessionContext) -> anyhow::Result<Self> {
        let listen_addr = format!("{}:{}", args.listen_host, args.listen_port);
        let listener = TcpListener::bind(&listen_addr)
            .await
            .with_context(|| format!("failed to listen on {listen_addr}"))?;
        Ok(Self { listener, context })
    }

    /// The address the proxy is actually bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections forever, spawning a session per client.
    pub async fn run(self) -> anyhow::Result<()> {
        tracing::info!(
            "proxy listening on {}, forwarding to {}:{}",
            self.local_addr()?,
            self.context.forward_host,
            self.context.forward_port
        );
        loop {
            let (client_stream, remote_addr) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    tracing::warn!("failed to accept connection: {e}");
                    continue;
                }
            };
            tracing::info!("accepted connection from {remote_addr}");
            tokio::spawn(session::run(client_stream, self.context.clone()));
        }
    }
}
