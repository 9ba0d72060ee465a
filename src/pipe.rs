//! The per-direction relay loop: read a frame, dispatch it, forward it.

use crate::{
    handlers::{self, Disposition},
    protocol::{
        framing::{FrameError, FrameReader},
        packets::id,
        Decoder,
    },
    session::{ConnectionState, Session},
};
use std::sync::Arc;
use tokio::net::tcp::OwnedReadHalf;

/// Direction of one pipe.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Direction {
    ClientToServer,
    ServerToClient,
}

/// One half of a session: reads frames from its source and re-emits them
/// through the session's writer for the opposite peer.
pub struct Pipe {
    session: Arc<Session>,
    reader: FrameReader<OwnedReadHalf>,
    direction: Direction,
}

impl Pipe {
    pub fn new(session: Arc<Session>, source: OwnedReadHalf, direction: Direction) -> Self {
        Self {
            session,
            reader: FrameReader::new(source),
            direction,
        }
    }

    /// Runs the relay loop until the peer disconnects or the session dies.
    pub async fn run(mut self) {
        if let Err(e) = self.relay_loop().await {
            match e.downcast_ref::<FrameError>() {
                Some(frame_error) if frame_error.is_disconnect() => {
                    tracing::debug!(direction = ?self.direction, "peer disconnected");
                    self.session.exit.peer_disconnected();
                }
                _ => {
                    tracing::error!(direction = ?self.direction, "session error: {e:#}");
                    self.session.exit.abort();
                }
            }
        }
    }

    async fn relay_loop(&mut self) -> anyhow::Result<()> {
        loop {
            let frame = self.reader.read_frame(self.session.threshold()).await?;
            if frame.length == 0 {
                tracing::debug!("skipping zero-length frame");
                continue;
            }
            self.dispatch(frame.payload).await?;
        }
    }

    async fn dispatch(&mut self, payload: Vec<u8>) -> anyhow::Result<()> {
        let mut decoder = Decoder::new(&payload);
        let packet_id = decoder.read_var_int()?;

        match (self.session.state(), self.direction) {
            (ConnectionState::Handshaking, Direction::ClientToServer)
                if packet_id == id::HANDSHAKE =>
            {
                return handlers::handshake::handle(&self.session, &mut decoder).await;
            }
            (ConnectionState::Login, Direction::ServerToClient) => match packet_id {
                id::ENCRYPTION_REQUEST => {
                    // Consumed: the client never learns that the upstream
                    // leg is encrypted.
                    return handlers::encryption::handle(
                        &self.session,
                        &mut self.reader,
                        &mut decoder,
                    )
                    .await;
                }
                id::LOGIN_SUCCESS => {
                    self.session.set_state(ConnectionState::Play);
                    tracing::debug!("login success, switched to the Play state");
                }
                _ => {}
            },
            (ConnectionState::Play, direction) => {
                let disposition = match (direction, packet_id) {
                    (Direction::ServerToClient, id::PLUGIN_MESSAGE) => {
                        handlers::play::plugin_message(&self.session, &mut decoder)?
                    }
                    (Direction::ClientToServer, id::SERVERBOUND_CHAT)
                        if self.session.is_hypixel() =>
                    {
                        handlers::play::serverbound_chat(&self.session, &mut decoder).await?
                    }
                    (Direction::ServerToClient, id::CLIENTBOUND_CHAT)
                        if self.session.is_hypixel() =>
                    {
                        handlers::play::clientbound_chat(&self.session, &mut decoder)?
                    }
                    (Direction::ServerToClient, id::RESPAWN) if self.session.is_hypixel() => {
                        handlers::play::respawn(&self.session, &mut decoder).await?
                    }
                    _ => Disposition::Forward,
                };
                if disposition == Disposition::Consume {
                    return Ok(());
                }
            }
            _ => {}
        }

        self.forward(&payload).await?;

        // The new threshold applies only to packets after the Set
        // Compression frame itself, which always travels under the old rule.
        if self.session.state() == ConnectionState::Login
            && self.direction == Direction::ServerToClient
            && packet_id == id::SET_COMPRESSION
        {
            let threshold = decoder.read_var_int()?;
            self.session.set_threshold(threshold);
            tracing::debug!(threshold, "compression threshold set");
        }

        Ok(())
    }

    async fn forward(&self, payload: &[u8]) -> Result<(), FrameError> {
        let threshold = self.session.threshold();
        match self.direction {
            Direction::ClientToServer => {
                self.session
                    .server_writer
                    .lock()
                    .await
                    .write_frame(payload, threshold)
                    .await
            }
            Direction::ServerToClient => {
                self.session
                    .client_writer
                    .lock()
                    .await
                    .write_frame(payload, threshold)
                    .await
            }
        }
    }
}
