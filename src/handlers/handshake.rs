//! Rewrites the client's handshake so the upstream server sees its own
//! canonical address rather than the proxy's listen address.

use crate::{
    protocol::{packets::Handshake, Decoder, PROTOCOL_VERSION},
    session::{ConnectionState, Session},
};
use anyhow::bail;

pub async fn handle(session: &Session, decoder: &mut Decoder<'_>) -> anyhow::Result<()> {
    let handshake = Handshake::decode(decoder)?;

    if handshake.protocol_version != PROTOCOL_VERSION {
        bail!(
            "unsupported protocol version {} (this proxy only supports 47, i.e. 1.8.x)",
            handshake.protocol_version
        );
    }
    let next_state = match handshake.next_state {
        1 => ConnectionState::Status,
        2 => ConnectionState::Login,
        other => bail!("unhandled handshake intent {other}"),
    };

    let rewritten = Handshake {
        server_address: session.context.forward_host.clone(),
        server_port: session.context.forward_port,
        ..handshake
    };
    session
        .server_writer
        .lock()
        .await
        .write_frame(&rewritten.encode(), session.threshold())
        .await?;

    session.set_state(next_state);
    tracing::debug!(state = ?next_state, "handshake rewritten and forwarded");
    Ok(())
}
