//! Play-state handlers: brand sniffing, the `/sc` stat-check command,
//! locraw capture, and respawn-triggered location refresh.

use super::Disposition;
use crate::{
    hypixel::{BedwarsMode, Locraw, LOCRAW_PREFIX},
    protocol::{
        decoder,
        framing::FrameError,
        packets::{self, ChatMessage, ChatPosition, PluginMessage},
        Decoder,
    },
    session::Session,
};

const STAT_CHECK_PREFIX: &str = "§bGoMCProxy StatCheck: §c";

/// Watches `MC|Brand` plugin messages for the Hypixel server brand. A
/// matching message is swallowed; everything else passes through.
pub fn plugin_message(
    session: &Session,
    decoder: &mut Decoder<'_>,
) -> decoder::Result<Disposition> {
    let message = PluginMessage::decode(decoder)?;
    if message.channel == "MC|Brand"
        && String::from_utf8_lossy(&message.data).contains("Hypixel")
    {
        session.set_hypixel(true);
        tracing::info!("upstream identified itself as Hypixel");
        return Ok(Disposition::Consume);
    }
    Ok(Disposition::Forward)
}

/// Intercepts serverbound chat. `/sc …` never reaches the server; the
/// reply (or the error) is injected as a clientbound chat message.
pub async fn serverbound_chat(
    session: &Session,
    decoder: &mut Decoder<'_>,
) -> anyhow::Result<Disposition> {
    let message = decoder.read_string()?;
    if !message.starts_with("/sc") {
        return Ok(Disposition::Forward);
    }
    let message = message.to_owned();
    stat_check(session, &message).await?;
    Ok(Disposition::Consume)
}

async fn stat_check(session: &Session, message: &str) -> anyhow::Result<()> {
    let Some(hypixel) = &session.context.hypixel else {
        return reply_error(session, "Hypixel API features have been disabled").await;
    };

    let args: Vec<&str> = message.split(' ').collect();
    let (mode, name) = match args.len() {
        2 => match session.bedwars_mode() {
            Some(mode) => (mode, args[1]),
            None => return reply_error(session, "Invalid amount of arguments").await,
        },
        3 => match BedwarsMode::from_command(&args[1].to_lowercase()) {
            Some(mode) => (mode, args[2]),
            None => return reply_error(session, "Invalid bedwars type").await,
        },
        _ => return reply_error(session, "Invalid amount of arguments").await,
    };

    let profile = match session.context.mojang.player_profile(name).await {
        Ok(profile) => profile,
        Err(e) => {
            tracing::debug!("profile lookup for {name} failed: {e:#}");
            return reply_error(session, "Invalid player").await;
        }
    };

    let stats = match hypixel.bedwars_stats(&profile.id, mode).await {
        Ok(stats) => stats,
        Err(e) => {
            tracing::debug!("stats lookup for {} failed: {e:#}", profile.name);
            return reply_error(
                session,
                "An error occurred while fetching the bedwars stats",
            )
            .await;
        }
    };

    send_chat(session, &stats.render(mode, &profile.name)).await?;
    Ok(())
}

async fn reply_error(session: &Session, error: &str) -> anyhow::Result<()> {
    send_chat(session, &format!("{STAT_CHECK_PREFIX}{error}")).await?;
    Ok(())
}

async fn send_chat(session: &Session, text: &str) -> Result<(), FrameError> {
    let payload = packets::clientbound_chat(text, ChatPosition::Chat);
    session
        .client_writer
        .lock()
        .await
        .write_frame(&payload, session.threshold())
        .await
}

/// Watches clientbound system messages for embedded `/locraw` output and
/// tracks the current Bedwars mode from it. A fully parsed locraw document
/// is swallowed; anything else (including parse failures) passes through.
pub fn clientbound_chat(
    session: &Session,
    decoder: &mut Decoder<'_>,
) -> decoder::Result<Disposition> {
    let raw = decoder.read_string()?;
    if !raw.starts_with(LOCRAW_PREFIX) {
        return Ok(Disposition::Forward);
    }
    let Ok(outer) = serde_json::from_str::<ChatMessage>(raw) else {
        return Ok(Disposition::Forward);
    };
    let Ok(locraw) = serde_json::from_str::<Locraw>(&outer.text) else {
        return Ok(Disposition::Forward);
    };

    if locraw.gametype == "BEDWARS" && !locraw.mode.is_empty() {
        if let Some(mode) = BedwarsMode::from_locraw(&locraw.mode) {
            session.set_bedwars_mode(Some(mode));
            tracing::debug!(?mode, server = %locraw.server, "bedwars mode updated from locraw");
        }
    } else {
        session.set_bedwars_mode(None);
    }
    Ok(Disposition::Consume)
}

/// On a respawn into dimension -1 (the Hypixel lobby transition), asks the
/// server where we landed. The Respawn packet itself is still forwarded.
pub async fn respawn(
    session: &Session,
    decoder: &mut Decoder<'_>,
) -> anyhow::Result<Disposition> {
    let dimension = decoder.read_i32()?;
    if dimension == -1 {
        let payload = packets::serverbound_chat("/locraw");
        session
            .server_writer
            .lock()
            .await
            .write_frame(&payload, session.threshold())
            .await?;
        tracing::debug!("injected /locraw after respawn");
    }
    Ok(Disposition::Forward)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        protocol::{framing::FrameReader, Encoder},
        session::testing::loopback_session,
    };

    fn string_payload(s: &str) -> Vec<u8> {
        let mut payload = Vec::new();
        Encoder::new(&mut payload).write_string(s);
        payload
    }

    #[tokio::test]
    async fn brand_message_sets_hypixel_flag() {
        let (session, _client, _server) = loopback_session().await;

        let mut payload = Vec::new();
        let mut encoder = Encoder::new(&mut payload);
        encoder.write_string("MC|Brand");
        encoder.write_string("Hypixel BungeeCord");
        let disposition = plugin_message(&session, &mut Decoder::new(&payload)).unwrap();
        assert_eq!(disposition, Disposition::Consume);
        assert!(session.is_hypixel());
    }

    #[tokio::test]
    async fn other_brands_pass_through() {
        let (session, _client, _server) = loopback_session().await;

        let mut payload = Vec::new();
        let mut encoder = Encoder::new(&mut payload);
        encoder.write_string("MC|Brand");
        encoder.write_string("vanilla");
        let disposition = plugin_message(&session, &mut Decoder::new(&payload)).unwrap();
        assert_eq!(disposition, Disposition::Forward);
        assert!(!session.is_hypixel());

        let mut payload = Vec::new();
        let mut encoder = Encoder::new(&mut payload);
        encoder.write_string("REGISTER");
        encoder.write_string("Hypixel");
        let disposition = plugin_message(&session, &mut Decoder::new(&payload)).unwrap();
        assert_eq!(disposition, Disposition::Forward);
        assert!(!session.is_hypixel());
    }

    #[tokio::test]
    async fn locraw_updates_mode_and_is_consumed() {
        let (session, _client, _server) = loopback_session().await;

        let raw =
            r#"{"text":"{\"server\":\"s\",\"gametype\":\"BEDWARS\",\"mode\":\"BEDWARS_FOUR_FOUR\"}"}"#;
        let payload = string_payload(raw);
        let disposition = clientbound_chat(&session, &mut Decoder::new(&payload)).unwrap();
        assert_eq!(disposition, Disposition::Consume);
        assert_eq!(session.bedwars_mode(), Some(BedwarsMode::Fours));
    }

    #[tokio::test]
    async fn locraw_outside_bedwars_clears_mode() {
        let (session, _client, _server) = loopback_session().await;
        session.set_bedwars_mode(Some(BedwarsMode::Doubles));

        let raw = r#"{"text":"{\"server\":\"lobby1\",\"gametype\":\"MAIN\",\"mode\":\"\"}"}"#;
        let payload = string_payload(raw);
        let disposition = clientbound_chat(&session, &mut Decoder::new(&payload)).unwrap();
        assert_eq!(disposition, Disposition::Consume);
        assert_eq!(session.bedwars_mode(), None);
    }

    #[tokio::test]
    async fn garbled_locraw_is_forwarded() {
        let (session, _client, _server) = loopback_session().await;
        session.set_bedwars_mode(Some(BedwarsMode::Doubles));

        let raw = r#"{"text":"{\"server\" oops"}"#;
        let payload = string_payload(raw);
        let disposition = clientbound_chat(&session, &mut Decoder::new(&payload)).unwrap();
        assert_eq!(disposition, Disposition::Forward);
        // mode is left alone
        assert_eq!(session.bedwars_mode(), Some(BedwarsMode::Doubles));
    }

    #[tokio::test]
    async fn ordinary_chat_is_forwarded() {
        let (session, _client, _server) = loopback_session().await;
        let payload = string_payload(r#"{"text":"hello"}"#);
        let disposition = clientbound_chat(&session, &mut Decoder::new(&payload)).unwrap();
        assert_eq!(disposition, Disposition::Forward);
    }

    #[tokio::test]
    async fn stat_check_without_api_key_replies_disabled() {
        let (session, client_remote, _server) = loopback_session().await;

        let payload = string_payload("/sc Notch");
        let disposition = serverbound_chat(&session, &mut Decoder::new(&payload))
            .await
            .unwrap();
        assert_eq!(disposition, Disposition::Consume);

        let mut reader = FrameReader::new(client_remote);
        let frame = reader.read_frame(-1).await.unwrap();
        let mut decoder = Decoder::new(&frame.payload);
        assert_eq!(decoder.read_var_int().unwrap(), packets::id::CLIENTBOUND_CHAT);
        let json = decoder.read_string().unwrap();
        assert!(json.contains("GoMCProxy StatCheck"));
        assert!(json.contains("Hypixel API features have been disabled"));
        assert_eq!(decoder.read_u8().unwrap(), ChatPosition::Chat as u8);
    }

    #[tokio::test]
    async fn non_command_chat_is_forwarded() {
        let (session, _client, _server) = loopback_session().await;
        let payload = string_payload("hello world");
        let disposition = serverbound_chat(&session, &mut Decoder::new(&payload))
            .await
            .unwrap();
        assert_eq!(disposition, Disposition::Forward);
    }

    #[tokio::test]
    async fn respawn_into_the_void_injects_locraw() {
        let (session, _client, server_remote) = loopback_session().await;

        let mut payload = Vec::new();
        let mut encoder = Encoder::new(&mut payload);
        encoder.write_i32(-1);
        encoder.write_u8(0); // difficulty
        let disposition = respawn(&session, &mut Decoder::new(&payload)).await.unwrap();
        assert_eq!(disposition, Disposition::Forward);

        let mut reader = FrameReader::new(server_remote);
        let frame = reader.read_frame(-1).await.unwrap();
        assert_eq!(frame.payload, packets::serverbound_chat("/locraw"));
    }

    #[tokio::test]
    async fn respawn_elsewhere_injects_nothing() {
        let (session, _client, server_remote) = loopback_session().await;

        let mut payload = Vec::new();
        Encoder::new(&mut payload).write_i32(0);
        let disposition = respawn(&session, &mut Decoder::new(&payload)).await.unwrap();
        assert_eq!(disposition, Disposition::Forward);

        // dropping the session closes the writer; the remote end must see
        // EOF without any frame in front of it
        drop(session);
        let mut reader = FrameReader::new(server_remote);
        assert!(matches!(
            reader.read_frame(-1).await,
            Err(crate::protocol::framing::FrameError::Disconnected)
        ));
    }
}
