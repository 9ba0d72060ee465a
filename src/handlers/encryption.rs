//! Handles the server's Encryption Request on behalf of the client.
//!
//! The proxy completes the entire key exchange itself: it generates the
//! shared secret, authenticates the operator's session with Mojang, and
//! answers with an Encryption Response. The request is never forwarded,
//! so the client keeps talking plaintext while the upstream leg switches
//! to AES/CFB8.

use crate::{
    mojang,
    protocol::{
        crypto::EncryptionKey,
        framing::FrameReader,
        packets::{self, EncryptionRequest},
        Decoder,
    },
    session::Session,
};
use anyhow::Context;
use rand::{rngs::OsRng, RngCore};
use rsa::{pkcs8::DecodePublicKey, Pkcs1v15Encrypt, RsaPublicKey};
use tokio::net::tcp::OwnedReadHalf;

pub async fn handle(
    session: &Session,
    reader: &mut FrameReader<OwnedReadHalf>,
    decoder: &mut Decoder<'_>,
) -> anyhow::Result<()> {
    let request = EncryptionRequest::decode(decoder)?;
    let public_key = RsaPublicKey::from_public_key_der(&request.public_key)
        .context("server sent an invalid RSA public key")?;

    let mut shared_secret = [0u8; 16];
    OsRng.fill_bytes(&mut shared_secret);

    let digest = mojang::server_hash(&request.server_id, &shared_secret, &request.public_key);
    session
        .context
        .mojang
        .join_server(&session.context.access_token, &session.context.uuid, &digest)
        .await?;

    let encrypted_secret = public_key
        .encrypt(&mut OsRng, Pkcs1v15Encrypt, &shared_secret)
        .context("failed to encrypt the shared secret")?;
    let encrypted_token = public_key
        .encrypt(&mut OsRng, Pkcs1v15Encrypt, &request.verify_token)
        .context("failed to encrypt the verify token")?;
    let response = packets::encryption_response(&encrypted_secret, &encrypted_token);

    let key = EncryptionKey::new(shared_secret);
    {
        // The response itself goes out in plaintext; every byte after it is
        // encrypted. Holding the writer lock across both steps keeps the
        // switch atomic with respect to the client→server pipe.
        let mut writer = session.server_writer.lock().await;
        writer.write_frame(&response, session.threshold()).await?;
        writer.enable_encryption(key);
    }
    reader.enable_decryption(key);

    tracing::debug!("enabled upstream encryption");
    Ok(())
}
