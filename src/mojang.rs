//! Mojang session-server and profile API clients.

use anyhow::{anyhow, bail, Context};
use num_bigint::BigInt;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::collections::HashMap;
use tokio::sync::Mutex;

const SESSION_JOIN_URL: &str = "https://sessionserver.mojang.com/session/minecraft/join";
const PROFILE_URL: &str = "https://api.mojang.com/users/profiles/minecraft";

/// Computes the server hash the session server expects: SHA-1 over
/// `server_id || shared_secret || public_key`, rendered as a signed
/// two's-complement hex integer with no leading zeros.
pub fn server_hash(server_id: &str, shared_secret: &[u8], public_key: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(server_id.as_bytes());
    hasher.update(shared_secret);
    hasher.update(public_key);
    BigInt::from_signed_bytes_be(&hasher.finalize()).to_str_radix(16)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JoinRequest<'a> {
    access_token: &'a str,
    /// UUID with the dashes removed.
    selected_profile: String,
    server_id: &'a str,
}

/// A resolved player profile.
#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    /// UUID without dashes.
    pub id: String,
    /// Canonically capitalized player name.
    pub name: String,
}

/// Client for the two Mojang endpoints the proxy needs: the session join
/// during the encryption handshake, and name → profile resolution for the
/// stat-check command.
pub struct MojangClient {
    http: reqwest::Client,
    session_join_url: String,
    profile_url: String,
    /// Name → profile cache, including negative entries. No eviction; the
    /// proxy serves a single user.
    profile_cache: Mutex<HashMap<String, Option<Profile>>>,
}

impl MojangClient {
    pub fn new() -> Self {
        Self::with_endpoints(SESSION_JOIN_URL.to_owned(), PROFILE_URL.to_owned())
    }

    /// Points the client at alternative endpoints (mock servers).
    pub fn with_endpoints(session_join_url: String, profile_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            session_join_url,
            profile_url,
            profile_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Authenticates the operator's session against the server hash.
    /// Anything but 204 means the access token or UUID is wrong.
    pub async fn join_server(
        &self,
        access_token: &str,
        uuid: &str,
        server_id: &str,
    ) -> anyhow::Result<()> {
        let body = JoinRequest {
            access_token,
            selected_profile: uuid.replace('-', ""),
            server_id,
        };
        let response = self
            .http
            .post(&self.session_join_url)
            .json(&body)
            .send()
            .await
            .context("session join request failed")?;
        if response.status() != StatusCode::NO_CONTENT {
            bail!(
                "Mojang rejected the session join ({}); check the access token and UUID",
                response.status()
            );
        }
        Ok(())
    }

    /// Resolves a player name to its profile. Failed lookups are cached so
    /// a misspelled name is not retried against the API.
    pub async fn player_profile(&self, name: &str) -> anyhow::Result<Profile> {
        if let Some(cached) = self.profile_cache.lock().await.get(name) {
            return cached.clone().ok_or_else(|| anyhow!("invalid player"));
        }

        let profile = self.fetch_profile(name).await;
        self.profile_cache
            .lock()
            .await
            .insert(name.to_owned(), profile.clone());
        profile.ok_or_else(|| anyhow!("invalid player"))
    }

    async fn fetch_profile(&self, name: &str) -> Option<Profile> {
        let response = self
            .http
            .get(format!("{}/{name}", self.profile_url))
            .send()
            .await
            .ok()?;
        if response.status() != StatusCode::OK {
            return None;
        }
        response.json().await.ok()
    }
}

impl Default for MojangClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Known digests for the Minecraft server hash, computed over the bare
    // server id with no secret or key material.
    #[test]
    fn server_hash_positive() {
        assert_eq!(
            server_hash("Notch", &[], &[]),
            "4ed1f46bbe04bc756bcb17c0c7ce3e4632f06a48"
        );
    }

    #[test]
    fn server_hash_negative() {
        assert_eq!(
            server_hash("jeb_", &[], &[]),
            "-7c9d5b0044c130109a5d7b5fb5c317c02b4e28c1"
        );
    }

    #[test]
    fn server_hash_drops_leading_zeros() {
        assert_eq!(
            server_hash("simon", &[], &[]),
            "88e16a1019277b15d58faf0541e11910eb756f6"
        );
    }

    #[test]
    fn server_hash_reverses_to_sha1() {
        // The signed-hex rendering must invert back to the raw SHA-1.
        let digest = server_hash("", &[0u8; 16], &[]);
        let value = BigInt::parse_bytes(digest.as_bytes(), 16).unwrap();
        let mut hasher = Sha1::new();
        hasher.update([0u8; 16]);
        let expected = BigInt::from_signed_bytes_be(&hasher.finalize());
        assert_eq!(value, expected);
    }

    #[test]
    fn join_request_body_shape() {
        let body = JoinRequest {
            access_token: "token",
            selected_profile: "00112233445566778899aabbccddeeff".to_owned(),
            server_id: "-1a2b3c",
        };
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(
            json,
            r#"{"accessToken":"token","selectedProfile":"00112233445566778899aabbccddeeff","serverId":"-1a2b3c"}"#
        );
    }
}
