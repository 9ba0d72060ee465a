//! Command-line configuration.

use anyhow::{bail, Result};
use clap::Parser;

/// Man-in-the-middle proxy for Minecraft 1.8 with Hypixel Bedwars stat
/// checking.
#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub struct Args {
    /// The host to listen on
    #[arg(long = "listenhost", default_value = "127.0.0.1")]
    pub listen_host: String,

    /// The port to listen on
    #[arg(long = "listenport", default_value_t = 25565)]
    pub listen_port: u16,

    /// The host to forward to
    #[arg(long = "forwardhost", default_value = "mc.hypixel.net")]
    pub forward_host: String,

    /// The port to forward to
    #[arg(long = "forwardport", default_value_t = 25565)]
    pub forward_port: u16,

    /// Mojang access token used to join the upstream session
    #[arg(long = "accesstoken", default_value = "")]
    pub access_token: String,

    /// Your Minecraft account's UUID, in the dashed form
    #[arg(long = "uuid", default_value = "")]
    pub uuid: String,

    /// Hypixel API key; stat checking is disabled when absent
    #[arg(long = "hypixel-api-key")]
    pub hypixel_api_key: Option<String>,
}

impl Args {
    /// Startup validation. Failures here terminate the process; this is
    /// the only place that gets to do so.
    pub fn validate(&self) -> Result<()> {
        if self.access_token.is_empty() {
            bail!("no Mojang access token has been provided");
        }
        if self.uuid.is_empty() {
            bail!("no UUID has been provided");
        }
        if !is_dashed_uuid(&self.uuid) {
            bail!("an invalid UUID has been provided");
        }
        Ok(())
    }
}

/// Accepts only the dashed 8-4-4-4-12 hexadecimal layout.
fn is_dashed_uuid(s: &str) -> bool {
    let groups: Vec<&str> = s.split('-').collect();
    groups.len() == 5
        && groups.iter().map(|group| group.len()).eq([8usize, 4, 4, 4, 12])
        && groups
            .iter()
            .all(|group| group.bytes().all(|b| b.is_ascii_hexdigit()))
}
