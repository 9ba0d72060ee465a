//! Hypixel API client, Bedwars modes, and stat-reply rendering.

use anyhow::{bail, Context};
use serde::Deserialize;
use serde_json::Value;

const PLAYER_URL: &str = "https://api.hypixel.net/v2/player";

/// The literal prefix a chat packet carrying embedded `/locraw` output
/// starts with: a JSON chat document whose `text` field is itself a nested
/// JSON string.
pub const LOCRAW_PREFIX: &str = r#"{"text":"{\"server\""#;

/// The location document Hypixel sends in response to `/locraw`.
#[derive(Debug, Clone, Deserialize)]
pub struct Locraw {
    #[serde(default)]
    pub server: String,
    #[serde(default)]
    pub gametype: String,
    #[serde(default)]
    pub mode: String,
}

/// A Bedwars queue type.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BedwarsMode {
    Solo,
    Doubles,
    Threes,
    Fours,
    FourVersusFour,
}

impl BedwarsMode {
    /// Parses the short form users type in `/sc <mode> <player>`.
    pub fn from_command(s: &str) -> Option<Self> {
        match s {
            "solo" => Some(Self::Solo),
            "doubles" => Some(Self::Doubles),
            "3v3v3v3" => Some(Self::Threes),
            "4v4v4v4" => Some(Self::Fours),
            "4v4" => Some(Self::FourVersusFour),
            _ => None,
        }
    }

    /// Parses the mode identifier from a `/locraw` document.
    pub fn from_locraw(s: &str) -> Option<Self> {
        match s {
            "BEDWARS_EIGHT_ONE" => Some(Self::Solo),
            "BEDWARS_EIGHT_TWO" => Some(Self::Doubles),
            "BEDWARS_FOUR_THREE" => Some(Self::Threes),
            "BEDWARS_FOUR_FOUR" => Some(Self::Fours),
            "BEDWARS_TWO_FOUR" => Some(Self::FourVersusFour),
            _ => None,
        }
    }

    /// Field-name prefix in the Bedwars stats object.
    fn stat_prefix(self) -> &'static str {
        match self {
            Self::Solo => "eight_one",
            Self::Doubles => "eight_two",
            Self::Threes => "four_three",
            Self::Fours => "four_four",
            Self::FourVersusFour => "two_four",
        }
    }

    /// Capitalized mode word used in the stats header.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Solo => "Solo",
            Self::Doubles => "Doubles",
            Self::Threes => "3v3v3v3",
            Self::Fours => "4v4v4v4",
            Self::FourVersusFour => "4v4",
        }
    }
}

/// Per-mode Bedwars statistics for one player.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BedwarsStats {
    pub stars: i64,
    pub kills: i64,
    pub deaths: i64,
    pub final_kills: i64,
    pub final_deaths: i64,
    pub wins: i64,
    pub losses: i64,
    pub winstreak: i64,
    pub beds_broken: i64,
}

impl BedwarsStats {
    /// Renders the five-line chat reply. The whitespace runs are part of
    /// the bytes sent to the client; column alignment depends on them.
    pub fn render(&self, mode: BedwarsMode, name: &str) -> String {
        let kd = self.kills as f32 / self.deaths as f32;
        let final_kd = self.final_kills as f32 / self.final_deaths as f32;
        let wl = self.wins as f32 / self.losses as f32;
        format!(
            "§6§l{mode} Bedwars Stats for §b§l[{stars}✫] {name}§r\n\
             §aKills: §f{kills}           §cDeaths: §f{deaths}            §aK§f/§cD: §f{kd}\n\
             §5Final §2Kills: §f{final_kills}   §5Final §4Deaths: §f{final_deaths}   §5Final §2K§f/§4D: §f{final_kd}\n\
             §aWins: §f{wins}         §cLosses: §f{losses}                §aW§f/§cL: §f{wl}\n\
             §bWinstreak: §f{winstreak}   §3Beds Broken: §f{beds_broken}",
            mode = mode.display_name(),
            stars = self.stars,
            kills = self.kills,
            deaths = self.deaths,
            final_kills = self.final_kills,
            final_deaths = self.final_deaths,
            wins = self.wins,
            losses = self.losses,
            winstreak = self.winstreak,
            beds_broken = self.beds_broken,
        )
    }
}

/// Client for the Hypixel player API.
pub struct HypixelClient {
    api_key: String,
    http: reqwest::Client,
}

impl HypixelClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            http: reqwest::Client::new(),
        }
    }

    /// Probes the configured key. Hypixel answers 422 (malformed uuid) when
    /// the key itself is accepted; any other status means the key is bad.
    pub async fn test_key(&self) -> anyhow::Result<()> {
        let response = self
            .http
            .get(PLAYER_URL)
            .query(&[("uuid", "0")])
            .header("API-Key", &self.api_key)
            .send()
            .await
            .context("Hypixel API key probe failed")?;
        if response.status().as_u16() != 422 {
            bail!("invalid Hypixel API key (status {})", response.status());
        }
        Ok(())
    }

    /// Fetches a player's Bedwars statistics for one mode.
    pub async fn bedwars_stats(
        &self,
        uuid: &str,
        mode: BedwarsMode,
    ) -> anyhow::Result<BedwarsStats> {
        let response = self
            .http
            .get(PLAYER_URL)
            .query(&[("uuid", uuid)])
            .header("API-Key", &self.api_key)
            .send()
            .await
            .context("Hypixel player request failed")?;
        if !response.status().is_success() {
            bail!("bad response from the Hypixel API ({})", response.status());
        }
        let body: Value = response
            .json()
            .await
            .context("Hypixel player response is not JSON")?;
        Ok(extract_bedwars_stats(&body, mode))
    }
}

/// Pulls the per-mode integer fields out of a player document. Absent
/// fields read as zero; Hypixel omits stats the player never touched.
fn extract_bedwars_stats(body: &Value, mode: BedwarsMode) -> BedwarsStats {
    let prefix = mode.stat_prefix();
    let stat = |suffix: &str| {
        body.pointer(&format!("/player/stats/Bedwars/{prefix}_{suffix}"))
            .and_then(Value::as_i64)
            .unwrap_or(0)
    };
    BedwarsStats {
        stars: body
            .pointer("/player/achievements/bedwars_level")
            .and_then(Value::as_i64)
            .unwrap_or(0),
        kills: stat("kills_bedwars"),
        deaths: stat("deaths_bedwars"),
        final_kills: stat("final_kills_bedwars"),
        final_deaths: stat("final_deaths_bedwars"),
        wins: stat("wins_bedwars"),
        losses: stat("losses_bedwars"),
        winstreak: stat("winstreak"),
        beds_broken: stat("beds_broken_bedwars"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn mode_tables() {
        assert_eq!(BedwarsMode::from_command("doubles"), Some(BedwarsMode::Doubles));
        assert_eq!(BedwarsMode::from_command("4v4"), Some(BedwarsMode::FourVersusFour));
        assert_eq!(BedwarsMode::from_command("ranked"), None);
        assert_eq!(
            BedwarsMode::from_locraw("BEDWARS_FOUR_FOUR"),
            Some(BedwarsMode::Fours)
        );
        assert_eq!(BedwarsMode::from_locraw("SKYWARS_RANKED"), None);
    }

    #[test]
    fn locraw_document_parses() {
        let locraw: Locraw = serde_json::from_str(
            r#"{"server":"mini121A","gametype":"BEDWARS","mode":"BEDWARS_EIGHT_TWO","map":"Lotus"}"#,
        )
        .unwrap();
        assert_eq!(locraw.server, "mini121A");
        assert_eq!(locraw.gametype, "BEDWARS");
        assert_eq!(locraw.mode, "BEDWARS_EIGHT_TWO");
    }

    #[test]
    fn locraw_lobby_document_has_empty_mode() {
        let locraw: Locraw =
            serde_json::from_str(r#"{"server":"lobby42","lobbyname":"bedwarslobby7"}"#).unwrap();
        assert!(locraw.gametype.is_empty());
        assert!(locraw.mode.is_empty());
    }

    #[test]
    fn extracts_mode_specific_fields() {
        let body = json!({
            "success": true,
            "player": {
                "achievements": { "bedwars_level": 120 },
                "stats": {
                    "Bedwars": {
                        "eight_two_kills_bedwars": 400,
                        "eight_two_deaths_bedwars": 200,
                        "eight_two_final_kills_bedwars": 90,
                        "eight_two_final_deaths_bedwars": 30,
                        "eight_two_wins_bedwars": 70,
                        "eight_two_losses_bedwars": 35,
                        "eight_two_winstreak": 5,
                        "eight_two_beds_broken_bedwars": 88,
                        "four_four_kills_bedwars": 1
                    }
                }
            }
        });
        let stats = extract_bedwars_stats(&body, BedwarsMode::Doubles);
        assert_eq!(
            stats,
            BedwarsStats {
                stars: 120,
                kills: 400,
                deaths: 200,
                final_kills: 90,
                final_deaths: 30,
                wins: 70,
                losses: 35,
                winstreak: 5,
                beds_broken: 88,
            }
        );

        let other = extract_bedwars_stats(&body, BedwarsMode::Fours);
        assert_eq!(other.kills, 1);
        assert_eq!(other.deaths, 0);
    }

    #[test]
    fn render_matches_wire_format() {
        let stats = BedwarsStats {
            stars: 120,
            kills: 400,
            deaths: 200,
            final_kills: 90,
            final_deaths: 30,
            wins: 70,
            losses: 35,
            winstreak: 5,
            beds_broken: 88,
        };
        let rendered = stats.render(BedwarsMode::Doubles, "Notch");
        let expected = "§6§lDoubles Bedwars Stats for §b§l[120✫] Notch§r\n\
                        §aKills: §f400           §cDeaths: §f200            §aK§f/§cD: §f2\n\
                        §5Final §2Kills: §f90   §5Final §4Deaths: §f30   §5Final §2K§f/§4D: §f3\n\
                        §aWins: §f70         §cLosses: §f35                §aW§f/§cL: §f2\n\
                        §bWinstreak: §f5   §3Beds Broken: §f88";
        assert_eq!(rendered, expected);
    }

    #[test]
    fn render_division_by_zero_is_visible() {
        let stats = BedwarsStats {
            kills: 10,
            ..Default::default()
        };
        let rendered = stats.render(BedwarsMode::Solo, "Notch");
        // 10 kills over 0 deaths; the non-finite ratio is shown as-is
        assert!(rendered.contains("§aK§f/§cD: §finf"));
        // 0 final kills over 0 final deaths
        assert!(rendered.contains("§5Final §2K§f/§4D: §fNaN"));
    }
}
