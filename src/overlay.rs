//! Shared state read by the heads-up overlay window.
//!
//! The window itself lives outside the core: it snapshots this state at a
//! low refresh rate (about 5 Hz) and renders it. The proxy side only ever
//! writes through the setters, so both locks are read-biased.

use crate::hypixel::BedwarsMode;
use std::{collections::HashMap, sync::RwLock};

/// Display order for team upgrades.
pub const UPGRADE_ORDER: [&str; 6] = [
    "sharp",
    "prot",
    "haste",
    "forge",
    "healpool",
    "featherfalling",
];

/// One purchased team upgrade as the overlay shows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upgrade {
    pub label: &'static str,
    /// Price of the next tier in diamonds; zero when maxed.
    pub next_price: i32,
}

/// Concurrent state the overlay window reads.
#[derive(Default)]
pub struct OverlayState {
    upgrades: RwLock<HashMap<&'static str, Upgrade>>,
    traps: RwLock<Vec<String>>,
}

impl OverlayState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_upgrade(&self, key: &'static str, upgrade: Upgrade) {
        self.upgrades.write().unwrap().insert(key, upgrade);
    }

    pub fn push_trap(&self, trap: String) {
        self.traps.write().unwrap().push(trap);
    }

    /// Resets everything, e.g. when a new game starts.
    pub fn clear(&self) {
        self.upgrades.write().unwrap().clear();
        self.traps.write().unwrap().clear();
    }

    /// Snapshot of the purchased upgrades in display order.
    pub fn upgrades(&self) -> Vec<(&'static str, Upgrade)> {
        let upgrades = self.upgrades.read().unwrap();
        UPGRADE_ORDER
            .iter()
            .filter_map(|&key| upgrades.get(key).map(|upgrade| (key, upgrade.clone())))
            .collect()
    }

    /// Snapshot of the queued traps in purchase order.
    pub fn traps(&self) -> Vec<String> {
        self.traps.read().unwrap().clone()
    }
}

/// Maps a Hypixel upgrade-purchase line to the overlay key, display label,
/// and the price of the next tier. Tier prices differ between the small
/// modes (Solo, Doubles) and the team modes.
pub fn upgrade_info(upgrade: &str, mode: BedwarsMode) -> Option<(&'static str, Upgrade)> {
    let small = matches!(mode, BedwarsMode::Solo | BedwarsMode::Doubles);
    let pick = |a: i32, b: i32| if small { a } else { b };

    let (key, label, next_price) = if upgrade == "Sharpened Swords" {
        ("sharp", "Sharpened Swords", 0)
    } else if upgrade.starts_with("Reinforced Armor") {
        if upgrade.ends_with(" I") {
            ("prot", "Reinforced Armor 1", pick(4, 10))
        } else if upgrade.ends_with(" II") {
            ("prot", "Reinforced Armor 2", pick(8, 20))
        } else if upgrade.ends_with(" III") {
            ("prot", "Reinforced Armor 3", pick(16, 30))
        } else if upgrade.ends_with(" IV") {
            ("prot", "Reinforced Armor 4", 0)
        } else {
            return None;
        }
    } else if upgrade.starts_with("Maniac Miner") {
        if upgrade.ends_with(" I") {
            ("haste", "Maniac Miner 1", pick(4, 6))
        } else if upgrade.ends_with(" II") {
            ("haste", "Maniac Miner 2", 0)
        } else {
            return None;
        }
    } else if upgrade.ends_with("Forge") {
        if upgrade.starts_with("Iron") {
            ("forge", "Iron Forge", pick(4, 8))
        } else if upgrade.starts_with("Gold") {
            ("forge", "Gold Forge", pick(6, 12))
        } else if upgrade.starts_with("Emerald") {
            ("forge", "Emerald Forge", pick(8, 16))
        } else if upgrade.starts_with("Molten") {
            ("forge", "Molten Forge", 0)
        } else {
            return None;
        }
    } else if upgrade == "Heal Pool" {
        ("healpool", "Heal Pool", 0)
    } else if upgrade.starts_with("Cushioned Boots") {
        if upgrade.ends_with(" I") {
            ("featherfalling", "Cushioned Boots 1", pick(2, 4))
        } else if upgrade.ends_with(" II") {
            ("featherfalling", "Cushioned Boots 2", 0)
        } else {
            return None;
        }
    } else {
        return None;
    };

    Some((key, Upgrade { label, next_price }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roman_numeral_suffixes_disambiguate() {
        let (_, tier1) = upgrade_info("Reinforced Armor I", BedwarsMode::Solo).unwrap();
        let (_, tier2) = upgrade_info("Reinforced Armor II", BedwarsMode::Solo).unwrap();
        let (_, tier4) = upgrade_info("Reinforced Armor IV", BedwarsMode::Solo).unwrap();
        assert_eq!(tier1.label, "Reinforced Armor 1");
        assert_eq!(tier1.next_price, 4);
        assert_eq!(tier2.label, "Reinforced Armor 2");
        assert_eq!(tier2.next_price, 8);
        assert_eq!(tier4.next_price, 0);
    }

    #[test]
    fn prices_differ_by_mode() {
        let (_, small) = upgrade_info("Iron Forge", BedwarsMode::Doubles).unwrap();
        let (_, team) = upgrade_info("Iron Forge", BedwarsMode::Fours).unwrap();
        assert_eq!(small.next_price, 4);
        assert_eq!(team.next_price, 8);
    }

    #[test]
    fn unknown_lines_are_ignored() {
        assert!(upgrade_info("Dream Defender", BedwarsMode::Solo).is_none());
        assert!(upgrade_info("Reinforced Armor V", BedwarsMode::Solo).is_none());
    }

    #[test]
    fn state_snapshot_follows_display_order() {
        let state = OverlayState::new();
        let (key, upgrade) = upgrade_info("Heal Pool", BedwarsMode::Fours).unwrap();
        state.set_upgrade(key, upgrade);
        let (key, upgrade) = upgrade_info("Sharpened Swords", BedwarsMode::Fours).unwrap();
        state.set_upgrade(key, upgrade);
        state.push_trap("It's a trap!".to_owned());

        let upgrades = state.upgrades();
        assert_eq!(upgrades.len(), 2);
        // "sharp" sorts before "healpool" in the fixed display order
        assert_eq!(upgrades[0].0, "sharp");
        assert_eq!(upgrades[1].0, "healpool");
        assert_eq!(state.traps(), ["It's a trap!"]);

        state.clear();
        assert!(state.upgrades().is_empty());
        assert!(state.traps().is_empty());
    }
}
