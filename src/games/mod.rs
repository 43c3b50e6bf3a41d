pub mod bug_smasher;
pub mod memory;
pub mod typing;

use serde::{Deserialize, Serialize};

use crate::score::Metric;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[value(rename_all = "lower")]
pub enum GameKind {
    #[default]
    Typing,
    Memory,
    BugSmasher,
}

pub struct GameDescriptor {
    pub kind: GameKind,
    pub name: &'static str,
    pub description: &'static str,
    pub storage_key: &'static str,
    pub metrics: &'static [Metric],
}

impl GameKind {
    pub const ALL: [GameKind; 3] = [GameKind::Typing, GameKind::Memory, GameKind::BugSmasher];

    pub fn descriptor(&self) -> GameDescriptor {
        match self {
            GameKind::Typing => GameDescriptor {
                kind: *self,
                name: "Typing Test",
                description: "Type the code snippet as fast and accurately as you can",
                storage_key: typing::GAME_KEY,
                metrics: &[Metric::Score],
            },
            GameKind::Memory => GameDescriptor {
                kind: *self,
                name: "Memory Game",
                description: "Match all the tech icons to win",
                storage_key: memory::GAME_KEY,
                metrics: &[Metric::Time, Metric::Moves],
            },
            GameKind::BugSmasher => GameDescriptor {
                kind: *self,
                name: "Bug Smasher",
                description: "Hit the bugs before they escape; faster bugs score more",
                storage_key: bug_smasher::GAME_KEY,
                metrics: &[Metric::Score],
            },
        }
    }
}

pub fn registry() -> Vec<GameDescriptor> {
    GameKind::ALL.iter().map(|k| k.descriptor()).collect()
}

/// Every (storage key, metric) pair any game records.
pub fn score_keys() -> Vec<(&'static str, Metric)> {
    registry()
        .into_iter()
        .flat_map(|d| {
            let key = d.storage_key;
            d.metrics.iter().map(move |m| (key, *m))
        })
        .collect()
}
