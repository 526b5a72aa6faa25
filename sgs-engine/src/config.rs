use std::fmt::{self, Display};
use std::time::Duration;

use get_size::GetSize;
use serde::{Deserialize, Serialize};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    /// the toml could not be parsed into a config
    Parse(String),
    PlayerCount(usize),
    ModePlayerCount {
        mode: GameModeKind,
        expected: usize,
        found: usize,
    },
    MissingGenerals {
        expected: usize,
        found: usize,
    },
    NoHulaoForms,
}

impl Display for Error {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Parse(msg) => write!(formatter, "Invalid room config: {msg}"),
            Error::PlayerCount(found) => {
                write!(formatter, "A room needs 2 to 10 players, found {found}")
            }
            Error::ModePlayerCount {
                mode,
                expected,
                found,
            } => write!(
                formatter,
                "Mode {mode:?} needs exactly {expected} players, found {found}"
            ),
            Error::MissingGenerals { expected, found } => write!(
                formatter,
                "Expected at least {expected} generals, found {found}"
            ),
            Error::NoHulaoForms => formatter.write_str("Hulao pass needs a second stage form"),
        }
    }
}

impl std::error::Error for Error {}

impl From<toml::de::Error> for Error {
    fn from(value: toml::de::Error) -> Self {
        Error::Parse(value.message().to_string())
    }
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash, Default, GetSize)]
#[serde(rename_all = "snake_case")]
pub enum GameModeKind {
    #[default]
    Standard,
    Team,
    HulaoPass,
    Basara,
}

impl GameModeKind {
    pub fn required_players(self) -> Option<usize> {
        match self {
            GameModeKind::Team | GameModeKind::HulaoPass => Some(4),
            GameModeKind::Standard | GameModeKind::Basara => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GeneralConfig {
    pub name: String,
    pub kingdom: String,
    pub max_hp: i32,
}

impl GeneralConfig {
    pub fn new(name: &str, kingdom: &str, max_hp: i32) -> Self {
        GeneralConfig {
            name: name.into(),
            kingdom: kingdom.into(),
            max_hp,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct RoomConfig {
    pub mode: GameModeKind,
    pub players: usize,
    pub initial_hand: i32,
    pub draw_per_turn: i32,
    pub reply_timeout_ms: u64,
    pub nullification_timeout_ms: u64,
    pub surrender_allowed: bool,
    /// 0 is unlimited, reaching the limit ends the game in a draw
    pub max_turns: u32,
    pub seed: Option<u64>,
    /// 0 is unlimited, one more reshuffle ends the game in a draw
    pub max_pile_swaps: u32,
    /// one per seat, in seat order
    pub generals: Vec<GeneralConfig>,
    /// forms the lord can pick from when the second stage starts
    pub hulao_forms: Vec<GeneralConfig>,
}

impl Default for RoomConfig {
    fn default() -> Self {
        RoomConfig {
            mode: GameModeKind::Standard,
            players: 5,
            initial_hand: 4,
            draw_per_turn: 2,
            reply_timeout_ms: 15000,
            nullification_timeout_ms: 5000,
            surrender_allowed: false,
            max_turns: 0,
            seed: None,
            max_pile_swaps: 6,
            generals: Vec::new(),
            hulao_forms: vec![
                GeneralConfig::new("shenlvbu2", "god", 4),
                GeneralConfig::new("shenlvbu3", "god", 4),
            ],
        }
    }
}

impl RoomConfig {
    pub fn from_toml(text: &str) -> Result<RoomConfig> {
        let config: RoomConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(2..=10).contains(&self.players) {
            return Err(Error::PlayerCount(self.players));
        }
        if let Some(expected) = self.mode.required_players() {
            if self.players != expected {
                return Err(Error::ModePlayerCount {
                    mode: self.mode,
                    expected,
                    found: self.players,
                });
            }
        }
        if !self.generals.is_empty() && self.generals.len() < self.players {
            return Err(Error::MissingGenerals {
                expected: self.players,
                found: self.generals.len(),
            });
        }
        if self.mode == GameModeKind::HulaoPass && self.hulao_forms.is_empty() {
            return Err(Error::NoHulaoForms);
        }
        Ok(())
    }

    pub fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms)
    }
    pub fn nullification_timeout(&self) -> Duration {
        Duration::from_millis(self.nullification_timeout_ms)
    }

    /// Generals for every seat, falling back to a built-in roster.
    pub fn seat_generals(&self) -> Vec<GeneralConfig> {
        if self.generals.len() >= self.players {
            return self.generals[..self.players].to_vec();
        }
        let roster = match self.mode {
            GameModeKind::HulaoPass => vec![
                GeneralConfig::new("shenlvbu1", "god", 8),
                GeneralConfig::new("zhaoyun", "shu", 4),
                GeneralConfig::new("guanyu", "shu", 4),
                GeneralConfig::new("zhangfei", "shu", 4),
            ],
            _ => vec![
                GeneralConfig::new("caocao", "wei", 4),
                GeneralConfig::new("liubei", "shu", 4),
                GeneralConfig::new("sunquan", "wu", 4),
                GeneralConfig::new("diaochan", "qun", 3),
                GeneralConfig::new("simayi", "wei", 3),
                GeneralConfig::new("guanyu", "shu", 4),
                GeneralConfig::new("zhouyu", "wu", 3),
                GeneralConfig::new("lvbu", "qun", 4),
                GeneralConfig::new("zhangliao", "wei", 4),
                GeneralConfig::new("shenguanyu", "god", 5),
            ],
        };
        roster.into_iter().cycle().take(self.players).collect()
    }
}
