pub mod card_effects;
pub mod card_use;
pub mod cards;
pub mod client;
pub mod config;
pub mod damage;
pub mod events;
pub mod game_rule;
pub mod gameplay;
pub mod judge;
pub mod mailbox;
pub mod modes;
pub mod phases;
pub mod pindian;
pub mod player;
pub mod prompters;
pub mod triggers;
