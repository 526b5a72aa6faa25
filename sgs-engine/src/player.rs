use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::{self, Display};

use get_size::GetSize;
use iter_tools::Itertools;
use serde::{Deserialize, Serialize};

use crate::gameplay::{CardId, PlayerId, Tag};

/// Kingdom of generals that pick their kingdom when the game gets ready.
pub const GOD_KINGDOM: &str = "god";
/// Placeholder general shown while the real one is hidden.
pub const HIDDEN_GENERAL: &str = "anjiang";

#[derive(
    Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, GetSize,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Lord,
    Loyalist,
    Rebel,
    Renegade,
}

impl Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Lord => "lord",
            Role::Loyalist => "loyalist",
            Role::Rebel => "rebel",
            Role::Renegade => "renegade",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, GetSize)]
pub enum Phase {
    RoundStart,
    Start,
    Judge,
    Draw,
    Play,
    Discard,
    Finish,
    #[default]
    NotActive,
    /// transient, only while a phase change is being dispatched
    None,
}

impl Phase {
    pub const TURN: [Phase; 8] = [
        Phase::RoundStart,
        Phase::Start,
        Phase::Judge,
        Phase::Draw,
        Phase::Play,
        Phase::Discard,
        Phase::Finish,
        Phase::NotActive,
    ];
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, GetSize)]
pub enum SkipKind {
    #[default]
    NotSkipped,
    Free,
    Cost,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, GetSize)]
pub struct PendingPhase {
    pub phase: Phase,
    pub skipped: SkipKind,
}

/// Phase sub-state of a player: the current phase and the queue of the running turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, GetSize)]
pub struct PhaseState {
    pub phase: Phase,
    pub queue: Vec<PendingPhase>,
    pub index: usize,
}

impl PhaseState {
    pub fn set_queue(&mut self, phases: impl IntoIterator<Item = Phase>) {
        self.queue = phases
            .into_iter()
            .map(|phase| PendingPhase {
                phase,
                skipped: SkipKind::NotSkipped,
            })
            .collect_vec();
        self.index = 0;
    }

    /// Marks the next occurrence of `phase` (from the cursor) as skipped.
    /// A free skip is upgraded to a cost skip, never the other way around.
    pub fn skip(&mut self, phase: Phase, is_cost: bool) -> bool {
        let Some(pending) = self
            .queue
            .iter_mut()
            .skip(self.index)
            .find(|p| p.phase == phase)
        else {
            return false;
        };
        pending.skipped = match (pending.skipped, is_cost) {
            (SkipKind::Cost, _) | (_, true) => SkipKind::Cost,
            _ => SkipKind::Free,
        };
        true
    }

    pub fn is_skipped(&self, phase: Phase) -> bool {
        self.queue
            .iter()
            .skip(self.index)
            .any(|p| p.phase == phase && p.skipped != SkipKind::NotSkipped)
    }

    /// Splices `phase` right after the cursor, so it runs next.
    pub fn insert(&mut self, phase: Phase) {
        let at = (self.index + 1).min(self.queue.len());
        self.queue.insert(
            at,
            PendingPhase {
                phase,
                skipped: SkipKind::NotSkipped,
            },
        );
    }

    pub fn pending(&self, index: usize) -> Option<PendingPhase> {
        self.queue.get(index).copied()
    }
}

/// When a mark stops counting, derived from its name.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MarkExpiry {
    /// `-Clear`, removed when the turn ends
    Turn,
    /// `-PlayClear`, removed when leaving the play phase
    PlayPhase,
    /// `_lun` or `_lun!`, removed when a new round starts
    Round,
    Persistent,
}

impl MarkExpiry {
    pub fn of(name: &str) -> MarkExpiry {
        if name.ends_with("-PlayClear") {
            MarkExpiry::PlayPhase
        } else if name.ends_with("-Clear") {
            MarkExpiry::Turn
        } else if name.ends_with("_lun") || name.ends_with("_lun!") {
            MarkExpiry::Round
        } else {
            MarkExpiry::Persistent
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, GetSize)]
pub struct Skill {
    pub name: String,
    /// mark granted once at game ready, for skills usable once per game
    pub limit_mark: Option<String>,
    /// removed when the turn starts again
    pub next_turn: bool,
    /// removed when the turn ends
    pub one_turn: bool,
}

impl Skill {
    pub fn new(name: &str) -> Self {
        Skill {
            name: name.into(),
            limit_mark: None,
            next_turn: false,
            one_turn: false,
        }
    }
    pub fn limited(name: &str, mark: &str) -> Self {
        Skill {
            limit_mark: Some(mark.into()),
            ..Skill::new(name)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, GetSize)]
pub struct HiddenGeneral {
    pub general: String,
    pub kingdom: String,
}

#[derive(Debug, Clone, PartialEq, Eq, GetSize)]
pub struct Player {
    pub id: PlayerId,
    pub general: String,
    pub kingdom: String,
    pub role: Role,
    pub role_shown: bool,
    pub hp: i32,
    pub max_hp: i32,
    pub alive: bool,
    pub chained: bool,
    pub face_up: bool,
    pub hidden: Option<HiddenGeneral>,

    pub hand: Vec<CardId>,
    pub equips: Vec<CardId>,
    pub delayed_tricks: Vec<CardId>,
    pub judging: Vec<CardId>,

    pub skills: Vec<Skill>,
    pub phases: PhaseState,
    pub flags: BTreeSet<String>,
    pub marks: BTreeMap<String, i32>,
    pub tags: HashMap<String, Tag>,
    /// integer properties reset at the end of the turn when suffixed `_OneTurn`
    pub properties: BTreeMap<String, i32>,
    pub history: BTreeMap<String, u32>,
}

impl Player {
    pub fn new(id: PlayerId, general: &str, kingdom: &str, role: Role, max_hp: i32) -> Self {
        Player {
            id,
            general: general.into(),
            kingdom: kingdom.into(),
            role,
            role_shown: role == Role::Lord,
            hp: max_hp,
            max_hp,
            alive: true,
            chained: false,
            face_up: true,
            hidden: None,
            hand: Vec::new(),
            equips: Vec::new(),
            delayed_tricks: Vec::new(),
            judging: Vec::new(),
            skills: Vec::new(),
            phases: PhaseState::default(),
            flags: BTreeSet::new(),
            marks: BTreeMap::new(),
            tags: HashMap::new(),
            properties: BTreeMap::new(),
            history: BTreeMap::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phases.phase
    }
    pub fn is_wounded(&self) -> bool {
        self.hp < self.max_hp
    }
    pub fn is_current(&self, current: PlayerId) -> bool {
        self.id == current
    }
    pub fn has_skill(&self, name: &str) -> bool {
        self.skills.iter().any(|s| s.name == name)
    }
    /// kingdom used by win conditions, even while the general is hidden
    pub fn true_kingdom(&self) -> &str {
        self.hidden
            .as_ref()
            .map(|h| h.kingdom.as_str())
            .unwrap_or(&self.kingdom)
    }
    pub fn is_hidden(&self) -> bool {
        self.hidden.is_some()
    }

    pub fn max_cards(&self) -> usize {
        let extra = self.property("ExtraMaxCards_OneTurn");
        (self.hp.max(0) + extra).max(0) as usize
    }

    // flags

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }
    /// `-name` removes a flag, `.` clears them all
    pub fn set_flag(&mut self, flag: &str) {
        if flag == "." {
            self.flags.clear();
        } else if let Some(flag) = flag.strip_prefix('-') {
            self.flags.remove(flag);
        } else {
            self.flags.insert(flag.into());
        }
    }

    // marks

    pub fn mark(&self, mark: &str) -> i32 {
        self.marks.get(mark).copied().unwrap_or(0)
    }
    pub fn set_mark(&mut self, mark: &str, value: i32) {
        if value <= 0 {
            self.marks.remove(mark);
        } else {
            self.marks.insert(mark.into(), value);
        }
    }
    pub fn gain_mark(&mut self, mark: &str, n: i32) -> i32 {
        let value = self.mark(mark) + n.max(0);
        self.set_mark(mark, value);
        value
    }
    /// never goes below zero
    pub fn lose_mark(&mut self, mark: &str, n: i32) -> i32 {
        let value = (self.mark(mark) - n.max(0)).max(0);
        self.set_mark(mark, value);
        value
    }
    pub fn clear_marks(&mut self, expiry: MarkExpiry) -> Vec<String> {
        let expired = self
            .marks
            .keys()
            .filter(|m| MarkExpiry::of(m) == expiry)
            .cloned()
            .collect_vec();
        for mark in &expired {
            self.marks.remove(mark);
        }
        expired
    }

    // tags and properties

    pub fn tag(&self, key: &str) -> Option<&Tag> {
        self.tags.get(key)
    }
    pub fn set_tag(&mut self, key: &str, tag: Tag) {
        self.tags.insert(key.into(), tag);
    }
    pub fn remove_tag(&mut self, key: &str) -> Option<Tag> {
        self.tags.remove(key)
    }
    pub fn property(&self, name: &str) -> i32 {
        self.properties.get(name).copied().unwrap_or(0)
    }
    pub fn set_property(&mut self, name: &str, value: i32) {
        self.properties.insert(name.into(), value);
    }

    // history

    pub fn usage(&self, card_name: &str) -> u32 {
        self.history.get(card_name).copied().unwrap_or(0)
    }
    pub fn add_history(&mut self, card_name: &str, times: i32) {
        let entry = self.history.entry(card_name.into()).or_default();
        *entry = (*entry as i32 + times).max(0) as u32;
    }
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn all_cards(&self) -> Vec<CardId> {
        self.hand
            .iter()
            .chain(&self.equips)
            .chain(&self.delayed_tricks)
            .copied()
            .collect()
    }
}
