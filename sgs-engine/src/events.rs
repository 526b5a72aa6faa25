use std::fmt::{self, Display};
use std::sync::{Arc, Mutex};

use get_size::GetSize;
use iter_tools::Itertools;
use tracing::{debug, error};

use crate::card_use::{CardEffectContext, CardResponseContext, CardUseContext, SlashEffectContext};
use crate::cards::{Capability, CardDisplay, CardPlace, MoveReason};
use crate::damage::{DamageContext, DamageNature, DeathContext, DyingContext, HpChangeContext, RecoverContext};
use crate::gameplay::{CardId, GameOutcome, PlayerId};
use crate::judge::JudgeContext;
use crate::pindian::{PindianContext, PindianTarget};
use crate::player::Phase;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientReceive {
    Notice(Notice),
    Question { serial: u32, question: Question },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientSend {
    Answer { serial: u32, answer: Answer },
    /// gives up the turn in progress, the room unwinds it
    ForceEndTurn,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, GetSize)]
pub enum TriggerEvent {
    GameReady,
    DrawInitialCards,
    AfterDrawInitialCards,

    TurnStart,
    BeforeGameStart,
    GameStart,
    BeforeRoundStart,
    RoundStart,
    TurnBroken,
    StageChange,

    EventPhaseChanging,
    EventPhaseSkipping,
    EventPhaseSkipped,
    EventPhaseStart,
    EventPhaseProceeding,
    EventPhaseEnd,
    DrawNCards,
    AfterDrawNCards,
    DiscardNCards,
    AfterDiscardNCards,
    TurnOver,
    TurnedOver,
    ChainStateChanged,

    PreCardUsed,
    CardUsed,
    TargetSpecifying,
    TargetConfirming,
    TargetSpecified,
    TargetConfirmed,
    CardEffected,
    TrickCardCanceling,
    TrickEffect,
    EffectOffsetted,
    CardFinished,
    PreCardResponded,
    CardResponded,

    SlashEffected,
    SlashProceed,
    SlashHit,
    SlashMissed,

    ConfirmDamage,
    DamageCaused,
    DamageInflicted,
    DamageDone,
    Damage,
    Damaged,
    DamageComplete,
    PreHpRecover,
    HpRecover,
    PreHpLost,
    HpLost,
    HpChanged,

    EnterDying,
    AskForPeaches,
    AskForPeachesDone,
    DyingToDeath,
    QuitDying,
    Death,
    BeforeGameOverJudge,
    GameOverJudge,
    BuryVictim,

    StartJudge,
    AskForRetrial,
    FinishRetrial,
    FinishJudge,
    BeforeDelayedTrickEffect,

    AskforPindianCard,
    PindianVerifying,
    Pindian,

    CardsMoveOneTime,
    ChoiceMade,
}

impl TriggerEvent {
    pub fn payload_kind(self) -> PayloadKind {
        use TriggerEvent::*;
        match self {
            GameReady | TurnStart | BeforeGameStart | GameStart | TurnBroken | StageChange
            | EventPhaseStart | EventPhaseProceeding | EventPhaseEnd | TurnOver | TurnedOver
            | ChainStateChanged => PayloadKind::None,
            // round events carry the round number
            BeforeRoundStart | RoundStart | DrawInitialCards | AfterDrawInitialCards
            | DrawNCards | AfterDrawNCards | DiscardNCards | AfterDiscardNCards | PreHpLost
            | HpLost => PayloadKind::Count,
            EventPhaseChanging => PayloadKind::PhaseChange,
            EventPhaseSkipping | EventPhaseSkipped => PayloadKind::PhaseSkip,
            PreCardUsed | CardUsed | TargetSpecifying | TargetConfirming | TargetSpecified
            | TargetConfirmed | CardFinished => PayloadKind::CardUse,
            CardEffected | TrickCardCanceling | TrickEffect | EffectOffsetted
            | BeforeDelayedTrickEffect => PayloadKind::CardEffect,
            PreCardResponded | CardResponded => PayloadKind::CardResponse,
            SlashEffected | SlashProceed | SlashHit | SlashMissed => PayloadKind::SlashEffect,
            ConfirmDamage | DamageCaused | DamageInflicted | DamageDone | Damage | Damaged
            | DamageComplete => PayloadKind::Damage,
            PreHpRecover | HpRecover => PayloadKind::Recover,
            HpChanged => PayloadKind::HpChange,
            EnterDying | AskForPeaches | AskForPeachesDone | DyingToDeath | QuitDying => {
                PayloadKind::Dying
            }
            Death | BeforeGameOverJudge | GameOverJudge | BuryVictim => PayloadKind::Death,
            StartJudge | AskForRetrial | FinishRetrial | FinishJudge => PayloadKind::Judge,
            AskforPindianCard | PindianVerifying | Pindian => PayloadKind::Pindian,
            CardsMoveOneTime => PayloadKind::CardsMove,
            ChoiceMade => PayloadKind::Choice,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    None,
    Count,
    PhaseChange,
    PhaseSkip,
    CardUse,
    CardEffect,
    CardResponse,
    SlashEffect,
    Damage,
    Recover,
    HpChange,
    Dying,
    Death,
    Judge,
    Pindian,
    CardsMove,
    Choice,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PhaseChangeContext {
    pub from: Phase,
    pub to: Phase,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PhaseSkipContext {
    pub phase: Phase,
    pub is_cost: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovedCard {
    pub card: CardId,
    pub from: CardPlace,
    pub to: CardPlace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardsMoveContext {
    pub moves: Vec<MovedCard>,
    pub reason: MoveReason,
}

/// Structured record of a finished decision, for consumers that log or replay them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChoiceRecord {
    CardResponded {
        player: PlayerId,
        prompt: String,
        card: Option<CardId>,
    },
    Discard {
        player: PlayerId,
        reason: String,
        cards: Vec<CardId>,
    },
    Choice {
        player: PlayerId,
        reason: String,
        choice: String,
    },
    Invoke {
        player: PlayerId,
        skill: String,
        accepted: bool,
    },
    Pindian {
        reason: String,
        from: PlayerId,
        from_card: CardId,
        to: PindianTarget,
        to_card: CardId,
    },
}

impl ChoiceRecord {
    pub fn player(&self) -> PlayerId {
        match self {
            ChoiceRecord::CardResponded { player, .. }
            | ChoiceRecord::Discard { player, .. }
            | ChoiceRecord::Choice { player, .. }
            | ChoiceRecord::Invoke { player, .. } => *player,
            ChoiceRecord::Pindian { from, .. } => *from,
        }
    }
}

impl Display for ChoiceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChoiceRecord::CardResponded { prompt, card, .. } => match card {
                Some(card) => write!(f, "cardResponded:{prompt}:{card}"),
                None => write!(f, "cardResponded:{prompt}:_nil_"),
            },
            ChoiceRecord::Discard { reason, cards, .. } => {
                write!(f, "cardDiscard:{reason}:{}", cards.iter().join("+"))
            }
            ChoiceRecord::Choice { reason, choice, .. } => write!(f, "choice:{reason}:{choice}"),
            ChoiceRecord::Invoke {
                skill, accepted, ..
            } => write!(f, "skillInvoke:{skill}:{}", if *accepted { "yes" } else { "no" }),
            ChoiceRecord::Pindian {
                reason,
                from,
                from_card,
                to,
                to_card,
            } => write!(f, "pindian:{reason}:{from}:{from_card}:{to}:{to_card}"),
        }
    }
}

/// Shared payload of one dispatched event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EventData {
    #[default]
    None,
    Count(i32),
    PhaseChange(PhaseChangeContext),
    PhaseSkip(PhaseSkipContext),
    CardUse(CardUseContext),
    CardEffect(CardEffectContext),
    CardResponse(CardResponseContext),
    SlashEffect(SlashEffectContext),
    Damage(DamageContext),
    Recover(RecoverContext),
    HpChange(HpChangeContext),
    Dying(DyingContext),
    Death(DeathContext),
    Judge(JudgeContext),
    Pindian(PindianContext),
    CardsMove(CardsMoveContext),
    Choice(ChoiceRecord),
}

impl EventData {
    pub fn kind(&self) -> PayloadKind {
        match self {
            EventData::None => PayloadKind::None,
            EventData::Count(_) => PayloadKind::Count,
            EventData::PhaseChange(_) => PayloadKind::PhaseChange,
            EventData::PhaseSkip(_) => PayloadKind::PhaseSkip,
            EventData::CardUse(_) => PayloadKind::CardUse,
            EventData::CardEffect(_) => PayloadKind::CardEffect,
            EventData::CardResponse(_) => PayloadKind::CardResponse,
            EventData::SlashEffect(_) => PayloadKind::SlashEffect,
            EventData::Damage(_) => PayloadKind::Damage,
            EventData::Recover(_) => PayloadKind::Recover,
            EventData::HpChange(_) => PayloadKind::HpChange,
            EventData::Dying(_) => PayloadKind::Dying,
            EventData::Death(_) => PayloadKind::Death,
            EventData::Judge(_) => PayloadKind::Judge,
            EventData::Pindian(_) => PayloadKind::Pindian,
            EventData::CardsMove(_) => PayloadKind::CardsMove,
            EventData::Choice(_) => PayloadKind::Choice,
        }
    }

    pub fn count(&self) -> i32 {
        match self {
            EventData::Count(n) => *n,
            other => payload_mismatch(PayloadKind::Count, other),
        }
    }
    pub fn count_mut(&mut self) -> &mut i32 {
        match self {
            EventData::Count(n) => n,
            other => payload_mismatch(PayloadKind::Count, other),
        }
    }
}

macro_rules! payload_accessors {
    ($($variant:ident: $ty:ty => $get:ident, $get_mut:ident, $into:ident;)*) => {
        impl EventData {
            $(
                pub fn $get(&self) -> &$ty {
                    match self {
                        EventData::$variant(payload) => payload,
                        other => payload_mismatch(PayloadKind::$variant, other),
                    }
                }
                pub fn $get_mut(&mut self) -> &mut $ty {
                    match self {
                        EventData::$variant(payload) => payload,
                        other => payload_mismatch(PayloadKind::$variant, other),
                    }
                }
                pub fn $into(self) -> $ty {
                    match self {
                        EventData::$variant(payload) => payload,
                        other => payload_mismatch(PayloadKind::$variant, &other),
                    }
                }
            )*
        }
    };
}

payload_accessors! {
    PhaseChange: PhaseChangeContext => phase_change, phase_change_mut, into_phase_change;
    PhaseSkip: PhaseSkipContext => phase_skip, phase_skip_mut, into_phase_skip;
    CardUse: CardUseContext => card_use, card_use_mut, into_card_use;
    CardEffect: CardEffectContext => card_effect, card_effect_mut, into_card_effect;
    CardResponse: CardResponseContext => card_response, card_response_mut, into_card_response;
    SlashEffect: SlashEffectContext => slash_effect, slash_effect_mut, into_slash_effect;
    Damage: DamageContext => damage, damage_mut, into_damage;
    Recover: RecoverContext => recover, recover_mut, into_recover;
    HpChange: HpChangeContext => hp_change, hp_change_mut, into_hp_change;
    Dying: DyingContext => dying, dying_mut, into_dying;
    Death: DeathContext => death, death_mut, into_death;
    Judge: JudgeContext => judge, judge_mut, into_judge;
    Pindian: PindianContext => pindian, pindian_mut, into_pindian;
    CardsMove: CardsMoveContext => cards_move, cards_move_mut, into_cards_move;
    Choice: ChoiceRecord => choice, choice_mut, into_choice;
}

fn payload_mismatch(expected: PayloadKind, found: &EventData) -> ! {
    error!("payload mismatch - expected: {expected:?} - found: {found:#?}");
    panic!("payload mismatch")
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlayOption {
    pub card: CardDisplay,
    pub targets: Vec<PlayerId>,
}

impl Display for PlayOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.targets.is_empty() {
            write!(f, "{}", self.card)
        } else {
            write!(f, "{} -> {}", self.card, self.targets.iter().join(", "))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Question {
    PlayCard {
        player: PlayerId,
        options: Vec<PlayOption>,
    },
    RespondCard {
        player: PlayerId,
        capability: Capability,
        prompt: String,
        candidates: Vec<CardDisplay>,
    },
    Discard {
        player: PlayerId,
        reason: String,
        amount: usize,
        optional: bool,
        candidates: Vec<CardDisplay>,
    },
    PindianCard {
        player: PlayerId,
        reason: String,
        candidates: Vec<CardDisplay>,
    },
    Choice {
        player: PlayerId,
        reason: String,
        choices: Vec<String>,
    },
    Invoke {
        player: PlayerId,
        skill: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Play(Option<PlayOption>),
    Card(Option<CardId>),
    Cards(Vec<CardId>),
    Choice(String),
    YesNo(bool),
}

impl Question {
    pub fn player(&self) -> PlayerId {
        match self {
            Question::PlayCard { player, .. }
            | Question::RespondCard { player, .. }
            | Question::Discard { player, .. }
            | Question::PindianCard { player, .. }
            | Question::Choice { player, .. }
            | Question::Invoke { player, .. } => *player,
        }
    }

    /// Whether `answer` is a legal reply to this question.
    pub fn accepts(&self, answer: &Answer) -> bool {
        let has_card = |candidates: &[CardDisplay], card: &CardId| {
            candidates.iter().any(|c| c.card == *card)
        };
        match (self, answer) {
            (Question::PlayCard { options, .. }, Answer::Play(option)) => {
                option.as_ref().map_or(true, |o| options.contains(o))
            }
            (Question::RespondCard { candidates, .. }, Answer::Card(card)) => {
                card.as_ref().map_or(true, |c| has_card(candidates, c))
            }
            (
                Question::Discard {
                    amount,
                    optional,
                    candidates,
                    ..
                },
                Answer::Cards(cards),
            ) => {
                let amount_ok = if *optional {
                    cards.len() <= *amount
                } else {
                    cards.len() == (*amount).min(candidates.len())
                };
                amount_ok
                    && cards.iter().all_unique()
                    && cards.iter().all(|c| has_card(candidates, c))
            }
            (Question::PindianCard { candidates, .. }, Answer::Card(Some(card))) => {
                has_card(candidates, card)
            }
            (Question::Choice { choices, .. }, Answer::Choice(choice)) => choices.contains(choice),
            (Question::Invoke { .. }, Answer::YesNo(_)) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage {
    pub kind: String,
    pub from: Option<PlayerId>,
    pub to: Vec<PlayerId>,
    pub arg: String,
    pub arg2: String,
}

impl LogMessage {
    pub fn new(kind: &str) -> Self {
        LogMessage {
            kind: kind.into(),
            from: None,
            to: Vec::new(),
            arg: String::new(),
            arg2: String::new(),
        }
    }
    pub fn from(mut self, from: PlayerId) -> Self {
        self.from = Some(from);
        self
    }
    pub fn to(mut self, to: PlayerId) -> Self {
        self.to.push(to);
        self
    }
    pub fn arg(mut self, arg: impl ToString) -> Self {
        self.arg = arg.to_string();
        self
    }
    pub fn arg2(mut self, arg2: impl ToString) -> Self {
        self.arg2 = arg2.to_string();
        self
    }
}

impl Display for LogMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(from) = self.from {
            write!(f, " from={from}")?;
        }
        if !self.to.is_empty() {
            write!(f, " to={}", self.to.iter().join("+"))?;
        }
        if !self.arg.is_empty() {
            write!(f, " arg={}", self.arg)?;
        }
        if !self.arg2.is_empty() {
            write!(f, " arg2={}", self.arg2)?;
        }
        Ok(())
    }
}

/// Fire-and-forget messages about the room, never affecting control flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Log(LogMessage),
    HpChanged {
        player: PlayerId,
        delta: i32,
        nature: Option<DamageNature>,
        lost: bool,
    },
    Property {
        player: PlayerId,
        name: String,
        value: String,
    },
    Phase {
        player: PlayerId,
        phase: Phase,
    },
    CardsMoved {
        cards: Vec<CardId>,
        to: CardPlace,
    },
    CardUsed {
        from: PlayerId,
        to: Vec<PlayerId>,
        card: String,
    },
    SkillInvoked {
        player: PlayerId,
        skill: String,
    },
    /// a nullification window opened, or closed for `player`
    NullificationAsked {
        player: Option<PlayerId>,
    },
    Pindian {
        from: PlayerId,
        to: PindianTarget,
        from_number: u8,
        to_number: u8,
        success: bool,
    },
    GameOver(GameOutcome),
}

pub trait NotificationSink: Send {
    fn notify(&mut self, notice: &Notice);
}

#[derive(Debug, Default)]
pub struct TracingSink {}
impl TracingSink {
    pub fn new() -> Self {
        TracingSink {}
    }
}
impl NotificationSink for TracingSink {
    fn notify(&mut self, notice: &Notice) {
        debug!("NOTICE = {notice:?}");
    }
}

/// Keeps every notice, shared with whoever holds a clone.
#[derive(Debug, Clone, Default)]
pub struct NoticeLog {
    pub notices: Arc<Mutex<Vec<Notice>>>,
}
impl NoticeLog {
    pub fn new() -> Self {
        NoticeLog::default()
    }
    pub fn snapshot(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .map(|notices| notices.clone())
            .unwrap_or_default()
    }
    pub fn logs(&self) -> Vec<LogMessage> {
        self.snapshot()
            .into_iter()
            .filter_map(|n| match n {
                Notice::Log(log) => Some(log),
                _ => None,
            })
            .collect()
    }
}
impl NotificationSink for NoticeLog {
    fn notify(&mut self, notice: &Notice) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.push(notice.clone());
        }
    }
}
