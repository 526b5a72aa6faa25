use std::collections::BTreeSet;
use std::fmt::{self, Display};

use enum_dispatch::enum_dispatch;
use get_size::GetSize;
use iter_tools::Itertools;

use crate::card_use::{CardEffectContext, CardUseContext};
use crate::damage::DamageNature;
use crate::gameplay::{CardId, Game, GameContinue, GameResult, PlayerId};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, GetSize)]
pub enum Suit {
    Spade,
    Club,
    Heart,
    Diamond,
    NoSuitBlack,
    NoSuitRed,
    NoSuit,
}

impl Suit {
    pub fn color(self) -> Color {
        match self {
            Suit::Spade | Suit::Club | Suit::NoSuitBlack => Color::Black,
            Suit::Heart | Suit::Diamond | Suit::NoSuitRed => Color::Red,
            Suit::NoSuit => Color::Colorless,
        }
    }
}

impl Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Suit::Spade => "spade",
            Suit::Club => "club",
            Suit::Heart => "heart",
            Suit::Diamond => "diamond",
            Suit::NoSuitBlack => "no_suit_black",
            Suit::NoSuitRed => "no_suit_red",
            Suit::NoSuit => "no_suit",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Color {
    Red,
    Black,
    Colorless,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, GetSize)]
pub enum CardType {
    Skill,
    Basic,
    Trick,
    Equip,
}

/// What a card can stand for, queried instead of the concrete kind.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    SlashLike,
    JinkLike,
    /// can save any dying player
    Rescue,
    /// can only save its user
    SelfRescue,
    Nullify,
    AreaEffect,
    DelayedTrick,
}

#[enum_dispatch]
pub trait CardBehavior {
    fn name(&self) -> &'static str;
    fn card_type(&self) -> CardType;
    fn capabilities(&self) -> &'static [Capability] {
        &[]
    }
    fn needs_targets(&self) -> bool {
        true
    }
    /// key counted in the user's history
    fn history_key(&self) -> &'static str {
        self.name()
    }

    /// Target sets offered during the play phase, empty when it cannot be played.
    fn play_targets(&self, _game: &Game, _player: PlayerId) -> Vec<Vec<PlayerId>> {
        Vec::new()
    }

    fn on_use(&self, game: &mut Game, card_use: &mut CardUseContext) -> GameResult {
        game.effect_each_target(card_use)
    }

    fn on_effect(&self, _game: &mut Game, _effect: &CardEffectContext) -> GameResult {
        Ok(GameContinue)
    }

    fn on_nullified(&self, game: &mut Game, effect: &CardEffectContext) -> GameResult {
        game.discard_from_table(&effect.card)
    }
}

#[enum_dispatch(CardBehavior)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, GetSize)]
pub enum CardKind {
    Slash,
    Jink,
    Peach,
    Analeptic,
    Nullification,
    SavageAssault,
    ArcheryAttack,
    Duel,
    IronChain,
    Indulgence,
    Lightning,
}

impl CardKind {
    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }
    pub fn is_trick(&self) -> bool {
        self.card_type() == CardType::Trick
    }
    pub fn is_slash(&self) -> bool {
        self.has_capability(Capability::SlashLike)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, GetSize)]
pub struct Slash {
    pub nature: DamageNature,
}
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, GetSize)]
pub struct Jink;
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, GetSize)]
pub struct Peach;
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, GetSize)]
pub struct Analeptic;
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, GetSize)]
pub struct Nullification;
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, GetSize)]
pub struct SavageAssault;
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, GetSize)]
pub struct ArcheryAttack;
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, GetSize)]
pub struct Duel;
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, GetSize)]
pub struct IronChain;
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, GetSize)]
pub struct Indulgence;
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, GetSize)]
pub struct Lightning;

impl Slash {
    pub fn normal() -> CardKind {
        Slash {
            nature: DamageNature::Normal,
        }
        .into()
    }
    pub fn fire() -> CardKind {
        Slash {
            nature: DamageNature::Fire,
        }
        .into()
    }
    pub fn thunder() -> CardKind {
        Slash {
            nature: DamageNature::Thunder,
        }
        .into()
    }
}

/// Static attributes of a physical card.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, GetSize)]
pub struct CardInfo {
    pub id: CardId,
    pub kind: CardKind,
    pub suit: Suit,
    pub number: u8,
}

/// A card as used or played: either a physical card, or a virtual one
/// standing in for its sub-cards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub id: Option<CardId>,
    pub kind: CardKind,
    pub suit: Suit,
    pub number: u8,
    pub subcards: Vec<CardId>,
    pub skill_name: Option<String>,
    pub flags: BTreeSet<String>,
}

impl Card {
    pub fn real(info: &CardInfo) -> Self {
        Card {
            id: Some(info.id),
            kind: info.kind,
            suit: info.suit,
            number: info.number,
            subcards: Vec::new(),
            skill_name: None,
            flags: BTreeSet::new(),
        }
    }

    /// The suit is kept only when every sub-card agrees on it.
    pub fn virtual_card(kind: CardKind, subcards: &[CardInfo]) -> Self {
        let suit = match subcards.iter().map(|c| c.suit).dedup().exactly_one() {
            Ok(suit) => suit,
            Err(_) => {
                match subcards.iter().map(|c| c.suit.color()).dedup().exactly_one() {
                    Ok(Color::Red) => Suit::NoSuitRed,
                    Ok(Color::Black) => Suit::NoSuitBlack,
                    _ => Suit::NoSuit,
                }
            }
        };
        let number = match subcards {
            [single] => single.number,
            _ => 0,
        };
        Card {
            id: None,
            kind,
            suit,
            number,
            subcards: subcards.iter().map(|c| c.id).collect(),
            skill_name: None,
            flags: BTreeSet::new(),
        }
    }

    pub fn is_virtual(&self) -> bool {
        self.id.is_none()
    }

    /// physical cards behind this card
    pub fn card_ids(&self) -> Vec<CardId> {
        match self.id {
            Some(id) => vec![id],
            None => self.subcards.clone(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// identifies the card in per-use tags
    pub fn key(&self) -> String {
        match self.id {
            Some(id) => id.to_string(),
            None => format!("v:{}", self.subcards.iter().join("+")),
        }
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }
    pub fn set_flag(&mut self, flag: &str) {
        if let Some(flag) = flag.strip_prefix('-') {
            self.flags.remove(flag);
        } else {
            self.flags.insert(flag.into());
        }
    }
}

impl Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "{}[{} {}]({id})", self.name(), self.suit, self.number),
            None => write!(f, "{}[{}]({})", self.name(), self.suit, self.key()),
        }
    }
}

/// Choice shown to a decision provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CardDisplay {
    pub card: CardId,
    pub text: String,
}

impl CardDisplay {
    pub fn new(info: &CardInfo) -> Self {
        CardDisplay {
            card: info.id,
            text: format!("{}[{} {}]", info.kind.name(), info.suit, info.number),
        }
    }
}

impl Display for CardDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.text, self.card)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, GetSize)]
pub enum Place {
    Hand,
    Equip,
    DelayedTrick,
    Judge,
    Table,
    DrawPile,
    DiscardPile,
}

impl Place {
    pub fn is_owned(self) -> bool {
        matches!(
            self,
            Place::Hand | Place::Equip | Place::DelayedTrick | Place::Judge
        )
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, GetSize)]
pub struct CardPlace {
    pub owner: Option<PlayerId>,
    pub place: Place,
}

impl CardPlace {
    pub fn of(owner: PlayerId, place: Place) -> Self {
        CardPlace {
            owner: Some(owner),
            place,
        }
    }
    pub fn shared(place: Place) -> Self {
        CardPlace { owner: None, place }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MoveReasonKind {
    Use,
    Response,
    Draw,
    Discard,
    Throw,
    Judge,
    JudgeDone,
    Pindian,
    Put,
    Transfer,
    Bury,
    Shuffle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveReason {
    pub kind: MoveReasonKind,
    pub player: Option<PlayerId>,
    pub target: Option<PlayerId>,
    pub skill_name: Option<String>,
}

impl MoveReason {
    pub fn new(kind: MoveReasonKind, player: Option<PlayerId>) -> Self {
        MoveReason {
            kind,
            player,
            target: None,
            skill_name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardsMove {
    pub cards: Vec<CardId>,
    pub to: CardPlace,
    pub reason: MoveReason,
}

impl CardsMove {
    pub fn new(cards: Vec<CardId>, to: CardPlace, reason: MoveReason) -> Self {
        CardsMove { cards, to, reason }
    }
}

/// The 108-card standard deck, without equipment.
pub fn standard_deck() -> Vec<(CardKind, Suit, u8)> {
    use Suit::*;
    let mut deck = Vec::new();
    let mut add = |kind: CardKind, suit: Suit, numbers: &[u8]| {
        deck.extend(numbers.iter().map(|n| (kind, suit, *n)));
    };

    add(Slash::normal(), Spade, &[7, 8, 8, 9, 9, 10, 10]);
    add(Slash::normal(), Club, &[2, 3, 4, 5, 6, 7, 8, 8, 9, 9, 10, 10, 11, 11]);
    add(Slash::normal(), Heart, &[10, 10, 11]);
    add(Slash::normal(), Diamond, &[6, 7, 8, 9, 10, 13]);
    add(Slash::fire(), Heart, &[4, 7, 10]);
    add(Slash::fire(), Diamond, &[4, 5]);
    add(Slash::thunder(), Spade, &[4, 5, 6, 7, 8]);
    add(Slash::thunder(), Club, &[5, 6, 7, 8]);
    add(Jink.into(), Heart, &[2, 2, 8, 9, 11, 12, 13]);
    add(Jink.into(), Diamond, &[2, 2, 3, 4, 5, 6, 6, 7, 7, 8, 8, 9, 10, 10, 11, 11]);
    add(Peach.into(), Heart, &[3, 4, 5, 6, 6, 7, 8, 9, 12]);
    add(Peach.into(), Diamond, &[2, 12]);
    add(Analeptic.into(), Spade, &[3, 9]);
    add(Analeptic.into(), Club, &[3, 9]);
    add(Analeptic.into(), Diamond, &[9]);
    add(Nullification.into(), Spade, &[11, 13]);
    add(Nullification.into(), Club, &[12, 13]);
    add(Nullification.into(), Heart, &[1, 13]);
    add(Nullification.into(), Diamond, &[12]);
    add(SavageAssault.into(), Spade, &[7, 13]);
    add(SavageAssault.into(), Club, &[7]);
    add(ArcheryAttack.into(), Heart, &[1]);
    add(Duel.into(), Spade, &[1]);
    add(Duel.into(), Club, &[1]);
    add(Duel.into(), Diamond, &[1]);
    add(IronChain.into(), Spade, &[11, 12]);
    add(IronChain.into(), Club, &[10, 11, 12, 13]);
    add(Indulgence.into(), Spade, &[6]);
    add(Indulgence.into(), Club, &[6]);
    add(Indulgence.into(), Heart, &[6]);
    add(Lightning.into(), Spade, &[1]);
    add(Lightning.into(), Heart, &[12]);

    deck
}
