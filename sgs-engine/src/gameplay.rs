use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt::{self, Debug, Display};
use std::num::NonZeroU16;
use std::str::FromStr;

use debug_ignore::DebugIgnore;
use get_size::GetSize;
use iter_tools::Itertools;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};
use tracing::{error, info, warn};

use crate::cards::{
    standard_deck, Card, CardInfo, CardPlace, CardsMove, MoveReason, MoveReasonKind, Place,
};
use crate::config::RoomConfig;
use crate::events::{
    CardsMoveContext, EventData, LogMessage, MovedCard, Notice, NotificationSink, TracingSink,
    TriggerEvent,
};
use crate::mailbox::Synchronizer;
use crate::modes::{GameMode, ModeRules};
use crate::player::{Phase, Player, Role};
use crate::triggers::{EventSpan, TriggerRegistry};

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, GetSize)]
pub struct PlayerId(pub(crate) u8);

impl PlayerId {
    pub fn new(seat: u8) -> Self {
        PlayerId(seat)
    }
    pub fn index(self) -> usize {
        self.0 as usize
    }
}
impl Debug for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p_{}", self.0)
    }
}
impl Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, GetSize)]
pub struct CardId(pub(crate) NonZeroU16);

impl CardId {
    pub fn new(id: u16) -> Self {
        CardId(NonZeroU16::new(id).expect("card ids start at 1"))
    }
}
impl Debug for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c_{:04x}", self.0)
    }
}
impl Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}
impl FromStr for CardId {
    type Err = ParseCardIdError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        u16::from_str_radix(value.trim_start_matches("c_"), 16)
            .ok()
            .and_then(NonZeroU16::new)
            .map(CardId)
            .ok_or_else(|| ParseCardIdError(value.into()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCardIdError(String);

impl Display for ParseCardIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "not a card id: {:?}", self.0)
    }
}

impl std::error::Error for ParseCardIdError {}

pub type GameResult = Result<GameContinue, Interrupt>;
/// `Ok(true)` when the event was vetoed
pub type TriggerResult = Result<bool, Interrupt>;
/// Result of a whole turn, only a finished game stops the room.
pub type TurnResult = Result<GameContinue, GameOutcome>;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct GameContinue;

/// Cuts the current resolution short, up to the frame that owns recovery.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Interrupt {
    /// the acting player disconnected or gave up the turn
    TurnBroken,
    /// the mode moved to its next stage
    StageChange,
    GameOver(GameOutcome),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, GetSize)]
pub enum Winner {
    Roles(Vec<Role>),
    Kingdom(String),
    Draw,
}

impl Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Winner::Roles(roles) => write!(f, "{}", roles.iter().join("+")),
            Winner::Kingdom(kingdom) => f.write_str(kingdom),
            Winner::Draw => f.write_str("."),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, GetSize)]
pub struct GameOutcome {
    pub winner: Winner,
    pub winning_players: Vec<PlayerId>,
}

/// Free-form value stored by rules on players and on the room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, GetSize)]
pub enum Tag {
    Bool(bool),
    Int(i32),
    Text(String),
    Ints(Vec<i32>),
    Player(PlayerId),
}

impl Tag {
    pub fn as_bool(&self) -> bool {
        match self {
            Tag::Bool(b) => *b,
            Tag::Int(n) => *n != 0,
            Tag::Text(s) => !s.is_empty(),
            Tag::Ints(ns) => !ns.is_empty(),
            Tag::Player(_) => true,
        }
    }
    pub fn as_int(&self) -> i32 {
        match self {
            Tag::Bool(b) => *b as i32,
            Tag::Int(n) => *n,
            _ => 0,
        }
    }
}

/// Room-lifetime blackboard shared by every rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, GetSize)]
pub struct RoomState {
    pub tags: BTreeMap<String, Tag>,
}

impl RoomState {
    pub fn tag(&self, key: &str) -> Option<&Tag> {
        self.tags.get(key)
    }
    pub fn has_tag(&self, key: &str) -> bool {
        self.tags.get(key).is_some_and(|t| t.as_bool())
    }
    pub fn set_tag(&mut self, key: &str, tag: Tag) {
        self.tags.insert(key.into(), tag);
    }
    pub fn remove_tag(&mut self, key: &str) -> Option<Tag> {
        self.tags.remove(key)
    }
    pub fn int(&self, key: &str) -> i32 {
        self.tags.get(key).map(Tag::as_int).unwrap_or(0)
    }
    pub fn set_int(&mut self, key: &str, value: i32) {
        self.tags.insert(key.into(), Tag::Int(value));
    }
}

#[derive(Debug, Clone, PartialEq, Eq, GetSize)]
pub struct GameState {
    pub game_outcome: Option<GameOutcome>,
    pub mode: GameMode,
    pub players: Vec<Player>,
    pub cards: HashMap<CardId, CardInfo>,
    /// top is the front
    pub draw_pile: VecDeque<CardId>,
    /// top is the front
    pub discard_pile: VecDeque<CardId>,
    pub table: Vec<CardId>,
    pub current: PlayerId,
    pub turn_number: u32,
    pub pile_swaps: u32,
    pub room: RoomState,
    pub event_span: EventSpan,
}

impl GameState {
    pub fn new(mode: GameMode) -> Self {
        GameState {
            game_outcome: None,
            mode,
            players: Vec::new(),
            cards: HashMap::new(),
            draw_pile: VecDeque::new(),
            discard_pile: VecDeque::new(),
            table: Vec::new(),
            current: PlayerId(0),
            turn_number: 0,
            pile_swaps: 0,
            room: RoomState::default(),
            event_span: EventSpan::new(),
        }
    }

    pub fn player(&self, player: PlayerId) -> &Player {
        match self.players.get(player.index()) {
            Some(p) => p,
            None => {
                error!("unknown player: {player}");
                panic!("unknown player")
            }
        }
    }
    pub fn player_mut(&mut self, player: PlayerId) -> &mut Player {
        match self.players.get_mut(player.index()) {
            Some(p) => p,
            None => {
                error!("unknown player: {player}");
                panic!("unknown player")
            }
        }
    }

    pub fn card(&self, card: CardId) -> &CardInfo {
        match self.cards.get(&card) {
            Some(info) => info,
            None => {
                error!("unknown card: {card}");
                panic!("unknown card")
            }
        }
    }

    /// Seat order starting at `start`, dead players included.
    pub fn players_from(&self, start: PlayerId) -> Vec<PlayerId> {
        let count = self.players.len();
        (0..count)
            .map(|i| PlayerId(((start.index() + i) % count) as u8))
            .collect()
    }
    pub fn alive_players_from(&self, start: PlayerId) -> Vec<PlayerId> {
        self.players_from(start)
            .into_iter()
            .filter(|p| self.player(*p).alive)
            .collect()
    }
    /// Alive players in seat order, starting with the current player.
    pub fn alive_players(&self) -> Vec<PlayerId> {
        self.alive_players_from(self.current)
    }
    pub fn other_alive_players(&self, player: PlayerId) -> Vec<PlayerId> {
        self.alive_players_from(player)
            .into_iter()
            .filter(|p| *p != player)
            .collect()
    }
    pub fn lord(&self) -> Option<PlayerId> {
        self.players
            .iter()
            .find(|p| p.role == Role::Lord)
            .map(|p| p.id)
    }

    pub fn zone_of(&self, card: CardId) -> Option<CardPlace> {
        for player in &self.players {
            let owned = [
                (Place::Hand, &player.hand),
                (Place::Equip, &player.equips),
                (Place::DelayedTrick, &player.delayed_tricks),
                (Place::Judge, &player.judging),
            ];
            if let Some((place, _)) = owned.iter().find(|(_, cards)| cards.contains(&card)) {
                return Some(CardPlace::of(player.id, *place));
            }
        }
        if self.table.contains(&card) {
            Some(CardPlace::shared(Place::Table))
        } else if self.draw_pile.contains(&card) {
            Some(CardPlace::shared(Place::DrawPile))
        } else if self.discard_pile.contains(&card) {
            Some(CardPlace::shared(Place::DiscardPile))
        } else {
            None
        }
    }

    pub fn is_in(&self, card: CardId, place: Place) -> bool {
        self.zone_of(card).is_some_and(|z| z.place == place)
    }

    fn remove_from(&mut self, card: CardId, zone: CardPlace) {
        let removed = match (zone.owner, zone.place) {
            (_, Place::Table) => remove_card(&mut self.table, card),
            (_, Place::DrawPile) => remove_card_deque(&mut self.draw_pile, card),
            (_, Place::DiscardPile) => remove_card_deque(&mut self.discard_pile, card),
            (Some(owner), place) => {
                let player = self.player_mut(owner);
                match place {
                    Place::Hand => remove_card(&mut player.hand, card),
                    Place::Equip => remove_card(&mut player.equips, card),
                    Place::DelayedTrick => remove_card(&mut player.delayed_tricks, card),
                    _ => remove_card(&mut player.judging, card),
                }
            }
            (None, _) => false,
        };
        if !removed {
            error!("card {card} is not in {zone:?}");
            panic!("card is not in its zone");
        }
    }

    fn add_to(&mut self, card: CardId, zone: CardPlace) {
        match (zone.owner, zone.place) {
            (_, Place::Table) => self.table.push(card),
            (_, Place::DrawPile) => self.draw_pile.push_front(card),
            (_, Place::DiscardPile) => self.discard_pile.push_front(card),
            (Some(owner), place) => {
                let player = self.player_mut(owner);
                match place {
                    Place::Hand => player.hand.push(card),
                    Place::Equip => player.equips.push(card),
                    Place::DelayedTrick => player.delayed_tricks.push(card),
                    _ => player.judging.push(card),
                }
            }
            (None, place) => {
                error!("{place:?} needs an owner");
                panic!("zone needs an owner");
            }
        }
    }
}

fn remove_card(cards: &mut Vec<CardId>, card: CardId) -> bool {
    let Some(index) = cards.iter().position(|c| *c == card) else {
        return false;
    };
    cards.remove(index);
    true
}
fn remove_card_deque(cards: &mut VecDeque<CardId>, card: CardId) -> bool {
    let Some(index) = cards.iter().position(|c| *c == card) else {
        return false;
    };
    cards.remove(index);
    true
}

#[derive(Debug)]
pub struct Game {
    pub rng: DebugIgnore<Box<dyn RngCore + Send>>,
    pub state: GameState,
    pub config: RoomConfig,
    pub triggers: TriggerRegistry,
    pub mailbox: Synchronizer,
    pub sink: DebugIgnore<Box<dyn NotificationSink>>,
}

impl Game {
    /// Seats players from the config, shuffles the standard deck and installs the mode rules.
    pub fn setup(config: RoomConfig, mailbox: Synchronizer) -> Game {
        let mut rng: Box<dyn RngCore + Send> = match config.seed {
            Some(seed) => Box::new(StdRng::seed_from_u64(seed)),
            None => Box::new(StdRng::from_entropy()),
        };

        let mode = GameMode::from(config.mode);
        let mut roles = mode.default_roles(config.players);
        // the lord keeps the first seat
        if roles.len() > 1 {
            roles[1..].shuffle(&mut rng);
        }

        let mut state = GameState::new(mode);
        state.players = config
            .seat_generals()
            .iter()
            .zip(roles)
            .enumerate()
            .map(|(seat, (general, role))| {
                Player::new(
                    PlayerId(seat as u8),
                    &general.name,
                    &general.kingdom,
                    role,
                    general.max_hp,
                )
            })
            .collect();

        for (index, (kind, suit, number)) in standard_deck().into_iter().enumerate() {
            let id = CardId::new(index as u16 + 1);
            state.cards.insert(
                id,
                CardInfo {
                    id,
                    kind,
                    suit,
                    number,
                },
            );
            state.draw_pile.push_back(id);
        }
        state.draw_pile.make_contiguous().shuffle(&mut rng);
        state.current = state.lord().unwrap_or(PlayerId(0));

        let mut game = Game {
            rng: DebugIgnore(rng),
            state,
            config,
            triggers: TriggerRegistry::new(),
            mailbox,
            sink: DebugIgnore(Box::new(TracingSink::new())),
        };
        game.install_rules();
        game
    }

    pub fn with_game_state<R: RngCore + Send + 'static>(
        state: GameState,
        config: RoomConfig,
        mailbox: Synchronizer,
        rng: R,
    ) -> Self {
        let mut game = Game {
            rng: DebugIgnore(Box::new(rng)),
            state,
            config,
            triggers: TriggerRegistry::new(),
            mailbox,
            sink: DebugIgnore(Box::new(TracingSink::new())),
        };
        game.install_rules();
        game
    }

    pub fn with_sink(mut self, sink: impl NotificationSink + 'static) -> Self {
        self.sink = DebugIgnore(Box::new(sink));
        self
    }

    pub fn install_rules(&mut self) {
        let mode = self.state.mode;
        mode.install(&mut self.triggers);
    }

    pub fn player(&self, player: PlayerId) -> &Player {
        self.state.player(player)
    }
    pub fn player_mut(&mut self, player: PlayerId) -> &mut Player {
        self.state.player_mut(player)
    }
    pub fn card_info(&self, card: CardId) -> &CardInfo {
        self.state.card(card)
    }
    pub fn current(&self) -> PlayerId {
        self.state.current
    }
    pub fn alive_players(&self) -> Vec<PlayerId> {
        self.state.alive_players()
    }
    pub fn is_alive(&self, player: PlayerId) -> bool {
        self.player(player).alive
    }

    // turn driver

    pub fn start_game(&mut self) -> TurnResult {
        info!("game ready - mode: {}", self.state.mode.name());
        let result = self
            .trigger(TriggerEvent::GameReady, None, &mut EventData::None)
            .map(|_| GameContinue);
        self.contain(result).map_err(|outcome| {
            info!("game over before the first turn: {outcome:?}");
            outcome
        })?;
        Ok(GameContinue)
    }

    /// Plays the turn of the current player, then hands the turn to the next seat.
    pub fn next_turn(&mut self) -> TurnResult {
        if let Some(outcome) = &self.state.game_outcome {
            return Err(outcome.clone());
        }

        let player = self.state.current;
        self.state.turn_number += 1;
        info!("turn {} - player: {player}", self.state.turn_number);

        let result = self.trigger(TriggerEvent::TurnStart, Some(player), &mut EventData::None);
        let advance = match result {
            Ok(_) => true,
            Err(Interrupt::TurnBroken) => {
                self.handle_turn_broken(player)?;
                true
            }
            Err(Interrupt::StageChange) => {
                self.handle_stage_change(player)?;
                false
            }
            Err(Interrupt::GameOver(outcome)) => return Err(outcome),
        };

        if advance {
            self.state.current = self.next_turn_player(player);
        }
        Ok(GameContinue)
    }

    pub fn run(&mut self) -> GameOutcome {
        let mut result = self.start_game();
        while result.is_ok() {
            result = self.next_turn();
        }
        match result {
            Err(outcome) => outcome,
            Ok(_) => unreachable!("the loop only stops on a finished game"),
        }
    }

    /// Keeps only a finished game, other interrupts are logged and dropped.
    fn contain(&mut self, result: GameResult) -> TurnResult {
        match result {
            Ok(_) => Ok(GameContinue),
            Err(Interrupt::GameOver(outcome)) => Err(outcome),
            Err(interrupt) => {
                warn!("interrupt during recovery: {interrupt:?}");
                Ok(GameContinue)
            }
        }
    }

    fn handle_turn_broken(&mut self, player: PlayerId) -> TurnResult {
        info!("turn broken: {player}");
        self.mailbox.drain();
        let result = self
            .trigger(TriggerEvent::TurnBroken, Some(player), &mut EventData::None)
            .map(|_| GameContinue);
        self.contain(result)?;
        let result = self.force_end_turn(player);
        self.contain(result)
    }

    fn handle_stage_change(&mut self, player: PlayerId) -> TurnResult {
        info!("stage change during the turn of {player}");
        self.mailbox.drain();
        let result = self.force_end_turn(player);
        self.contain(result)?;

        let result = self
            .trigger(TriggerEvent::StageChange, None, &mut EventData::None)
            .map(|_| GameContinue);
        self.contain(result)?;

        let lord = self.state.lord().unwrap_or(player);
        for other in self.state.players_from(lord) {
            if other == lord {
                continue;
            }
            let result = if self.is_alive(other) {
                self.set_chained(other, false)
            } else if self.player(other).max_hp > 0 {
                let max_hp = self.player(other).max_hp;
                self.set_hp(other, max_hp);
                self.revive(other)
            } else {
                Ok(GameContinue)
            };
            self.contain(result)?;
        }

        self.state.current = lord;
        Ok(GameContinue)
    }

    /// Runs the base rule end of phase then deactivates `player`.
    pub fn force_end_turn(&mut self, player: PlayerId) -> GameResult {
        let phase = self.player(player).phase();
        if phase != Phase::NotActive {
            self.trigger_game_rule(TriggerEvent::EventPhaseEnd, Some(player), &mut EventData::None)?;
            self.change_phase(player, self.player(player).phase(), Phase::NotActive)?;
        }
        Ok(GameContinue)
    }

    pub fn next_turn_player(&self, player: PlayerId) -> PlayerId {
        let mode = self.state.mode;
        self.state
            .players_from(player)
            .into_iter()
            .skip(1)
            .find(|p| mode.takes_turn(self.player(*p)))
            .unwrap_or(player)
    }

    /// Plays a whole turn for `player` right now, then gives the turn back.
    pub fn gain_an_extra_turn(&mut self, player: PlayerId) -> GameResult {
        let previous = self.state.current;
        let tag = format!("Global_ExtraTurn{player}");
        self.state.room.set_tag(&tag, Tag::Bool(true));
        self.state.current = player;

        let result = self.trigger(TriggerEvent::TurnStart, Some(player), &mut EventData::None);

        if result == Err(Interrupt::TurnBroken) {
            let cleanup = self.force_end_turn(player);
            self.state.current = previous;
            self.state.room.remove_tag(&tag);
            if let Err(Interrupt::GameOver(outcome)) = cleanup {
                return Err(Interrupt::GameOver(outcome));
            }
            return Err(Interrupt::TurnBroken);
        }

        self.state.current = previous;
        self.state.room.remove_tag(&tag);
        result.map(|_| GameContinue)
    }

    pub fn game_over(&mut self, winner: Winner) -> GameResult {
        if let Some(outcome) = &self.state.game_outcome {
            return Err(Interrupt::GameOver(outcome.clone()));
        }

        let winning_players = self
            .state
            .players
            .iter()
            .filter(|p| match &winner {
                Winner::Roles(roles) => roles.contains(&p.role),
                Winner::Kingdom(kingdom) => p.true_kingdom() == kingdom,
                Winner::Draw => false,
            })
            .map(|p| p.id)
            .collect_vec();
        let outcome = GameOutcome {
            winner,
            winning_players,
        };

        info!("game over: {outcome:?}");
        self.send_log(LogMessage::new("#GameOver").arg(&outcome.winner));
        self.notify(Notice::GameOver(outcome.clone()));
        self.state.game_outcome = Some(outcome.clone());
        Err(Interrupt::GameOver(outcome))
    }

    // notices

    pub fn notify(&mut self, notice: Notice) {
        self.sink.notify(&notice);
        self.mailbox.broadcast(&notice);
    }

    pub fn send_log(&mut self, log: LogMessage) {
        info!("{log}");
        self.notify(Notice::Log(log));
    }

    pub fn notify_property(&mut self, player: PlayerId, name: &str, value: impl ToString) {
        self.notify(Notice::Property {
            player,
            name: name.into(),
            value: value.to_string(),
        });
    }

    // player state

    pub fn set_hp(&mut self, player: PlayerId, hp: i32) {
        self.player_mut(player).hp = hp;
        self.notify_property(player, "hp", hp);
    }

    pub fn set_chained(&mut self, player: PlayerId, chained: bool) -> GameResult {
        if self.player(player).chained == chained {
            return Ok(GameContinue);
        }
        self.player_mut(player).chained = chained;
        self.notify_property(player, "chained", chained);
        self.trigger(TriggerEvent::ChainStateChanged, Some(player), &mut EventData::None)?;
        Ok(GameContinue)
    }

    pub fn set_face_up(&mut self, player: PlayerId, face_up: bool) {
        self.player_mut(player).face_up = face_up;
        self.notify_property(player, "faceup", face_up);
    }

    // cards

    /// Moves every card at once, then reports the whole move.
    pub fn move_cards(&mut self, moves: Vec<CardsMove>) -> GameResult {
        for cards_move in moves {
            if cards_move.cards.is_empty() {
                continue;
            }
            let mut moved = Vec::new();
            for card in &cards_move.cards {
                let Some(from) = self.state.zone_of(*card) else {
                    error!("card {card} is not in any zone");
                    panic!("card is not in any zone");
                };
                self.state.remove_from(*card, from);
                self.state.add_to(*card, cards_move.to);
                moved.push(MovedCard {
                    card: *card,
                    from,
                    to: cards_move.to,
                });
            }

            self.notify(Notice::CardsMoved {
                cards: cards_move.cards.clone(),
                to: cards_move.to,
            });
            let origin = cards_move.reason.player;
            let mut data = EventData::CardsMove(CardsMoveContext {
                moves: moved,
                reason: cards_move.reason,
            });
            self.trigger(TriggerEvent::CardsMoveOneTime, origin, &mut data)?;
        }
        Ok(GameContinue)
    }

    pub fn move_card(&mut self, card: CardId, to: CardPlace, reason: MoveReason) -> GameResult {
        self.move_cards(vec![CardsMove::new(vec![card], to, reason)])
    }

    /// Takes cards from the top of the draw pile, reshuffling the discard pile when needed.
    pub fn take_draw_pile(&mut self, n: usize) -> Result<Vec<CardId>, Interrupt> {
        let mut taken = Vec::with_capacity(n);
        while taken.len() < n {
            if self.state.draw_pile.is_empty() {
                self.swap_pile()?;
            }
            if let Some(card) = self.state.draw_pile.pop_front() {
                taken.push(card);
            }
        }
        // put them back for the move to find them
        for card in taken.iter().rev() {
            self.state.draw_pile.push_front(*card);
        }
        Ok(taken)
    }

    pub fn draw_top_card(&mut self) -> Result<CardId, Interrupt> {
        let mut cards = self.take_draw_pile(1)?;
        match cards.pop() {
            Some(card) => Ok(card),
            None => unreachable!("one card was taken"),
        }
    }

    fn swap_pile(&mut self) -> GameResult {
        if self.state.discard_pile.is_empty() {
            info!("no card left to draw");
            return self.game_over(Winner::Draw);
        }
        self.state.pile_swaps += 1;
        if self.config.max_pile_swaps > 0 && self.state.pile_swaps > self.config.max_pile_swaps {
            info!("too many pile swaps: {}", self.state.pile_swaps);
            return self.game_over(Winner::Draw);
        }

        let mut pile = self.state.discard_pile.drain(..).collect_vec();
        pile.shuffle(&mut *self.rng);
        self.state.draw_pile.extend(pile);
        self.send_log(LogMessage::new("#SwapPile").arg(self.state.pile_swaps));
        Ok(GameContinue)
    }

    pub fn draw_cards(&mut self, player: PlayerId, n: i32, reason: &str) -> GameResult {
        if n <= 0 || !self.is_alive(player) {
            return Ok(GameContinue);
        }
        let cards = self.take_draw_pile(n as usize)?;
        info!("{player} draws {n} - reason: {reason}");
        let mut move_reason = MoveReason::new(MoveReasonKind::Draw, Some(player));
        move_reason.skill_name = Some(reason.into());
        self.move_cards(vec![CardsMove::new(
            cards,
            CardPlace::of(player, Place::Hand),
            move_reason,
        )])
    }

    pub fn throw_cards(
        &mut self,
        cards: Vec<CardId>,
        player: Option<PlayerId>,
        kind: MoveReasonKind,
    ) -> GameResult {
        if cards.is_empty() {
            return Ok(GameContinue);
        }
        self.move_cards(vec![CardsMove::new(
            cards,
            CardPlace::shared(Place::DiscardPile),
            MoveReason::new(kind, player),
        )])
    }

    /// Sends what is left of `card` on the table to the discard pile.
    pub fn discard_from_table(&mut self, card: &Card) -> GameResult {
        let leftovers = card
            .card_ids()
            .into_iter()
            .filter(|c| self.state.is_in(*c, Place::Table))
            .collect_vec();
        self.throw_cards(leftovers, None, MoveReasonKind::Use)
    }
}
