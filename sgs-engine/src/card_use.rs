use iter_tools::Itertools;
use tracing::{debug, info};

use crate::cards::{
    Capability, Card, CardBehavior, CardDisplay, CardKind, CardPlace, CardsMove, Jink,
    MoveReason, MoveReasonKind, Place,
};
use crate::damage::DamageNature;
use crate::events::{
    Answer, ChoiceRecord, EventData, LogMessage, Notice, PlayOption, Question, TriggerEvent,
};
use crate::gameplay::{CardId, Game, GameContinue, GameResult, Interrupt, PlayerId, Tag};

/// Players singled out by a card use, or all of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetList {
    pub all: bool,
    pub players: Vec<PlayerId>,
}

impl TargetList {
    pub fn all() -> Self {
        TargetList {
            all: true,
            players: Vec::new(),
        }
    }
    pub fn contains(&self, player: PlayerId) -> bool {
        self.all || self.players.contains(&player)
    }
    pub fn add(&mut self, player: PlayerId) {
        if !self.players.contains(&player) {
            self.players.push(player);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardUseContext {
    pub from: PlayerId,
    pub to: Vec<PlayerId>,
    pub card: Card,
    pub nullified_list: TargetList,
    pub no_respond_list: TargetList,
    pub no_offset_list: TargetList,
    pub is_owner_use: bool,
    pub add_history: bool,
    /// analeptic boost carried by a slash
    pub drank: i32,
}

impl CardUseContext {
    pub fn new(from: PlayerId, card: Card, to: Vec<PlayerId>) -> Self {
        CardUseContext {
            from,
            to,
            card,
            nullified_list: TargetList::default(),
            no_respond_list: TargetList::default(),
            no_offset_list: TargetList::default(),
            is_owner_use: true,
            add_history: true,
            drank: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardEffectContext {
    pub card: Card,
    pub from: Option<PlayerId>,
    pub to: PlayerId,
    pub multiple: bool,
    /// position of `to` among the use targets
    pub target_index: usize,
    pub nullified: bool,
    pub no_respond: bool,
    pub no_offset: bool,
    pub drank: i32,
}

impl CardEffectContext {
    pub fn new(card: Card, from: Option<PlayerId>, to: PlayerId) -> Self {
        CardEffectContext {
            card,
            from,
            to,
            multiple: false,
            target_index: 0,
            nullified: false,
            no_respond: false,
            no_offset: false,
            drank: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlashEffectContext {
    pub from: PlayerId,
    pub to: PlayerId,
    pub slash: Card,
    pub jink: Option<Card>,
    /// jinks needed to dodge
    pub jink_num: i32,
    pub nature: DamageNature,
    pub drank: i32,
    pub nullified: bool,
    pub no_respond: bool,
    pub no_offset: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardResponseContext {
    pub from: PlayerId,
    pub card: Card,
    pub capability: Capability,
    pub prompt: String,
    /// the card is used rather than played in response
    pub is_use: bool,
}

impl Game {
    /// Plays `card_use` through the whole use pipeline.
    ///
    /// A use whose targets were all dropped while confirming stops right after
    /// `CardUsed`, without `CardFinished`.
    pub fn use_card(&mut self, card_use: CardUseContext) -> GameResult {
        let from = card_use.from;
        let mut data = EventData::CardUse(card_use);
        self.trigger(TriggerEvent::PreCardUsed, Some(from), &mut data)?;

        let card_use = data.card_use_mut();
        let current = self.state.current;
        let order = self.state.players_from(current);
        card_use.to.sort_by_key(|p| order.iter().position(|o| o == p));
        let card_use = card_use.clone();

        if card_use.add_history {
            self.player_mut(from)
                .add_history(card_use.card.kind.history_key(), 1);
        }

        let mut log = LogMessage::new("#UseCard").from(from).arg(&card_use.card);
        for target in &card_use.to {
            log = log.to(*target);
        }
        self.send_log(log);
        self.notify(Notice::CardUsed {
            from,
            to: card_use.to.clone(),
            card: card_use.card.to_string(),
        });

        let to_table = card_use
            .card
            .card_ids()
            .into_iter()
            .filter(|c| !self.state.is_in(*c, Place::Table))
            .collect_vec();
        let mut reason = MoveReason::new(MoveReasonKind::Use, Some(from));
        reason.skill_name = card_use.card.skill_name.clone();
        self.move_cards(vec![CardsMove::new(
            to_table,
            CardPlace::shared(Place::Table),
            reason,
        )])?;

        self.trigger(TriggerEvent::CardUsed, Some(from), &mut data)?;

        let card_use = data.card_use();
        if card_use.card.kind.needs_targets() && card_use.to.is_empty() {
            debug!("card use without target left: {}", card_use.card);
            let card = card_use.card.clone();
            return self.discard_from_table(&card);
        }

        self.trigger(TriggerEvent::CardFinished, Some(from), &mut data)?;
        let card = data.into_card_use().card;
        self.discard_from_table(&card)
    }

    /// Target confirmation then the card's own use, runs inside `CardUsed`.
    pub fn drive_card_use(&mut self, data: &mut EventData) -> GameResult {
        let from = data.card_use().from;
        if !data.card_use().to.is_empty() {
            self.trigger(TriggerEvent::TargetSpecifying, Some(from), data)?;
            let specified = data.card_use().to.clone();
            for target in specified {
                if data.card_use().to.contains(&target) {
                    self.trigger(TriggerEvent::TargetConfirming, Some(target), data)?;
                }
            }
        }

        let card_use = data.card_use();
        if card_use.card.kind.needs_targets() && card_use.to.is_empty() {
            return Ok(GameContinue);
        }

        if !card_use.card.kind.is_slash() {
            return self.finish_card_use(data);
        }

        // one jink per target unless a handler asks for more
        let key = format!("Jink_{}", card_use.card.key());
        let jinks = vec![1; card_use.to.len()];
        let backup = self.player_mut(from).remove_tag(&key);
        self.player_mut(from).set_tag(&key, Tag::Ints(jinks));

        let result = self.finish_card_use(data);

        let player = self.player_mut(from);
        match (&result, backup) {
            (Ok(_), Some(backup)) => player.set_tag(&key, backup),
            _ => {
                player.remove_tag(&key);
            }
        }
        result
    }

    fn finish_card_use(&mut self, data: &mut EventData) -> GameResult {
        let from = data.card_use().from;
        if !data.card_use().to.is_empty() {
            self.trigger(TriggerEvent::TargetSpecified, Some(from), data)?;
            let current = self.state.current;
            for player in self.state.players_from(current) {
                self.trigger(TriggerEvent::TargetConfirmed, Some(player), data)?;
            }
        }

        let mut card_use = data.card_use().clone();
        let kind = card_use.card.kind;
        kind.on_use(self, &mut card_use)?;
        *data.card_use_mut() = card_use;
        Ok(GameContinue)
    }

    /// Default use: one effect per target, in order.
    pub fn effect_each_target(&mut self, card_use: &mut CardUseContext) -> GameResult {
        let targets = card_use.to.clone();
        for (index, target) in targets.iter().enumerate() {
            let effect = CardEffectContext {
                card: card_use.card.clone(),
                from: Some(card_use.from),
                to: *target,
                multiple: targets.len() > 1,
                target_index: index,
                nullified: card_use.nullified_list.contains(*target),
                no_respond: card_use.no_respond_list.contains(*target),
                no_offset: card_use.no_offset_list.contains(*target),
                drank: card_use.drank,
            };
            self.card_effect(effect)?;
        }
        Ok(GameContinue)
    }

    /// `Ok(true)` when the effect went through.
    pub fn card_effect(&mut self, effect: CardEffectContext) -> Result<bool, Interrupt> {
        let to = effect.to;
        if !self.is_alive(to) && !effect.card.kind.is_slash() {
            return Ok(false);
        }
        let mut data = EventData::CardEffect(effect);
        let vetoed = self.trigger(TriggerEvent::CardEffected, Some(to), &mut data)?;
        Ok(!vetoed)
    }

    /// Whether a trick effect gets cancelled by a nullification race.
    pub fn is_canceled(&mut self, effect: &CardEffectContext) -> Result<bool, Interrupt> {
        if !effect.card.kind.is_trick() {
            return Ok(false);
        }
        let mut data = EventData::CardEffect(effect.clone());
        if self.trigger(TriggerEvent::TrickCardCanceling, effect.from, &mut data)? {
            return Ok(false);
        }

        let depth = self.state.room.int("NullifyingTimes");
        self.state.room.set_int("NullifyingTimes", depth + 1);
        let result = self.nullification_race(effect);
        self.state.room.set_int("NullifyingTimes", depth);
        result
    }

    fn nullification_race(&mut self, effect: &CardEffectContext) -> Result<bool, Interrupt> {
        let prompt = format!("@nullification:{}:{}", effect.card.name(), effect.to);
        let questions = self
            .alive_players()
            .into_iter()
            .filter_map(|player| {
                let candidates = self.hand_with(player, |kind| {
                    kind.has_capability(Capability::Nullify)
                });
                (!candidates.is_empty()).then(|| Question::RespondCard {
                    player,
                    capability: Capability::Nullify,
                    prompt: prompt.clone(),
                    candidates,
                })
            })
            .collect_vec();
        if questions.is_empty() {
            return Ok(false);
        }

        self.notify(Notice::NullificationAsked { player: None });
        let timeout = self.config.nullification_timeout();
        let answers = self.mailbox.ask_race(questions.clone(), timeout)?;
        let replied = questions
            .iter()
            .zip(answers)
            .find_map(|(question, answer)| match answer {
                Answer::Card(Some(card)) => Some((question.player(), card)),
                _ => None,
            });
        let Some((player, card)) = replied else {
            return Ok(false);
        };

        self.choice_made(ChoiceRecord::CardResponded {
            player,
            prompt,
            card: Some(card),
        })?;
        let nullification = Card::real(self.card_info(card));
        self.use_card(CardUseContext::new(player, nullification.clone(), Vec::new()))?;

        // the nullification can be nullified in turn
        let counter = CardEffectContext::new(nullification, Some(player), effect.to);
        let countered = self.is_canceled(&counter)?;
        Ok(!countered)
    }

    pub fn slash_effect(&mut self, effect: SlashEffectContext) -> GameResult {
        let to = effect.to;
        let mut data = EventData::SlashEffect(effect);
        self.trigger(TriggerEvent::SlashEffected, Some(to), &mut data)?;
        Ok(GameContinue)
    }

    /// Asks the target for as many jinks as needed, all or nothing.
    pub fn ask_for_jinks(&mut self, effect: &SlashEffectContext) -> Result<Option<Card>, Interrupt> {
        let prompt = format!("slash-jink:{}", effect.from);
        if effect.jink_num == 1 {
            return self.ask_for_card(effect.to, Capability::JinkLike, &prompt, false);
        }

        let mut jinks = Vec::new();
        for i in 0..effect.jink_num {
            let prompt = format!("@multi-jink:{}:{}", effect.from, effect.jink_num - i);
            match self.ask_for_card(effect.to, Capability::JinkLike, &prompt, false)? {
                Some(jink) => jinks.extend(jink.card_ids()),
                None => return Ok(None),
            }
        }
        let infos = jinks.iter().map(|c| *self.card_info(*c)).collect_vec();
        Ok(Some(Card::virtual_card(Jink.into(), &infos)))
    }

    pub fn slash_result(&mut self, mut effect: SlashEffectContext, jink: Option<Card>) -> GameResult {
        effect.jink = jink;
        let (from, to) = (effect.from, effect.to);
        let missed = effect.jink.is_some();
        let mut data = EventData::SlashEffect(effect);
        if missed {
            self.trigger(TriggerEvent::SlashMissed, Some(from), &mut data)?;
        } else if self.is_alive(to) {
            self.trigger(TriggerEvent::SlashHit, Some(from), &mut data)?;
        }
        Ok(GameContinue)
    }

    fn hand_with(&self, player: PlayerId, matches: impl Fn(&CardKind) -> bool) -> Vec<CardDisplay> {
        self.player(player)
            .hand
            .iter()
            .map(|c| self.card_info(*c))
            .filter(|info| matches(&info.kind))
            .map(CardDisplay::new)
            .collect()
    }

    /// Asks `player` to play a card able to stand for `capability`.
    pub fn ask_for_card(
        &mut self,
        player: PlayerId,
        capability: Capability,
        prompt: &str,
        is_use: bool,
    ) -> Result<Option<Card>, Interrupt> {
        if !self.is_alive(player) {
            return Ok(None);
        }
        let candidates = self.hand_with(player, |kind| kind.has_capability(capability));
        let picked = if candidates.is_empty() {
            None
        } else {
            let question = Question::RespondCard {
                player,
                capability,
                prompt: prompt.into(),
                candidates,
            };
            match self.ask(question)? {
                Answer::Card(card) => card,
                _ => unreachable!("the mailbox only returns accepted answers"),
            }
        };
        self.choice_made(ChoiceRecord::CardResponded {
            player,
            prompt: prompt.into(),
            card: picked,
        })?;
        let Some(picked) = picked else {
            return Ok(None);
        };

        let card = Card::real(self.card_info(picked));
        let mut data = EventData::CardResponse(CardResponseContext {
            from: player,
            card: card.clone(),
            capability,
            prompt: prompt.into(),
            is_use,
        });
        self.trigger(TriggerEvent::PreCardResponded, Some(player), &mut data)?;

        let kind = if is_use {
            MoveReasonKind::Use
        } else {
            MoveReasonKind::Response
        };
        self.move_card(
            picked,
            CardPlace::shared(Place::Table),
            MoveReason::new(kind, Some(player)),
        )?;
        self.send_log(LogMessage::new("#Response").from(player).arg(&card));

        self.trigger(TriggerEvent::CardResponded, Some(player), &mut data)?;
        let card = data.into_card_response().card;
        self.discard_from_table(&card)?;
        Ok(Some(card))
    }

    /// Asks `saver` for one card able to bring `who` back, then uses it.
    pub fn ask_for_peach(&mut self, saver: PlayerId, who: PlayerId) -> Result<bool, Interrupt> {
        let candidates = self.hand_with(saver, |kind| {
            kind.has_capability(Capability::Rescue)
                || (saver == who && kind.has_capability(Capability::SelfRescue))
        });
        if candidates.is_empty() {
            return Ok(false);
        }

        let prompt = format!("@askforpeach:{who}:{}", 1 - self.player(who).hp);
        let question = Question::RespondCard {
            player: saver,
            capability: Capability::Rescue,
            prompt: prompt.clone(),
            candidates,
        };
        let picked = match self.ask(question)? {
            Answer::Card(card) => card,
            _ => unreachable!("the mailbox only returns accepted answers"),
        };
        self.choice_made(ChoiceRecord::CardResponded {
            player: saver,
            prompt,
            card: picked,
        })?;
        let Some(picked) = picked else {
            return Ok(false);
        };

        let card = Card::real(self.card_info(picked));
        self.use_card(CardUseContext::new(saver, card, vec![who]))?;
        Ok(true)
    }

    /// Makes `player` discard `amount` hand cards, all of them without asking when short.
    pub fn ask_for_discard(
        &mut self,
        player: PlayerId,
        reason: &str,
        amount: usize,
        optional: bool,
    ) -> Result<Vec<CardId>, Interrupt> {
        let hand = self.player(player).hand.clone();
        if amount == 0 || hand.is_empty() {
            return Ok(Vec::new());
        }

        let cards = if !optional && hand.len() <= amount {
            hand
        } else {
            let question = Question::Discard {
                player,
                reason: reason.into(),
                amount,
                optional,
                candidates: hand
                    .iter()
                    .map(|c| CardDisplay::new(self.card_info(*c)))
                    .collect(),
            };
            match self.ask(question)? {
                Answer::Cards(cards) => cards,
                _ => unreachable!("the mailbox only returns accepted answers"),
            }
        };
        if cards.is_empty() {
            return Ok(cards);
        }

        info!("{player} discards {} - reason: {reason}", cards.iter().join(", "));
        self.send_log(
            LogMessage::new("$DiscardCard")
                .from(player)
                .arg(cards.iter().join("+")),
        );
        self.throw_cards(cards.clone(), Some(player), MoveReasonKind::Discard)?;
        self.choice_made(ChoiceRecord::Discard {
            player,
            reason: reason.into(),
            cards: cards.clone(),
        })?;
        Ok(cards)
    }

    /// Every card `player` could play now, with its possible targets.
    pub fn play_options(&self, player: PlayerId) -> Vec<PlayOption> {
        self.player(player)
            .hand
            .iter()
            .map(|c| self.card_info(*c))
            .flat_map(|info| {
                info.kind
                    .play_targets(self, player)
                    .into_iter()
                    .map(|targets| PlayOption {
                        card: CardDisplay::new(info),
                        targets,
                    })
            })
            .collect()
    }

    /// One play opportunity, `Ok(false)` once the player passes.
    pub fn activate(&mut self, player: PlayerId) -> Result<bool, Interrupt> {
        let options = self.play_options(player);
        if options.is_empty() {
            return Ok(false);
        }

        let option = match self.ask(Question::PlayCard { player, options })? {
            Answer::Play(option) => option,
            _ => unreachable!("the mailbox only returns accepted answers"),
        };
        let Some(option) = option else {
            return Ok(false);
        };

        let card = Card::real(self.card_info(option.card.card));
        self.use_card(CardUseContext::new(player, card, option.targets))?;
        Ok(true)
    }
}
