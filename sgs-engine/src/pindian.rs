use std::cmp::Ordering;
use std::fmt::{self, Display};

use iter_tools::Itertools;
use tracing::info;

use crate::cards::{CardDisplay, CardPlace, CardsMove, MoveReason, MoveReasonKind, Place};
use crate::events::{Answer, ChoiceRecord, EventData, LogMessage, Notice, Question, TriggerEvent};
use crate::gameplay::{CardId, Game, Interrupt, PlayerId};

/// The other side of a pindian.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PindianTarget {
    Player(PlayerId),
    DrawPile,
}

impl PindianTarget {
    pub fn player(self) -> Option<PlayerId> {
        match self {
            PindianTarget::Player(player) => Some(player),
            PindianTarget::DrawPile => None,
        }
    }
}

impl Display for PindianTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PindianTarget::Player(player) => write!(f, "{player}"),
            PindianTarget::DrawPile => f.write_str("drawpile"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PindianOutcome {
    FromWins,
    ToWins,
    Draw,
}

impl PindianOutcome {
    /// Strictly greater wins.
    pub fn compare(from_number: u8, to_number: u8) -> Self {
        match from_number.cmp(&to_number) {
            Ordering::Greater => PindianOutcome::FromWins,
            Ordering::Less => PindianOutcome::ToWins,
            Ordering::Equal => PindianOutcome::Draw,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PindianContext {
    pub reason: String,
    pub from: PlayerId,
    pub to: PindianTarget,
    pub from_card: Option<CardId>,
    pub to_card: Option<CardId>,
    pub from_number: u8,
    pub to_number: u8,
    pub success: bool,
}

impl PindianContext {
    pub fn new(from: PlayerId, to: PindianTarget, reason: &str) -> Self {
        PindianContext {
            reason: reason.into(),
            from,
            to,
            from_card: None,
            to_card: None,
            from_number: 0,
            to_number: 0,
            success: false,
        }
    }

    pub fn outcome(&self) -> PindianOutcome {
        PindianOutcome::compare(self.from_number, self.to_number)
    }
}

impl Game {
    /// Pindian between `from` and `to`, `from_card` when already chosen by a skill.
    pub fn resolve_pindian(
        &mut self,
        from: PlayerId,
        to: PindianTarget,
        reason: &str,
        from_card: Option<CardId>,
    ) -> Result<PindianContext, Interrupt> {
        let mut log = LogMessage::new("#Pindian").from(from).arg(reason);
        if let Some(to) = to.player() {
            log = log.to(to);
        }
        self.send_log(log);

        let mut pindian = PindianContext::new(from, to, reason);
        pindian.from_card = from_card;
        let mut data = EventData::Pindian(pindian);
        self.trigger(TriggerEvent::AskforPindianCard, Some(from), &mut data)?;

        let pindian = data.pindian();
        let mut missing = Vec::new();
        if pindian.from_card.is_none() {
            missing.push(PindianTarget::Player(from));
        }
        if pindian.to_card.is_none() {
            missing.push(to);
        }
        let mut picked = self.pindian_cards(&missing, reason)?.into_iter();
        let pindian = data.pindian_mut();
        if pindian.from_card.is_none() {
            pindian.from_card = picked.next();
        }
        if pindian.to_card.is_none() {
            pindian.to_card = picked.next();
        }
        let (Some(from_card), Some(to_card)) = (pindian.from_card, pindian.to_card) else {
            unreachable!("one card per missing side");
        };

        self.move_cards(vec![CardsMove::new(
            vec![from_card, to_card],
            CardPlace::shared(Place::Table),
            MoveReason::new(MoveReasonKind::Pindian, Some(from)),
        )])?;

        let pindian = data.pindian_mut();
        pindian.from_number = self.state.card(from_card).number;
        pindian.to_number = self.state.card(to_card).number;
        self.send_log(LogMessage::new("$PindianResult").from(from).arg(from_card));
        let mut log = LogMessage::new("$PindianResult").arg(to_card);
        if let Some(to) = to.player() {
            log = log.from(to);
        }
        self.send_log(log);

        self.trigger(TriggerEvent::PindianVerifying, Some(from), &mut data)?;

        let pindian = data.pindian_mut();
        pindian.success = pindian.outcome() == PindianOutcome::FromWins;
        info!(
            "pindian {from} {} vs {to} {} - success: {}",
            pindian.from_number, pindian.to_number, pindian.success
        );
        let notice = Notice::Pindian {
            from,
            to,
            from_number: pindian.from_number,
            to_number: pindian.to_number,
            success: pindian.success,
        };
        self.send_log(
            LogMessage::new(if pindian.success {
                "#PindianSuccess"
            } else {
                "#PindianFailure"
            })
            .from(from),
        );
        self.notify(notice);

        self.trigger(TriggerEvent::Pindian, Some(from), &mut data)?;

        // a handler may have taken a card already
        let on_table = [from_card, to_card]
            .into_iter()
            .filter(|c| self.state.is_in(*c, Place::Table))
            .collect_vec();
        self.throw_cards(on_table, Some(from), MoveReasonKind::Pindian)?;

        self.choice_made(ChoiceRecord::Pindian {
            reason: reason.into(),
            from,
            from_card,
            to,
            to_card,
        })?;
        Ok(data.into_pindian())
    }

    /// `true` when `from` wins.
    pub fn pindian(
        &mut self,
        from: PlayerId,
        to: PindianTarget,
        reason: &str,
    ) -> Result<bool, Interrupt> {
        Ok(self.resolve_pindian(from, to, reason, None)?.success)
    }

    pub fn pindian_outcome(
        &mut self,
        from: PlayerId,
        to: PindianTarget,
        reason: &str,
    ) -> Result<PindianOutcome, Interrupt> {
        Ok(self.resolve_pindian(from, to, reason, None)?.outcome())
    }

    /// One card per side, players with a hand are asked together.
    fn pindian_cards(
        &mut self,
        sides: &[PindianTarget],
        reason: &str,
    ) -> Result<Vec<CardId>, Interrupt> {
        let questions = sides
            .iter()
            .filter_map(|side| side.player())
            .filter(|player| !self.player(*player).hand.is_empty())
            .map(|player| Question::PindianCard {
                player,
                reason: reason.into(),
                candidates: self
                    .player(player)
                    .hand
                    .iter()
                    .map(|c| CardDisplay::new(self.card_info(*c)))
                    .collect(),
            })
            .collect_vec();
        let timeout = self.mailbox.timeout;
        let answers = if questions.is_empty() {
            Vec::new()
        } else {
            self.mailbox.ask_race(questions.clone(), timeout)?
        };
        let mut answered = questions
            .iter()
            .map(Question::player)
            .zip(answers)
            .filter_map(|(player, answer)| match answer {
                Answer::Card(Some(card)) => Some((player, card)),
                _ => None,
            })
            .collect_vec();

        let from_pile = sides
            .iter()
            .filter(|side| {
                side.player()
                    .map_or(true, |p| !answered.iter().any(|(a, _)| *a == p))
            })
            .count();
        let mut drawn = self.take_draw_pile(from_pile)?.into_iter();

        let mut cards = Vec::with_capacity(sides.len());
        for side in sides {
            let answer = side.player().and_then(|p| {
                let index = answered.iter().position(|(a, _)| *a == p)?;
                Some(answered.remove(index).1)
            });
            match answer.or_else(|| drawn.next()) {
                Some(card) => cards.push(card),
                None => unreachable!("enough cards were drawn"),
            }
        }
        Ok(cards)
    }
}
