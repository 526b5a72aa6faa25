use crate::cards::{CardInfo, CardPlace, Color, MoveReason, MoveReasonKind, Place, Suit};
use crate::events::{EventData, LogMessage, TriggerEvent};
use crate::gameplay::{CardId, Game, GameContinue, GameResult, Interrupt, PlayerId};

/// What a judge card is checked against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JudgePattern {
    Suit(Suit),
    Color(Color),
    SuitRange { suit: Suit, low: u8, high: u8 },
}

impl JudgePattern {
    pub fn matches(&self, suit: Suit, number: u8) -> bool {
        match self {
            JudgePattern::Suit(s) => *s == suit,
            JudgePattern::Color(c) => *c == suit.color(),
            JudgePattern::SuitRange { suit: s, low, high } => {
                *s == suit && (*low..=*high).contains(&number)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JudgeContext {
    pub who: PlayerId,
    pub reason: String,
    pub pattern: JudgePattern,
    /// whether matching the pattern is good for `who`
    pub good: bool,
    pub card: Option<CardId>,
    pub suit: Suit,
    pub number: u8,
}

impl JudgeContext {
    pub fn new(who: PlayerId, reason: &str, pattern: JudgePattern, good: bool) -> Self {
        JudgeContext {
            who,
            reason: reason.into(),
            pattern,
            good,
            card: None,
            suit: Suit::NoSuit,
            number: 0,
        }
    }

    pub fn set_card(&mut self, info: &CardInfo) {
        self.card = Some(info.id);
        self.suit = info.suit;
        self.number = info.number;
    }

    pub fn is_good(&self) -> bool {
        self.card.is_some() && self.pattern.matches(self.suit, self.number) == self.good
    }
    pub fn is_bad(&self) -> bool {
        !self.is_good()
    }
}

impl Game {
    /// Reveals a judge card for `judge.who`, every alive player may then change it.
    pub fn judge(&mut self, judge: JudgeContext) -> Result<JudgeContext, Interrupt> {
        let who = judge.who;
        let mut data = EventData::Judge(judge);
        self.trigger(TriggerEvent::StartJudge, Some(who), &mut data)?;

        for player in self.alive_players() {
            if self.trigger(TriggerEvent::AskForRetrial, Some(player), &mut data)? {
                break;
            }
        }

        self.trigger(TriggerEvent::FinishRetrial, Some(who), &mut data)?;
        self.trigger(TriggerEvent::FinishJudge, Some(who), &mut data)?;
        Ok(data.into_judge())
    }

    pub fn start_judge(&mut self, judge: &mut JudgeContext) -> GameResult {
        let card = self.draw_top_card()?;
        let mut reason = MoveReason::new(MoveReasonKind::Judge, Some(judge.who));
        reason.skill_name = Some(judge.reason.clone());
        self.move_card(card, CardPlace::of(judge.who, Place::Judge), reason)?;

        let info = *self.card_info(card);
        judge.set_card(&info);
        self.send_log(
            LogMessage::new("$InitialJudge")
                .from(judge.who)
                .arg(card),
        );
        Ok(GameContinue)
    }

    /// Replaces the judge card with `card` from `player`, the old one goes to
    /// `player`'s hand when `exchange`, to the discard pile otherwise.
    pub fn retrial(
        &mut self,
        judge: &mut JudgeContext,
        player: PlayerId,
        card: CardId,
        exchange: bool,
    ) -> GameResult {
        let mut reason = MoveReason::new(MoveReasonKind::Judge, Some(player));
        reason.target = Some(judge.who);
        reason.skill_name = Some(judge.reason.clone());
        self.move_card(card, CardPlace::of(judge.who, Place::Judge), reason)?;

        if let Some(old) = judge.card.filter(|old| self.state.is_in(*old, Place::Judge)) {
            if exchange {
                self.move_card(
                    old,
                    CardPlace::of(player, Place::Hand),
                    MoveReason::new(MoveReasonKind::Transfer, Some(player)),
                )?;
            } else {
                self.throw_cards(vec![old], Some(player), MoveReasonKind::JudgeDone)?;
            }
        }

        let info = *self.card_info(card);
        judge.set_card(&info);
        self.send_log(
            LogMessage::new("$ChangedJudge")
                .from(player)
                .to(judge.who)
                .arg(card),
        );
        Ok(GameContinue)
    }

    pub fn finish_judge(&mut self, judge: &JudgeContext) -> GameResult {
        match judge.card {
            Some(card) if self.state.is_in(card, Place::Judge) => {
                self.throw_cards(vec![card], Some(judge.who), MoveReasonKind::JudgeDone)
            }
            _ => Ok(GameContinue),
        }
    }
}
