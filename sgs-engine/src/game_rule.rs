use iter_tools::Itertools;
use tracing::{debug, error, info};

use crate::card_use::CardEffectContext;
use crate::cards::{Capability, Card, CardBehavior, CardPlace, MoveReason, MoveReasonKind, Place};
use crate::damage::{DamageContext, HpChangeCause};
use crate::events::{EventData, LogMessage, Notice, TriggerEvent};
use crate::gameplay::{Game, GameContinue, GameResult, PlayerId, Tag, TriggerResult, Winner};
use crate::modes::ModeRules;
use crate::player::{MarkExpiry, Phase, GOD_KINGDOM};
use crate::triggers::{TriggerHandler, GAME_RULE};

pub const KINGDOMS: [&str; 4] = ["wei", "shu", "wu", "qun"];

/// Events the base rule handles, mode rules replacing it must cover them too.
pub const BASE_EVENTS: &[TriggerEvent] = &[
    TriggerEvent::GameReady,
    TriggerEvent::TurnStart,
    TriggerEvent::EventPhaseProceeding,
    TriggerEvent::EventPhaseEnd,
    TriggerEvent::EventPhaseChanging,
    TriggerEvent::PreCardUsed,
    TriggerEvent::CardUsed,
    TriggerEvent::TargetSpecified,
    TriggerEvent::CardFinished,
    TriggerEvent::CardEffected,
    TriggerEvent::TrickCardCanceling,
    TriggerEvent::HpChanged,
    TriggerEvent::AskForPeaches,
    TriggerEvent::AskForPeachesDone,
    TriggerEvent::ConfirmDamage,
    TriggerEvent::DamageDone,
    TriggerEvent::DamageComplete,
    TriggerEvent::SlashEffected,
    TriggerEvent::SlashProceed,
    TriggerEvent::SlashHit,
    TriggerEvent::StartJudge,
    TriggerEvent::FinishRetrial,
    TriggerEvent::FinishJudge,
    TriggerEvent::ChoiceMade,
    TriggerEvent::GameOverJudge,
    TriggerEvent::BuryVictim,
];

/// The rules every mode shares, registered at priority 0.
#[derive(Debug, Default, Clone, Copy)]
pub struct GameRule;

impl GameRule {
    pub fn new() -> Self {
        GameRule
    }
}

impl TriggerHandler for GameRule {
    fn name(&self) -> &str {
        GAME_RULE
    }

    fn events(&self) -> &[TriggerEvent] {
        BASE_EVENTS
    }

    fn trigger(
        &self,
        event: TriggerEvent,
        game: &mut Game,
        player: Option<PlayerId>,
        data: &mut EventData,
    ) -> TriggerResult {
        // global events first, everything else is about a player
        if event == TriggerEvent::GameReady {
            game.on_game_ready()?;
            return Ok(false);
        }
        let Some(player) = player else {
            return Ok(false);
        };

        match event {
            TriggerEvent::TurnStart => game.on_turn_start(player).map(|_| false),
            TriggerEvent::EventPhaseProceeding => game.on_phase_proceeding(player).map(|_| false),
            TriggerEvent::EventPhaseEnd => {
                if game.player(player).phase() == Phase::Play {
                    game.player_mut(player).clear_history();
                }
                Ok(false)
            }
            TriggerEvent::EventPhaseChanging => {
                let change = data.phase_change().clone();
                game.on_phase_changing(player, change.from, change.to);
                Ok(false)
            }
            TriggerEvent::PreCardUsed => {
                game.player_mut(player).set_flag("-Global_ForbidSurrender");
                let card_use = data.card_use_mut();
                if card_use.card.has_flag("RemoveFromHistory") {
                    card_use.add_history = false;
                }
                let card = card_use.card.clone();
                if let Some(skill) = card.skill_name.filter(|_| !card.flags.contains("muted")) {
                    game.notify(Notice::SkillInvoked { player, skill });
                }
                Ok(false)
            }
            TriggerEvent::CardUsed => game.drive_card_use(data).map(|_| false),
            TriggerEvent::TargetSpecified => {
                let card_use = data.card_use();
                if card_use.card.kind.is_slash() && card_use.card.has_flag("SlashIgnoreArmor") {
                    let key = card_use.card.key();
                    for target in card_use.to.clone() {
                        game.player_mut(target).set_tag("Qinggang", Tag::Text(key.clone()));
                    }
                }
                Ok(false)
            }
            TriggerEvent::CardFinished => game.on_card_finished(data).map(|_| false),
            TriggerEvent::CardEffected => game.on_card_effected(data),
            TriggerEvent::TrickCardCanceling => {
                let effect = data.card_effect();
                Ok(effect.no_respond || effect.no_offset)
            }
            TriggerEvent::HpChanged => {
                let change = data.hp_change();
                let damage = match &change.cause {
                    HpChangeCause::Damage(damage) => Some(damage.clone()),
                    HpChangeCause::Lost(_) => None,
                    HpChangeCause::Recover(_) | HpChangeCause::Other => return Ok(false),
                };
                if game.player(change.player).hp <= 0 {
                    game.enter_dying(change.player, damage)?;
                }
                Ok(false)
            }
            TriggerEvent::AskForPeaches => game.on_ask_for_peaches(player, data).map(|_| false),
            TriggerEvent::AskForPeachesDone => {
                let who = data.dying().who;
                if game.player(who).hp > 0 || !game.is_alive(who) {
                    return Ok(false);
                }
                if game.trigger(TriggerEvent::DyingToDeath, Some(who), data)? {
                    return Ok(false);
                }
                let damage = data.dying().damage.clone();
                game.kill_player(who, damage).map(|_| false)
            }
            TriggerEvent::ConfirmDamage => {
                let damage = data.damage_mut();
                let drank = game.player(damage.to).mark("SlashIsDrank");
                if drank > 0 && damage.card.as_ref().is_some_and(|c| c.kind.is_slash()) {
                    damage.damage += drank;
                    let (from, to, amount) = (damage.from, damage.to, damage.damage);
                    game.player_mut(to).set_mark("SlashIsDrank", 0);
                    let mut log = LogMessage::new("#AnalepticBuff").to(to).arg(amount);
                    if let Some(from) = from {
                        log = log.from(from);
                    }
                    game.send_log(log);
                }
                Ok(false)
            }
            TriggerEvent::DamageDone => {
                let mut damage = data.damage().clone();
                game.apply_damage(&mut damage)?;
                *data.damage_mut() = damage;
                Ok(false)
            }
            TriggerEvent::DamageComplete => {
                let damage = data.damage().clone();
                game.spread_chain(&damage).map(|_| false)
            }
            TriggerEvent::SlashEffected => {
                let effect = data.slash_effect().clone();
                if effect.nullified {
                    game.send_log(
                        LogMessage::new("#CardNullified")
                            .from(effect.to)
                            .arg(&effect.slash),
                    );
                    return Ok(true);
                }
                if effect.jink_num > 0 && !effect.no_respond {
                    game.trigger(TriggerEvent::SlashProceed, Some(effect.from), data)?;
                } else {
                    game.slash_result(effect, None)?;
                }
                Ok(false)
            }
            TriggerEvent::SlashProceed => {
                let effect = data.slash_effect().clone();
                let jink = game.ask_for_jinks(&effect)?;
                game.slash_result(effect, jink).map(|_| false)
            }
            TriggerEvent::SlashHit => {
                let effect = data.slash_effect().clone();
                if effect.drank > 0 {
                    game.player_mut(effect.to)
                        .set_mark("SlashIsDrank", effect.drank);
                }
                let damage = DamageContext::new(Some(effect.from), effect.to, 1)
                    .with_nature(effect.nature)
                    .with_card(effect.slash);
                game.damage(damage).map(|_| false)
            }
            TriggerEvent::StartJudge => {
                let mut judge = data.judge().clone();
                game.start_judge(&mut judge)?;
                *data.judge_mut() = judge;
                Ok(false)
            }
            TriggerEvent::FinishRetrial => {
                let judge = data.judge();
                let log = LogMessage::new(if judge.is_good() {
                    "#JudgeGood"
                } else {
                    "#JudgeBad"
                })
                .from(judge.who)
                .arg(&judge.reason);
                game.send_log(log);
                Ok(false)
            }
            TriggerEvent::FinishJudge => {
                let judge = data.judge().clone();
                game.finish_judge(&judge).map(|_| false)
            }
            TriggerEvent::ChoiceMade => {
                for alive in game.alive_players() {
                    game.player_mut(alive)
                        .flags
                        .retain(|f| !(f.starts_with("Global_") && f.ends_with("Failed")));
                }
                Ok(false)
            }
            TriggerEvent::GameOverJudge => {
                let mode = game.state.mode;
                let victim = data.death().who;
                if let Some(winner) = mode.winner(game, victim) {
                    game.game_over(winner)?;
                }
                Ok(false)
            }
            TriggerEvent::BuryVictim => {
                let death = data.death().clone();
                game.bury(death.who)?;
                let mode = game.state.mode;
                let killer = death.killer().filter(|k| game.is_alive(*k));
                mode.reward_and_punish(game, killer, death.who).map(|_| false)
            }
            _ => Ok(false),
        }
    }
}

impl Game {
    fn on_game_ready(&mut self) -> GameResult {
        self.prepare_generals()?;
        self.state.room.set_tag("FirstRound", Tag::Bool(true));
        let n = self.config.initial_hand;
        for player in self.state.players_from(self.current()) {
            self.draw_initial_cards(player, n)?;
        }
        Ok(GameContinue)
    }

    /// Limited skill marks, then a kingdom for every god general.
    pub fn prepare_generals(&mut self) -> GameResult {
        for player in self.state.players_from(self.current()) {
            self.grant_limit_marks(player);
            if self.player(player).kingdom == GOD_KINGDOM {
                let kingdom = self.ask_for_choice(player, "choose_kingdom", &KINGDOMS)?;
                self.player_mut(player).kingdom = kingdom.clone();
                self.notify_property(player, "kingdom", &kingdom);
                self.send_log(LogMessage::new("#ChooseKingdom").from(player).arg(kingdom));
            }
        }
        Ok(GameContinue)
    }

    pub fn grant_limit_marks(&mut self, player: PlayerId) {
        let marks = self
            .player(player)
            .skills
            .iter()
            .filter_map(|s| s.limit_mark.clone())
            .collect_vec();
        for mark in marks {
            self.player_mut(player).set_mark(&mark, 1);
        }
    }

    pub fn draw_initial_cards(&mut self, player: PlayerId, n: i32) -> GameResult {
        let mut data = EventData::Count(n);
        if !self.trigger(TriggerEvent::DrawInitialCards, Some(player), &mut data)? {
            let n = data.count();
            self.draw_cards(player, n, "initial_cards")?;
        }
        self.trigger(TriggerEvent::AfterDrawInitialCards, Some(player), &mut data)?;
        Ok(GameContinue)
    }

    fn on_turn_start(&mut self, player: PlayerId) -> GameResult {
        if self.state.room.remove_tag("FirstRound").is_some() {
            self.player_mut(player).set_flag("Global_FirstRound");
        }
        self.player_mut(player).gain_mark("Global_TurnCount", 1);
        self.player_mut(player).skills.retain(|s| !s.next_turn);

        let extra_turn = self
            .state
            .room
            .has_tag(&format!("Global_ExtraTurn{player}"));
        if extra_turn {
            self.player_mut(player).set_mark("@extra_turn", 1);
        }

        let max_turns = self.config.max_turns;
        if max_turns > 0 && self.state.turn_number > max_turns {
            info!("turn limit reached: {max_turns}");
            self.game_over(Winner::Draw)?;
        }

        let first_alive = self.state.alive_players_from(PlayerId::new(0)).first().copied();
        if !extra_turn && first_alive == Some(player) {
            self.start_round()?;
        }

        if !self.player(player).face_up {
            self.state.room.remove_tag(&format!("Global_ExtraTurn{player}"));
            self.player_mut(player).set_mark("@extra_turn", 0);
            self.turn_over(player)
        } else if self.is_alive(player) {
            self.play_phases(player, &[])
        } else {
            Ok(GameContinue)
        }
    }

    fn start_round(&mut self) -> GameResult {
        let round = self.state.room.int("TurnLengthCount") + 1;
        self.state.room.set_int("TurnLengthCount", round);
        debug!("round {round}");
        for player in self.state.players_from(PlayerId::new(0)) {
            self.player_mut(player).clear_marks(MarkExpiry::Round);
        }

        if round == 1 {
            for player in self.alive_players() {
                let mut data = EventData::None;
                self.trigger(TriggerEvent::BeforeGameStart, Some(player), &mut data)?;
            }
            for player in self.alive_players() {
                let mut data = EventData::None;
                self.trigger(TriggerEvent::GameStart, Some(player), &mut data)?;
            }
        }
        for player in self.alive_players() {
            let mut data = EventData::Count(round);
            self.trigger(TriggerEvent::BeforeRoundStart, Some(player), &mut data)?;
        }
        for player in self.alive_players() {
            let mut data = EventData::Count(round);
            self.trigger(TriggerEvent::RoundStart, Some(player), &mut data)?;
        }
        Ok(GameContinue)
    }

    fn on_phase_proceeding(&mut self, player: PlayerId) -> GameResult {
        match self.player(player).phase() {
            Phase::Judge => self.judge_delayed_tricks(player),
            Phase::Draw => {
                let mut data = EventData::Count(self.config.draw_per_turn);
                if !self.trigger(TriggerEvent::DrawNCards, Some(player), &mut data)? {
                    let n = data.count();
                    if n > 0 {
                        self.draw_cards(player, n, "gamerule")?;
                    }
                    self.trigger(
                        TriggerEvent::AfterDrawNCards,
                        Some(player),
                        &mut EventData::Count(n),
                    )?;
                }
                Ok(GameContinue)
            }
            Phase::Play => {
                while self.is_alive(player)
                    && !self.player(player).has_flag("Global_PlayPhaseTerminated")
                {
                    if !self.activate(player)? {
                        break;
                    }
                }
                self.player_mut(player).set_flag("-Global_PlayPhaseTerminated");
                Ok(GameContinue)
            }
            Phase::Discard => {
                let me = self.player(player);
                let excess = me.hand.len().saturating_sub(me.max_cards()) as i32;
                let mut data = EventData::Count(excess);
                if !self.trigger(TriggerEvent::DiscardNCards, Some(player), &mut data)? {
                    let n = data.count();
                    if n > 0 {
                        self.ask_for_discard(player, "gamerule", n as usize, false)?;
                    }
                    self.trigger(
                        TriggerEvent::AfterDiscardNCards,
                        Some(player),
                        &mut EventData::Count(n),
                    )?;
                }
                Ok(GameContinue)
            }
            Phase::RoundStart | Phase::Start | Phase::Finish | Phase::NotActive => {
                Ok(GameContinue)
            }
            Phase::None => {
                error!("{player} proceeds without a phase");
                panic!("phase proceeding without a phase");
            }
        }
    }

    /// Last placed resolves first, a trick moved back in during the loop waits for the next turn.
    fn judge_delayed_tricks(&mut self, player: PlayerId) -> GameResult {
        let pending = self.player(player).delayed_tricks.iter().rev().copied().collect_vec();
        for card in pending {
            if !self.is_alive(player) {
                break;
            }
            if !self.state.is_in(card, Place::DelayedTrick) {
                continue;
            }
            self.move_card(
                card,
                CardPlace::shared(Place::Table),
                MoveReason::new(MoveReasonKind::Use, Some(player)),
            )?;

            let card = Card::real(self.card_info(card));
            let kind = card.kind;
            let effect = CardEffectContext::new(card, None, player);
            let mut data = EventData::CardEffect(effect.clone());
            if self.trigger(TriggerEvent::BeforeDelayedTrickEffect, Some(player), &mut data)? {
                kind.on_nullified(self, &effect)?;
                continue;
            }
            if !self.card_effect(effect.clone())? {
                kind.on_nullified(self, &effect)?;
            }
        }
        Ok(GameContinue)
    }

    fn on_phase_changing(&mut self, player: PlayerId, from: Phase, to: Phase) {
        if from == Phase::Play {
            self.player_mut(player).clear_marks(MarkExpiry::PlayPhase);
        }
        match to {
            Phase::Play => self.player_mut(player).clear_history(),
            Phase::NotActive => self.deactivate(player),
            _ => {}
        }
    }

    fn deactivate(&mut self, player: PlayerId) {
        let drank = self.player(player).mark("drank");
        let me = self.player_mut(player);
        me.set_flag(".");
        me.clear_marks(MarkExpiry::Turn);
        me.clear_marks(MarkExpiry::PlayPhase);
        me.properties.retain(|name, _| !name.ends_with("_OneTurn"));
        me.skills.retain(|s| !s.one_turn);
        me.set_mark("@extra_turn", 0);
        if drank > 0 {
            me.set_mark("drank", 0);
            self.send_log(LogMessage::new("#UnsetDrankEndOfTurn").from(player));
        }
    }

    fn on_card_finished(&mut self, data: &mut EventData) -> GameResult {
        let card_use = data.card_use_mut();
        card_use.card.flags.clear();
        let area_effect = card_use.card.kind.has_capability(Capability::AreaEffect);

        for player in self.state.players_from(PlayerId::new(0)) {
            self.player_mut(player).remove_tag("Qinggang");
        }
        if area_effect {
            for player in self.alive_players() {
                self.notify(Notice::NullificationAsked {
                    player: Some(player),
                });
            }
        }
        Ok(GameContinue)
    }

    fn on_card_effected(&mut self, data: &mut EventData) -> TriggerResult {
        let effect = data.card_effect().clone();
        if effect.nullified && !effect.card.kind.is_slash() {
            let mut log = LogMessage::new("#CardNullified").to(effect.to).arg(&effect.card);
            if let Some(from) = effect.from {
                log = log.from(from);
            }
            self.send_log(log);
            return Ok(true);
        }

        if effect.card.kind.is_trick() {
            if self.is_canceled(&effect)? {
                self.player_mut(effect.to).set_flag("Global_NonSkillNullify");
                self.trigger(TriggerEvent::EffectOffsetted, Some(effect.to), data)?;
                return Ok(true);
            }
            self.trigger(TriggerEvent::TrickEffect, Some(effect.to), data)?;
        }

        let effect = data.card_effect().clone();
        if self.is_alive(effect.to) || effect.card.kind.is_slash() {
            let kind = effect.card.kind;
            kind.on_effect(self, &effect)?;
        }
        Ok(false)
    }

    fn on_ask_for_peaches(&mut self, saver: PlayerId, data: &mut EventData) -> GameResult {
        let dying = data.dying();
        let who = dying.who;
        if dying.barred.contains(&saver)
            || (saver != who && self.player(saver).mark("Global_PreventPeach") > 0)
        {
            debug!("{saver} cannot rescue {who}");
            return Ok(GameContinue);
        }
        while self.is_alive(who) && self.is_alive(saver) && self.player(who).hp <= 0 {
            if !self.ask_for_peach(saver, who)? {
                break;
            }
        }
        Ok(GameContinue)
    }
}
