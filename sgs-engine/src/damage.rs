use get_size::GetSize;
use tracing::debug;

use crate::cards::{Card, MoveReasonKind};
use crate::events::{EventData, LogMessage, Notice, TriggerEvent};
use crate::gameplay::{Game, GameContinue, GameResult, Interrupt, PlayerId};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, GetSize)]
pub enum DamageNature {
    #[default]
    Normal,
    Fire,
    Thunder,
    Ice,
    Light,
    Dark,
}

impl DamageNature {
    /// suffix shown next to the hp delta
    pub fn tag(self) -> &'static str {
        match self {
            DamageNature::Normal => "",
            DamageNature::Fire => "F",
            DamageNature::Thunder => "T",
            DamageNature::Ice => "I",
            DamageNature::Light => "L",
            DamageNature::Dark => "D",
        }
    }
    pub fn name(self) -> &'static str {
        match self {
            DamageNature::Normal => "normal_nature",
            DamageNature::Fire => "fire_nature",
            DamageNature::Thunder => "thunder_nature",
            DamageNature::Ice => "ice_nature",
            DamageNature::Light => "light_nature",
            DamageNature::Dark => "dark_nature",
        }
    }
    /// Elemental damage spreads through iron chains.
    pub fn spreads_chain(self) -> bool {
        matches!(
            self,
            DamageNature::Fire | DamageNature::Thunder | DamageNature::Ice
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DamageContext {
    pub from: Option<PlayerId>,
    pub to: PlayerId,
    pub card: Option<Card>,
    pub damage: i32,
    pub nature: DamageNature,
    /// spread from another chained player, never spreads again
    pub chain: bool,
    pub transfer: bool,
    pub reason: String,
    pub prevented: bool,
}

impl DamageContext {
    pub fn new(from: Option<PlayerId>, to: PlayerId, damage: i32) -> Self {
        DamageContext {
            from,
            to,
            card: None,
            damage,
            nature: DamageNature::Normal,
            chain: false,
            transfer: false,
            reason: String::new(),
            prevented: false,
        }
    }
    pub fn with_nature(mut self, nature: DamageNature) -> Self {
        self.nature = nature;
        self
    }
    pub fn with_card(mut self, card: Card) -> Self {
        self.card = Some(card);
        self
    }
    pub fn with_reason(mut self, reason: &str) -> Self {
        self.reason = reason.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoverContext {
    pub who: Option<PlayerId>,
    pub to: PlayerId,
    pub recover: i32,
    pub card: Option<Card>,
}

impl RecoverContext {
    pub fn new(who: Option<PlayerId>, to: PlayerId, recover: i32) -> Self {
        RecoverContext {
            who,
            to,
            recover,
            card: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HpChangeCause {
    Damage(DamageContext),
    Recover(RecoverContext),
    Lost(i32),
    /// set directly by a rule
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HpChangeContext {
    pub player: PlayerId,
    pub delta: i32,
    pub cause: HpChangeCause,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DyingContext {
    pub who: PlayerId,
    pub damage: Option<DamageContext>,
    /// the player being asked for a rescue
    pub saver: Option<PlayerId>,
    /// cannot rescue during the current round of asking
    pub barred: Vec<PlayerId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeathContext {
    pub who: PlayerId,
    pub damage: Option<DamageContext>,
}

impl DeathContext {
    pub fn killer(&self) -> Option<PlayerId> {
        self.damage.as_ref().and_then(|d| d.from)
    }
}

impl Game {
    pub fn damage(&mut self, mut damage: DamageContext) -> GameResult {
        if !self.is_alive(damage.to) {
            return Ok(GameContinue);
        }
        if damage.from.is_some_and(|from| !self.is_alive(from)) {
            damage.from = None;
        }

        let mut data = EventData::Damage(damage);
        if !data.damage().chain && !data.damage().transfer {
            let from = data.damage().from;
            self.trigger(TriggerEvent::ConfirmDamage, from, &mut data)?;
        }

        if self.damage_steps(&mut data)? {
            data.damage_mut().prevented = true;
        }

        let to = data.damage().to;
        self.trigger(TriggerEvent::DamageComplete, Some(to), &mut data)?;
        Ok(GameContinue)
    }

    /// `true` when the damage was prevented
    fn damage_steps(&mut self, data: &mut EventData) -> Result<bool, Interrupt> {
        if let Some(from) = data.damage().from {
            if self.trigger(TriggerEvent::DamageCaused, Some(from), data)? {
                return Ok(true);
            }
        }
        let to = data.damage().to;
        if self.trigger(TriggerEvent::DamageInflicted, Some(to), data)? {
            return Ok(true);
        }

        let damage = data.damage_mut();
        damage.damage = damage.damage.max(0);
        let to = damage.to;

        self.trigger(TriggerEvent::DamageDone, Some(to), data)?;
        if let Some(from) = data.damage().from {
            self.trigger(TriggerEvent::Damage, Some(from), data)?;
        }
        let to = data.damage().to;
        self.trigger(TriggerEvent::Damaged, Some(to), data)?;
        Ok(false)
    }

    /// Logs the damage, counts a pending chain spread and lowers the hp.
    pub fn apply_damage(&mut self, damage: &mut DamageContext) -> GameResult {
        if damage.from.is_some_and(|from| !self.is_alive(from)) {
            damage.from = None;
        }

        let log = match damage.from {
            Some(from) => LogMessage::new("#Damage").from(from),
            None => LogMessage::new("#DamageNoSource"),
        };
        self.send_log(
            log.to(damage.to)
                .arg(damage.damage)
                .arg2(damage.nature.name()),
        );
        self.notify(Notice::HpChanged {
            player: damage.to,
            delta: -damage.damage,
            nature: Some(damage.nature),
            lost: false,
        });

        if damage.nature.spreads_chain() && self.player(damage.to).chained && !damage.chain {
            let pending = self.state.room.int("is_chained");
            self.state.room.set_int("is_chained", pending + 1);
        }

        let new_hp = self.player(damage.to).hp - damage.damage;
        self.change_hp(
            damage.to,
            new_hp,
            HpChangeCause::Damage(damage.clone()),
        )
    }

    /// Fans a chained elemental hit out to every other chained player.
    pub fn spread_chain(&mut self, damage: &DamageContext) -> GameResult {
        if damage.prevented || !damage.nature.spreads_chain() {
            return Ok(GameContinue);
        }
        if self.player(damage.to).chained {
            self.set_chained(damage.to, false)?;
        }

        let pending = self.state.room.int("is_chained");
        if pending <= 0 || damage.chain {
            return Ok(GameContinue);
        }
        self.state.room.set_int("is_chained", pending - 1);

        let current = self.current();
        let chained = self
            .state
            .players_from(current)
            .into_iter()
            .filter(|p| *p != damage.to && self.is_alive(*p))
            .collect::<Vec<_>>();
        for player in chained {
            if !self.player(player).chained {
                continue;
            }
            self.send_log(LogMessage::new("#IronChainDamage").from(player));
            let mut spread = damage.clone();
            spread.to = player;
            spread.chain = true;
            spread.transfer = false;
            spread.prevented = false;
            self.damage(spread)?;
        }
        Ok(GameContinue)
    }

    pub fn recover(&mut self, recover: RecoverContext) -> GameResult {
        let to = recover.to;
        if !self.is_alive(to) || !self.player(to).is_wounded() {
            return Ok(GameContinue);
        }

        let mut data = EventData::Recover(recover);
        if self.trigger(TriggerEvent::PreHpRecover, Some(to), &mut data)? {
            return Ok(GameContinue);
        }
        let recover = data.recover().clone();

        let player = self.player(to);
        let new_hp = (player.hp + recover.recover).min(player.max_hp);
        self.send_log(LogMessage::new("#Recover").from(to).arg(recover.recover));
        self.notify(Notice::HpChanged {
            player: to,
            delta: recover.recover,
            nature: None,
            lost: false,
        });
        self.change_hp(to, new_hp, HpChangeCause::Recover(recover))?;

        self.trigger(TriggerEvent::HpRecover, Some(to), &mut data)?;
        Ok(GameContinue)
    }

    pub fn lose_hp(&mut self, player: PlayerId, n: i32) -> GameResult {
        if n <= 0 || !self.is_alive(player) {
            return Ok(GameContinue);
        }

        let mut data = EventData::Count(n);
        if self.trigger(TriggerEvent::PreHpLost, Some(player), &mut data)? {
            return Ok(GameContinue);
        }
        let n = data.count();
        if n <= 0 {
            return Ok(GameContinue);
        }

        self.send_log(LogMessage::new("#LoseHp").from(player).arg(n));
        self.notify(Notice::HpChanged {
            player,
            delta: -n,
            nature: None,
            lost: true,
        });
        let new_hp = self.player(player).hp - n;
        self.change_hp(player, new_hp, HpChangeCause::Lost(n))?;

        self.trigger(TriggerEvent::HpLost, Some(player), &mut data)?;
        Ok(GameContinue)
    }

    /// Sets the hp and lets rules react, a non positive hp after damage leads to dying.
    pub fn change_hp(&mut self, player: PlayerId, hp: i32, cause: HpChangeCause) -> GameResult {
        let delta = hp - self.player(player).hp;
        self.set_hp(player, hp);
        let mut data = EventData::HpChange(HpChangeContext {
            player,
            delta,
            cause,
        });
        self.trigger(TriggerEvent::HpChanged, Some(player), &mut data)?;
        Ok(GameContinue)
    }

    /// Asks every alive player, from the current one, to rescue `who`.
    pub fn enter_dying(&mut self, who: PlayerId, damage: Option<DamageContext>) -> GameResult {
        if !self.is_alive(who) {
            return Ok(GameContinue);
        }
        self.player_mut(who).set_flag("Global_Dying");
        let mut data = EventData::Dying(DyingContext {
            who,
            damage,
            saver: None,
            barred: Vec::new(),
        });

        for player in self.alive_players() {
            if self.trigger(TriggerEvent::EnterDying, Some(player), &mut data)?
                || self.player(who).hp > 0
                || !self.is_alive(who)
            {
                break;
            }
        }

        if self.is_alive(who) {
            if self.player(who).hp > 0 {
                self.player_mut(who).set_flag("-Global_Dying");
            } else {
                self.send_log(
                    LogMessage::new("#AskForPeaches")
                        .from(who)
                        .arg(1 - self.player(who).hp),
                );
                for saver in self.alive_players() {
                    if self.player(who).hp > 0 || !self.is_alive(who) {
                        break;
                    }
                    data.dying_mut().saver = Some(saver);
                    self.trigger(TriggerEvent::AskForPeaches, Some(saver), &mut data)?;
                    let dying = data.dying_mut();
                    dying.saver = None;
                    dying.barred.clear();
                }
                self.trigger(TriggerEvent::AskForPeachesDone, Some(who), &mut data)?;
                self.player_mut(who).set_flag("-Global_Dying");
            }
        }

        if self.is_alive(who) {
            debug!("{who} quits dying");
            self.trigger(TriggerEvent::QuitDying, Some(who), &mut data)?;
        }
        Ok(GameContinue)
    }

    pub fn kill_player(&mut self, victim: PlayerId, damage: Option<DamageContext>) -> GameResult {
        if !self.is_alive(victim) {
            return Ok(GameContinue);
        }
        let player = self.player_mut(victim);
        player.alive = false;
        player.role_shown = true;

        let mut data = EventData::Death(DeathContext {
            who: victim,
            damage,
        });
        self.trigger(TriggerEvent::BeforeGameOverJudge, Some(victim), &mut data)?;

        let role = self.player(victim).role;
        let log = match data.death().killer() {
            Some(killer) if killer == victim => LogMessage::new("#Suicide").to(victim),
            Some(killer) => LogMessage::new("#Murder").from(killer).to(victim),
            None => LogMessage::new("#Contingency").to(victim),
        };
        self.send_log(log.arg(role));
        self.notify_property(victim, "alive", false);
        self.notify_property(victim, "role", role);

        self.trigger(TriggerEvent::Death, Some(victim), &mut data)?;
        self.trigger(TriggerEvent::GameOverJudge, Some(victim), &mut data)?;
        self.trigger(TriggerEvent::BuryVictim, Some(victim), &mut data)?;
        Ok(GameContinue)
    }

    /// Clears everything a dead player still holds.
    pub fn bury(&mut self, player: PlayerId) -> GameResult {
        let dead = self.player_mut(player);
        dead.set_flag(".");
        dead.clear_history();
        dead.marks.clear();
        let mut cards = dead.all_cards();
        cards.extend(dead.judging.iter().copied());
        self.throw_cards(cards, Some(player), MoveReasonKind::Bury)
    }

    pub fn revive(&mut self, player: PlayerId) -> GameResult {
        if self.is_alive(player) {
            return Ok(GameContinue);
        }
        self.player_mut(player).alive = true;
        self.notify_property(player, "alive", true);
        self.send_log(LogMessage::new("#Revive").from(player));
        Ok(GameContinue)
    }
}
