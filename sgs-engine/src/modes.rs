use enum_dispatch::enum_dispatch;
use get_size::GetSize;
use iter_tools::Itertools;
use tracing::info;

use crate::cards::{CardPlace, CardsMove, MoveReason, MoveReasonKind, Place};
use crate::config::GameModeKind;
use crate::events::{EventData, LogMessage, TriggerEvent};
use crate::game_rule::{GameRule, BASE_EVENTS};
use crate::gameplay::{
    Game, GameContinue, GameResult, Interrupt, PlayerId, Tag, TriggerResult, Winner,
};
use crate::player::{HiddenGeneral, Phase, Player, Role, HIDDEN_GENERAL};
use crate::triggers::{TriggerHandler, TriggerRegistry, GAME_RULE};

/// What changes from one game mode to another.
#[enum_dispatch]
pub trait ModeRules {
    fn name(&self) -> &'static str;

    /// Registers the handlers of the mode, the base rule included.
    fn install(&self, triggers: &mut TriggerRegistry) {
        triggers.register(GameRule::new());
    }

    /// Roles in seat order before shuffling, the lord first.
    fn default_roles(&self, players: usize) -> Vec<Role>;

    /// Checked after every death.
    fn winner(&self, game: &Game, victim: PlayerId) -> Option<Winner>;

    /// Runs once `victim` is buried, `killer` is only set when still alive.
    fn reward_and_punish(
        &self,
        _game: &mut Game,
        _killer: Option<PlayerId>,
        _victim: PlayerId,
    ) -> GameResult {
        Ok(GameContinue)
    }

    fn takes_turn(&self, player: &Player) -> bool {
        player.alive
    }
}

#[enum_dispatch(ModeRules)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, GetSize)]
pub enum GameMode {
    StandardMode,
    TeamMode,
    HulaoPassMode,
    BasaraMode,
}

impl From<GameModeKind> for GameMode {
    fn from(kind: GameModeKind) -> Self {
        match kind {
            GameModeKind::Standard => StandardMode.into(),
            GameModeKind::Team => TeamMode.into(),
            GameModeKind::HulaoPass => HulaoPassMode.into(),
            GameModeKind::Basara => BasaraMode.into(),
        }
    }
}

impl GameMode {
    pub fn kind(&self) -> GameModeKind {
        match self {
            GameMode::StandardMode(_) => GameModeKind::Standard,
            GameMode::TeamMode(_) => GameModeKind::Team,
            GameMode::HulaoPassMode(_) => GameModeKind::HulaoPass,
            GameMode::BasaraMode(_) => GameModeKind::Basara,
        }
    }
}

fn alive_with_role(game: &Game, role: Role) -> usize {
    game.state
        .players
        .iter()
        .filter(|p| p.alive && p.role == role)
        .count()
}

/// Throws every hand and equip card of `player`.
fn throw_all(game: &mut Game, player: PlayerId) -> GameResult {
    let me = game.player(player);
    let cards = me.hand.iter().chain(&me.equips).copied().collect_vec();
    game.throw_cards(cards, Some(player), MoveReasonKind::Discard)
}

// standard

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, GetSize)]
pub struct StandardMode;

impl ModeRules for StandardMode {
    fn name(&self) -> &'static str {
        "standard"
    }

    fn default_roles(&self, players: usize) -> Vec<Role> {
        let (loyalists, rebels, renegades) = match players {
            0 | 1 => (0, 0, 0),
            2 => (0, 1, 0),
            3 => (0, 1, 1),
            4 => (1, 1, 1),
            5 => (1, 2, 1),
            6 => (1, 3, 1),
            7 => (2, 3, 1),
            8 => (2, 4, 1),
            9 => (3, 4, 1),
            _ => (3, 4, 2),
        };
        let mut roles = vec![Role::Lord];
        roles.extend([Role::Loyalist].repeat(loyalists));
        roles.extend([Role::Rebel].repeat(rebels));
        roles.extend([Role::Renegade].repeat(renegades));
        roles.truncate(players);
        roles
    }

    fn winner(&self, game: &Game, victim: PlayerId) -> Option<Winner> {
        if game.player(victim).role == Role::Lord {
            let alive = game.alive_players();
            return match alive.as_slice() {
                [only] if game.player(*only).role == Role::Renegade => {
                    Some(Winner::Roles(vec![Role::Renegade]))
                }
                _ => Some(Winner::Roles(vec![Role::Rebel])),
            };
        }
        if alive_with_role(game, Role::Rebel) == 0 && alive_with_role(game, Role::Renegade) == 0 {
            return Some(Winner::Roles(vec![Role::Lord, Role::Loyalist]));
        }
        None
    }

    fn reward_and_punish(
        &self,
        game: &mut Game,
        killer: Option<PlayerId>,
        victim: PlayerId,
    ) -> GameResult {
        let Some(killer) = killer else {
            return Ok(GameContinue);
        };
        match (game.player(killer).role, game.player(victim).role) {
            (_, Role::Rebel) => game.draw_cards(killer, 3, "kill"),
            (Role::Lord, Role::Loyalist) => {
                info!("lord {killer} killed loyalist {victim}");
                throw_all(game, killer)
            }
            _ => Ok(GameContinue),
        }
    }
}

// team

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, GetSize)]
pub struct TeamMode;

impl ModeRules for TeamMode {
    fn name(&self) -> &'static str {
        "team"
    }

    fn default_roles(&self, players: usize) -> Vec<Role> {
        [Role::Loyalist, Role::Rebel]
            .into_iter()
            .cycle()
            .take(players)
            .collect()
    }

    fn winner(&self, game: &Game, _victim: PlayerId) -> Option<Winner> {
        if alive_with_role(game, Role::Loyalist) == 0 {
            Some(Winner::Roles(vec![Role::Rebel]))
        } else if alive_with_role(game, Role::Rebel) == 0 {
            Some(Winner::Roles(vec![Role::Loyalist]))
        } else {
            None
        }
    }

    fn reward_and_punish(
        &self,
        game: &mut Game,
        _killer: Option<PlayerId>,
        victim: PlayerId,
    ) -> GameResult {
        let role = game.player(victim).role;
        let teammates = game
            .alive_players()
            .into_iter()
            .filter(|p| game.player(*p).role == role)
            .collect_vec();
        for teammate in teammates {
            game.draw_cards(teammate, 1, "teammate_death")?;
        }
        Ok(GameContinue)
    }
}

// hulao pass

const HULAO_STAGE: &str = "HulaoStage";
/// the lord transforms once its hp drops to this
const HULAO_STAGE_HP: i32 = 4;
/// hp plus hand needed for a reforming rebel to come back
const REFORM_THRESHOLD: usize = 6;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, GetSize)]
pub struct HulaoPassMode;

impl ModeRules for HulaoPassMode {
    fn name(&self) -> &'static str {
        "hulao_pass"
    }

    fn install(&self, triggers: &mut TriggerRegistry) {
        triggers.register(GameRule::new());
        triggers.supersede(GAME_RULE, HulaoPassRule::new());
    }

    fn default_roles(&self, players: usize) -> Vec<Role> {
        let mut roles = vec![Role::Lord];
        roles.extend([Role::Rebel].repeat(players.saturating_sub(1)));
        roles.truncate(players);
        roles
    }

    fn winner(&self, game: &Game, victim: PlayerId) -> Option<Winner> {
        if game.player(victim).role == Role::Lord {
            Some(Winner::Roles(vec![Role::Rebel]))
        } else if alive_with_role(game, Role::Rebel) == 0 {
            Some(Winner::Roles(vec![Role::Lord]))
        } else {
            None
        }
    }

    /// A dead rebel starts reforming from zero hp, every other survivor but the lord may draw one.
    fn reward_and_punish(
        &self,
        game: &mut Game,
        _killer: Option<PlayerId>,
        victim: PlayerId,
    ) -> GameResult {
        if game.player(victim).role != Role::Rebel {
            return Ok(GameContinue);
        }
        game.send_log(LogMessage::new("#Reforming").from(victim));
        game.set_hp(victim, 0);

        let others = game
            .alive_players()
            .into_iter()
            .filter(|p| game.player(*p).role != Role::Lord)
            .collect_vec();
        for other in others {
            if game.ask_for_invoke(other, "draw_1v3")? {
                game.draw_cards(other, 1, "draw_1v3")?;
            }
        }
        Ok(GameContinue)
    }

    /// Dead rebels keep their turns while reforming.
    fn takes_turn(&self, player: &Player) -> bool {
        player.alive || (player.role == Role::Rebel && player.max_hp > 0)
    }
}

/// Replaces the base rule in hulao pass and defers to it for everything else.
#[derive(Debug)]
pub struct HulaoPassRule {
    events: Vec<TriggerEvent>,
}

impl HulaoPassRule {
    pub fn new() -> Self {
        let mut events = BASE_EVENTS.to_vec();
        events.push(TriggerEvent::StageChange);
        HulaoPassRule { events }
    }
}

impl Default for HulaoPassRule {
    fn default() -> Self {
        Self::new()
    }
}

impl TriggerHandler for HulaoPassRule {
    fn name(&self) -> &str {
        "hulao_pass_rule"
    }

    fn events(&self) -> &[TriggerEvent] {
        &self.events
    }

    fn priority(&self) -> i32 {
        1
    }

    fn trigger(
        &self,
        event: TriggerEvent,
        game: &mut Game,
        player: Option<PlayerId>,
        data: &mut EventData,
    ) -> TriggerResult {
        match (event, player) {
            (TriggerEvent::GameReady, _) => game.hulao_ready().map(|_| false),
            (TriggerEvent::StageChange, _) => game.hulao_transform().map(|_| false),
            (TriggerEvent::TurnStart, Some(player)) if !game.is_alive(player) => {
                game.hulao_reform(player).map(|_| false)
            }
            (TriggerEvent::HpChanged, Some(_)) => {
                let who = data.hp_change().player;
                let first_stage = game.state.room.int(HULAO_STAGE) <= 1;
                if first_stage
                    && game.player(who).role == Role::Lord
                    && game.is_alive(who)
                    && game.player(who).hp <= HULAO_STAGE_HP
                {
                    info!("hulao pass second stage");
                    game.state.room.set_int(HULAO_STAGE, 2);
                    return Err(Interrupt::StageChange);
                }
                GameRule::new().trigger(event, game, player, data)
            }
            _ => GameRule::new().trigger(event, game, player, data),
        }
    }
}

impl Game {
    fn hulao_ready(&mut self) -> GameResult {
        self.state.room.set_int(HULAO_STAGE, 1);
        self.state.room.set_tag("FirstRound", Tag::Bool(true));
        for player in self.state.players_from(self.current()) {
            self.grant_limit_marks(player);
            let n = if self.player(player).role == Role::Lord {
                8
            } else {
                player.index() as i32 + 1
            };
            self.draw_initial_cards(player, n)?;
        }
        Ok(GameContinue)
    }

    /// The lord takes its second form.
    fn hulao_transform(&mut self) -> GameResult {
        let Some(lord) = self.state.lord() else {
            return Ok(GameContinue);
        };
        let forms = self.config.hulao_forms.clone();
        let names = forms.iter().map(|f| f.name.as_str()).collect_vec();
        let picked = self.ask_for_choice(lord, "hulao_form", &names)?;
        if let Some(form) = forms.iter().find(|f| f.name == picked) {
            let me = self.player_mut(lord);
            me.general = form.name.clone();
            me.max_hp = form.max_hp;
            self.notify_property(lord, "general", &form.name);
            self.notify_property(lord, "maxhp", form.max_hp);
        }
        let max_hp = self.player(lord).max_hp;
        self.set_hp(lord, max_hp);
        self.send_log(
            LogMessage::new("#HulaoTransfigure")
                .from(lord)
                .arg(&self.player(lord).general),
        );

        let me = self.player(lord);
        let tricks = me.delayed_tricks.iter().chain(&me.judging).copied().collect_vec();
        self.throw_cards(tricks, Some(lord), MoveReasonKind::Throw)?;
        if !self.player(lord).face_up {
            self.set_face_up(lord, true);
        }
        self.set_chained(lord, false)
    }

    /// Turn of a dead rebel: recover or draw one, back in the game at the threshold.
    fn hulao_reform(&mut self, player: PlayerId) -> GameResult {
        let me = self.player(player);
        let wounded = me.hp < me.max_hp;
        // no choice at zero hp
        let choice = if wounded && me.hp > 0 {
            self.ask_for_choice(player, "hulao_reform", &["recover", "draw"])?
        } else if wounded {
            "recover".to_string()
        } else {
            "draw".to_string()
        };
        match choice.as_str() {
            "recover" => {
                let hp = self.player(player).hp.max(0) + 1;
                self.set_hp(player, hp);
                self.send_log(LogMessage::new("#ReformingRecover").from(player).arg(1));
            }
            _ => {
                let cards = self.take_draw_pile(1)?;
                let mut reason = MoveReason::new(MoveReasonKind::Draw, Some(player));
                reason.skill_name = Some("hulao_reform".into());
                self.move_cards(vec![CardsMove::new(
                    cards,
                    CardPlace::of(player, Place::Hand),
                    reason,
                )])?;
                self.send_log(LogMessage::new("#ReformingDraw").from(player).arg(1));
            }
        }

        let me = self.player(player);
        if me.hp.max(0) as usize + me.hand.len() == REFORM_THRESHOLD {
            let hp = me.hp.max(1);
            self.set_hp(player, hp);
            self.send_log(LogMessage::new("#ReformingRevive").from(player));
            self.revive(player)?;
        }
        Ok(GameContinue)
    }
}

// basara

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, GetSize)]
pub struct BasaraMode;

impl ModeRules for BasaraMode {
    fn name(&self) -> &'static str {
        "basara"
    }

    fn install(&self, triggers: &mut TriggerRegistry) {
        triggers.register(GameRule::new());
        triggers.register(BasaraRule);
    }

    fn default_roles(&self, players: usize) -> Vec<Role> {
        vec![Role::Renegade; players]
    }

    fn winner(&self, game: &Game, _victim: PlayerId) -> Option<Winner> {
        let kingdoms = game
            .alive_players()
            .into_iter()
            .map(|p| game.player(p).true_kingdom().to_string())
            .unique()
            .collect_vec();
        match kingdoms.as_slice() {
            [kingdom] => Some(Winner::Kingdom(kingdom.clone())),
            _ => None,
        }
    }

    fn reward_and_punish(
        &self,
        game: &mut Game,
        killer: Option<PlayerId>,
        victim: PlayerId,
    ) -> GameResult {
        let Some(killer) = killer else {
            return Ok(GameContinue);
        };
        if game.player(killer).true_kingdom() == game.player(victim).true_kingdom() {
            throw_all(game, killer)
        } else {
            game.draw_cards(killer, 3, "kill")
        }
    }
}

/// Hides generals at game ready and reveals them along the game.
#[derive(Debug, Default, Clone, Copy)]
pub struct BasaraRule;

impl TriggerHandler for BasaraRule {
    fn name(&self) -> &str {
        "basara_rule"
    }

    fn events(&self) -> &[TriggerEvent] {
        &[
            TriggerEvent::GameReady,
            TriggerEvent::EventPhaseStart,
            TriggerEvent::CardEffected,
            TriggerEvent::DamageInflicted,
            TriggerEvent::BeforeGameOverJudge,
        ]
    }

    fn priority(&self) -> i32 {
        15
    }

    fn trigger(
        &self,
        event: TriggerEvent,
        game: &mut Game,
        player: Option<PlayerId>,
        data: &mut EventData,
    ) -> TriggerResult {
        match event {
            TriggerEvent::GameReady => {
                for player in game.state.players_from(PlayerId::new(0)) {
                    game.hide_general(player);
                }
            }
            TriggerEvent::EventPhaseStart => {
                if let Some(player) = player {
                    if game.player(player).phase() == Phase::RoundStart {
                        game.offer_reveal(player)?;
                    }
                }
            }
            TriggerEvent::CardEffected => {
                let effect = data.card_effect();
                let to = effect.to;
                let card = &effect.card;
                if game.player(to).phase() == Phase::NotActive
                    && (card.kind.is_trick() || card.kind.is_slash())
                {
                    game.offer_reveal(to)?;
                }
            }
            TriggerEvent::DamageInflicted => {
                let to = data.damage().to;
                game.reveal_general(to);
            }
            TriggerEvent::BeforeGameOverJudge => {
                let who = data.death().who;
                game.reveal_general(who);
            }
            _ => {}
        }
        Ok(false)
    }
}

impl Game {
    pub fn hide_general(&mut self, player: PlayerId) {
        let me = self.player_mut(player);
        if me.hidden.is_some() {
            return;
        }
        let general = std::mem::replace(&mut me.general, HIDDEN_GENERAL.into());
        let kingdom = std::mem::replace(&mut me.kingdom, HIDDEN_GENERAL.into());
        me.hidden = Some(HiddenGeneral { general, kingdom });
        self.notify_property(player, "general", HIDDEN_GENERAL);
    }

    /// Shows the real general, nothing when already shown.
    pub fn reveal_general(&mut self, player: PlayerId) {
        let me = self.player_mut(player);
        let Some(hidden) = me.hidden.take() else {
            return;
        };
        me.general = hidden.general.clone();
        me.kingdom = hidden.kingdom.clone();
        self.notify_property(player, "general", &hidden.general);
        self.notify_property(player, "kingdom", &hidden.kingdom);
        self.send_log(
            LogMessage::new("#BasaraReveal")
                .from(player)
                .arg(&hidden.general)
                .arg2(&hidden.kingdom),
        );
    }

    pub fn offer_reveal(&mut self, player: PlayerId) -> GameResult {
        if self.player(player).is_hidden() && self.ask_for_invoke(player, "reveal_general")? {
            self.reveal_general(player);
        }
        Ok(GameContinue)
    }
}
