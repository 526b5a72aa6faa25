use iter_tools::Itertools;

use crate::card_use::{CardEffectContext, CardUseContext, SlashEffectContext};
use crate::cards::*;
use crate::damage::{DamageContext, DamageNature, RecoverContext};
use crate::events::LogMessage;
use crate::gameplay::{Game, GameContinue, GameResult, PlayerId, Tag};
use crate::judge::{JudgeContext, JudgePattern};
use crate::player::Phase;

fn others(game: &Game, player: PlayerId) -> Vec<Vec<PlayerId>> {
    game.state
        .other_alive_players(player)
        .into_iter()
        .map(|p| vec![p])
        .collect()
}

fn has_delayed(game: &Game, player: PlayerId, name: &str) -> bool {
    game.player(player)
        .delayed_tricks
        .iter()
        .any(|c| game.card_info(*c).kind.name() == name)
}

fn put_delayed(game: &mut Game, card: &Card, from: PlayerId, to: PlayerId) -> GameResult {
    game.move_cards(vec![CardsMove::new(
        card.card_ids(),
        CardPlace::of(to, Place::DelayedTrick),
        MoveReason::new(MoveReasonKind::Put, Some(from)),
    )])
}

impl CardBehavior for Slash {
    fn name(&self) -> &'static str {
        match self.nature {
            DamageNature::Fire => "fire_slash",
            DamageNature::Thunder => "thunder_slash",
            _ => "slash",
        }
    }
    fn card_type(&self) -> CardType {
        CardType::Basic
    }
    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::SlashLike]
    }
    fn history_key(&self) -> &'static str {
        "slash"
    }

    fn play_targets(&self, game: &Game, player: PlayerId) -> Vec<Vec<PlayerId>> {
        let player_ref = game.player(player);
        let limit = 1 + player_ref.property("SlashExtraTimes").max(0) as u32;
        if player_ref.usage("slash") >= limit {
            return Vec::new();
        }
        others(game, player)
    }

    fn on_use(&self, game: &mut Game, card_use: &mut CardUseContext) -> GameResult {
        let drank = game.player(card_use.from).mark("drank");
        if drank > 0 {
            card_use.drank = drank;
            game.player_mut(card_use.from).set_mark("drank", 0);
        }
        game.effect_each_target(card_use)
    }

    fn on_effect(&self, game: &mut Game, effect: &CardEffectContext) -> GameResult {
        let Some(from) = effect.from else {
            return Ok(GameContinue);
        };
        let key = format!("Jink_{}", effect.card.key());
        let jink_num = match game.player(from).tag(&key) {
            Some(Tag::Ints(jinks)) => jinks.get(effect.target_index).copied().unwrap_or(1),
            _ => 1,
        };
        game.slash_effect(SlashEffectContext {
            from,
            to: effect.to,
            slash: effect.card.clone(),
            jink: None,
            jink_num,
            nature: self.nature,
            drank: effect.drank,
            nullified: effect.nullified,
            no_respond: effect.no_respond,
            no_offset: effect.no_offset,
        })
    }
}

impl CardBehavior for Jink {
    fn name(&self) -> &'static str {
        "jink"
    }
    fn card_type(&self) -> CardType {
        CardType::Basic
    }
    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::JinkLike]
    }
    fn needs_targets(&self) -> bool {
        false
    }
}

impl CardBehavior for Peach {
    fn name(&self) -> &'static str {
        "peach"
    }
    fn card_type(&self) -> CardType {
        CardType::Basic
    }
    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::Rescue]
    }

    fn play_targets(&self, game: &Game, player: PlayerId) -> Vec<Vec<PlayerId>> {
        if game.player(player).is_wounded() {
            vec![vec![player]]
        } else {
            Vec::new()
        }
    }

    fn on_effect(&self, game: &mut Game, effect: &CardEffectContext) -> GameResult {
        let mut recover = RecoverContext::new(effect.from, effect.to, 1);
        recover.card = Some(effect.card.clone());
        game.recover(recover)
    }
}

impl CardBehavior for Analeptic {
    fn name(&self) -> &'static str {
        "analeptic"
    }
    fn card_type(&self) -> CardType {
        CardType::Basic
    }
    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::SelfRescue]
    }

    fn play_targets(&self, game: &Game, player: PlayerId) -> Vec<Vec<PlayerId>> {
        if game.player(player).usage("analeptic") == 0 {
            vec![vec![player]]
        } else {
            Vec::new()
        }
    }

    fn on_effect(&self, game: &mut Game, effect: &CardEffectContext) -> GameResult {
        if game.player(effect.to).has_flag("Global_Dying") {
            let mut recover = RecoverContext::new(effect.from, effect.to, 1);
            recover.card = Some(effect.card.clone());
            return game.recover(recover);
        }
        game.player_mut(effect.to).gain_mark("drank", 1);
        game.send_log(LogMessage::new("#Drank").from(effect.to));
        Ok(GameContinue)
    }
}

impl CardBehavior for Nullification {
    fn name(&self) -> &'static str {
        "nullification"
    }
    fn card_type(&self) -> CardType {
        CardType::Trick
    }
    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::Nullify]
    }
    fn needs_targets(&self) -> bool {
        false
    }

    // only ever used in answer to another trick
    fn on_use(&self, _game: &mut Game, _card_use: &mut CardUseContext) -> GameResult {
        Ok(GameContinue)
    }
}

/// Each target answers with a card of `capability` or takes one damage.
fn area_effect(
    game: &mut Game,
    effect: &CardEffectContext,
    capability: Capability,
    prompt: &str,
) -> GameResult {
    let source = effect.from.filter(|from| game.is_alive(*from));
    let prompt = match source {
        Some(from) => format!("{prompt}:{from}"),
        None => prompt.to_string(),
    };
    if game
        .ask_for_card(effect.to, capability, &prompt, false)?
        .is_some()
    {
        return Ok(GameContinue);
    }
    game.damage(DamageContext::new(source, effect.to, 1).with_card(effect.card.clone()))
}

impl CardBehavior for SavageAssault {
    fn name(&self) -> &'static str {
        "savage_assault"
    }
    fn card_type(&self) -> CardType {
        CardType::Trick
    }
    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::AreaEffect]
    }

    fn play_targets(&self, game: &Game, player: PlayerId) -> Vec<Vec<PlayerId>> {
        let targets = game.state.other_alive_players(player);
        if targets.is_empty() {
            Vec::new()
        } else {
            vec![targets]
        }
    }

    fn on_effect(&self, game: &mut Game, effect: &CardEffectContext) -> GameResult {
        area_effect(game, effect, Capability::SlashLike, "savage-assault-slash")
    }
}

impl CardBehavior for ArcheryAttack {
    fn name(&self) -> &'static str {
        "archery_attack"
    }
    fn card_type(&self) -> CardType {
        CardType::Trick
    }
    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::AreaEffect]
    }

    fn play_targets(&self, game: &Game, player: PlayerId) -> Vec<Vec<PlayerId>> {
        let targets = game.state.other_alive_players(player);
        if targets.is_empty() {
            Vec::new()
        } else {
            vec![targets]
        }
    }

    fn on_effect(&self, game: &mut Game, effect: &CardEffectContext) -> GameResult {
        area_effect(game, effect, Capability::JinkLike, "archery-attack-jink")
    }
}

impl CardBehavior for Duel {
    fn name(&self) -> &'static str {
        "duel"
    }
    fn card_type(&self) -> CardType {
        CardType::Trick
    }

    fn play_targets(&self, game: &Game, player: PlayerId) -> Vec<Vec<PlayerId>> {
        others(game, player)
    }

    fn on_effect(&self, game: &mut Game, effect: &CardEffectContext) -> GameResult {
        let Some(from) = effect.from else {
            return Ok(GameContinue);
        };
        // the target answers first
        let (mut first, mut second) = (effect.to, from);
        while game.is_alive(first) && game.is_alive(second) {
            let prompt = format!("duel-slash:{second}");
            if game
                .ask_for_card(first, Capability::SlashLike, &prompt, false)?
                .is_none()
            {
                let damage = DamageContext::new(Some(second), first, 1)
                    .with_card(effect.card.clone());
                return game.damage(damage);
            }
            std::mem::swap(&mut first, &mut second);
        }
        Ok(GameContinue)
    }
}

impl CardBehavior for IronChain {
    fn name(&self) -> &'static str {
        "iron_chain"
    }
    fn card_type(&self) -> CardType {
        CardType::Trick
    }

    fn play_targets(&self, game: &Game, player: PlayerId) -> Vec<Vec<PlayerId>> {
        game.state
            .alive_players_from(player)
            .into_iter()
            .map(|p| vec![p])
            .collect()
    }

    fn on_effect(&self, game: &mut Game, effect: &CardEffectContext) -> GameResult {
        let chained = game.player(effect.to).chained;
        game.set_chained(effect.to, !chained)
    }
}

impl CardBehavior for Indulgence {
    fn name(&self) -> &'static str {
        "indulgence"
    }
    fn card_type(&self) -> CardType {
        CardType::Trick
    }
    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::DelayedTrick]
    }

    fn play_targets(&self, game: &Game, player: PlayerId) -> Vec<Vec<PlayerId>> {
        game.state
            .other_alive_players(player)
            .into_iter()
            .filter(|p| !has_delayed(game, *p, self.name()))
            .map(|p| vec![p])
            .collect()
    }

    fn on_use(&self, game: &mut Game, card_use: &mut CardUseContext) -> GameResult {
        let Some(target) = card_use.to.first().copied() else {
            return Ok(GameContinue);
        };
        put_delayed(game, &card_use.card, card_use.from, target)
    }

    fn on_effect(&self, game: &mut Game, effect: &CardEffectContext) -> GameResult {
        let judge = game.judge(JudgeContext::new(
            effect.to,
            self.name(),
            JudgePattern::Suit(Suit::Heart),
            true,
        ))?;
        if judge.is_bad() {
            game.skip_phase(effect.to, Phase::Play, false);
        }
        game.discard_from_table(&effect.card)
    }
}

impl CardBehavior for Lightning {
    fn name(&self) -> &'static str {
        "lightning"
    }
    fn card_type(&self) -> CardType {
        CardType::Trick
    }
    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::DelayedTrick]
    }

    fn play_targets(&self, game: &Game, player: PlayerId) -> Vec<Vec<PlayerId>> {
        if has_delayed(game, player, self.name()) {
            Vec::new()
        } else {
            vec![vec![player]]
        }
    }

    fn on_use(&self, game: &mut Game, card_use: &mut CardUseContext) -> GameResult {
        let from = card_use.from;
        put_delayed(game, &card_use.card, from, from)
    }

    fn on_effect(&self, game: &mut Game, effect: &CardEffectContext) -> GameResult {
        let judge = game.judge(JudgeContext::new(
            effect.to,
            self.name(),
            JudgePattern::SuitRange {
                suit: Suit::Spade,
                low: 2,
                high: 9,
            },
            false,
        ))?;
        if judge.is_good() {
            return self.on_nullified(game, effect);
        }

        game.discard_from_table(&effect.card)?;
        let damage = DamageContext::new(None, effect.to, 3)
            .with_nature(DamageNature::Thunder)
            .with_card(effect.card.clone())
            .with_reason(self.name());
        game.damage(damage)
    }

    /// Moves on to the next player without a lightning.
    fn on_nullified(&self, game: &mut Game, effect: &CardEffectContext) -> GameResult {
        let next = game
            .state
            .alive_players_from(effect.to)
            .into_iter()
            .skip(1)
            .chain([effect.to])
            .find(|p| !has_delayed(game, *p, self.name()))
            .unwrap_or(effect.to);
        let on_table = effect
            .card
            .card_ids()
            .into_iter()
            .filter(|c| game.state.is_in(*c, Place::Table))
            .collect_vec();
        game.move_cards(vec![CardsMove::new(
            on_table,
            CardPlace::of(next, Place::DelayedTrick),
            MoveReason::new(MoveReasonKind::Transfer, Some(effect.to)),
        )])
    }
}
