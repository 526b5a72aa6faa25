use pretty_assertions::assert_eq;
use sgs_engine::{
    config::GameModeKind,
    damage::DamageContext,
    events::{EventData, TriggerEvent},
    gameplay::{Game, Interrupt, PlayerId, TriggerResult, Winner},
    player::{Role, HIDDEN_GENERAL},
    prompters::BufferedPrompter,
    tests::{setup_test_game, GameStateBuilder},
    triggers::TriggerHandler,
};

use crate::{jinks, log_count, p};

#[test]
fn team_death_rewards_the_teammates() {
    let state = GameStateBuilder::new(GameModeKind::Team)
        .with_roles(&[Role::Loyalist, Role::Rebel, Role::Loyalist, Role::Rebel])
        .with_hp(p(1), 1)
        .with_draw_pile(jinks(2))
        .build();
    let (mut game, _) = setup_test_game(state, vec![]);

    game.damage(DamageContext::new(Some(p(0)), p(1), 1)).unwrap();

    assert!(!game.player(p(1)).alive);
    assert_eq!(game.player(p(3)).hand.len(), 1);
    assert!(game.player(p(0)).hand.is_empty());
    assert_eq!(game.state.game_outcome, None);
}

#[test]
fn team_wins_once_the_other_side_is_gone() {
    let state = GameStateBuilder::new(GameModeKind::Team)
        .with_roles(&[Role::Loyalist, Role::Rebel, Role::Loyalist, Role::Rebel])
        .with_dead(p(1))
        .with_hp(p(3), 1)
        .build();
    let (mut game, _) = setup_test_game(state, vec![]);

    let result = game.damage(DamageContext::new(Some(p(2)), p(3), 1));

    let Err(Interrupt::GameOver(outcome)) = result else {
        panic!("the game should be over: {result:?}");
    };
    assert_eq!(outcome.winner, Winner::Roles(vec![Role::Loyalist]));
    assert_eq!(outcome.winning_players, vec![p(0), p(2)]);
}

fn hulao() -> GameStateBuilder {
    GameStateBuilder::new(GameModeKind::HulaoPass)
        .with_player("shenlvbu1", "god", Role::Lord, 8)
        .with_player("zhaoyun", "shu", Role::Rebel, 4)
        .with_player("guanyu", "shu", Role::Rebel, 4)
}

/// Hits the lord once at the start of its turn.
#[derive(Debug)]
struct Ambush;

impl TriggerHandler for Ambush {
    fn name(&self) -> &str {
        "ambush"
    }
    fn events(&self) -> &[TriggerEvent] {
        &[TriggerEvent::TurnStart]
    }
    fn priority(&self) -> i32 {
        5
    }
    fn trigger(
        &self,
        _event: TriggerEvent,
        game: &mut Game,
        player: Option<PlayerId>,
        _data: &mut EventData,
    ) -> TriggerResult {
        if player == Some(p(0)) && game.player(p(0)).hp == 5 {
            game.damage(DamageContext::new(Some(p(1)), p(0), 1))?;
        }
        Ok(false)
    }
}

#[test]
fn hulao_lord_transforms_at_four_hp() {
    let state = hulao()
        .with_hp(p(0), 5)
        .with_chained(p(1))
        .with_dead(p(2))
        .with_hp(p(2), 0)
        .build();
    let (mut game, notices) = setup_test_game(state, vec![]);
    game.triggers.register(Ambush);

    game.next_turn().unwrap();

    let lord = game.player(p(0));
    assert_eq!(lord.general, "shenlvbu2");
    assert_eq!((lord.hp, lord.max_hp), (4, 4));
    assert_eq!(game.state.room.int("HulaoStage"), 2);
    assert_eq!(log_count(&notices, "#HulaoTransfigure"), 1);
    assert!(!game.player(p(1)).chained);
    assert!(game.player(p(2)).alive);
    assert_eq!(game.player(p(2)).hp, 4);
    // the lord starts over
    assert_eq!(game.current(), p(0));
    assert!(game.player(p(0)).hand.is_empty());
}

#[test]
fn reforming_rebel_comes_back_at_the_threshold() {
    let state = hulao()
        .with_dead(p(1))
        .with_hp(p(1), 0)
        .with_hand(p(1), jinks(5))
        .with_current(p(1))
        .build();
    let (mut game, notices) = setup_test_game(state, vec![]);

    game.next_turn().unwrap();

    assert!(game.player(p(1)).alive);
    assert_eq!(game.player(p(1)).hp, 1);
    assert_eq!(log_count(&notices, "#ReformingRecover"), 1);
    assert_eq!(log_count(&notices, "#ReformingRevive"), 1);
    assert_eq!(game.current(), p(2));
}

#[test]
fn reforming_rebel_at_zero_hp_must_recover() {
    let state = hulao()
        .with_dead(p(1))
        .with_hp(p(1), 0)
        .with_current(p(1))
        .with_draw_pile(jinks(1))
        .build();
    // would pick the draw if asked
    let rebel = BufferedPrompter::new(&[&[1]]);
    let (mut game, notices) = setup_test_game(state, vec![BufferedPrompter::default(), rebel]);

    game.next_turn().unwrap();

    assert!(!game.player(p(1)).alive);
    assert_eq!(game.player(p(1)).hp, 1);
    assert!(game.player(p(1)).hand.is_empty());
    assert_eq!(log_count(&notices, "#ReformingRecover"), 1);
    assert_eq!(log_count(&notices, "#ReformingDraw"), 0);
}

#[test]
fn wounded_reforming_rebel_may_draw_instead() {
    let state = hulao()
        .with_dead(p(1))
        .with_hp(p(1), 2)
        .with_hand(p(1), jinks(4))
        .with_current(p(1))
        .with_draw_pile(jinks(1))
        .build();
    let rebel = BufferedPrompter::new(&[&[1]]);
    let (mut game, notices) = setup_test_game(state, vec![BufferedPrompter::default(), rebel]);

    game.next_turn().unwrap();

    // seven is past the mark, only an exact six brings it back
    assert!(!game.player(p(1)).alive);
    assert_eq!(game.player(p(1)).hp, 2);
    assert_eq!(game.player(p(1)).hand.len(), 5);
    assert_eq!(log_count(&notices, "#ReformingDraw"), 1);
    assert_eq!(log_count(&notices, "#ReformingRevive"), 0);
}

#[test]
fn dead_rebel_starts_reforming_from_zero() {
    let state = hulao()
        .with_hp(p(1), 1)
        .with_hp(p(2), 3)
        .with_draw_pile(jinks(2))
        .build();
    let accept = BufferedPrompter::new(&[&[1]]);
    let (mut game, notices) = setup_test_game(
        state,
        vec![BufferedPrompter::default(), BufferedPrompter::default(), accept],
    );

    game.damage(DamageContext::new(Some(p(0)), p(1), 2)).unwrap();

    assert!(!game.player(p(1)).alive);
    assert_eq!(game.player(p(1)).hp, 0);
    assert_eq!(log_count(&notices, "#Reforming"), 1);
    // the surviving rebel took the card, there is nothing else on offer
    assert_eq!(game.player(p(2)).hand.len(), 1);
    assert_eq!(game.player(p(2)).hp, 3);
    assert!(game.player(p(0)).hand.is_empty());
    assert_eq!(game.next_turn_player(p(0)), p(1));
}

#[test]
fn surviving_rebel_may_decline_the_card() {
    let state = hulao()
        .with_hp(p(1), 1)
        .with_draw_pile(jinks(2))
        .build();
    let (mut game, _) = setup_test_game(state, vec![]);

    game.damage(DamageContext::new(Some(p(0)), p(1), 1)).unwrap();

    assert!(!game.player(p(1)).alive);
    assert!(game.player(p(2)).hand.is_empty());
    assert_eq!(game.state.draw_pile.len(), 2);
}

fn basara() -> GameStateBuilder {
    GameStateBuilder::new(GameModeKind::Basara)
        .with_player("caocao", "wei", Role::Renegade, 4)
        .with_player("liubei", "shu", Role::Renegade, 4)
        .with_player("xiahoudun", "wei", Role::Renegade, 4)
}

#[test]
fn basara_hides_then_reveals_on_damage() {
    let state = basara().with_draw_pile(jinks(12)).build();
    let (mut game, notices) = setup_test_game(state, vec![]);

    game.start_game().unwrap();

    assert!(game.state.draw_pile.is_empty());
    for seat in 0..3 {
        let player = game.player(p(seat));
        assert!(player.is_hidden());
        assert_eq!(player.general, HIDDEN_GENERAL);
        assert_eq!(player.hand.len(), 4);
    }
    assert_eq!(game.player(p(1)).true_kingdom(), "shu");

    game.damage(DamageContext::new(Some(p(0)), p(1), 1)).unwrap();

    let revealed = game.player(p(1));
    assert!(!revealed.is_hidden());
    assert_eq!((revealed.general.as_str(), revealed.kingdom.as_str()), ("liubei", "shu"));
    assert!(game.player(p(0)).is_hidden());
    assert_eq!(log_count(&notices, "#BasaraReveal"), 1);
}

#[test]
fn basara_last_kingdom_standing_wins() {
    let state = basara().with_hp(p(1), 1).build();
    let (mut game, _) = setup_test_game(state, vec![]);
    for seat in 0..3 {
        game.hide_general(p(seat));
    }

    let result = game.damage(DamageContext::new(Some(p(0)), p(1), 1));

    let Err(Interrupt::GameOver(outcome)) = result else {
        panic!("the game should be over: {result:?}");
    };
    assert_eq!(outcome.winner, Winner::Kingdom("wei".into()));
    assert_eq!(outcome.winning_players, vec![p(0), p(2)]);
    // the winners stay hidden, the victim is shown
    assert!(game.player(p(0)).is_hidden());
    assert!(!game.player(p(1)).is_hidden());
}

#[test]
fn basara_accepting_the_offer_reveals() {
    let state = basara().build();
    let accept = BufferedPrompter::new(&[&[1]]);
    let (mut game, _) = setup_test_game(state, vec![accept]);
    game.hide_general(p(0));
    game.hide_general(p(1));

    game.offer_reveal(p(0)).unwrap();
    game.offer_reveal(p(1)).unwrap();

    assert_eq!(game.player(p(0)).general, "caocao");
    assert!(game.player(p(1)).is_hidden());
}
