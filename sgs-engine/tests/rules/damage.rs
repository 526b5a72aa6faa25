use pretty_assertions::assert_eq;
use sgs_engine::{
    cards::{Peach, Suit},
    config::GameModeKind,
    damage::{DamageContext, DamageNature, RecoverContext},
    events::TriggerEvent,
    gameplay::{Interrupt, Winner},
    player::Role,
    prompters::BufferedPrompter,
    tests::{fired_for, setup_test_game, GameStateBuilder, RecordingHandler, TriggerLog},
};

use crate::{card, jinks, log_count, p};

fn standard_four() -> GameStateBuilder {
    GameStateBuilder::new(GameModeKind::Standard).with_roles(&[
        Role::Lord,
        Role::Loyalist,
        Role::Rebel,
        Role::Renegade,
    ])
}

#[test]
fn dead_source_deals_sourceless_damage() {
    let state = standard_four().with_dead(p(1)).build();
    let (mut game, notices) = setup_test_game(state, vec![]);
    let log = TriggerLog::default();
    game.triggers.register(RecordingHandler::new(
        "steps",
        &[
            TriggerEvent::DamageCaused,
            TriggerEvent::DamageInflicted,
            TriggerEvent::Damage,
            TriggerEvent::Damaged,
        ],
        &log,
    ));

    game.damage(DamageContext::new(Some(p(1)), p(2), 1)).unwrap();

    assert_eq!(game.player(p(2)).hp, 3);
    assert_eq!(log_count(&notices, "#DamageNoSource"), 1);
    assert!(fired_for(&log, TriggerEvent::DamageCaused).is_empty());
    assert!(fired_for(&log, TriggerEvent::Damage).is_empty());
    assert_eq!(fired_for(&log, TriggerEvent::DamageInflicted).len(), 1);
    assert_eq!(fired_for(&log, TriggerEvent::Damaged).len(), 1);
}

#[test]
fn damage_on_the_dead_is_ignored() {
    let state = standard_four().with_dead(p(2)).build();
    let (mut game, notices) = setup_test_game(state, vec![]);

    game.damage(DamageContext::new(Some(p(0)), p(2), 1)).unwrap();

    assert_eq!(game.player(p(2)).hp, 4);
    assert!(notices.logs().is_empty());
}

#[test]
fn vetoed_inflicted_damage_is_prevented() {
    let state = standard_four().build();
    let (mut game, _) = setup_test_game(state, vec![]);
    let log = TriggerLog::default();
    game.triggers.register(
        RecordingHandler::new("armor", &[TriggerEvent::DamageInflicted], &log)
            .with_priority(2)
            .vetoing(&[TriggerEvent::DamageInflicted]),
    );
    game.triggers
        .register(RecordingHandler::new("after", &[TriggerEvent::Damaged], &log));

    game.damage(DamageContext::new(Some(p(0)), p(2), 2)).unwrap();

    assert_eq!(game.player(p(2)).hp, 4);
    assert!(fired_for(&log, TriggerEvent::Damaged).is_empty());
}

#[test]
fn fire_spreads_through_every_other_chained_player() {
    let state = standard_four()
        .with_chained(p(0))
        .with_chained(p(1))
        .with_chained(p(2))
        .build();
    let (mut game, notices) = setup_test_game(state, vec![]);
    let log = TriggerLog::default();
    game.triggers
        .register(RecordingHandler::new("hurt", &[TriggerEvent::Damaged], &log));

    game.damage(DamageContext::new(Some(p(3)), p(1), 1).with_nature(DamageNature::Fire))
        .unwrap();

    let damaged = fired_for(&log, TriggerEvent::Damaged)
        .into_iter()
        .filter_map(|f| f.player)
        .collect::<Vec<_>>();
    // the target first, then the others from the current seat
    assert_eq!(damaged, vec![p(1), p(0), p(2)]);
    assert_eq!(log_count(&notices, "#IronChainDamage"), 2);
    assert_eq!(game.player(p(3)).hp, 4);
    for chained in [p(0), p(1), p(2)] {
        assert_eq!(game.player(chained).hp, 3);
        assert!(!game.player(chained).chained);
    }
    assert_eq!(game.state.room.int("is_chained"), 0);
}

#[test]
fn normal_damage_keeps_the_chain() {
    let state = standard_four().with_chained(p(0)).with_chained(p(1)).build();
    let (mut game, _) = setup_test_game(state, vec![]);

    game.damage(DamageContext::new(Some(p(3)), p(1), 1)).unwrap();

    assert_eq!(game.player(p(0)).hp, 4);
    assert!(game.player(p(0)).chained);
    assert!(game.player(p(1)).chained);
}

#[test]
fn overkill_dies_once() {
    let state = standard_four()
        .with_hp(p(2), 1)
        .with_draw_pile(jinks(3))
        .build();
    let (mut game, notices) = setup_test_game(state, vec![]);
    let log = TriggerLog::default();
    game.triggers.register(RecordingHandler::new(
        "death",
        &[
            TriggerEvent::EnterDying,
            TriggerEvent::AskForPeaches,
            TriggerEvent::Death,
            TriggerEvent::GameOverJudge,
            TriggerEvent::QuitDying,
        ],
        &log,
    ));

    game.damage(DamageContext::new(Some(p(0)), p(2), 2)).unwrap();

    assert!(!game.player(p(2)).alive);
    assert_eq!(game.player(p(2)).hp, -1);
    // every alive player is asked in turn
    assert_eq!(fired_for(&log, TriggerEvent::AskForPeaches).len(), 4);
    assert_eq!(fired_for(&log, TriggerEvent::Death).len(), 1);
    assert_eq!(fired_for(&log, TriggerEvent::GameOverJudge).len(), 1);
    assert!(fired_for(&log, TriggerEvent::QuitDying).is_empty());
    assert_eq!(log_count(&notices, "#Murder"), 1);
    // the renegade is still alive
    assert_eq!(game.state.game_outcome, None);
    // killing a rebel is worth three cards
    assert_eq!(game.player(p(0)).hand.len(), 3);
}

#[test]
fn peach_brings_the_dying_back() {
    let state = standard_four()
        .with_hp(p(1), 1)
        .with_hand(p(0), vec![card(Peach, Suit::Heart, 3)])
        .build();
    let peach = state.player(p(0)).hand[0];
    // pass is the first choice
    let lord = BufferedPrompter::new(&[&[1]]);
    let (mut game, notices) = setup_test_game(state, vec![lord]);
    let log = TriggerLog::default();
    game.triggers.register(RecordingHandler::new(
        "dying",
        &[TriggerEvent::QuitDying, TriggerEvent::Death],
        &log,
    ));

    game.damage(DamageContext::new(Some(p(2)), p(1), 1)).unwrap();

    assert!(game.player(p(1)).alive);
    assert_eq!(game.player(p(1)).hp, 1);
    assert!(!game.player(p(1)).has_flag("Global_Dying"));
    assert!(game.state.discard_pile.contains(&peach));
    assert_eq!(fired_for(&log, TriggerEvent::QuitDying).len(), 1);
    assert!(fired_for(&log, TriggerEvent::Death).is_empty());
    assert_eq!(log_count(&notices, "#Recover"), 1);
}

#[test]
fn recover_is_capped_at_max_hp() {
    let state = standard_four().with_hp(p(0), 3).build();
    let (mut game, _) = setup_test_game(state, vec![]);

    game.recover(RecoverContext::new(None, p(0), 2)).unwrap();
    assert_eq!(game.player(p(0)).hp, 4);

    game.lose_hp(p(0), 2).unwrap();
    assert_eq!(game.player(p(0)).hp, 2);
}

#[test]
fn lord_death_hands_the_game_to_the_rebels() {
    let state = standard_four().with_hp(p(0), 1).build();
    let (mut game, notices) = setup_test_game(state, vec![]);

    let result = game.damage(DamageContext::new(Some(p(2)), p(0), 1));

    let Err(Interrupt::GameOver(outcome)) = result else {
        panic!("the game should be over: {result:?}");
    };
    assert_eq!(outcome.winner, Winner::Roles(vec![Role::Rebel]));
    assert_eq!(outcome.winning_players, vec![p(2)]);
    assert_eq!(game.state.game_outcome, Some(outcome));
    assert_eq!(log_count(&notices, "#GameOver"), 1);
}

#[test]
fn renegade_alone_with_the_lord_wins() {
    let state = standard_four()
        .with_dead(p(1))
        .with_dead(p(2))
        .with_hp(p(0), 1)
        .build();
    let (mut game, _) = setup_test_game(state, vec![]);

    let result = game.damage(DamageContext::new(Some(p(3)), p(0), 1));

    let Err(Interrupt::GameOver(outcome)) = result else {
        panic!("the game should be over: {result:?}");
    };
    assert_eq!(outcome.winner, Winner::Roles(vec![Role::Renegade]));
    assert_eq!(outcome.winning_players, vec![p(3)]);
}

#[test]
fn last_rebel_down_wins_for_the_lord_side() {
    let state = standard_four().with_dead(p(3)).with_hp(p(2), 1).build();
    let (mut game, _) = setup_test_game(state, vec![]);

    let result = game.damage(DamageContext::new(Some(p(1)), p(2), 1));

    let Err(Interrupt::GameOver(outcome)) = result else {
        panic!("the game should be over: {result:?}");
    };
    assert_eq!(outcome.winner, Winner::Roles(vec![Role::Lord, Role::Loyalist]));
    assert_eq!(outcome.winning_players, vec![p(0), p(1)]);
}

#[test]
fn lord_killing_a_loyalist_throws_everything() {
    let state = standard_four()
        .with_hp(p(1), 1)
        .with_hand(p(0), jinks(2))
        .build();
    let (mut game, _) = setup_test_game(state, vec![]);

    game.damage(DamageContext::new(Some(p(0)), p(1), 1)).unwrap();

    assert!(!game.player(p(1)).alive);
    assert!(game.player(p(0)).hand.is_empty());
    assert_eq!(game.state.discard_pile.len(), 2);
}
