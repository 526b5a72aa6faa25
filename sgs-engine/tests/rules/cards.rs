use pretty_assertions::assert_eq;
use sgs_engine::{
    card_use::CardUseContext,
    cards::{Card, Jink, Nullification, SavageAssault, Slash, Suit},
    config::GameModeKind,
    events::{EventData, Notice, TriggerEvent},
    gameplay::{CardId, Game, PlayerId, TriggerResult},
    pindian::{PindianOutcome, PindianTarget},
    player::Role,
    prompters::BufferedPrompter,
    tests::{fired, fired_for, setup_test_game, GameStateBuilder, RecordingHandler, TriggerLog},
    triggers::TriggerHandler,
};

use crate::{card, jinks, log_count, p};

fn three_players() -> GameStateBuilder {
    GameStateBuilder::new(GameModeKind::Standard).with_roles(&[
        Role::Lord,
        Role::Rebel,
        Role::Renegade,
    ])
}

fn use_from_hand(game: &mut Game, from: PlayerId, card: CardId, to: Vec<PlayerId>) {
    let card = Card::real(game.card_info(card));
    game.use_card(CardUseContext::new(from, card, to)).unwrap();
}

#[test]
fn unanswered_slash_hits() {
    let state = three_players()
        .with_hand(p(0), vec![card(Slash::normal(), Suit::Spade, 7)])
        .build();
    let slash = state.player(p(0)).hand[0];
    let (mut game, notices) = setup_test_game(state, vec![]);
    let log = TriggerLog::default();
    game.triggers.register(RecordingHandler::new(
        "slash",
        &[
            TriggerEvent::SlashHit,
            TriggerEvent::SlashMissed,
            TriggerEvent::CardFinished,
        ],
        &log,
    ));

    use_from_hand(&mut game, p(0), slash, vec![p(1)]);

    assert_eq!(game.player(p(1)).hp, 3);
    assert_eq!(fired_for(&log, TriggerEvent::SlashHit).len(), 1);
    assert!(fired_for(&log, TriggerEvent::SlashMissed).is_empty());
    assert_eq!(fired_for(&log, TriggerEvent::CardFinished).len(), 1);
    assert_eq!(game.player(p(0)).usage("slash"), 1);
    assert_eq!(game.state.discard_pile, vec![slash]);
    assert!(game.state.table.is_empty());
    assert_eq!(log_count(&notices, "#UseCard"), 1);
}

#[test]
fn jink_dodges_the_slash() {
    let state = three_players()
        .with_hand(p(0), vec![card(Slash::normal(), Suit::Spade, 7)])
        .with_hand(p(1), vec![card(Jink, Suit::Diamond, 2)])
        .build();
    let slash = state.player(p(0)).hand[0];
    let jink = state.player(p(1)).hand[0];
    let target = BufferedPrompter::new(&[&[1]]);
    let (mut game, notices) =
        setup_test_game(state, vec![BufferedPrompter::default(), target]);
    let log = TriggerLog::default();
    game.triggers.register(RecordingHandler::new(
        "slash",
        &[TriggerEvent::SlashHit, TriggerEvent::SlashMissed],
        &log,
    ));

    use_from_hand(&mut game, p(0), slash, vec![p(1)]);

    assert_eq!(game.player(p(1)).hp, 4);
    assert!(game.player(p(1)).hand.is_empty());
    assert_eq!(fired_for(&log, TriggerEvent::SlashMissed).len(), 1);
    assert!(fired_for(&log, TriggerEvent::SlashHit).is_empty());
    assert_eq!(log_count(&notices, "#Response"), 1);
    assert_eq!(game.state.discard_pile, vec![slash, jink]);
}

#[test]
fn target_keeping_the_jink_gets_hit() {
    let state = three_players()
        .with_hand(p(0), vec![card(Slash::thunder(), Suit::Club, 9)])
        .with_hand(p(1), vec![card(Jink, Suit::Diamond, 2)])
        .build();
    let slash = state.player(p(0)).hand[0];
    let (mut game, notices) = setup_test_game(state, vec![]);

    use_from_hand(&mut game, p(0), slash, vec![p(1)]);

    assert_eq!(game.player(p(1)).hp, 3);
    assert_eq!(game.player(p(1)).hand.len(), 1);
    let damage = notices.logs().into_iter().find(|l| l.kind == "#Damage");
    assert_eq!(
        damage.map(|l| l.arg2),
        Some("thunder_nature".to_string())
    );
}

#[test]
fn drank_slash_deals_one_more() {
    let state = three_players()
        .with_hand(p(0), vec![card(Slash::normal(), Suit::Spade, 7)])
        .build();
    let slash = state.player(p(0)).hand[0];
    let (mut game, notices) = setup_test_game(state, vec![]);
    game.player_mut(p(0)).set_mark("drank", 1);

    use_from_hand(&mut game, p(0), slash, vec![p(1)]);

    assert_eq!(game.player(p(1)).hp, 2);
    assert_eq!(game.player(p(0)).mark("drank"), 0);
    assert_eq!(game.player(p(1)).mark("SlashIsDrank"), 0);
    assert_eq!(log_count(&notices, "#AnalepticBuff"), 1);
}

/// Drops every target it is asked to confirm.
#[derive(Debug)]
struct Untargetable;

impl TriggerHandler for Untargetable {
    fn name(&self) -> &str {
        "untargetable"
    }
    fn events(&self) -> &[TriggerEvent] {
        &[TriggerEvent::TargetConfirming]
    }
    fn trigger(
        &self,
        _event: TriggerEvent,
        _game: &mut Game,
        player: Option<PlayerId>,
        data: &mut EventData,
    ) -> TriggerResult {
        data.card_use_mut().to.retain(|to| Some(*to) != player);
        Ok(false)
    }
}

#[test]
fn use_without_targets_left_stops_early() {
    let state = three_players()
        .with_hand(p(0), vec![card(Slash::normal(), Suit::Spade, 7)])
        .build();
    let slash = state.player(p(0)).hand[0];
    let (mut game, _) = setup_test_game(state, vec![]);
    let log = TriggerLog::default();
    game.triggers.register(Untargetable);
    game.triggers.register(RecordingHandler::new(
        "use",
        &[
            TriggerEvent::CardUsed,
            TriggerEvent::TargetSpecified,
            TriggerEvent::CardFinished,
        ],
        &log,
    ));

    use_from_hand(&mut game, p(0), slash, vec![p(1)]);

    assert_eq!(game.player(p(1)).hp, 4);
    assert_eq!(fired_for(&log, TriggerEvent::CardUsed).len(), 1);
    assert!(fired_for(&log, TriggerEvent::TargetSpecified).is_empty());
    assert!(fired_for(&log, TriggerEvent::CardFinished).is_empty());
    // still counted as used
    assert_eq!(game.player(p(0)).usage("slash"), 1);
    assert_eq!(game.state.discard_pile, vec![slash]);
    assert!(game.state.table.is_empty());
}

#[test]
fn targets_are_sorted_from_the_current_seat() {
    let state = three_players()
        .with_current(p(1))
        .with_hand(p(0), vec![card(SavageAssault, Suit::Spade, 13)])
        .build();
    let assault = state.player(p(0)).hand[0];
    let (mut game, notices) = setup_test_game(state, vec![]);

    use_from_hand(&mut game, p(0), assault, vec![p(2), p(1)]);

    let used = notices.snapshot().into_iter().find_map(|n| match n {
        Notice::CardUsed { to, .. } => Some(to),
        _ => None,
    });
    assert_eq!(used, Some(vec![p(1), p(2)]));
}

#[test]
fn nullification_spares_one_target_of_savage_assault() {
    let state = three_players()
        .with_hand(p(0), vec![card(SavageAssault, Suit::Spade, 13)])
        .with_hand(p(1), vec![card(Nullification, Suit::Club, 12)])
        .build();
    let assault = state.player(p(0)).hand[0];
    let nullification = state.player(p(1)).hand[0];
    let rebel = BufferedPrompter::new(&[&[1]]);
    let (mut game, _) = setup_test_game(state, vec![BufferedPrompter::default(), rebel]);
    let log = TriggerLog::default();
    game.triggers.register(RecordingHandler::new(
        "offset",
        &[TriggerEvent::EffectOffsetted, TriggerEvent::Damaged],
        &log,
    ));

    use_from_hand(&mut game, p(0), assault, vec![p(1), p(2)]);

    assert_eq!(game.player(p(1)).hp, 4);
    assert_eq!(game.player(p(2)).hp, 3);
    assert!(game.player(p(1)).hand.is_empty());
    let offset = fired_for(&log, TriggerEvent::EffectOffsetted);
    assert_eq!(offset.len(), 1);
    assert_eq!(offset[0].player, Some(p(1)));
    assert_eq!(fired_for(&log, TriggerEvent::Damaged).len(), 1);
    assert_eq!(game.state.discard_pile, vec![assault, nullification]);
    assert_eq!(game.state.room.int("NullifyingTimes"), 0);
}

#[test]
fn nullification_can_be_countered() {
    let state = three_players()
        .with_hand(p(0), vec![card(SavageAssault, Suit::Spade, 13)])
        .with_hand(p(1), vec![card(Nullification, Suit::Club, 12)])
        .with_hand(p(2), vec![card(Nullification, Suit::Diamond, 12)])
        .build();
    let assault = state.player(p(0)).hand[0];
    // the rebel nullifies, the renegade counters
    let rebel = BufferedPrompter::new(&[&[1]]);
    let renegade = BufferedPrompter::new(&[&[0], &[1]]);
    let (mut game, _) = setup_test_game(
        state,
        vec![BufferedPrompter::default(), rebel, renegade],
    );

    use_from_hand(&mut game, p(0), assault, vec![p(1), p(2)]);

    assert_eq!(game.player(p(1)).hp, 3);
    assert_eq!(game.player(p(2)).hp, 3);
    assert!(game.player(p(1)).hand.is_empty());
    assert!(game.player(p(2)).hand.is_empty());
}

#[test]
fn pindian_higher_number_wins() {
    let state = three_players()
        .with_hand(p(0), vec![card(Slash::normal(), Suit::Spade, 5)])
        .with_hand(p(1), vec![card(Jink, Suit::Heart, 3)])
        .build();
    let (mut game, notices) = setup_test_game(state, vec![]);
    let log = TriggerLog::default();
    game.triggers.register(RecordingHandler::new(
        "pindian",
        &[
            TriggerEvent::AskforPindianCard,
            TriggerEvent::PindianVerifying,
            TriggerEvent::Pindian,
        ],
        &log,
    ));

    let won = game
        .pindian(p(0), PindianTarget::Player(p(1)), "test")
        .unwrap();

    assert!(won);
    assert!(game.player(p(0)).hand.is_empty());
    assert!(game.player(p(1)).hand.is_empty());
    assert_eq!(game.state.discard_pile.len(), 2);
    assert_eq!(fired(&log).len(), 3);
    assert_eq!(log_count(&notices, "#PindianSuccess"), 1);
    assert_eq!(log_count(&notices, "$PindianResult"), 2);
    assert!(notices.snapshot().contains(&Notice::Pindian {
        from: p(0),
        to: PindianTarget::Player(p(1)),
        from_number: 5,
        to_number: 3,
        success: true,
    }));
}

#[test]
fn pindian_tie_is_not_a_win() {
    let state = three_players()
        .with_hand(p(0), vec![card(Slash::normal(), Suit::Spade, 3)])
        .with_hand(p(1), vec![card(Jink, Suit::Heart, 3)])
        .build();
    let (mut game, notices) = setup_test_game(state, vec![]);

    let outcome = game
        .pindian_outcome(p(0), PindianTarget::Player(p(1)), "test")
        .unwrap();

    assert_eq!(outcome, PindianOutcome::Draw);
    assert_eq!(log_count(&notices, "#PindianFailure"), 1);
    assert_eq!(game.state.discard_pile.len(), 2);
}

#[test]
fn pindian_against_the_draw_pile() {
    let state = three_players()
        .with_hand(p(0), vec![card(Slash::normal(), Suit::Spade, 4)])
        .with_draw_pile(vec![card(Jink, Suit::Heart, 11)])
        .with_draw_pile(jinks(1))
        .build();
    let (mut game, _) = setup_test_game(state, vec![]);

    let pindian = game
        .resolve_pindian(p(0), PindianTarget::DrawPile, "test", None)
        .unwrap();

    assert_eq!(pindian.outcome(), PindianOutcome::ToWins);
    assert!(!pindian.success);
    assert_eq!(pindian.to_number, 11);
    assert_eq!(game.state.draw_pile.len(), 1);
    assert_eq!(game.state.discard_pile.len(), 2);
}

#[test]
fn pindian_with_an_empty_hand_takes_from_the_pile() {
    let state = three_players()
        .with_hand(p(1), vec![card(Jink, Suit::Heart, 2)])
        .with_draw_pile(vec![card(Slash::normal(), Suit::Spade, 9)])
        .build();
    let (mut game, _) = setup_test_game(state, vec![]);

    let pindian = game
        .resolve_pindian(p(0), PindianTarget::Player(p(1)), "test", None)
        .unwrap();

    assert_eq!((pindian.from_number, pindian.to_number), (9, 2));
    assert!(pindian.success);
    assert!(game.state.draw_pile.is_empty());
}
