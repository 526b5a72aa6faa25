use std::time::Duration;

use pretty_assertions::assert_eq;
use rand::{rngs::StdRng, SeedableRng};
use sgs_engine::{
    cards::{Indulgence, Lightning, Slash, Suit},
    config::{GameModeKind, RoomConfig},
    events::{EventData, NoticeLog, TriggerEvent},
    gameplay::{Game, Interrupt, PlayerId, Tag, TriggerResult, Winner},
    mailbox::{Connection, Mailbox, Synchronizer},
    player::{Phase, Role},
    prompters::DefaultPrompter,
    tests::{
        fired_for, setup_test_game, setup_test_logs, GameStateBuilder, RecordingHandler,
        TriggerLog,
    },
    triggers::TriggerHandler,
};

use crate::{card, jinks, log_count, p, phases_of};

fn two_players() -> GameStateBuilder {
    GameStateBuilder::new(GameModeKind::Standard).with_roles(&[Role::Lord, Role::Rebel])
}

#[test]
fn plain_turn_goes_through_every_phase() {
    let state = two_players().with_draw_pile(jinks(2)).build();
    let (mut game, notices) = setup_test_game(state, vec![]);
    let log = TriggerLog::default();
    game.triggers.register(RecordingHandler::new(
        "rounds",
        &[TriggerEvent::GameStart, TriggerEvent::RoundStart],
        &log,
    ));

    game.next_turn().unwrap();

    assert_eq!(
        phases_of(&notices, p(0)),
        vec![
            Phase::RoundStart,
            Phase::Start,
            Phase::Judge,
            Phase::Draw,
            Phase::Play,
            Phase::Discard,
            Phase::Finish,
            Phase::NotActive,
        ]
    );
    assert_eq!(game.player(p(0)).hand.len(), 2);
    assert_eq!(game.player(p(0)).phase(), Phase::NotActive);
    assert_eq!(game.state.turn_number, 1);
    assert_eq!(game.current(), p(1));
    assert_eq!(game.state.room.int("TurnLengthCount"), 1);
    // once for every alive player
    let started = fired_for(&log, TriggerEvent::GameStart)
        .into_iter()
        .map(|f| f.player)
        .collect::<Vec<_>>();
    assert_eq!(started, vec![Some(p(0)), Some(p(1))]);
    assert_eq!(fired_for(&log, TriggerEvent::RoundStart).len(), 2);
}

#[test]
fn rounds_start_with_the_first_seat_only() {
    let state = two_players().with_draw_pile(jinks(6)).build();
    let (mut game, _) = setup_test_game(state, vec![]);
    let log = TriggerLog::default();
    game.triggers
        .register(RecordingHandler::new("rounds", &[TriggerEvent::RoundStart], &log));

    game.next_turn().unwrap();
    game.next_turn().unwrap();
    assert_eq!(fired_for(&log, TriggerEvent::RoundStart).len(), 2);
    assert_eq!(game.current(), p(0));

    game.next_turn().unwrap();

    let rounds = fired_for(&log, TriggerEvent::RoundStart)
        .into_iter()
        .map(|f| (f.player, f.count))
        .collect::<Vec<_>>();
    assert_eq!(
        rounds,
        vec![
            (Some(p(0)), Some(1)),
            (Some(p(1)), Some(1)),
            (Some(p(0)), Some(2)),
            (Some(p(1)), Some(2)),
        ]
    );
    assert_eq!(game.state.room.int("TurnLengthCount"), 2);
}

#[test]
fn indulgence_skips_the_play_phase() {
    let state = two_players()
        .with_delayed_tricks(p(0), vec![card(Indulgence, Suit::Spade, 6)])
        // judge card, then the draw phase
        .with_draw_pile(vec![card(Slash::normal(), Suit::Spade, 5)])
        .with_draw_pile(jinks(2))
        .build();
    let (mut game, notices) = setup_test_game(state, vec![]);
    let log = TriggerLog::default();
    game.triggers.register(RecordingHandler::new(
        "phases",
        &[TriggerEvent::EventPhaseSkipped, TriggerEvent::EventPhaseProceeding],
        &log,
    ));

    game.next_turn().unwrap();

    assert_eq!(fired_for(&log, TriggerEvent::EventPhaseSkipped).len(), 1);
    // every phase but the skipped one and not active
    assert_eq!(fired_for(&log, TriggerEvent::EventPhaseProceeding).len(), 6);
    assert_eq!(log_count(&notices, "#SkipPhase"), 1);
    assert_eq!(log_count(&notices, "#JudgeBad"), 1);
    assert!(game.player(p(0)).delayed_tricks.is_empty());
    assert!(game.player(p(0)).judging.is_empty());
    assert_eq!(game.player(p(0)).hand.len(), 2);
    assert_eq!(game.state.discard_pile.len(), 2);
}

#[test]
fn indulgence_on_a_heart_does_nothing() {
    let state = two_players()
        .with_delayed_tricks(p(0), vec![card(Indulgence, Suit::Club, 6)])
        .with_draw_pile(vec![card(Slash::normal(), Suit::Heart, 10)])
        .with_draw_pile(jinks(2))
        .build();
    let (mut game, notices) = setup_test_game(state, vec![]);

    game.next_turn().unwrap();

    assert_eq!(log_count(&notices, "#JudgeGood"), 1);
    assert_eq!(log_count(&notices, "#SkipPhase"), 0);
    assert_eq!(game.state.discard_pile.len(), 2);
}

/// Trades a card from the second seat's hand for the judge card.
#[derive(Debug)]
struct SwapJudge;

impl TriggerHandler for SwapJudge {
    fn name(&self) -> &str {
        "swap_judge"
    }
    fn events(&self) -> &[TriggerEvent] {
        &[TriggerEvent::AskForRetrial]
    }
    fn priority(&self) -> i32 {
        5
    }
    fn trigger(
        &self,
        _event: TriggerEvent,
        game: &mut Game,
        player: Option<PlayerId>,
        data: &mut EventData,
    ) -> TriggerResult {
        let Some(player) = player.filter(|p| *p == PlayerId::new(1)) else {
            return Ok(false);
        };
        let Some(card) = game.player(player).hand.first().copied() else {
            return Ok(false);
        };
        game.retrial(data.judge_mut(), player, card, true)?;
        Ok(false)
    }
}

#[test]
fn retrial_replaces_the_judge_card() {
    let state = two_players()
        .with_delayed_tricks(p(0), vec![card(Indulgence, Suit::Spade, 6)])
        .with_draw_pile(vec![card(Slash::normal(), Suit::Spade, 5)])
        .with_draw_pile(jinks(2))
        .with_hand(p(1), vec![card(Slash::normal(), Suit::Heart, 10)])
        .build();
    let judge_card = state.draw_pile[0];
    let heart = state.player(p(1)).hand[0];
    let (mut game, notices) = setup_test_game(state, vec![]);
    game.triggers.register(SwapJudge);

    game.next_turn().unwrap();

    assert_eq!(log_count(&notices, "$ChangedJudge"), 1);
    assert_eq!(log_count(&notices, "#JudgeGood"), 1);
    assert_eq!(log_count(&notices, "#SkipPhase"), 0);
    // the old judge card went to the hand of whoever changed it
    assert_eq!(game.player(p(1)).hand, vec![judge_card]);
    assert!(game.state.discard_pile.contains(&heart));
    assert!(game.player(p(0)).judging.is_empty());
}

#[test]
fn lightning_strikes_on_spade_two_to_nine() {
    let state = two_players()
        .with_delayed_tricks(p(0), vec![card(Lightning, Suit::Spade, 1)])
        .with_draw_pile(vec![card(Slash::normal(), Suit::Spade, 5)])
        .with_draw_pile(jinks(2))
        .build();
    let lightning = state.player(p(0)).delayed_tricks[0];
    let (mut game, notices) = setup_test_game(state, vec![]);

    game.next_turn().unwrap();

    assert_eq!(game.player(p(0)).hp, 1);
    assert_eq!(log_count(&notices, "#DamageNoSource"), 1);
    assert!(game.state.discard_pile.contains(&lightning));
    assert!(game.player(p(1)).delayed_tricks.is_empty());
}

#[test]
fn lightning_moves_on_when_it_misses() {
    let state = two_players()
        .with_delayed_tricks(p(0), vec![card(Lightning, Suit::Spade, 1)])
        .with_draw_pile(vec![card(Slash::normal(), Suit::Heart, 10)])
        .with_draw_pile(jinks(2))
        .build();
    let lightning = state.player(p(0)).delayed_tricks[0];
    let (mut game, _) = setup_test_game(state, vec![]);

    game.next_turn().unwrap();

    assert_eq!(game.player(p(0)).hp, 4);
    assert!(game.player(p(0)).delayed_tricks.is_empty());
    assert_eq!(game.player(p(1)).delayed_tricks, vec![lightning]);
}

#[test]
fn face_down_player_only_turns_over() {
    let mut state = two_players().with_draw_pile(jinks(2)).build();
    state.player_mut(p(0)).face_up = false;
    let (mut game, notices) = setup_test_game(state, vec![]);

    game.next_turn().unwrap();

    assert!(game.player(p(0)).face_up);
    assert!(phases_of(&notices, p(0)).is_empty());
    assert!(game.player(p(0)).hand.is_empty());
    assert_eq!(log_count(&notices, "#TurnOver"), 1);
    assert_eq!(game.current(), p(1));
}

#[test]
fn face_down_extra_turn_is_used_up() {
    let mut state = two_players().with_draw_pile(jinks(4)).build();
    state.player_mut(p(0)).face_up = false;
    state
        .room
        .set_tag(&format!("Global_ExtraTurn{}", p(0)), Tag::Bool(true));
    let (mut game, _) = setup_test_game(state, vec![]);
    let log = TriggerLog::default();
    game.triggers
        .register(RecordingHandler::new("rounds", &[TriggerEvent::RoundStart], &log));

    game.next_turn().unwrap();

    assert!(game.player(p(0)).face_up);
    assert!(!game.state.room.has_tag("Global_ExtraTurnp_0"));
    assert_eq!(game.player(p(0)).mark("@extra_turn"), 0);
    assert!(fired_for(&log, TriggerEvent::RoundStart).is_empty());

    game.next_turn().unwrap();
    game.next_turn().unwrap();

    // the next turn of the first seat is a normal one again
    assert_eq!(fired_for(&log, TriggerEvent::RoundStart).len(), 2);
    assert_eq!(game.state.room.int("TurnLengthCount"), 1);
}

#[test]
fn vetoed_draw_skips_the_after_event() {
    let state = two_players().with_draw_pile(jinks(2)).build();
    let (mut game, _) = setup_test_game(state, vec![]);
    let log = TriggerLog::default();
    game.triggers.register(
        RecordingHandler::new(
            "draws",
            &[
                TriggerEvent::DrawNCards,
                TriggerEvent::AfterDrawNCards,
                TriggerEvent::AfterDiscardNCards,
            ],
            &log,
        )
        .with_priority(5)
        .vetoing(&[TriggerEvent::DrawNCards]),
    );

    game.next_turn().unwrap();

    assert!(game.player(p(0)).hand.is_empty());
    assert_eq!(game.state.draw_pile.len(), 2);
    assert_eq!(fired_for(&log, TriggerEvent::DrawNCards)[0].count, Some(2));
    assert!(fired_for(&log, TriggerEvent::AfterDrawNCards).is_empty());
    // nothing to throw, still reported
    let discarded = fired_for(&log, TriggerEvent::AfterDiscardNCards);
    assert_eq!(discarded.len(), 1);
    assert_eq!(discarded[0].count, Some(0));
}

#[test]
fn discard_down_to_hp() {
    let state = two_players()
        .with_hp(p(0), 2)
        .with_hand(p(0), jinks(3))
        .with_draw_pile(jinks(2))
        .build();
    let (mut game, notices) = setup_test_game(state, vec![]);

    game.next_turn().unwrap();

    assert_eq!(game.player(p(0)).hand.len(), 2);
    assert_eq!(game.state.discard_pile.len(), 3);
    assert_eq!(log_count(&notices, "$DiscardCard"), 1);
}

#[test]
fn extra_turn_hands_the_turn_back() {
    let state = two_players().with_draw_pile(jinks(2)).build();
    let (mut game, notices) = setup_test_game(state, vec![]);
    let log = TriggerLog::default();
    game.triggers
        .register(RecordingHandler::new("rounds", &[TriggerEvent::RoundStart], &log));

    game.gain_an_extra_turn(p(1)).unwrap();

    assert_eq!(phases_of(&notices, p(1)).len(), 8);
    assert_eq!(game.player(p(1)).hand.len(), 2);
    assert_eq!(game.player(p(1)).mark("@extra_turn"), 0);
    assert_eq!(game.current(), p(0));
    assert!(fired_for(&log, TriggerEvent::RoundStart).is_empty());
    assert!(!game.state.room.has_tag("Global_ExtraTurnp_1"));
}

#[test]
fn turn_limit_ends_in_a_draw() {
    let state = two_players()
        .with_turn_number(3)
        .with_draw_pile(jinks(2))
        .build();
    let (mut game, _) = setup_test_game(state, vec![]);
    game.config.max_turns = 3;

    let outcome = game.next_turn().unwrap_err();

    assert_eq!(outcome.winner, Winner::Draw);
    assert!(outcome.winning_players.is_empty());
    assert_eq!(game.state.game_outcome, Some(outcome));
}

#[test]
fn draw_pile_refills_from_the_discard_pile() {
    let state = two_players().with_discard_pile(jinks(3)).build();
    let (mut game, notices) = setup_test_game(state, vec![]);

    game.draw_cards(p(0), 2, "test").unwrap();

    assert_eq!(game.player(p(0)).hand.len(), 2);
    assert_eq!(game.state.pile_swaps, 1);
    assert_eq!(game.state.draw_pile.len(), 1);
    assert!(game.state.discard_pile.is_empty());
    assert_eq!(log_count(&notices, "#SwapPile"), 1);
}

#[test]
fn no_card_left_is_a_draw() {
    let state = two_players().build();
    let (mut game, _) = setup_test_game(state, vec![]);

    let result = game.draw_cards(p(0), 1, "test");

    assert!(matches!(
        result,
        Err(Interrupt::GameOver(ref outcome)) if outcome.winner == Winner::Draw
    ));
}

#[test]
fn disconnected_seat_breaks_its_turn() {
    let state = two_players()
        .with_hand(p(0), vec![card(Slash::normal(), Suit::Spade, 7)])
        .with_draw_pile(jinks(2))
        .build();
    let (to_client, from_room) = async_channel::unbounded();
    let (to_room, from_client) = async_channel::unbounded();
    drop((from_room, to_room));
    let mailbox = Synchronizer::new(
        vec![
            Mailbox::online((to_client, from_client), DefaultPrompter::new()),
            Mailbox::robot(DefaultPrompter::new()),
        ],
        Duration::from_millis(100),
    );
    let config = RoomConfig {
        players: 2,
        ..RoomConfig::default()
    };
    let mut game = Game::with_game_state(state, config, mailbox, StdRng::seed_from_u64(123456))
        .with_sink(NoticeLog::new());
    let log = TriggerLog::default();
    game.triggers
        .register(RecordingHandler::new("broken", &[TriggerEvent::TurnBroken], &log));

    game.next_turn().unwrap();

    assert_eq!(game.mailbox.connection(p(0)), Connection::Offline);
    assert_eq!(fired_for(&log, TriggerEvent::TurnBroken).len(), 1);
    assert_eq!(game.player(p(0)).phase(), Phase::NotActive);
    // the slash was never played
    assert_eq!(game.player(p(0)).hand.len(), 3);
    assert_eq!(game.current(), p(1));
    assert_eq!(game.state.event_span.depth(), 0);
}

#[test]
fn robots_play_a_whole_room_to_the_turn_limit() {
    let _guard = setup_test_logs();

    let config = RoomConfig {
        players: 4,
        seed: Some(7),
        max_turns: 12,
        ..RoomConfig::default()
    };
    let mut game = Game::setup(config, Synchronizer::robots(4));

    let outcome = game.run();

    assert_eq!(outcome.winner, Winner::Draw);
    assert_eq!(game.state.turn_number, 13);
    assert!(game.state.players.iter().all(|p| p.alive));
}
