use tracing::{debug, error};

use crate::events::{EventData, LogMessage, Notice, PhaseChangeContext, PhaseSkipContext, TriggerEvent};
use crate::gameplay::{Game, GameContinue, GameResult, Interrupt, PlayerId};
use crate::player::{Phase, SkipKind};

impl Phase {
    pub fn name(self) -> &'static str {
        match self {
            Phase::RoundStart => "round_start",
            Phase::Start => "start",
            Phase::Judge => "judge",
            Phase::Draw => "draw",
            Phase::Play => "play",
            Phase::Discard => "discard",
            Phase::Finish => "finish",
            Phase::NotActive => "not_active",
            Phase::None => "none",
        }
    }
}

impl Game {
    /// Runs `phases` for `player`, ending with `NotActive`.
    ///
    /// Every change goes through `EventPhaseChanging`, whose handlers can redirect
    /// the phase or veto it, a vetoed or skipped phase only raises the skip events.
    pub fn play_phases(&mut self, player: PlayerId, phases: &[Phase]) -> GameResult {
        let mut phases = if phases.is_empty() {
            Phase::TURN.to_vec()
        } else {
            phases.to_vec()
        };
        if !phases.contains(&Phase::NotActive) {
            phases.push(Phase::NotActive);
        }
        self.player_mut(player).phases.set_queue(phases);

        let mut index = 0;
        while let Some(pending) = self.player(player).phases.pending(index) {
            if !self.is_alive(player) {
                let from = self.player(player).phase();
                self.change_phase(player, from, Phase::NotActive)?;
                break;
            }

            self.player_mut(player).phases.index = index;
            let from = self.player(player).phase();
            self.set_phase(player, Phase::None);

            let mut data = EventData::PhaseChange(PhaseChangeContext {
                from,
                to: pending.phase,
            });
            let vetoed = self.trigger(TriggerEvent::EventPhaseChanging, Some(player), &mut data)?;
            let phase = data.phase_change().to;
            self.player_mut(player).phases.queue[index].phase = phase;
            self.set_phase(player, phase);

            let skipped = self.player(player).phases.queue[index].skipped;
            if phase != Phase::NotActive && (vetoed || skipped != SkipKind::NotSkipped) {
                let mut data = EventData::PhaseSkip(PhaseSkipContext {
                    phase,
                    is_cost: skipped == SkipKind::Cost,
                });
                let cancel_skip =
                    self.trigger(TriggerEvent::EventPhaseSkipping, Some(player), &mut data)?;
                if !cancel_skip {
                    self.trigger(TriggerEvent::EventPhaseSkipped, Some(player), &mut data)?;
                    index += 1;
                    continue;
                }
            }

            if self.run_phase(player)? {
                break;
            }
            // the queue can grow while the phase runs
            index = self.player(player).phases.index + 1;
        }
        Ok(GameContinue)
    }

    /// Start, proceeding and end of the phase `player` is in, `true` once the turn is over.
    fn run_phase(&mut self, player: PlayerId) -> Result<bool, Interrupt> {
        if !self.trigger(TriggerEvent::EventPhaseStart, Some(player), &mut EventData::None)?
            && self.player(player).phase() != Phase::NotActive
        {
            self.trigger(TriggerEvent::EventPhaseProceeding, Some(player), &mut EventData::None)?;
        }
        if self.player(player).phase() != Phase::NotActive {
            self.trigger(TriggerEvent::EventPhaseEnd, Some(player), &mut EventData::None)?;
            Ok(false)
        } else {
            Ok(true)
        }
    }

    /// Moves `player` from `from` to `to` outside of the turn loop.
    /// Returns `true` when the change was vetoed, which never happens for `NotActive`.
    pub fn change_phase(&mut self, player: PlayerId, from: Phase, to: Phase) -> Result<bool, Interrupt> {
        self.set_phase(player, Phase::None);

        let mut data = EventData::PhaseChange(PhaseChangeContext { from, to });
        let vetoed = self.trigger(TriggerEvent::EventPhaseChanging, Some(player), &mut data)?;
        if vetoed && to != Phase::NotActive {
            self.set_phase(player, from);
            return Ok(true);
        }

        self.set_phase(player, to);
        self.run_phase(player)?;
        Ok(false)
    }

    fn set_phase(&mut self, player: PlayerId, phase: Phase) {
        self.player_mut(player).phases.phase = phase;
        if phase != Phase::None {
            debug!("{player} phase: {phase:?}");
            self.notify(Notice::Phase { player, phase });
        }
    }

    /// Marks the next `phase` of the running turn as skipped.
    pub fn skip_phase(&mut self, player: PlayerId, phase: Phase, is_cost: bool) {
        if !self.player_mut(player).phases.skip(phase, is_cost) {
            return;
        }
        self.send_log(LogMessage::new("#SkipPhase").from(player).arg(phase.name()));
    }

    /// Splices `phase` into the running turn, right after the current one.
    pub fn insert_phase(&mut self, player: PlayerId, phase: Phase) {
        self.player_mut(player).phases.insert(phase);
    }

    /// Ends the play phase at the next opportunity.
    pub fn end_play_phase(&mut self, player: PlayerId) {
        if self.player(player).phase() != Phase::Play {
            error!("{player} is not in the play phase");
            return;
        }
        self.player_mut(player).set_flag("Global_PlayPhaseTerminated");
    }

    /// Flips `player`, unless a handler vetoes it.
    pub fn turn_over(&mut self, player: PlayerId) -> GameResult {
        if self.trigger(TriggerEvent::TurnOver, Some(player), &mut EventData::None)? {
            return Ok(GameContinue);
        }
        let face_up = !self.player(player).face_up;
        self.set_face_up(player, face_up);
        self.send_log(
            LogMessage::new("#TurnOver")
                .from(player)
                .arg(if face_up { "face_up" } else { "face_down" }),
        );
        self.trigger(TriggerEvent::TurnedOver, Some(player), &mut EventData::None)?;
        Ok(GameContinue)
    }
}
