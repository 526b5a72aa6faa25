use std::time::Duration;

use async_channel::{Receiver, Sender, TryRecvError};
use debug_ignore::DebugIgnore;
use iter_tools::Itertools;
use tokio::runtime::{Builder, Runtime};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info, warn};

use crate::client::DecisionProvider;
use crate::events::{Answer, ChoiceRecord, ClientReceive, ClientSend, EventData, Notice, Question, TriggerEvent};
use crate::gameplay::{Game, Interrupt, PlayerId};
use crate::prompters::DefaultPrompter;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum Connection {
    #[default]
    Online,
    /// disconnected, trusted to the bot
    Offline,
    Robot,
}

/// Room side of a seat: `(to client, from client)`.
pub type RoomChannels = (Sender<ClientReceive>, Receiver<ClientSend>);

#[derive(Debug)]
pub struct Mailbox {
    pub player: PlayerId,
    pub connection: Connection,
    channels: Option<RoomChannels>,
    bot: DebugIgnore<Box<dyn DecisionProvider + Send>>,
}

impl Mailbox {
    pub fn online(channels: RoomChannels, bot: impl DecisionProvider + Send + 'static) -> Self {
        Mailbox {
            player: PlayerId::new(0),
            connection: Connection::Online,
            channels: Some(channels),
            bot: DebugIgnore(Box::new(bot)),
        }
    }

    pub fn robot(bot: impl DecisionProvider + Send + 'static) -> Self {
        Mailbox {
            player: PlayerId::new(0),
            connection: Connection::Robot,
            channels: None,
            bot: DebugIgnore(Box::new(bot)),
        }
    }

    fn bot_answer(&mut self, question: &Question) -> Answer {
        let answer = self.bot.decide(question);
        if question.accepts(&answer) {
            answer
        } else {
            warn!("bot answer rejected for {}: {answer:?}", self.player);
            passive_answer(question)
        }
    }

    fn drain(&mut self) {
        let Some((_, receive)) = &self.channels else {
            return;
        };
        loop {
            match receive.try_recv() {
                Ok(stale) => debug!("drained from {}: {stale:?}", self.player),
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
    }
}

/// The least committing legal answer.
pub fn passive_answer(question: &Question) -> Answer {
    match question {
        Question::PlayCard { .. } => Answer::Play(None),
        Question::RespondCard { .. } => Answer::Card(None),
        Question::Discard {
            amount,
            optional,
            candidates,
            ..
        } => {
            let amount = if *optional { 0 } else { *amount };
            Answer::Cards(candidates.iter().take(amount).map(|c| c.card).collect())
        }
        Question::PindianCard { candidates, .. } => {
            Answer::Card(candidates.first().map(|c| c.card))
        }
        Question::Choice { choices, .. } => {
            Answer::Choice(choices.first().cloned().unwrap_or_default())
        }
        Question::Invoke { .. } => Answer::YesNo(false),
    }
}

enum Reply {
    Answer(Answer),
    Timeout,
    Disconnected,
    ForceEndTurn,
}

/// Every seat's mailbox. The room thread is the only one asking.
#[derive(Debug)]
pub struct Synchronizer {
    mailboxes: Vec<Mailbox>,
    next_serial: u32,
    pub timeout: Duration,
    runtime: Option<Runtime>,
}

impl Synchronizer {
    pub fn new(mailboxes: Vec<Mailbox>, timeout: Duration) -> Self {
        let mailboxes = mailboxes
            .into_iter()
            .enumerate()
            .map(|(seat, mut mailbox)| {
                mailbox.player = PlayerId::new(seat as u8);
                mailbox
            })
            .collect();
        Synchronizer {
            mailboxes,
            next_serial: 1,
            timeout,
            runtime: None,
        }
    }

    /// Every seat answered by a passive bot.
    pub fn robots(players: usize) -> Self {
        Synchronizer::new(
            (0..players)
                .map(|_| Mailbox::robot(DefaultPrompter::new()))
                .collect(),
            Duration::from_millis(0),
        )
    }

    pub fn connection(&self, player: PlayerId) -> Connection {
        self.mailboxes
            .get(player.index())
            .map(|m| m.connection)
            .unwrap_or(Connection::Robot)
    }
    pub fn set_connection(&mut self, player: PlayerId, connection: Connection) {
        if let Some(mailbox) = self.mailboxes.get_mut(player.index()) {
            info!("{player} is now {connection:?}");
            mailbox.connection = connection;
        }
    }

    pub fn broadcast(&mut self, notice: &Notice) {
        for mailbox in &self.mailboxes {
            if mailbox.connection != Connection::Online {
                continue;
            }
            if let Some((send, _)) = &mailbox.channels {
                if send
                    .try_send(ClientReceive::Notice(notice.clone()))
                    .is_err()
                {
                    debug!("notice not delivered to {}", mailbox.player);
                }
            }
        }
    }

    /// Throws away every queued reply, so nothing leaks into the next question.
    pub fn drain(&mut self) {
        for mailbox in &mut self.mailboxes {
            mailbox.drain();
        }
    }

    pub fn ask(&mut self, question: Question) -> Result<Answer, Interrupt> {
        let timeout = self.timeout;
        self.ask_with_timeout(question, timeout)
    }

    pub fn ask_with_timeout(
        &mut self,
        question: Question,
        timeout: Duration,
    ) -> Result<Answer, Interrupt> {
        let mut answers = self.ask_race(vec![question], timeout)?;
        match answers.pop() {
            Some(answer) => Ok(answer),
            None => unreachable!("one answer per question"),
        }
    }

    /// Sends every question first, then collects the replies under one deadline.
    pub fn ask_race(
        &mut self,
        questions: Vec<Question>,
        timeout: Duration,
    ) -> Result<Vec<Answer>, Interrupt> {
        let mut answers: Vec<Option<Answer>> = vec![None; questions.len()];
        let mut waiting = Vec::new();

        for (index, question) in questions.iter().enumerate() {
            let player = question.player();
            let Some(mailbox) = self.mailboxes.get_mut(player.index()) else {
                error!("no mailbox for {player}");
                panic!("no mailbox for player");
            };
            if mailbox.connection != Connection::Online {
                answers[index] = Some(mailbox.bot_answer(question));
                continue;
            }

            mailbox.drain();
            let serial = self.next_serial;
            self.next_serial = self.next_serial.wrapping_add(1).max(1);
            let sent = match &mailbox.channels {
                Some((send, _)) => send
                    .try_send(ClientReceive::Question {
                        serial,
                        question: question.clone(),
                    })
                    .is_ok(),
                None => false,
            };
            if !sent {
                warn!("{player} disconnected before the question was sent");
                self.set_connection(player, Connection::Offline);
                return Err(Interrupt::TurnBroken);
            }
            debug!("ASKED = {player} - serial {serial} - {question:?}");
            waiting.push((index, serial));
        }

        if !waiting.is_empty() {
            let deadline = Instant::now() + timeout;
            for (index, serial) in waiting {
                let question = &questions[index];
                let player = question.player();
                let answer = match self.wait_reply(player, serial, deadline) {
                    Reply::Answer(answer) if question.accepts(&answer) => answer,
                    Reply::Answer(answer) => {
                        warn!("invalid answer from {player}: {answer:?}");
                        self.mailboxes[player.index()].bot_answer(question)
                    }
                    Reply::Timeout => {
                        warn!("{player} did not answer in time");
                        self.mailboxes[player.index()].bot_answer(question)
                    }
                    Reply::Disconnected => {
                        warn!("{player} disconnected while being asked");
                        self.set_connection(player, Connection::Offline);
                        return Err(Interrupt::TurnBroken);
                    }
                    Reply::ForceEndTurn => {
                        info!("{player} forced the end of the turn");
                        return Err(Interrupt::TurnBroken);
                    }
                };
                answers[index] = Some(answer);
            }
        }

        Ok(answers
            .into_iter()
            .zip(&questions)
            .map(|(answer, question)| answer.unwrap_or_else(|| passive_answer(question)))
            .collect_vec())
    }

    fn wait_reply(&mut self, player: PlayerId, serial: u32, deadline: Instant) -> Reply {
        let Some((_, receive)) = self.mailboxes[player.index()].channels.clone() else {
            return Reply::Disconnected;
        };
        let Some(runtime) = self.runtime() else {
            return Reply::Timeout;
        };
        runtime.block_on(async move {
            loop {
                match timeout_at(deadline, receive.recv()).await {
                    Err(_) => return Reply::Timeout,
                    Ok(Err(_)) => return Reply::Disconnected,
                    Ok(Ok(ClientSend::ForceEndTurn)) => return Reply::ForceEndTurn,
                    Ok(Ok(ClientSend::Answer { serial: s, answer })) if s == serial => {
                        return Reply::Answer(answer)
                    }
                    Ok(Ok(ClientSend::Answer { serial: s, .. })) => {
                        warn!("stale answer from {player} - serial {s}, expected {serial}");
                    }
                }
            }
        })
    }

    fn runtime(&mut self) -> Option<&Runtime> {
        if self.runtime.is_none() {
            match Builder::new_current_thread().enable_time().build() {
                Ok(runtime) => self.runtime = Some(runtime),
                Err(e) => {
                    error!("cannot build the mailbox runtime: {e}");
                    return None;
                }
            }
        }
        self.runtime.as_ref()
    }
}

impl Game {
    pub fn ask(&mut self, question: Question) -> Result<Answer, Interrupt> {
        self.mailbox.ask(question)
    }

    /// Asks `player` to pick one of `choices`, a single choice is taken without asking.
    pub fn ask_for_choice(
        &mut self,
        player: PlayerId,
        reason: &str,
        choices: &[&str],
    ) -> Result<String, Interrupt> {
        let choice = match choices {
            [] => String::new(),
            [only] => only.to_string(),
            _ => {
                let question = Question::Choice {
                    player,
                    reason: reason.into(),
                    choices: choices.iter().map(|c| c.to_string()).collect(),
                };
                match self.ask(question)? {
                    Answer::Choice(choice) => choice,
                    _ => unreachable!("the mailbox only returns accepted answers"),
                }
            }
        };
        info!("{player} chose {choice} for {reason}");
        self.choice_made(ChoiceRecord::Choice {
            player,
            reason: reason.into(),
            choice: choice.clone(),
        })?;
        Ok(choice)
    }

    pub fn ask_for_invoke(&mut self, player: PlayerId, skill: &str) -> Result<bool, Interrupt> {
        let question = Question::Invoke {
            player,
            skill: skill.into(),
        };
        let accepted = matches!(self.ask(question)?, Answer::YesNo(true));
        self.choice_made(ChoiceRecord::Invoke {
            player,
            skill: skill.into(),
            accepted,
        })?;
        if accepted {
            self.notify(Notice::SkillInvoked {
                player,
                skill: skill.into(),
            });
        }
        Ok(accepted)
    }

    pub fn choice_made(&mut self, record: ChoiceRecord) -> Result<(), Interrupt> {
        let player = record.player();
        self.trigger(
            TriggerEvent::ChoiceMade,
            Some(player),
            &mut EventData::Choice(record),
        )?;
        Ok(())
    }
}
