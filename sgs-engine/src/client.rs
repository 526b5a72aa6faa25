use async_channel::{Receiver, Sender};
use tracing::{debug, warn};

use crate::events::{Answer, ClientReceive, ClientSend, Notice, Question};
use crate::gameplay::GameOutcome;

/// Seat-side end of the room channels, answering questions with a decision provider.
pub struct Client<E, I> {
    pub game_outcome: Option<GameOutcome>,
    pub send: Sender<ClientSend>,
    pub receive: Receiver<ClientReceive>,
    pub notice_handler: E,
    pub decision_provider: I,
}
impl<E, I> Client<E, I>
where
    E: NoticeHandler,
    I: DecisionProvider,
{
    pub fn new(
        channels: (Sender<ClientSend>, Receiver<ClientReceive>),
        notice_handler: E,
        decision_provider: I,
    ) -> Self {
        Client {
            game_outcome: None,
            send: channels.0,
            receive: channels.1,
            notice_handler,
            decision_provider,
        }
    }

    /// Handles one message, `Err` once the room is gone or the game is over.
    pub async fn handle_request(&mut self) -> Result<(), Option<GameOutcome>> {
        let req = self
            .receive
            .recv()
            .await
            .map_err(|_| self.game_outcome.clone())?;
        match req {
            ClientReceive::Notice(notice) => {
                debug!("RECEIVED NOTICE = {:?}", notice);
                if let Notice::GameOver(outcome) = &notice {
                    self.game_outcome = Some(outcome.clone());
                }
                self.notice_handler.handle_notice(&notice);
                if let Some(outcome) = &self.game_outcome {
                    return Err(Some(outcome.clone()));
                }
            }
            ClientReceive::Question { serial, question } => {
                debug!("RECEIVED QUESTION = {:?}", question);
                let answer = self.decision_provider.decide(&question);
                debug!("SENT ANSWER = {:?}", answer);
                if self
                    .send
                    .send(ClientSend::Answer { serial, answer })
                    .await
                    .is_err()
                {
                    warn!("room closed before the answer was sent");
                    return Err(self.game_outcome.clone());
                }
            }
        }

        Ok(())
    }

    pub async fn receive_requests(mut self) -> Option<GameOutcome> {
        // loop until the end of the game
        while self.handle_request().await.is_ok() {}

        debug!("GAME OUTCOME = {:?}", self.game_outcome);
        self.game_outcome
    }
}

pub trait NoticeHandler {
    fn handle_notice(&mut self, notice: &Notice);
}

/// Answers a question synchronously, used by bots and by disconnected seats.
pub trait DecisionProvider {
    fn decide(&mut self, question: &Question) -> Answer;
}

#[derive(Default)]
pub struct DefaultNoticeHandler {}
impl DefaultNoticeHandler {
    pub fn new() -> Self {
        Self {}
    }
}
impl NoticeHandler for DefaultNoticeHandler {
    fn handle_notice(&mut self, _notice: &Notice) {
        // do nothing
    }
}
