use std::{env, fs};

use get_size::GetSize;
use sgs_engine::client::{Client, DefaultNoticeHandler};
use sgs_engine::config::RoomConfig;
use sgs_engine::gameplay::Game;
use sgs_engine::mailbox::{Mailbox, Synchronizer};
use sgs_engine::prompters::{CliPrompter, DefaultPrompter, RandomPrompter};
use time::macros::format_description;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt::time::LocalTime, EnvFilter};

const DEFAULT_CONFIG: &str = "room.toml";

fn load_config(path: &str) -> Option<RoomConfig> {
    match fs::read_to_string(path) {
        Ok(text) => match RoomConfig::from_toml(&text) {
            Ok(config) => Some(config),
            Err(e) => {
                error!("{path}: {e}");
                None
            }
        },
        Err(e) => {
            warn!("cannot read {path}, using the default room: {e}");
            Some(RoomConfig::default())
        }
    }
}

#[tokio::main]
async fn main() {
    env::set_var("RUST_BACKTRACE", "1");
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "DEBUG");
    }

    // setup logs
    let file_appender = tracing_appender::rolling::daily("logs", "sgs-server.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_timer(LocalTime::new(format_description!(
            "[year]-[month]-[day] [hour repr:24]:[minute]:[second].[subsecond digits:4]"
        )))
        .with_writer(non_blocking)
        .with_ansi(false)
        // enable thread id to be emitted
        .with_thread_ids(true)
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    info!("\n\n\n\n\n\n\n-- sgs room server is running --");

    // sgs-server [--cli] [room.toml]
    let mut args = env::args().skip(1).collect::<Vec<_>>();
    let interactive = args.iter().any(|a| a == "--cli");
    args.retain(|a| a != "--cli");
    let path = args.pop().unwrap_or_else(|| DEFAULT_CONFIG.into());
    let Some(config) = load_config(&path) else {
        return;
    };
    info!("room config: {config:?}");

    // every seat is a client on the other end of the channels, the first one
    // is played from the terminal with --cli
    // unbounded, questions go out with try_send
    let mut mailboxes = Vec::with_capacity(config.players);
    for seat in 0..config.players {
        let to_client = async_channel::unbounded();
        let to_room = async_channel::unbounded();
        mailboxes.push(Mailbox::online(
            (to_client.0, to_room.1),
            DefaultPrompter::new(),
        ));

        let channels = (to_room.0, to_client.1);
        if interactive && seat == 0 {
            let client = Client::new(channels, DefaultNoticeHandler::new(), CliPrompter::new());
            // the terminal blocks
            tokio::task::spawn_blocking(move || {
                tokio::runtime::Handle::current().block_on(client.receive_requests())
            });
        } else {
            let client = Client::new(channels, DefaultNoticeHandler::new(), RandomPrompter::new());
            tokio::spawn(client.receive_requests());
        }
    }
    let mailbox = Synchronizer::new(mailboxes, config.reply_timeout());

    // the engine blocks on the mailbox, keep it off the async workers
    let room = tokio::task::spawn_blocking(move || {
        let mut game = Game::setup(config, mailbox);
        let outcome = game.run();
        info!("state size: {}", game.state.get_heap_size());
        outcome
    });

    match room.await {
        Ok(outcome) => {
            info!("game over: {outcome:?}");
            println!("{:?} - {:?}", outcome.winner, outcome.winning_players);
        }
        Err(e) => error!("room crashed: {e}"),
    }
}
