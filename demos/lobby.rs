//! Lobby - a small game protocol over an in-process stream.
//!
//! This example demonstrates:
//! - Declaring messages with `#[derive(Codec)]` and a protocol with `#[derive(Protocol)]`
//! - Sending length-prefixed messages with the async transport helpers
//! - Dispatching received messages to a handler with one `Handler` impl per type
//!
//! Run with:
//!
//! ```text
//! cargo run --example lobby
//! ```

use std::collections::BTreeMap;

use structwire::protocol::FrameConfig;
use structwire::transport::{process_next, recv_message, send_message};
use structwire::{Codec, Handler, HandlerResult, Protocol, ProtocolHandler, WireError};

/// A player joins.
#[derive(Codec, Debug)]
struct Hello {
    name: String,
}

/// The players currently in the lobby.
#[derive(Codec, Debug)]
struct Lobby {
    users: Vec<String>,
}

/// A player finished a round.
#[derive(Codec, Debug)]
struct EnterResult {
    name: String,
    score: u64,
}

/// Best score per player.
#[derive(Codec, Debug)]
struct ScoreBoard {
    scores: BTreeMap<String, u64>,
}

#[derive(Protocol, Debug)]
enum Game {
    Hello(Hello),
    Lobby(Lobby),
    EnterResult(EnterResult),
    ScoreBoard(ScoreBoard),
}

/// Server side state, fed by incoming messages.
#[derive(Default)]
struct Server {
    users: Vec<String>,
    scores: BTreeMap<String, u64>,
}

impl Handler<Hello> for Server {
    fn handle(&mut self, message: Hello) -> HandlerResult {
        println!("server: {} joined", message.name);
        self.users.push(message.name);
        Ok(())
    }
}

impl Handler<Lobby> for Server {
    fn handle(&mut self, _message: Lobby) -> HandlerResult {
        Err(WireError::Handler("clients do not send lobby updates".into()))
    }
}

impl Handler<EnterResult> for Server {
    fn handle(&mut self, message: EnterResult) -> HandlerResult {
        if !self.users.contains(&message.name) {
            return Err(WireError::Handler(format!("{} never joined", message.name)));
        }
        let best = self.scores.entry(message.name).or_default();
        *best = (*best).max(message.score);
        Ok(())
    }
}

impl Handler<ScoreBoard> for Server {
    fn handle(&mut self, _message: ScoreBoard) -> HandlerResult {
        Err(WireError::Handler("clients do not send score boards".into()))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let protocol = ProtocolHandler::<Game>::new();
    let config = FrameConfig::default().with_max_frame_len(64 * 1024);

    let (mut client_io, mut server_io) = tokio::io::duplex(4096);

    let server_config = config.clone();
    let server = tokio::spawn(async move {
        let mut state = Server::default();
        while process_next::<u32, _, _, _>(&mut server_io, &protocol, &server_config, &mut state).await? {}

        let lobby = Lobby {
            users: state.users.clone(),
        };
        send_message::<u32, _, _, _>(&mut server_io, &protocol, &lobby).await?;
        let board = ScoreBoard {
            scores: state.scores,
        };
        send_message::<u32, _, _, _>(&mut server_io, &protocol, &board).await?;
        Ok::<_, WireError>(())
    });

    for name in ["ann", "bob"] {
        let hello = Hello { name: name.into() };
        send_message::<u32, _, _, _>(&mut client_io, &protocol, &hello).await?;
    }
    for (name, score) in [("ann", 40), ("bob", 75), ("ann", 90)] {
        let result = EnterResult {
            name: name.into(),
            score,
        };
        send_message::<u32, _, _, _>(&mut client_io, &protocol, &result).await?;
    }

    // Half-close so the server sees a clean end of stream.
    tokio::io::AsyncWriteExt::shutdown(&mut client_io).await?;

    while let Some(message) = recv_message::<u32, _, _>(&mut client_io, &protocol, &config).await? {
        match message {
            Game::Lobby(lobby) => println!("client: lobby {:?}", lobby.users),
            Game::ScoreBoard(board) => {
                for (name, score) in &board.scores {
                    println!("client: {name} best {score}");
                }
            }
            other => println!("client: unexpected {}", other.message_name()),
        }
    }

    server.await??;
    Ok(())
}
