use std::fmt;
use tokio::sync::mpsc::UnboundedSender;

/// A block position in the world, used as the origin of an evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const ORIGIN: BlockPos = BlockPos { x: 0, y: 0, z: 0 };

    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

/// Styling of one segment of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Plain,
    /// Error headline, rendered red in chat
    Error,
    /// Quoted source text
    Detail,
    /// Call stack lines
    Trace,
}

/// A styled chat message sent to an actor
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Message {
    pub parts: Vec<(Tone, String)>,
}

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new().push(Tone::Error, text)
    }

    pub fn detail(text: impl Into<String>) -> Self {
        Self::new().push(Tone::Detail, text)
    }

    pub fn trace(text: impl Into<String>) -> Self {
        Self::new().push(Tone::Trace, text)
    }

    pub fn push(mut self, tone: Tone, text: impl Into<String>) -> Self {
        self.parts.push((tone, text.into()));
        self
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (_, text) in &self.parts {
            write!(f, "{}", text)?;
        }
        Ok(())
    }
}

/// The originator of a request: a connected player, the console or the
/// server itself
///
/// Messages are delivered through an unbounded channel owned by whoever
/// serves the actor (a player connection, a console writer). An actor whose
/// channel is gone is unreachable and messages to it are dropped.
#[derive(Debug, Clone)]
pub struct Actor {
    name: String,
    player: bool,
    outbox: Option<UnboundedSender<Message>>,
}

impl Actor {
    /// The server acting on its own behalf, with nowhere to send chat
    pub fn server() -> Self {
        Self {
            name: "Server".to_string(),
            player: false,
            outbox: None,
        }
    }

    pub fn console(outbox: UnboundedSender<Message>) -> Self {
        Self {
            name: "Server".to_string(),
            player: false,
            outbox: Some(outbox),
        }
    }

    pub fn player(name: impl Into<String>, outbox: UnboundedSender<Message>) -> Self {
        Self {
            name: name.into(),
            player: true,
            outbox: Some(outbox),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stable user identity, present only for players
    pub fn user(&self) -> Option<&str> {
        self.player.then_some(self.name.as_str())
    }

    pub fn is_player(&self) -> bool {
        self.player
    }

    /// Whether chat can ever reach this actor. The bare server actor has no
    /// outbox; its reports belong in the process log.
    pub fn has_outbox(&self) -> bool {
        self.outbox.is_some()
    }

    /// Whether a live recipient is still attached
    pub fn is_reachable(&self) -> bool {
        self.outbox.as_ref().is_some_and(|tx| !tx.is_closed())
    }

    /// Send a message, returning false if nobody received it
    pub fn send(&self, message: Message) -> bool {
        match &self.outbox {
            Some(tx) => tx.send(message).is_ok(),
            None => false,
        }
    }
}

impl PartialEq for Actor {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.player == other.player
    }
}
