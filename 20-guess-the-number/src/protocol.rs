//! Messages exchanged by the chooser and the solver, their JSON wire shapes,
//! and the request/reply [`Channel`] that carries them.
//!
//! Each message is a single JSON object on its own line:
//!
//! | message             | wire shape                                           |
//! |---------------------|------------------------------------------------------|
//! | range announcement  | `{"range": "1-100"}`                                 |
//! | guess               | `{"answer": 50}`                                     |
//! | hint                | `{"hint": "more"}` / `"less"` / `"correct"`          |
//! | result              | `{"result": "win", "attempts": 7, "number": 42}`     |
//! | protocol error      | `{"error": "invalid range"}`                         |

use std::fmt;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
};
use tracing::{debug, warn};

use crate::{error::GameError, range::Range};

/// How the secret compares to the last guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HintKind {
    /// The secret is greater than the guess.
    More,
    /// The secret is smaller than the guess.
    Less,
    Correct,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "WireMessage", from = "WireMessage")]
pub enum Message {
    RangeAnnouncement(Range),
    Guess { value: i64 },
    Hint(HintKind),
    Result { attempts: u32, value: i64 },
    ProtocolError { message: String },
}

impl Message {
    pub fn protocol_error(message: impl Into<String>) -> Self {
        Self::ProtocolError {
            message: message.into(),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RangeAnnouncement(range) => write!(f, "range announcement {range}"),
            Self::Guess { value } => write!(f, "guess {value}"),
            Self::Hint(hint) => write!(f, "hint {hint:?}"),
            Self::Result { attempts, value } => {
                write!(f, "result {value} after {attempts} attempts")
            }
            Self::ProtocolError { message } => write!(f, "protocol error '{message}'"),
        }
    }
}

// Wire shapes. Every shape rejects unknown keys so that an object can only
// ever decode as one message.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Outcome {
    Win,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RangeShape {
    range: Range,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct GuessShape {
    answer: i64,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct HintShape {
    hint: HintKind,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ResultShape {
    result: Outcome,
    attempts: u32,
    number: i64,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ErrorShape {
    error: String,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum WireMessage {
    Range(RangeShape),
    Guess(GuessShape),
    Hint(HintShape),
    Result(ResultShape),
    Error(ErrorShape),
}

impl From<Message> for WireMessage {
    fn from(message: Message) -> Self {
        match message {
            Message::RangeAnnouncement(range) => Self::Range(RangeShape { range }),
            Message::Guess { value } => Self::Guess(GuessShape { answer: value }),
            Message::Hint(hint) => Self::Hint(HintShape { hint }),
            Message::Result { attempts, value } => Self::Result(ResultShape {
                result: Outcome::Win,
                attempts,
                number: value,
            }),
            Message::ProtocolError { message } => Self::Error(ErrorShape { error: message }),
        }
    }
}

impl From<WireMessage> for Message {
    fn from(wire: WireMessage) -> Self {
        match wire {
            WireMessage::Range(RangeShape { range }) => Self::RangeAnnouncement(range),
            WireMessage::Guess(GuessShape { answer }) => Self::Guess { value: answer },
            WireMessage::Hint(HintShape { hint }) => Self::Hint(hint),
            WireMessage::Result(ResultShape {
                attempts, number, ..
            }) => Self::Result {
                attempts,
                value: number,
            },
            WireMessage::Error(ErrorShape { error }) => Self::ProtocolError { message: error },
        }
    }
}

pub fn encode(message: &Message) -> Result<String, GameError> {
    Ok(serde_json::to_string(message)?)
}

pub fn decode(payload: &str) -> Result<Message, GameError> {
    Ok(serde_json::from_str(payload)?)
}

/// Longest line accepted from a peer, newline included.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Reads the next non-blank line and decodes it.
///
/// Returns `Ok(None)` once the peer has closed its side of the stream.
pub async fn read_message<R, T>(reader: &mut R) -> Result<Option<T>, GameError>
where
    R: AsyncBufRead + Unpin,
    T: DeserializeOwned,
{
    let mut line = Vec::new();
    loop {
        line.clear();
        let bytes = (&mut *reader)
            .take(MAX_LINE_BYTES as u64)
            .read_until(b'\n', &mut line)
            .await?;
        if bytes == 0 {
            return Ok(None);
        }
        if bytes == MAX_LINE_BYTES && line.last() != Some(&b'\n') {
            return Err(GameError::LineTooLong {
                limit: MAX_LINE_BYTES,
            });
        }

        let trimmed = line.trim_ascii();
        if trimmed.is_empty() {
            continue;
        }

        // Decoding from bytes reports invalid UTF-8 as a malformed payload too.
        let parsed = serde_json::from_slice(trimmed)?;
        return Ok(Some(parsed));
    }
}

pub async fn write_message<W, T>(writer: &mut W, message: &T) -> Result<(), GameError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut encoded = serde_json::to_vec(message)?;
    encoded.push(b'\n');
    writer.write_all(&encoded).await?;
    writer.flush().await?;
    Ok(())
}

/// One side of the request/reply connection between chooser and solver.
///
/// The channel is owned by its role for the length of a session. Callers keep
/// to one outstanding request at a time: every [`send`](Self::send) is paired
/// with the peer's reply before the next message goes out.
pub struct Channel<R, W> {
    reader: R,
    writer: W,
}

pub type TcpChannel = Channel<BufReader<OwnedReadHalf>, OwnedWriteHalf>;

impl TcpChannel {
    pub fn from_stream(stream: TcpStream) -> Self {
        let (reader, writer) = stream.into_split();
        Self::new(BufReader::new(reader), writer)
    }
}

impl<R, W> Channel<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    pub async fn send(&mut self, message: &Message) -> Result<(), GameError> {
        debug!(%message, "sending");
        write_message(&mut self.writer, message).await
    }

    pub async fn recv(&mut self) -> Result<Option<Message>, GameError> {
        let message = read_message::<_, Message>(&mut self.reader).await?;
        if let Some(message) = &message {
            debug!(%message, "received");
        }
        Ok(message)
    }

    /// Like [`recv`](Self::recv), but a closed stream is an error.
    pub async fn expect(&mut self) -> Result<Message, GameError> {
        self.recv().await?.ok_or(GameError::ConnectionClosed)
    }

    /// Sends `request` and waits for the paired reply.
    pub async fn exchange(&mut self, request: &Message) -> Result<Message, GameError> {
        self.send(request).await?;
        self.expect().await
    }

    /// Tells the peer why the session is ending, then hands the error back.
    ///
    /// Only protocol violations are reported; transport failures and errors
    /// the peer itself announced are returned untouched.
    pub async fn reject(&mut self, error: GameError) -> GameError {
        if error.is_protocol_violation() {
            let notice = Message::protocol_error(error.to_string());
            if let Err(send_error) = self.send(&notice).await {
                warn!(error = %send_error, "failed to notify peer about protocol error");
            }
        }
        error
    }

    pub async fn shutdown(&mut self) {
        if let Err(error) = self.writer.shutdown().await {
            debug!(?error, "failed to shut down channel writer cleanly");
        }
    }
}
