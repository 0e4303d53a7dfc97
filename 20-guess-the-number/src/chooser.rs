//! The chooser role: keeps the secret, announces the range and answers each
//! guess with a hint.
//!
//! [`Chooser`] is a plain state value driven by [`Chooser::announce`] and
//! [`Chooser::on_guess`]; [`play`] runs it over a [`Channel`], and [`Host`]
//! accepts the single solver connection a session needs.

use std::{cmp::Ordering, net::SocketAddr, time::Duration};

use anyhow::{Context, Result};
use rand::{Rng, SeedableRng, rngs::StdRng};
use tokio::{
    io::{AsyncBufRead, AsyncWrite},
    net::TcpListener,
    time::timeout,
};
use tracing::{debug, info, warn};

use crate::{
    cli::ChooserArgs,
    console,
    error::GameError,
    protocol::{Channel, HintKind, Message, TcpChannel},
    range::Range,
    solver::Solution,
};

/// How long the chooser waits for the solver's report once the game is won.
pub const REPORT_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChooserState {
    /// Created, range not yet announced.
    Announcing,
    AwaitingGuess,
    /// A guess was correct; no further guesses are taken.
    Terminated,
}

#[derive(Debug)]
pub struct Chooser {
    range: Range,
    secret: i64,
    guesses: u32,
    state: ChooserState,
}

impl Chooser {
    /// Creates a chooser with a known secret.
    pub fn new(range: Range, secret: i64) -> Result<Self, GameError> {
        let range = Range::announced(range.min, range.max)?;
        if !range.contains(secret) {
            return Err(GameError::SecretOutOfRange {
                secret,
                min: range.min,
                max: range.max,
            });
        }

        Ok(Self {
            range,
            secret,
            guesses: 0,
            state: ChooserState::Announcing,
        })
    }

    /// Picks the secret uniformly from `[min, max]` using `rng`.
    pub fn with_rng<R>(range: Range, rng: &mut R) -> Result<Self, GameError>
    where
        R: Rng,
    {
        let range = Range::announced(range.min, range.max)?;
        let secret = rng.gen_range(range.min..=range.max);
        Self::new(range, secret)
    }

    pub fn random(range: Range) -> Result<Self, GameError> {
        Self::with_rng(range, &mut rand::thread_rng())
    }

    pub fn range(&self) -> Range {
        self.range
    }

    pub fn secret(&self) -> i64 {
        self.secret
    }

    /// Number of guesses evaluated so far.
    pub fn guesses(&self) -> u32 {
        self.guesses
    }

    pub fn state(&self) -> ChooserState {
        self.state
    }

    pub fn announce(&mut self) -> Result<Message, GameError> {
        if self.state != ChooserState::Announcing {
            return Err(GameError::unexpected(
                "a single range announcement",
                "a second announcement",
            ));
        }
        self.state = ChooserState::AwaitingGuess;
        Ok(Message::RangeAnnouncement(self.range))
    }

    pub fn on_guess(&mut self, guess: i64) -> Result<HintKind, GameError> {
        if self.state != ChooserState::AwaitingGuess {
            let expected = match self.state {
                ChooserState::Announcing => "range announcement before guesses",
                _ => "no guesses after a correct one",
            };
            return Err(GameError::unexpected(expected, format!("guess {guess}")));
        }

        self.guesses += 1;
        let hint = evaluate(self.secret, guess);
        if hint == HintKind::Correct {
            self.state = ChooserState::Terminated;
        }
        Ok(hint)
    }
}

/// Compares `guess` with `secret`.
pub fn evaluate(secret: i64, guess: i64) -> HintKind {
    match secret.cmp(&guess) {
        Ordering::Greater => HintKind::More,
        Ordering::Less => HintKind::Less,
        Ordering::Equal => HintKind::Correct,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChooserSummary {
    pub secret: i64,
    pub guesses: u32,
    /// The solver's closing report, if it sent one.
    pub report: Option<Solution>,
}

/// Plays one session as the chooser.
pub async fn play<R, W>(
    channel: &mut Channel<R, W>,
    mut chooser: Chooser,
) -> Result<ChooserSummary, GameError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let announcement = chooser.announce()?;
    info!(range = %chooser.range(), "announcing range");
    let mut reply = channel.exchange(&announcement).await;

    loop {
        let guess = match reply {
            Ok(Message::Guess { value }) => value,
            Ok(Message::ProtocolError { message }) => return Err(GameError::Peer(message)),
            Ok(other) => return Err(channel.reject(GameError::unexpected("guess", other)).await),
            Err(error) => return Err(channel.reject(error).await),
        };

        let hint = chooser.on_guess(guess)?;
        info!(attempt = chooser.guesses(), guess, ?hint, "answered guess");
        if hint == HintKind::Correct {
            channel.send(&Message::Hint(hint)).await?;
            break;
        }
        reply = channel.exchange(&Message::Hint(hint)).await;
    }

    let report = read_report(channel, &chooser).await;
    Ok(ChooserSummary {
        secret: chooser.secret(),
        guesses: chooser.guesses(),
        report,
    })
}

async fn read_report<R, W>(channel: &mut Channel<R, W>, chooser: &Chooser) -> Option<Solution>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    // The game is over; a solver that stays connected without reporting must
    // not keep the chooser alive.
    let Ok(received) = timeout(REPORT_GRACE, channel.recv()).await else {
        debug!("solver sent no report after the winning guess");
        return None;
    };

    match received {
        Ok(Some(Message::Result { attempts, value })) => {
            if attempts != chooser.guesses() || value != chooser.secret() {
                warn!(
                    attempts,
                    number = value,
                    expected_attempts = chooser.guesses(),
                    "solver report disagrees with the game"
                );
            }
            info!(attempts, number = value, "solver reported a win");
            Some(Solution {
                attempts,
                number: value,
            })
        }
        Ok(Some(other)) => {
            warn!(%other, "ignoring message after the game finished");
            None
        }
        Ok(None) => {
            debug!("solver closed the connection without a report");
            None
        }
        Err(error) => {
            warn!(%error, "failed to read the solver's report");
            None
        }
    }
}

/// Listens for the one solver a session is played with.
pub struct Host {
    listener: TcpListener,
    chooser: Chooser,
}

impl Host {
    pub fn new(listener: TcpListener, chooser: Chooser) -> Self {
        Self { listener, chooser }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts a single connection and plays the session on it. The listener
    /// is closed once the solver is connected.
    pub async fn run(self) -> Result<ChooserSummary, GameError> {
        let Host { listener, chooser } = self;
        let (stream, peer) = listener.accept().await?;
        drop(listener);
        info!(%peer, "solver connected");

        let mut channel = TcpChannel::from_stream(stream);
        let outcome = play(&mut channel, chooser).await;
        channel.shutdown().await;
        outcome
    }
}

pub async fn run(args: ChooserArgs) -> Result<()> {
    let range = Range::announced(args.min, args.max)?;
    let chooser = match (args.secret, args.seed) {
        (Some(secret), _) => Chooser::new(range, secret)?,
        (None, Some(seed)) => Chooser::with_rng(range, &mut StdRng::seed_from_u64(seed))?,
        (None, None) => Chooser::random(range)?,
    };
    info!("picked a number in {}", range);
    debug!(secret = chooser.secret(), "secret number");

    let listener = TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("failed to bind {}", args.listen))?;
    let host = Host::new(listener, chooser);
    info!("chooser listening on {}", host.local_addr()?);

    let summary = host.run().await?;
    console::write_stdout(&format!(
        "*** solver found {} in {} attempts",
        summary.secret, summary.guesses
    ))
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use tokio::io::BufReader;

    use super::*;

    #[test]
    fn evaluate_points_toward_the_secret() {
        assert_eq!(evaluate(42, 50), HintKind::Less);
        assert_eq!(evaluate(42, 25), HintKind::More);
        assert_eq!(evaluate(42, 42), HintKind::Correct);
        assert_eq!(evaluate(-5, -6), HintKind::More);
        assert_eq!(evaluate(i64::MIN, i64::MAX), HintKind::Less);
    }

    #[test]
    fn rejects_degenerate_range_before_announcing() {
        let err = Chooser::new(Range::new(5, 5), 5).unwrap_err();
        assert!(matches!(err, GameError::InvalidRange { min: 5, max: 5 }));

        let err = Chooser::random(Range::new(5, 5)).unwrap_err();
        assert!(matches!(err, GameError::InvalidRange { .. }));
    }

    #[test]
    fn rejects_secret_outside_range() {
        let err = Chooser::new(Range::new(1, 10), 11).unwrap_err();
        assert!(matches!(err, GameError::SecretOutOfRange { secret: 11, .. }));
    }

    #[test]
    fn seeded_secret_is_reproducible_and_in_range() {
        let range = Range::new(-20, 20);
        for seed in 0..32 {
            let first = Chooser::with_rng(range, &mut StdRng::seed_from_u64(seed)).unwrap();
            let second = Chooser::with_rng(range, &mut StdRng::seed_from_u64(seed)).unwrap();
            assert_eq!(first.secret(), second.secret());
            assert!(range.contains(first.secret()));
        }
    }

    #[test]
    fn terminates_after_correct_guess() {
        let mut chooser = Chooser::new(Range::new(1, 2), 1).unwrap();
        assert_eq!(
            chooser.announce().unwrap(),
            Message::RangeAnnouncement(Range::new(1, 2))
        );
        assert_eq!(chooser.state(), ChooserState::AwaitingGuess);

        assert_eq!(chooser.on_guess(1).unwrap(), HintKind::Correct);
        assert_eq!(chooser.state(), ChooserState::Terminated);
        assert_eq!(chooser.guesses(), 1);

        let err = chooser.on_guess(2).unwrap_err();
        assert!(matches!(err, GameError::UnexpectedMessage { .. }));
    }

    #[test]
    fn guesses_require_an_announcement() {
        let mut chooser = Chooser::new(Range::new(1, 2), 1).unwrap();
        assert!(chooser.on_guess(1).is_err());
        chooser.announce().unwrap();
        assert!(chooser.announce().is_err());
    }

    #[tokio::test]
    async fn play_answers_scripted_guesses_and_reads_report() {
        let (left, right) = tokio::io::duplex(1024);
        let (reader, writer) = tokio::io::split(left);
        let mut channel = Channel::new(BufReader::new(reader), writer);
        let (peer_reader, peer_writer) = tokio::io::split(right);
        let mut peer = Channel::new(BufReader::new(peer_reader), peer_writer);

        let solver = tokio::spawn(async move {
            let announcement = peer.expect().await.expect("announcement");
            assert_eq!(announcement, Message::RangeAnnouncement(Range::new(1, 10)));

            let mut hints = Vec::new();
            for value in [5, 8, 7] {
                let reply = peer
                    .exchange(&Message::Guess { value })
                    .await
                    .expect("hint");
                hints.push(reply);
            }
            peer.send(&Message::Result {
                attempts: 3,
                value: 7,
            })
            .await
            .expect("report");
            hints
        });

        let chooser = Chooser::new(Range::new(1, 10), 7).unwrap();
        let summary = play(&mut channel, chooser).await.expect("session");

        assert_eq!(
            solver.await.expect("solver task"),
            vec![
                Message::Hint(HintKind::More),
                Message::Hint(HintKind::Less),
                Message::Hint(HintKind::Correct),
            ]
        );
        assert_eq!(
            summary,
            ChooserSummary {
                secret: 7,
                guesses: 3,
                report: Some(Solution {
                    attempts: 3,
                    number: 7
                }),
            }
        );
    }

    #[tokio::test]
    async fn play_reports_unexpected_messages_to_the_solver() {
        let (left, right) = tokio::io::duplex(1024);
        let (reader, writer) = tokio::io::split(left);
        let mut channel = Channel::new(BufReader::new(reader), writer);
        let (peer_reader, peer_writer) = tokio::io::split(right);
        let mut peer = Channel::new(BufReader::new(peer_reader), peer_writer);

        let solver = tokio::spawn(async move {
            peer.expect().await.expect("announcement");
            peer.exchange(&Message::Hint(HintKind::More))
                .await
                .expect("error reply")
        });

        let chooser = Chooser::new(Range::new(1, 10), 7).unwrap();
        let err = play(&mut channel, chooser).await.unwrap_err();

        assert!(matches!(err, GameError::UnexpectedMessage { .. }));
        assert!(matches!(
            solver.await.expect("solver task"),
            Message::ProtocolError { .. }
        ));
    }

    #[tokio::test]
    async fn play_stops_when_the_solver_gives_up() {
        let (left, right) = tokio::io::duplex(1024);
        let (reader, writer) = tokio::io::split(left);
        let mut channel = Channel::new(BufReader::new(reader), writer);
        let (peer_reader, peer_writer) = tokio::io::split(right);
        let mut peer = Channel::new(BufReader::new(peer_reader), peer_writer);

        tokio::spawn(async move {
            peer.expect().await.expect("announcement");
            peer.send(&Message::protocol_error("invalid range"))
                .await
                .expect("send error");
        });

        let chooser = Chooser::new(Range::new(1, 10), 7).unwrap();
        let err = play(&mut channel, chooser).await.unwrap_err();
        assert!(matches!(err, GameError::Peer(message) if message == "invalid range"));
    }
}
