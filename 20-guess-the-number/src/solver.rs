//! The solver role: binary-searches the announced range using the chooser's
//! hints.
//!
//! [`Solver`] holds the working range and is advanced by
//! [`Solver::on_range_announcement`] and [`Solver::on_hint`]. Each guess is
//! `floor((min + max) / 2)` of the current working range, so with an even
//! number of candidates the guess leans toward `min`.

use std::{net::SocketAddr, time::Duration};

use anyhow::{Context, Result};
use tokio::{
    io::{AsyncBufRead, AsyncWrite},
    net::TcpStream,
};
use tracing::{debug, info, warn};

use crate::{
    cli::SolverArgs,
    console,
    error::GameError,
    protocol::{Channel, HintKind, Message, TcpChannel},
    range::{Range, midpoint},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverState {
    AwaitingFirstGuess,
    AwaitingHint,
    /// The last guess was correct.
    Terminated,
    /// The hints emptied the working range.
    Failed,
}

/// The solver's closing report: how many hints it took and the number found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Solution {
    pub attempts: u32,
    pub number: i64,
}

impl From<Solution> for Message {
    fn from(solution: Solution) -> Self {
        Message::Result {
            attempts: solution.attempts,
            value: solution.number,
        }
    }
}

/// What the solver does after consuming a hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Guess(i64),
    Solved(Solution),
}

#[derive(Debug)]
pub struct Solver {
    min: i64,
    max: i64,
    current_guess: i64,
    attempts: u32,
    state: SolverState,
}

impl Default for Solver {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver {
    pub fn new() -> Self {
        Self {
            min: 0,
            max: 0,
            current_guess: 0,
            attempts: 0,
            state: SolverState::AwaitingFirstGuess,
        }
    }

    pub fn working_range(&self) -> Range {
        Range::new(self.min, self.max)
    }

    pub fn current_guess(&self) -> i64 {
        self.current_guess
    }

    /// Hints received so far, the final `correct` included.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn state(&self) -> SolverState {
        self.state
    }

    /// Starts the search and returns the first guess.
    pub fn on_range_announcement(&mut self, range: Range) -> Result<i64, GameError> {
        if self.state != SolverState::AwaitingFirstGuess {
            return Err(GameError::unexpected(
                "hint",
                format!("range announcement {range}"),
            ));
        }

        self.min = range.min;
        self.max = range.max;
        self.attempts = 0;
        if self.min > self.max {
            return Err(self.fail());
        }

        self.current_guess = range.midpoint();
        self.state = SolverState::AwaitingHint;
        Ok(self.current_guess)
    }

    pub fn on_hint(&mut self, hint: HintKind) -> Result<Step, GameError> {
        if self.state != SolverState::AwaitingHint {
            let expected = match self.state {
                SolverState::AwaitingFirstGuess => "range announcement",
                _ => "no hints after the game ended",
            };
            return Err(GameError::unexpected(expected, format!("hint {hint:?}")));
        }

        self.attempts += 1;
        match hint {
            HintKind::Correct => {
                self.state = SolverState::Terminated;
                return Ok(Step::Solved(Solution {
                    attempts: self.attempts,
                    number: self.current_guess,
                }));
            }
            // A bound that would step past the integer domain cannot contain the secret.
            HintKind::More => match self.current_guess.checked_add(1) {
                Some(min) => self.min = min,
                None => return Err(self.fail()),
            },
            HintKind::Less => match self.current_guess.checked_sub(1) {
                Some(max) => self.max = max,
                None => return Err(self.fail()),
            },
        }

        if self.min > self.max {
            return Err(self.fail());
        }
        if self.min == self.max {
            debug!(guess = self.min, "range collapsed to a single candidate");
        }

        self.current_guess = midpoint(self.min, self.max);
        Ok(Step::Guess(self.current_guess))
    }

    fn fail(&mut self) -> GameError {
        self.state = SolverState::Failed;
        GameError::InconsistentHints {
            min: self.min,
            max: self.max,
        }
    }
}

/// Plays one session as the solver, pausing `delay` after each hint before
/// sending the next guess.
pub async fn play<R, W>(
    channel: &mut Channel<R, W>,
    mut solver: Solver,
    delay: Duration,
) -> Result<Solution, GameError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let range = match channel.expect().await {
        Ok(Message::RangeAnnouncement(range)) => range,
        Ok(Message::ProtocolError { message }) => return Err(GameError::Peer(message)),
        Ok(other) => {
            let error = GameError::unexpected("range announcement", other);
            return Err(channel.reject(error).await);
        }
        Err(error) => return Err(channel.reject(error).await),
    };
    info!(%range, "chooser announced range");

    let mut guess = match solver.on_range_announcement(range) {
        Ok(guess) => guess,
        Err(error) => return Err(channel.reject(error).await),
    };

    loop {
        info!(guess, "guessing");
        let hint = match channel.exchange(&Message::Guess { value: guess }).await {
            Ok(Message::Hint(hint)) => hint,
            Ok(Message::ProtocolError { message }) => return Err(GameError::Peer(message)),
            Ok(other) => return Err(channel.reject(GameError::unexpected("hint", other)).await),
            Err(error) => return Err(channel.reject(error).await),
        };

        match solver.on_hint(hint) {
            Ok(Step::Guess(next)) => {
                info!(
                    attempt = solver.attempts(),
                    guess,
                    ?hint,
                    range = %solver.working_range(),
                    "narrowed range"
                );
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                guess = next;
            }
            Ok(Step::Solved(solution)) => {
                info!(
                    attempts = solution.attempts,
                    number = solution.number,
                    "guessed the number"
                );
                channel.send(&solution.into()).await?;
                return Ok(solution);
            }
            Err(error) => {
                warn!(%error, "hints are contradictory, giving up");
                return Err(channel.reject(error).await);
            }
        }
    }
}

pub async fn connect(server: SocketAddr) -> Result<TcpChannel, GameError> {
    let stream = TcpStream::connect(server).await?;
    info!("connected to {}", server);
    Ok(TcpChannel::from_stream(stream))
}

/// Connects to a chooser and plays a full session against it.
pub async fn solve(server: SocketAddr, delay: Duration) -> Result<Solution, GameError> {
    let mut channel = connect(server).await?;
    let outcome = play(&mut channel, Solver::new(), delay).await;
    channel.shutdown().await;
    outcome
}

pub async fn run(args: SolverArgs) -> Result<()> {
    let solution = solve(args.server, args.delay())
        .await
        .with_context(|| format!("game against {} failed", args.server))?;
    console::write_stdout(&format!(
        "*** found {} in {} attempts",
        solution.number, solution.attempts
    ))
    .await?;
    Ok(())
}
