//! Two-party number guessing game over a TCP request/reply connection.
//!
//! The chooser picks a secret inside an announced range and answers every
//! guess with a hint; the solver binary-searches the range until it hits the
//! secret. Exactly one game is played per connection. Modules:
//!
//! - [`range`] is the inclusive interval and its `"<min>-<max>"` wire text.
//! - [`protocol`] defines the five messages, their JSON line encoding, and
//!   the [`protocol::Channel`] that pairs each request with its reply.
//! - [`chooser`] and [`solver`] hold the two role state machines plus the
//!   drivers that play them over a channel.
//! - [`error`] is the session error taxonomy.
//! - [`cli`] parses the command line for both roles.
//! - [`console`] writes the user-facing result line to stdout, apart from logs.

pub mod chooser;
pub mod cli;
pub mod console;
pub mod error;
pub mod protocol;
pub mod range;
pub mod solver;
