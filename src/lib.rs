//! Patrick Push Protocol - deliberately low-effort problem solving.
//!
//! This library asks a text-generation API for the dumbest solution it can
//! think of, shows it to a human and keeps trying different dumb solutions
//! until one is accepted or the attempt budget runs out. It supports:
//!
//! - **Interactive push** with per-attempt confirmation
//! - **Rate-limit backoff** (`2^i` seconds after attempt `i`)
//! - **Quick mode** for a single non-interactive shot
//! - **Compare mode** timing a normal answer against Patrick's answer
//! - **Session logs** with aggregate statistics
//!
//! # Architecture
//!
//! - [`config`] - Configuration management (API key, attempt budget, log dir)
//! - [`http_client`] - HTTP client abstraction
//! - [`transport`] - One classified exchange with the Messages API
//! - [`persona`] - Prompts and flavor text
//! - [`orchestrator`] - The attempt loop and its event protocol
//! - [`session_log`] - Persisted session records and statistics
//! - [`ui`] - Terminal rendering and the y/n confirmation
//! - [`command_router`] - Wires the subcommands together
//! - [`providers`] - Clock and timer injection traits
//! - [`error`] - Typed errors
//!
//! # Example
//!
//! ```ignore
//! use patrick_push::orchestrator::Patrick;
//! use patrick_push::transport::AnthropicTransport;
//!
//! #[tokio::main]
//! async fn main() {
//!     let patrick = Patrick::new(AnthropicTransport::new("sk-ant-..."))
//!         .max_attempts(3);
//!
//!     // No handler: the first successful answer is accepted.
//!     let outcome = patrick.push("my query is slow", None).await;
//!     println!("{:?}", outcome.solution);
//! }
//! ```

pub mod command_router;
pub mod config;
pub mod error;
pub mod http_client;
pub mod orchestrator;
pub mod persona;
pub mod providers;
pub mod session_log;
pub mod transport;
pub mod ui;
