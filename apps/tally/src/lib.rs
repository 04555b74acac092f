//! # Tally
//!
//! Front ends and history service for the `tally-core` calculator engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      apps/tally (THE BINARY)                   │
//! │                                                                │
//! │  ┌─────────────┐   ┌─────────────┐   ┌──────────────────────┐  │
//! │  │  CLI / REPL │   │  HTTP API   │   │  Sinks + HTTP client │  │
//! │  │   (clap)    │   │   (axum)    │   │  (tokio, reqwest)    │  │
//! │  └──────┬──────┘   └──────┬──────┘   └──────────┬───────────┘  │
//! │         │                 │                     │              │
//! │         └─────────────────┼─────────────────────┘              │
//! │                           ▼                                    │
//! │                   ┌───────────────┐                            │
//! │                   │  tally-core   │                            │
//! │                   │ (THE LOGIC)   │                            │
//! │                   └───────────────┘                            │
//! └────────────────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod cli;
pub mod client;
pub mod config;
pub mod sink;
