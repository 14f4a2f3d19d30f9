//! Core of a live Bed Wars lobby stat overlay: tails a Minecraft client's
//! chat log, tracks party/lobby/queue state from it, and runs a
//! multi-threaded, cached, rate-limited stats-fetch pipeline that resolves
//! every lobby member into a sorted player list for display.
//!
//! `overlay-bin` is the console front-end; GUI front-ends are explicitly out
//! of scope for this crate.

pub mod assembler;
pub mod auto_denick;
pub mod error;
pub mod event;
pub mod fetch;
pub mod globals;
pub mod nick_database;
pub mod overlord;
pub mod parser;
pub mod player;
pub mod player_cache;
pub mod rate_limiter;
pub mod redraw;
pub mod settings;
pub mod state;
pub mod tailer;
pub mod worker_pool;

pub const USER_AGENT: &str = concat!("bw-overlay/", env!("CARGO_PKG_VERSION"));
