//! Interactive terminal chat.
//!
//! Hosts the delivery client: optimistic rendering, per-message retry, a
//! dismissible banner for session-level failures, and slash commands.
//! Entry point: `loop_runner::run_chat_loop`.

pub mod banner;
pub mod commands;
pub mod input;
pub mod loop_runner;
