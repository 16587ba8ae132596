//! Slash command parsing for the chat loop.

use console::style;

/// Available slash commands in the chat loop.
#[derive(Debug, PartialEq)]
pub enum ChatCommand {
    /// Show available commands.
    Help,
    /// Clear the terminal screen.
    Clear,
    /// Leave the chat (the session stays active).
    Exit,
    /// Show the conversation so far, including failed sends.
    History,
    /// Resend the most recent failed message.
    Retry,
    /// Hide the current banner.
    Dismiss,
    /// Unknown command.
    Unknown(String),
}

/// Parse user input as a slash command.
///
/// Returns `None` if the input doesn't start with `/`.
pub fn parse(input: &str) -> Option<ChatCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let cmd = trimmed
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_lowercase();

    match cmd.as_str() {
        "/help" | "/h" | "/?" => Some(ChatCommand::Help),
        "/clear" | "/cls" => Some(ChatCommand::Clear),
        "/exit" | "/quit" | "/q" => Some(ChatCommand::Exit),
        "/history" => Some(ChatCommand::History),
        "/retry" | "/r" => Some(ChatCommand::Retry),
        "/dismiss" => Some(ChatCommand::Dismiss),
        other => Some(ChatCommand::Unknown(other.to_string())),
    }
}

/// Print the help text listing all available commands.
pub fn print_help() {
    println!();
    println!("  {}", style("Available commands:").bold());
    println!();
    println!("  {}     {}", style("/help").cyan(), "Show this help message");
    println!("  {}    {}", style("/clear").cyan(), "Clear the screen");
    println!("  {}  {}", style("/history").cyan(), "Show the conversation so far");
    println!("  {}    {}", style("/retry").cyan(), "Resend your last failed message");
    println!("  {}  {}", style("/dismiss").cyan(), "Hide the current notice");
    println!("  {}     {}", style("/quit").cyan(), "Leave the chat (your session is kept)");
    println!();
    println!("  {}", style("Ctrl+D to exit, `tutor logout` to end your session").dim());
    println!();
}
