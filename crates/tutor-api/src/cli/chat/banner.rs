//! Welcome banner display for chat sessions.

use console::style;

/// Print the banner at the start of a chat, with the student's name,
/// the session id, and the server in use.
pub fn print_welcome_banner(student_name: &str, session_id: &str, server: &str) {
    println!();
    println!("  {} {}", style("✎").bold(), style("AI Tutor").cyan().bold());
    println!("  {}", style(format!("Chatting with {student_name}")).dim());
    println!();
    println!(
        "  {}  {}",
        style("Session:").bold(),
        style(&session_id[..8.min(session_id.len())]).dim()
    );
    println!("  {}   {}", style("Server:").bold(), style(server).dim());
    println!();
    println!("  {}", style("Type /help for commands, Ctrl+D to exit").dim());
    println!("  {}", style("---").dim());
    println!();
}

/// Print a dismissible notice above the conversation.
pub fn print_notice(message: &str) {
    println!(
        "\n  {} {} {}\n",
        style("!").yellow().bold(),
        style(message).yellow(),
        style("(/dismiss to hide)").dim()
    );
}
