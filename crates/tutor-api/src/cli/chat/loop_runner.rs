//! Main chat loop orchestration.
//!
//! Resolves the stored profile, bootstraps the session through the delivery
//! client, renders the conversation, then reads lines until the student
//! leaves. Leaving does not end the session; `tutor logout` does.

use anyhow::bail;
use console::style;
use tracing::info;

use tutor_core::delivery::{
    ChatTransport, DeliveryClient, DeliveryError, DeliveryState, Entry, SendOutcome,
};
use tutor_infra::identity::LocalIdentity;
use tutor_infra::paths::resolve_data_dir;
use tutor_types::message::SenderType;
use uuid::Uuid;

use crate::cli::spinner;
use crate::client::HttpChatClient;

use super::banner::{print_notice, print_welcome_banner};
use super::commands::{self, ChatCommand};
use super::input::{ChatInput, InputEvent};

/// Device descriptor sent when a session is started from the terminal.
fn device_descriptor() -> String {
    format!("tutor-cli/{} ({})", env!("CARGO_PKG_VERSION"), std::env::consts::OS)
}

/// Run the interactive chat loop against the server at `server`.
pub async fn run_chat_loop(server: &str) -> anyhow::Result<()> {
    let identity = LocalIdentity::new(&resolve_data_dir());
    let Some(user_id) = identity.load().await? else {
        bail!("No profile found. Run `tutor onboard` first.");
    };

    let transport = HttpChatClient::new(server)?;
    let user = match transport.get_user(&user_id).await {
        Ok(user) => user,
        Err(e) if e.is_not_found() => {
            bail!("Your stored profile does not exist on {server}. Run `tutor onboard --force`.")
        }
        Err(e) => return Err(e.into()),
    };
    let name = user.first_name.clone();

    let mut client = DeliveryClient::new(transport, user.id)
        .with_student_name(name.clone())
        .with_device_info(device_descriptor());

    let bootstrap_spinner = spinner("Starting your session...");
    let bootstrapped = client.bootstrap().await.map(|session| session.id);
    bootstrap_spinner.finish_and_clear();
    let mut session_id = match bootstrapped {
        Ok(id) => id,
        Err(e) => {
            if let Some(banner) = client.ledger().banner() {
                print_notice(banner);
            }
            return Err(e.into());
        }
    };
    info!(user_id = %user.id, session_id = %session_id, "Chat started");

    print_welcome_banner(&name, &session_id.to_string(), server);
    for entry in client.ledger().entries() {
        println!("{}", format_entry(entry, &name));
    }
    println!();

    let prompt = format!("  {} ", style("You >").green().bold());
    let (mut chat_input, _writer) =
        ChatInput::new(prompt).map_err(|e| anyhow::anyhow!("Failed to initialize input: {e}"))?;

    loop {
        match chat_input.read_line().await {
            InputEvent::Eof => {
                println!("\n  {}", style("See you next time!").dim());
                break;
            }
            InputEvent::Interrupted => {
                println!("\n  {}", style("Press Ctrl+D to exit, or keep chatting.").dim());
                continue;
            }
            InputEvent::Message(text) => {
                if text.is_empty() {
                    continue;
                }

                if let Some(cmd) = commands::parse(&text) {
                    match cmd {
                        ChatCommand::Help => commands::print_help(),
                        ChatCommand::Clear => chat_input.clear(),
                        ChatCommand::Exit => {
                            println!("\n  {}", style("See you next time!").dim());
                            break;
                        }
                        ChatCommand::History => {
                            println!();
                            for entry in client.ledger().entries() {
                                println!("{}", format_entry(entry, &name));
                            }
                            println!();
                        }
                        ChatCommand::Retry => {
                            let retry_spinner = spinner("thinking...");
                            let outcome = client.retry_last().await;
                            retry_spinner.finish_and_clear();
                            match outcome {
                                Ok(Some(outcome)) => {
                                    report(&client, Ok(outcome));
                                    note_session_change(&client, &mut session_id);
                                }
                                Ok(None) => println!("\n  {}\n", style("Nothing to retry.").dim()),
                                Err(e) => report(&client, Err(e)),
                            }
                        }
                        ChatCommand::Dismiss => client.dismiss_banner(),
                        ChatCommand::Unknown(cmd_name) => {
                            println!(
                                "\n  {} Unknown command: {}. Type /help for available commands.\n",
                                style("?").yellow().bold(),
                                style(cmd_name).dim()
                            );
                        }
                    }
                    continue;
                }

                let send_spinner = spinner("thinking...");
                let outcome = client.send(&text).await;
                send_spinner.finish_and_clear();
                report(&client, outcome);
                note_session_change(&client, &mut session_id);
            }
        }
    }

    chat_input.flush();
    Ok(())
}

/// Print the result of one send or retry.
fn report<T: ChatTransport>(client: &DeliveryClient<T>, outcome: Result<SendOutcome, DeliveryError>) {
    match outcome {
        Ok(SendOutcome::Delivered { reply, .. }) => {
            println!("\n  {} {}\n", style("Tutor >").cyan().bold(), reply);
        }
        Ok(SendOutcome::Failed { error, .. }) => {
            println!(
                "\n  {} Not sent: {}. Type {} to resend.",
                style("✗").red().bold(),
                style(error).dim(),
                style("/retry").cyan()
            );
            if let Some(banner) = client.ledger().banner() {
                print_notice(banner);
            }
        }
        Err(e) => println!("\n  {} {e}\n", style("!").yellow().bold()),
    }
}

/// Announce when the client moved on from an ended session.
fn note_session_change<T: ChatTransport>(client: &DeliveryClient<T>, current: &mut Uuid) {
    if let Some(session) = client.session() {
        if session.id != *current {
            info!(from = %current, to = %session.id, "Chat moved to a new session");
            *current = session.id;
            println!(
                "  {} Continuing in a new session {}\n",
                style("↻").cyan().bold(),
                style(&session.id.to_string()[..8]).dim()
            );
        }
    }
}

/// One conversation line, with the delivery state of student messages.
fn format_entry(entry: &Entry, student_name: &str) -> String {
    match entry.sender {
        SenderType::Bot => format!("  {} {}", style("Tutor >").cyan().bold(), entry.text),
        SenderType::User => {
            let marker = match (entry.state, &entry.retried_as) {
                (DeliveryState::Sent, _) => String::new(),
                (DeliveryState::Sending, _) => format!(" {}", style("(sending)").dim()),
                (DeliveryState::Failed, Some(_)) => format!(" {}", style("(failed, retried)").dim()),
                (DeliveryState::Failed, None) => format!(" {}", style("(failed, /retry)").red()),
            };
            format!("  {} {}{marker}", style(format!("{student_name} >")).green().bold(), entry.text)
        }
    }
}
