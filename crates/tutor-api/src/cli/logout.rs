//! `tutor logout`: end the active session and forget the stored profile id.

use anyhow::Result;
use console::style;
use serde_json::json;

use tutor_core::delivery::ChatTransport;
use tutor_infra::identity::LocalIdentity;
use tutor_infra::paths::resolve_data_dir;

use crate::client::HttpChatClient;

pub async fn logout(server: &str, json: bool) -> Result<()> {
    let identity = LocalIdentity::new(&resolve_data_dir());

    let Some(user_id) = identity.load().await? else {
        if json {
            println!("{}", json!({ "logged_out": false, "ended_session": null }));
        } else {
            println!("\n  {}\n", style("Not signed in.").dim());
        }
        return Ok(());
    };

    let client = HttpChatClient::new(server)?;
    let ended = match client.active_session(&user_id).await? {
        Some(session) => Some(client.end_session(&session.id).await?),
        None => None,
    };

    identity.clear().await?;

    if json {
        println!(
            "{}",
            json!({ "logged_out": true, "ended_session": ended.as_ref().map(|s| s.id) })
        );
        return Ok(());
    }

    println!();
    if let Some(session) = &ended {
        println!(
            "  {} Ended session {}",
            style("✓").green().bold(),
            style(&session.id.to_string()[..8]).dim()
        );
    }
    println!("  {} Signed out. Run {} to start again.", style("✓").green().bold(), style("tutor onboard").yellow());
    println!();

    Ok(())
}
