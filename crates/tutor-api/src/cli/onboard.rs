//! `tutor onboard`: create a student profile over HTTP and store its id.

use anyhow::Result;
use clap::Args;
use console::style;
use dialoguer::{Input, Select};

use tutor_infra::identity::LocalIdentity;
use tutor_infra::paths::resolve_data_dir;
use tutor_types::user::{AGE_RANGE, CreateUserRequest, GRADE_RANGE};

use crate::cli::spinner;
use crate::client::HttpChatClient;

const BOARDS: [&str; 5] = ["CBSE", "ICSE", "IB", "STATE_BOARD", "OTHER"];

/// Profile fields; anything left out is asked for interactively.
#[derive(Debug, Args)]
pub struct OnboardArgs {
    #[arg(long)]
    pub first_name: Option<String>,

    #[arg(long)]
    pub last_name: Option<String>,

    #[arg(long)]
    pub email: Option<String>,

    /// Age, 11 to 18.
    #[arg(long)]
    pub age: Option<i64>,

    /// School grade, 6 to 12.
    #[arg(long)]
    pub grade: Option<i64>,

    /// Education board (CBSE, ICSE, IB, STATE_BOARD, OTHER).
    #[arg(long)]
    pub board: Option<String>,

    /// Create a new profile even if one is already stored.
    #[arg(long)]
    pub force: bool,
}

/// Create the profile and remember its id in the data directory.
///
/// # Examples
///
/// ```bash
/// # Interactive
/// tutor onboard
///
/// # One-shot with flags
/// tutor onboard --first-name Asha --age 14 --grade 9 --board CBSE
/// ```
pub async fn onboard(server: &str, args: OnboardArgs, json: bool) -> Result<()> {
    let data_dir = resolve_data_dir();
    tokio::fs::create_dir_all(&data_dir).await?;
    let identity = LocalIdentity::new(&data_dir);
    let client = HttpChatClient::new(server)?;

    if !args.force {
        if let Some(user_id) = identity.load().await? {
            match client.get_user(&user_id).await {
                Ok(user) => {
                    if json {
                        println!("{}", serde_json::to_string_pretty(&user)?);
                    } else {
                        println!(
                            "\n  {} Already onboarded as {}. Use --force to create a new profile.\n",
                            style("✓").green().bold(),
                            style(&user.first_name).cyan()
                        );
                    }
                    return Ok(());
                }
                Err(e) if e.is_not_found() => {
                    tracing::warn!(user_id = %user_id, "Stored profile no longer exists on the server");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    let request = collect_request(args)?;

    let spinner = spinner("Creating your profile...");
    let created = client.create_user(&request).await;
    spinner.finish_and_clear();
    let user = created?;

    identity.save(&user.id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&user)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Welcome, {}! Your profile is ready.",
        style("✓").green().bold(),
        style(&user.first_name).cyan().bold()
    );
    println!(
        "  {}",
        style(format!("Grade {} · {}", user.grade_level, user.education_board)).dim()
    );
    println!();
    println!("  Start chatting with: {}", style("tutor chat").yellow());
    println!();

    Ok(())
}

/// Fill the onboarding payload from flags, prompting for required fields
/// that were not given.
fn collect_request(args: OnboardArgs) -> Result<CreateUserRequest> {
    let first_name = match args.first_name {
        Some(name) => name,
        None => Input::<String>::new()
            .with_prompt("First name")
            .validate_with(|name: &String| -> Result<(), &str> {
                if name.trim().is_empty() {
                    Err("first name is required")
                } else {
                    Ok(())
                }
            })
            .interact_text()?,
    };

    let age = match args.age {
        Some(age) => age,
        None => Input::<i64>::new()
            .with_prompt(format!("Age ({}-{})", AGE_RANGE.start(), AGE_RANGE.end()))
            .validate_with(|age: &i64| -> Result<(), String> {
                if AGE_RANGE.contains(age) {
                    Ok(())
                } else {
                    Err(format!("age must be between {} and {}", AGE_RANGE.start(), AGE_RANGE.end()))
                }
            })
            .interact_text()?,
    };

    let grade_level = match args.grade {
        Some(grade) => grade,
        None => Input::<i64>::new()
            .with_prompt(format!("Grade ({}-{})", GRADE_RANGE.start(), GRADE_RANGE.end()))
            .validate_with(|grade: &i64| -> Result<(), String> {
                if GRADE_RANGE.contains(grade) {
                    Ok(())
                } else {
                    Err(format!("grade must be between {} and {}", GRADE_RANGE.start(), GRADE_RANGE.end()))
                }
            })
            .interact_text()?,
    };

    let education_board = match args.board {
        Some(board) => board,
        None => {
            let selection = Select::new()
                .with_prompt("Education board")
                .items(&BOARDS)
                .default(0)
                .interact()?;
            BOARDS[selection].to_string()
        }
    };

    Ok(CreateUserRequest {
        first_name: Some(first_name),
        last_name: args.last_name,
        email: args.email,
        age: Some(age),
        grade_level: Some(grade_level),
        education_board: Some(education_board),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_fill_request_without_prompting() {
        let args = OnboardArgs {
            first_name: Some("Asha".to_string()),
            last_name: None,
            email: Some("asha@example.com".to_string()),
            age: Some(14),
            grade: Some(9),
            board: Some("icse".to_string()),
            force: false,
        };

        let request = collect_request(args).unwrap();
        assert_eq!(request.first_name.as_deref(), Some("Asha"));
        assert_eq!(request.grade_level, Some(9));

        let user = request.validate().unwrap();
        assert_eq!(user.education_board.to_string(), "ICSE");
        assert_eq!(user.email.as_deref(), Some("asha@example.com"));
    }

    #[test]
    fn test_board_choices_parse() {
        for board in BOARDS {
            assert!(board.parse::<tutor_types::user::EducationBoard>().is_ok());
        }
    }
}
