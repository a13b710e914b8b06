//! services/client/src/bin/habit_client.rs

use chrono::{NaiveDate, TimeZone, Utc};
use clap::{Parser, Subcommand};
use habit_client_lib::{
    adapters::{FileStorage, HistoryNavigator},
    app::{validation::validate_registration, AppState, Navigation, RouteTable},
    config::Config,
    error::{ClientError, ClientResult},
    features::{AdminService, HabitLogService, LoadState},
};
use habit_tracker_core::domain::{Credentials, Registration};
use habit_tracker_core::ports::Navigator;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Habit tracker client - session and API access from the terminal.
#[derive(Debug, Parser)]
#[command(name = "habit-client")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign in and store the session.
    Login {
        /// Defaults to the remembered username.
        username: Option<String>,
        #[arg(long, env = "HABIT_PASSWORD", hide_env_values = true)]
        password: String,
        /// Remember the username for the next login.
        #[arg(long)]
        remember: bool,
    },

    /// Create an account. Sign in after verifying the email.
    Register {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        middle_name: Option<String>,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        mobile: String,
        #[arg(long, env = "HABIT_PASSWORD", hide_env_values = true)]
        password: String,
        /// Date of birth, YYYY-MM-DD.
        #[arg(long)]
        dob: Option<NaiveDate>,
    },

    /// Clear the stored session.
    Logout,

    /// Show the signed-in identity.
    Whoami,

    /// Resolve a client route the way the router would.
    Open { route: String },

    /// Send an authenticated GET to the API and print the JSON.
    Get { path: String },

    /// List submitted feedback (admins only).
    Feedback,

    /// Delete the logs of a habit for the given dates.
    DeleteLogs {
        habit_id: u64,
        #[arg(required = true)]
        dates: Vec<NaiveDate>,
    },
}

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let cli = Cli::parse();
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    info!("Configuration loaded. API at {}", config.api_base_url);

    // --- 2. Build the Shared AppState ---
    let storage = Arc::new(FileStorage::new(config.storage_path.clone()));
    let navigator = Arc::new(HistoryNavigator::default());
    let state = AppState::new(config, storage, navigator.clone())?;

    // --- 3. Run the Command ---
    let succeeded = match run(cli.command, &state).await {
        Ok(succeeded) => succeeded,
        Err(e) => {
            state.error_sink.report(&e);
            false
        }
    };

    for toast in state.notifications.toasts() {
        eprintln!("[{}] {}", toast.kind, toast.message);
    }
    if let Some(location) = navigator.current() {
        info!("Final location: {}", location);
    }

    if !succeeded {
        std::process::exit(1);
    }
    Ok(())
}

/// Runs one command. `Ok(false)` is a failure the command has already reported.
async fn run(command: Command, state: &AppState) -> ClientResult<bool> {
    match command {
        Command::Login {
            username,
            password,
            remember,
        } => {
            let username = username
                .or_else(|| state.session.remembered_username())
                .ok_or_else(|| ClientError::Validation("Username is required".into()))?;
            state
                .session
                .login(&Credentials {
                    username: username.clone(),
                    password,
                })
                .await?;
            state
                .session
                .remember_username(remember.then_some(username.as_str()))?;
            if !state.session.is_authenticated() {
                return Err(ClientError::Authentication(
                    "Login did not return a session".into(),
                ));
            }
            state.notifications.success("Login successful!");
            state.navigator.replace(state.session.landing_route());
        }

        Command::Register {
            first_name,
            middle_name,
            last_name,
            username,
            email,
            mobile,
            password,
            dob,
        } => {
            let registration = Registration {
                first_name,
                middle_name,
                last_name,
                username,
                email,
                mobile_number: mobile,
                confirm_password: password.clone(),
                password,
                dob: dob
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|d| Utc.from_utc_datetime(&d)),
            };
            validate_registration(&registration)?;
            state.session.register(&registration).await?;
            state
                .notifications
                .success("Registration successful! Please verify your email.");
        }

        Command::Logout => {
            state.session.logout();
            if state.session.is_authenticated() {
                return Err(ClientError::Internal(
                    "The stored session could not be cleared".into(),
                ));
            }
            state.notifications.info("Logged out");
        }

        Command::Whoami => match state.session.current_identity() {
            Some(identity) if state.session.is_authenticated() => {
                println!("{}", serde_json::to_string_pretty(&identity)?);
            }
            _ => println!("Not signed in"),
        },

        Command::Open { route } => {
            match RouteTable::standard().navigate(&route, &state.session) {
                Navigation::Render => state.navigator.replace(&route),
                Navigation::Redirect(target) => state.navigator.replace(&target),
                Navigation::Loading => {}
            }
            println!("{}", state.navigator.current().unwrap_or_default());
        }

        Command::Get { path } => {
            let body: Value = state.api.get(&path).await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }

        Command::Feedback => match AdminService::new(state.api.clone()).load_feedback().await {
            LoadState::Loaded(items) => {
                for item in items {
                    println!(
                        "#{} {} <{}> {}/5: {}",
                        item.feedback_id, item.name, item.email, item.rating, item.message
                    );
                }
            }
            LoadState::Empty | LoadState::Loading => println!("No feedback submitted yet."),
            LoadState::Failed(message) => {
                state.error_sink.report_message(&message);
                return Ok(false);
            }
        },

        Command::DeleteLogs { habit_id, dates } => {
            let report = HabitLogService::new(state.api.clone())
                .delete_many(habit_id, &dates)
                .await;
            for (date, reason) in &report.failed {
                println!("{}: {}", date, reason);
            }
            if report.is_complete() {
                state.notifications.success(&report.summary());
            } else {
                state.notifications.warning(&report.summary());
                return Ok(false);
            }
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use habit_client_lib::adapters::MemoryStorage;
    use habit_tracker_core::ports::{keys, DurableStorage};

    fn offline_state() -> AppState {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(keys::TOKEN, "t").unwrap();
        storage
            .set(keys::USER, r#"{"userId":"1","username":"root","role":"ADMIN"}"#)
            .unwrap();
        // Nothing listens on the discard port.
        let config = Config::for_base_url("http://127.0.0.1:9/api").unwrap();
        AppState::new(config, storage, Arc::new(HistoryNavigator::default())).unwrap()
    }

    #[tokio::test]
    async fn unloadable_feedback_fails_the_command() {
        let state = offline_state();

        let succeeded = run(Command::Feedback, &state).await.unwrap();

        assert!(!succeeded);
        assert_eq!(state.error_sink.recent_errors().len(), 1);
    }

    #[tokio::test]
    async fn logout_succeeds_once_the_session_is_gone() {
        let state = offline_state();

        assert!(run(Command::Logout, &state).await.unwrap());
        assert!(!state.session.is_authenticated());
    }
}
