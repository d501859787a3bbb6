//! Registration session runner
//!
//! Replays a registration session against file-backed draft storage and
//! writes the resulting page.
//!
//! This binary:
//! - Loads configuration from the environment (and `.env`)
//! - Restores any draft saved by a previous run
//! - Replays the session script, or the built-in Ada Lovelace scenario
//! - Writes the rendered page to `CONFPASS_OUTPUT`
//!
//! # Usage
//!
//! ```bash
//! CONFPASS_SCRIPT=session.json cargo run --bin registration
//! ```

use confpass_registration::session::{self, SessionScript};
use confpass_registration::view::render_page;
use confpass_registration::{registration_store, Config, FileStorage, RegistrationAction, RegistrationEnvironment};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    let _ = dotenvy::dotenv();

    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_level))
        .with(tracing_subscriber::fmt::layer())
        .init();

    config.validate()?;
    tracing::info!(
        storage = %config.storage_dir.display(),
        output = %config.output.display(),
        script = ?config.script,
        "Configuration loaded"
    );

    let storage = FileStorage::new(config.storage_dir.clone());
    let store = registration_store(RegistrationEnvironment::production(Arc::new(storage)));

    let actions = match &config.script {
        Some(path) => {
            let script = SessionScript::from_path(path)?;
            script.actions(path.parent().unwrap_or_else(|| Path::new(".")))?
        },
        None => {
            tracing::info!("No session script configured, running the built-in scenario");
            session::builtin_scenario()
        },
    };

    session::replay(&store, actions).await?;

    let (page, issued) = store
        .state(|state| {
            let issued = state.ticket.as_ref().map(|t| t.barcode().to_string());
            (render_page(state), issued)
        })
        .await;
    std::fs::write(&config.output, page)?;

    match issued {
        Some(barcode) => tracing::info!(%barcode, output = %config.output.display(), "Ticket written"),
        None => tracing::info!(output = %config.output.display(), "Form written, no ticket issued"),
    }

    store.send(RegistrationAction::Unmounted).await?;
    store.close();
    Ok(())
}
