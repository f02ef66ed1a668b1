//! Interactive console for the Cor-Tech assistant.
//!
//! Reads one command or chat line per stdin line and re-renders the session
//! after each turn. Tracing goes to stderr so stdout stays the console.

use cortech::app::{App, Flow};
use cortech::assistant::Session;
use cortech::config::AssistantConfig;
use cortech::console::{HELP, parse_command, render};
use cortech::credentials::{EnvSecretSource, load_credentials};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AssistantConfig::load()?;
    // Missing secrets stop startup before the scheduler or the console run.
    let credentials = load_credentials(&EnvSecretSource).map_err(|e| {
        tracing::error!(error = %e, "credentials incomplete");
        anyhow::anyhow!("cannot start: {e}")
    })?;
    tracing::debug!(?credentials, "credentials resolved");

    let app = App::from_credentials(config, &credentials)?;
    if app.start_scheduler()? {
        tracing::info!("reminder scheduler running");
    }

    let mut stdout = tokio::io::stdout();
    let mut reader = BufReader::new(tokio::io::stdin());
    let mut session = Session::new("console");
    let mut line = String::new();

    stdout
        .write_all(format!("{} : assistant prêt.\n{HELP}\n", app.config().organization.name).as_bytes())
        .await?;

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            tracing::info!("stdin closed; exiting");
            break;
        }
        if line.trim().is_empty() {
            continue;
        }

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(message) => {
                stdout.write_all(format!("{message}\n").as_bytes()).await?;
                continue;
            }
        };

        let reply = app.execute(&mut session, command).await;
        if reply.flow == Flow::Quit {
            break;
        }

        let mut out = render(session.view());
        for extra in &reply.lines {
            out.push_str(extra);
            out.push('\n');
        }
        stdout.write_all(out.as_bytes()).await?;
    }

    stdout.flush().await?;
    Ok(())
}
