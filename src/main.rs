mod api;
mod app;
mod config;
mod dispatch;
mod errors;
mod form;
mod highlight;
mod logger;
mod models;
mod redirect;
mod session;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use comfy_table::{Cell, ContentArrangement, Table};
use crossterm::{
    event::{DisableBracketedPaste, EnableBracketedPaste, Event, EventStream},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures_util::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use reqwest::Url;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};

use api::ApiClient;
use app::{App, AppEvent};
use config::{Overrides, Settings};
use dispatch::Dispatcher;
use logger::Logger;
use redirect::Location;

/// Address the TUI pretends to be served from when no redirect URL is given.
const DEFAULT_PAGE_URL: &str = "http://localhost/";
const TICK_RATE: Duration = Duration::from_millis(100);

#[derive(Debug, Parser)]
#[command(
    name = "ytab",
    version,
    about = "Run YouTube title and thumbnail A/B tests from the terminal"
)]
struct Cli {
    /// Backend base URL (overrides the build-time default)
    #[arg(long, global = true, value_name = "URL")]
    api_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true, value_name = "SECONDS")]
    timeout_secs: Option<u64>,

    /// Log filter, e.g. "debug" or "ytab_cli=trace"
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<String>,

    /// URL the browser landed on after signing in
    #[arg(long, value_name = "URL")]
    redirect_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Check that the backend is reachable and print its health payload
    Probe {
        /// Print the raw JSON payload
        #[arg(long)]
        json: bool,
    },
    /// Print the URL that starts the YouTube sign-in
    LoginUrl,
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::Completions { shell }) = &cli.command {
        let mut command = Cli::command();
        generate(*shell, &mut command, "ytab", &mut io::stdout());
        return Ok(());
    }

    let settings = match Settings::resolve(Overrides {
        api_base_url: cli.api_url.clone(),
        timeout_secs: cli.timeout_secs,
        log_level: cli.log_level.clone(),
    }) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            if let Some(hint) = e.hint() {
                eprintln!("💡 {}", hint);
            }
            std::process::exit(2);
        }
    };

    let client = ApiClient::new(settings.api_base_url.clone(), settings.request_timeout)?;

    match cli.command {
        Some(Commands::Probe { json }) => run_probe(&client, json).await,
        Some(Commands::LoginUrl) => {
            println!("{}", client.login_url());
            Ok(())
        }
        Some(Commands::Completions { .. }) => Ok(()),
        None => {
            let location = Location::new(Url::parse(
                cli.redirect_url.as_deref().unwrap_or(DEFAULT_PAGE_URL),
            )?);
            let logger = Logger::new(&settings.log)?;
            info!(
                session_id = %logger.session_id(),
                api_base_url = %settings.api_base_url,
                "Starting TUI"
            );
            run_tui(client, location).await
        }
    }
}

async fn run_probe(client: &ApiClient, json: bool) -> Result<()> {
    let payload = match client.probe().await {
        Ok(payload) => payload,
        Err(e) => {
            eprintln!("Failed to connect to API at {}: {}", client.base_url(), e);
            if let Some(hint) = e.hint() {
                eprintln!("💡 {}", hint);
            }
            std::process::exit(1);
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Field", "Value"]);
    table.add_row(vec![Cell::new("api"), Cell::new(client.base_url())]);
    match &payload {
        serde_json::Value::Object(fields) => {
            for (key, value) in fields {
                let rendered = match value {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                table.add_row(vec![Cell::new(key), Cell::new(rendered)]);
            }
        }
        other => {
            table.add_row(vec![Cell::new("response"), Cell::new(other.to_string())]);
        }
    }
    println!("Connected to API");
    println!("{table}");
    Ok(())
}

async fn run_tui(client: ApiClient, location: Location) -> Result<()> {
    let api_base_url = client.base_url().to_string();
    let login_url = client.login_url();
    let (event_tx, mut event_rx) = mpsc::channel(64);
    let mut dispatcher = Dispatcher::new(Arc::new(client), event_tx);

    let mut app = App::new(api_base_url, login_url, location);
    app.start();

    let mut terminal = setup_terminal()?;
    let res = run_app(&mut terminal, &mut app, &mut dispatcher, &mut event_rx).await;
    restore_terminal(&mut terminal)?;

    if let Err(err) = &res {
        error!(error = %err, "TUI exited with error");
        eprintln!("Error: {}", err);
    }
    info!("Session ended");

    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    dispatcher: &mut Dispatcher,
    event_rx: &mut mpsc::Receiver<AppEvent>,
) -> Result<()> {
    let mut events = EventStream::new();
    let mut ticker = tokio::time::interval(TICK_RATE);

    loop {
        for command in app.take_commands() {
            dispatcher.dispatch(command);
        }

        terminal.draw(|frame| ui::draw(frame, app))?;

        if app.should_quit {
            break;
        }

        tokio::select! {
            maybe_event = events.next() => match maybe_event {
                Some(Ok(Event::Key(key))) => app.handle_key_event(key),
                Some(Ok(Event::Paste(text))) => app.handle_paste(&text),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => break,
            },
            Some(event) = event_rx.recv() => app.apply(event),
            _ = ticker.tick() => app.tick(),
        }
    }

    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableBracketedPaste,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;
    Ok(())
}
