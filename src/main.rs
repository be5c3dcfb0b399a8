//! oprobe - a terminal tester for the SAP S/4HANA product OData API
//!
//! Sends `$top`/`$filter` queries to the product master entity sets of
//! `API_PRODUCT_SRV` with an `APIKey` header and shows the records as a table:
//! - `A_Product`
//! - `A_ProductDescription`
//! - `A_ProductPlant`

mod api;
mod config;
mod error;
mod export;
mod logging;
mod models;
mod output;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::api::ODataClient;
use crate::config::Config;
use crate::models::{EntitySet, FilterEscaping, QueryConfig};
use crate::output::PrintOptions;
use crate::ui::{App, Field, InputMode, KeyBindings};

/// oprobe - Product OData tester
#[derive(Parser, Debug)]
#[command(name = "oprobe")]
#[command(about = "A terminal UI for testing the SAP S/4HANA product master OData API")]
#[command(version)]
struct Args {
    /// API key from api.sap.com, sent as the APIKey header
    #[arg(short = 'k', long, env = "ODATA_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Service root URL
    #[arg(short, long, env = "ODATA_BASE_URL")]
    base_url: Option<String>,

    /// Entity set to query: product-master, product-description, product-plant
    /// or the A_* entity set name
    #[arg(short, long, value_parser = EntitySet::from_str)]
    entity: Option<EntitySet>,

    /// Number of records to return ($top, 1-100)
    #[arg(short, long)]
    top: Option<u32>,

    /// Product number to filter on ($filter=Product eq '...')
    #[arg(short, long)]
    filter: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Double single quotes inside the filter value
    #[arg(long)]
    escape_filter: bool,

    /// Use vim-style keybindings (h/j/k/l navigation)
    #[arg(long, default_value = "false")]
    vim: bool,

    /// Run once and print the result instead of starting the TUI
    #[arg(long)]
    print: bool,

    /// With --print, output records as JSON
    #[arg(long, requires = "print")]
    json: bool,

    /// With --print, also export the result (.csv or .json)
    #[arg(long, requires = "print")]
    export: Option<PathBuf>,

    /// Settings file (defaults to the platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Args {
    /// Layer CLI flags over the settings file
    fn settings(&self, mut config: Config) -> Config {
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(entity) = self.entity {
            config.entity = entity;
        }
        if let Some(top) = self.top {
            config.top = top;
        }
        if let Some(timeout) = self.timeout_secs {
            config.timeout_secs = timeout;
        }
        if self.escape_filter {
            config.escape_filter = true;
        }
        config
    }

    fn query_config(&self, settings: &Config) -> QueryConfig {
        let escaping = if settings.escape_filter {
            FilterEscaping::DoubleQuotes
        } else {
            FilterEscaping::Raw
        };
        let mut query = QueryConfig::new(
            settings.base_url.clone(),
            settings.entity,
            settings.top,
            self.api_key.clone().unwrap_or_default(),
        )
        .with_escaping(escaping);
        query.set_filter(self.filter.clone());
        query
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    if args.print {
        logging::init_stderr_logging();
    } else {
        logging::init_file_logging();
    }

    let file_config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let settings = args.settings(file_config);

    let client = Arc::new(
        ODataClient::new(Duration::from_secs(settings.timeout_secs.max(1)))
            .context("Failed to set up the HTTP client")?,
    );

    if args.print {
        let opts = PrintOptions {
            json: args.json,
            export: args.export.clone(),
        };
        let code = output::run_once(&client, &args.query_config(&settings), &opts).await?;
        return Ok(ExitCode::from(code));
    }

    // Set up key bindings
    let key_bindings = if args.vim {
        KeyBindings::Vim
    } else {
        KeyBindings::Arrows
    };

    let mut app = App::new(client, key_bindings, &settings);
    if let Some(key) = &args.api_key {
        app.api_key = key.clone();
        app.focus = Field::Filter;
    }
    if let Some(filter) = &args.filter {
        app.filter = filter.clone();
    }

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {:?}", e);
        return Ok(ExitCode::FAILURE);
    }

    Ok(ExitCode::SUCCESS)
}

/// Main event loop
async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui::components::render(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }

                match app.input_mode {
                    InputMode::Normal => handle_normal_mode(terminal, app, key.code).await?,
                    InputMode::Editing => handle_editing_mode(app, key.code),
                }

                if app.should_quit {
                    break;
                }
            }
        }
    }

    Ok(())
}

/// Handle input in normal mode
async fn handle_normal_mode(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    key: KeyCode,
) -> Result<()> {
    if app.show_help {
        if matches!(key, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
            app.show_help = false;
        }
        return Ok(());
    }

    match key {
        KeyCode::Char('q') => {
            app.should_quit = true;
            return Ok(());
        }
        KeyCode::F(5) | KeyCode::Char('r') => {
            app.clear_message();
            app.state = ui::AppState::Loading;
            // Show the loading state before the request blocks the loop
            terminal.draw(|f| ui::components::render(f, app))?;
            app.run_query().await;
            return Ok(());
        }
        KeyCode::Char('?') => {
            app.show_help = true;
            return Ok(());
        }
        KeyCode::Char('v') => {
            app.toggle_raw_json();
            return Ok(());
        }
        KeyCode::Char('x') => {
            app.export_query_results();
            return Ok(());
        }
        KeyCode::Char('e') => {
            app.toggle_escaping();
            return Ok(());
        }
        KeyCode::Char('s') => {
            app.save_settings();
            return Ok(());
        }
        KeyCode::Tab => {
            app.next_field();
            return Ok(());
        }
        KeyCode::BackTab => {
            app.prev_field();
            return Ok(());
        }
        KeyCode::Enter => {
            app.start_editing();
            return Ok(());
        }
        KeyCode::Esc => {
            app.clear_message();
            return Ok(());
        }
        _ => {}
    }

    // Navigation
    if app.key_bindings.is_up(key) {
        app.navigate_up();
    } else if app.key_bindings.is_down(key) {
        app.navigate_down();
    } else if app.key_bindings.is_left(key) {
        app.adjust(false);
    } else if app.key_bindings.is_right(key) {
        app.adjust(true);
    }

    Ok(())
}

/// Handle input while typing into a field
fn handle_editing_mode(app: &mut App, key: KeyCode) {
    match key {
        KeyCode::Enter | KeyCode::Esc | KeyCode::Tab => {
            app.stop_editing();
        }
        KeyCode::Backspace => {
            app.pop_char();
        }
        KeyCode::Char(c) => {
            app.push_char(c);
        }
        _ => {}
    }
}
