//! Application state and main TUI logic

use super::input::{InputMode, KeyBindings};
use crate::api::ODataClient;
use crate::config::Config;
use crate::error::QueryError;
use crate::export::{export_results, ExportFormat};
use crate::models::{
    EntitySet, FilterEscaping, ODataResult, QueryConfig, QueryResult, MAX_TOP, MIN_TOP,
};
use std::sync::Arc;

/// Request lifecycle as seen by the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppState {
    #[default]
    Idle,
    Loading,
    Done,
}

/// Form field or pane with keyboard focus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Field {
    #[default]
    ApiKey,
    BaseUrl,
    Entity,
    Top,
    Filter,
    Results,
}

impl Field {
    pub fn next(&self) -> Self {
        match self {
            Self::ApiKey => Self::BaseUrl,
            Self::BaseUrl => Self::Entity,
            Self::Entity => Self::Top,
            Self::Top => Self::Filter,
            Self::Filter => Self::Results,
            Self::Results => Self::ApiKey,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            Self::ApiKey => Self::Results,
            Self::BaseUrl => Self::ApiKey,
            Self::Entity => Self::BaseUrl,
            Self::Top => Self::Entity,
            Self::Filter => Self::Top,
            Self::Results => Self::Filter,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::ApiKey => "API Key",
            Self::BaseUrl => "Base URL",
            Self::Entity => "Entity Set",
            Self::Top => "$top",
            Self::Filter => "Product",
            Self::Results => "Results",
        }
    }

    /// Whether Enter starts typing into this field
    pub fn is_text(&self) -> bool {
        matches!(self, Self::ApiKey | Self::BaseUrl | Self::Top | Self::Filter)
    }
}

/// What the last request produced
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Outcome {
    /// Nothing sent yet
    #[default]
    None,
    Rows(QueryResult),
    Empty,
    Failure { status: u16, body: String },
    Error(QueryError),
}

/// Main application struct
pub struct App {
    /// OData API client
    pub client: Arc<ODataClient>,

    /// Current request state
    pub state: AppState,

    /// Key binding style
    pub key_bindings: KeyBindings,

    /// Input mode
    pub input_mode: InputMode,

    /// Focused field
    pub focus: Field,

    // Form values
    pub api_key: String,
    pub base_url: String,
    pub entity: EntitySet,
    pub top_input: String,
    pub filter: String,
    pub escaping: FilterEscaping,

    // Last request
    pub last_url: Option<String>,
    pub outcome: Outcome,
    pub result_index: usize,
    /// First table column shown in the results pane
    pub column_offset: usize,
    pub show_raw_json: bool,
    pub raw_scroll: u16,

    /// OData tips popup
    pub show_help: bool,

    // Feedback message
    pub message: Option<String>,

    /// Should quit
    pub should_quit: bool,
}

impl App {
    /// Create a new app instance seeded from settings
    pub fn new(client: Arc<ODataClient>, key_bindings: KeyBindings, settings: &Config) -> Self {
        Self {
            client,
            state: AppState::Idle,
            key_bindings,
            input_mode: InputMode::Normal,
            focus: Field::ApiKey,
            api_key: String::new(),
            base_url: settings.base_url.clone(),
            entity: settings.entity,
            top_input: settings.top.clamp(MIN_TOP, MAX_TOP).to_string(),
            filter: String::new(),
            escaping: if settings.escape_filter {
                FilterEscaping::DoubleQuotes
            } else {
                FilterEscaping::Raw
            },
            last_url: None,
            outcome: Outcome::None,
            result_index: 0,
            column_offset: 0,
            show_raw_json: false,
            raw_scroll: 0,
            show_help: false,
            message: None,
            should_quit: false,
        }
    }

    /// Current `$top` value, clamped; unparsable input counts as the minimum
    pub fn top(&self) -> u32 {
        self.top_input
            .parse::<u32>()
            .unwrap_or(MIN_TOP)
            .clamp(MIN_TOP, MAX_TOP)
    }

    /// Snapshot the form into a query config
    pub fn build_config(&self) -> QueryConfig {
        let mut config = QueryConfig::new(
            self.base_url.clone(),
            self.entity,
            self.top(),
            self.api_key.clone(),
        )
        .with_escaping(self.escaping);
        config.set_filter(Some(self.filter.clone()));
        config
    }

    /// Build the request from the form and run it
    pub async fn run_query(&mut self) {
        let config = self.build_config();
        self.result_index = 0;
        self.column_offset = 0;
        self.raw_scroll = 0;
        self.top_input = config.top().to_string();

        if !config.has_credential() {
            self.last_url = None;
            self.outcome = Outcome::Error(QueryError::MissingCredential);
            self.message = Some("Enter your API key first".to_string());
            self.state = AppState::Done;
            return;
        }

        let url = config.build_url();
        self.message = Some(format!("Requesting: {}", url));
        self.last_url = Some(url);
        self.state = AppState::Loading;

        let result = self.client.execute_query(&config).await;
        self.apply_result(result);
    }

    /// Store a finished request
    pub fn apply_result(&mut self, result: Result<ODataResult, QueryError>) {
        let (outcome, message) = match result {
            Ok(ODataResult::Rows(records)) => {
                let count = records.len();
                (
                    Outcome::Rows(QueryResult::from_records(&records)),
                    format!("Fetched {} records", count),
                )
            }
            Ok(ODataResult::Empty) => (
                Outcome::Empty,
                "Request succeeded but returned no data (it may have been filtered out)"
                    .to_string(),
            ),
            Ok(ODataResult::Failure { status, body }) => (
                Outcome::Failure { status, body },
                format!("Request failed: {}", status),
            ),
            Err(e) => {
                let message = e.category().to_string();
                (Outcome::Error(e), message)
            }
        };

        self.outcome = outcome;
        self.message = Some(message);
        self.state = AppState::Done;
    }

    /// Result table when the last request returned rows
    pub fn result_table(&self) -> Option<&QueryResult> {
        match &self.outcome {
            Outcome::Rows(table) => Some(table),
            _ => None,
        }
    }

    pub fn next_field(&mut self) {
        self.focus = self.focus.next();
    }

    pub fn prev_field(&mut self) {
        self.focus = self.focus.prev();
    }

    /// Enter editing mode on text fields
    pub fn start_editing(&mut self) {
        if self.focus.is_text() {
            self.input_mode = InputMode::Editing;
        }
    }

    pub fn stop_editing(&mut self) {
        self.input_mode = InputMode::Normal;
        if self.focus == Field::Top {
            self.top_input = self.top().to_string();
        }
    }

    /// Type a character into the focused field
    pub fn push_char(&mut self, c: char) {
        match self.focus {
            Field::ApiKey => self.api_key.push(c),
            Field::BaseUrl => self.base_url.push(c),
            Field::Filter => self.filter.push(c),
            Field::Top => {
                if c.is_ascii_digit() && self.top_input.len() < 3 {
                    self.top_input.push(c);
                }
            }
            Field::Entity | Field::Results => {}
        }
    }

    pub fn pop_char(&mut self) {
        match self.focus {
            Field::ApiKey => {
                self.api_key.pop();
            }
            Field::BaseUrl => {
                self.base_url.pop();
            }
            Field::Filter => {
                self.filter.pop();
            }
            Field::Top => {
                self.top_input.pop();
            }
            Field::Entity | Field::Results => {}
        }
    }

    /// Whether the results pane shows scrollable text instead of the table
    fn shows_text(&self) -> bool {
        self.show_raw_json || matches!(self.outcome, Outcome::Failure { .. })
    }

    /// Left/right on the selector fields, or across table columns
    pub fn adjust(&mut self, forward: bool) {
        match self.focus {
            Field::Results => {
                let Some(col_count) = self
                    .result_table()
                    .filter(|_| !self.show_raw_json)
                    .map(|t| t.columns.len())
                else {
                    return;
                };
                self.column_offset = if forward {
                    (self.column_offset + 1).min(col_count.saturating_sub(1))
                } else {
                    self.column_offset.saturating_sub(1)
                };
            }
            Field::Entity => {
                self.entity = if forward {
                    self.entity.next()
                } else {
                    self.entity.prev()
                };
            }
            Field::Top => {
                let top = self.top();
                let top = if forward {
                    top.saturating_add(1)
                } else {
                    top.saturating_sub(1)
                };
                self.top_input = top.clamp(MIN_TOP, MAX_TOP).to_string();
            }
            _ => {}
        }
    }

    /// Navigate up: result rows when focused there, otherwise the form
    pub fn navigate_up(&mut self) {
        if self.focus != Field::Results {
            self.prev_field();
        } else if self.shows_text() {
            self.raw_scroll = self.raw_scroll.saturating_sub(1);
        } else if self.result_index > 0 {
            self.result_index -= 1;
        }
    }

    pub fn navigate_down(&mut self) {
        if self.focus != Field::Results {
            self.next_field();
        } else if self.shows_text() {
            self.raw_scroll = self.raw_scroll.saturating_add(1);
        } else if let Some(table) = self.result_table() {
            if self.result_index + 1 < table.row_count() {
                self.result_index += 1;
            }
        }
    }

    pub fn toggle_raw_json(&mut self) {
        self.show_raw_json = !self.show_raw_json;
        self.raw_scroll = 0;
    }

    pub fn toggle_escaping(&mut self) {
        self.escaping = match self.escaping {
            FilterEscaping::Raw => FilterEscaping::DoubleQuotes,
            FilterEscaping::DoubleQuotes => FilterEscaping::Raw,
        };
        self.message = Some(match self.escaping {
            FilterEscaping::Raw => "Filter quotes sent as typed".to_string(),
            FilterEscaping::DoubleQuotes => {
                "Filter quotes doubled (differs from plain interpolation)".to_string()
            }
        });
    }

    /// Export current query results
    pub fn export_query_results(&mut self) {
        let Some(table) = self.result_table().filter(|t| !t.is_empty()) else {
            self.message = Some("No results to export".to_string());
            return;
        };

        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let format = ExportFormat::Csv;
        let path_str = format!(
            "exports/{}_{}.{}",
            self.entity.wire_name(),
            timestamp,
            format.extension()
        );
        let path = std::path::Path::new(&path_str);

        let message = match export_results(table, format, path) {
            Ok(p) => format!("Exported to {}", p),
            Err(e) => format!("Export failed: {}", e),
        };
        self.message = Some(message);
    }

    /// Non-secret form values as settings
    pub fn settings(&self) -> Config {
        Config {
            base_url: self.base_url.trim().trim_end_matches('/').to_string(),
            entity: self.entity,
            top: self.top(),
            timeout_secs: self.client.timeout().as_secs(),
            escape_filter: self.escaping == FilterEscaping::DoubleQuotes,
        }
    }

    /// Persist the form (without the API key)
    pub fn save_settings(&mut self) {
        self.message = Some(match self.settings().save() {
            Ok(path) => format!("Settings saved to {}", path.display()),
            Err(e) => format!("Could not save settings: {}", e),
        });
    }

    /// Clear the feedback message
    pub fn clear_message(&mut self) {
        self.message = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn app() -> App {
        let client = Arc::new(ODataClient::new(Duration::from_secs(5)).unwrap());
        App::new(client, KeyBindings::Arrows, &Config::default())
    }

    #[test]
    fn test_form_builds_config() {
        let mut app = app();
        app.api_key = "abc".to_string();
        app.filter = "TG11".to_string();
        app.top_input = "250".to_string();

        let config = app.build_config();
        assert_eq!(config.top(), 100);
        assert_eq!(config.filter(), Some("TG11"));
        assert_eq!(config.to_request().unwrap().header("APIKey"), Some("abc"));
        assert!(config.build_url().starts_with(crate::models::DEFAULT_BASE_URL));
    }

    #[test]
    fn test_filter_is_sent_as_typed() {
        let mut app = app();
        app.api_key = "abc".to_string();
        app.filter = " TG11".to_string();
        assert_eq!(app.build_config().filter(), Some(" TG11"));

        app.filter = "   ".to_string();
        assert_eq!(app.build_config().filter(), Some("   "));

        app.filter.clear();
        assert_eq!(app.build_config().filter(), None);
    }

    #[test]
    fn test_top_field_accepts_digits_only() {
        let mut app = app();
        app.focus = Field::Top;
        app.top_input.clear();
        for c in "4x2z9".chars() {
            app.push_char(c);
        }
        assert_eq!(app.top_input, "429");
        app.stop_editing();
        assert_eq!(app.top_input, "100");

        app.top_input.clear();
        assert_eq!(app.top(), MIN_TOP);
    }

    #[test]
    fn test_adjust_selectors() {
        let mut app = app();
        app.focus = Field::Entity;
        app.adjust(true);
        assert_eq!(app.entity, EntitySet::ProductDescription);

        app.focus = Field::Top;
        app.top_input = "100".to_string();
        app.adjust(true);
        assert_eq!(app.top_input, "100");
        app.top_input = "1".to_string();
        app.adjust(false);
        assert_eq!(app.top_input, "1");
    }

    #[test]
    fn test_editing_only_on_text_fields() {
        let mut app = app();
        app.focus = Field::Entity;
        app.start_editing();
        assert_eq!(app.input_mode, InputMode::Normal);

        app.focus = Field::Filter;
        app.start_editing();
        assert_eq!(app.input_mode, InputMode::Editing);
        app.push_char('A');
        app.pop_char();
        app.push_char('B');
        assert_eq!(app.filter, "B");
    }

    #[tokio::test]
    async fn test_run_without_key_skips_request() {
        let mut app = app();
        app.run_query().await;

        assert_eq!(app.outcome, Outcome::Error(QueryError::MissingCredential));
        assert_eq!(app.last_url, None);
        assert_eq!(app.state, AppState::Done);
    }

    #[tokio::test]
    async fn test_run_query_fills_table() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/A_Product"))
            .and(query_param("$top", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"d":{"results":[{"Product":"A"},{"Product":"B"}]}}"#,
            ))
            .mount(&mock_server)
            .await;

        let mut app = app();
        app.base_url = mock_server.uri();
        app.api_key = "key".to_string();
        app.run_query().await;

        let table = app.result_table().expect("rows");
        assert_eq!(table.row_count(), 2);
        assert_eq!(app.message.as_deref(), Some("Fetched 2 records"));
        assert!(app.last_url.as_deref().unwrap().ends_with("A_Product?$top=5&$format=json"));

        app.focus = Field::Results;
        app.navigate_down();
        app.navigate_down();
        assert_eq!(app.result_index, 1);
    }

    #[test]
    fn test_failure_outcome() {
        let mut app = app();
        app.apply_result(Ok(ODataResult::Failure {
            status: 401,
            body: "denied".to_string(),
        }));
        assert_eq!(app.message.as_deref(), Some("Request failed: 401"));
        assert!(app.result_table().is_none());
    }

    #[test]
    fn test_failure_body_scrolls() {
        let mut app = app();
        app.apply_result(Ok(ODataResult::Failure {
            status: 500,
            body: "line\n".repeat(80),
        }));
        app.focus = Field::Results;
        app.navigate_down();
        app.navigate_down();
        app.navigate_up();
        assert_eq!(app.raw_scroll, 1);
    }

    #[test]
    fn test_columns_scroll_within_bounds() {
        let mut app = app();
        let records = vec![
            serde_json::json!({"Product": "A", "ProductType": "FERT", "BaseUnit": "PC"})
                .as_object()
                .unwrap()
                .clone(),
        ];
        app.apply_result(Ok(ODataResult::Rows(records)));
        app.focus = Field::Results;

        app.adjust(false);
        assert_eq!(app.column_offset, 0);
        for _ in 0..5 {
            app.adjust(true);
        }
        assert_eq!(app.column_offset, 2);

        app.toggle_raw_json();
        app.adjust(false);
        assert_eq!(app.column_offset, 2);
    }

    #[test]
    fn test_settings_exclude_key() {
        let mut app = app();
        app.api_key = "secret".to_string();
        app.base_url = "https://example.test/svc/".to_string();
        app.toggle_escaping();

        let settings = app.settings();
        assert_eq!(settings.base_url, "https://example.test/svc");
        assert!(settings.escape_filter);
        assert_eq!(settings.timeout_secs, 5);
    }
}
