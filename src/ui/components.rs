//! UI rendering components

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};

use super::app::{App, AppState, Field, Outcome};
use super::input::InputMode;
use crate::error::QueryError;
use crate::models::{FilterEscaping, QueryResult};

/// Narrowest and widest a result column is drawn
const MIN_COLUMN_WIDTH: usize = 6;
const MAX_COLUMN_WIDTH: usize = 30;

/// OData tips shown in the help popup
const ODATA_TIPS: &[(&str, &str)] = &[
    ("$top=N", "Only return the first N records."),
    ("$filter", "Like SQL WHERE, e.g. ProductType eq 'ZFRT'."),
    ("$select", "Like SQL SELECT, e.g. $select=Product,ProductType returns only those fields."),
    ("$expand", "Like SQL JOIN, e.g. fetch a product together with its plant data."),
];

/// Render the complete UI
pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Main content
            Constraint::Length(3), // Status bar
        ])
        .split(frame.area());

    render_header(frame, app, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(44), Constraint::Min(0)])
        .split(chunks[1]);

    render_form(frame, app, body[0]);
    render_results(frame, app, body[1]);
    render_status_bar(frame, app, chunks[2]);

    if app.show_help {
        render_help_popup(frame);
    }
}

/// Render the header with the request URL
fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let url = app
        .last_url
        .as_deref()
        .unwrap_or("(no request sent yet, press F5 to run)");

    let header = Paragraph::new(Line::from(vec![
        Span::styled("GET ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw(url),
    ]))
    .block(Block::default().borders(Borders::ALL).title(" oprobe: Product OData Tester "));

    frame.render_widget(header, area);
}

/// Render the configuration form
fn render_form(frame: &mut Frame, app: &App, area: Rect) {
    let masked_key = "•".repeat(app.api_key.chars().count());
    let escaping = match app.escaping {
        FilterEscaping::Raw => "as typed",
        FilterEscaping::DoubleQuotes => "quotes doubled",
    };

    let fields = [
        (Field::ApiKey, masked_key),
        (Field::BaseUrl, app.base_url.clone()),
        (Field::Entity, format!("◀ {} ▶", app.entity.wire_name())),
        (Field::Top, app.top_input.clone()),
        (Field::Filter, app.filter.clone()),
    ];

    let mut lines: Vec<Line> = Vec::new();
    for (field, value) in fields {
        let focused = app.focus == field;
        let editing = focused && app.input_mode == InputMode::Editing;

        let label_style = if focused {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        let value_style = if editing {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::White)
        };

        let marker = if focused { "▶ " } else { "  " };
        lines.push(Line::from(Span::styled(
            format!("{}{}", marker, field.label()),
            label_style,
        )));
        let cursor = if editing { "▏" } else { "" };
        lines.push(Line::from(Span::styled(
            format!("    {}{}", value, cursor),
            value_style,
        )));
        lines.push(Line::from(""));
    }

    lines.push(Line::from(Span::styled(
        format!("  Filter quotes: {}", escaping),
        Style::default().fg(Color::DarkGray),
    )));
    lines.push(Line::from(Span::styled(
        format!("  Entity: {}", app.entity.label()),
        Style::default().fg(Color::DarkGray),
    )));

    let border_style = if app.focus == Field::Results {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::Cyan)
    };

    let form = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Configuration ")
                .title_bottom(" Enter: Edit │ ←→ Change ")
                .border_style(border_style),
        )
        .wrap(Wrap { trim: false });

    frame.render_widget(form, area);
}

/// Render the result pane for the last outcome
fn render_results(frame: &mut Frame, app: &App, area: Rect) {
    if app.state == AppState::Loading {
        let loading = Paragraph::new("Loading...")
            .style(Style::default().fg(Color::Yellow))
            .block(Block::default().borders(Borders::ALL).title(" Results "));
        frame.render_widget(loading, area);
        return;
    }

    match &app.outcome {
        Outcome::None => {
            let paragraph = Paragraph::new("Fill in the form and press F5 to send the request.\nPress ? for OData tips.")
                .style(Style::default().fg(Color::DarkGray))
                .block(Block::default().borders(Borders::ALL).title(" Results "));
            frame.render_widget(paragraph, area);
        }
        Outcome::Empty => {
            let paragraph = Paragraph::new(
                "The request succeeded but returned no data (it may have been filtered out).",
            )
            .style(Style::default().fg(Color::Yellow))
            .block(Block::default().borders(Borders::ALL).title(" Results "))
            .wrap(Wrap { trim: true });
            frame.render_widget(paragraph, area);
        }
        Outcome::Failure { status, body } => {
            let mut text = Text::from(vec![
                Line::from(Span::styled(
                    format!("Request failed: {}", status),
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
            ]);
            text.extend(Text::from(body.as_str()));
            let paragraph = Paragraph::new(text)
                .block(Block::default().borders(Borders::ALL).title(" Error "))
                .wrap(Wrap { trim: false })
                .scroll((app.raw_scroll, 0));
            frame.render_widget(paragraph, area);
        }
        Outcome::Error(err) => {
            let hint = match err {
                QueryError::MissingCredential => "Enter your API key in the form on the left.",
                _ => "",
            };
            let text = vec![
                Line::from(Span::styled(
                    err.to_string(),
                    Style::default().fg(Color::Red),
                )),
                Line::from(""),
                Line::from(hint),
            ];
            let paragraph = Paragraph::new(text)
                .block(Block::default().borders(Borders::ALL).title(format!(" {} ", err.category())))
                .wrap(Wrap { trim: true });
            frame.render_widget(paragraph, area);
        }
        Outcome::Rows(_) if app.show_raw_json => render_raw_json(frame, app, area),
        Outcome::Rows(_) => render_result_table(frame, app, area),
    }
}

/// Render the records as a table
fn render_result_table(frame: &mut Frame, app: &App, area: Rect) {
    let Some(result) = app.result_table() else {
        return;
    };

    // Borders and the highlight symbol take four cells
    let available = area.width.saturating_sub(4) as usize;
    let start = app.column_offset.min(result.columns.len().saturating_sub(1));
    let widths = visible_column_widths(result, start, available);
    let end = start + widths.len();

    let header = Row::new(result.columns[start..end].to_vec())
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .bottom_margin(1);

    let rows: Vec<Row> = result
        .rows
        .iter()
        .map(|row| Row::new(row[start..end].to_vec()))
        .collect();

    let focused = app.focus == Field::Results;
    let title = format!(
        " Results ({} rows, columns {}-{} of {}) {} ",
        result.row_count(),
        start + 1,
        end,
        result.columns.len(),
        if focused { "[ACTIVE]" } else { "" }
    );
    let border_style = if focused {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let widths: Vec<Constraint> = widths.into_iter().map(Constraint::Length).collect();
    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .title_bottom(" ←→: Columns │ v: Raw JSON │ x: Export CSV ")
                .border_style(border_style),
        )
        .row_highlight_style(
            Style::default()
                .bg(Color::Rgb(50, 50, 80))
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▶ ");

    let mut table_state = TableState::default();
    table_state.select(Some(app.result_index));

    frame.render_stateful_widget(table, area, &mut table_state);
}

/// Widths of the columns from `start` that fit into `available` cells, at least one
fn visible_column_widths(result: &QueryResult, start: usize, available: usize) -> Vec<u16> {
    let mut widths = Vec::new();
    let mut used = 0;

    for (i, column) in result.columns.iter().enumerate().skip(start) {
        let width = result
            .rows
            .iter()
            .map(|row| row[i].chars().count())
            .chain(std::iter::once(column.chars().count()))
            .max()
            .unwrap_or(0)
            .clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH);

        // One cell of spacing between columns
        let needed = if widths.is_empty() { width } else { width + 1 };
        if !widths.is_empty() && used + needed > available {
            break;
        }
        used += needed;
        widths.push(width as u16);
    }

    widths
}

/// Render the records as pretty JSON
fn render_raw_json(frame: &mut Frame, app: &App, area: Rect) {
    let raw = app
        .result_table()
        .and_then(|r| r.raw_json.as_deref())
        .unwrap_or("[]");

    let paragraph = Paragraph::new(raw)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Raw JSON ")
                .title_bottom(" v: Table "),
        )
        .scroll((app.raw_scroll, 0));

    frame.render_widget(paragraph, area);
}

/// Render the status bar
fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let state_indicator = match (&app.state, &app.outcome) {
        (AppState::Loading, _) => Span::styled(" ● Loading ", Style::default().fg(Color::Yellow)),
        (AppState::Idle, _) => Span::styled(" ● Idle ", Style::default().fg(Color::DarkGray)),
        (AppState::Done, Outcome::Rows(_)) => {
            Span::styled(" ● OK ", Style::default().fg(Color::Green))
        }
        (AppState::Done, Outcome::Empty) => {
            Span::styled(" ● Empty ", Style::default().fg(Color::Yellow))
        }
        (AppState::Done, _) => Span::styled(" ● Error ", Style::default().fg(Color::Red)),
    };

    let hint = match app.input_mode {
        InputMode::Editing => "Enter/Esc: Done".to_string(),
        InputMode::Normal => {
            "F5: Run │ Tab: Next │ e: Escaping │ s: Save │ ?: Tips │ q: Quit".to_string()
        }
    };

    let message = app.message.as_deref().unwrap_or("");

    let status = Line::from(vec![
        state_indicator,
        Span::raw(format!("│ {} ", hint)),
        Span::styled(format!("│ {}", message), Style::default().fg(Color::Magenta)),
    ]);

    let paragraph = Paragraph::new(status).block(Block::default().borders(Borders::ALL));
    frame.render_widget(paragraph, area);
}

/// Render the OData tips popup
fn render_help_popup(frame: &mut Frame) {
    let height = ODATA_TIPS.len() as u16 * 2 + 3;
    let area = centered_rect(60, height, frame.area());

    frame.render_widget(Clear, area);

    let mut lines: Vec<Line> = Vec::new();
    for (option, text) in ODATA_TIPS {
        lines.push(Line::from(Span::styled(
            *option,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(format!("  {}", text)));
    }

    let popup = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" OData Tips (? or Esc to close) ")
                .style(Style::default().fg(Color::White)),
        )
        .wrap(Wrap { trim: false });

    frame.render_widget(popup, area);
}

/// Create a centered rectangle
fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(r.height.saturating_sub(height) / 2),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ODataClient;
    use crate::config::Config;
    use crate::models::ODataResult;
    use crate::ui::KeyBindings;
    use ratatui::{backend::TestBackend, Terminal};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn draw(app: &mut App) -> String {
        let backend = TestBackend::new(140, 30);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| render(f, app)).unwrap();

        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    fn app() -> App {
        let client = Arc::new(ODataClient::new(Duration::from_secs(5)).unwrap());
        App::new(client, KeyBindings::Arrows, &Config::default())
    }

    #[test]
    fn test_api_key_is_masked() {
        let mut app = app();
        app.api_key = "topsecret".to_string();
        let screen = draw(&mut app);
        assert!(!screen.contains("topsecret"));
        assert!(screen.contains("A_Product"));
    }

    #[test]
    fn test_rows_render_as_table() {
        let mut app = app();
        let records = json!([{"Product": "TG11"}, {"Product": "TG12"}])
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect();
        app.apply_result(Ok(ODataResult::Rows(records)));

        let screen = draw(&mut app);
        assert!(screen.contains("Results (2 rows,"));
        assert!(screen.contains("TG12"));
    }

    #[test]
    fn test_failure_renders_status_and_body() {
        let mut app = app();
        app.apply_result(Ok(ODataResult::Failure {
            status: 404,
            body: "not found".to_string(),
        }));

        let screen = draw(&mut app);
        assert!(screen.contains("Request failed: 404"));
        assert!(screen.contains("not found"));
    }

    #[test]
    fn test_wide_record_scrolls_to_every_column() {
        let mut app = app();
        let mut record = serde_json::Map::new();
        for i in 1..=41 {
            record.insert(format!("Field{:02}", i), json!(format!("value{:02}", i)));
        }
        record.insert("Product".to_string(), json!("TG11"));
        app.apply_result(Ok(ODataResult::Rows(vec![record])));

        let screen = draw(&mut app);
        assert!(screen.contains("Field01"));
        assert!(screen.contains("value01"));
        assert!(!screen.contains("TG11"));

        app.focus = Field::Results;
        for _ in 0..41 {
            app.adjust(true);
        }
        let screen = draw(&mut app);
        assert!(screen.contains("Product"));
        assert!(screen.contains("TG11"));
        assert!(screen.contains("columns 42-42 of 42"));
    }

    #[test]
    fn test_failure_body_keeps_line_breaks() {
        let mut app = app();
        app.apply_result(Ok(ODataResult::Failure {
            status: 400,
            body: "<error>\n<code>BAD_FILTER</code>\n</error>".to_string(),
        }));

        let screen = draw(&mut app);
        let line = screen
            .lines()
            .find(|l| l.contains("<code>BAD_FILTER</code>"))
            .unwrap();
        assert!(!line.contains("<error>"));
    }

    #[test]
    fn test_help_popup_lists_options() {
        let mut app = app();
        app.show_help = true;
        let screen = draw(&mut app);
        assert!(screen.contains("$expand"));
    }
}
