//! Table rendering - thin view over the engine's snapshots

use ratatui::{prelude::*, widgets::*};
use sync_client::ResourceValue;
use tui_logger::{TuiLoggerLevelOutput, TuiLoggerWidget};

use crate::app::App;

pub fn render(frame: &mut Frame, app: &mut App) {
    let [main_area, log_area, help_area] = Layout::vertical([
        Constraint::Min(10),
        Constraint::Length(8),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    let [device_area, sensor_area] =
        Layout::horizontal([Constraint::Percentage(45), Constraint::Percentage(55)])
            .areas(main_area);

    render_device_table(frame, app, device_area);
    render_sensor_table(frame, app, sensor_area);
    render_log_pane(frame, log_area);

    let help = Line::from(vec![
        Span::styled(" q ", Style::new().bold()),
        Span::raw("quit  "),
        Span::styled("↑/↓", Style::new().bold()),
        Span::raw(" move  "),
        Span::styled("Enter", Style::new().bold()),
        Span::raw(" track device  "),
        Span::styled("Backspace", Style::new().bold()),
        Span::raw(" clear  "),
        Span::styled("r", Style::new().bold()),
        Span::raw(" refresh"),
    ]);
    frame.render_widget(Paragraph::new(help).dim(), help_area);
}

fn render_device_table(frame: &mut Frame, app: &mut App, area: Rect) {
    let store = app.devices.store();
    let mut title = "Registered Devices".to_string();
    if !app.push_connected() {
        title.push_str(" [pull-only]");
    }

    let mut block = Block::bordered().title(title);
    if let Some(error) = store.last_error() {
        block = block.title_bottom(
            Line::from(format!(" {} ", error)).style(Style::new().red().bold()),
        );
    }

    let rows: Vec<Row> = app
        .device_rows()
        .iter()
        .map(|value| {
            let status = if value.has_data() {
                Span::styled("Active", Style::new().green())
            } else {
                Span::styled("Inactive", Style::new().dark_gray())
            };
            Row::new(vec![
                Cell::from(value.key.id().to_string()),
                Cell::from(value.attributes.name.clone().unwrap_or_default()),
                Cell::from(value.attributes.kind.clone().unwrap_or_default()),
                Cell::from(status),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(6),
            Constraint::Fill(2),
            Constraint::Fill(1),
            Constraint::Length(10),
        ],
    )
    .header(Row::new(vec!["ID", "Device Name", "Type", "Status"]).style(Style::new().bold()))
    .row_highlight_style(Style::new().reversed())
    .block(block);

    frame.render_stateful_widget(table, area, &mut app.device_table);
}

fn render_sensor_table(frame: &mut Frame, app: &mut App, area: Rect) {
    let Some(session) = &app.sensors else {
        let hint = Paragraph::new("Select a device to view sensors.")
            .block(Block::bordered().title("Sensor Data"))
            .dim();
        frame.render_widget(hint, area);
        return;
    };

    let store = session.store();
    let title = match &app.selected_device {
        Some((_, name)) => format!("Sensor Data for {}", name),
        None => "Sensor Data".to_string(),
    };

    let mut block = Block::bordered().title(title);
    if let Some(error) = store.last_error() {
        block = block.title_bottom(
            Line::from(format!(" {} ", error)).style(Style::new().red().bold()),
        );
    }

    let rows: Vec<Row> = app
        .sensor_rows()
        .iter()
        .map(|value| {
            Row::new(vec![
                Cell::from(value.key.id().to_string()),
                Cell::from(value.attributes.kind.clone().unwrap_or_default()),
                Cell::from(format_value(value)),
                Cell::from(value.attributes.unit.clone().unwrap_or_default()),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(6),
            Constraint::Fill(2),
            Constraint::Fill(1),
            Constraint::Length(8),
        ],
    )
    .header(Row::new(vec!["ID", "Sensor Type", "Latest Value", "Unit"]).style(Style::new().bold()))
    .block(block);

    frame.render_widget(table, area);
}

fn format_value(value: &ResourceValue) -> String {
    match value.number() {
        Some(number) => format!("{:.2}", number),
        None => value.value.to_string(),
    }
}

fn render_log_pane(frame: &mut Frame, area: Rect) {
    let logger = TuiLoggerWidget::default()
        .block(Block::bordered().title("Log"))
        .output_separator(' ')
        .output_timestamp(Some("%H:%M:%S".to_string()))
        .output_level(Some(TuiLoggerLevelOutput::Abbreviated))
        .output_target(false)
        .output_file(false)
        .output_line(false);
    frame.render_widget(logger, area);
}
