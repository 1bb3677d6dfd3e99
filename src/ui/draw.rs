use anyhow::Result;
use ratatui::backend::Backend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::line::NORMAL as LINE;
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap};
use ratatui::{Frame, Terminal};

use fnreview::config::RgbColor;
use fnreview::query::PropertyFilter;
use fnreview::record::NodeId;
use fnreview::view::{Column, FormStatus, NoticeLevel, RowMarker, Tab};

use super::app::{App, QueryFocus};

const QUERY_HELP: &str = "Enter: search  Up/Down: switch field  Tab: next tab  Esc: quit";
const LIST_HELP: &str =
    "j/k: nav  Space: check  a: all  c: action  g: execute  x: delete  e: open  q: quit";
const UPDATE_HELP: &str =
    "h/l: record  j/k: field  e: edit  Space: reviewed  s: save  r: reset  q: quit";
const EDITOR_HELP: &str = "Enter: apply  Esc: cancel";
const CONFIRM_HELP: &str = "Y/Enter: confirm  N/Esc: cancel";

pub fn render<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    terminal.draw(|frame| draw_frame(frame, app))?;
    Ok(())
}

fn draw_frame(frame: &mut Frame<'_>, app: &mut App) {
    let size = frame.area();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(size);

    draw_header(frame, layout[0], app);
    match app.view.active_tab() {
        Tab::Query => draw_query(frame, layout[1], app),
        Tab::List => draw_list(frame, layout[1], app),
        Tab::Update => draw_update(frame, layout[1], app),
    }
    draw_footer(frame, layout[2], app);
    draw_confirm_modal(frame, size, app);
}

fn draw_header(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let root = format!("ROOT://{}", app.view.root_path());
    let root_width = display_width(&root);
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(root_width)])
        .split(area);

    frame.render_widget(Paragraph::new(build_tab_header(app)), chunks[0]);
    frame.render_widget(
        Paragraph::new(Span::styled(root, header_text_style(app))),
        chunks[1],
    );
}

fn build_tab_header(app: &App) -> Line<'static> {
    let mut spans: Vec<Span> = Vec::new();
    for (idx, tab) in app.view.visible_tabs().iter().enumerate() {
        if idx > 0 {
            spans.push(Span::styled(" | ".to_string(), header_text_style(app)));
        }
        let text = format!("{}: {}", tab.digit(), tab.title());
        let style = if *tab == app.view.active_tab() {
            selection_style(app)
        } else {
            header_text_style(app)
        };
        spans.push(Span::styled(text, style));
    }
    Line::from(spans)
}

// -----------------------------------------------------------------------------
// Query
// -----------------------------------------------------------------------------

fn draw_query(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(app))
        .title(Span::styled(" SEARCH ", header_text_style(app)));
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let inputs = [
        ("Node Path:", &app.path_input, QueryFocus::Path),
        ("Filter:", &app.filter_input, QueryFocus::Filter),
    ];
    let label_width = inputs.iter().map(|(label, ..)| label.len()).max().unwrap_or(0) + 1;

    let mut lines: Vec<Line> = Vec::new();
    let mut cursor = None;
    for (index, (label, input, focus)) in inputs.iter().enumerate() {
        let active = app.query_focus == *focus;
        let (label_style, value_style) = line_styles(app, active);
        let label = format!("{:width$}", label, width = label_width);
        if active {
            cursor = Some((index, label.len() + input.visual_cursor()));
        }
        lines.push(Line::from(vec![
            Span::styled(label, label_style),
            Span::styled(input.value().to_string(), value_style),
        ]));
    }

    lines.push(Line::from(""));
    let filter = PropertyFilter::parse(app.filter_input.value());
    lines.push(Line::from(Span::styled(
        format!("Matching {}", filter.describe()),
        header_text_style(app),
    )));
    if !filter.ignored.is_empty() {
        lines.push(Line::from(Span::styled(
            format!("Ignored: {}", filter.ignored.join(", ")),
            Style::default().fg(color(app.ui_colors().error)),
        )));
    }
    if let Some(debug) = app.view.debug_info() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("Last query: {}", debug),
            header_text_style(app),
        )));
    }

    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);

    if app.confirm_modal.is_none() {
        if let Some((line, column)) = cursor {
            let x = inner.x.saturating_add(column as u16);
            let y = inner.y.saturating_add(line as u16);
            frame.set_cursor_position((x, y));
        }
    }
}

// -----------------------------------------------------------------------------
// List
// -----------------------------------------------------------------------------

fn draw_list(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let controls = app.view.bulk_controls();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(app));
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(0)])
        .split(inner);

    let select_all = if controls.select_all_checked { "[x]" } else { "[ ]" };
    let action = controls.action.map(|a| a.title()).unwrap_or("none");
    let mut spans = vec![
        Span::styled(format!("{} ", select_all), header_text_style(app)),
        Span::raw(controls.label()),
        Span::styled("   Action: ", header_text_style(app)),
        Span::styled(action.to_uppercase(), selection_style(app)),
    ];
    if controls.execute_enabled {
        spans.push(Span::styled("  [g] EXECUTE", header_text_style(app)));
    }
    if controls.delete_enabled {
        spans.push(Span::styled("  [x] DELETE", header_text_style(app)));
    }
    render_header_with_separator(frame, layout[0], Line::from(spans), app, area.width);

    let mut header_cells = vec![Cell::from(""), Cell::from("")];
    header_cells.extend(Column::ALL.iter().map(|c| Cell::from(c.title())));
    let header = Row::new(header_cells).style(header_text_style(app));

    let rows: Vec<Row> = app
        .view
        .rows()
        .iter()
        .map(|row| {
            let checked = if app.view.is_selected(&row.node_id) { "[x]" } else { "[ ]" };
            let marker = app.view.row_marker(&row.node_id).unwrap_or(RowMarker::Pristine);
            let reviewed = if app.view.row_reviewed(&row.node_id) { "✓" } else { "" };
            let mut cells = vec![
                Cell::from(checked),
                Cell::from(format!("{}{}", marker.label(), reviewed)),
            ];
            cells.extend(row.cells.iter().map(|cell| Cell::from(cell.text.clone())));
            Row::new(cells).style(marker_style(app, marker))
        })
        .collect();

    let widths = [
        Constraint::Length(3),
        Constraint::Length(9),
        Constraint::Length(14),
        Constraint::Length(10),
        Constraint::Length(18),
        Constraint::Length(14),
        Constraint::Length(14),
        Constraint::Percentage(30),
        Constraint::Min(10),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .highlight_style(selection_style(app));

    let mut state = TableState::default();
    if !app.view.rows().is_empty() {
        state.select(Some(app.list_cursor));
    }
    frame.render_stateful_widget(table, layout[1], &mut state);
}

fn marker_style(app: &App, marker: RowMarker) -> Style {
    let colors = app.ui_colors();
    match marker {
        RowMarker::Pristine => Style::default(),
        RowMarker::Edited => Style::default().fg(color(colors.edited)),
        RowMarker::Saved => Style::default().fg(color(colors.saved)),
        RowMarker::Removing => Style::default()
            .fg(color(colors.separator))
            .add_modifier(Modifier::DIM | Modifier::CROSSED_OUT),
    }
}

// -----------------------------------------------------------------------------
// Update
// -----------------------------------------------------------------------------

fn draw_update(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(app));
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(0), Constraint::Length(1)])
        .split(inner);

    render_header_with_separator(frame, layout[0], build_panel_header(app), app, area.width);

    let Some(panel) = app.active_panel() else {
        frame.render_widget(Paragraph::new("No records"), layout[1]);
        return;
    };
    let Some(form) = app.view.form(&panel.node_id) else {
        return;
    };

    // Calculate max label width for alignment (label + colon)
    let label_width = panel
        .fields
        .iter()
        .map(|f| f.label.len() + 1)
        .max()
        .unwrap_or(0);

    let mut lines: Vec<Line> = Vec::new();
    let mut cursor = None;
    for (idx, field) in panel.fields.iter().enumerate() {
        let highlight = idx == app.field_cursor;
        let editing = app.is_editing(field.field);
        let (label_style, value_style) = line_styles(app, highlight || editing);
        let label = format!("{:width$} ", format!("{}:", field.label), width = label_width);

        let value = if editing {
            cursor = Some((lines.len(), label.len() + app.editor.visual_cursor()));
            app.editor.value().to_string()
        } else {
            form.value(field.field).to_string()
        };
        let value_style = if field.read_only && !highlight {
            value_style.add_modifier(Modifier::DIM)
        } else {
            value_style
        };

        lines.push(Line::from(vec![
            Span::styled(label, label_style),
            Span::styled(value, value_style),
        ]));
    }
    let reviewed = if form.reviewed() { "[x]" } else { "[ ]" };
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!("{} Reviewed", reviewed),
        header_text_style(app),
    )));

    frame.render_widget(Paragraph::new(lines), layout[1]);

    if let Some((line, column)) = cursor {
        let x = layout[1].x.saturating_add(column as u16);
        let y = layout[1].y.saturating_add(line as u16);
        frame.set_cursor_position((x, y));
    }

    draw_form_status(frame, layout[2], app, &panel.node_id);
}

fn build_panel_header(app: &App) -> Line<'static> {
    let active = app.view.active_panel_index();
    let mut spans: Vec<Span> = Vec::new();
    for (idx, panel) in app.view.panels().iter().enumerate() {
        if idx > 0 {
            spans.push(Span::styled(" | ".to_string(), header_text_style(app)));
        }
        let mut text = panel.label.clone();
        if app.view.is_dirty(&panel.node_id) {
            text.push('*');
        }
        let style = if Some(idx) == active {
            selection_style(app)
        } else {
            header_text_style(app)
        };
        spans.push(Span::styled(text, style));
    }
    Line::from(spans)
}

fn draw_form_status(frame: &mut Frame<'_>, area: Rect, app: &App, id: &NodeId) {
    let Some(status) = app.view.form_status(id) else {
        return;
    };
    let Some(controls) = app.view.form_controls(id) else {
        return;
    };
    let colors = app.ui_colors();
    let (text, style) = match status {
        FormStatus::Clean => ("CLEAN", header_text_style(app)),
        FormStatus::Dirty => ("EDITED", Style::default().fg(color(colors.edited))),
        FormStatus::Saving => ("SAVING...", Style::default().fg(color(colors.saved))),
        FormStatus::Deleting => ("DELETING...", Style::default().fg(color(colors.error))),
    };

    let button = |label: &'static str, enabled: bool| {
        let style = if enabled {
            selection_style(app)
        } else {
            header_text_style(app).add_modifier(Modifier::DIM)
        };
        Span::styled(label, style)
    };

    let line = Line::from(vec![
        Span::styled(text, style),
        Span::raw("   "),
        button(" [s] SAVE ", controls.save_enabled),
        Span::raw(" "),
        button(" [r] RESET ", controls.reset_enabled),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

// -----------------------------------------------------------------------------
// Footer and modal
// -----------------------------------------------------------------------------

fn draw_footer(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let colors = app.ui_colors();
    let mut style = Style::default()
        .fg(color(colors.status_fg))
        .bg(color(colors.status_bg));

    let message = if app.confirm_modal.is_some() {
        CONFIRM_HELP.to_string()
    } else if app.editor.active {
        EDITOR_HELP.to_string()
    } else if let Some(notice) = app.view.notices().latest() {
        if notice.level == NoticeLevel::Error {
            style = style.fg(color(colors.error));
        }
        match app.view.notices().errors().count() {
            0 | 1 => notice.message.clone(),
            errors => format!("{} [{} errors]", notice.message, errors),
        }
    } else {
        match app.view.active_tab() {
            Tab::Query => QUERY_HELP.to_string(),
            Tab::List => LIST_HELP.to_string(),
            Tab::Update => UPDATE_HELP.to_string(),
        }
    };

    let background = Block::default().style(Style::default().bg(color(colors.status_bg)));
    frame.render_widget(background, area);
    frame.render_widget(Paragraph::new(message).style(style), area);
}

fn draw_confirm_modal(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let Some(modal) = app.confirm_modal.as_ref() else { return; };

    let mut width = area.width.saturating_mul(2).saturating_div(3);
    let min_width = area.width.min(30);
    if width < min_width { width = min_width; }
    if width > area.width { width = area.width; }
    let height = area.height.min(5);
    let popup = Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    };

    let body = Text::from(vec![
        Line::from(modal.message.clone()),
        Line::from(""),
        Line::from(Span::styled(CONFIRM_HELP, header_text_style(app))),
    ]);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(app))
        .title(Span::styled(modal.title.clone(), header_text_style(app)));

    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(body).block(block).wrap(Wrap { trim: true }),
        popup,
    );
}

// -----------------------------------------------------------------------------
// Styles
// -----------------------------------------------------------------------------

fn line_styles(app: &App, highlight: bool) -> (Style, Style) {
    if highlight {
        let style = selection_style(app);
        (style, style)
    } else {
        (header_text_style(app), Style::default())
    }
}

fn selection_style(app: &App) -> Style {
    let colors = app.ui_colors();
    Style::default()
        .fg(color(colors.selection_fg))
        .bg(color(colors.selection_bg))
}

fn border_style(app: &App) -> Style {
    let colors = app.ui_colors();
    Style::default().fg(color(colors.border))
}

fn header_text_style(app: &App) -> Style {
    let colors = app.ui_colors();
    Style::default().fg(color(colors.separator))
}

/// Render a header line with a separator below it.
/// `outer_width` is the full pane width (including borders) for drawing connected separators.
fn render_header_with_separator(
    frame: &mut Frame<'_>,
    area: Rect,
    content: Line<'static>,
    app: &App,
    outer_width: u16,
) {
    if area.width == 0 || area.height == 0 {
        return;
    }

    if area.height == 1 {
        frame.render_widget(Paragraph::new(content), area);
        return;
    }

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(area);

    frame.render_widget(Paragraph::new(content), layout[0]);

    // Build separator with connector characters: ├───┤
    let inner_width = outer_width.saturating_sub(2) as usize;
    let separator = format!(
        "{}{}{}",
        LINE.vertical_right,
        LINE.horizontal.repeat(inner_width),
        LINE.vertical_left
    );
    let separator_line = Line::from(Span::styled(separator, header_text_style(app)));

    let separator_area = Rect {
        x: layout[1].x.saturating_sub(1),
        y: layout[1].y,
        width: outer_width,
        height: 1,
    };
    frame.render_widget(Paragraph::new(separator_line), separator_area);
}

fn color(rgb: RgbColor) -> Color {
    Color::Rgb(rgb.r, rgb.g, rgb.b)
}

/// Display columns for `text` plus one cell of padding.
fn display_width(text: &str) -> u16 {
    u16::try_from(Span::raw(text).width())
        .unwrap_or(u16::MAX)
        .saturating_add(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_width_counts_columns() {
        assert_eq!(display_width("ROOT://C:\\"), 11);
        assert_eq!(display_width("ROOT://é"), 9);
        assert_eq!(display_width("ROOT://日本"), 12);
        assert_eq!(display_width(&"x".repeat(70_000)), u16::MAX);
    }
}
