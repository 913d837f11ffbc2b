use tui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Span, Spans, Text},
    widgets::{
        Axis, Block, BorderType, Borders, Cell, Chart, Clear, Dataset, GraphType, Paragraph, Row,
        Table, TableState, Tabs, Wrap,
    },
    Frame,
};

use super::App;
use crate::container_management::{ContainerStatus, Notice, NoticeKind};
use crate::usage::{Metric, SamplerState, UsageSnapshot};

const TABS: [&str; 2] = ["Containers", "Images"];

pub fn draw<B>(rect: &mut Frame<B>, app: &App)
where
    B: Backend,
{
    let size = rect.size();

    // Vertical layout
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(2),
                Constraint::Min(3),
                Constraint::Length(2),
            ]
            .as_ref(),
        )
        .split(size);

    draw_tabs(rect, chunks[0], app);
    draw_body(rect, chunks[1], app);

    if app.search().is_some() {
        draw_search(rect, chunks[2], app.search().unwrap_or_default());
    } else {
        draw_help(rect, chunks[2], format!("{}", app.actions()).as_str());
    }

    if let Some(notice) = app.notice() {
        draw_notice(rect, size, notice);
    }
}

fn draw_tabs<B>(frame: &mut Frame<B>, chunk: Rect, app: &App)
where
    B: Backend,
{
    let titles = TABS.iter().map(|t| Spans::from(Span::raw(*t))).collect();
    let tabs = Tabs::new(titles)
        .block(Block::default().borders(Borders::BOTTOM).title("dockhand"))
        .select(app.state().tab_index())
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::LightCyan)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_widget(tabs, chunk);
}

fn draw_body<B>(frame: &mut Frame<B>, chunk: Rect, app: &App)
where
    B: Backend,
{
    let state = app.state();
    if state.is_containers() {
        draw_containers(frame, chunk, app);
    } else if state.is_images() {
        draw_images(frame, chunk, app);
    } else if state.is_logging() {
        draw_logs(frame, chunk, app);
    } else if state.is_usage() {
        match app.usage() {
            Some(usage) => draw_usage(frame, chunk, usage),
            None => {
                let p = Paragraph::new("Waiting for the first sample...")
                    .style(Style::default().fg(Color::LightCyan))
                    .block(Block::default().borders(Borders::TOP).title(format!(
                        "Live Usage - {}",
                        state.container().unwrap_or_default()
                    )));
                frame.render_widget(p, chunk);
            }
        }
    }
}

fn status_label(status: ContainerStatus) -> Span<'static> {
    let color = match status {
        ContainerStatus::Created => Color::Gray,
        ContainerStatus::Running => Color::Green,
        ContainerStatus::Paused => Color::Yellow,
        ContainerStatus::Exited => Color::Red,
        ContainerStatus::Restarting => Color::LightGreen,
        ContainerStatus::Removing => Color::LightRed,
        ContainerStatus::Dead => Color::Black,
        ContainerStatus::Unknown => Color::DarkGray,
    };
    Span::styled(" ", Style::default().bg(color))
}

fn header(cells: &[&'static str]) -> Row<'static> {
    let header_cells = cells
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::LightCyan)));
    Row::new(header_cells).height(1).bottom_margin(1)
}

fn draw_containers<B>(frame: &mut Frame<B>, chunk: Rect, app: &App)
where
    B: Backend,
{
    let rows = app.containers().iter().map(|c| {
        Row::new(vec![
            Cell::from(status_label(c.state())),
            Cell::from(c.id.clone()),
            Cell::from(c.image.clone()),
            Cell::from(c.status.clone()),
            Cell::from(c.name.clone()),
        ])
    });

    let t = Table::new(rows)
        .header(header(&["", "ID", "IMAGE", "STATUS", "NAME"]))
        .block(Block::default().borders(Borders::NONE))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .widths(&[
            Constraint::Length(1),      // Status
            Constraint::Length(12),     // ID
            Constraint::Percentage(30), // Image
            Constraint::Percentage(25), // Status text
            Constraint::Percentage(25), // Name
        ])
        .column_spacing(2);

    let mut table_state = TableState::default();
    table_state.select(app.selected_container_index());
    frame.render_stateful_widget(t, chunk, &mut table_state);
}

fn draw_images<B>(frame: &mut Frame<B>, chunk: Rect, app: &App)
where
    B: Backend,
{
    let rows = app.images().iter().map(|i| {
        Row::new(vec![
            Cell::from(i.repository.clone()),
            Cell::from(i.tag.clone()),
            Cell::from(i.id.clone()),
            Cell::from(i.size.clone()),
        ])
    });

    let t = Table::new(rows)
        .header(header(&["REPOSITORY", "TAG", "ID", "SIZE"]))
        .block(Block::default().borders(Borders::NONE))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .widths(&[
            Constraint::Percentage(40),
            Constraint::Percentage(20),
            Constraint::Length(14),
            Constraint::Percentage(15),
        ])
        .column_spacing(2);

    let mut table_state = TableState::default();
    table_state.select(app.selected_image_index());
    frame.render_stateful_widget(t, chunk, &mut table_state);
}

/// Splits `line` into pieces of at most `width` chars.
fn wrap_line(line: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    if chars.is_empty() || width == 0 {
        return vec![String::new()];
    }
    chars
        .chunks(width)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

fn highlight<'a>(line: String, search: Option<&str>) -> Spans<'a> {
    let search = match search {
        Some(s) if !s.is_empty() && line.contains(s) => s,
        _ => return Spans::from(line),
    };
    let mut content = vec![];
    let segments: Vec<&str> = line.split(search).collect();
    for (i, segment) in segments.iter().enumerate() {
        content.push(Span::raw(segment.to_string()));
        if i + 1 < segments.len() {
            content.push(Span::styled(
                search.to_string(),
                Style::default().fg(Color::Yellow),
            ));
        }
    }
    Spans::from(content)
}

fn draw_logs<B>(frame: &mut Frame<B>, chunk: Rect, app: &App)
where
    B: Backend,
{
    let available_height = chunk.height.saturating_sub(1) as usize; // -1 for the TOP border
    let available_width = chunk.width as usize;
    let pos = app.log_position();

    let logs = app.logs();
    let end = logs.len().saturating_sub(pos);
    let start = end.saturating_sub(available_height);

    let mut lines: Vec<Spans> = logs[start..end]
        .iter()
        .flat_map(|l| wrap_line(l, available_width))
        .map(|l| highlight(l, app.search()))
        .collect();
    // Wrapped lines may overflow, keep the newest ones visible.
    if lines.len() > available_height {
        lines.drain(..lines.len() - available_height);
    }

    let p = Paragraph::new(Text::from(lines)).block(
        Block::default()
            .borders(Borders::TOP)
            .title(format!(
                "Logs - {}",
                app.state().container().unwrap_or_default()
            )),
    );
    frame.render_widget(p, chunk);
}

fn metric_style(metric: Metric) -> (Style, symbols::Marker) {
    match metric {
        Metric::ContainerCpu => (Style::default().fg(Color::Cyan), symbols::Marker::Braille),
        Metric::ContainerMem => (Style::default().fg(Color::Magenta), symbols::Marker::Braille),
        // Host series are drawn with a sparser marker to tell them apart.
        Metric::SystemCpu => (Style::default().fg(Color::LightRed), symbols::Marker::Dot),
        Metric::SystemMem => (Style::default().fg(Color::LightGreen), symbols::Marker::Dot),
    }
}

/// Y axis upper bound: at least 100, rounded up to a multiple of 10.
fn y_upper_bound(peak: f64) -> f64 {
    if peak <= 100.0 {
        100.0
    } else {
        (peak / 10.0).ceil() * 10.0
    }
}

fn draw_usage<B>(frame: &mut Frame<B>, chunk: Rect, usage: &UsageSnapshot)
where
    B: Backend,
{
    let series = &usage.series;
    let points: Vec<(Metric, Vec<(f64, f64)>)> = Metric::ALL
        .iter()
        .map(|m| (*m, series.points(*m)))
        .collect();

    let datasets = points
        .iter()
        .map(|(metric, data)| {
            let (style, marker) = metric_style(*metric);
            Dataset::default()
                .name(metric.label())
                .marker(marker)
                .graph_type(GraphType::Line)
                .style(style)
                .data(data)
        })
        .collect();

    let first = series.indices().front().copied().unwrap_or(0) as f64;
    let last = first + series.capacity().saturating_sub(1).max(1) as f64;
    let top = y_upper_bound(series.peak());

    let mut title = format!("Live Usage - {}", usage.container_id);
    if usage.state == SamplerState::Stopped {
        title.push_str(" (stopped)");
    }

    let chart = Chart::new(datasets)
        .block(Block::default().borders(Borders::TOP).title(Span::styled(
            title,
            Style::default().add_modifier(Modifier::BOLD),
        )))
        .x_axis(
            Axis::default()
                .title("Tick")
                .style(Style::default().fg(Color::Gray))
                .bounds([first, last])
                .labels(vec![
                    Span::raw(format!("{}", first)),
                    Span::raw(format!("{}", last)),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("%")
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, top])
                .labels(vec![
                    Span::raw("0"),
                    Span::raw(format!("{}", top / 2.0)),
                    Span::raw(format!("{}", top)),
                ]),
        );
    frame.render_widget(chart, chunk);
}

fn draw_help<B>(frame: &mut Frame<B>, chunk: Rect, help_txt: &str)
where
    B: Backend,
{
    let p = Paragraph::new(vec![Spans::from(Span::raw(help_txt))])
        .style(Style::default().fg(Color::LightCyan))
        .alignment(Alignment::Left)
        .block(
            Block::default()
                .borders(Borders::TOP)
                .style(Style::default().fg(Color::White))
                .title("Help")
                .border_type(BorderType::Plain),
        );
    frame.render_widget(p, chunk);
}

fn draw_search<B>(frame: &mut Frame<B>, chunk: Rect, search: &str)
where
    B: Backend,
{
    let p = Paragraph::new(vec![Spans::from(Span::raw(search))])
        .style(Style::default().fg(Color::LightCyan))
        .alignment(Alignment::Left)
        .block(
            Block::default()
                .borders(Borders::TOP)
                .title("Search")
                .style(Style::default().fg(Color::White).bg(Color::Black))
                .border_type(BorderType::Plain),
        );
    frame.render_widget(p, chunk);
}

/// Rect of `percent_x` by `percent_y` centered in `area`.
fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Percentage((100 - percent_y) / 2),
                Constraint::Percentage(percent_y),
                Constraint::Percentage((100 - percent_y) / 2),
            ]
            .as_ref(),
        )
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage((100 - percent_x) / 2),
                Constraint::Percentage(percent_x),
                Constraint::Percentage((100 - percent_x) / 2),
            ]
            .as_ref(),
        )
        .split(vertical[1])[1]
}

fn draw_notice<B>(frame: &mut Frame<B>, area: Rect, notice: &Notice)
where
    B: Backend,
{
    let color = match notice.kind {
        NoticeKind::Info => Color::LightCyan,
        NoticeKind::Warning => Color::Yellow,
        NoticeKind::Error => Color::LightRed,
    };
    let popup = centered_rect(60, 30, area);
    let p = Paragraph::new(notice.body.as_str())
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(color))
                .title(Span::styled(
                    format!(" {} ", notice.title),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                )),
        );
    frame.render_widget(Clear, popup);
    frame.render_widget(p, popup);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container_management::ContainerManagement;
    use crate::usage::{Sample, SeriesBuffer};
    use tui::{backend::TestBackend, Terminal};

    #[test]
    fn wraps_long_lines() {
        assert_eq!(wrap_line("abcdef", 4), vec!["abcd", "ef"]);
        assert_eq!(wrap_line("", 4), vec![""]);
    }

    #[test]
    fn y_axis_grows_past_one_hundred() {
        assert_eq!(y_upper_bound(12.0), 100.0);
        assert_eq!(y_upper_bound(143.2), 150.0);
    }

    #[test]
    fn highlight_splits_on_every_match() {
        let spans = highlight("a-x-b-x".to_string(), Some("x"));
        assert_eq!(spans.0.len(), 5);
        assert_eq!(spans.0[1].content, "x");
        assert_eq!(spans.0[4].content, "");
    }

    #[test]
    fn renders_usage_chart_and_notice() {
        let (tx, _rx) = tokio::sync::mpsc::channel(4);
        let mut app = App::new(tx);
        let mut series = SeriesBuffer::new(60);
        for index in 0..5 {
            series.push(Sample {
                index,
                container_cpu: 12.5,
                container_mem: 34.0,
                system_cpu: 5.0,
                system_mem: 50.0,
            });
        }
        app.notify(Notice::info("Start", "started container abc"));
        let usage = UsageSnapshot {
            container_id: "abc".to_string(),
            state: SamplerState::Running,
            series,
        };

        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal
            .draw(|f| {
                draw(f, &app);
                draw_usage(f, Rect::new(0, 2, 100, 20), &usage);
            })
            .unwrap();
        let buffer = terminal.backend().buffer();
        let text: String = buffer.content().iter().map(|c| c.symbol.as_str()).collect();
        assert!(text.contains("Live Usage - abc"));
        assert!(text.contains("Containers"));
    }
}
