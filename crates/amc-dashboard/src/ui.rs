use amc_core::{AggregateStats, AssistantStatus, ProjectSummary, ResourceSnapshot};
use chrono::{DateTime, Utc};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, DetailPane};
use crate::theme::{
    availability_color, health_color, load_color, mission_theme, Theme, SELECTED_STYLE,
};

const METER_WIDTH: usize = 12;
const COMPACT_WIDTH: u16 = 100;

pub fn render(frame: &mut Frame, app: &mut App) {
    let size = frame.size();
    let theme = mission_theme();
    frame.render_widget(Block::default().style(Style::default().bg(theme.bg)), size);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(7),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(size);

    frame.render_widget(render_header(app, theme, Utc::now()), rows[0]);

    let panels = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(36),
            Constraint::Percentage(34),
            Constraint::Percentage(30),
        ])
        .split(rows[1]);
    frame.render_widget(
        panel(assistant_lines(app.view.assistants.as_ref(), theme), "AI Assistants", theme),
        panels[0],
    );
    frame.render_widget(
        panel(resource_lines(app.view.resources.as_ref(), theme), "System Resources", theme),
        panels[1],
    );
    frame.render_widget(
        panel(stats_lines(app.view.stats.as_ref(), theme), "Overview", theme),
        panels[2],
    );

    let body = if size.width < COMPACT_WIDTH {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(100)])
            .split(rows[2])
    } else {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
            .split(rows[2])
    };
    render_project_list(frame, app, theme, body[0]);
    if let Some(area) = body.get(1) {
        frame.render_widget(
            panel(breakdown_lines(app.view.stats.as_ref(), theme), "Tech Stack", theme),
            *area,
        );
    }

    frame.render_widget(render_footer(app, theme), rows[3]);

    if let Some(detail) = app.detail.as_ref() {
        render_detail_overlay(frame, detail, theme);
    }
    if app.help_open {
        render_help_overlay(frame, theme);
    }
}

fn panel<'a>(lines: Vec<Line<'a>>, title: &'a str, theme: Theme) -> Paragraph<'a> {
    Paragraph::new(Text::from(lines))
        .style(Style::default().fg(theme.text).bg(theme.surface))
        .block(titled_block(title, theme))
        .wrap(Wrap { trim: true })
}

fn titled_block(title: impl Into<String>, theme: Theme) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border))
        .style(Style::default().bg(theme.surface))
        .title(Span::styled(
            title.into(),
            Style::default()
                .fg(theme.title)
                .add_modifier(Modifier::BOLD),
        ))
}

fn render_header(app: &App, theme: Theme, now: DateTime<Utc>) -> Paragraph<'static> {
    let mut spans = vec![
        Span::styled(
            "AI Mission Control",
            Style::default()
                .fg(theme.title)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(app.base_url.clone(), Style::default().fg(theme.muted)),
    ];
    if app.view.loading {
        spans.push(Span::styled("  loading", Style::default().fg(theme.warn)));
    }
    if app.view.scanning {
        spans.push(Span::styled("  scanning", Style::default().fg(theme.accent)));
    }
    let ages = Line::from(vec![
        Span::styled("projects ", Style::default().fg(theme.muted)),
        Span::raw(format_age(app.view.projects_updated_at, now)),
        Span::styled("  heartbeat ", Style::default().fg(theme.muted)),
        Span::raw(format_age(app.view.heartbeat_updated_at, now)),
    ]);
    Paragraph::new(Text::from(vec![Line::from(spans), ages]))
        .style(Style::default().fg(theme.text).bg(theme.bg))
        .block(Block::default().borders(Borders::BOTTOM).border_style(Style::default().fg(theme.border)))
}

fn assistant_lines(status: Option<&AssistantStatus>, theme: Theme) -> Vec<Line<'static>> {
    let Some(status) = status else {
        return vec![waiting_line("waiting for heartbeat", theme)];
    };
    let planner = &status.desktop_commander;
    let mut planner_spans = vec![
        label_span("Desktop Commander ", theme),
        dot_span(planner.available, theme),
        Span::raw(format!(" {}", planner.model)),
    ];
    if planner.rate_limited {
        planner_spans.push(Span::styled(" rate limited", Style::default().fg(theme.warn)));
    }

    let coder = &status.cline;
    let server = &status.lmstudio;
    vec![
        Line::from(planner_spans),
        Line::from(Span::styled("  cloud, planning", Style::default().fg(theme.muted))),
        Line::from(vec![
            label_span("Cline             ", theme),
            dot_span(coder.connected, theme),
            Span::raw(format!(" {}", coder.model_label())),
        ]),
        Line::from(vec![
            label_span("LM Studio         ", theme),
            dot_span(server.online, theme),
            Span::raw(format!(" {} models loaded", server.loaded_models())),
        ]),
    ]
}

fn resource_lines(resources: Option<&ResourceSnapshot>, theme: Theme) -> Vec<Line<'static>> {
    let Some(resources) = resources else {
        return vec![waiting_line("waiting for heartbeat", theme)];
    };
    vec![
        meter_line("CPU   ", resources.cpu_percent, resources.cpu_ratio(), String::new(), theme),
        meter_line(
            "Memory",
            resources.memory_percent,
            resources.memory_ratio(),
            format!(" {:.1} GB available", resources.memory_available_gb),
            theme,
        ),
        meter_line(
            "Disk  ",
            resources.disk_percent,
            resources.disk_ratio(),
            format!(" {:.1} GB free", resources.disk_free_gb),
            theme,
        ),
    ]
}

fn meter_line(
    label: &'static str,
    percent: f64,
    ratio: f64,
    suffix: String,
    theme: Theme,
) -> Line<'static> {
    Line::from(vec![
        label_span(label, theme),
        Span::raw(" "),
        Span::styled(meter(ratio, METER_WIDTH), Style::default().fg(load_color(ratio, theme))),
        Span::raw(format!(" {percent:>5.1}%")),
        Span::styled(suffix, Style::default().fg(theme.muted)),
    ])
}

fn stats_lines(stats: Option<&AggregateStats>, theme: Theme) -> Vec<Line<'static>> {
    let Some(stats) = stats else {
        return vec![waiting_line("no stats yet", theme)];
    };
    vec![
        Line::from(vec![
            label_span("Total projects ", theme),
            Span::raw(stats.total_projects.to_string()),
        ]),
        Line::from(vec![
            label_span("Avg health     ", theme),
            Span::styled(
                stats.average_health_rounded().to_string(),
                Style::default().fg(health_color(
                    stats.average_health_rounded().min(100) as u8,
                    theme,
                )),
            ),
        ]),
        Line::from(vec![
            label_span("Git repos      ", theme),
            Span::raw(stats.has_git.to_string()),
        ]),
        Line::from(vec![
            label_span("Tech stacks    ", theme),
            Span::raw(stats.tech_stack_count().to_string()),
        ]),
    ]
}

fn breakdown_lines(stats: Option<&AggregateStats>, theme: Theme) -> Vec<Line<'static>> {
    let Some(stats) = stats else {
        return Vec::new();
    };
    let stacks = stats.tech_stack_entries();
    let peak = stacks.first().map(|(_, count)| *count).unwrap_or(0).max(1);
    let mut lines: Vec<Line<'static>> = stacks
        .into_iter()
        .map(|(name, count)| {
            Line::from(vec![
                Span::raw(format!("{name:<12} ")),
                Span::styled(
                    meter(count as f64 / peak as f64, 8),
                    Style::default().fg(theme.accent),
                ),
                Span::raw(format!(" {count}")),
            ])
        })
        .collect();
    let types = stats.project_type_entries();
    if !types.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Project types",
            Style::default()
                .fg(theme.title)
                .add_modifier(Modifier::BOLD),
        )));
        lines.extend(
            types
                .into_iter()
                .map(|(name, count)| Line::from(format!("{name:<12} {count}"))),
        );
    }
    lines
}

fn render_project_list(frame: &mut Frame, app: &mut App, theme: Theme, area: Rect) {
    let total = app.view.project_list().len();
    let shown = app.visible_projects().len();
    let title = if total > shown {
        format!("Projects ({shown} of {total})")
    } else {
        format!("Projects ({total})")
    };
    let block = titled_block(title, theme);

    if shown == 0 {
        let message = if app.view.loading {
            "Loading projects..."
        } else {
            "No projects. Press s to scan."
        };
        frame.render_widget(
            Paragraph::new(message)
                .style(Style::default().fg(theme.muted).bg(theme.surface))
                .block(block),
            area,
        );
        return;
    }

    let items: Vec<ListItem> = app
        .visible_projects()
        .iter()
        .map(|project| ListItem::new(project_line(project, theme)))
        .collect();
    let list = List::new(items)
        .block(block)
        .style(Style::default().fg(theme.text).bg(theme.surface))
        .highlight_style(SELECTED_STYLE)
        .highlight_symbol(">> ");
    frame.render_stateful_widget(list, area, &mut app.list_state);
}

fn project_line(project: &ProjectSummary, theme: Theme) -> Line<'static> {
    let health = project.health();
    let mut spans = vec![
        Span::styled(
            format!("{:<20}", ellipsize(&project.name, 20)),
            Style::default()
                .fg(theme.title)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(" {:<10}", ellipsize(project.display_kind(), 10)),
            Style::default().fg(theme.muted),
        ),
        Span::styled(
            format!(" {health:>3}"),
            Style::default().fg(health_color(health, theme)),
        ),
        Span::raw(format!("  {}", ellipsize(&project.stack.join(", "), 24))),
    ];
    if let Some(changes) = project.change_indicator() {
        spans.push(Span::styled(
            format!("  {changes}"),
            Style::default().fg(theme.warn),
        ));
    }
    Line::from(spans)
}

fn render_footer(app: &App, theme: Theme) -> Paragraph<'static> {
    match app.status_note.as_ref() {
        Some(note) => Paragraph::new(note.clone()).style(Style::default().fg(theme.warn).bg(theme.bg)),
        None => Paragraph::new("q quit  j/k select  o open  i detail  s scan  r refresh  ? help")
            .style(Style::default().fg(theme.muted).bg(theme.bg)),
    }
}

fn render_detail_overlay(frame: &mut Frame, detail: &DetailPane, theme: Theme) {
    let area = centered_rect(64, 60, frame.size());
    let lines = match detail {
        DetailPane::Loading(name) => vec![Line::from(format!("Loading {name}..."))],
        DetailPane::Ready(project) => detail_lines(project, theme),
    };
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(Text::from(lines))
            .style(Style::default().fg(theme.text).bg(theme.surface))
            .block(titled_block("Project", theme))
            .wrap(Wrap { trim: false }),
        area,
    );
}

fn detail_lines(project: &ProjectSummary, theme: Theme) -> Vec<Line<'static>> {
    let field = |label: &'static str, value: String| {
        Line::from(vec![label_span(label, theme), Span::raw(value)])
    };
    let mut lines = vec![
        Line::from(Span::styled(
            project.name.clone(),
            Style::default()
                .fg(theme.title)
                .add_modifier(Modifier::BOLD),
        )),
        field("Path      ", project.path.clone()),
        field("Type      ", project.display_kind().to_string()),
        field("Health    ", project.health().to_string()),
        field("Stack     ", project.stack.join(", ")),
        field("Git       ", if project.has_git { "yes" } else { "no" }.to_string()),
        field("README    ", if project.has_readme { "yes" } else { "no" }.to_string()),
        field("Size      ", format_bytes(project.size)),
    ];
    if let Some(changes) = project.change_indicator() {
        lines.push(field("Changes   ", changes));
    }
    if let Some(package) = project.package_name.as_ref() {
        let version = project.version.as_deref().unwrap_or("?");
        lines.push(field("Package   ", format!("{package} {version}")));
    }
    if let Some(modified) = project.last_modified_at() {
        lines.push(field("Modified  ", modified.format("%Y-%m-%d %H:%M").to_string()));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "o open in editor  Esc close",
        Style::default().fg(theme.muted),
    )));
    lines
}

fn render_help_overlay(frame: &mut Frame, theme: Theme) {
    let area = centered_rect(60, 60, frame.size());
    let lines = vec![
        Line::from(Span::styled(
            "Controls",
            Style::default()
                .fg(theme.title)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from("  j/k, arrows  select project"),
        Line::from("  g            jump to first project"),
        Line::from("  o or Enter   open selected project in editor"),
        Line::from("  i            project detail"),
        Line::from("  s            rescan projects"),
        Line::from("  r            refresh project list"),
        Line::from(""),
        Line::from("  ? or F1      toggle this help"),
        Line::from("  Esc          close overlay"),
        Line::from("  q            quit"),
    ];
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(Text::from(lines))
            .style(Style::default().fg(theme.text).bg(theme.surface))
            .block(titled_block("Help", theme)),
        area,
    );
}

fn label_span(label: &'static str, theme: Theme) -> Span<'static> {
    Span::styled(label, Style::default().fg(theme.muted))
}

fn dot_span(up: bool, theme: Theme) -> Span<'static> {
    Span::styled("●", Style::default().fg(availability_color(up, theme)))
}

fn waiting_line(text: &'static str, theme: Theme) -> Line<'static> {
    Line::from(Span::styled(text, Style::default().fg(theme.muted)))
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100u16.saturating_sub(percent_y)) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100u16.saturating_sub(percent_y)) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100u16.saturating_sub(percent_x)) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100u16.saturating_sub(percent_x)) / 2),
        ])
        .split(vertical[1])[1]
}

pub fn meter(ratio: f64, width: usize) -> String {
    let ratio = if ratio.is_finite() { ratio.clamp(0.0, 1.0) } else { 0.0 };
    let filled = (ratio * width as f64).round() as usize;
    format!("{}{}", "#".repeat(filled), ".".repeat(width - filled))
}

pub fn format_age(at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(at) = at else {
        return "never".to_string();
    };
    let secs = (now - at).num_seconds().max(0);
    match secs {
        0..=59 => format!("{secs}s ago"),
        60..=3599 => format!("{}m ago", secs / 60),
        _ => format!("{}h ago", secs / 3600),
    }
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

fn ellipsize(input: &str, max: usize) -> String {
    if input.chars().count() <= max {
        return input.to_string();
    }
    let mut out: String = input.chars().take(max.saturating_sub(1)).collect();
    out.push('~');
    out
}
