use crate::colors::Theme;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Flex, Layout, Rect},
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Padding, Paragraph, Widget, Wrap},
};
use scanwiz_core::{ScanStatus, WizardSelection, WizardStep};
use scanwiz_session::ScanSession;
use std::borrow::Cow;

const SPINNER_FRAMES: [char; 4] = ['◐', '◓', '◑', '◒'];

#[must_use]
pub fn spinner_char(tick: usize) -> char {
    SPINNER_FRAMES[(tick / 3) % SPINNER_FRAMES.len()]
}

pub struct ChoiceItem<'a> {
    pub label: Cow<'a, str>,
    pub detail: Option<Cow<'a, str>>,
}

/// One selectable catalog (models, environments, or probes).
pub struct ChoiceList<'a> {
    pub title: &'a str,
    pub noun: &'a str,
    pub heading: Option<Line<'a>>,
    pub items: Vec<ChoiceItem<'a>>,
    pub cursor: usize,
    pub chosen: Option<&'a str>,
    pub issue: Option<&'a str>,
    pub loading: bool,
    pub tick: usize,
    pub theme: &'a Theme,
}

/// Selection summary, session controls, and the scan log.
pub struct LaunchPanel<'a> {
    pub selection: &'a WizardSelection,
    pub session: &'a ScanSession,
    pub submitting: bool,
    pub rechecking: bool,
    pub can_start: bool,
    pub can_new_scan: bool,
    pub last_error: Option<&'a str>,
    pub scroll: u16,
    pub tick: usize,
    pub theme: &'a Theme,
}

pub enum StepBody<'a> {
    Choices(ChoiceList<'a>),
    Launch(LaunchPanel<'a>),
}

pub struct WizardScreen<'a> {
    pub step: WizardStep,
    pub body: StepBody<'a>,
    pub notice: Option<&'a str>,
    pub keys: &'a [(&'a str, &'a str)],
    pub theme: &'a Theme,
}

impl WizardScreen<'_> {
    fn render_header(&self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Thick)
            .border_style(Style::default().fg(self.theme.accent))
            .style(Style::default().bg(self.theme.surface));

        let inner = block.inner(area);
        block.render(area, buf);

        let mut spans = vec![
            Span::styled(" SCANWIZ ", self.theme.badge(self.theme.accent)),
            Span::raw("  "),
        ];
        for (i, step) in WizardStep::ALL.into_iter().enumerate() {
            if i > 0 {
                spans.push(Span::styled(" › ", Style::default().fg(self.theme.muted)));
            }
            let label = format!(" {} {} ", step.number(), step.title());
            let style = if step == self.step {
                self.theme.badge(self.theme.accent)
            } else if step < self.step {
                Style::default().fg(self.theme.success)
            } else {
                Style::default().fg(self.theme.muted)
            };
            spans.push(Span::styled(label, style));
        }

        let content_area = Layout::vertical([Constraint::Length(1)])
            .flex(Flex::Center)
            .split(inner)[0];
        Paragraph::new(Line::from(spans)).render(content_area, buf);
    }

    fn render_footer(&self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Thick)
            .border_style(Style::default().fg(self.theme.border))
            .style(Style::default().bg(self.theme.surface));

        let inner = block.inner(area);
        block.render(area, buf);

        let key_style = self.theme.badge(self.theme.muted);
        let mut spans = Vec::new();
        if let Some(notice) = self.notice {
            spans.push(Span::styled(
                format!("{notice}  "),
                Style::default().fg(self.theme.warning).bold(),
            ));
        }
        for (key, desc) in self.keys {
            spans.push(Span::styled(format!(" {key} "), key_style));
            spans.push(Span::styled(
                format!(" {desc} "),
                Style::default().fg(self.theme.muted),
            ));
            spans.push(Span::raw(" "));
        }

        let content_area = Layout::vertical([Constraint::Length(1)])
            .flex(Flex::Center)
            .split(inner)[0];
        Paragraph::new(Line::from(spans)).render(content_area, buf);
    }
}

impl Widget for WizardScreen<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Clear.render(area, buf);

        let vertical = Layout::vertical([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(area);

        self.render_header(vertical[0], buf);
        self.render_footer(vertical[2], buf);
        match self.body {
            StepBody::Choices(list) => list.render(vertical[1], buf),
            StepBody::Launch(panel) => panel.render(vertical[1], buf),
        }
    }
}

impl Widget for ChoiceList<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .padding(Padding::new(1, 1, 0, 0))
            .border_type(BorderType::Plain)
            .border_style(Style::default().fg(self.theme.border))
            .style(Style::default().bg(self.theme.surface))
            .title(format!(" {} ", self.title.to_uppercase()))
            .title_style(Style::default().fg(self.theme.accent).bold());

        let mut inner = block.inner(area);
        block.render(area, buf);

        if inner.height == 0 || inner.width == 0 {
            return;
        }

        if let Some(heading) = self.heading {
            let rows = Layout::vertical([Constraint::Length(2), Constraint::Min(0)]).split(inner);
            Paragraph::new(heading).render(rows[0], buf);
            inner = rows[1];
        }

        if self.items.is_empty() {
            let lines = if self.loading {
                vec![Line::from(Span::styled(
                    format!("{} Loading {}…", spinner_char(self.tick), self.noun),
                    Style::default().fg(self.theme.muted),
                ))]
            } else {
                let mut lines = vec![Line::from(Span::styled(
                    format!("No {} available", self.noun),
                    Style::default().fg(self.theme.warning).bold(),
                ))];
                if let Some(reason) = self.issue {
                    lines.push(Line::from(Span::styled(
                        reason,
                        Style::default().fg(self.theme.error),
                    )));
                }
                lines
            };
            Paragraph::new(lines)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .render(inner, buf);
            return;
        }

        let view_height = inner.height as usize;
        let cursor = self.cursor.min(self.items.len() - 1);
        let start = cursor.saturating_sub(view_height.saturating_sub(1));

        let lines: Vec<Line> = self
            .items
            .iter()
            .enumerate()
            .skip(start)
            .take(view_height)
            .map(|(i, item)| {
                let is_cursor = i == cursor;
                let is_chosen = self.chosen == Some(item.label.as_ref());
                let pointer = if is_cursor { "▶ " } else { "  " };
                let mark = if is_chosen { "● " } else { "○ " };
                let label_style = if is_cursor {
                    Style::default()
                        .fg(self.theme.fg)
                        .bg(self.theme.selected)
                        .bold()
                } else {
                    Style::default().fg(self.theme.fg)
                };

                let mut spans = vec![
                    Span::styled(pointer, Style::default().fg(self.theme.accent)),
                    Span::styled(
                        mark,
                        Style::default().fg(if is_chosen {
                            self.theme.success
                        } else {
                            self.theme.muted
                        }),
                    ),
                    Span::styled(item.label.clone(), label_style),
                ];
                if let Some(detail) = &item.detail {
                    spans.push(Span::styled(
                        format!("  {detail}"),
                        Style::default().fg(self.theme.muted),
                    ));
                }
                Line::from(spans)
            })
            .collect();

        Paragraph::new(lines).render(inner, buf);
    }
}

impl LaunchPanel<'_> {
    fn render_summary(&self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .padding(Padding::new(1, 1, 0, 0))
            .border_style(Style::default().fg(self.theme.border))
            .style(Style::default().bg(self.theme.surface))
            .title(" SELECTION ")
            .title_style(Style::default().fg(self.theme.accent).bold());

        let inner = block.inner(area);
        block.render(area, buf);

        let row = |label: &'static str, value: Option<&str>| {
            let value = match value {
                Some(v) => Span::styled(v.to_owned(), Style::default().fg(self.theme.fg).bold()),
                None => Span::styled("not selected", Style::default().fg(self.theme.error)),
            };
            Line::from(vec![
                Span::styled(format!("{label:<12}"), Style::default().fg(self.theme.muted)),
                value,
            ])
        };

        let lines = vec![
            row("Model", self.selection.model.as_deref()),
            row("Environment", self.selection.environment.as_deref()),
            row("Tool", Some(self.selection.tool.display_name())),
            row("Probe", self.selection.probe.as_deref()),
        ];
        Paragraph::new(lines).render(inner, buf);
    }

    fn render_status(&self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .padding(Padding::new(1, 1, 0, 0))
            .border_style(Style::default().fg(self.theme.border))
            .style(Style::default().bg(self.theme.surface))
            .title(" SESSION ")
            .title_style(Style::default().fg(self.theme.accent).bold());

        let inner = block.inner(area);
        block.render(area, buf);

        let status = self.session.status();
        let color = status_color(self.theme, status);
        let mut status_line = vec![Span::styled(
            format!(" {} ", status.label().to_uppercase()),
            self.theme.badge(color),
        )];
        if self.submitting || self.rechecking || status.is_live() {
            status_line.push(Span::styled(
                format!(" {}", spinner_char(self.tick)),
                Style::default().fg(self.theme.accent),
            ));
        }
        if self.submitting {
            status_line.push(Span::styled(
                " Creating session…",
                Style::default().fg(self.theme.muted),
            ));
        }
        if self.rechecking {
            status_line.push(Span::styled(
                " Asking the backend…",
                Style::default().fg(self.theme.muted),
            ));
        }
        if let Some(id) = self.session.id() {
            status_line.push(Span::styled("  ID ", Style::default().fg(self.theme.muted)));
            status_line.push(Span::styled(id.to_owned(), Style::default().fg(self.theme.info)));
        }

        let mut actions = Vec::new();
        if self.can_start {
            actions.push(Span::styled(" S ", self.theme.badge(self.theme.success)));
            actions.push(Span::styled(" Start Scan  ", Style::default().fg(self.theme.fg)));
        }
        if self.can_new_scan {
            actions.push(Span::styled(" N ", self.theme.badge(self.theme.accent)));
            actions.push(Span::styled(" New Scan  ", Style::default().fg(self.theme.fg)));
        }
        if status == ScanStatus::UnknownDisconnect && !self.rechecking {
            actions.push(Span::styled(" R ", self.theme.badge(self.theme.warning)));
            actions.push(Span::styled(
                " Connection lost, recheck status",
                Style::default().fg(self.theme.warning),
            ));
        }

        let detail = if let Some(error) = self.last_error.or(self.session.error()) {
            Line::from(Span::styled(
                strip_ansi_escapes::strip_str(error),
                Style::default().fg(self.theme.error),
            ))
        } else if let Some(progress) = self.session.progress() {
            Line::from(vec![
                Span::styled("Progress ", Style::default().fg(self.theme.muted)),
                Span::styled(
                    strip_ansi_escapes::strip_str(progress),
                    Style::default().fg(self.theme.info),
                ),
            ])
        } else {
            Line::raw("")
        };

        Paragraph::new(vec![Line::from(status_line), Line::from(actions), detail])
            .render(inner, buf);
    }

    fn render_log(&self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .padding(Padding::new(1, 1, 0, 0))
            .border_style(Style::default().fg(self.theme.border))
            .style(Style::default().bg(self.theme.surface))
            .title(" SCAN OUTPUT ")
            .title_style(Style::default().fg(self.theme.accent).bold());

        let inner = block.inner(area);
        block.render(area, buf);

        if inner.height == 0 || inner.width == 0 {
            return;
        }

        let output = self.session.output();
        if output.is_empty() {
            Paragraph::new("No output yet.")
                .style(Style::default().fg(self.theme.muted))
                .alignment(Alignment::Center)
                .render(inner, buf);
            return;
        }

        // `scroll` counts lines up from the newest.
        let total = output.len();
        let view_height = inner.height as usize;
        let max_scroll = total.saturating_sub(view_height);
        let scroll = usize::from(self.scroll).min(max_scroll);
        let start = max_scroll - scroll;
        let end = (start + view_height).min(total);

        let lines: Vec<Line> = output[start..end]
            .iter()
            .map(|line| log_line(self.theme, line))
            .collect();
        Paragraph::new(lines).render(inner, buf);
    }
}

impl Widget for LaunchPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::vertical([
            Constraint::Length(6),
            Constraint::Length(5),
            Constraint::Min(0),
        ])
        .split(area);

        self.render_summary(chunks[0], buf);
        self.render_status(chunks[1], buf);
        self.render_log(chunks[2], buf);
    }
}

fn status_color(theme: &Theme, status: ScanStatus) -> Color {
    match status {
        ScanStatus::Idle => theme.muted,
        ScanStatus::Starting | ScanStatus::Running => theme.warning,
        ScanStatus::Completed => theme.success,
        ScanStatus::Failed | ScanStatus::UnknownDisconnect => theme.error,
    }
}

fn log_line<'a>(theme: &Theme, raw: &str) -> Line<'a> {
    let text = strip_ansi_escapes::strip_str(raw);
    let style = if text.starts_with("Error: ") {
        Style::default().fg(theme.error)
    } else if text.starts_with("Starting ") {
        Style::default().fg(theme.accent).bold()
    } else {
        Style::default().fg(theme.fg)
    };
    Line::from(Span::styled(text, style))
}

pub struct ConfirmDialog<'a> {
    pub title: &'a str,
    pub message: &'a str,
    pub theme: &'a Theme,
}

impl Widget for ConfirmDialog<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let dialog_area = centered(area, 54, 9);
        Clear.render(dialog_area, buf);

        let block = Block::default()
            .borders(Borders::ALL)
            .padding(Padding::uniform(1))
            .border_type(BorderType::Double)
            .border_style(Style::default().fg(self.theme.warning))
            .style(Style::default().bg(self.theme.surface))
            .title(format!(" {title} ", title = self.title))
            .title_style(Style::default().fg(self.theme.accent).bold());

        let inner = block.inner(dialog_area);
        block.render(dialog_area, buf);

        let chunks = Layout::vertical([Constraint::Length(3), Constraint::Length(2)]).split(inner);

        let message: Vec<Line> = self.message.lines().map(Line::raw).collect();
        Paragraph::new(message)
            .style(Style::default().fg(self.theme.fg))
            .alignment(Alignment::Center)
            .render(chunks[0], buf);

        let buttons = Line::from(vec![
            Span::styled("[Y]", Style::default().fg(self.theme.success).bold()),
            Span::styled("es", Style::default().fg(self.theme.fg)),
            Span::raw("          "),
            Span::styled("[N]", Style::default().fg(self.theme.error).bold()),
            Span::styled("o", Style::default().fg(self.theme.fg)),
        ]);
        Paragraph::new(buttons)
            .alignment(Alignment::Center)
            .render(chunks[1], buf);
    }
}

pub struct HelpOverlay<'a> {
    pub theme: &'a Theme,
}

impl Widget for HelpOverlay<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let dialog_area = centered(area, 60, 16);
        Clear.render(dialog_area, buf);

        let block = Block::default()
            .borders(Borders::ALL)
            .padding(Padding::uniform(1))
            .border_style(Style::default().fg(self.theme.border))
            .style(Style::default().bg(self.theme.surface))
            .title(" HELP ")
            .title_style(Style::default().fg(self.theme.accent).bold());

        let inner = block.inner(dialog_area);
        block.render(dialog_area, buf);

        let key_style = self.theme.badge(self.theme.muted);
        let rows = [
            ("↑/↓", "Move through the list"),
            ("ENTER", "Select and continue / start scan"),
            ("TAB", "Next scan tool"),
            ("←/BKSP", "Previous step"),
            ("S", "Start scan"),
            ("N", "New scan"),
            ("R", "Recheck a lost session"),
            ("PGUP/PGDN", "Scroll output"),
            ("HOME/END", "Oldest / newest output"),
            ("T", "Toggle theme"),
            ("Q", "Quit"),
            ("?", "Close help"),
        ];
        let lines: Vec<Line> = rows
            .iter()
            .map(|(key, desc)| {
                Line::from(vec![
                    Span::styled(format!(" {key:<9} "), key_style),
                    Span::raw(format!(" {desc}")),
                ])
            })
            .collect();

        Paragraph::new(lines)
            .style(Style::default().fg(self.theme.fg).bg(self.theme.surface))
            .render(inner, buf);
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}
