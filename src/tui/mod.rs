use std::io;
use std::panic;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Tabs, Wrap};

use crate::core::{Finding, ResultSet, ScanRecord};
use crate::dom::Document;
use crate::engine::{Engine, ScanMode};
use crate::guidance;
use crate::store::Store;

pub fn run(engine: Engine, store: Store, page: PathBuf, mode: ScanMode, color: bool) -> Result<()> {
    let mut app = App::new(engine, store, page, mode, color);
    app.rescan();

    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter the alternate screen")?;

    let mut tui = Tui {
        terminal: Terminal::new(CrosstermBackend::new(stdout))
            .context("failed to initialize the terminal")?,
    };
    tui.terminal.clear().ok();

    let res = panic::catch_unwind(panic::AssertUnwindSafe(|| {
        run_app(&mut tui.terminal, &mut app)
    }));

    let _ = tui.terminal.show_cursor();
    let _ = disable_raw_mode();
    let mut stdout = io::stdout();
    let _ = execute!(stdout, LeaveAlternateScreen);

    match res {
        Ok(res) => res,
        Err(_) => Err(anyhow::anyhow!(
            "the sidebar panicked (the terminal state should have been restored)"
        )),
    }
}

struct Tui {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Issues,
    Warnings,
    Passed,
    History,
}

impl Tab {
    const ALL: [Tab; 4] = [Tab::Issues, Tab::Warnings, Tab::Passed, Tab::History];

    fn index(self) -> usize {
        match self {
            Tab::Issues => 0,
            Tab::Warnings => 1,
            Tab::Passed => 2,
            Tab::History => 3,
        }
    }

    fn next(self) -> Self {
        Tab::ALL[(self.index() + 1) % Tab::ALL.len()]
    }

    fn prev(self) -> Self {
        Tab::ALL[(self.index() + Tab::ALL.len() - 1) % Tab::ALL.len()]
    }
}

struct App {
    engine: Engine,
    store: Store,
    page: PathBuf,
    mode: ScanMode,
    color: bool,
    tab: Tab,
    results: ResultSet,
    history: Vec<ScanRecord>,
    list_state: ListState,
    status: Option<String>,
    error: Option<String>,
}

impl App {
    fn new(engine: Engine, store: Store, page: PathBuf, mode: ScanMode, color: bool) -> Self {
        let mut list_state = ListState::default();
        list_state.select(Some(0));
        Self {
            engine,
            store,
            page,
            mode,
            color,
            tab: Tab::Issues,
            results: ResultSet::new(),
            history: Vec::new(),
            list_state,
            status: None,
            error: None,
        }
    }

    /// Re-reads the page from disk and scans it again.
    fn rescan(&mut self) {
        match Document::from_path(&self.page) {
            Ok(doc) => {
                let pass = self.engine.scan(&doc, self.mode);
                self.results = pass.results;
                self.error = if pass.failed_rules.is_empty() {
                    None
                } else {
                    Some(format!("{} rule(s) failed", pass.failed_rules.len()))
                };
                self.status = Some(format!(
                    "{} scan: {} issues, {} warnings",
                    self.mode,
                    self.results.issues.len(),
                    self.results.warnings.len()
                ));
            }
            Err(err) => self.error = Some(format!("{err:#}")),
        }
        self.reload_history();
        self.list_state.select(Some(0));
    }

    fn reload_history(&mut self) {
        match self.store.history() {
            Ok(history) => self.history = history,
            Err(err) => self.error = Some(format!("{err:#}")),
        }
    }

    fn save(&mut self) {
        let record = ScanRecord::new(self.page.display().to_string(), self.results.clone());
        match self.store.save_scan_result(record) {
            Ok(()) => {
                self.status = Some("saved to history".to_string());
                self.reload_history();
            }
            Err(err) => self.error = Some(format!("{err:#}")),
        }
    }

    fn findings(&self) -> &[Finding] {
        match self.tab {
            Tab::Issues => &self.results.issues,
            Tab::Warnings => &self.results.warnings,
            Tab::Passed => &self.results.passed,
            Tab::History => &[],
        }
    }

    fn list_len(&self) -> usize {
        match self.tab {
            Tab::History => self.history.len(),
            _ => self.findings().len(),
        }
    }

    fn move_selection(&mut self, delta: isize) {
        let len = self.list_len();
        if len == 0 {
            self.list_state.select(Some(0));
            return;
        }
        let cur = self.list_state.selected().unwrap_or(0) as isize;
        let next = (cur + delta).clamp(0, len as isize - 1);
        self.list_state.select(Some(next as usize));
    }

    fn switch_tab(&mut self, tab: Tab) {
        self.tab = tab;
        self.list_state.select(Some(0));
    }
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    let tick_rate = Duration::from_millis(200);
    let mut last_tick = Instant::now();

    loop {
        terminal
            .draw(|f| draw(f, app))
            .context("failed to draw")?;

        let timeout = tick_rate.saturating_sub(last_tick.elapsed());
        if event::poll(timeout).context("failed to poll events")? {
            if let Event::Key(key) = event::read().context("failed to read event")? {
                if key.kind == KeyEventKind::Press && handle_key(app, key) {
                    break;
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }
    }

    Ok(())
}

/// Returns true when the sidebar should close.
fn handle_key(app: &mut App, key: KeyEvent) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return true;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return true,
        KeyCode::Tab | KeyCode::Right | KeyCode::Char('l') => app.switch_tab(app.tab.next()),
        KeyCode::BackTab | KeyCode::Left | KeyCode::Char('h') => app.switch_tab(app.tab.prev()),
        KeyCode::Char('1') => app.switch_tab(Tab::Issues),
        KeyCode::Char('2') => app.switch_tab(Tab::Warnings),
        KeyCode::Char('3') => app.switch_tab(Tab::Passed),
        KeyCode::Char('4') => app.switch_tab(Tab::History),
        KeyCode::Down | KeyCode::Char('j') => app.move_selection(1),
        KeyCode::Up | KeyCode::Char('k') => app.move_selection(-1),
        KeyCode::PageDown => app.move_selection(10),
        KeyCode::PageUp => app.move_selection(-10),
        KeyCode::Char('r') => app.rescan(),
        KeyCode::Char('d') => {
            app.mode = match app.mode {
                ScanMode::Quick => ScanMode::Detailed,
                ScanMode::Detailed => ScanMode::Quick,
            };
            app.rescan();
        }
        KeyCode::Char('s') => app.save(),
        _ => {}
    }
    false
}

fn draw(f: &mut ratatui::Frame, app: &mut App) {
    let size = f.size();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(2),
        ])
        .split(size);

    draw_header(f, chunks[0], app);
    draw_tabs(f, chunks[1], app);
    draw_footer(f, chunks[3], app);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(chunks[2]);
    match app.tab {
        Tab::History => draw_history(f, body[0], body[1], app),
        _ => draw_findings(f, body[0], body[1], app),
    }
}

fn draw_header(f: &mut ratatui::Frame, area: Rect, app: &App) {
    let score = app.results.score();
    let score_style = if !app.color {
        Style::default()
    } else if score >= 80 {
        Style::default().fg(Color::Green)
    } else if score >= 50 {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::Red)
    };
    let line = Line::from(vec![
        Span::styled(
            "A11y Inspector",
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::raw(truncate_chars(&app.page.display().to_string(), 50)),
        Span::raw("  "),
        Span::styled(format!("score {score}/100"), score_style),
        Span::raw("  "),
        Span::styled(app.mode.to_string(), Style::default().fg(Color::DarkGray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    let w = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
    f.render_widget(w, area);
}

fn draw_tabs(f: &mut ratatui::Frame, area: Rect, app: &App) {
    let titles = vec![
        format!("Issues ({})", app.results.issues.len()),
        format!("Warnings ({})", app.results.warnings.len()),
        format!("Passed ({})", app.results.passed.len()),
        format!("History ({})", app.history.len()),
    ];
    let tabs = Tabs::new(titles)
        .block(Block::default().borders(Borders::ALL))
        .select(app.tab.index())
        .highlight_style(Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED));
    f.render_widget(tabs, area);
}

fn draw_footer(f: &mut ratatui::Frame, area: Rect, app: &App) {
    let status = match (&app.error, &app.status) {
        (Some(err), _) => Span::styled(err.clone(), Style::default().fg(Color::Red)),
        (None, Some(s)) => Span::styled(s.clone(), Style::default().fg(Color::DarkGray)),
        (None, None) => Span::raw(""),
    };
    let keys = Line::from(Span::styled(
        "tab/←→ switch  ↑↓ select  r rescan  d quick/detailed  s save  q quit",
        Style::default().fg(Color::DarkGray),
    ));
    let w = Paragraph::new(Text::from(vec![Line::from(status), keys]));
    f.render_widget(w, area);
}

fn draw_findings(f: &mut ratatui::Frame, left: Rect, right: Rect, app: &mut App) {
    let findings = app.findings();
    let items: Vec<ListItem> = if findings.is_empty() {
        vec![ListItem::new(Line::from("Nothing to show."))]
    } else {
        findings
            .iter()
            .map(|finding| {
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("{:<8}", finding.element),
                        Style::default().fg(Color::Cyan),
                    ),
                    Span::raw(" "),
                    Span::raw(finding.title.clone()),
                ]))
            })
            .collect()
    };
    let detail = app
        .list_state
        .selected()
        .and_then(|sel| findings.get(sel))
        .map(finding_detail)
        .unwrap_or_else(|| Text::from("No finding selected."));

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Findings"))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    f.render_stateful_widget(list, left, &mut app.list_state);

    let w = Paragraph::new(detail)
        .block(Block::default().borders(Borders::ALL).title("Details"))
        .wrap(Wrap { trim: false });
    f.render_widget(w, right);
}

fn finding_detail(finding: &Finding) -> Text<'static> {
    let label = Style::default().fg(Color::DarkGray);
    let mut lines = vec![
        Line::from(Span::styled(
            finding.title.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(finding.description.clone()),
        Line::from(""),
        Line::from(vec![
            Span::styled("element: ", label),
            Span::raw(finding.element.clone()),
        ]),
    ];
    if let Some(selector) = &finding.selector {
        lines.push(Line::from(vec![
            Span::styled("selector: ", label),
            Span::raw(selector.clone()),
        ]));
    }
    lines.push(Line::from(vec![
        Span::styled("guideline: ", label),
        Span::raw(guidance::guideline_label(&finding.title)),
    ]));
    if finding.severity.is_some() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "How to fix:",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(guidance::suggestion(&finding.title)));
    }
    Text::from(lines)
}

fn draw_history(f: &mut ratatui::Frame, left: Rect, right: Rect, app: &mut App) {
    let items: Vec<ListItem> = if app.history.is_empty() {
        vec![ListItem::new(Line::from("No scans recorded yet."))]
    } else {
        app.history
            .iter()
            .map(|r| {
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("{:>3}", r.results.score()),
                        Style::default().fg(Color::Cyan),
                    ),
                    Span::raw(" "),
                    Span::raw(truncate_chars(&r.url, 40)),
                ]))
            })
            .collect()
    };
    let detail = app
        .list_state
        .selected()
        .and_then(|sel| app.history.get(sel))
        .map(|r| {
            Text::from(vec![
                Line::from(r.url.clone()),
                Line::from(r.timestamp.clone()),
                Line::from(""),
                Line::from(format!("score: {}/100", r.results.score())),
                Line::from(format!("issues: {}", r.results.issues.len())),
                Line::from(format!("warnings: {}", r.results.warnings.len())),
                Line::from(format!("passed: {}", r.results.passed.len())),
            ])
        })
        .unwrap_or_else(|| Text::from("No scan selected."));

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("History"))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    f.render_stateful_widget(list, left, &mut app.list_state);

    let w = Paragraph::new(detail)
        .block(Block::default().borders(Borders::ALL).title("Scan"))
        .wrap(Wrap { trim: false });
    f.render_widget(w, right);
}

fn truncate_chars(input: &str, max_chars: usize) -> String {
    if input.chars().count() <= max_chars {
        return input.to_string();
    }
    let mut out: String = input.chars().take(max_chars.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "a11y-inspector-tui-{name}-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    fn app(dir: &std::path::Path) -> App {
        let page = dir.join("page.html");
        std::fs::write(&page, r#"<html lang="en"><body><img src="a.png"></body></html>"#)
            .expect("write page");
        let mut app = App::new(
            Engine::default(),
            Store::open(dir.join("store.json")),
            page,
            ScanMode::Quick,
            false,
        );
        app.rescan();
        app
    }

    fn press(app: &mut App, code: KeyCode) -> bool {
        handle_key(app, KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn tabs_cycle_and_quit_keys_close() {
        let dir = temp_dir("tabs");
        let mut app = app(&dir);
        assert_eq!(app.tab, Tab::Issues);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.tab, Tab::Warnings);
        press(&mut app, KeyCode::BackTab);
        press(&mut app, KeyCode::BackTab);
        assert_eq!(app.tab, Tab::History);
        assert!(!press(&mut app, KeyCode::Char('x')));
        assert!(press(&mut app, KeyCode::Char('q')));
        assert!(press(&mut app, KeyCode::Esc));
    }

    #[test]
    fn refresh_picks_up_page_changes_and_save_records_history() {
        let dir = temp_dir("refresh");
        let mut app = app(&dir);
        assert_eq!(app.results.issues[0].title, "Missing Alt Text");

        std::fs::write(
            dir.join("page.html"),
            r#"<html lang="en"><body><img src="a.png" alt="Logo"></body></html>"#,
        )
        .expect("rewrite page");
        press(&mut app, KeyCode::Char('r'));
        assert!(app.results.issues.iter().all(|f| f.title != "Missing Alt Text"));

        press(&mut app, KeyCode::Char('s'));
        assert_eq!(app.history.len(), 1);
        press(&mut app, KeyCode::Char('4'));
        assert_eq!(app.list_len(), 1);
    }

    #[test]
    fn selection_stays_in_bounds() {
        let dir = temp_dir("select");
        let mut app = app(&dir);
        app.switch_tab(Tab::Passed);
        let len = app.list_len();
        for _ in 0..len + 5 {
            press(&mut app, KeyCode::Down);
        }
        assert_eq!(app.list_state.selected(), Some(len.saturating_sub(1)));
        press(&mut app, KeyCode::PageUp);
        assert_eq!(app.list_state.selected(), Some(0));
    }
}
