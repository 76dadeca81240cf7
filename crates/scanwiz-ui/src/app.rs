use crate::widgets::{
    ChoiceItem, ChoiceList, ConfirmDialog, HelpOverlay, LaunchPanel, StepBody, WizardScreen,
};
use crate::{ColorLevel, Theme, ThemeMode, ThemeSettings};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    style::{Style, Stylize},
    text::{Line, Span},
    widgets::Block,
};
use scanwiz_core::{CatalogKind, ResourceCatalogs, ScanStatus, ScanTool, WizardStep};
use scanwiz_session::{ResourceCatalogClient, ScanWorkflow};
use std::{
    borrow::Cow,
    io::{self, Stdout},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, warn};

const TICK_RATE: Duration = Duration::from_millis(100);
const PAGE: u16 = 10;

#[derive(Error, Debug)]
pub enum UiError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Default)]
struct UiFlags {
    should_quit: bool,
    show_help: bool,
    show_confirm_new_scan: bool,
}

/// Cursor position in each of the three selection lists.
#[derive(Debug, Default, Clone, Copy)]
struct Cursors {
    model: usize,
    environment: usize,
    probe: usize,
}

impl Cursors {
    fn get_mut(&mut self, kind: CatalogKind) -> &mut usize {
        match kind {
            CatalogKind::Models => &mut self.model,
            CatalogKind::Environments => &mut self.environment,
            CatalogKind::Probes => &mut self.probe,
        }
    }

    fn get(self, kind: CatalogKind) -> usize {
        match kind {
            CatalogKind::Models => self.model,
            CatalogKind::Environments => self.environment,
            CatalogKind::Probes => self.probe,
        }
    }
}

pub struct App {
    workflow: ScanWorkflow,
    catalog_client: ResourceCatalogClient,
    catalog_task: Option<JoinHandle<ResourceCatalogs>>,
    catalogs: ResourceCatalogs,
    cursors: Cursors,
    pub theme: Theme,
    pub theme_mode: ThemeMode,
    pub color_level: ColorLevel,
    pub tick: usize,
    /// Lines up from the newest output line.
    pub scroll: u16,
    notice: Option<String>,
    flags: UiFlags,
    shutdown_signal: Arc<AtomicBool>,
}

impl App {
    #[must_use]
    pub fn new(workflow: ScanWorkflow, catalog_client: ResourceCatalogClient) -> Self {
        let theme_settings = ThemeSettings::resolve();
        Self {
            workflow,
            catalog_client,
            catalog_task: None,
            catalogs: ResourceCatalogs::default(),
            cursors: Cursors::default(),
            theme_mode: theme_settings.mode,
            color_level: theme_settings.color_level,
            theme: Theme::for_mode(theme_settings.mode, theme_settings.color_level),
            tick: 0,
            scroll: 0,
            notice: None,
            flags: UiFlags::default(),
            shutdown_signal: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Run the TUI event loop until the user quits.
    ///
    /// The scan stream is closed on the way out; the backend scan keeps running.
    ///
    /// # Errors
    /// Returns `UiError` when terminal I/O fails.
    pub async fn run(&mut self) -> Result<(), UiError> {
        let mut terminal = setup_terminal()?;
        Self::spawn_shutdown_listener(self.shutdown_signal.clone());
        self.load_catalogs();

        let result = self.event_loop(&mut terminal).await;

        self.workflow.controller_mut().shutdown();
        if let Some(task) = self.catalog_task.take() {
            task.abort();
        }
        restore_terminal(&mut terminal)?;
        info!("Wizard closed");
        result
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    ) -> Result<(), UiError> {
        loop {
            if self.shutdown_signal.load(Ordering::SeqCst) {
                break;
            }

            self.poll_catalogs().await;
            self.workflow.poll().await;

            terminal.draw(|f| self.draw(f))?;

            if event::poll(TICK_RATE)?
                && let Event::Key(key) = event::read()?
                && key.kind == KeyEventKind::Press
            {
                self.handle_key_event(key);
            }

            self.tick = self.tick.wrapping_add(1);

            if self.flags.should_quit {
                break;
            }
        }
        Ok(())
    }

    fn spawn_shutdown_listener(shutdown_signal: Arc<AtomicBool>) {
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            shutdown_signal.store(true, Ordering::SeqCst);
        });
    }

    /// Start fetching the catalogs in the background.
    fn load_catalogs(&mut self) {
        let client = self.catalog_client.clone();
        self.catalog_task = Some(tokio::spawn(async move { client.load().await }));
    }

    async fn poll_catalogs(&mut self) {
        if self
            .catalog_task
            .as_ref()
            .is_some_and(JoinHandle::is_finished)
            && let Some(handle) = self.catalog_task.take()
        {
            match handle.await {
                Ok(catalogs) => {
                    self.catalogs = catalogs;
                    self.cursors = Cursors::default();
                }
                Err(e) => warn!("Catalog task failed: {e}"),
            }
        }
    }

    fn is_loading(&self) -> bool {
        self.catalog_task.is_some()
    }

    fn handle_key_event(&mut self, key: KeyEvent) {
        if self.flags.show_confirm_new_scan {
            self.handle_confirm_new_scan(key);
            return;
        }

        let is_ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if (is_ctrl && matches!(key.code, KeyCode::Char('c'))) || key.code == KeyCode::Char('q') {
            self.flags.should_quit = true;
            return;
        }

        match key.code {
            KeyCode::Char('?') => {
                self.flags.show_help = !self.flags.show_help;
                return;
            }
            KeyCode::Esc if self.flags.show_help => {
                self.flags.show_help = false;
                return;
            }
            KeyCode::Char('t') => {
                self.theme_mode = self.theme_mode.toggle();
                self.theme = Theme::for_mode(self.theme_mode, self.color_level);
                return;
            }
            _ => {}
        }

        self.notice = None;
        match key.code {
            KeyCode::Up => self.move_cursor(-1),
            KeyCode::Down => self.move_cursor(1),
            KeyCode::Tab => self.cycle_tool(),
            KeyCode::Enter => self.confirm(),
            KeyCode::Left | KeyCode::Backspace => self.go_back(),
            KeyCode::Char('s') => self.start_scan(),
            KeyCode::Char('n') => self.request_new_scan(),
            KeyCode::Char('r') => self.recheck(),
            KeyCode::PageUp => self.scroll = self.scroll.saturating_add(PAGE),
            KeyCode::PageDown => self.scroll = self.scroll.saturating_sub(PAGE),
            KeyCode::Home => self.scroll = u16::MAX,
            KeyCode::End => self.scroll = 0,
            _ => {}
        }
    }

    fn handle_confirm_new_scan(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('y' | 'Y') => {
                self.flags.show_confirm_new_scan = false;
                self.new_scan();
            }
            KeyCode::Char('n' | 'N') | KeyCode::Esc => {
                self.flags.show_confirm_new_scan = false;
            }
            _ => {}
        }
    }

    fn list_kind(&self) -> Option<CatalogKind> {
        match self.workflow.step() {
            WizardStep::Model => Some(CatalogKind::Models),
            WizardStep::Environment => Some(CatalogKind::Environments),
            WizardStep::Probe => Some(CatalogKind::Probes),
            WizardStep::Launch => None,
        }
    }

    fn move_cursor(&mut self, delta: isize) {
        let Some(kind) = self.list_kind() else {
            return;
        };
        let len = self.catalogs.len(kind);
        if len == 0 {
            return;
        }
        let cursor = self.cursors.get_mut(kind);
        *cursor = cursor.saturating_add_signed(delta).min(len - 1);
    }

    fn cycle_tool(&mut self) {
        if self.workflow.step() != WizardStep::Probe {
            return;
        }
        let current = self.workflow.wizard().selection().tool;
        let index = ScanTool::ALL.iter().position(|t| *t == current).unwrap_or(0);
        self.workflow
            .select_tool(ScanTool::ALL[(index + 1) % ScanTool::ALL.len()]);
    }

    /// Enter: choose the highlighted item and move on, or start the scan.
    fn confirm(&mut self) {
        let Some(kind) = self.list_kind() else {
            self.start_scan();
            return;
        };

        let cursor = self.cursors.get(kind);
        let chosen = match kind {
            CatalogKind::Models => self.catalogs.models.get(cursor).map(|m| m.name.clone()),
            CatalogKind::Environments => self
                .catalogs
                .environments
                .get(cursor)
                .map(|e| e.name.clone()),
            CatalogKind::Probes => self.catalogs.probes.get(cursor).cloned(),
        };
        let Some(chosen) = chosen else {
            self.notice = Some(format!("No {} to choose from", kind.label()));
            return;
        };

        match kind {
            CatalogKind::Models => self.workflow.select_model(chosen),
            CatalogKind::Environments => self.workflow.select_environment(chosen),
            CatalogKind::Probes => self.workflow.select_probe(chosen),
        }
        self.workflow.advance();
    }

    fn go_back(&mut self) {
        if !self.workflow.retreat() && self.workflow.step() != WizardStep::Model {
            self.notice = Some("Scan in progress".to_string());
        }
    }

    fn start_scan(&mut self) {
        if !self.workflow.can_start() {
            return;
        }
        match self.workflow.submit() {
            Ok(()) => self.scroll = 0,
            Err(e) => self.notice = Some(e.to_string()),
        }
    }

    fn request_new_scan(&mut self) {
        let live = self.workflow.session().status().is_live()
            || self.workflow.controller().is_submitting();
        if live {
            self.flags.show_confirm_new_scan = true;
        } else {
            self.new_scan();
        }
    }

    fn new_scan(&mut self) {
        self.workflow.new_scan();
        self.cursors = Cursors::default();
        self.scroll = 0;
        self.notice = None;
    }

    /// The answer arrives through `workflow.poll` on a later tick.
    fn recheck(&mut self) {
        if self.workflow.controller_mut().begin_reconcile() {
            info!("Rechecking lost session");
        }
    }

    fn draw(&self, f: &mut Frame) {
        let area = f.area();
        f.render_widget(Block::default().style(Style::default().bg(self.theme.bg)), area);

        let keys = self.footer_keys();
        let screen = WizardScreen {
            step: self.workflow.step(),
            body: self.step_body(),
            notice: self.notice.as_deref(),
            keys: &keys,
            theme: &self.theme,
        };
        f.render_widget(screen, area);

        if self.flags.show_confirm_new_scan {
            f.render_widget(
                ConfirmDialog {
                    title: "New Scan",
                    message: "A scan is still running on the backend.\nStop following it and start over?",
                    theme: &self.theme,
                },
                area,
            );
        } else if self.flags.show_help {
            f.render_widget(HelpOverlay { theme: &self.theme }, area);
        }
    }

    fn step_body(&self) -> StepBody<'_> {
        let selection = self.workflow.wizard().selection();
        let Some(kind) = self.list_kind() else {
            let controller = self.workflow.controller();
            return StepBody::Launch(LaunchPanel {
                selection,
                session: self.workflow.session(),
                submitting: controller.is_submitting(),
                rechecking: controller.is_rechecking(),
                can_start: self.workflow.can_start(),
                can_new_scan: self.workflow.can_new_scan(),
                last_error: controller.last_error(),
                scroll: self.scroll,
                tick: self.tick,
                theme: &self.theme,
            });
        };

        let (items, chosen, heading): (Vec<ChoiceItem>, Option<&str>, Option<Line>) = match kind {
            CatalogKind::Models => (
                self.catalogs
                    .models
                    .iter()
                    .map(|m| ChoiceItem {
                        label: Cow::Borrowed(m.name.as_str()),
                        detail: Some(Cow::Borrowed(m.size.as_str())),
                    })
                    .collect(),
                selection.model.as_deref(),
                None,
            ),
            CatalogKind::Environments => (
                self.catalogs
                    .environments
                    .iter()
                    .map(|e| ChoiceItem {
                        label: Cow::Borrowed(e.name.as_str()),
                        detail: Some(Cow::Borrowed(e.path.as_str())),
                    })
                    .collect(),
                selection.environment.as_deref(),
                None,
            ),
            CatalogKind::Probes => (
                self.catalogs
                    .probes
                    .iter()
                    .map(|p| ChoiceItem {
                        label: Cow::Borrowed(p.as_str()),
                        detail: None,
                    })
                    .collect(),
                selection.probe.as_deref(),
                Some(Line::from(vec![
                    Span::styled("Tool  ", Style::default().fg(self.theme.muted)),
                    Span::styled(
                        selection.tool.display_name(),
                        Style::default().fg(self.theme.accent).bold(),
                    ),
                    Span::styled(
                        format!("  {}", selection.tool.description()),
                        Style::default().fg(self.theme.muted),
                    ),
                ])),
            ),
        };

        StepBody::Choices(ChoiceList {
            title: self.workflow.step().title(),
            noun: kind.label(),
            heading,
            items,
            cursor: self.cursors.get(kind),
            chosen,
            issue: self.catalogs.issue(kind),
            loading: self.is_loading(),
            tick: self.tick,
            theme: &self.theme,
        })
    }

    fn footer_keys(&self) -> Vec<(&'static str, &'static str)> {
        let mut keys = Vec::new();
        if self.list_kind().is_some() {
            keys.push(("↑/↓", "Move"));
            keys.push(("ENTER", "Select"));
        } else if self.workflow.can_start() {
            keys.push(("S", "Start Scan"));
        } else {
            keys.push(("PGUP/PGDN", "Scroll"));
        }
        if self.workflow.can_retreat() {
            keys.push(("←", "Back"));
        }
        if self.workflow.can_new_scan() {
            keys.push(("N", "New Scan"));
        }
        if self.workflow.session().status() == ScanStatus::UnknownDisconnect
            && !self.workflow.controller().is_rechecking()
        {
            keys.push(("R", "Recheck"));
        }
        keys.extend([("?", "Help"), ("T", "Theme"), ("Q", "Quit")]);
        keys
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>, io::Error> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<(), io::Error> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures_util::StreamExt;
    use ratatui::backend::TestBackend;
    use scanwiz_core::{EnvironmentInfo, ModelInfo};
    use scanwiz_protocol::{
        EnvironmentsResponse, ModelsResponse, ProbesResponse, SessionRecord, StartScanRequest,
        StartScanResponse,
    };
    use scanwiz_session::{
        CatalogSource, ClientError, FrameStream, ScanBackend, ScanSessionController,
        StreamConnector, StreamError,
    };

    /// Answers every request immediately; the event stream never says anything.
    struct QuietBackend;

    #[async_trait]
    impl ScanBackend for QuietBackend {
        async fn start_scan(
            &self,
            _request: &StartScanRequest,
        ) -> Result<StartScanResponse, ClientError> {
            Ok(StartScanResponse {
                session_id: "s1".into(),
                status: Some("started".into()),
            })
        }

        async fn session_record(&self, _session_id: &str) -> Result<SessionRecord, ClientError> {
            Err(ClientError::Reported("no record".into()))
        }
    }

    #[async_trait]
    impl CatalogSource for QuietBackend {
        async fn models(&self) -> Result<ModelsResponse, ClientError> {
            Ok(ModelsResponse {
                models: vec![ModelInfo::new("m1", "1 GB"), ModelInfo::new("m2", "2 GB")],
                error: None,
            })
        }

        async fn environments(&self) -> Result<EnvironmentsResponse, ClientError> {
            Ok(EnvironmentsResponse {
                environments: vec![EnvironmentInfo::new("garak", "/opt/conda/envs/garak")],
                error: None,
            })
        }

        async fn probes(&self) -> Result<ProbesResponse, ClientError> {
            Ok(ProbesResponse {
                probes: vec![],
                error: Some("Garak not installed".into()),
            })
        }
    }

    #[async_trait]
    impl StreamConnector for QuietBackend {
        async fn connect(&self, _session_id: &str) -> Result<FrameStream, StreamError> {
            Ok(futures_util::stream::pending::<Result<String, StreamError>>().boxed())
        }
    }

    /// Every event stream ends at once and the session record never arrives.
    struct StalledRecord;

    #[async_trait]
    impl ScanBackend for StalledRecord {
        async fn start_scan(
            &self,
            _request: &StartScanRequest,
        ) -> Result<StartScanResponse, ClientError> {
            Ok(StartScanResponse {
                session_id: "s1".into(),
                status: None,
            })
        }

        async fn session_record(&self, _session_id: &str) -> Result<SessionRecord, ClientError> {
            std::future::pending().await
        }
    }

    #[async_trait]
    impl StreamConnector for StalledRecord {
        async fn connect(&self, _session_id: &str) -> Result<FrameStream, StreamError> {
            Ok(futures_util::stream::empty::<Result<String, StreamError>>().boxed())
        }
    }

    async fn app() -> App {
        let backend = Arc::new(QuietBackend);
        let controller = ScanSessionController::new(backend.clone(), backend.clone());
        let catalogs = ResourceCatalogClient::new(backend);
        let mut app = App::new(ScanWorkflow::new(controller), catalogs.clone());
        app.catalogs = catalogs.load().await;
        app.theme = Theme::for_mode(ThemeMode::Dark, ColorLevel::None);
        app
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn render(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| app.draw(f)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(ratatui::buffer::Cell::symbol)
            .collect()
    }

    #[tokio::test]
    async fn test_enter_selects_highlighted_item_and_advances() {
        let mut app = app().await;

        app.handle_key_event(key(KeyCode::Down));
        app.handle_key_event(key(KeyCode::Down));
        app.handle_key_event(key(KeyCode::Enter));

        assert_eq!(app.workflow.step(), WizardStep::Environment);
        assert_eq!(
            app.workflow.wizard().selection().model.as_deref(),
            Some("m2")
        );
    }

    #[tokio::test]
    async fn test_empty_catalog_blocks_and_shows_reason() {
        let mut app = app().await;
        app.handle_key_event(key(KeyCode::Enter));
        app.handle_key_event(key(KeyCode::Enter));
        assert_eq!(app.workflow.step(), WizardStep::Probe);

        app.handle_key_event(key(KeyCode::Enter));
        assert_eq!(app.workflow.step(), WizardStep::Probe);

        let screen = render(&app);
        assert!(screen.contains("No probes available"));
        assert!(screen.contains("Garak not installed"));
    }

    #[tokio::test]
    async fn test_launch_submits_and_locks_navigation() {
        let mut app = app().await;
        app.catalogs.probes = vec!["dan.Dan_11_0".into()];
        for _ in 0..3 {
            app.handle_key_event(key(KeyCode::Enter));
        }
        assert_eq!(app.workflow.step(), WizardStep::Launch);
        assert!(render(&app).contains("Start Scan"));

        app.handle_key_event(key(KeyCode::Char('s')));
        while app.workflow.controller().is_submitting() {
            app.workflow.poll().await;
            tokio::task::yield_now().await;
        }
        assert_eq!(app.workflow.session().status(), ScanStatus::Starting);

        app.handle_key_event(key(KeyCode::Left));
        assert_eq!(app.workflow.step(), WizardStep::Launch);
        assert_eq!(app.notice.as_deref(), Some("Scan in progress"));
    }

    #[tokio::test]
    async fn test_new_scan_while_live_asks_first() {
        let mut app = app().await;
        app.catalogs.probes = vec!["p1".into()];
        for _ in 0..3 {
            app.handle_key_event(key(KeyCode::Enter));
        }
        app.handle_key_event(key(KeyCode::Enter));
        assert!(app.workflow.controller().is_submitting());

        app.handle_key_event(key(KeyCode::Char('n')));
        assert!(app.flags.show_confirm_new_scan);
        assert!(render(&app).contains("New Scan"));

        app.handle_key_event(key(KeyCode::Esc));
        assert!(!app.flags.show_confirm_new_scan);
        assert_eq!(app.workflow.step(), WizardStep::Launch);

        app.handle_key_event(key(KeyCode::Char('n')));
        app.handle_key_event(key(KeyCode::Char('y')));
        assert_eq!(app.workflow.step(), WizardStep::Model);
        assert_eq!(app.workflow.session().status(), ScanStatus::Idle);
        assert!(!app.workflow.controller().is_submitting());
    }

    #[tokio::test]
    async fn test_recheck_runs_while_the_wizard_keeps_ticking() {
        let stalled = Arc::new(StalledRecord);
        let controller = ScanSessionController::new(stalled.clone(), stalled);
        let catalogs = ResourceCatalogClient::new(Arc::new(QuietBackend));
        let mut app = App::new(ScanWorkflow::new(controller), catalogs.clone());
        app.catalogs = catalogs.load().await;
        app.catalogs.probes = vec!["p1".into()];
        for _ in 0..3 {
            app.handle_key_event(key(KeyCode::Enter));
        }
        app.handle_key_event(key(KeyCode::Char('s')));

        tokio::time::timeout(Duration::from_secs(2), async {
            while app.workflow.session().status() != ScanStatus::UnknownDisconnect {
                app.workflow.poll().await;
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert!(render(&app).contains("Recheck"));

        app.handle_key_event(key(KeyCode::Char('r')));
        assert!(app.workflow.controller().is_rechecking());

        for _ in 0..3 {
            tokio::time::timeout(Duration::from_millis(200), app.workflow.poll())
                .await
                .unwrap();
            app.tick = app.tick.wrapping_add(1);
        }
        let screen = render(&app);
        assert!(screen.contains("Asking the backend"));
        assert!(!screen.contains("Connection lost"));

        app.handle_key_event(key(KeyCode::Char('?')));
        assert!(app.flags.show_help);
        app.handle_key_event(key(KeyCode::Esc));

        app.handle_key_event(key(KeyCode::Char('n')));
        assert_eq!(app.workflow.session().status(), ScanStatus::Idle);
        assert!(!app.workflow.controller().is_rechecking());
    }

    #[tokio::test]
    async fn test_quit_and_overlay_keys() {
        let mut app = app().await;

        app.handle_key_event(key(KeyCode::Char('?')));
        assert!(render(&app).contains("Recheck a lost session"));
        app.handle_key_event(key(KeyCode::Esc));
        assert!(!app.flags.show_help);

        let mode = app.theme_mode;
        app.handle_key_event(key(KeyCode::Char('t')));
        assert_eq!(app.theme_mode, mode.toggle());

        app.handle_key_event(key(KeyCode::Char('q')));
        assert!(app.flags.should_quit);
    }
}
