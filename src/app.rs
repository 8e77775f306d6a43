use crate::errors::ApiError;
use crate::form::{FormAction, TestForm};
use crate::models::{AbTest, CreateTestRequest, Video};
use crate::redirect::{self, Location, RedirectOutcome};
use crate::session::{Credential, Session};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use reqwest::Url;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    AnonymousIdle,
    AuthCheckPending,
    Authenticated,
    AuthFailed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Tab {
    #[default]
    Videos,
    Tests,
}

impl Tab {
    pub fn title(self) -> &'static str {
        match self {
            Tab::Videos => "Videos",
            Tab::Tests => "Tests",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Tab::Videos => 0,
            Tab::Tests => 1,
        }
    }

    fn fetch_fallback(self) -> &'static str {
        match self {
            Tab::Videos => "Failed to fetch videos",
            Tab::Tests => "Failed to fetch tests",
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ViewState {
    pub active_tab: Tab,
    pub loading: bool,
    pub error: Option<String>,
    pub hint: Option<String>,
}

/// Last failure of a tab's fetch, kept until that tab is fetched again or
/// the error is dismissed.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TabError {
    message: String,
    hint: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProbeStatus {
    Connecting,
    Connected(serde_json::Value),
    Failed,
}

impl ProbeStatus {
    pub fn message(&self) -> &'static str {
        match self {
            ProbeStatus::Connecting => "Connecting...",
            ProbeStatus::Connected(_) => "Connected to API",
            ProbeStatus::Failed => "Failed to connect to API",
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ProbeStatus::Connected(_))
    }
}

/// Identifies one list fetch. Only the latest ticket issued for a tab may
/// commit its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket {
    pub tab: Tab,
    pub seq: u64,
}

#[derive(Debug, Default)]
pub struct RequestSequencer {
    last_seq: u64,
    outstanding: [Option<u64>; 2],
}

impl RequestSequencer {
    pub fn next_seq(&mut self) -> u64 {
        self.last_seq += 1;
        self.last_seq
    }

    pub fn issue(&mut self, tab: Tab) -> RequestTicket {
        let seq = self.next_seq();
        self.outstanding[tab.index()] = Some(seq);
        RequestTicket { tab, seq }
    }

    /// Consumes `ticket` if it is the latest one outstanding for its tab.
    pub fn settle(&mut self, ticket: RequestTicket) -> bool {
        let slot = &mut self.outstanding[ticket.tab.index()];
        if *slot == Some(ticket.seq) {
            *slot = None;
            true
        } else {
            false
        }
    }

    pub fn is_pending(&self, tab: Tab) -> bool {
        self.outstanding[tab.index()].is_some()
    }

    pub fn invalidate_all(&mut self) {
        self.outstanding = [None, None];
    }
}

/// Side effects requested by the controller. The dispatcher runs them and
/// reports back with an [`AppEvent`].
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Probe,
    FetchVideos {
        ticket: RequestTicket,
        credential: Credential,
    },
    FetchTests {
        ticket: RequestTicket,
        credential: Credential,
    },
    CreateTest {
        seq: u64,
        credential: Credential,
        payload: CreateTestRequest,
    },
    CopyToClipboard(String),
}

#[derive(Debug)]
pub enum AppEvent {
    ProbeFinished(Result<serde_json::Value, ApiError>),
    VideosLoaded {
        ticket: RequestTicket,
        result: Result<Vec<Video>, ApiError>,
    },
    TestsLoaded {
        ticket: RequestTicket,
        result: Result<Vec<AbTest>, ApiError>,
    },
    TestCreated {
        seq: u64,
        result: Result<Option<AbTest>, ApiError>,
    },
    ClipboardCopied(Result<(), String>),
}

#[derive(Debug)]
pub enum Overlay {
    None,
    RedirectPrompt { input: String, error: Option<String> },
    CreateTest(TestForm),
}

pub struct App {
    pub auth: AuthState,
    pub session: Session,
    pub location: Location,
    pub view: ViewState,
    pub probe: ProbeStatus,
    pub videos: Vec<Video>,
    pub tests: Vec<AbTest>,
    pub selected_video_index: usize,
    pub selected_test_index: usize,
    pub overlay: Overlay,
    pub api_base_url: String,
    pub login_url: String,
    pub notice: Option<String>,
    pub should_quit: bool,
    pub loading_frame: usize,
    sequencer: RequestSequencer,
    tab_errors: [Option<TabError>; 2],
    pending_create: Option<u64>,
    commands: Vec<Command>,
}

impl App {
    pub fn new(api_base_url: String, login_url: String, location: Location) -> Self {
        Self {
            auth: AuthState::AnonymousIdle,
            session: Session::default(),
            location,
            view: ViewState::default(),
            probe: ProbeStatus::Connecting,
            videos: Vec::new(),
            tests: Vec::new(),
            selected_video_index: 0,
            selected_test_index: 0,
            overlay: Overlay::None,
            api_base_url,
            login_url,
            notice: None,
            should_quit: false,
            loading_frame: 0,
            sequencer: RequestSequencer::default(),
            tab_errors: [None, None],
            pending_create: None,
            commands: Vec::new(),
        }
    }

    /// First page load: the probe and the redirect check run independently.
    pub fn start(&mut self) {
        self.commands.push(Command::Probe);
        self.load_page();
    }

    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    /// Treats `url` as a fresh page load, as if the browser had landed on it.
    pub fn navigate(&mut self, url: Url) {
        self.location = Location::new(url);
        self.load_page();
    }

    fn load_page(&mut self) {
        self.set_auth(AuthState::AuthCheckPending, "page load");
        self.reset_data();

        let outcome = redirect::load_page(&mut self.location);
        let status = outcome.auth_status();

        match outcome {
            RedirectOutcome::Authenticated(credential) => {
                self.session.sign_in(credential);
                self.set_auth(AuthState::Authenticated, "token decoded");
                self.fetch(Tab::Videos);
            }
            _ => {
                self.session.reject(status);
                self.set_auth(AuthState::AuthFailed, "no usable token");
            }
        }
    }

    pub fn switch_tab(&mut self, tab: Tab) {
        if self.auth != AuthState::Authenticated {
            return;
        }

        crate::log_user_action!("switch_tab", tab.title());
        self.view.active_tab = tab;
        self.show_tab_error();

        match tab {
            Tab::Tests => self.fetch(Tab::Tests),
            Tab::Videos if self.videos.is_empty() => self.fetch(Tab::Videos),
            Tab::Videos => self.sync_loading(),
        }
    }

    pub fn refresh(&mut self) {
        if self.auth == AuthState::Authenticated {
            self.fetch(self.view.active_tab);
        }
    }

    pub fn logout(&mut self) {
        if self.auth != AuthState::AnonymousIdle {
            crate::log_user_action!("logout", "session cleared");
        }
        self.session.clear();
        self.reset_data();
        self.overlay = Overlay::None;
        self.set_auth(AuthState::AnonymousIdle, "logout");
    }

    /// Starts the external sign-in. Disabled until the probe has reached
    /// the API.
    pub fn begin_login(&mut self) {
        if self.session.is_authenticated() {
            return;
        }
        if !self.probe.is_connected() {
            self.notice = Some("Login is unavailable until the API is reachable".to_string());
            return;
        }

        crate::log_user_action!("begin_login", self.login_url.as_str());
        self.commands
            .push(Command::CopyToClipboard(self.login_url.clone()));
        self.open_redirect_prompt();
    }

    pub fn open_redirect_prompt(&mut self) {
        self.overlay = Overlay::RedirectPrompt {
            input: String::new(),
            error: None,
        };
    }

    pub fn open_create_form(&mut self) {
        if self.auth != AuthState::Authenticated || self.view.active_tab != Tab::Videos {
            return;
        }
        if let Some(video) = self.videos.get(self.selected_video_index) {
            crate::log_user_action!("open_create_form", video.id.as_str());
            self.overlay = Overlay::CreateTest(TestForm::new(video.clone()));
        }
    }

    pub fn dismiss_error(&mut self) {
        self.tab_errors[self.view.active_tab.index()] = None;
        self.show_tab_error();
    }

    pub fn selected_video(&self) -> Option<&Video> {
        self.videos.get(self.selected_video_index)
    }

    pub fn apply(&mut self, event: AppEvent) {
        match event {
            AppEvent::ProbeFinished(result) => match result {
                Ok(payload) => {
                    info!("API probe succeeded");
                    self.probe = ProbeStatus::Connected(payload);
                }
                Err(e) => {
                    warn!(error = %e, "API probe failed");
                    self.probe = ProbeStatus::Failed;
                }
            },
            AppEvent::VideosLoaded { ticket, result } => {
                if !self.accept(ticket) {
                    return;
                }
                match result {
                    Ok(videos) => {
                        info!(count = videos.len(), "Loaded videos");
                        self.videos = videos;
                        self.selected_video_index = clamp_index(
                            self.selected_video_index,
                            self.videos.len(),
                        );
                    }
                    Err(e) => self.fail_fetch(ticket.tab, &e),
                }
                self.sync_loading();
            }
            AppEvent::TestsLoaded { ticket, result } => {
                if !self.accept(ticket) {
                    return;
                }
                match result {
                    Ok(tests) => {
                        info!(count = tests.len(), "Loaded tests");
                        self.tests = tests;
                        self.selected_test_index =
                            clamp_index(self.selected_test_index, self.tests.len());
                    }
                    Err(e) => self.fail_fetch(ticket.tab, &e),
                }
                self.sync_loading();
            }
            AppEvent::TestCreated { seq, result } => {
                if self.pending_create != Some(seq) {
                    debug!(seq, "Dropping create-test completion with no open form");
                    return;
                }
                self.pending_create = None;

                match result {
                    Ok(created) => {
                        info!(
                            test_id = created.as_ref().map(|t| t.test_id.as_str()).unwrap_or("-"),
                            "Test created"
                        );
                        self.overlay = Overlay::None;
                        self.switch_tab(Tab::Tests);
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to create test");
                        if let Overlay::CreateTest(form) = &mut self.overlay {
                            form.fail(e.display_message("Failed to create test"));
                        }
                    }
                }
            }
            AppEvent::ClipboardCopied(result) => {
                self.notice = Some(match result {
                    Ok(()) => "Login URL copied to clipboard. Open it in your browser.".to_string(),
                    Err(e) => {
                        warn!(error = %e, "Failed to copy login URL");
                        "Open the login URL shown above in your browser.".to_string()
                    }
                });
            }
        }
    }

    pub fn handle_key_event(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        match &mut self.overlay {
            Overlay::CreateTest(form) => {
                let action = form.handle_key_event(key);
                self.handle_form_action(action);
                return;
            }
            Overlay::RedirectPrompt { input, error } => {
                match key.code {
                    KeyCode::Esc => self.overlay = Overlay::None,
                    KeyCode::Enter => self.submit_redirect_url(),
                    KeyCode::Backspace => {
                        input.pop();
                    }
                    KeyCode::Char(c) => {
                        input.push(c);
                        *error = None;
                    }
                    _ => {}
                }
                return;
            }
            Overlay::None => {}
        }

        match self.auth {
            AuthState::Authenticated => match key.code {
                KeyCode::Char('q') => self.should_quit = true,
                KeyCode::Char('1') => self.switch_tab(Tab::Videos),
                KeyCode::Char('2') => self.switch_tab(Tab::Tests),
                KeyCode::Tab | KeyCode::Left | KeyCode::Right => {
                    let next = match self.view.active_tab {
                        Tab::Videos => Tab::Tests,
                        Tab::Tests => Tab::Videos,
                    };
                    self.switch_tab(next);
                }
                KeyCode::Up => self.move_selection(-1),
                KeyCode::Down => self.move_selection(1),
                KeyCode::Char('n') | KeyCode::Enter => self.open_create_form(),
                KeyCode::Char('r') => self.refresh(),
                KeyCode::Char('x') | KeyCode::Esc => self.dismiss_error(),
                KeyCode::Char('o') => self.logout(),
                _ => {}
            },
            _ => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
                KeyCode::Char('l') => self.begin_login(),
                KeyCode::Char('p') => self.open_redirect_prompt(),
                _ => {}
            },
        }
    }

    /// Bracketed paste goes straight into whichever text field is open.
    pub fn handle_paste(&mut self, text: &str) {
        match &mut self.overlay {
            Overlay::RedirectPrompt { input, error } => {
                input.push_str(text.trim());
                *error = None;
            }
            Overlay::CreateTest(form) => {
                for c in text.chars().filter(|c| !c.is_control()) {
                    form.handle_key_event(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
                }
            }
            Overlay::None => {}
        }
    }

    pub fn tick(&mut self) {
        self.loading_frame = (self.loading_frame + 1) % 8;
    }

    fn submit_redirect_url(&mut self) {
        let Overlay::RedirectPrompt { input, error } = &mut self.overlay else {
            return;
        };

        match Url::parse(input.trim()) {
            Ok(url) => {
                self.overlay = Overlay::None;
                self.navigate(url);
            }
            Err(e) => {
                *error = Some(format!("Not a valid URL: {}", e));
            }
        }
    }

    fn handle_form_action(&mut self, action: FormAction) {
        match action {
            FormAction::None => {}
            FormAction::Cancel => {
                self.overlay = Overlay::None;
                self.pending_create = None;
            }
            FormAction::Submit(payload) => {
                let Some(credential) = self.session.credential().cloned() else {
                    if let Overlay::CreateTest(form) = &mut self.overlay {
                        form.fail("Sign in again to create tests".to_string());
                    }
                    return;
                };
                let seq = self.sequencer.next_seq();
                self.pending_create = Some(seq);
                crate::log_user_action!("create_test", payload.video_id.as_str());
                self.commands.push(Command::CreateTest {
                    seq,
                    credential,
                    payload,
                });
            }
        }
    }

    fn fetch(&mut self, tab: Tab) {
        let Some(credential) = self.session.credential().cloned() else {
            return;
        };

        let ticket = self.sequencer.issue(tab);
        debug!(tab = tab.title(), seq = ticket.seq, "Issuing fetch");
        self.tab_errors[tab.index()] = None;
        self.show_tab_error();
        self.commands.push(match tab {
            Tab::Videos => Command::FetchVideos { ticket, credential },
            Tab::Tests => Command::FetchTests { ticket, credential },
        });
        self.sync_loading();
    }

    fn accept(&mut self, ticket: RequestTicket) -> bool {
        if self.sequencer.settle(ticket) {
            true
        } else {
            debug!(
                tab = ticket.tab.title(),
                seq = ticket.seq,
                "Dropping stale response"
            );
            false
        }
    }

    fn fail_fetch(&mut self, tab: Tab, error: &ApiError) {
        warn!(tab = tab.title(), error = %error, "Fetch failed");
        self.tab_errors[tab.index()] = Some(TabError {
            message: error.display_message(tab.fetch_fallback()),
            hint: error.hint().map(String::from),
        });
        self.show_tab_error();
    }

    /// Mirrors the active tab's stored failure into the banner.
    fn show_tab_error(&mut self) {
        let stored = self.tab_errors[self.view.active_tab.index()].clone();
        self.view.error = stored.as_ref().map(|e| e.message.clone());
        self.view.hint = stored.and_then(|e| e.hint);
    }

    fn sync_loading(&mut self) {
        self.view.loading = self.sequencer.is_pending(self.view.active_tab);
    }

    fn move_selection(&mut self, delta: isize) {
        let (index, len) = match self.view.active_tab {
            Tab::Videos => (&mut self.selected_video_index, self.videos.len()),
            Tab::Tests => (&mut self.selected_test_index, self.tests.len()),
        };
        if len == 0 {
            return;
        }
        *index = index.saturating_add_signed(delta).min(len - 1);
    }

    fn reset_data(&mut self) {
        self.videos.clear();
        self.tests.clear();
        self.selected_video_index = 0;
        self.selected_test_index = 0;
        self.view = ViewState::default();
        self.tab_errors = [None, None];
        self.sequencer.invalidate_all();
        self.pending_create = None;
    }

    fn set_auth(&mut self, to: AuthState, context: &str) {
        crate::log_state_transition!(self.auth, to, context);
        self.auth = to;
    }
}

fn clamp_index(index: usize, len: usize) -> usize {
    index.min(len.saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::AuthStatus;
    use crossterm::event::KeyEventState;

    const LOGIN_URL: &str = "https://api.example.com/login";

    fn key_event(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn started_app(url: &str) -> App {
        let mut app = App::new(
            "https://api.example.com".to_string(),
            LOGIN_URL.to_string(),
            Location::new(Url::parse(url).unwrap()),
        );
        app.start();
        app
    }

    fn signed_in_app() -> App {
        started_app("http://localhost:5173/?success=true&token=YWJjMTIz")
    }

    fn video(id: &str) -> Video {
        Video {
            id: id.to_string(),
            title: format!("Video {}", id),
            thumbnail_url: format!("https://img/{}.jpg", id),
            published_at: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    fn ab_test(id: &str) -> AbTest {
        AbTest {
            test_id: id.to_string(),
            video_id: "v1".to_string(),
            video_title: "Video v1".to_string(),
            original_thumbnail: None,
            variant_a: "A".to_string(),
            variant_b: "B".to_string(),
            status: "active".to_string(),
            created_at: "2024-01-01T00:00:00".to_string(),
            metrics: None,
        }
    }

    fn video_ticket(commands: &[Command]) -> RequestTicket {
        commands
            .iter()
            .find_map(|c| match c {
                Command::FetchVideos { ticket, .. } => Some(*ticket),
                _ => None,
            })
            .expect("no videos fetch issued")
    }

    fn tests_ticket(commands: &[Command]) -> RequestTicket {
        commands
            .iter()
            .find_map(|c| match c {
                Command::FetchTests { ticket, .. } => Some(*ticket),
                _ => None,
            })
            .expect("no tests fetch issued")
    }

    fn load_videos(app: &mut App, videos: Vec<Video>) {
        let ticket = video_ticket(&app.take_commands());
        app.apply(AppEvent::VideosLoaded {
            ticket,
            result: Ok(videos),
        });
    }

    #[test]
    fn test_start_with_token_authenticates_and_fetches_videos() {
        let mut app = signed_in_app();

        assert_eq!(app.auth, AuthState::Authenticated);
        assert_eq!(
            app.session.credential().map(Credential::as_str),
            Some("abc123")
        );
        assert_eq!(app.session.status(), &AuthStatus::Authenticated);
        assert!(app.location.current().query().is_none());
        assert_eq!(app.view.active_tab, Tab::Videos);
        assert!(app.view.loading);

        let commands = app.take_commands();
        assert_eq!(commands[0], Command::Probe);
        assert!(matches!(commands[1], Command::FetchVideos { .. }));
        assert_eq!(commands.len(), 2);
    }

    #[test]
    fn test_start_with_error_fails_auth() {
        let mut app = started_app("http://localhost/?error=access_denied");

        assert_eq!(app.auth, AuthState::AuthFailed);
        assert!(app.session.credential().is_none());
        assert!(app.session.status().message().contains("access_denied"));
        assert!(app.location.current().query().is_none());
        assert_eq!(app.take_commands(), vec![Command::Probe]);
    }

    #[test]
    fn test_start_without_params_fails_auth_quietly() {
        let app = started_app("http://localhost/");
        assert_eq!(app.auth, AuthState::AuthFailed);
        assert_eq!(app.session.status(), &AuthStatus::NotAuthenticated);
    }

    #[test]
    fn test_decode_failure_keeps_authenticated_view_disabled() {
        let mut app = started_app("http://localhost/?success=true&token=%%%%");
        assert_eq!(app.auth, AuthState::AuthFailed);
        assert_eq!(app.session.status(), &AuthStatus::DecodeFailed);
        app.switch_tab(Tab::Tests);
        assert_eq!(app.take_commands(), vec![Command::Probe]);
    }

    #[test]
    fn test_videos_success_clears_loading() {
        let mut app = signed_in_app();
        load_videos(&mut app, vec![video("v1"), video("v2")]);

        assert_eq!(app.videos.len(), 2);
        assert!(!app.view.loading);
        assert!(app.view.error.is_none());
    }

    #[test]
    fn test_videos_unauthorized_sets_error_and_keeps_credential() {
        let mut app = signed_in_app();
        let ticket = video_ticket(&app.take_commands());

        app.apply(AppEvent::VideosLoaded {
            ticket,
            result: Err(ApiError::Status {
                status: 401,
                message: Some("invalid token".to_string()),
            }),
        });

        assert_eq!(app.view.error.as_deref(), Some("invalid token"));
        assert!(!app.view.loading);
        assert_eq!(app.auth, AuthState::Authenticated);
        assert_eq!(
            app.session.credential().map(Credential::as_str),
            Some("abc123")
        );
    }

    #[test]
    fn test_tests_tab_always_refetches() {
        let mut app = signed_in_app();
        load_videos(&mut app, vec![video("v1")]);

        app.switch_tab(Tab::Tests);
        let ticket = tests_ticket(&app.take_commands());
        app.apply(AppEvent::TestsLoaded {
            ticket,
            result: Ok(vec![ab_test("t1")]),
        });
        assert_eq!(app.tests.len(), 1);

        app.switch_tab(Tab::Videos);
        app.switch_tab(Tab::Tests);
        let commands = app.take_commands();
        assert_eq!(commands.len(), 1);
        assert!(matches!(commands[0], Command::FetchTests { .. }));
    }

    #[test]
    fn test_videos_tab_skips_fetch_when_loaded() {
        let mut app = signed_in_app();
        load_videos(&mut app, vec![video("v1")]);
        app.switch_tab(Tab::Tests);
        app.take_commands();

        app.switch_tab(Tab::Videos);
        assert!(app.take_commands().is_empty());
        assert!(!app.view.loading);
    }

    #[test]
    fn test_videos_tab_fetches_when_empty() {
        let mut app = signed_in_app();
        load_videos(&mut app, Vec::new());
        app.switch_tab(Tab::Tests);
        app.take_commands();

        app.switch_tab(Tab::Videos);
        let commands = app.take_commands();
        assert!(matches!(commands.as_slice(), [Command::FetchVideos { .. }]));
        assert!(app.view.loading);
    }

    #[test]
    fn test_stale_response_does_not_overwrite() {
        let mut app = signed_in_app();
        load_videos(&mut app, vec![video("v1")]);

        app.switch_tab(Tab::Tests);
        let slow = tests_ticket(&app.take_commands());
        app.switch_tab(Tab::Videos);
        app.switch_tab(Tab::Tests);
        let fresh = tests_ticket(&app.take_commands());
        assert!(fresh.seq > slow.seq);

        app.apply(AppEvent::TestsLoaded {
            ticket: fresh,
            result: Ok(vec![ab_test("new-1"), ab_test("new-2")]),
        });
        app.apply(AppEvent::TestsLoaded {
            ticket: slow,
            result: Ok(vec![ab_test("old")]),
        });

        assert_eq!(app.tests.len(), 2);
        assert_eq!(app.tests[0].test_id, "new-1");
    }

    #[test]
    fn test_stale_error_is_ignored() {
        let mut app = signed_in_app();
        load_videos(&mut app, vec![video("v1")]);

        app.switch_tab(Tab::Tests);
        let slow = tests_ticket(&app.take_commands());
        app.refresh();
        let fresh = tests_ticket(&app.take_commands());

        app.apply(AppEvent::TestsLoaded {
            ticket: slow,
            result: Err(ApiError::Timeout),
        });
        assert!(app.view.error.is_none());
        assert!(app.view.loading);

        app.apply(AppEvent::TestsLoaded {
            ticket: fresh,
            result: Ok(vec![ab_test("t1")]),
        });
        assert!(!app.view.loading);
    }

    #[test]
    fn test_timeout_surfaces_error() {
        let mut app = signed_in_app();
        let ticket = video_ticket(&app.take_commands());
        app.apply(AppEvent::VideosLoaded {
            ticket,
            result: Err(ApiError::Timeout),
        });
        assert_eq!(app.view.error.as_deref(), Some("Request timed out"));
        assert!(!app.view.loading);
        assert!(app.view.hint.is_some());
    }

    #[test]
    fn test_network_failure_uses_generic_message() {
        let mut app = signed_in_app();
        load_videos(&mut app, vec![video("v1")]);
        app.switch_tab(Tab::Tests);
        let ticket = tests_ticket(&app.take_commands());
        app.apply(AppEvent::TestsLoaded {
            ticket,
            result: Err(ApiError::Network("connection reset".to_string())),
        });
        assert_eq!(app.view.error.as_deref(), Some("Failed to fetch tests"));
    }

    #[test]
    fn test_background_tab_failure_shows_when_tab_is_opened() {
        let mut app = signed_in_app();
        load_videos(&mut app, vec![video("v1")]);

        app.refresh();
        let videos = video_ticket(&app.take_commands());
        app.switch_tab(Tab::Tests);
        let tests = tests_ticket(&app.take_commands());

        app.apply(AppEvent::VideosLoaded {
            ticket: videos,
            result: Err(ApiError::Status {
                status: 401,
                message: Some("invalid token".to_string()),
            }),
        });
        assert!(app.view.error.is_none());

        app.apply(AppEvent::TestsLoaded {
            ticket: tests,
            result: Ok(vec![ab_test("t1")]),
        });

        app.switch_tab(Tab::Videos);
        assert!(app.take_commands().is_empty());
        assert_eq!(app.view.error.as_deref(), Some("invalid token"));
        assert!(app.view.hint.is_some());
        assert!(!app.view.loading);
        assert_eq!(app.videos.len(), 1);

        app.dismiss_error();
        app.switch_tab(Tab::Tests);
        app.switch_tab(Tab::Videos);
        assert!(app.view.error.is_none());
    }

    #[test]
    fn test_refetch_clears_tab_error() {
        let mut app = signed_in_app();
        let ticket = video_ticket(&app.take_commands());
        app.apply(AppEvent::VideosLoaded {
            ticket,
            result: Err(ApiError::Timeout),
        });
        assert!(app.view.error.is_some());

        app.refresh();
        assert!(app.view.error.is_none());
        assert!(app.view.loading);
    }

    #[test]
    fn test_clipboard_result_sets_notice() {
        let mut app = started_app("http://localhost/");
        app.apply(AppEvent::ClipboardCopied(Ok(())));
        assert_eq!(
            app.notice.as_deref(),
            Some("Login URL copied to clipboard. Open it in your browser.")
        );

        app.apply(AppEvent::ClipboardCopied(Err("no display".to_string())));
        assert_eq!(
            app.notice.as_deref(),
            Some("Open the login URL shown above in your browser.")
        );
    }

    #[test]
    fn test_logout_clears_everything_and_is_idempotent() {
        let mut app = signed_in_app();
        load_videos(&mut app, vec![video("v1")]);
        app.switch_tab(Tab::Tests);
        let ticket = tests_ticket(&app.take_commands());
        app.apply(AppEvent::TestsLoaded {
            ticket,
            result: Ok(vec![ab_test("t1")]),
        });

        app.logout();
        assert_eq!(app.auth, AuthState::AnonymousIdle);
        assert!(app.session.credential().is_none());
        assert!(app.videos.is_empty());
        assert!(app.tests.is_empty());
        assert_eq!(app.view, ViewState::default());

        app.logout();
        assert_eq!(app.auth, AuthState::AnonymousIdle);
        assert!(app.session.credential().is_none());
        assert_eq!(app.view, ViewState::default());
        assert!(app.take_commands().is_empty());
    }

    #[test]
    fn test_response_after_logout_is_dropped() {
        let mut app = signed_in_app();
        let ticket = video_ticket(&app.take_commands());
        app.logout();

        app.apply(AppEvent::VideosLoaded {
            ticket,
            result: Ok(vec![video("v1")]),
        });
        assert!(app.videos.is_empty());
    }

    #[test]
    fn test_login_disabled_until_probe_connects() {
        let mut app = started_app("http://localhost/");
        app.take_commands();

        app.handle_key_event(key_event(KeyCode::Char('l')));
        assert!(app.take_commands().is_empty());
        assert!(matches!(app.overlay, Overlay::None));
        assert!(app.notice.is_some());

        app.apply(AppEvent::ProbeFinished(Err(ApiError::Network(
            "refused".to_string(),
        ))));
        assert_eq!(app.probe, ProbeStatus::Failed);
        app.begin_login();
        assert!(app.take_commands().is_empty());

        app.apply(AppEvent::ProbeFinished(Ok(serde_json::json!({"message": "API is running"}))));
        assert_eq!(app.probe.message(), "Connected to API");
        app.begin_login();
        assert_eq!(
            app.take_commands(),
            vec![Command::CopyToClipboard(LOGIN_URL.to_string())]
        );
        assert!(matches!(app.overlay, Overlay::RedirectPrompt { .. }));
    }

    #[test]
    fn test_pasted_redirect_signs_in() {
        let mut app = started_app("http://localhost/");
        app.take_commands();
        app.open_redirect_prompt();
        app.handle_paste("http://localhost/?success=true&token=YWJjMTIz\n");
        app.handle_key_event(key_event(KeyCode::Enter));

        assert!(matches!(app.overlay, Overlay::None));
        assert_eq!(app.auth, AuthState::Authenticated);
        assert!(matches!(
            app.take_commands().as_slice(),
            [Command::FetchVideos { .. }]
        ));
    }

    #[test]
    fn test_invalid_pasted_url_keeps_prompt_open() {
        let mut app = started_app("http://localhost/");
        app.open_redirect_prompt();
        app.handle_paste("not a url");
        app.handle_key_event(key_event(KeyCode::Enter));

        match &app.overlay {
            Overlay::RedirectPrompt { error, .. } => assert!(error.is_some()),
            other => panic!("expected prompt, got {:?}", other),
        }
        assert_eq!(app.auth, AuthState::AuthFailed);
    }

    #[test]
    fn test_empty_variant_b_issues_no_request() {
        let mut app = signed_in_app();
        load_videos(&mut app, vec![video("v1")]);

        app.handle_key_event(key_event(KeyCode::Char('n')));
        assert!(matches!(app.overlay, Overlay::CreateTest(_)));
        app.handle_key_event(key_event(KeyCode::Enter));

        assert!(app.take_commands().is_empty());
        match &app.overlay {
            Overlay::CreateTest(form) => assert_eq!(
                form.error.as_deref(),
                Some("Variant B description is required")
            ),
            other => panic!("expected form, got {:?}", other),
        }
    }

    #[test]
    fn test_create_success_switches_to_tests_and_refreshes() {
        let mut app = signed_in_app();
        load_videos(&mut app, vec![video("v1")]);

        app.open_create_form();
        app.handle_paste("A bolder title");
        app.handle_key_event(key_event(KeyCode::Enter));
        let commands = app.take_commands();
        let (seq, payload) = match commands.as_slice() {
            [Command::CreateTest { seq, payload, .. }] => (*seq, payload.clone()),
            other => panic!("expected create, got {:?}", other),
        };
        assert_eq!(payload.variant_b, "A bolder title");

        app.apply(AppEvent::TestCreated {
            seq,
            result: Ok(Some(ab_test("t-new"))),
        });
        assert!(matches!(app.overlay, Overlay::None));
        assert_eq!(app.view.active_tab, Tab::Tests);
        assert!(app.view.loading);

        let ticket = tests_ticket(&app.take_commands());
        app.apply(AppEvent::TestsLoaded {
            ticket,
            result: Ok(vec![ab_test("t-old"), ab_test("t-new")]),
        });
        assert!(app.tests.iter().any(|t| t.test_id == "t-new"));
    }

    #[test]
    fn test_create_failure_keeps_form_open() {
        let mut app = signed_in_app();
        load_videos(&mut app, vec![video("v1")]);

        app.open_create_form();
        app.handle_paste("B");
        app.handle_key_event(key_event(KeyCode::Enter));
        let seq = match app.take_commands().as_slice() {
            [Command::CreateTest { seq, .. }] => *seq,
            other => panic!("expected create, got {:?}", other),
        };

        app.apply(AppEvent::TestCreated {
            seq,
            result: Err(ApiError::Status {
                status: 400,
                message: Some("No channel selected".to_string()),
            }),
        });

        match &app.overlay {
            Overlay::CreateTest(form) => {
                assert_eq!(form.error.as_deref(), Some("No channel selected"));
                assert!(!form.submitting);
            }
            other => panic!("expected form, got {:?}", other),
        }
        assert_eq!(app.view.active_tab, Tab::Videos);
    }

    #[test]
    fn test_create_completion_after_cancel_is_dropped() {
        let mut app = signed_in_app();
        load_videos(&mut app, vec![video("v1")]);

        app.open_create_form();
        app.handle_paste("B");
        app.handle_key_event(key_event(KeyCode::Enter));
        let seq = match app.take_commands().as_slice() {
            [Command::CreateTest { seq, .. }] => *seq,
            other => panic!("expected create, got {:?}", other),
        };
        app.handle_key_event(key_event(KeyCode::Esc));

        app.apply(AppEvent::TestCreated {
            seq,
            result: Ok(None),
        });
        assert_eq!(app.view.active_tab, Tab::Videos);
        assert!(app.take_commands().is_empty());
    }

    #[test]
    fn test_selection_stays_in_bounds() {
        let mut app = signed_in_app();
        load_videos(&mut app, vec![video("v1"), video("v2")]);

        app.handle_key_event(key_event(KeyCode::Up));
        assert_eq!(app.selected_video_index, 0);
        app.handle_key_event(key_event(KeyCode::Down));
        app.handle_key_event(key_event(KeyCode::Down));
        assert_eq!(app.selected_video_index, 1);
        assert_eq!(app.selected_video().map(|v| v.id.as_str()), Some("v2"));
    }

    #[test]
    fn test_dismiss_error() {
        let mut app = signed_in_app();
        let ticket = video_ticket(&app.take_commands());
        app.apply(AppEvent::VideosLoaded {
            ticket,
            result: Err(ApiError::Timeout),
        });
        app.handle_key_event(key_event(KeyCode::Char('x')));
        assert!(app.view.error.is_none());
        assert_eq!(app.auth, AuthState::Authenticated);
    }

    #[test]
    fn test_q_quits() {
        let mut app = signed_in_app();
        app.handle_key_event(key_event(KeyCode::Char('q')));
        assert!(app.should_quit);
    }

    #[test]
    fn test_tick_wraps_at_8() {
        let mut app = started_app("http://localhost/");
        for _ in 0..8 {
            app.tick();
        }
        assert_eq!(app.loading_frame, 0);
    }

    #[test]
    fn test_sequencer_settles_only_latest() {
        let mut sequencer = RequestSequencer::default();
        let first = sequencer.issue(Tab::Tests);
        let second = sequencer.issue(Tab::Tests);
        let videos = sequencer.issue(Tab::Videos);

        assert!(!sequencer.settle(first));
        assert!(sequencer.settle(second));
        assert!(!sequencer.settle(second));
        assert!(sequencer.is_pending(Tab::Videos));

        sequencer.invalidate_all();
        assert!(!sequencer.settle(videos));
    }
}
