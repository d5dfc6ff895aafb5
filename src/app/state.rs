use crate::api::models::{
    Feedback, Health, NewFeedback, NewFeedbackRequest, NewNotification, Notification,
    ProfileUpdate, RegisterData, Role, Sentiment, TeamMember, User,
};
use crate::config::{AppConfig, PollingConfig};
use crate::metrics;
use crate::query::{Mutation, QueryBinding, QueryCache, QueryKey};
use crate::session::SessionStore;
use chrono::NaiveDate;
use unicode_width::UnicodeWidthStr;

/// Tags offered as suggestions on the feedback and request forms.
pub const AVAILABLE_TAGS: [&str; 12] = [
    "communication",
    "leadership",
    "teamwork",
    "problem-solving",
    "technical-skills",
    "time-management",
    "creativity",
    "adaptability",
    "collaboration",
    "initiative",
    "quality",
    "efficiency",
];

pub const DUE_DATE_FORMAT: &str = "%Y-%m-%d";
pub const DASHBOARD_NOTIFICATIONS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Auth,
    Dashboard,
    Feedback,
    RequestFeedback,
    Team,
    Profile,
}

impl Screen {
    /// Screens reachable from the navigation bar, in F-key order.
    pub const NAV: [Screen; 5] = [
        Screen::Dashboard,
        Screen::Feedback,
        Screen::RequestFeedback,
        Screen::Team,
        Screen::Profile,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Screen::Auth => "Sign in",
            Screen::Dashboard => "Dashboard",
            Screen::Feedback => "Feedback",
            Screen::RequestFeedback => "Request Feedback",
            Screen::Team => "Team",
            Screen::Profile => "Profile",
        }
    }

    /// F1..F5
    pub fn from_function_key(n: u8) -> Option<Screen> {
        Screen::NAV.get(usize::from(n).checked_sub(1)?).copied()
    }
}

// -- text input ---------------------------------------------------------

/// Single-line editable text with a byte-offset cursor.
#[derive(Debug, Clone, Default)]
pub struct TextInput {
    pub text: String,
    pub cursor: usize,
    pub masked: bool,
}

impl TextInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn masked() -> Self {
        Self {
            masked: true,
            ..Self::default()
        }
    }

    pub fn insert_char(&mut self, c: char) {
        self.text.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    pub fn delete_back(&mut self) {
        if self.cursor > 0 {
            let prev = self.prev_boundary();
            self.text.drain(prev..self.cursor);
            self.cursor = prev;
        }
    }

    pub fn delete_forward(&mut self) {
        if self.cursor < self.text.len() {
            let next = self.next_boundary();
            self.text.drain(self.cursor..next);
        }
    }

    pub fn delete_word_back(&mut self) {
        let before = &self.text[..self.cursor];
        let trimmed = before.trim_end_matches(' ');
        let start = trimmed.rfind(' ').map(|i| i + 1).unwrap_or(0);
        self.text.drain(start..self.cursor);
        self.cursor = start;
    }

    pub fn move_left(&mut self) {
        self.cursor = self.prev_boundary();
    }

    pub fn move_right(&mut self) {
        self.cursor = self.next_boundary();
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.text.len();
    }

    pub fn set(&mut self, text: &str) {
        self.text = text.to_string();
        self.cursor = self.text.len();
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    pub fn value(&self) -> &str {
        self.text.trim()
    }

    pub fn is_blank(&self) -> bool {
        self.value().is_empty()
    }

    /// Text as it should appear on screen.
    pub fn display(&self) -> String {
        if self.masked {
            "*".repeat(self.text.chars().count())
        } else {
            self.text.clone()
        }
    }

    /// Terminal columns between the start of the text and the cursor.
    pub fn cursor_column(&self) -> usize {
        if self.masked {
            self.text[..self.cursor].chars().count()
        } else {
            self.text[..self.cursor].width()
        }
    }

    fn prev_boundary(&self) -> usize {
        self.text[..self.cursor]
            .char_indices()
            .next_back()
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    fn next_boundary(&self) -> usize {
        self.text[self.cursor..]
            .chars()
            .next()
            .map(|c| self.cursor + c.len_utf8())
            .unwrap_or(self.text.len())
    }
}

// -- tags ----------------------------------------------------------------

/// Tags chosen for a form: free text plus the suggestion list. Tags are
/// trimmed and kept unique in insertion order.
#[derive(Debug, Clone, Default)]
pub struct TagSet {
    pub selected: Vec<String>,
    pub input: TextInput,
    pub suggestion: usize,
}

impl TagSet {
    pub fn add(&mut self, tag: &str) -> bool {
        let tag = tag.trim();
        if tag.is_empty() || self.selected.iter().any(|t| t == tag) {
            return false;
        }
        self.selected.push(tag.to_string());
        true
    }

    /// Add whatever is typed in the tag box and clear it.
    pub fn commit_input(&mut self) -> bool {
        let text = self.input.text.clone();
        self.input.clear();
        self.add(&text)
    }

    pub fn pop(&mut self) -> Option<String> {
        self.selected.pop()
    }

    pub fn next_suggestion(&mut self) {
        self.suggestion = (self.suggestion + 1) % AVAILABLE_TAGS.len();
    }

    pub fn prev_suggestion(&mut self) {
        self.suggestion = (self.suggestion + AVAILABLE_TAGS.len() - 1) % AVAILABLE_TAGS.len();
    }

    pub fn current_suggestion(&self) -> &'static str {
        AVAILABLE_TAGS[self.suggestion % AVAILABLE_TAGS.len()]
    }

    /// Suggestions already chosen are disabled.
    pub fn is_selected(&self, tag: &str) -> bool {
        self.selected.iter().any(|t| t == tag)
    }

    pub fn add_suggestion(&mut self) -> bool {
        let tag = self.current_suggestion();
        self.add(tag)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.selected.clone()
    }
}

/// Parse a comma separated tag filter.
pub fn parse_tag_filter(text: &str) -> Vec<String> {
    let mut tags = TagSet::default();
    for tag in text.split(',') {
        tags.add(tag);
    }
    tags.selected
}

fn required(input: &TextInput, field: &str) -> Result<String, String> {
    if input.is_blank() {
        Err(format!("{} is required", field))
    } else {
        Ok(input.value().to_string())
    }
}

/// Next/previous member id in `users` after `current`, wrapping around.
pub fn cycle_user(users: &[User], current: Option<u64>, forward: bool) -> Option<u64> {
    if users.is_empty() {
        return None;
    }
    let pos = current.and_then(|id| users.iter().position(|u| u.id == id));
    let next = match (pos, forward) {
        (None, true) => 0,
        (None, false) => users.len() - 1,
        (Some(i), true) => (i + 1) % users.len(),
        (Some(i), false) => (i + users.len() - 1) % users.len(),
    };
    Some(users[next].id)
}

// -- auth ----------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Login,
    Register,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthField {
    Username,
    Email,
    Password,
    Role,
    ManagerId,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthSubmission {
    Login { username: String, password: String },
    Register(RegisterData),
}

#[derive(Debug, Clone)]
pub struct AuthForm {
    pub mode: AuthMode,
    pub username: TextInput,
    pub email: TextInput,
    pub password: TextInput,
    pub role: Role,
    pub manager_id: TextInput,
    pub focus: usize,
    pub error: Option<String>,
    pub submitting: bool,
}

impl Default for AuthForm {
    fn default() -> Self {
        Self {
            mode: AuthMode::Login,
            username: TextInput::new(),
            email: TextInput::new(),
            password: TextInput::masked(),
            role: Role::Employee,
            manager_id: TextInput::new(),
            focus: 0,
            error: None,
            submitting: false,
        }
    }
}

impl AuthForm {
    pub fn fields(&self) -> &'static [AuthField] {
        match self.mode {
            AuthMode::Login => &[AuthField::Username, AuthField::Password],
            AuthMode::Register => &[
                AuthField::Username,
                AuthField::Email,
                AuthField::Password,
                AuthField::Role,
                AuthField::ManagerId,
            ],
        }
    }

    pub fn focused(&self) -> AuthField {
        let fields = self.fields();
        fields[self.focus.min(fields.len() - 1)]
    }

    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            AuthMode::Login => AuthMode::Register,
            AuthMode::Register => AuthMode::Login,
        };
        self.focus = 0;
        self.error = None;
    }

    pub fn focused_input(&mut self) -> Option<&mut TextInput> {
        match self.focused() {
            AuthField::Username => Some(&mut self.username),
            AuthField::Email => Some(&mut self.email),
            AuthField::Password => Some(&mut self.password),
            AuthField::ManagerId => Some(&mut self.manager_id),
            AuthField::Role => None,
        }
    }

    pub fn submission(&self) -> Result<AuthSubmission, String> {
        let username = required(&self.username, "Username")?;
        match self.mode {
            AuthMode::Login => {
                let password = required(&self.password, "Password")?;
                Ok(AuthSubmission::Login { username, password })
            }
            AuthMode::Register => {
                let email = required(&self.email, "Email")?;
                let password = required(&self.password, "Password")?;
                let manager_id = if self.manager_id.is_blank() {
                    None
                } else {
                    Some(
                        self.manager_id
                            .value()
                            .parse::<u64>()
                            .map_err(|_| "Manager ID must be a number".to_string())?,
                    )
                };
                Ok(AuthSubmission::Register(RegisterData {
                    username,
                    email,
                    password,
                    role: Some(self.role),
                    manager_id,
                }))
            }
        }
    }

    /// Forget typed credentials, keeping the chosen mode.
    pub fn reset(&mut self) {
        let mode = self.mode;
        *self = Self::default();
        self.mode = mode;
    }
}

// -- feedback ------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackField {
    Receiver,
    Strengths,
    Areas,
    Sentiment,
    Tags,
    Anonymous,
}

impl FeedbackField {
    pub const ALL: [FeedbackField; 6] = [
        FeedbackField::Receiver,
        FeedbackField::Strengths,
        FeedbackField::Areas,
        FeedbackField::Sentiment,
        FeedbackField::Tags,
        FeedbackField::Anonymous,
    ];
}

#[derive(Debug, Clone, Default)]
pub struct FeedbackForm {
    pub receiver_id: Option<u64>,
    pub strengths: TextInput,
    pub areas: TextInput,
    pub sentiment: Sentiment,
    pub tags: TagSet,
    pub anonymous: bool,
    pub focus: usize,
}

impl FeedbackForm {
    pub fn focused(&self) -> FeedbackField {
        FeedbackField::ALL[self.focus % FeedbackField::ALL.len()]
    }

    pub fn build(&self) -> Result<NewFeedback, String> {
        let receiver_id = self.receiver_id.ok_or("Receiver is required")?;
        let strengths = required(&self.strengths, "Strengths")?;
        let areas_to_improve = required(&self.areas, "Areas to improve")?;
        Ok(NewFeedback {
            receiver_id,
            strengths,
            areas_to_improve,
            sentiment: self.sentiment,
            tags: self.tags.to_vec(),
            is_anonymous: self.anonymous,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackMode {
    Browse,
    Compose,
    Comment,
    Filter,
}

#[derive(Debug, Clone)]
pub struct FeedbackView {
    pub mode: FeedbackMode,
    pub selected: usize,
    pub expanded: Option<u64>,
    pub form: FeedbackForm,
    pub comment: TextInput,
    pub filter: Vec<String>,
    pub filter_input: TextInput,
}

impl Default for FeedbackView {
    fn default() -> Self {
        Self {
            mode: FeedbackMode::Browse,
            selected: 0,
            expanded: None,
            form: FeedbackForm::default(),
            comment: TextInput::new(),
            filter: Vec::new(),
            filter_input: TextInput::new(),
        }
    }
}

impl FeedbackView {
    /// The query backing the list, which depends on the active tag filter.
    pub fn list_key(&self) -> QueryKey {
        if self.filter.is_empty() {
            QueryKey::Feedback
        } else {
            QueryKey::FeedbackByTags(self.filter.clone())
        }
    }
}

// -- requests ------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Priority::Low => Priority::Normal,
            Priority::Normal => Priority::High,
            Priority::High => Priority::Urgent,
            Priority::Urgent => Priority::Low,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Priority::Low => Priority::Urgent,
            Priority::Normal => Priority::Low,
            Priority::High => Priority::Normal,
            Priority::Urgent => Priority::High,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestField {
    Receiver,
    Message,
    Tags,
    Anonymous,
    Priority,
    DueDate,
}

impl RequestField {
    pub const ALL: [RequestField; 6] = [
        RequestField::Receiver,
        RequestField::Message,
        RequestField::Tags,
        RequestField::Anonymous,
        RequestField::Priority,
        RequestField::DueDate,
    ];
}

#[derive(Debug, Clone, Default)]
pub struct RequestForm {
    pub receiver_id: Option<u64>,
    pub message: TextInput,
    pub tags: TagSet,
    pub anonymous: bool,
    pub priority: Priority,
    pub due_date: TextInput,
    pub focus: usize,
}

impl RequestForm {
    pub fn focused(&self) -> RequestField {
        RequestField::ALL[self.focus % RequestField::ALL.len()]
    }

    pub fn build(&self) -> Result<NewFeedbackRequest, String> {
        let receiver_id = self.receiver_id.ok_or("Receiver is required")?;
        let due_date = if self.due_date.is_blank() {
            None
        } else {
            let date = NaiveDate::parse_from_str(self.due_date.value(), DUE_DATE_FORMAT)
                .map_err(|_| "Due date must be YYYY-MM-DD".to_string())?;
            Some(date.format(DUE_DATE_FORMAT).to_string())
        };
        Ok(NewFeedbackRequest {
            receiver_id,
            message: self.message.value().to_string(),
            tags: self.tags.to_vec(),
            is_anonymous: self.anonymous,
            priority: self.priority.as_str().to_string(),
            due_date,
        })
    }
}

// -- team ----------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct NotifyForm {
    pub user_id: u64,
    pub title: TextInput,
    pub message: TextInput,
    pub focus: usize,
}

impl NotifyForm {
    pub fn new(user_id: u64) -> Self {
        Self {
            user_id,
            ..Self::default()
        }
    }

    pub fn focused_input(&mut self) -> &mut TextInput {
        if self.focus % 2 == 0 {
            &mut self.title
        } else {
            &mut self.message
        }
    }

    pub fn build(&self) -> Result<NewNotification, String> {
        Ok(NewNotification {
            user_id: self.user_id,
            title: required(&self.title, "Title")?,
            message: required(&self.message, "Message")?,
            kind: "general".to_string(),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct TeamView {
    pub selected: usize,
    pub detail: Option<u64>,
    pub notify: Option<NotifyForm>,
}

// -- profile -------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct ProfileView {
    pub editing: bool,
    pub username: TextInput,
    pub email: TextInput,
    pub focus: usize,
}

impl ProfileView {
    pub fn begin_edit(&mut self, user: &User) {
        self.editing = true;
        self.username.set(&user.username);
        self.email.set(&user.email);
        self.focus = 0;
    }

    pub fn focused_input(&mut self) -> &mut TextInput {
        if self.focus % 2 == 0 {
            &mut self.username
        } else {
            &mut self.email
        }
    }

    /// Only changed fields are sent.
    pub fn build(&self, current: &User) -> Result<ProfileUpdate, String> {
        let username = required(&self.username, "Username")?;
        let email = required(&self.email, "Email")?;
        let update = ProfileUpdate {
            username: (username != current.username).then_some(username),
            email: (email != current.email).then_some(email),
        };
        if update == ProfileUpdate::default() {
            return Err("Nothing to update".to_string());
        }
        Ok(update)
    }
}

// -- app -----------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct DashboardView {
    pub selected_notification: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatusKind {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusMessage {
    pub text: String,
    pub kind: StatusKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackendStatus {
    Unknown,
    Healthy(Health),
    Unreachable(String),
}

pub struct AppState {
    pub config: AppConfig,
    pub session: SessionStore,
    pub queries: QueryCache,
    pub screen: Screen,
    pub auth: AuthForm,
    pub dashboard: DashboardView,
    pub feedback: FeedbackView,
    pub request: RequestForm,
    pub team: TeamView,
    pub profile: ProfileView,
    pub pending_mutation: Option<Mutation>,
    /// Bumped on every sign-in and sign-out; background results from an
    /// earlier epoch belong to another session.
    pub session_epoch: u64,
    pub exporting: Option<u64>,
    pub status: Option<StatusMessage>,
    pub backend: BackendStatus,
    pub should_quit: bool,
    pub dirty: bool,
    pub tick_count: u64,
}

impl AppState {
    pub fn new(config: AppConfig, session: SessionStore) -> Self {
        Self {
            config,
            session,
            queries: QueryCache::new(),
            screen: Screen::Auth,
            auth: AuthForm::default(),
            dashboard: DashboardView::default(),
            feedback: FeedbackView::default(),
            request: RequestForm::default(),
            team: TeamView::default(),
            profile: ProfileView::default(),
            pending_mutation: None,
            session_epoch: 0,
            exporting: None,
            status: None,
            backend: BackendStatus::Unknown,
            should_quit: false,
            dirty: true,
            tick_count: 0,
        }
    }

    pub fn current_user(&self) -> Option<&User> {
        self.session.user()
    }

    pub fn is_manager(&self) -> bool {
        self.current_user().map(|u| u.role == Role::Manager).unwrap_or(false)
    }

    /// Data the current screen depends on.
    pub fn bindings(&self) -> Vec<QueryBinding> {
        screen_bindings(
            self.screen,
            &self.config.polling,
            &self.feedback,
            self.is_manager(),
        )
    }

    /// Feedback rows currently listed, honouring the tag filter.
    pub fn feedback_list(&self) -> &[Feedback] {
        self.queries.feedback(&self.feedback.list_key())
    }

    pub fn selected_feedback(&self) -> Option<&Feedback> {
        self.feedback_list().get(self.feedback.selected)
    }

    pub fn latest_notifications(&self) -> &[Notification] {
        let all = self.queries.notifications();
        &all[..all.len().min(DASHBOARD_NOTIFICATIONS)]
    }

    /// Roster in display order: grouped by manager, groups sorted by name.
    pub fn team_roster(&self) -> Vec<&TeamMember> {
        metrics::group_by_manager(self.queries.roster())
            .into_values()
            .flatten()
            .collect()
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind: StatusKind::Info,
        });
        self.dirty = true;
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind: StatusKind::Error,
        });
        self.dirty = true;
    }

    /// Drop everything tied to the signed-out user.
    pub fn reset_views(&mut self) {
        self.queries.clear();
        self.dashboard = DashboardView::default();
        self.feedback = FeedbackView::default();
        self.request = RequestForm::default();
        self.team = TeamView::default();
        self.profile = ProfileView::default();
        self.pending_mutation = None;
        self.exporting = None;
        self.auth.reset();
    }
}

pub fn screen_bindings(
    screen: Screen,
    polling: &PollingConfig,
    feedback: &FeedbackView,
    is_manager: bool,
) -> Vec<QueryBinding> {
    match screen {
        Screen::Auth => vec![],
        Screen::Dashboard => vec![
            QueryBinding::polled(QueryKey::Dashboard, polling.dashboard()),
            QueryBinding::polled(QueryKey::Notifications, polling.notifications()),
        ],
        Screen::Feedback => vec![
            QueryBinding::once(feedback.list_key()),
            QueryBinding::once(QueryKey::TeamMembers),
        ],
        Screen::RequestFeedback => vec![
            QueryBinding::once(QueryKey::TeamMembers),
            QueryBinding::once(QueryKey::FeedbackRequests),
        ],
        Screen::Team => vec![QueryBinding::once(QueryKey::Roster)],
        Screen::Profile => {
            let mut bindings = vec![QueryBinding::once(QueryKey::Profile)];
            if is_manager {
                bindings.push(QueryBinding::once(QueryKey::DirectReports));
            }
            bindings
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_text_input_editing() {
        let mut input = TextInput::new();
        for c in "héllo".chars() {
            input.insert_char(c);
        }
        input.move_left();
        input.move_left();
        input.delete_back();
        assert_eq!(input.text, "hélo");
        input.move_home();
        input.delete_forward();
        assert_eq!(input.text, "élo");
        input.move_right();
        assert_eq!(input.cursor, 'é'.len_utf8());
        input.move_end();
        input.insert_char(' ');
        input.insert_char('w');
        input.delete_word_back();
        assert_eq!(input.text, "élo ");
        assert_eq!(input.cursor_column(), 4);
    }

    #[test]
    fn test_masked_input_hides_text() {
        let mut input = TextInput::masked();
        input.set("secret");
        assert_eq!(input.display(), "******");
        assert_eq!(input.value(), "secret");
    }

    #[test]
    fn test_tag_set_rules() {
        let mut tags = TagSet::default();
        assert!(tags.add(" teamwork "));
        assert!(!tags.add("teamwork"));
        assert!(!tags.add("   "));
        tags.input.set("quality");
        assert!(tags.commit_input());
        assert!(tags.input.text.is_empty());
        assert_eq!(tags.to_vec(), vec!["teamwork", "quality"]);

        assert_eq!(tags.pop().as_deref(), Some("quality"));
        assert_eq!(tags.to_vec(), vec!["teamwork"]);

        tags.prev_suggestion();
        assert_eq!(tags.current_suggestion(), "efficiency");
        tags.next_suggestion();
        assert_eq!(tags.current_suggestion(), "communication");
        assert!(tags.add_suggestion());
        assert!(tags.is_selected("communication"));
        assert!(!tags.add_suggestion());
    }

    #[test]
    fn test_parse_tag_filter() {
        assert_eq!(
            parse_tag_filter("quality, teamwork,,quality "),
            vec!["quality", "teamwork"]
        );
        assert!(parse_tag_filter(" , ").is_empty());
    }

    #[test]
    fn test_login_requires_fields() {
        let mut form = AuthForm::default();
        assert_eq!(form.submission(), Err("Username is required".to_string()));
        form.username.set("ann");
        assert_eq!(form.submission(), Err("Password is required".to_string()));
        form.password.set("pw");
        assert_eq!(
            form.submission(),
            Ok(AuthSubmission::Login {
                username: "ann".into(),
                password: "pw".into()
            })
        );
    }

    #[test]
    fn test_register_submission() {
        let mut form = AuthForm::default();
        form.toggle_mode();
        form.username.set("bob");
        form.password.set("pw");
        assert_eq!(form.submission(), Err("Email is required".to_string()));
        form.email.set("b@x.io");
        form.manager_id.set("abc");
        assert!(form.submission().is_err());
        form.manager_id.set("3");
        form.role = form.role.toggle();
        match form.submission() {
            Ok(AuthSubmission::Register(data)) => {
                assert_eq!(data.manager_id, Some(3));
                assert_eq!(data.role, Some(Role::Manager));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(form.fields().len(), 5);
    }

    #[test]
    fn test_feedback_form_required_fields() {
        let mut form = FeedbackForm::default();
        assert_eq!(form.build(), Err("Receiver is required".to_string()));
        form.receiver_id = Some(4);
        form.strengths.set("Clear writing");
        assert_eq!(form.build(), Err("Areas to improve is required".to_string()));
        form.areas.set("More tests");
        form.tags.add("quality");
        let feedback = form.build().unwrap();
        assert_eq!(feedback.receiver_id, 4);
        assert_eq!(feedback.sentiment, Sentiment::Neutral);
        assert_eq!(feedback.tags, vec!["quality"]);
    }

    #[test]
    fn test_request_due_date_validation() {
        let mut form = RequestForm {
            receiver_id: Some(2),
            ..RequestForm::default()
        };
        assert_eq!(form.build().unwrap().due_date, None);
        assert_eq!(form.build().unwrap().priority, "normal");

        form.due_date.set("2024-13-01");
        assert_eq!(form.build(), Err("Due date must be YYYY-MM-DD".to_string()));
        form.due_date.set("31/01/2024");
        assert!(form.build().is_err());
        form.due_date.set("2024-02-29");
        assert_eq!(form.build().unwrap().due_date.as_deref(), Some("2024-02-29"));
    }

    #[test]
    fn test_cycle_user_wraps() {
        let users: Vec<User> = (1..=3)
            .map(|id| User {
                id,
                username: format!("u{}", id),
                email: String::new(),
                role: Role::Employee,
                manager_id: None,
                created_at: String::new(),
            })
            .collect();
        assert_eq!(cycle_user(&users, None, true), Some(1));
        assert_eq!(cycle_user(&users, None, false), Some(3));
        assert_eq!(cycle_user(&users, Some(3), true), Some(1));
        assert_eq!(cycle_user(&users, Some(1), false), Some(3));
        assert_eq!(cycle_user(&[], Some(1), true), None);
    }

    #[test]
    fn test_dashboard_bindings_poll() {
        let polling = PollingConfig::default();
        let bindings = screen_bindings(Screen::Dashboard, &polling, &FeedbackView::default(), false);
        assert_eq!(
            bindings,
            vec![
                QueryBinding::polled(QueryKey::Dashboard, Duration::from_secs(30)),
                QueryBinding::polled(QueryKey::Notifications, Duration::from_secs(10)),
            ]
        );
        assert!(screen_bindings(Screen::Auth, &polling, &FeedbackView::default(), false).is_empty());
    }

    #[test]
    fn test_feedback_bindings_follow_filter() {
        let mut view = FeedbackView::default();
        view.filter = vec!["quality".into()];
        let bindings = screen_bindings(Screen::Feedback, &PollingConfig::default(), &view, false);
        assert_eq!(
            bindings[0].key,
            QueryKey::FeedbackByTags(vec!["quality".into()])
        );
        assert!(bindings.iter().all(|b| b.poll.is_none()));
    }

    #[test]
    fn test_function_keys_map_to_screens() {
        assert_eq!(Screen::from_function_key(1), Some(Screen::Dashboard));
        assert_eq!(Screen::from_function_key(5), Some(Screen::Profile));
        assert_eq!(Screen::from_function_key(0), None);
        assert_eq!(Screen::from_function_key(6), None);
    }
}
