use crate::api::models::NewComment;
use crate::app::action::Action;
use crate::app::event::AppEvent;
use crate::app::state::*;
use crate::query::{Mutation, MutationOutput, MutationRequest, QueryKey};
use crossterm::event::{Event as CEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tracing::{debug, info};

pub fn handle_event(state: &mut AppState, event: AppEvent) -> Vec<Action> {
    match event {
        AppEvent::Terminal(cevent) => {
            state.dirty = true;
            handle_terminal(state, cevent)
        }
        AppEvent::QueryLoaded {
            key,
            ticket,
            result,
        } => {
            if let Err(ref message) = result {
                debug!(%key, %message, "query failed");
            }
            state.queries.resolve(&key, ticket, result);
            clamp_selections(state);
            state.dirty = true;
            vec![]
        }
        AppEvent::MutationFinished {
            mutation,
            session,
            result,
        } => {
            if session != state.session_epoch {
                debug!(%mutation, "result from an ended session dropped");
                return vec![];
            }
            state.dirty = true;
            handle_mutation_finished(state, mutation, result)
        }
        AppEvent::PollDue(key) => {
            if state.session.is_authenticated() {
                vec![Action::Fetch(key)]
            } else {
                vec![]
            }
        }
        AppEvent::ExportFinished {
            feedback_id,
            session,
            result,
        } => {
            if session != state.session_epoch {
                debug!(feedback_id, "export from an ended session dropped");
                return vec![];
            }
            state.exporting = None;
            match result {
                Ok(path) => state.info(format!("Feedback #{} saved to {}", feedback_id, path.display())),
                Err(message) => state.error(format!("Export failed: {}", message)),
            }
            vec![]
        }
        AppEvent::HealthChecked(result) => {
            state.backend = match result {
                Ok(health) => BackendStatus::Healthy(health),
                Err(message) => BackendStatus::Unreachable(message),
            };
            state.dirty = true;
            vec![]
        }
        AppEvent::Tick => {
            state.tick_count = state.tick_count.wrapping_add(1);
            // Keep the busy indicator moving
            if state.auth.submitting || state.pending_mutation.is_some() || state.exporting.is_some() {
                state.dirty = true;
            }
            vec![]
        }
    }
}

/// Switch to `screen`: refetch everything it binds and restart its pollers.
pub fn navigate(state: &mut AppState, screen: Screen) -> Vec<Action> {
    state.screen = screen;
    state.dirty = true;
    let bindings = state.bindings();
    let mut actions: Vec<Action> = bindings.iter().map(|b| Action::Fetch(b.key.clone())).collect();
    actions.push(Action::Poll(bindings));
    actions
}

/// Follow-up once login or registration stored a session.
pub fn signed_in(state: &mut AppState) -> Vec<Action> {
    state.session_epoch += 1;
    state.auth.reset();
    if let Some(user) = state.current_user() {
        let greeting = format!("Welcome, {}", user.username);
        state.info(greeting);
    }
    navigate(state, Screen::Dashboard)
}

pub fn sign_in_failed(state: &mut AppState, message: String) {
    state.auth.submitting = false;
    state.auth.error = Some(message);
    state.dirty = true;
}

pub fn logout(state: &mut AppState) -> Vec<Action> {
    state.session.logout();
    state.session_epoch += 1;
    state.reset_views();
    state.screen = Screen::Auth;
    state.info("Signed out");
    vec![Action::Poll(vec![])]
}

fn handle_mutation_finished(
    state: &mut AppState,
    mutation: Mutation,
    result: Result<MutationOutput, String>,
) -> Vec<Action> {
    state.pending_mutation = None;
    let output = match result {
        Ok(output) => output,
        Err(message) => {
            // Forms keep their input so the user can retry
            state.error(message);
            return vec![];
        }
    };

    let reference = match &output {
        MutationOutput::Created(created) => Some(created.id),
        MutationOutput::Acknowledged(ack) => ack.id,
        MutationOutput::User(_) => None,
    };

    match mutation {
        Mutation::SubmitFeedback => {
            state.feedback.form = FeedbackForm::default();
            state.feedback.mode = FeedbackMode::Browse;
        }
        Mutation::SubmitComment => {
            state.feedback.comment.clear();
            state.feedback.mode = FeedbackMode::Browse;
        }
        Mutation::RequestFeedback => {
            state.request = RequestForm::default();
        }
        Mutation::SendNotification => {
            state.team.notify = None;
        }
        Mutation::UpdateProfile => {
            state.profile.editing = false;
            if let MutationOutput::User(user) = output {
                if state.current_user().map(|u| u.id) == Some(user.id) {
                    state.session.update_user(user);
                }
            }
        }
        Mutation::MarkNotificationRead => {}
    }
    info!(%mutation, ?reference, "mutation succeeded");
    match reference {
        Some(id) => state.info(format!("{} (#{})", mutation.success_message(), id)),
        None => state.info(mutation.success_message()),
    }

    state
        .queries
        .invalidate(&mutation.invalidates())
        .into_iter()
        .map(Action::Fetch)
        .collect()
}

fn clamp_selections(state: &mut AppState) {
    let feedback_len = state.feedback_list().len();
    state.feedback.selected = state.feedback.selected.min(feedback_len.saturating_sub(1));
    let notes = state.latest_notifications().len();
    state.dashboard.selected_notification =
        state.dashboard.selected_notification.min(notes.saturating_sub(1));
    let roster = state.team_roster().len();
    state.team.selected = state.team.selected.min(roster.saturating_sub(1));
}

fn handle_terminal(state: &mut AppState, event: CEvent) -> Vec<Action> {
    match event {
        CEvent::Key(key) if key.kind == KeyEventKind::Press => handle_key(state, key),
        CEvent::Resize(_, _) => {
            state.dirty = true;
            vec![]
        }
        _ => vec![],
    }
}

fn handle_key(state: &mut AppState, key: KeyEvent) -> Vec<Action> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    // Global keybindings
    if ctrl && key.code == KeyCode::Char('c') {
        return vec![Action::Quit];
    }

    if state.screen == Screen::Auth || !state.session.is_authenticated() {
        return handle_auth_key(state, key);
    }

    if ctrl && key.code == KeyCode::Char('l') {
        return logout(state);
    }

    if let KeyCode::F(n) = key.code {
        if let Some(screen) = Screen::from_function_key(n) {
            return navigate(state, screen);
        }
        return vec![];
    }

    match state.screen {
        Screen::Auth => vec![],
        Screen::Dashboard => handle_dashboard_key(state, key),
        Screen::Feedback => handle_feedback_key(state, key),
        Screen::RequestFeedback => handle_request_key(state, key),
        Screen::Team => handle_team_key(state, key),
        Screen::Profile => handle_profile_key(state, key),
    }
}

/// Shared line editing; other keys are ignored.
fn edit_text(input: &mut TextInput, key: KeyEvent) {
    match key.code {
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => input.insert_char(c),
        KeyCode::Backspace if key.modifiers.contains(KeyModifiers::ALT) => input.delete_word_back(),
        KeyCode::Backspace => input.delete_back(),
        KeyCode::Delete => input.delete_forward(),
        KeyCode::Left => input.move_left(),
        KeyCode::Right => input.move_right(),
        KeyCode::Home => input.move_home(),
        KeyCode::End => input.move_end(),
        _ => {}
    }
}

fn step(focus: usize, len: usize, forward: bool) -> usize {
    if forward {
        (focus + 1) % len
    } else {
        (focus + len - 1) % len
    }
}

fn move_selection(selected: &mut usize, len: usize, key: KeyCode) {
    match key {
        KeyCode::Up => *selected = selected.saturating_sub(1),
        KeyCode::Down if len > 0 => *selected = (*selected + 1).min(len - 1),
        KeyCode::Home => *selected = 0,
        KeyCode::End => *selected = len.saturating_sub(1),
        _ => {}
    }
}

fn refresh(state: &mut AppState) -> Vec<Action> {
    state.bindings().into_iter().map(|b| Action::Fetch(b.key)).collect()
}

fn mutate(state: &mut AppState, request: MutationRequest) -> Vec<Action> {
    if let Some(pending) = state.pending_mutation {
        state.error(format!("Still waiting for {}", pending));
        return vec![];
    }
    state.pending_mutation = Some(request.kind());
    vec![Action::Mutate(request)]
}

// -- auth ----------------------------------------------------------------

fn handle_auth_key(state: &mut AppState, key: KeyEvent) -> Vec<Action> {
    let form = &mut state.auth;
    if form.submitting {
        return vec![];
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('r') {
        form.toggle_mode();
        return vec![];
    }

    let len = form.fields().len();
    match key.code {
        KeyCode::Tab | KeyCode::Down => {
            form.focus = step(form.focus, len, true);
            vec![]
        }
        KeyCode::BackTab | KeyCode::Up => {
            form.focus = step(form.focus, len, false);
            vec![]
        }
        KeyCode::Enter => match form.submission() {
            Ok(AuthSubmission::Login { username, password }) => {
                form.error = None;
                form.submitting = true;
                vec![Action::Login { username, password }]
            }
            Ok(AuthSubmission::Register(data)) => {
                form.error = None;
                form.submitting = true;
                vec![Action::Register(data)]
            }
            Err(message) => {
                form.error = Some(message);
                vec![]
            }
        },
        _ if form.focused() == AuthField::Role => {
            if matches!(key.code, KeyCode::Left | KeyCode::Right | KeyCode::Char(' ')) {
                form.role = form.role.toggle();
            }
            vec![]
        }
        _ => {
            if let Some(input) = form.focused_input() {
                edit_text(input, key);
            }
            vec![]
        }
    }
}

// -- dashboard -----------------------------------------------------------

fn handle_dashboard_key(state: &mut AppState, key: KeyEvent) -> Vec<Action> {
    let len = state.latest_notifications().len();
    match key.code {
        KeyCode::Enter => {
            let target = state
                .latest_notifications()
                .get(state.dashboard.selected_notification)
                .filter(|n| !n.read)
                .map(|n| n.id);
            match target {
                Some(notification_id) => {
                    mutate(state, MutationRequest::MarkNotificationRead { notification_id })
                }
                None => vec![],
            }
        }
        KeyCode::Char('r') => refresh(state),
        code => {
            move_selection(&mut state.dashboard.selected_notification, len, code);
            vec![]
        }
    }
}

// -- feedback ------------------------------------------------------------

fn handle_feedback_key(state: &mut AppState, key: KeyEvent) -> Vec<Action> {
    match state.feedback.mode {
        FeedbackMode::Browse => handle_feedback_browse_key(state, key),
        FeedbackMode::Compose => handle_feedback_compose_key(state, key),
        FeedbackMode::Comment => handle_comment_key(state, key),
        FeedbackMode::Filter => handle_filter_key(state, key),
    }
}

fn handle_feedback_browse_key(state: &mut AppState, key: KeyEvent) -> Vec<Action> {
    let selected_id = state.selected_feedback().map(|f| f.id);
    match key.code {
        KeyCode::Enter => {
            if let Some(id) = selected_id {
                state.feedback.expanded = if state.feedback.expanded == Some(id) {
                    None
                } else {
                    Some(id)
                };
            }
            vec![]
        }
        KeyCode::Char('n') => {
            state.feedback.mode = FeedbackMode::Compose;
            vec![]
        }
        KeyCode::Char('c') => {
            if selected_id.is_some() {
                state.feedback.comment.clear();
                state.feedback.mode = FeedbackMode::Comment;
            }
            vec![]
        }
        KeyCode::Char('e') => match selected_id {
            Some(_) if state.exporting.is_some() => {
                state.error("An export is already running");
                vec![]
            }
            Some(feedback_id) => {
                state.exporting = Some(feedback_id);
                state.info(format!("Exporting feedback #{}...", feedback_id));
                vec![Action::Export { feedback_id }]
            }
            None => vec![],
        },
        KeyCode::Char('/') => {
            let current = state.feedback.filter.join(", ");
            state.feedback.filter_input.set(&current);
            state.feedback.mode = FeedbackMode::Filter;
            vec![]
        }
        KeyCode::Char('r') => refresh(state),
        code => {
            let len = state.feedback_list().len();
            move_selection(&mut state.feedback.selected, len, code);
            vec![]
        }
    }
}

fn handle_feedback_compose_key(state: &mut AppState, key: KeyEvent) -> Vec<Action> {
    let len = FeedbackField::ALL.len();
    let field = state.feedback.form.focused();
    // Enter on a tag box with text adds the tag rather than submitting
    let typing_tag = field == FeedbackField::Tags && !state.feedback.form.tags.input.is_blank();
    match key.code {
        KeyCode::Esc => {
            state.feedback.mode = FeedbackMode::Browse;
            return vec![];
        }
        KeyCode::Tab | KeyCode::Down => {
            state.feedback.form.focus = step(state.feedback.form.focus, len, true);
            return vec![];
        }
        KeyCode::BackTab | KeyCode::Up => {
            state.feedback.form.focus = step(state.feedback.form.focus, len, false);
            return vec![];
        }
        KeyCode::Enter if !typing_tag => {
            return match state.feedback.form.build() {
                Ok(feedback) => mutate(state, MutationRequest::SubmitFeedback(feedback)),
                Err(message) => {
                    state.error(message);
                    vec![]
                }
            };
        }
        _ => {}
    }

    match field {
        FeedbackField::Receiver => {
            let forward = match key.code {
                KeyCode::Right | KeyCode::Char(' ') => true,
                KeyCode::Left => false,
                _ => return vec![],
            };
            let current = state.feedback.form.receiver_id;
            state.feedback.form.receiver_id =
                cycle_user(state.queries.team_members(), current, forward);
        }
        FeedbackField::Strengths => {
            edit_text(&mut state.feedback.form.strengths, key);
        }
        FeedbackField::Areas => {
            edit_text(&mut state.feedback.form.areas, key);
        }
        FeedbackField::Sentiment => {
            if matches!(key.code, KeyCode::Left | KeyCode::Right | KeyCode::Char(' ')) {
                let form = &mut state.feedback.form;
                form.sentiment = form.sentiment.next();
            }
        }
        FeedbackField::Tags => edit_tags(&mut state.feedback.form.tags, key),
        FeedbackField::Anonymous => {
            if key.code == KeyCode::Char(' ') {
                state.feedback.form.anonymous = !state.feedback.form.anonymous;
            }
        }
    }
    vec![]
}

/// Left/Right browse suggestions, Ctrl+A adds the highlighted one, Enter adds
/// typed text and Backspace on an empty box drops the last tag.
fn edit_tags(tags: &mut TagSet, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Left => tags.prev_suggestion(),
        KeyCode::Right => tags.next_suggestion(),
        KeyCode::Char('a') if ctrl => {
            tags.add_suggestion();
        }
        KeyCode::Enter => {
            tags.commit_input();
        }
        KeyCode::Char(',') => {
            tags.commit_input();
        }
        KeyCode::Backspace if tags.input.text.is_empty() => {
            tags.pop();
        }
        _ => {
            edit_text(&mut tags.input, key);
        }
    }
}

fn handle_comment_key(state: &mut AppState, key: KeyEvent) -> Vec<Action> {
    match key.code {
        KeyCode::Esc => {
            state.feedback.mode = FeedbackMode::Browse;
            vec![]
        }
        KeyCode::Enter => {
            let Some(feedback_id) = state.selected_feedback().map(|f| f.id) else {
                state.feedback.mode = FeedbackMode::Browse;
                return vec![];
            };
            if state.feedback.comment.is_blank() {
                state.error("Comment is required");
                return vec![];
            }
            let comment = NewComment {
                content: state.feedback.comment.value().to_string(),
            };
            mutate(
                state,
                MutationRequest::SubmitComment {
                    feedback_id,
                    comment,
                },
            )
        }
        _ => {
            edit_text(&mut state.feedback.comment, key);
            vec![]
        }
    }
}

fn handle_filter_key(state: &mut AppState, key: KeyEvent) -> Vec<Action> {
    match key.code {
        KeyCode::Esc => {
            state.feedback.mode = FeedbackMode::Browse;
            vec![]
        }
        KeyCode::Enter => {
            let filter = parse_tag_filter(&state.feedback.filter_input.text);
            state.feedback.mode = FeedbackMode::Browse;
            if filter == state.feedback.filter {
                return vec![];
            }
            state.feedback.filter = filter;
            state.feedback.selected = 0;
            state.feedback.expanded = None;
            vec![Action::Fetch(state.feedback.list_key())]
        }
        _ => {
            edit_text(&mut state.feedback.filter_input, key);
            vec![]
        }
    }
}

// -- request feedback ----------------------------------------------------

fn handle_request_key(state: &mut AppState, key: KeyEvent) -> Vec<Action> {
    let len = RequestField::ALL.len();
    let field = state.request.focused();
    let typing_tag = field == RequestField::Tags && !state.request.tags.input.is_blank();
    match key.code {
        KeyCode::Esc => {
            state.request = RequestForm::default();
            return vec![];
        }
        KeyCode::Tab | KeyCode::Down => {
            state.request.focus = step(state.request.focus, len, true);
            return vec![];
        }
        KeyCode::BackTab | KeyCode::Up => {
            state.request.focus = step(state.request.focus, len, false);
            return vec![];
        }
        KeyCode::Enter if !typing_tag => {
            return match state.request.build() {
                Ok(request) => mutate(state, MutationRequest::RequestFeedback(request)),
                Err(message) => {
                    state.error(message);
                    vec![]
                }
            };
        }
        _ => {}
    }

    let form = &mut state.request;
    match field {
        RequestField::Receiver => {
            let forward = match key.code {
                KeyCode::Right | KeyCode::Char(' ') => true,
                KeyCode::Left => false,
                _ => return vec![],
            };
            form.receiver_id = cycle_user(state.queries.team_members(), form.receiver_id, forward);
        }
        RequestField::Message => {
            edit_text(&mut form.message, key);
        }
        RequestField::Tags => edit_tags(&mut form.tags, key),
        RequestField::Anonymous => {
            if key.code == KeyCode::Char(' ') {
                form.anonymous = !form.anonymous;
            }
        }
        RequestField::Priority => match key.code {
            KeyCode::Right | KeyCode::Char(' ') => form.priority = form.priority.next(),
            KeyCode::Left => form.priority = form.priority.prev(),
            _ => {}
        },
        RequestField::DueDate => {
            edit_text(&mut form.due_date, key);
        }
    }
    vec![]
}

// -- team ----------------------------------------------------------------

fn handle_team_key(state: &mut AppState, key: KeyEvent) -> Vec<Action> {
    if let Some(form) = state.team.notify.as_mut() {
        match key.code {
            KeyCode::Esc => state.team.notify = None,
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                form.focus = step(form.focus, 2, true);
            }
            KeyCode::Enter => {
                return match form.build() {
                    Ok(notification) => {
                        mutate(state, MutationRequest::SendNotification(notification))
                    }
                    Err(message) => {
                        state.error(message);
                        vec![]
                    }
                };
            }
            _ => {
                edit_text(form.focused_input(), key);
            }
        }
        return vec![];
    }

    let selected_id = state
        .team_roster()
        .get(state.team.selected)
        .map(|m| m.user.id);
    match key.code {
        KeyCode::Enter => match selected_id {
            Some(id) => {
                state.team.detail = Some(id);
                vec![Action::Fetch(QueryKey::User(id))]
            }
            None => vec![],
        },
        KeyCode::Esc => {
            state.team.detail = None;
            vec![]
        }
        KeyCode::Char('m') => {
            if let Some(id) = selected_id {
                state.team.notify = Some(NotifyForm::new(id));
            }
            vec![]
        }
        KeyCode::Char('r') => refresh(state),
        code => {
            let len = state.team_roster().len();
            move_selection(&mut state.team.selected, len, code);
            vec![]
        }
    }
}

// -- profile -------------------------------------------------------------

fn handle_profile_key(state: &mut AppState, key: KeyEvent) -> Vec<Action> {
    let current = state
        .queries
        .user(&QueryKey::Profile)
        .or_else(|| state.current_user())
        .cloned();
    let Some(current) = current else {
        return vec![];
    };

    if !state.profile.editing {
        return match key.code {
            KeyCode::Char('e') => {
                state.profile.begin_edit(&current);
                vec![]
            }
            KeyCode::Char('r') => refresh(state),
            _ => vec![],
        };
    }

    match key.code {
        KeyCode::Esc => {
            state.profile.editing = false;
            vec![]
        }
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
            state.profile.focus = step(state.profile.focus, 2, true);
            vec![]
        }
        KeyCode::Enter => match state.profile.build(&current) {
            Ok(update) => mutate(
                state,
                MutationRequest::UpdateProfile {
                    user_id: current.id,
                    update,
                },
            ),
            Err(message) => {
                state.error(message);
                vec![]
            }
        },
        _ => {
            edit_text(state.profile.focused_input(), key);
            vec![]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{Created, Feedback, Role, Sentiment, User};
    use crate::config::AppConfig;
    use crate::query::{FetchTicket, QueryData};
    use crate::session::{MemoryStorage, SessionStore};

    fn user() -> User {
        User {
            id: 1,
            username: "ann".into(),
            email: "ann@x.io".into(),
            role: Role::Employee,
            manager_id: Some(9),
            created_at: String::new(),
        }
    }

    fn feedback(id: u64) -> Feedback {
        Feedback {
            id,
            giver_id: Some(2),
            receiver_id: Some(1),
            giver_name: Some("bob".into()),
            receiver_name: Some("ann".into()),
            strengths: "Clear".into(),
            areas_to_improve: "Tests".into(),
            sentiment: Sentiment::Positive,
            tags: vec![],
            acknowledged: false,
            acknowledged_at: None,
            comments: vec![],
            created_at: "2024-01-01T00:00:00".into(),
            updated_at: None,
        }
    }

    fn signed_out_state() -> AppState {
        let mut session = SessionStore::new(Box::new(MemoryStorage::new()));
        session.restore();
        AppState::new(AppConfig::default(), session)
    }

    fn signed_in_state() -> AppState {
        let mut state = signed_out_state();
        state.session.set_auth_data("tok".into(), user());
        signed_in(&mut state);
        state
    }

    fn press(code: KeyCode) -> AppEvent {
        AppEvent::Terminal(CEvent::Key(KeyEvent::new(code, KeyModifiers::NONE)))
    }

    fn ctrl(c: char) -> AppEvent {
        AppEvent::Terminal(CEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)))
    }

    fn type_text(state: &mut AppState, text: &str) {
        for c in text.chars() {
            handle_event(state, press(KeyCode::Char(c)));
        }
    }

    fn load(state: &mut AppState, key: QueryKey, data: QueryData) {
        let ticket = state.queries.begin_fetch(&key).unwrap();
        handle_event(
            state,
            AppEvent::QueryLoaded {
                key,
                ticket,
                result: Ok(data),
            },
        );
    }

    fn finished(
        state: &AppState,
        mutation: Mutation,
        result: Result<MutationOutput, String>,
    ) -> AppEvent {
        AppEvent::MutationFinished {
            mutation,
            session: state.session_epoch,
            result,
        }
    }

    fn dashboard_total(total: u64) -> QueryData {
        let json = format!(r#"{{"total_feedback": {}}}"#, total);
        QueryData::Dashboard(serde_json::from_str(&json).unwrap())
    }

    /// Start the fetches in `actions` the way the event loop does.
    fn start_fetches(state: &mut AppState, actions: &[Action]) -> Vec<(QueryKey, FetchTicket)> {
        actions
            .iter()
            .filter_map(|a| match a {
                Action::Fetch(key) => state.queries.begin_fetch(key).map(|t| (key.clone(), t)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_signed_in_lands_on_dashboard_with_pollers() {
        let mut state = signed_out_state();
        state.session.set_auth_data("tok".into(), user());
        let actions = signed_in(&mut state);
        assert_eq!(state.screen, Screen::Dashboard);
        assert!(actions.contains(&Action::Fetch(QueryKey::Dashboard)));
        assert!(actions.contains(&Action::Fetch(QueryKey::Notifications)));
        assert!(matches!(actions.last(), Some(Action::Poll(b)) if b.len() == 2));
    }

    #[test]
    fn test_login_form_refuses_missing_fields() {
        let mut state = signed_out_state();
        let actions = handle_event(&mut state, press(KeyCode::Enter));
        assert!(actions.is_empty());
        assert_eq!(state.auth.error.as_deref(), Some("Username is required"));

        type_text(&mut state, "ann");
        handle_event(&mut state, press(KeyCode::Tab));
        type_text(&mut state, "pw");
        let actions = handle_event(&mut state, press(KeyCode::Enter));
        assert_eq!(
            actions,
            vec![Action::Login {
                username: "ann".into(),
                password: "pw".into()
            }]
        );
        assert!(state.auth.submitting);
        // Further input is ignored until the attempt resolves
        assert!(handle_event(&mut state, press(KeyCode::Enter)).is_empty());

        sign_in_failed(&mut state, "Invalid username or password".into());
        assert!(!state.auth.submitting);
        assert_eq!(state.auth.error.as_deref(), Some("Invalid username or password"));
    }

    #[test]
    fn test_ctrl_r_switches_to_register() {
        let mut state = signed_out_state();
        handle_event(&mut state, ctrl('r'));
        assert_eq!(state.auth.mode, AuthMode::Register);
    }

    #[test]
    fn test_successful_feedback_refetches_list_and_dashboard() {
        let mut state = signed_in_state();
        load(&mut state, QueryKey::Dashboard, dashboard_total(0));
        handle_event(&mut state, press(KeyCode::F(2)));
        load(&mut state, QueryKey::Feedback, QueryData::FeedbackList(vec![]));
        state.feedback.mode = FeedbackMode::Compose;
        state.pending_mutation = Some(Mutation::SubmitFeedback);

        let event = finished(
            &state,
            Mutation::SubmitFeedback,
            Ok(MutationOutput::Created(Created {
                id: 5,
                message: "Feedback submitted successfully".into(),
            })),
        );
        let actions = handle_event(&mut state, event);
        assert!(actions.contains(&Action::Fetch(QueryKey::Feedback)));
        assert!(actions.contains(&Action::Fetch(QueryKey::Dashboard)));
        assert_eq!(state.feedback.mode, FeedbackMode::Browse);
        assert_eq!(state.pending_mutation, None);
    }

    #[test]
    fn test_failed_mutation_keeps_form() {
        let mut state = signed_in_state();
        handle_event(&mut state, press(KeyCode::F(2)));
        handle_event(&mut state, press(KeyCode::Char('n')));
        state.feedback.form.strengths.set("Kind");
        let event = finished(&state, Mutation::SubmitFeedback, Err("Receiver not found".into()));
        let actions = handle_event(&mut state, event);
        assert!(actions.is_empty());
        assert_eq!(state.feedback.mode, FeedbackMode::Compose);
        assert_eq!(state.feedback.form.strengths.value(), "Kind");
        assert_eq!(state.status.as_ref().map(|s| s.kind.clone()), Some(StatusKind::Error));
    }

    #[test]
    fn test_compose_submits_once() {
        let mut state = signed_in_state();
        load(
            &mut state,
            QueryKey::TeamMembers,
            QueryData::Users(vec![User { id: 2, ..user() }]),
        );
        handle_event(&mut state, press(KeyCode::F(2)));
        handle_event(&mut state, press(KeyCode::Char('n')));
        handle_event(&mut state, press(KeyCode::Right));
        assert_eq!(state.feedback.form.receiver_id, Some(2));
        handle_event(&mut state, press(KeyCode::Tab));
        type_text(&mut state, "Clear docs");
        handle_event(&mut state, press(KeyCode::Tab));
        type_text(&mut state, "More tests");

        let actions = handle_event(&mut state, press(KeyCode::Enter));
        assert!(matches!(
            actions.as_slice(),
            [Action::Mutate(MutationRequest::SubmitFeedback(f))] if f.receiver_id == 2
        ));
        assert!(handle_event(&mut state, press(KeyCode::Enter)).is_empty());
    }

    #[test]
    fn test_tag_filter_switches_query() {
        let mut state = signed_in_state();
        handle_event(&mut state, press(KeyCode::F(2)));
        handle_event(&mut state, press(KeyCode::Char('/')));
        type_text(&mut state, "quality, teamwork");
        let actions = handle_event(&mut state, press(KeyCode::Enter));
        let key = QueryKey::FeedbackByTags(vec!["quality".into(), "teamwork".into()]);
        assert_eq!(actions, vec![Action::Fetch(key.clone())]);
        assert_eq!(state.feedback.list_key(), key);
        assert!(state.bindings().iter().any(|b| b.key == key));
    }

    #[test]
    fn test_comment_and_export_target_selected_feedback() {
        let mut state = signed_in_state();
        handle_event(&mut state, press(KeyCode::F(2)));
        load(
            &mut state,
            QueryKey::Feedback,
            QueryData::FeedbackList(vec![feedback(7), feedback(8)]),
        );
        handle_event(&mut state, press(KeyCode::Down));

        let actions = handle_event(&mut state, press(KeyCode::Char('e')));
        assert_eq!(actions, vec![Action::Export { feedback_id: 8 }]);
        assert!(handle_event(&mut state, press(KeyCode::Char('e'))).is_empty());

        handle_event(&mut state, press(KeyCode::Char('c')));
        assert!(handle_event(&mut state, press(KeyCode::Enter)).is_empty());
        type_text(&mut state, "Thanks!");
        let actions = handle_event(&mut state, press(KeyCode::Enter));
        assert_eq!(
            actions,
            vec![Action::Mutate(MutationRequest::SubmitComment {
                feedback_id: 8,
                comment: NewComment {
                    content: "Thanks!".into()
                },
            })]
        );
    }

    #[test]
    fn test_logout_clears_session_and_pollers() {
        let mut state = signed_in_state();
        let actions = handle_event(&mut state, ctrl('l'));
        assert_eq!(actions, vec![Action::Poll(vec![])]);
        assert_eq!(state.screen, Screen::Auth);
        assert!(!state.session.is_authenticated());
        assert!(state.queries.dashboard().is_none());
    }

    #[test]
    fn test_polls_ignored_when_signed_out() {
        let mut state = signed_out_state();
        assert!(handle_event(&mut state, AppEvent::PollDue(QueryKey::Dashboard)).is_empty());
        let mut state = signed_in_state();
        assert_eq!(
            handle_event(&mut state, AppEvent::PollDue(QueryKey::Notifications)),
            vec![Action::Fetch(QueryKey::Notifications)]
        );
    }

    #[test]
    fn test_profile_update_refreshes_session_user() {
        let mut state = signed_in_state();
        handle_event(&mut state, press(KeyCode::F(5)));
        handle_event(&mut state, press(KeyCode::Char('e')));
        assert!(state.profile.editing);
        handle_event(&mut state, press(KeyCode::End));
        type_text(&mut state, "2");
        let actions = handle_event(&mut state, press(KeyCode::Enter));
        assert!(matches!(
            actions.as_slice(),
            [Action::Mutate(MutationRequest::UpdateProfile { user_id: 1, update })]
                if update.username.as_deref() == Some("ann2") && update.email.is_none()
        ));

        let renamed = User {
            username: "ann2".into(),
            ..user()
        };
        let event = finished(&state, Mutation::UpdateProfile, Ok(MutationOutput::User(renamed)));
        handle_event(&mut state, event);
        assert_eq!(state.current_user().map(|u| u.username.as_str()), Some("ann2"));
        assert_eq!(state.session.token(), Some("tok"));
        assert!(!state.profile.editing);
    }

    #[test]
    fn test_mutation_during_poll_still_refetches() {
        let mut state = signed_in_state();
        load(&mut state, QueryKey::Dashboard, dashboard_total(1));
        let poll = state.queries.begin_fetch(&QueryKey::Dashboard).unwrap();

        let event = finished(
            &state,
            Mutation::SubmitFeedback,
            Ok(MutationOutput::Created(Created {
                id: 3,
                message: "Feedback submitted successfully".into(),
            })),
        );
        let actions = handle_event(&mut state, event);
        let started = start_fetches(&mut state, &actions);
        let refetch = started
            .iter()
            .find(|(key, _)| *key == QueryKey::Dashboard)
            .map(|(_, ticket)| *ticket)
            .expect("dashboard refetch started");

        // The poll answered with data from before the submit
        handle_event(
            &mut state,
            AppEvent::QueryLoaded {
                key: QueryKey::Dashboard,
                ticket: poll,
                result: Ok(dashboard_total(1)),
            },
        );
        assert!(state.queries.entry(&QueryKey::Dashboard).unwrap().stale);

        handle_event(
            &mut state,
            AppEvent::QueryLoaded {
                key: QueryKey::Dashboard,
                ticket: refetch,
                result: Ok(dashboard_total(2)),
            },
        );
        assert_eq!(state.queries.dashboard().map(|d| d.total_feedback), Some(2));
        assert!(!state.queries.entry(&QueryKey::Dashboard).unwrap().stale);
    }

    #[test]
    fn test_results_from_previous_session_are_dropped() {
        let mut state = signed_in_state();
        let actions = navigate(&mut state, Screen::Dashboard);
        let started = start_fetches(&mut state, &actions);
        let (_, ticket) = started
            .into_iter()
            .find(|(key, _)| *key == QueryKey::Dashboard)
            .unwrap();
        state.pending_mutation = Some(Mutation::SubmitFeedback);
        let stale_mutation = finished(
            &state,
            Mutation::SubmitFeedback,
            Ok(MutationOutput::Created(Created {
                id: 4,
                message: "Feedback submitted successfully".into(),
            })),
        );
        let stale_export = AppEvent::ExportFinished {
            feedback_id: 4,
            session: state.session_epoch,
            result: Ok("/tmp/feedback_4.txt".into()),
        };

        handle_event(&mut state, ctrl('l'));
        state.session.set_auth_data(
            "tok2".into(),
            User {
                id: 2,
                username: "zed".into(),
                ..user()
            },
        );
        let actions = signed_in(&mut state);
        start_fetches(&mut state, &actions);

        handle_event(
            &mut state,
            AppEvent::QueryLoaded {
                key: QueryKey::Dashboard,
                ticket,
                result: Ok(dashboard_total(42)),
            },
        );
        assert!(state.queries.dashboard().is_none());
        assert!(state.queries.is_loading(&QueryKey::Dashboard));

        state.exporting = Some(9);
        assert!(handle_event(&mut state, stale_mutation).is_empty());
        assert!(handle_event(&mut state, stale_export).is_empty());
        assert_eq!(state.exporting, Some(9));
        assert_eq!(
            state.status.as_ref().map(|s| s.text.as_str()),
            Some("Welcome, zed")
        );
    }
}
