use super::{choice, form_row, input_row, layout, panel, render_help};
use crate::app::state::*;
use crate::ui::theme::Theme;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

pub fn render(frame: &mut Frame, area: Rect, state: &AppState) {
    let form = &state.auth;
    let fields = form.fields();
    // fields + blank + error + blank + help
    let height = fields.len() as u16 + 6;
    let popup = layout::centered(area, 60, height);

    let title = match form.mode {
        AuthMode::Login => "Sign in",
        AuthMode::Register => "Create account",
    };
    let block = panel(title, true);
    let inner = block.inner(popup);
    frame.render_widget(block, popup);

    for (i, field) in fields.iter().enumerate() {
        let row = Rect::new(inner.x, inner.y + i as u16, inner.width, 1);
        if row.y >= inner.bottom() {
            break;
        }
        let focused = !form.submitting && i == form.focus;
        match field {
            AuthField::Username => input_row(frame, row, "Username", &form.username, focused),
            AuthField::Email => input_row(frame, row, "Email", &form.email, focused),
            AuthField::Password => input_row(frame, row, "Password", &form.password, focused),
            AuthField::Role => form_row(frame, row, "Role", choice(form.role.to_string(), focused), focused),
            AuthField::ManagerId => {
                input_row(frame, row, "Manager ID", &form.manager_id, focused)
            }
        }
    }

    let message_y = inner.y + fields.len() as u16 + 1;
    if message_y < inner.bottom() {
        let line = if state.session.loading() {
            Line::from(Span::styled("Restoring session...", Theme::muted()))
        } else if form.submitting {
            Line::from(Span::styled(
                format!("{} Contacting server...", super::spinner(state.tick_count)),
                Theme::warning(),
            ))
        } else if let Some(error) = &form.error {
            Line::from(Span::styled(error.clone(), Theme::error()))
        } else if form.mode == AuthMode::Register {
            Line::from(Span::styled("Manager ID is optional", Theme::muted()))
        } else {
            Line::default()
        };
        frame.render_widget(Paragraph::new(line), Rect::new(inner.x, message_y, inner.width, 1));
    }

    let switch = match form.mode {
        AuthMode::Login => "Register",
        AuthMode::Register => "Sign in",
    };
    render_help(
        frame,
        inner,
        &[("Tab", "Next"), ("Enter", "Submit"), ("Ctrl+R", switch), ("Ctrl+C", "Quit")],
    );
}
