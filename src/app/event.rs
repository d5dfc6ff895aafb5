use crate::api::models::Health;
use crate::query::{FetchTicket, Mutation, MutationOutput, QueryData, QueryKey};
use crossterm::event::Event as CrosstermEvent;
use std::path::PathBuf;

/// Everything the main loop reacts to. Background tasks report back through
/// this channel; failures arrive already turned into user-facing text.
#[derive(Debug)]
pub enum AppEvent {
    /// Terminal input event
    Terminal(CrosstermEvent),

    /// A query fetch completed
    QueryLoaded {
        key: QueryKey,
        ticket: FetchTicket,
        result: Result<QueryData, String>,
    },

    /// `session` is the epoch the mutation was started in
    MutationFinished {
        mutation: Mutation,
        session: u64,
        result: Result<MutationOutput, String>,
    },

    /// A poller asks for `key` to be refreshed
    PollDue(QueryKey),

    ExportFinished {
        feedback_id: u64,
        session: u64,
        result: Result<PathBuf, String>,
    },

    HealthChecked(Result<Health, String>),

    /// Tick for UI refresh
    Tick,
}
