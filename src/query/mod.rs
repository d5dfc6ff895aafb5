//! Declarative data dependencies.
//!
//! Each piece of server data a screen needs is named by a [`QueryKey`] and
//! bound to a fetcher in [`fetch`]. The [`QueryCache`] remembers the last
//! result per key, collapses concurrent fetches of the same key, and tracks
//! which entries were invalidated by a [`Mutation`](mutation::Mutation).

pub mod mutation;
pub mod poller;

use crate::api::models::{
    DashboardData, Feedback, FeedbackRequest, Notification, TeamMember, User,
};
use crate::api::{ApiClient, ApiResult};
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::debug;

pub use mutation::{Mutation, MutationOutput, MutationRequest};
pub use poller::{PollSchedule, Poller};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Dashboard,
    Notifications,
    Feedback,
    FeedbackByTags(Vec<String>),
    /// Receivers offered by the feedback and request forms.
    TeamMembers,
    /// Users with the feedback they received, for the team screen.
    Roster,
    FeedbackRequests,
    Profile,
    /// Direct reports of the signed-in manager.
    DirectReports,
    User(u64),
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryKey::Dashboard => write!(f, "dashboard"),
            QueryKey::Notifications => write!(f, "notifications"),
            QueryKey::Feedback => write!(f, "feedback"),
            QueryKey::FeedbackByTags(tags) => write!(f, "feedback[{}]", tags.join(",")),
            QueryKey::TeamMembers => write!(f, "team-members"),
            QueryKey::Roster => write!(f, "roster"),
            QueryKey::FeedbackRequests => write!(f, "feedback-requests"),
            QueryKey::Profile => write!(f, "profile"),
            QueryKey::DirectReports => write!(f, "direct-reports"),
            QueryKey::User(id) => write!(f, "user/{}", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryData {
    Dashboard(DashboardData),
    Notifications(Vec<Notification>),
    FeedbackList(Vec<Feedback>),
    Users(Vec<User>),
    Roster(Vec<TeamMember>),
    Requests(Vec<FeedbackRequest>),
    User(User),
}

/// A screen's declaration that it needs `key`, optionally refreshed on a
/// fixed interval while the screen is shown.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryBinding {
    pub key: QueryKey,
    pub poll: Option<Duration>,
}

impl QueryBinding {
    pub fn once(key: QueryKey) -> Self {
        Self { key, poll: None }
    }

    pub fn polled(key: QueryKey, every: Duration) -> Self {
        Self {
            key,
            poll: Some(every),
        }
    }
}

/// The fetcher bound to each key.
pub async fn fetch(api: &ApiClient, key: &QueryKey) -> ApiResult<QueryData> {
    let data = match key {
        QueryKey::Dashboard => QueryData::Dashboard(api.dashboard().await?),
        QueryKey::Notifications => QueryData::Notifications(api.notifications().await?),
        QueryKey::Feedback => QueryData::FeedbackList(api.feedback_list().await?),
        QueryKey::FeedbackByTags(tags) => QueryData::FeedbackList(api.feedback_by_tags(tags).await?),
        QueryKey::TeamMembers => QueryData::Users(api.team_members().await?),
        QueryKey::Roster => QueryData::Roster(api.users().await?),
        QueryKey::FeedbackRequests => QueryData::Requests(api.feedback_requests().await?),
        QueryKey::Profile => QueryData::User(api.profile().await?),
        QueryKey::DirectReports => QueryData::Users(api.team().await?),
        QueryKey::User(id) => QueryData::User(api.user(*id).await?),
    };
    Ok(data)
}

/// Identifies one fetch of one key. Results carrying an outdated ticket are
/// dropped by [`QueryCache::resolve`].
pub type FetchTicket = u64;

#[derive(Debug, Default)]
pub struct QueryEntry {
    pub data: Option<QueryData>,
    pub error: Option<String>,
    pub stale: bool,
    pub updated_at: Option<Instant>,
    generation: FetchTicket,
    fetching: Option<FetchTicket>,
}

impl QueryEntry {
    /// A fetch for the current generation is running.
    pub fn in_flight(&self) -> bool {
        self.fetching == Some(self.generation)
    }

    /// First load still pending; nothing to show yet.
    pub fn is_loading(&self) -> bool {
        self.in_flight() && self.data.is_none()
    }
}

#[derive(Debug, Default)]
pub struct QueryCache {
    entries: HashMap<QueryKey, QueryEntry>,
    // Never reset, so tickets handed out before a clear cannot match again
    next_generation: FetchTicket,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(next_generation: &mut FetchTicket) -> FetchTicket {
        *next_generation += 1;
        *next_generation
    }

    /// Mark `key` as being fetched and return the ticket its result must
    /// carry. Returns `None` if a fetch of the current data is already
    /// running. A fetch started before the key was invalidated does not
    /// count: its answer may predate the change.
    pub fn begin_fetch(&mut self, key: &QueryKey) -> Option<FetchTicket> {
        let next_generation = &mut self.next_generation;
        let entry = self.entries.entry(key.clone()).or_insert_with(|| QueryEntry {
            generation: Self::bump(next_generation),
            ..QueryEntry::default()
        });
        if entry.in_flight() {
            debug!(%key, "fetch already in flight, deduplicated");
            return None;
        }
        entry.fetching = Some(entry.generation);
        Some(entry.generation)
    }

    /// Record the outcome of a fetch. A failed refetch keeps the last good
    /// data so the screen does not go blank. Results for an older ticket,
    /// or for a key cleared since, are discarded.
    pub fn resolve(&mut self, key: &QueryKey, ticket: FetchTicket, result: Result<QueryData, String>) {
        let Some(entry) = self.entries.get_mut(key) else {
            debug!(%key, "result for cleared query dropped");
            return;
        };
        if entry.generation != ticket {
            debug!(%key, ticket, current = entry.generation, "outdated result dropped");
            return;
        }
        entry.fetching = None;
        match result {
            Ok(data) => {
                entry.data = Some(data);
                entry.error = None;
                entry.stale = false;
                entry.updated_at = Some(Instant::now());
            }
            Err(message) => {
                entry.error = Some(message);
            }
        }
    }

    /// Mark `keys` stale and return those that are in use, which the caller
    /// must refetch. Fetches already running for them become outdated.
    pub fn invalidate(&mut self, keys: &[QueryKey]) -> Vec<QueryKey> {
        let mut refetch = Vec::new();
        for (key, entry) in self.entries.iter_mut() {
            let tagged_view =
                matches!(key, QueryKey::FeedbackByTags(_)) && keys.contains(&QueryKey::Feedback);
            // Filtered views of the feedback list go stale with it
            if keys.contains(key) || tagged_view {
                entry.stale = true;
                entry.generation = Self::bump(&mut self.next_generation);
                refetch.push(key.clone());
            }
        }
        refetch
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entry(&self, key: &QueryKey) -> Option<&QueryEntry> {
        self.entries.get(key)
    }

    pub fn data(&self, key: &QueryKey) -> Option<&QueryData> {
        self.entries.get(key).and_then(|e| e.data.as_ref())
    }

    pub fn is_loading(&self, key: &QueryKey) -> bool {
        self.entries.get(key).is_some_and(QueryEntry::is_loading)
    }

    pub fn error(&self, key: &QueryKey) -> Option<&str> {
        self.entries.get(key).and_then(|e| e.error.as_deref())
    }

    pub fn dashboard(&self) -> Option<&DashboardData> {
        match self.data(&QueryKey::Dashboard) {
            Some(QueryData::Dashboard(d)) => Some(d),
            _ => None,
        }
    }

    pub fn notifications(&self) -> &[Notification] {
        match self.data(&QueryKey::Notifications) {
            Some(QueryData::Notifications(n)) => n,
            _ => &[],
        }
    }

    pub fn feedback(&self, key: &QueryKey) -> &[Feedback] {
        match self.data(key) {
            Some(QueryData::FeedbackList(list)) => list,
            _ => &[],
        }
    }

    pub fn users(&self, key: &QueryKey) -> &[User] {
        match self.data(key) {
            Some(QueryData::Users(users)) => users,
            _ => &[],
        }
    }

    pub fn team_members(&self) -> &[User] {
        self.users(&QueryKey::TeamMembers)
    }

    pub fn roster(&self) -> &[TeamMember] {
        match self.data(&QueryKey::Roster) {
            Some(QueryData::Roster(members)) => members,
            _ => &[],
        }
    }

    pub fn requests(&self) -> &[FeedbackRequest] {
        match self.data(&QueryKey::FeedbackRequests) {
            Some(QueryData::Requests(r)) => r,
            _ => &[],
        }
    }

    pub fn user(&self, key: &QueryKey) -> Option<&User> {
        match self.data(key) {
            Some(QueryData::User(u)) => Some(u),
            _ => None,
        }
    }
}
