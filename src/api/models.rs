//! Wire types exchanged with the feedback backend.
//!
//! Field names match the JSON the server sends. Several endpoints return
//! trimmed-down shapes of the same entity (the dashboard omits comments, the
//! roster omits names), so optional fields default instead of failing.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Manager,
    #[default]
    Employee,
}

impl Role {
    pub fn toggle(self) -> Self {
        match self {
            Role::Manager => Role::Employee,
            Role::Employee => Role::Manager,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Manager => write!(f, "manager"),
            Role::Employee => write!(f, "employee"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    #[default]
    Neutral,
    Negative,
}

impl Sentiment {
    /// Cycle order used by the sentiment picker.
    pub fn next(self) -> Self {
        match self {
            Sentiment::Positive => Sentiment::Neutral,
            Sentiment::Neutral => Sentiment::Negative,
            Sentiment::Negative => Sentiment::Positive,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Neutral => "Neutral",
            Sentiment::Negative => "Negative",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_id: Option<u64>,
    #[serde(default)]
    pub created_at: String,
}

/// Roster entry from `GET /users/`: a user plus the feedback they received.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TeamMember {
    #[serde(flatten)]
    pub user: User,
    #[serde(default)]
    pub feedback_received: Vec<Feedback>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Comment {
    pub id: u64,
    pub content: String,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Feedback {
    pub id: u64,
    #[serde(default)]
    pub giver_id: Option<u64>,
    #[serde(default)]
    pub receiver_id: Option<u64>,
    #[serde(default)]
    pub giver_name: Option<String>,
    #[serde(default)]
    pub receiver_name: Option<String>,
    #[serde(default)]
    pub strengths: String,
    #[serde(default)]
    pub areas_to_improve: String,
    #[serde(default)]
    pub sentiment: Sentiment,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub acknowledged: bool,
    #[serde(default)]
    pub acknowledged_at: Option<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FeedbackRequest {
    pub id: u64,
    #[serde(default)]
    pub requester_id: Option<u64>,
    #[serde(default)]
    pub requester_name: String,
    #[serde(default)]
    pub receiver_id: Option<u64>,
    #[serde(default)]
    pub receiver_name: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct SentimentCounts {
    #[serde(default)]
    pub positive: u64,
    #[serde(default)]
    pub neutral: u64,
    #[serde(default)]
    pub negative: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DashboardData {
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub total_feedback: u64,
    #[serde(default)]
    pub sentiment_counts: SentimentCounts,
    #[serde(default)]
    pub recent_feedback: Vec<Feedback>,
    #[serde(default)]
    pub team_size: Option<u64>,
    #[serde(default)]
    pub team_members: Option<Vec<User>>,
    #[serde(default)]
    pub acknowledged_count: Option<u64>,
    #[serde(default)]
    pub feedback_requests: Vec<FeedbackRequest>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Notification {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginCredentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegisterData {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manager_id: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub user: User,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewFeedback {
    pub receiver_id: u64,
    pub strengths: String,
    pub areas_to_improve: String,
    pub sentiment: Sentiment,
    pub tags: Vec<String>,
    pub is_anonymous: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewFeedbackRequest {
    pub receiver_id: u64,
    pub message: String,
    pub tags: Vec<String>,
    pub is_anonymous: bool,
    pub priority: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewComment {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewNotification {
    pub user_id: u64,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Created {
    pub id: u64,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Acknowledged {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Health {
    pub status: String,
    #[serde(default)]
    pub message: String,
}

/// The export endpoint currently answers with a JSON text report instead of
/// raw PDF bytes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExportPayload {
    pub content: String,
    pub filename: String,
}
