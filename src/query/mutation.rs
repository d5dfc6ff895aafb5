//! Writes against the backend and the cached queries each one makes stale.

use super::QueryKey;
use crate::api::models::{
    Acknowledged, Created, NewComment, NewFeedback, NewFeedbackRequest, NewNotification,
    ProfileUpdate, User,
};
use crate::api::{ApiClient, ApiResult};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mutation {
    SubmitFeedback,
    SubmitComment,
    RequestFeedback,
    MarkNotificationRead,
    SendNotification,
    UpdateProfile,
}

impl Mutation {
    /// Queries whose cached data no longer reflects the server once this
    /// mutation succeeds.
    pub fn invalidates(self) -> Vec<QueryKey> {
        match self {
            Mutation::SubmitFeedback => vec![QueryKey::Feedback, QueryKey::Dashboard],
            Mutation::SubmitComment => vec![QueryKey::Feedback],
            Mutation::RequestFeedback => vec![QueryKey::Dashboard, QueryKey::FeedbackRequests],
            Mutation::MarkNotificationRead | Mutation::SendNotification => {
                vec![QueryKey::Notifications]
            }
            Mutation::UpdateProfile => {
                vec![QueryKey::Profile, QueryKey::Roster, QueryKey::TeamMembers]
            }
        }
    }

    /// Status-line text after success.
    pub fn success_message(self) -> &'static str {
        match self {
            Mutation::SubmitFeedback => "Feedback submitted",
            Mutation::SubmitComment => "Comment added",
            Mutation::RequestFeedback => "Feedback request sent",
            Mutation::MarkNotificationRead => "Notification marked as read",
            Mutation::SendNotification => "Notification sent",
            Mutation::UpdateProfile => "Profile updated",
        }
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mutation::SubmitFeedback => "submit-feedback",
            Mutation::SubmitComment => "submit-comment",
            Mutation::RequestFeedback => "request-feedback",
            Mutation::MarkNotificationRead => "mark-notification-read",
            Mutation::SendNotification => "send-notification",
            Mutation::UpdateProfile => "update-profile",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MutationRequest {
    SubmitFeedback(NewFeedback),
    SubmitComment { feedback_id: u64, comment: NewComment },
    RequestFeedback(NewFeedbackRequest),
    MarkNotificationRead { notification_id: u64 },
    SendNotification(NewNotification),
    UpdateProfile { user_id: u64, update: ProfileUpdate },
}

#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutput {
    Created(Created),
    Acknowledged(Acknowledged),
    User(User),
}

impl MutationRequest {
    pub fn kind(&self) -> Mutation {
        match self {
            MutationRequest::SubmitFeedback(_) => Mutation::SubmitFeedback,
            MutationRequest::SubmitComment { .. } => Mutation::SubmitComment,
            MutationRequest::RequestFeedback(_) => Mutation::RequestFeedback,
            MutationRequest::MarkNotificationRead { .. } => Mutation::MarkNotificationRead,
            MutationRequest::SendNotification(_) => Mutation::SendNotification,
            MutationRequest::UpdateProfile { .. } => Mutation::UpdateProfile,
        }
    }

    pub async fn execute(&self, api: &ApiClient) -> ApiResult<MutationOutput> {
        let output = match self {
            MutationRequest::SubmitFeedback(feedback) => {
                MutationOutput::Created(api.submit_feedback(feedback).await?)
            }
            MutationRequest::SubmitComment {
                feedback_id,
                comment,
            } => MutationOutput::Created(api.add_comment(*feedback_id, comment).await?),
            MutationRequest::RequestFeedback(request) => {
                MutationOutput::Created(api.request_feedback(request).await?)
            }
            MutationRequest::MarkNotificationRead { notification_id } => {
                MutationOutput::Acknowledged(api.mark_notification_read(*notification_id).await?)
            }
            MutationRequest::SendNotification(notification) => {
                MutationOutput::Created(api.send_notification(notification).await?)
            }
            MutationRequest::UpdateProfile { user_id, update } => {
                MutationOutput::User(api.update_user(*user_id, update).await?)
            }
        };
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::stub;

    #[test]
    fn test_invalidation_lists() {
        assert_eq!(
            Mutation::SubmitFeedback.invalidates(),
            vec![QueryKey::Feedback, QueryKey::Dashboard]
        );
        assert_eq!(Mutation::SubmitComment.invalidates(), vec![QueryKey::Feedback]);
        assert!(Mutation::RequestFeedback
            .invalidates()
            .contains(&QueryKey::FeedbackRequests));
        assert_eq!(
            Mutation::MarkNotificationRead.invalidates(),
            vec![QueryKey::Notifications]
        );
        assert!(Mutation::UpdateProfile.invalidates().contains(&QueryKey::Profile));
    }

    #[test]
    fn test_request_kind() {
        let request = MutationRequest::SubmitComment {
            feedback_id: 3,
            comment: NewComment {
                content: "ok".into(),
            },
        };
        assert_eq!(request.kind(), Mutation::SubmitComment);
        assert_eq!(request.kind().to_string(), "submit-comment");
    }

    #[tokio::test]
    async fn test_mark_read_hits_notification_endpoint() {
        let (base, raw) =
            stub::serve_once("200 OK", r#"{"message": "Notification marked as read"}"#).await;
        let api = stub::client(&base).with_token(Some("t"));
        let output = MutationRequest::MarkNotificationRead { notification_id: 12 }
            .execute(&api)
            .await
            .unwrap();
        assert!(matches!(output, MutationOutput::Acknowledged(_)));
        assert!(raw.await.unwrap().starts_with("PUT /api/notifications/12/read "));
    }
}
