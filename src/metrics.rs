//! Numbers derived from feedback data for the dashboard and team screens.
//!
//! Everything here is a pure function of already-fetched data and is
//! recomputed on each render.

use crate::api::models::{Feedback, Role, Sentiment, SentimentCounts, TeamMember};
use std::collections::BTreeMap;
use std::fmt;

/// Score at or above which a team member counts as a high performer.
pub const HIGH_PERFORMER_SCORE: u32 = 80;
pub const NO_MANAGER: &str = "No Manager";

/// Percentage of `total` that was acknowledged, 0 when there is nothing.
pub fn acknowledgment_rate(acknowledged: u64, total: u64) -> f64 {
    percentage(acknowledged, total)
}

pub fn sentiment_share(part: u64, total: u64) -> f64 {
    percentage(part, total)
}

fn percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    part as f64 / total as f64 * 100.0
}

/// Weighted sentiment score in 0..=100. Positive counts +3, neutral +1 and
/// negative -1, against a ceiling of 3 per item.
pub fn performance_score(counts: &SentimentCounts, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let weighted =
        counts.positive as f64 * 3.0 + counts.neutral as f64 - counts.negative as f64;
    (weighted / (total as f64 * 3.0) * 100.0).clamp(0.0, 100.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Improving,
    Declining,
    Stable,
}

impl Trend {
    pub fn describe(self) -> &'static str {
        match self {
            Trend::Improving => "Improving - more positive feedback recently",
            Trend::Declining => "Needs attention - more constructive feedback recently",
            Trend::Stable => "Stable",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Trend::Improving => "Improving",
            Trend::Declining => "Declining",
            Trend::Stable => "Stable",
        };
        f.write_str(label)
    }
}

/// Direction of the three most recent items.
pub fn feedback_trend(items: &[Feedback]) -> Trend {
    if items.len() < 2 {
        return Trend::Stable;
    }
    let mut recent: Vec<&Feedback> = items.iter().collect();
    // ISO-8601 timestamps order lexically
    recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let (mut positive, mut negative) = (0, 0);
    for item in recent.into_iter().take(3) {
        match item.sentiment {
            Sentiment::Positive => positive += 1,
            Sentiment::Negative => negative += 1,
            Sentiment::Neutral => {}
        }
    }
    if positive > negative {
        Trend::Improving
    } else if negative > positive {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

/// Share of positive feedback a member received, rounded. `None` when they
/// have received nothing yet.
pub fn member_score(member: &TeamMember) -> Option<u32> {
    let received = member.feedback_received.len();
    if received == 0 {
        return None;
    }
    let positive = member
        .feedback_received
        .iter()
        .filter(|f| f.sentiment == Sentiment::Positive)
        .count();
    Some((positive as f64 / received as f64 * 100.0).round() as u32)
}

pub fn high_performers(members: &[TeamMember]) -> Vec<&TeamMember> {
    members
        .iter()
        .filter(|m| member_score(m).is_some_and(|s| s >= HIGH_PERFORMER_SCORE))
        .collect()
}

/// Mean of the non-zero member scores. Members without feedback and members
/// with no positive feedback are both left out.
pub fn average_score(members: &[TeamMember]) -> Option<u32> {
    let scores: Vec<u32> = members
        .iter()
        .filter_map(member_score)
        .filter(|&score| score > 0)
        .collect();
    if scores.is_empty() {
        return None;
    }
    let sum: u32 = scores.iter().sum();
    Some((sum as f64 / scores.len() as f64).round() as u32)
}

pub fn active_members(members: &[TeamMember]) -> usize {
    members
        .iter()
        .filter(|m| !m.feedback_received.is_empty())
        .count()
}

/// Members keyed by their manager's username. A manager with no manager of
/// their own heads their own group.
pub fn group_by_manager(members: &[TeamMember]) -> BTreeMap<String, Vec<&TeamMember>> {
    let mut groups: BTreeMap<String, Vec<&TeamMember>> = BTreeMap::new();
    for member in members {
        let group = match member.user.manager_id {
            Some(manager_id) => members
                .iter()
                .find(|m| m.user.id == manager_id)
                .map(|m| m.user.username.clone())
                .unwrap_or_else(|| NO_MANAGER.to_string()),
            None if member.user.role == Role::Manager => {
                member.user.username.clone()
            }
            None => NO_MANAGER.to_string(),
        };
        groups.entry(group).or_default().push(member);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::User;

    fn feedback(sentiment: Sentiment, created_at: &str) -> Feedback {
        Feedback {
            id: 0,
            giver_id: None,
            receiver_id: None,
            giver_name: None,
            receiver_name: None,
            strengths: String::new(),
            areas_to_improve: String::new(),
            sentiment,
            tags: vec![],
            acknowledged: false,
            acknowledged_at: None,
            comments: vec![],
            created_at: created_at.to_string(),
            updated_at: None,
        }
    }

    fn member(id: u64, name: &str, role: Role, manager_id: Option<u64>, received: &[Sentiment]) -> TeamMember {
        TeamMember {
            user: User {
                id,
                username: name.to_string(),
                email: format!("{}@x.io", name),
                role,
                manager_id,
                created_at: String::new(),
            },
            feedback_received: received
                .iter()
                .map(|s| feedback(*s, "2024-01-01T00:00:00"))
                .collect(),
        }
    }

    #[test]
    fn test_rates_with_zero_total() {
        assert_eq!(acknowledgment_rate(0, 0), 0.0);
        assert_eq!(acknowledgment_rate(5, 0), 0.0);
        assert_eq!(sentiment_share(3, 0), 0.0);
        assert_eq!(acknowledgment_rate(1, 4), 25.0);
    }

    #[test]
    fn test_performance_score_bounds() {
        let all_positive = SentimentCounts {
            positive: 4,
            neutral: 0,
            negative: 0,
        };
        assert_eq!(performance_score(&all_positive, 4), 100.0);

        let all_negative = SentimentCounts {
            positive: 0,
            neutral: 0,
            negative: 4,
        };
        assert_eq!(performance_score(&all_negative, 4), 0.0);

        let mixed = SentimentCounts {
            positive: 1,
            neutral: 1,
            negative: 1,
        };
        // (3 + 1 - 1) / 9
        let score = performance_score(&mixed, 3);
        assert!((score - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(performance_score(&SentimentCounts::default(), 0), 0.0);
    }

    #[test]
    fn test_trend_uses_latest_three() {
        assert_eq!(feedback_trend(&[]), Trend::Stable);
        assert_eq!(
            feedback_trend(&[feedback(Sentiment::Positive, "2024-01-01")]),
            Trend::Stable
        );

        let items = vec![
            feedback(Sentiment::Negative, "2024-01-01"),
            feedback(Sentiment::Negative, "2024-01-02"),
            feedback(Sentiment::Positive, "2024-03-01"),
            feedback(Sentiment::Positive, "2024-03-02"),
            feedback(Sentiment::Neutral, "2024-03-03"),
        ];
        assert_eq!(feedback_trend(&items), Trend::Improving);

        let items = vec![
            feedback(Sentiment::Positive, "2024-01-01"),
            feedback(Sentiment::Negative, "2024-02-01"),
            feedback(Sentiment::Negative, "2024-02-02"),
        ];
        assert_eq!(feedback_trend(&items), Trend::Declining);

        let items = vec![
            feedback(Sentiment::Positive, "2024-01-01"),
            feedback(Sentiment::Negative, "2024-02-01"),
        ];
        assert_eq!(feedback_trend(&items), Trend::Stable);
    }

    #[test]
    fn test_roster_scores() {
        use Sentiment::*;
        let members = vec![
            member(1, "boss", Role::Manager, None, &[Positive, Positive, Positive, Positive, Negative]),
            member(2, "ann", Role::Employee, Some(1), &[Positive, Negative]),
            member(3, "new", Role::Employee, Some(1), &[]),
        ];
        assert_eq!(member_score(&members[0]), Some(80));
        assert_eq!(member_score(&members[1]), Some(50));
        assert_eq!(member_score(&members[2]), None);

        let high: Vec<&str> = high_performers(&members)
            .iter()
            .map(|m| m.user.username.as_str())
            .collect();
        assert_eq!(high, vec!["boss"]);
        assert_eq!(average_score(&members), Some(65));
        assert_eq!(active_members(&members), 2);
        assert_eq!(average_score(&members[2..]), None);
    }

    #[test]
    fn test_average_score_skips_zero_scores() {
        use Sentiment::*;
        let members = vec![
            member(1, "boss", Role::Manager, None, &[Positive, Positive, Positive, Negative]),
            member(2, "ann", Role::Employee, Some(1), &[Negative, Neutral]),
            member(3, "new", Role::Employee, Some(1), &[]),
        ];
        assert_eq!(member_score(&members[1]), Some(0));
        assert_eq!(average_score(&members), Some(75));
        assert_eq!(average_score(&members[1..]), None);
    }

    #[test]
    fn test_group_by_manager() {
        let members = vec![
            member(1, "boss", Role::Manager, None, &[]),
            member(2, "ann", Role::Employee, Some(1), &[]),
            member(3, "solo", Role::Employee, None, &[]),
            member(4, "lost", Role::Employee, Some(99), &[]),
        ];
        let groups = group_by_manager(&members);
        let names = |key: &str| -> Vec<&str> {
            groups[key].iter().map(|m| m.user.username.as_str()).collect()
        };
        assert_eq!(names("boss"), vec!["boss", "ann"]);
        assert_eq!(names(NO_MANAGER), vec!["solo", "lost"]);
    }
}
