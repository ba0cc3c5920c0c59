use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{first_bool, first_f64, first_str, first_time, string_list};

/// Categories offered in the authoring form.
pub const ANNOUNCEMENT_CATEGORIES: &[&str] = &[
    "General",
    "Health",
    "Safety",
    "Event",
    "Infrastructure",
    "Emergency",
];

pub const ANNOUNCEMENT_PRIORITIES: &[&str] = &["low", "normal", "high", "urgent"];

#[derive(Debug, Clone, PartialEq)]
pub struct Announcement {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: String,
    pub priority: String,
    pub target_hall: Option<String>,
    pub event_date: Option<String>,
    pub event_time: Option<String>,
    pub expected_attendees: Option<u32>,
    pub tags: Vec<String>,
    pub image_url: Option<String>,
    pub published: bool,
    pub published_schedule: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Effective publication state derived from `published` and
/// `published_schedule`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicationState {
    Draft,
    Scheduled(DateTime<Utc>),
    Published,
}

impl PublicationState {
    pub fn label(&self) -> &'static str {
        match self {
            PublicationState::Draft => "Draft",
            PublicationState::Scheduled(_) => "Scheduled",
            PublicationState::Published => "Published",
        }
    }
}

impl Announcement {
    /// Normalizes a backend announcement record.
    ///
    /// Key precedence, first present wins:
    /// - id: `id`, `_id`, `announcementId`
    /// - content: `content`, `body`, `description`
    /// - target hall: `targetHall`, `hall`, `location`
    /// - event date: `date`, `eventDate`, `event_date`
    /// - event time: `time`, `eventTime`, `event_time`
    /// - attendees: `expectedAttendees`, `attendees`, `attendeeEstimate`
    /// - image: `imageUrl`, `image`, `image_url`
    /// - schedule: `publishedSchedule`, `published_schedule`, `scheduledAt`
    /// - created: `createdAt`, `created_at`, `dateCreated`
    ///
    /// Returns `None` when the record has no usable id.
    pub fn from_value(value: &Value) -> Option<Self> {
        let id = first_str(value, &["id", "_id", "announcementId"])?;

        Some(Self {
            id,
            title: first_str(value, &["title"]).unwrap_or_default(),
            content: first_str(value, &["content", "body", "description"]).unwrap_or_default(),
            category: first_str(value, &["category", "type"]).unwrap_or_default(),
            priority: first_str(value, &["priority"]).unwrap_or_default(),
            target_hall: first_str(value, &["targetHall", "hall", "location"]),
            event_date: first_str(value, &["date", "eventDate", "event_date"]),
            event_time: first_str(value, &["time", "eventTime", "event_time"]),
            expected_attendees: first_f64(value, &["expectedAttendees", "attendees", "attendeeEstimate"])
                .filter(|n| *n >= 0.0)
                .map(|n| n as u32),
            tags: string_list(value, &["tags"]),
            image_url: first_str(value, &["imageUrl", "image", "image_url"]),
            published: first_bool(value, &["published", "isPublished"]).unwrap_or(false),
            published_schedule: first_time(value, &["publishedSchedule", "published_schedule", "scheduledAt"]),
            created_at: first_time(value, &["createdAt", "created_at", "dateCreated"]),
        })
    }

    pub fn state(&self, now: DateTime<Utc>) -> PublicationState {
        if self.published {
            return PublicationState::Published;
        }
        match self.published_schedule {
            None => PublicationState::Draft,
            Some(at) if at > now => PublicationState::Scheduled(at),
            Some(_) => PublicationState::Published,
        }
    }

    pub fn content_preview(&self, max_chars: usize) -> String {
        if self.content.chars().count() > max_chars {
            let cut: String = self.content.chars().take(max_chars).collect();
            format!("{}...", cut.trim_end())
        } else {
            self.content.clone()
        }
    }
}

/// Body sent on create and update. `published` is always `false`: the
/// backend flips visibility once `published_schedule` passes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementPayload {
    pub title: String,
    pub content: String,
    pub category: String,
    pub priority: String,
    pub target_hall: Option<String>,
    pub event_date: Option<String>,
    pub event_time: Option<String>,
    pub expected_attendees: Option<u32>,
    pub tags: Vec<String>,
    pub image_url: Option<String>,
    pub published: bool,
    pub published_schedule: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    #[test]
    fn test_from_value_precedence() {
        let record = json!({
            "_id": "a-1",
            "title": "Clean-up drive",
            "body": "Bring gloves",
            "date": "2024-07-01",
            "eventDate": "2024-08-01",
            "hall": "Covered Court",
            "attendees": "40",
            "tags": "community, environment",
            "publishedSchedule": "2024-06-30T00:00:00Z"
        });

        let a = Announcement::from_value(&record).unwrap();
        assert_eq!(a.id, "a-1");
        assert_eq!(a.content, "Bring gloves");
        assert_eq!(a.event_date.as_deref(), Some("2024-07-01"));
        assert_eq!(a.target_hall.as_deref(), Some("Covered Court"));
        assert_eq!(a.expected_attendees, Some(40));
        assert_eq!(a.tags, vec!["community", "environment"]);
        assert!(!a.published);
        assert!(a.published_schedule.is_some());
    }

    #[test]
    fn test_from_value_requires_id() {
        assert!(Announcement::from_value(&json!({ "title": "No id" })).is_none());
    }

    #[test]
    fn test_publication_states() {
        let now = Utc::now();
        let mut a = Announcement::from_value(&json!({ "id": 7 })).unwrap();
        assert_eq!(a.id, "7");
        assert_eq!(a.state(now), PublicationState::Draft);

        a.published_schedule = Some(now + Duration::minutes(5));
        assert_eq!(a.state(now), PublicationState::Scheduled(now + Duration::minutes(5)));

        a.published_schedule = Some(now - Duration::minutes(5));
        assert_eq!(a.state(now), PublicationState::Published);

        a.published_schedule = None;
        a.published = true;
        assert_eq!(a.state(now), PublicationState::Published);
    }

    #[test]
    fn test_payload_serializes_camel_case() {
        let payload = AnnouncementPayload {
            title: "t".into(),
            content: "c".into(),
            category: "General".into(),
            priority: "normal".into(),
            target_hall: None,
            event_date: None,
            event_time: None,
            expected_attendees: None,
            tags: vec![],
            image_url: None,
            published: false,
            published_schedule: None,
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["published"], json!(false));
        assert_eq!(value["publishedSchedule"], Value::Null);
        assert!(value.get("targetHall").is_some());
    }
}
