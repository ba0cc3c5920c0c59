use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::{
    client::{PortalApi, SessionToken},
    config::PortalConfig,
    domain::{split_tags, Announcement, AnnouncementPayload},
    error::{AppError, Result},
    web::uploads::{to_attachment, IMAGE_EXTENSIONS},
};

/// The announcement editor's fields as staff typed them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnouncementForm {
    /// Set once the form is bound to a backend record; saves then PATCH it.
    pub editing_id: Option<String>,
    pub title: String,
    pub content: String,
    pub category: String,
    pub priority: String,
    pub target_hall: String,
    pub event_date: String,
    pub event_time: String,
    pub expected_attendees: String,
    pub tags: String,
    pub image_url: Option<String>,
    pub schedule_later: bool,
    /// `YYYY-MM-DD`
    pub publish_date: String,
    /// `HH:MM`
    pub publish_time: String,
}

impl AnnouncementForm {
    /// Apply one submitted form field. Unknown names are ignored.
    pub fn set_field(&mut self, name: &str, value: String) {
        match name {
            "editing_id" => self.editing_id = non_blank(&value),
            "title" => self.title = value,
            "content" => self.content = value,
            "category" => self.category = value,
            "priority" => self.priority = value,
            "target_hall" => self.target_hall = value,
            "event_date" => self.event_date = value,
            "event_time" => self.event_time = value,
            "expected_attendees" => self.expected_attendees = value,
            "tags" => self.tags = value,
            "image_url" => self.image_url = non_blank(&value),
            "schedule_later" => self.schedule_later = matches!(value.as_str(), "on" | "true" | "1"),
            "publish_date" => self.publish_date = value,
            "publish_time" => self.publish_time = value,
            _ => {}
        }
    }

    /// Repopulate every field from a stored record. A pending schedule is
    /// shown in the portal's local offset.
    pub fn from_announcement(announcement: &Announcement, config: &PortalConfig) -> Self {
        let (schedule_later, publish_date, publish_time) = match announcement.published_schedule {
            Some(at) if !announcement.published && at > Utc::now() => {
                let local = at.with_timezone(&config.utc_offset());
                (true, local.format("%Y-%m-%d").to_string(), local.format("%H:%M").to_string())
            }
            _ => (false, String::new(), String::new()),
        };

        Self {
            editing_id: Some(announcement.id.clone()),
            title: announcement.title.clone(),
            content: announcement.content.clone(),
            category: announcement.category.clone(),
            priority: announcement.priority.clone(),
            target_hall: announcement.target_hall.clone().unwrap_or_default(),
            event_date: announcement.event_date.clone().unwrap_or_default(),
            event_time: announcement.event_time.clone().unwrap_or_default(),
            expected_attendees: announcement
                .expected_attendees
                .map(|n| n.to_string())
                .unwrap_or_default(),
            tags: announcement.tags.join(", "),
            image_url: announcement.image_url.clone(),
            schedule_later,
            publish_date,
            publish_time,
        }
    }

    /// Names of the fields publishing requires but the form lacks.
    pub fn missing_for_publish(&self) -> Vec<&'static str> {
        [
            ("Title", &self.title),
            ("Content", &self.content),
            ("Category", &self.category),
            ("Priority", &self.priority),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    fn payload(&self, published_schedule: Option<DateTime<Utc>>) -> Result<AnnouncementPayload> {
        let expected_attendees = match self.expected_attendees.trim() {
            "" => None,
            raw => Some(raw.parse::<u32>().map_err(|_| {
                AppError::Validation("Expected attendees must be a whole number".to_string())
            })?),
        };

        Ok(AnnouncementPayload {
            title: self.title.trim().to_string(),
            content: self.content.trim().to_string(),
            category: self.category.trim().to_string(),
            priority: self.priority.trim().to_string(),
            target_hall: non_blank(&self.target_hall),
            event_date: non_blank(&self.event_date),
            event_time: non_blank(&self.event_time),
            expected_attendees,
            tags: split_tags(&self.tags),
            image_url: self.image_url.clone(),
            published: false,
            published_schedule,
        })
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// When a publish request should go live.
///
/// Publishing now means `now + publish_buffer`. A chosen date and time are
/// read in the portal's UTC offset and must land after `now`.
pub fn publish_instant(form: &AnnouncementForm, now: DateTime<Utc>, config: &PortalConfig) -> Result<DateTime<Utc>> {
    if !form.schedule_later {
        return Ok(now + config.publish_buffer());
    }

    let (date, time) = (form.publish_date.trim(), form.publish_time.trim());
    if date.is_empty() || time.is_empty() {
        return Err(AppError::Validation(
            "Choose both a publish date and time, or turn off scheduling".to_string(),
        ));
    }

    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| AppError::Validation("Publish date must be YYYY-MM-DD".to_string()))?;
    let time = NaiveTime::parse_from_str(time, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M:%S"))
        .map_err(|_| AppError::Validation("Publish time must be HH:MM".to_string()))?;

    let at = config
        .utc_offset()
        .from_local_datetime(&date.and_time(time))
        .single()
        .ok_or_else(|| AppError::Validation("Publish time does not exist".to_string()))?
        .with_timezone(&Utc);

    if at <= now {
        return Err(AppError::Validation("Scheduled time must be in the future".to_string()));
    }
    Ok(at)
}

/// Result of a successful publish.
#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub id: String,
    pub goes_live: DateTime<Utc>,
}

/// Draft, edit and publish announcements for one staff session.
pub struct AnnouncementAuthoring {
    api: Arc<dyn PortalApi>,
    token: SessionToken,
    config: PortalConfig,
}

impl AnnouncementAuthoring {
    pub fn new(api: Arc<dyn PortalApi>, token: SessionToken, config: PortalConfig) -> Self {
        Self { api, token, config }
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    /// Save without publishing and return the record's id. Nothing is
    /// required. A new record's id is written back into the form so the
    /// next save updates it.
    pub async fn save_draft(&self, form: &mut AnnouncementForm) -> Result<String> {
        let payload = form.payload(None)?;

        match form.editing_id.clone() {
            Some(id) => {
                self.api.update_announcement(&self.token, &id, &payload).await?;
                tracing::info!("Saved draft announcement {}", id);
                Ok(id)
            }
            None => {
                let id = self.api.create_announcement(&self.token, &payload).await?;
                tracing::info!("Created draft announcement {}", id);
                form.editing_id = Some(id.clone());
                Ok(id)
            }
        }
    }

    pub async fn list_drafts(&self) -> Result<Vec<Announcement>> {
        self.api.list_drafts(&self.token).await
    }

    pub async fn load_draft(&self, id: &str) -> Result<AnnouncementForm> {
        let announcement = self.api.get_announcement(&self.token, id).await?;
        Ok(AnnouncementForm::from_announcement(&announcement, &self.config))
    }

    /// Validates locally first; a rejected form never reaches the backend.
    pub async fn publish(&self, form: &mut AnnouncementForm, now: DateTime<Utc>) -> Result<Published> {
        let missing = form.missing_for_publish();
        if !missing.is_empty() {
            return Err(AppError::Validation(format!(
                "Please fill in: {}",
                missing.join(", ")
            )));
        }

        let goes_live = publish_instant(form, now, &self.config)?;
        let payload = form.payload(Some(goes_live))?;

        let id = match form.editing_id.clone() {
            Some(id) => {
                self.api.update_announcement(&self.token, &id, &payload).await?;
                id
            }
            None => {
                let id = self.api.create_announcement(&self.token, &payload).await?;
                form.editing_id = Some(id.clone());
                id
            }
        };

        tracing::info!("Announcement {} scheduled to publish at {}", id, goes_live);
        Ok(Published { id, goes_live })
    }

    /// Upload an image and keep its URL on the form for later saves.
    pub async fn attach_image(&self, form: &mut AnnouncementForm, filename: &str, data: Vec<u8>) -> Result<String> {
        let attachment = to_attachment(filename, data, IMAGE_EXTENSIONS, self.config.max_upload_bytes)?;
        let url = self.api.upload_announcement_image(&self.token, &attachment).await?;
        form.image_url = Some(url.clone());
        Ok(url)
    }
}
