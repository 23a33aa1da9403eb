use time::OffsetDateTime;

use crate::domain::notification::{NewNotification, NotificationType};

/// Visibility field of a publishable entity.
///
/// Calls, news posts and resolutions carry a `published_at` timestamp;
/// documents carry an `is_active` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishState {
    At(Option<OffsetDateTime>),
    Flag(bool),
}

impl PublishState {
    /// Whether the field holds a value at all, regardless of its date.
    pub fn is_set(&self) -> bool {
        match self {
            Self::At(at) => at.is_some(),
            Self::Flag(flag) => *flag,
        }
    }

    /// Whether the entity is visible at `now`. A future timestamp is not.
    pub fn is_published_at(&self, now: OffsetDateTime) -> bool {
        match self {
            Self::At(Some(at)) => *at <= now,
            Self::At(None) => false,
            Self::Flag(flag) => *flag,
        }
    }

    pub fn should_notify_on_create(&self, now: OffsetDateTime) -> bool {
        self.is_published_at(now)
    }

    /// Fires only on the unset -> set transition. A previously set field,
    /// even one dated in the future, never fires again.
    pub fn should_notify_on_update(&self, previous: &PublishState, now: OffsetDateTime) -> bool {
        !previous.is_set() && self.is_published_at(now)
    }
}

/// A content entity whose publication fans out one notification per user.
pub trait Publishable {
    /// Short name used in logs.
    fn kind(&self) -> &'static str;
    fn publish_state(&self) -> PublishState;
    fn notification_type(&self) -> NotificationType;
    fn notification_title(&self) -> String;
    fn notification_message(&self) -> String;
    /// Path of the detail page, relative to the public base URL.
    fn link_path(&self) -> String;

    fn to_notification(&self, base_url: &url::Url) -> NewNotification {
        let link = base_url
            .join(&self.link_path())
            .map(|url| url.to_string())
            .unwrap_or_else(|_| self.link_path());
        NewNotification {
            notification_type: self.notification_type(),
            title: self.notification_title(),
            message: self.notification_message(),
            link: Some(link),
        }
    }
}
