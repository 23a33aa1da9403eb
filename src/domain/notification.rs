use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
    pub is_read: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub read_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Convocatoria,
    Resolucion,
    Noticia,
    Sistema,
}

impl NotificationType {
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "convocatoria" => Some(Self::Convocatoria),
            "resolucion" => Some(Self::Resolucion),
            "noticia" => Some(Self::Noticia),
            "sistema" => Some(Self::Sistema),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Convocatoria => "convocatoria",
            Self::Resolucion => "resolucion",
            Self::Noticia => "noticia",
            Self::Sistema => "sistema",
        }
    }
}

/// Payload shared by every recipient of one fan-out.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
}
