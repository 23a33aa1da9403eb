use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::notification::NotificationType;
use crate::domain::publish::{PublishState, Publishable};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    Borrador,
    Abierta,
    Cerrada,
}

impl CallStatus {
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "borrador" => Some(Self::Borrador),
            "abierta" => Some(Self::Abierta),
            "cerrada" => Some(Self::Cerrada),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Borrador => "borrador",
            Self::Abierta => "abierta",
            Self::Cerrada => "cerrada",
        }
    }
}

/// An application round ("convocatoria") of a mobility program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Call {
    pub id: Uuid,
    pub program_id: Uuid,
    pub program_name: String,
    pub title: String,
    pub slug: String,
    pub status: CallStatus,
    #[serde(with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    pub id: Uuid,
    pub call_id: Uuid,
    pub call_title: String,
    pub title: String,
    pub description: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsPost {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Publishable for Call {
    fn kind(&self) -> &'static str {
        "call"
    }

    fn publish_state(&self) -> PublishState {
        PublishState::At(self.published_at)
    }

    fn notification_type(&self) -> NotificationType {
        NotificationType::Convocatoria
    }

    fn notification_title(&self) -> String {
        "Nueva convocatoria publicada".to_string()
    }

    fn notification_message(&self) -> String {
        format!(
            "Se ha publicado la convocatoria «{}» del programa {}.",
            self.title, self.program_name
        )
    }

    fn link_path(&self) -> String {
        format!("/convocatorias/{}", self.slug)
    }
}

impl Publishable for Resolution {
    fn kind(&self) -> &'static str {
        "resolution"
    }

    fn publish_state(&self) -> PublishState {
        PublishState::At(self.published_at)
    }

    fn notification_type(&self) -> NotificationType {
        NotificationType::Resolucion
    }

    fn notification_title(&self) -> String {
        "Nueva resolución publicada".to_string()
    }

    fn notification_message(&self) -> String {
        format!(
            "Se ha publicado la resolución «{}» de la convocatoria «{}».",
            self.title, self.call_title
        )
    }

    // Resolutions have no public page.
    fn link_path(&self) -> String {
        format!("/admin/convocatorias/{}/resoluciones/{}", self.call_id, self.id)
    }
}

impl Publishable for NewsPost {
    fn kind(&self) -> &'static str {
        "news_post"
    }

    fn publish_state(&self) -> PublishState {
        PublishState::At(self.published_at)
    }

    fn notification_type(&self) -> NotificationType {
        NotificationType::Noticia
    }

    fn notification_title(&self) -> String {
        "Nueva noticia publicada".to_string()
    }

    fn notification_message(&self) -> String {
        match self.excerpt.as_deref().map(str::trim) {
            Some(excerpt) if !excerpt.is_empty() => excerpt.to_string(),
            _ => format!("Se ha publicado la noticia «{}».", self.title),
        }
    }

    fn link_path(&self) -> String {
        format!("/noticias/{}", self.slug)
    }
}

impl Publishable for Document {
    fn kind(&self) -> &'static str {
        "document"
    }

    fn publish_state(&self) -> PublishState {
        PublishState::Flag(self.is_active)
    }

    fn notification_type(&self) -> NotificationType {
        NotificationType::Sistema
    }

    fn notification_title(&self) -> String {
        "Nuevo documento disponible".to_string()
    }

    fn notification_message(&self) -> String {
        format!("Se ha publicado el documento «{}».", self.title)
    }

    fn link_path(&self) -> String {
        format!("/documentos/{}", self.slug)
    }
}

/// Lowercase ASCII slug with `-` separators. Non-ASCII letters are
/// transliterated, so titles in any script keep their words.
pub fn slugify(title: &str) -> String {
    let slugged = slug::slugify(title);
    if slugged.is_empty() {
        return "sin-titulo".to_string();
    }
    slugged
}
