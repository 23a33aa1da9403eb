pub mod auth;
pub mod content;
pub mod languages;
pub mod locale;
pub mod notifications;
pub mod publish;
pub mod sessions;
pub mod users;
