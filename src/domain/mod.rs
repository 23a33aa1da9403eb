pub mod content;
pub mod language;
pub mod notification;
pub mod publish;
pub mod user;
