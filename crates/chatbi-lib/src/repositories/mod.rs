// Repository Layer
// Provides data access abstractions for SQLite database

pub mod message_repo;
pub mod settings_repo;

pub use message_repo::MessageRepository;
pub use settings_repo::SettingsRepository;
