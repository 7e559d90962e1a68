// ChatBI Library
// Workflow client, chat orchestration and persistence shared by the ChatBI binaries

pub mod models;
pub mod repositories;
pub mod services;
pub mod utils;

pub use models::*;
pub use repositories::*;
pub use utils::config::AppConfig;
pub use utils::database::Database;
