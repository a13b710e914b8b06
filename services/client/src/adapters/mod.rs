pub mod file_storage;
pub mod http_auth;
pub mod memory_storage;
pub mod navigator;

pub use file_storage::FileStorage;
pub use http_auth::HttpAuthBackend;
pub use memory_storage::MemoryStorage;
pub use navigator::HistoryNavigator;
