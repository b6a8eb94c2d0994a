pub mod config_service;
pub mod dto;
pub mod file_session_repository;
pub mod lock_registry;
pub mod paths;
pub mod serializer;
pub mod storage;
pub mod virtual_instances;

pub use crate::config_service::ConfigService;
pub use crate::file_session_repository::FileSessionRepository;
pub use crate::lock_registry::{LockGuard, LockRegistry};
pub use crate::paths::FormnavPaths;
pub use crate::serializer::JsonSessionSerializer;
pub use crate::virtual_instances::MemoryVirtualInstanceStorage;
