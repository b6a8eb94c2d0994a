pub mod app;
pub mod config;
pub mod error;
pub mod expression;
pub mod frame;
pub mod instance;
pub mod navigation;
pub mod screen;
pub mod session;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export common error type
pub use error::NavigationError;
