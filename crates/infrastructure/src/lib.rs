//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod file_session_store;
mod http_backend_client;
mod in_memory_backend;
mod in_memory_session_store;
mod private_file;
mod tracing_notifier;

pub use file_session_store::FileSessionStore;
pub use http_backend_client::HttpBackendClient;
pub use in_memory_backend::InMemoryBackend;
pub use in_memory_session_store::InMemorySessionStore;
pub use tracing_notifier::TracingNotifier;
