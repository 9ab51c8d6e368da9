//! PostgreSQL implementations of the store traits.

pub mod content;
pub mod job;
pub mod state;

pub use content::PgContentSource;
pub use job::PgJobStore;
pub use state::PgStateStore;
