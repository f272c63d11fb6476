//! SQLite adapters for the repository ports.

pub mod artifact_repository;
pub mod connection;
pub mod migrations;
pub mod owner_repository;
pub mod telemetry_repository;

pub use artifact_repository::SqliteArtifactRepository;
pub use connection::{create_pool, create_test_pool, verify_connection, ConnectionError};
pub use migrations::{all_embedded_migrations, Migration, MigrationError, Migrator};
pub use owner_repository::SqliteOwnerRepository;
pub use telemetry_repository::SqliteTelemetryRepository;
