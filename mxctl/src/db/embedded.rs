//! Embedded PostgreSQL database support
//!
//! This module provides functionality to run a bundled PostgreSQL instance
//! that can be started and stopped with the application. This is useful for
//! single-binary distributions where you don't want to require external
//! database setup.
//!
//! When built with the `embedded-db` feature, PostgreSQL binaries are bundled
//! into the binary at compile time.

#[cfg(feature = "embedded-db")]
use postgresql_embedded::{PostgreSQL, Settings, V16};
#[cfg(feature = "embedded-db")]
use std::path::PathBuf;
#[cfg(feature = "embedded-db")]
use tracing::debug;

#[cfg(feature = "embedded-db")]
pub struct EmbeddedDatabase {
    postgres: PostgreSQL,
    connection_string: String,
}

#[cfg(feature = "embedded-db")]
impl EmbeddedDatabase {
    /// Create and start a new embedded PostgreSQL instance
    ///
    /// Uses an ephemeral port (assigned by the OS) to avoid conflicts.
    ///
    /// # Arguments
    /// * `data_dir` - Directory where PostgreSQL data will be stored (default: `$HOME/.mxctl_data/postgres`)
    /// * `persistent` - Whether to persist data between restarts (default: false/ephemeral)
    ///
    /// # Returns
    /// A running EmbeddedDatabase instance with connection string containing the actual port
    pub async fn start(data_dir: Option<PathBuf>, persistent: bool) -> anyhow::Result<Self> {
        let data_dir = data_dir.unwrap_or_else(|| {
            if let Some(home) = std::env::home_dir() {
                home.join(".mxctl_data").join("postgres")
            } else {
                PathBuf::from("mxctl_data/postgres")
            }
        });

        if persistent {
            debug!("Starting embedded PostgreSQL with data directory: {}", data_dir.display());
        } else {
            debug!("Starting ephemeral embedded PostgreSQL");
        }

        // Create settings for the embedded PostgreSQL instance
        let settings = Settings {
            version: V16.clone(),
            port: 0, // Use ephemeral port (OS will assign)
            username: "postgres".to_string(),
            password: "password".to_string(),
            temporary: !persistent,
            installation_dir: data_dir.join("installation"),
            data_dir: data_dir.join("data"),
            ..Default::default()
        };

        let mut postgres = PostgreSQL::new(settings);

        // Setup downloads binaries (if not bundled) and initializes the database
        postgres
            .setup()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to setup embedded PostgreSQL: {}", e))?;

        postgres
            .start()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to start embedded PostgreSQL: {}", e))?;

        let database_name = "mxctl";
        postgres
            .create_database(database_name)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create database '{}': {}", database_name, e))?;

        let connection_string = postgres.settings().url(database_name);

        debug!("Embedded PostgreSQL started at {}", connection_string);

        Ok(Self {
            postgres,
            connection_string,
        })
    }

    /// Get the connection string for the running instance
    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    /// Stop the embedded PostgreSQL instance
    pub async fn stop(self) -> anyhow::Result<()> {
        self.postgres
            .stop()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to stop embedded PostgreSQL: {}", e))
    }
}

// Stub type so Application can hold an Option<EmbeddedDatabase> without the feature
#[cfg(not(feature = "embedded-db"))]
pub struct EmbeddedDatabase;

#[cfg(not(feature = "embedded-db"))]
impl EmbeddedDatabase {
    pub fn connection_string(&self) -> &str {
        ""
    }

    pub async fn stop(self) -> anyhow::Result<()> {
        Ok(())
    }
}
