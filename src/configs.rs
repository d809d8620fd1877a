// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Connector Configuration
//!
//! Connection settings for the RabbitMQ server plus the bus-level settings the
//! return handling path depends on, such as the default text encoding used when
//! converting returned messages.

use crate::errors::AmqpError;
use serde::Deserialize;
use tracing::error;

/// Default text encoding of the bus
pub const DEFAULT_ENCODING: &str = "UTF-8";

/// Configuration of the AMQP connector.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AmqpConfigs {
    /// Application name, used as the AMQP connection name
    pub app_name: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub vhost: String,
    /// Encoding applied to messages materialized from returned messages
    pub default_encoding: String,
    /// Whether endpoints publish with the mandatory flag unless told otherwise
    pub mandatory: bool,
}

impl Default for AmqpConfigs {
    fn default() -> Self {
        AmqpConfigs {
            app_name: "amqp-connector".to_owned(),
            host: "localhost".to_owned(),
            port: 5672,
            user: "guest".to_owned(),
            password: "guest".to_owned(),
            vhost: "%2f".to_owned(),
            default_encoding: DEFAULT_ENCODING.to_owned(),
            mandatory: true,
        }
    }
}

impl AmqpConfigs {
    /// Parses a JSON document, using defaults for missing fields.
    pub fn from_json(raw: &str) -> Result<Self, AmqpError> {
        serde_json::from_str(raw).map_err(|err| {
            error!(error = err.to_string(), "failure to parse amqp configs");
            AmqpError::ConfigurationError(err.to_string())
        })
    }

    /// Builds the AMQP URI of the configured server.
    pub fn uri(&self) -> String {
        format!(
            "amqp://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.vhost
        )
    }
}
