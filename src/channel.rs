// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # AMQP Channel Management
//!
//! This module handles the creation of the AMQP connection and the publish channel.
//! Publisher confirms are enabled on the channel, since lapin only surfaces messages
//! returned by the broker through the confirmation of the publish that caused them.

use crate::{configs::AmqpConfigs, errors::AmqpError};
use lapin::{
    options::ConfirmSelectOptions, types::LongString, Channel, Connection, ConnectionProperties,
};
use std::sync::Arc;
use tracing::{debug, error};

/// Creates a new AMQP publish channel with confirms enabled.
///
/// # Parameters
/// * `cfg` - RabbitMQ connection details like host, port, credentials, etc.
///
/// # Returns
/// * `Result<(Arc<Connection>, Arc<Channel>), AmqpError>` -
///   A tuple containing the connection and channel on success, or an error on failure.
pub async fn new_amqp_channel(
    cfg: &AmqpConfigs,
) -> Result<(Arc<Connection>, Arc<Channel>), AmqpError> {
    debug!("creating amqp connection...");
    let options = ConnectionProperties::default()
        .with_connection_name(LongString::from(cfg.app_name.clone()));

    let conn = match Connection::connect(&cfg.uri(), options).await {
        Ok(c) => Ok(c),
        Err(err) => {
            error!(error = err.to_string(), "failure to connect");
            Err(AmqpError::ConnectionError {})
        }
    }?;
    debug!("amqp connected");

    debug!("creating amqp channel...");
    let channel = match conn.create_channel().await {
        Ok(c) => Ok(c),
        Err(err) => {
            error!(error = err.to_string(), "error to create the channel");
            Err(AmqpError::ChannelError {})
        }
    }?;

    match channel
        .confirm_select(ConfirmSelectOptions { nowait: false })
        .await
    {
        Ok(_) => {
            debug!("channel created");
            Ok((Arc::new(conn), Arc::new(channel)))
        }
        Err(err) => {
            error!(error = err.to_string(), "error to enable publisher confirms");
            Err(AmqpError::ConfirmSelectError {})
        }
    }
}
