// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Error Types for the AMQP Connector
//!
//! This module provides the error type shared by the publishing path, the return
//! handling subsystem and the manual reject processor. Errors raised while handling
//! a returned message never leave the listener; they are logged and dropped there.

use thiserror::Error;

/// Represents errors that can occur during AMQP connector operations.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AmqpError {
    /// Internal errors that don't fit into other categories
    #[error("internal error")]
    InternalError,

    /// Error establishing a connection to the RabbitMQ server
    #[error("failure to connect")]
    ConnectionError,

    /// Error creating a channel from an established connection
    #[error("failure to create a channel")]
    ChannelError,

    /// Error enabling publisher confirms on a channel
    #[error("failure to enable publisher confirms")]
    ConfirmSelectError,

    /// Error publishing a message
    #[error("failure to publish")]
    PublishingError,

    /// The outbound event carries no endpoint to publish to
    #[error("no endpoint to publish to")]
    MissingEndpoint,

    /// Error loading the connector configuration
    #[error("invalid configuration `{0}`")]
    ConfigurationError(String),

    /// A dispatching listener fired before a connector was bound to it
    #[error("return listener invoked before a connector was bound")]
    UnboundListener,

    /// A connector was bound twice to the same dispatching listener
    #[error("return listener already bound to a connector")]
    ListenerAlreadyBound,

    /// The return processors of a return handler were set after first use
    #[error("return processors already configured")]
    ProcessorsAlreadyConfigured,

    /// Error materializing a bus message from a returned message
    #[error("failure to convert returned message `{0}`")]
    ConversionError(String),

    /// Error applying a receive transformer
    #[error("failure to transform message `{0}`")]
    TransformerError(String),

    /// Error raised by a downstream message processor
    #[error("failure to process message `{0}`")]
    ProcessorError(String),

    /// The inbound message has no delivery tag for a channel action
    #[error("no delivery tag found to `{0}` message")]
    MissingDeliveryTag(String),

    /// The inbound message has no channel for a channel action
    #[error("no channel found to `{0}` message")]
    MissingChannel(String),

    /// Error rejecting a message on its channel
    #[error("failure to reject message with delivery tag `{0}`")]
    RejectMessageError(u64),
}
