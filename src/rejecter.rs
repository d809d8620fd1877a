// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Manual Message Rejection
//!
//! Message processor rejecting the inbound message of a flow on the channel it was
//! consumed from, giving flows fine control over throttling. Unlike return handling,
//! failures here are returned to the invoking flow.

use crate::{
    bus::{Event, MessageProcessor, PropertyValue, DELIVERY_TAG},
    errors::AmqpError,
};
use async_trait::async_trait;
use lapin::{options::BasicRejectOptions, Channel};
use std::sync::Arc;
use tracing::{debug, error};

const CHANNEL_ACTION: &str = "reject";

/// Rejects the inbound message of every event it processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct MessageRejecter {
    requeue: bool,
}

impl MessageRejecter {
    pub fn new(requeue: bool) -> Self {
        MessageRejecter { requeue }
    }

    pub fn requeue(&self) -> bool {
        self.requeue
    }
}

#[async_trait]
impl MessageProcessor for MessageRejecter {
    async fn process(&self, event: Event) -> Result<Event, AmqpError> {
        reject(&event, self.requeue).await?;
        Ok(event)
    }
}

/// Rejects the inbound message of an event on its session channel.
pub async fn reject(event: &Event, requeue: bool) -> Result<(), AmqpError> {
    let delivery_tag = delivery_tag(event)?;
    let channel = channel(event)?;

    if let Err(err) = channel
        .basic_reject(delivery_tag, BasicRejectOptions { requeue })
        .await
    {
        error!(
            error = err.to_string(),
            delivery_tag,
            channel = channel.id(),
            "failure to reject message"
        );
        return Err(AmqpError::RejectMessageError(delivery_tag));
    }

    debug!(
        delivery_tag,
        channel = channel.id(),
        "manually rejected message"
    );
    Ok(())
}

fn delivery_tag(event: &Event) -> Result<u64, AmqpError> {
    match event.message().inbound_property(DELIVERY_TAG) {
        Some(PropertyValue::UInt(tag)) => Ok(*tag),
        Some(PropertyValue::Int(tag)) if *tag >= 0 => Ok(*tag as u64),
        _ => Err(AmqpError::MissingDeliveryTag(CHANNEL_ACTION.to_owned())),
    }
}

fn channel(event: &Event) -> Result<&Arc<Channel>, AmqpError> {
    event
        .session()
        .channel()
        .ok_or_else(|| AmqpError::MissingChannel(CHANNEL_ACTION.to_owned()))
}
