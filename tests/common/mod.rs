// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

#![allow(dead_code)]

use amqp_connector::{
    bus::{BusContext, BusMessage, Endpoint, Event, FlowConstruct, MessageProcessor, Session},
    configs::AmqpConfigs,
    connector::AmqpConnector,
    errors::AmqpError,
};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

pub const CUSTOMER_HEADER: &str = "customer";

/// In-memory endpoint forwarding every event it receives to a channel.
pub struct VmProcessor {
    endpoint: Arc<Endpoint>,
    tx: mpsc::UnboundedSender<Event>,
}

impl VmProcessor {
    pub fn new(name: &str) -> (Arc<Self>, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let processor = VmProcessor {
            endpoint: Arc::new(Endpoint::new(name, "", name)),
            tx,
        };
        (Arc::new(processor), rx)
    }
}

#[async_trait]
impl MessageProcessor for VmProcessor {
    async fn process(&self, event: Event) -> Result<Event, AmqpError> {
        self.tx
            .send(event.clone())
            .map_err(|err| AmqpError::ProcessorError(err.to_string()))?;
        Ok(event)
    }

    fn endpoint(&self) -> Option<Arc<Endpoint>> {
        Some(self.endpoint.clone())
    }
}

/// Records the payload of every event it receives.
#[derive(Default)]
pub struct RecordingProcessor {
    pub payloads: Mutex<Vec<Vec<u8>>>,
}

#[async_trait]
impl MessageProcessor for RecordingProcessor {
    async fn process(&self, event: Event) -> Result<Event, AmqpError> {
        self.payloads
            .lock()
            .unwrap()
            .push(event.message().payload.clone());
        Ok(event)
    }
}

pub fn connector() -> Arc<AmqpConnector> {
    Arc::new(AmqpConnector::new(
        "amqp",
        BusContext::new(&AmqpConfigs::default()),
    ))
}

pub fn outbound_event(payload: &str, exchange: &str, routing_key: &str) -> Event {
    Event::new(
        BusMessage::new(payload, "UTF-8").with_outbound_property(CUSTOMER_HEADER, "acme".into()),
        Some(Arc::new(Endpoint::new(
            &format!("amqp://{exchange}"),
            exchange,
            routing_key,
        ))),
        Session::new(
            Some(Arc::new(FlowConstruct::new("orders-flow"))),
            BusContext::new(&AmqpConfigs::default()),
        ),
    )
}
