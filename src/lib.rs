// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

mod headers;
mod otel;

pub mod bus;
pub mod channel;
pub mod configs;
pub mod connector;
pub mod errors;
pub mod listener;
pub mod publisher;
pub mod rejecter;
pub mod return_handler;
pub mod returned;
