// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

mod dispatcher;
mod publisher;
mod topic;

pub mod client;
pub mod errors;
pub mod handler;
pub mod message;
pub mod naming;
pub mod options;
pub mod subscriber;
pub mod transport;
