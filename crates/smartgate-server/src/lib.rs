//! Gateway server: transports, dispatch engine, and event fan-out.
//!
//! This crate assembles the protocol core around the device lifecycle:
//! two listener transports feed one dispatch engine, which validates,
//! deduplicates, and executes client commands; a single event
//! multiplexer task turns hardware callbacks into broadcast protocol
//! messages for every connected client.

pub mod admin;
pub mod config;
pub mod contract;
pub mod dedup;
pub mod dispatch;
pub mod events;
pub mod handlers;
pub mod raw;
pub mod registry;
pub mod server;
pub mod ws;

pub use admin::AdminSet;
pub use config::{DedupScope, GatewayConfig};
pub use contract::{CommandContract, ContractViolation, InvalidReply};
pub use dedup::DedupWindow;
pub use dispatch::{Dispatcher, GatewayContext};
pub use events::EventMultiplexer;
pub use registry::{Broadcaster, ClientConnection, ConnectionRegistry};
pub use server::{Gateway, GatewayHandle};
