//! Streamable HTTP transport for MCP

mod http;
mod notifier;
mod streamable;

pub use http::{
    classify, handle_delete, handle_get, handle_post, router, AppState, Route, SESSION_HEADER,
};
pub use notifier::Notifier;
pub use streamable::{Closed, ExchangeReply, Initialized, StreamableTransport};
