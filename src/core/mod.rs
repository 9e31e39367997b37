//! Service edge: HTTP/WebSocket transport.

pub mod http;
