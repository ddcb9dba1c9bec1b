//! Polling of remote hostwatch/glances servers.

mod browser;
mod transport;

pub use browser::{parse_columns, Column, ServerBrowser, ServerState, ServerStatus};
pub use transport::{endpoint, HttpTransport, RemoteTransport, API_VERSION};
