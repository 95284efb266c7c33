//! Cloud - duplex communication with Doshii (REST reports + socket feed)
//!
//! ```text
//! SocketWorker
//!   ├── Connect: WebSocket (bearer token + location id)
//!   ├── Listen: CloudEvent frames → mpsc → EventRouter
//!   ├── Keepalive: ping interval, silence past timeout → reconnect
//!   └── Reconnect: exponential backoff on disconnect
//!
//! Workflows ──► deliver(timeout) ──► CloudReporter
//!                                      ├── DoshiiClient (REST, retry on 5xx)
//!                                      └── RecordingReporter (offline / tests)
//! ```

mod recording;
mod reporter;
mod service;
mod worker;

pub use recording::{RecordingReporter, ReportCall};
pub use reporter::{CloudReporter, ReportError, ReportResult, deliver};
pub use service::DoshiiClient;
pub use worker::{SocketWorker, WsStream};
