//! Client-side tracking for the apkdrop landing page.
//!
//! Mirrors what a browser tab does: a [`session::SessionContext`] holds the
//! tab-scoped identity, an [`emitter::Emitter`] fires best-effort events at
//! the server, and a [`heartbeat::Heartbeat`] reports cumulative session
//! duration periodically and once more on teardown.

pub mod emitter;
pub mod heartbeat;
pub mod session;
pub mod store;
pub mod transport;

pub use emitter::Emitter;
pub use heartbeat::Heartbeat;
pub use session::SessionContext;
pub use store::{MemoryStore, SessionStore};
pub use transport::{HttpTransport, Transport};
