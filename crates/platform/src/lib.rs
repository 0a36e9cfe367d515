//! Headless hosting for the link tracker: a document, a location, session
//! storage, a virtual clock and a script loader, wired to the tracker over
//! the bus.

mod host;
mod loader;
mod timers;

pub use host::{HostError, SessionHost};
pub use loader::{NetScriptLoader, ScriptLoader, StaticScriptLoader};
pub use timers::IntervalTimers;
