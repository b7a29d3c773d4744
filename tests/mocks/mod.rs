//! Fakes for the broadcast and gate seams
//!
//! They stand in for the Bot API and the user store so the engine can be
//! driven deterministically.

pub mod probe;
pub mod reporter;
pub mod sender;
pub mod source;

#[allow(unused_imports)]
pub use probe::FakeProbe;
#[allow(unused_imports)]
pub use reporter::RecordingReporter;
#[allow(unused_imports)]
pub use sender::{BlockingSender, ScriptedSender};
#[allow(unused_imports)]
pub use source::{FailingSource, StaticSource};
