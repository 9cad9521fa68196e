//! parrot-core - record and replay mouse/keyboard macros
//!
//! Captures live input into an ordered action log, renders the log as
//! editable text (one action per line), parses edited text back, and
//! replays the log against the OS input layer with looping and
//! cancellation.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use parrot_core::prelude::*;
//! use std::num::NonZeroU32;
//! use std::sync::Arc;
//!
//! let engine = Arc::new(Engine::new());
//!
//! // Record both devices until told to stop.
//! engine.start_capture(Sources::all())?;
//! // ... user does things ...
//! engine.stop_capture();
//!
//! // The log is plain text; edit it and sync it back.
//! let text = engine.log_text();
//! let skipped = engine.set_log_text(&text)?;
//! assert_eq!(skipped, 0);
//!
//! // Replay three times; Escape cancels.
//! engine.start_loop(NonZeroU32::new(3).unwrap())?;
//! # Ok::<(), parrot_core::EngineError>(())
//! ```

pub mod action;
pub mod engine;
pub mod error;
pub mod inject;
pub mod playback;
pub mod script;

mod capture;
mod hook;

pub use action::{Action, KeySpec, MouseButton, NamedKey};
pub use capture::Sources;
pub use engine::{Engine, EngineConfig};
pub use error::{EngineError, Result};
pub use inject::{InjectError, Injector, NoopInjector, RdevInjector};
pub use playback::{PlaybackState, Progress};

pub mod prelude {
    pub use crate::action::{Action, KeySpec, MouseButton, NamedKey};
    pub use crate::capture::Sources;
    pub use crate::engine::{Engine, EngineConfig};
    pub use crate::error::{EngineError, Result};
    pub use crate::inject::{Injector, NoopInjector, RdevInjector};
    pub use crate::playback::{PlaybackState, Progress};
}
