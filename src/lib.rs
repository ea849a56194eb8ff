//! Choreography compiler for DMX moving heads.
//!
//! Reusable motion templates (geometry, movement and dimmer patterns per
//! step) are compiled against a rig and a song's musical timing into
//! per-fixture, per-channel DMX curves, then encoded as value-curve
//! settings for a show-control sequencer.

pub mod catalog;
pub mod codec;
pub mod compile;
pub mod curves;
pub mod engine;
pub mod error;
pub mod files;
pub mod handlers;
pub mod model;
pub mod settings;
pub mod timing;
pub mod util;

pub use catalog::{builtin_catalog, TemplateCatalog};
pub use codec::{DeviceCodec, EffectPlacement};
pub use compile::{compile_section, CompiledSection, SectionRequest};
pub use error::{ChoreoError, Result};
pub use handlers::HandlerRegistry;
pub use settings::CompilerSettings;
