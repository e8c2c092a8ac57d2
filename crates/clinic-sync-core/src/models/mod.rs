//! Domain models for the clinic record store.
//!
//! Each syncable type comes in two shapes: the `*Delta` struct the client
//! sends (loose, mostly optional) and the normalized record written to
//! storage.

mod appointment;
mod attribute;
mod event;
mod lifecycle;
mod patient;
mod prescription;
mod reference;
mod value;
mod visit;

pub use appointment::*;
pub use attribute::*;
pub use event::*;
pub use lifecycle::*;
pub use patient::*;
pub use prescription::*;
pub use reference::*;
pub use value::*;
pub use visit::*;
