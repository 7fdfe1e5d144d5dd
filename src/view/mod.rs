//! Typed view-models for the page-side behavior: state in, rendered view
//! out, no document tree required. Handlers and the static glue scripts
//! both lean on these so the interesting logic stays unit-testable.

pub mod attendance;
pub mod notice;
