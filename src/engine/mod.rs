//! External engine collaborators.
//!
//! The build core never inspects these engines' internals; each module wraps
//! one crate behind the narrow contract the pipelines rely on:
//!
//! - **template**: template source + data -> HTML + list of files read
//! - **style**: aggregated style source -> CSS + source map
//! - **script**: aggregated script source -> minified code + source map
//! - **markdown**: text -> HTML, exposed to templates as a filter

pub mod markdown;
pub mod script;
pub mod style;
pub mod template;
