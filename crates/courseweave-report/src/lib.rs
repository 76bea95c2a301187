//! HTML rendering of courseweave pipeline runs.

pub mod html;
