//! Engine - Record containers behind a collection view.
//!
//! - [`Collection`] - Observable ordered record container
//! - [`ChildRegistry`] - Record id → live child view, plus the placeholder slot

mod children;
mod collection;

pub use children::*;
pub use collection::*;
