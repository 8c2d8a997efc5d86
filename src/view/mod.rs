//! Views - Child view contract, factory, render aggregation, and the
//! collection view that ties them together.
//!
//! - [`ChildView`] / [`ViewBase`] - What every child must provide
//! - [`ChildViewType`] - Named constructor, resolved per instance or per config
//! - [`RenderHandle`] - Joint completion of one render cycle
//! - [`CollectionView`] - One child per record, kept in sync

mod base;
mod collection_view;
mod factory;
mod render;

#[cfg(test)]
pub(crate) mod test_support;

pub use base::*;
pub use collection_view::*;
pub use factory::*;
pub use render::{RenderHandle, RenderReport};
