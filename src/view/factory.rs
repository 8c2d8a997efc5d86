//! Child View Factory - Resolve and construct child views.

use std::fmt;
use std::rc::Rc;

use super::base::{ChildView, ViewContext, ViewHandle};
use crate::error::ViewError;
use crate::types::Record;

/// Constructor bound into a [`ChildViewType`].
pub type ViewConstructor = Rc<dyn Fn(Record, &ViewContext) -> ViewHandle>;

/// Views that can be built directly from a record.
pub trait BuildView: ChildView + Sized + 'static {
    fn build(record: Record, context: &ViewContext) -> Self;
}

/// A named child-view constructor.
#[derive(Clone)]
pub struct ChildViewType {
    name: Rc<str>,
    construct: ViewConstructor,
}

impl ChildViewType {
    pub fn new<F>(name: impl Into<String>, construct: F) -> Self
    where
        F: Fn(Record, &ViewContext) -> ViewHandle + 'static,
    {
        Self {
            name: Rc::from(name.into()),
            construct: Rc::new(construct),
        }
    }

    /// Child view type for a [`BuildView`] implementor.
    pub fn of<V: BuildView>() -> Self {
        Self::new(std::any::type_name::<V>(), |record, context| {
            Rc::new(V::build(record, context)) as ViewHandle
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Construct one view bound to `record`.
    pub fn build(&self, record: Record, context: &ViewContext) -> ViewHandle {
        (self.construct)(record, context)
    }
}

impl fmt::Debug for ChildViewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ChildViewType").field(&self.name).finish()
    }
}

/// Pick the child view type: instance option first, then configured default.
pub fn resolve_child_view_type(
    option: Option<&ChildViewType>,
    configured: Option<&ChildViewType>,
) -> Result<ChildViewType, ViewError> {
    option
        .or(configured)
        .cloned()
        .ok_or(ViewError::MissingChildView)
}

/// Build a child view. No rendering, no storage.
pub fn build_child_view(
    record: Record,
    view_type: &ChildViewType,
    context: &ViewContext,
) -> ViewHandle {
    view_type.build(record, context)
}
