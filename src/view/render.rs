//! Async Render Aggregator - Join many child renders into one completion.
//!
//! Every child render is a future (synchronous renders are already-ready
//! futures), so there is one path: collect the pending renders, `join_all`
//! them, and report the failures that came back.
//!
//! Failure policy is collect-all: one failing child never cuts the others
//! short. The joint result lists every failure.

use std::future::Future;
use std::pin::Pin;
use std::rc::Weak;
use std::task::{Context, Poll};

use futures::channel::oneshot;
use futures::future::join_all;

use super::base::{RenderFuture, ViewHandle};
use super::collection_view::CollectionView;
use crate::error::{ChildRenderFailure, ViewError};
use crate::types::Record;

/// Result of a joint render whose children all succeeded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderReport {
    /// Render cycle this report belongs to.
    pub generation: u64,
    /// Number of children rendered (placeholder included).
    pub rendered: usize,
}

/// Joint completion of one `render()` call.
///
/// The aggregation runs on the view's executor whether or not this handle is
/// polled; dropping the handle only discards the result.
#[must_use = "dropping the handle discards the render result"]
pub struct RenderHandle {
    generation: u64,
    receiver: oneshot::Receiver<Result<RenderReport, ViewError>>,
}

impl RenderHandle {
    pub(crate) fn new(
        generation: u64,
        receiver: oneshot::Receiver<Result<RenderReport, ViewError>>,
    ) -> Self {
        Self {
            generation,
            receiver,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Future for RenderHandle {
    type Output = Result<RenderReport, ViewError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(oneshot::Canceled)) => Poll::Ready(Err(ViewError::Abandoned)),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl std::fmt::Debug for RenderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderHandle")
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

/// A child whose render has been started.
pub(crate) struct PendingRender {
    pub record: Record,
    pub view: ViewHandle,
    pub future: RenderFuture,
}

/// Wait for one child and tell the parent how it went.
pub(crate) async fn settle(
    pending: PendingRender,
    parent: Weak<CollectionView>,
) -> Option<ChildRenderFailure> {
    let PendingRender {
        record,
        view,
        future,
    } = pending;

    let result = future.await;
    if let Some(parent) = parent.upgrade() {
        parent.child_settled(&record, &view, result.as_ref().err());
    }

    result.err().map(|error| ChildRenderFailure { record, error })
}

/// Wait for every child, in any settle order.
pub(crate) async fn settle_all(
    pending: Vec<PendingRender>,
    parent: Weak<CollectionView>,
) -> Vec<ChildRenderFailure> {
    let settles = pending
        .into_iter()
        .map(|pending| settle(pending, parent.clone()));

    join_all(settles).await.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn test_handle_resolves_with_sent_result() {
        let (sender, receiver) = oneshot::channel();
        let handle = RenderHandle::new(3, receiver);
        assert_eq!(handle.generation(), 3);

        sender
            .send(Ok(RenderReport {
                generation: 3,
                rendered: 2,
            }))
            .unwrap();

        let report = block_on(handle).unwrap();
        assert_eq!(report.rendered, 2);
    }

    #[test]
    fn test_handle_reports_abandoned_when_sender_dropped() {
        let (sender, receiver) = oneshot::channel::<Result<RenderReport, ViewError>>();
        drop(sender);

        let err = block_on(RenderHandle::new(1, receiver)).unwrap_err();
        assert!(matches!(err, ViewError::Abandoned));
    }
}
