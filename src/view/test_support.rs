//! Recorder views shared by the view tests.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use futures::channel::oneshot;
use futures::FutureExt;

use super::base::{render_failed, rendered, ChildView, RenderFuture, ViewBase, ViewHandle};
use super::collection_view::CollectionView;
use super::factory::ChildViewType;
use crate::error::RenderError;
use crate::types::RecordId;

type Gate = oneshot::Sender<Result<(), RenderError>>;

/// Records what its views did. Deferred recorders hold every render open until
/// [`Recorder::settle`] is called for the record.
#[derive(Default)]
pub(crate) struct Recorder {
    pub built: RefCell<Vec<RecordId>>,
    pub renders: Cell<usize>,
    closes: RefCell<HashMap<RecordId, usize>>,
    gates: RefCell<Vec<(RecordId, Gate)>>,
    deferred: bool,
}

impl Recorder {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn deferred() -> Rc<Self> {
        Rc::new(Self {
            deferred: true,
            ..Self::default()
        })
    }

    pub fn view_type(self: &Rc<Self>, name: &str) -> ChildViewType {
        let recorder = self.clone();
        ChildViewType::new(name, move |record, context| {
            recorder.built.borrow_mut().push(record.id());
            Rc::new(RecorderView {
                base: ViewBase::for_record(record, context),
                recorder: recorder.clone(),
            }) as ViewHandle
        })
    }

    pub fn closes_of(&self, id: RecordId) -> usize {
        self.closes.borrow().get(&id).copied().unwrap_or(0)
    }

    /// Release the oldest open render for `id`. Returns false if none is open.
    pub fn settle(&self, id: RecordId, result: Result<(), RenderError>) -> bool {
        let gate = {
            let mut gates = self.gates.borrow_mut();
            let position = gates.iter().position(|(gate_id, _)| *gate_id == id);
            position.map(|position| gates.remove(position).1)
        };
        match gate {
            Some(gate) => gate.send(result).is_ok(),
            None => false,
        }
    }
}

struct RecorderView {
    base: ViewBase,
    recorder: Rc<Recorder>,
}

impl ChildView for RecorderView {
    fn base(&self) -> &ViewBase {
        &self.base
    }

    fn render(&self) -> RenderFuture {
        self.recorder.renders.set(self.recorder.renders.get() + 1);
        let Some(record) = self.base.record().cloned() else {
            return rendered();
        };

        if record.get("fail").is_some() {
            return render_failed(RenderError::new(format!("{} failed", record.id())));
        }
        if !self.recorder.deferred {
            return rendered();
        }

        let (sender, receiver) = oneshot::channel();
        self.recorder.gates.borrow_mut().push((record.id(), sender));
        async move {
            receiver
                .await
                .unwrap_or_else(|_| Err(RenderError::new("gate dropped")))
        }
        .boxed_local()
    }

    fn close(&self) -> bool {
        if let Some(record) = self.base.record() {
            *self.recorder.closes.borrow_mut().entry(record.id()).or_insert(0) += 1;
        }
        self.base.close()
    }
}

/// Names of every event the view emits, in order.
pub(crate) fn event_log(view: &CollectionView) -> Rc<RefCell<Vec<String>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    let log_clone = log.clone();
    view.on_any(move |event| log_clone.borrow_mut().push(event.name().to_string()))
        .forget();
    log
}
