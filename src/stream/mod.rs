//! Sequential streams and the random-access channel over storage
//!
//! Streams never own their region. They keep a [`StorageHandle`] and fail
//! with a closed or reclaimed error once the tenancy behind it ends. A
//! *linked* stream registers with its region's monitor: closing the region
//! force-closes the stream, and closing the stream closes the region.

pub mod channel;
pub mod delegated;
pub mod input;
pub mod output;

use std::sync::Arc;

use crate::error::{Result, VellumError};
use crate::storage::monitor::StreamState;
use crate::storage::{Span, StorageHandle};

pub use channel::StorageChannel;
pub use delegated::{IoWireReader, IoWireWriter};
pub use input::StorageInputStream;
pub use output::StorageOutputStream;

/// The part of a stream that ties it to a region
#[derive(Debug)]
struct Attachment {
    handle: StorageHandle,
    state: Arc<StreamState>,
    linked: bool,
}

impl Attachment {
    fn new(span: &Span, linked: bool) -> Result<Self> {
        if span.is_closed() {
            return Err(VellumError::closed("storage"));
        }
        let state = StreamState::new();
        if linked {
            span.core().monitor().register(&state);
        }
        Ok(Self {
            handle: span.handle(),
            state,
            linked,
        })
    }

    /// Live span, or the reason there is none
    fn span(&self) -> Result<Span> {
        if self.state.is_closed() {
            return Err(VellumError::closed("stream"));
        }
        self.handle.resolve()
    }

    fn is_closed(&self) -> bool {
        self.state.is_closed() || self.handle.is_closed()
    }

    fn len(&self) -> usize {
        self.handle.len()
    }

    fn close(&self) {
        if !self.state.mark_closed() {
            return;
        }
        if self.linked {
            if let Ok(core) = self.handle.core() {
                core.monitor().deregister(self.state.id());
            }
            self.handle.close_storage();
        }
    }
}

impl Drop for Attachment {
    fn drop(&mut self) {
        if self.linked {
            if let Ok(core) = self.handle.core() {
                core.monitor().deregister(self.state.id());
            }
        }
    }
}
