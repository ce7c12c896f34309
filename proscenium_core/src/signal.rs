// Copyright 2026 the Proscenium Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Observer lists with ordered, synchronous dispatch.
//!
//! Each emitting object owns a [`Signal`] per notification kind. Dispatch
//! walks the connection list by index, so disconnecting an entry between
//! (or during) dispatches leaves a tombstone rather than shifting the list;
//! not-yet-visited and already-visited entries are both safe to remove.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

/// A handle to one connection on a [`Signal`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u32);

impl fmt::Debug for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConnectionId({})", self.0)
    }
}

/// An ordered list of observers for one notification kind.
///
/// Observers are invoked synchronously, in connection order.
pub struct Signal<E> {
    slots: Vec<Option<Box<dyn FnMut(&E)>>>,
}

impl<E> Default for Signal<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Signal<E> {
    /// Creates a signal with no observers.
    #[must_use]
    pub const fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Connects an observer, returning its handle.
    pub fn connect(&mut self, observer: impl FnMut(&E) + 'static) -> ConnectionId {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "connection counts stay far below u32::MAX"
        )]
        let id = ConnectionId(self.slots.len() as u32);
        self.slots.push(Some(Box::new(observer)));
        id
    }

    /// Disconnects an observer.
    ///
    /// Disconnecting an unknown or already-disconnected handle is a silent
    /// no-op.
    pub fn disconnect(&mut self, id: ConnectionId) {
        if let Some(slot) = self.slots.get_mut(id.0 as usize) {
            *slot = None;
        }
    }

    /// Invokes every connected observer with `event`, in connection order.
    ///
    /// Tombstoned slots are skipped; observers connected during dispatch
    /// are not visited until the next emit.
    pub fn emit(&mut self, event: &E) {
        let visited = self.slots.len();
        for i in 0..visited {
            if let Some(observer) = &mut self.slots[i] {
                observer(event);
            }
        }
    }

    /// Number of live connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

impl<E> fmt::Debug for Signal<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("connections", &self.connection_count())
            .field("slots", &self.slots.len())
            .finish()
    }
}
