use std::ops::{Deref, DerefMut};

use crate::gpu::{BufferKind, GpuContext};

/// Scoped access to a context's binding state.
///
/// Everything bound through the scope is unbound when it drops, on every
/// exit path. The vertex array is released first so clearing the index
/// binding afterwards cannot detach the element buffer it recorded.
pub struct BindScope<'a, C: GpuContext> {
    context: &'a mut C,
}

impl<'a, C: GpuContext> BindScope<'a, C> {
    pub fn new(context: &'a mut C) -> Self {
        Self { context }
    }
}

impl<C: GpuContext> Deref for BindScope<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        self.context
    }
}

impl<C: GpuContext> DerefMut for BindScope<'_, C> {
    fn deref_mut(&mut self) -> &mut C {
        self.context
    }
}

impl<C: GpuContext> Drop for BindScope<'_, C> {
    fn drop(&mut self) {
        self.context.bind_vertex_array(None);
        for kind in BufferKind::ALL {
            self.context.bind_buffer(kind, None);
        }
    }
}
