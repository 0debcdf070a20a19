//! Scoped ownership of broker resources.

use std::ops::{Deref, DerefMut};

use tracing::{trace, warn};

use crate::broker::Close;
use crate::error::{Resource, TeardownError};

/// Closes the wrapped resource when dropped.
///
/// A close failure is logged as a [`TeardownError`] and otherwise ignored, so
/// releasing a resource can never replace the result of the work done with
/// it. Declare guards in acquisition order; Rust drops locals in reverse, so
/// resources are released last-acquired first.
pub(crate) struct Scoped<T: Close> {
    resource: Resource,
    inner: T,
}

impl<T: Close> Scoped<T> {
    pub(crate) fn new(resource: Resource, inner: T) -> Self {
        trace!(%resource, "opened");
        Scoped { resource, inner }
    }
}

impl<T: Close> Deref for Scoped<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T: Close> DerefMut for Scoped<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.inner
    }
}

impl<T: Close> Drop for Scoped<T> {
    fn drop(&mut self) {
        match self.inner.close() {
            Ok(()) => trace!(resource = %self.resource, "closed"),
            Err(source) => {
                let error = TeardownError {
                    resource: self.resource,
                    source,
                };
                warn!(error = %error, cause = %error.source, "ignoring teardown failure");
            }
        }
    }
}
