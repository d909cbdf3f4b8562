// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::EngineError;
use std::{
    fmt,
    sync::{PoisonError, RwLock},
};
use tracing::{trace, warn};

/// Something allocated by a native engine that has to be freed explicitly.
pub trait Release: Send + Sync {
    fn release(self) -> Result<(), EngineError>;
}

impl<T: Release> Release for Vec<T> {
    /// Releases every element, reporting the first failure.
    fn release(self) -> Result<(), EngineError> {
        let mut first_err = None;
        for item in self {
            if let Err(e) = item.release() {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

/// Owns a native allocation until [`Resource::release`] is called or the guard is dropped,
/// whichever comes first. Releasing twice is a no-op. Access after release returns
/// [`EngineError::Released`] instead of touching freed memory.
pub struct Resource<T: Release> {
    label: &'static str,
    slot: RwLock<Option<T>>,
}

impl<T: Release> Resource<T> {
    pub fn new(label: &'static str, value: T) -> Self {
        trace!("acquired {label}");
        Self {
            label,
            slot: RwLock::new(Some(value)),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Run `f` against the live allocation.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R, EngineError> {
        let guard = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(value) => Ok(f(value)),
            None => Err(EngineError::Released {
                resource: self.label.to_string(),
            }),
        }
    }

    pub fn is_released(&self) -> bool {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Free the allocation. Returns `Ok(false)` if it had already been freed.
    pub fn release(&self) -> Result<bool, EngineError> {
        let taken = self
            .slot
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match taken {
            Some(value) => {
                trace!("releasing {}", self.label);
                value.release()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl<T: Release> Drop for Resource<T> {
    fn drop(&mut self) {
        let slot = self.slot.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(value) = slot.take() {
            trace!("releasing {} on drop", self.label);
            if let Err(e) = value.release() {
                warn!("failed to release {}: {e}", self.label);
            }
        }
    }
}

impl<T: Release> fmt::Debug for Resource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("label", &self.label)
            .field("released", &self.is_released())
            .finish()
    }
}
