// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The native library reported a failure. `code` is passed through untouched.
    #[error("native engine call '{operation}' failed with code {code}")]
    Native { operation: String, code: i32 },
    #[error("{resource} was used after it had been released")]
    Released { resource: String },
    #[error("engine serialization error: {0}")]
    Serialization(String),
}

impl EngineError {
    pub fn native(operation: impl Into<String>, code: i32) -> Self {
        Self::Native {
            operation: operation.into(),
            code,
        }
    }

    /// Raw engine error code, when the failure came from the native side.
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Native { code, .. } => Some(*code),
            _ => None,
        }
    }
}
