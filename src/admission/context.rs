// Copyright 2024 The Kubernetes Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Request-scoped deadline and cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// ContextError reports why a request context is no longer usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("request was cancelled")]
    Cancelled,
    #[error("request deadline exceeded")]
    DeadlineExceeded,
}

/// CancellationFlag is shared between the caller and an in-flight request.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// RequestContext bounds the work done for a single admission request.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    deadline: Option<Instant>,
    cancellation: CancellationFlag,
}

impl RequestContext {
    /// A context without deadline that is never cancelled unless its flag is raised.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            cancellation: CancellationFlag::new(),
        }
    }

    /// A context that expires `timeout` from now. A timeout too large to
    /// represent as an `Instant` leaves the context without a deadline.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now().checked_add(timeout),
            cancellation: CancellationFlag::new(),
        }
    }

    pub fn with_cancellation(mut self, flag: CancellationFlag) -> Self {
        self.cancellation = flag;
        self
    }

    /// Sets a deadline `timeout` from now unless one is already present.
    /// A timeout that overflows `Instant` sets none.
    pub fn ensure_deadline(&mut self, timeout: Duration) {
        if self.deadline.is_none() {
            self.deadline = Instant::now().checked_add(timeout);
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns the reason this context is done, if it is.
    pub fn err(&self) -> Option<ContextError> {
        if self.cancellation.is_cancelled() {
            return Some(ContextError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    pub fn check(&self) -> Result<(), ContextError> {
        match self.err() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_context_is_live() {
        let ctx = RequestContext::background();
        assert_eq!(ctx.err(), None);
        assert!(ctx.deadline().is_none());
    }

    #[test]
    fn test_cancellation_is_shared() {
        let flag = CancellationFlag::new();
        let ctx = RequestContext::with_timeout(Duration::from_secs(60)).with_cancellation(flag.clone());
        assert_eq!(ctx.check(), Ok(()));

        flag.cancel();
        assert_eq!(ctx.check(), Err(ContextError::Cancelled));
        assert_eq!(ctx.clone().err(), Some(ContextError::Cancelled));
    }

    #[test]
    fn test_deadline() {
        let ctx = RequestContext::with_deadline(Instant::now());
        assert_eq!(ctx.err(), Some(ContextError::DeadlineExceeded));

        let ctx = RequestContext::with_timeout(Duration::from_secs(60));
        assert_eq!(ctx.err(), None);
    }

    #[test]
    fn test_ensure_deadline_keeps_existing() {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut ctx = RequestContext::with_deadline(deadline);
        ctx.ensure_deadline(Duration::from_secs(60));
        assert_eq!(ctx.deadline(), Some(deadline));

        let mut ctx = RequestContext::background();
        ctx.ensure_deadline(Duration::from_secs(60));
        assert!(ctx.deadline().is_some());
    }

    #[test]
    fn test_unrepresentable_timeout_has_no_deadline() {
        let timeouts = [Duration::MAX, Duration::from_secs(u64::MAX)];
        for timeout in timeouts {
            let mut ctx = RequestContext::background();
            ctx.ensure_deadline(timeout);
            assert!(ctx.deadline().is_none(), "{:?}", timeout);
            assert_eq!(ctx.check(), Ok(()));

            let ctx = RequestContext::with_timeout(timeout);
            assert!(ctx.deadline().is_none(), "{:?}", timeout);
            assert_eq!(ctx.err(), None);
        }
    }
}
