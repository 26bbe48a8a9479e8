//! Authenticated user session.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::{
    signature::NonceCounter,
    types::{Profile, SubmissionError},
};

/// The signed-in profile and the state shared by all its submissions.
///
/// Clones share the nonce counter and the in-flight flag.
#[derive(Debug, Clone)]
pub struct Session {
    profile: Profile,
    nonce: NonceCounter,
    in_flight: Arc<AtomicBool>,
}

impl Session {
    /// Creates a session whose next signature uses `nonce`.
    pub fn new(profile: Profile, nonce: u64) -> Self {
        Self { profile, nonce: NonceCounter::new(nonce), in_flight: Arc::default() }
    }

    /// Returns the signed-in profile.
    pub const fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Returns the session's signature nonce.
    pub const fn nonce(&self) -> &NonceCounter {
        &self.nonce
    }

    /// Returns true while a submission is outstanding.
    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Marks a submission as started.
    ///
    /// Fails with [`SubmissionError::InFlight`] if one is already running. The
    /// flag is cleared when the returned guard is dropped.
    pub fn begin_submission(&self) -> Result<SubmissionGuard, SubmissionError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SubmissionError::InFlight)?;
        Ok(SubmissionGuard { flag: Arc::clone(&self.in_flight) })
    }
}

/// Clears the session's in-flight flag on drop.
#[derive(Debug)]
pub struct SubmissionGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for SubmissionGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
