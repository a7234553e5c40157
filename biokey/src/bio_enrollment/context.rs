use super::{FingerprintBioEnrollment, TemplateId};
use crate::error::{Error, Result};

use std::fmt;

/// Where an [`EnrollmentContext`] is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnrollmentState {
    /// No sample captured yet; the next capture starts the enrollment
    NotStarted,
    /// The authenticator assigned a template and wants more samples
    InProgress,
    /// All samples were accepted
    Complete,
    /// The enrollment was cancelled
    Cancelled,
}

impl EnrollmentState {
    /// Check if no further captures are possible
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Cancelled)
    }
}

impl fmt::Display for EnrollmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotStarted => "not started",
            Self::InProgress => "in progress",
            Self::Complete => "complete",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// One multi-sample fingerprint enrollment
///
/// Created by [`FingerprintBioEnrollment::enroll`]. Each [`capture`](Self::capture)
/// asks the user for one touch: the first one begins the enrollment, later
/// ones add samples to the template until the authenticator needs no more.
///
/// A rejected sample returns [`Error::CaptureFailed`] and the same call can
/// simply be repeated. `remaining` is not updated by a rejected sample. A
/// rejected first sample still adopts the template the authenticator
/// allocated, so the retry continues it with capture-next instead of
/// beginning a second one. Any other failed command leaves the context
/// unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentContext {
    timeout_ms: Option<u32>,
    template_id: Option<TemplateId>,
    remaining: Option<u32>,
    state: EnrollmentState,
}

impl EnrollmentContext {
    pub(crate) fn new(timeout_ms: Option<u32>) -> Self {
        Self {
            timeout_ms,
            template_id: None,
            remaining: None,
            state: EnrollmentState::NotStarted,
        }
    }

    /// Capture one sample
    ///
    /// Returns the template id once the last required sample is accepted and
    /// `None` while more samples are needed.
    ///
    /// # Errors
    ///
    /// - [`Error::CaptureFailed`] if the sensor rejected the sample
    /// - [`Error::InvalidState`] after completion or cancellation (nothing is sent)
    /// - any error of the underlying sub-command
    pub fn capture(&mut self, bio: &mut FingerprintBioEnrollment<'_>) -> Result<Option<TemplateId>> {
        let (template_id, status) = match (self.state, &self.template_id) {
            (EnrollmentState::Complete | EnrollmentState::Cancelled, _) => {
                return Err(Error::InvalidState(self.state));
            }
            (EnrollmentState::InProgress, Some(template_id)) => {
                let status = bio.enroll_capture_next(template_id, self.timeout_ms)?;
                (template_id.clone(), status)
            }
            _ => {
                let begin = bio.enroll_begin(self.timeout_ms)?;
                // The template exists on the device once begin succeeds,
                // whatever the quality of the first sample.
                self.template_id = Some(begin.template_id.clone());
                self.state = EnrollmentState::InProgress;
                (begin.template_id, begin.status)
            }
        };

        if !status.sample_status.is_good() {
            return Err(Error::CaptureFailed(status.sample_status));
        }

        self.remaining = Some(status.remaining_samples);

        if status.remaining_samples == 0 {
            self.state = EnrollmentState::Complete;
            bio.observer().enrollment_completed(&template_id);
            Ok(Some(template_id))
        } else {
            self.state = EnrollmentState::InProgress;
            Ok(None)
        }
    }

    /// Cancel the enrollment
    ///
    /// Sends the cancel sub-command whatever the current state, clears the
    /// template id and moves to [`EnrollmentState::Cancelled`]. Cancelling
    /// twice is harmless.
    pub fn cancel(&mut self, bio: &mut FingerprintBioEnrollment<'_>) -> Result<()> {
        bio.enroll_cancel()?;
        self.template_id = None;
        self.state = EnrollmentState::Cancelled;
        Ok(())
    }

    /// Current lifecycle state
    pub fn state(&self) -> EnrollmentState {
        self.state
    }

    /// Template id assigned by the authenticator, once enrollment has begun
    pub fn template_id(&self) -> Option<&TemplateId> {
        self.template_id.as_ref()
    }

    /// Samples still required, as of the last accepted capture
    pub fn remaining(&self) -> Option<u32> {
        self.remaining
    }

    /// Timeout sent with every capture
    pub fn timeout_ms(&self) -> Option<u32> {
        self.timeout_ms
    }

    /// Check if the enrollment finished successfully
    pub fn is_complete(&self) -> bool {
        self.state == EnrollmentState::Complete
    }
}
