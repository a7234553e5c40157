//! Enrollment event hooks
//!
//! [`FingerprintBioEnrollment`](crate::FingerprintBioEnrollment) reports what
//! it does through an [`EnrollmentObserver`]. Every method has an empty
//! default, so an observer only overrides the events it cares about. The
//! default observer is [`LogObserver`], which forwards events to the `log`
//! facade; pass `()` to silence them.

use crate::bio_enrollment::{CaptureStatus, EnrollmentInfo, SubCommand, TemplateId};

use biokey_ctap::ResponseMap;

/// Receives bio enrollment events
#[allow(unused_variables)]
pub trait EnrollmentObserver {
    /// A request is about to be sent
    ///
    /// `sub_command` is `None` for the getModality query, which carries no
    /// sub-command.
    fn request_sent(&self, sub_command: Option<SubCommand>, authenticated: bool) {}

    /// A request completed successfully
    fn response_received(&self, sub_command: Option<SubCommand>, response: &ResponseMap) {}

    /// The sensor reported on a sample
    fn sample_captured(&self, status: &CaptureStatus) {}

    /// The last required sample was accepted
    fn enrollment_completed(&self, template_id: &TemplateId) {}

    /// An enrollment was cancelled
    fn enrollment_cancelled(&self) {}

    /// Templates were listed
    fn enrollments_enumerated(&self, enrollments: &EnrollmentInfo) {}

    /// A template got a new friendly name
    fn template_renamed(&self, template_id: &TemplateId, name: &str) {}

    /// A template was deleted
    fn template_removed(&self, template_id: &TemplateId) {}
}

/// Discards every event
impl EnrollmentObserver for () {}

impl<O: EnrollmentObserver + ?Sized> EnrollmentObserver for &O {
    fn request_sent(&self, sub_command: Option<SubCommand>, authenticated: bool) {
        (**self).request_sent(sub_command, authenticated)
    }

    fn response_received(&self, sub_command: Option<SubCommand>, response: &ResponseMap) {
        (**self).response_received(sub_command, response)
    }

    fn sample_captured(&self, status: &CaptureStatus) {
        (**self).sample_captured(status)
    }

    fn enrollment_completed(&self, template_id: &TemplateId) {
        (**self).enrollment_completed(template_id)
    }

    fn enrollment_cancelled(&self) {
        (**self).enrollment_cancelled()
    }

    fn enrollments_enumerated(&self, enrollments: &EnrollmentInfo) {
        (**self).enrollments_enumerated(enrollments)
    }

    fn template_renamed(&self, template_id: &TemplateId, name: &str) {
        (**self).template_renamed(template_id, name)
    }

    fn template_removed(&self, template_id: &TemplateId) {
        (**self).template_removed(template_id)
    }
}

/// Writes enrollment events to the `log` facade
///
/// Template identifiers are logged in base64. Friendly names are not logged.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

fn request_name(sub_command: Option<SubCommand>) -> String {
    sub_command.map_or_else(|| "getModality".to_string(), |sub_command| sub_command.to_string())
}

impl EnrollmentObserver for LogObserver {
    fn request_sent(&self, sub_command: Option<SubCommand>, authenticated: bool) {
        match sub_command {
            Some(SubCommand::EnrollBegin) => log::debug!("Starting fingerprint enrollment"),
            Some(SubCommand::EnrollCaptureNextSample) => log::debug!("Capturing next sample"),
            Some(SubCommand::CancelCurrentEnrollment) => {
                log::debug!("Cancelling fingerprint enrollment")
            }
            _ => {}
        }
        log::trace!(
            "Sending bio enrollment {} (authenticated: {})",
            request_name(sub_command),
            authenticated
        );
    }

    fn response_received(&self, sub_command: Option<SubCommand>, response: &ResponseMap) {
        log::trace!(
            "Bio enrollment {} succeeded (empty response: {})",
            request_name(sub_command),
            response.is_empty()
        );
    }

    fn sample_captured(&self, status: &CaptureStatus) {
        log::debug!(
            "Sample capture result: {}, {} sample(s) remaining",
            status.sample_status,
            status.remaining_samples
        );
    }

    fn enrollment_completed(&self, template_id: &TemplateId) {
        log::info!("Fingerprint enrolled: {}", template_id);
    }

    fn enrollment_cancelled(&self) {
        log::debug!("Fingerprint enrollment cancelled");
    }

    fn enrollments_enumerated(&self, enrollments: &EnrollmentInfo) {
        if enrollments.is_empty() {
            log::debug!("No fingerprints enrolled");
        } else {
            log::debug!("Enumerated {} fingerprint template(s)", enrollments.len());
        }
    }

    fn template_renamed(&self, template_id: &TemplateId, _name: &str) {
        log::info!("Fingerprint template renamed: {}", template_id);
    }

    fn template_removed(&self, template_id: &TemplateId) {
        log::info!("Fingerprint template deleted: {}", template_id);
    }
}
