//! Business logic services.

#![allow(missing_docs)]

pub mod announcement;
pub mod clearance;
pub mod damage_report;
pub mod exit_permit;
pub mod notification;
pub mod realtime;

#[cfg(test)]
pub(crate) mod testing;

pub use announcement::{AnnouncementService, CreateAnnouncementInput};
pub use clearance::{
    ClearanceService, DamageItemInput, FacilityVerificationOutcome, VerifyFacilitiesInput,
};
pub use damage_report::{DamageReportService, SubmitReportInput};
pub use exit_permit::{ExitPermitService, SubmitPermitInput};
pub use notification::{FanOutReport, NotificationDraft, NotificationFeed, NotificationService};
pub use realtime::{
    NoOpRealtimePublisher, NotificationEvent, RealtimeEvent, RealtimePublisher,
    RealtimePublisherService,
};
