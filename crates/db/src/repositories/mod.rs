//! Database repositories.
//!
//! sea-orm implementations of the store traits in [`crate::store`].

mod announcement;
mod clearance;
mod damage_report;
mod directory;
mod exit_permit;
mod notification;

pub use announcement::AnnouncementRepository;
pub use clearance::ClearanceRepository;
pub use damage_report::DamageReportRepository;
pub use directory::DirectoryRepository;
pub use exit_permit::ExitPermitRepository;
pub use notification::NotificationRepository;
