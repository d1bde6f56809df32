//! Database entities.

#![allow(missing_docs)]

pub mod announcement;
pub mod clearance_request;
pub mod damage_line_item;
pub mod damage_report;
pub mod exit_permit;
pub mod manager;
pub mod notification;
pub mod payment_record;
pub mod student;
pub mod user;

pub use announcement::Entity as Announcement;
pub use clearance_request::Entity as ClearanceRequest;
pub use damage_line_item::Entity as DamageLineItem;
pub use damage_report::Entity as DamageReport;
pub use exit_permit::Entity as ExitPermit;
pub use manager::Entity as Manager;
pub use notification::Entity as Notification;
pub use payment_record::Entity as PaymentRecord;
pub use student::Entity as Student;
pub use user::Entity as User;
