//! Inter-faculty transfer applications.
//!
//! A student's request moves through three review stages (HOD, Dean, Registrar). The pure
//! [`machine::transition`] function decides every step; [`TransferService`] loads the records,
//! persists the outcome with a compare-and-set and delivers the resulting notifications.

pub mod domain;
pub mod export;
pub mod machine;
pub mod memory;
mod messages;
pub mod reports;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    ApplicationId, Faculty, FacultyId, KcseRecord, KcseResult, Notification, NotificationId,
    Profile, Program, ProgramId, Role, Semester, StatusCategory, Student, StudentId,
    StudentRegistration, TransferApplication, TransferStatus, TransferSubmission, UserAccount,
    UserId,
};
pub use export::{render_csv, CsvExport, ExportError, EXPORT_HEADER};
pub use machine::{
    transition, ApplicationScope, FacultyScope, ReviewAction, ReviewStage, Reviewer, Transition,
    WorkflowError,
};
pub use memory::{InMemoryApplicationRepository, InMemoryDirectory, InMemoryNotifications};
pub use reports::{
    ApplicationView, CategoryCounts, Dashboard, FacultyReport, StatusSummary, StudentRecord,
};
pub use repository::{
    ApplicationRepository, Directory, NotificationError, NotificationPublisher, RepositoryError,
};
pub use router::{transfer_router, Decision, ReviewRequest, USER_HEADER};
pub use service::{ErrorKind, TransferService, TransferServiceError};
