//! Inter-faculty transfer workflow: HOD, Dean and Registrar review of student transfer
//! requests, with notifications, reports and CSV export.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
