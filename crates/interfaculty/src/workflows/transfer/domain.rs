use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! surrogate_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

surrogate_id!(
    /// Identifier of an account held by the external auth store.
    UserId
);
surrogate_id!(FacultyId);
surrogate_id!(ProgramId);
surrogate_id!(StudentId);
surrogate_id!(
    /// Identifier wrapper for submitted transfer applications.
    ApplicationId
);
surrogate_id!(NotificationId);

/// Account details mirrored from the auth store. Credentials never reach this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl UserAccount {
    pub fn full_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faculty {
    pub id: FacultyId,
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub id: ProgramId,
    pub name: String,
    pub faculty: FacultyId,
}

/// Role tag carried by every profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Hod,
    Dean,
    Registrar,
    Admin,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::Student => "Student",
            Role::Hod => "Head of Department",
            Role::Dean => "Dean",
            Role::Registrar => "Registrar",
            Role::Admin => "Admin",
        }
    }

    /// Landing view a caller is sent back to after a failed action.
    pub const fn dashboard_path(self) -> &'static str {
        match self {
            Role::Student => "/dashboard/student",
            Role::Hod => "/dashboard/hod",
            Role::Dean => "/dashboard/dean",
            Role::Registrar => "/dashboard/registrar",
            Role::Admin => "/admin",
        }
    }
}

/// One per user. A HOD or Dean without a faculty holds university-wide authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: UserId,
    pub role: Role,
    pub faculty: Option<FacultyId>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KcseResult {
    pub subject: String,
    pub grade: String,
}

/// KCSE examination metadata captured on the transfer form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KcseRecord {
    pub birth_cert_no: Option<String>,
    pub id_no: Option<String>,
    pub kcse_index_no: Option<String>,
    pub kcpe_index_no: Option<String>,
    pub mean_grade: Option<String>,
    pub aggregate_points: Option<f32>,
    pub cluster_weight: Option<f32>,
    pub university_cutoff: Option<f32>,
    /// Reference into the external file store; the slip itself is never read here.
    pub slip_path: Option<String>,
    pub results: Vec<KcseResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub user_id: UserId,
    pub admission_number: String,
    pub current_program: ProgramId,
    pub current_year: u8,
    pub phone: String,
    pub address: Option<String>,
    pub kcse: KcseRecord,
}

impl Student {
    pub fn has_completed_profile(&self) -> bool {
        fn present(value: &Option<String>) -> bool {
            value.as_deref().is_some_and(|v| !v.trim().is_empty())
        }

        present(&self.kcse.kcse_index_no)
            && present(&self.kcse.mean_grade)
            && present(&self.kcse.slip_path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Semester {
    First,
    Second,
}

impl Semester {
    pub const fn label(self) -> &'static str {
        match self {
            Semester::First => "Semester 1",
            Semester::Second => "Semester 2",
        }
    }
}

impl TryFrom<u8> for Semester {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Semester::First),
            2 => Ok(Semester::Second),
            other => Err(format!("semester must be 1 or 2, got {other}")),
        }
    }
}

impl From<Semester> for u8 {
    fn from(value: Semester) -> Self {
        match value {
            Semester::First => 1,
            Semester::Second => 2,
        }
    }
}

/// Closed set of workflow states. `HodApproved` doubles as "awaiting the Dean" and
/// `DeanApproved` as "awaiting the Registrar".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    PendingHod,
    HodApproved,
    HodRejected,
    DeanApproved,
    DeanRejected,
    RegistrarRejected,
    Completed,
}

impl TransferStatus {
    pub const ALL: [TransferStatus; 7] = [
        TransferStatus::PendingHod,
        TransferStatus::HodApproved,
        TransferStatus::HodRejected,
        TransferStatus::DeanApproved,
        TransferStatus::DeanRejected,
        TransferStatus::RegistrarRejected,
        TransferStatus::Completed,
    ];

    pub const fn code(self) -> &'static str {
        match self {
            TransferStatus::PendingHod => "pending_hod",
            TransferStatus::HodApproved => "hod_approved",
            TransferStatus::HodRejected => "hod_rejected",
            TransferStatus::DeanApproved => "dean_approved",
            TransferStatus::DeanRejected => "dean_rejected",
            TransferStatus::RegistrarRejected => "registrar_rejected",
            TransferStatus::Completed => "completed",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            TransferStatus::PendingHod => "Pending HOD Review",
            TransferStatus::HodApproved => "HOD Approved",
            TransferStatus::HodRejected => "HOD Rejected",
            TransferStatus::DeanApproved => "Dean Approved",
            TransferStatus::DeanRejected => "Dean Rejected",
            TransferStatus::RegistrarRejected => "Registrar Rejected",
            TransferStatus::Completed => "Completed",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            TransferStatus::HodRejected
                | TransferStatus::DeanRejected
                | TransferStatus::RegistrarRejected
                | TransferStatus::Completed
        )
    }

    /// Still moving through the chain; a student may hold at most one of these.
    pub const fn is_open(self) -> bool {
        !self.is_terminal()
    }

    pub const fn category(self) -> StatusCategory {
        match self {
            TransferStatus::PendingHod => StatusCategory::Pending,
            TransferStatus::HodApproved | TransferStatus::DeanApproved => {
                StatusCategory::Approved
            }
            TransferStatus::HodRejected
            | TransferStatus::DeanRejected
            | TransferStatus::RegistrarRejected => StatusCategory::Rejected,
            TransferStatus::Completed => StatusCategory::Completed,
        }
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Coarse grouping used by the report counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCategory {
    Pending,
    Approved,
    Rejected,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferApplication {
    pub id: ApplicationId,
    pub student: StudentId,
    pub current_program: ProgramId,
    pub requested_program: ProgramId,
    pub reason: String,
    pub academic_year: String,
    pub semester: Semester,
    pub status: TransferStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub hod_comment: Option<String>,
    pub dean_comment: Option<String>,
    pub registrar_comment: Option<String>,
    pub new_admission_number: Option<String>,
}

/// Fire-and-forget message for a user, optionally tied to an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient: UserId,
    pub message: String,
    pub application: Option<ApplicationId>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Self-registration payload for a new student account.
///
/// The password pair is only compared; credentials are handed to the auth store, never kept.
#[derive(Debug, Clone, Deserialize)]
pub struct StudentRegistration {
    pub username: String,
    pub password: String,
    pub confirm_password: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub admission_number: String,
    pub current_program: ProgramId,
    pub current_year: u8,
    pub phone: String,
}

/// Transfer request submitted by a student, optionally updating their KCSE details.
#[derive(Debug, Clone, Deserialize)]
pub struct TransferSubmission {
    pub requested_program: ProgramId,
    pub reason: String,
    pub academic_year: String,
    pub semester: Semester,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub kcse: Option<KcseRecord>,
}
