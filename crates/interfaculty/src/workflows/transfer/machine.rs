//! Review state machine for transfer applications.
//!
//! [`transition`] is a pure function from the current status, the requested action and the
//! reviewer's capability to the next status plus the side effects the service must carry out.
//! Nothing here touches storage, so every edge of the chain can be exercised in isolation.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    FacultyId, ProgramId, Profile, Role, TransferApplication, TransferStatus, UserId,
};

/// The three sequential review stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStage {
    Hod,
    Dean,
    Registrar,
}

impl ReviewStage {
    pub const fn ordered() -> [ReviewStage; 3] {
        [ReviewStage::Hod, ReviewStage::Dean, ReviewStage::Registrar]
    }

    /// Status an application must hold before this stage may act on it.
    pub const fn awaiting(self) -> TransferStatus {
        match self {
            ReviewStage::Hod => TransferStatus::PendingHod,
            ReviewStage::Dean => TransferStatus::HodApproved,
            ReviewStage::Registrar => TransferStatus::DeanApproved,
        }
    }

    pub const fn approved(self) -> TransferStatus {
        match self {
            ReviewStage::Hod => TransferStatus::HodApproved,
            ReviewStage::Dean => TransferStatus::DeanApproved,
            ReviewStage::Registrar => TransferStatus::Completed,
        }
    }

    pub const fn rejected(self) -> TransferStatus {
        match self {
            ReviewStage::Hod => TransferStatus::HodRejected,
            ReviewStage::Dean => TransferStatus::DeanRejected,
            ReviewStage::Registrar => TransferStatus::RegistrarRejected,
        }
    }

    pub const fn role(self) -> Role {
        match self {
            ReviewStage::Hod => Role::Hod,
            ReviewStage::Dean => Role::Dean,
            ReviewStage::Registrar => Role::Registrar,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            ReviewStage::Hod => "HOD",
            ReviewStage::Dean => "Dean",
            ReviewStage::Registrar => "Registrar",
        }
    }
}

impl fmt::Display for ReviewStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Faculty authority held by a reviewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "faculty")]
pub enum FacultyScope {
    University,
    Faculty(FacultyId),
}

impl FacultyScope {
    pub fn admits(self, faculty: FacultyId) -> bool {
        match self {
            FacultyScope::University => true,
            FacultyScope::Faculty(own) => own == faculty,
        }
    }
}

/// Capability value derived once from a profile and handed to every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Reviewer {
    pub user_id: UserId,
    pub stage: ReviewStage,
    pub scope: FacultyScope,
}

impl Reviewer {
    pub fn from_profile(profile: &Profile) -> Result<Self, WorkflowError> {
        let stage = match profile.role {
            Role::Hod => ReviewStage::Hod,
            Role::Dean => ReviewStage::Dean,
            Role::Registrar => ReviewStage::Registrar,
            other => {
                return Err(WorkflowError::NotAuthorized(format!(
                    "{} accounts cannot review transfer applications",
                    other.label()
                )))
            }
        };

        let scope = match (stage, profile.faculty) {
            (ReviewStage::Registrar, _) => FacultyScope::University,
            (ReviewStage::Dean, None) => {
                return Err(WorkflowError::NotAuthorized(
                    "dean profile has no faculty assigned".to_string(),
                ))
            }
            (_, Some(faculty)) => FacultyScope::Faculty(faculty),
            (_, None) => FacultyScope::University,
        };

        Ok(Self {
            user_id: profile.user_id,
            stage,
            scope,
        })
    }

    pub fn is_university_wide(&self) -> bool {
        self.scope == FacultyScope::University
    }

    /// Whether the application falls inside this reviewer's faculty authority.
    pub fn covers(&self, scope: &ApplicationScope) -> bool {
        match self.stage {
            ReviewStage::Hod => self.scope.admits(scope.source_faculty),
            ReviewStage::Dean => match self.scope {
                FacultyScope::Faculty(own) => own == scope.target_faculty,
                FacultyScope::University => false,
            },
            ReviewStage::Registrar => true,
        }
    }

    /// Pending-queue membership: right status for this stage and inside the reviewer's scope.
    pub fn queues(&self, status: TransferStatus, scope: &ApplicationScope) -> bool {
        status == self.stage.awaiting() && self.covers(scope)
    }
}

/// Faculty placement of an application, resolved from its source and target programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplicationScope {
    pub source_faculty: FacultyId,
    pub target_faculty: FacultyId,
    pub requested_program: ProgramId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewAction {
    Approve {
        comment: Option<String>,
        new_admission_number: Option<String>,
    },
    Reject {
        reason: String,
    },
}

impl ReviewAction {
    pub fn approve(comment: impl Into<String>) -> Self {
        ReviewAction::Approve {
            comment: Some(comment.into()),
            new_admission_number: None,
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        ReviewAction::Reject {
            reason: reason.into(),
        }
    }

    pub fn issue_admission(number: impl Into<String>, comment: Option<String>) -> Self {
        ReviewAction::Approve {
            comment,
            new_admission_number: Some(number.into()),
        }
    }
}

/// Who receives a planned notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "faculty")]
pub enum Recipient {
    Student,
    UniversityHod,
    Hod(FacultyId),
    Dean(FacultyId),
    Registrar,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "template")]
pub enum NotificationTemplate {
    ApplicationSubmitted,
    HodApproved,
    HodRejected { reason: String },
    AwaitingDean,
    DeanApproved,
    DeanRejected { reason: String },
    AwaitingRegistrar,
    TransferCompleted { admission_number: String },
    RegistrarRejected { reason: String },
    TransferArrivalForHod { admission_number: String },
    TransferArrivalForDean,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedNotification {
    pub recipient: Recipient,
    pub template: NotificationTemplate,
}

impl PlannedNotification {
    pub(crate) fn new(recipient: Recipient, template: NotificationTemplate) -> Self {
        Self {
            recipient,
            template,
        }
    }
}

/// Student record rewrite that accompanies a completed transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentReassignment {
    pub program: ProgramId,
    pub admission_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub stage: ReviewStage,
    pub from: TransferStatus,
    pub to: TransferStatus,
    pub comment: Option<String>,
    pub reassignment: Option<StudentReassignment>,
    pub notifications: Vec<PlannedNotification>,
}

impl Transition {
    /// Write the outcome onto the application record.
    pub fn apply(&self, application: &mut TransferApplication, at: DateTime<Utc>) {
        application.status = self.to;
        application.updated_at = at;

        let slot = match self.stage {
            ReviewStage::Hod => &mut application.hod_comment,
            ReviewStage::Dean => &mut application.dean_comment,
            ReviewStage::Registrar => &mut application.registrar_comment,
        };
        *slot = self.comment.clone();

        if let Some(reassignment) = &self.reassignment {
            application.new_admission_number = Some(reassignment.admission_number.clone());
        }
    }
}

/// Errors produced by the review state machine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    #[error("not authorized: {0}")]
    NotAuthorized(String),
    #[error("application is {actual}; {stage} review requires {expected}")]
    InvalidState {
        stage: ReviewStage,
        expected: TransferStatus,
        actual: TransferStatus,
    },
    #[error("{0}")]
    Validation(String),
}

/// Compute the next state for `action` taken by `reviewer` on an application in `status`.
///
/// Checks run in a fixed order: faculty scope, precondition status, then the action's input.
pub fn transition(
    status: TransferStatus,
    action: &ReviewAction,
    reviewer: &Reviewer,
    scope: &ApplicationScope,
) -> Result<Transition, WorkflowError> {
    let stage = reviewer.stage;

    if !reviewer.covers(scope) {
        return Err(WorkflowError::NotAuthorized(match stage {
            ReviewStage::Hod => {
                "application's current program is outside your faculty".to_string()
            }
            _ => "you can only review applications for your faculty".to_string(),
        }));
    }

    let expected = stage.awaiting();
    if status != expected {
        return Err(WorkflowError::InvalidState {
            stage,
            expected,
            actual: status,
        });
    }

    match action {
        ReviewAction::Approve {
            comment,
            new_admission_number,
        } => approve(
            stage,
            status,
            scope,
            normalize(comment.as_deref()),
            new_admission_number.as_deref(),
        ),
        ReviewAction::Reject { reason } => {
            let reason = normalize(Some(reason)).ok_or_else(|| {
                WorkflowError::Validation("a rejection reason is required".to_string())
            })?;
            Ok(reject(stage, status, reason))
        }
    }
}

fn approve(
    stage: ReviewStage,
    from: TransferStatus,
    scope: &ApplicationScope,
    comment: Option<String>,
    new_admission_number: Option<&str>,
) -> Result<Transition, WorkflowError> {
    let admission_number = normalize(new_admission_number);

    let (reassignment, notifications) = match stage {
        ReviewStage::Hod | ReviewStage::Dean if admission_number.is_some() => {
            return Err(WorkflowError::Validation(
                "only the registrar issues admission numbers".to_string(),
            ))
        }
        ReviewStage::Hod => (
            None,
            vec![
                PlannedNotification::new(Recipient::Student, NotificationTemplate::HodApproved),
                PlannedNotification::new(
                    Recipient::Dean(scope.target_faculty),
                    NotificationTemplate::AwaitingDean,
                ),
            ],
        ),
        ReviewStage::Dean => (
            None,
            vec![
                PlannedNotification::new(Recipient::Student, NotificationTemplate::DeanApproved),
                PlannedNotification::new(
                    Recipient::Registrar,
                    NotificationTemplate::AwaitingRegistrar,
                ),
            ],
        ),
        ReviewStage::Registrar => {
            let admission_number = admission_number.ok_or_else(|| {
                WorkflowError::Validation(
                    "a new admission number is required to complete the transfer".to_string(),
                )
            })?;
            let notifications = vec![
                PlannedNotification::new(
                    Recipient::Student,
                    NotificationTemplate::TransferCompleted {
                        admission_number: admission_number.clone(),
                    },
                ),
                PlannedNotification::new(
                    Recipient::Hod(scope.target_faculty),
                    NotificationTemplate::TransferArrivalForHod {
                        admission_number: admission_number.clone(),
                    },
                ),
                PlannedNotification::new(
                    Recipient::Dean(scope.target_faculty),
                    NotificationTemplate::TransferArrivalForDean,
                ),
            ];
            (
                Some(StudentReassignment {
                    program: scope.requested_program,
                    admission_number,
                }),
                notifications,
            )
        }
    };

    Ok(Transition {
        stage,
        from,
        to: stage.approved(),
        comment,
        reassignment,
        notifications,
    })
}

fn reject(stage: ReviewStage, from: TransferStatus, reason: String) -> Transition {
    let template = match stage {
        ReviewStage::Hod => NotificationTemplate::HodRejected {
            reason: reason.clone(),
        },
        ReviewStage::Dean => NotificationTemplate::DeanRejected {
            reason: reason.clone(),
        },
        ReviewStage::Registrar => NotificationTemplate::RegistrarRejected {
            reason: reason.clone(),
        },
    };

    Transition {
        stage,
        from,
        to: stage.rejected(),
        comment: Some(reason),
        reassignment: None,
        notifications: vec![PlannedNotification::new(Recipient::Student, template)],
    }
}

fn normalize(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
