use super::domain::{
    ApplicationId, Faculty, FacultyId, Notification, NotificationId, Profile, Program, ProgramId,
    Role, Student, StudentId, TransferApplication, TransferStatus, UserAccount, UserId,
};

/// Storage abstraction for transfer applications.
///
/// Implementations assign `id` on insert; the value carried by the argument is ignored.
pub trait ApplicationRepository: Send + Sync {
    fn insert(
        &self,
        application: TransferApplication,
    ) -> Result<TransferApplication, RepositoryError>;

    fn fetch(&self, id: ApplicationId) -> Result<Option<TransferApplication>, RepositoryError>;

    /// Replace the stored record only while it still carries `expected`.
    ///
    /// The status check and the write must be a single atomic step so that two reviewers
    /// acting on the same application cannot both succeed.
    fn compare_and_swap(
        &self,
        expected: TransferStatus,
        application: TransferApplication,
    ) -> Result<(), RepositoryError>;

    fn list(&self) -> Result<Vec<TransferApplication>, RepositoryError>;

    fn for_student(&self, student: StudentId) -> Result<Vec<TransferApplication>, RepositoryError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|application| application.student == student)
            .collect())
    }
}

/// Reference data plus the people who act on applications.
pub trait Directory: Send + Sync {
    fn faculty(&self, id: FacultyId) -> Result<Option<Faculty>, RepositoryError>;
    fn faculty_by_code(&self, code: &str) -> Result<Option<Faculty>, RepositoryError>;
    fn faculties(&self) -> Result<Vec<Faculty>, RepositoryError>;

    fn program(&self, id: ProgramId) -> Result<Option<Program>, RepositoryError>;
    fn programs(&self) -> Result<Vec<Program>, RepositoryError>;

    fn account(&self, id: UserId) -> Result<Option<UserAccount>, RepositoryError>;
    fn account_by_username(&self, username: &str)
        -> Result<Option<UserAccount>, RepositoryError>;
    fn insert_account(&self, account: UserAccount) -> Result<UserAccount, RepositoryError>;

    fn profile(&self, user: UserId) -> Result<Option<Profile>, RepositoryError>;
    fn profiles(&self) -> Result<Vec<Profile>, RepositoryError>;
    fn insert_profile(&self, profile: Profile) -> Result<Profile, RepositoryError>;

    fn student(&self, id: StudentId) -> Result<Option<Student>, RepositoryError>;
    fn student_for_user(&self, user: UserId) -> Result<Option<Student>, RepositoryError>;
    fn student_by_admission(&self, admission_number: &str)
        -> Result<Option<Student>, RepositoryError>;
    fn insert_student(&self, student: Student) -> Result<Student, RepositoryError>;
    fn update_student(&self, student: Student) -> Result<(), RepositoryError>;

    /// Store a self-registered student's account, student record and profile as one unit.
    ///
    /// Either all three are written or none is. The store assigns the account and student ids
    /// and links `student.user_id` and `profile.user_id` to the new account.
    fn enrol_student(
        &self,
        account: UserAccount,
        student: Student,
        profile: Profile,
    ) -> Result<Student, RepositoryError>;

    /// First profile holding `role` with exactly the given faculty scope.
    fn find_profile(
        &self,
        role: Role,
        faculty: Option<FacultyId>,
    ) -> Result<Option<Profile>, RepositoryError> {
        Ok(self
            .profiles()?
            .into_iter()
            .find(|profile| profile.role == role && profile.faculty == faculty))
    }

    /// First registrar on record; the registrar is unscoped.
    fn registrar(&self) -> Result<Option<Profile>, RepositoryError> {
        Ok(self
            .profiles()?
            .into_iter()
            .find(|profile| profile.role == Role::Registrar))
    }
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists: {0}")]
    Conflict(String),
    #[error("record not found")]
    NotFound,
    #[error("application status changed to {actual} (expected {expected})")]
    StatusChanged {
        expected: TransferStatus,
        actual: TransferStatus,
    },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound notification hook (in-app inbox, e-mail adapter, ...).
pub trait NotificationPublisher: Send + Sync {
    /// Deliver a notification; the publisher assigns `id`.
    fn publish(&self, notification: Notification) -> Result<Notification, NotificationError>;
    fn unread(&self, user: UserId) -> Result<Vec<Notification>, NotificationError>;
    fn mark_read(&self, ids: &[NotificationId]) -> Result<(), NotificationError>;
}

/// Notification dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
