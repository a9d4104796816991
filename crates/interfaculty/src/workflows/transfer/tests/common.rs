use std::sync::Arc;

use axum::response::Response;
use serde_json::Value;

use crate::workflows::transfer::domain::{
    ApplicationId, Faculty, FacultyId, Notification, NotificationId, Profile, Program, ProgramId,
    Role, Semester, Student, StudentId, StudentRegistration, TransferApplication, TransferStatus,
    TransferSubmission, UserAccount, UserId,
};
use crate::workflows::transfer::memory::{
    InMemoryApplicationRepository, InMemoryDirectory, InMemoryNotifications,
};
use crate::workflows::transfer::reports::ApplicationView;
use crate::workflows::transfer::repository::{
    ApplicationRepository, Directory, NotificationError, NotificationPublisher, RepositoryError,
};
use crate::workflows::transfer::TransferService;

pub(super) type MemoryService =
    TransferService<InMemoryApplicationRepository, InMemoryDirectory, InMemoryNotifications>;

/// Two faculties with two programs each, one reviewer per seat and an admin.
pub(super) struct Campus {
    pub(super) service: Arc<MemoryService>,
    pub(super) repository: Arc<InMemoryApplicationRepository>,
    pub(super) directory: Arc<InMemoryDirectory>,
    pub(super) notifications: Arc<InMemoryNotifications>,
    pub(super) scit: Faculty,
    pub(super) sobe: Faculty,
    pub(super) computer_science: Program,
    pub(super) information_technology: Program,
    pub(super) finance: Program,
    pub(super) accounting: Program,
    pub(super) university_hod: Option<UserId>,
    pub(super) scit_hod: UserId,
    pub(super) sobe_hod: UserId,
    pub(super) scit_dean: UserId,
    pub(super) sobe_dean: UserId,
    pub(super) registrar: UserId,
    pub(super) admin: UserId,
}

pub(super) fn campus() -> Campus {
    campus_with(true)
}

pub(super) fn campus_without_university_hod() -> Campus {
    campus_with(false)
}

fn campus_with(university_hod: bool) -> Campus {
    let directory = InMemoryDirectory::default();
    let scit = directory
        .add_faculty("SCIT", "School of Computing & Information Technology")
        .expect("faculty added");
    let sobe = directory
        .add_faculty("SOBE", "School of Business & Economics")
        .expect("faculty added");
    let computer_science = directory
        .add_program("BSc Computer Science", scit.id)
        .expect("program added");
    let information_technology = directory
        .add_program("BSc Information Technology", scit.id)
        .expect("program added");
    let finance = directory
        .add_program("BCom Finance", sobe.id)
        .expect("program added");
    let accounting = directory
        .add_program("BCom Accounting", sobe.id)
        .expect("program added");

    let university_hod =
        university_hod.then(|| staff(&directory, "hod.university", Role::Hod, None));
    let scit_hod = staff(&directory, "hod.scit", Role::Hod, Some(scit.id));
    let sobe_hod = staff(&directory, "hod.sobe", Role::Hod, Some(sobe.id));
    let scit_dean = staff(&directory, "dean.scit", Role::Dean, Some(scit.id));
    let sobe_dean = staff(&directory, "dean.sobe", Role::Dean, Some(sobe.id));
    let registrar = staff(&directory, "registrar", Role::Registrar, None);
    let admin = staff(&directory, "admin", Role::Admin, None);

    let repository = Arc::new(InMemoryApplicationRepository::default());
    let directory = Arc::new(directory);
    let notifications = Arc::new(InMemoryNotifications::default());
    let service = Arc::new(TransferService::new(
        repository.clone(),
        directory.clone(),
        notifications.clone(),
    ));

    Campus {
        service,
        repository,
        directory,
        notifications,
        scit,
        sobe,
        computer_science,
        information_technology,
        finance,
        accounting,
        university_hod,
        scit_hod,
        sobe_hod,
        scit_dean,
        sobe_dean,
        registrar,
        admin,
    }
}

pub(super) fn staff(
    directory: &InMemoryDirectory,
    username: &str,
    role: Role,
    faculty: Option<FacultyId>,
) -> UserId {
    let account = directory
        .insert_account(UserAccount {
            id: UserId(0),
            username: username.to_string(),
            first_name: username.to_string(),
            last_name: "Staff".to_string(),
            email: format!("{username}@example.edu"),
        })
        .expect("account inserted");
    directory
        .insert_profile(Profile {
            user_id: account.id,
            role,
            faculty,
            phone: None,
            department: None,
        })
        .expect("profile inserted");
    account.id
}

impl Campus {
    pub(super) fn hod(&self) -> UserId {
        self.university_hod.expect("campus has a university HOD")
    }

    pub(super) fn registration(
        &self,
        username: &str,
        admission_number: &str,
        program: &Program,
    ) -> StudentRegistration {
        StudentRegistration {
            username: username.to_string(),
            password: "s3cret-pass".to_string(),
            confirm_password: "s3cret-pass".to_string(),
            first_name: "Achieng".to_string(),
            last_name: username.to_string(),
            email: format!("{username}@students.example.edu"),
            admission_number: admission_number.to_string(),
            current_program: program.id,
            current_year: 2,
            phone: "0712345678".to_string(),
        }
    }

    pub(super) fn enrol(
        &self,
        username: &str,
        admission_number: &str,
        program: &Program,
    ) -> Student {
        self.service
            .register_student(self.registration(username, admission_number, program))
            .expect("student registers")
    }

    /// A computer science student, the usual applicant in these tests.
    pub(super) fn cs_student(&self) -> Student {
        self.enrol("otieno", "SCT/0013/2023", &self.computer_science)
    }

    pub(super) fn submission(&self, program: &Program) -> TransferSubmission {
        TransferSubmission {
            requested_program: program.id,
            reason: "Career change".to_string(),
            academic_year: "2025/2026".to_string(),
            semester: Semester::First,
            address: None,
            kcse: None,
        }
    }

    pub(super) fn apply(&self, student: &Student, program: &Program) -> ApplicationView {
        self.service
            .submit(student.user_id, self.submission(program))
            .expect("submission accepted")
    }

    pub(super) fn stored(&self, id: ApplicationId) -> TransferApplication {
        self.repository
            .fetch(id)
            .expect("fetch succeeds")
            .expect("application present")
    }

    pub(super) fn student(&self, id: StudentId) -> Student {
        self.directory
            .student(id)
            .expect("lookup succeeds")
            .expect("student present")
    }

    pub(super) fn inbox(&self, user: UserId) -> Vec<Notification> {
        self.notifications.for_user(user)
    }

    /// Service sharing this campus's stores but reading people through `directory`.
    pub(super) fn service_with(
        &self,
        directory: FaultyDirectory,
    ) -> TransferService<InMemoryApplicationRepository, FaultyDirectory, InMemoryNotifications>
    {
        TransferService::new(
            self.repository.clone(),
            Arc::new(directory),
            self.notifications.clone(),
        )
    }

    /// Drive an application to `dean_approved`.
    pub(super) fn through_dean(&self, id: ApplicationId) {
        use crate::workflows::transfer::machine::ReviewAction;

        self.service
            .hod_review(self.hod(), id, ReviewAction::approve("ok"))
            .expect("hod approves");
        let view = self
            .service
            .dean_review(self.sobe_dean, id, ReviewAction::approve("fits"))
            .expect("dean approves");
        assert_eq!(view.status, TransferStatus::DeanApproved);
    }
}

/// Directory over the campus stores that can lose races it would normally win.
pub(super) struct FaultyDirectory {
    pub(super) inner: Arc<InMemoryDirectory>,
    /// Student updates fail as if another student took the admission number first.
    pub(super) reject_student_updates: bool,
    /// Admission number lookups miss, so only the store's own check catches duplicates.
    pub(super) stale_admission_lookups: bool,
}

impl FaultyDirectory {
    pub(super) fn over(inner: Arc<InMemoryDirectory>) -> Self {
        Self {
            inner,
            reject_student_updates: false,
            stale_admission_lookups: false,
        }
    }
}

impl Directory for FaultyDirectory {
    fn faculty(&self, id: FacultyId) -> Result<Option<Faculty>, RepositoryError> {
        self.inner.faculty(id)
    }

    fn faculty_by_code(&self, code: &str) -> Result<Option<Faculty>, RepositoryError> {
        self.inner.faculty_by_code(code)
    }

    fn faculties(&self) -> Result<Vec<Faculty>, RepositoryError> {
        self.inner.faculties()
    }

    fn program(&self, id: ProgramId) -> Result<Option<Program>, RepositoryError> {
        self.inner.program(id)
    }

    fn programs(&self) -> Result<Vec<Program>, RepositoryError> {
        self.inner.programs()
    }

    fn account(&self, id: UserId) -> Result<Option<UserAccount>, RepositoryError> {
        self.inner.account(id)
    }

    fn account_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserAccount>, RepositoryError> {
        self.inner.account_by_username(username)
    }

    fn insert_account(&self, account: UserAccount) -> Result<UserAccount, RepositoryError> {
        self.inner.insert_account(account)
    }

    fn profile(&self, user: UserId) -> Result<Option<Profile>, RepositoryError> {
        self.inner.profile(user)
    }

    fn profiles(&self) -> Result<Vec<Profile>, RepositoryError> {
        self.inner.profiles()
    }

    fn insert_profile(&self, profile: Profile) -> Result<Profile, RepositoryError> {
        self.inner.insert_profile(profile)
    }

    fn student(&self, id: StudentId) -> Result<Option<Student>, RepositoryError> {
        self.inner.student(id)
    }

    fn student_for_user(&self, user: UserId) -> Result<Option<Student>, RepositoryError> {
        self.inner.student_for_user(user)
    }

    fn student_by_admission(
        &self,
        admission_number: &str,
    ) -> Result<Option<Student>, RepositoryError> {
        if self.stale_admission_lookups {
            return Ok(None);
        }
        self.inner.student_by_admission(admission_number)
    }

    fn insert_student(&self, student: Student) -> Result<Student, RepositoryError> {
        self.inner.insert_student(student)
    }

    fn update_student(&self, student: Student) -> Result<(), RepositoryError> {
        if self.reject_student_updates {
            return Err(RepositoryError::Conflict(format!(
                "admission number {}",
                student.admission_number
            )));
        }
        self.inner.update_student(student)
    }

    fn enrol_student(
        &self,
        account: UserAccount,
        student: Student,
        profile: Profile,
    ) -> Result<Student, RepositoryError> {
        self.inner.enrol_student(account, student, profile)
    }
}

pub(super) struct UnavailableRepository;

impl ApplicationRepository for UnavailableRepository {
    fn insert(
        &self,
        _application: TransferApplication,
    ) -> Result<TransferApplication, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: ApplicationId) -> Result<Option<TransferApplication>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn compare_and_swap(
        &self,
        _expected: TransferStatus,
        _application: TransferApplication,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list(&self) -> Result<Vec<TransferApplication>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Publisher whose transport is down; reads succeed with nothing.
#[derive(Default)]
pub(super) struct OfflineNotifications;

impl NotificationPublisher for OfflineNotifications {
    fn publish(&self, _notification: Notification) -> Result<Notification, NotificationError> {
        Err(NotificationError::Transport("smtp relay offline".to_string()))
    }

    fn unread(&self, _user: UserId) -> Result<Vec<Notification>, NotificationError> {
        Ok(Vec::new())
    }

    fn mark_read(&self, _ids: &[NotificationId]) -> Result<(), NotificationError> {
        Ok(())
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
