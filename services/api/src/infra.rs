use interfaculty::workflows::transfer::{
    Directory, Faculty, FacultyId, InMemoryApplicationRepository, InMemoryDirectory,
    InMemoryNotifications, Profile, Program, RepositoryError, Role, TransferService, UserAccount,
    UserId,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type MemoryTransferService =
    TransferService<InMemoryApplicationRepository, InMemoryDirectory, InMemoryNotifications>;

/// Process-local stores backing the service until a database adapter exists.
#[derive(Default, Clone)]
pub(crate) struct Stores {
    pub(crate) repository: Arc<InMemoryApplicationRepository>,
    pub(crate) directory: Arc<InMemoryDirectory>,
    pub(crate) notifications: Arc<InMemoryNotifications>,
}

impl Stores {
    pub(crate) fn service(&self) -> Arc<MemoryTransferService> {
        Arc::new(TransferService::new(
            self.repository.clone(),
            self.directory.clone(),
            self.notifications.clone(),
        ))
    }
}

const FACULTIES: [(&str, &str, [&str; 2]); 5] = [
    (
        "SESS",
        "School of Education & Social Sciences",
        ["Bachelor of Education (Arts)", "BA Social Work"],
    ),
    (
        "SOBE",
        "School of Business & Economics",
        ["Bachelor of Commerce", "BSc Economics"],
    ),
    (
        "SCIT",
        "School of Computing & Information Technology",
        ["BSc Computer Science", "BSc Information Technology"],
    ),
    ("SOS", "School of Science", ["BSc Mathematics", "BSc Chemistry"]),
    (
        "SOHES",
        "School of Health Sciences",
        ["BSc Nursing", "BSc Public Health"],
    ),
];

/// What the seed pass created, for callers that need to act as a reviewer.
#[derive(Debug, Clone)]
pub(crate) struct SeededDirectory {
    pub(crate) faculties: Vec<Faculty>,
    pub(crate) programs: Vec<Program>,
    pub(crate) university_hod: UserId,
    pub(crate) registrar: UserId,
    pub(crate) admin: UserId,
}

impl SeededDirectory {
    pub(crate) fn faculty(&self, code: &str) -> Option<&Faculty> {
        self.faculties.iter().find(|faculty| faculty.code == code)
    }

    pub(crate) fn program(&self, name: &str) -> Option<&Program> {
        self.programs.iter().find(|program| program.name == name)
    }
}

/// Load the five faculties, two programs each, and one HOD and Dean per faculty plus the
/// university-wide HOD, the registrar and an admin.
pub(crate) fn seed_directory(
    directory: &InMemoryDirectory,
) -> Result<SeededDirectory, RepositoryError> {
    let mut faculties = Vec::new();
    let mut programs = Vec::new();

    for (code, name, program_names) in FACULTIES {
        let faculty = directory.add_faculty(code, name)?;
        for program in program_names {
            programs.push(directory.add_program(program, faculty.id)?);
        }

        let slug = code.to_ascii_lowercase();
        staff_account(
            directory,
            &format!("hod.{slug}"),
            Role::Hod,
            Some(faculty.id),
        )?;
        staff_account(
            directory,
            &format!("dean.{slug}"),
            Role::Dean,
            Some(faculty.id),
        )?;
        faculties.push(faculty);
    }

    Ok(SeededDirectory {
        faculties,
        programs,
        university_hod: staff_account(directory, "hod", Role::Hod, None)?,
        registrar: staff_account(directory, "registrar", Role::Registrar, None)?,
        admin: staff_account(directory, "admin", Role::Admin, None)?,
    })
}

fn staff_account(
    directory: &InMemoryDirectory,
    username: &str,
    role: Role,
    faculty: Option<FacultyId>,
) -> Result<UserId, RepositoryError> {
    let account = directory.insert_account(UserAccount {
        id: UserId(0),
        username: username.to_string(),
        first_name: String::new(),
        last_name: String::new(),
        email: format!("{username}@university.example.edu"),
    })?;
    directory.insert_profile(Profile {
        user_id: account.id,
        role,
        faculty,
        phone: None,
        department: Some(role.label().to_string()),
    })?;
    Ok(account.id)
}
