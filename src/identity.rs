//! Who is acting: the teacher, or an observer signed in to one class.
//!
//! Teacher credentials are resolved through a chain:
//!
//! 1. `--teacher-id` / `--password` flags
//! 2. `EPS_TEACHER_ID` / `EPS_TEACHER_PASSWORD` env vars
//!
//! and checked against the configured pair. Observers present a class code
//! and get a synthetic identity scoped to that class.

use std::env;

use uuid::Uuid;

use crate::config::Config;
use crate::model::ClassData;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Teacher,
    Observer {
        id: String,
        name: String,
        class_id: Uuid,
    },
}

impl Identity {
    pub fn display_name(&self) -> &str {
        match self {
            Self::Teacher => "Enseignant",
            Self::Observer { name, .. } => name,
        }
    }

    /// Stable identifier for logs: `teacher`, or the observer's synthetic id.
    pub fn id(&self) -> &str {
        match self {
            Self::Teacher => "teacher",
            Self::Observer { id, .. } => id,
        }
    }

    /// Observers may only record in the class they signed in to.
    pub fn may_record(&self, class_id: Uuid) -> bool {
        match self {
            Self::Teacher => true,
            Self::Observer {
                class_id: signed_in,
                ..
            } => *signed_in == class_id,
        }
    }

    pub fn may_read_stats(&self) -> bool {
        matches!(self, Self::Teacher)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error(
        "teacher credentials required: pass --teacher-id and --password, \
         or set EPS_TEACHER_ID and EPS_TEACHER_PASSWORD"
    )]
    MissingCredentials,

    #[error("invalid teacher id or password")]
    BadCredentials,

    #[error("invalid code for class {0}")]
    BadClassCode(String),
}

/// Teacher credentials as presented by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub id: String,
    pub password: String,
}

/// Resolve presented credentials: explicit flags first, then env vars.
pub fn resolve_teacher_credentials(
    id: Option<&str>,
    password: Option<&str>,
) -> Result<Credentials, AuthError> {
    let id = pick(id, "EPS_TEACHER_ID");
    let password = pick(password, "EPS_TEACHER_PASSWORD");
    match (id, password) {
        (Some(id), Some(password)) => Ok(Credentials { id, password }),
        _ => Err(AuthError::MissingCredentials),
    }
}

fn pick(explicit: Option<&str>, var: &str) -> Option<String> {
    if let Some(value) = explicit {
        return Some(value.to_string());
    }
    env::var(var).ok().filter(|v| !v.is_empty())
}

/// Checks presented teacher credentials against the configuration.
///
/// The id is compared after upper-casing both sides; the password exactly.
pub fn authenticate_teacher(config: &Config, credentials: &Credentials) -> Result<Identity, AuthError> {
    let id_matches = credentials.id.trim().to_uppercase() == config.teacher_id.to_uppercase();
    if id_matches && credentials.password == config.teacher_password {
        Ok(Identity::Teacher)
    } else {
        Err(AuthError::BadCredentials)
    }
}

/// Signs an observer in to `class` with its secret code (case-sensitive).
pub fn authenticate_observer(class: &ClassData, code: &str) -> Result<Identity, AuthError> {
    if code != class.code {
        return Err(AuthError::BadClassCode(class.name.clone()));
    }
    Ok(Identity::Observer {
        id: format!("observer-{}", class.id),
        name: format!("Observateur {}", class.name),
        class_id: class.id,
    })
}
