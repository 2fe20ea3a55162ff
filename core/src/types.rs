//! Shared vocabulary used by interpreters, sessions and pricing.

use uuid::Uuid;

pub type InterpreterId = Uuid;
pub type SessionId = Uuid;
pub type UserId = Uuid;

labelled_enum! {
    /// How a session is delivered.
    pub enum SessionType {
        Video => "VIDEO",
        Phone => "PHONE",
        InPerson => "IN_PERSON",
    }
}

labelled_enum! {
    /// Subject-matter field of a session.
    pub enum Specialization {
        General => "GENERAL",
        Medical => "MEDICAL",
        Legal => "LEGAL",
        Technical => "TECHNICAL",
        Business => "BUSINESS",
        Financial => "FINANCIAL",
        Conference => "CONFERENCE",
        Community => "COMMUNITY",
        Educational => "EDUCATIONAL",
    }
}

labelled_enum! {
    /// Turnaround category. Drives price and the cancellation notice window.
    pub enum UrgencyLevel {
        Standard => "STANDARD",
        Rush => "RUSH",
        Urgent => "URGENT",
        Emergency => "EMERGENCY",
    }
}

labelled_enum! {
    /// Content category used by per-word/per-hour quotes.
    pub enum ContentType {
        General => "GENERAL",
        Document => "DOCUMENT",
        Technical => "TECHNICAL",
        Legal => "LEGAL",
        Medical => "MEDICAL",
        Financial => "FINANCIAL",
        Marketing => "MARKETING",
    }
}

labelled_enum! {
    pub enum Role {
        Client => "CLIENT",
        Interpreter => "INTERPRETER",
        Admin => "ADMIN",
    }
}

labelled_enum! {
    /// Which side of a session submits a rating.
    pub enum RaterRole {
        Client => "CLIENT",
        Interpreter => "INTERPRETER",
    }
}

impl Default for UrgencyLevel {
    fn default() -> Self {
        UrgencyLevel::Standard
    }
}

/// Authenticated caller identity, as handed over by the auth layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn client(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Client,
        }
    }

    pub fn interpreter(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Interpreter,
        }
    }

    pub fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Lower-cases and trims a language code so `" EN"` and `"en"` compare equal.
pub fn normalize_language(code: &str) -> String {
    code.trim().to_ascii_lowercase()
}
