use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use super::first_str;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Resident,
    Staff,
}

impl Role {
    /// Backend role strings. Officials and admins use the staff side.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "resident" | "user" => Some(Role::Resident),
            "staff" | "admin" | "official" | "secretary" | "captain" => Some(Role::Staff),
            _ => None,
        }
    }

    pub fn dashboard_path(&self) -> &'static str {
        match self {
            Role::Resident => "/portal/dashboard",
            Role::Staff => "/portal/staff",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Role::Resident => "Resident",
            Role::Staff => "Staff",
        }
    }
}

/// Who the backend says the current session belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub id: String,
    pub role: Role,
    pub display_name: String,
    pub email: Option<String>,
    /// Resident ID or employee ID, the value profile QR codes carry.
    pub lookup_id: Option<String>,
}

impl Identity {
    /// Reads `GET /auth/me`. The user may sit under `user`, `data` or at
    /// the top level. Name precedence: `name`, `fullName`, then
    /// `firstName lastName`, then the email.
    pub fn from_value(value: &Value) -> Option<Self> {
        let user = ["user", "data"]
            .iter()
            .find_map(|key| value.get(*key).filter(|v| v.is_object()))
            .unwrap_or(value);

        let id = first_str(user, &["id", "_id", "userId"])?;
        let role = first_str(user, &["role", "userType", "type"]).and_then(|r| Role::parse(&r))?;
        let email = first_str(user, &["email"]);
        let display_name = first_str(user, &["name", "fullName"])
            .or_else(|| {
                let first = first_str(user, &["firstName"]).unwrap_or_default();
                let last = first_str(user, &["lastName"]).unwrap_or_default();
                let joined = format!("{} {}", first, last).trim().to_string();
                (!joined.is_empty()).then_some(joined)
            })
            .or_else(|| email.clone())
            .unwrap_or_else(|| id.clone());

        Some(Self {
            id,
            role,
            display_name,
            email,
            lookup_id: first_str(user, &["residentId", "employeeId", "lookupId"]),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Profile {
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub birth_date: String,
    pub house_number: String,
    pub street: String,
    pub purok: String,
    pub barangay: String,
    pub city: String,
    pub lookup_id: Option<String>,
}

impl Profile {
    pub fn from_value(value: &Value) -> Self {
        let user = ["user", "profile", "data"]
            .iter()
            .find_map(|key| value.get(*key).filter(|v| v.is_object()))
            .unwrap_or(value);
        let address = user.get("address").filter(|v| v.is_object()).unwrap_or(user);
        let text = |source: &Value, keys: &[&str]| first_str(source, keys).unwrap_or_default();

        Self {
            first_name: text(user, &["firstName", "first_name"]),
            middle_name: text(user, &["middleName", "middle_name"]),
            last_name: text(user, &["lastName", "last_name"]),
            email: text(user, &["email"]),
            phone: text(user, &["phone", "contactNumber", "mobile"]),
            birth_date: text(user, &["birthDate", "birthdate", "dateOfBirth"]),
            house_number: text(address, &["houseNumber", "houseNo"]),
            street: text(address, &["street"]),
            purok: text(address, &["purok", "zone"]),
            barangay: text(address, &["barangay"]),
            city: text(address, &["city", "municipality"]),
            lookup_id: first_str(user, &["residentId", "employeeId", "lookupId"]),
        }
    }

    pub fn full_name(&self) -> String {
        [&self.first_name, &self.middle_name, &self.last_name]
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn address_line(&self) -> String {
        [&self.house_number, &self.street, &self.purok, &self.barangay, &self.city]
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Body of `PATCH /users/me`.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[serde(default)]
    pub middle_name: String,
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 7, max = 15, message = "Enter a valid phone number"))]
    pub phone: String,
    #[serde(default)]
    pub house_number: String,
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub purok: String,
}

/// Row from `GET /residents/lookup`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResidentSummary {
    pub id: String,
    pub resident_id: Option<String>,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl ResidentSummary {
    pub fn from_value(value: &Value) -> Option<Self> {
        let id = first_str(value, &["id", "_id"])?;
        let profile = Profile::from_value(value);
        let name = first_str(value, &["name", "fullName"]).unwrap_or_else(|| profile.full_name());
        let address = Some(profile.address_line()).filter(|a| !a.is_empty());

        Some(Self {
            id,
            resident_id: profile.lookup_id,
            name,
            email: first_str(value, &["email"]),
            phone: first_str(value, &["phone", "contactNumber", "mobile"]),
            address,
        })
    }
}

/// Counters from `GET /stats/dashboard*`. Missing keys read as zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardStats {
    pub total: i64,
    pub pending: i64,
    pub active: i64,
    pub ready: i64,
    pub resolved: i64,
    pub completed: i64,
    pub cancelled: i64,
    pub residents: i64,
    pub announcements: i64,
}

impl DashboardStats {
    pub fn from_value(value: &Value) -> Self {
        let source = ["stats", "data"]
            .iter()
            .find_map(|key| value.get(*key).filter(|v| v.is_object()))
            .unwrap_or(value);
        let count = |keys: &[&str]| super::first_f64(source, keys).map(|n| n as i64).unwrap_or(0);

        Self {
            total: count(&["total", "totalSubmissions"]),
            pending: count(&["pending"]),
            active: count(&["active", "inProgress"]),
            ready: count(&["ready"]),
            resolved: count(&["resolved"]),
            completed: count(&["completed"]),
            cancelled: count(&["cancelled"]),
            residents: count(&["residents", "totalResidents"]),
            announcements: count(&["announcements", "totalAnnouncements"]),
        }
    }

    pub fn open(&self) -> i64 {
        self.pending + self.active + self.ready
    }
}
