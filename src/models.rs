use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Roles ---

/// Role
///
/// The fixed set of coarse-grained permission groups. Each role has a stable identifier
/// that is seeded at startup; names are globally unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    #[default]
    User,
    Admin,
    Super,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::User, Role::Admin, Role::Super];

    pub fn id(self) -> Uuid {
        match self {
            Role::User => Uuid::from_u128(0x520edcd6_2a09_4ea7_92e0_5a25d63cffcb),
            Role::Admin => Uuid::from_u128(0x44b23886_c13a_49b4_9680_c0a6fddb3812),
            Role::Super => Uuid::from_u128(0xe479e0a4_6a9f_4a4a_928a_6074cbe4be82),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::Super => "super",
        }
    }

    pub fn from_name(name: &str) -> Option<Role> {
        Role::ALL.into_iter().find(|role| role.name() == name)
    }

    pub fn from_id(id: Uuid) -> Option<Role> {
        Role::ALL.into_iter().find(|role| role.id() == id)
    }
}

// --- Enumerated type tags ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub enum ProfessionalType {
    #[default]
    Physician,
    Nurse,
    Dentist,
    Physiotherapist,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub enum EstablishmentType {
    #[default]
    Clinic,
    Hospital,
    Laboratory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub enum ProcedureType {
    #[default]
    Consultation,
    Exam,
    Surgery,
    Therapy,
}

/// Text mapping for the enumerated tags, which are stored as TEXT columns.
macro_rules! text_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(self) -> &'static str {
                match self {
                    $($ty::$variant => $text,)+
                }
            }
        }

        impl std::str::FromStr for $ty {
            type Err = String;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($text => Ok($ty::$variant),)+
                    other => Err(format!("unknown {} '{}'", stringify!($ty), other)),
                }
            }
        }
    };
}

text_enum!(ProfessionalType {
    Physician => "Physician",
    Nurse => "Nurse",
    Dentist => "Dentist",
    Physiotherapist => "Physiotherapist",
});

text_enum!(EstablishmentType {
    Clinic => "Clinic",
    Hospital => "Hospital",
    Laboratory => "Laboratory",
});

text_enum!(ProcedureType {
    Consultation => "Consultation",
    Exam => "Exam",
    Surgery => "Surgery",
    Therapy => "Therapy",
});

// --- Core entities ---

/// Account
///
/// Any login-capable principal. The credential hash is owned by the credential service and
/// never leaves the crate. Professionals are ordinary accounts carrying a professional payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    /// Also the login name; `user_name` is kept identical to it.
    pub email: String,
    pub user_name: String,
    pub password_hash: String,
    pub role: Role,
    pub professional: Option<ProfessionalProfile>,
}

impl Account {
    pub fn new(id: Uuid, name: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        let email = email.into();
        Self {
            id,
            name: name.into(),
            user_name: email.clone(),
            email,
            password_hash: String::new(),
            role,
            professional: None,
        }
    }

    pub fn normalized_email(&self) -> String {
        normalize(&self.email)
    }

    pub fn normalized_user_name(&self) -> String {
        normalize(&self.user_name)
    }
}

/// Lookup key normalization for user names and emails (case-insensitive matching).
pub fn normalize(value: &str) -> String {
    value.trim().to_uppercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfessionalProfile {
    pub kind: ProfessionalType,
    pub specialty_id: Uuid,
}

/// Product
///
/// Immutable catalog data, seeded externally.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Product {
    pub id: Uuid,
    pub title: String,
    pub image: String,
    pub price: Decimal,
    pub review_score: Option<f64>,
}

/// Bookmark
///
/// Relationship between an account and a product; the composite (account, product) is the key.
#[derive(Debug, Clone, PartialEq)]
pub struct Bookmark {
    pub account_id: Uuid,
    pub product_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Specialty {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Address {
    pub id: Uuid,
    pub street: String,
    pub number: String,
    pub district: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
}

impl Address {
    /// The single-line form used by every read view.
    pub fn formatted(&self) -> String {
        format_address(&self.street, &self.number, &self.district, &self.city, &self.state)
    }
}

pub fn format_address(street: &str, number: &str, district: &str, city: &str, state: &str) -> String {
    format!("Street {street}, no. {number}. {district}, {city} - {state}")
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Establishment {
    pub id: Uuid,
    pub name: String,
    pub legal_name: String,
    pub kind: EstablishmentType,
    pub address_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Procedure {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub kind: ProcedureType,
}

/// ProcedureOffering
///
/// A scheduled instance of a procedure performed by a professional at an establishment.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureOffering {
    pub id: Uuid,
    pub procedure_id: Uuid,
    pub establishment_id: Uuid,
    pub professional_id: Uuid,
    pub schedule: DateTime<Utc>,
    pub duration: TimeDelta,
}

// --- Request Payloads (Input Schemas) ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// CreateUserRequest
///
/// Input payload for POST /v1/users. The password is handed to the credential service and
/// never persisted or logged in clear text.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateUserRequest {
    pub name: String,
    pub email: String,
}

// --- Views (Output Schemas) ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<&Account> for UserView {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            name: account.name.clone(),
            email: account.email.clone(),
        }
    }
}

/// BookmarkView
///
/// Flat projection of a bookmarked product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BookmarkView {
    pub id: Uuid,
    pub title: String,
    pub image: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[ts(type = "number")]
    #[schema(value_type = f64)]
    pub price: Decimal,
    pub review_score: Option<f64>,
}

impl From<&Product> for BookmarkView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            title: product.title.clone(),
            image: product.image.clone(),
            price: product.price,
            review_score: product.review_score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SpecialtySimpleView {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProcedureView {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: ProcedureType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct EstablishmentView {
    pub id: Uuid,
    pub name: String,
    pub legal_name: String,
    #[serde(rename = "type")]
    pub kind: EstablishmentType,
    /// "Street {street}, no. {number}. {district}, {city} - {state}"
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProfessionalView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(rename = "type")]
    pub kind: ProfessionalType,
    pub specialty: SpecialtySimpleView,
}

/// ProcedureOfferingView
///
/// Composite read model of the catalog listing. Every foreign entity is resolved to its display
/// fields; the duration is expressed in total seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProcedureOfferingView {
    pub id: Uuid,
    pub procedure: ProcedureView,
    pub establishment: EstablishmentView,
    pub professional: ProfessionalView,
    #[ts(type = "string")]
    pub schedule: DateTime<Utc>,
    pub duration: f64,
}
