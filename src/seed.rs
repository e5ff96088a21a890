use chrono::{DateTime, TimeDelta, Utc};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    identity::CredentialState,
    models::{
        Account, Address, Establishment, EstablishmentType, Procedure, ProcedureOffering,
        ProcedureType, Product, ProfessionalProfile, ProfessionalType, Role, Specialty,
    },
    repository::RepositoryState,
};

// --- Fixed identifiers ---

pub const SUPER_ADMIN_ID: Uuid = Uuid::from_u128(0xf7f300c9_18f8_4c66_9e7e_55c5ca378dac);
pub const SUPER_ADMIN_EMAIL: &str = "superadmin@puchealth.com.br";
pub const SUPER_ADMIN_PASSWORD: &str = "Supersecretpassw000rd!";

pub const ADMIN_ID: Uuid = Uuid::from_u128(0xa5de6903_e941_44d5_8644_5d390a0d0761);
pub const ADMIN_EMAIL: &str = "admin@puchealth.com.br";
pub const ADMIN_PASSWORD: &str = "Secretpassw000rd!";

pub const PROFESSIONAL_ID: Uuid = Uuid::from_u128(0x7eac7b1b_cd5e_4faa_817e_d48f6e41e5dc);
pub const PROFESSIONAL_EMAIL: &str = "rafael.radio@puchealth.com.br";
pub const PROFESSIONAL_PASSWORD: &str = "Profissionalpassw000rd!";

pub const RADIOLOGY_ID: Uuid = Uuid::from_u128(0x5d7a578c_e69c_4b37_bad9_67a2b54da1a7);

pub const CHEST_XRAY_ID: Uuid = Uuid::from_u128(0x3f1c2a9e_5b7d_4c1e_9a2f_6d8e0b4c7a11);
pub const CAMPUS_ADDRESS_ID: Uuid = Uuid::from_u128(0x8c6b1f20_41d3_4e0a_b7a5_2f9d6c3e1b01);
pub const SAVASSI_ADDRESS_ID: Uuid = Uuid::from_u128(0x8c6b1f20_41d3_4e0a_b7a5_2f9d6c3e1b02);
pub const CAMPUS_CLINIC_ID: Uuid = Uuid::from_u128(0x1e4d7a63_9c2b_4f58_a0d1_7b3e5c9f2a01);
pub const SAVASSI_HOSPITAL_ID: Uuid = Uuid::from_u128(0x1e4d7a63_9c2b_4f58_a0d1_7b3e5c9f2a02);
pub const CAMPUS_OFFERING_ID: Uuid = Uuid::from_u128(0x6a2e9c14_d8b3_4a7f_9e05_c1f4b8d3a701);
pub const SAVASSI_OFFERING_ID: Uuid = Uuid::from_u128(0x6a2e9c14_d8b3_4a7f_9e05_c1f4b8d3a702);

/// An account to create together with its initial password.
#[derive(Debug, Clone)]
pub struct SeedAccount {
    pub account: Account,
    pub password: String,
}

/// SeedData
///
/// The reference rows written at startup. Passed explicitly into `seed`, so tests can extend
/// or replace it (products in particular are supplied by the caller).
#[derive(Debug, Clone, Default)]
pub struct SeedData {
    pub roles: Vec<Role>,
    pub specialties: Vec<Specialty>,
    pub accounts: Vec<SeedAccount>,
    pub procedures: Vec<Procedure>,
    pub addresses: Vec<Address>,
    pub establishments: Vec<Establishment>,
    pub offerings: Vec<ProcedureOffering>,
    pub products: Vec<Product>,
}

impl SeedData {
    pub fn standard() -> Self {
        let mut professional = Account::new(
            PROFESSIONAL_ID,
            "Rafael Radio",
            PROFESSIONAL_EMAIL,
            Role::User,
        );
        professional.professional = Some(ProfessionalProfile {
            kind: ProfessionalType::Physician,
            specialty_id: RADIOLOGY_ID,
        });

        // 2021-06-01T09:00:00Z and 2021-06-02T14:00:00Z
        let first_slot = DateTime::<Utc>::UNIX_EPOCH + TimeDelta::seconds(1_622_538_000);
        let second_slot = DateTime::<Utc>::UNIX_EPOCH + TimeDelta::seconds(1_622_642_400);

        Self {
            roles: Role::ALL.to_vec(),
            specialties: vec![Specialty {
                id: RADIOLOGY_ID,
                name: "Radiologia".to_string(),
                description: Some("Especialidade em exames Raio X.".to_string()),
            }],
            accounts: vec![
                SeedAccount {
                    account: Account::new(
                        SUPER_ADMIN_ID,
                        "SuperAdmin",
                        SUPER_ADMIN_EMAIL,
                        Role::Super,
                    ),
                    password: SUPER_ADMIN_PASSWORD.to_string(),
                },
                SeedAccount {
                    account: Account::new(ADMIN_ID, "Admin", ADMIN_EMAIL, Role::Admin),
                    password: ADMIN_PASSWORD.to_string(),
                },
                SeedAccount {
                    account: professional,
                    password: PROFESSIONAL_PASSWORD.to_string(),
                },
            ],
            procedures: vec![Procedure {
                id: CHEST_XRAY_ID,
                name: "Raio X do tórax".to_string(),
                description: Some("Radiografia simples do tórax.".to_string()),
                kind: ProcedureType::Exam,
            }],
            addresses: vec![
                Address {
                    id: CAMPUS_ADDRESS_ID,
                    street: "Avenida Dom José Gaspar".to_string(),
                    number: "500".to_string(),
                    district: "Coração Eucarístico".to_string(),
                    city: "Belo Horizonte".to_string(),
                    state: "MG".to_string(),
                    postal_code: "30535-901".to_string(),
                },
                Address {
                    id: SAVASSI_ADDRESS_ID,
                    street: "Rua Cláudio Manoel".to_string(),
                    number: "1162".to_string(),
                    district: "Savassi".to_string(),
                    city: "Belo Horizonte".to_string(),
                    state: "MG".to_string(),
                    postal_code: "30140-100".to_string(),
                },
            ],
            establishments: vec![
                Establishment {
                    id: CAMPUS_CLINIC_ID,
                    name: "Clínica PUC".to_string(),
                    legal_name: "PUC Minas Serviços de Saúde Ltda".to_string(),
                    kind: EstablishmentType::Clinic,
                    address_id: CAMPUS_ADDRESS_ID,
                },
                Establishment {
                    id: SAVASSI_HOSPITAL_ID,
                    name: "Hospital Savassi".to_string(),
                    legal_name: "Hospital Savassi S.A.".to_string(),
                    kind: EstablishmentType::Hospital,
                    address_id: SAVASSI_ADDRESS_ID,
                },
            ],
            offerings: vec![
                ProcedureOffering {
                    id: CAMPUS_OFFERING_ID,
                    procedure_id: CHEST_XRAY_ID,
                    establishment_id: CAMPUS_CLINIC_ID,
                    professional_id: PROFESSIONAL_ID,
                    schedule: first_slot,
                    duration: TimeDelta::minutes(30),
                },
                ProcedureOffering {
                    id: SAVASSI_OFFERING_ID,
                    procedure_id: CHEST_XRAY_ID,
                    establishment_id: SAVASSI_HOSPITAL_ID,
                    professional_id: PROFESSIONAL_ID,
                    schedule: second_slot,
                    duration: TimeDelta::minutes(45),
                },
            ],
            products: Vec::new(),
        }
    }

    pub fn with_products(mut self, products: impl IntoIterator<Item = Product>) -> Self {
        self.products.extend(products);
        self
    }
}

/// Number of rows each seeding run actually inserted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub roles: usize,
    pub accounts: usize,
    pub catalog: usize,
    pub products: usize,
}

impl SeedReport {
    pub fn total(&self) -> usize {
        self.roles + self.accounts + self.catalog + self.products
    }
}

/// seed
///
/// Writes `data` in dependency order, skipping every row whose id already exists (accounts are
/// also skipped when their email is taken, like logins). Running it again against the same store
/// inserts nothing.
pub async fn seed(
    repo: &RepositoryState,
    credentials: &CredentialState,
    data: &SeedData,
) -> AppResult<SeedReport> {
    let mut report = SeedReport::default();

    for role in &data.roles {
        report.roles += usize::from(repo.insert_role_if_absent(*role).await?);
    }

    for specialty in &data.specialties {
        report.catalog += usize::from(repo.insert_specialty_if_absent(specialty).await?);
    }
    for procedure in &data.procedures {
        report.catalog += usize::from(repo.insert_procedure_if_absent(procedure).await?);
    }
    for address in &data.addresses {
        report.catalog += usize::from(repo.insert_address_if_absent(address).await?);
    }
    for establishment in &data.establishments {
        report.catalog += usize::from(repo.insert_establishment_if_absent(establishment).await?);
    }

    for SeedAccount { account, password } in &data.accounts {
        // The id decides; a seeded account whose email was since changed is still present.
        if credentials.find_by_id(account.id).await?.is_some()
            || credentials.find_by_email(&account.email).await?.is_some()
        {
            continue;
        }
        if let Err(errors) = credentials.create(account, password).await? {
            return Err(AppError::Internal(format!(
                "seed account {} rejected: {:?}",
                account.email, errors
            )));
        }
        report.accounts += 1;
    }

    for offering in &data.offerings {
        report.catalog += usize::from(repo.insert_offering_if_absent(offering).await?);
    }

    for product in &data.products {
        report.products += usize::from(repo.insert_product_if_absent(product).await?);
    }

    tracing::info!(
        roles = report.roles,
        accounts = report.accounts,
        catalog = report.catalog,
        products = report.products,
        "Seeding finished"
    );

    Ok(report)
}
