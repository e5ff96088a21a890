use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, query_builder::QueryBuilder};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    catalog::{OfferingFilter, OfferingRecord, ProfessionalRecord},
    error::{AppError, AppResult},
    models::{
        Account, Address, Bookmark, Establishment, Procedure, ProcedureOffering, Product,
        ProfessionalProfile, Role, Specialty,
    },
};

/// Repository Trait
///
/// The abstract contract for every persistence operation. Handlers and the credential service
/// talk to the store only through this trait, so the Postgres implementation and the in-memory
/// one are interchangeable.
///
/// All operations return `AppResult`: store failures propagate to the caller and end up as a
/// generic server error. Listing operations return rows already in their final order.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Accounts ---
    // Ordered by (name, id).
    async fn list_accounts(&self) -> AppResult<Vec<Account>>;
    async fn get_account(&self, id: Uuid) -> AppResult<Option<Account>>;
    async fn find_account_by_email(&self, normalized_email: &str) -> AppResult<Option<Account>>;
    async fn find_account_by_user_name(
        &self,
        normalized_user_name: &str,
    ) -> AppResult<Option<Account>>;
    async fn insert_account(&self, account: &Account) -> AppResult<()>;
    // Overwrites every mutable column. Returns false when the id does not exist.
    async fn update_account(&self, account: &Account) -> AppResult<bool>;
    /// Deletes the account together with its bookmarks. Returns false when the id does not exist.
    async fn delete_account(&self, id: Uuid) -> AppResult<bool>;

    // --- Roles ---
    async fn insert_role_if_absent(&self, role: Role) -> AppResult<bool>;
    async fn list_roles(&self) -> AppResult<Vec<Role>>;

    // --- Products & Bookmarks ---
    async fn get_product(&self, id: Uuid) -> AppResult<Option<Product>>;
    async fn insert_product_if_absent(&self, product: &Product) -> AppResult<bool>;
    // Products bookmarked by the account, ordered by (title, id).
    async fn list_bookmarked_products(&self, account_id: Uuid) -> AppResult<Vec<Product>>;
    // Idempotent: returns true only if a new row was inserted.
    async fn insert_bookmark(&self, bookmark: &Bookmark) -> AppResult<bool>;
    async fn delete_bookmark(&self, account_id: Uuid, product_id: Uuid) -> AppResult<bool>;

    // --- Catalog reference data ---
    async fn insert_specialty_if_absent(&self, specialty: &Specialty) -> AppResult<bool>;
    async fn insert_procedure_if_absent(&self, procedure: &Procedure) -> AppResult<bool>;
    async fn insert_address_if_absent(&self, address: &Address) -> AppResult<bool>;
    async fn insert_establishment_if_absent(&self, establishment: &Establishment)
    -> AppResult<bool>;
    async fn insert_offering_if_absent(&self, offering: &ProcedureOffering) -> AppResult<bool>;

    /// The five-way join behind the catalog listing, filtered and ordered.
    async fn list_offerings(&self, filter: &OfferingFilter) -> AppResult<Vec<OfferingRecord>>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

// --- Row types ---

#[derive(FromRow)]
struct AccountRow {
    id: Uuid,
    name: String,
    email: String,
    user_name: String,
    password_hash: String,
    role_id: Uuid,
    professional_type: Option<String>,
    specialty_id: Option<Uuid>,
}

impl TryFrom<AccountRow> for Account {
    type Error = AppError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let role = Role::from_id(row.role_id)
            .ok_or_else(|| AppError::Internal(format!("unknown role id {}", row.role_id)))?;

        let professional = match (row.professional_type, row.specialty_id) {
            (Some(kind), Some(specialty_id)) => Some(ProfessionalProfile {
                kind: kind.parse().map_err(AppError::Internal)?,
                specialty_id,
            }),
            _ => None,
        };

        Ok(Account {
            id: row.id,
            name: row.name,
            email: row.email,
            user_name: row.user_name,
            password_hash: row.password_hash,
            role,
            professional,
        })
    }
}

#[derive(FromRow)]
struct ProductRow {
    id: Uuid,
    title: String,
    image: String,
    price: Decimal,
    review_score: Option<f64>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            title: row.title,
            image: row.image,
            price: row.price,
            review_score: row.review_score,
        }
    }
}

/// Flat row of the catalog join; column aliases match field names.
#[derive(FromRow)]
struct OfferingRow {
    offering_id: Uuid,
    schedule: DateTime<Utc>,
    duration_micros: i64,
    procedure_id: Uuid,
    procedure_name: String,
    procedure_description: Option<String>,
    procedure_kind: String,
    establishment_id: Uuid,
    establishment_name: String,
    legal_name: String,
    establishment_kind: String,
    address_id: Uuid,
    street: String,
    number: String,
    district: String,
    city: String,
    state: String,
    postal_code: String,
    professional_id: Uuid,
    professional_name: String,
    professional_email: String,
    professional_type: Option<String>,
    specialty_id: Uuid,
    specialty_name: String,
    specialty_description: Option<String>,
}

impl TryFrom<OfferingRow> for OfferingRecord {
    type Error = AppError;

    fn try_from(row: OfferingRow) -> Result<Self, Self::Error> {
        let professional_kind = row
            .professional_type
            .ok_or_else(|| {
                AppError::Internal(format!(
                    "offering {} references non-professional account {}",
                    row.offering_id, row.professional_id
                ))
            })?
            .parse()
            .map_err(AppError::Internal)?;

        Ok(OfferingRecord {
            offering: ProcedureOffering {
                id: row.offering_id,
                procedure_id: row.procedure_id,
                establishment_id: row.establishment_id,
                professional_id: row.professional_id,
                schedule: row.schedule,
                duration: TimeDelta::microseconds(row.duration_micros),
            },
            procedure: Procedure {
                id: row.procedure_id,
                name: row.procedure_name,
                description: row.procedure_description,
                kind: row.procedure_kind.parse().map_err(AppError::Internal)?,
            },
            establishment: Establishment {
                id: row.establishment_id,
                name: row.establishment_name,
                legal_name: row.legal_name,
                kind: row.establishment_kind.parse().map_err(AppError::Internal)?,
                address_id: row.address_id,
            },
            address: Address {
                id: row.address_id,
                street: row.street,
                number: row.number,
                district: row.district,
                city: row.city,
                state: row.state,
                postal_code: row.postal_code,
            },
            professional: ProfessionalRecord {
                id: row.professional_id,
                name: row.professional_name,
                email: row.professional_email,
                kind: professional_kind,
            },
            specialty: Specialty {
                id: row.specialty_id,
                name: row.specialty_name,
                description: row.specialty_description,
            },
        })
    }
}

const ACCOUNT_COLUMNS: &str =
    "id, name, email, user_name, password_hash, role_id, professional_type, specialty_id";

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
/// Ordering columns are compared with `COLLATE "C"` so the database orders strings byte-wise.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded schema migrations. Safe to call on every startup.
    pub async fn migrate(&self) -> AppResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn find_account_where(&self, column: &str, value: &str) -> AppResult<Option<Account>> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE {column} = $1");
        sqlx::query_as::<_, AccountRow>(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?
            .map(Account::try_from)
            .transpose()
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn list_accounts(&self) -> AppResult<Vec<Account>> {
        let query =
            format!(r#"SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY name COLLATE "C", id"#);
        sqlx::query_as::<_, AccountRow>(&query)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Account::try_from)
            .collect()
    }

    async fn get_account(&self, id: Uuid) -> AppResult<Option<Account>> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");
        sqlx::query_as::<_, AccountRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Account::try_from)
            .transpose()
    }

    async fn find_account_by_email(&self, normalized_email: &str) -> AppResult<Option<Account>> {
        self.find_account_where("normalized_email", normalized_email)
            .await
    }

    async fn find_account_by_user_name(
        &self,
        normalized_user_name: &str,
    ) -> AppResult<Option<Account>> {
        self.find_account_where("normalized_user_name", normalized_user_name)
            .await
    }

    async fn insert_account(&self, account: &Account) -> AppResult<()> {
        let professional = account.professional.as_ref();
        sqlx::query(
            r#"
            INSERT INTO accounts
                (id, name, email, normalized_email, user_name, normalized_user_name,
                 password_hash, role_id, professional_type, specialty_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(account.id)
        .bind(&account.name)
        .bind(&account.email)
        .bind(account.normalized_email())
        .bind(&account.user_name)
        .bind(account.normalized_user_name())
        .bind(&account.password_hash)
        .bind(account.role.id())
        .bind(professional.map(|p| p.kind.as_str()))
        .bind(professional.map(|p| p.specialty_id))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_account(&self, account: &Account) -> AppResult<bool> {
        let professional = account.professional.as_ref();
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET name = $2, email = $3, normalized_email = $4,
                user_name = $5, normalized_user_name = $6,
                password_hash = $7, role_id = $8,
                professional_type = $9, specialty_id = $10
            WHERE id = $1
            "#,
        )
        .bind(account.id)
        .bind(&account.name)
        .bind(&account.email)
        .bind(account.normalized_email())
        .bind(&account.user_name)
        .bind(account.normalized_user_name())
        .bind(&account.password_hash)
        .bind(account.role.id())
        .bind(professional.map(|p| p.kind.as_str()))
        .bind(professional.map(|p| p.specialty_id))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// delete_account
    ///
    /// Removes bookmarks explicitly before the account inside one transaction; the foreign key
    /// also cascades, so either way no bookmark can outlive its owner.
    async fn delete_account(&self, id: Uuid) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM bookmarks WHERE account_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_role_if_absent(&self, role: Role) -> AppResult<bool> {
        let result = sqlx::query("INSERT INTO roles (id, name) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(role.id())
            .bind(role.name())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        let ids: Vec<Uuid> = sqlx::query_scalar(r#"SELECT id FROM roles ORDER BY name COLLATE "C""#)
            .fetch_all(&self.pool)
            .await?;
        ids.into_iter()
            .map(|id| Role::from_id(id).ok_or_else(|| AppError::Internal(format!("unknown role id {id}"))))
            .collect()
    }

    async fn get_product(&self, id: Uuid) -> AppResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(
            "SELECT id, title, image, price, review_score FROM products WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Product::from))
    }

    async fn insert_product_if_absent(&self, product: &Product) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO products (id, title, image, price, review_score)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(product.id)
        .bind(&product.title)
        .bind(&product.image)
        .bind(product.price)
        .bind(product.review_score)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_bookmarked_products(&self, account_id: Uuid) -> AppResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT p.id, p.title, p.image, p.price, p.review_score
            FROM bookmarks b
            JOIN products p ON p.id = b.product_id
            WHERE b.account_id = $1
            ORDER BY p.title COLLATE "C", p.id
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// insert_bookmark
    ///
    /// Uses `ON CONFLICT DO NOTHING` on the composite key, so bookmarking twice is a no-op.
    async fn insert_bookmark(&self, bookmark: &Bookmark) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO bookmarks (account_id, product_id, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(bookmark.account_id)
        .bind(bookmark.product_id)
        .bind(bookmark.created_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_bookmark(&self, account_id: Uuid, product_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM bookmarks WHERE account_id = $1 AND product_id = $2")
            .bind(account_id)
            .bind(product_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_specialty_if_absent(&self, specialty: &Specialty) -> AppResult<bool> {
        let result = sqlx::query(
            "INSERT INTO specialties (id, name, description) VALUES ($1, $2, $3) ON CONFLICT (id) DO NOTHING",
        )
        .bind(specialty.id)
        .bind(&specialty.name)
        .bind(&specialty.description)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_procedure_if_absent(&self, procedure: &Procedure) -> AppResult<bool> {
        let result = sqlx::query(
            "INSERT INTO procedures (id, name, description, kind) VALUES ($1, $2, $3, $4) ON CONFLICT (id) DO NOTHING",
        )
        .bind(procedure.id)
        .bind(&procedure.name)
        .bind(&procedure.description)
        .bind(procedure.kind.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_address_if_absent(&self, address: &Address) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO addresses (id, street, number, district, city, state, postal_code)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(address.id)
        .bind(&address.street)
        .bind(&address.number)
        .bind(&address.district)
        .bind(&address.city)
        .bind(&address.state)
        .bind(&address.postal_code)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_establishment_if_absent(
        &self,
        establishment: &Establishment,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO establishments (id, name, legal_name, kind, address_id)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(establishment.id)
        .bind(&establishment.name)
        .bind(&establishment.legal_name)
        .bind(establishment.kind.as_str())
        .bind(establishment.address_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_offering_if_absent(&self, offering: &ProcedureOffering) -> AppResult<bool> {
        let duration_micros = offering.duration.num_microseconds().ok_or_else(|| {
            AppError::Internal(format!("offering {} duration out of range", offering.id))
        })?;
        let result = sqlx::query(
            r#"
            INSERT INTO procedure_offerings
                (id, procedure_id, establishment_id, professional_id, schedule, duration_micros)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(offering.id)
        .bind(offering.procedure_id)
        .bind(offering.establishment_id)
        .bind(offering.professional_id)
        .bind(offering.schedule)
        .bind(duration_micros)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// list_offerings
    ///
    /// Builds the five-way join with QueryBuilder so every optional filter is a bound parameter.
    /// `strpos` gives plain case-sensitive substring semantics (no LIKE wildcards).
    async fn list_offerings(&self, filter: &OfferingFilter) -> AppResult<Vec<OfferingRecord>> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(
            r#"
            SELECT
                o.id AS offering_id, o.schedule, o.duration_micros,
                p.id AS procedure_id, p.name AS procedure_name,
                p.description AS procedure_description, p.kind AS procedure_kind,
                e.id AS establishment_id, e.name AS establishment_name, e.legal_name,
                e.kind AS establishment_kind,
                a.id AS address_id, a.street, a.number, a.district, a.city, a.state, a.postal_code,
                u.id AS professional_id, u.name AS professional_name,
                u.email AS professional_email, u.professional_type,
                s.id AS specialty_id, s.name AS specialty_name,
                s.description AS specialty_description
            FROM procedure_offerings o
            JOIN procedures p ON p.id = o.procedure_id
            JOIN establishments e ON e.id = o.establishment_id
            JOIN addresses a ON a.id = e.address_id
            JOIN accounts u ON u.id = o.professional_id
            JOIN specialties s ON s.id = u.specialty_id
            WHERE TRUE
            "#,
        );

        if let Some(name) = &filter.name {
            builder.push(" AND strpos(p.name, ");
            builder.push_bind(name.clone());
            builder.push(") > 0");
        }

        if let Some(place) = &filter.district_or_city {
            builder.push(" AND (strpos(a.district, ");
            builder.push_bind(place.clone());
            builder.push(") > 0 OR strpos(a.city, ");
            builder.push_bind(place.clone());
            builder.push(") > 0)");
        }

        if let Some(kind) = filter.kind {
            builder.push(" AND p.kind = ");
            builder.push_bind(kind.as_str());
        }

        builder.push(
            r#"
            ORDER BY
                p.name COLLATE "C",
                u.name COLLATE "C",
                e.name COLLATE "C",
                ('Street ' || a.street || ', no. ' || a.number || '. ' || a.district || ', '
                    || a.city || ' - ' || a.state) COLLATE "C",
                o.id
            "#,
        );

        builder
            .build_query_as::<OfferingRow>()
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(OfferingRecord::try_from)
            .collect()
    }
}
