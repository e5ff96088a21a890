use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    catalog::{self, OfferingFilter, OfferingRecord, ProfessionalRecord},
    error::{AppError, AppResult},
    models::{
        Account, Address, Bookmark, Establishment, Procedure, ProcedureOffering, Product, Role,
        Specialty,
    },
    repository::Repository,
};

#[derive(Default)]
struct Tables {
    roles: BTreeSet<Uuid>,
    accounts: HashMap<Uuid, Account>,
    products: HashMap<Uuid, Product>,
    // Keyed by (account, product), same as the composite primary key.
    bookmarks: BTreeMap<(Uuid, Uuid), Bookmark>,
    specialties: HashMap<Uuid, Specialty>,
    procedures: HashMap<Uuid, Procedure>,
    addresses: HashMap<Uuid, Address>,
    establishments: HashMap<Uuid, Establishment>,
    offerings: HashMap<Uuid, ProcedureOffering>,
}

impl Tables {
    fn constraint(message: String) -> AppError {
        AppError::Internal(format!("constraint violation: {message}"))
    }

    fn check_unique(&self, account: &Account) -> AppResult<()> {
        let email = account.normalized_email();
        let user_name = account.normalized_user_name();
        let clash = self.accounts.values().any(|other| {
            other.id != account.id
                && (other.normalized_email() == email || other.normalized_user_name() == user_name)
        });
        if clash {
            return Err(Self::constraint(format!(
                "account {} duplicates an email or user name",
                account.id
            )));
        }
        if let Some(profile) = &account.professional {
            if !self.specialties.contains_key(&profile.specialty_id) {
                return Err(Self::constraint(format!(
                    "unknown specialty {}",
                    profile.specialty_id
                )));
            }
        }
        Ok(())
    }

    fn record(&self, offering: &ProcedureOffering) -> AppResult<OfferingRecord> {
        let missing = |what: &str, id: Uuid| {
            AppError::Internal(format!("offering {} references missing {what} {id}", offering.id))
        };

        let procedure = self
            .procedures
            .get(&offering.procedure_id)
            .ok_or_else(|| missing("procedure", offering.procedure_id))?;
        let establishment = self
            .establishments
            .get(&offering.establishment_id)
            .ok_or_else(|| missing("establishment", offering.establishment_id))?;
        let address = self
            .addresses
            .get(&establishment.address_id)
            .ok_or_else(|| missing("address", establishment.address_id))?;
        let account = self
            .accounts
            .get(&offering.professional_id)
            .ok_or_else(|| missing("professional", offering.professional_id))?;
        let profile = account
            .professional
            .as_ref()
            .ok_or_else(|| missing("professional profile for", account.id))?;
        let specialty = self
            .specialties
            .get(&profile.specialty_id)
            .ok_or_else(|| missing("specialty", profile.specialty_id))?;

        Ok(OfferingRecord {
            offering: offering.clone(),
            procedure: procedure.clone(),
            establishment: establishment.clone(),
            address: address.clone(),
            professional: ProfessionalRecord {
                id: account.id,
                name: account.name.clone(),
                email: account.email.clone(),
                kind: profile.kind,
            },
            specialty: specialty.clone(),
        })
    }
}

/// MemoryRepository
///
/// In-process implementation of `Repository`. Enforces the same keys and references as the
/// relational schema (unique emails, bookmark cascade, offering restrict), so behaviour observed
/// against it carries over to Postgres. Used by the test-suite and by `DATABASE_URL=memory`.
#[derive(Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn list_accounts(&self) -> AppResult<Vec<Account>> {
        let tables = self.tables.read().await;
        let mut accounts: Vec<Account> = tables.accounts.values().cloned().collect();
        accounts.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(accounts)
    }

    async fn get_account(&self, id: Uuid) -> AppResult<Option<Account>> {
        Ok(self.tables.read().await.accounts.get(&id).cloned())
    }

    async fn find_account_by_email(&self, normalized_email: &str) -> AppResult<Option<Account>> {
        let tables = self.tables.read().await;
        Ok(tables
            .accounts
            .values()
            .find(|a| a.normalized_email() == normalized_email)
            .cloned())
    }

    async fn find_account_by_user_name(
        &self,
        normalized_user_name: &str,
    ) -> AppResult<Option<Account>> {
        let tables = self.tables.read().await;
        Ok(tables
            .accounts
            .values()
            .find(|a| a.normalized_user_name() == normalized_user_name)
            .cloned())
    }

    async fn insert_account(&self, account: &Account) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if tables.accounts.contains_key(&account.id) {
            return Err(Tables::constraint(format!("duplicate account id {}", account.id)));
        }
        tables.check_unique(account)?;
        tables.accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn update_account(&self, account: &Account) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        if !tables.accounts.contains_key(&account.id) {
            return Ok(false);
        }
        tables.check_unique(account)?;
        tables.accounts.insert(account.id, account.clone());
        Ok(true)
    }

    async fn delete_account(&self, id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        if !tables.accounts.contains_key(&id) {
            return Ok(false);
        }
        if tables.offerings.values().any(|o| o.professional_id == id) {
            return Err(Tables::constraint(format!(
                "account {id} is still referenced by procedure offerings"
            )));
        }
        tables.bookmarks.retain(|(account_id, _), _| *account_id != id);
        tables.accounts.remove(&id);
        Ok(true)
    }

    async fn insert_role_if_absent(&self, role: Role) -> AppResult<bool> {
        Ok(self.tables.write().await.roles.insert(role.id()))
    }

    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        let tables = self.tables.read().await;
        let mut roles: Vec<Role> = tables.roles.iter().filter_map(|id| Role::from_id(*id)).collect();
        roles.sort_by_key(|role| role.name());
        Ok(roles)
    }

    async fn get_product(&self, id: Uuid) -> AppResult<Option<Product>> {
        Ok(self.tables.read().await.products.get(&id).cloned())
    }

    async fn insert_product_if_absent(&self, product: &Product) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.products.contains_key(&product.id) {
            return Ok(false);
        }
        tables.products.insert(product.id, product.clone());
        Ok(true)
    }

    async fn list_bookmarked_products(&self, account_id: Uuid) -> AppResult<Vec<Product>> {
        let tables = self.tables.read().await;
        let mut products: Vec<Product> = tables
            .bookmarks
            .range((account_id, Uuid::nil())..=(account_id, Uuid::from_u128(u128::MAX)))
            .filter_map(|((_, product_id), _)| tables.products.get(product_id).cloned())
            .collect();
        products.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)));
        Ok(products)
    }

    async fn insert_bookmark(&self, bookmark: &Bookmark) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        if !tables.accounts.contains_key(&bookmark.account_id) {
            return Err(Tables::constraint(format!("unknown account {}", bookmark.account_id)));
        }
        if !tables.products.contains_key(&bookmark.product_id) {
            return Err(Tables::constraint(format!("unknown product {}", bookmark.product_id)));
        }
        let key = (bookmark.account_id, bookmark.product_id);
        if tables.bookmarks.contains_key(&key) {
            return Ok(false);
        }
        tables.bookmarks.insert(key, bookmark.clone());
        Ok(true)
    }

    async fn delete_bookmark(&self, account_id: Uuid, product_id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(tables.bookmarks.remove(&(account_id, product_id)).is_some())
    }

    async fn insert_specialty_if_absent(&self, specialty: &Specialty) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.specialties.contains_key(&specialty.id) {
            return Ok(false);
        }
        tables.specialties.insert(specialty.id, specialty.clone());
        Ok(true)
    }

    async fn insert_procedure_if_absent(&self, procedure: &Procedure) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.procedures.contains_key(&procedure.id) {
            return Ok(false);
        }
        tables.procedures.insert(procedure.id, procedure.clone());
        Ok(true)
    }

    async fn insert_address_if_absent(&self, address: &Address) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.addresses.contains_key(&address.id) {
            return Ok(false);
        }
        tables.addresses.insert(address.id, address.clone());
        Ok(true)
    }

    async fn insert_establishment_if_absent(
        &self,
        establishment: &Establishment,
    ) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.establishments.contains_key(&establishment.id) {
            return Ok(false);
        }
        if !tables.addresses.contains_key(&establishment.address_id) {
            return Err(Tables::constraint(format!(
                "unknown address {}",
                establishment.address_id
            )));
        }
        tables
            .establishments
            .insert(establishment.id, establishment.clone());
        Ok(true)
    }

    async fn insert_offering_if_absent(&self, offering: &ProcedureOffering) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.offerings.contains_key(&offering.id) {
            return Ok(false);
        }
        // Resolving the record validates every reference before the row lands.
        tables.record(offering)?;
        tables.offerings.insert(offering.id, offering.clone());
        Ok(true)
    }

    async fn list_offerings(&self, filter: &OfferingFilter) -> AppResult<Vec<OfferingRecord>> {
        let tables = self.tables.read().await;
        let records = tables
            .offerings
            .values()
            .map(|offering| tables.record(offering))
            .collect::<AppResult<Vec<_>>>()?;
        Ok(catalog::select(records, filter))
    }
}
