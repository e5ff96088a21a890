use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Account, normalize},
    repository::RepositoryState,
};

// --- Validation outcome ---

/// IdentityError
///
/// One validation failure reported by the credential service. Returned to clients verbatim as a
/// JSON array, in the order the checks ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct IdentityError {
    pub code: String,
    pub description: String,
}

impl IdentityError {
    fn new(code: &str, description: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            description: description.into(),
        }
    }

    pub fn is(&self, code: &str) -> bool {
        self.code == code
    }
}

pub mod codes {
    pub const INVALID_USER_NAME: &str = "InvalidUserName";
    pub const DUPLICATE_USER_NAME: &str = "DuplicateUserName";
    pub const INVALID_EMAIL: &str = "InvalidEmail";
    pub const DUPLICATE_EMAIL: &str = "DuplicateEmail";
    pub const PASSWORD_TOO_SHORT: &str = "PasswordTooShort";
    pub const PASSWORD_REQUIRES_NON_ALPHANUMERIC: &str = "PasswordRequiresNonAlphanumeric";
    pub const PASSWORD_REQUIRES_DIGIT: &str = "PasswordRequiresDigit";
    pub const PASSWORD_REQUIRES_LOWER: &str = "PasswordRequiresLower";
    pub const PASSWORD_REQUIRES_UPPER: &str = "PasswordRequiresUpper";
    pub const PASSWORD_REQUIRES_UNIQUE_CHARS: &str = "PasswordRequiresUniqueChars";
}

/// Outer `AppResult` carries store/hashing faults, inner `Result` carries validation failures.
pub type IdentityResult = AppResult<Result<(), Vec<IdentityError>>>;

// --- Options ---

#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    pub required_length: usize,
    pub required_unique_chars: usize,
    pub require_non_alphanumeric: bool,
    pub require_digit: bool,
    pub require_lowercase: bool,
    pub require_uppercase: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            required_length: 8,
            required_unique_chars: 1,
            require_non_alphanumeric: true,
            require_digit: true,
            require_lowercase: true,
            require_uppercase: true,
        }
    }
}

/// IdentityOptions
///
/// Validation rules and hashing parameters of the credential service.
#[derive(Debug, Clone)]
pub struct IdentityOptions {
    pub password: PasswordPolicy,
    pub allowed_user_name_characters: String,
    pub hash_cost: u32,
}

impl Default for IdentityOptions {
    fn default() -> Self {
        Self {
            password: PasswordPolicy::default(),
            allowed_user_name_characters:
                "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-._@+".to_string(),
            hash_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl IdentityOptions {
    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    /// validate_password
    ///
    /// Runs every password rule and collects all failures (a weak password usually breaks
    /// several rules at once).
    pub fn validate_password(&self, password: &str) -> Vec<IdentityError> {
        let policy = &self.password;
        let mut errors = Vec::new();

        if password.chars().count() < policy.required_length {
            errors.push(IdentityError::new(
                codes::PASSWORD_TOO_SHORT,
                format!(
                    "Passwords must be at least {} characters.",
                    policy.required_length
                ),
            ));
        }
        if policy.require_non_alphanumeric && password.chars().all(|c| c.is_ascii_alphanumeric()) {
            errors.push(IdentityError::new(
                codes::PASSWORD_REQUIRES_NON_ALPHANUMERIC,
                "Passwords must have at least one non alphanumeric character.",
            ));
        }
        if policy.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            errors.push(IdentityError::new(
                codes::PASSWORD_REQUIRES_DIGIT,
                "Passwords must have at least one digit ('0'-'9').",
            ));
        }
        if policy.require_lowercase && !password.chars().any(|c| c.is_ascii_lowercase()) {
            errors.push(IdentityError::new(
                codes::PASSWORD_REQUIRES_LOWER,
                "Passwords must have at least one lowercase ('a'-'z').",
            ));
        }
        if policy.require_uppercase && !password.chars().any(|c| c.is_ascii_uppercase()) {
            errors.push(IdentityError::new(
                codes::PASSWORD_REQUIRES_UPPER,
                "Passwords must have at least one uppercase ('A'-'Z').",
            ));
        }
        if policy.required_unique_chars >= 1 {
            let mut distinct: Vec<char> = password.chars().collect();
            distinct.sort_unstable();
            distinct.dedup();
            if distinct.len() < policy.required_unique_chars {
                errors.push(IdentityError::new(
                    codes::PASSWORD_REQUIRES_UNIQUE_CHARS,
                    format!(
                        "Passwords must use at least {} different characters.",
                        policy.required_unique_chars
                    ),
                ));
            }
        }

        errors
    }

    fn is_valid_user_name(&self, user_name: &str) -> bool {
        !user_name.is_empty()
            && user_name
                .chars()
                .all(|c| self.allowed_user_name_characters.contains(c))
    }
}

/// Exactly one '@', neither first nor last.
pub fn is_valid_email(email: &str) -> bool {
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => !local.is_empty() && !domain.is_empty(),
        _ => false,
    }
}

// --- Service ---

/// CredentialService Trait
///
/// Everything the handlers need from the identity subsystem: account lookup, password
/// verification and validated create/update/delete. Hashes never leave this layer.
#[async_trait]
pub trait CredentialService: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Account>>;
    async fn find_by_email(&self, email: &str) -> AppResult<Option<Account>>;
    async fn check_password(&self, account: &Account, password: &str) -> AppResult<bool>;
    /// Validates, hashes `password` and inserts the account.
    async fn create(&self, account: &Account, password: &str) -> IdentityResult;
    /// Validates and persists `account`. `NotFound` if it no longer exists.
    async fn update(&self, account: &Account) -> IdentityResult;
    async fn delete(&self, account: &Account) -> AppResult<bool>;
}

pub type CredentialState = Arc<dyn CredentialService>;

/// IdentityStore
///
/// The bcrypt-backed credential service, persisting through the shared repository.
pub struct IdentityStore {
    repo: RepositoryState,
    options: IdentityOptions,
}

impl IdentityStore {
    pub fn new(repo: RepositoryState, options: IdentityOptions) -> Self {
        Self { repo, options }
    }

    pub fn options(&self) -> &IdentityOptions {
        &self.options
    }

    /// validate_account
    ///
    /// User-name checks run before email checks. An invalid value skips its own uniqueness
    /// check; uniqueness ignores the account itself so updates can keep their values.
    async fn validate_account(&self, account: &Account) -> AppResult<Vec<IdentityError>> {
        let mut errors = Vec::new();

        if !self.options.is_valid_user_name(&account.user_name) {
            errors.push(IdentityError::new(
                codes::INVALID_USER_NAME,
                format!(
                    "Username '{}' is invalid, can only contain letters or digits.",
                    account.user_name
                ),
            ));
        } else if let Some(owner) = self
            .repo
            .find_account_by_user_name(&account.normalized_user_name())
            .await?
        {
            if owner.id != account.id {
                errors.push(IdentityError::new(
                    codes::DUPLICATE_USER_NAME,
                    format!("Username '{}' is already taken.", account.user_name),
                ));
            }
        }

        if !is_valid_email(&account.email) {
            errors.push(IdentityError::new(
                codes::INVALID_EMAIL,
                format!("Email '{}' is invalid.", account.email),
            ));
        } else if let Some(owner) = self
            .repo
            .find_account_by_email(&account.normalized_email())
            .await?
        {
            if owner.id != account.id {
                errors.push(IdentityError::new(
                    codes::DUPLICATE_EMAIL,
                    format!("Email '{}' is already taken.", account.email),
                ));
            }
        }

        Ok(errors)
    }
}

#[async_trait]
impl CredentialService for IdentityStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Account>> {
        self.repo.get_account(id).await
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        self.repo.find_account_by_email(&normalize(email)).await
    }

    async fn check_password(&self, account: &Account, password: &str) -> AppResult<bool> {
        if account.password_hash.is_empty() {
            return Ok(false);
        }
        let hash = account.password_hash.clone();
        let password = password.to_string();
        // bcrypt is CPU-bound; keep it off the async workers.
        let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))??;
        Ok(verified)
    }

    async fn create(&self, account: &Account, password: &str) -> IdentityResult {
        let password_errors = self.options.validate_password(password);
        if !password_errors.is_empty() {
            return Ok(Err(password_errors));
        }

        let account_errors = self.validate_account(account).await?;
        if !account_errors.is_empty() {
            return Ok(Err(account_errors));
        }

        let cost = self.options.hash_cost;
        let password = password.to_string();
        let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))??;

        let mut stored = account.clone();
        stored.password_hash = hash;
        self.repo.insert_account(&stored).await?;

        tracing::info!(account_id = %account.id, role = account.role.name(), "Account created");
        Ok(Ok(()))
    }

    async fn update(&self, account: &Account) -> IdentityResult {
        let errors = self.validate_account(account).await?;
        if !errors.is_empty() {
            return Ok(Err(errors));
        }

        if !self.repo.update_account(account).await? {
            // Deleted between the caller's lookup and this write.
            return Err(AppError::NotFound);
        }
        tracing::info!(account_id = %account.id, "Account updated");
        Ok(Ok(()))
    }

    async fn delete(&self, account: &Account) -> AppResult<bool> {
        let deleted = self.repo.delete_account(account.id).await?;
        if deleted {
            tracing::info!(account_id = %account.id, "Account deleted");
        }
        Ok(deleted)
    }
}
