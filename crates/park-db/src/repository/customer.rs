//! # Customer Repository
//!
//! Accounts: registration, credential lookup, profile and role changes.
//!
//! Email and phone are both unique. Duplicate errors name which of the two
//! collided so the web layer can say "email", "phone" or "email and phone".

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use park_core::{Customer, Role};

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, FromRow)]
struct CustomerRow {
    customer_id: i64,
    full_name: String,
    phone: String,
    email: String,
    role: Role,
    registered_at: DateTime<Utc>,
    password_hash: String,
}

impl CustomerRow {
    fn split(self) -> (Customer, String) {
        let customer = Customer {
            customer_id: self.customer_id,
            full_name: self.full_name,
            phone: self.phone,
            email: self.email,
            role: self.role,
            registered_at: self.registered_at,
        };
        (customer, self.password_hash)
    }
}

/// A customer together with the stored password hash.
#[derive(Debug, Clone)]
pub struct CustomerCredentials {
    pub customer: Customer,
    pub password_hash: String,
}

impl From<CustomerRow> for CustomerCredentials {
    fn from(row: CustomerRow) -> Self {
        let (customer, password_hash) = row.split();
        CustomerCredentials {
            customer,
            password_hash,
        }
    }
}

/// Input for [`CustomerRepository::create`]. Fields are already validated.
#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub full_name: String,
    pub phone: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

const SELECT_CUSTOMER: &str = r#"
    SELECT customer_id, full_name, phone, email, role, registered_at, password_hash
    FROM customers
"#;

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Fails with a `UniqueViolation` naming the taken field(s) when the
    /// email or phone belongs to an account other than `exclude`.
    async fn ensure_unique(&self, email: &str, phone: &str, exclude: Option<i64>) -> DbResult<()> {
        let (email_taken, phone_taken): (bool, bool) = sqlx::query_as(
            r#"
            SELECT
                EXISTS(SELECT 1 FROM customers WHERE email = ?1 AND customer_id IS NOT ?3),
                EXISTS(SELECT 1 FROM customers WHERE phone = ?2 AND customer_id IS NOT ?3)
            "#,
        )
        .bind(email)
        .bind(phone)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?;

        match (email_taken, phone_taken) {
            (true, true) => Err(DbError::duplicate(
                "email and phone",
                format!("{} / {}", email, phone),
            )),
            (true, false) => Err(DbError::duplicate("email", email)),
            (false, true) => Err(DbError::duplicate("phone", phone)),
            (false, false) => Ok(()),
        }
    }

    /// Creates an account.
    pub async fn create(&self, new: &NewCustomer) -> DbResult<Customer> {
        self.ensure_unique(&new.email, &new.phone, None).await?;

        let now = Utc::now();
        debug!(email = %new.email, role = %new.role, "Creating customer");

        let customer_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO customers (full_name, phone, email, password_hash, role, registered_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            RETURNING customer_id
            "#,
        )
        .bind(&new.full_name)
        .bind(&new.phone)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(new.role)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        info!(customer_id, role = %new.role, "Customer registered");

        Ok(Customer {
            customer_id,
            full_name: new.full_name.clone(),
            phone: new.phone.clone(),
            email: new.email.clone(),
            role: new.role,
            registered_at: now,
        })
    }

    pub async fn get_by_id(&self, customer_id: i64) -> DbResult<Option<Customer>> {
        let row: Option<CustomerRow> =
            sqlx::query_as(&format!("{} WHERE customer_id = ?1", SELECT_CUSTOMER))
                .bind(customer_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|r| r.split().0))
    }

    /// Looks up an account by email, including its password hash.
    pub async fn find_credentials_by_email(&self, email: &str) -> DbResult<Option<CustomerCredentials>> {
        let row: Option<CustomerRow> =
            sqlx::query_as(&format!("{} WHERE email = ?1", SELECT_CUSTOMER))
                .bind(email.trim())
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(CustomerCredentials::from))
    }

    pub async fn get_credentials(&self, customer_id: i64) -> DbResult<CustomerCredentials> {
        let row: Option<CustomerRow> =
            sqlx::query_as(&format!("{} WHERE customer_id = ?1", SELECT_CUSTOMER))
                .bind(customer_id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(CustomerCredentials::from)
            .ok_or_else(|| DbError::not_found("Customer", customer_id))
    }

    /// Every account, newest registration first.
    pub async fn list_all(&self) -> DbResult<Vec<Customer>> {
        let rows: Vec<CustomerRow> =
            sqlx::query_as(&format!("{} ORDER BY registered_at DESC, customer_id DESC", SELECT_CUSTOMER))
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|r| r.split().0).collect())
    }

    pub async fn update_profile(
        &self,
        customer_id: i64,
        full_name: &str,
        phone: &str,
        email: &str,
    ) -> DbResult<Customer> {
        self.ensure_unique(email, phone, Some(customer_id)).await?;

        let result = sqlx::query(
            "UPDATE customers SET full_name = ?1, phone = ?2, email = ?3 WHERE customer_id = ?4",
        )
        .bind(full_name)
        .bind(phone)
        .bind(email)
        .bind(customer_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", customer_id));
        }

        debug!(customer_id, "Profile updated");
        self.get_by_id(customer_id)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", customer_id))
    }

    pub async fn update_password_hash(&self, customer_id: i64, password_hash: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE customers SET password_hash = ?1 WHERE customer_id = ?2")
            .bind(password_hash)
            .bind(customer_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", customer_id));
        }
        info!(customer_id, "Password changed");
        Ok(())
    }

    pub async fn set_role(&self, customer_id: i64, role: Role) -> DbResult<()> {
        let result = sqlx::query("UPDATE customers SET role = ?1 WHERE customer_id = ?2")
            .bind(role)
            .bind(customer_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", customer_id));
        }
        info!(customer_id, role = %role, "Role updated");
        Ok(())
    }

    /// Counts accounts, optionally restricted to one role.
    pub async fn count(&self, role: Option<Role>) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM customers WHERE ?1 IS NULL OR role = ?1")
                .bind(role)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}
