//! services/api/src/adapters/db.rs
//!
//! The PostgreSQL implementation of the `ContactStore` port, using `sqlx`.

use std::collections::HashMap;

use async_trait::async_trait;
use outreach_core::domain::{Contact, ContactStatus};
use outreach_core::ports::{ContactStore, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use tracing::{debug, warn};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `ContactStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs the bundled migrations. Called once at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn db_error(e: sqlx::Error) -> PortError {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            PortError::Unavailable(e.to_string())
        }
        other => PortError::Unexpected(other.to_string()),
    }
}

//=========================================================================================
// Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct ContactRecord {
    id: String,
    name: String,
    phone: String,
    message: String,
    company: Option<String>,
    email: Option<String>,
    status: String,
}

impl ContactRecord {
    fn to_domain(self) -> Contact {
        let status = ContactStatus::parse(&self.status).unwrap_or_else(|| {
            warn!(id = %self.id, status = %self.status, "Unknown stored status, treating as pending.");
            ContactStatus::Pending
        });
        Contact {
            id: self.id,
            name: self.name,
            phone: self.phone,
            message: self.message,
            company: self.company,
            email: self.email,
            status,
        }
    }
}

const SELECT_CONTACTS: &str =
    "SELECT id, name, phone, message, company, email, status FROM contacts";

//=========================================================================================
// `ContactStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl ContactStore for DbAdapter {
    async fn list_contacts(&self) -> PortResult<Vec<Contact>> {
        let records = sqlx::query_as::<_, ContactRecord>(&format!("{SELECT_CONTACTS} ORDER BY created_at, id"))
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(records.into_iter().map(ContactRecord::to_domain).collect())
    }

    async fn get_contacts(&self, ids: &[String]) -> PortResult<Vec<Contact>> {
        let records = sqlx::query_as::<_, ContactRecord>(&format!("{SELECT_CONTACTS} WHERE id = ANY($1)"))
            .bind(ids.to_vec())
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        let by_id: HashMap<String, Contact> = records
            .into_iter()
            .map(|record| (record.id.clone(), record.to_domain()))
            .collect();

        // The query does not preserve the caller's order.
        ids.iter()
            .map(|id| {
                by_id
                    .get(id)
                    .cloned()
                    .ok_or_else(|| PortError::NotFound(format!("contact {id}")))
            })
            .collect()
    }

    async fn save_contacts(&self, contacts: &[Contact]) -> PortResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        for contact in contacts {
            sqlx::query(
                "INSERT INTO contacts (id, name, phone, message, company, email, status) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7) \
                 ON CONFLICT (id) DO UPDATE SET \
                 name = EXCLUDED.name, phone = EXCLUDED.phone, message = EXCLUDED.message, \
                 company = EXCLUDED.company, email = EXCLUDED.email, status = EXCLUDED.status, \
                 updated_at = now()",
            )
            .bind(&contact.id)
            .bind(&contact.name)
            .bind(&contact.phone)
            .bind(&contact.message)
            .bind(&contact.company)
            .bind(&contact.email)
            .bind(contact.status.as_str())
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        }
        tx.commit().await.map_err(db_error)?;
        debug!(count = contacts.len(), "Contacts saved.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: &str) -> ContactRecord {
        ContactRecord {
            id: "c1".into(),
            name: "Ana Ruiz".into(),
            phone: "+51987654321".into(),
            message: "Promo 20%".into(),
            company: None,
            email: Some("ana@example.test".into()),
            status: status.into(),
        }
    }

    #[test]
    fn test_record_maps_to_domain_contact() {
        let contact = record("SENT").to_domain();
        assert_eq!(contact.id, "c1");
        assert_eq!(contact.phone, "+51987654321");
        assert_eq!(contact.email.as_deref(), Some("ana@example.test"));
        assert_eq!(contact.status, ContactStatus::Sent);
    }

    #[test]
    fn test_unknown_stored_status_is_pending() {
        assert_eq!(record("archivado").to_domain().status, ContactStatus::Pending);
    }

    #[test]
    fn test_select_reads_only_mapped_columns() {
        assert_eq!(
            SELECT_CONTACTS,
            "SELECT id, name, phone, message, company, email, status FROM contacts"
        );
    }
}
