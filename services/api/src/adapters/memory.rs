//! services/api/src/adapters/memory.rs
//!
//! An in-memory `ContactStore`, used when no database is configured and in
//! tests. Contacts keep their insertion order.

use async_trait::async_trait;
use outreach_core::domain::Contact;
use outreach_core::ports::{ContactStore, PortError, PortResult};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MemoryContactStore {
    contacts: RwLock<Vec<Contact>>,
}

impl MemoryContactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contacts(contacts: Vec<Contact>) -> Self {
        Self {
            contacts: RwLock::new(contacts),
        }
    }
}

#[async_trait]
impl ContactStore for MemoryContactStore {
    async fn list_contacts(&self) -> PortResult<Vec<Contact>> {
        Ok(self.contacts.read().await.clone())
    }

    async fn get_contacts(&self, ids: &[String]) -> PortResult<Vec<Contact>> {
        let contacts = self.contacts.read().await;
        ids.iter()
            .map(|id| {
                contacts
                    .iter()
                    .find(|contact| &contact.id == id)
                    .cloned()
                    .ok_or_else(|| PortError::NotFound(format!("contact {id}")))
            })
            .collect()
    }

    async fn save_contacts(&self, incoming: &[Contact]) -> PortResult<()> {
        let mut contacts = self.contacts.write().await;
        for contact in incoming {
            match contacts.iter_mut().find(|existing| existing.id == contact.id) {
                Some(existing) => *existing = contact.clone(),
                None => contacts.push(contact.clone()),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outreach_core::domain::ContactStatus;

    fn contact(id: &str, name: &str) -> Contact {
        Contact {
            id: id.into(),
            name: name.into(),
            phone: "+51987654321".into(),
            message: "Hola".into(),
            company: None,
            email: None,
            status: ContactStatus::Pending,
        }
    }

    #[tokio::test]
    async fn test_save_replaces_by_id_and_keeps_order() {
        let store = MemoryContactStore::new();
        store
            .save_contacts(&[contact("a", "Ana"), contact("b", "Beto")])
            .await
            .unwrap();
        store.save_contacts(&[contact("a", "Ana Ruiz")]).await.unwrap();

        let all = store.list_contacts().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "Ana Ruiz");
        assert_eq!(all[1].id, "b");
    }

    #[tokio::test]
    async fn test_get_follows_requested_order() {
        let store = MemoryContactStore::with_contacts(vec![contact("a", "Ana"), contact("b", "Beto")]);
        let picked = store.get_contacts(&["b".into(), "a".into()]).await.unwrap();
        assert_eq!(picked[0].id, "b");
        assert_eq!(picked[1].id, "a");

        let missing = store.get_contacts(&["c".into()]).await;
        assert!(matches!(missing, Err(PortError::NotFound(_))));
    }
}
