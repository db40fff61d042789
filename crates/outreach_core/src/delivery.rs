//! crates/outreach_core/src/delivery.rs
//!
//! Support for the in-browser fallback orchestrator: a per-contact plan of
//! deep links and waits. The orchestrator itself is an external
//! collaborator; nothing here opens windows or sends messages.

use rand::Rng;
use serde::Serialize;

use crate::domain::Contact;
use crate::personalize::{deep_link, personalize};
use crate::policy::Policy;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedDelivery {
    pub contact_id: String,
    pub name: String,
    pub phone: String,
    pub url: String,
    /// Pause before the next contact. `None` after the last one.
    pub wait_after_ms: Option<u64>,
}

/// Plans deliveries for `contacts` in input order, with waits sampled from
/// the policy's delay range.
pub fn plan_deliveries<R: Rng + ?Sized>(
    contacts: &[Contact],
    policy: &Policy,
    client_url: &str,
    rng: &mut R,
) -> Vec<PlannedDelivery> {
    let last = contacts.len().saturating_sub(1);
    contacts
        .iter()
        .enumerate()
        .map(|(index, contact)| {
            let message = personalize(&contact.name, &contact.message);
            let wait_after_ms = if index < last {
                Some(u64::try_from(policy.delay.sample(&mut *rng).as_millis()).unwrap_or(u64::MAX))
            } else {
                None
            };
            PlannedDelivery {
                contact_id: contact.id.clone(),
                name: contact.name.clone(),
                phone: contact.phone.clone(),
                url: deep_link(client_url, &contact.phone, &message),
                wait_after_ms,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ContactStatus, DEFAULT_CLIENT_URL};
    use crate::policy::{policy_for, SpeedTier};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn contact(id: &str, name: &str) -> Contact {
        Contact {
            id: id.into(),
            name: name.into(),
            phone: "+51987654321".into(),
            message: "Promo 20%".into(),
            company: None,
            email: None,
            status: ContactStatus::Pending,
        }
    }

    #[test]
    fn test_plan_waits_between_contacts_only() {
        let contacts = [contact("a", "Ana"), contact("b", "Beto"), contact("c", "Caro")];
        let policy = policy_for(SpeedTier::Slow);
        let mut rng = StdRng::seed_from_u64(1);
        let plan = plan_deliveries(&contacts, &policy, DEFAULT_CLIENT_URL, &mut rng);

        let ids: Vec<&str> = plan.iter().map(|p| p.contact_id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        for planned in &plan[..2] {
            let wait = planned.wait_after_ms.unwrap();
            assert!((5_000..=8_000).contains(&wait), "wait {wait} out of range");
        }
        assert_eq!(plan[2].wait_after_ms, None);
    }

    #[test]
    fn test_plan_url_carries_personalized_text() {
        let mut rng = StdRng::seed_from_u64(1);
        let plan = plan_deliveries(
            &[contact("a", "Ana")],
            &policy_for(SpeedTier::Normal),
            DEFAULT_CLIENT_URL,
            &mut rng,
        );
        assert_eq!(
            plan[0].url,
            "https://web.whatsapp.com/send?phone=51987654321&text=Hola%20Ana%21%0A%0APromo%2020%25"
        );
        assert_eq!(plan[0].wait_after_ms, None);
    }

    #[test]
    fn test_empty_plan() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(plan_deliveries(&[], &policy_for(SpeedTier::Fast), DEFAULT_CLIENT_URL, &mut rng).is_empty());
    }
}
