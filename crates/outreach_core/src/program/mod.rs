//! crates/outreach_core/src/program/mod.rs
//!
//! The automation program synthesizer: validated contacts plus a
//! generation config in, program source out.

pub mod ast;
pub mod python;
pub mod selftest;

use crate::domain::{Contact, GenerationConfig};
use crate::personalize::personalize;

use ast::{Delivery, Header, LaunchBrowser, Program, SendLoop, SendStrategy, Settings, Step, WaitReady};

pub const PROGRAM_TITLE: &str = "WhatsApp Sender Automatico";

const LAUNCH_FLAGS: &[&str] = &[
    "--start-maximized",
    "--disable-dev-shm-usage",
    "--no-sandbox",
    "--disable-notifications",
    "--disable-blink-features=AutomationControlled",
    "--disable-infobars",
    "--no-first-run",
    "--no-default-browser-check",
    "--disable-popup-blocking",
];

const PROFILE_DIR: &str = "WhatsAppSender_Profile";

const READY_MARKERS: &[&str] = &["//div[@id='pane-side']", "//div[@data-testid='chat-list']"];

fn send_strategies() -> Vec<SendStrategy> {
    let click = |xpath: &str| SendStrategy::Click { xpath: xpath.to_string() };
    let submit = |xpath: &str| SendStrategy::SubmitEditable { xpath: xpath.to_string() };
    vec![
        click("//span[@data-icon='send']"),
        click("//span[@data-icon='send']/parent::button"),
        click("//button[@aria-label='Enviar']"),
        click("//button[@aria-label='Send']"),
        submit("//footer//div[@contenteditable='true']"),
        submit("//div[@contenteditable='true'][@data-tab='10']"),
    ]
}

/// Builds the program description for `contacts`, which must already be
/// normalized and sanitized.
pub fn build_program(contacts: &[Contact], config: &GenerationConfig) -> Program {
    let deliveries = contacts
        .iter()
        .map(|contact| Delivery {
            contact_id: contact.id.clone(),
            name: contact.name.clone(),
            phone: contact.phone.clone(),
            message: personalize(&contact.name, &contact.message),
        })
        .collect();

    Program {
        header: Header {
            title: PROGRAM_TITLE.to_string(),
            generated_at: config.timestamp,
            speed_label: config.speed_tier.label().to_string(),
        },
        settings: Settings {
            client_url: config.client_url.clone(),
            delay: config.delay,
            retry: config.retry_policy,
            timeouts: config.timeouts,
        },
        steps: vec![
            Step::LaunchBrowser(LaunchBrowser {
                flags: LAUNCH_FLAGS.iter().map(|flag| flag.to_string()).collect(),
                excluded_switches: vec!["enable-automation".to_string()],
                profile_dir: PROFILE_DIR.to_string(),
            }),
            Step::OpenClient,
            Step::WaitReady(WaitReady {
                markers: READY_MARKERS.iter().map(|marker| marker.to_string()).collect(),
            }),
            Step::SendLoop(SendLoop {
                deliveries,
                strategies: send_strategies(),
            }),
            Step::Summary,
        ],
    }
}

/// Produces the program source for `contacts`.
pub fn synthesize_program(contacts: &[Contact], config: &GenerationConfig) -> String {
    python::render(&build_program(contacts, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ContactStatus;
    use chrono::{TimeZone, Utc};

    fn contact(id: &str, name: &str, phone: &str, message: &str) -> Contact {
        Contact {
            id: id.into(),
            name: name.into(),
            phone: phone.into(),
            message: message.into(),
            company: None,
            email: None,
            status: ContactStatus::Pending,
        }
    }

    fn config(tier: &str) -> GenerationConfig {
        GenerationConfig::new(tier, Utc.with_ymd_and_hms(2026, 10, 17, 14, 3, 22).unwrap())
    }

    #[test]
    fn test_steps_are_in_execution_order() {
        let program = build_program(&[], &config("Normal (3-5s)"));
        let names: Vec<&str> = program.steps.iter().map(Step::name).collect();
        assert_eq!(
            names,
            ["launch_browser", "open_client", "wait_ready", "send_loop", "summary"]
        );
    }

    #[test]
    fn test_program_embeds_tier_and_personalized_message() {
        let source = synthesize_program(
            &[contact("c1", "Ana Ruiz", "+51987654321", "Promo 20%")],
            &config("Normal (3-5s)"),
        );
        assert!(source.contains("DELAY_MIN = 3\n"));
        assert!(source.contains("DELAY_MAX = 5\n"));
        assert!(source.contains("\"message\": \"Hola Ana Ruiz!\\n\\nPromo 20%\","));
        assert!(source.contains("\"phone\": \"+51987654321\","));
        assert!(source.contains("GENERATED_AT = \"2026-10-17T14:03:22Z\""));
    }

    #[test]
    fn test_contacts_keep_input_order() {
        let source = synthesize_program(
            &[
                contact("b", "Beto", "+51911111111", "Hola"),
                contact("a", "Alma", "+51922222222", "Hola"),
            ],
            &config("Lenta (5-8s)"),
        );
        let beto = source.find("\"Beto\"").unwrap();
        let alma = source.find("\"Alma\"").unwrap();
        assert!(beto < alma);
        assert!(source.contains("DELAY_MIN = 5\n"));
    }

    #[test]
    fn test_five_contacts_keep_input_order() {
        let names = ["Zoe", "Ana", "Marco", "Beto", "Luz"];
        let contacts: Vec<Contact> = names
            .iter()
            .enumerate()
            .map(|(i, name)| contact(&format!("c{i}"), name, &format!("+5198765432{i}"), "Hola"))
            .collect();
        let source = synthesize_program(&contacts, &config("Normal"));

        let positions: Vec<usize> = names
            .iter()
            .map(|name| source.find(&format!("\"name\": \"{name}\"")).unwrap())
            .collect();
        for pair in positions.windows(2) {
            assert!(pair[0] < pair[1], "contacts reordered: {positions:?}");
        }
    }

    #[test]
    fn test_program_is_ascii_even_with_accents() {
        let source = synthesize_program(
            &[contact("c1", "Núñez 😀", "+51987654321", "¿Cómo estás?")],
            &config("Rápida (2-3s)"),
        );
        assert!(source.is_ascii());
        assert!(source.contains("SPEED_LABEL = \"R\\xe1pida (2-3s)\""));
        assert!(source.contains("N\\xfa\\xf1ez \\U0001f600"));
    }

    #[test]
    fn test_program_structure() {
        let source = synthesize_program(&[], &config("Normal"));
        let order = [
            "LAUNCH_FLAGS = [",
            "def launch_browser():",
            "def open_client(driver):",
            "READY_MARKERS = [\"//div[@id='pane-side']\"",
            "def wait_until_ready(driver):",
            "SEND_STRATEGIES = [",
            "def send_all(driver):",
            "def manual_hand_off():",
            "def print_summary(sent, failed):",
            "def main():",
            "if __name__ == \"__main__\":",
        ];
        let mut last = 0;
        for marker in order {
            let at = source[last..]
                .find(marker)
                .unwrap_or_else(|| panic!("missing or out of order: {marker}"));
            last += at;
        }
        assert!(source.contains("\"--disable-blink-features=AutomationControlled\","));
        assert!(source.contains("(\"click\", \"//button[@aria-label='Enviar']\"),"));
        assert!(source.contains("(\"enter\", \"//footer//div[@contenteditable='true']\"),"));
        assert!(source.contains("if index < total - 1:"));
    }

    #[test]
    fn test_client_url_override() {
        let cfg = config("Normal").with_client_url("https://example.test/");
        let source = synthesize_program(&[], &cfg);
        assert!(source.contains("CLIENT_URL = \"https://example.test\""));
    }
}
