//! crates/outreach_core/src/normalizer.rs
//!
//! Turns heterogeneous contact-like records into canonical `Contact`s.
//! Records are resolved independently: a bad record is reported and
//! skipped, it never aborts the batch.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::domain::{Contact, ContactStatus, RawContact};

/// Placeholder body for contacts that arrive without a message.
pub const DEFAULT_MESSAGE: &str = "Hola, te envío un mensaje.";
/// Longest stored message, in characters.
pub const MAX_STORED_MESSAGE_CHARS: usize = 4000;
pub const MIN_PHONE_DIGITS: usize = 8;
pub const MAX_PHONE_DIGITS: usize = 19;

// Aliases are probed in order; the first one holding a non-empty value wins.
const ID_ALIASES: &[&str] = &["id", "contact_id", "uuid"];
const NAME_ALIASES: &[&str] = &[
    "name", "nombre", "full_name", "inquilino", "cliente", "contact_name", "display_name",
];
const PHONE_ALIASES: &[&str] = &[
    "phone", "telefono", "teléfono", "telephone", "numero_telefono", "numero", "número", "number",
    "celular", "mobile", "whatsapp",
];
const MESSAGE_ALIASES: &[&str] = &["message", "mensaje", "texto", "text", "contenido", "content", "body"];
const COMPANY_ALIASES: &[&str] = &["company", "empresa", "organization", "organizacion"];
const EMAIL_ALIASES: &[&str] = &["email", "correo", "mail", "e_mail"];
const STATUS_ALIASES: &[&str] = &["status", "estado", "estatus", "estatus_envio"];

/// Messages longer than this, in characters, draw a warning.
pub const LONG_MESSAGE_CHARS: usize = 500;

/// Country calling codes recognized on bare digit strings, with the minimum
/// digit count that marks the prefix as already present.
const KNOWN_COUNTRY_CODES: &[(&str, usize)] = &[
    ("51", 11),
    ("52", 12),
    ("54", 11),
    ("34", 11),
    ("1", 10),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Calling code prepended when a number carries none, digits only.
    pub default_country_prefix: String,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            default_country_prefix: "51".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Id,
    Name,
    Phone,
    Message,
    Company,
    Email,
    Status,
}

/// A record that could not be turned into a contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    /// Position of the record in the input batch.
    pub index: usize,
    pub reasons: Vec<String>,
}

/// A repair applied to an accepted record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordWarning {
    pub index: usize,
    pub field: Field,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedBatch {
    pub valid: Vec<Contact>,
    pub rejected: Vec<Rejection>,
    pub warnings: Vec<RecordWarning>,
    sources: Vec<usize>,
}

impl NormalizedBatch {
    /// Input position of the `position`-th valid contact.
    pub fn source_index(&self, position: usize) -> Option<usize> {
        self.sources.get(position).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixOrigin {
    /// The input started with `+`.
    Explicit,
    /// The digits already began with a known calling code.
    Recognized,
    /// The configured default prefix was prepended.
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPhone {
    pub number: String,
    pub origin: PrefixOrigin,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PhoneError {
    #[error("missing phone")]
    Missing,
    #[error("invalid phone length: {digits} digits (expected between 8 and 19)")]
    InvalidLength { digits: usize },
}

/// Normalizes a phone number to `+<digits>`.
///
/// Everything but digits and a leading `+` is stripped. A number without
/// `+` keeps a recognized country code or gets `default_prefix`. The result
/// must hold between 8 and 19 digits.
pub fn normalize_phone(input: &str, default_prefix: &str) -> Result<NormalizedPhone, PhoneError> {
    let trimmed = input.trim();
    let explicit = trimmed.starts_with('+');
    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return Err(PhoneError::Missing);
    }

    let (full, origin) = if explicit {
        (digits, PrefixOrigin::Explicit)
    } else if KNOWN_COUNTRY_CODES
        .iter()
        .any(|(code, min_len)| digits.starts_with(code) && digits.len() >= *min_len)
    {
        (digits, PrefixOrigin::Recognized)
    } else {
        let prefix: String = default_prefix.chars().filter(char::is_ascii_digit).collect();
        (format!("{prefix}{digits}"), PrefixOrigin::Default)
    };

    let count = full.len();
    if !(MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&count) {
        return Err(PhoneError::InvalidLength { digits: count });
    }

    Ok(NormalizedPhone {
        number: format!("+{full}"),
        origin,
    })
}

/// Lowercases a field name and drops spaces, underscores and dashes, so
/// `Full Name`, `full_name` and `fullname` all match.
fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Renders a scalar as text. Numbers are accepted because spreadsheet
/// imports store phones as numbers.
fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => match (number.as_u64(), number.as_i64(), number.as_f64()) {
            (Some(n), _, _) => n.to_string(),
            (None, Some(n), _) => n.to_string(),
            (None, None, Some(f)) if f.fract() == 0.0 && f.abs() < 1e19 => format!("{f:.0}"),
            _ => number.to_string(),
        },
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn resolve(record: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    aliases.iter().find_map(|alias| {
        let wanted = normalize_key(alias);
        record
            .iter()
            .filter(|(key, _)| normalize_key(key) == wanted)
            .find_map(|(_, value)| scalar_text(value))
    })
}

fn truncate_chars(text: &str, max: usize) -> Option<String> {
    text.char_indices().nth(max).map(|(cut, _)| text[..cut].to_string())
}

/// Normalizes a batch of raw records, preserving input order.
pub fn normalize(raw: &[RawContact], options: &NormalizeOptions) -> NormalizedBatch {
    let mut batch = NormalizedBatch::default();
    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut seen_phones: HashSet<String> = HashSet::new();

    for (index, value) in raw.iter().enumerate() {
        let Some(record) = value.as_object() else {
            batch.rejected.push(Rejection {
                index,
                reasons: vec!["record is not an object".to_string()],
            });
            continue;
        };

        let phone = match resolve(record, PHONE_ALIASES)
            .ok_or(PhoneError::Missing)
            .and_then(|text| normalize_phone(&text, &options.default_country_prefix))
        {
            Ok(phone) => phone,
            Err(err) => {
                batch.rejected.push(Rejection {
                    index,
                    reasons: vec![err.to_string()],
                });
                continue;
            }
        };

        let mut warn = |field: Field, message: String| {
            batch.warnings.push(RecordWarning { index, field, message });
        };

        if phone.origin == PrefixOrigin::Default {
            warn(
                Field::Phone,
                format!("country prefix +{} assumed", options.default_country_prefix),
            );
        }
        if !seen_phones.insert(phone.number.clone()) {
            warn(Field::Phone, format!("phone {} appears more than once", phone.number));
        }

        let name = resolve(record, NAME_ALIASES).unwrap_or_else(|| {
            warn(Field::Name, "name missing; placeholder used".to_string());
            format!("Contacto {}", index + 1)
        });

        let message = match resolve(record, MESSAGE_ALIASES) {
            Some(text) => match truncate_chars(&text, MAX_STORED_MESSAGE_CHARS) {
                Some(cut) => {
                    warn(
                        Field::Message,
                        format!("message truncated to {MAX_STORED_MESSAGE_CHARS} characters"),
                    );
                    cut
                }
                None => text,
            },
            None => {
                warn(Field::Message, "message missing; default placeholder used".to_string());
                DEFAULT_MESSAGE.to_string()
            }
        };
        if message.chars().count() > LONG_MESSAGE_CHARS {
            warn(
                Field::Message,
                format!("message is longer than {LONG_MESSAGE_CHARS} characters"),
            );
        }
        if !message.is_ascii() {
            warn(Field::Message, "message contains non-ASCII text".to_string());
        }

        let email = resolve(record, EMAIL_ALIASES).and_then(|email| {
            if email.contains('@') {
                Some(email)
            } else {
                warn(Field::Email, format!("ignored malformed email '{email}'"));
                None
            }
        });

        let status = match resolve(record, STATUS_ALIASES) {
            Some(label) => ContactStatus::parse(&label).unwrap_or_else(|| {
                warn(Field::Status, format!("unknown status '{label}'; treated as pending"));
                ContactStatus::Pending
            }),
            None => ContactStatus::Pending,
        };

        let mut id = resolve(record, ID_ALIASES).unwrap_or_else(|| format!("contact-{}", index + 1));
        if seen_ids.contains(&id) {
            let original = id.clone();
            let mut suffix = index + 1;
            while seen_ids.contains(&id) {
                id = format!("{original}-{suffix}");
                suffix += 1;
            }
            warn(Field::Id, format!("duplicate id '{original}' renamed to '{id}'"));
        }
        seen_ids.insert(id.clone());

        batch.valid.push(Contact {
            id,
            name,
            phone: phone.number,
            message,
            company: resolve(record, COMPANY_ALIASES),
            email,
            status,
        });
        batch.sources.push(index);
    }

    batch
}
