//! crates/outreach_core/src/sanitizer.rs
//!
//! Reduces arbitrary operator text to a form that is inert inside the
//! generated launcher and program.

use serde::{Deserialize, Serialize};

/// Longest text kept, in characters. Applied before any other rule.
pub const MAX_SANITIZED_CHARS: usize = 4000;

/// Characters a `cmd.exe` line treats as syntax.
const SHELL_DENYLIST: [char; 7] = ['"', '%', '|', '<', '>', '&', '^'];

/// Where the sanitized text is going to end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SanitizeMode {
    /// A single launcher line such as an `echo`. Newlines fold into spaces
    /// and every shell metacharacter in the denylist is dropped.
    ShellLine,
    /// Text for a string literal of the generated program. Newlines survive
    /// and double quotes become single quotes. Backslashes are kept; the
    /// program renderer escapes them.
    ScriptLiteral,
}

/// Sanitizes `text` for `mode`. Never fails: input with nothing printable
/// left yields an empty string. Applying it twice gives the same result as
/// applying it once.
pub fn sanitize(text: &str, mode: SanitizeMode) -> String {
    let mut mapped = String::with_capacity(text.len().min(MAX_SANITIZED_CHARS * 4));
    let mut chars = text.chars().take(MAX_SANITIZED_CHARS).peekable();

    while let Some(c) = chars.next() {
        let c = match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                '\n'
            }
            '\u{2028}' | '\u{2029}' | '\u{85}' => '\n',
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' | '\u{2032}' | '\u{2035}' => '\'',
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' | '\u{2033}' | '\u{00AB}'
            | '\u{00BB}' => '"',
            c if is_invisible(c) => continue,
            '\n' => '\n',
            c if c.is_whitespace() => ' ',
            c if c.is_control() => continue,
            c => c,
        };

        match (mode, c) {
            (SanitizeMode::ShellLine, '\n') => mapped.push(' '),
            (SanitizeMode::ShellLine, c) if SHELL_DENYLIST.contains(&c) => {}
            (SanitizeMode::ScriptLiteral, '"') => mapped.push('\''),
            (_, c) => mapped.push(c),
        }
    }

    collapse_whitespace(&mapped)
}

/// Zero-width and bidirectional formatting characters.
fn is_invisible(c: char) -> bool {
    matches!(
        c,
        '\u{200B}'..='\u{200F}' | '\u{202A}'..='\u{202E}' | '\u{2060}'..='\u{2064}'
            | '\u{2066}'..='\u{2069}' | '\u{FEFF}' | '\u{00AD}'
    )
}

/// Collapses space runs, trims every line, keeps at most one blank line
/// between paragraphs and trims the whole text.
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_newlines = 0usize;

    for line in text.split('\n') {
        let mut collapsed = String::with_capacity(line.len());
        for word in line.split(' ').filter(|word| !word.is_empty()) {
            if !collapsed.is_empty() {
                collapsed.push(' ');
            }
            collapsed.push_str(word);
        }

        if collapsed.is_empty() {
            pending_newlines += 1;
            continue;
        }
        if !out.is_empty() {
            for _ in 0..(pending_newlines + 1).min(2) {
                out.push('\n');
            }
        }
        out.push_str(&collapsed);
        pending_newlines = 0;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_shell_line_drops_metacharacters() {
        assert_eq!(
            sanitize(r#"Pago 50% "hoy" & <ya> | ^fin"#, SanitizeMode::ShellLine),
            "Pago 50 hoy ya fin"
        );
    }

    #[test]
    fn test_shell_line_folds_newlines() {
        assert_eq!(sanitize("Hola\r\n\r\n  mundo\n", SanitizeMode::ShellLine), "Hola mundo");
    }

    #[test]
    fn test_script_literal_keeps_paragraphs() {
        let text = "  Hola   Ana!\n\n\n\n Promo 20%  \n";
        assert_eq!(sanitize(text, SanitizeMode::ScriptLiteral), "Hola Ana!\n\nPromo 20%");
    }

    #[test]
    fn test_script_literal_cannot_close_a_literal() {
        let text = "fin\"\"\" + os.system('x') \\ \u{201C}cita\u{201D}";
        let out = sanitize(text, SanitizeMode::ScriptLiteral);
        assert!(!out.contains('"'));
        assert_eq!(out, "fin''' + os.system('x') \\ 'cita'");
    }

    #[test]
    fn test_script_literal_keeps_backslashes() {
        assert_eq!(sanitize(r"100% \ off", SanitizeMode::ScriptLiteral), r"100% \ off");
        assert_eq!(sanitize(r"C:\ruta\n", SanitizeMode::ScriptLiteral), r"C:\ruta\n");
    }

    #[test]
    fn test_smart_single_quotes_become_plain() {
        assert_eq!(sanitize("it\u{2019}s", SanitizeMode::ShellLine), "it's");
    }

    #[test]
    fn test_control_and_invisible_characters_are_removed() {
        let text = "a\u{0}b\u{1b}[31mc\u{200B}d\u{202E}e\tf";
        assert_eq!(sanitize(text, SanitizeMode::ScriptLiteral), "ab[31mcde f");
    }

    #[test]
    fn test_nothing_printable_yields_empty() {
        assert_eq!(sanitize("\u{0}\u{7}\n\t  \u{FEFF}", SanitizeMode::ShellLine), "");
        assert_eq!(sanitize("\"%&", SanitizeMode::ShellLine), "");
    }

    #[test]
    fn test_truncates_before_processing() {
        let text = "x".repeat(MAX_SANITIZED_CHARS + 50);
        assert_eq!(sanitize(&text, SanitizeMode::ShellLine).chars().count(), MAX_SANITIZED_CHARS);

        let padded = format!("{}{}", " ".repeat(MAX_SANITIZED_CHARS), "hidden");
        assert_eq!(sanitize(&padded, SanitizeMode::ScriptLiteral), "");
    }

    #[test]
    fn test_accents_survive() {
        assert_eq!(
            sanitize("José Núñez, ¿cómo estás?", SanitizeMode::ScriptLiteral),
            "José Núñez, ¿cómo estás?"
        );
    }

    proptest! {
        #[test]
        fn prop_sanitize_is_idempotent(text in any::<String>()) {
            for mode in [SanitizeMode::ShellLine, SanitizeMode::ScriptLiteral] {
                let once = sanitize(&text, mode);
                prop_assert_eq!(sanitize(&once, mode), once);
            }
        }

        #[test]
        fn prop_shell_line_is_inert(text in any::<String>()) {
            let out = sanitize(&text, SanitizeMode::ShellLine);
            prop_assert!(!out.chars().any(|c| SHELL_DENYLIST.contains(&c)));
            prop_assert!(!out.chars().any(|c| c.is_control()));
            prop_assert!(out.chars().count() <= MAX_SANITIZED_CHARS);
        }

        #[test]
        fn prop_script_literal_is_inert(text in any::<String>()) {
            let out = sanitize(&text, SanitizeMode::ScriptLiteral);
            prop_assert!(!out.contains('"'));
            prop_assert!(!out.chars().any(|c| c.is_control() && c != '\n'));
            prop_assert!(!out.contains("\n\n\n"));
        }
    }
}
