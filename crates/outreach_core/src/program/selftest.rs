//! crates/outreach_core/src/program/selftest.rs
//!
//! The self-test program bundled with the diagnostics artifact. Every check
//! prints fixed text, so the transcript of a run depends only on which
//! checks passed.

use chrono::{DateTime, Utc};

use super::python::{console_setup, entrypoint, preamble, py_str, py_str_list, SourceWriter};
use crate::program::ast::Header;

pub const SELF_TEST_TITLE: &str = "AUTODIAGNOSTICO WhatsApp Sender";

const RULE: &str = "============================================================";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckProbe {
    InterpreterVersion { major: u32, minor: u32 },
    PipAvailable,
    ModuleImportable { module: String },
    BrowserLaunchable,
    HostReachable { host: String, port: u16 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelfCheck {
    pub title: String,
    pub probe: CheckProbe,
    pub pass_line: String,
    pub fail_line: String,
    pub remedies: Vec<String>,
}

fn check(
    title: &str,
    probe: CheckProbe,
    pass_line: &str,
    fail_line: &str,
    remedies: &[&str],
) -> SelfCheck {
    SelfCheck {
        title: title.to_string(),
        probe,
        pass_line: pass_line.to_string(),
        fail_line: fail_line.to_string(),
        remedies: remedies.iter().map(|remedy| remedy.to_string()).collect(),
    }
}

/// The checks every diagnostics artifact runs, in order.
pub fn standard_checks(client_host: &str) -> Vec<SelfCheck> {
    vec![
        check(
            "[1/6] Interprete de Python",
            CheckProbe::InterpreterVersion { major: 3, minor: 8 },
            "OK: Python 3.8 o superior",
            "FALLO: se necesita Python 3.8 o superior",
            &[
                "Descarga Python desde https://python.org/downloads",
                "Marca 'Add Python to PATH' durante la instalacion",
            ],
        ),
        check(
            "[2/6] Gestor de paquetes pip",
            CheckProbe::PipAvailable,
            "OK: pip disponible",
            "FALLO: pip no esta disponible",
            &["Ejecuta: python -m ensurepip --upgrade"],
        ),
        check(
            "[3/6] Libreria selenium",
            CheckProbe::ModuleImportable { module: "selenium".to_string() },
            "OK: selenium instalado",
            "FALLO: selenium no esta instalado",
            &["Ejecuta: python -m pip install selenium"],
        ),
        check(
            "[4/6] Libreria webdriver-manager",
            CheckProbe::ModuleImportable { module: "webdriver_manager".to_string() },
            "OK: webdriver-manager instalado",
            "FALLO: webdriver-manager no esta instalado",
            &["Ejecuta: python -m pip install webdriver-manager"],
        ),
        check(
            "[5/6] Navegador Chrome",
            CheckProbe::BrowserLaunchable,
            "OK: Chrome se puede iniciar",
            "FALLO: no se pudo iniciar Chrome",
            &[
                "Instala o actualiza Google Chrome desde https://www.google.com/chrome",
                "Cierra otras ventanas de Chrome controladas por automatizacion",
            ],
        ),
        check(
            "[6/6] Conexion al cliente web",
            CheckProbe::HostReachable {
                host: client_host.to_string(),
                port: 443,
            },
            "OK: cliente web accesible",
            "FALLO: no se pudo conectar al cliente web",
            &[
                "Verifica tu conexion a internet",
                "Revisa si un firewall o proxy bloquea el acceso",
            ],
        ),
    ]
}

fn probe_body(w: &mut SourceWriter, probe: &CheckProbe) {
    match probe {
        CheckProbe::InterpreterVersion { major, minor } => {
            w.line(format!("return sys.version_info >= ({major}, {minor})"));
        }
        CheckProbe::PipAvailable => {
            w.line("import subprocess");
            w.line("command = [sys.executable, \"-m\", \"pip\", \"--version\"]");
            w.line("devnull = subprocess.DEVNULL");
            w.line("return subprocess.call(command, stdout=devnull, stderr=devnull) == 0");
        }
        CheckProbe::ModuleImportable { module } => {
            w.line("import importlib.util");
            w.line(format!("return importlib.util.find_spec({}) is not None", py_str(module)));
        }
        CheckProbe::BrowserLaunchable => {
            w.line("from selenium import webdriver");
            w.line("from selenium.webdriver.chrome.options import Options");
            w.line("options = Options()");
            w.block(
                "for flag in [\"--headless=new\", \"--no-sandbox\", \"--disable-dev-shm-usage\"]:",
                |w| w.line("options.add_argument(flag)"),
            );
            w.line("driver = webdriver.Chrome(options=options)");
            w.line("driver.quit()");
            w.line("return True");
        }
        CheckProbe::HostReachable { host, port } => {
            w.line("import socket");
            w.line(format!(
                "socket.create_connection(({}, {port}), timeout=5).close()",
                py_str(host)
            ));
            w.line("return True");
        }
    }
}

/// Renders the self-test program for `checks`.
pub fn render_self_test(checks: &[SelfCheck], generated_at: DateTime<Utc>) -> String {
    let mut w = SourceWriter::new();
    preamble(
        &mut w,
        &Header {
            title: SELF_TEST_TITLE.to_string(),
            generated_at,
            speed_label: String::new(),
        },
    );
    w.line("import sys");
    w.blank();
    console_setup(&mut w);
    w.blank();
    w.blank();

    for (index, check) in checks.iter().enumerate() {
        w.block(format!("def check_{}():", index + 1), |w| probe_body(w, &check.probe));
        w.blank();
        w.blank();
    }

    w.block("CHECKS = [", |w| {
        for (index, check) in checks.iter().enumerate() {
            w.block("(", |w| {
                w.line(format!("{},", py_str(&check.title)));
                w.line(format!("check_{},", index + 1));
                w.line(format!("{},", py_str(&check.pass_line)));
                w.line(format!("{},", py_str(&check.fail_line)));
                w.line(format!("{},", py_str_list(&check.remedies)));
            });
            w.line("),");
        }
    });
    w.line("]");
    w.blank();
    w.blank();
    w.block("def run_checks():", |w| {
        w.line(format!("print({})", py_str(RULE)));
        w.line(format!("print({})", py_str(SELF_TEST_TITLE)));
        w.line(format!("print({})", py_str(RULE)));
        w.line("passed = 0");
        w.line("failed = 0");
        w.block("for title, probe, pass_line, fail_line, remedies in CHECKS:", |w| {
            w.line("print(title)");
            w.block("try:", |w| w.line("ok = bool(probe())"));
            w.block("except Exception:", |w| w.line("ok = False"));
            w.block("if ok:", |w| {
                w.line("passed += 1");
                w.line("print(\"  \" + pass_line)");
            });
            w.block("else:", |w| {
                w.line("failed += 1");
                w.line("print(\"  \" + fail_line)");
                w.block("for remedy in remedies:", |w| w.line("print(\"    - \" + remedy)"));
            });
        });
        w.line("print()");
        w.line("print(f\"Resultado: {passed} correctas, {failed} con problemas\")");
        w.line("return failed");
    });
    w.blank();
    w.blank();
    entrypoint(&mut w, "sys.exit(1 if run_checks() else 0)");
    w.finish()
}

/// The exact console output of the self-test when check `i` passes iff
/// `outcomes[i]` is true.
pub fn expected_transcript(checks: &[SelfCheck], outcomes: &[bool]) -> String {
    let mut out = String::new();
    let mut line = |text: &str| {
        out.push_str(text);
        out.push('\n');
    };

    line(RULE);
    line(SELF_TEST_TITLE);
    line(RULE);
    let mut passed = 0;
    for (check, ok) in checks.iter().zip(outcomes.iter().copied()) {
        line(&check.title);
        if ok {
            passed += 1;
            line(&format!("  {}", check.pass_line));
        } else {
            line(&format!("  {}", check.fail_line));
            for remedy in &check.remedies {
                line(&format!("    - {remedy}"));
            }
        }
    }
    let failed = checks.len().min(outcomes.len()) - passed;
    line("");
    line(&format!("Resultado: {passed} correctas, {failed} con problemas"));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 17, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_standard_checks_cover_the_runtime() {
        let checks = standard_checks("web.whatsapp.com");
        assert_eq!(checks.len(), 6);
        assert_eq!(checks[0].probe, CheckProbe::InterpreterVersion { major: 3, minor: 8 });
        assert_eq!(
            checks[5].probe,
            CheckProbe::HostReachable { host: "web.whatsapp.com".into(), port: 443 }
        );
        assert!(checks.iter().all(|c| !c.remedies.is_empty()));
    }

    #[test]
    fn test_rendered_self_test_lists_every_check() {
        let checks = standard_checks("web.whatsapp.com");
        let source = render_self_test(&checks, at());
        assert!(source.is_ascii());
        for index in 1..=checks.len() {
            assert!(source.contains(&format!("def check_{index}():")));
        }
        assert!(source.contains("return sys.version_info >= (3, 8)"));
        assert!(source.contains("find_spec(\"webdriver_manager\") is not None"));
        assert!(source.contains("socket.create_connection((\"web.whatsapp.com\", 443), timeout=5)"));
        assert!(source.contains("sys.exit(1 if run_checks() else 0)"));
    }

    #[test]
    fn test_transcript_all_passing() {
        let checks = standard_checks("web.whatsapp.com");
        let transcript = expected_transcript(&checks, &[true; 6]);
        assert!(transcript.starts_with(&format!("{RULE}\n{SELF_TEST_TITLE}\n{RULE}\n")));
        assert!(transcript.contains("[1/6] Interprete de Python\n  OK: Python 3.8 o superior\n"));
        assert!(!transcript.contains("FALLO"));
        assert!(transcript.ends_with("\nResultado: 6 correctas, 0 con problemas\n"));
    }

    #[test]
    fn test_transcript_with_failures_lists_remedies() {
        let checks = standard_checks("web.whatsapp.com");
        let outcomes = [true, true, false, true, true, false];
        let transcript = expected_transcript(&checks, &outcomes);
        assert!(transcript.contains(
            "[3/6] Libreria selenium\n  FALLO: selenium no esta instalado\n    - Ejecuta: python -m pip install selenium\n"
        ));
        assert!(transcript.contains("    - Verifica tu conexion a internet\n"));
        assert!(transcript.ends_with("Resultado: 4 correctas, 2 con problemas\n"));
    }

    /// Finds the statement of the rendered program that prints `line`.
    fn printed_by(source: &str, line: &str) -> bool {
        if line.is_empty() {
            return source.contains("print()\n");
        }
        if let Some(counts) = line.strip_prefix("Resultado: ") {
            let (passed, rest) = counts.split_once(" correctas, ").unwrap();
            let failed = rest.strip_suffix(" con problemas").unwrap();
            return passed.parse::<usize>().is_ok()
                && failed.parse::<usize>().is_ok()
                && source.contains("print(f\"Resultado: {passed} correctas, {failed} con problemas\")");
        }
        if let Some(remedy) = line.strip_prefix("    - ") {
            return source.contains("print(\"    - \" + remedy)")
                && source.contains(&py_str(remedy));
        }
        if let Some(outcome) = line.strip_prefix("  ") {
            return source.contains("print(\"  \" + pass_line)")
                && source.contains("print(\"  \" + fail_line)")
                && source.contains(&format!("{},\n", py_str(outcome)));
        }
        source.contains(&py_str(line))
    }

    #[test]
    fn test_every_transcript_line_is_printed_by_the_program() {
        let checks = standard_checks("web.whatsapp.com");
        let source = render_self_test(&checks, at());
        for outcomes in [[true; 6], [false; 6], [true, true, false, false, false, false]] {
            let transcript = expected_transcript(&checks, &outcomes);
            for line in transcript.lines() {
                assert!(printed_by(&source, line), "no statement prints {line:?}");
            }
        }
        for check in &checks {
            assert!(source.contains(&format!("    {},\n", py_str(&check.pass_line))));
            assert!(source.contains(&format!("    {},\n", py_str(&check.fail_line))));
        }
    }
}
