//! crates/outreach_core/src/packager.rs
//!
//! Wraps program source in a launcher script that bootstraps the runtime,
//! writes the program to a temporary location, runs it and cleans up.
//!
//! Every launcher follows the same bootstrap sequence regardless of target
//! or embedding: banner, interpreter check, dependency check (with a
//! conditional install), program write, run, cleanup. Cleanup runs on every
//! exit path of the run phase.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::{Artifact, ArtifactKind, GenerationConfig, LauncherTarget};
use crate::sanitizer::{sanitize, SanitizeMode};

pub const DEFAULT_ARTIFACT_PREFIX: &str = "WhatsAppSender";

/// Python modules the sender needs, and the pip packages providing them.
const REQUIRED_MODULES: &str = "selenium, webdriver_manager";
const REQUIRED_PACKAGES: &str = "selenium webdriver-manager";

/// `cmd.exe` refuses longer lines.
const MAX_BATCH_LINE: usize = 8000;
const BASE64_WIDTH: usize = 76;
const RULE: &str = "===============================================";

/// How the program text travels inside the launcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingStrategy {
    /// One append command per program line, each escaped for the shell.
    #[default]
    Lines,
    /// The program encoded once as base64 and decoded on the target.
    Base64,
}

/// What the launcher does when required packages are missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyPolicy {
    /// Install them with pip; abort if that fails.
    Install,
    /// Mention it and continue, the program reports it itself.
    ReportOnly,
}

/// The launcher phases, in the only order a launcher may run them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Banner,
    CheckInterpreter,
    CheckDependencies,
    WriteProgram,
    RunProgram,
    Cleanup,
}

pub const BOOTSTRAP_SEQUENCE: [Phase; 6] = [
    Phase::Banner,
    Phase::CheckInterpreter,
    Phase::CheckDependencies,
    Phase::WriteProgram,
    Phase::RunProgram,
    Phase::Cleanup,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagerOptions {
    pub prefix: String,
    pub target: LauncherTarget,
    pub embedding: EmbeddingStrategy,
}

impl Default for PackagerOptions {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_ARTIFACT_PREFIX.to_string(),
            target: LauncherTarget::default(),
            embedding: EmbeddingStrategy::default(),
        }
    }
}

/// Operator-facing details printed by the launcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherDetails {
    pub kind: ArtifactKind,
    pub title: String,
    pub contact_count: usize,
    /// Extra banner lines, sanitized before use.
    pub notes: Vec<String>,
    pub dependencies: DependencyPolicy,
}

impl LauncherDetails {
    pub fn sender(contact_count: usize, config: &GenerationConfig) -> Self {
        Self {
            kind: ArtifactKind::Sender,
            title: "WhatsApp Sender - Envio automatico".to_string(),
            contact_count,
            notes: vec![
                format!("Contactos: {contact_count}"),
                format!("Velocidad: {}", config.speed_tier.label()),
            ],
            dependencies: DependencyPolicy::Install,
        }
    }

    pub fn diagnostics(notes: Vec<String>) -> Self {
        Self {
            kind: ArtifactKind::Diagnostics,
            title: "WhatsApp Sender - Autodiagnostico".to_string(),
            contact_count: 0,
            notes,
            dependencies: DependencyPolicy::ReportOnly,
        }
    }
}

/// Keeps file-name-safe characters only.
fn safe_prefix(prefix: &str) -> String {
    let cleaned: String = prefix
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
        .collect();
    if cleaned.is_empty() {
        DEFAULT_ARTIFACT_PREFIX.to_string()
    } else {
        cleaned
    }
}

#[derive(Debug, Clone, Default)]
pub struct Packager {
    options: PackagerOptions,
}

impl Packager {
    pub fn new(options: PackagerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &PackagerOptions {
        &self.options
    }

    /// `<prefix>_<Kind>_<YYYY-MM-DD_HH-MM-SS-mmm>`, without extension.
    fn stem(&self, kind: ArtifactKind, config: &GenerationConfig) -> String {
        format!(
            "{}_{}_{}",
            safe_prefix(&self.options.prefix),
            kind.file_segment(),
            config.timestamp.format("%Y-%m-%d_%H-%M-%S-%3f")
        )
    }

    pub fn file_name(&self, kind: ArtifactKind, config: &GenerationConfig) -> String {
        format!("{}.{}", self.stem(kind, config), self.options.target.extension())
    }

    /// Builds the launcher artifact for `program_source`.
    pub fn package(
        &self,
        program_source: &str,
        config: &GenerationConfig,
        details: &LauncherDetails,
    ) -> Artifact {
        let target = self.options.target;
        let launcher = Launcher {
            details,
            config,
            work_name: self.stem(details.kind, config),
            program_source,
        };

        let mut lines = match target {
            LauncherTarget::WindowsBatch => launcher.batch(self.options.embedding),
            LauncherTarget::PosixShell => launcher.posix(self.options.embedding),
        };
        if target == LauncherTarget::WindowsBatch
            && self.options.embedding == EmbeddingStrategy::Lines
            && lines.iter().any(|line| line.len() > MAX_BATCH_LINE)
        {
            warn!(
                limit = MAX_BATCH_LINE,
                "Program line too long for a batch file, embedding as base64 instead."
            );
            lines = launcher.batch(EmbeddingStrategy::Base64);
        }

        let ending = target.line_ending();
        let mut body = lines.join(ending);
        body.push_str(ending);

        Artifact {
            file_name: self.file_name(details.kind, config),
            body,
            contact_count: details.contact_count,
            kind: details.kind,
            target,
        }
    }
}

//=========================================================================================
// Escaping
//=========================================================================================

/// Escapes one line for `echo(` in a batch file. Outside double quotes the
/// shell metacharacters get a caret; `%` is doubled everywhere because
/// variable expansion ignores quotes.
pub fn escape_batch_echo(line: &str) -> String {
    let mut out = String::with_capacity(line.len() + 8);
    let mut quoted = false;
    for c in line.chars() {
        match c {
            '%' => out.push_str("%%"),
            '"' => {
                quoted = !quoted;
                out.push('"');
            }
            '^' | '&' | '|' | '<' | '>' | '(' | ')' if !quoted => {
                out.push('^');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

/// Wraps `text` in single quotes for `sh`.
pub fn quote_posix(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}

fn banner_text(text: &str) -> String {
    sanitize(text, SanitizeMode::ShellLine)
}

fn base64_lines(program_source: &str) -> Vec<String> {
    let encoded = STANDARD.encode(program_source.as_bytes());
    encoded
        .as_bytes()
        .chunks(BASE64_WIDTH)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect()
}

//=========================================================================================
// Launcher Rendering
//=========================================================================================

struct Launcher<'a> {
    details: &'a LauncherDetails,
    config: &'a GenerationConfig,
    work_name: String,
    program_source: &'a str,
}

impl Launcher<'_> {
    fn banner_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self.details.notes.iter().map(|note| banner_text(note)).collect();
        lines.push(format!(
            "Generado: {}",
            self.config.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        lines
    }

    fn batch(&self, embedding: EmbeddingStrategy) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let mut push = |line: &str| out.push(line.to_string());
        let echo = |text: &str| {
            if text.is_empty() {
                "echo.".to_string()
            } else {
                format!("echo({}", escape_batch_echo(text))
            }
        };

        for phase in BOOTSTRAP_SEQUENCE {
            match phase {
                Phase::Banner => {
                    let title = banner_text(&self.details.title);
                    push("@echo off");
                    push("setlocal");
                    push("chcp 65001 >nul");
                    push(&format!("title {}", escape_batch_echo(&title)));
                    push(&format!("echo {RULE}"));
                    push(&echo(&title));
                    push(&format!("echo {RULE}"));
                    for line in self.banner_lines() {
                        push(&echo(&line));
                    }
                    push("echo.");
                    push(&format!("set \"WORK_DIR=%TEMP%\\{}\"", self.work_name));
                    push("set \"PROGRAM=%WORK_DIR%\\program.py\"");
                    push("set \"RUN_EXIT=0\"");
                    push("if not exist \"%WORK_DIR%\" mkdir \"%WORK_DIR%\"");
                    push("call :run");
                    push("call :cleanup");
                    push("echo.");
                    push(&format!("echo {RULE}"));
                    push("echo PROCESO FINALIZADO");
                    push(&format!("echo {RULE}"));
                    push("pause");
                    push("endlocal & exit /b %RUN_EXIT%");
                    push("");
                    push(":run");
                }
                Phase::CheckInterpreter => {
                    push("echo [1/4] Verificando Python...");
                    push("set \"PY=python\"");
                    push("%PY% --version >nul 2>&1");
                    push("if not errorlevel 1 goto :python_found");
                    push("set \"PY=py -3\"");
                    push("%PY% --version >nul 2>&1");
                    push("if not errorlevel 1 goto :python_found");
                    push("echo ERROR: Python no esta instalado o no esta en el PATH");
                    push("echo Descargalo desde https://python.org/downloads");
                    push("set \"RUN_EXIT=1\"");
                    push("goto :eof");
                    push(":python_found");
                }
                Phase::CheckDependencies => {
                    push("echo [2/4] Verificando dependencias...");
                    push(&format!(
                        "%PY% -c \"import {REQUIRED_MODULES}\" >nul 2>&1"
                    ));
                    push("if not errorlevel 1 goto :deps_ready");
                    match self.details.dependencies {
                        DependencyPolicy::Install => {
                            push("echo Instalando selenium y webdriver-manager...");
                            push(&format!(
                                "%PY% -m pip install --disable-pip-version-check {REQUIRED_PACKAGES}"
                            ));
                            push("if errorlevel 1 (");
                            push("    echo ERROR: No se pudieron instalar las dependencias");
                            push("    set \"RUN_EXIT=1\"");
                            push("    goto :eof");
                            push(")");
                        }
                        DependencyPolicy::ReportOnly => {
                            push("echo AVISO: faltan dependencias, el autodiagnostico indicara como instalarlas");
                        }
                    }
                    push(":deps_ready");
                }
                Phase::WriteProgram => {
                    push("echo [3/4] Preparando programa...");
                    match embedding {
                        EmbeddingStrategy::Lines => {
                            push("type nul >\"%PROGRAM%\"");
                            for line in self.program_source.lines() {
                                push(&format!(">>\"%PROGRAM%\" echo({}", escape_batch_echo(line)));
                            }
                        }
                        EmbeddingStrategy::Base64 => {
                            push("type nul >\"%PROGRAM%.b64\"");
                            for chunk in base64_lines(self.program_source) {
                                push(&format!(">>\"%PROGRAM%.b64\" echo({chunk}"));
                            }
                            push("certutil -f -decode \"%PROGRAM%.b64\" \"%PROGRAM%\" >nul");
                            push("del /q \"%PROGRAM%.b64\" >nul 2>&1");
                        }
                    }
                    push("if not exist \"%PROGRAM%\" (");
                    push("    echo ERROR: No se pudo crear el programa");
                    push("    set \"RUN_EXIT=1\"");
                    push("    goto :eof");
                    push(")");
                }
                Phase::RunProgram => {
                    push("echo [4/4] Ejecutando...");
                    push("echo.");
                    push("%PY% \"%PROGRAM%\"");
                    push("set \"RUN_EXIT=%ERRORLEVEL%\"");
                    push("goto :eof");
                }
                Phase::Cleanup => {
                    push("");
                    push(":cleanup");
                    push("echo Limpiando archivos temporales...");
                    push("if exist \"%WORK_DIR%\" rmdir /s /q \"%WORK_DIR%\"");
                    push("goto :eof");
                }
            }
        }
        out
    }

    fn posix(&self, embedding: EmbeddingStrategy) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let mut push = |line: &str| out.push(line.to_string());
        let say = |indent: &str, text: &str| format!("{indent}printf '%s\\n' {}", quote_posix(text));

        for phase in BOOTSTRAP_SEQUENCE {
            match phase {
                Phase::Banner => {
                    let title = banner_text(&self.details.title);
                    push("#!/bin/sh");
                    push(&format!("# {title}"));
                    push(&say("", RULE));
                    push(&say("", &title));
                    push(&say("", RULE));
                    for line in self.banner_lines() {
                        push(&say("", &line));
                    }
                    push("echo");
                    push(&format!(
                        "WORK_DIR=\"$(mktemp -d \"${{TMPDIR:-/tmp}}/{}.XXXXXX\")\" || exit 1",
                        self.work_name
                    ));
                    push("PROGRAM=\"$WORK_DIR/program.py\"");
                    push("");
                }
                Phase::CheckInterpreter => {
                    push("run() {");
                    push(&say("    ", "[1/4] Verificando Python..."));
                    push("    PY=\"\"");
                    push("    for candidate in python3 python; do");
                    push("        if command -v \"$candidate\" >/dev/null 2>&1; then");
                    push("            PY=\"$candidate\"");
                    push("            break");
                    push("        fi");
                    push("    done");
                    push("    if [ -z \"$PY\" ]; then");
                    push(&say("        ", "ERROR: Python no esta instalado"));
                    push(&say("        ", "Descargalo desde https://python.org/downloads"));
                    push("        return 1");
                    push("    fi");
                }
                Phase::CheckDependencies => {
                    push(&say("    ", "[2/4] Verificando dependencias..."));
                    push(&format!(
                        "    if ! \"$PY\" -c 'import {REQUIRED_MODULES}' >/dev/null 2>&1; then"
                    ));
                    match self.details.dependencies {
                        DependencyPolicy::Install => {
                            push(&say("        ", "Instalando selenium y webdriver-manager..."));
                            push(&format!(
                                "        if ! \"$PY\" -m pip install --user --disable-pip-version-check {REQUIRED_PACKAGES}; then"
                            ));
                            push(&say("            ", "ERROR: No se pudieron instalar las dependencias"));
                            push("            return 1");
                            push("        fi");
                        }
                        DependencyPolicy::ReportOnly => {
                            push(&say(
                                "        ",
                                "AVISO: faltan dependencias, el autodiagnostico indicara como instalarlas",
                            ));
                        }
                    }
                    push("    fi");
                }
                Phase::WriteProgram => {
                    push(&say("    ", "[3/4] Preparando programa..."));
                    match embedding {
                        EmbeddingStrategy::Lines => {
                            push("    : >\"$PROGRAM\"");
                            for line in self.program_source.lines() {
                                push(&format!("    printf '%s\\n' {} >>\"$PROGRAM\"", quote_posix(line)));
                            }
                        }
                        EmbeddingStrategy::Base64 => {
                            push("    cat >\"$PROGRAM.b64\" <<'B64'");
                            for chunk in base64_lines(self.program_source) {
                                push(&chunk);
                            }
                            push("B64");
                            push("    \"$PY\" -c 'import base64, sys; open(sys.argv[2], \"wb\").write(base64.b64decode(open(sys.argv[1]).read()))' \"$PROGRAM.b64\" \"$PROGRAM\"");
                        }
                    }
                    push("    if [ ! -f \"$PROGRAM\" ]; then");
                    push(&say("        ", "ERROR: No se pudo crear el programa"));
                    push("        return 1");
                    push("    fi");
                }
                Phase::RunProgram => {
                    push(&say("    ", "[4/4] Ejecutando..."));
                    push("    echo");
                    push("    \"$PY\" \"$PROGRAM\"");
                    push("}");
                    push("");
                }
                Phase::Cleanup => {
                    push("cleanup() {");
                    push(&say("    ", "Limpiando archivos temporales..."));
                    push("    rm -rf \"$WORK_DIR\"");
                    push("}");
                    push("trap cleanup EXIT");
                    push("trap 'exit 130' INT TERM");
                    push("");
                    push("run");
                    push("RUN_EXIT=$?");
                    push("echo");
                    push(&say("", RULE));
                    push(&say("", "PROCESO FINALIZADO"));
                    push(&say("", RULE));
                    push("printf 'Presiona Enter para cerrar...'");
                    push("read -r _ || true");
                    push("exit \"$RUN_EXIT\"");
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;
    use chrono::{TimeZone, Utc};

    const PROGRAM: &str = "print(\"a < b & c\")\nif x > 1 and (y):\n    print(f\"{rate:.1f}%\")\n";

    fn config() -> GenerationConfig {
        let at = Utc.with_ymd_and_hms(2026, 10, 17, 14, 3, 22).unwrap()
            + chrono::Duration::milliseconds(45);
        GenerationConfig::new("Normal (3-5s)", at)
    }

    fn packager(target: LauncherTarget, embedding: EmbeddingStrategy) -> Packager {
        Packager::new(PackagerOptions {
            prefix: "WhatsAppSender".into(),
            target,
            embedding,
        })
    }

    fn positions(body: &str, markers: &[&str]) -> Vec<usize> {
        markers
            .iter()
            .map(|m| body.find(m).unwrap_or_else(|| panic!("missing marker {m}")))
            .collect()
    }

    #[test]
    fn test_file_name_is_deterministic() {
        let p = packager(LauncherTarget::WindowsBatch, EmbeddingStrategy::Lines);
        assert_eq!(
            p.file_name(ArtifactKind::Sender, &config()),
            "WhatsAppSender_Sender_2026-10-17_14-03-22-045.bat"
        );
        let posix = packager(LauncherTarget::PosixShell, EmbeddingStrategy::Lines);
        assert_eq!(
            posix.file_name(ArtifactKind::Diagnostics, &config()),
            "WhatsAppSender_Diagnostics_2026-10-17_14-03-22-045.sh"
        );
    }

    #[test]
    fn test_artifacts_a_second_apart_get_distinct_names() {
        let p = packager(LauncherTarget::WindowsBatch, EmbeddingStrategy::Lines);
        let first = config();
        let second = GenerationConfig::new("Normal (3-5s)", first.timestamp + chrono::Duration::seconds(1));

        let a = p.package(PROGRAM, &first, &LauncherDetails::sender(1, &first));
        let b = p.package(PROGRAM, &second, &LauncherDetails::sender(1, &second));
        assert_eq!(a.file_name, "WhatsAppSender_Sender_2026-10-17_14-03-22-045.bat");
        assert_eq!(b.file_name, "WhatsAppSender_Sender_2026-10-17_14-03-23-045.bat");
        assert_ne!(a.file_name, b.file_name);
    }

    #[test]
    fn test_unsafe_prefix_is_cleaned() {
        let p = Packager::new(PackagerOptions {
            prefix: "../My Sender!".into(),
            ..PackagerOptions::default()
        });
        assert!(p.file_name(ArtifactKind::Sender, &config()).starts_with("MySender_Sender_"));
    }

    #[test]
    fn test_batch_escaping_is_quote_aware() {
        assert_eq!(escape_batch_echo("print(\"a < b & c\")"), "print^(\"a < b & c\"^)");
        assert_eq!(escape_batch_echo("if x > 1 and (y):"), "if x ^> 1 and ^(y^):");
        assert_eq!(escape_batch_echo("\"50%\" | ^"), "\"50%%\" ^| ^^");
    }

    #[test]
    fn test_posix_quoting() {
        assert_eq!(quote_posix("it's"), r"'it'\''s'");
    }

    #[test]
    fn test_batch_launcher_follows_bootstrap_sequence() {
        let cfg = config();
        let artifact = packager(LauncherTarget::WindowsBatch, EmbeddingStrategy::Lines).package(
            PROGRAM,
            &cfg,
            &LauncherDetails::sender(1, &cfg),
        );
        let body = &artifact.body;
        let at = positions(
            body,
            &[
                "@echo off",
                "call :run",
                "call :cleanup",
                "pause",
                "\r\n:run\r\n",
                "%PY% --version",
                "import selenium, webdriver_manager",
                "pip install",
                ">>\"%PROGRAM%\" echo(",
                "%PY% \"%PROGRAM%\"",
                "\r\n:cleanup\r\n",
                "rmdir /s /q \"%WORK_DIR%\"",
            ],
        );
        assert!(at.windows(2).all(|w| w[0] < w[1]), "out of order: {at:?}");
        assert!(body.contains("\r\n"));
        assert!(!body.replace("\r\n", "").contains('\n'));
        assert!(body.contains("echo(Contactos: 1\r\n"));
        assert!(body.contains("echo(Velocidad: Normal ^(3-5s^)\r\n"));
        assert!(body.contains(">>\"%PROGRAM%\" echo(    print^(f\"{rate:.1f}%%\"^)\r\n"));
        assert_eq!(artifact.contact_count, 1);
        assert_eq!(artifact.kind, ArtifactKind::Sender);
    }

    #[test]
    fn test_every_batch_failure_path_reaches_cleanup() {
        let cfg = config();
        let artifact = packager(LauncherTarget::WindowsBatch, EmbeddingStrategy::Lines).package(
            PROGRAM,
            &cfg,
            &LauncherDetails::sender(1, &cfg),
        );
        let run_section = &artifact.body[artifact.body.find("\r\n:run\r\n").unwrap()..];
        // Failures leave :run with goto :eof, which returns to `call :cleanup`.
        assert!(!run_section.contains("exit /b"));
        assert!(!run_section.contains("goto :cleanup"));
        assert!(run_section.matches("goto :eof").count() >= 4);
    }

    #[test]
    fn test_base64_batch_decodes_with_certutil() {
        let cfg = config();
        let artifact = packager(LauncherTarget::WindowsBatch, EmbeddingStrategy::Base64).package(
            PROGRAM,
            &cfg,
            &LauncherDetails::sender(1, &cfg),
        );
        let encoded: String = artifact
            .body
            .lines()
            .filter_map(|line| line.strip_prefix(">>\"%PROGRAM%.b64\" echo("))
            .map(|line| line.trim_end_matches('\r'))
            .collect();
        assert_eq!(STANDARD.decode(encoded).unwrap(), PROGRAM.as_bytes());
        assert!(artifact.body.contains("certutil -f -decode \"%PROGRAM%.b64\" \"%PROGRAM%\""));
        assert!(!artifact.body.contains(">>\"%PROGRAM%\" echo("));
    }

    #[test]
    fn test_posix_launcher_traps_cleanup() {
        let cfg = config();
        let artifact = packager(LauncherTarget::PosixShell, EmbeddingStrategy::Lines).package(
            "print('hi')\n",
            &cfg,
            &LauncherDetails::sender(2, &cfg),
        );
        let body = &artifact.body;
        assert!(body.starts_with("#!/bin/sh\n"));
        assert!(!body.contains('\r'));
        assert!(body.contains("    printf '%s\\n' 'print('\\''hi'\\'')' >>\"$PROGRAM\"\n"));
        let at = positions(body, &["run() {", "python3 python", "pip install", "\"$PY\" \"$PROGRAM\"", "trap cleanup EXIT", "\nrun\n", "read -r _"]);
        assert!(at.windows(2).all(|w| w[0] < w[1]), "out of order: {at:?}");
    }

    #[test]
    fn test_posix_base64_uses_heredoc() {
        let cfg = config();
        let artifact = packager(LauncherTarget::PosixShell, EmbeddingStrategy::Base64).package(
            PROGRAM,
            &cfg,
            &LauncherDetails::sender(1, &cfg),
        );
        let body = &artifact.body;
        let start = body.find("<<'B64'\n").unwrap() + "<<'B64'\n".len();
        let end = body[start..].find("\nB64\n").unwrap() + start;
        let encoded: String = body[start..end].lines().collect();
        assert_eq!(STANDARD.decode(encoded).unwrap(), PROGRAM.as_bytes());
        assert!(body[start..end].lines().all(|l| l.len() <= BASE64_WIDTH));
    }

    #[test]
    fn test_diagnostics_launcher_only_reports_missing_packages() {
        let cfg = config();
        let artifact = packager(LauncherTarget::WindowsBatch, EmbeddingStrategy::Lines).package(
            "print('ok')\n",
            &cfg,
            &LauncherDetails::diagnostics(vec!["Compatibilidad: 4/5".into(), "50% & <ok>".into()]),
        );
        assert!(!artifact.body.contains("pip install"));
        assert!(artifact.body.contains("AVISO: faltan dependencias"));
        assert!(artifact.body.contains("echo(Compatibilidad: 4/5\r\n"));
        assert!(artifact.body.contains("echo(50 ok\r\n"));
        assert_eq!(artifact.kind, ArtifactKind::Diagnostics);
        assert!(artifact.file_name.contains("_Diagnostics_"));
    }

    #[test]
    fn test_overlong_lines_fall_back_to_base64() {
        let cfg = config();
        let program = format!("x = \"{}\"\n", "a".repeat(MAX_BATCH_LINE + 10));
        let artifact = packager(LauncherTarget::WindowsBatch, EmbeddingStrategy::Lines).package(
            &program,
            &cfg,
            &LauncherDetails::sender(0, &cfg),
        );
        assert!(artifact.body.contains("certutil -f -decode"));
        assert!(artifact.body.lines().all(|line| line.len() <= MAX_BATCH_LINE));
    }
}
