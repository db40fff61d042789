//! crates/outreach_core/src/diagnostics.rs
//!
//! Gathers facts about the operator's environment through an
//! `EnvironmentProbe`, scores them and packages a self-test artifact.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, info};

use crate::domain::{
    Artifact, BrowserFamily, BrowserInfo, DiagnosticsReport, EnvironmentFacts, GenerationConfig,
    NextStep, OsFamily, OsInfo, Problem, ProblemCategory, ProbeTarget, Severity, Verdict,
};
use crate::packager::{LauncherDetails, Packager};
use crate::ports::EnvironmentProbe;
use crate::program::selftest::{render_self_test, standard_checks};

pub const MAX_SCORE: f32 = 5.0;
pub const MIN_SCORE: f32 = 1.0;
const INCOMPATIBLE_BROWSER_PENALTY: f32 = 2.0;
const POPUPS_BLOCKED_PENALTY: f32 = 2.0;
const OFFLINE_PENALTY: f32 = 3.0;
const MEMORY_PRESSURE_PENALTY: f32 = 0.5;

/// Oldest Chrome major version the automation supports.
pub const MIN_CHROME_VERSION: u32 = 90;
const MEMORY_PRESSURE_MB: u64 = 500;
const MEMORY_PRESSURE_RATIO: f64 = 0.8;

static CHROME_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Chrome/(\d+)").expect("chrome version pattern compiles"));
static EDGE_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Edg/(\d+)").expect("edge version pattern compiles"));
static FIREFOX_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Firefox/(\d+)").expect("firefox version pattern compiles"));
static SAFARI_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Version/(\d+)").expect("safari version pattern compiles"));

fn major_version(pattern: &Regex, user_agent: &str) -> Option<u32> {
    pattern
        .captures(user_agent)?
        .get(1)?
        .as_str()
        .parse()
        .ok()
}

/// Identifies the browser from its user agent. Edge and Chrome 90+ can
/// host the automation; everything else cannot.
pub fn detect_browser(user_agent: Option<&str>) -> BrowserInfo {
    let Some(ua) = user_agent else {
        return BrowserInfo {
            family: BrowserFamily::Unknown,
            major_version: None,
            compatible: false,
        };
    };

    // Edge and Chrome also advertise Safari, so the order matters.
    let (family, major_version) = if ua.contains("Edg/") {
        (BrowserFamily::Edge, major_version(&EDGE_VERSION, ua))
    } else if ua.contains("Chrome/") && !ua.contains("OPR/") {
        (BrowserFamily::Chrome, major_version(&CHROME_VERSION, ua))
    } else if ua.contains("Firefox/") {
        (BrowserFamily::Firefox, major_version(&FIREFOX_VERSION, ua))
    } else if ua.contains("Safari/") && !ua.contains("Chrome/") {
        (BrowserFamily::Safari, major_version(&SAFARI_VERSION, ua))
    } else {
        (BrowserFamily::Unknown, None)
    };

    let compatible = match family {
        BrowserFamily::Edge => true,
        BrowserFamily::Chrome => major_version.is_some_and(|v| v >= MIN_CHROME_VERSION),
        _ => false,
    };

    BrowserInfo {
        family,
        major_version,
        compatible,
    }
}

/// Identifies the operating system from the user agent, falling back to
/// the platform string.
pub fn detect_os(user_agent: Option<&str>, platform: Option<&str>) -> OsInfo {
    let ua = user_agent.unwrap_or_default();
    let platform = platform.unwrap_or_default();

    if ua.contains("Windows") || platform.starts_with("Win") {
        let version = if ua.contains("Windows NT 10.0") {
            "10/11"
        } else if ua.contains("Windows NT 6.3") {
            "8.1"
        } else if ua.contains("Windows NT 6.1") {
            "7"
        } else {
            "anterior"
        };
        let architecture = if ua.contains("Win64") || ua.contains("WOW64") || ua.contains("x64") {
            "64-bit"
        } else {
            "32-bit"
        };
        return OsInfo {
            family: OsFamily::Windows,
            version: Some(version.to_string()),
            architecture: Some(architecture.to_string()),
        };
    }

    if ua.contains("Mac OS X") || platform.starts_with("Mac") {
        let version = ua
            .split("Mac OS X ")
            .nth(1)
            .and_then(|rest| rest.split([';', ')']).next())
            .map(|v| v.replace('_', "."));
        return OsInfo {
            family: OsFamily::MacOs,
            version,
            architecture: None,
        };
    }

    if ua.contains("Linux") || ua.contains("X11") || platform.starts_with("Linux") {
        let architecture = ["x86_64", "aarch64", "i686"]
            .into_iter()
            .find(|arch| ua.contains(arch) || platform.contains(arch))
            .map(str::to_string);
        return OsInfo {
            family: OsFamily::Linux,
            version: None,
            architecture,
        };
    }

    OsInfo {
        family: OsFamily::Unknown,
        version: None,
        architecture: None,
    }
}

/// The hosts probed by default. Only the messaging client is essential.
pub fn default_probe_targets(client_url: &str) -> Vec<ProbeTarget> {
    let target = |name: &str, host: &str, essential: bool| ProbeTarget {
        name: name.to_string(),
        host: host.to_string(),
        port: 443,
        essential,
    };
    vec![
        target("Google", "www.google.com", false),
        target("WhatsApp Web", &client_host(client_url), true),
        target("Python.org", "www.python.org", false),
        target("GitHub", "github.com", false),
    ]
}

/// The host part of a URL such as `https://web.whatsapp.com/`.
pub fn client_host(client_url: &str) -> String {
    let without_scheme = client_url
        .split_once("://")
        .map_or(client_url, |(_, rest)| rest);
    without_scheme
        .split(['/', ':', '?', '#'])
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Collects environment facts. Every probe is best-effort; the host checks
/// run concurrently.
pub async fn gather_facts(probe: &dyn EnvironmentProbe, targets: &[ProbeTarget]) -> EnvironmentFacts {
    let user_agent = probe.user_agent().await;
    let platform = probe.platform().await;
    let hosts = join_all(targets.iter().map(|target| probe.reach(target))).await;

    EnvironmentFacts {
        browser: detect_browser(user_agent.as_deref()),
        os: detect_os(user_agent.as_deref(), platform.as_deref()),
        popups_allowed: probe.popups_allowed().await,
        storage_available: probe.storage_available().await,
        online: probe.online().await,
        memory: probe.memory_usage().await,
        hosts,
        user_agent,
    }
}

fn problem(category: ProblemCategory, severity: Severity, text: &str, remedy: &str) -> Problem {
    Problem {
        category,
        problem: text.to_string(),
        severity,
        remedy: remedy.to_string(),
    }
}

fn next_steps() -> Vec<NextStep> {
    vec![
        NextStep {
            priority: 1,
            title: "Verificar Python".to_string(),
            description: "Confirma que Python 3.8 o superior esta instalado y en el PATH".to_string(),
            command: "python --version".to_string(),
            link: Some("https://python.org/downloads".to_string()),
        },
        NextStep {
            priority: 2,
            title: "Verificar Chrome".to_string(),
            description: "Usa Google Chrome 90 o superior para la automatizacion".to_string(),
            command: "chrome://version".to_string(),
            link: Some("https://www.google.com/chrome".to_string()),
        },
        NextStep {
            priority: 3,
            title: "Permitir ventanas emergentes".to_string(),
            description: "Permite ventanas emergentes y descargas para este sitio".to_string(),
            command: "chrome://settings/content/popups".to_string(),
            link: None,
        },
    ]
}

/// Scores the facts. Pure: the same facts always give the same report.
pub fn evaluate(facts: EnvironmentFacts, generated_at: DateTime<Utc>) -> DiagnosticsReport {
    let mut penalty = 0.0_f32;
    let mut problems = Vec::new();

    if !facts.browser.compatible {
        penalty += INCOMPATIBLE_BROWSER_PENALTY;
        problems.push(problem(
            ProblemCategory::Browser,
            Severity::High,
            &format!(
                "Navegador no compatible: {}",
                facts.browser.family.display_name()
            ),
            "Usa Google Chrome 90 o superior, o Microsoft Edge",
        ));
    }
    if facts.popups_allowed == Some(false) {
        penalty += POPUPS_BLOCKED_PENALTY;
        problems.push(problem(
            ProblemCategory::Browser,
            Severity::Critical,
            "Las ventanas emergentes estan bloqueadas",
            "Permite ventanas emergentes para este sitio en la configuracion del navegador",
        ));
    }
    if facts.online == Some(false) {
        penalty += OFFLINE_PENALTY;
        problems.push(problem(
            ProblemCategory::Network,
            Severity::Critical,
            "Sin conexion a internet",
            "Verifica tu conexion de red",
        ));
    }
    if let Some(memory) = facts.memory {
        let ratio_exceeded = memory
            .limit_mb
            .filter(|limit| *limit > 0)
            .is_some_and(|limit| memory.used_mb as f64 / limit as f64 > MEMORY_PRESSURE_RATIO);
        if memory.used_mb > MEMORY_PRESSURE_MB || ratio_exceeded {
            penalty += MEMORY_PRESSURE_PENALTY;
            problems.push(problem(
                ProblemCategory::Performance,
                Severity::Medium,
                &format!("Uso de memoria alto: {} MB", memory.used_mb),
                "Cierra pestanas y aplicaciones que no uses",
            ));
        }
    }
    if facts.storage_available == Some(false) {
        problems.push(problem(
            ProblemCategory::Storage,
            Severity::Low,
            "El almacenamiento local no esta disponible",
            "Desactiva el modo incognito o permite el almacenamiento del sitio",
        ));
    }
    for host in facts.hosts.iter().filter(|host| host.essential && !host.reachable) {
        problems.push(problem(
            ProblemCategory::Network,
            Severity::High,
            &format!("No se pudo conectar a {}", host.name),
            "Revisa si un firewall o proxy bloquea el acceso",
        ));
    }
    if facts.os.family == OsFamily::Unknown {
        problems.push(problem(
            ProblemCategory::System,
            Severity::Low,
            "No se pudo identificar el sistema operativo",
            "El lanzador requiere Windows; en Linux o macOS usa el script .sh",
        ));
    }

    let score = (MAX_SCORE - penalty).clamp(MIN_SCORE, MAX_SCORE);
    let verdict = if score >= 4.0 {
        Verdict::Ready
    } else if score >= 3.0 {
        Verdict::MinorIssues
    } else {
        Verdict::NeedsAttention
    };

    DiagnosticsReport {
        generated_at,
        score,
        verdict,
        problems,
        facts,
        next_steps: next_steps(),
    }
}

/// Probes the environment and scores it.
pub async fn run_diagnostics(
    probe: &dyn EnvironmentProbe,
    targets: &[ProbeTarget],
    generated_at: DateTime<Utc>,
) -> DiagnosticsReport {
    let facts = gather_facts(probe, targets).await;
    debug!(
        browser = ?facts.browser.family,
        os = ?facts.os.family,
        hosts = facts.hosts.len(),
        "Environment facts gathered."
    );
    let report = evaluate(facts, generated_at);
    info!(
        score = report.score,
        problems = report.problems.len(),
        verdict = ?report.verdict,
        "Diagnostics evaluated."
    );
    report
}

/// `4`, `3.5`: scores are multiples of 0.5.
pub fn format_score(score: f32) -> String {
    if score.fract() == 0.0 {
        format!("{score:.0}")
    } else {
        format!("{score:.1}")
    }
}

pub fn verdict_text(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Ready => "Sistema listo para usar el envio automatico",
        Verdict::MinorIssues => "Sistema funcional con problemas menores",
        Verdict::NeedsAttention => "El sistema necesita atencion antes de enviar",
    }
}

/// Banner lines summarizing `report` for the diagnostics launcher.
pub fn report_lines(report: &DiagnosticsReport) -> Vec<String> {
    let facts = &report.facts;
    let mut lines = vec![
        format!("Compatibilidad: {}/5", format_score(report.score)),
        verdict_text(report.verdict).to_string(),
        String::new(),
        format!(
            "Navegador: {}{}",
            facts.browser.family.display_name(),
            facts
                .browser
                .major_version
                .map(|v| format!(" {v}"))
                .unwrap_or_default()
        ),
        format!(
            "Sistema: {} {}",
            facts.os.family.display_name(),
            [facts.os.version.as_deref(), facts.os.architecture.as_deref()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ")
        ),
    ];
    for host in &facts.hosts {
        let state = if host.reachable { "OK" } else { "sin acceso" };
        lines.push(format!("Conexion {}: {state}", host.name));
    }
    if !report.problems.is_empty() {
        lines.push(String::new());
        lines.push(format!("Problemas detectados: {}", report.problems.len()));
        for problem in &report.problems {
            lines.push(format!(
                "- [{}] {}: {}",
                problem.severity.label(),
                problem.category.label(),
                problem.problem
            ));
            lines.push(format!("  Solucion: {}", problem.remedy));
        }
    }
    lines.push(String::new());
    lines.push("Proximos pasos:".to_string());
    for step in &report.next_steps {
        lines.push(format!("{}. {} - {}", step.priority, step.title, step.command));
    }
    lines.push(String::new());
    lines
}

/// Builds the self-test artifact for `report`.
pub fn package_diagnostics(report: &DiagnosticsReport, config: &GenerationConfig, packager: &Packager) -> Artifact {
    let checks = standard_checks(&client_host(&config.client_url));
    let program = render_self_test(&checks, config.timestamp);
    packager.package(&program, config, &LauncherDetails::diagnostics(report_lines(report)))
}
