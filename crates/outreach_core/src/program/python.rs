//! crates/outreach_core/src/program/python.rs
//!
//! Renders a `Program` as Python 3 source. The output is pure ASCII: all
//! operator data enters through `py_str`, which escapes everything outside
//! printable ASCII.

use std::fmt::Write as _;

use super::ast::{Delivery, Header, LaunchBrowser, Program, SendLoop, Settings, Step, WaitReady};

/// Longest string literal piece, in escaped characters, before a literal is
/// split into implicitly concatenated parts.
const LITERAL_WIDTH: usize = 72;

//=========================================================================================
// Source Writer
//=========================================================================================

/// Line-oriented source builder with four-space indentation.
#[derive(Debug, Default)]
pub(crate) struct SourceWriter {
    out: String,
    depth: usize,
}

impl SourceWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if !text.is_empty() {
            for _ in 0..self.depth {
                self.out.push_str("    ");
            }
            self.out.push_str(text);
        }
        self.out.push('\n');
    }

    pub fn blank(&mut self) {
        self.out.push('\n');
    }

    /// Writes `header` and renders `body` one level deeper.
    pub fn block(&mut self, header: impl AsRef<str>, body: impl FnOnce(&mut Self)) {
        self.line(header);
        self.depth += 1;
        body(self);
        self.depth -= 1;
    }

    pub fn finish(self) -> String {
        self.out
    }
}

//=========================================================================================
// Literals
//=========================================================================================

fn escape_char(c: char, out: &mut String) {
    match c {
        '\\' => out.push_str("\\\\"),
        '"' => out.push_str("\\\""),
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        '\t' => out.push_str("\\t"),
        ' '..='~' => out.push(c),
        c if (c as u32) < 0x100 => {
            let _ = write!(out, "\\x{:02x}", c as u32);
        }
        c if (c as u32) <= 0xFFFF => {
            let _ = write!(out, "\\u{:04x}", c as u32);
        }
        c => {
            let _ = write!(out, "\\U{:08x}", c as u32);
        }
    }
}

/// A double-quoted, ASCII-only Python string literal.
pub(crate) fn py_str(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        escape_char(c, &mut out);
    }
    out.push('"');
    out
}

/// Splits a literal into pieces of at most `LITERAL_WIDTH` escaped
/// characters. Escape sequences are never split.
pub(crate) fn py_str_pieces(text: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut escaped = String::new();
    for c in text.chars() {
        escaped.clear();
        escape_char(c, &mut escaped);
        if !current.is_empty() && current.len() + escaped.len() > LITERAL_WIDTH {
            pieces.push(format!("\"{current}\""));
            current.clear();
        }
        current.push_str(&escaped);
    }
    pieces.push(format!("\"{current}\""));
    pieces
}

pub(crate) fn py_str_list(items: &[String]) -> String {
    let quoted: Vec<String> = items.iter().map(|item| py_str(item)).collect();
    format!("[{}]", quoted.join(", "))
}

fn py_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

/// Writes `NAME = "..."`, splitting long values over several lines.
fn assign_str(w: &mut SourceWriter, prefix: &str, text: &str, suffix: &str) {
    let pieces = py_str_pieces(text);
    if let [single] = pieces.as_slice() {
        w.line(format!("{prefix}{single}{suffix}"));
        return;
    }
    w.block(format!("{prefix}("), |w| {
        for piece in &pieces {
            w.line(piece);
        }
    });
    w.line(format!("){suffix}"));
}

/// Comment text limited to printable ASCII.
fn comment_text(text: &str) -> String {
    text.chars()
        .map(|c| if (' '..='~').contains(&c) { c } else { '?' })
        .collect()
}

//=========================================================================================
// Program Sections
//=========================================================================================

pub(crate) fn preamble(w: &mut SourceWriter, header: &Header) {
    w.line("#!/usr/bin/env python3");
    w.line("# -*- coding: utf-8 -*-");
    w.line(format!("# {}", comment_text(&header.title)));
    w.line(format!(
        "# Generado: {}",
        header.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    w.blank();
}

pub(crate) fn console_setup(w: &mut SourceWriter) {
    w.block("if hasattr(sys.stdout, \"reconfigure\"):", |w| {
        w.line("sys.stdout.reconfigure(errors=\"replace\")");
    });
}

fn imports(w: &mut SourceWriter) {
    for module in ["os", "random", "sys", "time", "urllib.parse", "webbrowser"] {
        w.line(format!("import {module}"));
    }
    w.blank();
    w.block("try:", |w| {
        w.line("from selenium import webdriver");
        w.line("from selenium.webdriver.chrome.options import Options");
        w.line("from selenium.webdriver.chrome.service import Service");
        w.line("from selenium.webdriver.common.by import By");
        w.line("from selenium.webdriver.common.keys import Keys");
        w.line("from selenium.webdriver.support import expected_conditions as EC");
        w.line("from selenium.webdriver.support.ui import WebDriverWait");
        w.line("SELENIUM_AVAILABLE = True");
    });
    w.block("except ImportError:", |w| {
        w.line("SELENIUM_AVAILABLE = False");
    });
    w.blank();
    console_setup(w);
    w.blank();
}

fn constants(w: &mut SourceWriter, header: &Header, settings: &Settings) {
    let t = &settings.timeouts;
    w.line(format!("TITLE = {}", py_str(&header.title)));
    w.line(format!(
        "GENERATED_AT = {}",
        py_str(&header.generated_at.format("%Y-%m-%dT%H:%M:%SZ").to_string())
    ));
    w.line(format!("SPEED_LABEL = {}", py_str(&header.speed_label)));
    w.line(format!("CLIENT_URL = {}", py_str(settings.client_url.trim_end_matches('/'))));
    w.blank();
    w.line(format!("DELAY_MIN = {}", settings.delay.min_secs));
    w.line(format!("DELAY_MAX = {}", settings.delay.max_secs));
    w.line(format!("MAX_RETRIES = {}", settings.retry.max_retries));
    w.line(format!("RETRY_DELAY = {}", settings.retry.retry_delay_secs));
    w.line(format!(
        "EXPONENTIAL_BACKOFF = {}",
        py_bool(settings.retry.exponential_backoff)
    ));
    w.blank();
    w.line(format!("INIT_TIMEOUT = {}", t.initialization_secs));
    w.line(format!("READY_TIMEOUT = {}", t.client_ready_secs));
    w.line(format!("READY_POLL = {}", t.ready_poll_secs));
    w.line(format!("PAGE_LOAD_TIMEOUT = {}", t.page_load_secs));
    w.line(format!("PAGE_SETTLE = {}", t.page_settle_secs));
    w.line(format!("SEND_TIMEOUT = {}", t.message_send_secs));
    w.line(format!("ELEMENT_WAIT = {}", t.element_search_secs));
    w.blank();
    w.line("DELIVERED = set()");
    w.blank();
    w.blank();
    w.block("class ClientNotReady(Exception):", |w| w.line("pass"));
    w.blank();
    w.blank();
}

fn launch_browser(w: &mut SourceWriter, launch: &LaunchBrowser) {
    w.block("LAUNCH_FLAGS = [", |w| {
        for flag in &launch.flags {
            w.line(format!("{},", py_str(flag)));
        }
    });
    w.line("]");
    w.line(format!(
        "EXCLUDED_SWITCHES = {}",
        py_str_list(&launch.excluded_switches)
    ));
    w.line(format!(
        "PROFILE_DIR = os.path.join(os.path.expanduser(\"~\"), {})",
        py_str(&launch.profile_dir)
    ));
    w.blank();
    w.blank();
    w.block("def build_options():", |w| {
        w.line("options = Options()");
        w.block("for flag in LAUNCH_FLAGS:", |w| w.line("options.add_argument(flag)"));
        w.line("options.add_argument(\"--user-data-dir=\" + PROFILE_DIR)");
        w.line("options.add_experimental_option(\"excludeSwitches\", EXCLUDED_SWITCHES)");
        w.line("options.add_experimental_option(\"useAutomationExtension\", False)");
        w.line("return options");
    });
    w.blank();
    w.blank();
    w.block("def launch_browser():", |w| {
        w.line("print(\"Iniciando Chrome...\")");
        w.line("os.makedirs(PROFILE_DIR, exist_ok=True)");
        w.block("try:", |w| w.line("driver = webdriver.Chrome(options=build_options())"));
        w.block("except Exception as direct_error:", |w| {
            w.line("print(f\"Inicio directo fallido ({direct_error}). Probando ChromeDriverManager...\")");
            w.block("try:", |w| {
                w.line("from webdriver_manager.chrome import ChromeDriverManager");
                w.line("service = Service(ChromeDriverManager().install())");
                w.line("driver = webdriver.Chrome(service=service, options=build_options())");
            });
            w.block("except Exception as manager_error:", |w| {
                w.line("print(f\"No se pudo iniciar Chrome: {manager_error}\")");
                w.line("return None");
            });
        });
        w.line("driver.set_page_load_timeout(PAGE_LOAD_TIMEOUT)");
        w.line("print(\"Chrome iniciado\")");
        w.line("return driver");
    });
    w.blank();
    w.blank();
    w.block("def close_browser(driver):", |w| {
        w.block("try:", |w| w.line("driver.quit()"));
        w.block("except Exception:", |w| w.line("pass"));
    });
    w.blank();
    w.blank();
}

fn open_client(w: &mut SourceWriter) {
    w.block("def open_client(driver):", |w| {
        w.line("print(f\"Abriendo {CLIENT_URL} ...\")");
        w.line("driver.set_page_load_timeout(INIT_TIMEOUT)");
        w.block("try:", |w| w.line("driver.get(CLIENT_URL)"));
        w.block("finally:", |w| w.line("driver.set_page_load_timeout(PAGE_LOAD_TIMEOUT)"));
    });
    w.blank();
    w.blank();
}

fn wait_ready(w: &mut SourceWriter, wait: &WaitReady) {
    w.line(format!("READY_MARKERS = {}", py_str_list(&wait.markers)));
    w.blank();
    w.blank();
    w.block("def client_ready(driver):", |w| {
        w.block("for marker in READY_MARKERS:", |w| {
            w.block("if driver.find_elements(By.XPATH, marker):", |w| w.line("return True"));
        });
        w.line("return False");
    });
    w.blank();
    w.blank();
    w.block("def wait_until_ready(driver):", |w| {
        w.line("print(\"Esperando el cliente web. Escanea el codigo QR si aparece.\")");
        w.line("waited = 0");
        w.block("while waited < READY_TIMEOUT:", |w| {
            w.block("if client_ready(driver):", |w| {
                w.line("print(\"Cliente web listo\")");
                w.line("return True");
            });
            w.line("print(f\"Esperando conexion... {READY_TIMEOUT - waited}s restantes\")");
            w.line("time.sleep(READY_POLL)");
            w.line("waited += READY_POLL");
        });
        w.line("return client_ready(driver)");
    });
    w.blank();
    w.blank();
}

fn delivery_entry(w: &mut SourceWriter, delivery: &Delivery) {
    w.block("{", |w| {
        w.line(format!("\"id\": {},", py_str(&delivery.contact_id)));
        w.line(format!("\"name\": {},", py_str(&delivery.name)));
        w.line(format!("\"phone\": {},", py_str(&delivery.phone)));
        assign_str(w, "\"message\": ", &delivery.message, ",");
    });
    w.line("},");
}

fn send_loop(w: &mut SourceWriter, send: &SendLoop) {
    w.block("SEND_STRATEGIES = [", |w| {
        for strategy in &send.strategies {
            w.line(format!(
                "({}, {}),",
                py_str(strategy.kind()),
                py_str(strategy.xpath())
            ));
        }
    });
    w.line("]");
    w.blank();
    w.block("CONTACTS = [", |w| {
        for delivery in &send.deliveries {
            delivery_entry(w, delivery);
        }
    });
    w.line("]");
    w.blank();
    w.blank();
    w.block("def deep_link(contact):", |w| {
        w.line("phone = contact[\"phone\"].lstrip(\"+\")");
        w.line("text = urllib.parse.quote(contact[\"message\"], safe=\"\")");
        w.line("return f\"{CLIENT_URL}/send?phone={phone}&text={text}\"");
    });
    w.blank();
    w.blank();
    w.block("def trigger_send(driver):", |w| {
        w.line("deadline = time.time() + SEND_TIMEOUT");
        w.block("for kind, xpath in SEND_STRATEGIES:", |w| {
            w.line("remaining = deadline - time.time()");
            w.block("if remaining <= 0:", |w| w.line("break"));
            w.block("try:", |w| {
                w.line("wait = WebDriverWait(driver, min(ELEMENT_WAIT, remaining))");
                w.line("element = wait.until(EC.element_to_be_clickable((By.XPATH, xpath)))");
            });
            w.block("except Exception:", |w| w.line("continue"));
            w.block("if kind == \"enter\":", |w| w.line("element.send_keys(Keys.ENTER)"));
            w.block("else:", |w| w.line("element.click()"));
            w.line("return xpath");
        });
        w.line("return None");
    });
    w.blank();
    w.blank();
    w.block("def send_one(driver, contact):", |w| {
        w.line("driver.get(deep_link(contact))");
        w.line("time.sleep(PAGE_SETTLE)");
        w.line("used = trigger_send(driver)");
        w.block("if used is None:", |w| {
            w.line("raise RuntimeError(\"boton de envio no encontrado\")");
        });
        w.line("time.sleep(2)");
        w.line("return used");
    });
    w.blank();
    w.blank();
    w.block("def send_with_retries(driver, contact):", |w| {
        w.block("for attempt in range(MAX_RETRIES + 1):", |w| {
            w.block("try:", |w| {
                w.line("used = send_one(driver, contact)");
                w.line("print(f\"    Enviado ({used})\")");
                w.line("return True");
            });
            w.block("except Exception as error:", |w| {
                w.line("print(f\"    Intento {attempt + 1} fallido: {error}\")");
                w.block("if attempt < MAX_RETRIES:", |w| {
                    w.line("wait = RETRY_DELAY * (2 ** attempt) if EXPONENTIAL_BACKOFF else RETRY_DELAY");
                    w.line("print(f\"    Reintentando en {wait}s...\")");
                    w.line("time.sleep(wait)");
                });
            });
        });
        w.line("return False");
    });
    w.blank();
    w.blank();
    w.block("def send_all(driver):", |w| {
        w.line("sent = 0");
        w.line("failed = 0");
        w.line("total = len(CONTACTS)");
        w.block("for index, contact in enumerate(CONTACTS):", |w| {
            w.line("print(f\"[{index + 1}/{total}] {contact['name']} ({contact['phone']})\")");
            w.block("if send_with_retries(driver, contact):", |w| {
                w.line("sent += 1");
                w.line("DELIVERED.add(contact[\"id\"])");
            });
            w.block("else:", |w| {
                w.line("failed += 1");
                w.line("print(f\"    No se pudo enviar a {contact['name']}\")");
            });
            w.block("if index < total - 1:", |w| {
                w.line("delay = random.uniform(DELAY_MIN, DELAY_MAX)");
                w.line("print(f\"    Esperando {delay:.1f}s...\")");
                w.line("time.sleep(delay)");
            });
        });
        w.line("return sent, failed");
    });
    w.blank();
    w.blank();
    w.block("def manual_hand_off():", |w| {
        w.line("pending = [c for c in CONTACTS if c[\"id\"] not in DELIVERED]");
        w.line("print()");
        w.line("print(\"=== MODO MANUAL ===\")");
        w.line("print(\"Se abrira cada chat en tu navegador. Envia el mensaje y vuelve aqui.\")");
        w.block("for index, contact in enumerate(pending):", |w| {
            w.line("print(f\"[{index + 1}/{len(pending)}] {contact['name']} ({contact['phone']})\")");
            w.line("webbrowser.open(deep_link(contact))");
            w.line("input(\"Presiona Enter para continuar...\")");
        });
        w.line("print(\"Modo manual completado\")");
    });
    w.blank();
    w.blank();
}

fn summary(w: &mut SourceWriter) {
    w.block("def print_summary(sent, failed):", |w| {
        w.line("total = sent + failed");
        w.line("rate = (sent / total * 100) if total else 0.0");
        w.line("print()");
        w.line("print(\"=\" * 60)");
        w.line("print(\"PROCESO COMPLETADO\")");
        w.line("print(\"=\" * 60)");
        w.line("print(f\"Exitosos: {sent}\")");
        w.line("print(f\"Fallidos: {failed}\")");
        w.line("print(f\"Tasa de exito: {rate:.1f}%\")");
    });
    w.blank();
    w.blank();
}

/// The statements `main` runs for a step, inside the guarded section.
fn main_statements(w: &mut SourceWriter, step: &Step) {
    match step {
        Step::LaunchBrowser(_) => {}
        Step::OpenClient => w.line("open_client(driver)"),
        Step::WaitReady(_) => {
            w.block("if not wait_until_ready(driver):", |w| w.line("raise ClientNotReady()"));
        }
        Step::SendLoop(_) => w.line("sent, failed = send_all(driver)"),
        Step::Summary => w.line("print_summary(sent, failed)"),
    }
}

fn main_function(w: &mut SourceWriter, steps: &[Step]) {
    w.block("def main():", |w| {
        w.line("print(\"=\" * 60)");
        w.line("print(TITLE)");
        w.line("print(\"=\" * 60)");
        w.line("print(f\"Contactos: {len(CONTACTS)}\")");
        w.line("print(f\"Velocidad: {SPEED_LABEL}\")");
        w.line("print(f\"Generado: {GENERATED_AT}\")");
        w.line("print()");
        w.block("if not SELENIUM_AVAILABLE:", |w| {
            w.line("print(\"Selenium no disponible. Se usara el modo manual.\")");
            w.line("manual_hand_off()");
            w.line("return");
        });
        if steps.iter().any(|step| matches!(step, Step::LaunchBrowser(_))) {
            w.line("driver = launch_browser()");
            w.block("if driver is None:", |w| {
                w.line("manual_hand_off()");
                w.line("return");
            });
        }
        w.line("hand_off = False");
        w.block("try:", |w| {
            for step in steps {
                main_statements(w, step);
            }
        });
        w.block("except ClientNotReady:", |w| {
            w.line("print(\"El cliente web no respondio a tiempo. Se usara el modo manual.\")");
            w.line("hand_off = True");
        });
        w.block("except Exception as error:", |w| {
            w.line("print(f\"Error en modo automatico: {error}\")");
            w.line("hand_off = True");
        });
        w.block("finally:", |w| w.line("close_browser(driver)"));
        w.block("if hand_off:", |w| w.line("manual_hand_off()"));
    });
    w.blank();
    w.blank();
}

pub(crate) fn entrypoint(w: &mut SourceWriter, call: &str) {
    w.block("if __name__ == \"__main__\":", |w| {
        w.block("try:", |w| w.line(call));
        w.block("except KeyboardInterrupt:", |w| {
            w.line("print()");
            w.line("print(\"Interrumpido por el usuario\")");
        });
    });
}

/// Renders the whole program.
pub fn render(program: &Program) -> String {
    let mut w = SourceWriter::new();
    preamble(&mut w, &program.header);
    imports(&mut w);
    constants(&mut w, &program.header, &program.settings);

    for step in &program.steps {
        match step {
            Step::LaunchBrowser(launch) => launch_browser(&mut w, launch),
            Step::OpenClient => open_client(&mut w),
            Step::WaitReady(wait) => wait_ready(&mut w, wait),
            Step::SendLoop(send) => send_loop(&mut w, send),
            Step::Summary => summary(&mut w),
        }
    }

    main_function(&mut w, &program.steps);
    entrypoint(&mut w, "main()");
    w.finish()
}
