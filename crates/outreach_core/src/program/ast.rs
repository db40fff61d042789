//! crates/outreach_core/src/program/ast.rs
//!
//! A typed description of the automation program. The synthesizer builds
//! one of these from validated contacts; a renderer turns it into source.

use chrono::{DateTime, Utc};

use crate::policy::{DelayRange, RetryPolicy, Timeouts};

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub header: Header,
    pub settings: Settings,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub title: String,
    pub generated_at: DateTime<Utc>,
    pub speed_label: String,
}

/// Values rendered once as module-level constants.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub client_url: String,
    pub delay: DelayRange,
    pub retry: RetryPolicy,
    pub timeouts: Timeouts,
}

/// The phases of a run, in the order the program executes them.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    LaunchBrowser(LaunchBrowser),
    OpenClient,
    WaitReady(WaitReady),
    SendLoop(SendLoop),
    Summary,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::LaunchBrowser(_) => "launch_browser",
            Step::OpenClient => "open_client",
            Step::WaitReady(_) => "wait_ready",
            Step::SendLoop(_) => "send_loop",
            Step::Summary => "summary",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LaunchBrowser {
    pub flags: Vec<String>,
    pub excluded_switches: Vec<String>,
    /// Profile directory name under the user's home, so the web client
    /// session survives between runs.
    pub profile_dir: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WaitReady {
    /// XPath expressions; any one present means the client is ready.
    pub markers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SendLoop {
    pub deliveries: Vec<Delivery>,
    /// Tried in order until one finds its element.
    pub strategies: Vec<SendStrategy>,
}

/// One recipient with its already personalized message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub contact_id: String,
    pub name: String,
    pub phone: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendStrategy {
    /// Click the element found by the XPath.
    Click { xpath: String },
    /// Focus the editable element found by the XPath and press Enter.
    SubmitEditable { xpath: String },
}

impl SendStrategy {
    pub fn xpath(&self) -> &str {
        match self {
            SendStrategy::Click { xpath } | SendStrategy::SubmitEditable { xpath } => xpath,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SendStrategy::Click { .. } => "click",
            SendStrategy::SubmitEditable { .. } => "enter",
        }
    }
}
