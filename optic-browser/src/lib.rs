//! Process-wide headless browser session with per-request page leases.
//!
//! One WebDriver-managed browser process serves the whole host process:
//! launching a browser per request costs seconds, so the session is amortised
//! and requests get isolation through short-lived window leases instead.

pub mod session;

pub use session::{build_launch_arguments, BrowserSession, PageLease, SessionConfig};
