//! User-facing side channel
//!
//! The transport never renders anything itself. Toasts, the blocking
//! "log in again?" modal and navigation to the login page go through an
//! [`Interaction`] supplied by the host application.

use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by [`Interaction::confirm`].
pub type ConfirmFuture<'a> = Pin<Box<dyn Future<Output = bool> + Send + 'a>>;

/// A blocking confirm/cancel dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmPrompt {
    pub title: String,
    pub content: String,
    pub confirm_text: String,
    pub cancel_text: String,
}

/// Why the user is being asked to log in again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReauthReason {
    /// Single-token deployment received a 401.
    NotLoggedIn,
    /// Dual-token deployment received a 401 with no refresh token on hand.
    Expired,
    /// The refresh call itself failed.
    RefreshFailed,
}

impl ReauthReason {
    pub fn prompt(self) -> ConfirmPrompt {
        let content = match self {
            ReauthReason::NotLoggedIn => {
                "You are not logged in or your login has expired, so this action is unavailable. Go to the login page?"
            }
            ReauthReason::Expired => {
                "Your login has expired, so this action is unavailable. Go to the login page?"
            }
            ReauthReason::RefreshFailed => {
                "Refreshing your login failed and your session has expired. Go to the login page?"
            }
        };
        ConfirmPrompt {
            title: "Login required".to_string(),
            content: content.to_string(),
            confirm_text: "Log in".to_string(),
            cancel_text: "Cancel".to_string(),
        }
    }
}

/// Host-provided toasts, modals and navigation.
pub trait Interaction: Send + Sync {
    /// Show a transient, non-blocking notice.
    fn show_toast(&self, message: &str);

    /// Dismiss any visible notice.
    fn hide_toast(&self);

    /// Ask the user; resolves `true` on confirm.
    fn confirm<'a>(&'a self, prompt: &'a ConfirmPrompt) -> ConfirmFuture<'a>;

    fn navigate_to(&self, url: &str);
}

/// Headless default: writes everything to the log and declines every prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogInteraction;

impl Interaction for LogInteraction {
    fn show_toast(&self, message: &str) {
        log::info!("[Miniapp] notice: {}", message);
    }

    fn hide_toast(&self) {}

    fn confirm<'a>(&'a self, prompt: &'a ConfirmPrompt) -> ConfirmFuture<'a> {
        log::warn!("[Miniapp] {}: {} (declined)", prompt.title, prompt.content);
        Box::pin(async { false })
    }

    fn navigate_to(&self, url: &str) {
        log::info!("[Miniapp] navigate to {}", url);
    }
}
