//! Busy indicator on the host's submit control.
//!
//! While a pipeline run is in flight the send button is disabled and shows a
//! spinner, so the user does not send the message before the attachment lands.

use crate::host::{ElementToken, HostPage};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Id of the injected animation style sheet
pub const STYLE_ID: &str = "reader-paste-styles";

const SPIN_CSS: &str = r#"
@keyframes spin {
  to {
    transform: rotate(360deg);
  }
}
.animate-spin {
  animation: spin 1s linear infinite;
}
"#;

const SPINNER_MARKUP: &str = r#"<svg class="animate-spin" xmlns="http://www.w3.org/2000/svg" width="16" height="16" fill="currentColor" viewBox="0 0 256 256"><circle class="opacity-25" cx="128" cy="128" r="96" stroke="currentColor" stroke-width="16" fill="none"></circle><path class="opacity-75" fill="currentColor" d="M128 32a96 96 0 0 1 96 96h-16a80 80 0 0 0-80-80V32z"></path></svg>"#;

#[derive(Debug)]
struct Override {
    control: ElementToken,
    original: String,
}

#[derive(Debug, Default)]
struct IndicatorState {
    styles_injected: bool,
    shown: Option<Override>,
    retired: bool,
}

/// Lifecycle-scoped busy indicator
pub struct BusyIndicator {
    host: Arc<dyn HostPage>,
    submit_selector: Vec<String>,
    state: Mutex<IndicatorState>,
}

impl BusyIndicator {
    /// Indicator for the control matched by `submit_selector`
    pub fn new(host: Arc<dyn HostPage>, submit_selector: impl Into<String>) -> Self {
        Self {
            host,
            submit_selector: vec![submit_selector.into()],
            state: Mutex::new(IndicatorState::default()),
        }
    }

    /// Disable the submit control and show the spinner. No-op if already shown.
    pub async fn show(&self) {
        let mut state = self.state.lock().await;
        if state.retired {
            debug!("Indicator retired, ignoring show");
            return;
        }

        if !state.styles_injected {
            match self.host.install_style(STYLE_ID, SPIN_CSS).await {
                Ok(_) => state.styles_injected = true,
                Err(e) => warn!("Failed to inject indicator styles: {}", e),
            }
        }

        if state.shown.is_some() {
            return;
        }

        let control = match self.host.locate(&self.submit_selector).await {
            Ok(Some(control)) => control,
            Ok(None) => {
                debug!("Submit control not found");
                return;
            }
            Err(e) => {
                warn!("Failed to locate submit control: {}", e);
                return;
            }
        };

        match self.host.override_control(control, SPINNER_MARKUP).await {
            Ok(original) => state.shown = Some(Override { control, original }),
            Err(e) => warn!("Failed to show busy indicator: {}", e),
        }
    }

    /// Restore the submit control. No-op if nothing is shown.
    pub async fn hide(&self) {
        let mut state = self.state.lock().await;
        let Some(shown) = state.shown.take() else {
            return;
        };
        if let Err(e) = self.host.restore_control(shown.control, &shown.original).await {
            warn!("Failed to restore submit control: {}", e);
        }
    }

    /// Hide and retire; the next lifecycle generation builds a new indicator
    pub async fn cleanup(&self) {
        self.hide().await;
        self.state.lock().await.retired = true;
    }

    /// Whether the spinner is currently shown
    pub async fn is_shown(&self) -> bool {
        self.state.lock().await.shown.is_some()
    }
}
