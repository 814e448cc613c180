//! In-memory host document
//!
//! A fake page whose elements, events and address are driven by the caller.
//! It records every listener binding, dispatched sequence and control
//! override so the pipeline and lifecycle can be exercised without a browser.

use super::{ElementToken, HostPage, PageEvent, PageEventKind, PollSnapshot, SyntheticEvent};
use crate::error::HostError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default)]
struct ScriptedElement {
    selector: String,
    text: String,
    markup: String,
    disabled: bool,
    connected: bool,
}

#[derive(Debug, Default)]
struct ScriptedState {
    installed: bool,
    generation: u64,
    install_count: usize,
    teardown_count: usize,
    address: String,
    next_token: u64,
    elements: HashMap<ElementToken, ScriptedElement>,
    order: Vec<ElementToken>,
    bound: HashSet<ElementToken>,
    bind_calls: Vec<ElementToken>,
    queue: Vec<PageEvent>,
    focused: Option<ElementToken>,
    dispatched: Vec<(ElementToken, Vec<SyntheticEvent>)>,
    cancelled: HashSet<&'static str>,
    fail_dispatch: bool,
    styles: HashMap<String, String>,
}

/// Scriptable [`HostPage`] kept entirely in memory
#[derive(Debug, Default)]
pub struct ScriptedHost {
    state: Mutex<ScriptedState>,
}

impl ScriptedHost {
    /// Empty document at `address`
    pub fn new(address: impl Into<String>) -> Self {
        let host = Self::default();
        {
            let mut state = host.state.lock();
            state.address = address.into();
            state.next_token = 1;
        }
        host
    }

    /// Add a connected element matched by `selector`
    pub fn add_element(&self, selector: &str, text: &str) -> ElementToken {
        let mut state = self.state.lock();
        let token = ElementToken(state.next_token);
        state.next_token += 1;
        state.elements.insert(
            token,
            ScriptedElement {
                selector: selector.to_string(),
                text: text.to_string(),
                markup: text.to_string(),
                disabled: false,
                connected: true,
            },
        );
        state.order.push(token);
        token
    }

    /// Detach an element from the document, as a re-render would
    pub fn detach(&self, element: ElementToken) {
        if let Some(el) = self.state.lock().elements.get_mut(&element) {
            el.connected = false;
        }
    }

    /// Replace an element's text
    pub fn set_text(&self, element: ElementToken, text: &str) {
        if let Some(el) = self.state.lock().elements.get_mut(&element) {
            el.text = text.to_string();
        }
    }

    /// Queue a page event
    pub fn push_event(&self, kind: PageEventKind) {
        self.state.lock().queue.push(PageEvent::now(kind));
    }

    /// Change the page address
    pub fn set_address(&self, address: &str) {
        self.state.lock().address = address.to_string();
    }

    /// Drop the agent script, as a full page load would
    pub fn unload(&self) {
        let mut state = self.state.lock();
        state.installed = false;
        state.bound.clear();
        state.queue.clear();
    }

    /// Make `dispatchEvent` report these event types as cancelled
    pub fn cancel_events(&self, names: &[&'static str]) {
        self.state.lock().cancelled.extend(names.iter().copied());
    }

    /// Make every dispatch fail inside the page
    pub fn fail_dispatch(&self, fail: bool) {
        self.state.lock().fail_dispatch = fail;
    }

    /// Whether the agent script is installed
    pub fn is_installed(&self) -> bool {
        self.state.lock().installed
    }

    /// Generation passed to the last install
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    /// How many times the agent was installed
    pub fn install_count(&self) -> usize {
        self.state.lock().install_count
    }

    /// How many teardowns happened
    pub fn teardown_count(&self) -> usize {
        self.state.lock().teardown_count
    }

    /// Every listener binding in order, including repeats
    pub fn bind_calls(&self) -> Vec<ElementToken> {
        self.state.lock().bind_calls.clone()
    }

    /// Whether listeners are currently attached to `element`
    pub fn is_bound(&self, element: ElementToken) -> bool {
        self.state.lock().bound.contains(&element)
    }

    /// Dispatched sequences in order
    pub fn dispatched(&self) -> Vec<(ElementToken, Vec<SyntheticEvent>)> {
        self.state.lock().dispatched.clone()
    }

    /// Currently focused element
    pub fn focused(&self) -> Option<ElementToken> {
        self.state.lock().focused
    }

    /// Markup of an element
    pub fn markup(&self, element: ElementToken) -> Option<String> {
        self.state.lock().elements.get(&element).map(|el| el.markup.clone())
    }

    /// Whether an element is disabled
    pub fn is_disabled(&self, element: ElementToken) -> bool {
        self.state
            .lock()
            .elements
            .get(&element)
            .is_some_and(|el| el.disabled)
    }

    /// Ids of installed style sheets
    pub fn style_ids(&self) -> Vec<String> {
        self.state.lock().styles.keys().cloned().collect()
    }

    fn live(state: &ScriptedState, element: ElementToken) -> Result<(), HostError> {
        match state.elements.get(&element) {
            Some(el) if el.connected => Ok(()),
            _ => Err(HostError::StaleElement(element.0)),
        }
    }

    fn require_installed(state: &ScriptedState) -> Result<(), HostError> {
        if state.installed {
            Ok(())
        } else {
            Err(HostError::ScriptMissing)
        }
    }
}

#[async_trait]
impl HostPage for ScriptedHost {
    async fn install(&self, generation: u64) -> Result<(), HostError> {
        let mut state = self.state.lock();
        state.bound.clear();
        state.queue.clear();
        state.installed = true;
        state.generation = generation;
        state.install_count += 1;
        Ok(())
    }

    async fn teardown(&self) -> Result<(), HostError> {
        let mut state = self.state.lock();
        state.bound.clear();
        state.queue.clear();
        state.teardown_count += 1;
        Ok(())
    }

    async fn poll(&self) -> Result<PollSnapshot, HostError> {
        let mut state = self.state.lock();
        let events = if state.installed {
            std::mem::take(&mut state.queue)
        } else {
            Vec::new()
        };
        Ok(PollSnapshot {
            installed: state.installed,
            address: state.address.clone(),
            events,
        })
    }

    async fn locate(&self, selectors: &[String]) -> Result<Option<ElementToken>, HostError> {
        let state = self.state.lock();
        Self::require_installed(&state)?;
        for selector in selectors {
            let found = state.order.iter().copied().find(|token| {
                state
                    .elements
                    .get(token)
                    .is_some_and(|el| el.connected && &el.selector == selector)
            });
            if found.is_some() {
                return Ok(found);
            }
        }
        Ok(None)
    }

    async fn bind_listeners(&self, element: ElementToken) -> Result<(), HostError> {
        let mut state = self.state.lock();
        Self::require_installed(&state)?;
        Self::live(&state, element)?;
        state.bind_calls.push(element);
        state.bound.insert(element);
        Ok(())
    }

    async fn read_text(&self, element: ElementToken) -> Result<String, HostError> {
        let state = self.state.lock();
        Self::live(&state, element)?;
        Ok(state.elements[&element].text.clone())
    }

    async fn focus(&self, element: ElementToken) -> Result<(), HostError> {
        let mut state = self.state.lock();
        Self::live(&state, element)?;
        state.focused = Some(element);
        Ok(())
    }

    async fn dispatch_sequence(
        &self,
        element: ElementToken,
        events: &[SyntheticEvent],
    ) -> Result<Vec<bool>, HostError> {
        let mut state = self.state.lock();
        Self::live(&state, element)?;
        if state.fail_dispatch {
            return Err(HostError::ScriptFailed("DataTransfer is not defined".to_string()));
        }
        let results = events
            .iter()
            .map(|event| !(event.cancelable() && state.cancelled.contains(event.name())))
            .collect();
        state.dispatched.push((element, events.to_vec()));
        Ok(results)
    }

    async fn install_style(&self, id: &str, css: &str) -> Result<bool, HostError> {
        let mut state = self.state.lock();
        if state.styles.contains_key(id) {
            return Ok(false);
        }
        state.styles.insert(id.to_string(), css.to_string());
        Ok(true)
    }

    async fn override_control(
        &self,
        element: ElementToken,
        markup: &str,
    ) -> Result<String, HostError> {
        let mut state = self.state.lock();
        Self::live(&state, element)?;
        let el = state
            .elements
            .get_mut(&element)
            .ok_or(HostError::StaleElement(element.0))?;
        el.disabled = true;
        Ok(std::mem::replace(&mut el.markup, markup.to_string()))
    }

    async fn restore_control(&self, element: ElementToken, markup: &str) -> Result<(), HostError> {
        let mut state = self.state.lock();
        Self::live(&state, element)?;
        let el = state
            .elements
            .get_mut(&element)
            .ok_or(HostError::StaleElement(element.0))?;
        el.disabled = false;
        el.markup = markup.to_string();
        Ok(())
    }
}
