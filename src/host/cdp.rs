//! Host page driven over CDP
//!
//! A small agent script lives in the page. It only records events and
//! performs DOM operations when asked; all decisions stay on the Rust side.
//! Every call goes through `Runtime.evaluate` and returns a
//! `{ok, value | error}` envelope so page exceptions never escape as CDP
//! errors.

use super::{ElementToken, HostPage, PageEvent, PageEventKind, PollSnapshot, SyntheticEvent};
use crate::browser::PageHandle;
use crate::error::HostError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, instrument};

/// Page-side agent. Defines `window.__readerPaste` once per document.
const AGENT_SCRIPT: &str = r#"
(() => {
    if (window.__readerPaste) return true;

    const state = {
        generation: 0,
        queue: [],
        nextToken: 1,
        ids: new WeakMap(),
        elements: new Map(),
        bound: new Map(),
        observer: null,
        hooks: [],
        mutationPending: false,
    };

    const push = (event) => {
        event.at = Date.now();
        state.queue.push(event);
        if (state.queue.length > 1000) state.queue.shift();
    };

    const tokenOf = (el) => {
        let token = state.ids.get(el);
        if (!token) {
            token = state.nextToken++;
            state.ids.set(el, token);
            state.elements.set(token, new WeakRef(el));
        }
        return token;
    };

    const resolve = (token) => {
        const ref = state.elements.get(token);
        const el = ref && ref.deref();
        if (!el || !el.isConnected) {
            const err = new Error('stale element ' + token);
            err.stale = true;
            throw err;
        }
        return el;
    };

    const buildTransfer = (desc) => {
        const dt = new DataTransfer();
        for (const item of desc.items) dt.setData(item.mime, item.data);
        if (desc.file) {
            dt.items.add(new File([desc.file.content], desc.file.name, { type: desc.file.mime }));
        }
        return dt;
    };

    const buildEvent = (desc) => {
        switch (desc.type) {
            case 'focus':
                return new FocusEvent('focus', { bubbles: true });
            case 'beforeinput':
            case 'input':
                return new InputEvent(desc.type, {
                    bubbles: true,
                    cancelable: desc.cancelable,
                    inputType: desc.inputType,
                    data: desc.data,
                });
            case 'paste':
                return new ClipboardEvent('paste', {
                    bubbles: true,
                    cancelable: desc.cancelable,
                    clipboardData: buildTransfer(desc.transfer),
                });
            default:
                return new Event(desc.type, { bubbles: true, cancelable: desc.cancelable });
        }
    };

    const agent = {
        install(generation) {
            agent.teardown();
            state.generation = generation;

            state.observer = new MutationObserver(() => {
                if (state.mutationPending) return;
                state.mutationPending = true;
                push({ kind: 'mutation' });
            });
            state.observer.observe(document.body || document.documentElement, {
                childList: true,
                subtree: true,
                attributes: true,
                characterData: true,
            });

            const onError = (e) => push({ kind: 'error', message: String((e && e.message) || 'error') });
            const onRejection = (e) => push({ kind: 'rejection', message: String((e && e.reason) || 'rejection') });
            window.addEventListener('error', onError);
            window.addEventListener('unhandledrejection', onRejection);
            state.hooks = [['error', onError], ['unhandledrejection', onRejection]];
            return state.generation;
        },

        teardown() {
            if (state.observer) state.observer.disconnect();
            state.observer = null;
            for (const [type, handler] of state.hooks) window.removeEventListener(type, handler);
            state.hooks = [];
            for (const [, entry] of state.bound) {
                const el = entry.ref.deref();
                if (!el) continue;
                for (const [type, handler] of entry.handlers) el.removeEventListener(type, handler);
            }
            state.bound.clear();
            state.queue = [];
            state.mutationPending = false;
            return true;
        },

        poll() {
            const events = state.queue.splice(0);
            state.mutationPending = false;
            return { installed: true, href: location.href, now: Date.now(), events };
        },

        locate(selectors) {
            for (const selector of selectors) {
                const el = document.querySelector(selector);
                if (el) return tokenOf(el);
            }
            return null;
        },

        bind(token) {
            const el = resolve(token);
            if (state.bound.has(token)) return false;
            const handlers = [
                ['input', () => push({ kind: 'input', token }), { passive: true }],
                ['paste', () => push({ kind: 'paste', token }), {}],
                ['keyup', (e) => push({ kind: 'key_up', token, key: e.key }), { passive: true }],
            ];
            for (const [type, handler, options] of handlers) el.addEventListener(type, handler, options);
            state.bound.set(token, { ref: new WeakRef(el), handlers });
            return true;
        },

        text(token) {
            const el = resolve(token);
            return el instanceof HTMLTextAreaElement ? el.value : (el.textContent || '');
        },

        focus(token) {
            const el = resolve(token);
            if (typeof el.focus === 'function') el.focus();
            return true;
        },

        dispatch(token, descs) {
            const el = resolve(token);
            const events = descs.map(buildEvent);
            return events.map((event) => el.dispatchEvent(event));
        },

        style(id, css) {
            if (document.getElementById(id)) return false;
            const style = document.createElement('style');
            style.id = id;
            style.textContent = css;
            (document.head || document.documentElement).appendChild(style);
            return true;
        },

        override(token, markup) {
            const el = resolve(token);
            const previous = el.innerHTML;
            el.classList.add('loading');
            el.setAttribute('disabled', 'true');
            el.innerHTML = markup;
            return previous;
        },

        restore(token, markup) {
            const el = resolve(token);
            el.classList.remove('loading');
            el.removeAttribute('disabled');
            el.innerHTML = markup;
            return true;
        },
    };

    window.__readerPaste = agent;
    return true;
})()
"#;

const POLL_SCRIPT: &str = r#"
(() => {
    const agent = window.__readerPaste;
    if (!agent) return { installed: false, href: location.href, now: Date.now(), events: [] };
    return agent.poll();
})()
"#;

#[derive(Debug, Deserialize)]
struct CallReply {
    ok: bool,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    stale: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(default)]
    at: f64,
    #[serde(flatten)]
    kind: PageEventKind,
}

#[derive(Debug, Deserialize)]
struct RawPoll {
    installed: bool,
    href: String,
    now: f64,
    events: Vec<RawEvent>,
}

impl RawPoll {
    fn into_snapshot(self) -> PollSnapshot {
        let now = self.now;
        let events = self
            .events
            .into_iter()
            .map(|raw| PageEvent {
                kind: raw.kind,
                age: Duration::from_millis((now - raw.at).max(0.0) as u64),
            })
            .collect();
        PollSnapshot {
            installed: self.installed,
            address: self.href,
            events,
        }
    }
}

/// [`HostPage`] backed by a CDP page
#[derive(Clone)]
pub struct CdpHost {
    page: PageHandle,
}

impl CdpHost {
    /// Wrap an open page
    pub fn new(page: PageHandle) -> Self {
        Self { page }
    }

    async fn evaluate<T: DeserializeOwned>(&self, script: String) -> Result<T, HostError> {
        self.page
            .inner()
            .evaluate(script.as_str())
            .await?
            .into_value::<T>()
            .map_err(|e| HostError::Decode(e.to_string()))
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        args: &[Value],
        element: Option<ElementToken>,
    ) -> Result<T, HostError> {
        let args = args
            .iter()
            .map(Value::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let script = format!(
            r#"(() => {{
                const agent = window.__readerPaste;
                if (!agent) return {{ ok: false, missing: true }};
                try {{
                    return {{ ok: true, value: agent.{method}({args}) }};
                }} catch (e) {{
                    return {{ ok: false, stale: !!(e && e.stale), error: String((e && e.message) || e) }};
                }}
            }})()"#
        );

        let reply: CallReply = self.evaluate(script).await?;
        if reply.ok {
            return serde_json::from_value(reply.value).map_err(|e| HostError::Decode(e.to_string()));
        }
        if reply.missing {
            return Err(HostError::ScriptMissing);
        }
        if reply.stale {
            return Err(HostError::StaleElement(element.map(|t| t.0).unwrap_or_default()));
        }
        Err(HostError::ScriptFailed(
            reply.error.unwrap_or_else(|| format!("{} failed", method)),
        ))
    }
}

#[async_trait]
impl HostPage for CdpHost {
    #[instrument(skip(self))]
    async fn install(&self, generation: u64) -> Result<(), HostError> {
        let _: bool = self.evaluate(AGENT_SCRIPT.to_string()).await?;
        let installed: u64 = self.call("install", &[json!(generation)], None).await?;
        debug!("Page agent installed for generation {}", installed);
        Ok(())
    }

    async fn teardown(&self) -> Result<(), HostError> {
        match self.call::<bool>("teardown", &[], None).await {
            Ok(_) | Err(HostError::ScriptMissing) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn poll(&self) -> Result<PollSnapshot, HostError> {
        let raw: RawPoll = self.evaluate(POLL_SCRIPT.to_string()).await?;
        Ok(raw.into_snapshot())
    }

    async fn locate(&self, selectors: &[String]) -> Result<Option<ElementToken>, HostError> {
        self.call("locate", &[json!(selectors)], None).await
    }

    async fn bind_listeners(&self, element: ElementToken) -> Result<(), HostError> {
        let fresh: bool = self.call("bind", &[json!(element)], Some(element)).await?;
        if !fresh {
            debug!("Listeners already present on {}", element);
        }
        Ok(())
    }

    async fn read_text(&self, element: ElementToken) -> Result<String, HostError> {
        self.call("text", &[json!(element)], Some(element)).await
    }

    async fn focus(&self, element: ElementToken) -> Result<(), HostError> {
        let _: bool = self.call("focus", &[json!(element)], Some(element)).await?;
        Ok(())
    }

    async fn dispatch_sequence(
        &self,
        element: ElementToken,
        events: &[SyntheticEvent],
    ) -> Result<Vec<bool>, HostError> {
        let wire: Vec<Value> = events.iter().map(SyntheticEvent::to_wire).collect();
        self.call("dispatch", &[json!(element), Value::Array(wire)], Some(element))
            .await
    }

    async fn install_style(&self, id: &str, css: &str) -> Result<bool, HostError> {
        self.call("style", &[json!(id), json!(css)], None).await
    }

    async fn override_control(
        &self,
        element: ElementToken,
        markup: &str,
    ) -> Result<String, HostError> {
        self.call("override", &[json!(element), json!(markup)], Some(element))
            .await
    }

    async fn restore_control(&self, element: ElementToken, markup: &str) -> Result<(), HostError> {
        let _: bool = self
            .call("restore", &[json!(element), json!(markup)], Some(element))
            .await?;
        Ok(())
    }
}
