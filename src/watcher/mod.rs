//! Composer watching and lifecycle management
//!
//! - [`BindingRegistry`]: which elements carry listeners in this generation
//! - [`TriggerState`]: debounce, paste cooldown and paste settle timers
//! - [`Lifecycle`]: the poll loop, rebinding, and full reinitialize

pub mod bindings;
pub mod lifecycle;
pub mod triggers;

pub use bindings::BindingRegistry;
pub use lifecycle::{Lifecycle, ReinitReason, Session};
pub use triggers::{is_trigger_key, Trigger, TriggerState};
