//! Browser automation module
//!
//! Launches or attaches to a Chromium instance through ChromiumOxide and
//! brings up the host application's tab.

pub mod controller;
pub mod navigation;

pub use controller::{is_host_page, BrowserConfig, BrowserController, PageHandle};
pub use navigation::{NavigationOptions, NavigationResult, PageNavigator, WaitUntil};
