//! Session backends
//!
//! - [`browser`]: Chrome through a WebDriver server
//! - [`http`]: a cookie-keeping HTTP client

pub mod browser;
pub mod http;

pub use browser::{BrowserSession, Locator};
pub use http::{HttpResponse, HttpSession};
