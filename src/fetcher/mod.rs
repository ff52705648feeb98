//! Page acquisition: headless browser by default, plain HTTP as a fallback

mod browser;
mod consent;
mod http;
mod scroll;
mod session;

pub use browser::BrowserFetcher;
pub use consent::{ConsentOutcome, ConsentPage, dismiss_consent};
pub use http::HttpFetcher;
pub use scroll::{LazyPage, ScrollOutcome, ScrollPolicy, load_all_content};
pub use session::{RenderSession, render_and_release};
