pub mod config;
pub mod engine;
pub mod mailer;
pub mod parser;
pub mod scraper;
pub mod store;
pub mod types;

pub use crate::scraper::SiteScraper;

pub(crate) const DEFAULT_SITE_URL: &str = "https://www.acea.it/tariffe-indici";
