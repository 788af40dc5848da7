#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Monitor configuration: raw model, validation and engine settings.
//!
//! Layout: `model.rs` (typed config documents), `validate.rs` (normalization
//! rules), `defaults.rs` (shared defaults), `error.rs` (`ConfigError`).

pub mod defaults;
pub mod error;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use model::{
    EngineSettings, LimitsConfig, MonitorConfig, NetworkConfig, ProxyKind, ProxySettings,
    UiConfig, ValidatedConfig,
};
pub use validate::{normalize_port, parse_proxy, rate_limit_from_kbps};
