//! Configuration management for the NiCare engine
//!
//! Settings come from layered sources, later ones overriding earlier ones:
//!
//! - **Defaults**: compiled-in values for every key
//! - **Local Files**: YAML configuration files
//! - **`.env`**: loaded into the process environment with `dotenvy`
//! - **Environment Variables**: `NICARE__<SECTION>__<KEY>`, e.g.
//!   `NICARE__CLAIMS__PA_CODE_VALIDITY_DAYS=7`
//!
//! The loaded configuration is validated before it is handed out.
//!
//! # Example
//!
//! ```rust,no_run
//! use config_engine::NicareConfig;
//!
//! let config = NicareConfig::load(Some("nicare.yaml".as_ref()))?;
//! println!("PA codes expire after {} days", config.claims.pa_code_validity_days);
//! # Ok::<(), config_engine::ConfigError>(())
//! ```

pub mod settings;
pub mod loader;
pub mod validation;
pub mod error;

pub use settings::*;
pub use loader::*;
pub use error::*;
