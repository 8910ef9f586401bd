//! Client construction options.
//!
//! # Data Flow
//! ```text
//! options file (TOML) or builder calls
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, all errors at once)
//!     → ClientOptions (validated, immutable)
//!     → ConfigClient::new dispatches on the provider tag
//! ```
//!
//! # Design Decisions
//! - One strongly typed struct per backend instead of a loose parameter bag
//! - The poll interval is the only field silently raised to a floor
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::load_options;
pub use schema::{
    ClientOptions, CredentialsOptions, FileOptions, HttpClientOptions, PollErrorPolicy, Provider,
    RemoteOptions,
};
pub use validation::ValidationError;
