//! # ISC Profile
//!
//! Profile model and loading for the infrastructure state checker.
//!
//! A profile is a TOML document declaring typed inputs and controls. Each
//! control groups expectations against resources located through templated
//! locators. Loading validates the document; binding coerces inputs,
//! expands `for_each` resources and produces an immutable [`Profile`].
//!
//! ```no_run
//! use isc_profile::{InputSet, ProfileDocument};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let document = ProfileDocument::load_file("profiles/ha-gce.toml")?;
//! let mut inputs = InputSet::load_file("inputs.json")?;
//! inputs.apply_env_overrides(&document.inputs);
//! let profile = document.bind_with(&inputs)?;
//! println!("{} controls", profile.controls.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod inputs;
pub mod loader;
pub mod logging;
pub mod model;

pub use inputs::{bind_inputs, BoundInputs, InputError, InputSet, InputSpec, InputType};
pub use loader::{ProfileDocument, ProfileError};
pub use model::{
    Comparator, Control, Expectation, Expected, FieldPath, FieldPathError, LocatorError,
    PathComponent, Profile, ResourceDescriptor, ResourceGroup, ResourceType, Value,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
