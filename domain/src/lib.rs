//! Domain library for the URL resource module.
//!
//! This crate holds the record types, ports (traits), error definitions and
//! the pure link logic: weak URL validation, outgoing-link construction with
//! parameter substitution, and display-mode selection. Keep adapters and IO
//! concerns out of this crate.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod adapters;
pub mod context;
pub mod display;
pub mod mime;
pub mod render;
pub mod service;
pub mod validate;

pub use context::{ContextValues, RenderContext};
pub use display::{DisplayMode, DisplayOptions};
pub use mime::{ExtensionMimeGuesser, MimeGuesser};

/// A stored URL resource activity.
///
/// Created and mutated by the add/update-instance handlers, read-only during
/// rendering, deleted together with its owning activity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlResource {
    /// Assigned by the record store on insert.
    pub id: u64,
    /// Owning course id.
    pub course: u64,
    pub name: String,
    pub intro: String,
    /// Raw or templated URL; may still contain substitution parameters.
    pub external_url: String,
    pub display: DisplayMode,
    pub display_options: DisplayOptions,
    /// Outgoing query-parameter name -> contextual variable name.
    pub parameters: BTreeMap<String, String>,
    /// Visibility window in unix seconds; `time_close == 0` means unrestricted.
    pub time_open: u64,
    pub time_close: u64,
    pub time_modified: u64,
}

impl UrlResource {
    /// Whether the resource is inside its visibility window at `now`.
    pub fn is_open(&self, now: u64) -> bool {
        if self.time_close == 0 {
            return true;
        }
        self.time_open <= now && now <= self.time_close
    }
}

/// Form data for creating or updating a URL resource, before normalization.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NewResource {
    pub course: u64,
    pub name: String,
    pub intro: String,
    pub external_url: String,
    pub display: DisplayMode,
    pub popup_width: Option<u32>,
    pub popup_height: Option<u32>,
    pub print_heading: bool,
    pub print_intro: bool,
    /// Submitted parameter rows; entries with an empty half are dropped.
    pub parameters: Vec<(String, String)>,
    /// When false the time window is cleared regardless of the values below.
    pub time_restrict: bool,
    pub time_open: u64,
    pub time_close: u64,
}

/// Time source abstraction to make code testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

/// Repository port for persisting and loading resources.
pub trait ResourceRepository: Send + Sync {
    fn get(&self, id: u64) -> Result<Option<UrlResource>, CoreError>;
    /// Insert a record and return the id the store assigned to it.
    fn insert(&self, resource: UrlResource) -> Result<u64, CoreError>;
    fn update(&self, resource: &UrlResource) -> Result<(), CoreError>;
    fn delete(&self, id: u64) -> Result<(), CoreError>;
    fn list_by_course(&self, course: u64) -> Result<Vec<UrlResource>, CoreError>;
}

/// Core domain errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Submitted URL failed the weak validation; surfaced as a form error,
    /// nothing is persisted.
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    /// Legacy record with an empty or placeholder stored URL.
    #[error("resource has no stored url")]
    EmptyResourceUrl,
    #[error("not found")]
    NotFound,
    #[error("repository error: {0}")]
    Repository(String),
}

/// Convert a `SystemTime` to unix seconds, clamping pre-epoch values to zero.
pub fn unix_secs(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}
