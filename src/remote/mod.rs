pub mod client;
pub mod error;
pub mod tracker;
pub mod types;
pub mod wiki;

use std::fmt;

pub use client::ApiClient;
pub use error::ApiError;
pub use tracker::{StartedExport, TrackerClient};
pub use types::{TrackerProgress, WikiProgress};
pub use wiki::WikiClient;

/// The two hosted products whose exports are backed up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum System {
    Tracker,
    Wiki,
}

impl System {
    /// Artifact type embedded in storage keys.
    pub fn artifact_type(self) -> &'static str {
        match self {
            System::Tracker => "tracker",
            System::Wiki => "wiki",
        }
    }
}

impl fmt::Display for System {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.artifact_type())
    }
}
