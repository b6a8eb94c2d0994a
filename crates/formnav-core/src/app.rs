//! Installed app seam.
//!
//! Install and config loading are handled elsewhere; the session only needs a
//! few read-only facts about the app it navigates.

use serde::{Deserialize, Serialize};

/// A named entry point into the app, reachable by smart links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub id: String,
    /// Command ids to push, outermost first.
    pub stack: Vec<String>,
    #[serde(default)]
    pub arguments: Vec<String>,
}

pub trait InstalledApp: Send + Sync {
    /// Localised app title; seeds every breadcrumb trail.
    fn title(&self) -> String;

    fn version(&self) -> String;

    fn endpoint(&self, id: &str) -> Option<Endpoint>;

    fn set_locale(&self, locale: &str);
}
