use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

pub const DEFAULT_SENTINEL: &str = "All";

const DEFAULT_CATEGORIES: [&str; 9] = [
    "YouTube (General)",
    "YouTube (Hobby)",
    "Learning",
    "Tools",
    "AI",
    "Blog",
    "Hobby",
    "My Apps",
    "Other",
];

/// The synthetic "show everything" tab plus the categories a fresh shelf
/// starts with, in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryOptions {
    pub sentinel: String,
    pub defaults: Vec<String>,
}

impl Default for CategoryOptions {
    fn default() -> Self {
        Self {
            sentinel: DEFAULT_SENTINEL.to_string(),
            defaults: DEFAULT_CATEGORIES.iter().map(|name| name.to_string()).collect(),
        }
    }
}

impl CategoryOptions {
    pub fn validate(&self) -> Result<(), String> {
        let sentinel = self.sentinel.trim();
        if sentinel.is_empty() {
            return Err("sentinel category cannot be blank".into());
        }
        let mut seen = IndexSet::new();
        for name in &self.defaults {
            if name.trim().is_empty() {
                return Err("default categories cannot be blank".into());
            }
            if name == sentinel {
                return Err(format!("'{name}' is both the sentinel and a default"));
            }
            if !seen.insert(name.as_str()) {
                return Err(format!("default category '{name}' is listed twice"));
            }
        }
        Ok(())
    }
}
