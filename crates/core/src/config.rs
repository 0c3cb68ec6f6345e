//! Configuration module for outline generation
//!
//! This module provides the immutable option set passed into every outline
//! request, along with the retry policy used by the engine.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Public/private toggle pair for one member category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibilityToggle {
    pub public: bool,
    pub private: bool,
}

impl Default for VisibilityToggle {
    fn default() -> Self {
        Self {
            public: true,
            private: true,
        }
    }
}

impl VisibilityToggle {
    pub fn new(public: bool, private: bool) -> Self {
        Self { public, private }
    }

    /// Check if a member with the given visibility passes
    pub fn allows(&self, is_public: bool) -> bool {
        if is_public {
            self.public
        } else {
            self.private
        }
    }
}

/// Visibility toggles for container kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerToggles {
    pub classes: bool,
    pub interfaces: bool,
    pub structs: bool,

    /// Enums, global scopes, heuristic containers and loose top-level members
    pub others: bool,
}

impl Default for ContainerToggles {
    fn default() -> Self {
        Self {
            classes: true,
            interfaces: true,
            structs: true,
            others: true,
        }
    }
}

/// Options for one outline request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlineOptions {
    /// Show parameter lists instead of a `(...)` placeholder
    pub show_method_signatures: bool,

    /// Methods and constructors
    pub methods: VisibilityToggle,

    pub properties: VisibilityToggle,

    pub fields: VisibilityToggle,

    pub containers: ContainerToggles,

    /// Alphabetical ordering instead of declaration order
    pub sort_members: bool,

    /// Case-insensitive substring filter on container titles
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name_filter: Option<String>,

    /// Case-insensitive substring filter on member names
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_name_filter: Option<String>,
}

impl Default for OutlineOptions {
    fn default() -> Self {
        Self {
            show_method_signatures: true,
            methods: VisibilityToggle::default(),
            properties: VisibilityToggle::default(),
            fields: VisibilityToggle::default(),
            containers: ContainerToggles::default(),
            sort_members: true,
            class_name_filter: None,
            member_name_filter: None,
        }
    }
}

impl OutlineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from TOML text; missing keys keep their defaults
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::InvalidConfig(e.to_string()))
    }

    /// Load options from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Set signature display (builder pattern)
    pub fn with_signatures(mut self, show: bool) -> Self {
        self.show_method_signatures = show;
        self
    }

    /// Set sort mode (builder pattern)
    pub fn with_sort_members(mut self, sort: bool) -> Self {
        self.sort_members = sort;
        self
    }

    /// Set method visibility (builder pattern)
    pub fn with_methods(mut self, public: bool, private: bool) -> Self {
        self.methods = VisibilityToggle::new(public, private);
        self
    }

    /// Set property visibility (builder pattern)
    pub fn with_properties(mut self, public: bool, private: bool) -> Self {
        self.properties = VisibilityToggle::new(public, private);
        self
    }

    /// Set field visibility (builder pattern)
    pub fn with_fields(mut self, public: bool, private: bool) -> Self {
        self.fields = VisibilityToggle::new(public, private);
        self
    }

    /// Set container toggles (builder pattern)
    pub fn with_containers(mut self, containers: ContainerToggles) -> Self {
        self.containers = containers;
        self
    }

    /// Set class name filter (builder pattern)
    pub fn with_class_filter(mut self, filter: impl Into<String>) -> Self {
        self.class_name_filter = Some(filter.into());
        self
    }

    /// Set member name filter (builder pattern)
    pub fn with_member_filter(mut self, filter: impl Into<String>) -> Self {
        self.member_name_filter = Some(filter.into());
        self
    }

    /// Active class filter, ignoring blank values
    pub fn class_filter(&self) -> Option<&str> {
        active_filter(&self.class_name_filter)
    }

    /// Active member filter, ignoring blank values
    pub fn member_filter(&self) -> Option<&str> {
        active_filter(&self.member_name_filter)
    }
}

fn active_filter(filter: &Option<String>) -> Option<&str> {
    filter.as_deref().map(str::trim).filter(|f| !f.is_empty())
}

/// Case-insensitive substring match
pub fn matches_filter(text: &str, filter: Option<&str>) -> bool {
    match filter {
        Some(filter) => text.to_lowercase().contains(&filter.to_lowercase()),
        None => true,
    }
}

/// Fixed-delay retry policy for outline attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(400),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Single attempt, no delay
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }
}
