// src/model.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Polling priority of a tracked organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
pub enum Priority {
    High,
    Medium,
    #[default]
    Low,
}

impl Priority {
    /// Normalize a free-text tag ("High", "high ", "MEDIUM", ...).
    /// Unknown or empty input maps to the lowest tier.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Priority::High,
            "medium" => Priority::Medium,
            _ => Priority::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        Ok(raw.as_deref().map(Priority::parse).unwrap_or_default())
    }
}

/// A tracked organization. Immutable for the duration of a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Opaque source endpoints (career feed URLs, search hints, ...).
    #[serde(default)]
    pub endpoints: Vec<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, alias = "trackHiring", alias = "track_hiring")]
    pub track_hires: bool,
    #[serde(default, alias = "trackPostings", alias = "track_jobs")]
    pub track_postings: bool,
}

impl Entity {
    pub fn new(id: impl Into<String>, priority: Priority) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            endpoints: Vec::new(),
            priority,
            track_hires: false,
            track_postings: false,
        }
    }

    pub fn with_hires(mut self) -> Self {
        self.track_hires = true;
        self
    }

    pub fn with_postings(mut self) -> Self {
        self.track_postings = true;
        self
    }

    /// Name for humans; falls back to the id when the sheet left it blank.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Hire,
    Posting,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Hire => "hire",
            RecordKind::Posting => "posting",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HireRecord {
    pub name: String,
    pub title: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub profile_url: Option<String>,
    pub source: String,
    pub discovered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingRecord {
    pub title: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    pub source: String,
    pub discovered_at: DateTime<Utc>,
}

/// A single discovered fact about an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Record {
    Hire(HireRecord),
    Posting(PostingRecord),
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Hire(_) => RecordKind::Hire,
            Record::Posting(_) => RecordKind::Posting,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Record::Hire(h) => &h.title,
            Record::Posting(p) => &p.title,
        }
    }

    pub fn location(&self) -> &str {
        match self {
            Record::Hire(h) => &h.location,
            Record::Posting(p) => &p.location,
        }
    }

    pub fn source(&self) -> &str {
        match self {
            Record::Hire(h) => &h.source,
            Record::Posting(p) => &p.source,
        }
    }

    pub fn discovered_at(&self) -> DateTime<Utc> {
        match self {
            Record::Hire(h) => h.discovered_at,
            Record::Posting(p) => p.discovered_at,
        }
    }

    pub fn link(&self) -> Option<&str> {
        match self {
            Record::Hire(h) => h.profile_url.as_deref(),
            Record::Posting(p) => p.url.as_deref(),
        }
    }

    /// Lower-cased `name-title` for hires, `title-location` for postings.
    /// Whitespace is kept as supplied.
    pub fn identity_key(&self) -> String {
        match self {
            Record::Hire(h) => format!("{}-{}", h.name, h.title).to_lowercase(),
            Record::Posting(p) => format!("{}-{}", p.title, p.location).to_lowercase(),
        }
    }

    /// One-line human summary used by notifiers and the digest.
    pub fn headline(&self) -> String {
        match self {
            Record::Hire(h) if h.location.is_empty() => format!("{} joined as {}", h.name, h.title),
            Record::Hire(h) => format!("{} joined as {} ({})", h.name, h.title, h.location),
            Record::Posting(p) if p.location.is_empty() => format!("New opening: {}", p.title),
            Record::Posting(p) => format!("New opening: {} ({})", p.title, p.location),
        }
    }
}

/// Per-entity failure captured during a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityError {
    pub entity_id: String,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Aggregate outcome of one tracking cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleResult {
    pub new_hires: Vec<Record>,
    pub new_postings: Vec<Record>,
    pub errors: Vec<EntityError>,
}

impl CycleResult {
    pub fn is_empty(&self) -> bool {
        self.new_hires.is_empty() && self.new_postings.is_empty() && self.errors.is_empty()
    }

    pub(crate) fn push_survivor(&mut self, record: Record) {
        match record.kind() {
            RecordKind::Hire => self.new_hires.push(record),
            RecordKind::Posting => self.new_postings.push(record),
        }
    }

    pub(crate) fn push_error(&mut self, entity_id: &str, message: String) {
        self.errors.push(EntityError {
            entity_id: entity_id.to_string(),
            message,
            at: Utc::now(),
        });
    }
}
