/// Episode types published by the catalog
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Content category of an episode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    DailyNews,
    Ethereum,
    Macro,
    Startup,
    Ai,
    Defi,
}

impl Category {
    /// Every category the listing service publishes
    pub const ALL: [Category; 6] = [
        Self::DailyNews,
        Self::Ethereum,
        Self::Macro,
        Self::Startup,
        Self::Ai,
        Self::Defi,
    ];

    /// Convert to the path/wire representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DailyNews => "daily-news",
            Self::Ethereum => "ethereum",
            Self::Macro => "macro",
            Self::Startup => "startup",
            Self::Ai => "ai",
            Self::Defi => "defi",
        }
    }

    /// Human-readable name
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::DailyNews => "Daily News",
            Self::Ethereum => "Ethereum",
            Self::Macro => "Macro Economics",
            Self::Startup => "Startup",
            Self::Ai => "AI & Technology",
            Self::Defi => "DeFi",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| format!("unknown category: {s}"))
    }
}

/// Narration language of an episode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "zh-TW")]
    ZhTw,
    #[serde(rename = "en-US")]
    EnUs,
    #[serde(rename = "ja-JP")]
    JaJp,
}

impl Language {
    /// Every language the listing service publishes
    pub const ALL: [Language; 3] = [Self::ZhTw, Self::EnUs, Self::JaJp];

    /// Convert to the BCP 47 tag used in paths
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ZhTw => "zh-TW",
            Self::EnUs => "en-US",
            Self::JaJp => "ja-JP",
        }
    }

    /// Native name of the language
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::ZhTw => "繁體中文",
            Self::EnUs => "English",
            Self::JaJp => "日本語",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|language| language.as_str() == s)
            .ok_or_else(|| format!("unknown language: {s}"))
    }
}

/// Publication status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpisodeStatus {
    #[default]
    Published,
    Draft,
}

/// Stream locators for an episode
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StreamingUrls {
    /// Adaptive-stream manifest (`.m3u8`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub m3u8: Option<String>,
}

/// A playable episode as published by the catalog
///
/// Episodes are immutable once fetched. The playback core only relies on
/// `id`, the stream locator and the optional duration hint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    /// Unique episode identifier (usually `YYYY-MM-DD-slug`)
    pub id: String,

    /// Publication status
    #[serde(default)]
    pub status: EpisodeStatus,

    /// Content category
    pub category: Category,

    /// Publication date (ISO 8601)
    pub date: String,

    /// Narration language
    pub language: Language,

    /// Episode title
    pub title: String,

    /// Full text content
    #[serde(default)]
    pub content: String,

    /// Short description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Source references
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<Vec<String>>,

    /// Stream locators
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streaming_urls: Option<StreamingUrls>,

    /// Social media teaser
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social_hook: Option<String>,

    /// Last update timestamp (ISO 8601)
    pub updated_at: String,

    /// Duration hint in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,

    /// Original object-storage path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl Episode {
    /// Create a published episode with the required fields
    pub fn new(
        id: impl Into<String>,
        language: Language,
        category: Category,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            status: EpisodeStatus::Published,
            category,
            date: String::new(),
            language,
            title: title.into(),
            content: String::new(),
            description: None,
            references: None,
            streaming_urls: None,
            social_hook: None,
            updated_at: String::new(),
            duration: None,
            path: None,
        }
    }

    /// Attach an adaptive-stream manifest URL
    #[must_use]
    pub fn with_stream_url(mut self, url: impl Into<String>) -> Self {
        self.streaming_urls = Some(StreamingUrls {
            m3u8: Some(url.into()),
        });
        self
    }

    /// Adaptive-stream manifest URL, if the episode has one
    pub fn stream_url(&self) -> Option<&str> {
        self.streaming_urls
            .as_ref()
            .and_then(|urls| urls.m3u8.as_deref())
            .filter(|url| !url.is_empty())
    }
}
