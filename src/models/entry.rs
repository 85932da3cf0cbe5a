use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::AppError;

/// Content recorded for an entry that only carries a scanned page.
pub const PAPER_DIARY_PLACEHOLDER: &str = "paper diary";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Entry {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    pub date: NaiveDate,
    pub content: String,
    pub mood: Mood,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paper_diary_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "mood", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Happy,
    Neutral,
    Sad,
    Angry,
    Love,
}

impl Mood {
    pub const ALL: [Mood; 5] = [Mood::Happy, Mood::Neutral, Mood::Sad, Mood::Angry, Mood::Love];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Happy => "happy",
            Mood::Neutral => "neutral",
            Mood::Sad => "sad",
            Mood::Angry => "angry",
            Mood::Love => "love",
        }
    }
}

impl Default for Mood {
    fn default() -> Self {
        Self::Neutral
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Invalid mood '{0}': expected one of happy, neutral, sad, angry, love")]
pub struct InvalidMood(pub String);

impl From<InvalidMood> for AppError {
    fn from(e: InvalidMood) -> Self {
        AppError::Validation(e.to_string())
    }
}

impl FromStr for Mood {
    type Err = InvalidMood;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mood::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| InvalidMood(s.to_string()))
    }
}

/// Mood restriction applied when listing entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MoodFilter {
    #[default]
    All,
    Only(Mood),
}

impl MoodFilter {
    /// `None`, empty and `"all"` select every mood.
    pub fn parse(raw: Option<&str>) -> Result<Self, InvalidMood> {
        match raw.map(str::trim) {
            None | Some("") | Some("all") => Ok(MoodFilter::All),
            Some(other) => other.parse().map(MoodFilter::Only),
        }
    }

    pub fn matches(&self, mood: Mood) -> bool {
        match self {
            MoodFilter::All => true,
            MoodFilter::Only(m) => *m == mood,
        }
    }

    pub fn mood(&self) -> Option<Mood> {
        match self {
            MoodFilter::All => None,
            MoodFilter::Only(m) => Some(*m),
        }
    }
}

/// Offset-based page over entries ordered by date, newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: u32,
    pub limit: u32,
    pub mood: MoodFilter,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 7,
            mood: MoodFilter::All,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    /// Set by the local mirror; the database assigns its own ids.
    pub id: Option<String>,
    pub date: NaiveDate,
    pub content: String,
    pub mood: Mood,
    pub ai_comment: Option<String>,
    pub paper_diary_image: Option<String>,
}

/// Fields overwritten on an existing entry. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryChanges {
    /// Only the local mirror moves an entry to another day.
    pub date: Option<NaiveDate>,
    pub content: Option<String>,
    pub mood: Option<Mood>,
    pub ai_comment: Option<String>,
    pub paper_diary_image: Option<String>,
}

impl EntryChanges {
    pub fn apply(&self, entry: &mut Entry) {
        if let Some(date) = self.date {
            entry.date = date;
        }
        if let Some(content) = &self.content {
            entry.content = content.clone();
        }
        if let Some(mood) = self.mood {
            entry.mood = mood;
        }
        if let Some(comment) = &self.ai_comment {
            entry.ai_comment = Some(comment.clone());
        }
        if let Some(image) = &self.paper_diary_image {
            entry.paper_diary_image = Some(image.clone());
        }
    }
}

/// One point of the weekly mood trend.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct MoodMark {
    pub date: NaiveDate,
    pub mood: Mood,
}

/// Trims diary text, rejecting text that is empty once trimmed.
pub fn validate_content(raw: &str) -> Result<String, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("Content must not be empty".into()));
    }
    Ok(trimmed.to_string())
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("Invalid date '{}': expected YYYY-MM-DD", raw)))
}
