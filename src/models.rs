use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Roles & Content Kinds ---

/// Role
///
/// The RBAC field stored in `public.profiles.role`. Anything other than `admin`
/// is treated as a regular user, mirroring how the profile row is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    pub fn from_profile(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("admin") {
            Role::Admin
        } else {
            Role::User
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

/// ContentType
///
/// The four kinds of content an admin can publish. Serialized in lowercase to match
/// the `content.type` column and the JSON `type` discriminator.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS, ToSchema,
    Default,
)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ContentType {
    #[default]
    Text,
    Image,
    Video,
    Pdf,
}

impl ContentType {
    pub const ALL: [ContentType; 4] = [
        ContentType::Text,
        ContentType::Image,
        ContentType::Video,
        ContentType::Pdf,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Text => "text",
            ContentType::Image => "image",
            ContentType::Video => "video",
            ContentType::Pdf => "pdf",
        }
    }

    /// Whether an uploaded file with this MIME type may back an item of this kind.
    /// Text items carry their body inline and never accept a file.
    pub fn accepts_mime(&self, mime: &str) -> bool {
        let mime = mime.trim().to_ascii_lowercase();
        match self {
            ContentType::Text => false,
            ContentType::Image => mime.starts_with("image/"),
            ContentType::Video => mime.starts_with("video/"),
            ContentType::Pdf => mime == "application/pdf",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = ContentShapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s.trim())
            .ok_or_else(|| ContentShapeError::UnknownType(s.to_string()))
    }
}

/// ContentShapeError
///
/// Raised when a stored row or an incoming request does not describe a well-formed
/// content item. Rows failing this check never reach a viewer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContentShapeError {
    #[error("unknown content type `{0}`")]
    UnknownType(String),

    #[error("text content requires a non-empty body")]
    MissingText,

    #[error("{0} content requires a file url")]
    MissingFileUrl(ContentType),

    #[error("unlock days cannot be negative (got {0})")]
    NegativeUnlockDays(i32),

    #[error("title must not be blank")]
    BlankTitle,

    #[error("unlock days out of range (got {0}, max {max})", max = i32::MAX)]
    UnlockDaysOutOfRange(u32),
}

// --- Content Schemas ---

/// ContentBody
///
/// The variant part of a content item, keyed by `type`. Only the field relevant to
/// the variant exists: inline text for `text`, a storage URL for every media kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBody {
    Text { text_content: String },
    Image { file_url: String },
    Video { file_url: String },
    Pdf { file_url: String },
}

impl ContentBody {
    /// Builds the variant for `kind` out of the loosely-typed column pair.
    pub fn new(
        kind: ContentType,
        text_content: Option<String>,
        file_url: Option<String>,
    ) -> Result<Self, ContentShapeError> {
        let present = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        match kind {
            ContentType::Text => present(text_content)
                .map(|text_content| ContentBody::Text { text_content })
                .ok_or(ContentShapeError::MissingText),
            media => {
                let file_url = present(file_url).ok_or(ContentShapeError::MissingFileUrl(media))?;
                Ok(match media {
                    ContentType::Image => ContentBody::Image { file_url },
                    ContentType::Video => ContentBody::Video { file_url },
                    _ => ContentBody::Pdf { file_url },
                })
            }
        }
    }

    pub fn content_type(&self) -> ContentType {
        match self {
            ContentBody::Text { .. } => ContentType::Text,
            ContentBody::Image { .. } => ContentType::Image,
            ContentBody::Video { .. } => ContentType::Video,
            ContentBody::Pdf { .. } => ContentType::Pdf,
        }
    }

    pub fn text_content(&self) -> Option<&str> {
        match self {
            ContentBody::Text { text_content } => Some(text_content),
            _ => None,
        }
    }

    pub fn file_url(&self) -> Option<&str> {
        match self {
            ContentBody::Text { .. } => None,
            ContentBody::Image { file_url }
            | ContentBody::Video { file_url }
            | ContentBody::Pdf { file_url } => Some(file_url),
        }
    }
}

/// ContentItem
///
/// A published content record as served to clients. `created_at` and `release_date`
/// are optional on purpose: a missing or unparseable value deserializes to `None`,
/// and the access filter then excludes the item instead of guessing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ContentItem {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,

    #[serde(flatten)]
    pub body: ContentBody,

    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_premium: bool,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default)]
    pub unlock_days: u32,
    #[serde(default, deserialize_with = "lenient_date")]
    pub release_date: Option<NaiveDate>,

    #[serde(default)]
    pub created_by: Option<Uuid>,
}

impl ContentItem {
    pub fn content_type(&self) -> ContentType {
        self.body.content_type()
    }
}

/// ContentRow
///
/// Raw row of the `public.content` table. The shape is only loosely enforced by the
/// database, so it is converted into a `ContentItem` through `TryFrom`.
#[derive(Debug, Clone, FromRow, Default)]
pub struct ContentRow {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,

    // 'type' is a reserved keyword in Rust.
    #[sqlx(rename = "type")]
    pub content_type: String,

    pub text_content: Option<String>,
    pub file_url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub is_premium: bool,
    pub is_locked: bool,
    pub unlock_days: i32,
    pub release_date: Option<NaiveDate>,
    pub created_by: Option<Uuid>,
}

impl TryFrom<ContentRow> for ContentItem {
    type Error = ContentShapeError;

    fn try_from(row: ContentRow) -> Result<Self, Self::Error> {
        let kind = ContentType::from_str(&row.content_type)?;
        let unlock_days =
            u32::try_from(row.unlock_days).map_err(|_| ContentShapeError::NegativeUnlockDays(row.unlock_days))?;

        Ok(ContentItem {
            id: row.id,
            title: row.title,
            description: row.description.unwrap_or_default(),
            body: ContentBody::new(kind, row.text_content, row.file_url)?,
            created_at: row.created_at,
            is_premium: row.is_premium,
            is_locked: row.is_locked,
            unlock_days,
            release_date: row.release_date,
            created_by: row.created_by,
        })
    }
}

// --- Lenient date handling ---

/// Parses the timestamp formats the catalog has been seen to carry: RFC 3339,
/// Postgres' text rendering (`2025-01-01 10:00:00+00`), a naive date-time (read as UTC)
/// and a bare calendar date (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
}

/// Parses a release date. Full timestamps are accepted and truncated to their UTC date.
pub fn parse_release_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .ok()
        .or_else(|| parse_timestamp(raw).map(|ts| ts.date_naive()))
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(|v| v.as_str()).and_then(parse_timestamp))
}

fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(|v| v.as_str()).and_then(parse_release_date))
}

// --- Profiles ---

/// Profile
///
/// The user's canonical identity record stored in `public.profiles`. The primary key
/// is the id issued by the hosted auth provider.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    // 'admin' or 'user'. Kept as stored; read through `Role::from_profile`.
    pub role: String,
    pub is_premium: bool,
}

impl Profile {
    pub fn role(&self) -> Role {
        Role::from_profile(&self.role)
    }
}

/// UserProfile
///
/// Output schema for the authenticated user's profile (GET /me).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub role: Role,
    pub is_premium: bool,
}

// --- Request Payloads ---

/// RegisterUserRequest
///
/// Input payload for POST /register. The password is forwarded to the auth provider
/// and never stored or logged here.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RegisterUserRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// CreateContentRequest
///
/// Input payload for POST /admin/content. Media items reference a file that was
/// uploaded beforehand through the presigned URL flow.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateContentRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    #[serde(default)]
    pub text_content: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub is_premium: bool,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default)]
    pub unlock_days: u32,
    /// Defaults to the current date when omitted.
    #[serde(default)]
    #[ts(type = "string | null")]
    pub release_date: Option<NaiveDate>,
}

/// NewContent
///
/// A validated `CreateContentRequest`, ready for insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContent {
    pub title: String,
    pub description: Option<String>,
    pub body: ContentBody,
    pub is_premium: bool,
    pub is_locked: bool,
    pub unlock_days: u32,
    pub release_date: NaiveDate,
}

impl CreateContentRequest {
    /// Checks the payload and normalizes it: the unlock delay only survives on locked
    /// items, and a missing release date means "released today".
    pub fn validate(self, today: NaiveDate) -> Result<NewContent, ContentShapeError> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(ContentShapeError::BlankTitle);
        }

        let body = ContentBody::new(self.content_type, self.text_content, self.file_url)?;

        // Stored as a Postgres INTEGER.
        let unlock_days = if self.is_locked { self.unlock_days } else { 0 };
        if i32::try_from(unlock_days).is_err() {
            return Err(ContentShapeError::UnlockDaysOutOfRange(unlock_days));
        }

        Ok(NewContent {
            title,
            description: self.description.filter(|d| !d.trim().is_empty()),
            body,
            is_premium: self.is_premium,
            is_locked: self.is_locked,
            unlock_days,
            release_date: self.release_date.unwrap_or(today),
        })
    }
}

/// PresignedUrlRequest
///
/// Input payload for requesting a short-lived upload URL (POST /admin/upload/presigned).
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUrlRequest {
    /// The original filename, used to derive the file extension.
    #[schema(example = "morning_routine.mp4")]
    pub filename: String,
    /// The MIME type; the upload is constrained to it.
    #[schema(example = "video/mp4")]
    pub file_type: String,
    /// The kind of content item the file will back.
    pub content_type: ContentType,
}

/// PresignedUrlResponse
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUrlResponse {
    /// The time-limited URL for the PUT request.
    pub upload_url: String,
    /// The object key where the file will be stored.
    pub resource_key: String,
    /// The URL to store as the item's `file_url` once the upload completes.
    pub public_url: String,
}

// --- Dashboard ---

/// AdminDashboardStats
///
/// Output schema for GET /admin/stats.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq, Eq)]
#[ts(export)]
pub struct AdminDashboardStats {
    pub total_content: i64,
    pub premium_content: i64,
    pub locked_content: i64,
    /// Items whose release date is still in the future.
    pub scheduled_content: i64,
    pub total_users: i64,
    pub premium_users: i64,
}
