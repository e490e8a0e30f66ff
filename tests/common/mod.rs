#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::sync::{Arc, Mutex};
use uuid::Uuid;
use vitalidad_portal::{
    AppState,
    clock::{ClockState, FixedClock},
    config::AppConfig,
    models::{AdminDashboardStats, ContentBody, ContentItem, NewContent, Profile},
    repository::{Repository, RepositoryState},
    storage::{MockStorageService, StorageState},
};

// --- In-memory Repository ---

/// Keeps content and profiles in memory. Content is held newest first, like the
/// Postgres query returns it.
#[derive(Default)]
pub struct MemoryRepo {
    pub content: Mutex<Vec<ContentItem>>,
    pub profiles: Mutex<Vec<Profile>>,
    /// Stamped on created items.
    pub created_at: Option<DateTime<Utc>>,
}

impl MemoryRepo {
    pub fn with(content: Vec<ContentItem>, profiles: Vec<Profile>) -> Self {
        Self {
            content: Mutex::new(content),
            profiles: Mutex::new(profiles),
            created_at: Some(at(2025, 1, 1, 12)),
        }
    }
}

#[async_trait]
impl Repository for MemoryRepo {
    async fn list_content(&self) -> Vec<ContentItem> {
        self.content.lock().unwrap().clone()
    }

    async fn get_content(&self, id: Uuid) -> Option<ContentItem> {
        self.content.lock().unwrap().iter().find(|c| c.id == id).cloned()
    }

    async fn create_content(&self, content: NewContent, created_by: Uuid) -> Option<ContentItem> {
        let item = ContentItem {
            id: Uuid::new_v4(),
            title: content.title,
            description: content.description.unwrap_or_default(),
            body: content.body,
            created_at: self.created_at,
            is_premium: content.is_premium,
            is_locked: content.is_locked,
            unlock_days: content.unlock_days,
            release_date: Some(content.release_date),
            created_by: Some(created_by),
        };
        self.content.lock().unwrap().insert(0, item.clone());
        Some(item)
    }

    async fn delete_content(&self, id: Uuid) -> bool {
        let mut content = self.content.lock().unwrap();
        let before = content.len();
        content.retain(|c| c.id != id);
        content.len() != before
    }

    async fn get_profile(&self, id: Uuid) -> Option<Profile> {
        self.profiles.lock().unwrap().iter().find(|p| p.id == id).cloned()
    }

    async fn create_profile(&self, profile: Profile) -> Option<Profile> {
        self.profiles.lock().unwrap().push(profile.clone());
        Some(profile)
    }

    async fn set_premium(&self, id: Uuid, is_premium: bool) -> Option<Profile> {
        let mut profiles = self.profiles.lock().unwrap();
        let profile = profiles.iter_mut().find(|p| p.id == id)?;
        profile.is_premium = is_premium;
        Some(profile.clone())
    }

    async fn get_stats(&self, today: NaiveDate) -> AdminDashboardStats {
        let content = self.content.lock().unwrap();
        let profiles = self.profiles.lock().unwrap();
        let count = |pred: fn(&ContentItem) -> bool| content.iter().filter(|c| pred(c)).count() as i64;

        AdminDashboardStats {
            total_content: content.len() as i64,
            premium_content: count(|c| c.is_premium),
            locked_content: count(|c| c.is_locked && c.unlock_days > 0),
            scheduled_content: content
                .iter()
                .filter(|c| c.release_date.is_some_and(|d| d > today))
                .count() as i64,
            total_users: profiles.len() as i64,
            premium_users: profiles.iter().filter(|p| p.is_premium).count() as i64,
        }
    }
}

// --- Fixtures ---

pub fn at(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap()
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// A free, unlocked text item created and released on 2025-01-01.
pub fn text_item(title: &str) -> ContentItem {
    ContentItem {
        id: Uuid::new_v4(),
        title: title.to_string(),
        description: String::new(),
        body: ContentBody::Text {
            text_content: format!("{} body", title),
        },
        created_at: Some(at(2025, 1, 1, 0)),
        is_premium: false,
        is_locked: false,
        unlock_days: 0,
        release_date: Some(date(2025, 1, 1)),
        created_by: None,
    }
}

pub fn video_item(title: &str) -> ContentItem {
    ContentItem {
        body: ContentBody::Video {
            file_url: format!("http://localhost:9000/content-media/uploads/{}.mp4", title),
        },
        ..text_item(title)
    }
}

pub fn premium(item: ContentItem) -> ContentItem {
    ContentItem {
        is_premium: true,
        ..item
    }
}

pub fn profile(role: &str, is_premium: bool) -> Profile {
    let id = Uuid::new_v4();
    Profile {
        id,
        email: format!("{}@vitalidad.test", id),
        full_name: Some("Test User".to_string()),
        role: role.to_string(),
        is_premium,
    }
}

// --- State ---

pub fn state_with(repo: MemoryRepo, now: DateTime<Utc>) -> AppState {
    AppState {
        repo: Arc::new(repo) as RepositoryState,
        storage: Arc::new(MockStorageService::new()) as StorageState,
        clock: Arc::new(FixedClock(now)) as ClockState,
        config: AppConfig::default(),
    }
}
