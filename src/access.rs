//! Content visibility and access gating.
//!
//! Visibility is a pure function of (item, viewer, now). An item is visible when all
//! of the following hold:
//! 1. premium items are only shown to premium viewers (admins always pass);
//! 2. the release date has arrived (midnight UTC of that date), for every viewer;
//! 3. locked items with a positive delay are hidden until `created_at + unlock_days`
//!    calendar days (admins always pass);
//! 4. anonymous viewers never see premium items.
//!
//! Items whose `created_at` or `release_date` is missing fail closed.

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::models::{ContentItem, ContentType, Profile, Role};

/// Viewer
///
/// The identity a visibility decision is made for. Resolved once per request and
/// passed in explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    Admin,
    Member { is_premium: bool },
    Anonymous,
}

impl Viewer {
    /// Maps a profile lookup to a viewer. An unresolved profile is the most
    /// restrictive identity.
    pub fn from_profile(profile: Option<&Profile>) -> Self {
        match profile {
            Some(p) if p.role() == Role::Admin => Viewer::Admin,
            Some(p) => Viewer::Member {
                is_premium: p.is_premium,
            },
            None => Viewer::Anonymous,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Viewer::Admin)
    }

    pub fn is_premium(&self) -> bool {
        match self {
            Viewer::Admin => true,
            Viewer::Member { is_premium } => *is_premium,
            Viewer::Anonymous => false,
        }
    }
}

/// Denial
///
/// The first gate an item failed for a given viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Denial {
    #[error("creation or release date is missing or malformed")]
    MalformedDates,

    #[error("premium content")]
    PremiumRequired,

    #[error("not released until {release_at}")]
    NotReleased { release_at: DateTime<Utc> },

    #[error("locked until {unlock_at}")]
    StillLocked { unlock_at: DateTime<Utc> },
}

/// Instant at which an item scheduled for `date` becomes releasable.
pub fn release_instant(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// `created_at` advanced by `unlock_days` calendar days, keeping the time of day.
/// `None` when the result is out of range.
pub fn unlock_date(created_at: DateTime<Utc>, unlock_days: u32) -> Option<DateTime<Utc>> {
    created_at.checked_add_days(Days::new(u64::from(unlock_days)))
}

/// AccessFilter
///
/// Binds a viewer and an instant, then answers visibility questions for any number
/// of items.
#[derive(Debug, Clone, Copy)]
pub struct AccessFilter {
    viewer: Viewer,
    now: DateTime<Utc>,
}

impl AccessFilter {
    pub fn new(viewer: Viewer, now: DateTime<Utc>) -> Self {
        Self { viewer, now }
    }

    pub fn viewer(&self) -> Viewer {
        self.viewer
    }

    /// Runs every gate and reports the first one that fails.
    pub fn evaluate(&self, item: &ContentItem) -> Result<(), Denial> {
        let (Some(created_at), Some(release_date)) = (item.created_at, item.release_date) else {
            return Err(Denial::MalformedDates);
        };

        // Role/premium gate. Anonymous viewers are never premium.
        if item.is_premium && !self.viewer.is_admin() && !self.viewer.is_premium() {
            return Err(Denial::PremiumRequired);
        }

        let release_at = release_instant(release_date);
        if release_at > self.now {
            return Err(Denial::NotReleased { release_at });
        }

        if item.is_locked && item.unlock_days > 0 && !self.viewer.is_admin() {
            let unlock_at = unlock_date(created_at, item.unlock_days).ok_or(Denial::MalformedDates)?;
            if self.now < unlock_at {
                return Err(Denial::StillLocked { unlock_at });
            }
        }

        Ok(())
    }

    pub fn permits(&self, item: &ContentItem) -> bool {
        self.evaluate(item).is_ok()
    }

    /// Keeps the visible items, in their original order.
    pub fn apply(&self, items: Vec<ContentItem>) -> Vec<ContentItem> {
        items
            .into_iter()
            .filter(|item| match self.evaluate(item) {
                Ok(()) => true,
                Err(denial) => {
                    tracing::debug!(item_id = %item.id, viewer = ?self.viewer, %denial, "content hidden");
                    false
                }
            })
            .collect()
    }
}

/// The subset of `items` visible to `viewer` at `now`, order preserved.
pub fn visible_content(items: Vec<ContentItem>, viewer: Viewer, now: DateTime<Utc>) -> Vec<ContentItem> {
    AccessFilter::new(viewer, now).apply(items)
}

// --- Presentation helpers ---

/// ContentTab
///
/// The tab selected in the content browser. Narrowing by tab happens after gating
/// and never changes what a viewer is allowed to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentTab {
    #[default]
    All,
    Only(ContentType),
}

impl From<Option<ContentType>> for ContentTab {
    fn from(kind: Option<ContentType>) -> Self {
        kind.map_or(ContentTab::All, ContentTab::Only)
    }
}

pub fn filter_by_tab(items: Vec<ContentItem>, tab: ContentTab) -> Vec<ContentItem> {
    match tab {
        ContentTab::All => items,
        ContentTab::Only(kind) => items
            .into_iter()
            .filter(|item| item.content_type() == kind)
            .collect(),
    }
}

/// Partitions items by type. Each group keeps the input order.
pub fn group_by_type(items: Vec<ContentItem>) -> BTreeMap<ContentType, Vec<ContentItem>> {
    let mut groups: BTreeMap<ContentType, Vec<ContentItem>> = BTreeMap::new();
    for item in items {
        groups.entry(item.content_type()).or_default().push(item);
    }
    groups
}
