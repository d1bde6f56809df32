//! Shared fixtures for workflow tests.

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use asrama_common::{
    AppError, AppResult, FileStore, StoredFile, UploadCategory, UploadedFile,
};
use asrama_db::test_utils::Fixture;
use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::services::{
    AnnouncementService, ClearanceService, DamageReportService, ExitPermitService,
    NotificationService, RealtimeEvent, RealtimePublisher,
};

/// Publisher that records every event.
#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<(i32, RealtimeEvent)>>,
    fail: bool,
}

impl RecordingPublisher {
    pub fn events_for(&self, user_id: i32) -> Vec<RealtimeEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == user_id)
            .map(|(_, e)| e.clone())
            .collect()
    }
}

#[async_trait]
impl RealtimePublisher for RecordingPublisher {
    async fn publish(&self, user_id: i32, event: &RealtimeEvent) -> AppResult<()> {
        if self.fail {
            return Err(AppError::Redis("connection refused".to_string()));
        }
        self.events.lock().unwrap().push((user_id, event.clone()));
        Ok(())
    }
}

/// File store that validates uploads and keeps only their keys.
#[derive(Default)]
pub struct MemoryFileStore {
    saved: Mutex<Vec<String>>,
}

impl MemoryFileStore {
    pub fn saved(&self) -> Vec<String> {
        self.saved.lock().unwrap().clone()
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn save(&self, category: UploadCategory, file: &UploadedFile) -> AppResult<StoredFile> {
        category.validate(file)?;
        let mut saved = self.saved.lock().unwrap();
        let key = format!("{}/{}-{}", category.dir(), saved.len() + 1, file.file_name);
        saved.push(key.clone());
        Ok(StoredFile {
            path: self.public_url(&key),
            size: file.data.len() as u64,
            md5: String::new(),
            key,
        })
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.saved.lock().unwrap().retain(|k| k != key);
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("/uploads/{key}")
    }
}

pub fn image(name: &str) -> UploadedFile {
    UploadedFile {
        file_name: name.to_string(),
        content_type: "image/jpeg".to_string(),
        data: vec![0xFF; 256],
    }
}

pub fn pdf(name: &str) -> UploadedFile {
    UploadedFile {
        file_name: name.to_string(),
        content_type: "application/pdf".to_string(),
        data: vec![0x25; 256],
    }
}

pub fn base_fee() -> Decimal {
    Decimal::new(2_000_000, 0)
}

/// Every service wired over a seeded memory store.
pub struct Harness {
    pub fixture: Fixture,
    pub publisher: Arc<RecordingPublisher>,
    pub files: Arc<MemoryFileStore>,
    pub notifications: NotificationService,
    pub clearance: ClearanceService,
    pub permits: ExitPermitService,
    pub reports: DamageReportService,
    pub announcements: AnnouncementService,
}

impl Harness {
    pub async fn new(manager_count: usize) -> Self {
        Self::build(manager_count, RecordingPublisher::default()).await
    }

    pub async fn with_failing_publisher(manager_count: usize) -> Self {
        Self::build(
            manager_count,
            RecordingPublisher {
                fail: true,
                ..Default::default()
            },
        )
        .await
    }

    async fn build(manager_count: usize, publisher: RecordingPublisher) -> Self {
        let fixture = Fixture::new(manager_count).await;
        let publisher = Arc::new(publisher);
        let files = Arc::new(MemoryFileStore::default());
        let stores = fixture.stores.clone();

        let notifications = NotificationService::new(
            stores.notifications.clone(),
            stores.directory.clone(),
            publisher.clone(),
        );
        let clearance = ClearanceService::new(
            stores.clearance.clone(),
            stores.directory.clone(),
            notifications.clone(),
            files.clone(),
            base_fee(),
        );
        let permits = ExitPermitService::new(
            stores.permits.clone(),
            stores.directory.clone(),
            notifications.clone(),
            files.clone(),
        );
        let reports = DamageReportService::new(
            stores.reports.clone(),
            stores.directory.clone(),
            notifications.clone(),
            files.clone(),
        );
        let announcements =
            AnnouncementService::new(stores.announcements.clone(), notifications.clone());

        Self {
            fixture,
            publisher,
            files,
            notifications,
            clearance,
            permits,
            reports,
            announcements,
        }
    }
}
