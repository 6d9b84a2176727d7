//! Tests for health events and professionals.

use std::sync::Arc;

use chrono::{Duration, Utc};
use mockable::DefaultClock;

use super::*;
use crate::domain::ports::{
    MockAuditRepository, MockFileRepository, MockHealthEventRepository, MockKeyValueStore,
    MockNotificationRepository, MockProfessionalRepository, MockReportRepository,
};
use crate::domain::{
    AccessContext, ErrorCode, EventKind, Notification, Report, ReportStatus, StorageBackend,
    StoredFile,
};

#[derive(Default)]
struct Mocks {
    events: MockHealthEventRepository,
    professionals: MockProfessionalRepository,
    files: MockFileRepository,
    notifications: MockNotificationRepository,
    reports: MockReportRepository,
    store: MockKeyValueStore,
}

impl Mocks {
    fn build(self) -> HealthEventsService {
        let mut audit = MockAuditRepository::new();
        audit.expect_append().returning(|_, _| Ok(()));
        HealthEventsService::new(
            CalendarPorts {
                events: Arc::new(self.events),
                professionals: Arc::new(self.professionals),
                files: Arc::new(self.files),
                notifications: Arc::new(self.notifications),
                reports: Arc::new(self.reports),
            },
            AuditLogger::new(Arc::new(audit), Arc::new(DefaultClock)),
            CacheAside::new(Arc::new(self.store)),
            Arc::new(DefaultClock),
        )
    }
}

fn receptor(id: Uuid) -> Caller {
    Caller::new(AccessContext::user(id, Role::Receptor), None)
}

fn draft(file_ids: Vec<Uuid>) -> EventDraft {
    let start = Utc::now();
    EventDraft::new(
        "Cardiology follow-up",
        None,
        EventKind::Consultation,
        start,
        Some(start + Duration::hours(1)),
        None,
        file_ids,
    )
    .expect("draft")
}

fn file(id: Uuid, owner_id: Uuid) -> StoredFile {
    StoredFile {
        id,
        owner_id,
        original_name: "scan.png".into(),
        content_type: "image/png".into(),
        size_bytes: 3,
        storage_backend: StorageBackend::Local,
        storage_key: format!("{owner_id}/{id}"),
        public_url: None,
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn create_from_notification_attaches_the_report_file_and_archives() {
    let owner_id = Uuid::new_v4();
    let emissor_id = Uuid::new_v4();
    let report_file = Uuid::new_v4();
    let report = Report {
        id: Uuid::new_v4(),
        emissor_id,
        receptor_id: owner_id,
        file_id: report_file,
        title: "MRI".into(),
        protocol: None,
        status: ReportStatus::Viewed,
        sent_at: Utc::now(),
        viewed_at: None,
    };
    let notification = Notification {
        id: Uuid::new_v4(),
        user_id: owner_id,
        report_id: report.id,
        status: NotificationStatus::Unread,
        created_at: Utc::now(),
        archived_at: None,
    };
    let notification_id = notification.id;

    let mut mocks = Mocks::default();
    mocks
        .notifications
        .expect_find()
        .return_once(move |_, _| Ok(Some(notification)));
    mocks.reports.expect_find().return_once(move |_, _| Ok(Some(report)));
    mocks
        .files
        .expect_find_many()
        .returning(move |_, _| Ok(vec![file(report_file, emissor_id)]));
    mocks
        .files
        .expect_is_received_by()
        .returning(|_, _, _| Ok(true));
    mocks
        .events
        .expect_create()
        .withf(move |_, event, archive| {
            event.file_ids == vec![report_file]
                && archive.is_some_and(|a| a.notification_id == notification_id)
        })
        .times(1)
        .returning(|_, _, _| Ok(()));
    mocks.store.expect_set_members().returning(|_| Ok(Vec::new()));
    mocks.store.expect_delete().returning(|_| Ok(()));

    let event = mocks
        .build()
        .create(&receptor(owner_id), draft(Vec::new()), Some(notification_id))
        .await
        .expect("created");
    assert_eq!(event.file_ids, vec![report_file]);
}

#[tokio::test]
async fn foreign_notifications_are_not_found() {
    let mut mocks = Mocks::default();
    mocks.notifications.expect_find().returning(|_, id| {
        Ok(Some(Notification {
            id,
            user_id: Uuid::new_v4(),
            report_id: Uuid::new_v4(),
            status: NotificationStatus::Unread,
            created_at: Utc::now(),
            archived_at: None,
        }))
    });
    mocks.events.expect_create().never();
    let err = mocks
        .build()
        .create(&receptor(Uuid::new_v4()), draft(Vec::new()), Some(Uuid::new_v4()))
        .await
        .expect_err("foreign");
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn unrelated_files_cannot_be_attached() {
    let owner_id = Uuid::new_v4();
    let stranger_file = Uuid::new_v4();
    let mut mocks = Mocks::default();
    mocks
        .files
        .expect_find_many()
        .returning(move |_, _| Ok(vec![file(stranger_file, Uuid::new_v4())]));
    mocks
        .files
        .expect_is_received_by()
        .returning(|_, _, _| Ok(false));
    mocks.events.expect_create().never();
    let err = mocks
        .build()
        .create(&receptor(owner_id), draft(vec![stranger_file]), None)
        .await
        .expect_err("not attachable");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}

#[tokio::test]
async fn emissors_cannot_keep_a_calendar() {
    let caller = Caller::new(AccessContext::user(Uuid::new_v4(), Role::Emissor), None);
    let err = Mocks::default()
        .build()
        .list(&caller, EventRange::default())
        .await
        .expect_err("forbidden");
    assert_eq!(err.code(), ErrorCode::Forbidden);
}

#[tokio::test]
async fn update_keeps_identity_and_creation_time() {
    let owner_id = Uuid::new_v4();
    let created = Utc::now() - Duration::days(2);
    let existing = HealthEvent {
        id: Uuid::new_v4(),
        owner_id,
        title: "Old".into(),
        description: None,
        kind: EventKind::Exam,
        starts_at: created,
        ends_at: None,
        professional_id: None,
        file_ids: Vec::new(),
        created_at: created,
        updated_at: created,
    };
    let id = existing.id;
    let mut mocks = Mocks::default();
    mocks.events.expect_find().return_once(move |_, _| Ok(Some(existing)));
    mocks.files.expect_find_many().returning(|_, _| Ok(Vec::new()));
    mocks
        .events
        .expect_update()
        .withf(move |_, event| event.id == id && event.created_at == created)
        .returning(|_, _| Ok(true));
    let event = mocks
        .build()
        .update(&receptor(owner_id), id, draft(Vec::new()))
        .await
        .expect("updated");
    assert_eq!(event.title, "Cardiology follow-up");
    assert!(event.updated_at > created);
}

#[tokio::test]
async fn deleting_someone_elses_professional_is_not_found() {
    let mut repo = MockProfessionalRepository::new();
    repo.expect_find().returning(|_, id| {
        Ok(Some(Professional {
            id,
            owner_id: Uuid::new_v4(),
            name: "Dr. Lima".into(),
            specialty: String::new(),
            registry_number: None,
            phone: None,
            email: None,
            created_at: Utc::now(),
        }))
    });
    repo.expect_delete().never();
    let service = ProfessionalsService::new(
        Arc::new(repo),
        AuditLogger::new(Arc::new(MockAuditRepository::new()), Arc::new(DefaultClock)),
        Arc::new(DefaultClock),
    );
    let err = service
        .delete(&receptor(Uuid::new_v4()), Uuid::new_v4())
        .await
        .expect_err("foreign");
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn professionals_are_created_for_the_caller() {
    let owner_id = Uuid::new_v4();
    let mut repo = MockProfessionalRepository::new();
    repo.expect_create()
        .withf(move |_, p| p.owner_id == owner_id && p.name == "Dr. Lima")
        .times(1)
        .returning(|_, _| Ok(()));
    let mut audit = MockAuditRepository::new();
    audit.expect_append().returning(|_, _| Ok(()));
    let service = ProfessionalsService::new(
        Arc::new(repo),
        AuditLogger::new(Arc::new(audit), Arc::new(DefaultClock)),
        Arc::new(DefaultClock),
    );
    let draft = ProfessionalDraft::new("Dr. Lima", "Cardiology", None, None, None).expect("draft");
    let created = service
        .create(&receptor(owner_id), draft)
        .await
        .expect("created");
    assert_eq!(created.specialty, "Cardiology");
}
