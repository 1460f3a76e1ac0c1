//! In-memory fakes for engine, manager and bootstrap tests
//!
//! The store fake honours the same observable contracts as the SQLite
//! adapter (stable internal ids, append-only events, soft deletes); the
//! gateway fake replays scripted delta pages and keeps a provider-side
//! subscription map, counting calls so tests can assert that gated code
//! paths never touch the provider.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, TimeZone, Utc};

use drivewatch_core::domain::{
    ChangeEvent, DeltaCursor, DriveId, ExternalId, ItemKind, ItemRecord, ItemUpsert,
    NewChangeEvent, Subscription, SubscriptionId,
};
use drivewatch_core::ports::{
    DeltaEntry, DeltaPage, GatewayError, ICursorRepository, IEventRepository, IItemRepository,
    IProviderGateway, ISubscriptionRepository, IdentityProbe, InvalidReason, NewSubscription,
    Principal, ProviderSubscription, StoreError,
};

// ============================================================================
// Entry builders
// ============================================================================

pub fn ts(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 7, 1, 12, minute, 0).unwrap()
}

pub fn entry(id: &str, name: &str, parent: Option<&str>, folder: bool) -> DeltaEntry {
    DeltaEntry {
        external_id: ExternalId::new(id.to_string()).unwrap(),
        name: name.to_string(),
        parent_external_id: parent.map(|p| ExternalId::new(p.to_string()).unwrap()),
        is_folder: folder,
        tombstone: false,
        modified_at: Some(ts(0)),
    }
}

pub fn entry_at(
    id: &str,
    name: &str,
    parent: Option<&str>,
    folder: bool,
    minute: u32,
) -> DeltaEntry {
    DeltaEntry {
        modified_at: Some(ts(minute)),
        ..entry(id, name, parent, folder)
    }
}

pub fn tombstone(id: &str) -> DeltaEntry {
    DeltaEntry {
        external_id: ExternalId::new(id.to_string()).unwrap(),
        name: String::new(),
        parent_external_id: None,
        is_folder: false,
        tombstone: true,
        modified_at: None,
    }
}

pub fn cursor(token: &str) -> DeltaCursor {
    DeltaCursor::new(format!("https://example.com/delta?token={token}")).unwrap()
}

pub fn final_page(entries: Vec<DeltaEntry>, token: &str) -> DeltaPage {
    DeltaPage {
        entries,
        next_cursor: None,
        final_cursor: Some(cursor(token)),
    }
}

pub fn next_page(entries: Vec<DeltaEntry>, token: &str) -> DeltaPage {
    DeltaPage {
        entries,
        next_cursor: Some(cursor(token)),
        final_cursor: None,
    }
}

pub fn drive() -> DriveId {
    DriveId::new("drive-1".to_string()).unwrap()
}

// ============================================================================
// In-memory state store
// ============================================================================

#[derive(Default)]
struct StoreInner {
    items: Vec<ItemRecord>,
    events: Vec<ChangeEvent>,
    cursors: HashMap<String, DeltaCursor>,
    subscriptions: HashMap<String, Subscription>,
    next_item_id: i64,
    next_event_id: i64,
    apply_count: usize,
    fail_apply_at: Option<usize>,
}

/// In-memory implementation of all four repository ports
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<StoreInner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the nth atomic apply (0-based) fail with a constraint error
    pub fn fail_apply_at(&self, n: usize) {
        self.inner.lock().unwrap().fail_apply_at = Some(n);
    }

    /// Raw insert for test fixtures that need pathological state
    pub fn insert_raw(&self, record: ItemRecord) {
        let mut inner = self.inner.lock().unwrap();
        inner.next_item_id = inner.next_item_id.max(record.internal_id);
        inner.items.push(record);
    }

    pub fn all_items(&self) -> Vec<ItemRecord> {
        self.inner.lock().unwrap().items.clone()
    }

    pub fn all_events(&self) -> Vec<ChangeEvent> {
        self.inner.lock().unwrap().events.clone()
    }

    pub fn event_count(&self) -> usize {
        self.inner.lock().unwrap().events.len()
    }

    pub fn item_by_external(&self, external: &str) -> Option<ItemRecord> {
        self.inner
            .lock()
            .unwrap()
            .items
            .iter()
            .find(|i| i.external_id.as_str() == external)
            .cloned()
    }

    pub fn stored_cursor(&self, drive_id: &DriveId) -> Option<String> {
        self.inner
            .lock()
            .unwrap()
            .cursors
            .get(drive_id.as_str())
            .map(|c| c.as_str().to_string())
    }

    fn check_apply_failure(inner: &mut StoreInner) -> Result<(), StoreError> {
        let n = inner.apply_count;
        inner.apply_count += 1;
        if inner.fail_apply_at == Some(n) {
            return Err(StoreError::Constraint("injected apply failure".to_string()));
        }
        Ok(())
    }

    fn do_upsert(inner: &mut StoreInner, upsert: &ItemUpsert) -> ItemRecord {
        if let Some(existing) = inner
            .items
            .iter_mut()
            .find(|i| i.external_id == upsert.external_id)
        {
            existing.drive_id = upsert.drive_id.clone();
            existing.name = upsert.name.clone();
            existing.kind = upsert.kind;
            existing.parent_internal_id = upsert.parent_internal_id;
            existing.path = upsert.path.clone();
            existing.modified_at = upsert.modified_at;
            existing.deleted = upsert.deleted;
            return existing.clone();
        }

        inner.next_item_id += 1;
        let record = ItemRecord {
            internal_id: inner.next_item_id,
            drive_id: upsert.drive_id.clone(),
            external_id: upsert.external_id.clone(),
            name: upsert.name.clone(),
            kind: upsert.kind,
            parent_internal_id: upsert.parent_internal_id,
            path: upsert.path.clone(),
            created_at: upsert.modified_at,
            modified_at: upsert.modified_at,
            deleted: upsert.deleted,
        };
        inner.items.push(record.clone());
        record
    }

    fn do_append(inner: &mut StoreInner, item_internal_id: i64, event: &NewChangeEvent) -> ChangeEvent {
        inner.next_event_id += 1;
        let appended = ChangeEvent {
            id: inner.next_event_id,
            item_internal_id,
            kind: event.kind,
            old_name: event.old_name.clone(),
            new_name: event.new_name.clone(),
            old_parent_internal_id: event.old_parent_internal_id,
            new_parent_internal_id: event.new_parent_internal_id,
            timestamp: Utc::now(),
        };
        inner.events.push(appended.clone());
        appended
    }
}

#[async_trait::async_trait]
impl IItemRepository for InMemoryStore {
    async fn lookup_by_external_id(
        &self,
        external_id: &ExternalId,
    ) -> Result<Option<ItemRecord>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .items
            .iter()
            .find(|i| &i.external_id == external_id)
            .cloned())
    }

    async fn lookup_by_internal_id(
        &self,
        internal_id: i64,
    ) -> Result<Option<ItemRecord>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .items
            .iter()
            .find(|i| i.internal_id == internal_id)
            .cloned())
    }

    async fn upsert(&self, upsert: ItemUpsert) -> Result<ItemRecord, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        Ok(Self::do_upsert(&mut inner, &upsert))
    }

    async fn mark_deleted(&self, internal_id: i64) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.items.iter_mut().find(|i| i.internal_id == internal_id) {
            Some(item) => {
                item.deleted = true;
                Ok(())
            }
            None => Err(StoreError::Query(format!("item {internal_id} not found"))),
        }
    }

    async fn children_of(&self, internal_id: i64) -> Result<Vec<ItemRecord>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .items
            .iter()
            .filter(|i| i.parent_internal_id == Some(internal_id))
            .cloned()
            .collect())
    }

    async fn bulk_upsert(&self, batch: Vec<ItemUpsert>) -> Result<Vec<ItemRecord>, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        Ok(batch
            .iter()
            .map(|u| Self::do_upsert(&mut inner, u))
            .collect())
    }

    async fn upsert_with_event(
        &self,
        upsert: ItemUpsert,
        event: NewChangeEvent,
    ) -> Result<ItemRecord, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_apply_failure(&mut inner)?;
        let item = Self::do_upsert(&mut inner, &upsert);
        Self::do_append(&mut inner, item.internal_id, &event);
        Ok(item)
    }

    async fn mark_deleted_with_event(
        &self,
        internal_id: i64,
        event: NewChangeEvent,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_apply_failure(&mut inner)?;
        match inner.items.iter_mut().find(|i| i.internal_id == internal_id) {
            Some(item) => item.deleted = true,
            None => return Err(StoreError::Query(format!("item {internal_id} not found"))),
        }
        Self::do_append(&mut inner, internal_id, &event);
        Ok(())
    }
}

#[async_trait::async_trait]
impl IEventRepository for InMemoryStore {
    async fn append(
        &self,
        item_internal_id: i64,
        event: NewChangeEvent,
    ) -> Result<ChangeEvent, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        Ok(Self::do_append(&mut inner, item_internal_id, &event))
    }

    async fn append_many(&self, batch: Vec<(i64, NewChangeEvent)>) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        for (item_internal_id, event) in &batch {
            Self::do_append(&mut inner, *item_internal_id, event);
        }
        Ok(())
    }

    async fn history_of(&self, item_internal_id: i64) -> Result<Vec<ChangeEvent>, StoreError> {
        let mut events: Vec<ChangeEvent> = self
            .inner
            .lock()
            .unwrap()
            .events
            .iter()
            .filter(|e| e.item_internal_id == item_internal_id)
            .cloned()
            .collect();
        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        Ok(events)
    }
}

#[async_trait::async_trait]
impl ICursorRepository for InMemoryStore {
    async fn get(&self, drive_id: &DriveId) -> Result<Option<DeltaCursor>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .cursors
            .get(drive_id.as_str())
            .cloned())
    }

    async fn set(&self, drive_id: &DriveId, cursor: &DeltaCursor) -> Result<(), StoreError> {
        self.inner
            .lock()
            .unwrap()
            .cursors
            .insert(drive_id.as_str().to_string(), cursor.clone());
        Ok(())
    }

    async fn clear(&self, drive_id: &DriveId) -> Result<(), StoreError> {
        self.inner.lock().unwrap().cursors.remove(drive_id.as_str());
        Ok(())
    }
}

#[async_trait::async_trait]
impl ISubscriptionRepository for InMemoryStore {
    async fn find_by_resource(&self, resource: &str) -> Result<Option<Subscription>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .subscriptions
            .values()
            .filter(|s| s.resource == resource)
            .max_by_key(|s| s.created_at)
            .cloned())
    }

    async fn find_by_provider_id(
        &self,
        id: &SubscriptionId,
    ) -> Result<Option<Subscription>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .subscriptions
            .get(id.as_str())
            .cloned())
    }

    async fn upsert(&self, subscription: &Subscription) -> Result<(), StoreError> {
        self.inner
            .lock()
            .unwrap()
            .subscriptions
            .insert(subscription.provider_id.as_str().to_string(), subscription.clone());
        Ok(())
    }

    async fn update_expiry(
        &self,
        id: &SubscriptionId,
        new_expiry: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.subscriptions.get_mut(id.as_str()) {
            Some(sub) => {
                sub.expiry = new_expiry;
                Ok(())
            }
            None => Err(StoreError::Query(format!("subscription {id} not found"))),
        }
    }

    async fn delete(&self, id: &SubscriptionId) -> Result<(), StoreError> {
        self.inner.lock().unwrap().subscriptions.remove(id.as_str());
        Ok(())
    }

    async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<Subscription>, StoreError> {
        let mut expired: Vec<Subscription> = self
            .inner
            .lock()
            .unwrap()
            .subscriptions
            .values()
            .filter(|s| s.expiry < now)
            .cloned()
            .collect();
        expired.sort_by_key(|s| s.expiry);
        Ok(expired)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.subscriptions.len();
        inner.subscriptions.retain(|_, s| s.expiry >= now);
        Ok((before - inner.subscriptions.len()) as u64)
    }
}

// ============================================================================
// Scripted gateway
// ============================================================================

struct GatewayInner {
    probe: IdentityProbe,
    pages: VecDeque<Result<DeltaPage, GatewayError>>,
    provider_subs: HashMap<String, ProviderSubscription>,
    created_requests: Vec<NewSubscription>,
    renewals: Vec<(String, DateTime<Utc>)>,
    create_error: Option<GatewayError>,
    next_sub_id: u32,
}

/// Scripted implementation of the provider gateway
pub struct ScriptedGateway {
    inner: Mutex<GatewayInner>,
    pub delta_calls: AtomicUsize,
    pub probe_calls: AtomicUsize,
}

impl Default for ScriptedGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(GatewayInner {
                probe: IdentityProbe::Valid(Principal {
                    user_id: "user-1".to_string(),
                    principal_name: "user@example.com".to_string(),
                }),
                pages: VecDeque::new(),
                provider_subs: HashMap::new(),
                created_requests: Vec::new(),
                renewals: Vec::new(),
                create_error: None,
                next_sub_id: 0,
            }),
            delta_calls: AtomicUsize::new(0),
            probe_calls: AtomicUsize::new(0),
        }
    }

    pub fn push_page(&self, page: DeltaPage) {
        self.inner.lock().unwrap().pages.push_back(Ok(page));
    }

    pub fn push_error(&self, error: GatewayError) {
        self.inner.lock().unwrap().pages.push_back(Err(error));
    }

    pub fn set_probe_invalid(&self, reason: InvalidReason) {
        self.inner.lock().unwrap().probe = IdentityProbe::Invalid(reason);
    }

    pub fn set_create_error(&self, error: GatewayError) {
        self.inner.lock().unwrap().create_error = Some(error);
    }

    /// Register a provider-side subscription record
    pub fn seed_subscription(&self, id: &str, resource: &str, expiry: DateTime<Utc>) {
        let mut inner = self.inner.lock().unwrap();
        inner.provider_subs.insert(
            id.to_string(),
            ProviderSubscription {
                provider_id: SubscriptionId::new(id.to_string()).unwrap(),
                resource: resource.to_string(),
                expiry,
            },
        );
    }

    pub fn created_requests(&self) -> Vec<NewSubscription> {
        self.inner.lock().unwrap().created_requests.clone()
    }

    pub fn renewals(&self) -> Vec<(String, DateTime<Utc>)> {
        self.inner.lock().unwrap().renewals.clone()
    }

    pub fn provider_has(&self, id: &str) -> bool {
        self.inner.lock().unwrap().provider_subs.contains_key(id)
    }
}

#[async_trait::async_trait]
impl IProviderGateway for ScriptedGateway {
    async fn probe_identity(&self) -> IdentityProbe {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.lock().unwrap().probe.clone()
    }

    async fn resolve_default_drive(&self) -> Result<DriveId, GatewayError> {
        Ok(drive())
    }

    async fn delta(
        &self,
        _drive_id: &DriveId,
        _cursor: Option<&DeltaCursor>,
    ) -> Result<DeltaPage, GatewayError> {
        self.delta_calls.fetch_add(1, Ordering::SeqCst);
        self.inner
            .lock()
            .unwrap()
            .pages
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::Fatal("no scripted delta page".to_string())))
    }

    async fn create_subscription(
        &self,
        request: &NewSubscription,
    ) -> Result<Subscription, GatewayError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(error) = inner.create_error.take() {
            return Err(error);
        }

        inner.next_sub_id += 1;
        let id = format!("sub-{}", inner.next_sub_id);
        inner.created_requests.push(request.clone());
        inner.provider_subs.insert(
            id.clone(),
            ProviderSubscription {
                provider_id: SubscriptionId::new(id.clone()).unwrap(),
                resource: request.resource.clone(),
                expiry: request.expiry,
            },
        );

        Ok(Subscription {
            provider_id: SubscriptionId::new(id).unwrap(),
            resource: request.resource.clone(),
            shared_secret: request.shared_secret.clone(),
            expiry: request.expiry,
            created_at: Utc::now(),
        })
    }

    async fn get_subscription(
        &self,
        id: &SubscriptionId,
    ) -> Result<Option<ProviderSubscription>, GatewayError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .provider_subs
            .get(id.as_str())
            .cloned())
    }

    async fn renew_subscription(
        &self,
        id: &SubscriptionId,
        new_expiry: DateTime<Utc>,
    ) -> Result<(), GatewayError> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .renewals
            .push((id.as_str().to_string(), new_expiry));
        match inner.provider_subs.get_mut(id.as_str()) {
            Some(sub) => {
                sub.expiry = new_expiry;
                Ok(())
            }
            None => Err(GatewayError::Fatal(format!(
                "subscription {id} disappeared during renewal"
            ))),
        }
    }

    async fn delete_subscription(&self, id: &SubscriptionId) -> Result<(), GatewayError> {
        self.inner.lock().unwrap().provider_subs.remove(id.as_str());
        Ok(())
    }
}
