//! Test doubles shared by the engine's unit tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use slotbook_core::{
    Appointment, AppointmentRequest, AppointmentUpdate, BookedInterval, DateRange,
    IntegrationMode, TimeInterval,
};
use slotbook_providers::{
    BoxFuture, CalendarClient, CalendarCredentials, ProviderError, ProviderErrorCode,
    ProviderResult,
};

use crate::error::{StoreError, StoreResult};
use crate::repository::Repository;
use crate::store::{Filter, MemoryStore, Query, RecordStore, Row};

/// A calendar client that records every call and answers from canned data.
pub(crate) struct FakeClient {
    integration: IntegrationMode,
    busy: Vec<BookedInterval>,
    event_id: Option<String>,
    failure: Option<ProviderErrorCode>,
    delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
}

impl FakeClient {
    pub(crate) fn new(integration: IntegrationMode) -> Self {
        Self {
            integration,
            busy: Vec::new(),
            event_id: Some("evt-1".to_string()),
            failure: None,
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_busy(mut self, busy: Vec<BookedInterval>) -> Self {
        self.busy = busy;
        self
    }

    pub(crate) fn failing(mut self, code: ProviderErrorCode) -> Self {
        self.failure = Some(code);
        self
    }

    pub(crate) fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Names of the calls made so far, e.g. `["fetch", "create"]`.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    async fn answer<T>(&self, call: String, value: T) -> ProviderResult<T> {
        self.calls.lock().unwrap().push(call);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.failure {
            Some(code) => Err(ProviderError::new(code, "fake failure").with_provider(self.name())),
            None => Ok(value),
        }
    }
}

impl CalendarClient for FakeClient {
    fn integration(&self) -> IntegrationMode {
        self.integration
    }

    fn fetch_busy_intervals<'a>(
        &'a self,
        _credentials: &'a CalendarCredentials,
        _range: DateRange,
    ) -> BoxFuture<'a, ProviderResult<Vec<BookedInterval>>> {
        Box::pin(self.answer("fetch".to_string(), self.busy.clone()))
    }

    fn create_event<'a>(
        &'a self,
        _credentials: &'a CalendarCredentials,
        _request: &'a AppointmentRequest,
    ) -> BoxFuture<'a, ProviderResult<Option<String>>> {
        Box::pin(self.answer("create".to_string(), self.event_id.clone()))
    }

    fn update_event<'a>(
        &'a self,
        _credentials: &'a CalendarCredentials,
        event_id: &'a str,
        _update: &'a AppointmentUpdate,
        _appointment: &'a Appointment,
    ) -> BoxFuture<'a, ProviderResult<bool>> {
        Box::pin(self.answer(format!("update:{}", event_id), true))
    }

    fn cancel_event<'a>(
        &'a self,
        _credentials: &'a CalendarCredentials,
        event_id: &'a str,
    ) -> BoxFuture<'a, ProviderResult<bool>> {
        Box::pin(self.answer(format!("cancel:{}", event_id), true))
    }
}

/// A store that rejects every write. Reads fail too unless a backing store
/// is given.
pub(crate) struct BrokenStore {
    reads: Option<Arc<MemoryStore>>,
}

impl BrokenStore {
    pub(crate) fn new() -> Self {
        Self { reads: None }
    }

    pub(crate) fn read_only(store: Arc<MemoryStore>) -> Self {
        Self { reads: Some(store) }
    }
}

fn down<T>() -> StoreResult<T> {
    Err(StoreError::backend("down"))
}

impl RecordStore for BrokenStore {
    fn select<'a>(&'a self, query: &'a Query) -> BoxFuture<'a, StoreResult<Vec<Row>>> {
        Box::pin(async move {
            match &self.reads {
                Some(store) => store.select(query).await,
                None => down(),
            }
        })
    }

    fn insert<'a>(
        &'a self,
        _collection: &'a str,
        _rows: Vec<Row>,
    ) -> BoxFuture<'a, StoreResult<Vec<Row>>> {
        Box::pin(async { down() })
    }

    fn update<'a>(
        &'a self,
        _collection: &'a str,
        _filters: &'a [Filter],
        _patch: Row,
    ) -> BoxFuture<'a, StoreResult<Vec<Row>>> {
        Box::pin(async { down() })
    }

    fn delete<'a>(
        &'a self,
        _collection: &'a str,
        _filters: &'a [Filter],
    ) -> BoxFuture<'a, StoreResult<usize>> {
        Box::pin(async { down() })
    }
}

pub(crate) fn memory_repo() -> Repository {
    Repository::new(Arc::new(MemoryStore::new()))
}

/// Monday 2025-03-03.
pub(crate) fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
}

pub(crate) fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

pub(crate) fn on_monday(h: u32, m: u32) -> NaiveDateTime {
    monday().and_time(hm(h, m))
}

pub(crate) fn busy(start: NaiveDateTime, minutes: u32) -> BookedInterval {
    TimeInterval::from_minutes(start, minutes)
}

pub(crate) fn request(provider_id: &str, start: NaiveDateTime, minutes: u32) -> AppointmentRequest {
    AppointmentRequest::new(
        provider_id,
        "client-1",
        "Ada Lovelace",
        "ada@example.com",
        start,
        minutes,
    )
}
