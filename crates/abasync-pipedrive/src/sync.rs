//! Pushes combined records into Pipedrive.
//!
//! Each record becomes an organization, optionally a person linked to it and
//! optionally a deal. Payload fields come from the configured mappings;
//! well-known record fields fill in whatever the mappings leave out.
//!
//! Combined records are rebuilt from the registry on every sync, so the
//! status a push writes does not survive the batch. [`CrmSync`] keeps the
//! keys of pushed records and marks matching records `synced` before each
//! batch; a record is pushed at most once per process.

use abasync_core::{
    is_blank, EntityKind, FieldMapping, ReportRow, SyncSettings, STATUS_FIELD, STATUS_NEW,
    STATUS_SYNCED,
};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::client::PipedriveClient;
use crate::error::{PipedriveError, PipedriveResult};
use crate::mapping::MappingStore;

const DEFAULT_CURRENCY: &str = "CHF";

/// Record fields forming the sync key: project number, then contact id.
const DEFAULT_KEY_FIELDS: [&str; 2] = ["NPO_ProjNr", "AKP_NR"];

/// Ids created or reused for one record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    pub organization_id: u64,
    pub person_id: Option<u64>,
    pub deal_id: Option<u64>,
}

/// Result of one record in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordReport {
    /// Position of the record in the submitted batch.
    pub index: usize,
    #[serde(flatten)]
    pub outcome: Option<SyncOutcome>,
    pub error: Option<String>,
}

/// Clones share the ledger of pushed records.
#[derive(Debug, Clone)]
pub struct CrmSync {
    client: PipedriveClient,
    store: Arc<MappingStore>,
    status_field: String,
    status_new: String,
    key_fields: Vec<String>,
    synced: Arc<Mutex<HashSet<String>>>,
}

impl CrmSync {
    #[must_use]
    pub fn new(client: PipedriveClient, store: Arc<MappingStore>) -> Self {
        Self {
            client,
            store,
            status_field: STATUS_FIELD.to_string(),
            status_new: STATUS_NEW.to_string(),
            key_fields: DEFAULT_KEY_FIELDS.iter().map(|f| (*f).to_string()).collect(),
            synced: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Status field and "not yet pushed" value the records are stamped with.
    #[must_use]
    pub fn with_status(mut self, field: impl Into<String>, new_value: impl Into<String>) -> Self {
        self.status_field = field.into();
        self.status_new = new_value.into();
        self
    }

    /// Fields identifying a record across batches. The first one is
    /// required; records without it are never remembered.
    #[must_use]
    pub fn with_key_fields(mut self, fields: Vec<String>) -> Self {
        self.key_fields = fields;
        self
    }

    /// Pushes every record whose status is `new` and that was not pushed by
    /// an earlier batch.
    ///
    /// With `sequential_status` set the batch stops at the first failure;
    /// otherwise failures are reported and the batch carries on. Batches run
    /// one at a time.
    #[instrument(skip_all, fields(records = records.len()))]
    pub async fn sync_all(&self, records: &mut [ReportRow]) -> Vec<RecordReport> {
        let mut synced = self.synced.lock().await;
        let settings = self.store.settings().await;
        let mappings = self.store.mappings().await;
        let mut reports = Vec::new();

        for (index, record) in records.iter_mut().enumerate() {
            let key = self.record_key(record);
            if let Some(key) = key.as_ref().filter(|k| synced.contains(*k)) {
                debug!(index, %key, "Record already pushed");
                self.mark_synced(record);
            }
            let status = record.get(&self.status_field).and_then(Value::as_str);
            if status != Some(self.status_new.as_str()) {
                continue;
            }

            match self.push(record, &mappings, settings).await {
                Ok(outcome) => {
                    if let Some(key) = key {
                        synced.insert(key);
                    }
                    reports.push(RecordReport {
                        index,
                        outcome: Some(outcome),
                        error: None,
                    });
                }
                Err(e) => {
                    warn!(index, error = %e, "Record sync failed");
                    reports.push(RecordReport {
                        index,
                        outcome: None,
                        error: Some(e.to_string()),
                    });
                    if settings.sequential_status {
                        break;
                    }
                }
            }
        }

        info!(
            synced = reports.iter().filter(|r| r.error.is_none()).count(),
            failed = reports.iter().filter(|r| r.error.is_some()).count(),
            "Sync finished"
        );
        reports
    }

    /// Pushes one record and marks it `synced`.
    pub async fn sync_record(&self, record: &mut ReportRow) -> PipedriveResult<SyncOutcome> {
        let settings = self.store.settings().await;
        let mappings = self.store.mappings().await;
        let outcome = self.push(record, &mappings, settings).await?;
        if let Some(key) = self.record_key(record) {
            self.synced.lock().await.insert(key);
        }
        Ok(outcome)
    }

    /// Joined key fields; a missing later field contributes an empty part.
    fn record_key(&self, record: &ReportRow) -> Option<String> {
        let (first, rest) = self.key_fields.split_first()?;
        let mut key = text(record, first)?;
        for field in rest {
            key.push('|');
            key.push_str(&text(record, field).unwrap_or_default());
        }
        Some(key)
    }

    fn mark_synced(&self, record: &mut ReportRow) {
        record.insert(self.status_field.clone(), Value::String(STATUS_SYNCED.into()));
    }

    async fn push(
        &self,
        record: &mut ReportRow,
        mappings: &[FieldMapping],
        settings: SyncSettings,
    ) -> PipedriveResult<SyncOutcome> {
        let organization = organization_payload(record, mappings);
        let org_name = organization
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| PipedriveError::MissingField("organization name".to_string()))?;

        let existing_org = if settings.check_organizations {
            self.client.find_organization_by_name(&org_name).await?
        } else {
            None
        };
        let organization_id = match existing_org {
            Some(id) => id,
            None => self.client.create_organization(&organization).await?,
        };

        let mut person_id = None;
        let mut person = person_payload(record, mappings);
        if let Some(name) = person.get("name").and_then(Value::as_str).map(str::to_string) {
            let existing = if settings.check_persons {
                self.client.find_person_by_name(&name).await?
            } else {
                None
            };
            person_id = Some(match existing {
                Some(id) => id,
                None => {
                    person.insert("org_id".into(), json!(organization_id));
                    self.client.create_person(&person).await?
                }
            });
        }

        let mut deal_id = None;
        if mappings.iter().any(|m| m.entity == EntityKind::Deal) {
            let mut deal = deal_payload(record, mappings);
            deal.insert("org_id".into(), json!(organization_id));
            if let Some(id) = person_id {
                deal.insert("person_id".into(), json!(id));
            }
            deal_id = Some(self.client.create_deal(&deal).await?);
        }

        self.mark_synced(record);
        Ok(SyncOutcome {
            organization_id,
            person_id,
            deal_id,
        })
    }
}

/// Mapped fields of `entity`; blank record values are skipped.
fn mapped_payload(record: &ReportRow, mappings: &[FieldMapping], entity: EntityKind) -> Map<String, Value> {
    let mut payload = Map::new();
    for mapping in mappings.iter().filter(|m| m.entity == entity) {
        if let Some(value) = record.get(&mapping.source).filter(|v| !is_blank(v)) {
            payload.insert(mapping.target.clone(), value.clone());
        }
    }
    payload
}

fn organization_payload(record: &ReportRow, mappings: &[FieldMapping]) -> Map<String, Value> {
    let mut payload = mapped_payload(record, mappings, EntityKind::Organization);

    set_default(&mut payload, "name", text(record, "ADR_NAME"));
    let street = join_text(record, &["ADR_STREET", "ADR_HOUSE_NUMBER"]);
    set_default(&mut payload, "address", street);
    set_default(&mut payload, "address_postal_code", text(record, "ADR_PLZ"));
    set_default(&mut payload, "address_city", text(record, "ADR_ORT"));
    set_default(&mut payload, "address_country", text(record, "ADR_LAND"));
    payload
}

fn person_payload(record: &ReportRow, mappings: &[FieldMapping]) -> Map<String, Value> {
    let mut payload = mapped_payload(record, mappings, EntityKind::Person);

    set_default(&mut payload, "name", join_text(record, &["AKP_VORNAME", "AKP_NAME"]));
    if payload.contains_key("name") {
        if let Some(email) = text(record, "AKP_EMAIL") {
            set_default(&mut payload, "email", Some(json!([{"value": email, "primary": true}])));
        }
        if let Some(phone) = text(record, "AKP_TEL") {
            set_default(&mut payload, "phone", Some(json!([{"value": phone, "primary": true}])));
        }
    }
    payload
}

fn deal_payload(record: &ReportRow, mappings: &[FieldMapping]) -> Map<String, Value> {
    let mut payload = mapped_payload(record, mappings, EntityKind::Deal);

    set_default(&mut payload, "title", text(record, "NPO_ProjName"));
    set_default(&mut payload, "value", record.get("NPO_KSumme").filter(|v| !is_blank(v)).cloned());
    if payload.contains_key("value") {
        set_default(&mut payload, "currency", Some(json!(DEFAULT_CURRENCY)));
    }
    payload
}

fn set_default(payload: &mut Map<String, Value>, key: &str, value: Option<impl Into<Value>>) {
    if payload.contains_key(key) {
        return;
    }
    if let Some(value) = value {
        payload.insert(key.to_string(), value.into());
    }
}

/// Non-blank scalar as text.
fn text(record: &ReportRow, field: &str) -> Option<String> {
    match record.get(field)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Non-blank parts joined by a space.
fn join_text(record: &ReportRow, fields: &[&str]) -> Option<String> {
    let parts: Vec<String> = fields.iter().filter_map(|f| text(record, f)).collect();
    (!parts.is_empty()).then(|| parts.join(" "))
}
