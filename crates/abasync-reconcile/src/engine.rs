//! Combines the latest project, address and contact datasets into flat
//! records ready for the CRM.
//!
//! Projects are joined to addresses through their owner (or, when the owner
//! is the sentinel `"0"`, their debtor). Every contact of the address fans
//! out into its own record; an address without contacts still yields one
//! record. Fields keep their origin through a kind prefix (`NPO_`, `ADR_`,
//! `AKP_`), so nothing is ever overwritten across reports.

use abasync_core::{
    JobState, RegistryEntry, ReportDataSet, ReportRegistry, ReportRow, STATUS_FIELD, STATUS_NEW,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::key::{first_non_blank, row_key};

/// One output record: prefixed field name to value.
pub type CombinedRecord = serde_json::Map<String, Value>;

/// Report kinds and field names the join relies on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombineConfig {
    /// Kind of the project report driving the output.
    pub primary_kind: String,
    pub address_kind: String,
    /// Optional enrichment.
    pub contact_kind: String,

    /// Unique id of an address row.
    pub address_id_field: String,
    /// Project field naming the owning address.
    pub owner_field: String,
    /// Owner value meaning "use the debtor instead".
    pub owner_sentinel: String,
    pub debtor_field: String,
    /// Projects without a number are dropped.
    pub project_number_field: String,
    /// Contact field naming its address.
    pub contact_address_field: String,
    /// Unique id of a contact row.
    pub contact_id_field: String,

    /// Phone field overwritten with the resolved phone number.
    pub phone_field: String,
    pub address_phone_fields: Vec<String>,
    pub contact_phone_fields: Vec<String>,

    pub status_field: String,
    pub status_new: String,
}

impl Default for CombineConfig {
    fn default() -> Self {
        Self {
            primary_kind: "npo".into(),
            address_kind: "adr".into(),
            contact_kind: "akp".into(),
            address_id_field: "NR".into(),
            owner_field: "AdrNrIntern".into(),
            owner_sentinel: "0".into(),
            debtor_field: "DebNr".into(),
            project_number_field: "ProjNr".into(),
            contact_address_field: "ADR_NR".into(),
            contact_id_field: "NR".into(),
            phone_field: "TEL".into(),
            address_phone_fields: strings(&["TEL", "TEL2", "NATEL"]),
            contact_phone_fields: strings(&["TEL", "TEL_DIREKT", "NATEL", "TEL2", "TEL_PRIVAT"]),
            status_field: STATUS_FIELD.into(),
            status_new: STATUS_NEW.into(),
        }
    }
}

impl CombineConfig {
    /// Output fields identifying a record across runs: the project number,
    /// then the contact id.
    #[must_use]
    pub fn record_key_fields(&self) -> Vec<String> {
        vec![
            format!("{}{}", kind_prefix(&self.primary_kind), self.project_number_field),
            format!("{}{}", kind_prefix(&self.contact_kind), self.contact_id_field),
        ]
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}

/// Field name prefix of a report kind: `adr` gives `ADR_`.
#[must_use]
pub fn kind_prefix(kind: &str) -> String {
    format!("{}_", kind.to_uppercase())
}

/// Newest successful dataset of each joined kind.
#[derive(Debug, Clone, Default)]
pub struct LatestDatasets {
    pub primary: Option<Arc<ReportDataSet>>,
    pub address: Option<Arc<ReportDataSet>>,
    pub contact: Option<Arc<ReportDataSet>>,
}

#[derive(Debug, Clone, Default)]
pub struct CombineEngine {
    config: CombineConfig,
}

impl CombineEngine {
    #[must_use]
    pub fn new(config: CombineConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &CombineConfig {
        &self.config
    }

    /// Picks the newest successful dataset per kind. Entries must be in
    /// creation order; a later entry replaces an earlier one of the same kind.
    #[must_use]
    pub fn latest_datasets(&self, entries: &[RegistryEntry]) -> LatestDatasets {
        let mut latest = LatestDatasets::default();

        for entry in entries {
            if entry.record.state != JobState::FinishedSuccess {
                continue;
            }
            let Some(data) = &entry.data else { continue };

            let kind = entry.record.report_kind.as_str();
            let slot = if kind == self.config.primary_kind {
                &mut latest.primary
            } else if kind == self.config.address_kind {
                &mut latest.address
            } else if kind == self.config.contact_kind {
                &mut latest.contact
            } else {
                continue;
            };
            *slot = Some(Arc::clone(data));
        }

        latest
    }

    /// Combines a registry snapshot.
    #[must_use]
    pub fn combine(&self, entries: &[RegistryEntry]) -> Vec<CombinedRecord> {
        let latest = self.latest_datasets(entries);

        let (Some(primary), Some(address)) = (&latest.primary, &latest.address) else {
            debug!(
                has_primary = latest.primary.is_some(),
                has_address = latest.address.is_some(),
                "Nothing to combine"
            );
            return Vec::new();
        };

        self.combine_datasets(primary, address, latest.contact.as_deref().map(Vec::as_slice))
    }

    /// Takes one consistent snapshot of the registry and combines it.
    #[instrument(skip_all)]
    pub async fn combine_registry(&self, registry: &ReportRegistry) -> Vec<CombinedRecord> {
        let entries = registry.snapshot().await;
        let records = self.combine(&entries);
        debug!(records = records.len(), "Combined report data");
        records
    }

    /// Joins the three datasets. Output follows the project order, then the
    /// contact order within an address.
    #[must_use]
    pub fn combine_datasets(
        &self,
        primary: &[ReportRow],
        address: &[ReportRow],
        contact: Option<&[ReportRow]>,
    ) -> Vec<CombinedRecord> {
        let cfg = &self.config;

        let mut addresses: HashMap<String, &ReportRow> = HashMap::new();
        for row in address {
            if let Some(id) = row_key(row, &cfg.address_id_field) {
                addresses.entry(id).or_insert(row);
            }
        }

        let mut contacts: HashMap<String, Vec<&ReportRow>> = HashMap::new();
        for row in contact.unwrap_or_default() {
            if let Some(id) = row_key(row, &cfg.contact_address_field) {
                contacts.entry(id).or_default().push(row);
            }
        }

        let primary_prefix = kind_prefix(&cfg.primary_kind);
        let address_prefix = kind_prefix(&cfg.address_kind);
        let contact_prefix = kind_prefix(&cfg.contact_kind);

        let mut records = Vec::new();
        for project in primary {
            let Some(owner) = self.owner_key(project) else {
                continue;
            };
            let Some(address_row) = addresses.get(&owner) else {
                continue;
            };

            let mut base = CombinedRecord::new();
            extend_prefixed(&mut base, project, &primary_prefix);
            extend_prefixed(&mut base, address_row, &address_prefix);
            if let Some(phone) = first_non_blank(address_row, &cfg.address_phone_fields) {
                base.insert(format!("{address_prefix}{}", cfg.phone_field), phone.clone());
            }

            match contacts.get(&owner) {
                Some(linked) => {
                    for contact_row in linked {
                        let mut record = base.clone();
                        extend_prefixed(&mut record, contact_row, &contact_prefix);
                        if let Some(phone) =
                            first_non_blank(contact_row, &cfg.contact_phone_fields)
                        {
                            record.insert(
                                format!("{contact_prefix}{}", cfg.phone_field),
                                phone.clone(),
                            );
                        }
                        self.stamp_status(&mut record);
                        records.push(record);
                    }
                }
                None => {
                    self.stamp_status(&mut base);
                    records.push(base);
                }
            }
        }

        records
    }

    /// Address key of a project row; `None` drops the project.
    fn owner_key(&self, project: &ReportRow) -> Option<String> {
        let cfg = &self.config;
        row_key(project, &cfg.project_number_field)?;

        let owner = row_key(project, &cfg.owner_field)?;
        if owner == cfg.owner_sentinel {
            row_key(project, &cfg.debtor_field)
        } else {
            Some(owner)
        }
    }

    fn stamp_status(&self, record: &mut CombinedRecord) {
        record.insert(
            self.config.status_field.clone(),
            Value::String(self.config.status_new.clone()),
        );
    }
}

fn extend_prefixed(record: &mut CombinedRecord, row: &ReportRow, prefix: &str) {
    for (field, value) in row {
        record.insert(format!("{prefix}{field}"), value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(value: Value) -> Vec<ReportRow> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect()
    }

    #[test]
    fn test_record_key_fields_follow_kinds() {
        assert_eq!(
            CombineConfig::default().record_key_fields(),
            ["NPO_ProjNr", "AKP_NR"]
        );

        let config = CombineConfig {
            primary_kind: "prj".into(),
            contact_kind: "kon".into(),
            ..CombineConfig::default()
        };
        assert_eq!(config.record_key_fields(), ["PRJ_ProjNr", "KON_NR"]);
    }

    #[test]
    fn test_kind_prefix() {
        assert_eq!(kind_prefix("npo"), "NPO_");
        assert_eq!(kind_prefix("adr"), "ADR_");
    }

    #[test]
    fn test_owner_sentinel_uses_debtor() {
        let engine = CombineEngine::default();
        let primary = rows(json!([
            {"ProjNr": "P1", "AdrNrIntern": "0", "DebNr": 7},
            {"ProjNr": "P2", "AdrNrIntern": 8, "DebNr": 7}
        ]));
        let address = rows(json!([{"NR": 7, "NAME": "Seven"}, {"NR": "8", "NAME": "Eight"}]));

        let out = engine.combine_datasets(&primary, &address, None);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["ADR_NAME"], "Seven");
        assert_eq!(out[1]["ADR_NAME"], "Eight");
    }

    #[test]
    fn test_projects_without_key_or_number_are_dropped() {
        let engine = CombineEngine::default();
        let primary = rows(json!([
            {"ProjNr": "", "AdrNrIntern": 1},
            {"ProjNr": "P2", "AdrNrIntern": null},
            {"ProjNr": "P3", "AdrNrIntern": "0", "DebNr": ""},
            {"ProjNr": "P4", "AdrNrIntern": 99},
            {"ProjNr": "P5", "AdrNrIntern": 1}
        ]));
        let address = rows(json!([{"NR": 1, "NAME": "One"}]));

        let out = engine.combine_datasets(&primary, &address, None);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["NPO_ProjNr"], "P5");
    }

    #[test]
    fn test_first_address_wins_on_duplicate_ids() {
        let engine = CombineEngine::default();
        let primary = rows(json!([{"ProjNr": "P1", "AdrNrIntern": 1}]));
        let address = rows(json!([{"NR": 1, "NAME": "First"}, {"NR": 1.0, "NAME": "Second"}]));

        let out = engine.combine_datasets(&primary, &address, None);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["ADR_NAME"], "First");
    }
}
