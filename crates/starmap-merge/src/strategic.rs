//! N-way merge of catalog records from several named sources.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use starmap_diff::{is_absent, FieldSpec, Record};
use starmap_provenance::{ProvenanceInfo, ProvenanceMap};
use starmap_types::{
    Author, FieldPath, MergeMode, MergePolicy, Model, ModelFeatures, Provider, ResourceType,
    SourceName,
};

use crate::authority::AuthorityTable;
use crate::error::{MergeError, MergeResult};
use crate::strategy::{pick_in_order, AuthorityStrategy, ResolutionStrategy};

/// Model sub-structures taken wholesale from a single source.
const WHOLESALE: [&str; 3] = ["limits", "pricing", "metadata"];

/// Model field roots handled by composite rules rather than field by field.
const MODEL_COMPOSITES: [&str; 4] = ["limits", "pricing", "metadata", "features"];

/// Merged records plus the provenance of every field that received a value.
#[derive(Clone, Debug, Default)]
pub struct StrategicOutcome<R> {
    /// One record per distinct ID, ordered by ID.
    pub merged: Vec<R>,
    pub provenance: ProvenanceMap,
}

/// Merges records from catalog sources using an [`AuthorityTable`].
///
/// Records are grouped by ID across sources. Each field is resolved by
/// [`AuthorityStrategy`] among the sources that supplied a non-absent value.
/// For models, `limits`, `pricing` and `metadata` are taken wholesale from one
/// source and capability flags are combined by the feature rule.
#[derive(Clone, Debug, Default)]
pub struct StrategicMerger {
    table: AuthorityTable,
    timestamp: Option<DateTime<Utc>>,
}

/// All records sharing one ID, keyed by the source that supplied them.
struct Group<'a, R> {
    id: &'a str,
    records: BTreeMap<SourceName, &'a R>,
}

impl StrategicMerger {
    pub fn new(table: AuthorityTable) -> Self {
        Self {
            table,
            timestamp: None,
        }
    }

    /// Use `timestamp` instead of the wall clock for `updated_at` and for
    /// provenance entries.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn table(&self) -> &AuthorityTable {
        &self.table
    }

    pub fn merge_models(
        &self,
        sources: &HashMap<SourceName, Vec<Model>>,
    ) -> MergeResult<StrategicOutcome<Model>> {
        self.merge_records(sources, &MODEL_COMPOSITES, Self::merge_model_composites)
    }

    pub fn merge_providers(
        &self,
        sources: &HashMap<SourceName, Vec<Provider>>,
    ) -> MergeResult<StrategicOutcome<Provider>> {
        self.merge_records(sources, &[], |_, _, _, _, _| {})
    }

    pub fn merge_authors(
        &self,
        sources: &HashMap<SourceName, Vec<Author>>,
    ) -> MergeResult<StrategicOutcome<Author>> {
        self.merge_records(sources, &[], |_, _, _, _, _| {})
    }

    fn merge_records<R, F>(
        &self,
        sources: &HashMap<SourceName, Vec<R>>,
        composite_roots: &[&str],
        composite: F,
    ) -> MergeResult<StrategicOutcome<R>>
    where
        R: Record,
        F: Fn(&Self, &Group<'_, R>, &mut R, &mut ProvenanceMap, DateTime<Utc>),
    {
        let now = self.timestamp.unwrap_or_else(Utc::now);
        let groups = group_by_id(sources)?;
        let mut outcome = StrategicOutcome {
            merged: Vec::with_capacity(groups.len()),
            provenance: ProvenanceMap::new(),
        };

        for group in groups.values() {
            let mut merged = R::with_id(group.id);

            for spec in R::fields() {
                if composite_roots
                    .iter()
                    .any(|root| spec.field_path().starts_with(root))
                {
                    continue;
                }
                self.resolve_field(spec, group, &mut merged, &mut outcome.provenance, now);
            }
            composite(self, group, &mut merged, &mut outcome.provenance, now);

            let created_at = pick_in_order(
                self.table.default_order(MergeMode::Strategic).iter().copied(),
                &group
                    .records
                    .iter()
                    .filter_map(|(source, record)| record.created_at().map(|ts| (*source, ts)))
                    .collect(),
            )
            .map_or(now, |(_, ts)| *ts);
            merged.set_timestamps(Some(created_at), Some(now));

            outcome.merged.push(merged);
        }

        debug!(
            resource = %R::RESOURCE_TYPE,
            sources = sources.len(),
            records = outcome.merged.len(),
            fields = outcome.provenance.len(),
            "strategic merge complete"
        );
        Ok(outcome)
    }

    /// Resolve one field and write the winner into `merged`. A value that
    /// fails to decode is dropped and the next candidate is tried.
    fn resolve_field<R: Record>(
        &self,
        spec: &FieldSpec<R>,
        group: &Group<'_, R>,
        merged: &mut R,
        provenance: &mut ProvenanceMap,
        now: DateTime<Utc>,
    ) {
        let path = spec.field_path();
        let mut candidates: BTreeMap<SourceName, Value> = group
            .records
            .iter()
            .map(|(source, record)| (*source, spec.get(record)))
            .filter(|(_, value)| !is_absent(value))
            .collect();
        let strategy = AuthorityStrategy::new(&self.table, MergeMode::Strategic);

        while let Some(resolved) = strategy.resolve(R::RESOURCE_TYPE, &path, &candidates) {
            match spec.set(merged, resolved.value.clone()) {
                Ok(()) => {
                    let info = ProvenanceInfo::new(resolved.source, path, resolved.value, now);
                    provenance.track_field(R::RESOURCE_TYPE, group.id, info);
                    return;
                }
                Err(err) => {
                    warn!(
                        resource = %R::RESOURCE_TYPE,
                        id = group.id,
                        field = %path,
                        source = %resolved.source,
                        error = %err,
                        "dropping undecodable value"
                    );
                    candidates.remove(&resolved.source);
                }
            }
        }
    }

    fn merge_model_composites(
        &self,
        group: &Group<'_, Model>,
        merged: &mut Model,
        provenance: &mut ProvenanceMap,
        now: DateTime<Utc>,
    ) {
        for root in WHOLESALE {
            let winner = match root {
                "limits" => self
                    .wholesale(root, group, |m| m.limits.as_ref())
                    .map(|(source, limits)| {
                        merged.limits = Some(*limits);
                        source
                    }),
                "pricing" => self
                    .wholesale(root, group, |m| m.pricing.as_ref())
                    .map(|(source, pricing)| {
                        merged.pricing = Some(pricing.clone());
                        source
                    }),
                _ => self
                    .wholesale(root, group, |m| m.metadata.as_ref())
                    .map(|(source, metadata)| {
                        merged.metadata = Some(metadata.clone());
                        source
                    }),
            };
            if let Some(source) = winner {
                track_subtree(&*merged, root, source, group.id, provenance, now);
            }
        }

        self.merge_features(group, merged, provenance, now);
    }

    /// Pick a sub-structure from one source: the authority, then the
    /// aggregators, then the fallback order. Default-valued sub-structures
    /// count as absent.
    fn wholesale<'a, T>(
        &self,
        root: &str,
        group: &Group<'a, Model>,
        get: impl Fn(&'a Model) -> Option<&'a T>,
    ) -> Option<(SourceName, &'a T)>
    where
        T: Default + PartialEq + 'a,
    {
        let path = FieldPath::from(root);
        let candidates: BTreeMap<SourceName, &T> = group
            .records
            .iter()
            .filter_map(|(source, model)| get(*model).map(|value| (*source, value)))
            .filter(|(_, value)| **value != T::default())
            .collect();

        let mut order: Vec<SourceName> = self
            .table
            .get_authority(&path, ResourceType::Model)
            .map(|authority| authority.source)
            .into_iter()
            .collect();
        order.extend(SourceName::AGGREGATORS);
        order.extend(self.table.priority(MergeMode::Strategic, ResourceType::Model, &path));

        pick_in_order(order, &candidates).map(|(source, value)| (source, *value))
    }

    /// Provider API features are current truth when present; otherwise the
    /// fallback order picks a base. Flags the aggregators report are then
    /// OR'd in, except flags the provider API owns when it supplied the base.
    fn merge_features(
        &self,
        group: &Group<'_, Model>,
        merged: &mut Model,
        provenance: &mut ProvenanceMap,
        now: DateTime<Utc>,
    ) {
        let candidates: BTreeMap<SourceName, &ModelFeatures> = group
            .records
            .iter()
            .filter_map(|(source, model)| model.features.as_ref().map(|f| (*source, f)))
            .filter(|(_, features)| **features != ModelFeatures::default())
            .collect();
        let root = FieldPath::from("features");

        let base = match candidates.get(&SourceName::ProviderApi) {
            Some(features) => Some((SourceName::ProviderApi, *features)),
            None => AuthorityStrategy::new(&self.table, MergeMode::Strategic)
                .pick(ResourceType::Model, &root, &candidates)
                .map(|(source, features)| (source, *features)),
        };
        let Some((base_source, base)) = base else {
            return;
        };
        merged.features = Some(base.clone());
        track_subtree(&*merged, "features", base_source, group.id, provenance, now);

        let flags = Model::fields()
            .iter()
            .filter(|spec| spec.field_path().starts_with("features"))
            .filter(|spec| self.table.policy_for(spec) == MergePolicy::BooleanOr);

        for spec in flags {
            let path = spec.field_path();
            let owned_by_api = base_source == SourceName::ProviderApi
                && self
                    .table
                    .get_authority(&path, ResourceType::Model)
                    .is_some_and(|authority| authority.source == SourceName::ProviderApi);
            if owned_by_api || spec.get(merged) == Value::Bool(true) {
                continue;
            }

            let reported = SourceName::AGGREGATORS.into_iter().find(|source| {
                group
                    .records
                    .get(source)
                    .is_some_and(|model| spec.get(model) == Value::Bool(true))
            });
            let Some(source) = reported else {
                continue;
            };

            match spec.set(merged, Value::Bool(true)) {
                Ok(()) => {
                    let info = ProvenanceInfo::new(source, path, Value::Bool(true), now);
                    provenance.track_field(ResourceType::Model, group.id, info);
                }
                Err(err) => warn!(
                    id = group.id,
                    field = %path,
                    error = %err,
                    "failed to set capability flag"
                ),
            }
        }
    }
}

/// Track every non-absent field under `root` of `merged` as won by `source`.
fn track_subtree<R: Record>(
    merged: &R,
    root: &str,
    source: SourceName,
    id: &str,
    provenance: &mut ProvenanceMap,
    now: DateTime<Utc>,
) {
    for spec in R::fields().iter().filter(|spec| spec.field_path().starts_with(root)) {
        let value = spec.get(merged);
        if is_absent(&value) || value == Value::Bool(false) {
            continue;
        }
        let info = ProvenanceInfo::new(source, spec.field_path(), value, now);
        provenance.track_field(R::RESOURCE_TYPE, id, info);
    }
}

/// Group records by ID, iterating sources in [`SourceName`] order.
///
/// Records with an empty ID are skipped; a repeated ID within one source
/// keeps the first occurrence.
fn group_by_id<R: Record>(
    sources: &HashMap<SourceName, Vec<R>>,
) -> MergeResult<BTreeMap<&str, Group<'_, R>>> {
    let mut names: Vec<SourceName> = sources.keys().copied().collect();
    names.sort();

    let mut groups: BTreeMap<&str, Group<'_, R>> = BTreeMap::new();
    for name in names {
        if name.mode() != MergeMode::Strategic {
            return Err(MergeError::InvalidSource {
                name,
                mode: MergeMode::Strategic,
            });
        }
        for record in sources.get(&name).into_iter().flatten() {
            let id = record.id();
            if id.is_empty() {
                warn!(resource = %R::RESOURCE_TYPE, source = %name, "skipping record without id");
                continue;
            }
            let group = groups.entry(id).or_insert_with(|| Group {
                id,
                records: BTreeMap::new(),
            });
            if group.records.contains_key(&name) {
                debug!(
                    resource = %R::RESOURCE_TYPE,
                    id,
                    source = %name,
                    "ignoring duplicate record"
                );
                continue;
            }
            group.records.insert(name, record);
        }
    }
    Ok(groups)
}
