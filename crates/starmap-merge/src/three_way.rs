//! Three-way merge of a base record and two divergent edits.
//!
//! Every field in the record's table is compared across `(base, ours,
//! theirs)`:
//!
//! - neither side changed it: base is kept;
//! - one side changed it: that side wins;
//! - both changed it to equal values: the shared value wins;
//! - both changed it to different values: a [`Conflict`] is recorded and
//!   classified by the field's [`MergePolicy`].
//!
//! `BooleanOr` fields never conflict. They are OR-combined across all three
//! inputs in a pass that runs before the per-field comparison.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use starmap_diff::{is_absent, numeric_max, set_union, values_equal, FieldSpec, ParentSpec, Record};
use starmap_types::{
    Author, FieldPath, MergeMode, MergePolicy, Model, Provider, Resource, ResourceType, SourceName,
};

use crate::authority::AuthorityTable;
use crate::error::{MergeError, MergeResult};
use crate::resolve::{apply_resolutions, resolve_conflicts, ConflictResolution};
use crate::strategy::{AuthorityStrategy, ResolutionStrategy};

/// How a conflicting field diverged from the base.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// The base had no value; both sides added different ones.
    Added,
    /// One side cleared a value the base had while the other changed it.
    Removed,
    /// Both sides changed an existing value differently.
    Modified,
}

/// A field both sides changed to different values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub path: FieldPath,
    pub base: Value,
    pub ours: Value,
    pub theirs: Value,
    pub kind: ConflictKind,
    /// Whether the field's policy combines the two sides automatically.
    pub can_merge: bool,
    /// The combined value, present exactly when `can_merge` is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested: Option<Value>,
}

/// The merged record and the conflicts met while producing it.
///
/// Auto-mergeable conflicts are already applied to `merged`; the others hold
/// the default winner (ours) until the caller resolves them.
#[derive(Clone, Debug, PartialEq)]
pub struct ThreeWayOutcome<R> {
    pub merged: R,
    pub conflicts: Vec<Conflict>,
}

impl<R> ThreeWayOutcome<R> {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    /// Conflicts the engine could not combine on its own.
    pub fn unresolved(&self) -> impl Iterator<Item = &Conflict> {
        self.conflicts.iter().filter(|c| !c.can_merge)
    }

    pub fn map<S>(self, f: impl FnOnce(R) -> S) -> ThreeWayOutcome<S> {
        ThreeWayOutcome {
            merged: f(self.merged),
            conflicts: self.conflicts,
        }
    }
}

impl<R: Record> ThreeWayOutcome<R> {
    /// The merged record with every conflict resolved by `strategy`.
    pub fn resolve(&self, strategy: ConflictResolution) -> R {
        apply_resolutions(&self.merged, &resolve_conflicts(&self.conflicts, strategy))
    }
}

/// Merges `(base, ours, theirs)` triples.
#[derive(Clone, Debug, Default)]
pub struct ThreeWayMerger {
    table: AuthorityTable,
}

impl ThreeWayMerger {
    pub fn new(table: AuthorityTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &AuthorityTable {
        &self.table
    }

    pub fn merge_models(
        &self,
        base: &Model,
        ours: &Model,
        theirs: &Model,
    ) -> MergeResult<ThreeWayOutcome<Model>> {
        self.merge(base, ours, theirs)
    }

    pub fn merge_providers(
        &self,
        base: &Provider,
        ours: &Provider,
        theirs: &Provider,
    ) -> MergeResult<ThreeWayOutcome<Provider>> {
        self.merge(base, ours, theirs)
    }

    pub fn merge_authors(
        &self,
        base: &Author,
        ours: &Author,
        theirs: &Author,
    ) -> MergeResult<ThreeWayOutcome<Author>> {
        self.merge(base, ours, theirs)
    }

    /// Merge three resources of possibly unknown kind.
    ///
    /// Fails with [`MergeError::ResourceTypeMismatch`] unless all three are
    /// the same kind.
    pub fn merge_resources(
        &self,
        base: &Resource,
        ours: &Resource,
        theirs: &Resource,
    ) -> MergeResult<ThreeWayOutcome<Resource>> {
        match (base, ours, theirs) {
            (Resource::Model(b), Resource::Model(o), Resource::Model(t)) => {
                Ok(self.merge(b, o, t)?.map(Resource::Model))
            }
            (Resource::Provider(b), Resource::Provider(o), Resource::Provider(t)) => {
                Ok(self.merge(b, o, t)?.map(Resource::Provider))
            }
            (Resource::Author(b), Resource::Author(o), Resource::Author(t)) => {
                Ok(self.merge(b, o, t)?.map(Resource::Author))
            }
            _ => {
                let (side, actual) = if ours.resource_type() != base.resource_type() {
                    (SourceName::Ours, ours.resource_type())
                } else {
                    (SourceName::Theirs, theirs.resource_type())
                };
                Err(MergeError::ResourceTypeMismatch {
                    base: base.resource_type(),
                    side,
                    actual,
                })
            }
        }
    }

    /// Merge one record triple.
    pub fn merge<R: Record>(
        &self,
        base: &R,
        ours: &R,
        theirs: &R,
    ) -> MergeResult<ThreeWayOutcome<R>> {
        check_id(base, ours, SourceName::Ours)?;
        check_id(base, theirs, SourceName::Theirs)?;

        let mut merged = base.clone();
        let mut conflicts = Vec::new();
        let (boolean, rest): (Vec<&FieldSpec<R>>, Vec<&FieldSpec<R>>) = R::fields()
            .iter()
            .partition(|spec| self.table.policy_for(spec) == MergePolicy::BooleanOr);

        for spec in boolean {
            self.or_combine(spec, base, ours, theirs, &mut merged);
        }
        for spec in rest {
            if let Some(conflict) = self.merge_field(spec, base, ours, theirs, &mut merged) {
                conflicts.push(conflict);
            }
        }
        for parent in R::parents() {
            drop_removed_parent(parent, [base, ours, theirs], &conflicts, &mut merged);
        }

        let created_at = base
            .created_at()
            .or_else(|| ours.created_at())
            .or_else(|| theirs.created_at());
        let updated_at = [base.updated_at(), ours.updated_at(), theirs.updated_at()]
            .into_iter()
            .flatten()
            .max();
        merged.set_timestamps(created_at, updated_at);

        debug!(
            resource = %R::RESOURCE_TYPE,
            id = base.id(),
            conflicts = conflicts.len(),
            auto_merged = conflicts.iter().filter(|c| c.can_merge).count(),
            "three-way merge complete"
        );
        Ok(ThreeWayOutcome { merged, conflicts })
    }

    fn or_combine<R: Record>(
        &self,
        spec: &FieldSpec<R>,
        base: &R,
        ours: &R,
        theirs: &R,
        merged: &mut R,
    ) {
        let values = [spec.get(base), spec.get(ours), spec.get(theirs)];
        if values.iter().all(Value::is_null) {
            return;
        }
        let combined = Value::Bool(values.iter().any(|v| *v == Value::Bool(true)));
        if spec.get(merged) != combined {
            write(spec, merged, combined);
        }
    }

    fn merge_field<R: Record>(
        &self,
        spec: &FieldSpec<R>,
        base: &R,
        ours: &R,
        theirs: &R,
        merged: &mut R,
    ) -> Option<Conflict> {
        let policy = self.table.policy_for(spec);
        let (b, o, t) = (spec.get(base), spec.get(ours), spec.get(theirs));
        let ours_changed = !values_equal(policy, &b, &o);
        let theirs_changed = !values_equal(policy, &b, &t);

        match (ours_changed, theirs_changed) {
            (false, false) => None,
            (true, false) => {
                write(spec, merged, o);
                None
            }
            (false, true) => {
                write(spec, merged, t);
                None
            }
            (true, true) if values_equal(policy, &o, &t) => {
                write(spec, merged, o);
                None
            }
            (true, true) => {
                let path = spec.field_path();
                let default = self.default_winner(R::RESOURCE_TYPE, &path, &b, &o, &t);
                let suggested = match policy {
                    MergePolicy::NumericMax => numeric_max(&o, &t),
                    MergePolicy::SetUnion => Some(set_union(&o, &t)),
                    MergePolicy::TakeEither => Some(default.clone()),
                    MergePolicy::BooleanOr | MergePolicy::Manual => None,
                };
                write(spec, merged, suggested.clone().unwrap_or(default));

                let kind = if is_absent(&b) {
                    ConflictKind::Added
                } else if is_absent(&o) || is_absent(&t) {
                    ConflictKind::Removed
                } else {
                    ConflictKind::Modified
                };
                Some(Conflict {
                    path,
                    base: b,
                    ours: o,
                    theirs: t,
                    kind,
                    can_merge: suggested.is_some(),
                    suggested,
                })
            }
        }
    }

    /// The value a non-combinable conflict takes until resolved: the
    /// three-way fallback order, ours first by default.
    fn default_winner(
        &self,
        resource: ResourceType,
        path: &FieldPath,
        base: &Value,
        ours: &Value,
        theirs: &Value,
    ) -> Value {
        let candidates = BTreeMap::from([
            (SourceName::Base, base.clone()),
            (SourceName::Ours, ours.clone()),
            (SourceName::Theirs, theirs.clone()),
        ]);
        AuthorityStrategy::new(&self.table, MergeMode::ThreeWay)
            .resolve(resource, path, &candidates)
            .map_or_else(|| ours.clone(), |resolved| resolved.value)
    }
}

/// Clear a sub-structure the merge should leave absent.
///
/// Presence follows the same one-sided-change rule as fields. The parent is
/// only cleared when nothing under it conflicted and every leaf the merge
/// wrote there is empty, so OR-combined flags keep their parent alive.
fn drop_removed_parent<R: Record>(
    parent: &ParentSpec<R>,
    sides: [&R; 3],
    conflicts: &[Conflict],
    merged: &mut R,
) {
    let [b, o, t] = sides.map(|record| parent.is_present(record));
    let present = if o != b { o } else { t };
    if present || !parent.is_present(merged) {
        return;
    }
    if conflicts.iter().any(|c| c.path.starts_with(parent.root())) {
        return;
    }
    let empty = R::fields()
        .iter()
        .filter(|spec| spec.field_path().starts_with(parent.root()))
        .all(|spec| {
            let value = spec.get(merged);
            is_absent(&value) || value == Value::Bool(false)
        });
    if empty {
        parent.clear(merged);
    }
}

fn check_id<R: Record>(base: &R, side: &R, name: SourceName) -> MergeResult<()> {
    if base.id() == side.id() {
        Ok(())
    } else {
        Err(MergeError::IdMismatch {
            side: name,
            base: base.id().to_string(),
            actual: side.id().to_string(),
        })
    }
}

fn write<R: Record>(spec: &FieldSpec<R>, merged: &mut R, value: Value) {
    if let Err(err) = spec.set(merged, value) {
        warn!(
            resource = %R::RESOURCE_TYPE,
            id = merged.id(),
            field = spec.path(),
            error = %err,
            "keeping base value"
        );
    }
}
