use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use starmap_diff::{set_path, Record};
use starmap_types::FieldPath;

use crate::error::MergeError;
use crate::three_way::Conflict;

/// A blanket decision applied to every conflict in a list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolution {
    #[default]
    Ours,
    Theirs,
    Base,
    /// The suggested value when the conflict can be merged, else ours.
    Merge,
}

impl ConflictResolution {
    pub const ALL: [ConflictResolution; 4] = [Self::Ours, Self::Theirs, Self::Base, Self::Merge];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ours => "ours",
            Self::Theirs => "theirs",
            Self::Base => "base",
            Self::Merge => "merge",
        }
    }

    /// The value this strategy picks for `conflict`.
    pub fn pick(&self, conflict: &Conflict) -> Value {
        match self {
            Self::Ours => conflict.ours.clone(),
            Self::Theirs => conflict.theirs.clone(),
            Self::Base => conflict.base.clone(),
            Self::Merge => match (&conflict.suggested, conflict.can_merge) {
                (Some(suggested), true) => suggested.clone(),
                _ => conflict.ours.clone(),
            },
        }
    }
}

impl fmt::Display for ConflictResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConflictResolution {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| MergeError::UnknownResolution(s.to_string()))
    }
}

/// The value chosen for one conflicting field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub path: FieldPath,
    pub value: Value,
}

/// One resolution per conflict, in input order.
pub fn resolve_conflicts(conflicts: &[Conflict], strategy: ConflictResolution) -> Vec<Resolution> {
    conflicts
        .iter()
        .map(|conflict| Resolution {
            path: conflict.path.clone(),
            value: strategy.pick(conflict),
        })
        .collect()
}

/// A copy of `record` with each resolution written to its field.
///
/// A resolution naming an unknown field, or carrying a value that does not
/// fit the field, is logged and skipped.
pub fn apply_resolutions<R: Record>(record: &R, resolutions: &[Resolution]) -> R {
    let mut resolved = record.clone();
    for resolution in resolutions {
        let value = resolution.value.clone();
        if let Err(err) = set_path(&mut resolved, resolution.path.as_str(), value) {
            warn!(
                resource = %R::RESOURCE_TYPE,
                id = record.id(),
                field = %resolution.path,
                error = %err,
                "skipping resolution"
            );
        }
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::three_way::ConflictKind;
    use serde_json::json;
    use starmap_types::Model;

    fn name_conflict() -> Conflict {
        Conflict {
            path: FieldPath::from("name"),
            base: json!("Original"),
            ours: json!("Our Name"),
            theirs: json!("Their Name"),
            kind: ConflictKind::Modified,
            can_merge: false,
            suggested: None,
        }
    }

    fn window_conflict() -> Conflict {
        Conflict {
            path: FieldPath::from("limits.context_window"),
            base: json!(1_000),
            ours: json!(2_000),
            theirs: json!(3_000),
            kind: ConflictKind::Modified,
            can_merge: true,
            suggested: Some(json!(3_000)),
        }
    }

    #[test]
    fn resolution_strategies() {
        let conflicts = [name_conflict()];
        let value = |strategy| resolve_conflicts(&conflicts, strategy)[0].value.clone();
        assert_eq!(value(ConflictResolution::Ours), json!("Our Name"));
        assert_eq!(value(ConflictResolution::Theirs), json!("Their Name"));
        assert_eq!(value(ConflictResolution::Base), json!("Original"));
        assert_eq!(value(ConflictResolution::Merge), json!("Our Name"));
    }

    #[test]
    fn merge_uses_suggestion() {
        let conflicts = [name_conflict(), window_conflict()];
        let resolutions = resolve_conflicts(&conflicts, ConflictResolution::Merge);
        assert_eq!(resolutions.len(), 2);
        assert_eq!(resolutions[0].path, "name");
        assert_eq!(resolutions[1].path, "limits.context_window");
        assert_eq!(resolutions[1].value, json!(3_000));
    }

    #[test]
    fn empty_list() {
        assert!(resolve_conflicts(&[], ConflictResolution::Theirs).is_empty());
    }

    #[test]
    fn parse_and_display() {
        for strategy in ConflictResolution::ALL {
            assert_eq!(strategy.to_string().parse::<ConflictResolution>().unwrap(), strategy);
        }
        assert_eq!("THEIRS".parse::<ConflictResolution>().unwrap(), ConflictResolution::Theirs);
        assert!(matches!(
            "mine".parse::<ConflictResolution>(),
            Err(MergeError::UnknownResolution(_))
        ));
        assert_eq!(serde_json::to_string(&ConflictResolution::Merge).unwrap(), "\"merge\"");
    }

    #[test]
    fn apply_writes_fields() {
        let record = Model::new("gpt-4o", "Our Name");
        let resolutions = vec![
            Resolution {
                path: FieldPath::from("name"),
                value: json!("Their Name"),
            },
            Resolution {
                path: FieldPath::from("limits.context_window"),
                value: json!(3_000),
            },
        ];
        let resolved = apply_resolutions(&record, &resolutions);
        assert_eq!(resolved.name, "Their Name");
        assert_eq!(resolved.limits.unwrap().context_window, 3_000);
        // input untouched
        assert_eq!(record.name, "Our Name");
    }

    #[test]
    fn apply_skips_bad_resolutions() {
        let record = Model::new("gpt-4o", "Name");
        let resolutions = vec![
            Resolution {
                path: FieldPath::from("no_such_field"),
                value: json!(1),
            },
            Resolution {
                path: FieldPath::from("limits.context_window"),
                value: json!("lots"),
            },
            Resolution {
                path: FieldPath::from("description"),
                value: json!("kept"),
            },
        ];
        let resolved = apply_resolutions(&record, &resolutions);
        assert!(resolved.limits.is_none());
        assert_eq!(resolved.description.as_deref(), Some("kept"));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn arb_value() -> impl Strategy<Value = Value> {
            prop_oneof![
                Just(Value::Null),
                any::<i64>().prop_map(Value::from),
                "[a-z]{0,6}".prop_map(Value::from),
            ]
        }

        fn arb_conflict() -> impl Strategy<Value = Conflict> {
            (
                prop::sample::select(vec!["name", "description", "limits.context_window"]),
                arb_value(),
                arb_value(),
                arb_value(),
                prop::option::of(arb_value()),
            )
                .prop_map(|(path, base, ours, theirs, suggested)| Conflict {
                    path: FieldPath::from(path),
                    base,
                    ours,
                    theirs,
                    kind: ConflictKind::Modified,
                    can_merge: suggested.is_some(),
                    suggested,
                })
        }

        proptest! {
            #[test]
            fn resolver_is_total_and_ordered(
                conflicts in prop::collection::vec(arb_conflict(), 0..16),
                strategy in prop::sample::select(ConflictResolution::ALL.to_vec()),
            ) {
                let resolutions = resolve_conflicts(&conflicts, strategy);
                prop_assert_eq!(resolutions.len(), conflicts.len());
                for (resolution, conflict) in resolutions.iter().zip(&conflicts) {
                    prop_assert_eq!(&resolution.path, &conflict.path);
                    let expected = match strategy {
                        ConflictResolution::Ours => &conflict.ours,
                        ConflictResolution::Theirs => &conflict.theirs,
                        ConflictResolution::Base => &conflict.base,
                        ConflictResolution::Merge => {
                            conflict.suggested.as_ref().unwrap_or(&conflict.ours)
                        }
                    };
                    prop_assert_eq!(&resolution.value, expected);
                }
            }
        }
    }
}
