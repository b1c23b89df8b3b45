use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use colored::Colorize;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use starmap_diff::{diff_records, FieldChange, Record};
use starmap_merge::{
    AuthorityTable, ConflictKind, StrategicMerger, StrategicOutcome, ThreeWayMerger,
};
use starmap_provenance::{InMemoryProvenance, ProvenanceMap, ProvenanceReader, ProvenanceWriter};
use starmap_types::{Author, MergeMode, Model, Provider, ResourceType, SourceName};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let table = load_table(cli.rules.as_deref())?;
    match cli.command {
        Command::Merge(args) => cmd_merge(args, table, &cli.format),
        Command::ThreeWay(args) => cmd_three_way(args, table, &cli.format),
        Command::Diff(args) => cmd_diff(args, &cli.format),
        Command::Authorities(args) => cmd_authorities(args, &table, &cli.format),
    }
}

fn load_table(rules: Option<&Path>) -> anyhow::Result<AuthorityTable> {
    match rules {
        Some(path) => AuthorityTable::load(path)
            .with_context(|| format!("loading rules from {}", path.display())),
        None => Ok(AuthorityTable::default()),
    }
}

// ---------------------------------------------------------------------------
// merge
// ---------------------------------------------------------------------------

fn cmd_merge(args: MergeArgs, table: AuthorityTable, format: &OutputFormat) -> anyhow::Result<()> {
    let merger = StrategicMerger::new(table);
    match args.resource {
        ResourceType::Model => {
            let outcome = merger.merge_models(&read_sources::<Model>(&args.sources)?)?;
            report_merge(outcome, &args, format)
        }
        ResourceType::Provider => {
            let outcome = merger.merge_providers(&read_sources::<Provider>(&args.sources)?)?;
            report_merge(outcome, &args, format)
        }
        ResourceType::Author => {
            let outcome = merger.merge_authors(&read_sources::<Author>(&args.sources)?)?;
            report_merge(outcome, &args, format)
        }
    }
}

fn read_sources<R: DeserializeOwned>(
    inputs: &[(SourceName, PathBuf)],
) -> anyhow::Result<HashMap<SourceName, Vec<R>>> {
    let mut sources: HashMap<SourceName, Vec<R>> = HashMap::new();
    for (source, path) in inputs {
        let records = read_records(path)?;
        debug!(%source, path = %path.display(), records = records.len(), "read source");
        sources.entry(*source).or_default().extend(records);
    }
    Ok(sources)
}

fn report_merge<R: Record + Serialize>(
    outcome: StrategicOutcome<R>,
    args: &MergeArgs,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let changed = match &args.ledger {
        Some(path) => Some(update_ledger(path, &outcome.provenance)?),
        None => None,
    };

    if let Some(path) = &args.output {
        write_json(path, &outcome.merged)?;
    }

    match format {
        OutputFormat::Json => {
            let mut report = serde_json::json!({ "merged": outcome.merged });
            if args.provenance {
                report["provenance"] = serde_json::to_value(&outcome.provenance)?;
            }
            if let Some(changed) = changed {
                report["ledger_changes"] = changed.into();
            }
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            println!(
                "{} Merged {} {} record(s) from {} source(s)",
                "✓".green().bold(),
                outcome.merged.len(),
                R::RESOURCE_TYPE,
                args.sources.len()
            );
            for record in &outcome.merged {
                println!("  {}", record.id().bold());
                if !args.provenance {
                    continue;
                }
                for (key, field) in outcome.provenance.for_resource(R::RESOURCE_TYPE, record.id()) {
                    println!(
                        "    {:<32} {} {}",
                        key.field.as_str(),
                        "←".dimmed(),
                        field.current.source.to_string().cyan()
                    );
                }
            }
            if let (Some(path), Some(changed)) = (&args.ledger, changed) {
                println!("Ledger {}: {} field(s) changed winner", path.display(), changed);
            }
        }
    }
    Ok(())
}

/// Absorb `provenance` into the ledger file at `path`, creating it if
/// missing. Returns the number of fields whose winner changed.
fn update_ledger(path: &Path, provenance: &ProvenanceMap) -> anyhow::Result<usize> {
    let existing = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading ledger {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("parsing ledger {}", path.display()))?
    } else {
        ProvenanceMap::new()
    };
    let ledger = InMemoryProvenance::from_map(existing);
    let changed = ledger.absorb(provenance)?;
    write_json(path, &ledger.snapshot()?)?;
    info!(
        ledger = %path.display(),
        changed,
        fields = ledger.field_count()?,
        "updated provenance ledger"
    );
    Ok(changed)
}

// ---------------------------------------------------------------------------
// three-way
// ---------------------------------------------------------------------------

fn cmd_three_way(
    args: ThreeWayArgs,
    table: AuthorityTable,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let merger = ThreeWayMerger::new(table);
    match args.resource {
        ResourceType::Model => three_way::<Model>(&merger, &args, format),
        ResourceType::Provider => three_way::<Provider>(&merger, &args, format),
        ResourceType::Author => three_way::<Author>(&merger, &args, format),
    }
}

fn three_way<R: Record + Serialize + DeserializeOwned>(
    merger: &ThreeWayMerger,
    args: &ThreeWayArgs,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let base: R = read_record(&args.base)?;
    let ours: R = read_record(&args.ours)?;
    let theirs: R = read_record(&args.theirs)?;

    let outcome = merger.merge(&base, &ours, &theirs)?;
    let merged = match args.strategy {
        Some(strategy) => outcome.resolve(strategy),
        None => outcome.merged.clone(),
    };
    let unresolved = match args.strategy {
        Some(_) => 0,
        None => outcome.unresolved().count(),
    };

    if let Some(path) = &args.output {
        write_json(path, &merged)?;
    }

    match format {
        OutputFormat::Json => {
            let report = serde_json::json!({
                "merged": merged,
                "conflicts": outcome.conflicts,
                "strategy": args.strategy,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            for conflict in &outcome.conflicts {
                let kind = match conflict.kind {
                    ConflictKind::Added => "added",
                    ConflictKind::Removed => "removed",
                    ConflictKind::Modified => "modified",
                };
                let status = match (&conflict.suggested, args.strategy) {
                    (_, Some(strategy)) => format!("resolved: {strategy}").green(),
                    (Some(suggested), None) => {
                        format!("auto-merged: {}", compact(suggested)).green()
                    }
                    (None, None) => "needs resolution".red().bold(),
                };
                println!(
                    "{} ({}) {}  {}",
                    "CONFLICT".yellow().bold(),
                    kind,
                    conflict.path.as_str().bold(),
                    status
                );
                println!("    base:   {}", compact(&conflict.base).dimmed());
                println!("    ours:   {}", compact(&conflict.ours));
                println!("    theirs: {}", compact(&conflict.theirs));
            }
            if outcome.conflicts.is_empty() {
                println!(
                    "{} Merged {} without conflicts",
                    "✓".green().bold(),
                    merged.id().bold()
                );
            } else if unresolved == 0 {
                println!(
                    "{} Merged {} ({} conflict(s) resolved)",
                    "✓".green().bold(),
                    merged.id().bold(),
                    outcome.conflicts.len()
                );
            } else {
                println!(
                    "{} {} conflict(s) in {} need resolution; \
                     ours kept by default (use --strategy)",
                    "!".red().bold(),
                    unresolved,
                    merged.id().bold()
                );
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// diff
// ---------------------------------------------------------------------------

fn cmd_diff(args: DiffArgs, format: &OutputFormat) -> anyhow::Result<()> {
    match args.resource {
        ResourceType::Model => diff::<Model>(&args, format),
        ResourceType::Provider => diff::<Provider>(&args, format),
        ResourceType::Author => diff::<Author>(&args, format),
    }
}

fn diff<R: Record + DeserializeOwned>(
    args: &DiffArgs,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let old: R = read_record(&args.old)?;
    let new: R = read_record(&args.new)?;
    let diff = diff_records(&old, &new);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&diff)?),
        OutputFormat::Text => {
            if diff.is_empty() {
                println!("No changes.");
                return Ok(());
            }
            for change in &diff.changes {
                match change {
                    FieldChange::Added { path, value } => {
                        println!("{} {} = {}", "+".green(), path.as_str(), compact(value).green())
                    }
                    FieldChange::Removed { path, value } => {
                        println!("{} {} = {}", "-".red(), path.as_str(), compact(value).red())
                    }
                    FieldChange::Modified { path, old, new } => println!(
                        "{} {}: {} → {}",
                        "~".yellow(),
                        path.as_str(),
                        compact(old).dimmed(),
                        compact(new)
                    ),
                }
            }
            println!(
                "{} added, {} removed, {} modified",
                diff.additions(),
                diff.removals(),
                diff.modifications()
            );
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// authorities
// ---------------------------------------------------------------------------

fn cmd_authorities(
    args: AuthoritiesArgs,
    table: &AuthorityTable,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let wanted = |resource: ResourceType| args.resource.map_or(true, |r| r == resource);

    match format {
        OutputFormat::Json => {
            let report = authorities_report(table, args.resource);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            println!("{}", "Authorities".bold());
            let authorities: Vec<_> = table
                .authorities()
                .into_iter()
                .filter(|a| wanted(a.resource))
                .collect();
            if authorities.is_empty() {
                println!("  (none)");
            }
            for authority in &authorities {
                println!(
                    "  {:<9} {:<32} {}",
                    authority.resource.to_string(),
                    authority.field.as_str(),
                    authority.source.to_string().cyan()
                );
            }
            let priorities = table.priority_overrides().filter(|(_, r, _, _)| wanted(*r));
            for (mode, resource, field, sources) in priorities {
                println!(
                    "  {:<9} {:<32} {} ({mode})",
                    resource.to_string(),
                    field,
                    join(sources).yellow()
                );
            }
            let policies = table.policy_overrides().filter(|(r, _, _)| wanted(*r));
            for (resource, field, policy) in policies {
                println!(
                    "  {:<9} {:<32} policy {}",
                    resource.to_string(),
                    field,
                    policy.to_string().magenta()
                );
            }
            println!("Strategic fallback: {}", join(table.default_order(MergeMode::Strategic)));
            println!("Three-way fallback: {}", join(table.default_order(MergeMode::ThreeWay)));
        }
    }
    Ok(())
}

/// Every rule in `table`, optionally limited to one resource type.
fn authorities_report(table: &AuthorityTable, resource: Option<ResourceType>) -> Value {
    let wanted = |r: ResourceType| resource.map_or(true, |wanted| wanted == r);
    let authorities: Vec<_> = table
        .authorities()
        .into_iter()
        .filter(|a| wanted(a.resource))
        .collect();
    let priorities: Vec<Value> = table
        .priority_overrides()
        .filter(|(_, resource, _, _)| wanted(*resource))
        .map(|(mode, resource, field, sources)| {
            serde_json::json!({
                "mode": mode,
                "resource": resource,
                "field": field,
                "sources": sources,
            })
        })
        .collect();
    let policies: Vec<Value> = table
        .policy_overrides()
        .filter(|(resource, _, _)| wanted(*resource))
        .map(|(resource, field, policy)| {
            serde_json::json!({ "resource": resource, "field": field, "policy": policy })
        })
        .collect();

    serde_json::json!({
        "authority": authorities,
        "priority": priorities,
        "policy": policies,
        "strategic_order": table.default_order(MergeMode::Strategic),
        "three_way_order": table.default_order(MergeMode::ThreeWay),
    })
}

// ---------------------------------------------------------------------------
// I/O helpers
// ---------------------------------------------------------------------------

/// Read a JSON file holding either one record or an array of records.
fn read_records<R: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<R>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let value: Value =
        serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
    let records = match value {
        Value::Array(items) => items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<R>, _>>(),
        other => serde_json::from_value(other).map(|record| vec![record]),
    };
    records.with_context(|| format!("decoding records in {}", path.display()))
}

fn read_record<R: DeserializeOwned>(path: &Path) -> anyhow::Result<R> {
    let mut records = read_records(path)?;
    if records.len() != 1 {
        bail!("{} must hold exactly one record, found {}", path.display(), records.len());
    }
    Ok(records.remove(0))
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))
}

fn compact(value: &Value) -> String {
    match value {
        Value::Null => "(none)".into(),
        other => other.to_string(),
    }
}

fn join(sources: &[SourceName]) -> String {
    sources
        .iter()
        .map(SourceName::as_str)
        .collect::<Vec<_>>()
        .join(" > ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write(dir: &tempfile::TempDir, name: &str, value: Value) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, value.to_string()).unwrap();
        path
    }

    #[test]
    fn read_single_and_array() {
        let dir = tempfile::tempdir().unwrap();
        let single = write(&dir, "one.json", json!({ "id": "gpt-4o", "name": "GPT-4o" }));
        let many = write(&dir, "many.json", json!([{ "id": "a" }, { "id": "b" }]));

        let models: Vec<Model> = read_records(&single).unwrap();
        assert_eq!(models[0].name, "GPT-4o");
        let models: Vec<Model> = read_records(&many).unwrap();
        assert_eq!(models.len(), 2);
        assert!(read_record::<Model>(&many).is_err());
    }

    #[test]
    fn read_sources_groups_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(&dir, "a.json", json!([{ "id": "a" }]));
        let b = write(&dir, "b.json", json!([{ "id": "b" }]));
        let sources: HashMap<SourceName, Vec<Provider>> = read_sources(&[
            (SourceName::LocalCatalog, a),
            (SourceName::LocalCatalog, b),
        ])
        .unwrap();
        assert_eq!(sources[&SourceName::LocalCatalog].len(), 2);
    }

    #[test]
    fn ledger_tracks_changed_winners() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = dir.path().join("ledger.json");
        let local = vec![Model::new("gpt-4o", "GPT-4o")];
        let outcome = StrategicMerger::default()
            .merge_models(&HashMap::from([(SourceName::LocalCatalog, local)]))
            .unwrap();

        assert_eq!(update_ledger(&ledger, &outcome.provenance).unwrap(), 1);
        assert_eq!(update_ledger(&ledger, &outcome.provenance).unwrap(), 0);
        let stored: ProvenanceMap =
            serde_json::from_str(&std::fs::read_to_string(&ledger).unwrap()).unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[test]
    fn authorities_report_uses_wire_names() {
        let table = AuthorityTable::default()
            .with_priority(
                ResourceType::Model,
                "description",
                vec![SourceName::ModelsDevHttp, SourceName::LocalCatalog],
            )
            .unwrap();

        let report = authorities_report(&table, Some(ResourceType::Model));
        let priority = report["priority"]
            .as_array()
            .unwrap()
            .iter()
            .find(|row| row["field"] == "description")
            .unwrap();
        assert_eq!(priority["mode"], "strategic");
        assert_eq!(priority["resource"], "model");
        assert_eq!(priority["sources"], json!(["models_dev_http", "local_catalog"]));

        let report = authorities_report(&table, Some(ResourceType::Author));
        let rows = report["priority"].as_array().unwrap();
        assert!(rows.iter().all(|row| row["resource"] == "author"));
    }

    #[test]
    fn missing_rules_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_table(Some(dir.path().join("nope.toml").as_path())).is_err());
        assert!(load_table(None).is_ok());
    }
}
