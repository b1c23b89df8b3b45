use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use starmap_merge::ConflictResolution;
use starmap_types::{ResourceType, SourceName};

#[derive(Parser)]
#[command(
    name = "starmap",
    about = "Starmap: reconcile AI model catalogs from many sources",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML rule file layered over the default authority table
    #[arg(long, global = true)]
    pub rules: Option<PathBuf>,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Merge records from several catalog sources
    Merge(MergeArgs),
    /// Merge two edits of a record against their common base
    ThreeWay(ThreeWayArgs),
    /// Show field-level changes between two versions of a record
    Diff(DiffArgs),
    /// List authority, priority, and policy rules
    Authorities(AuthoritiesArgs),
}

#[derive(Args)]
pub struct MergeArgs {
    /// Input as SOURCE=FILE, e.g. local_catalog=models.json (repeatable)
    #[arg(short, long = "source", value_parser = parse_source_file, required = true)]
    pub sources: Vec<(SourceName, PathBuf)>,
    #[arg(short, long, default_value = "model")]
    pub resource: ResourceType,
    /// Print per-field provenance
    #[arg(long)]
    pub provenance: bool,
    /// Provenance ledger file, updated with fields whose winner changed
    #[arg(long)]
    pub ledger: Option<PathBuf>,
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct ThreeWayArgs {
    #[arg(long)]
    pub base: PathBuf,
    #[arg(long)]
    pub ours: PathBuf,
    #[arg(long)]
    pub theirs: PathBuf,
    #[arg(short, long, default_value = "model")]
    pub resource: ResourceType,
    /// Resolve every conflict with ours, theirs, base, or merge
    #[arg(long)]
    pub strategy: Option<ConflictResolution>,
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct DiffArgs {
    pub old: PathBuf,
    pub new: PathBuf,
    #[arg(short, long, default_value = "model")]
    pub resource: ResourceType,
}

#[derive(Args)]
pub struct AuthoritiesArgs {
    /// Only show rules for this resource type
    #[arg(short, long)]
    pub resource: Option<ResourceType>,
}

fn parse_source_file(s: &str) -> Result<(SourceName, PathBuf), String> {
    let (source, path) = s
        .split_once('=')
        .ok_or_else(|| format!("expected SOURCE=FILE, got {s:?}"))?;
    let source: SourceName = source.parse().map_err(|e| format!("{e}"))?;
    if path.is_empty() {
        return Err(format!("missing file for source {source}"));
    }
    Ok((source, PathBuf::from(path)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_merge_sources() {
        let cli = Cli::try_parse_from([
            "starmap",
            "merge",
            "-s",
            "local_catalog=local.json",
            "--source",
            "models-dev-http=api.json",
            "--provenance",
        ])
        .unwrap();
        if let Command::Merge(args) = cli.command {
            assert_eq!(args.sources.len(), 2);
            assert_eq!(args.sources[0], (SourceName::LocalCatalog, PathBuf::from("local.json")));
            assert_eq!(args.sources[1].0, SourceName::ModelsDevHttp);
            assert!(matches!(args.resource, ResourceType::Model));
            assert!(args.provenance);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn merge_requires_source() {
        assert!(Cli::try_parse_from(["starmap", "merge"]).is_err());
        assert!(Cli::try_parse_from(["starmap", "merge", "-s", "local.json"]).is_err());
        assert!(Cli::try_parse_from(["starmap", "merge", "-s", "wikipedia=x.json"]).is_err());
    }

    #[test]
    fn parse_three_way() {
        let cli = Cli::try_parse_from([
            "starmap", "three-way", "--base", "b.json", "--ours", "o.json", "--theirs", "t.json",
            "--resource", "provider", "--strategy", "theirs",
        ])
        .unwrap();
        if let Command::ThreeWay(args) = cli.command {
            assert_eq!(args.resource, ResourceType::Provider);
            assert_eq!(args.strategy, Some(ConflictResolution::Theirs));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_diff() {
        let args = ["starmap", "diff", "old.json", "new.json", "-r", "author"];
        let cli = Cli::try_parse_from(args).unwrap();
        if let Command::Diff(args) = cli.command {
            assert_eq!(args.old, PathBuf::from("old.json"));
            assert_eq!(args.resource, ResourceType::Author);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::try_parse_from([
            "starmap", "authorities", "--verbose", "--format", "json", "--rules", "rules.toml",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.format, OutputFormat::Json));
        assert_eq!(cli.rules, Some(PathBuf::from("rules.toml")));
        assert!(matches!(cli.command, Command::Authorities(_)));
    }
}
