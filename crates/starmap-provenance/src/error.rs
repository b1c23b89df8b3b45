/// Errors produced by provenance ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProvenanceError {
    #[error("provenance {0} lock poisoned")]
    LockPoisoned(&'static str),
}
