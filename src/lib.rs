// Produktmatch - Core Library
// Loader + capability matcher, shared by the CLI, the TUI and the API server

pub mod db;
pub mod dataset;
pub mod entities;
pub mod error;
pub mod logging;
pub mod matcher;   // Full / pair / triple capability coverage
pub mod report;
pub mod selection; // Empty-selection guard in front of the matcher

// Re-export commonly used types
pub use db::{
    decode_identifier, decode_le_bytes, import_csv_dir, load_dataset, open_dataset,
    setup_database, ImportStats,
};
pub use dataset::{Dataset, DatasetStats};
pub use entities::{
    Capability, CapabilityId,
    Company, CompanyId, CompanyProfile,
    Product, ProductId,
};
pub use error::{LoadError, LoadResult};
pub use matcher::{
    binomial, find_combination_matches, find_full_matches, match_requirements, summarize,
    CapabilityIndex, Combinations, CombinationSize, CompanyCombination, CompanyEntry,
    EmptySelection, MatchReport, MatchSummary, RequirementSet,
};
pub use report::{combination_profiles, render_chart, ReportStatus, ReportView};
pub use selection::{MatchOutcome, RequirementChoice, Selection};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
