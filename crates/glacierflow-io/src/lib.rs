//! File I/O for the glacierflow pipeline: input ingestion with schema
//! checks, the artifact catalogue, atomic publishing and JSON export.

mod artifact;
mod error;
mod export;
mod layout;
mod mass_balance;
mod reader;
mod schema;
mod writer;

pub use artifact::Artifact;
pub use error::IoError;
pub use export::export_json;
pub use layout::{
    CLIMATE_FEATURES_FILE, GLACIER_ATTRIBUTES_FILE, GLACIER_MASTER_FILE, InputLayout,
    MASS_BALANCE_DIR,
};
pub use mass_balance::{MassBalanceReader, read_mass_balance_dir};
pub use reader::{ArtifactReader, InputReader};
pub use writer::ArtifactWriter;
