//! Deployment package assembly.
//!
//! Builds the scratch directory that gets uploaded:
//!
//! 1. **Reset** — remove any scratch directory left by a previous run
//! 2. **Stage** — copy the project tree, skipping excluded paths
//! 3. **Env** — install the production env file as `.env`
//! 4. **Script** — write the executable `server-deploy.sh`

pub mod error;
pub mod exclude;
pub mod package;
pub mod script;
pub mod stage;

pub use error::PackageError;
pub use exclude::{DEFAULT_EXCLUDES, ExcludeSet};
pub use package::{Package, PackageConfig, Packager, remove_scratch_dir};
pub use script::{RestartScript, SCRIPT_NAME};
pub use stage::{StageSummary, stage_tree};
