//! Odoo addons: discovery, model extraction and skeleton regeneration.

pub mod classifier;
pub mod field;
pub mod manifest;
pub mod model;
pub mod module;
pub mod scanner;
pub mod security;
pub mod writer;

pub use classifier::{ModelClassifier, ModelFlavor};
pub use field::{ArgValue, Field, FieldRewriter};
pub use manifest::{Manifest, ManifestDefaults};
pub use model::{Model, ModelBuilder};
pub use module::{Module, ModuleVersion};
pub use scanner::ModuleScanner;
pub use security::{CrudLevel, ModelAccessHelper};
pub use writer::{ModuleWriter, WriteOutcome};
