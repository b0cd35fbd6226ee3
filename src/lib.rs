//! Contratos Core - Contract Generation Service
//!
//! # Guarantees
//! 1. The Template Is the Document
//! 2. Required Fields Are Checked in Order
//! 3. Organization Data Is Authoritative
//! 4. No Partial Documents
//! 5. The PDF Is a Courtesy

pub mod config;
pub mod context;
pub mod currency;
pub mod docx;
pub mod http;
pub mod naming;
pub mod pipeline;
pub mod print;
pub mod templates;
pub mod validation;

pub use config::ServiceConfig;
pub use context::{ContractProfile, ContractRequest, MergeContext, OrganizationConstants};
pub use currency::format_currency;
pub use http::{router, AppState};
pub use naming::artifact_base_name;
pub use pipeline::{ContractPipeline, GeneratedContract, PipelineError};
pub use print::{LibreOfficeConverter, PrintConverter};
pub use templates::{TemplateLocator, TemplateStatus};
pub use validation::{ValidationRule, ValidationViolation, Validator};

pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");
