pub mod codegen;
pub mod error;
pub mod external;
pub mod logging;
pub mod odoo;
pub mod parsers;
pub mod scaffold;

pub use error::{ExternalError, ParseError, RenderError, ValidationError};
pub use logging::{init, init_default, init_from_args};
