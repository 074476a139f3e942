pub mod literal;
pub mod location;
pub mod repair;
pub mod source;

pub use literal::*;
pub use location::*;
pub use repair::*;
pub use source::*;
