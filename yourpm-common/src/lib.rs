pub mod archive;
pub mod error;

pub use error::CommonError;
