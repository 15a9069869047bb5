pub mod error;
pub mod graph;
pub mod kuzu;
pub mod queries;
pub mod querying;
pub mod schema;
pub mod writer;

pub use error::DatabaseError;
