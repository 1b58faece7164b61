/*
[INPUT]:  Sign-in domain concepts and serde requirements
[OUTPUT]: Typed Rust structs/enums with serialization support
[POS]:    Data layer - type definitions shared by every component
[UPDATE]: When the data model changes or new types added
*/

pub mod enums;
pub mod models;

pub use enums::*;
pub use models::*;
