//! Core math modules.

pub mod entropy;
pub mod gaussian;
pub mod linalg;
pub mod moments;
pub mod stable;
