//! Auth-domain token models.

pub mod token;

pub use token::{pair::*, secret::*};
