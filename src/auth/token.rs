//! Access/refresh credential types owned by the token store.

pub mod pair;
pub mod secret;
