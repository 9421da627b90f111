pub mod ordering;
pub mod presentation;
pub mod session;
