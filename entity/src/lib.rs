//! sea-orm entities for the onboarding store.

pub mod employees;
