mod cache;
mod profile;
mod spec;

pub use cache::Cache;
pub use profile::{Contact, Education, Experience, Profile, ProfileError, ResumeLink};
pub use spec::{Element, Props, Spec, SpecViolation};
