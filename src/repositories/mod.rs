pub(crate) mod candidates;
pub(crate) mod document_types;
pub(crate) mod documents;
pub(crate) mod enrollments;
pub(crate) mod sections;
