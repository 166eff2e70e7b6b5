pub mod json;
pub mod serializer;
