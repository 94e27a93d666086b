//! Shared utility functions for adforge.

pub mod json_extraction;

pub use json_extraction::{
    extract_json_object, normalize_response_body, JsonExtractionError,
};
