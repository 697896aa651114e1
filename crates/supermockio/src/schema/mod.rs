//! Schema walking: `$ref` resolution, example synthesis and concrete paths.
//!
//! - `refs`: pointer resolution with a per-document cache
//! - `generate`: example values from JSON-Schema-like nodes
//! - `path`: `{param}` substitution in operation path templates

mod generate;
mod path;
mod refs;

pub use generate::{ExampleGenerator, ARRAY_SAMPLE_LEN};
pub use path::{Parameter, PathGenerator};
pub use refs::RefResolver;
