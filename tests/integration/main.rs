//! Integration tests: full scan cycles against in-memory sources.

mod mock_source;
mod pipeline;
