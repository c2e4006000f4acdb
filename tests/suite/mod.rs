//! End-to-end tests: the pipeline wired from settings, and the HTTP surface.

mod http;
mod pipeline;
