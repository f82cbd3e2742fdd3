//! Cross-module tests for the ingest → retrieve → plan pipeline.
