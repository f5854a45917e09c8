// Outreach generation: per-contact pipeline of six model calls, batched over
// an uploaded contact list, exported as CSV.
// All LLM calls go through llm_client — no direct Anthropic calls here.

pub mod batch;
pub mod errors;
pub mod export;
pub mod handlers;
pub mod ingest;
pub mod jobs;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod prompts;
pub mod rate_limit;

#[cfg(test)]
pub mod testing;
