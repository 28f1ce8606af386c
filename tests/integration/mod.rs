//! Integration Tests Module
//!
//! End-to-end tests for the AI core: fallback selection and circuit
//! breaking, the content generation refine loop, the query pipeline with
//! its safety gate, and the safety validator's adversarial corpus.
//! All model calls go through scripted mock providers; no network.


// Fallback chain, circuit breaker, and cancellation tests
mod fallback_test;

// Content generation workflow tests
mod content_workflow_test;

// Database query workflow tests
mod query_workflow_test;

// Request router operation tests
mod router_test;

// Safety validator adversarial corpus
mod safety_test;
