//! # sym-llm
//!
//! Inference port used by the converter, the LLM validation engine and the
//! convention importer.
//!
//! - [`InferenceClient`]: one `complete(request) -> text` contract
//! - [`OpenAiClient`]: standalone OpenAI-compatible chat completions backend
//! - [`HostSessionClient`]: routes calls through a session supplied by the host
//! - [`ClientFactory`]: picks the host session when one is supplied, else the standalone backend
//! - [`Inferencer`]: natural-language rule → [`RuleIntent`], cached per `say` text
//! - [`MockInferenceClient`]: scripted responses for tests

#![deny(unsafe_code)]

pub mod client;
pub mod errors;
pub mod factory;
pub mod inferencer;
pub mod intent;
pub mod json;
pub mod mock;
pub mod openai;
pub mod session;

pub use client::{InferenceClient, InferenceRequest};
pub use errors::InferenceError;
pub use factory::ClientFactory;
pub use inferencer::{InferenceOutcome, Inferencer};
pub use intent::{RuleIntent, parse_intent};
pub use mock::MockInferenceClient;
pub use openai::{OpenAiClient, OpenAiConfig};
pub use session::{HostSession, HostSessionClient};
