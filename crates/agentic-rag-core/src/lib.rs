//! # Agentic RAG Core
//!
//! Shared, WASM-safe orchestration logic for Agentic RAG: the message
//! envelope, the three pipeline agents, the coordinator router, and the
//! per-workflow state machines that drive them.
//!
//! This crate contains no tokio, sqlx, filesystem I/O, or network
//! dependencies. Everything that touches the outside world (document
//! parsing, the vector store, the language model) sits behind a trait in
//! [`parser`], [`store`], and [`llm`], and is supplied by the application.
//!
//! ## Message Flow
//!
//! ```text
//!  ingest:  Coordinator ─▶ IngestionAgent ─▶ RetrievalAgent ─▶ Coordinator
//!
//!  chat:    Coordinator ─▶ RetrievalAgent ─┬──────────────────▶ Coordinator   (greeting)
//!                                          └─▶ LLMResponseAgent ─▶ Coordinator
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`message`] | Message envelope, agent identifiers, typed payloads |
//! | [`models`] | Chunk records, chat turns, intents |
//! | [`chunk`] | Recursive character text splitter |
//! | [`parser`] | `DocumentParser` trait |
//! | [`store`] | `VectorStore` trait and in-memory implementation |
//! | [`llm`] | `LanguageModel` trait |
//! | [`agents`] | `Agent` trait and the ingestion, retrieval, and response agents |
//! | [`router`] | Name-keyed dispatch table |
//! | [`workflow`] | Ingestion and chat state machines |
//! | [`session`] | Router + conversation log, workflow entry points |

pub mod agents;
pub mod chunk;
pub mod llm;
pub mod message;
pub mod models;
pub mod parser;
pub mod router;
pub mod session;
pub mod store;
pub mod workflow;

pub use message::{AgentId, Message, MessageType, Payload};
pub use router::Router;
pub use session::{ChatOutcome, IngestOutcome, Session};
pub use workflow::WorkflowError;
