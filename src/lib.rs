//! # Agentic RAG
//!
//! A retrieval-augmented chat service built from cooperating agents.
//!
//! Uploaded documents are parsed, chunked, embedded, and stored in SQLite;
//! chat queries are classified, answered from the nearest chunks by a
//! language model, and returned with the names of the files they came from.
//! The orchestration itself (messages, agents, router, workflows) lives in
//! [`agentic_rag_core`]; this crate supplies the collaborators and the
//! outer surfaces.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌───────────────────┐   ┌──────────────┐
//! │  HTTP / CLI  │──▶│  Session (core)   │──▶│   SQLite     │
//! │ upload, chat │   │ router + workflows│   │ FTS5 + Vec   │
//! └──────────────┘   └─────────┬─────────┘   └──────────────┘
//!                              │
//!                 ┌────────────┴────────────┐
//!                 ▼                         ▼
//!          ┌─────────────┐          ┌──────────────┐
//!          │ FileParser  │          │ LLM client   │
//!          │ pdf/docx/.. │          │ openai/ollama│
//!          └─────────────┘          └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! arag serve                         # wipe session data, start HTTP server
//! arag ingest docs/policy.pdf        # ingest into the persistent store
//! arag ask "what is the refund policy?"
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`logging`] | Tracing subscriber setup |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`http`] | JSON POST with retry and backoff |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`llm`] | Language model clients |
//! | [`extract`] | Text extraction for PDF, Office, CSV, and plain text |
//! | [`sqlite_store`] | SQLite-backed vector store |
//! | [`reset`] | Startup wipe of uploads and database |
//! | [`server`] | HTTP API |

pub mod config;
pub mod db;
pub mod embedding;
pub mod extract;
pub mod http;
pub mod llm;
pub mod logging;
pub mod migrate;
pub mod reset;
pub mod server;
pub mod sqlite_store;
