// Core functionality for the AI doctor assistant:
// - Gemini API client and prompt construction
// - In-memory conversation store and chat session bookkeeping
// - Nearby hospital lookup via Overpass
// - Configuration loading
// - Shared error types

// Export client module - API client for Gemini
pub mod client;
pub use client::*;

// Export types module - Gemini request/response data structures
pub mod types;

// Export config module - Configuration loading
pub mod config;
pub use config::*;

// Export errors module - Shared error types
pub mod errors;
pub use errors::*;

pub mod conversation;
pub use conversation::{ContextPolicy, Conversation, ConversationTurn, Speaker};

pub mod hospitals;
pub use hospitals::{HospitalFinder, HospitalRecord, OverpassClient, SearchQuery};

pub mod prompt;

pub mod session;
pub use session::{ChatSession, SendError};
