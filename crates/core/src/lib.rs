pub mod audit;
pub mod catalog;
pub mod config;
pub mod conversation;
pub mod errors;
pub mod proposal;

pub use audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink};
pub use catalog::{Catalog, CatalogEntry, CatalogError, CatalogRegistry, QuestionDefinition, ResolvedCatalog};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use conversation::{
    ConversationEngine, ConversationState, EngineReply, GreetingMatcher, Role, Turn, TurnOutcome,
};
pub use errors::{ApplicationError, InterfaceError};
pub use proposal::{synthesize, Proposal};
