//! # pagesync: Keep a rendered page in step with a live editor
//!
//! Fetches a page model, builds its component tree and, for preview pages,
//! follows the editor's changes over a cross-window RPC channel.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐  GET page model   ┌────────────┐
//! │ Spa        │ ────────────────► │ Api        │ ──► HttpClient
//! │ (states)   │                   └────────────┘
//! └─────┬──────┘                         ▲ POST self link
//!       │ preview                        │
//!       ▼                                │
//! ┌────────────┐  "update" events  ┌─────┴──────────┐  merge   ┌────────────┐
//! │ CmsBridge  │ ────────────────► │ UpdatePropagator│ ───────► │ Page       │
//! │ (RPC)      │ ◄── "ready"/"sync"└────────────────┘          └────────────┘
//! └────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`config`]: proxy and token configuration shapes
//! - [`http`]: fetch contract with the host's HTTP client
//! - [`api`]: page model and component fragment requests
//! - [`cms`]: handshake, update subscription and overlay sync
//! - [`propagator`]: edit event to fragment merge
//! - [`spa`]: the page synchronizer state machine

pub mod api;
pub mod cms;
pub mod config;
pub mod error;
pub mod http;
pub mod propagator;
pub mod spa;

// Re-exports for convenience
pub use api::Api;
pub use cms::{CmsBridge, ReadyState, COMMAND_SYNC, EVENT_READY, EVENT_UPDATE};
pub use config::{Configuration, ProxyConfiguration, TokenConfiguration, UrlMapping};
pub use error::{ConfigError, HttpError, SpaError};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use propagator::{propagate, UpdateEvent, UpdateOutcome, UpdatePropagator};
pub use spa::{EditorLink, Spa, SpaState};

pub use pagesync_core as core;
pub use pagesync_rpc as rpc;
