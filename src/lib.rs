#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod controller;
pub mod dump;
pub mod gateway;
pub mod handles;
pub mod layout;
pub mod model;
pub mod snapshot;
pub mod state;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, LayoutConfig, LayoutPolicy, load_config};
pub use controller::{DiagramSession, SaveStatus};
#[cfg(feature = "http")]
pub use gateway::HttpStore;
pub use gateway::{DiagramStore, MemoryStore, StoreError, parse_source};
pub use handles::assign_handles;
pub use layout::{assign_positions, needs_auto_layout};
pub use model::{DiagramKind, Direction, Position, RelationshipKind, SourceData};
pub use snapshot::{DiagramDoc, FilterData, HandleBinding};
pub use state::{LayoutState, RenderGraph};
