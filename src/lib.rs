pub mod config;
pub mod model;
pub mod search;
pub mod store;

pub use config::{DatabaseConfig, SearchConfig, SearchConfigBuilder};
pub use model::{
    CollectionSpec, FieldKind, FieldSpec, OrderCounter, SchemaBuilder, SchemaDescriptor,
    SchemaProvider,
};
pub use search::{IndexEngine, QueryCoordinator, QueryHandle, SearchError, SearchResult};
pub use store::{ChangeEvent, ChangeTracker, EntityRef, MemoryStore, PostgresStore, SourceStore};
