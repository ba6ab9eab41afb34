//! Warden - Layered bit-flag permission resolution.
//!
//! Warden answers "may this user do this here?" for moderation platforms
//! that manage many resources (servers, communities) with shared groups:
//!
//! - **Permissions**: Arbitrary-width bit vector with a base-10 text form
//! - **Registry**: Named flag catalog with app/resource scoping
//! - **Resolver**: Base group → user groups → resource overrides → user overrides
//! - **Checker**: Composable predicates over a resolved permission set
//! - **Fan-out**: Every resource a user may access, resolved concurrently
//! - **Store**: libsql/Turso persistence for groups, memberships and overrides
//! - **Config**: Layered configuration (file → env → CLI)
//!
//! # Example
//!
//! ```ignore
//! use warden::{AuthScope, ConfigLoader, Registry, Resolver, Store, checker};
//!
//! #[tokio::main]
//! async fn main() -> warden::Result<()> {
//!     let config = ConfigLoader::new("WARDEN").load(None, None, None, None)?;
//!     warden::telemetry::init(&config.log)?;
//!
//!     let registry = Registry::standard()?;
//!     let store = Store::open(&config.database.url).await?;
//!     store.provision_base_group(&registry).await?;
//!
//!     let resolver = Resolver::new(&registry, &store)
//!         .with_concurrency(config.resolver.fanout_concurrency);
//!
//!     let allowed = resolver
//!         .has_permission(AuthScope::Resource(3), 42, &checker::can_view_records())
//!         .await?;
//!     println!("user 42 may view records on resource 3: {allowed}");
//!
//!     let servers = resolver
//!         .authorized_resources(&store, 42, &checker::can_view_server())
//!         .await?;
//!     println!("user 42 sees servers {servers:?}");
//!     Ok(())
//! }
//! ```

pub mod checker;
pub mod config;
pub mod db;
pub mod error;
mod fanout;
pub mod lookup;
pub mod memory;
pub mod model;
pub mod permissions;
pub mod registry;
pub mod resolver;
pub mod store;
pub mod telemetry;

// Re-export main types at crate root
pub use checker::Checker;
pub use config::{Config, ConfigLoader};
pub use error::{Error, ErrorKind, Result};
pub use lookup::{GroupLookup, ResourceLookup};
pub use memory::MemoryStore;
pub use model::{AuthScope, Group, Overrides, Resource};
pub use permissions::Permissions;
pub use registry::Registry;
pub use resolver::Resolver;
pub use store::Store;
