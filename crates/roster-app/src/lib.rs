// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod fetch;
pub mod filter;
pub mod ids;
pub mod model;
pub mod paging;
pub mod persist;
pub mod query;
pub mod session;
pub mod sort;
pub mod state;
pub mod store;

pub use fetch::*;
pub use filter::*;
pub use ids::*;
pub use model::*;
pub use paging::*;
pub use persist::*;
pub use query::*;
pub use session::*;
pub use state::*;
pub use store::*;
