// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod controller;
mod mirror;
mod model;
mod policy;
mod selection;
mod session;
mod store;
pub mod validation;

pub use controller::*;
pub use mirror::*;
pub use model::*;
pub use policy::*;
pub use selection::*;
pub use session::*;
pub use store::*;
