// Thin namespace wrapper for API-layer components
pub mod handlers {
    pub use crate::handlers::*;
}

pub mod admin {
    pub use crate::admin::*;
}

pub mod routes {
    pub use crate::routes::*;
}
