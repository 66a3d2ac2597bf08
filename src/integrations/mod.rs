//! External service integrations.

pub mod storage {
    pub use crate::storage::*;
}

pub mod auth {
    pub use crate::auth::*;
}

pub mod notifier {
    pub use crate::notifier::*;
}

pub mod extraction {
    pub use crate::extraction::*;
}
