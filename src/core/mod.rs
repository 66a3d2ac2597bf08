// Domain-layer modules and shared errors/models
pub mod wizard {
    pub use crate::wizard::*;
}

pub mod submission {
    pub use crate::submission::*;
}

pub mod progress {
    pub use crate::progress::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod errors {
    pub use crate::errors::*;
}
