mod common;
mod endpoints;
mod pet;

pub mod prelude {
    /// Common operations for PetSite scenarios.
    ///
    /// This is a good place to start if you are getting started writing scenarios.
    pub use crate::common::*;

    pub use crate::endpoints::{PetSite, SearchApi};
    pub use crate::pet::{type_counts, validate_pet_listing, Pet, REQUIRED_PET_FIELDS};

    /// Re-export of the `canary_runner` prelude.
    ///
    /// This is for convenience so that you can depend on a single crate for the runner in your scenarios.
    pub use canary_runner::prelude::*;
}
