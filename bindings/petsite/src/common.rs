use canary_runner::prelude::{CanaryResult, ScenarioContext, UserValuesConstraint};
use rand::seq::SliceRandom;

use crate::endpoints::{PetSite, SearchApi};
use crate::pet::Pet;

/// Build the PetSite bindings from the runner configuration.
///
/// ```rust,no_run
/// use petsite_canary::prelude::*;
///
/// fn scenario(ctx: &mut ScenarioContext<()>) -> HookResult {
///     let site = pet_site(ctx)?;
///     ctx.required_step("home", &site.home())?;
///     Ok(())
/// }
/// ```
pub fn pet_site<V: UserValuesConstraint>(ctx: &ScenarioContext<V>) -> CanaryResult<PetSite> {
    PetSite::from_config(ctx.config())
}

pub fn search_api<V: UserValuesConstraint>(ctx: &ScenarioContext<V>) -> CanaryResult<SearchApi> {
    SearchApi::from_config(ctx.config())
}

/// Load every pet from the search API as a required step.
///
/// A failed request or a body that is not a list of pets fails the scenario.
pub fn load_pets<V: UserValuesConstraint>(
    ctx: &mut ScenarioContext<V>,
    api: &SearchApi,
    step_name: &str,
) -> CanaryResult<Vec<Pet>> {
    let outcome = ctx.required_step(step_name, &api.all_pets())?;
    let pets: Vec<Pet> = ctx.parse_json(&outcome)?;
    log::info!("Loaded {} pets", pets.len());

    Ok(pets)
}

/// Search for a pet, adopt it and pay for it. Each step is required.
///
/// `suffix` is appended to the step names so that repeated adoptions in one invocation are
/// reported separately.
pub fn adopt_pet<V: UserValuesConstraint>(
    ctx: &mut ScenarioContext<V>,
    site: &PetSite,
    pet: &Pet,
    suffix: &str,
) -> CanaryResult<()> {
    log::debug!(
        "Adopting {} {} ({})",
        pet.pettype,
        pet.petcolor,
        pet.petid
    );
    ctx.required_step(&format!("searchPet{suffix}"), &site.search_for(pet))?;
    ctx.required_step(&format!("adoptPet{suffix}"), &site.take_me_home(pet))?;
    ctx.required_step(&format!("makePayment{suffix}"), &site.make_payment(pet))?;

    Ok(())
}

pub fn pick_pet(pets: &[Pet]) -> Option<&Pet> {
    pets.choose(&mut rand::thread_rng())
}

/// Whether a page mentions any of `needles`.
pub fn body_mentions(body: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| body.contains(needle))
}
