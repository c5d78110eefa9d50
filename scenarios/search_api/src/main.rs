use petsite_canary::prelude::*;

/// How many pet types get their own count tag.
const TAGGED_TYPES: usize = 3;

fn search_api_check(ctx: &mut ScenarioContext<()>) -> HookResult {
    let api = search_api(ctx)?;
    if ctx.config().profile == CheckProfile::Pages {
        return check_endpoints(ctx, &api);
    }
    ctx.tag("test-type", "pet-search");

    let outcome = ctx.required_step("loadPets", &api.all_pets())?;
    let listing: serde_json::Value = ctx.parse_json(&outcome)?;

    if let Err(problem) = validate_pet_listing(&listing) {
        ctx.assert_check("petListing", false, problem);
        return Ok(());
    }
    ctx.assert_check("petListing", true, "");

    let pets: Vec<Pet> = ctx.parse_json(&outcome)?;
    log::info!("Search API returned {} pets", pets.len());
    ctx.tag("pets-count", pets.len());

    for (pettype, count) in type_counts(&pets, TAGGED_TYPES) {
        ctx.tag(format!("{pettype}-count"), count);
    }

    Ok(())
}

/// Check the API answers with JSON and accepts a free text query, without validating the pets.
fn check_endpoints(ctx: &mut ScenarioContext<()>, api: &SearchApi) -> HookResult {
    ctx.tag("test-type", "search-endpoints");

    let outcome = ctx.required_step("loadPets", &api.all_pets())?;
    match outcome.json::<serde_json::Value>() {
        Ok(body) if body.is_object() || body.is_array() => {
            log::info!("Search API returned a JSON document")
        }
        Ok(_) => log::warn!("Search API returned an unexpected JSON value"),
        Err(_) => log::warn!("Search API response is not JSON but the endpoint is responding"),
    }

    ctx.step("queryParameter", &api.query("test"))?;

    Ok(())
}

fn configure(builder: ScenarioDefinitionBuilder<()>) -> ScenarioDefinitionBuilder<()> {
    builder
        .with_default_schedule("rate(5 minutes)")
        .use_scenario(search_api_check)
}

fn main() -> CanaryResult<()> {
    let builder = configure(ScenarioDefinitionBuilder::new_with_init(env!(
        "CARGO_PKG_NAME"
    )));

    run(builder)?.ensure_success()
}
