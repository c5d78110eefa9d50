use std::time::Duration;

use petsite_canary::prelude::*;

fn data_integrity(ctx: &mut ScenarioContext<()>) -> HookResult {
    let site = pet_site(ctx)?;
    let pet = Pet::new(
        "test-pet",
        "test-color",
        format!("data-integrity-test-{}", chrono::Utc::now().timestamp_millis()),
    );
    ctx.tag("test-pet-id", &pet.petid);

    ctx.required_step("initialHistory", &site.pet_history())?;
    ctx.required_step("initialListings", &site.list_adoptions())?;

    adopt_pet(ctx, &site, &pet, "")?;

    let settle_delay = ctx.config().settle_delay;
    log::debug!("Waiting {settle_delay:?} for the adoption to propagate");
    ctx.sleep(settle_delay)?;

    // Only the generated id is unique to this run, older test pets share the type
    let needles = [pet.petid.as_str()];

    if let Some(listings) = verify(ctx, "verifyListings", &site.list_adoptions())? {
        ctx.assert_check(
            "petInListings",
            body_mentions(&listings, &needles),
            "Test pet not found in adoption listings after creation",
        );
    }
    if let Some(history) = verify(ctx, "verifyHistory", &site.pet_history())? {
        ctx.assert_check(
            "petInHistory",
            body_mentions(&history, &needles),
            "Test pet not found in history after creation",
        );
    }

    verify(ctx, "cleanup", &site.housekeeping())?;

    if let Some(listings) = verify(ctx, "finalCheck", &site.list_adoptions())? {
        ctx.assert_check(
            "petCleanedUp",
            !body_mentions(&listings, &needles),
            "Test pet still found in listings after cleanup",
        );
    }

    Ok(())
}

/// Fetch a page the scenario depends on, returning its body for content checks. The scenario
/// keeps going when it cannot be fetched but can no longer pass.
fn verify(
    ctx: &mut ScenarioContext<()>,
    name: &str,
    request: &HttpRequest,
) -> CanaryResult<Option<String>> {
    let outcome = ctx.step(name, request)?;
    ctx.record_check(HealthCheck {
        name: name.to_string(),
        healthy: outcome.success(),
        required: true,
        status_code: outcome.status(),
    });

    Ok(outcome
        .success()
        .then(|| outcome.body().unwrap_or_default().to_string()))
}

fn configure(builder: ScenarioDefinitionBuilder<()>) -> ScenarioDefinitionBuilder<()> {
    builder
        .with_policy(ScenarioPolicy::default().per_step_latency(Duration::from_millis(8000)))
        .with_default_schedule("rate(5 minutes)")
        .use_scenario(data_integrity)
}

fn main() -> CanaryResult<()> {
    let builder = configure(ScenarioDefinitionBuilder::new_with_init(env!(
        "CARGO_PKG_NAME"
    )));

    run(builder)?.ensure_success()
}
