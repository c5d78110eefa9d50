use std::time::Duration;

use petsite_canary::prelude::*;

/// Type and color combinations searched after the basic search.
const SEARCH_COMBINATIONS: [(&str, &str); 3] = [("cat", "black"), ("bird", "orange"), ("fish", "gray")];

fn pet_search(ctx: &mut ScenarioContext<()>) -> HookResult {
    let site = pet_site(ctx)?;

    ctx.step("basicSearch", &site.search("dog", "brown"))?;

    for (pettype, petcolor) in SEARCH_COMBINATIONS {
        ctx.step(
            &format!("search_{pettype}_{petcolor}"),
            &site.search(pettype, petcolor),
        )?;
    }

    ctx.step("noParams", &site.home())?;

    let (ok, total) = ctx.report().request_counts();
    log::info!("{ok}/{total} searches succeeded");
    ctx.tag("searches-performed", total);

    Ok(())
}

fn configure(builder: ScenarioDefinitionBuilder<()>) -> ScenarioDefinitionBuilder<()> {
    builder
        .with_policy(
            ScenarioPolicy::default()
                .per_step_latency(Duration::from_millis(2000))
                .success_rate_floor(100.0),
        )
        .with_default_schedule("rate(3 minutes)")
        .use_scenario(pet_search)
}

fn main() -> CanaryResult<()> {
    let builder = configure(ScenarioDefinitionBuilder::new_with_init(env!(
        "CARGO_PKG_NAME"
    )));

    run(builder)?.ensure_success()
}
