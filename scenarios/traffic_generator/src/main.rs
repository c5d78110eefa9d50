use std::time::{Duration, Instant};

use petsite_canary::prelude::*;
use rand::Rng;

/// How long one invocation keeps generating traffic when no limit is configured.
const DEFAULT_MAX_RUN_TIME: Duration = Duration::from_secs(14 * 60);

/// Fewest adoptions per cycle once there are enough pets to choose from.
const MIN_LOAD: usize = 5;

/// Above this many adoptions in a cycle the adoption history is deleted first.
const HIGH_LOAD: usize = 20;

fn traffic_generator(ctx: &mut ScenarioContext<()>) -> HookResult {
    let site = pet_site(ctx)?;
    let api = search_api(ctx)?;

    let max_run_time = ctx.config().max_run_time.unwrap_or(DEFAULT_MAX_RUN_TIME);
    let cycle_delay = ctx.config().traffic_cycle_delay();
    log::info!(
        "Generating traffic for up to {}s, {}s between cycles",
        max_run_time.as_secs(),
        cycle_delay.as_secs()
    );

    let _progress = ctx.runner_context().start_progress(max_run_time);
    let started = Instant::now();
    let mut cycle = 0;

    while started.elapsed() < max_run_time {
        if ctx.shutdown_listener().should_shutdown() {
            break;
        }

        cycle += 1;
        log::info!("Starting traffic generation cycle {cycle}");
        if let Err(e) = traffic_cycle(ctx, &site, &api, cycle) {
            log::error!("Cycle {cycle}: Failed with error: {e:#}");
            ctx.tag(format!("cycle-{cycle}-status"), "failed");
            ctx.tag("cycles-completed", cycle);
            ctx.tag("failed-at-cycle", cycle);
            return Err(e);
        }

        if started.elapsed() + cycle_delay >= max_run_time {
            log::info!("Approaching the run time limit, stopping");
            break;
        }
        log::info!("Waiting {}s before next cycle", cycle_delay.as_secs());
        match ctx.sleep(cycle_delay) {
            Ok(()) => {}
            Err(e) if e.is::<ShutdownSignalError>() => break,
            Err(e) => return Err(e),
        }
    }

    log::info!("Traffic generator completed {cycle} cycles");
    ctx.tag("cycles-completed", cycle);
    ctx.tag("execution-type", "continuous");

    Ok(())
}

fn traffic_cycle(
    ctx: &mut ScenarioContext<()>,
    site: &PetSite,
    api: &SearchApi,
    cycle: usize,
) -> CanaryResult<()> {
    ctx.required_step(&format!("housekeeping-{cycle}"), &site.housekeeping())?;

    let pets = load_pets(ctx, api, &format!("loadPetData-{cycle}"))?;
    if pets.is_empty() {
        log::warn!("Cycle {cycle}: No pets available, skipping adoptions");
        ctx.tag(format!("cycle-{cycle}-status"), "skipped");
        return Ok(());
    }

    let load = load_size(pets.len(), &mut rand::thread_rng());
    log::info!("Cycle {cycle}: Processing {load} pet adoptions");

    if load > HIGH_LOAD {
        log::info!("Cycle {cycle}: High load, deleting adoption history");
        ctx.required_step(
            &format!("deleteHistory-{cycle}"),
            &site.delete_adoption_history(),
        )?;
    } else {
        ctx.required_step(&format!("petHistory-{cycle}"), &site.pet_history())?;
    }

    for i in 0..load {
        if let Some(pet) = pick_pet(&pets) {
            log::debug!(
                "Cycle {cycle}: Adoption {}/{load} - {} {} ({})",
                i + 1,
                pet.pettype,
                pet.petcolor,
                pet.petid
            );
            adopt_pet(ctx, site, pet, &format!("-{cycle}-{i}"))?;
        }
    }

    ctx.required_step(&format!("listAdoptions-{cycle}"), &site.list_adoptions())?;

    ctx.tag(format!("cycle-{cycle}-pets-processed"), load);
    ctx.tag(format!("cycle-{cycle}-status"), "success");

    Ok(())
}

/// Between [MIN_LOAD] and the number of pets, or every pet when there are too few to choose.
fn load_size(pet_count: usize, rng: &mut impl Rng) -> usize {
    if pet_count > MIN_LOAD {
        rng.gen_range(MIN_LOAD..pet_count)
    } else {
        pet_count
    }
}

fn configure(builder: ScenarioDefinitionBuilder<()>) -> ScenarioDefinitionBuilder<()> {
    builder
        .with_default_schedule("rate(15 minutes)")
        .use_scenario(traffic_generator)
}

fn main() -> CanaryResult<()> {
    let builder = configure(ScenarioDefinitionBuilder::new_with_init(env!(
        "CARGO_PKG_NAME"
    )));

    run(builder)?.ensure_success()
}
