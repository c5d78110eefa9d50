use std::time::Duration;

use petsite_canary::prelude::*;

const PET_TYPES: [&str; 5] = ["dog", "cat", "bird", "fish", "hamster"];
const PET_COLORS: [&str; 5] = ["brown", "black", "white", "orange", "gray"];

/// Requests per concurrent batch.
const BATCH_SIZE: usize = 5;

/// Rounds of the rapid sequential pattern.
const RAPID_ROUNDS: usize = 3;

fn load_test(ctx: &mut ScenarioContext<()>) -> HookResult {
    let site = pet_site(ctx)?;

    let searches = (0..BATCH_SIZE)
        .map(|i| {
            let pettype = PET_TYPES[i % PET_TYPES.len()];
            let petcolor = PET_COLORS[i % PET_COLORS.len()];
            (format!("search-{i}"), site.search(pettype, petcolor))
        })
        .collect();
    run_batch(ctx, "concurrentSearches", "concurrent search", searches)?;

    let listings = (0..BATCH_SIZE)
        .map(|i| (format!("listing-{i}"), site.list_adoptions()))
        .collect();
    run_batch(ctx, "concurrentListings", "concurrent listing", listings)?;

    let history = (0..BATCH_SIZE)
        .map(|i| (format!("history-{i}"), site.pet_history()))
        .collect();
    run_batch(ctx, "concurrentHistory", "concurrent history", history)?;

    let rapid = (0..RAPID_ROUNDS)
        .flat_map(|round| {
            [
                (format!("home-{round}"), site.home()),
                (format!("search-{round}"), site.search("dog", "brown")),
                (format!("listing-{round}"), site.list_adoptions()),
            ]
        })
        .collect();
    run_batch(ctx, "rapidSequential", "rapid sequential", rapid)?;

    let mixed = vec![
        ("search-cat".to_string(), site.search("cat", "black")),
        ("listing".to_string(), site.list_adoptions()),
        ("history".to_string(), site.pet_history()),
        ("search-bird".to_string(), site.search("bird", "orange")),
        ("home".to_string(), site.home()),
    ];
    run_batch(ctx, "mixedWorkload", "mixed workload", mixed)?;

    let (ok, total) = ctx.report().request_counts();
    log::info!("{ok}/{total} requests succeeded");
    ctx.tag("total-requests", total);
    ctx.tag("successful-requests", ok);

    Ok(())
}

/// Run one batch. Failed requests are noted but only the overall success rate decides the verdict.
fn run_batch(
    ctx: &mut ScenarioContext<()>,
    name: &str,
    description: &str,
    requests: Vec<(String, HttpRequest)>,
) -> CanaryResult<()> {
    let requests = requests
        .into_iter()
        .map(|(id, request)| (id, request.expect(Expect::Success)))
        .collect();
    let batch = ctx.batch(name, requests, None)?;

    log::debug!(
        "{name}: {}/{} succeeded in {}ms",
        batch.success_count,
        batch.total_requests(),
        batch.total_latency_ms
    );
    if batch.failure_count > 0 {
        ctx.error(format!("{} {description} requests failed", batch.failure_count));
    }

    Ok(())
}

fn configure(builder: ScenarioDefinitionBuilder<()>) -> ScenarioDefinitionBuilder<()> {
    builder
        .with_policy(
            ScenarioPolicy::default()
                .total_latency(Duration::from_secs(10))
                .success_rate_floor(LOAD_SUCCESS_THRESHOLD),
        )
        .with_default_schedule("rate(5 minutes)")
        .use_scenario(load_test)
}

fn main() -> CanaryResult<()> {
    let builder = configure(ScenarioDefinitionBuilder::new_with_init(env!(
        "CARGO_PKG_NAME"
    )));

    run(builder)?.ensure_success()
}
