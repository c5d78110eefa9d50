use petsite_canary::prelude::*;

/// Endpoint name as reported, step name, and whether the scenario fails without it.
type Probe = (&'static str, &'static str, HttpRequest, bool);

fn api_health(ctx: &mut ScenarioContext<()>) -> HookResult {
    let site = pet_site(ctx)?;
    let api = search_api(ctx)?;

    let probes: [Probe; 5] = [
        ("Pet Site Root", "petSiteRoot", site.home(), true),
        ("Search API", "searchAPI", api.probe(), true),
        ("Pet History", "petHistory", site.pet_history(), false),
        ("Housekeeping", "housekeeping", site.housekeeping(), false),
        ("Pet List Adoptions", "petListAdoptions", site.list_adoptions(), false),
    ];

    for (endpoint, step, request, required) in probes {
        let outcome = ctx.step(step, &request.expect(Expect::Success))?;
        let healthy = outcome.success();
        log::info!(
            "{endpoint}: {} (Status: {})",
            if healthy { "HEALTHY" } else { "UNHEALTHY" },
            outcome.status().map(|s| s.to_string()).unwrap_or_else(|| "none".to_string())
        );

        let tag = endpoint.to_lowercase().replace(' ', "-");
        ctx.tag(
            format!("{tag}-status"),
            outcome.status().map(|s| s.to_string()).unwrap_or_else(|| "none".to_string()),
        );
        ctx.tag(format!("{tag}-healthy"), healthy);
        ctx.record_check(HealthCheck {
            name: endpoint.to_string(),
            healthy,
            required,
            status_code: outcome.status(),
        });
    }

    let checks = &ctx.report().checks;
    let (healthy, total) = (checks.healthy_count(), checks.total_count());
    log::info!("Health Check Summary: {healthy}/{total} endpoints healthy");
    ctx.tag("healthy-endpoints", healthy);
    ctx.tag("total-endpoints", total);

    Ok(())
}

fn configure(builder: ScenarioDefinitionBuilder<()>) -> ScenarioDefinitionBuilder<()> {
    builder
        .with_policy(ScenarioPolicy::default().health_threshold(ENDPOINT_HEALTH_THRESHOLD))
        .with_default_schedule("rate(2 minutes)")
        .use_scenario(api_health)
}

fn main() -> CanaryResult<()> {
    let builder = configure(ScenarioDefinitionBuilder::new_with_init(env!(
        "CARGO_PKG_NAME"
    )));

    run(builder)?.ensure_success()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::runtime::Runtime;
    use wiremock::matchers::path;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn petsite(statuses: &[(&str, u16)]) -> (Runtime, MockServer) {
        let rt = Runtime::new().unwrap();
        let server = rt.block_on(async {
            let server = MockServer::start().await;
            for (endpoint, status) in statuses {
                Mock::given(path(*endpoint))
                    .respond_with(ResponseTemplate::new(*status))
                    .mount(&server)
                    .await;
            }
            server
        });
        (rt, server)
    }

    fn invoke(server: &MockServer) -> (u16, ScenarioReport) {
        let cli = CanaryScenarioCli {
            site_url: Some(server.uri()),
            search_api_url: Some(format!("{}/api/search", server.uri())),
            reporter: ReporterOpt::Noop,
            no_progress: true,
            ..Default::default()
        };
        let outcome = run(configure(ScenarioDefinitionBuilder::new("api_health", cli))).unwrap();
        let last = outcome.last.unwrap();
        (last.status_code, last.report().unwrap())
    }

    #[test]
    fn all_endpoints_healthy() {
        let (_rt, server) = petsite(&[
            ("/", 302),
            ("/api/search", 200),
            ("/pethistory", 200),
            ("/housekeeping/", 200),
            ("/PetListAdoptions", 200),
        ]);

        let (status, report) = invoke(&server);

        assert_eq!(200, status);
        assert!(report.success);
        assert_eq!(Vec::<String>::new(), report.errors);
        assert_eq!(Some(&"100.0".to_string()), report.tags.get("health-percentage"));
        assert_eq!(Some(&"5".to_string()), report.tags.get("healthy-endpoints"));
        assert_eq!(Some(&"302".to_string()), report.tags.get("pet-site-root-status"));
        assert_eq!(Some(&"true".to_string()), report.tags.get("pet-list-adoptions-healthy"));
    }

    #[test]
    fn three_of_five_is_unhealthy() {
        let (_rt, server) = petsite(&[
            ("/", 200),
            ("/api/search", 200),
            ("/pethistory", 503),
            ("/housekeeping/", 500),
            ("/PetListAdoptions", 200),
        ]);

        let (status, report) = invoke(&server);

        assert_eq!(200, status);
        assert!(!report.success);
        assert_eq!(Some(&"60.0".to_string()), report.tags.get("health-percentage"));
        assert!(report
            .errors
            .contains(&"Health percentage 60.0% is below 80% threshold".to_string()));
    }

    #[test]
    fn required_endpoint_down_fails_above_threshold() {
        let (_rt, server) = petsite(&[
            ("/", 200),
            ("/api/search", 503),
            ("/pethistory", 200),
            ("/housekeeping/", 200),
            ("/PetListAdoptions", 200),
        ]);

        let (_, report) = invoke(&server);

        assert_eq!(Some(&"80.0".to_string()), report.tags.get("health-percentage"));
        assert!(!report.success);
        assert_eq!(
            vec!["searchAPI failed with status 503".to_string()],
            report.errors
        );
    }
}
