use std::time::Duration;

use petsite_canary::prelude::*;

fn housekeeping(ctx: &mut ScenarioContext<()>) -> HookResult {
    let site = pet_site(ctx)?;

    // Every page is checked even when an earlier one fails
    let checks = [
        ("history", site.pet_history()),
        ("housekeeping", site.housekeeping()),
        ("verification", site.pet_history()),
        ("listings", site.list_adoptions()),
        ("home", site.home()),
    ];
    for (name, request) in checks {
        let outcome = ctx.step(name, &request)?;
        ctx.record_check(HealthCheck {
            name: name.to_string(),
            healthy: outcome.success(),
            required: true,
            status_code: outcome.status(),
        });
    }

    let checks = &ctx.report().checks;
    let passed = format!("{}/{}", checks.healthy_count(), checks.total_count());
    log::info!("Housekeeping checks passed: {passed}");
    ctx.tag("tests-passed", passed);

    Ok(())
}

fn configure(builder: ScenarioDefinitionBuilder<()>) -> ScenarioDefinitionBuilder<()> {
    builder
        .with_policy(ScenarioPolicy::default().per_step_latency(Duration::from_millis(3000)))
        .with_default_schedule("rate(5 minutes)")
        .use_scenario(housekeeping)
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
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn invoke(server: &MockServer) -> (u16, ScenarioReport) {
        let cli = CanaryScenarioCli {
            site_url: Some(server.uri()),
            reporter: ReporterOpt::Noop,
            no_progress: true,
            ..Default::default()
        };
        let outcome = run(configure(ScenarioDefinitionBuilder::new("housekeeping", cli))).unwrap();
        let last = outcome.last.unwrap();
        (last.status_code, last.report().unwrap())
    }

    #[test]
    fn clean_run() {
        let rt = Runtime::new().unwrap();
        let server = rt.block_on(async {
            let server = MockServer::start().await;
            Mock::given(path("/pethistory"))
                .respond_with(ResponseTemplate::new(200))
                .expect(2)
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(200))
                .expect(3)
                .mount(&server)
                .await;
            server
        });

        let (status, report) = invoke(&server);

        assert_eq!(200, status);
        assert!(report.success);
        assert_eq!(Some(&"5/5".to_string()), report.tags.get("tests-passed"));
        rt.block_on(server.verify());
    }

    #[test]
    fn failed_housekeeping_still_checks_the_rest() {
        let rt = Runtime::new().unwrap();
        let server = rt.block_on(async {
            let server = MockServer::start().await;
            Mock::given(path("/housekeeping/"))
                .respond_with(ResponseTemplate::new(500))
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(200))
                .mount(&server)
                .await;
            server
        });

        let (status, report) = invoke(&server);

        assert_eq!(200, status);
        assert!(!report.success);
        assert_eq!(
            vec!["housekeeping failed with status 500".to_string()],
            report.errors
        );
        assert_eq!(Some(&"4/5".to_string()), report.tags.get("tests-passed"));
        assert!(report.step_results["home"].success);
    }
}
