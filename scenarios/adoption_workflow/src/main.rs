use std::time::Duration;

use petsite_canary::prelude::*;

/// Statuses a page of the web front end may answer with. Redirects are not followed.
const PAGE_STATUSES: [u16; 2] = [200, 302];

fn adoption_workflow(ctx: &mut ScenarioContext<()>) -> HookResult {
    let site = pet_site(ctx)?;

    if ctx.config().profile == CheckProfile::Pages {
        return visit_pages(ctx, &site);
    }

    let pet = match ctx.config().pet_source {
        PetSource::Fixed => {
            ctx.tag("workflow-type", "fixed-pet");
            Pet::test_pet()
        }
        PetSource::SearchApi => {
            ctx.tag("workflow-type", "search-api");
            let api = search_api(ctx)?;

            // Clear out earlier adoptions so the listing stays small
            ctx.step("housekeeping", &site.housekeeping())?;

            let pets = load_pets(ctx, &api, "loadPetData")?;
            match pick_pet(&pets) {
                Some(pet) => pet.clone(),
                None => {
                    return Err(StepAbortError::new(
                        "loadPetData",
                        "No pets available for adoption workflow test",
                    )
                    .into())
                }
            }
        }
    };

    log::info!(
        "Adopting {} {} with id {}",
        pet.petcolor,
        pet.pettype,
        pet.petid
    );
    ctx.tag("pet-type", &pet.pettype);
    ctx.tag("pet-color", &pet.petcolor);
    ctx.tag("pet-id", &pet.petid);

    ctx.sequence(&[
        Step::required("searchPet", site.search_for(&pet)),
        Step::required("adoptPet", site.take_me_home(&pet)),
        Step::required("makePayment", site.make_payment(&pet)),
        Step::required("listAdoptions", site.list_adoptions()),
        Step::required("petHistory", site.pet_history()),
    ])?;

    Ok(())
}

/// Walk the pages of the adoption flow without adopting anything.
fn visit_pages(ctx: &mut ScenarioContext<()>, site: &PetSite) -> HookResult {
    ctx.tag("workflow-type", "pages");

    let page = |request: HttpRequest| request.expect(Expect::AnyOf(PAGE_STATUSES.to_vec()));
    ctx.sequence(&[
        Step::required("mainPage", page(site.home())),
        Step::required("adoptionPage", page(site.adoption_page())),
        Step::required("paymentPage", page(site.payment_page())),
    ])?;

    Ok(())
}

fn configure(builder: ScenarioDefinitionBuilder<()>) -> ScenarioDefinitionBuilder<()> {
    builder
        .with_policy(ScenarioPolicy::default().per_step_latency(Duration::from_millis(5000)))
        .with_default_schedule("rate(10 minutes)")
        .use_scenario(adoption_workflow)
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
    use wiremock::matchers::{body_string, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn petsite(adopt_status: u16) -> (Runtime, MockServer) {
        let rt = Runtime::new().unwrap();
        let server = rt.block_on(async {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/Adoption/TakeMeHome"))
                .respond_with(ResponseTemplate::new(adopt_status))
                .mount(&server)
                .await;
            Mock::given(path("/api/search"))
                .respond_with(ResponseTemplate::new(200).set_body_string(
                    r#"[{"pettype": "bunny", "petid": "011", "petcolor": "grey", "availability": "yes"}]"#,
                ))
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
                .mount(&server)
                .await;
            Mock::given(method("POST"))
                .and(path("/Payment/MakePayment"))
                .respond_with(ResponseTemplate::new(200))
                .mount(&server)
                .await;
            server
        });
        (rt, server)
    }

    fn invoke(server: &MockServer, pet_source: PetSource) -> (u16, ScenarioReport) {
        invoke_with(server, pet_source, CheckProfile::Full)
    }

    fn invoke_with(
        server: &MockServer,
        pet_source: PetSource,
        profile: CheckProfile,
    ) -> (u16, ScenarioReport) {
        let cli = CanaryScenarioCli {
            site_url: Some(server.uri()),
            search_api_url: Some(format!("{}/api/search", server.uri())),
            pet_source,
            profile,
            reporter: ReporterOpt::Noop,
            no_progress: true,
            ..Default::default()
        };
        let outcome =
            run(configure(ScenarioDefinitionBuilder::new("adoption_workflow", cli))).unwrap();
        let last = outcome.last.unwrap();
        (last.status_code, last.report().unwrap())
    }

    #[test]
    fn fixed_pet_adoption() {
        let (rt, server) = petsite(200);
        rt.block_on(
            Mock::given(method("POST"))
                .and(path("/Payment/MakePayment"))
                .and(body_string("pettype=dog&petid=test-123"))
                .respond_with(ResponseTemplate::new(200))
                .with_priority(1)
                .expect(1)
                .mount(&server),
        );

        let (status, report) = invoke(&server, PetSource::Fixed);

        assert_eq!(200, status);
        assert!(report.success);
        assert_eq!(Vec::<String>::new(), report.errors);
        assert_eq!(
            vec!["adoptPet", "listAdoptions", "makePayment", "petHistory", "searchPet"],
            report.step_results.keys().collect::<Vec<_>>()
        );
        assert_eq!(Some(&"fixed-pet".to_string()), report.tags.get("workflow-type"));
        rt.block_on(server.verify());
    }

    #[test]
    fn adopts_a_pet_from_the_search_api() {
        let (rt, server) = petsite(200);
        rt.block_on(
            Mock::given(method("GET"))
                .and(path("/"))
                .and(query_param("selectedPetType", "bunny"))
                .and(query_param("selectedPetColor", "grey"))
                .respond_with(ResponseTemplate::new(200))
                .with_priority(1)
                .expect(1)
                .mount(&server),
        );

        let (status, report) = invoke(&server, PetSource::SearchApi);

        assert_eq!(200, status);
        assert!(report.success, "{:?}", report.errors);
        assert_eq!(Some(&"011".to_string()), report.tags.get("pet-id"));
        assert_eq!(Some(&"search-api".to_string()), report.tags.get("workflow-type"));
        assert!(report.step_results.contains_key("loadPetData"));
        assert!(report.step_results.contains_key("housekeeping"));
        rt.block_on(server.verify());
    }

    #[test]
    fn failed_adoption_stops_the_workflow() {
        let (_rt, server) = petsite(500);

        let (status, report) = invoke(&server, PetSource::Fixed);

        assert_eq!(200, status);
        assert!(!report.success);
        assert_eq!(
            vec!["Required step [adoptPet] failed: status 500".to_string()],
            report.errors
        );
        assert!(!report.step_results.contains_key("makePayment"));
    }

    #[test]
    fn no_pets_to_adopt() {
        let rt = Runtime::new().unwrap();
        let server = rt.block_on(async {
            let server = MockServer::start().await;
            Mock::given(path("/api/search"))
                .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
                .mount(&server)
                .await;
            Mock::given(path("/housekeeping/"))
                .respond_with(ResponseTemplate::new(200))
                .mount(&server)
                .await;
            server
        });

        let (status, report) = invoke(&server, PetSource::SearchApi);

        assert_eq!(200, status);
        assert!(!report.success);
        assert_eq!(
            vec![
                "Required step [loadPetData] failed: No pets available for adoption workflow test"
                    .to_string()
            ],
            report.errors
        );
    }

    fn pages(payment_status: u16) -> (Runtime, MockServer) {
        let rt = Runtime::new().unwrap();
        let server = rt.block_on(async {
            let server = MockServer::start().await;
            Mock::given(path("/Adoption"))
                .respond_with(ResponseTemplate::new(302).insert_header("Location", "/"))
                .mount(&server)
                .await;
            Mock::given(path("/Payment"))
                .respond_with(ResponseTemplate::new(payment_status))
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path("/"))
                .respond_with(ResponseTemplate::new(200))
                .mount(&server)
                .await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(200))
                .expect(0)
                .mount(&server)
                .await;
            server
        });
        (rt, server)
    }

    #[test]
    fn pages_profile_accepts_redirects() {
        let (rt, server) = pages(302);

        let (status, report) = invoke_with(&server, PetSource::Fixed, CheckProfile::Pages);

        assert_eq!(200, status);
        assert!(report.success, "{:?}", report.errors);
        assert_eq!(Some(&"pages".to_string()), report.tags.get("workflow-type"));
        assert_eq!(
            vec!["adoptionPage", "mainPage", "paymentPage"],
            report.step_results.keys().collect::<Vec<_>>()
        );
        assert_eq!(Some(302), report.step_results["adoptionPage"].status_code);
        rt.block_on(server.verify());
    }

    #[test]
    fn pages_profile_fails_on_broken_page() {
        let (_rt, server) = pages(500);

        let (status, report) = invoke_with(&server, PetSource::Fixed, CheckProfile::Pages);

        assert_eq!(200, status);
        assert!(!report.success);
        assert_eq!(
            vec!["Required step [paymentPage] failed: status 500".to_string()],
            report.errors
        );
    }
}
