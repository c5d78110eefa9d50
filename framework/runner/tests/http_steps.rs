use std::sync::Arc;
use std::time::Duration;

use canary_runner::prelude::*;
use pretty_assertions::assert_eq;
use url::Url;
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn step_runner(timeout: Duration) -> HttpStepRunner {
    HttpStepRunner::new(Arc::new(ReportConfig::default().init()), timeout).unwrap()
}

fn orchestrator(policy: ScenarioPolicy) -> ScenarioOrchestrator {
    ScenarioOrchestrator::new(step_runner(DEFAULT_REQUEST_TIMEOUT), policy)
}

fn url(server: &MockServer, path_and_query: &str) -> Url {
    endpoint(&Url::parse(&server.uri()).unwrap(), path_and_query).unwrap()
}

fn unreachable() -> Url {
    Url::parse("http://127.0.0.1:1/").unwrap()
}

#[tokio::test]
async fn completed_step_keeps_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/PetListAdoptions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("adopted: dog"))
        .mount(&server)
        .await;

    let outcome = step_runner(DEFAULT_REQUEST_TIMEOUT)
        .execute("listAdoptions", &HttpRequest::get(url(&server, "/PetListAdoptions")))
        .await;

    assert!(outcome.success());
    assert_eq!(Some(200), outcome.status());
    assert_eq!(None, outcome.result.error);
    assert_eq!(Some("adopted: dog"), outcome.body());
}

#[tokio::test]
async fn form_post_is_sent_encoded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/Payment/MakePayment"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string("pettype=dog&petid=test-123"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let request = HttpRequest::post_form(
        url(&server, "/Payment/MakePayment"),
        &[("pettype", "dog"), ("petid", "test-123")],
    );
    let outcome = step_runner(DEFAULT_REQUEST_TIMEOUT)
        .execute("makePayment", &request)
        .await;

    assert!(outcome.success());
}

#[tokio::test]
async fn unexpected_status_is_a_failure_with_status() {
    let server = MockServer::start().await;
    Mock::given(path("/pethistory"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let outcome = step_runner(DEFAULT_REQUEST_TIMEOUT)
        .execute("petHistory", &HttpRequest::get(url(&server, "/pethistory")))
        .await;

    assert!(!outcome.success());
    assert_eq!(Some(503), outcome.status());
    assert_eq!(Some("unexpected status 503".to_string()), outcome.result.error);
}

#[tokio::test]
async fn redirect_is_success_only_when_expected() {
    let server = MockServer::start().await;
    Mock::given(path("/"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/Home"))
        .mount(&server)
        .await;
    let runner = step_runner(DEFAULT_REQUEST_TIMEOUT);

    let strict = runner
        .execute("home", &HttpRequest::get(url(&server, "/")))
        .await;
    let lenient = runner
        .execute("home", &HttpRequest::get(url(&server, "/")).expect(Expect::Success))
        .await;

    assert!(!strict.success());
    assert!(lenient.success());
    assert_eq!(Some(302), lenient.status());
}

#[tokio::test]
async fn timeout_is_captured_not_raised() {
    let server = MockServer::start().await;
    Mock::given(path("/housekeeping/"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let outcome = step_runner(Duration::from_millis(100))
        .execute("housekeeping", &HttpRequest::get(url(&server, "/housekeeping/")))
        .await;

    assert!(!outcome.success());
    assert_eq!(None, outcome.status());
    assert_eq!(Some("timeout".to_string()), outcome.result.error);
    assert!(outcome.result.latency_ms >= 100);
}

#[tokio::test]
async fn request_timeout_overrides_default() {
    let server = MockServer::start().await;
    Mock::given(path("/"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(300)))
        .mount(&server)
        .await;

    let outcome = step_runner(DEFAULT_REQUEST_TIMEOUT)
        .execute(
            "home",
            &HttpRequest::get(url(&server, "/")).with_timeout(Duration::from_millis(50)),
        )
        .await;

    assert_eq!(Some("timeout".to_string()), outcome.result.error);
}

#[tokio::test]
async fn connection_failure_is_captured() {
    let outcome = step_runner(DEFAULT_REQUEST_TIMEOUT)
        .execute("home", &HttpRequest::get(unreachable()))
        .await;

    assert!(!outcome.success());
    assert_eq!(None, outcome.status());
    assert!(outcome
        .result
        .error
        .as_deref()
        .is_some_and(|e| e.starts_with("connection error: ")));
}

#[tokio::test]
async fn execute_required_returns_abort() {
    let server = MockServer::start().await;
    Mock::given(path("/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = step_runner(DEFAULT_REQUEST_TIMEOUT)
        .execute_required("searchPet", &HttpRequest::get(url(&server, "/")))
        .await
        .unwrap_err();

    assert_eq!("searchPet", err.step());
    assert_eq!("status 500", err.reason());
}

#[tokio::test]
async fn required_failure_stops_the_sequence() {
    let server = MockServer::start().await;
    Mock::given(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(path("/Adoption/TakeMeHome"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(path("/PetListAdoptions"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let sequencer = StepSequencer::new(orchestrator(ScenarioPolicy::default()));
    let report = sequencer
        .run(
            "adoption_workflow",
            &[
                Step::required("searchPet", HttpRequest::get(url(&server, "/"))),
                Step::required(
                    "adoptPet",
                    HttpRequest::post_form(url(&server, "/Adoption/TakeMeHome"), &[("petid", "1")]),
                ),
                Step::optional("listAdoptions", HttpRequest::get(url(&server, "/PetListAdoptions"))),
            ],
        )
        .await;

    assert!(!report.success);
    assert_eq!(ScenarioState::Failed, report.state);
    assert_eq!(
        vec!["adoptPet", "searchPet"],
        report.step_results.keys().collect::<Vec<_>>()
    );
    assert_eq!(
        vec!["Required step [adoptPet] failed: status 500".to_string()],
        report.errors
    );
    assert!(report.is_sealed());
}

#[tokio::test]
async fn optional_failure_continues() {
    let server = MockServer::start().await;
    Mock::given(path("/pethistory"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(path("/PetListAdoptions"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let sequencer = StepSequencer::new(orchestrator(ScenarioPolicy::default()));
    let report = sequencer
        .run(
            "housekeeping",
            &[
                Step::optional("petHistory", HttpRequest::get(url(&server, "/pethistory"))),
                Step::required("listAdoptions", HttpRequest::get(url(&server, "/PetListAdoptions"))),
            ],
        )
        .await;

    assert!(report.success);
    assert_eq!(2, report.step_results.len());
    assert_eq!(vec!["petHistory failed with status 500".to_string()], report.errors);
}

#[tokio::test]
async fn step_success_floor_fails_on_optional_failure() {
    let server = MockServer::start().await;
    Mock::given(path("/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let sequencer = StepSequencer::new(orchestrator(
        ScenarioPolicy::default().success_rate_floor(100.0),
    ));
    let report = sequencer
        .run(
            "pet_search",
            &[Step::optional("noParams", HttpRequest::get(url(&server, "/")))],
        )
        .await;

    assert!(!report.success);
    assert_eq!(Some(&"0.00%".to_string()), report.tags.get("success-rate"));
}

#[tokio::test]
async fn batch_settles_every_request_in_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let requests = vec![
        ("home".to_string(), HttpRequest::get(url(&server, "/"))),
        ("search".to_string(), HttpRequest::get(url(&server, "/?selectedPetType=dog"))),
        ("broken".to_string(), HttpRequest::get(unreachable())),
        ("listings".to_string(), HttpRequest::get(url(&server, "/PetListAdoptions"))),
        ("history".to_string(), HttpRequest::get(url(&server, "/pethistory"))),
    ];

    let batch = ConcurrentBatchRunner::new(step_runner(DEFAULT_REQUEST_TIMEOUT))
        .run_batch(requests, None)
        .await;

    assert_eq!(4, batch.success_count);
    assert_eq!(1, batch.failure_count);
    assert_eq!(
        vec!["home", "search", "broken", "listings", "history"],
        batch
            .per_request_results
            .iter()
            .map(|r| r.name.as_str())
            .collect::<Vec<_>>()
    );
    assert!(!batch.per_request_results[2].success);
}

#[tokio::test]
async fn capped_batch_keeps_submission_order() {
    let server = MockServer::start().await;
    Mock::given(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(200)))
        .mount(&server)
        .await;
    Mock::given(path("/fast"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let requests = vec![
        ("slow".to_string(), HttpRequest::get(url(&server, "/slow"))),
        ("fast".to_string(), HttpRequest::get(url(&server, "/fast"))),
        ("fast-again".to_string(), HttpRequest::get(url(&server, "/fast"))),
    ];

    let batch = ConcurrentBatchRunner::new(step_runner(DEFAULT_REQUEST_TIMEOUT))
        .run_batch(requests, Some(2))
        .await;

    assert_eq!(3, batch.success_count);
    assert_eq!("slow", batch.per_request_results[0].name);
    assert!(batch.total_latency_ms >= 200);
}

#[tokio::test]
async fn slow_step_fails_latency_ceiling() {
    let server = MockServer::start().await;
    Mock::given(path("/"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(300)))
        .mount(&server)
        .await;

    let orchestrator =
        orchestrator(ScenarioPolicy::default().per_step_latency(Duration::from_millis(100)));
    let mut run = orchestrator.start("adoption_workflow");
    let outcome = run.required_step("searchPet", &HttpRequest::get(url(&server, "/"))).await;
    assert!(outcome.is_ok());

    let invocation = run.conclude(Ok(()));
    assert_eq!(InvocationResponse::COMPLETED, invocation.status_code);
    assert!(!invocation.report.success);
    assert_eq!(
        vec!["Some responses were slow: 1 responses exceeded 100ms".to_string()],
        invocation.report.errors
    );
}

#[tokio::test]
async fn harness_error_completes_with_partial_report() {
    let server = MockServer::start().await;
    Mock::given(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let mut run = orchestrator(ScenarioPolicy::default()).start("api_health");
    run.step("home", &HttpRequest::get(url(&server, "/"))).await;

    let invocation = run.conclude(Err(anyhow::anyhow!("bucket unavailable")));
    assert_eq!(InvocationResponse::HARNESS_ERROR, invocation.status_code);
    assert!(!invocation.report.success);
    assert!(invocation.report.step_results.contains_key("home"));
    assert_eq!(vec!["bucket unavailable".to_string()], invocation.report.errors);

    let response = ReportEmitter::to_response(&invocation).unwrap();
    assert!(response.is_harness_error());
    assert_eq!(invocation.report, response.report().unwrap());
}

#[tokio::test]
async fn malformed_json_aborts_the_run() {
    let server = MockServer::start().await;
    Mock::given(path("/api/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let mut run = orchestrator(ScenarioPolicy::default()).start("search_api");
    let outcome = run
        .required_step("loadPetData", &HttpRequest::get(url(&server, "/api/search")))
        .await
        .unwrap();
    let parsed = run.parse_json::<Vec<serde_json::Value>>(&outcome);

    assert!(parsed.is_err());
    assert!(run.is_aborted());
    assert_eq!(ScenarioState::Failed, run.state());

    // Propagating the abort out of the hook does not record it twice.
    let invocation = run.conclude(Err(parsed.unwrap_err().into()));
    assert_eq!(InvocationResponse::COMPLETED, invocation.status_code);
    assert_eq!(1, invocation.report.errors.len());
    assert!(invocation.report.errors[0].starts_with("Required step [loadPetData] failed"));
}

#[tokio::test]
async fn aborted_run_is_still_measured() {
    let server = MockServer::start().await;
    Mock::given(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let policy = ScenarioPolicy::default()
        .total_latency(Duration::from_secs(10))
        .success_rate_floor(95.0);
    let mut run = orchestrator(policy).start("load_test");
    let aborted = run
        .required_step("home", &HttpRequest::get(url(&server, "/")))
        .await;

    let invocation = run.conclude(Err(aborted.unwrap_err().into()));
    assert_eq!(InvocationResponse::COMPLETED, invocation.status_code);
    assert!(!invocation.report.success);
    assert_eq!(
        Some(&"0.00%".to_string()),
        invocation.report.tags.get("success-rate")
    );
    assert!(invocation.report.tags.contains_key("total-time-ms"));
    // The floor violation is not reported on top of the abort
    assert_eq!(
        vec!["Required step [home] failed: status 503".to_string()],
        invocation.report.errors
    );
}
