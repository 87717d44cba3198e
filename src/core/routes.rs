//! Route matrix generation
//!
//! Issues the sub-query grid sequentially against the distance-matrix
//! service, pausing after every call, and folds each successful response
//! into one [`RouteAggregator`]. A failed sub-query costs only its own cells.

use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};

use crate::core::aggregator::{MergePolicy, RouteAggregator, RouteCache};
use crate::core::client::DistanceMatrixClient;
use crate::core::error::Result;
use crate::core::location::Location;
use crate::core::partition::{BatchLimits, SubQuery, plan_subqueries};
use crate::core::report::{RunSummary, expected_routes};

/// Progress callback receiving (completed sub-queries, total sub-queries)
pub type ProgressCallback = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Options for a route generation run
#[derive(Clone)]
pub struct RouteRunOptions {
    pub limits: BatchLimits,

    /// Delay inserted after every outbound call
    pub pacing: Duration,

    pub merge_policy: MergePolicy,

    /// Optional progress callback
    pub progress: Option<ProgressCallback>,
}

impl Default for RouteRunOptions {
    fn default() -> Self {
        Self {
            limits: BatchLimits::default(),
            pacing: Duration::from_millis(500),
            merge_policy: MergePolicy::default(),
            progress: None,
        }
    }
}

/// Result of a completed run
#[derive(Debug)]
pub struct RouteRun {
    pub routes: RouteCache,
    pub summary: RunSummary,
    /// Element failure lines, in the order they occurred
    pub element_failures: Vec<String>,
}

/// Drives one full N×N matrix acquisition
pub struct RouteGenerator<'c> {
    client: &'c DistanceMatrixClient,
    options: RouteRunOptions,
}

impl<'c> RouteGenerator<'c> {
    pub fn new(client: &'c DistanceMatrixClient) -> Self {
        Self::with_options(client, RouteRunOptions::default())
    }

    pub fn with_options(client: &'c DistanceMatrixClient, options: RouteRunOptions) -> Self {
        Self { client, options }
    }

    /// The sub-query grid this generator would issue for `locations`
    pub fn plan<'l>(&self, locations: &'l [Location]) -> Result<Vec<SubQuery<'l>>> {
        let chunk_size = self.options.limits.chunk_size()?;
        plan_subqueries(locations, chunk_size)
    }

    pub async fn run(&self, locations: &[Location]) -> Result<RouteRun> {
        let subqueries = self.plan(locations)?;
        let total = subqueries.len() as u64;

        info!("Found {} locations", locations.len());
        info!("Total routes to calculate: {}", expected_routes(locations.len()));

        let mut aggregator = RouteAggregator::with_policy(self.options.merge_policy);
        let mut requests_issued = 0;
        let mut requests_failed = 0;

        for subquery in &subqueries {
            info!("Request {}: {}", subquery.index + 1, subquery.describe());

            match self.client.query(subquery).await {
                Ok(response) => {
                    let outcome = aggregator.absorb(subquery, &response);
                    info!("  Got {} routes", outcome.routes);
                }
                Err(failure) => {
                    warn!("  Request {} failed: {failure}", subquery.index + 1);
                    requests_failed += 1;
                }
            }
            requests_issued += 1;

            if let Some(ref progress) = self.options.progress {
                progress(requests_issued as u64, total);
            }

            if !self.options.pacing.is_zero() {
                tokio::time::sleep(self.options.pacing).await;
            }
        }

        let element_failures = aggregator.failures().to_vec();
        let summary = RunSummary::new(
            locations.len(),
            requests_issued,
            requests_failed,
            aggregator.len(),
            element_failures.len(),
        );

        Ok(RouteRun {
            routes: aggregator.into_routes(),
            summary,
            element_failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::client::{MatrixServiceConfig, format_coordinates};
    use crate::core::error::Error;
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicU64, Ordering};
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn registry(n: usize) -> Vec<Location> {
        (0..n)
            .map(|i| {
                Location::new(
                    format!("L{i:02}"),
                    format!("Location {i}"),
                    -30.0 - i as f64 / 10.0,
                    -64.0 + i as f64 / 10.0,
                )
            })
            .collect()
    }

    fn quiet_options() -> RouteRunOptions {
        RouteRunOptions {
            pacing: Duration::ZERO,
            ..Default::default()
        }
    }

    fn client_for(server: &MockServer) -> DistanceMatrixClient {
        let mut config = MatrixServiceConfig::new("test-key");
        config.base_url = format!("{}/distancematrix/json", server.uri());
        DistanceMatrixClient::new(config).unwrap()
    }

    fn count_points(request: &Request, name: &str) -> usize {
        request
            .url
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.split('|').count())
            .unwrap_or(0)
    }

    /// All-OK response body for an `origins × destinations` grid
    fn ok_body(origins: usize, destinations: usize) -> Value {
        let rows: Vec<Value> = (0..origins)
            .map(|_| {
                let elements: Vec<Value> = (0..destinations)
                    .map(|_| {
                        json!({
                            "status": "OK",
                            "distance": {"text": "12.3 km", "value": 12_345},
                            "duration": {"text": "15 mins", "value": 900}
                        })
                    })
                    .collect();
                json!({ "elements": elements })
            })
            .collect();

        json!({"status": "OK", "rows": rows})
    }

    /// Answers any request with an all-OK grid sized from its query string
    fn all_ok(request: &Request) -> ResponseTemplate {
        let body = ok_body(
            count_points(request, "origins"),
            count_points(request, "destinations"),
        );
        ResponseTemplate::new(200).set_body_json(body)
    }

    #[tokio::test]
    async fn test_three_locations_single_request() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(all_ok)
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let locations = registry(3);
        let run = RouteGenerator::with_options(&client, quiet_options())
            .run(&locations)
            .await
            .unwrap();

        assert_eq!(run.summary.requests_issued, 1);
        assert_eq!(run.summary.routes_expected, 6);
        assert_eq!(run.routes.len(), 6);
        assert!(run.summary.is_complete());
        assert_eq!(run.routes["L00_L02"].distance_km, 12.3);
        assert_eq!(run.routes["L00_L02"].duration_seconds, 900);
    }

    #[tokio::test]
    async fn test_zero_results_element_leaves_deficit_of_one() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(|request: &Request| {
                let mut body = ok_body(
                    count_points(request, "origins"),
                    count_points(request, "destinations"),
                );
                body["rows"][0]["elements"][2] = json!({"status": "ZERO_RESULTS"});
                ResponseTemplate::new(200).set_body_json(body)
            })
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let locations = registry(3);
        let run = RouteGenerator::with_options(&client, quiet_options())
            .run(&locations)
            .await
            .unwrap();

        assert_eq!(run.routes.len(), 5);
        assert!(!run.routes.contains_key("L00_L02"));
        assert_eq!(run.summary.deficit(), 1);
        assert_eq!(run.element_failures, ["Location 0 -> Location 2: ZERO_RESULTS"]);
    }

    #[tokio::test]
    async fn test_sixteen_locations_complete_in_four_requests() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(all_ok)
            .expect(4)
            .mount(&mock_server)
            .await;

        let progress_calls = Arc::new(AtomicU64::new(0));
        let progress_clone = Arc::clone(&progress_calls);
        let options = RouteRunOptions {
            progress: Some(Arc::new(move |done, total| {
                assert_eq!(total, 4);
                progress_clone.store(done, Ordering::SeqCst);
            })),
            ..quiet_options()
        };

        let client = client_for(&mock_server);
        let locations = registry(16);
        let run = RouteGenerator::with_options(&client, options)
            .run(&locations)
            .await
            .unwrap();

        assert_eq!(run.summary.requests_issued, 4);
        assert_eq!(run.routes.len(), 240);
        assert_eq!(run.summary.routes_expected, 240);
        assert_eq!(progress_calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_transport_failure_only_loses_its_own_cells() {
        let locations = registry(16);
        let second_cell_origins = format_coordinates(&locations[0..10]);
        let second_cell_destinations = format_coordinates(&locations[10..16]);

        // Mocks are matched in mount order
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("origins", second_cell_origins.as_str()))
            .and(query_param("destinations", second_cell_destinations.as_str()))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .respond_with(all_ok)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let run = RouteGenerator::with_options(&client, quiet_options())
            .run(&locations)
            .await
            .unwrap();

        // Cell #2 holds origins 0..10 × destinations 10..16
        assert_eq!(run.summary.requests_issued, 4);
        assert_eq!(run.summary.requests_failed, 1);
        assert_eq!(run.routes.len(), 240 - 60);
        assert_eq!(run.summary.deficit(), 60);
        assert!(!run.routes.contains_key("L00_L10"));
        assert!(run.routes.contains_key("L10_L00"));
        assert!(run.routes.contains_key("L00_L09"));
        assert!(run.routes.contains_key("L15_L10"));
    }

    #[tokio::test]
    async fn test_service_failure_on_every_cell_still_completes() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"status": "OVER_QUERY_LIMIT", "rows": []})),
            )
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let locations = registry(4);
        let run = RouteGenerator::with_options(&client, quiet_options())
            .run(&locations)
            .await
            .unwrap();

        assert!(run.routes.is_empty());
        assert_eq!(run.summary.requests_failed, 1);
        assert_eq!(run.summary.deficit(), 12);
    }

    #[tokio::test]
    async fn test_empty_registry_issues_nothing() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(all_ok)
            .expect(0)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let run = RouteGenerator::with_options(&client, quiet_options())
            .run(&[])
            .await
            .unwrap();

        assert_eq!(run.summary, RunSummary::default());
    }

    #[tokio::test]
    async fn test_invalid_limits_rejected_before_any_request() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(all_ok)
            .expect(0)
            .mount(&mock_server)
            .await;

        let options = RouteRunOptions {
            limits: BatchLimits { max_dimension: 0, max_elements: 100 },
            ..quiet_options()
        };
        let client = client_for(&mock_server);
        let result = RouteGenerator::with_options(&client, options)
            .run(&registry(3))
            .await;

        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_pacing_delay_between_calls() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(all_ok)
            .mount(&mock_server)
            .await;

        let options = RouteRunOptions {
            limits: BatchLimits { max_dimension: 2, max_elements: 100 },
            pacing: Duration::from_millis(50),
            ..Default::default()
        };
        let client = client_for(&mock_server);
        let start = std::time::Instant::now();
        let run = RouteGenerator::with_options(&client, options)
            .run(&registry(3))
            .await
            .unwrap();

        assert_eq!(run.summary.requests_issued, 4);
        assert!(start.elapsed() >= Duration::from_millis(200));
        assert!(run.summary.is_complete());
    }
}
