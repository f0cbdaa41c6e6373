//! Reporter metrics regression tests

use super::helpers::*;
use honeybadger_reporter::{DeliveryError, Reporter, ReporterConfig, Response};
use metrics_util::MetricKind;
use serial_test::serial;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug)]
struct Boom;

impl std::fmt::Display for Boom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "boom")
    }
}

impl std::error::Error for Boom {}

#[test]
#[serial]
fn delivered_report_metrics() {
    init_recorder();

    let config = ReporterConfig::builder()
        .api_key("dummy")
        .name("metrics_delivered")
        .max_error_reporting_retries(3)
        .build()
        .unwrap();

    let calls = AtomicUsize::new(0);
    let reporter = Reporter::with_transport(
        config,
        move |_: &str| -> Result<Response, DeliveryError> {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(DeliveryError::Transport("reset".into()))
            } else {
                Ok(Response::new(201, ""))
            }
        },
    );

    reporter.report_error(&Boom).unwrap();

    assert_recorded(MetricKind::Counter, "reporter_attempts_total");
    assert_labelled("reporter_attempts_total", "reporter", "metrics_delivered");
    assert_labelled("reporter_attempts_total", "result", "transport_failure");
    assert_labelled("reporter_attempts_total", "result", "success");

    assert_recorded(MetricKind::Counter, "reporter_reports_total");
    assert_labelled("reporter_reports_total", "result", "delivered");

    assert_recorded(MetricKind::Histogram, "reporter_attempts");
    assert_labelled("reporter_attempts", "reporter", "metrics_delivered");
}

#[test]
#[serial]
fn exhausted_report_metrics() {
    init_recorder();

    let config = ReporterConfig::builder()
        .api_key("dummy")
        .name("metrics_exhausted")
        .max_error_reporting_retries(2)
        .build()
        .unwrap();
    let reporter = Reporter::with_transport(
        config,
        |_: &str| -> Result<Response, DeliveryError> { Ok(Response::new(500, "")) },
    );

    let _ = reporter.report_error(&Boom);

    assert_labelled("reporter_reports_total", "result", "exhausted");
    assert_eq!(
        counter_value(
            "reporter_attempts_total",
            &[("reporter", "metrics_exhausted"), ("result", "server_failure")]
        ),
        3
    );
}

#[test]
#[serial]
fn excluded_report_metrics() {
    init_recorder();

    let config = ReporterConfig::builder()
        .api_key("dummy")
        .name("metrics_excluded")
        .exclude_error_class(std::any::type_name::<Boom>())
        .build()
        .unwrap();
    let reporter = Reporter::with_transport(
        config,
        |_: &str| -> Result<Response, DeliveryError> { Ok(Response::new(201, "")) },
    );

    let _ = reporter.report_error(&Boom);

    assert_labelled("reporter_reports_total", "reporter", "metrics_excluded");
    assert_labelled("reporter_reports_total", "result", "excluded");
}
