//! Errors render as miette diagnostics with a stable code and help text.
use miette::{Diagnostic, GraphicalReportHandler, GraphicalTheme, Report};
use reqwest::StatusCode;

use xero_accounting::error::Error;

fn render(error: &dyn Diagnostic) -> String {
    let mut out = String::new();
    GraphicalReportHandler::new_themed(GraphicalTheme::unicode_nocolor())
        .render_report(&mut out, error)
        .unwrap();
    out
}

#[test]
fn not_found_names_the_entity() {
    let error = Error::NotFound {
        entity: "Invoice".to_string(),
        url: "https://api.xero.com/api.xro/2.0/Invoices/abc".to_string(),
        status_code: StatusCode::NOT_FOUND,
        response_body: None,
    };

    assert_eq!(
        error.code().map(|code| code.to_string()).as_deref(),
        Some("xero_accounting::not_found")
    );
    let rendered = render(&error);
    assert!(rendered.contains("object not found: Invoice"));
    assert!(rendered.contains("Verify that the Invoice exists"));
}

#[test]
fn io_errors_keep_their_source() {
    let error = Error::Io {
        path: "/nowhere/invoice.pdf".into(),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such directory"),
    };

    let report = Report::new(error);
    assert!(report.to_string().contains("/nowhere/invoice.pdf"));
    assert_eq!(
        report.chain().nth(1).map(ToString::to_string).as_deref(),
        Some("no such directory")
    );
}

#[tokio::test]
async fn results_convert_into_miette_reports() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let result: miette::Result<()> = create_client().await.map(drop).map_err(Report::new);
    let report = result.unwrap_err();
    assert!(report.help().is_some());
}

async fn create_client() -> xero_accounting::Result<xero_accounting::Client> {
    Err(Error::InvalidEndpoint)
}
