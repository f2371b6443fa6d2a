//! Lists draft invoices, downloads the first one as a PDF and shows how a
//! refused invoice is reported.
//!
//! Needs `XERO_CLIENT_ID`, `XERO_CLIENT_SECRET` and `XERO_TENANT_ID`.

#[macro_use]
extern crate tracing;

use anyhow::{Context, Result};
use rust_decimal_macros::dec;
use uuid::Uuid;
use xero_accounting::entities::invoice::Type;
use xero_accounting::{
    Client, Config, Contact, Filter, Invoice, KeyPair, LineItem, Outcome, PageLimit, Scope,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let tenant_id: Uuid = std::env::var("XERO_TENANT_ID")
        .context("XERO_TENANT_ID is not set")?
        .parse()?;
    let key_pair = KeyPair::from_env().context("XERO_CLIENT_ID is not set")?;
    let config = Config::new(tenant_id).with_page_limit(PageLimit::Pages(2));

    let client = Client::from_client_credentials(key_pair, Scope::accounting(), config).await?;

    let drafts = client
        .invoices()
        .get(&Filter::new().param("Statuses", "DRAFT"))
        .await?;
    info!(
        "found {} draft invoices across {} page(s), more available: {}",
        drafts.len(),
        drafts.pages,
        drafts.is_truncated()
    );

    if let Some(id) = drafts.entities.first().and_then(|invoice| invoice.invoice_id) {
        let path = std::env::temp_dir().join(format!("{id}.pdf"));
        client.invoices().save_pdf(id, &path).await?;
        info!("saved invoice {} to {}", id, path.display());
    }

    let refused = Invoice {
        r#type: Some(Type::Other("NotARealType".to_string())),
        ..Invoice::receivable(
            Contact::named("Demo customer"),
            vec![LineItem::new("Demo line", dec!(1), dec!(10))],
        )
    };
    match client.invoices().create_one(&refused).await? {
        Outcome::Saved(invoice) => warn!("unexpectedly saved {:?}", invoice.invoice_id),
        Outcome::Rejected { errors, .. } => {
            for error in errors {
                info!("rejected: {}", error.message);
            }
        }
    }

    Ok(())
}
