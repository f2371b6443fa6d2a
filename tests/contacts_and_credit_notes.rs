use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use xero_accounting::entities::credit_note::Type;
use xero_accounting::{Contact, CreditNote, LineItem, Outcome};


use test_utils::{api_path, do_setup, envelope, mock_client, mock_config};

#[tokio::test]
async fn contacts_round_trip_unknown_fields() {
    do_setup();
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path(api_path("Contacts")))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(
            "Contacts",
            vec![json!({
                "ContactID": id,
                "Name": "Ridgeway University",
                "ContactStatus": "ACTIVE",
                "Addresses": [{ "AddressType": "POBOX", "City": "Oaktown" }]
            })],
        )))
        .mount(&server)
        .await;

    let client = mock_client(mock_config(&server, Uuid::new_v4()));
    let contacts = client.contacts().get_all().await.unwrap();

    let contact = &contacts.entities[0];
    assert_eq!(contact.contact_id, Some(id));
    assert_eq!(contact.name.as_deref(), Some("Ridgeway University"));
    assert_eq!(contact.fields["Addresses"][0]["City"], "Oaktown");
}

#[tokio::test]
async fn contact_missing_name_is_rejected() {
    do_setup();
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path(api_path("Contacts")))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(
            "Contacts",
            vec![json!({
                "ContactID": Uuid::nil(),
                "EmailAddress": "someone@example.com",
                "HasValidationErrors": true,
                "ValidationErrors": [{ "Message": "The contact name must be specified." }]
            })],
        )))
        .mount(&server)
        .await;

    let client = mock_client(mock_config(&server, Uuid::new_v4()));
    let outcome = client
        .contacts()
        .create_one(&Contact::default().with_email("someone@example.com"))
        .await
        .unwrap();

    match outcome {
        Outcome::Rejected { entity, errors } => {
            assert_eq!(entity.contact_id, None);
            assert_eq!(errors[0].message, "The contact name must be specified.");
        }
        Outcome::Saved(contact) => panic!("expected rejection, saved {contact:?}"),
    }
}

#[tokio::test]
async fn credit_notes_create_and_download() {
    do_setup();
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("PUT"))
        .and(path(api_path("CreditNotes")))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(
            "CreditNotes",
            vec![json!({
                "CreditNoteID": id,
                "Type": "ACCRECCREDIT",
                "Status": "DRAFT",
                "Total": 15.5,
                "RemainingCredit": 15.5
            })],
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(api_path(&format!("CreditNotes/{id}"))))
        .and(header("accept", "application/pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"%PDF-1.7 credit".to_vec(), "application/pdf"))
        .mount(&server)
        .await;

    let client = mock_client(mock_config(&server, Uuid::new_v4()));
    let note = CreditNote::new(
        Type::AccountsReceivableCredit,
        Contact::by_id(Uuid::new_v4()),
        vec![LineItem::new("Refund", dec!(1), dec!(15.5))],
    );

    let saved = client.credit_notes().create_one(&note).await.unwrap().saved().unwrap();
    assert_eq!(saved.credit_note_id, Some(id));
    assert_eq!(saved.remaining_credit, Some(dec!(15.5)));

    let pdf = client.credit_notes().get_pdf(id).await.unwrap();
    assert_eq!(pdf, b"%PDF-1.7 credit");
}
