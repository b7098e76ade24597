use stripe::{Client, CreateCustomer, Customer, ListCustomers, Metadata};

use crate::error::{AppError, Res};

pub fn create_client(secret_key: &str) -> Client {
    Client::new(secret_key)
}

/// Looks up a Stripe customer by email. Returns None when nobody matches.
pub async fn find_customer_by_email(client: &Client, email: &str) -> Res<Option<Customer>> {
    let params = ListCustomers {
        email: Some(email),
        limit: Some(1),
        ..Default::default()
    };

    let customers = Customer::list(client, &params)
        .await
        .map_err(AppError::from)?;
    Ok(customers.data.into_iter().next())
}

pub async fn create_customer(
    client: &Client,
    email: &str,
    name: &str,
    external_id: &str,
) -> Res<Customer> {
    let mut metadata = Metadata::new();
    metadata.insert("external_id".to_string(), external_id.to_string());

    let params = CreateCustomer {
        email: Some(email),
        name: Some(name),
        metadata: Some(metadata),
        ..Default::default()
    };

    Customer::create(client, params)
        .await
        .map_err(AppError::from)
}
