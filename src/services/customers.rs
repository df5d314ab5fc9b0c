use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::customer::{self, Entity as CustomerEntity},
    errors::ServiceError,
};

/// Buyer details supplied with an order. Merged into the existing customer
/// record when one exists for the email.
#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct CustomerDetails {
    #[validate(email(message = "Invalid customer email format"))]
    pub email: String,
    #[validate(length(min = 1, message = "Customer name is required"))]
    pub name: String,
    pub phone: Option<String>,
    pub shipping_address: String,
    pub billing_address: String,
}

/// Finds or creates the customer for an order, merging contact/address
/// fields and incrementing the order counter. Runs on the caller's
/// connection so it participates in the order-creation transaction.
pub async fn upsert_customer<C: ConnectionTrait>(
    conn: &C,
    details: &CustomerDetails,
) -> Result<customer::Model, ServiceError> {
    let now = Utc::now();
    let existing = CustomerEntity::find()
        .filter(customer::Column::Email.eq(details.email.clone()))
        .one(conn)
        .await?;

    let saved = match existing {
        Some(found) => {
            let orders_count = found.orders_count + 1;
            let mut active: customer::ActiveModel = found.into();
            active.name = Set(details.name.clone());
            if details.phone.is_some() {
                active.phone = Set(details.phone.clone());
            }
            active.shipping_address = Set(Some(details.shipping_address.clone()));
            active.billing_address = Set(Some(details.billing_address.clone()));
            active.orders_count = Set(orders_count);
            active.updated_at = Set(Some(now));
            active.update(conn).await?
        }
        None => {
            customer::ActiveModel {
                id: Set(Uuid::new_v4()),
                email: Set(details.email.clone()),
                name: Set(details.name.clone()),
                phone: Set(details.phone.clone()),
                shipping_address: Set(Some(details.shipping_address.clone())),
                billing_address: Set(Some(details.billing_address.clone())),
                external_id: Set(None),
                orders_count: Set(1),
                created_at: Set(now),
                updated_at: Set(Some(now)),
            }
            .insert(conn)
            .await?
        }
    };
    Ok(saved)
}
