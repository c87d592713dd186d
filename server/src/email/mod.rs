//! Transactional email via AWS SES
//!
//! Order notifications are best-effort: they run after the database commit,
//! off the request path, and a delivery failure is logged and dropped rather
//! than surfaced to the buyer.

use aws_sdk_sesv2::Client as SesClient;
use aws_sdk_sesv2::types::{Body, Content, Destination, EmailContent, Message};
use shared::models::OrderView;

use crate::state::AppState;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn order_lines(order: &OrderView, base_url: &str) -> String {
    let variation = order.variation_name.as_deref().unwrap_or("Standard");
    format!(
        "Reference: {reference}\n\
         Item: {product} ({variation}) x{quantity}\n\
         Unit price: {price}\n\
         Total: {total}\n\
         Payment: {payment}\n\n\
         Track your order: {base_url}/orders/{public_id}",
        reference = order.reference,
        product = order.product_name,
        quantity = order.quantity,
        price = order.product_price,
        total = order.total(),
        payment = order.payment_mode.label(),
        public_id = order.public_id,
    )
}

pub async fn send_order_confirmation(
    ses: &SesClient,
    from: &str,
    base_url: &str,
    order: &OrderView,
) -> Result<(), BoxError> {
    let subject = Content::builder()
        .data(format!("Order received: {}", order.reference))
        .build()?;

    let body_text = format!(
        "Hi {name},\n\n\
         We received your order.\n\n\
         {lines}\n",
        name = order.buyer_name(),
        lines = order_lines(order, base_url),
    );

    let body = Body::builder()
        .text(Content::builder().data(body_text).build()?)
        .build();

    let message = Message::builder().subject(subject).body(body).build();

    ses.send_email()
        .from_email_address(from)
        .destination(Destination::builder().to_addresses(&order.email).build())
        .content(EmailContent::builder().simple(message).build())
        .send()
        .await?;

    tracing::info!(to = %order.email, reference = %order.reference, "Order confirmation sent");
    Ok(())
}

pub async fn send_order_receipt(
    ses: &SesClient,
    from: &str,
    base_url: &str,
    order: &OrderView,
) -> Result<(), BoxError> {
    let subject = Content::builder()
        .data(format!("Order completed: {}", order.reference))
        .build()?;

    let body_text = format!(
        "Hi {name},\n\n\
         Your order is complete. Thank you!\n\n\
         {lines}\n",
        name = order.buyer_name(),
        lines = order_lines(order, base_url),
    );

    let body = Body::builder()
        .text(Content::builder().data(body_text).build()?)
        .build();

    let message = Message::builder().subject(subject).body(body).build();

    ses.send_email()
        .from_email_address(from)
        .destination(Destination::builder().to_addresses(&order.email).build())
        .content(EmailContent::builder().simple(message).build())
        .send()
        .await?;

    tracing::info!(to = %order.email, reference = %order.reference, "Order receipt sent");
    Ok(())
}

/// Fire-and-forget confirmation for a freshly created order
pub fn spawn_confirmation(state: &AppState, order: OrderView) {
    let state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = send_order_confirmation(
            &state.ses,
            &state.ses_from_email,
            &state.public_base_url,
            &order,
        )
        .await
        {
            tracing::warn!(error = %e, reference = %order.reference, "Order confirmation failed");
        }
    });
}

/// Fire-and-forget receipt when an order reaches completion
pub fn spawn_receipt(state: &AppState, order: OrderView) {
    let state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = send_order_receipt(
            &state.ses,
            &state.ses_from_email,
            &state.public_base_url,
            &order,
        )
        .await
        {
            tracing::warn!(error = %e, reference = %order.reference, "Order receipt failed");
        }
    });
}
