//! Receipt and status-notification bodies. Content mirrors what the
//! storefront promises: item lines, subtotal/fee/total breakdown and a
//! delivery or pickup block, with RM currency formatting.

use rust_decimal::Decimal;
use time::macros::format_description;

use crate::orders::dto::OrderDetails;
use crate::orders::types::{delivery_fee, DeliveryType, OrderStatus};

pub fn format_currency(amount: Decimal) -> String {
    format!("RM{:.2}", amount)
}

/// Customer-facing message for each status, pickup/delivery aware.
pub fn status_message(status: OrderStatus, delivery_type: DeliveryType) -> &'static str {
    match status {
        OrderStatus::Pending => "Your order has been received and is being processed.",
        OrderStatus::Preparing => "Your order is now being prepared.",
        OrderStatus::Ready => match delivery_type {
            DeliveryType::Pickup => "Your order is ready for pickup.",
            DeliveryType::Delivery => "Your order is ready and will be delivered soon.",
        },
        OrderStatus::Delivered => "Your order has been delivered successfully.",
        OrderStatus::Cancelled => "Your order has been cancelled.",
    }
}

fn format_date(order: &OrderDetails) -> String {
    let fmt = format_description!("[day]/[month]/[year] [hour]:[minute]");
    order.created_at.format(&fmt).unwrap_or_default()
}

fn fulfilment_block(order: &OrderDetails) -> (String, String) {
    match order.delivery_type {
        DeliveryType::Delivery => (
            "Delivery Information".into(),
            format!(
                "Address: {}\nPhone: {}",
                order.delivery_address.as_deref().unwrap_or("-"),
                order.phone
            ),
        ),
        DeliveryType::Pickup => (
            "Pickup Information".into(),
            format!(
                "Pickup at: {}\nPhone: {}",
                order.pickup_date_time.as_deref().unwrap_or("-"),
                order.phone
            ),
        ),
    }
}

pub fn receipt_text(order: &OrderDetails) -> String {
    let fee = delivery_fee(order.delivery_type);
    let subtotal = order.total_price - fee;
    let mut out = String::new();
    out.push_str("Receipt - Order confirmation\n\n");
    out.push_str(&format!("Order ID: #{}\n", order.id));
    out.push_str(&format!("Placed: {}\n\n", format_date(order)));
    for line in &order.items {
        out.push_str(&format!(
            "{} x{} {}\n",
            line.name.as_deref().unwrap_or("Item"),
            line.quantity,
            format_currency(line.subtotal)
        ));
    }
    out.push_str(&format!("\nSubtotal: {}\n", format_currency(subtotal)));
    if fee > Decimal::ZERO {
        out.push_str(&format!("Delivery Fee: {}\n", format_currency(fee)));
    }
    out.push_str(&format!("Total: {}\n\n", format_currency(order.total_price)));
    let (header, details) = fulfilment_block(order);
    out.push_str(&format!("{header}\n{details}\n"));
    out
}

pub fn receipt_html(order: &OrderDetails) -> String {
    let fee = delivery_fee(order.delivery_type);
    let subtotal = order.total_price - fee;

    let items_html: String = order
        .items
        .iter()
        .map(|line| {
            format!(
                r#"<tr><td style="padding:8px 0;">{}</td><td style="text-align:center;color:#666;">&times;{}</td><td style="text-align:right;font-weight:600;">{}</td></tr>"#,
                line.name.as_deref().unwrap_or("Item"),
                line.quantity,
                format_currency(line.subtotal)
            )
        })
        .collect();

    let fee_row = if fee > Decimal::ZERO {
        format!(
            r#"<tr><td style="color:#666;">Delivery Fee</td><td style="text-align:right;">{}</td></tr>"#,
            format_currency(fee)
        )
    } else {
        String::new()
    };

    let (fulfilment_header, fulfilment_details) = fulfilment_block(order);

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>Order Receipt</title></head>
<body style="font-family:-apple-system,'Segoe UI',Roboto,Helvetica,Arial,sans-serif;color:#1a1a1a;margin:0;">
  <div style="max-width:480px;margin:0 auto;">
    <div style="text-align:center;padding:48px 24px 32px;border-bottom:1px solid #e8e8e8;">
      <div style="font-size:28px;font-weight:700;">Receipt</div>
      <div style="font-size:14px;color:#666;">Order confirmation</div>
    </div>
    <div style="padding:24px;background:#fafafa;">
      <div style="font-size:11px;color:#888;text-transform:uppercase;">Order ID</div>
      <div style="font-size:16px;font-weight:600;">#{order_id}</div>
      <div style="font-size:11px;color:#888;text-transform:uppercase;margin-top:12px;">Placed</div>
      <div style="font-size:16px;font-weight:600;">{placed}</div>
    </div>
    <div style="padding:24px;">
      <div style="font-size:11px;color:#888;text-transform:uppercase;border-bottom:1px solid #e8e8e8;padding-bottom:8px;">Items</div>
      <table style="width:100%;border-collapse:collapse;">{items_html}</table>
    </div>
    <div style="padding:24px;background:#f8f8f8;border-top:1px solid #e8e8e8;">
      <table style="width:100%;border-collapse:collapse;">
        <tr><td style="color:#666;">Subtotal</td><td style="text-align:right;">{subtotal}</td></tr>
        {fee_row}
        <tr><td style="font-weight:700;font-size:18px;padding-top:12px;">Total</td><td style="text-align:right;font-weight:700;font-size:18px;padding-top:12px;">{total}</td></tr>
      </table>
    </div>
    <div style="padding:24px;">
      <div style="font-size:11px;color:#888;text-transform:uppercase;">{fulfilment_header}</div>
      <div style="font-size:14px;white-space:pre-line;">{fulfilment_details}</div>
    </div>
    <div style="text-align:center;padding:24px;border-top:1px solid #e8e8e8;color:#888;font-size:12px;">
      Thank you for your order<br>This is an automated receipt
    </div>
  </div>
</body>
</html>"#,
        order_id = order.id,
        placed = format_date(order),
        subtotal = format_currency(subtotal),
        total = format_currency(order.total_price),
    )
}

pub fn status_text(order: &OrderDetails, status: OrderStatus) -> String {
    format!(
        "Order Update\n\nStatus: {}\n{}\n\nOrder ID: #{}\nTotal Amount: {}\nType: {}\n",
        status.as_str(),
        status_message(status, order.delivery_type),
        order.id,
        format_currency(order.total_price),
        order.delivery_type.as_str()
    )
}

pub fn status_html(order: &OrderDetails, status: OrderStatus) -> String {
    let customer = order
        .customer
        .as_ref()
        .map(|c| c.name.as_str())
        .unwrap_or("-");
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>Order Status Update</title></head>
<body style="font-family:-apple-system,'Segoe UI',Roboto,Helvetica,Arial,sans-serif;color:#1a1a1a;margin:0;">
  <div style="max-width:480px;margin:0 auto;">
    <div style="text-align:center;padding:48px 24px 32px;border-bottom:1px solid #e8e8e8;">
      <div style="font-size:28px;font-weight:700;">Order Update</div>
      <div style="font-size:14px;color:#666;">Status notification</div>
    </div>
    <div style="padding:32px 24px;text-align:center;background:#fafafa;">
      <div style="display:inline-block;background:#000;color:#fff;padding:8px 20px;border-radius:20px;font-size:12px;font-weight:600;text-transform:uppercase;">{status}</div>
      <div style="font-size:16px;font-weight:500;margin-top:16px;">{message}</div>
    </div>
    <div style="padding:24px;">
      <div style="font-size:11px;color:#888;text-transform:uppercase;border-bottom:1px solid #e8e8e8;padding-bottom:8px;">Order Details</div>
      <table style="width:100%;border-collapse:collapse;font-size:14px;">
        <tr><td style="color:#666;padding:8px 0;">Order ID:</td><td style="text-align:right;font-weight:600;">#{order_id}</td></tr>
        <tr><td style="color:#666;padding:8px 0;">Customer:</td><td style="text-align:right;font-weight:600;">{customer}</td></tr>
        <tr><td style="color:#666;padding:8px 0;">Total Amount:</td><td style="text-align:right;font-weight:600;">{total}</td></tr>
        <tr><td style="color:#666;padding:8px 0;">Type:</td><td style="text-align:right;font-weight:600;text-transform:capitalize;">{delivery_type}</td></tr>
      </table>
    </div>
    <div style="text-align:center;padding:24px;border-top:1px solid #e8e8e8;color:#888;font-size:12px;">
      Thank you for your order<br>This is an automated notification
    </div>
  </div>
</body>
</html>"#,
        status = status.as_str(),
        message = status_message(status, order.delivery_type),
        order_id = order.id,
        customer = customer,
        total = format_currency(order.total_price),
        delivery_type = order.delivery_type.as_str(),
    )
}

pub fn test_html(message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Test Email</title></head>
<body style="font-family:-apple-system,'Segoe UI',Roboto,sans-serif;color:#000;margin:0;">
  <div style="max-width:500px;margin:0 auto;padding:40px 20px;">
    <div style="text-align:center;border-bottom:2px solid #000;padding-bottom:20px;">
      <h1 style="font-size:24px;letter-spacing:2px;text-transform:uppercase;">Test Email</h1>
    </div>
    <div style="background:#f8f8f8;padding:30px;margin:30px 0;border-left:4px solid #000;">
      <div style="font-size:16px;">{message}</div>
    </div>
    <div style="text-align:center;border-top:1px solid #e0e0e0;padding-top:20px;color:#666;font-size:12px;">
      This is a test email from the system
    </div>
  </div>
</body>
</html>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::dto::{CustomerInfo, LineDetails, OrderDetails};
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn sample_order(delivery_type: DeliveryType) -> OrderDetails {
        let total = match delivery_type {
            DeliveryType::Delivery => Decimal::new(15000, 2),
            DeliveryType::Pickup => Decimal::new(14500, 2),
        };
        OrderDetails {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            items: vec![LineDetails {
                menu_item_id: Uuid::new_v4(),
                name: Some("Nasi Lemak".into()),
                quantity: 2,
                price: Decimal::new(3850, 2),
                subtotal: Decimal::new(7700, 2),
            }],
            delivery_type,
            delivery_address: Some("12 Jalan Besar".into()),
            pickup_date_time: Some("2026-09-01T12:30".into()),
            phone: "0123456789".into(),
            notes: None,
            total_price: total,
            status: OrderStatus::Pending,
            customer: Some(CustomerInfo {
                name: "Aisyah".into(),
                email: "aisyah@example.com".into(),
            }),
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn currency_uses_two_decimal_places() {
        assert_eq!(format_currency(Decimal::new(500, 2)), "RM5.00");
        assert_eq!(format_currency(Decimal::new(15000, 2)), "RM150.00");
    }

    #[test]
    fn ready_message_depends_on_delivery_type() {
        assert_eq!(
            status_message(OrderStatus::Ready, DeliveryType::Pickup),
            "Your order is ready for pickup."
        );
        assert_eq!(
            status_message(OrderStatus::Ready, DeliveryType::Delivery),
            "Your order is ready and will be delivered soon."
        );
    }

    #[test]
    fn receipt_shows_fee_breakdown_for_delivery_orders() {
        let text = receipt_text(&sample_order(DeliveryType::Delivery));
        assert!(text.contains("Nasi Lemak x2 RM77.00"));
        assert!(text.contains("Subtotal: RM145.00"));
        assert!(text.contains("Delivery Fee: RM5.00"));
        assert!(text.contains("Total: RM150.00"));
        assert!(text.contains("Delivery Information"));
    }

    #[test]
    fn receipt_omits_fee_for_pickup_orders() {
        let text = receipt_text(&sample_order(DeliveryType::Pickup));
        assert!(!text.contains("Delivery Fee"));
        assert!(text.contains("Total: RM145.00"));
        assert!(text.contains("Pickup Information"));
    }

    #[test]
    fn status_html_carries_badge_and_customer() {
        let html = status_html(&sample_order(DeliveryType::Delivery), OrderStatus::Preparing);
        assert!(html.contains("preparing"));
        assert!(html.contains("Your order is now being prepared."));
        assert!(html.contains("Aisyah"));
    }
}
