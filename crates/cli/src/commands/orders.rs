//! Customer order history.

use tableside_client::api::types::Order;
use tableside_core::OrderId;

use super::{CliError, Context};

/// List the signed-in user's orders.
pub async fn mine(ctx: &Context) -> Result<(), CliError> {
    let orders = ctx.client.my_orders().await?;
    print_order_table(&orders, false);
    Ok(())
}

/// Show one order with its items.
pub async fn show(ctx: &Context, id: OrderId) -> Result<(), CliError> {
    let order = ctx.client.order(id).await?;
    print_order_detail(&order);
    Ok(())
}

#[allow(clippy::print_stdout)]
pub(super) fn print_order_table(orders: &[Order], mark_unseen: bool) {
    if orders.is_empty() {
        println!("No orders found");
        return;
    }

    for order in orders {
        let created = order
            .created_at
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        let seen = if mark_unseen && !order.is_viewed_by_admin { '*' } else { ' ' };
        println!(
            "{seen}{:>5}  {:<14} {:<18} {:>10}  {created}",
            order.id,
            order.order_number,
            order.status_label(),
            order.total_price.to_string(),
        );
    }
}

#[allow(clippy::print_stdout)]
pub(super) fn print_order_detail(order: &Order) {
    println!("Order {} (#{})", order.order_number, order.id);
    println!("  Status:   {} / payment {:?}", order.status_label(), order.payment_status);
    println!("  Customer: {} {}", order.delivery_name, order.delivery_phone);
    if order.delivery_type == "pickup" {
        println!("  Pickup at the restaurant");
    } else {
        println!("  Deliver:  {}", order.full_address());
    }
    if let Some(comment) = order.comment.as_deref().filter(|c| !c.is_empty()) {
        println!("  Comment:  {comment}");
    }
    if let Some(note) = order.admin_note.as_deref().filter(|n| !n.is_empty()) {
        println!("  Note:     {note}");
    }

    println!();
    for item in &order.items {
        let name = item
            .dish_name
            .clone()
            .unwrap_or_else(|| format!("Dish #{}", item.dish));
        let detail = item
            .variant_detail
            .as_deref()
            .map(|d| format!(" ({d})"))
            .unwrap_or_default();
        let total = item.total_price.map(|p| p.to_string()).unwrap_or_default();
        println!("{:>3} x {:<40} {total:>10}", item.quantity, format!("{name}{detail}"));
    }

    println!();
    if order.discount_amount.is_chargeable() {
        println!("  Discount: {:>10}", order.discount_amount.to_string());
    }
    if order.delivery_fee.is_chargeable() {
        println!("  Delivery: {:>10}", order.delivery_fee.to_string());
    }
    println!("  Total:    {:>10}", order.total_price.to_string());
}
