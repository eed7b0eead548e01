//! Back-office commands: order queue, users, statistics, contact messages.
//!
//! All of these need a staff account; the backend answers 403 otherwise.

use tableside_core::{OrderId, OrderStatus};

use super::orders::{print_order_detail, print_order_table};
use super::{CliError, Context};

/// List every order, newest first as the backend sends them. Unseen orders
/// are marked with `*`.
pub async fn orders(ctx: &Context, status: Option<OrderStatus>) -> Result<(), CliError> {
    let mut orders = ctx.client.admin_orders().await?;
    if let Some(status) = status {
        orders.retain(|o| o.status == status);
    }
    print_order_table(&orders, true);
    Ok(())
}

/// Show the pending-order badge.
pub async fn pending(ctx: &Context) -> Result<(), CliError> {
    let pending = ctx.client.pending_orders().await?;
    #[allow(clippy::print_stdout)]
    {
        let marker = if pending.has_new { " (new)" } else { "" };
        println!("{} pending order(s){marker}", pending.count);
    }
    Ok(())
}

/// Move an order to a new status.
pub async fn set_status(
    ctx: &Context,
    id: OrderId,
    status: OrderStatus,
    note: Option<&str>,
) -> Result<(), CliError> {
    let note = note.map(str::trim).filter(|n| !n.is_empty());
    let order = ctx.client.update_order_status(id, status, note).await?;
    print_order_detail(&order);
    Ok(())
}

/// Accept a pending order.
pub async fn accept(ctx: &Context, id: OrderId) -> Result<(), CliError> {
    let order = ctx.client.accept_order(id).await?;
    #[allow(clippy::print_stdout)]
    {
        println!("Order {} accepted", order.order_number);
    }
    Ok(())
}

/// Cancel an order.
pub async fn cancel(ctx: &Context, id: OrderId, reason: Option<&str>) -> Result<(), CliError> {
    ctx.client.cancel_order(id, reason).await?;
    #[allow(clippy::print_stdout)]
    {
        println!("Order {id} canceled");
    }
    Ok(())
}

/// Mark an order as seen.
pub async fn mark_viewed(ctx: &Context, id: OrderId) -> Result<(), CliError> {
    ctx.client.mark_order_viewed(id).await?;
    tracing::info!(%id, "order marked as viewed");
    Ok(())
}

/// List registered users.
pub async fn users(ctx: &Context) -> Result<(), CliError> {
    let users = ctx.client.list_users().await?;
    #[allow(clippy::print_stdout)]
    {
        for user in &users {
            let phone = user.phone.as_deref().unwrap_or("");
            println!("{:<32} {:<28} {phone}", user.email, user.display_name());
        }
        println!("{} user(s)", users.len());
    }
    Ok(())
}

/// Print dashboard statistics.
pub async fn stats(ctx: &Context) -> Result<(), CliError> {
    let stats = ctx.client.statistics().await?;
    #[allow(clippy::print_stdout)]
    {
        println!("Users:          {}", stats.users);
        println!("Orders:         {}", stats.orders);
        println!("Today's orders: {}", stats.daily_orders);
        println!("Pending:        {}", stats.pending_count);
        println!();
        for (label, period) in [("Today", &stats.today), ("Week", &stats.week), ("Month", &stats.month)] {
            println!(
                "{label:<6} {:>5} order(s) {:>12} revenue",
                period.count,
                period.total_revenue.to_string()
            );
        }
        if !stats.status_breakdown.is_empty() {
            println!();
            for (status, count) in &stats.status_breakdown {
                let label = status
                    .parse::<OrderStatus>()
                    .map_or_else(|_| status.clone(), |s| s.label().to_string());
                println!("{label:<18} {count:>5}");
            }
        }
    }
    Ok(())
}

/// List messages sent through the contact form.
pub async fn contacts(ctx: &Context) -> Result<(), CliError> {
    let messages = ctx.client.contact_messages().await?;
    #[allow(clippy::print_stdout)]
    {
        if messages.is_empty() {
            println!("No messages");
        }
        for message in &messages {
            let sent = message
                .created_at
                .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            println!("{sent}  {} <{}>", message.name, message.email);
            println!("  {}", message.subject);
            println!("  {}", message.message);
            println!();
        }
    }
    Ok(())
}
