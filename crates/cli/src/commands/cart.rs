//! Cart editing and checkout.

use tableside_client::api::types::{CheckoutDetails, OrderCreateRequest};
use tableside_client::CartStore;
use tableside_core::{DishId, VariantId};

use super::{CliError, Context};

/// Print the cart lines and the total.
pub async fn show(ctx: &Context) {
    let cart = ctx.cart().await;
    print_cart(&cart);
}

/// Add a dish (or one of its variants) to the cart.
pub async fn add(
    ctx: &Context,
    dish_id: DishId,
    variant_id: Option<VariantId>,
    quantity: u32,
) -> Result<(), CliError> {
    if quantity == 0 {
        return Err(CliError::InvalidArgument("Quantity must be at least 1".to_string()));
    }

    let dish = ctx.client.dish(dish_id).await?;
    let variant = match variant_id {
        Some(variant_id) => {
            let variants = ctx.client.variants_for_dish(dish_id).await?;
            let variant = variants
                .iter()
                .find(|v| v.id == variant_id)
                .cloned()
                .ok_or_else(|| {
                    CliError::InvalidArgument(format!(
                        "{} has no variant {variant_id}",
                        dish.name
                    ))
                })?;
            Some(variant)
        }
        None => None,
    };

    let cart = ctx.cart_offline();
    if !cart.add(&dish, variant.as_ref(), quantity) {
        return Err(CliError::InvalidArgument(format!(
            "{} cannot be ordered right now (no valid price)",
            dish.name
        )));
    }

    #[allow(clippy::print_stdout)]
    {
        println!("Added {quantity} x {}", dish.name);
        println!("{} item(s) in cart", cart.total_items());
    }
    Ok(())
}

/// Set a line's quantity; 0 removes it.
pub fn set_quantity(
    ctx: &Context,
    dish_id: DishId,
    variant_id: Option<VariantId>,
    quantity: u32,
) -> Result<(), CliError> {
    let cart = ctx.cart_offline();
    require_line(cart.set_quantity(dish_id, variant_id, quantity), dish_id)?;
    print_count(&cart);
    Ok(())
}

/// Add one to a line.
pub fn increment(ctx: &Context, dish_id: DishId, variant_id: Option<VariantId>) -> Result<(), CliError> {
    let cart = ctx.cart_offline();
    require_line(cart.increment(dish_id, variant_id), dish_id)?;
    print_count(&cart);
    Ok(())
}

/// Take one from a line.
pub fn decrement(ctx: &Context, dish_id: DishId, variant_id: Option<VariantId>) -> Result<(), CliError> {
    let cart = ctx.cart_offline();
    require_line(cart.decrement(dish_id, variant_id), dish_id)?;
    print_count(&cart);
    Ok(())
}

/// Remove a line.
pub fn remove(ctx: &Context, dish_id: DishId, variant_id: Option<VariantId>) -> Result<(), CliError> {
    let cart = ctx.cart_offline();
    require_line(cart.remove(dish_id, variant_id), dish_id)?;
    print_count(&cart);
    Ok(())
}

/// Empty the cart.
pub fn clear(ctx: &Context) {
    ctx.cart_offline().clear();
    #[allow(clippy::print_stdout)]
    {
        println!("Cart emptied");
    }
}

/// Place an order for the cart's contents. The cart is emptied once the
/// backend accepts the order.
pub async fn checkout(ctx: &Context, details: CheckoutDetails) -> Result<(), CliError> {
    let cart = ctx.cart().await;
    if cart.is_empty() {
        return Err(CliError::InvalidArgument("The cart is empty".to_string()));
    }

    let request = OrderCreateRequest::new(details, cart.checkout_items());
    // A rejected order leaves the cart as it was so it can be resubmitted.
    let order = ctx.client.create_order(&request).await?;
    cart.clear();

    #[allow(clippy::print_stdout)]
    {
        println!("Order {} placed ({})", order.order_number, order.status_label());
        if order.discount_amount.is_chargeable() {
            println!("  Subtotal: {:>10}", order.original_price.to_string());
            println!("  Discount: {:>10}", order.discount_amount.to_string());
        }
        if order.delivery_fee.is_chargeable() {
            println!("  Delivery: {:>10}", order.delivery_fee.to_string());
        }
        println!("  Total:    {:>10}", order.total_price.to_string());
    }
    Ok(())
}

fn require_line(found: bool, dish_id: DishId) -> Result<(), CliError> {
    if found {
        Ok(())
    } else {
        Err(CliError::InvalidArgument(format!("Dish {dish_id} is not in the cart")))
    }
}

#[allow(clippy::print_stdout)]
fn print_count(cart: &CartStore) {
    println!("{} item(s) in cart", cart.total_items());
}

#[allow(clippy::print_stdout)]
fn print_cart(cart: &CartStore) {
    let lines = cart.lines();
    if lines.is_empty() {
        println!("Your cart is empty");
        return;
    }

    for view in &lines {
        let name = view
            .dish
            .as_ref()
            .map_or_else(|| format!("Dish #{} (loading...)", view.line.dish_id), |d| d.name.clone());
        let variant = view
            .line
            .variant_id
            .map(|id| format!(" [variant {id}]"))
            .unwrap_or_default();
        println!(
            "{:>3} x {:<40} {:>10}",
            view.line.quantity,
            format!("{name}{variant}"),
            view.subtotal().to_string()
        );
    }
    println!("{:<46} {:>10}", "Total", cart.total_price().to_string());
}
