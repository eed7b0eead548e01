//! Menu browsing.

use tableside_core::DishId;

use super::{CliError, Context};

/// List dishes, optionally restricted to one category.
pub async fn list(ctx: &Context, category: Option<&str>) -> Result<(), CliError> {
    let dishes = ctx.client.dishes().await?;

    let shown: Vec<_> = dishes
        .iter()
        .filter(|dish| category.is_none_or(|c| dish.category.eq_ignore_ascii_case(c)))
        .collect();

    #[allow(clippy::print_stdout)]
    {
        if shown.is_empty() {
            println!("No dishes found");
            return Ok(());
        }
        for dish in shown {
            let price = dish
                .unit_price()
                .map_or_else(|| "n/a".to_string(), |p| p.to_string());
            println!("{:>5}  {:<32} {:>10}  {}", dish.id, dish.name, price, dish.category);
            if !dish.allergies.is_empty() {
                println!("       allergens: {}", dish.allergies.join(", "));
            }
        }
    }
    Ok(())
}

/// List the variants of one dish.
pub async fn variants(ctx: &Context, dish_id: DishId) -> Result<(), CliError> {
    let dish = ctx.client.dish(dish_id).await?;
    let variants = ctx.client.variants_for_dish(dish_id).await?;

    #[allow(clippy::print_stdout)]
    {
        println!("{}", dish.name);
        if variants.is_empty() {
            println!("  (no variants)");
        }
        for variant in variants.iter() {
            let price = variant
                .unit_price()
                .map_or_else(|| "n/a".to_string(), |p| p.to_string());
            println!("{:>5}  {:<32} {:>10}", variant.id, variant.detail, price);
        }
    }
    Ok(())
}
