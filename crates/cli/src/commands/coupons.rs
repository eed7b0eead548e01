//! Coupon type management and the coupon list.

use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use tableside_client::api::types::{Coupon, DiscountType, DiscountTypeForm, ImageUpload};
use tableside_core::{CouponUsage, DiscountTypeId};

use super::{CliError, Context};

/// Fields collected by `ts-cli coupons create|update`.
pub struct CouponTypeInput {
    pub name: String,
    pub category: String,
    pub value: Decimal,
    pub description: Option<String>,
    pub image: Option<PathBuf>,
}

impl CouponTypeInput {
    fn into_form(self) -> Result<DiscountTypeForm, CliError> {
        if self.name.trim().is_empty() {
            return Err(CliError::InvalidArgument("Name must not be empty".to_string()));
        }
        if self.value <= Decimal::ZERO {
            return Err(CliError::InvalidArgument("Value must be positive".to_string()));
        }

        let image = self.image.as_deref().map(read_image).transpose()?;
        Ok(DiscountTypeForm {
            name: self.name,
            description: self.description,
            discount_category: self.category,
            value: self.value,
            image,
        })
    }
}

/// List coupon types.
pub async fn list_types(ctx: &Context, category: Option<&str>) -> Result<(), CliError> {
    let types = match category {
        Some(category) => ctx.client.coupon_types_in_category(category).await?,
        None => ctx.client.coupon_types().await?,
    };

    #[allow(clippy::print_stdout)]
    {
        if types.is_empty() {
            println!("No coupon types");
        }
        for discount in &types {
            print_type_row(discount);
        }
    }
    Ok(())
}

/// Show one coupon type.
pub async fn show_type(ctx: &Context, id: DiscountTypeId) -> Result<(), CliError> {
    let discount = ctx.client.coupon_type(id).await?;
    #[allow(clippy::print_stdout)]
    {
        print_type_row(&discount);
        if let Some(description) = &discount.description {
            println!("       {description}");
        }
        if let Some(image) = &discount.image {
            println!("       image: {image}");
        }
    }
    Ok(())
}

/// Create a coupon type.
pub async fn create_type(ctx: &Context, input: CouponTypeInput) -> Result<(), CliError> {
    let created = ctx.client.create_coupon_type(input.into_form()?).await?;
    #[allow(clippy::print_stdout)]
    {
        print!("Created ");
        print_type_row(&created);
    }
    Ok(())
}

/// Replace a coupon type.
pub async fn update_type(
    ctx: &Context,
    id: DiscountTypeId,
    input: CouponTypeInput,
) -> Result<(), CliError> {
    let updated = ctx.client.update_coupon_type(id, input.into_form()?).await?;
    #[allow(clippy::print_stdout)]
    {
        print!("Updated ");
        print_type_row(&updated);
    }
    Ok(())
}

/// Delete a coupon type.
pub async fn delete_type(ctx: &Context, id: DiscountTypeId) -> Result<(), CliError> {
    ctx.client.delete_coupon_type(id).await?;
    #[allow(clippy::print_stdout)]
    {
        println!("Coupon type {id} deleted");
    }
    Ok(())
}

/// List issued coupons.
pub async fn list_coupons(ctx: &Context) -> Result<(), CliError> {
    let coupons = ctx.client.coupons().await?;
    #[allow(clippy::print_stdout)]
    {
        if coupons.is_empty() {
            println!("No coupons");
        }
        for coupon in &coupons {
            println!("{}", coupon_row(coupon));
        }
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_type_row(discount: &DiscountType) {
    let id = discount.id.map(|id| id.to_string()).unwrap_or_default();
    let value = discount.value.map(|v| v.to_string()).unwrap_or_default();
    println!(
        "{id:>5}  {:<28} {:<14} {value:>8}",
        discount.name, discount.discount_category
    );
}

fn coupon_row(coupon: &Coupon) -> String {
    let discount = coupon.discount.details().map_or_else(
        || {
            coupon
                .discount
                .id()
                .map(|id| format!("type #{id}"))
                .unwrap_or_default()
        },
        |d| d.name.clone(),
    );
    let used = match coupon.status_used {
        CouponUsage::Used => "used",
        CouponUsage::NotUsed => "unused",
    };
    let owner = coupon.user_name.as_deref().unwrap_or("");
    format!(
        "{:<14} {discount:<28} {used:<7} expires {:<12} {owner}",
        coupon.code, coupon.expiration_date
    )
}

fn read_image(path: &Path) -> Result<ImageUpload, CliError> {
    let bytes = std::fs::read(path)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let mime = match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    };

    Ok(ImageUpload {
        file_name,
        mime: mime.to_string(),
        bytes,
    })
}
