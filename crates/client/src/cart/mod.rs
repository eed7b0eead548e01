//! Cart reconciler: session-persisted cart lines, hydrated lazily from the
//! catalog.
//!
//! Lines hold identifiers and quantities only. Display data (name, price,
//! image) lives in a per-cart dish cache, and variant prices in a second
//! cache, both filled when a dish is added and by background hydration after
//! [`CartStore::load`]. A line whose dish or variant price is not cached yet
//! is still a valid line; views render it as a placeholder.
//!
//! Every mutation is written to session storage before the call returns.
//! Storage failures are logged and otherwise ignored: the in-memory cart is
//! authoritative.

mod line;

pub use line::CartLine;

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tableside_core::{DishId, Money, VariantId};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::api::types::{Dish, DishVariant, OrderItem};
use crate::error::ApiError;
use crate::storage::{KeyValueStore, keys};

/// Where hydration gets the catalog from.
pub trait CatalogSource: Send + Sync + 'static {
    /// Fetch the whole dish catalog.
    fn fetch_dishes(&self) -> impl Future<Output = Result<Arc<Vec<Dish>>, ApiError>> + Send;

    /// Fetch the variants of one dish.
    fn fetch_variants(
        &self,
        dish_id: DishId,
    ) -> impl Future<Output = Result<Arc<Vec<DishVariant>>, ApiError>> + Send;
}

/// A cart line together with its cached dish, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLineView {
    pub line: CartLine,
    /// `None` until the dish has been hydrated; render a placeholder.
    pub dish: Option<Dish>,
    /// Unit price of the chosen variant, once cached.
    pub variant_price: Option<Money>,
}

impl CartLineView {
    /// Unit price: the variant's for a variant line, else the dish's.
    /// `None` while the relevant price is not cached.
    #[must_use]
    pub fn unit_price(&self) -> Option<Money> {
        match self.line.variant_id {
            Some(_) => self.variant_price,
            None => self.dish.as_ref().and_then(Dish::unit_price),
        }
    }

    /// Unit price times quantity, zero while unhydrated.
    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.unit_price().unwrap_or(Money::ZERO) * self.line.quantity
    }
}

#[derive(Default)]
struct CartState {
    lines: Vec<CartLine>,
    dishes: HashMap<DishId, Dish>,
    variant_prices: HashMap<VariantId, Money>,
}

struct CartInner {
    storage: Arc<dyn KeyValueStore>,
    state: Mutex<CartState>,
    hydration: Mutex<Option<JoinHandle<()>>>,
}

/// The shopping cart. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartInner>,
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("CartStore")
            .field("lines", &state.lines)
            .field("cached_dishes", &state.dishes.len())
            .finish_non_exhaustive()
    }
}

impl CartStore {
    /// Restore the cart from session storage and start hydrating it in the
    /// background. Returns immediately; never fails.
    ///
    /// Absent or unreadable data gives an empty cart. Hydration is only
    /// spawned when there are lines and a Tokio runtime is available.
    pub fn load<C>(storage: Arc<dyn KeyValueStore>, catalog: &C) -> Self
    where
        C: CatalogSource + Clone,
    {
        let cart = Self::restore(storage);
        if !cart.is_empty() {
            cart.spawn_hydration(catalog.clone());
        }
        cart
    }

    /// Restore the cart from session storage without hydrating it.
    pub fn restore(storage: Arc<dyn KeyValueStore>) -> Self {
        let raw = match storage.get(keys::SHOPPING_CART) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "failed to read stored cart");
                None
            }
        };
        let lines = line::decode(raw.as_deref());
        debug!(lines = lines.len(), "cart restored");

        Self {
            inner: Arc::new(CartInner {
                storage,
                state: Mutex::new(CartState {
                    lines,
                    ..CartState::default()
                }),
                hydration: Mutex::new(None),
            }),
        }
    }

    /// Hydrate in a background task.
    pub fn spawn_hydration<C: CatalogSource>(&self, catalog: C) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("no async runtime, cart left unhydrated");
            return;
        };

        let cart = self.clone();
        let handle = runtime.spawn(async move {
            // Failure is already logged by hydrate.
            let _ = cart.hydrate(&catalog).await;
        });

        let previous = self
            .inner
            .hydration
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// Wait for a background hydration started by [`load`](Self::load) or
    /// [`spawn_hydration`](Self::spawn_hydration), if any.
    pub async fn wait_hydrated(&self) {
        let handle = self
            .inner
            .hydration
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle
            && let Err(e) = handle.await
            && !e.is_cancelled()
        {
            warn!(error = %e, "cart hydration task failed");
        }
    }

    /// Fetch the catalog once and cache every dish the cart references,
    /// then fetch the variants of each dish that has a variant line and
    /// cache their prices.
    ///
    /// Dishes missing from the catalog stay uncached, and so do variant
    /// prices whose fetch fails. Returns how many dishes were cached.
    ///
    /// # Errors
    ///
    /// Returns the dish catalog error; both caches are left as they were.
    #[instrument(skip(self, catalog))]
    pub async fn hydrate<C: CatalogSource>(&self, catalog: &C) -> Result<usize, ApiError> {
        let (wanted, wanted_variants) = {
            let state = self.lock();
            let dishes: HashSet<DishId> = state.lines.iter().map(|l| l.dish_id).collect();
            let variants: HashMap<VariantId, DishId> = state
                .lines
                .iter()
                .filter_map(|l| l.variant_id.map(|v| (v, l.dish_id)))
                .collect();
            (dishes, variants)
        };

        let dishes = match catalog.fetch_dishes().await {
            Ok(dishes) => dishes,
            Err(e) => {
                warn!(error = %e, "cart hydration failed, keeping cached dishes");
                return Err(e);
            }
        };

        let variant_dishes: HashSet<DishId> = wanted_variants.values().copied().collect();
        let mut variant_prices = HashMap::new();
        for dish_id in variant_dishes {
            match catalog.fetch_variants(dish_id).await {
                Ok(variants) => variant_prices.extend(
                    variants
                        .iter()
                        .filter(|v| wanted_variants.get(&v.id) == Some(&v.dish_id))
                        .filter_map(|v| v.unit_price().map(|price| (v.id, price))),
                ),
                Err(e) => warn!(%dish_id, error = %e, "failed to fetch variants for cart line"),
            }
        }

        let mut state = self.lock();
        let mut hydrated = 0;
        for dish in dishes.iter().filter(|d| wanted.contains(&d.id)) {
            state.dishes.insert(dish.id, dish.clone());
            hydrated += 1;
        }

        let missing = wanted.len().saturating_sub(hydrated);
        if missing > 0 {
            debug!(missing, "cart references dishes absent from the catalog");
        }
        let priced_variants = variant_prices.len();
        state.variant_prices.extend(variant_prices);
        info!(hydrated, priced_variants, "cart hydrated");
        Ok(hydrated)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add `quantity` of `dish` (optionally as `variant`).
    ///
    /// Returns `false` and logs a warning, leaving the cart untouched, when
    /// the price that would be charged is missing, zero, or not numeric, or
    /// when the variant belongs to another dish. The variant's price takes
    /// precedence over the dish's.
    #[instrument(skip(self, dish, variant), fields(dish_id = %dish.id))]
    pub fn add(&self, dish: &Dish, variant: Option<&DishVariant>, quantity: u32) -> bool {
        if quantity == 0 {
            warn!("refusing to add zero items");
            return false;
        }
        if let Some(variant) = variant
            && variant.dish_id != dish.id
        {
            warn!(variant_id = %variant.id, "variant belongs to another dish");
            return false;
        }

        let price = match variant {
            Some(variant) => variant.unit_price(),
            None => dish.unit_price(),
        };
        if !price.is_some_and(|p| p.is_chargeable()) {
            warn!(name = %dish.name, "dish has no valid price, not added to cart");
            return false;
        }

        let variant_id = variant.map(|v| v.id);
        let mut state = self.lock();
        match state
            .lines
            .iter_mut()
            .find(|l| l.is_for(dish.id, variant_id))
        {
            Some(line) => line.quantity = line.quantity.saturating_add(quantity),
            None => state.lines.push(CartLine {
                dish_id: dish.id,
                variant_id,
                quantity,
            }),
        }
        state.dishes.insert(dish.id, dish.clone());
        if let (Some(id), Some(price)) = (variant_id, price) {
            state.variant_prices.insert(id, price);
        }
        self.persist(&state);
        true
    }

    /// Set a line's quantity; 0 removes the line. Returns whether the line
    /// exists.
    pub fn set_quantity(&self, dish_id: DishId, variant_id: Option<VariantId>, quantity: u32) -> bool {
        if quantity == 0 {
            return self.remove(dish_id, variant_id);
        }
        self.update(dish_id, variant_id, |line| {
            line.quantity = quantity;
            true
        })
    }

    /// Add one to a line. Returns whether the line exists.
    pub fn increment(&self, dish_id: DishId, variant_id: Option<VariantId>) -> bool {
        self.update(dish_id, variant_id, |line| {
            line.quantity = line.quantity.saturating_add(1);
            true
        })
    }

    /// Take one from a line, removing it when it would drop below 1.
    /// Returns whether the line existed.
    pub fn decrement(&self, dish_id: DishId, variant_id: Option<VariantId>) -> bool {
        self.update(dish_id, variant_id, |line| {
            line.quantity = line.quantity.saturating_sub(1);
            line.quantity > 0
        })
    }

    /// Remove a line. Returns whether it existed.
    pub fn remove(&self, dish_id: DishId, variant_id: Option<VariantId>) -> bool {
        self.update(dish_id, variant_id, |_| false)
    }

    /// Empty the cart, the dish cache, and the stored entry.
    #[instrument(skip(self))]
    pub fn clear(&self) {
        let mut state = self.lock();
        *state = CartState::default();
        if let Err(e) = self.inner.storage.remove(keys::SHOPPING_CART) {
            warn!(error = %e, "failed to delete stored cart");
        }
        info!("cart cleared");
    }

    /// Apply `edit` to the matching line; the line is dropped when `edit`
    /// returns `false`. Persists only if the line existed.
    fn update<F>(&self, dish_id: DishId, variant_id: Option<VariantId>, edit: F) -> bool
    where
        F: FnOnce(&mut CartLine) -> bool,
    {
        let mut state = self.lock();
        let Some(index) = state.lines.iter().position(|l| l.is_for(dish_id, variant_id)) else {
            debug!(%dish_id, ?variant_id, "no such cart line");
            return false;
        };

        let keep = state.lines.get_mut(index).is_some_and(edit);
        if !keep {
            state.lines.remove(index);
        }
        self.persist(&state);
        true
    }

    fn persist(&self, state: &CartState) {
        let result = serde_json::to_string(&state.lines)
            .map_err(crate::storage::StorageError::from)
            .and_then(|json| self.inner.storage.set(keys::SHOPPING_CART, &json));
        if let Err(e) = result {
            warn!(error = %e, "failed to persist cart");
        }
    }

    fn lock(&self) -> MutexGuard<'_, CartState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Views
    // =========================================================================

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().lines.is_empty()
    }

    /// Total number of items across lines.
    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.lock()
            .lines
            .iter()
            .fold(0, |sum, line| sum.saturating_add(line.quantity))
    }

    /// Sum of line subtotals; unhydrated lines count as zero.
    #[must_use]
    pub fn total_price(&self) -> Money {
        self.lines().iter().map(CartLineView::subtotal).sum()
    }

    /// Lines with whatever display data is cached.
    #[must_use]
    pub fn lines(&self) -> Vec<CartLineView> {
        let state = self.lock();
        state
            .lines
            .iter()
            .map(|line| CartLineView {
                line: *line,
                dish: state.dishes.get(&line.dish_id).cloned(),
                variant_price: line
                    .variant_id
                    .and_then(|id| state.variant_prices.get(&id).copied()),
            })
            .collect()
    }

    /// The cached dish for `dish_id`, if hydrated.
    #[must_use]
    pub fn cached_dish(&self, dish_id: DishId) -> Option<Dish> {
        self.lock().dishes.get(&dish_id).cloned()
    }

    /// Order lines for checkout: identifiers and quantities only. Prices are
    /// recomputed by the backend.
    #[must_use]
    pub fn checkout_items(&self) -> Vec<OrderItem> {
        self.lock()
            .lines
            .iter()
            .map(|line| OrderItem::new(line.dish_id, line.variant_id, line.quantity))
            .collect()
    }
}
