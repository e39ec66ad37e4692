//! Cart merge engine
//!
//! Pure functions over a cart slice. Callers read the stored cart inside
//! their write transaction, apply one mutation and store the result in the
//! same transaction.

use super::error::{SessionError, SessionResult};
use shared::session::{CartItem, CartItemInput, CartMutation};

/// Apply one mutation to `cart` in place
pub fn apply_mutation(cart: &mut Vec<CartItem>, mutation: &CartMutation) -> SessionResult<()> {
    match mutation {
        CartMutation::Add { item, quantity } => add_item(cart, item, *quantity),
        CartMutation::Subtract {
            menu_item_id,
            quantity,
        } => subtract_item(cart, menu_item_id, *quantity),
        CartMutation::Remove { menu_item_id } => {
            cart.retain(|line| &line.menu_item_id != menu_item_id);
            Ok(())
        }
        CartMutation::Clear => {
            cart.clear();
            Ok(())
        }
    }
}

fn add_item(cart: &mut Vec<CartItem>, item: &CartItemInput, quantity: i32) -> SessionResult<()> {
    if quantity <= 0 {
        return Err(SessionError::validation("quantity must be positive"));
    }

    if let Some(line) = cart
        .iter_mut()
        .find(|line| line.menu_item_id == item.menu_item_id)
    {
        line.quantity = line.quantity.saturating_add(quantity);
        return Ok(());
    }

    // 首次加入需要完整商品信息
    let name = item
        .name
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| SessionError::validation("name is required for a new cart item"))?;
    let price = item
        .price
        .ok_or_else(|| SessionError::validation("price is required for a new cart item"))?;
    if price < 0.0 || !price.is_finite() {
        return Err(SessionError::validation("price must not be negative"));
    }
    let category_id = item
        .category_id
        .clone()
        .ok_or_else(|| SessionError::validation("categoryId is required for a new cart item"))?;

    cart.push(CartItem {
        menu_item_id: item.menu_item_id.clone(),
        name: name.to_string(),
        price,
        quantity,
        category_id,
    });
    Ok(())
}

fn subtract_item(cart: &mut Vec<CartItem>, menu_item_id: &str, quantity: i32) -> SessionResult<()> {
    if quantity <= 0 {
        return Err(SessionError::validation("quantity must be positive"));
    }

    let Some(pos) = cart.iter().position(|line| line.menu_item_id == menu_item_id) else {
        return Ok(());
    };

    let line = &mut cart[pos];
    line.quantity -= quantity;
    if line.quantity <= 0 {
        cart.remove(pos);
    }
    Ok(())
}

/// Normalize a full-replace cart: drop zero-quantity lines and fold
/// duplicate menu items into the first occurrence.
pub fn normalize(items: Vec<CartItem>) -> Vec<CartItem> {
    let mut cart: Vec<CartItem> = Vec::with_capacity(items.len());
    for item in items {
        if item.quantity <= 0 {
            continue;
        }
        match cart
            .iter_mut()
            .find(|line| line.menu_item_id == item.menu_item_id)
        {
            Some(line) => line.quantity = line.quantity.saturating_add(item.quantity),
            None => cart.push(item),
        }
    }
    cart
}
